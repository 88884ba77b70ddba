//! Connected fluid regions.

use std::collections::{BTreeSet, VecDeque};

use rigworks_core::id::FluidId;
use rigworks_core::pos::BlockPos;
use rigworks_core::world::World;

/// The cells of one fluid reachable from a seed, in breadth-first order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluidBlob {
    pub fluid: FluidId,
    pub cells: Vec<BlockPos>,
    pub sources: Vec<BlockPos>,
    pub flowing: Vec<BlockPos>,
    /// The node budget ran out before the region was exhausted.
    pub truncated: bool,
}

impl FluidBlob {
    /// Breadth-first walk over face-adjacent cells holding the seed's
    /// fluid. Visits at most `max_nodes` cells. `None` if the seed is not
    /// fluid.
    pub fn scan(world: &dyn World, seed: BlockPos, max_nodes: usize) -> Option<FluidBlob> {
        let fluid = world.block(seed).fluid()?;
        let mut blob = FluidBlob {
            fluid,
            cells: Vec::new(),
            sources: Vec::new(),
            flowing: Vec::new(),
            truncated: false,
        };

        let mut seen = BTreeSet::from([seed]);
        let mut queue = VecDeque::from([seed]);
        while let Some(pos) = queue.pop_front() {
            if blob.cells.len() >= max_nodes {
                blob.truncated = true;
                break;
            }
            let state = world.block(pos);
            blob.cells.push(pos);
            if state.is_source() {
                blob.sources.push(pos);
            } else {
                blob.flowing.push(pos);
            }
            for next in pos.neighbors() {
                if world.block(next).fluid() == Some(fluid) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Some(blob)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn has_source(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Last source cell in traversal order. Removing it never disconnects
    /// the cells visited before it.
    pub fn last_source(&self) -> Option<BlockPos> {
        self.sources.last().copied()
    }

    /// Up to `limit` flowing cells at the greatest Manhattan distance from
    /// `from`.
    pub fn farthest_flowing(&self, from: BlockPos, limit: usize) -> Vec<BlockPos> {
        Self::farthest_flowing_among(std::slice::from_ref(self), from, limit)
    }

    /// Like [`farthest_flowing`](Self::farthest_flowing), with the distance
    /// maximum taken over several regions at once.
    pub fn farthest_flowing_among(blobs: &[FluidBlob], from: BlockPos, limit: usize) -> Vec<BlockPos> {
        let flowing = || blobs.iter().flat_map(|b| b.flowing.iter().copied());
        let Some(max) = flowing().map(|p| p.manhattan_distance(&from)).max() else {
            return Vec::new();
        };
        flowing()
            .filter(|p| p.manhattan_distance(&from) == max)
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigworks_core::test_utils::*;
    use rigworks_core::world::{BlockState, GridWorld};

    fn pool() -> GridWorld {
        let mut world = GridWorld::new(0);
        world.fill(
            BlockPos::new(0, 1, 0),
            BlockPos::new(2, 1, 0),
            BlockState::flowing(water()),
        );
        world.set_block(BlockPos::new(1, 1, 0), BlockState::source(water()));
        world
    }

    #[test]
    fn scan_collects_connected_cells() {
        let world = pool();
        let blob = FluidBlob::scan(&world, BlockPos::new(0, 1, 0), 64).unwrap();
        assert_eq!(blob.fluid, water());
        assert_eq!(blob.cells.len(), 3);
        assert_eq!(blob.last_source(), Some(BlockPos::new(1, 1, 0)));
        assert_eq!(blob.flowing.len(), 2);
        assert!(!blob.truncated);
    }

    #[test]
    fn scan_ignores_other_fluids() {
        let mut world = pool();
        world.set_block(BlockPos::new(3, 1, 0), BlockState::source(oil()));
        let blob = FluidBlob::scan(&world, BlockPos::new(0, 1, 0), 64).unwrap();
        assert_eq!(blob.cells.len(), 3);
    }

    #[test]
    fn scan_of_non_fluid_is_none() {
        let world = pool();
        assert!(FluidBlob::scan(&world, BlockPos::new(0, 5, 0), 64).is_none());
    }

    #[test]
    fn node_budget_truncates() {
        let mut world = GridWorld::new(0);
        world.fill(
            BlockPos::new(0, 0, 0),
            BlockPos::new(9, 0, 9),
            BlockState::flowing(water()),
        );
        let blob = FluidBlob::scan(&world, BlockPos::new(0, 0, 0), 10).unwrap();
        assert_eq!(blob.cells.len(), 10);
        assert!(blob.truncated);
    }

    #[test]
    fn farthest_flowing_picks_max_distance() {
        let world = pool();
        let blob = FluidBlob::scan(&world, BlockPos::new(0, 1, 0), 64).unwrap();
        let far = blob.farthest_flowing(BlockPos::new(0, 2, 0), 4);
        assert_eq!(far, vec![BlockPos::new(2, 1, 0)]);
        assert!(blob.farthest_flowing(BlockPos::new(0, 2, 0), 0).is_empty());
    }

    #[test]
    fn farthest_flowing_among_uses_shared_maximum() {
        let mut world = pool();
        world.set_block(BlockPos::new(6, 1, 0), BlockState::flowing(water()));
        let near = FluidBlob::scan(&world, BlockPos::new(0, 1, 0), 64).unwrap();
        let far = FluidBlob::scan(&world, BlockPos::new(6, 1, 0), 64).unwrap();
        let picked = FluidBlob::farthest_flowing_among(&[near, far], BlockPos::new(0, 1, 0), 4);
        assert_eq!(picked, vec![BlockPos::new(6, 1, 0)]);
    }
}
