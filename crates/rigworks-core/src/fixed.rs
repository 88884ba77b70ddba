use fixed::types::I32F32;

/// Q32.32 fixed point. Hose depths and hardness live here so stepping is
/// bit-for-bit reproducible.
pub type Fixed64 = I32F32;

/// Simulation time in ticks.
pub type Ticks = u64;

/// Distance from `v` to the nearest whole number.
#[inline]
pub fn distance_to_whole(v: Fixed64) -> Fixed64 {
    (v - v.round()).abs()
}

/// Whether `v` lies within `epsilon` of a whole number.
#[inline]
pub fn is_near_whole(v: Fixed64, epsilon: Fixed64) -> bool {
    distance_to_whole(v) <= epsilon
}
