//! Machine tuning and block tables loaded from data files.
//!
//! One [`MachinesConfig`] carries a section per machine plus an optional
//! block table. Files may be RON, TOML or JSON; the format comes from the
//! extension. Every field has a default, so a file only lists what it
//! overrides.

use std::path::{Path, PathBuf};

use rigworks_core::fixed::Fixed64;
use rigworks_core::id::{BlockTypeId, ItemTypeId};
use rigworks_core::item::ItemStack;
use rigworks_core::registry::{BlockDef, BlockRegistry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::mining_well::MiningWellConfig;
use crate::pump::PumpConfig;
use crate::refinery::RefineryConfig;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("block {id} ('{name}') is defined twice")]
    DuplicateBlock { id: u32, name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Deserialize `content` as `format`. `origin` only labels errors.
pub fn parse_str<T: DeserializeOwned>(content: &str, format: Format, origin: &Path) -> Result<T, ConfigError> {
    let parse_error = |detail: String| ConfigError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Schema
// ===========================================================================

/// One row of the block table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub hardness: f64,
    #[serde(default)]
    pub unbreakable: bool,
    /// `(item id, quantity)` pairs.
    #[serde(default)]
    pub drops: Vec<(u32, u32)>,
}

impl BlockEntry {
    fn to_def(&self) -> BlockDef {
        BlockDef {
            name: self.name.clone(),
            hardness: Fixed64::checked_from_num(self.hardness).unwrap_or(Fixed64::ZERO),
            unbreakable: self.unbreakable,
            drops: self
                .drops
                .iter()
                .map(|&(item, quantity)| ItemStack::new(ItemTypeId(item), quantity))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub tank_capacity: i64,
    pub crate_capacity: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tank_capacity: 16 * rigworks_core::fluid::BUCKET,
            crate_capacity: 64 * 27,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinesConfig {
    pub mining_well: MiningWellConfig,
    pub pump: PumpConfig,
    pub refinery: RefineryConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub blocks: Vec<BlockEntry>,
}

impl MachinesConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        parse_str(content, Format::Toml, Path::new("<toml>"))
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        parse_str(content, Format::Ron, Path::new("<ron>"))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        parse_str(content, Format::Json, Path::new("<json>"))
    }

    /// Build the block registry from the block table.
    pub fn block_registry(&self) -> Result<BlockRegistry, ConfigError> {
        let mut registry = BlockRegistry::new();
        for entry in &self.blocks {
            let id = BlockTypeId(entry.id);
            if registry.get(id).is_some() {
                return Err(ConfigError::DuplicateBlock {
                    id: entry.id,
                    name: entry.name.clone(),
                });
            }
            registry.register(id, entry.to_def());
        }
        Ok(registry)
    }
}

/// Read a config file, picking the parser from its extension.
pub fn load_config(path: &Path) -> Result<MachinesConfig, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let config: MachinesConfig = parse_str(&content, format, path)?;
    tracing::debug!(
        file = %path.display(),
        ?format,
        blocks = config.blocks.len(),
        "loaded machine config"
    );
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rigworks_core::fixed::Fixed64;
    use rigworks_core::fluid::BUCKET;
    use rigworks_core::id::FluidId;
    use rigworks_core::pos::Face;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rigworks_config_test_{suffix}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = MachinesConfig::from_toml_str("").unwrap();
        assert_eq!(config, MachinesConfig::default());
        assert_eq!(config.pump.ticks_per_block, 40);
        assert_eq!(config.pump.drain_amount, BUCKET);
        assert_eq!(config.refinery.oil_per_cycle, 100);
    }

    #[test]
    fn toml_overrides_single_fields() {
        let config = MachinesConfig::from_toml_str(
            r#"
            [pump]
            max_range = 12

            [mining_well]
            base_cost = 10
            column_block = 5

            [[blocks]]
            id = 1
            name = "stone"
            hardness = 1.5
            drops = [[1, 1]]
            "#,
        )
        .unwrap();
        assert_eq!(config.pump.max_range, 12);
        assert_eq!(config.pump.ticks_per_block, 40);
        assert_eq!(config.mining_well.base_cost, 10);
        assert_eq!(config.mining_well.column_block, BlockTypeId(5));

        let registry = config.block_registry().unwrap();
        let stone = registry.get(BlockTypeId(1)).unwrap();
        assert_eq!(stone.hardness, Fixed64::from_num(1.5));
        assert_eq!(stone.drops, vec![ItemStack::new(ItemTypeId(1), 1)]);
    }

    #[test]
    fn ron_and_json_parse() {
        let ron = MachinesConfig::from_ron_str("(engine: (facing: Down, stroke_interval: 5))").unwrap();
        assert_eq!(ron.engine.facing, Face::Down);
        assert_eq!(ron.engine.stroke_interval, 5);

        let json = MachinesConfig::from_json_str(r#"{"refinery": {"oil_inputs": [1, 3], "fuel": 2}}"#).unwrap();
        assert_eq!(json.refinery.oil_inputs, vec![FluidId(1), FluidId(3)]);
    }

    #[test]
    fn malformed_input_reports_parse_error() {
        let err = MachinesConfig::from_toml_str("[pump]\nmax_range = \"far\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn duplicate_block_ids_rejected() {
        let config = MachinesConfig {
            blocks: vec![
                BlockEntry {
                    id: 1,
                    name: "a".into(),
                    hardness: 1.0,
                    unbreakable: false,
                    drops: vec![],
                },
                BlockEntry {
                    id: 1,
                    name: "b".into(),
                    hardness: 1.0,
                    unbreakable: false,
                    drops: vec![],
                },
            ],
            ..MachinesConfig::default()
        };
        assert!(matches!(
            config.block_registry(),
            Err(ConfigError::DuplicateBlock { id: 1, .. })
        ));
    }

    #[test]
    fn load_config_from_file() {
        let dir = make_test_dir("load");
        let path = dir.join("machines.toml");
        fs::write(&path, "[storage]\ncrate_capacity = 9\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.storage.crate_capacity, 9);
        assert!(matches!(
            load_config(&dir.join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
