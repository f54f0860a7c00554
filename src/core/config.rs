//! Run configuration for the skillset dump
//!
//! Simulation caps live in `vm::constants` and are fixed. This file only
//! covers how a batch run is driven and which monsters need special handling.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SkillsetError};
use crate::core::types::MonsterId;
use crate::script::card::CardMeta;

/// Configuration for a batch run over many monster scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// `tracing` env-filter directive installed by the binary
    ///
    /// `RUST_LOG` still wins when it is set.
    pub log_filter: String,

    /// Pretty-print the JSON output
    pub pretty: bool,

    /// Process monsters on the rayon thread pool
    ///
    /// Every monster owns its pipeline, so this only changes wall time.
    pub parallel: bool,

    /// Simulate every level the script distinguishes instead of only the
    /// card's configured level
    pub all_levels: bool,

    /// Fold a single "one enemy remaining" delta into the standard moveset
    /// when it is just one unconditional action
    pub merge_simple_enemy_remaining: bool,

    /// Monsters whose cycle needs the long search horizon
    pub long_search_monsters: Vec<MonsterId>,

    /// Monsters whose scripts use 0-based jump targets
    pub zero_indexed_monsters: Vec<MonsterId>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            log_filter: "enemy_skillset=info".to_string(),
            pretty: false,
            parallel: true,
            all_levels: true,
            merge_simple_enemy_remaining: true,
            long_search_monsters: Vec::new(),
            zero_indexed_monsters: Vec::new(),
        }
    }
}

impl DumpConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: DumpConfig = toml::from_str(contents)?;
        config.validate().map_err(SkillsetError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.log_filter.trim().is_empty() {
            return Err("log_filter must not be empty".into());
        }

        // A monster listed twice in one list is almost always a typo
        for (name, list) in [
            ("long_search_monsters", &self.long_search_monsters),
            ("zero_indexed_monsters", &self.zero_indexed_monsters),
        ] {
            let mut sorted = list.clone();
            sorted.sort_unstable();
            if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
                return Err(format!("{} lists monster {} twice", name, w[0]));
            }
        }

        Ok(())
    }

    /// Apply per-monster overrides to a card
    pub fn apply_overrides(&self, monster_id: MonsterId, card: &mut CardMeta) {
        if self.long_search_monsters.contains(&monster_id) {
            card.long_search = true;
        }
        if self.zero_indexed_monsters.contains(&monster_id) {
            card.zero_indexed = true;
        }
    }
}
