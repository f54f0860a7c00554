//! Card-level metadata and script input records

use serde::{Deserialize, Serialize};

use crate::core::types::{MonsterId, SkillId};
use crate::decode::opcode::BehaviorOpcode;

fn default_level() -> i32 {
    1
}

/// Per-card constants that do not depend on any one script entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMeta {
    /// Newer skill AI; copied onto every instance, gate and level record
    #[serde(default)]
    pub use_new_skill_ai: bool,
    /// Upper bound and starting value of the skill counter
    #[serde(default)]
    pub skill_counter_max: i32,
    /// Skill counter regained after every simulated turn
    #[serde(default)]
    pub skill_counter_increment: i32,
    /// Simulated monster level
    #[serde(default = "default_level")]
    pub level: i32,
    /// The dungeon always shows exactly one enemy
    #[serde(default)]
    pub force_one_enemy: bool,
    /// Search 40 turns for a cycle instead of 20
    #[serde(default)]
    pub long_search: bool,
    /// Jump targets count from 0 instead of 1
    #[serde(default)]
    pub zero_indexed: bool,
}

impl Default for CardMeta {
    fn default() -> Self {
        Self {
            use_new_skill_ai: false,
            skill_counter_max: 0,
            skill_counter_increment: 0,
            level: default_level(),
            force_one_enemy: false,
            long_search: false,
            zero_indexed: false,
        }
    }
}

impl CardMeta {
    pub fn at_level(&self, level: i32) -> Self {
        Self {
            level,
            ..self.clone()
        }
    }
}

/// One line of a monster's script: which skill, plus its two operands
///
/// For actions `ai`/`rnd` are chance operands. Logic opcodes reuse them as
/// flag masks, counter values and jump targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub skill_id: SkillId,
    #[serde(default)]
    pub ai: i32,
    #[serde(default)]
    pub rnd: i32,
}

impl ScriptEntry {
    pub fn new(skill_id: SkillId, ai: i32, rnd: i32) -> Self {
        Self { skill_id, ai, rnd }
    }
}

/// Everything needed to process one monster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterScript {
    pub monster_id: MonsterId,
    #[serde(default)]
    pub card: CardMeta,
    pub entries: Vec<ScriptEntry>,
}

/// Input file for the dump binary: a skill library plus the monster scripts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFile {
    pub skills: Vec<BehaviorOpcode>,
    pub monsters: Vec<MonsterScript>,
}
