//! From simulated turns to a persisted skillset
//!
//! - `sequence`: turn lists at one HP and their cycle
//! - `consolidate`: HP checkpoints merged top-down
//! - `groups`: output tree plus cleanup
//! - `builder`: the whole pipeline for one monster
//! - `export`: flat, labeled records for the JSON dump

pub mod builder;
pub mod consolidate;
pub mod export;
pub mod groups;
pub mod sequence;

pub use builder::{references_remaining_enemies, script_levels, SkillsetBuilder};
pub use consolidate::{consolidate, hp_checkpoints};
pub use export::{
    flatten, merge_simple_enemy_remaining, GroupLabel, LabeledGroup, LevelBehavior, SkillRecord,
};
pub use groups::{
    EnemyRemainingMoveset, HpActions, Moveset, ProcessedSkillset, RepeatSkillGroup, SkillGroup,
    TimedSkillGroup,
};
pub use sequence::{extract, find_cycle, simulate_turns};
