use thiserror::Error;

use crate::core::types::SkillId;

#[derive(Error, Debug)]
pub enum SkillsetError {
    #[error("Skill {0} is referenced by the script but missing from the registry")]
    MissingSkill(SkillId),

    #[error("No repeating turn cycle found at {hp}% HP within {horizon} turns")]
    NoCycle { hp: i32, horizon: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParseError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SkillsetError>;
