//! Opcode decoding
//!
//! Raw records → [`BehaviorNode`]. Pure functions, no simulation state.

pub mod bitmap;
pub mod node;
pub mod opcode;
pub mod table;

pub use node::{
    ActionGate, ActionKind, ActionNode, Attack, Behavior, BehaviorNode, Effect, EffectKind,
    LogicNode, PassiveKind, PassiveNode,
};
pub use opcode::{BehaviorOpcode, SkillRegistry};
pub use table::decode;
