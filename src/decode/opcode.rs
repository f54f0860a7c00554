//! Raw opcode records and the skill registry
//!
//! Opcodes arrive exactly as stored in the data tables: a type code and up to
//! sixteen nullable integer slots. Nothing here interprets them.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::SkillId;

/// Slots past this index are ignored
pub const MAX_PARAM_SLOTS: usize = 16;

/// One raw enemy skill record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorOpcode {
    pub id: SkillId,
    #[serde(default)]
    pub name: String,
    pub type_code: i32,
    #[serde(default)]
    pub params: Vec<Option<i32>>,
}

impl BehaviorOpcode {
    pub fn new(id: SkillId, type_code: i32) -> Self {
        Self {
            id,
            name: String::new(),
            type_code,
            params: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set one slot, growing the slot list as needed
    pub fn with_slot(mut self, idx: usize, value: i32) -> Self {
        if idx < MAX_PARAM_SLOTS {
            if self.params.len() <= idx {
                self.params.resize(idx + 1, None);
            }
            self.params[idx] = Some(value);
        }
        self
    }

    pub fn slot(&self, idx: usize) -> Option<i32> {
        if idx >= MAX_PARAM_SLOTS {
            return None;
        }
        self.params.get(idx).copied().flatten()
    }

    pub fn slot_or(&self, idx: usize, default: i32) -> i32 {
        self.slot(idx).unwrap_or(default)
    }

    /// Slot value, treating an explicit zero as missing
    pub fn nonzero_slot(&self, idx: usize) -> Option<i32> {
        self.slot(idx).filter(|v| *v != 0)
    }

    /// All present values in `start..end`, in slot order
    pub fn present_slots(&self, start: usize, end: usize) -> Vec<i32> {
        (start..end.min(MAX_PARAM_SLOTS))
            .filter_map(|i| self.slot(i))
            .collect()
    }
}

/// Skill records keyed by id
///
/// Built once per data load and passed to the decoder so skill-set opcodes
/// can resolve the skills they bundle.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    by_id: AHashMap<SkillId, BehaviorOpcode>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_opcodes(opcodes: impl IntoIterator<Item = BehaviorOpcode>) -> Self {
        let mut registry = Self::new();
        for opcode in opcodes {
            registry.register(opcode);
        }
        registry
    }

    /// Later records with the same id replace earlier ones
    pub fn register(&mut self, opcode: BehaviorOpcode) {
        self.by_id.insert(opcode.id, opcode);
    }

    pub fn get(&self, id: SkillId) -> Option<&BehaviorOpcode> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: SkillId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_defaults() {
        let op = BehaviorOpcode::new(1, 15).with_slot(2, 3);
        assert_eq!(op.slot(0), None);
        assert_eq!(op.slot(2), Some(3));
        assert_eq!(op.slot_or(5, 7), 7);
        assert_eq!(op.slot(40), None);
    }

    #[test]
    fn test_slots_past_width_are_dropped() {
        let op = BehaviorOpcode::new(1, 15).with_slot(MAX_PARAM_SLOTS, 9);
        assert!(op.params.is_empty());
    }

    #[test]
    fn test_nonzero_slot() {
        let op = BehaviorOpcode::new(1, 1).with_slot(0, 0).with_slot(1, 4);
        assert_eq!(op.nonzero_slot(0), None);
        assert_eq!(op.nonzero_slot(1), Some(4));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SkillRegistry::from_opcodes([
            BehaviorOpcode::new(10, 6),
            BehaviorOpcode::new(11, 82),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(11));
        assert_eq!(registry.get(10).map(|op| op.type_code), Some(6));
        assert!(registry.get(12).is_none());
    }
}
