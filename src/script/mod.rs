//! Monster scripts: decoded entries laid out for the interpreter

pub mod card;
pub mod condition;
pub mod instance;

pub use card::{CardMeta, MonsterScript, ScriptEntry, ScriptFile};
pub use condition::{build_condition, Condition};
pub use instance::Instance;

use crate::core::error::Result;
use crate::decode::opcode::SkillRegistry;

/// Instances addressed by jump target
///
/// Slot 0 is an empty sentinel for ordinary 1-based scripts. Vacated slots
/// stay in place so every absolute target keeps pointing where it did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    slots: Vec<Option<Instance>>,
}

impl Script {
    pub fn new(instances: Vec<Instance>, zero_indexed: bool) -> Self {
        let sentinel = if zero_indexed { None } else { Some(None) };
        Self {
            slots: sentinel.into_iter().chain(instances.into_iter().map(Some)).collect(),
        }
    }

    /// Decode every entry through the registry for one card
    pub fn from_entries(
        entries: &[ScriptEntry],
        registry: &SkillRegistry,
        card: &CardMeta,
    ) -> Result<Self> {
        let instances = entries
            .iter()
            .map(|entry| Instance::from_entry(entry, registry, card))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(instances, card.zero_indexed))
    }

    /// Addressable slots, vacated ones and the sentinel included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every slot is vacant
    pub fn has_no_behaviors(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn get(&self, idx: usize) -> Option<&Instance> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.slots.iter().flatten()
    }

    /// Split off every instance matching `pred`
    ///
    /// Returns a new script with those slots vacated, plus the removed
    /// instances in script order. `self` is left untouched.
    pub fn partition(&self, pred: impl Fn(&Instance) -> bool) -> (Script, Vec<Instance>) {
        let mut removed = Vec::new();
        let slots = self
            .slots
            .iter()
            .map(|slot| match slot {
                Some(inst) if pred(inst) => {
                    removed.push(inst.clone());
                    None
                }
                other => other.clone(),
            })
            .collect();
        (Script { slots }, removed)
    }
}
