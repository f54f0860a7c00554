//! Decoded script entries

use serde::Serialize;

use crate::core::error::{Result, SkillsetError};
use crate::core::types::{SkillId, COUNTDOWN_SKILL_ID};
use crate::decode::node::{ActionKind, ActionNode, Behavior, BehaviorNode};
use crate::decode::opcode::SkillRegistry;
use crate::decode::table::decode;
use crate::script::card::{CardMeta, ScriptEntry};
use crate::script::condition::{build_condition, Condition};

/// One decoded behavior with its gate
///
/// Full equality covers the condition, so two copies of a skill tagged by
/// different branches are distinct. Use [`Instance::same_behavior`] for the
/// identity comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Instance {
    pub id: SkillId,
    pub name: String,
    pub node: BehaviorNode,
    pub condition: Option<Condition>,
    /// Copied from the owning card
    pub use_new_ai: bool,
}

impl Instance {
    /// Instance owned by a default card
    pub fn new(id: SkillId, name: impl Into<String>, node: BehaviorNode, ai: i32, rnd: i32) -> Self {
        Self::for_card(id, name, node, ai, rnd, &CardMeta::default())
    }

    /// Patch operand-driven logic fields, then build the gate
    pub fn for_card(
        id: SkillId,
        name: impl Into<String>,
        node: BehaviorNode,
        ai: i32,
        rnd: i32,
        card: &CardMeta,
    ) -> Self {
        let node = node.with_operands(ai, rnd);
        let condition = build_condition(&node, ai, rnd, card);
        Self {
            id,
            name: name.into(),
            node,
            condition,
            use_new_ai: card.use_new_skill_ai,
        }
    }

    pub fn from_entry(entry: &ScriptEntry, registry: &SkillRegistry, card: &CardMeta) -> Result<Self> {
        let opcode = registry
            .get(entry.skill_id)
            .ok_or(SkillsetError::MissingSkill(entry.skill_id))?;
        Ok(Self::for_card(
            opcode.id,
            opcode.name.clone(),
            decode(opcode, registry),
            entry.ai,
            entry.rnd,
            card,
        ))
    }

    /// Marker shown while a countdown is still running
    pub fn countdown(counter: i32) -> Self {
        Self {
            id: COUNTDOWN_SKILL_ID,
            name: "Countdown Message".to_string(),
            node: BehaviorNode::Action(ActionNode::new(ActionKind::CountdownMessage { counter })),
            condition: None,
            use_new_ai: false,
        }
    }

    /// Same skill doing the same thing, ignoring any attached triggers
    pub fn same_behavior(&self, other: &Instance) -> bool {
        self.id == other.id && self.node == other.node
    }

    /// `None` for ungated instances
    pub fn use_chance(&self, hp: i32) -> Option<i32> {
        self.condition.as_ref().map(|c| c.use_chance(hp))
    }

    pub fn is_limited_use(&self) -> bool {
        self.condition.as_ref().is_some_and(Condition::is_limited_use)
    }

    /// Condition to attach triggers to, created as a certain gate if missing
    pub fn condition_mut(&mut self) -> &mut Condition {
        let gate = self.node.gate().unwrap_or_default();
        let use_new_ai = self.use_new_ai;
        self.condition.get_or_insert_with(|| Condition {
            use_new_ai,
            ..Condition::certain(gate)
        })
    }

    pub fn description(&self) -> String {
        match &self.condition {
            Some(cond) if cond.use_chance(100) < 100 => {
                format!("{}% chance: {}", cond.use_chance(100), self.node.description())
            }
            _ => self.node.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::node::LogicNode;
    use crate::decode::opcode::BehaviorOpcode;

    #[test]
    fn test_missing_skill_is_an_error() {
        let registry = SkillRegistry::new();
        let result = Instance::from_entry(
            &ScriptEntry::new(42, 0, 0),
            &registry,
            &CardMeta::default(),
        );
        assert!(matches!(result, Err(SkillsetError::MissingSkill(42))));
    }

    #[test]
    fn test_branch_operands_patched() {
        let registry = SkillRegistry::from_opcodes([BehaviorOpcode::new(7, 28)]);
        let inst = Instance::from_entry(&ScriptEntry::new(7, 50, 5), &registry, &CardMeta::default())
            .expect("instance");
        assert_eq!(
            inst.node.logic(),
            Some(&LogicNode::BranchHp {
                cmp: crate::core::types::Compare::Lt,
                value: 50,
                target: 5
            })
        );
        assert!(inst.condition.is_none());
    }

    #[test]
    fn test_same_behavior_ignores_tags() {
        let registry = SkillRegistry::from_opcodes([BehaviorOpcode::new(3, 6)]);
        let a = Instance::from_entry(&ScriptEntry::new(3, 0, 50), &registry, &CardMeta::default())
            .expect("instance");
        let mut b = a.clone();
        b.condition_mut().combos_made = Some(7);
        assert!(a.same_behavior(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_countdown_markers_differ_by_counter() {
        assert!(!Instance::countdown(2).same_behavior(&Instance::countdown(1)));
        assert!(Instance::countdown(2).same_behavior(&Instance::countdown(2)));
    }

    #[test]
    fn test_card_ai_flag_reaches_tagged_gates() {
        let registry = SkillRegistry::from_opcodes([BehaviorOpcode::new(3, 6)]);
        let card = CardMeta {
            use_new_skill_ai: true,
            ..CardMeta::default()
        };
        let mut inst =
            Instance::from_entry(&ScriptEntry::new(3, 0, 0), &registry, &card).expect("instance");
        assert!(inst.use_new_ai);
        assert!(inst.condition.is_none());
        assert!(inst.condition_mut().use_new_ai);
    }
}
