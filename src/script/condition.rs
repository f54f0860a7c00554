//! Probability gates and trigger predicates attached to actions
//!
//! A [`Condition`] starts from the entry's `ai`/`rnd` operands and gains
//! auxiliary predicates two ways: from the node itself when the instance is
//! built, and from branch exploration tagging what made it appear.

use serde::Serialize;

use crate::core::types::{Attribute, OrbMask};
use crate::decode::node::{ActionGate, BehaviorNode};
use crate::script::card::CardMeta;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Condition {
    pub ai: i32,
    pub rnd: i32,
    /// Only used when HP is below this value (with the `ai >= 100` exception)
    pub hp_threshold: Option<i32>,
    /// Skill counter cost
    pub limited_use: Option<i32>,
    pub enemies_remaining: Option<i32>,
    pub on_death: bool,
    pub required_attributes: Vec<Attribute>,
    pub cards_on_team: Vec<i32>,
    pub combos_made: Option<i32>,
    pub attributes_erased: Option<OrbMask>,
    pub attributes_on_board: Option<OrbMask>,
    pub damage_done: Option<i64>,
    pub attributes_attacked: Option<OrbMask>,
    pub skills_used: Option<i32>,
    /// Card runs the newer skill AI; the text layer words chances differently
    pub use_new_ai: bool,
}

impl Condition {
    pub fn new(ai: i32, rnd: i32, gate: ActionGate) -> Self {
        Self {
            ai,
            rnd,
            // Monsters with no AI never honor the HP threshold
            hp_threshold: if ai == 0 { None } else { gate.hp_threshold },
            limited_use: gate.limited_use,
            enemies_remaining: None,
            on_death: false,
            required_attributes: Vec::new(),
            cards_on_team: Vec::new(),
            combos_made: None,
            attributes_erased: None,
            attributes_on_board: None,
            damage_done: None,
            attributes_attacked: None,
            skills_used: None,
            use_new_ai: false,
        }
    }

    /// Gate for an unconditional action that still needs predicates attached
    pub fn certain(gate: ActionGate) -> Self {
        Self::new(
            100,
            0,
            ActionGate {
                hp_threshold: None,
                limited_use: gate.limited_use,
            },
        )
    }

    /// Chance in percent that this gate lets its action through at `hp`
    pub fn use_chance(&self, hp: i32) -> i32 {
        let ai = i64::from(self.ai);
        let rnd = i64::from(self.rnd);
        let max_chance = (ai + (100 - ai) * rnd / 100).min(100);
        let min_chance = rnd.min(100);

        let chance = match self.hp_threshold {
            Some(threshold) if hp < threshold => max_chance,
            // Observed on a single monster; keep it narrow
            Some(_) if self.ai >= 100 => 0,
            Some(_) => min_chance,
            None => max_chance,
        };
        chance.clamp(0, 100) as i32
    }

    pub fn is_limited_use(&self) -> bool {
        self.limited_use.is_some()
    }

    /// True when exploration attached any trigger to this gate
    pub fn has_trigger(&self) -> bool {
        !self.cards_on_team.is_empty()
            || self.combos_made.is_some()
            || self.attributes_erased.is_some()
            || self.attributes_on_board.is_some()
            || self.damage_done.is_some()
            || self.attributes_attacked.is_some()
            || self.skills_used.is_some()
    }
}

/// Build the gate for a node and its script operands
///
/// Logic nodes never get one. Other nodes get one when either operand is
/// positive, or when the node carries a predicate that has to live somewhere.
pub fn build_condition(
    node: &BehaviorNode,
    ai: i32,
    rnd: i32,
    card: &CardMeta,
) -> Option<Condition> {
    if node.is_logic() {
        return None;
    }
    let gate = node.gate().unwrap_or_default();
    let mut condition = (ai > 0 || rnd > 0).then(|| Condition::new(ai, rnd, gate));

    let enemies_remaining = match node {
        BehaviorNode::Action(action) => action.enemies_remaining(),
        BehaviorNode::Passive(passive) => passive.enemies_remaining(),
        _ => None,
    };
    if let Some(count) = enemies_remaining {
        condition
            .get_or_insert_with(|| Condition::certain(gate))
            .enemies_remaining = Some(count);
    }

    if node.is_death_action() {
        condition
            .get_or_insert_with(|| Condition::certain(gate))
            .on_death = true;
    }

    if let Some(required) = node
        .action()
        .and_then(|a| a.required_attributes())
        .filter(|r| !r.is_empty())
    {
        condition
            .get_or_insert_with(|| Condition::certain(gate))
            .required_attributes = required.to_vec();
    }

    if let Some(condition) = condition.as_mut() {
        condition.use_new_ai = card.use_new_skill_ai;
    }
    condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::node::{ActionKind, ActionNode, LogicNode};

    fn gate(hp_threshold: Option<i32>) -> ActionGate {
        ActionGate {
            hp_threshold,
            limited_use: None,
        }
    }

    #[test]
    fn test_chance_without_threshold() {
        assert_eq!(Condition::new(0, 30, gate(None)).use_chance(100), 30);
        assert_eq!(Condition::new(50, 50, gate(None)).use_chance(100), 75);
        assert_eq!(Condition::new(100, 0, gate(None)).use_chance(100), 100);
    }

    #[test]
    fn test_chance_below_threshold() {
        let cond = Condition::new(20, 10, gate(Some(50)));
        assert_eq!(cond.use_chance(49), 28);
        assert_eq!(cond.use_chance(50), 10);
    }

    #[test]
    fn test_full_ai_above_threshold_never_fires() {
        let cond = Condition::new(100, 50, gate(Some(30)));
        assert_eq!(cond.use_chance(50), 0);
        assert_eq!(cond.use_chance(29), 100);
    }

    #[test]
    fn test_zero_ai_ignores_threshold() {
        let cond = Condition::new(0, 40, gate(Some(30)));
        assert_eq!(cond.hp_threshold, None);
        assert_eq!(cond.use_chance(100), 40);
    }

    #[test]
    fn test_chance_is_clamped() {
        assert_eq!(Condition::new(-10, 5, gate(None)).use_chance(100), 0);
        assert_eq!(Condition::new(150, 0, gate(None)).use_chance(100), 100);
    }

    #[test]
    fn test_logic_never_gets_condition() {
        let node = BehaviorNode::Logic(LogicNode::EndPath);
        assert!(build_condition(&node, 100, 100, &CardMeta::default()).is_none());
    }

    #[test]
    fn test_no_operands_no_condition() {
        let node = BehaviorNode::Action(ActionNode::new(ActionKind::Dispel));
        assert!(build_condition(&node, 0, 0, &CardMeta::default()).is_none());
        assert!(build_condition(&node, 0, 1, &CardMeta::default()).is_some());
    }

    #[test]
    fn test_enemy_ally_heal_waits_for_last_enemy() {
        let node = BehaviorNode::Action(ActionNode::new(ActionKind::RecoverEnemyAlly { amount: 50 }));
        let cond = build_condition(&node, 0, 0, &CardMeta::default()).expect("condition");
        assert_eq!(cond.enemies_remaining, Some(1));
        assert_eq!(cond.use_chance(100), 100);
    }

    #[test]
    fn test_death_action_marked() {
        let node = BehaviorNode::Action(ActionNode::new(ActionKind::DeathCry));
        let cond = build_condition(&node, 0, 0, &CardMeta::default()).expect("condition");
        assert!(cond.on_death);
    }

    #[test]
    fn test_card_ai_flag_copied_onto_gate() {
        let node = BehaviorNode::Action(ActionNode::new(ActionKind::Dispel));
        let card = CardMeta {
            use_new_skill_ai: true,
            ..CardMeta::default()
        };
        let cond = build_condition(&node, 0, 40, &card).expect("condition");
        assert!(cond.use_new_ai);
        assert!(!build_condition(&node, 0, 40, &CardMeta::default())
            .expect("condition")
            .use_new_ai);
    }
}
