//! HP checkpoints and smearing identical behavior across them

use std::collections::BTreeSet;

use tracing::debug;

use crate::core::error::Result;
use crate::decode::node::LogicNode;
use crate::moveset::groups::{same_skills, HpActions};
use crate::moveset::sequence::extract;
use crate::script::Script;
use crate::vm::constants::FULL_HP;
use crate::vm::context::Context;

/// Every HP worth simulating, highest first
///
/// Always 100 and 0, plus each HP branch value and each action threshold
/// together with the value just below it.
pub fn hp_checkpoints(script: &Script) -> Vec<i32> {
    let mut checkpoints = BTreeSet::from([FULL_HP, 0]);
    for inst in script.instances() {
        if let Some(LogicNode::BranchHp { value, .. }) = inst.node.logic() {
            checkpoints.extend([*value, value - 1]);
        }
        if let Some(threshold) = inst.condition.as_ref().and_then(|c| c.hp_threshold) {
            checkpoints.extend([threshold, threshold - 1]);
        }
    }
    checkpoints.into_iter().rev().collect()
}

/// Extract every checkpoint, then smear matching groups upward
pub fn consolidate(
    ctx: &Context,
    script: &Script,
    checkpoints: &[i32],
    horizon: usize,
) -> Result<Vec<HpActions>> {
    let mut actions = checkpoints
        .iter()
        .map(|&hp| extract(ctx, script, hp, horizon))
        .collect::<Result<Vec<_>>>()?;

    // Next checkpoint below index `idx`, or 1 past the bottom
    let below = |idx: usize| checkpoints.get(idx + 1).copied().unwrap_or(1);

    for current_idx in 0..actions.len() {
        let (head, tail) = actions.split_at_mut(current_idx + 1);
        let current = &mut head[current_idx];

        for (slot, group) in current.timed.iter_mut().enumerate() {
            if group.skills.is_empty() {
                continue;
            }
            for (offset, lower) in tail.iter_mut().enumerate() {
                let Some(lower_group) = lower.timed.get_mut(slot) else {
                    break;
                };
                if lower_group.skills == group.skills {
                    lower_group.skills.clear();
                    group.valid_above = Some(below(current_idx + 1 + offset));
                }
            }
        }

        if current.repeating.is_empty() {
            continue;
        }
        for (offset, lower) in tail.iter_mut().enumerate() {
            if !same_skills(&current.repeating, &lower.repeating) {
                break;
            }
            lower.repeating.clear();
            let valid_above = below(current_idx + 1 + offset);
            for repeat in &mut current.repeating {
                repeat.group.valid_above = Some(valid_above);
            }
        }

        debug!(
            hp = current.hp,
            timed = current.timed.len(),
            repeating = current.repeating.len(),
            "checkpoint consolidated"
        );
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Compare;
    use crate::decode::node::{ActionGate, ActionKind, ActionNode, Attack, BehaviorNode};
    use crate::script::Instance;

    fn attack(id: i32) -> Instance {
        let node = ActionNode::new(ActionKind::Attack).with_attack(Some(Attack::single(100)));
        Instance::new(id, "", BehaviorNode::Action(node), 0, 0)
    }

    fn hp_branch_script() -> Script {
        let branch = LogicNode::BranchHp {
            cmp: Compare::Lt,
            value: 0,
            target: 0,
        };
        Script::new(
            vec![
                Instance::new(10, "", BehaviorNode::Logic(branch), 50, 3),
                attack(1),
                attack(2),
            ],
            false,
        )
    }

    #[test]
    fn test_checkpoints_from_branches_and_thresholds() {
        let gated = ActionNode {
            kind: ActionKind::Attack,
            attack: Some(Attack::single(200)),
            gate: ActionGate {
                hp_threshold: Some(20),
                limited_use: None,
            },
        };
        let mut instances = vec![Instance::new(5, "", BehaviorNode::Action(gated), 50, 0)];
        instances.extend(hp_branch_script().instances().cloned());
        let script = Script::new(instances, false);
        assert_eq!(hp_checkpoints(&script), vec![100, 50, 49, 20, 19, 0]);
    }

    #[test]
    fn test_identical_checkpoints_smear_up() {
        let script = Script::new(vec![attack(1)], false);
        let ctx = Context::new(1, 0, 0);
        let actions = consolidate(&ctx, &script, &[100, 50, 0], 20).expect("consolidate");
        assert_eq!(actions[0].repeating[0].group.valid_above, Some(1));
        assert!(actions[1].repeating.is_empty());
        assert!(actions[2].repeating.is_empty());
    }

    #[test]
    fn test_smear_stops_at_difference() {
        let script = hp_branch_script();
        let ctx = Context::new(1, 0, 0);
        let checkpoints = hp_checkpoints(&script);
        assert_eq!(checkpoints, vec![100, 50, 49, 0]);

        let actions = consolidate(&ctx, &script, &checkpoints, 20).expect("consolidate");
        // 100 and 50 attack with 1; 49 and 0 with 2
        assert_eq!(actions[0].repeating[0].group.valid_above, Some(49));
        assert!(actions[1].repeating.is_empty());
        assert_eq!(actions[2].repeating[0].group.skills[0].id, 2);
        assert_eq!(actions[2].repeating[0].group.valid_above, Some(1));
        assert!(actions[3].repeating.is_empty());
    }
}
