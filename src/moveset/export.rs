//! Flat, labeled view of a processed skillset for persistence

use serde::Serialize;

use crate::core::types::SkillId;
use crate::decode::node::{ActionKind, Behavior};
use crate::moveset::groups::{HpActions, Moveset, ProcessedSkillset, TimedSkillGroup};
use crate::script::Instance;
use crate::vm::constants::FULL_HP;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupLabel {
    Passive,
    Preempt,
    Death,
    Standard,
    Remaining,
    DispelPlayer,
    MonsterStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillRecord {
    pub skill_id: SkillId,
    pub name: String,
    pub description: String,
    pub min_atk_pct: Option<i32>,
    pub max_atk_pct: Option<i32>,
    pub usage_pct: i32,
    pub limited_use: Option<i32>,
}

impl SkillRecord {
    fn new(inst: &Instance, hp: i32) -> Self {
        let attack = inst.node.action().and_then(|a| a.attack);
        Self {
            skill_id: inst.id,
            name: inst.name.clone(),
            description: inst.node.description(),
            min_atk_pct: attack.map(|a| a.min_damage_pct()),
            max_atk_pct: attack.map(|a| a.max_damage_pct()),
            usage_pct: inst.use_chance(hp).unwrap_or(100),
            limited_use: inst.condition.as_ref().and_then(|c| c.limited_use),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledGroup {
    pub label: GroupLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemies_remaining: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_above: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<usize>,
    pub skills: Vec<SkillRecord>,
}

impl LabeledGroup {
    fn new(label: GroupLabel, skills: Vec<SkillRecord>) -> Self {
        Self {
            label,
            enemies_remaining: None,
            hp: None,
            valid_above: None,
            turn: None,
            end_turn: None,
            interval: None,
            skills,
        }
    }

    fn timed(label: GroupLabel, group: &TimedSkillGroup) -> Self {
        Self {
            hp: Some(group.hp),
            valid_above: group.valid_above,
            turn: Some(group.turn),
            end_turn: group.end_turn,
            ..Self::new(
                label,
                group.skills.iter().map(|s| SkillRecord::new(s, group.hp)).collect(),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelBehavior {
    pub level: i32,
    pub use_new_skill_ai: bool,
    pub groups: Vec<LabeledGroup>,
}

fn records(skills: &[Instance], hp: i32) -> Vec<SkillRecord> {
    skills.iter().map(|s| SkillRecord::new(s, hp)).collect()
}

fn flatten_moveset(
    moveset: &Moveset,
    label: GroupLabel,
    enemies_remaining: Option<i32>,
    groups: &mut Vec<LabeledGroup>,
) {
    let start = groups.len();
    if let Some(status) = &moveset.status_action {
        groups.push(LabeledGroup::new(
            GroupLabel::MonsterStatus,
            records(std::slice::from_ref(status), FULL_HP),
        ));
    }
    if let Some(dispel) = &moveset.dispel_action {
        groups.push(LabeledGroup::new(
            GroupLabel::DispelPlayer,
            records(std::slice::from_ref(dispel), FULL_HP),
        ));
    }
    for hp_action in &moveset.hp_actions {
        for timed in &hp_action.timed {
            groups.push(LabeledGroup::timed(label, timed));
        }
        for repeat in &hp_action.repeating {
            groups.push(LabeledGroup {
                interval: Some(repeat.interval),
                ..LabeledGroup::timed(label, &repeat.group)
            });
        }
    }
    for group in &mut groups[start..] {
        group.enemies_remaining = enemies_remaining;
    }
}

/// Flatten one level's skillset into labeled groups
pub fn flatten(skillset: &ProcessedSkillset) -> LevelBehavior {
    let mut groups = Vec::new();

    if !skillset.base_abilities.is_empty() {
        groups.push(LabeledGroup::new(
            GroupLabel::Passive,
            records(&skillset.base_abilities, FULL_HP),
        ));
    }
    if !skillset.preemptives.is_empty() {
        groups.push(LabeledGroup::new(
            GroupLabel::Preempt,
            records(&skillset.preemptives, FULL_HP),
        ));
    }

    flatten_moveset(&skillset.moveset, GroupLabel::Standard, None, &mut groups);
    for enemy in &skillset.enemy_remaining_movesets {
        flatten_moveset(
            &enemy.moveset,
            GroupLabel::Remaining,
            Some(enemy.count),
            &mut groups,
        );
    }

    // Plain death cries carry nothing worth persisting
    let death: Vec<SkillRecord> = skillset
        .death_actions
        .iter()
        .filter(|d| {
            matches!(
                d.node.action().map(|a| &a.kind),
                Some(ActionKind::SkillSetOnDeath { skills }) if !skills.is_empty()
            )
        })
        .map(|d| SkillRecord::new(d, 0))
        .collect();
    if !death.is_empty() {
        groups.push(LabeledGroup::new(GroupLabel::Death, death));
    }

    LevelBehavior {
        level: skillset.level,
        use_new_skill_ai: skillset.use_new_skill_ai,
        groups,
    }
}

/// Fold a lone one-enemy moveset made only of first-turn actions into the
/// standard moveset
///
/// Many monsters only enrage when they are the last one standing; this
/// keeps that out of its own section. Merged skills are tagged with the
/// enemy count on their condition. Returns whether anything was merged.
pub fn merge_simple_enemy_remaining(skillset: &mut ProcessedSkillset) -> bool {
    let [enemy] = &skillset.enemy_remaining_movesets[..] else {
        return false;
    };
    let simple = enemy.count == 1
        && enemy
            .moveset
            .hp_actions
            .iter()
            .all(|a| a.repeating.is_empty() && a.timed.len() == 1);
    if !simple {
        return false;
    }

    let Some(enemy) = skillset.enemy_remaining_movesets.pop() else {
        return false;
    };
    let hp_actions = &mut skillset.moveset.hp_actions;
    for action in enemy.moveset.hp_actions {
        let bucket = match hp_actions.iter().position(|a| a.hp == action.hp) {
            Some(idx) => idx,
            None => {
                hp_actions.push(HpActions {
                    hp: action.hp,
                    timed: Vec::new(),
                    repeating: Vec::new(),
                });
                hp_actions.sort_by(|a, b| b.hp.cmp(&a.hp));
                hp_actions
                    .iter()
                    .position(|a| a.hp == action.hp)
                    .unwrap_or_default()
            }
        };
        let target = &mut hp_actions[bucket];
        if target.timed.first().map_or(true, |t| t.turn != 1) {
            target.timed.insert(0, TimedSkillGroup::new(1, action.hp, Vec::new()));
        }

        let first_turn = &mut target.timed[0].skills;
        for (idx, mut skill) in action.timed.into_iter().flat_map(|t| t.skills).enumerate() {
            skill.condition_mut().enemies_remaining = Some(enemy.count);
            first_turn.insert(idx, skill);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::node::{ActionNode, Attack, BehaviorNode};
    use crate::moveset::groups::{EnemyRemainingMoveset, RepeatSkillGroup};

    fn skill(id: i32) -> Instance {
        let node = ActionNode::new(ActionKind::Attack).with_attack(Some(Attack {
            multiplier: 50,
            min_hits: 2,
            max_hits: 3,
        }));
        Instance::new(id, format!("skill {}", id), BehaviorNode::Action(node), 0, 0)
    }

    fn skillset() -> ProcessedSkillset {
        let mut skillset = ProcessedSkillset::new(1);
        skillset.moveset = Moveset::from_hp_actions(vec![HpActions {
            hp: 100,
            timed: vec![],
            repeating: vec![RepeatSkillGroup::new(1, 1, 100, vec![skill(1)])],
        }]);
        skillset
    }

    #[test]
    fn test_flatten_standard_groups() {
        let listing = flatten(&skillset());
        assert_eq!(listing.groups.len(), 1);
        let group = &listing.groups[0];
        assert_eq!(group.label, GroupLabel::Standard);
        assert_eq!(group.interval, Some(1));
        assert_eq!(group.skills[0].min_atk_pct, Some(100));
        assert_eq!(group.skills[0].max_atk_pct, Some(150));
        assert_eq!(group.skills[0].usage_pct, 100);
    }

    #[test]
    fn test_remaining_groups_carry_count() {
        let mut skillset = skillset();
        skillset.enemy_remaining_movesets.push(EnemyRemainingMoveset {
            count: 2,
            moveset: Moveset::from_hp_actions(vec![HpActions {
                hp: 100,
                timed: vec![],
                repeating: vec![RepeatSkillGroup::new(1, 1, 100, vec![skill(2)])],
            }]),
        });
        let listing = flatten(&skillset);
        assert_eq!(listing.groups[1].label, GroupLabel::Remaining);
        assert_eq!(listing.groups[1].enemies_remaining, Some(2));
    }

    #[test]
    fn test_merge_one_enemy_first_turn() {
        let mut skillset = skillset();
        skillset.enemy_remaining_movesets.push(EnemyRemainingMoveset {
            count: 1,
            moveset: Moveset::from_hp_actions(vec![HpActions {
                hp: 50,
                timed: vec![TimedSkillGroup::new(1, 50, vec![skill(3)])],
                repeating: vec![],
            }]),
        });
        assert!(merge_simple_enemy_remaining(&mut skillset));
        assert!(skillset.enemy_remaining_movesets.is_empty());

        let hps: Vec<i32> = skillset.moveset.hp_actions.iter().map(|a| a.hp).collect();
        assert_eq!(hps, vec![100, 50]);
        let merged = &skillset.moveset.hp_actions[1].timed[0].skills[0];
        assert_eq!(merged.id, 3);
        assert_eq!(
            merged.condition.as_ref().and_then(|c| c.enemies_remaining),
            Some(1)
        );
    }

    #[test]
    fn test_repeating_remaining_moveset_not_merged() {
        let mut skillset = skillset();
        skillset.enemy_remaining_movesets.push(EnemyRemainingMoveset {
            count: 1,
            moveset: Moveset::from_hp_actions(vec![HpActions {
                hp: 100,
                timed: vec![],
                repeating: vec![RepeatSkillGroup::new(1, 1, 100, vec![skill(3)])],
            }]),
        });
        assert!(!merge_simple_enemy_remaining(&mut skillset));
        assert_eq!(skillset.enemy_remaining_movesets.len(), 1);
    }
}
