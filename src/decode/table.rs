//! Type code → node constructor table
//!
//! Every constructor reads only its own slots. Slot reuse between opcodes is
//! common, so the slot index is spelled out at each read instead of going
//! through named accessors.

use tracing::warn;

use crate::core::types::{Compare, OrbMask};
use crate::decode::bitmap;
use crate::decode::node::{
    self, ActionGate, ActionKind, ActionNode, BehaviorNode, BindSlot, CounterOp, FlagOp,
    LogicNode, MovetimeChange, OrbLine, PassiveKind, PassiveNode, SpawnLine,
};
use crate::decode::opcode::{BehaviorOpcode, SkillRegistry};

/// Skill sets may bundle other skill sets, but only one level is expanded
const MAX_SKILLSET_DEPTH: usize = 1;

/// Type code reserved for the on-board attribute branch
pub const BRANCH_BOARD_ATTRIBUTE: i32 = 132;

/// Decode one opcode. Unknown type codes never fail.
pub fn decode(opcode: &BehaviorOpcode, registry: &SkillRegistry) -> BehaviorNode {
    decode_at_depth(opcode, registry, 0)
}

fn decode_at_depth(op: &BehaviorOpcode, registry: &SkillRegistry, depth: usize) -> BehaviorNode {
    if let Some(logic) = decode_logic(op) {
        return BehaviorNode::Logic(logic);
    }

    // Slot 11 and 13 only carry gates for actions and passives; zero means unset
    let gate = ActionGate {
        hp_threshold: op.nonzero_slot(11),
        limited_use: op.nonzero_slot(13),
    };

    if let Some(kind) = decode_passive(op) {
        return BehaviorNode::Passive(PassiveNode { kind, gate });
    }

    match decode_action(op, registry, depth) {
        Some(mut action) => {
            action.gate = gate;
            BehaviorNode::Action(action)
        }
        None => BehaviorNode::Unknown {
            type_code: op.type_code,
            gate,
        },
    }
}

fn decode_logic(op: &BehaviorOpcode) -> Option<LogicNode> {
    let branch = |cmp| LogicNode::BranchHp {
        cmp,
        value: 0,
        target: 0,
    };
    let counter = |cmp| LogicNode::BranchCounter {
        cmp,
        value: 0,
        target: 0,
    };
    let level = |cmp| LogicNode::BranchLevel {
        cmp,
        value: 0,
        target: 0,
    };
    let flag_op = |op| LogicNode::FlagOperation { op, mask: 0 };
    let set_counter = |op| LogicNode::SetCounter { op, amount: 0 };

    let node = match op.type_code {
        0 | 93 | 136 => LogicNode::Nothing,
        22 => flag_op(FlagOp::Set),
        24 => flag_op(FlagOp::Unset),
        44 => flag_op(FlagOp::Or),
        45 => flag_op(FlagOp::Xor),
        23 => LogicNode::BranchFlag {
            mask: 0,
            target: 0,
            target_offset: 1,
        },
        43 => LogicNode::BranchFlag {
            mask: 0,
            target: 0,
            target_offset: 0,
        },
        25 => set_counter(CounterOp::Assign),
        26 => set_counter(CounterOp::Add),
        27 => set_counter(CounterOp::Subtract),
        28 => branch(Compare::Lt),
        29 => branch(Compare::Ge),
        30 => counter(Compare::Le),
        31 => counter(Compare::Eq),
        32 => counter(Compare::Ge),
        33 => level(Compare::Le),
        34 => level(Compare::Eq),
        35 => level(Compare::Ge),
        36 => LogicNode::EndPath,
        37 => LogicNode::Countdown,
        38 => LogicNode::SetCounterIf {
            counter_is: 0,
            value: 0,
        },
        49 => LogicNode::Preemptive {
            level: op.slot_or(1, 0),
        },
        90 => LogicNode::BranchCard {
            cards: op.present_slots(0, 16).into_iter().filter(|c| *c != 0).collect(),
            target: 0,
        },
        113 => LogicNode::BranchCombo {
            combos: 0,
            target: 0,
        },
        114 => LogicNode::BranchAttackedAttribute {
            attributes: OrbMask(op.slot_or(1, 0)),
            target: 0,
        },
        115 => LogicNode::BranchSkillUse { uses: 0, target: 0 },
        116 => LogicNode::BranchDamage {
            damage: i64::from(op.slot_or(1, 0)),
            target: 0,
        },
        117 => LogicNode::BranchErasedAttribute {
            attributes: OrbMask(op.slot_or(1, 0)),
            target: 0,
        },
        120 => LogicNode::BranchRemainingEnemies { count: 0, target: 0 },
        BRANCH_BOARD_ATTRIBUTE => LogicNode::BranchBoardAttribute {
            attributes: OrbMask(op.slot_or(1, 0)),
            target: 0,
        },
        _ => return None,
    };
    Some(node)
}

fn decode_passive(op: &BehaviorOpcode) -> Option<PassiveKind> {
    let kind = match op.type_code {
        72 => PassiveKind::AttributeResist {
            attributes: OrbMask(op.slot_or(1, 0)),
            percent: op.slot_or(2, 0),
        },
        73 => PassiveKind::Resolve {
            hp_threshold: op.slot_or(1, 0),
        },
        106 => PassiveKind::TurnChange {
            hp_threshold: op.slot_or(1, 0),
            turn_counter: op.slot_or(2, 0),
        },
        118 => PassiveKind::TypeResist {
            types: bitmap::typings(op.slot(1)),
            percent: op.slot_or(2, 0),
        },
        122 => PassiveKind::TurnChangeRemainingEnemies {
            enemy_count: op.slot_or(1, 0),
            turn_counter: op.slot_or(2, 0),
        },
        129 => PassiveKind::SuperResolve {
            hp_threshold: op.slot_or(1, 0),
            hp_remaining: op.slot_or(2, 0),
        },
        _ => return None,
    };
    Some(kind)
}

fn decode_skills(op: &BehaviorOpcode, registry: &SkillRegistry, depth: usize) -> Vec<BehaviorNode> {
    if depth >= MAX_SKILLSET_DEPTH {
        return Vec::new();
    }
    op.present_slots(1, 11)
        .into_iter()
        .filter(|id| *id != 0)
        .map(|id| match registry.get(id) {
            Some(child) => decode_at_depth(child, registry, depth + 1),
            None => {
                warn!(skill_id = op.id, child = id, "skill set references a missing skill");
                BehaviorNode::Unknown {
                    type_code: -1,
                    gate: ActionGate::default(),
                }
            }
        })
        .collect()
}

fn line_spawns(op: &BehaviorOpcode, starts: &[usize]) -> Vec<SpawnLine> {
    starts
        .iter()
        .filter_map(|&i| {
            let positions = op.nonzero_slot(i)?;
            let attributes = op.nonzero_slot(i + 1)?;
            Some(SpawnLine {
                positions: bitmap::positions(positions),
                attributes: OrbMask(attributes),
            })
        })
        .collect()
}

fn decode_action(op: &BehaviorOpcode, registry: &SkillRegistry, depth: usize) -> Option<ActionNode> {
    use ActionKind::*;

    let p = |i| op.slot_or(i, 0);
    // Bind turn ranges: min defaults to 0, max stays optional
    let min_turns = |i| op.slot_or(i, 0);
    let attack_at = |i| node::Attack::from_slot(op.slot(i));
    let rows_from = |start: usize| {
        bitmap::board_rows(&(start..start + bitmap::BOARD_ROWS).map(|i| op.slot(i)).collect::<Vec<_>>())
    };

    // Every action may carry an attack in slot 14 unless it defines its own
    let mut attack = attack_at(14);

    let kind = match op.type_code {
        1 => BindRandom {
            min_turns: min_turns(2),
            max_turns: op.slot(3),
            count: p(1),
        },
        2 => BindAttribute {
            min_turns: min_turns(2),
            max_turns: op.slot(3),
            attribute: p(1),
        },
        3 => BindTyping {
            min_turns: min_turns(2),
            max_turns: op.slot(3),
            typing: p(1),
        },
        4 => OrbChangeSingle {
            from: p(1),
            to: p(2),
        },
        5 | 62 => {
            attack = attack_at(1);
            Blind
        }
        6 => Dispel,
        7 | 86 => RecoverEnemy {
            min_amount: p(1),
            max_amount: p(2),
        },
        8 => StorePower {
            multiplier: p(1).saturating_add(100),
        },
        12 => JammerChangeSingle { from: p(1) },
        13 => JammerChangeRandom { type_count: p(1) },
        14 => BindSkill {
            min_turns: min_turns(1),
            max_turns: op.slot(2),
        },
        15 => {
            attack = Some(node::Attack {
                multiplier: p(3),
                min_hits: p(1),
                max_hits: p(2),
            });
            Attack
        }
        16 | 66 => Inactivity,
        17 => AttackUpRemainingEnemies {
            enemy_count: p(1),
            turns: p(2),
            multiplier: p(3),
        },
        18 => AttackUpStatus {
            turns: p(1),
            multiplier: p(2),
        },
        19 => AttackUpCooldown {
            cooldown: op.slot(1).filter(|c| *c > 1),
            turns: p(2),
            multiplier: p(3),
        },
        20 => StatusShield { turns: p(1) },
        39 => DebuffMovetime {
            turns: p(1),
            change: match op.nonzero_slot(2) {
                Some(tenths) => MovetimeChange::Tenths(-tenths),
                None => MovetimeChange::Percent(p(3)),
            },
        },
        40 => EndBattle,
        46 => {
            let mut attributes = Vec::new();
            for attr in op.present_slots(1, 6) {
                if !attributes.contains(&attr) {
                    attributes.push(attr);
                }
            }
            ChangeAttribute { attributes }
        }
        47 => {
            attack = attack_at(2);
            AttackPreemptive
        }
        48 => {
            attack = attack_at(1);
            OrbChangeAttack {
                from: p(2),
                to: p(3),
            }
        }
        50 => Gravity { percent: p(1) },
        52 => RecoverEnemyAlly { amount: p(1) },
        53 => AbsorbAttribute {
            min_turns: min_turns(1),
            max_turns: op.slot(2),
            attributes: OrbMask(p(3)),
        },
        54 => BindTarget {
            min_turns: min_turns(2),
            max_turns: op.slot(3),
            targets: bitmap::bind_slots(op.slot(1)),
        },
        55 => RecoverPlayer {
            amount: p(1),
            player_hp_threshold: op.slot(2),
        },
        56 => PoisonChangeSingle { from: p(1) },
        57 => PoisonChangeRandom {
            exclude_hearts: op.slot(2) == Some(1),
        },
        60 => PoisonChangeRandomCount {
            count: p(1),
            exclude_hearts: op.slot(2) == Some(1),
        },
        61 => MortalPoisonChangeRandom { count: p(1) },
        63 => {
            attack = attack_at(1);
            let targets = bitmap::bind_slots(op.slot(4));
            // A target count only means something for random binds
            let count = if targets == [BindSlot::Random] {
                op.slot(5)
            } else {
                None
            };
            BindAttack {
                min_turns: min_turns(2),
                max_turns: op.slot(3),
                targets,
                count,
            }
        }
        64 => {
            attack = attack_at(1);
            PoisonChangeRandomAttack { count: p(2) }
        }
        65 => BindRandomSub {
            min_turns: min_turns(2),
            max_turns: op.slot(3),
            count: p(1),
        },
        67 => AbsorbCombo {
            min_turns: min_turns(1),
            max_turns: op.slot(2),
            threshold: p(3),
        },
        68 | 96 => Skyfall {
            attributes: OrbMask(p(1)),
            chance: p(4),
            min_turns: min_turns(2),
            max_turns: op.slot(3),
            locked: op.type_code == 96,
        },
        69 => DeathCry,
        71 => VoidShield {
            turns: p(1),
            threshold: p(3),
        },
        74 => DamageShield {
            turns: p(1),
            percent: p(2),
        },
        75 => LeaderSwap { turns: p(1) },
        76..=79 => {
            let (line, starts): (OrbLine, &[usize]) = match op.type_code {
                76 => (OrbLine::Column, &[1, 3][..]),
                77 => (OrbLine::Column, &[1, 3, 5][..]),
                78 => (OrbLine::Row, &[1, 3][..]),
                _ => (OrbLine::Row, &[1, 3, 5][..]),
            };
            attack = if matches!(op.type_code, 77 | 79) {
                attack_at(7)
            } else {
                None
            };
            LineSpawn {
                line,
                spawns: line_spawns(op, starts),
            }
        }
        81 => {
            attack = attack_at(1);
            let attributes = (2..16)
                .map(|i| op.slot(i))
                .take_while(|v| v.is_some_and(|a| a != -1))
                .flatten()
                .collect();
            BoardChange { attributes }
        }
        82 => {
            attack = Some(node::Attack::single(100));
            Attack
        }
        83 => SkillSet {
            skills: decode_skills(op, registry, depth),
        },
        84 => BoardChange {
            attributes: OrbMask(p(1))
                .attributes()
                .into_iter()
                .map(|a| a.code())
                .collect(),
        },
        85 => {
            attack = attack_at(1);
            BoardChange {
                attributes: OrbMask(p(2))
                    .attributes()
                    .into_iter()
                    .map(|a| a.code())
                    .collect(),
            }
        }
        87 => AbsorbDamage {
            turns: p(1),
            threshold: p(2),
        },
        88 => BindAwoken { turns: p(1) },
        89 => SkillDelay {
            min_turns: min_turns(1),
            max_turns: op.slot(2),
        },
        92 => {
            let required = OrbMask(p(3)).inverse_colors();
            RandomSpawn {
                count: p(1),
                attributes: OrbMask(p(2)),
                // Every color required is the same as no requirement
                required_attributes: if required.len() < 6 {
                    required
                } else {
                    Vec::new()
                },
            }
        }
        94 => OrbLock {
            attributes: OrbMask(p(1)),
            count: p(2),
        },
        95 => SkillSetOnDeath {
            skills: decode_skills(op, registry, depth),
        },
        97 => BlindStickyRandom {
            turns: p(1),
            min_count: p(2),
            max_count: p(3),
        },
        98 => BlindStickyFixed {
            turns: p(1),
            rows: rows_from(2),
        },
        99 | 100 => OrbSeal {
            line: if op.type_code == 99 {
                OrbLine::Column
            } else {
                OrbLine::Row
            },
            positions: bitmap::positions(p(1)),
            turns: p(2),
        },
        101 => FixedStart,
        102 => BombRandomSpawn {
            count: p(2),
            locked: op.slot(8) == Some(1),
        },
        103 => BombFixedSpawn {
            rows: rows_from(2),
            locked: op.slot(8) == Some(1),
        },
        104 => Cloud {
            turns: p(1),
            width: p(2),
            height: p(3),
            origin_y: p(4),
            origin_x: p(5),
        },
        105 => DebuffRcv {
            turns: p(1),
            amount: p(2),
        },
        107 => AttributeBlock {
            turns: p(1),
            attributes: OrbMask(p(2)),
        },
        108 => {
            attack = attack_at(1);
            OrbChangeAttackBits {
                from: OrbMask(p(2)),
                to: OrbMask(p(3)),
            }
        }
        109 => SpinnersRandom {
            turns: p(1),
            speed: p(2),
            count: p(3),
        },
        110 => SpinnersFixed {
            turns: p(1),
            speed: p(2),
            rows: rows_from(3),
        },
        111 => match (op.slot(1), op.slot(2)) {
            (Some(percent), _) => MaxHpChange {
                turns: p(3),
                amount: percent,
                percent: true,
            },
            (None, flat) => MaxHpChange {
                turns: p(3),
                amount: flat.unwrap_or(0),
                percent: false,
            },
        },
        112 => FixedTarget { turns: p(1) },
        119 | 123 => InvulnerableOn { turns: p(1) },
        121 => InvulnerableOff,
        124 => GachaFever {
            attribute: p(1),
            orbs_required: p(2),
        },
        125 => LeaderAlter {
            turns: p(1),
            target_card: p(2),
        },
        126 => BoardSizeChange {
            turns: p(1),
            size: p(2),
        },
        127 => NoSkyfall { turns: p(2) },
        128 => BlindStickySkyfall {
            turns: p(1),
            chance: p(2),
            blind_turns: p(13),
        },
        130 => DebuffAtk {
            turns: p(1),
            amount: p(2),
        },
        131 => ComboSkyfall {
            turns: p(2),
            chance: p(3),
        },
        // 9 and 21 are known placeholders with no meaning
        _ => return None,
    };

    Some(ActionNode::new(kind).with_attack(attack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::node::{Attack, Behavior};

    fn decode_one(op: BehaviorOpcode) -> BehaviorNode {
        decode(&op, &SkillRegistry::new())
    }

    #[test]
    fn test_unknown_type_code_is_not_an_error() {
        let node = decode_one(BehaviorOpcode::new(1, 999));
        assert!(matches!(node, BehaviorNode::Unknown { type_code: 999, .. }));
        let placeholder = decode_one(BehaviorOpcode::new(2, 9));
        assert!(matches!(placeholder, BehaviorNode::Unknown { type_code: 9, .. }));
    }

    #[test]
    fn test_store_power_saturates() {
        let node = decode_one(BehaviorOpcode::new(1, 8).with_slot(1, i32::MAX));
        let action = node.action().expect("action");
        assert_eq!(action.kind, ActionKind::StorePower { multiplier: i32::MAX });

        let node = decode_one(BehaviorOpcode::new(2, 8).with_slot(1, 50));
        let action = node.action().expect("action");
        assert_eq!(action.kind, ActionKind::StorePower { multiplier: 150 });
    }

    #[test]
    fn test_multihit_attack_slots() {
        let node = decode_one(
            BehaviorOpcode::new(1, 15)
                .with_slot(1, 2)
                .with_slot(2, 3)
                .with_slot(3, 80),
        );
        let action = node.action().expect("action");
        assert_eq!(
            action.attack,
            Some(Attack {
                multiplier: 80,
                min_hits: 2,
                max_hits: 3
            })
        );
    }

    #[test]
    fn test_default_attack_from_slot_14() {
        let node = decode_one(BehaviorOpcode::new(1, 20).with_slot(1, 3).with_slot(14, 120));
        let action = node.action().expect("action");
        assert_eq!(action.kind, ActionKind::StatusShield { turns: 3 });
        assert_eq!(action.attack, Some(Attack::single(120)));
    }

    #[test]
    fn test_gate_slots() {
        let node = decode_one(BehaviorOpcode::new(1, 6).with_slot(11, 50).with_slot(13, 1));
        assert_eq!(
            node.gate(),
            Some(ActionGate {
                hp_threshold: Some(50),
                limited_use: Some(1)
            })
        );
        let logic = decode_one(BehaviorOpcode::new(2, 36).with_slot(11, 50));
        assert_eq!(logic.gate(), None);
    }

    #[test]
    fn test_cooldown_enrage_ignores_short_cooldowns() {
        let node = decode_one(
            BehaviorOpcode::new(1, 19)
                .with_slot(1, 1)
                .with_slot(2, 2)
                .with_slot(3, 150),
        );
        assert_eq!(
            node.action().map(|a| a.kind.clone()),
            Some(ActionKind::AttackUpCooldown {
                cooldown: None,
                turns: 2,
                multiplier: 150
            })
        );
    }

    #[test]
    fn test_flat_board_change_stops_at_terminator() {
        let node = decode_one(
            BehaviorOpcode::new(1, 81)
                .with_slot(1, 100)
                .with_slot(2, 0)
                .with_slot(3, 1)
                .with_slot(4, -1)
                .with_slot(5, 4),
        );
        let action = node.action().expect("action");
        assert_eq!(action.kind, ActionKind::BoardChange { attributes: vec![0, 1] });
        assert_eq!(action.attack, Some(Attack::single(100)));
    }

    #[test]
    fn test_random_spawn_requirement() {
        // slot 3 lists colors that must *not* be missing
        let node = decode_one(
            BehaviorOpcode::new(1, 92)
                .with_slot(1, 3)
                .with_slot(2, 1)
                .with_slot(3, 0b11_1110),
        );
        let action = node.action().expect("action");
        assert!(action.is_conditional());
        assert_eq!(
            action.required_attributes(),
            Some(&[crate::core::types::Attribute::Fire][..])
        );

        let unconditional = decode_one(
            BehaviorOpcode::new(1, 92)
                .with_slot(1, 3)
                .with_slot(2, 1)
                .with_slot(3, 0),
        );
        assert!(!unconditional.is_conditional());
    }

    #[test]
    fn test_line_spawn_skips_empty_pairs() {
        let node = decode_one(
            BehaviorOpcode::new(1, 77)
                .with_slot(1, 0b1)
                .with_slot(2, 1)
                .with_slot(3, 0)
                .with_slot(4, 2)
                .with_slot(5, 0b100000)
                .with_slot(6, 4)
                .with_slot(7, 90),
        );
        let action = node.action().expect("action");
        match &action.kind {
            ActionKind::LineSpawn { line, spawns } => {
                assert_eq!(*line, OrbLine::Column);
                assert_eq!(spawns.len(), 2);
                assert_eq!(spawns[1].positions, vec![6]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(action.attack, Some(Attack::single(90)));
    }

    #[test]
    fn test_bind_attack_count_only_for_random() {
        let node = decode_one(
            BehaviorOpcode::new(1, 63)
                .with_slot(1, 100)
                .with_slot(2, 1)
                .with_slot(3, 3)
                .with_slot(4, 0b100)
                .with_slot(5, 2),
        );
        match node.action().map(|a| a.kind.clone()) {
            Some(ActionKind::BindAttack { targets, count, .. }) => {
                assert_eq!(targets, vec![BindSlot::Subs]);
                assert_eq!(count, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_skillset_resolves_children_through_registry() {
        let registry = SkillRegistry::from_opcodes([
            BehaviorOpcode::new(10, 6),
            BehaviorOpcode::new(11, 40),
        ]);
        let set = BehaviorOpcode::new(1, 83).with_slot(1, 10).with_slot(2, 11);
        let node = decode(&set, &registry);
        assert!(node.ends_battle());
        match node.action().map(|a| &a.kind) {
            Some(ActionKind::SkillSet { skills }) => assert_eq!(skills.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_child_decodes_as_unknown() {
        let set = BehaviorOpcode::new(1, 95).with_slot(1, 77);
        let node = decode_one(set);
        assert!(node.is_death_action());
        match node.action().map(|a| &a.kind) {
            Some(ActionKind::SkillSetOnDeath { skills }) => {
                assert!(matches!(skills[0], BehaviorNode::Unknown { .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_branch_card_collects_present_cards() {
        let node = decode_one(
            BehaviorOpcode::new(1, 90)
                .with_slot(1, 1234)
                .with_slot(2, 5678),
        );
        assert_eq!(
            node.logic(),
            Some(&LogicNode::BranchCard {
                cards: vec![1234, 5678],
                target: 0
            })
        );
    }

    #[test]
    fn test_level_branch_operators() {
        for (code, cmp) in [(33, Compare::Le), (34, Compare::Eq), (35, Compare::Ge)] {
            let node = decode_one(BehaviorOpcode::new(1, code));
            assert_eq!(
                node.logic(),
                Some(&LogicNode::BranchLevel {
                    cmp,
                    value: 0,
                    target: 0
                })
            );
        }
    }

    #[test]
    fn test_passive_family() {
        let node = decode_one(BehaviorOpcode::new(1, 73).with_slot(1, 50));
        assert!(node.is_passive());
    }
}
