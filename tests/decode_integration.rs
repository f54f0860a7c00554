//! Decoding integration tests: raw records through registry, instances and scripts

use enemy_skillset::core::types::Compare;
use enemy_skillset::decode::{
    decode, ActionKind, Behavior, BehaviorNode, BehaviorOpcode, LogicNode, SkillRegistry,
};
use enemy_skillset::script::{CardMeta, Instance, Script, ScriptEntry, ScriptFile};

fn sample() -> ScriptFile {
    serde_json::from_str(include_str!("../data/sample_scripts.json")).expect("sample parses")
}

#[test]
fn test_sample_file_loads_into_registry() {
    let file = sample();
    let registry = SkillRegistry::from_opcodes(file.skills.clone());
    assert_eq!(registry.len(), file.skills.len());
    for monster in &file.monsters {
        for entry in &monster.entries {
            assert!(registry.contains(entry.skill_id), "skill {}", entry.skill_id);
        }
    }
}

#[test]
fn test_branch_operands_patched_from_entry() {
    let registry = SkillRegistry::from_opcodes(sample().skills);
    let inst = Instance::from_entry(&ScriptEntry::new(3, 50, 4), &registry, &CardMeta::default())
        .expect("known skill");
    assert_eq!(
        inst.node.logic(),
        Some(&LogicNode::BranchHp {
            cmp: Compare::Lt,
            value: 50,
            target: 4
        })
    );
    assert!(inst.condition.is_none());
}

#[test]
fn test_remaining_enemies_enrage_is_certain() {
    let registry = SkillRegistry::from_opcodes(sample().skills);
    let inst = Instance::from_entry(&ScriptEntry::new(5, 0, 0), &registry, &CardMeta::default())
        .expect("known skill");
    let condition = inst.condition.expect("enemy count needs a gate");
    assert_eq!(condition.enemies_remaining, Some(1));
    assert_eq!(condition.use_chance(100), 100);
}

#[test]
fn test_gated_attack_chance() {
    let registry = SkillRegistry::from_opcodes(sample().skills);
    let inst = Instance::from_entry(&ScriptEntry::new(1, 0, 25), &registry, &CardMeta::default())
        .expect("known skill");
    assert_eq!(inst.use_chance(100), Some(25));
    assert!(inst.description().starts_with("25% chance"));
}

#[test]
fn test_script_keeps_absolute_targets() {
    let file = sample();
    let registry = SkillRegistry::from_opcodes(file.skills);
    let monster = &file.monsters[1];

    let script = Script::from_entries(&monster.entries, &registry, &monster.card).expect("decodes");
    assert!(script.get(0).is_none());
    assert_eq!(script.get(3).map(|i| i.id), Some(1));

    let (rest, passives) = script.partition(|i| i.node.is_passive());
    assert_eq!(passives.len(), 1);
    assert!(rest.get(1).is_none());
    assert_eq!(rest.get(4).map(|i| i.id), Some(2));
}

#[test]
fn test_zero_indexed_script_has_no_sentinel() {
    let registry = SkillRegistry::from_opcodes(sample().skills);
    let entries = [ScriptEntry::new(1, 0, 0), ScriptEntry::new(2, 0, 0)];
    let script = Script::from_entries(
        &entries,
        &registry,
        &CardMeta {
            zero_indexed: true,
            ..CardMeta::default()
        },
    ).expect("decodes");
    assert_eq!(script.get(0).map(|i| i.id), Some(1));
    assert_eq!(script.len(), 2);
}

#[test]
fn test_nested_skill_sets_expand_once() {
    let registry = SkillRegistry::from_opcodes([
        BehaviorOpcode::new(10, 15)
            .with_slot(1, 1)
            .with_slot(2, 1)
            .with_slot(3, 100),
        BehaviorOpcode::new(11, 83).with_slot(1, 10),
        BehaviorOpcode::new(12, 83).with_slot(1, 11).with_slot(2, 10),
    ]);
    let node = decode(registry.get(12).expect("registered"), &registry);
    let Some(ActionKind::SkillSet { skills }) = node.action().map(|a| &a.kind) else {
        panic!("expected a skill set, got {:?}", node);
    };
    assert_eq!(skills.len(), 2);
    match &skills[0] {
        BehaviorNode::Action(inner) => {
            assert_eq!(inner.kind, ActionKind::SkillSet { skills: vec![] })
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!node.description().is_empty());
}
