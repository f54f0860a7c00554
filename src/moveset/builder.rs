//! End-to-end pipeline for one monster
//!
//! Decode → split off passives and death actions → preemptive pass → HP
//! consolidation → enemies-remaining sweep.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::core::error::Result;
use crate::decode::node::{Behavior, LogicNode};
use crate::decode::opcode::SkillRegistry;
use crate::moveset::consolidate::{consolidate, hp_checkpoints};
use crate::moveset::groups::{EnemyRemainingMoveset, Moveset, ProcessedSkillset};
use crate::script::{CardMeta, Script, ScriptEntry};
use crate::vm::constants::{sweep_counts, EXTENDED_TURN_HORIZON, TURN_HORIZON};
use crate::vm::context::Context;
use crate::vm::explorer::explore;

/// Levels worth simulating: 1, plus every level a branch or preemptive
/// marker checks
pub fn script_levels(script: &Script) -> BTreeSet<i32> {
    let mut levels = BTreeSet::from([1]);
    for inst in script.instances() {
        match inst.node.logic() {
            Some(LogicNode::BranchLevel { value, .. }) => {
                levels.insert(*value);
            }
            Some(LogicNode::Preemptive { level }) => {
                levels.insert(*level);
            }
            _ => {}
        }
    }
    levels
}

/// Does any behavior depend on how many enemies are alive
pub fn references_remaining_enemies(script: &Script) -> bool {
    script.instances().any(|inst| {
        matches!(
            inst.node.logic(),
            Some(LogicNode::BranchRemainingEnemies { .. })
        ) || inst
            .condition
            .as_ref()
            .is_some_and(|c| c.enemies_remaining.is_some())
    })
}

pub struct SkillsetBuilder<'a> {
    registry: &'a SkillRegistry,
    card: CardMeta,
}

impl<'a> SkillsetBuilder<'a> {
    pub fn new(registry: &'a SkillRegistry, card: CardMeta) -> Self {
        Self { registry, card }
    }

    pub fn card(&self) -> &CardMeta {
        &self.card
    }

    pub fn decode_script(&self, entries: &[ScriptEntry]) -> Result<Script> {
        Script::from_entries(entries, self.registry, &self.card)
    }

    /// Process the script at the card's level
    pub fn build(&self, entries: &[ScriptEntry]) -> Result<ProcessedSkillset> {
        let script = self.decode_script(entries)?;
        self.build_script(&script)
    }

    /// Process the script once per level it distinguishes
    pub fn build_levels(&self, entries: &[ScriptEntry]) -> Result<Vec<ProcessedSkillset>> {
        let script = self.decode_script(entries)?;
        script_levels(&script)
            .into_iter()
            .map(|level| {
                SkillsetBuilder::new(self.registry, self.card.at_level(level)).build_script(&script)
            })
            .collect()
    }

    pub fn build_script(&self, script: &Script) -> Result<ProcessedSkillset> {
        let mut skillset = ProcessedSkillset::new(self.card.level);
        skillset.use_new_skill_ai = self.card.use_new_skill_ai;

        let (script, base_abilities) = script.partition(|i| i.node.is_passive());
        let (script, death_actions) = script.partition(|i| i.node.is_death_action());
        skillset.base_abilities = base_abilities;
        skillset.death_actions = death_actions;

        let checkpoints = hp_checkpoints(&script);
        let horizon = if self.card.long_search {
            EXTENDED_TURN_HORIZON
        } else {
            TURN_HORIZON
        };
        let sweep = !self.card.force_one_enemy && references_remaining_enemies(&script);

        let mut ctx = Context::for_card(&self.card);
        let mut preemptive_ctx = ctx.clone();
        let preemptives = explore(&mut preemptive_ctx, &script);
        if preemptive_ctx.is_preemptive && preemptive_ctx.do_preemptive {
            ctx = preemptive_ctx;
            let ends_battle = preemptives.iter().any(|p| p.node.ends_battle());
            skillset.preemptives = preemptives;
            if ends_battle {
                debug!(level = self.card.level, "preemptive ends the battle");
                return Ok(skillset);
            }
        }

        let hp_actions = consolidate(&ctx, &script, &checkpoints, horizon)?;
        skillset.moveset = Moveset::from_hp_actions(hp_actions);

        if sweep {
            skillset.enemy_remaining_movesets =
                self.enemy_sweep(&ctx, &script, &checkpoints, horizon, &skillset.moveset)?;
        }

        info!(
            level = self.card.level,
            checkpoints = checkpoints.len(),
            hp_actions = skillset.moveset.hp_actions.len(),
            enemy_movesets = skillset.enemy_remaining_movesets.len(),
            "skillset built"
        );
        Ok(skillset)
    }

    /// Movesets for 6..1 enemies, each reduced to what differs from the
    /// baseline and from every larger count
    fn enemy_sweep(
        &self,
        ctx: &Context,
        script: &Script,
        checkpoints: &[i32],
        horizon: usize,
        baseline: &Moveset,
    ) -> Result<Vec<EnemyRemainingMoveset>> {
        let mut movesets = sweep_counts()
            .map(|count| {
                let mut enemy_ctx = ctx.clone();
                enemy_ctx.enemies = count;
                let hp_actions = consolidate(&enemy_ctx, script, checkpoints, horizon)?;
                Ok(EnemyRemainingMoveset {
                    count,
                    moveset: Moveset::from_hp_actions(hp_actions),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for earlier_idx in 0..=movesets.len() {
            let (head, tail) = movesets.split_at_mut(earlier_idx);
            let earlier = match earlier_idx.checked_sub(1) {
                Some(idx) => &head[idx].moveset,
                None => baseline,
            };
            for later in tail {
                later.moveset.remove_shared(earlier);
            }
        }

        for enemy in &mut movesets {
            enemy.moveset.hp_actions.retain(|a| !a.is_empty());
        }
        movesets.retain(|enemy| !enemy.moveset.hp_actions.is_empty());
        debug!(kept = movesets.len(), "enemies-remaining sweep");
        Ok(movesets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::opcode::BehaviorOpcode;

    fn registry() -> SkillRegistry {
        SkillRegistry::from_opcodes([
            // 15: attack, slot 1/2 hits, slot 3 multiplier
            BehaviorOpcode::new(1, 15)
                .with_slot(1, 1)
                .with_slot(2, 1)
                .with_slot(3, 100),
            BehaviorOpcode::new(2, 15)
                .with_slot(1, 1)
                .with_slot(2, 1)
                .with_slot(3, 300),
            // 72: attribute resist passive
            BehaviorOpcode::new(3, 72).with_slot(1, 1).with_slot(2, 50),
            // 69: death cry
            BehaviorOpcode::new(4, 69),
            // 49: preemptive marker at level 1
            BehaviorOpcode::new(5, 49).with_slot(1, 1),
            // 33: branch if level <= value
            BehaviorOpcode::new(6, 33),
            // 40: end battle
            BehaviorOpcode::new(7, 40),
        ])
    }

    #[test]
    fn test_passives_and_death_actions_extracted() {
        let registry = registry();
        let builder = SkillsetBuilder::new(&registry, CardMeta::default());
        let skillset = builder
            .build(&[
                ScriptEntry::new(3, 0, 0),
                ScriptEntry::new(4, 0, 0),
                ScriptEntry::new(1, 0, 0),
            ])
            .expect("build");
        assert_eq!(skillset.base_abilities.len(), 1);
        assert_eq!(skillset.death_actions.len(), 1);
        assert_eq!(skillset.moveset.hp_actions.len(), 1);
        assert_eq!(skillset.moveset.hp_actions[0].repeating[0].group.skills[0].id, 1);
    }

    #[test]
    fn test_preemptive_pass() {
        let registry = registry();
        let builder = SkillsetBuilder::new(&registry, CardMeta::default());
        let skillset = builder
            .build(&[ScriptEntry::new(5, 0, 0), ScriptEntry::new(2, 0, 0)])
            .expect("build");
        assert_eq!(skillset.preemptives.len(), 1);
        assert_eq!(skillset.preemptives[0].id, 2);
    }

    #[test]
    fn test_preemptive_end_battle_stops_early() {
        let registry = registry();
        let builder = SkillsetBuilder::new(&registry, CardMeta::default());
        let skillset = builder
            .build(&[ScriptEntry::new(5, 0, 0), ScriptEntry::new(7, 0, 0)])
            .expect("build");
        assert_eq!(skillset.preemptives[0].id, 7);
        assert!(skillset.moveset.is_empty());
    }

    #[test]
    fn test_levels_discovered() {
        let registry = registry();
        let builder = SkillsetBuilder::new(&registry, CardMeta::default());
        let script = builder
            .decode_script(&[
                ScriptEntry::new(6, 10, 3),
                ScriptEntry::new(1, 0, 0),
                ScriptEntry::new(2, 0, 0),
            ])
            .expect("decode");
        assert_eq!(script_levels(&script), BTreeSet::from([1, 10]));

        let per_level = builder
            .build_levels(&[
                ScriptEntry::new(6, 10, 3),
                ScriptEntry::new(1, 0, 0),
                ScriptEntry::new(2, 0, 0),
            ])
            .expect("build");
        assert_eq!(per_level.len(), 2);
        assert_eq!(per_level[0].level, 1);
        assert_eq!(per_level[1].level, 10);
    }

    #[test]
    fn test_missing_skill_propagates() {
        let registry = registry();
        let builder = SkillsetBuilder::new(&registry, CardMeta::default());
        assert!(builder.build(&[ScriptEntry::new(999, 0, 0)]).is_err());
    }
}
