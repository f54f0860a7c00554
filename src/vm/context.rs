//! Simulation registers
//!
//! A [`Context`] is one hypothetical game state. It is a plain value: branch
//! exploration and per-checkpoint simulation clone it freely.

use ahash::AHashSet;

use crate::core::types::OrbMask;
use crate::decode::node::{BehaviorNode, Effect, EffectKind};
use crate::script::card::CardMeta;
use crate::script::condition::Condition;
use crate::vm::constants::{DEFAULT_ENEMY_COUNT, FULL_HP};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub turn: i32,
    /// A preemptive marker or attack was reached this turn
    pub is_preemptive: bool,
    /// The preemptive is allowed at the simulated level
    pub do_preemptive: bool,
    pub flags: i64,
    pub counter: i32,
    pub hp: i32,
    pub level: i32,
    pub enemies: i32,
    pub cards: AHashSet<i32>,
    /// Last-round values probed by branch exploration
    pub combos: i32,
    pub erased: OrbMask,
    pub on_board: OrbMask,
    pub damage: i64,
    pub attacked: OrbMask,
    pub skills_used: i32,
    /// `None` until the first enrage; negative while an enrage cooldown runs
    pub enraged: Option<i32>,
    timers: [i32; EffectKind::COUNT],
    pub skill_counter: i32,
    pub skill_counter_max: i32,
    pub skill_counter_increment: i32,
    /// Preemptive markers already used; never revisited
    consumed: AHashSet<usize>,
}

impl Context {
    pub fn new(level: i32, skill_counter_max: i32, skill_counter_increment: i32) -> Self {
        Self {
            turn: 1,
            is_preemptive: false,
            do_preemptive: false,
            flags: 0,
            counter: 0,
            hp: FULL_HP,
            level,
            enemies: DEFAULT_ENEMY_COUNT,
            cards: AHashSet::new(),
            combos: 0,
            erased: OrbMask::default(),
            on_board: OrbMask::default(),
            damage: 0,
            attacked: OrbMask::default(),
            skills_used: 0,
            enraged: None,
            timers: [0; EffectKind::COUNT],
            skill_counter: skill_counter_max,
            skill_counter_max,
            skill_counter_increment,
            consumed: AHashSet::new(),
        }
    }

    pub fn for_card(card: &CardMeta) -> Self {
        let mut ctx = Self::new(
            card.level,
            card.skill_counter_max,
            card.skill_counter_increment,
        );
        if card.force_one_enemy {
            ctx.enemies = 1;
        }
        ctx
    }

    /// Clear per-turn markers before a scan
    pub fn reset_turn(&mut self) {
        self.is_preemptive = false;
    }

    pub fn timer(&self, kind: EffectKind) -> i32 {
        self.timers[kind.index()]
    }

    pub fn is_enraged(&self) -> bool {
        self.enraged.unwrap_or(0) > 0
    }

    pub fn consume(&mut self, idx: usize) {
        self.consumed.insert(idx);
    }

    pub fn is_consumed(&self, idx: usize) -> bool {
        self.consumed.contains(&idx)
    }

    /// Try to start the effect `node` carries
    ///
    /// Returns false, leaving the registers untouched except for arming an
    /// enrage cooldown, when the effect may not start now. Nodes without a
    /// tracked effect always succeed.
    pub fn apply_effect(&mut self, node: &BehaviorNode) -> bool {
        match node.effect() {
            None => true,
            Some(Effect::Enrage {
                turns,
                cooldown,
                max_enemies,
            }) => {
                if max_enemies.is_some_and(|max| self.enemies > max) {
                    return false;
                }
                match (self.enraged, cooldown) {
                    (None, Some(cooldown)) => {
                        self.enraged = Some(1 - cooldown);
                        false
                    }
                    (None, None) | (Some(0), _) => {
                        self.enraged = Some(turns);
                        true
                    }
                    _ => false,
                }
            }
            Some(Effect::Timed { kind, turns }) => {
                let timer = &mut self.timers[kind.index()];
                if *timer != 0 {
                    return false;
                }
                *timer = turns.max(0);
                true
            }
        }
    }

    /// Same answer as [`Context::apply_effect`] without touching anything
    pub fn can_apply_effect(&self, node: &BehaviorNode) -> bool {
        match node.effect() {
            None => true,
            Some(Effect::Enrage {
                cooldown,
                max_enemies,
                ..
            }) => {
                if max_enemies.is_some_and(|max| self.enemies > max) {
                    return false;
                }
                match self.enraged {
                    None => cooldown.is_none(),
                    Some(turns) => turns == 0,
                }
            }
            Some(Effect::Timed { kind, .. }) => self.timer(kind) == 0,
        }
    }

    /// Advance one turn
    ///
    /// An enrage that started this turn keeps its full duration.
    pub fn decay_turn(&mut self, enraged_this_turn: bool) {
        self.turn += 1;
        if !enraged_this_turn {
            if let Some(turns) = self.enraged.as_mut() {
                *turns -= turns.signum();
            }
        }
        for timer in self.timers.iter_mut().filter(|t| **t > 0) {
            *timer -= 1;
        }
    }

    /// Budget checks for a gated instance
    pub fn check_skill_use(&self, condition: &Condition) -> bool {
        if let Some(cost) = condition.limited_use {
            return self.skill_counter >= cost;
        }
        if let Some(count) = condition.enemies_remaining {
            return self.enemies <= count;
        }
        true
    }

    pub fn spend_skill_use(&mut self, condition: &Condition) {
        if let Some(cost) = condition.limited_use {
            self.skill_counter -= cost;
        }
    }

    pub fn regen_skill_counter(&mut self) {
        self.skill_counter =
            (self.skill_counter + self.skill_counter_increment).min(self.skill_counter_max);
    }
}
