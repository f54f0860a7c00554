//! Single-turn executor
//!
//! Walks the program counter across a [`Script`], mutating the [`Context`]
//! and collecting what the monster does this turn. Branches on values only
//! known during a real battle are evaluated against the context as given
//! and recorded for [`crate::vm::explorer`] to revisit.

use ahash::AHashSet;
use tracing::warn;

use crate::core::types::OrbMask;
use crate::decode::node::{Behavior, BehaviorNode, CounterOp, FlagOp, LogicNode};
use crate::script::{Instance, Script};
use crate::vm::constants::MAX_STEPS;
use crate::vm::context::Context;

/// How the scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnExit {
    /// A certain action (or a countdown message) ended the turn
    Terminal,
    /// An explicit end-path node
    EndPath,
    /// Ran off the script or revisited an index
    Exhausted,
    /// Hit the step cap
    StepCap,
}

/// Branch values seen this turn that depend on the player
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchObservations {
    pub cards: Vec<Vec<i32>>,
    pub combos: Vec<i32>,
    pub erased: Vec<OrbMask>,
    pub on_board: Vec<OrbMask>,
    pub damage: Vec<i64>,
    pub attacked: Vec<OrbMask>,
    pub skill_uses: Vec<i32>,
    pub enemies: Vec<i32>,
}

impl BranchObservations {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
            && self.combos.is_empty()
            && self.erased.is_empty()
            && self.on_board.is_empty()
            && self.damage.is_empty()
            && self.attacked.is_empty()
            && self.skill_uses.is_empty()
            && self.enemies.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub actions: Vec<Instance>,
    pub observed: BranchObservations,
    pub exit: TurnExit,
}

enum Step {
    Next,
    Jump(usize),
    Stop(TurnExit),
}

/// All attributes in `want` are present in `have`
fn covers(have: OrbMask, want: OrbMask) -> bool {
    let want = want.bits();
    want != 0 && have.bits() & want == want
}

struct Turn<'a> {
    ctx: &'a mut Context,
    actions: Vec<Instance>,
    observed: BranchObservations,
}

impl Turn<'_> {
    fn step(&mut self, idx: usize, inst: &Instance) -> Step {
        match &inst.node {
            BehaviorNode::Logic(logic) => self.step_logic(idx, logic),
            BehaviorNode::Passive(_) => Step::Next,
            BehaviorNode::Action(action) if action.is_preemptive_attack() => {
                self.ctx.consume(idx);
                self.ctx.is_preemptive = true;
                self.ctx.do_preemptive = true;
                self.actions.push(inst.clone());
                Step::Stop(TurnExit::Terminal)
            }
            BehaviorNode::Action(action) if action.is_status_enrage() => {
                self.actions.push(inst.clone());
                Step::Next
            }
            BehaviorNode::Action(_) | BehaviorNode::Unknown { .. } => self.step_action(inst),
        }
    }

    fn step_action(&mut self, inst: &Instance) -> Step {
        let Some(cond) = &inst.condition else {
            if !self.ctx.apply_effect(&inst.node) {
                return Step::Next;
            }
            self.actions.push(inst.clone());
            return Step::Stop(TurnExit::Terminal);
        };

        let chance = cond.use_chance(self.ctx.hp);
        if chance == 0 {
            return Step::Next;
        }

        let is_dispel = inst.node.action().is_some_and(|a| a.is_dispel());
        if chance == 100 && !is_dispel {
            if !self.ctx.check_skill_use(cond) || !self.ctx.apply_effect(&inst.node) {
                return Step::Next;
            }
            self.actions.push(inst.clone());
            return if inst.node.is_conditional() {
                Step::Next
            } else {
                Step::Stop(TurnExit::Terminal)
            };
        }

        if self.ctx.check_skill_use(cond) && self.ctx.can_apply_effect(&inst.node) {
            self.actions.push(inst.clone());
        }
        Step::Next
    }

    fn step_logic(&mut self, idx: usize, logic: &LogicNode) -> Step {
        let ctx = &mut *self.ctx;
        let jump_if = |taken: bool, target: usize| {
            if taken {
                Step::Jump(target)
            } else {
                Step::Next
            }
        };

        match logic {
            LogicNode::Nothing => Step::Next,
            LogicNode::Preemptive { level } => {
                ctx.consume(idx);
                ctx.is_preemptive = true;
                ctx.do_preemptive = *level <= ctx.level;
                Step::Next
            }
            LogicNode::BranchFlag { mask, target, .. } => {
                jump_if(*mask & ctx.flags == *mask, *target)
            }
            LogicNode::EndPath => Step::Stop(TurnExit::EndPath),
            LogicNode::FlagOperation { op, mask } => {
                match op {
                    FlagOp::Set | FlagOp::Or => ctx.flags |= *mask,
                    FlagOp::Unset => ctx.flags &= !*mask,
                    FlagOp::Xor => ctx.flags ^= *mask,
                }
                Step::Next
            }
            LogicNode::BranchHp { cmp, value, target } => {
                jump_if(cmp.holds(ctx.hp, *value), *target)
            }
            LogicNode::BranchLevel { cmp, value, target } => {
                jump_if(cmp.holds(ctx.level, *value), *target)
            }
            LogicNode::BranchCounter { cmp, value, target } => {
                jump_if(cmp.holds(ctx.counter, *value), *target)
            }
            LogicNode::SetCounter { op, amount } => {
                match op {
                    CounterOp::Assign => ctx.counter = *amount,
                    CounterOp::Add => ctx.counter = ctx.counter.saturating_add(*amount),
                    CounterOp::Subtract => ctx.counter = ctx.counter.saturating_sub(*amount),
                }
                Step::Next
            }
            LogicNode::SetCounterIf { counter_is, value } => {
                if ctx.counter == *counter_is {
                    ctx.counter = *value;
                }
                Step::Next
            }
            LogicNode::Countdown => {
                ctx.counter = ctx.counter.saturating_sub(1);
                if ctx.counter > 0 {
                    self.actions.push(Instance::countdown(ctx.counter));
                    Step::Stop(TurnExit::Terminal)
                } else {
                    Step::Next
                }
            }
            LogicNode::BranchCard { cards, target } => {
                self.observed.cards.push(cards.clone());
                jump_if(cards.iter().any(|c| ctx.cards.contains(c)), *target)
            }
            LogicNode::BranchCombo { combos, target } => {
                self.observed.combos.push(*combos);
                jump_if(ctx.combos >= *combos, *target)
            }
            LogicNode::BranchRemainingEnemies { count, target } => {
                self.observed.enemies.push(*count);
                jump_if(ctx.enemies <= *count, *target)
            }
            LogicNode::BranchErasedAttribute { attributes, target } => {
                self.observed.erased.push(*attributes);
                jump_if(covers(ctx.erased, *attributes), *target)
            }
            LogicNode::BranchBoardAttribute { attributes, target } => {
                self.observed.on_board.push(*attributes);
                jump_if(covers(ctx.on_board, *attributes), *target)
            }
            LogicNode::BranchAttackedAttribute { attributes, target } => {
                self.observed.attacked.push(*attributes);
                jump_if(covers(ctx.attacked, *attributes), *target)
            }
            LogicNode::BranchDamage { damage, target } => {
                self.observed.damage.push(*damage);
                jump_if(ctx.damage >= *damage, *target)
            }
            LogicNode::BranchSkillUse { uses, target } => {
                self.observed.skill_uses.push(*uses);
                jump_if(ctx.skills_used >= *uses, *target)
            }
        }
    }

    fn finish(self, exit: TurnExit) -> TurnOutcome {
        TurnOutcome {
            actions: self.actions,
            observed: self.observed,
            exit,
        }
    }
}

/// Execute one simulated turn
pub fn run_turn(ctx: &mut Context, script: &Script) -> TurnOutcome {
    ctx.reset_turn();
    let mut turn = Turn {
        ctx,
        actions: Vec::new(),
        observed: BranchObservations::default(),
    };
    let mut visited = AHashSet::new();
    let mut idx = 0;

    for _ in 0..MAX_STEPS {
        if idx >= script.len() || !visited.insert(idx) {
            return turn.finish(TurnExit::Exhausted);
        }
        if turn.ctx.is_consumed(idx) {
            idx += 1;
            continue;
        }
        let Some(inst) = script.get(idx) else {
            idx += 1;
            continue;
        };
        match turn.step(idx, inst) {
            Step::Next => idx += 1,
            Step::Jump(target) => idx = target,
            Step::Stop(exit) => return turn.finish(exit),
        }
    }

    warn!(
        steps = MAX_STEPS,
        actions = turn.actions.len(),
        "turn scan hit the step cap"
    );
    turn.finish(TurnExit::StepCap)
}
