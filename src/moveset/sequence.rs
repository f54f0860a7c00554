//! Turn sequences and cycle detection

use crate::core::error::{Result, SkillsetError};
use crate::moveset::groups::{HpActions, RepeatSkillGroup, TimedSkillGroup};
use crate::script::{Instance, Script};
use crate::vm::context::Context;
use crate::vm::explorer::explore;

/// Explore `horizon` consecutive turns at a fixed HP
pub fn simulate_turns(
    ctx: &Context,
    script: &Script,
    hp: i32,
    horizon: usize,
) -> Vec<Vec<Instance>> {
    let mut ctx = ctx.clone();
    ctx.hp = hp;
    (0..horizon)
        .map(|_| {
            let started_enraged = ctx.is_enraged();
            let turn = explore(&mut ctx, script);
            let enraged_this_turn = !started_enraged && ctx.is_enraged();
            ctx.decay_turn(enraged_this_turn);
            turn
        })
        .collect()
}

/// Find the first `(start, end)` where turns `[start, end)` repeat to the
/// end of the data
///
/// A candidate needs at least one full repetition after it. A trailing
/// partial block is not checked.
pub fn find_cycle<T: PartialEq>(turns: &[T]) -> Option<(usize, usize)> {
    (0..turns.len()).find_map(|start| {
        ((start + 1)..turns.len())
            .filter(|&end| turns[end] == turns[start])
            .find(|&end| repeats(turns, start, end))
            .map(|end| (start, end))
    })
}

fn repeats<T: PartialEq>(turns: &[T], start: usize, end: usize) -> bool {
    let block = &turns[start..end];
    let mut verified = false;
    for chunk in turns[end..].chunks(block.len()) {
        if chunk.len() < block.len() {
            break;
        }
        if chunk != block {
            return false;
        }
        verified = true;
    }
    verified
}

/// Split one checkpoint's turns into one-shot and repeating groups
pub fn extract(ctx: &Context, script: &Script, hp: i32, horizon: usize) -> Result<HpActions> {
    let turns = simulate_turns(ctx, script, hp, horizon);
    let (start, end) = find_cycle(&turns).ok_or(SkillsetError::NoCycle { hp, horizon })?;
    let interval = end - start;

    let mut turns = turns.into_iter();
    let timed = turns
        .by_ref()
        .take(start)
        .enumerate()
        .map(|(idx, skills)| TimedSkillGroup::new(idx + 1, hp, skills))
        .collect();
    let repeating = turns
        .take(interval)
        .enumerate()
        .map(|(idx, skills)| RepeatSkillGroup::new(idx + 1, interval, hp, skills))
        .collect();

    Ok(HpActions {
        hp,
        timed,
        repeating,
    })
}
