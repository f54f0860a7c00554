//! Branch exploration
//!
//! One baseline scan, then one re-scan per value the baseline saw for each
//! player-dependent branch. Anything a re-scan surfaces that the baseline did
//! not is tagged with the value that triggered it and put in front of the
//! baseline results.

use tracing::debug;

use crate::core::types::OrbMask;
use crate::script::{Condition, Instance, Script};
use crate::vm::context::Context;
use crate::vm::interpreter::run_turn;

/// Re-run the turn from `original` with one dimension changed
///
/// Returns the behaviors not already in `baseline`, first occurrence wins,
/// tagged through `tag`, plus the union of flags the probes left behind.
fn probe_dimension<T>(
    dimension: &str,
    original: &Context,
    script: &Script,
    baseline: &[Instance],
    values: Vec<T>,
    set: impl Fn(&mut Context, &T),
    tag: impl Fn(&mut Condition, &T),
) -> (Vec<Instance>, i64) {
    let mut found: Vec<Instance> = Vec::new();
    let mut flags = 0;

    for value in &values {
        let mut probe = original.clone();
        set(&mut probe, value);
        let outcome = run_turn(&mut probe, script);
        flags |= probe.flags;

        for mut inst in outcome.actions {
            let known = baseline
                .iter()
                .chain(found.iter())
                .any(|b| b.same_behavior(&inst));
            if known {
                continue;
            }
            tag(inst.condition_mut(), value);
            found.push(inst);
        }
    }

    if !found.is_empty() {
        debug!(dimension, probes = values.len(), found = found.len(), "branch probe");
    }
    (found, flags)
}

fn sorted_masks(mut masks: Vec<OrbMask>) -> Vec<OrbMask> {
    masks.sort_by_key(|m| m.0);
    masks.dedup();
    masks
}

fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values.dedup();
    values
}

/// Run one turn and fold in every player-dependent alternative
///
/// `ctx` advances as the baseline scan leaves it. Afterwards the skill
/// counter regenerates and the first certain limited-use baseline action
/// pays its cost.
pub fn explore(ctx: &mut Context, script: &Script) -> Vec<Instance> {
    let original = ctx.clone();
    let outcome = run_turn(ctx, script);
    let baseline = outcome.actions;
    let observed = outcome.observed;
    let mut results = baseline.clone();

    let mut prepend = |extras: Vec<Instance>| {
        for inst in extras {
            results.insert(0, inst);
        }
    };

    let (extras, card_flags) = probe_dimension(
        "cards",
        &original,
        script,
        &baseline,
        sorted(observed.cards),
        |c, cards| c.cards.extend(cards.iter().copied()),
        |cond, cards| cond.cards_on_team = cards.clone(),
    );
    // Card branches often set a flag so they only fire once
    ctx.flags |= card_flags;
    prepend(extras);

    let (extras, _) = probe_dimension(
        "combos",
        &original,
        script,
        &baseline,
        sorted(observed.combos),
        |c, combos| c.combos = *combos,
        |cond, combos| cond.combos_made = Some(*combos),
    );
    prepend(extras);

    let (extras, _) = probe_dimension(
        "erased",
        &original,
        script,
        &baseline,
        sorted_masks(observed.erased),
        |c, mask| c.erased = *mask,
        |cond, mask| cond.attributes_erased = Some(*mask),
    );
    prepend(extras);

    let (extras, _) = probe_dimension(
        "on_board",
        &original,
        script,
        &baseline,
        sorted_masks(observed.on_board),
        |c, mask| c.on_board = *mask,
        |cond, mask| cond.attributes_on_board = Some(*mask),
    );
    prepend(extras);

    let (extras, _) = probe_dimension(
        "damage",
        &original,
        script,
        &baseline,
        sorted(observed.damage),
        |c, damage| c.damage = *damage,
        |cond, damage| cond.damage_done = Some(*damage),
    );
    prepend(extras);

    let (extras, _) = probe_dimension(
        "attacked",
        &original,
        script,
        &baseline,
        sorted_masks(observed.attacked),
        |c, mask| c.attacked = *mask,
        |cond, mask| cond.attributes_attacked = Some(*mask),
    );
    prepend(extras);

    let (extras, _) = probe_dimension(
        "skill_uses",
        &original,
        script,
        &baseline,
        sorted(observed.skill_uses),
        |c, uses| c.skills_used = *uses,
        |cond, uses| cond.skills_used = Some(*uses),
    );
    prepend(extras);

    ctx.regen_skill_counter();
    let hp = ctx.hp;
    if let Some(cond) = baseline
        .iter()
        .filter_map(|inst| inst.condition.as_ref())
        .find(|cond| cond.is_limited_use() && cond.use_chance(hp) == 100)
    {
        ctx.spend_skill_use(cond);
    }

    results
}
