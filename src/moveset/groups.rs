//! Output tree and its cleanup
//!
//! Groups compare structurally with `==`. Deduplication across checkpoints
//! and enemy counts only looks at the skills, via [`SkillGroup::skills`].

use serde::Serialize;

use crate::script::Instance;

/// Skills used on one turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimedSkillGroup {
    pub turn: usize,
    /// Last turn of a collapsed run of identical turns
    pub end_turn: Option<usize>,
    /// Checkpoint this group was simulated at
    pub hp: i32,
    /// Lowest HP this group was proven to cover after smearing
    pub valid_above: Option<i32>,
    pub skills: Vec<Instance>,
}

impl TimedSkillGroup {
    pub fn new(turn: usize, hp: i32, skills: Vec<Instance>) -> Self {
        Self {
            turn,
            end_turn: None,
            hp,
            valid_above: None,
            skills,
        }
    }
}

/// A timed group inside a repeating cycle; `turn` counts from the cycle start
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepeatSkillGroup {
    #[serde(flatten)]
    pub group: TimedSkillGroup,
    pub interval: usize,
}

impl RepeatSkillGroup {
    pub fn new(turn: usize, interval: usize, hp: i32, skills: Vec<Instance>) -> Self {
        Self {
            group: TimedSkillGroup::new(turn, hp, skills),
            interval,
        }
    }
}

/// Shared access for the cleanup passes
pub trait SkillGroup {
    fn group(&self) -> &TimedSkillGroup;
    fn group_mut(&mut self) -> &mut TimedSkillGroup;

    fn skills(&self) -> &[Instance] {
        &self.group().skills
    }
}

impl SkillGroup for TimedSkillGroup {
    fn group(&self) -> &TimedSkillGroup {
        self
    }

    fn group_mut(&mut self) -> &mut TimedSkillGroup {
        self
    }
}

impl SkillGroup for RepeatSkillGroup {
    fn group(&self) -> &TimedSkillGroup {
        &self.group
    }

    fn group_mut(&mut self) -> &mut TimedSkillGroup {
        &mut self.group
    }
}

/// Same skills in the same order, ignoring turn and HP bookkeeping
pub fn same_skills<G: SkillGroup>(a: &[G], b: &[G]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.skills() == y.skills())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HpActions {
    pub hp: i32,
    pub timed: Vec<TimedSkillGroup>,
    pub repeating: Vec<RepeatSkillGroup>,
}

impl HpActions {
    pub fn is_empty(&self) -> bool {
        self.timed.is_empty() && self.repeating.is_empty()
    }

    fn groups_mut(&mut self) -> impl Iterator<Item = &mut TimedSkillGroup> {
        self.timed
            .iter_mut()
            .chain(self.repeating.iter_mut().map(|r| &mut r.group))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Moveset {
    /// Fires when the player inflicts a status
    pub status_action: Option<Instance>,
    /// Fires when the player has a buff up
    pub dispel_action: Option<Instance>,
    /// Descending HP
    pub hp_actions: Vec<HpActions>,
}

impl Moveset {
    /// Clean consolidated checkpoints into a moveset
    ///
    /// Hoists status enrages and dispels out of every group, collapses runs of
    /// identical turns, drops empty groups and checkpoints, then strips a lone
    /// timed group of skills its single repeating group already covers.
    pub fn from_hp_actions(mut hp_actions: Vec<HpActions>) -> Self {
        let mut moveset = Moveset::default();

        for group in hp_actions.iter_mut().flat_map(|a| a.groups_mut()) {
            for hoisted in hoist(&mut group.skills) {
                let slot = if hoisted.node.action().is_some_and(|a| a.is_dispel()) {
                    &mut moveset.dispel_action
                } else {
                    &mut moveset.status_action
                };
                slot.get_or_insert(hoisted);
            }
        }

        for mut hp_action in hp_actions {
            hp_action.timed = collapse(hp_action.timed);
            hp_action.repeating = collapse(hp_action.repeating);
            hp_action.timed.retain(|g| !g.skills.is_empty());
            hp_action.repeating.retain(|g| !g.skills().is_empty());
            if hp_action.is_empty() {
                continue;
            }

            if let ([timed], [repeat]) = (&mut hp_action.timed[..], &hp_action.repeating[..]) {
                if timed.skills.len() > 1 {
                    timed.skills.retain(|s| !repeat.skills().contains(s));
                }
            }
            moveset.hp_actions.push(hp_action);
        }
        moveset
    }

    pub fn is_empty(&self) -> bool {
        self.status_action.is_none() && self.dispel_action.is_none() && self.hp_actions.is_empty()
    }

    pub fn hp_action(&self, hp: i32) -> Option<&HpActions> {
        self.hp_actions.iter().find(|a| a.hp == hp)
    }

    /// Clear everything `earlier` already says
    pub fn remove_shared(&mut self, earlier: &Moveset) {
        if self.dispel_action == earlier.dispel_action {
            self.dispel_action = None;
        }
        if self.status_action == earlier.status_action {
            self.status_action = None;
        }
        for theirs in &earlier.hp_actions {
            let Some(ours) = self.hp_actions.iter_mut().find(|a| a.hp == theirs.hp) else {
                continue;
            };
            if same_skills(&ours.timed, &theirs.timed) {
                ours.timed.clear();
            }
            if same_skills(&ours.repeating, &theirs.repeating) {
                ours.repeating.clear();
            }
        }
    }
}

/// Pull status enrages and dispels out of a skill list
fn hoist(skills: &mut Vec<Instance>) -> Vec<Instance> {
    let is_hoisted = |s: &Instance| {
        s.node
            .action()
            .is_some_and(|a| a.is_status_enrage() || a.is_dispel())
    };
    let hoisted = skills.iter().filter(|s| is_hoisted(s)).cloned().collect();
    skills.retain(|s| !is_hoisted(s));
    hoisted
}

/// Merge consecutive groups with identical skills into one spanning group
pub fn collapse<G: SkillGroup>(groups: Vec<G>) -> Vec<G> {
    let mut collapsed: Vec<G> = Vec::with_capacity(groups.len());
    for next in groups {
        if let Some(current) = collapsed.last_mut() {
            if current.skills() == next.skills() && current.group().turn != next.group().turn {
                current.group_mut().end_turn = Some(next.group().turn);
                continue;
            }
        }
        collapsed.push(next);
    }
    collapsed
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnemyRemainingMoveset {
    pub count: i32,
    pub moveset: Moveset,
}

/// Everything one monster does at one level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessedSkillset {
    pub level: i32,
    /// Copied from the card for the text layer
    pub use_new_skill_ai: bool,
    pub base_abilities: Vec<Instance>,
    pub preemptives: Vec<Instance>,
    pub death_actions: Vec<Instance>,
    pub moveset: Moveset,
    pub enemy_remaining_movesets: Vec<EnemyRemainingMoveset>,
}

impl ProcessedSkillset {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            use_new_skill_ai: false,
            base_abilities: Vec::new(),
            preemptives: Vec::new(),
            death_actions: Vec::new(),
            moveset: Moveset::default(),
            enemy_remaining_movesets: Vec::new(),
        }
    }
}
