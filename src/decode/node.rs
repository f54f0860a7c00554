//! Decoded behavior nodes
//!
//! One flat variant per opcode family member. Every variant owns only the
//! fields its opcode defines; shared behavior goes through [`Behavior`].

use serde::Serialize;

use crate::core::types::{Attribute, Compare, OrbMask};

/// Methods every decoded behavior answers
pub trait Behavior {
    /// Short English rendering used for logs and debug dumps
    fn description(&self) -> String;

    /// A conditional action may not fire even at 100% chance, so it never
    /// ends the turn on its own
    fn is_conditional(&self) -> bool {
        false
    }

    fn ends_battle(&self) -> bool {
        false
    }
}

/// Attack component carried by many actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Attack {
    pub multiplier: i32,
    pub min_hits: i32,
    pub max_hits: i32,
}

impl Attack {
    pub fn single(multiplier: i32) -> Self {
        Self {
            multiplier,
            min_hits: 1,
            max_hits: 1,
        }
    }

    /// `None` when the slot is missing
    pub fn from_slot(multiplier: Option<i32>) -> Option<Self> {
        multiplier.map(Self::single)
    }

    pub fn max_damage_pct(&self) -> i32 {
        self.multiplier * self.max_hits
    }

    pub fn min_damage_pct(&self) -> i32 {
        self.multiplier * self.min_hits
    }

    fn description(&self) -> String {
        if self.min_hits == self.max_hits && self.max_hits == 1 {
            format!("Deal {}% damage", self.multiplier)
        } else if self.min_hits == self.max_hits {
            format!(
                "Deal {}% damage ({} hits, {}% each)",
                self.max_damage_pct(),
                self.max_hits,
                self.multiplier
            )
        } else {
            format!(
                "Deal {}%~{}% damage ({}~{} hits, {}% each)",
                self.min_damage_pct(),
                self.max_damage_pct(),
                self.min_hits,
                self.max_hits,
                self.multiplier
            )
        }
    }
}

/// Team slots a bind can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BindSlot {
    Random,
    OwnLeader,
    FriendLeader,
    BothLeaders,
    Subs,
}

/// Row or column, for seals and line spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrbLine {
    Row,
    Column,
}

/// Orbs spawned onto one set of rows or columns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SpawnLine {
    pub positions: Vec<i32>,
    pub attributes: OrbMask,
}

/// Movetime debuffs come in flat seconds or a percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MovetimeChange {
    /// Tenths of a second, already negated
    Tenths(i32),
    Percent(i32),
}

/// Registers touched by actions that cannot restart while running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EffectKind {
    DamageShield,
    StatusShield,
    ComboAbsorb,
    AttributeAbsorb,
    DamageAbsorb,
    VoidShield,
    Invulnerable,
    MovetimeDebuff,
    SkyfallBuff,
    NoSkyfall,
    ComboSkyfall,
    AtkDebuff,
    RcvDebuff,
}

impl EffectKind {
    pub const COUNT: usize = 13;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The register an action wants to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Enrage {
        turns: i32,
        /// Turns before the first enrage may fire
        cooldown: Option<i32>,
        /// Enrage is blocked while more enemies than this are alive
        max_enemies: Option<i32>,
    },
    Timed {
        kind: EffectKind,
        turns: i32,
    },
}

/// Slot 11 and slot 13 of Action and Passive opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ActionGate {
    pub hp_threshold: Option<i32>,
    pub limited_use: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    /// Plain attack; the hit pattern lives on the node's attack
    Attack,
    AttackPreemptive,
    Inactivity,
    DeathCry,
    CountdownMessage { counter: i32 },

    BindRandom { min_turns: i32, max_turns: Option<i32>, count: i32 },
    BindRandomSub { min_turns: i32, max_turns: Option<i32>, count: i32 },
    BindAttribute { min_turns: i32, max_turns: Option<i32>, attribute: i32 },
    BindTyping { min_turns: i32, max_turns: Option<i32>, typing: i32 },
    BindTarget { min_turns: i32, max_turns: Option<i32>, targets: Vec<BindSlot> },
    BindAttack {
        min_turns: i32,
        max_turns: Option<i32>,
        targets: Vec<BindSlot>,
        count: Option<i32>,
    },
    BindSkill { min_turns: i32, max_turns: Option<i32> },
    BindAwoken { turns: i32 },

    OrbChangeSingle { from: i32, to: i32 },
    OrbChangeAttack { from: i32, to: i32 },
    OrbChangeAttackBits { from: OrbMask, to: OrbMask },
    JammerChangeSingle { from: i32 },
    JammerChangeRandom { type_count: i32 },
    PoisonChangeSingle { from: i32 },
    PoisonChangeRandom { exclude_hearts: bool },
    PoisonChangeRandomCount { count: i32, exclude_hearts: bool },
    PoisonChangeRandomAttack { count: i32 },
    MortalPoisonChangeRandom { count: i32 },

    Blind,
    BlindStickyRandom { turns: i32, min_count: i32, max_count: i32 },
    BlindStickyFixed { turns: i32, rows: Vec<i32> },
    BlindStickySkyfall { turns: i32, chance: i32, blind_turns: i32 },

    Dispel,
    StatusShield { turns: i32 },
    RecoverEnemy { min_amount: i32, max_amount: i32 },
    RecoverEnemyAlly { amount: i32 },
    RecoverPlayer { amount: i32, player_hp_threshold: Option<i32> },

    StorePower { multiplier: i32 },
    AttackUpRemainingEnemies { enemy_count: i32, turns: i32, multiplier: i32 },
    AttackUpStatus { turns: i32, multiplier: i32 },
    AttackUpCooldown { cooldown: Option<i32>, turns: i32, multiplier: i32 },

    DebuffMovetime { turns: i32, change: MovetimeChange },
    DebuffRcv { turns: i32, amount: i32 },
    DebuffAtk { turns: i32, amount: i32 },

    EndBattle,
    ChangeAttribute { attributes: Vec<i32> },
    Gravity { percent: i32 },

    AbsorbAttribute { min_turns: i32, max_turns: Option<i32>, attributes: OrbMask },
    AbsorbCombo { min_turns: i32, max_turns: Option<i32>, threshold: i32 },
    AbsorbDamage { turns: i32, threshold: i32 },
    VoidShield { turns: i32, threshold: i32 },
    DamageShield { turns: i32, percent: i32 },
    InvulnerableOn { turns: i32 },
    InvulnerableOff,

    Skyfall {
        attributes: OrbMask,
        chance: i32,
        min_turns: i32,
        max_turns: Option<i32>,
        locked: bool,
    },
    NoSkyfall { turns: i32 },
    ComboSkyfall { turns: i32, chance: i32 },

    LeaderSwap { turns: i32 },
    LeaderAlter { turns: i32, target_card: i32 },
    LineSpawn { line: OrbLine, spawns: Vec<SpawnLine> },
    RandomSpawn { count: i32, attributes: OrbMask, required_attributes: Vec<Attribute> },
    BombRandomSpawn { count: i32, locked: bool },
    BombFixedSpawn { rows: Vec<i32>, locked: bool },
    BoardChange { attributes: Vec<i32> },

    SkillSet { skills: Vec<BehaviorNode> },
    SkillSetOnDeath { skills: Vec<BehaviorNode> },
    SkillDelay { min_turns: i32, max_turns: Option<i32> },

    OrbLock { attributes: OrbMask, count: i32 },
    OrbSeal { line: OrbLine, positions: Vec<i32>, turns: i32 },
    Cloud { turns: i32, width: i32, height: i32, origin_x: i32, origin_y: i32 },
    FixedStart,
    AttributeBlock { turns: i32, attributes: OrbMask },
    SpinnersRandom { turns: i32, speed: i32, count: i32 },
    SpinnersFixed { turns: i32, speed: i32, rows: Vec<i32> },
    MaxHpChange { turns: i32, amount: i32, percent: bool },
    FixedTarget { turns: i32 },
    GachaFever { attribute: i32, orbs_required: i32 },
    BoardSizeChange { turns: i32, size: i32 },
}

/// An action plus its optional attack and gate slots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActionNode {
    pub kind: ActionKind,
    pub attack: Option<Attack>,
    pub gate: ActionGate,
}

impl ActionNode {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            attack: None,
            gate: ActionGate::default(),
        }
    }

    pub fn with_attack(mut self, attack: Option<Attack>) -> Self {
        self.attack = attack;
        self
    }

    pub fn is_dispel(&self) -> bool {
        matches!(self.kind, ActionKind::Dispel)
    }

    /// Status-triggered enrage accumulates and keeps scanning, unlike the
    /// other enrage variants
    pub fn is_status_enrage(&self) -> bool {
        matches!(self.kind, ActionKind::AttackUpStatus { .. })
    }

    pub fn is_death_action(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::DeathCry | ActionKind::SkillSetOnDeath { .. }
        )
    }

    pub fn is_preemptive_attack(&self) -> bool {
        matches!(self.kind, ActionKind::AttackPreemptive)
    }

    /// Enemy count this action waits for, if any
    pub fn enemies_remaining(&self) -> Option<i32> {
        match self.kind {
            ActionKind::RecoverEnemyAlly { .. } => Some(1),
            ActionKind::AttackUpRemainingEnemies { enemy_count, .. } => Some(enemy_count),
            _ => None,
        }
    }

    /// Board attributes that must be present for this action to do anything
    pub fn required_attributes(&self) -> Option<&[Attribute]> {
        match &self.kind {
            ActionKind::RandomSpawn {
                required_attributes,
                ..
            } => Some(required_attributes),
            _ => None,
        }
    }

    /// Register this action starts, if it is one of the non-stacking effects
    pub fn effect(&self) -> Option<Effect> {
        use ActionKind::*;

        let timed = |kind, turns| Some(Effect::Timed { kind, turns });
        let longest = |min: i32, max: Option<i32>| max.unwrap_or(min);

        match self.kind {
            AttackUpRemainingEnemies {
                enemy_count, turns, ..
            } => Some(Effect::Enrage {
                turns,
                cooldown: None,
                max_enemies: Some(enemy_count),
            }),
            AttackUpStatus { turns, .. } => Some(Effect::Enrage {
                turns,
                cooldown: None,
                max_enemies: None,
            }),
            AttackUpCooldown {
                cooldown, turns, ..
            } => Some(Effect::Enrage {
                turns,
                cooldown,
                max_enemies: None,
            }),
            DamageShield { turns, .. } => timed(EffectKind::DamageShield, turns),
            StatusShield { turns } => timed(EffectKind::StatusShield, turns),
            AbsorbCombo {
                min_turns,
                max_turns,
                ..
            } => timed(EffectKind::ComboAbsorb, longest(min_turns, max_turns)),
            AbsorbAttribute {
                min_turns,
                max_turns,
                ..
            } => timed(EffectKind::AttributeAbsorb, longest(min_turns, max_turns)),
            AbsorbDamage { turns, .. } => timed(EffectKind::DamageAbsorb, turns),
            VoidShield { turns, .. } => timed(EffectKind::VoidShield, turns),
            InvulnerableOn { turns } => timed(EffectKind::Invulnerable, turns),
            DebuffMovetime { turns, .. } => timed(EffectKind::MovetimeDebuff, turns),
            Skyfall {
                min_turns,
                max_turns,
                ..
            } => timed(EffectKind::SkyfallBuff, longest(min_turns, max_turns)),
            NoSkyfall { turns } => timed(EffectKind::NoSkyfall, turns),
            ComboSkyfall { turns, .. } => timed(EffectKind::ComboSkyfall, turns),
            DebuffAtk { turns, .. } => timed(EffectKind::AtkDebuff, turns),
            DebuffRcv { turns, .. } => timed(EffectKind::RcvDebuff, turns),
            _ => None,
        }
    }
}

fn turn_range(min: i32, max: Option<i32>) -> String {
    match max {
        Some(max) if max != min => format!("{}~{} turns", min, max),
        _ => format!("{} turns", min),
    }
}

fn attribute_list(attributes: &[Attribute]) -> String {
    attributes
        .iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(", ")
}

fn mask_list(mask: OrbMask) -> String {
    if mask.is_random() {
        "random".to_string()
    } else {
        attribute_list(&mask.attributes())
    }
}

fn orb_name(code: i32) -> String {
    match Attribute::from_code(code) {
        Some(a) => format!("{:?}", a),
        None => "random".to_string(),
    }
}

fn bind_targets(targets: &[BindSlot]) -> String {
    targets
        .iter()
        .map(|t| format!("{:?}", t))
        .collect::<Vec<_>>()
        .join(" and ")
}

impl Behavior for ActionKind {
    fn description(&self) -> String {
        use ActionKind::*;
        match self {
            Attack | AttackPreemptive => "Attack".to_string(),
            Inactivity => "Do nothing".to_string(),
            DeathCry => "Show a message on death".to_string(),
            CountdownMessage { counter } => format!("Display '{}' and skip turn", counter),

            BindRandom {
                min_turns,
                max_turns,
                count,
            } => format!(
                "Bind {} random cards for {}",
                count,
                turn_range(*min_turns, *max_turns)
            ),
            BindRandomSub {
                min_turns,
                max_turns,
                count,
            } => format!(
                "Bind {} random subs for {}",
                count,
                turn_range(*min_turns, *max_turns)
            ),
            BindAttribute {
                min_turns,
                max_turns,
                attribute,
            } => format!(
                "Bind {} cards for {}",
                orb_name(*attribute),
                turn_range(*min_turns, *max_turns)
            ),
            BindTyping {
                min_turns,
                max_turns,
                typing,
            } => format!(
                "Bind type {} cards for {}",
                typing,
                turn_range(*min_turns, *max_turns)
            ),
            BindTarget {
                min_turns,
                max_turns,
                targets,
            }
            | BindAttack {
                min_turns,
                max_turns,
                targets,
                ..
            } => format!(
                "Bind {} for {}",
                bind_targets(targets),
                turn_range(*min_turns, *max_turns)
            ),
            BindSkill {
                min_turns,
                max_turns,
            } => format!("Bind active skills for {}", turn_range(*min_turns, *max_turns)),
            BindAwoken { turns } => format!("Bind awoken skills for {} turns", turns),

            OrbChangeSingle { from, to } | OrbChangeAttack { from, to } => {
                format!("Change {} orbs to {}", orb_name(*from), orb_name(*to))
            }
            OrbChangeAttackBits { from, to } => {
                format!("Change {} orbs to {}", mask_list(*from), mask_list(*to))
            }
            JammerChangeSingle { from } => format!("Change {} orbs to Jammer", orb_name(*from)),
            JammerChangeRandom { type_count } => {
                format!("Change {} random colors to Jammer", type_count)
            }
            PoisonChangeSingle { from } => format!("Change {} orbs to Poison", orb_name(*from)),
            PoisonChangeRandom { exclude_hearts } => format!(
                "Change random orbs to Poison{}",
                if *exclude_hearts { " (excluding hearts)" } else { "" }
            ),
            PoisonChangeRandomCount {
                count,
                exclude_hearts,
            } => format!(
                "Change {} random orbs to Poison{}",
                count,
                if *exclude_hearts { " (excluding hearts)" } else { "" }
            ),
            PoisonChangeRandomAttack { count } => {
                format!("Change {} random orbs to Poison", count)
            }
            MortalPoisonChangeRandom { count } => {
                format!("Change {} random orbs to Mortal Poison", count)
            }

            Blind => "Blind all orbs on the board".to_string(),
            BlindStickyRandom {
                turns,
                min_count,
                max_count,
            } => format!(
                "Blind {}~{} random orbs for {} turns",
                min_count, max_count, turns
            ),
            BlindStickyFixed { turns, .. } => format!("Blind fixed orbs for {} turns", turns),
            BlindStickySkyfall {
                turns,
                chance,
                blind_turns,
            } => format!(
                "For {} turns, {}% chance for skyfall orbs to be blinded for {} turns",
                turns, chance, blind_turns
            ),

            Dispel => "Remove player buffs".to_string(),
            StatusShield { turns } => format!("Voids status ailments for {} turns", turns),
            RecoverEnemy {
                min_amount,
                max_amount,
            } => {
                if min_amount == max_amount {
                    format!("Enemy recovers {}% HP", min_amount)
                } else {
                    format!("Enemy recovers {}%~{}% HP", min_amount, max_amount)
                }
            }
            RecoverEnemyAlly { amount } => format!("Enemy ally recovers {}% HP", amount),
            RecoverPlayer { amount, .. } => format!("Player recovers {}% HP", amount),

            StorePower { multiplier } => format!("Increase damage to {}%", multiplier),
            AttackUpRemainingEnemies {
                enemy_count,
                turns,
                multiplier,
            } => format!(
                "Increase damage to {}% for the next {} turns when {} enemies remain",
                multiplier, turns, enemy_count
            ),
            AttackUpStatus { turns, multiplier } => format!(
                "Increase damage to {}% for the next {} turns after being affected by a status effect",
                multiplier, turns
            ),
            AttackUpCooldown {
                cooldown,
                turns,
                multiplier,
            } => {
                let mut desc = format!(
                    "Increase damage to {}% for the next {} turns",
                    multiplier, turns
                );
                if let Some(cooldown) = cooldown {
                    desc.push_str(&format!(" after {} turns", cooldown));
                }
                desc
            }

            DebuffMovetime { turns, change } => match change {
                MovetimeChange::Tenths(t) => format!(
                    "Movetime {}{:.1}s for {} turns",
                    if *t >= 0 { "+" } else { "" },
                    *t as f64 / 10.0,
                    turns
                ),
                MovetimeChange::Percent(p) => format!("Movetime {}% for {} turns", p, turns),
            },
            DebuffRcv { turns, amount } => format!("RCV {}% for {} turns", amount, turns),
            DebuffAtk { turns, amount } => format!("ATK {}% for {} turns", amount, turns),

            EndBattle => "Reduce self HP to 0".to_string(),
            ChangeAttribute { attributes } => {
                let names: Vec<String> = attributes.iter().map(|a| orb_name(*a)).collect();
                format!("Change own attribute to random one of {}", names.join(", "))
            }
            Gravity { percent } => format!("Player -{}% HP", percent),

            AbsorbAttribute {
                min_turns,
                max_turns,
                attributes,
            } => format!(
                "Absorb {} damage for {}",
                mask_list(*attributes),
                turn_range(*min_turns, *max_turns)
            ),
            AbsorbCombo {
                min_turns,
                max_turns,
                threshold,
            } => format!(
                "Absorb damage when combo <= {} for {}",
                threshold,
                turn_range(*min_turns, *max_turns)
            ),
            AbsorbDamage { turns, threshold } => format!(
                "Absorb damage when damage >= {} for {} turns",
                threshold, turns
            ),
            VoidShield { turns, threshold } => {
                format!("Void damage >= {} for {} turns", threshold, turns)
            }
            DamageShield { turns, percent } => {
                format!("Reduce damage from all sources by {}% for {} turns", percent, turns)
            }
            InvulnerableOn { turns } => format!("Immune to damage for {} turns", turns),
            InvulnerableOff => "Remove damage immunity".to_string(),

            Skyfall {
                attributes,
                chance,
                min_turns,
                max_turns,
                locked,
            } => format!(
                "{} {} skyfall +{}% for {}",
                if *locked { "Locked" } else { "Increased" },
                mask_list(*attributes),
                chance,
                turn_range(*min_turns, *max_turns)
            ),
            NoSkyfall { turns } => format!("No skyfall for {} turns", turns),
            ComboSkyfall { turns, chance } => {
                format!("{}% chance for combo orb skyfall for {} turns", chance, turns)
            }

            LeaderSwap { turns } => format!("Leader changes to random sub for {} turns", turns),
            LeaderAlter { turns, target_card } => {
                format!("Change leader to card {} for {} turns", target_card, turns)
            }
            LineSpawn { line, spawns } => {
                let parts: Vec<String> = spawns
                    .iter()
                    .map(|s| {
                        format!(
                            "{} {:?} to {}",
                            match line {
                                OrbLine::Row => "row",
                                OrbLine::Column => "column",
                            },
                            s.positions,
                            mask_list(s.attributes)
                        )
                    })
                    .collect();
                format!("Change {}", parts.join(", "))
            }
            RandomSpawn {
                count,
                attributes,
                required_attributes,
            } => {
                if required_attributes.is_empty() {
                    format!("Spawn {} random {} orbs", count, mask_list(*attributes))
                } else {
                    format!(
                        "Spawn {} random {} orbs if {} are on the board",
                        count,
                        mask_list(*attributes),
                        attribute_list(required_attributes)
                    )
                }
            }
            BombRandomSpawn { count, locked } => format!(
                "Spawn {} random {}Bomb orbs",
                count,
                if *locked { "locked " } else { "" }
            ),
            BombFixedSpawn { locked, .. } => format!(
                "Spawn {}Bomb orbs in fixed positions",
                if *locked { "locked " } else { "" }
            ),
            BoardChange { attributes } => {
                let names: Vec<String> = attributes.iter().map(|a| orb_name(*a)).collect();
                format!("Change all orbs to {}", names.join(", "))
            }

            SkillSet { skills } | SkillSetOnDeath { skills } => skills
                .iter()
                .map(|s| s.description())
                .collect::<Vec<_>>()
                .join(" + "),
            SkillDelay {
                min_turns,
                max_turns,
            } => format!("Delay active skills by {}", turn_range(*min_turns, *max_turns)),

            OrbLock { attributes, count } => {
                format!("Lock {} {} orbs", count, mask_list(*attributes))
            }
            OrbSeal {
                line,
                positions,
                turns,
            } => format!("Seal {:?} {:?} for {} turns", line, positions, turns),
            Cloud {
                turns,
                width,
                height,
                ..
            } => format!("A {}x{} cloud appears for {} turns", width, height, turns),
            FixedStart => "Fix orb movement starting point to random position".to_string(),
            AttributeBlock { turns, attributes } => format!(
                "Unable to match {} orbs for {} turns",
                mask_list(*attributes),
                turns
            ),
            SpinnersRandom {
                turns,
                speed,
                count,
            } => format!(
                "{} random spinners for {} turns ({:.1}s)",
                count,
                turns,
                *speed as f64 / 100.0
            ),
            SpinnersFixed { turns, speed, .. } => format!(
                "Fixed spinners for {} turns ({:.1}s)",
                turns,
                *speed as f64 / 100.0
            ),
            MaxHpChange {
                turns,
                amount,
                percent,
            } => format!(
                "Change player max HP to {}{} for {} turns",
                amount,
                if *percent { "%" } else { "" },
                turns
            ),
            FixedTarget { turns } => format!("Forced to attack this enemy for {} turns", turns),
            GachaFever {
                attribute,
                orbs_required,
            } => format!(
                "Fever mode: clear {} {} orbs",
                orbs_required,
                orb_name(*attribute)
            ),
            BoardSizeChange { turns, size } => {
                format!("Change board size to {} for {} turns", size, turns)
            }
        }
    }

    fn is_conditional(&self) -> bool {
        use ActionKind::*;
        match self {
            BindAttribute { .. } | BindTyping { .. } => true,
            BindAwoken { turns } => *turns > 1,
            OrbChangeSingle { .. }
            | OrbChangeAttackBits { .. }
            | JammerChangeSingle { .. }
            | PoisonChangeSingle { .. } => true,
            OrbChangeAttack { from, .. } => *from != -1,
            RandomSpawn {
                required_attributes,
                ..
            } => !required_attributes.is_empty(),
            OrbLock { attributes, .. } => !attributes.is_random() && attributes.len() < 4,
            BoardSizeChange { .. } => true,
            _ => false,
        }
    }

    fn ends_battle(&self) -> bool {
        match self {
            ActionKind::EndBattle => true,
            ActionKind::SkillSet { skills } | ActionKind::SkillSetOnDeath { skills } => {
                skills.iter().any(|s| s.ends_battle())
            }
            _ => false,
        }
    }
}

impl Behavior for ActionNode {
    fn description(&self) -> String {
        let desc = self.kind.description();
        match (&self.kind, self.attack) {
            (ActionKind::Attack | ActionKind::AttackPreemptive, Some(attack)) => {
                attack.description()
            }
            (_, Some(attack)) => format!("{}, {}", desc, attack.description()),
            (_, None) => desc,
        }
    }

    fn is_conditional(&self) -> bool {
        self.kind.is_conditional()
    }

    fn ends_battle(&self) -> bool {
        self.kind.ends_battle()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PassiveKind {
    AttributeResist { attributes: OrbMask, percent: i32 },
    TypeResist { types: Vec<i32>, percent: i32 },
    Resolve { hp_threshold: i32 },
    SuperResolve { hp_threshold: i32, hp_remaining: i32 },
    TurnChange { hp_threshold: i32, turn_counter: i32 },
    TurnChangeRemainingEnemies { enemy_count: i32, turn_counter: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PassiveNode {
    pub kind: PassiveKind,
    pub gate: ActionGate,
}

impl PassiveNode {
    pub fn enemies_remaining(&self) -> Option<i32> {
        match self.kind {
            PassiveKind::TurnChangeRemainingEnemies { enemy_count, .. } => Some(enemy_count),
            _ => None,
        }
    }
}

impl Behavior for PassiveNode {
    fn description(&self) -> String {
        match &self.kind {
            PassiveKind::AttributeResist {
                attributes,
                percent,
            } => format!("Reduce damage from {} by {}%", mask_list(*attributes), percent),
            PassiveKind::TypeResist { types, percent } => {
                format!("Reduce damage from types {:?} by {}%", types, percent)
            }
            PassiveKind::Resolve { hp_threshold } => {
                format!("Survive attacks with 1 HP when HP > {}%", hp_threshold)
            }
            PassiveKind::SuperResolve {
                hp_threshold,
                hp_remaining,
            } => format!(
                "Damage which would reduce HP from above {}% to below {}% is nullified",
                hp_threshold, hp_remaining
            ),
            PassiveKind::TurnChange {
                hp_threshold,
                turn_counter,
            } => format!(
                "Enemy turn counter change to {} when HP <= {}%",
                turn_counter, hp_threshold
            ),
            PassiveKind::TurnChangeRemainingEnemies {
                enemy_count,
                turn_counter,
            } => format!(
                "Enemy turn counter change to {} when {} enemies remain",
                turn_counter, enemy_count
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlagOp {
    Set,
    Unset,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CounterOp {
    Assign,
    Add,
    Subtract,
}

/// Control-flow nodes
///
/// Fields marked "patched" are zero after decode and filled from the script
/// entry's `ai`/`rnd` operands when the instance is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum LogicNode {
    Nothing,
    /// `mask` patched from `ai`
    FlagOperation { op: FlagOp, mask: i64 },
    /// `mask` from `ai`, `target` from `rnd + target_offset`
    BranchFlag { mask: i64, target: usize, target_offset: i32 },
    /// `amount` is `ai` for assignment and 1 otherwise
    SetCounter { op: CounterOp, amount: i32 },
    /// Set the counter to `value` (`rnd`) when it equals `counter_is` (`ai`)
    SetCounterIf { counter_is: i32, value: i32 },
    BranchHp { cmp: Compare, value: i32, target: usize },
    BranchCounter { cmp: Compare, value: i32, target: usize },
    BranchLevel { cmp: Compare, value: i32, target: usize },
    /// Team cards come from the opcode's own slots
    BranchCard { cards: Vec<i32>, target: usize },
    BranchCombo { combos: i32, target: usize },
    BranchRemainingEnemies { count: i32, target: usize },
    BranchErasedAttribute { attributes: OrbMask, target: usize },
    BranchBoardAttribute { attributes: OrbMask, target: usize },
    BranchAttackedAttribute { attributes: OrbMask, target: usize },
    BranchDamage { damage: i64, target: usize },
    BranchSkillUse { uses: i32, target: usize },
    EndPath,
    Countdown,
    Preemptive { level: i32 },
}

impl LogicNode {
    /// Fill operand-driven fields from a script entry's `ai` and `rnd`
    pub fn with_operands(self, ai: i32, rnd: i32) -> Self {
        use LogicNode::*;
        let target = |offset: i32| usize::try_from(rnd.saturating_add(offset)).unwrap_or(0);
        match self {
            FlagOperation { op, .. } => FlagOperation {
                op,
                mask: i64::from(ai),
            },
            BranchFlag { target_offset, .. } => BranchFlag {
                mask: i64::from(ai),
                target: target(target_offset),
                target_offset,
            },
            SetCounter { op, .. } => SetCounter {
                op,
                amount: if op == CounterOp::Assign { ai } else { 1 },
            },
            SetCounterIf { .. } => SetCounterIf {
                counter_is: ai,
                value: rnd,
            },
            BranchHp { cmp, .. } => BranchHp {
                cmp,
                value: ai,
                target: target(0),
            },
            BranchCounter { cmp, .. } => BranchCounter {
                cmp,
                value: ai,
                target: target(0),
            },
            BranchLevel { cmp, .. } => BranchLevel {
                cmp,
                value: ai,
                target: target(0),
            },
            BranchCard { cards, .. } => BranchCard {
                cards,
                target: target(0),
            },
            BranchCombo { .. } => BranchCombo {
                combos: ai,
                target: target(0),
            },
            BranchRemainingEnemies { .. } => BranchRemainingEnemies {
                count: ai,
                target: target(0),
            },
            BranchErasedAttribute { attributes, .. } => BranchErasedAttribute {
                attributes,
                target: target(0),
            },
            BranchBoardAttribute { attributes, .. } => BranchBoardAttribute {
                attributes,
                target: target(0),
            },
            BranchAttackedAttribute { attributes, .. } => BranchAttackedAttribute {
                attributes,
                target: target(0),
            },
            BranchDamage { damage, .. } => BranchDamage {
                damage,
                target: target(0),
            },
            BranchSkillUse { .. } => BranchSkillUse {
                uses: ai,
                target: target(0),
            },
            other => other,
        }
    }
}

impl Behavior for LogicNode {
    fn description(&self) -> String {
        use LogicNode::*;
        match self {
            Nothing => "nothing".to_string(),
            FlagOperation { op, mask } => format!("flag {:?} {:#b}", op, mask),
            BranchFlag { mask, target, .. } => format!("goto {} if flags & {:#b}", target, mask),
            SetCounter { op, amount } => match op {
                CounterOp::Assign => format!("counter = {}", amount),
                CounterOp::Add => format!("counter += {}", amount),
                CounterOp::Subtract => format!("counter -= {}", amount),
            },
            SetCounterIf { counter_is, value } => {
                format!("counter = {} if counter == {}", value, counter_is)
            }
            BranchHp { cmp, value, target } => {
                format!("goto {} if hp {} {}", target, cmp.symbol(), value)
            }
            BranchCounter { cmp, value, target } => {
                format!("goto {} if counter {} {}", target, cmp.symbol(), value)
            }
            BranchLevel { cmp, value, target } => {
                format!("goto {} if level {} {}", target, cmp.symbol(), value)
            }
            BranchCard { cards, target } => format!("goto {} if cards {:?} on team", target, cards),
            BranchCombo { combos, target } => format!("goto {} if combos >= {}", target, combos),
            BranchRemainingEnemies { count, target } => {
                format!("goto {} if remaining enemies <= {}", target, count)
            }
            BranchErasedAttribute { attributes, target } => format!(
                "goto {} if {} erased",
                target,
                mask_list(*attributes)
            ),
            BranchBoardAttribute { attributes, target } => format!(
                "goto {} if {} on board",
                target,
                mask_list(*attributes)
            ),
            BranchAttackedAttribute { attributes, target } => format!(
                "goto {} if attacked by {}",
                target,
                mask_list(*attributes)
            ),
            BranchDamage { damage, target } => {
                format!("goto {} if damage last turn >= {}", target, damage)
            }
            BranchSkillUse { uses, target } => {
                format!("goto {} if skills used >= {}", target, uses)
            }
            EndPath => "end_turn".to_string(),
            Countdown => "countdown".to_string(),
            Preemptive { level } => format!("Enable preempt if level {}", level),
        }
    }
}

/// A decoded opcode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum BehaviorNode {
    Action(ActionNode),
    Passive(PassiveNode),
    Logic(LogicNode),
    /// Type code with no known meaning; behaves like an action with no effect
    Unknown { type_code: i32, gate: ActionGate },
}

impl BehaviorNode {
    pub fn action(&self) -> Option<&ActionNode> {
        match self {
            BehaviorNode::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn logic(&self) -> Option<&LogicNode> {
        match self {
            BehaviorNode::Logic(logic) => Some(logic),
            _ => None,
        }
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, BehaviorNode::Logic(_))
    }

    pub fn is_passive(&self) -> bool {
        matches!(self, BehaviorNode::Passive(_))
    }

    pub fn is_death_action(&self) -> bool {
        self.action().is_some_and(ActionNode::is_death_action)
    }

    /// Slot 11/13 values, for nodes that have them
    pub fn gate(&self) -> Option<ActionGate> {
        match self {
            BehaviorNode::Action(action) => Some(action.gate),
            BehaviorNode::Passive(passive) => Some(passive.gate),
            BehaviorNode::Unknown { gate, .. } => Some(*gate),
            BehaviorNode::Logic(_) => None,
        }
    }

    pub fn effect(&self) -> Option<Effect> {
        self.action().and_then(ActionNode::effect)
    }

    pub fn with_operands(self, ai: i32, rnd: i32) -> Self {
        match self {
            BehaviorNode::Logic(logic) => BehaviorNode::Logic(logic.with_operands(ai, rnd)),
            other => other,
        }
    }
}

impl Behavior for BehaviorNode {
    fn description(&self) -> String {
        match self {
            BehaviorNode::Action(action) => action.description(),
            BehaviorNode::Passive(passive) => passive.description(),
            BehaviorNode::Logic(logic) => logic.description(),
            BehaviorNode::Unknown { type_code, .. } => format!("Unknown skill type {}", type_code),
        }
    }

    fn is_conditional(&self) -> bool {
        match self {
            BehaviorNode::Action(action) => action.is_conditional(),
            _ => false,
        }
    }

    fn ends_battle(&self) -> bool {
        match self {
            BehaviorNode::Action(action) => action.ends_battle(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_enrage_flag_is_per_variant() {
        let status = ActionNode::new(ActionKind::AttackUpStatus {
            turns: 3,
            multiplier: 200,
        });
        let cooldown = ActionNode::new(ActionKind::AttackUpCooldown {
            cooldown: None,
            turns: 3,
            multiplier: 200,
        });
        assert!(status.is_status_enrage());
        assert!(!cooldown.is_status_enrage());
    }

    #[test]
    fn test_absorb_uses_longest_duration() {
        let node = ActionNode::new(ActionKind::AbsorbCombo {
            min_turns: 1,
            max_turns: Some(3),
            threshold: 5,
        });
        assert_eq!(
            node.effect(),
            Some(Effect::Timed {
                kind: EffectKind::ComboAbsorb,
                turns: 3
            })
        );
    }

    #[test]
    fn test_skillset_ends_battle_if_any_child_does() {
        let set = ActionNode::new(ActionKind::SkillSet {
            skills: vec![
                BehaviorNode::Action(ActionNode::new(ActionKind::Dispel)),
                BehaviorNode::Action(ActionNode::new(ActionKind::EndBattle)),
            ],
        });
        assert!(set.ends_battle());
        assert!(!ActionNode::new(ActionKind::Dispel).ends_battle());
    }

    #[test]
    fn test_orb_lock_conditional_only_for_few_colors() {
        let few = ActionKind::OrbLock {
            attributes: OrbMask(0b11),
            count: 5,
        };
        let random = ActionKind::OrbLock {
            attributes: OrbMask::RANDOM,
            count: 5,
        };
        assert!(few.is_conditional());
        assert!(!random.is_conditional());
    }

    #[test]
    fn test_patch_branch_operands() {
        let node = LogicNode::BranchFlag {
            mask: 0,
            target: 0,
            target_offset: 1,
        }
        .with_operands(4, 7);
        assert_eq!(
            node,
            LogicNode::BranchFlag {
                mask: 4,
                target: 8,
                target_offset: 1
            }
        );
    }

    #[test]
    fn test_patch_counter_amounts() {
        let assign = LogicNode::SetCounter {
            op: CounterOp::Assign,
            amount: 0,
        }
        .with_operands(5, 0);
        let add = LogicNode::SetCounter {
            op: CounterOp::Add,
            amount: 0,
        }
        .with_operands(5, 0);
        assert_eq!(
            assign,
            LogicNode::SetCounter {
                op: CounterOp::Assign,
                amount: 5
            }
        );
        assert_eq!(
            add,
            LogicNode::SetCounter {
                op: CounterOp::Add,
                amount: 1
            }
        );
    }

    #[test]
    fn test_negative_target_clamps_to_sentinel() {
        let node = LogicNode::BranchHp {
            cmp: Compare::Lt,
            value: 0,
            target: 0,
        }
        .with_operands(50, -3);
        assert_eq!(
            node,
            LogicNode::BranchHp {
                cmp: Compare::Lt,
                value: 50,
                target: 0
            }
        );
    }

    #[test]
    fn test_multihit_description() {
        let node = ActionNode::new(ActionKind::Attack).with_attack(Some(Attack {
            multiplier: 50,
            min_hits: 2,
            max_hits: 4,
        }));
        assert_eq!(
            node.description(),
            "Deal 100%~200% damage (2~4 hits, 50% each)"
        );
    }
}
