//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Identifier of an enemy skill record
pub type SkillId = i32;

/// Monster number a script belongs to
pub type MonsterId = u32;

/// Skill id carried by the synthetic countdown marker
pub const COUNTDOWN_SKILL_ID: SkillId = -1;

/// Orb attributes, in the bit order used by parameter bitmaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    Fire,
    Water,
    Wood,
    Light,
    Dark,
    Heal,
    Jammer,
    Poison,
    MortalPoison,
    Bomb,
}

impl Attribute {
    pub const ALL: [Attribute; 10] = [
        Attribute::Fire,
        Attribute::Water,
        Attribute::Wood,
        Attribute::Light,
        Attribute::Dark,
        Attribute::Heal,
        Attribute::Jammer,
        Attribute::Poison,
        Attribute::MortalPoison,
        Attribute::Bomb,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Set of orb attributes as stored in a parameter slot
///
/// `-1` in the source data means "random attribute" and is kept distinct
/// from the empty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OrbMask(pub i32);

impl OrbMask {
    pub const RANDOM: OrbMask = OrbMask(-1);

    /// Only the first nine bits name orb attributes; bombs are never masked
    const WIDTH: u32 = 9;

    pub fn from_attributes(attributes: &[Attribute]) -> Self {
        Self(attributes.iter().fold(0, |acc, a| acc | a.bit() as i32))
    }

    pub fn is_random(self) -> bool {
        self.0 == -1
    }

    pub fn bits(self) -> u32 {
        if self.is_random() {
            0
        } else {
            (self.0 as u32) & ((1 << Self::WIDTH) - 1)
        }
    }

    pub fn attributes(self) -> Vec<Attribute> {
        let bits = self.bits();
        Attribute::ALL
            .iter()
            .copied()
            .filter(|a| bits & a.bit() != 0)
            .collect()
    }

    /// Attributes whose bit is *not* set, limited to the six board colors
    pub fn inverse_colors(self) -> Vec<Attribute> {
        let bits = self.bits();
        Attribute::ALL[..6]
            .iter()
            .copied()
            .filter(|a| bits & a.bit() == 0)
            .collect()
    }

    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        !self.is_random() && self.bits() == 0
    }
}

/// Comparison operator used by branch nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compare {
    Lt,
    Le,
    Eq,
    Ge,
}

impl Compare {
    pub fn holds<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Compare::Lt => lhs < rhs,
            Compare::Le => lhs <= rhs,
            Compare::Eq => lhs == rhs,
            Compare::Ge => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Compare::Lt => "<",
            Compare::Le => "<=",
            Compare::Eq => "=",
            Compare::Ge => ">=",
        }
    }
}
