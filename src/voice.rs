//! Built-in voice presets.
//!
//! The studio exposes a fixed catalog of Mandarin Kokoro voices named
//! `zf_001`..`zf_010` and `zm_001`..`zm_010`. Anything else is rejected
//! before it can reach the model.

use std::fmt;
use std::str::FromStr;

use crate::error::StudioError;

/// Number of presets per gender.
pub const PRESETS_PER_GENDER: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    fn tag(self) -> char {
        match self {
            Gender::Female => 'f',
            Gender::Male => 'm',
        }
    }
}

/// A voice preset from the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Voice {
    gender: Gender,
    number: u8,
}

impl Voice {
    /// Build a preset, returning `None` outside the catalog.
    pub fn new(gender: Gender, number: u8) -> Option<Self> {
        (1..=PRESETS_PER_GENDER)
            .contains(&number)
            .then_some(Self { gender, number })
    }

    /// All presets in display order: female voices first, then male.
    pub fn all() -> impl Iterator<Item = Voice> {
        [Gender::Female, Gender::Male].into_iter().flat_map(|gender| {
            (1..=PRESETS_PER_GENDER).map(move |number| Voice { gender, number })
        })
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// The voice name as stored in the voice archive, e.g. `zf_001`.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl Default for Voice {
    fn default() -> Self {
        Voice {
            gender: Gender::Female,
            number: 1,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z{}_{:03}", self.gender.tag(), self.number)
    }
}

impl FromStr for Voice {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StudioError::InvalidVoice(s.to_string());

        let gender = match s.get(..3) {
            Some("zf_") => Gender::Female,
            Some("zm_") => Gender::Male,
            _ => return Err(invalid()),
        };
        let digits = &s[3..];
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: u8 = digits.parse().map_err(|_| invalid())?;
        Voice::new(gender, number).ok_or_else(invalid)
    }
}
