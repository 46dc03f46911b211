use serde::{Deserialize, Serialize};

use crate::error::{BeastError, Result};
use crate::session::question::Difficulty;

/// Self-reported confidence on a 1..=5 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(BeastError::InvalidConfidence(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Ratings of 4 and 5 count as "sure" for calibration and overreach.
    pub fn is_high(self) -> bool {
        self.0 >= 4
    }
}

impl TryFrom<u8> for Confidence {
    type Error = BeastError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(c: Confidence) -> u8 {
        c.0
    }
}

/// Streak length past which the bonus stops growing.
pub const STREAK_BONUS_CAP: u32 = 10;

/// Points for one answer: `round((weight + confidence + min(streak * 0.5, 5)) * 10)`
/// for a correct answer, 0 otherwise. `streak` already includes this answer.
///
/// Every term is a multiple of 0.5, so the score is computed in tenths with
/// integer arithmetic and needs no rounding.
pub fn beast_score(
    is_correct: bool,
    confidence: Confidence,
    difficulty: Difficulty,
    streak: u32,
) -> u32 {
    if !is_correct {
        return 0;
    }
    let weight = difficulty.weight() * 10;
    let confidence = u32::from(confidence.value()) * 10;
    let streak_bonus = streak.min(STREAK_BONUS_CAP) * 5;
    weight + confidence + streak_bonus
}
