//! Scoring: difficulty-weighted points and the tiered time bonus.

use serde::Deserialize;

use crate::domain::Word;

/// Bonus multiplier tiers applied to the base score when a session ends,
/// keyed on how many seconds were left on the clock.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BonusPolicy {
  /// Seconds remaining at or above which the high multiplier applies.
  pub high_threshold_secs: f64,
  /// Seconds remaining at or above which the mid multiplier applies.
  pub mid_threshold_secs: f64,
  pub high_multiplier: f64,
  pub mid_multiplier: f64,
}

impl Default for BonusPolicy {
  fn default() -> Self {
    Self {
      high_threshold_secs: 10.0,
      mid_threshold_secs: 5.0,
      high_multiplier: 1.5,
      mid_multiplier: 1.2,
    }
  }
}

/// Points earned for one correctly answered word.
pub fn points_for(word: &Word, weight: u32) -> u32 {
  word.difficulty * weight
}

/// Apply the tiered time bonus to a finished session's base score.
pub fn final_score(base: u32, remaining_secs: f64, bonus: &BonusPolicy) -> f64 {
  let multiplier = if remaining_secs >= bonus.high_threshold_secs {
    bonus.high_multiplier
  } else if remaining_secs >= bonus.mid_threshold_secs {
    bonus.mid_multiplier
  } else {
    1.0
  };
  base as f64 * multiplier
}
