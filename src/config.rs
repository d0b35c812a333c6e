//! Runtime policy loaded from TOML: quiz knobs and rotation cadence.
//!
//! Every field has a default, so a partial file (or no file at all) still
//! yields a fully working configuration.

use serde::Deserialize;
use tracing::{error, info};

use crate::scoring::BonusPolicy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub quiz: QuizPolicy,
  #[serde(default)]
  pub rotation: RotationPolicy,
}

/// Knobs for one quiz attempt. Review sessions reuse the same policy with
/// their own time limit (and optionally their own bonus tiers).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizPolicy {
  pub time_limit_secs: u64,
  pub review_time_limit_secs: u64,
  pub sample_size: usize,
  pub fuzzy_threshold: f64,
  pub score_weight: u32,
  pub bonus: BonusPolicy,
  pub review_bonus: Option<BonusPolicy>,
}

impl Default for QuizPolicy {
  fn default() -> Self {
    Self {
      time_limit_secs: 30,
      review_time_limit_secs: 60,
      sample_size: 10,
      fuzzy_threshold: 0.85,
      score_weight: 10,
      bonus: BonusPolicy::default(),
      review_bonus: None,
    }
  }
}

impl QuizPolicy {
  pub fn time_limit_for(&self, review: bool) -> u64 {
    if review { self.review_time_limit_secs } else { self.time_limit_secs }
  }

  pub fn bonus_for(&self, review: bool) -> &BonusPolicy {
    if review {
      self.review_bonus.as_ref().unwrap_or(&self.bonus)
    } else {
      &self.bonus
    }
  }
}

/// How often word sets rotate and weekly scores reset.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
  pub pool_size: usize,
  pub rotation_interval_secs: u64,
  pub score_reset_interval_secs: u64,
}

impl Default for RotationPolicy {
  fn default() -> Self {
    Self {
      pool_size: 30,
      rotation_interval_secs: 86_400,
      score_reset_interval_secs: 604_800,
    }
  }
}

/// Attempt to load `AppConfig` from VOCAZOO_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("VOCAZOO_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "vocazoo_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "vocazoo_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "vocazoo_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
