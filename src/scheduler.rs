//! Periodic jobs: the rotation tick and the weekly score reset.
//!
//! Plain tokio interval tasks. Deployments that prefer an external cron can
//! drive the same `on_rotation_tick` / `on_weekly_reset` operations instead.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, instrument};

use crate::state::AppState;

/// Spawn the rotation and score-reset loops for the life of the process.
/// The first tick of each job fires after one full interval; startup
/// rotation is the bootstrap's job, not the scheduler's.
#[instrument(level = "info", skip_all)]
pub fn spawn_jobs(state: Arc<AppState>) {
  let rotation_every = Duration::from_secs(state.config.rotation.rotation_interval_secs);
  let reset_every = Duration::from_secs(state.config.rotation.score_reset_interval_secs);

  let rotate_state = state.clone();
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(rotation_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // the immediate first tick
    loop {
      ticker.tick().await;
      if let Err(e) = rotate_state.rotator.on_rotation_tick().await {
        error!(target: "rotation", error = %e, "Scheduled rotation failed; stale batch stays active");
      }
    }
  });

  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(reset_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
      ticker.tick().await;
      state.rotator.on_weekly_reset().await;
    }
  });
}
