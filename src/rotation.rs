//! Word-set rotation: carving cycles out of the pool, swapping the active
//! batch, and the periodic tick operations (rotation + weekly score reset).

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::RotationPolicy;
use crate::domain::WordBatch;
use crate::error::{ApiError, Result};
use crate::store::VocabStore;

pub struct WordSetRotator {
  store: VocabStore,
  policy: RotationPolicy,
  // Serializes rotations so two ticks never claim the same words.
  rotation_lock: Mutex<()>,
}

impl WordSetRotator {
  pub fn new(store: VocabStore, policy: RotationPolicy) -> Self {
    Self { store, policy, rotation_lock: Mutex::new(()) }
  }

  /// Take up to `pool_size` unused words in random order, marking them used.
  /// When fewer than a full cycle remain unused, every flag is cleared first
  /// and the sample restarts from the whole pool. An empty pool yields an
  /// empty batch.
  async fn select_batch(&self) -> WordBatch {
    let pool_size = self.policy.pool_size;
    let mut words = self.store.unused_words(pool_size).await;
    if words.len() < pool_size {
      let cleared = self.store.reset_all_used_flags().await;
      info!(target: "rotation", unused = words.len(), cleared, "Pool short of a full cycle; restarting from everything");
      words = self.store.unused_words(pool_size).await;
    }
    let keys: Vec<String> = words.iter().map(|w| w.english.clone()).collect();
    self.store.mark_used(&keys).await;
    WordBatch { id: Uuid::new_v4().to_string(), words, active: false, created_at: Utc::now() }
  }

  /// Swap the active cycle. The replacement is selected first; only then is
  /// the old batch deactivated, the new one activated, and the notes scoped
  /// to the retired generation dropped. A failed selection leaves the stale
  /// batch active.
  #[instrument(level = "info", skip(self))]
  pub async fn rotate(&self) -> Result<WordBatch> {
    let _guard = self.rotation_lock.lock().await;

    let batch = self.select_batch().await;
    if batch.words.is_empty() {
      warn!(target: "rotation", "Word pool is empty; keeping the current batch");
      return Err(ApiError::InsufficientWords { available: 0, required: 1 });
    }
    self.store.insert_batch(batch.clone()).await;

    let retired = self.store.deactivate_current_batch().await;
    self.store.activate_batch(&batch.id).await?;
    if let Some(old_id) = retired {
      let cleared = self.store.clear_wrong_notes(&old_id).await;
      info!(target: "rotation", retired = %old_id, cleared_notes = cleared, "Retired previous batch");
    }
    info!(target: "rotation", batch = %batch.id, words = batch.words.len(), "Activated new word batch");
    Ok(batch)
  }

  /// Admin-seeded batch, created inactive (a later rotation or manual
  /// activation puts it in play). Prefers words outside `exclude`; when the
  /// exclusion leaves a short batch, falls back to an unfiltered sample.
  #[instrument(level = "info", skip(self, exclude), fields(excluded = exclude.len()))]
  pub async fn create_manual_batch(&self, exclude: &HashSet<String>) -> Result<WordBatch> {
    let _guard = self.rotation_lock.lock().await;

    let pool_size = self.policy.pool_size;
    let mut words = self.store.sample_words(pool_size, exclude).await;
    if words.len() < pool_size {
      warn!(target: "rotation", available = words.len(), "Exclusion left a short batch; sampling without it");
      words = self.store.sample_words(pool_size, &HashSet::new()).await;
    }
    if words.is_empty() {
      return Err(ApiError::InsufficientWords { available: 0, required: 1 });
    }
    let batch = WordBatch { id: Uuid::new_v4().to_string(), words, active: false, created_at: Utc::now() };
    self.store.insert_batch(batch.clone()).await;
    info!(target: "rotation", batch = %batch.id, words = batch.words.len(), "Created manual batch");
    Ok(batch)
  }

  /// Generic tick interface for whatever scheduler drives rotation.
  pub async fn on_rotation_tick(&self) -> Result<WordBatch> {
    self.rotate().await
  }

  /// Weekly job: zero running scores and write the per-user reset markers.
  #[instrument(level = "info", skip(self))]
  pub async fn on_weekly_reset(&self) -> usize {
    let reset = self.store.reset_all_scores().await;
    info!(target: "rotation", users = reset, "Weekly score reset complete");
    reset
  }

  /// Startup bootstrap: the serving path needs an active batch, so rotate
  /// once if none survived from a previous run.
  #[instrument(level = "info", skip(self))]
  pub async fn ensure_active_batch(&self) -> Result<()> {
    if self.store.active_batch().await.is_some() {
      return Ok(());
    }
    info!(target: "rotation", "No active batch at startup; rotating");
    self.rotate().await.map(|_| ())
  }
}
