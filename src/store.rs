//! VocabStore: the persistence collaborator behind a narrow interface.
//!
//! This module owns:
//!   - the word pool (with per-word `used` flags)
//!   - word batches (at most one active at a time, enforced by rotation)
//!   - user progress rows, test records, and wrong-answer notes
//!
//! One RwLock guards the whole state, so every public call is atomic:
//! multi-field writes (weekly reset, progress updates) never land partially.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::{TestRecord, UserProgress, Word, WordBatch, WrongAnswerNote};
use crate::error::{ApiError, Result};

struct NoteRow {
    user_id: i64,
    batch_id: Option<String>,
    note: WrongAnswerNote,
}

#[derive(Default)]
struct StoreInner {
    words: Vec<Word>,
    batches: Vec<WordBatch>,
    users: HashMap<i64, UserProgress>,
    results: Vec<TestRecord>,
    notes: Vec<NoteRow>,
}

#[derive(Clone)]
pub struct VocabStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl VocabStore {
    /// Build a store over the given word pool and log the startup inventory.
    #[instrument(level = "info", skip_all)]
    pub fn new(words: Vec<Word>) -> Self {
        let mut count_by_difficulty: HashMap<u32, usize> = HashMap::new();
        for w in &words {
            *count_by_difficulty.entry(w.difficulty).or_insert(0) += 1;
        }
        for (difficulty, count) in count_by_difficulty {
            info!(target: "vocazoo_backend", difficulty, count, "Startup word inventory");
        }

        Self {
            inner: Arc::new(RwLock::new(StoreInner { words, ..StoreInner::default() })),
        }
    }

    pub async fn word_count(&self) -> usize {
        self.inner.read().await.words.len()
    }

    /// Up to `limit` not-yet-used words in random order.
    #[instrument(level = "debug", skip(self))]
    pub async fn unused_words(&self, limit: usize) -> Vec<Word> {
        let inner = self.inner.read().await;
        let mut picked: Vec<Word> = inner.words.iter().filter(|w| !w.used).cloned().collect();
        picked.shuffle(&mut rand::thread_rng());
        picked.truncate(limit);
        picked
    }

    /// Up to `limit` words in random order, skipping the excluded english keys.
    #[instrument(level = "debug", skip(self, exclude), fields(excluded = exclude.len()))]
    pub async fn sample_words(&self, limit: usize, exclude: &HashSet<String>) -> Vec<Word> {
        let inner = self.inner.read().await;
        let mut picked: Vec<Word> = inner
            .words
            .iter()
            .filter(|w| !exclude.contains(&w.english))
            .cloned()
            .collect();
        picked.shuffle(&mut rand::thread_rng());
        picked.truncate(limit);
        picked
    }

    /// Flag the given english keys as used by a rotation cycle.
    #[instrument(level = "debug", skip(self, keys), fields(keys = keys.len()))]
    pub async fn mark_used(&self, keys: &[String]) {
        let mut inner = self.inner.write().await;
        for w in inner.words.iter_mut() {
            if keys.iter().any(|k| *k == w.english) {
                w.used = true;
            }
        }
    }

    /// Clear every `used` flag (full-cycle restart). Returns how many were set.
    #[instrument(level = "debug", skip(self))]
    pub async fn reset_all_used_flags(&self) -> usize {
        let mut inner = self.inner.write().await;
        let mut cleared = 0;
        for w in inner.words.iter_mut() {
            if w.used {
                w.used = false;
                cleared += 1;
            }
        }
        debug!(target: "rotation", cleared, "Reset used flags on word pool");
        cleared
    }

    pub async fn active_batch(&self) -> Option<WordBatch> {
        self.inner.read().await.batches.iter().find(|b| b.active).cloned()
    }

    pub async fn batch(&self, id: &str) -> Option<WordBatch> {
        self.inner.read().await.batches.iter().find(|b| b.id == id).cloned()
    }

    /// English keys already claimed by any existing batch.
    pub async fn english_keys_in_batches(&self) -> HashSet<String> {
        let inner = self.inner.read().await;
        inner
            .batches
            .iter()
            .flat_map(|b| b.words.iter().map(|w| w.english.clone()))
            .collect()
    }

    pub async fn insert_batch(&self, batch: WordBatch) {
        self.inner.write().await.batches.push(batch);
    }

    /// Deactivate whichever batch is active; returns its id.
    #[instrument(level = "debug", skip(self))]
    pub async fn deactivate_current_batch(&self) -> Option<String> {
        let mut inner = self.inner.write().await;
        for b in inner.batches.iter_mut() {
            if b.active {
                b.active = false;
                return Some(b.id.clone());
            }
        }
        None
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn activate_batch(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.batches.iter_mut().find(|b| b.id == id) {
            Some(b) => {
                b.active = true;
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("word batch {}", id))),
        }
    }

    pub async fn get_user(&self, id: i64) -> Option<UserProgress> {
        self.inner.read().await.users.get(&id).cloned()
    }

    /// Fetch a user, creating a fresh level-1 row on first sight (idempotent).
    #[instrument(level = "debug", skip(self))]
    pub async fn ensure_user(&self, id: i64) -> UserProgress {
        let mut inner = self.inner.write().await;
        inner.users.entry(id).or_insert_with(|| UserProgress::new(id)).clone()
    }

    #[instrument(level = "debug", skip(self, badges))]
    pub async fn update_user_progress(
        &self,
        id: i64,
        level: u32,
        exp: u32,
        badges: Vec<String>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(u) => {
                u.level = level;
                u.exp = exp;
                u.badges = badges;
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("user {}", id))),
        }
    }

    /// Add `delta` to the user's running weekly score; returns the new total.
    #[instrument(level = "debug", skip(self))]
    pub async fn increment_user_score(&self, id: i64, delta: f64) -> Result<f64> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(u) => {
                u.current_score += delta;
                Ok(u.current_score)
            }
            None => Err(ApiError::NotFound(format!("user {}", id))),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn increment_completed_tests(&self, id: i64) -> Result<u32> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(u) => {
                u.completed_tests += 1;
                Ok(u.completed_tests)
            }
            None => Err(ApiError::NotFound(format!("user {}", id))),
        }
    }

    pub async fn append_test_result(&self, record: TestRecord) {
        self.inner.write().await.results.push(record);
    }

    pub async fn results_for(&self, user_id: i64) -> Vec<TestRecord> {
        self.inner
            .read()
            .await
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Store the notes a session got wrong, tagged with its batch generation.
    #[instrument(level = "debug", skip(self, notes), fields(notes = notes.len()))]
    pub async fn append_wrong_notes(
        &self,
        user_id: i64,
        batch_id: Option<String>,
        notes: &[WrongAnswerNote],
    ) {
        let mut inner = self.inner.write().await;
        for note in notes {
            inner.notes.push(NoteRow {
                user_id,
                batch_id: batch_id.clone(),
                note: note.clone(),
            });
        }
    }

    pub async fn wrong_notes_for(&self, user_id: i64) -> Vec<WrongAnswerNote> {
        self.inner
            .read()
            .await
            .notes
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.note.clone())
            .collect()
    }

    /// Drop every note scoped to a retired batch generation. Returns how
    /// many were removed.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear_wrong_notes(&self, batch_id: &str) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.notes.len();
        inner.notes.retain(|row| row.batch_id.as_deref() != Some(batch_id));
        before - inner.notes.len()
    }

    /// Weekly reset: zero every user's running score and append a zero-score
    /// record per user as the reset marker. One write lock, so readers never
    /// observe a half-reset week. Returns how many users were reset.
    #[instrument(level = "info", skip(self))]
    pub async fn reset_all_scores(&self) -> usize {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let ids: Vec<i64> = inner.users.keys().copied().collect();
        for id in &ids {
            if let Some(u) = inner.users.get_mut(id) {
                u.current_score = 0.0;
            }
            inner.results.push(TestRecord {
                user_id: *id,
                score: 0.0,
                solved_count: 0,
                wrong_answers: vec![],
                batch_id: None,
                completed_at: now,
            });
        }
        ids.len()
    }
}
