//! Domain models used by the backend: words, word batches, grading outcomes, and user progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single vocabulary entry.
/// `korean` may carry several accepted translations separated by commas
/// (e.g. "집,가정"); the matcher grades against each form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Word {
  pub english: String,
  pub korean: String,
  pub difficulty: u32,   // 1..=5
  #[serde(default)] pub used: bool,
}

/// Fixed snapshot of words assigned to one rotation cycle.
/// Immutable once created; `active` flips only through rotation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordBatch {
  pub id: String,
  pub words: Vec<Word>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

/// How a submitted answer was graded (or why it was not).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerResult {
  Correct,          // exact match on an accepted form
  CorrectWithTypo,  // fuzzy match at or above the similarity threshold
  Wrong,
  TimeOver,   // session clock ran out before grading
  Invalid,    // nothing served, or the served word was already graded
}

/// Per-user progression state. Mutated only at finalize and by the weekly reset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProgress {
  pub id: i64,
  pub level: u32,   // 1..=100
  pub exp: u32,
  pub badges: Vec<String>,
  pub current_score: f64,
  pub completed_tests: u32,
}

impl UserProgress {
  /// Fresh account at level 1 with nothing earned yet.
  pub fn new(id: i64) -> Self {
    Self { id, level: 1, exp: 0, badges: vec![], current_score: 0.0, completed_tests: 0 }
  }
}

/// One finished quiz attempt (or a zero-score reset marker).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestRecord {
  pub user_id: i64,
  pub score: f64,
  pub solved_count: u32,
  pub wrong_answers: Vec<WrongAnswerNote>,
  pub batch_id: Option<String>,
  pub completed_at: DateTime<Utc>,
}

/// A missed question kept for later review sessions.
/// Field names stay camelCase on the wire; the review frontend reads them as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongAnswerNote {
  pub question: String,
  #[serde(rename = "userAnswer")]
  pub user_answer: String,
  #[serde(rename = "correctAnswer")]
  pub correct_answer: String,
}
