//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Handlers stay thin: everything that touches sessions, the store, or the
//! progression tables goes through here so both route families behave
//! identically.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::domain::{TestRecord, UserProgress, Word, WrongAnswerNote};
use crate::error::{ApiError, Result};
use crate::level;
use crate::protocol::{ReviewWordIn, StartSessionIn};
use crate::session::{FinalOutcome, QuestionStep, QuizSession, SubmitOutcome};
use crate::state::AppState;

/// Start a quiz attempt: standard (sampled from a batch) or review (over the
/// posted wrong-answer words). Returns the session token.
#[instrument(level = "info", skip(state, req), fields(review = req.review_words.is_some()))]
pub async fn start_session(state: &AppState, req: StartSessionIn) -> Result<String> {
  let mut policy = state.config.quiz.clone();
  if let Some(n) = req.sample_size {
    if n == 0 {
      return Err(ApiError::Validation("sample_size must be positive".into()));
    }
    policy.sample_size = n;
  }

  let session = if let Some(review_words) = req.review_words {
    let words = review_words.into_iter().map(review_word).collect();
    QuizSession::start_review(words, &policy)?
  } else {
    let batch = match &req.word_set_id {
      Some(id) => state
        .store
        .batch(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("word batch {}", id)))?,
      None => state
        .store
        .active_batch()
        .await
        .ok_or_else(|| ApiError::NotFound("no active word batch".into()))?,
    };
    QuizSession::start(&batch, &policy)?
  };

  let review = session.review;
  let token = state.register_session(session).await;
  info!(target: "quiz", %token, review, "Session started");
  Ok(token)
}

fn review_word(w: ReviewWordIn) -> Word {
  Word {
    english: w.english,
    korean: w.korean,
    difficulty: w.difficulty.unwrap_or(1).clamp(1, 5),
    used: false,
  }
}

async fn session_for(state: &AppState, token: &str) -> Result<Arc<Mutex<QuizSession>>> {
  state
    .session(token)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("session {}", token)))
}

#[instrument(level = "info", skip(state))]
pub async fn next_question(state: &AppState, token: &str) -> Result<QuestionStep> {
  let session = session_for(state, token).await?;
  let mut session = session.lock().await;
  let step = session.next_question()?;
  debug!(target: "quiz", %token, ?step, "Question step");
  Ok(step)
}

/// Grade an answer. The `question` field is advisory: grading always targets
/// the word actually being served, a mismatch is only logged.
#[instrument(level = "info", skip(state, answer), fields(answer_len = answer.len()))]
pub async fn submit_answer(
  state: &AppState,
  token: &str,
  question: &str,
  answer: &str,
) -> Result<SubmitOutcome> {
  let session = session_for(state, token).await?;
  let mut session = session.lock().await;
  if let Some(serving) = session.current_prompt() {
    if serving != question {
      debug!(target: "quiz", %token, claimed = %question, %serving, "Answer payload names a different question");
    }
  }
  let outcome = session.submit_answer(answer);
  info!(target: "quiz", %token, result = ?outcome.result, score = session.get_score().0, "Answer graded");
  Ok(outcome)
}

pub async fn get_score(state: &AppState, token: &str) -> Result<(u32, f64)> {
  let session = session_for(state, token).await?;
  let session = session.lock().await;
  Ok(session.get_score())
}

pub async fn final_score(state: &AppState, token: &str) -> Result<(f64, u32, f64)> {
  let session = session_for(state, token).await?;
  let session = session.lock().await;
  Ok(session.final_score())
}

/// Close out a session: freeze its outcome, append the test record, and (for
/// standard sessions) credit score, notes, exp, level, and badges to the
/// user. Idempotent: a repeat call returns the frozen first outcome without
/// touching anything again.
#[instrument(level = "info", skip(state))]
pub async fn finalize_session(state: &AppState, token: &str, user_id: i64) -> Result<FinalOutcome> {
  let session = session_for(state, token).await?;
  let mut session = session.lock().await;

  if let Some(existing) = session.finalized() {
    debug!(target: "quiz", %token, "Finalize repeated; returning frozen outcome");
    return Ok(existing.clone());
  }

  let (final_score, base_score, remaining_secs) = session.final_score();
  let record = TestRecord {
    user_id,
    score: final_score,
    solved_count: session.answered(),
    wrong_answers: session.wrong_answers().to_vec(),
    batch_id: session.batch_id.clone(),
    completed_at: Utc::now(),
  };

  let outcome = if session.review {
    state.store.append_test_result(record).await;
    FinalOutcome {
      final_score,
      base_score,
      remaining_secs,
      exp_gained: 0,
      level_up: false,
      new_badge: None,
    }
  } else {
    let user = state.store.ensure_user(user_id).await;
    state.store.append_test_result(record).await;
    state.store.increment_user_score(user_id, final_score).await?;
    state.store.increment_completed_tests(user_id).await?;
    if !session.wrong_answers().is_empty() {
      state
        .store
        .append_wrong_notes(user_id, session.batch_id.clone(), session.wrong_answers())
        .await;
    }

    let exp_gained = level::exp_gain(final_score, user.level);
    let (new_level, new_exp, level_up) = level::apply_gain(user.level, user.exp, exp_gained);
    let new_badge = if level_up { level::badge_for(new_level) } else { None };
    let mut badges = user.badges;
    if let Some(b) = &new_badge {
      if !badges.contains(b) {
        badges.push(b.clone());
      }
    }
    state.store.update_user_progress(user_id, new_level, new_exp, badges).await?;

    FinalOutcome { final_score, base_score, remaining_secs, exp_gained, level_up, new_badge }
  };

  session.mark_finalized(outcome.clone());
  info!(
    target: "quiz",
    %token,
    user_id,
    final_score = outcome.final_score,
    exp_gained = outcome.exp_gained,
    level_up = outcome.level_up,
    "Session finalized"
  );
  Ok(outcome)
}

/// Progress surface for profile screens: the stored row plus the derived
/// percent into the current level.
#[instrument(level = "info", skip(state))]
pub async fn user_progress(state: &AppState, user_id: i64) -> Result<(UserProgress, f64)> {
  let user = state
    .store
    .get_user(user_id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("user {}", user_id)))?;
  let percent = level::progress_percent(user.level, user.exp);
  Ok((user, percent))
}

pub async fn wrong_notes(state: &AppState, user_id: i64) -> Vec<WrongAnswerNote> {
  state.store.wrong_notes_for(user_id).await
}
