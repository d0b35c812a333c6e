//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures surface as [`ApiError`] responses.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json};
use tracing::instrument;

use crate::domain::WrongAnswerNote;
use crate::error::Result;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(review = body.review_words.is_some()))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartSessionIn>,
) -> Result<Json<StartSessionOut>> {
  let session_token = start_session(&state, body).await?;
  Ok(Json(StartSessionOut { session_token }))
}

#[instrument(level = "info", skip(state), fields(token = %q.session_token))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Result<Json<QuestionOut>> {
  let step = next_question(&state, &q.session_token).await?;
  Ok(Json(question_out(step)))
}

#[instrument(level = "info", skip(state, body), fields(token = %body.session_token, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>> {
  let outcome = submit_answer(&state, &body.session_token, &body.question, &body.answer).await?;
  Ok(Json(answer_out(outcome)))
}

#[instrument(level = "info", skip(state), fields(token = %q.session_token))]
pub async fn http_get_score(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Result<Json<ScoreOut>> {
  let (score, remaining_time) = get_score(&state, &q.session_token).await?;
  Ok(Json(ScoreOut { score, remaining_time }))
}

#[instrument(level = "info", skip(state), fields(token = %q.session_token))]
pub async fn http_get_final_score(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SessionQuery>,
) -> Result<Json<FinalScoreOut>> {
  let (final_score, base_score, remaining_time) = final_score(&state, &q.session_token).await?;
  Ok(Json(FinalScoreOut { final_score, base_score, remaining_time }))
}

#[instrument(level = "info", skip(state, body), fields(token = %body.session_token, user_id = body.user_id))]
pub async fn http_post_finalize(
  State(state): State<Arc<AppState>>,
  Json(body): Json<FinalizeIn>,
) -> Result<Json<FinalizeOut>> {
  let outcome = finalize_session(&state, &body.session_token, body.user_id).await?;
  Ok(Json(FinalizeOut {
    exp_gained: outcome.exp_gained,
    level_up: outcome.level_up,
    new_badge: outcome.new_badge,
  }))
}

#[instrument(level = "info", skip(state), fields(user_id = q.user_id))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UserQuery>,
) -> Result<Json<ProgressOut>> {
  let (user, progress_percent) = user_progress(&state, q.user_id).await?;
  Ok(Json(ProgressOut {
    level: user.level,
    exp: user.exp,
    progress_percent,
    badges: user.badges,
    current_score: user.current_score,
    completed_tests: user.completed_tests,
  }))
}

#[instrument(level = "info", skip(state), fields(user_id = q.user_id))]
pub async fn http_get_wrong_notes(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UserQuery>,
) -> Json<Vec<WrongAnswerNote>> {
  Json(wrong_notes(&state, q.user_id).await)
}
