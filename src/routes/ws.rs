//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::{answer_out, question_out, ClientWsMessage, ServerWsMessage, StartSessionIn};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "vocazoo_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "vocazoo_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "vocazoo_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "vocazoo_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "vocazoo_backend", "WebSocket disconnected");
}

fn ws_error(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string() }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartSession { word_set_id, sample_size, review_words } => {
      let req = StartSessionIn { word_set_id, sample_size, review_words };
      match start_session(state, req).await {
        Ok(session_token) => ServerWsMessage::SessionStarted { session_token },
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::NextQuestion { session_token } => {
      match next_question(state, &session_token).await {
        Ok(step) => {
          let out = question_out(step);
          ServerWsMessage::Question { english: out.english, completed: out.completed }
        }
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::SubmitAnswer { session_token, question, answer } => {
      match submit_answer(state, &session_token, &question, &answer).await {
        Ok(outcome) => {
          let out = answer_out(outcome);
          ServerWsMessage::AnswerResult {
            result: out.result,
            message: out.message,
            correct_answer: out.correct_answer,
          }
        }
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::GetScore { session_token } => {
      match get_score(state, &session_token).await {
        Ok((score, remaining_time)) => ServerWsMessage::Score { score, remaining_time },
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::GetFinalScore { session_token } => {
      match final_score(state, &session_token).await {
        Ok((final_score, base_score, remaining_time)) => {
          ServerWsMessage::FinalScore { final_score, base_score, remaining_time }
        }
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::Finalize { session_token, user_id } => {
      match finalize_session(state, &session_token, user_id).await {
        Ok(outcome) => ServerWsMessage::Finalized {
          exp_gained: outcome.exp_gained,
          level_up: outcome.level_up,
          new_badge: outcome.new_badge,
        },
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::GetProgress { user_id } => {
      match user_progress(state, user_id).await {
        Ok((user, progress_percent)) => ServerWsMessage::Progress {
          level: user.level,
          exp: user.exp,
          progress_percent,
          badges: user.badges,
          current_score: user.current_score,
          completed_tests: user.completed_tests,
        },
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::GetWrongNotes { user_id } => {
      ServerWsMessage::WrongNotes { notes: wrong_notes(state, user_id).await }
    }
  }
}
