//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Field spellings are part of the wire contract; keep them stable.

use serde::{Deserialize, Serialize};

use crate::domain::{AnswerResult, WrongAnswerNote};
use crate::session::{QuestionStep, SubmitOutcome};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartSession {
        #[serde(default)]
        word_set_id: Option<String>,
        #[serde(default)]
        sample_size: Option<usize>,
        #[serde(default)]
        review_words: Option<Vec<ReviewWordIn>>,
    },
    NextQuestion {
        session_token: String,
    },
    SubmitAnswer {
        session_token: String,
        question: String,
        answer: String,
    },
    GetScore {
        session_token: String,
    },
    GetFinalScore {
        session_token: String,
    },
    Finalize {
        session_token: String,
        user_id: i64,
    },
    GetProgress {
        user_id: i64,
    },
    GetWrongNotes {
        user_id: i64,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    SessionStarted {
        session_token: String,
    },
    Question {
        #[serde(skip_serializing_if = "Option::is_none")]
        english: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        completed: Option<bool>,
    },
    AnswerResult {
        result: AnswerResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },
    Score {
        score: u32,
        remaining_time: f64,
    },
    FinalScore {
        final_score: f64,
        base_score: u32,
        remaining_time: f64,
    },
    Finalized {
        exp_gained: u32,
        level_up: bool,
        new_badge: Option<String>,
    },
    Progress {
        level: u32,
        exp: u32,
        progress_percent: f64,
        badges: Vec<String>,
        current_score: f64,
        completed_tests: u32,
    },
    WrongNotes {
        notes: Vec<WrongAnswerNote>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

/// One review word as posted by the client (built from stored notes).
#[derive(Clone, Debug, Deserialize)]
pub struct ReviewWordIn {
    pub english: String,
    pub korean: String,
    #[serde(default)]
    pub difficulty: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionIn {
    #[serde(default)]
    pub word_set_id: Option<String>,
    #[serde(default)]
    pub sample_size: Option<usize>,
    #[serde(default)]
    pub review_words: Option<Vec<ReviewWordIn>>,
}

#[derive(Serialize)]
pub struct StartSessionOut {
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_token: String,
}

/// `{english}` while running, `{completed: true}` after the last word,
/// `{}` once the clock ran out.
#[derive(Serialize)]
pub struct QuestionOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub session_token: String,
    pub question: String,
    pub answer: String,
}

#[derive(Serialize)]
pub struct AnswerOut {
    pub result: AnswerResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

#[derive(Serialize)]
pub struct ScoreOut {
    pub score: u32,
    pub remaining_time: f64,
}

#[derive(Serialize)]
pub struct FinalScoreOut {
    pub final_score: f64,
    pub base_score: u32,
    pub remaining_time: f64,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeIn {
    pub session_token: String,
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct FinalizeOut {
    pub exp_gained: u32,
    pub level_up: bool,
    pub new_badge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct ProgressOut {
    pub level: u32,
    pub exp: u32,
    pub progress_percent: f64,
    pub badges: Vec<String>,
    pub current_score: f64,
    pub completed_tests: u32,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Convert a session step into the wire shape shared by HTTP and WS.
pub fn question_out(step: QuestionStep) -> QuestionOut {
    match step {
        QuestionStep::Question(english) => QuestionOut {
            english: Some(english),
            completed: None,
        },
        QuestionStep::Completed => QuestionOut {
            english: None,
            completed: Some(true),
        },
        QuestionStep::Expired => QuestionOut {
            english: None,
            completed: None,
        },
    }
}

/// Convert a grading outcome into the wire shape shared by HTTP and WS.
pub fn answer_out(outcome: SubmitOutcome) -> AnswerOut {
    AnswerOut {
        result: outcome.result,
        message: outcome.message,
        correct_answer: outcome.correct_answer,
    }
}
