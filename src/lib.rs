//! Vocazoo · Vocabulary Drill Backend
//!
//! - Axum HTTP + WebSocket API
//! - In-memory word bank with periodic word-set rotation
//! - Quiz sessions with fuzzy answer grading and time-boxed scoring
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   VOCAZOO_CONFIG_PATH : path to TOML config (quiz + rotation policies)
//!   WORD_BANK_PATH      : path to TOML word bank (falls back to built-in seeds)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

pub mod config;
pub mod domain;
pub mod error;
pub mod level;
pub mod logic;
pub mod matcher;
pub mod protocol;
pub mod rotation;
pub mod routes;
pub mod scheduler;
pub mod scoring;
pub mod seeds;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod wordbank;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

/// Start the server: telemetry, shared state, background jobs, HTTP serve.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (word store, rotator, session registry).
  let state = Arc::new(AppState::new());

  // Make sure a word set is active before the first request, then start
  // the rotation and score reset jobs.
  state.rotator.ensure_active_batch().await?;
  scheduler::spawn_jobs(state.clone());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "vocazoo_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
