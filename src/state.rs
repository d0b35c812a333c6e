//! Application state: the store, the rotator, runtime policy, and the
//! session registry.
//!
//! Sessions live behind two locks: the registry RwLock only guards the map,
//! while each session carries its own Mutex so start/next/submit/finalize
//! for one token are serialized without blocking other tokens.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::domain::Word;
use crate::rotation::WordSetRotator;
use crate::seeds::seed_words;
use crate::session::QuizSession;
use crate::store::VocabStore;
use crate::wordbank::load_word_bank_from_env;

#[derive(Clone)]
pub struct AppState {
    pub store: VocabStore,
    pub rotator: Arc<WordSetRotator>,
    pub config: AppConfig,
    // TODO: evict finalized sessions after a grace period; the registry
    // currently grows for the life of the process.
    pub sessions: Arc<RwLock<HashMap<String, Arc<Mutex<QuizSession>>>>>,
}

impl AppState {
    /// Build state from env: load config and the word pool, then wire the
    /// store and rotator. Without a bank file the built-in seeds serve.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_config_from_env().unwrap_or_default();
        let words = load_word_bank_from_env().unwrap_or_else(|| {
            info!(target: "vocazoo_backend", "No word bank configured; using built-in seeds");
            seed_words()
        });
        Self::with_parts(config, words)
    }

    /// State over explicit parts; tests drive this directly.
    pub fn with_parts(config: AppConfig, words: Vec<Word>) -> Self {
        let store = VocabStore::new(words);
        let rotator = Arc::new(WordSetRotator::new(store.clone(), config.rotation.clone()));
        Self {
            store,
            rotator,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Park a session in the registry; returns its token.
    #[instrument(level = "debug", skip_all, fields(token = %session.token))]
    pub async fn register_session(&self, session: QuizSession) -> String {
        let token = session.token.clone();
        self.sessions
            .write()
            .await
            .insert(token.clone(), Arc::new(Mutex::new(session)));
        token
    }

    /// Look up a session by token.
    pub async fn session(&self, token: &str) -> Option<Arc<Mutex<QuizSession>>> {
        self.sessions.read().await.get(token).cloned()
    }
}
