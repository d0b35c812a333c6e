//! Word-pool ingestion from a declarative TOML file (WORD_BANK_PATH).
//!
//! Expected schema:
//!
//! ```toml
//! [[words]]
//! english = "apple"
//! korean = "사과"       # several accepted forms: "집,가정"
//! difficulty = 1        # 1..=5
//! ```

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::Word;

#[derive(Debug, Deserialize)]
struct WordBankFile {
  #[serde(default)]
  words: Vec<WordRow>,
}

#[derive(Debug, Deserialize)]
struct WordRow {
  english: String,
  korean: String,
  difficulty: u32,
}

/// Attempt to load the word pool from WORD_BANK_PATH. On any parsing/IO
/// error, returns None so callers can fall back to the built-in seeds.
pub fn load_word_bank_from_env() -> Option<Vec<Word>> {
  let path = std::env::var("WORD_BANK_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_word_bank(&s) {
      Ok(words) => {
        info!(target: "vocazoo_backend", %path, count = words.len(), "Loaded word bank (TOML)");
        Some(words)
      }
      Err(e) => {
        error!(target: "vocazoo_backend", %path, error = %e, "Failed to parse word bank");
        None
      }
    },
    Err(e) => {
      error!(target: "vocazoo_backend", %path, error = %e, "Failed to read word bank file");
      None
    }
  }
}

/// Parse and sanitize a TOML word bank. Entries with blank text or an
/// out-of-range difficulty are dropped; duplicate english keys keep the
/// first occurrence.
pub fn parse_word_bank(s: &str) -> Result<Vec<Word>, toml::de::Error> {
  let file: WordBankFile = toml::from_str(s)?;
  let mut seen = HashSet::new();
  let mut out = Vec::with_capacity(file.words.len());
  for row in file.words {
    let english = row.english.trim().to_string();
    let korean = row.korean.trim().to_string();
    if english.is_empty() || korean.is_empty() {
      warn!(target: "vocazoo_backend", "Skipping word bank entry with blank english/korean");
      continue;
    }
    if !(1..=5).contains(&row.difficulty) {
      warn!(target: "vocazoo_backend", %english, difficulty = row.difficulty, "Skipping word bank entry with out-of-range difficulty");
      continue;
    }
    if !seen.insert(english.clone()) {
      warn!(target: "vocazoo_backend", %english, "Skipping duplicate word bank entry");
      continue;
    }
    out.push(Word { english, korean, difficulty: row.difficulty, used: false });
  }
  Ok(out)
}
