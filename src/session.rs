//! QuizSession: the per-attempt state machine.
//!
//! A session is born Running (construction samples its queue), serves words
//! FIFO exactly once, grades answers against the wall clock, and freezes its
//! outcome at finalize. Completed/Expired are observed states, derived from
//! queue exhaustion and elapsed time rather than stored.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tracing::debug;
use uuid::Uuid;

use crate::config::QuizPolicy;
use crate::domain::{AnswerResult, Word, WordBatch, WrongAnswerNote};
use crate::error::{ApiError, Result};
use crate::matcher::{match_answer, MatchVerdict};
use crate::scoring::{self, BonusPolicy};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
  Running,
  Completed,
  Expired,
  Finalized,
}

/// What `next_question` produced.
#[derive(Clone, Debug, PartialEq)]
pub enum QuestionStep {
  Question(String),
  Completed,
  Expired,
}

/// Grading response for one submitted answer.
#[derive(Clone, Debug)]
pub struct SubmitOutcome {
  pub result: AnswerResult,
  pub message: Option<String>,
  pub correct_answer: Option<String>,
}

/// Everything finalize froze for this session. Repeat finalize calls return
/// this verbatim.
#[derive(Clone, Debug)]
pub struct FinalOutcome {
  pub final_score: f64,
  pub base_score: u32,
  pub remaining_secs: f64,
  pub exp_gained: u32,
  pub level_up: bool,
  pub new_badge: Option<String>,
}

#[derive(Debug)]
pub struct QuizSession {
  pub token: String,
  pub batch_id: Option<String>,
  pub review: bool,
  queue: VecDeque<Word>,
  current: Option<Word>,
  score: u32,
  answered: u32,
  wrong_answers: Vec<WrongAnswerNote>,
  started_at: Instant,
  time_limit: Duration,
  fuzzy_threshold: f64,
  score_weight: u32,
  bonus: BonusPolicy,
  outcome: Option<FinalOutcome>,
}

impl QuizSession {
  /// Start a standard attempt: sample `sample_size` words from the active
  /// batch in random order.
  pub fn start(batch: &WordBatch, policy: &QuizPolicy) -> Result<Self> {
    if batch.words.len() < policy.sample_size {
      return Err(ApiError::InsufficientWords {
        available: batch.words.len(),
        required: policy.sample_size,
      });
    }
    let mut words = batch.words.clone();
    words.shuffle(&mut rand::thread_rng());
    words.truncate(policy.sample_size);
    Ok(Self::new(words, Some(batch.id.clone()), policy, false))
  }

  /// Start a review attempt over previously missed words. The whole list is
  /// quizzed (shuffled), so there is no sample-size minimum beyond non-empty.
  pub fn start_review(words: Vec<Word>, policy: &QuizPolicy) -> Result<Self> {
    if words.is_empty() {
      return Err(ApiError::InsufficientWords { available: 0, required: 1 });
    }
    let mut words = words;
    words.shuffle(&mut rand::thread_rng());
    Ok(Self::new(words, None, policy, true))
  }

  fn new(words: Vec<Word>, batch_id: Option<String>, policy: &QuizPolicy, review: bool) -> Self {
    Self {
      token: Uuid::new_v4().to_string(),
      batch_id,
      review,
      queue: words.into(),
      current: None,
      score: 0,
      answered: 0,
      wrong_answers: vec![],
      started_at: Instant::now(),
      time_limit: Duration::from_secs(policy.time_limit_for(review)),
      fuzzy_threshold: policy.fuzzy_threshold,
      score_weight: policy.score_weight,
      bonus: policy.bonus_for(review).clone(),
      outcome: None,
    }
  }

  pub fn phase(&self) -> SessionPhase {
    if self.outcome.is_some() {
      SessionPhase::Finalized
    } else if self.is_time_over() {
      SessionPhase::Expired
    } else if self.queue.is_empty() && self.current.is_none() {
      SessionPhase::Completed
    } else {
      SessionPhase::Running
    }
  }

  pub fn is_time_over(&self) -> bool {
    self.started_at.elapsed() > self.time_limit
  }

  /// Seconds left on the clock, clamped to zero.
  pub fn remaining_secs(&self) -> f64 {
    (self.time_limit.as_secs_f64() - self.started_at.elapsed().as_secs_f64()).max(0.0)
  }

  /// Serve the next word (FIFO). A word left unanswered when this is called
  /// again is skipped for good; one serving per word per attempt.
  pub fn next_question(&mut self) -> Result<QuestionStep> {
    if self.outcome.is_some() {
      return Err(ApiError::InvalidState("session already finalized".into()));
    }
    if self.is_time_over() {
      return Ok(QuestionStep::Expired);
    }
    match self.queue.pop_front() {
      Some(word) => {
        let english = word.english.clone();
        self.current = Some(word);
        Ok(QuestionStep::Question(english))
      }
      None => {
        self.current = None;
        Ok(QuestionStep::Completed)
      }
    }
  }

  /// Grade an answer against the current word. Grading consumes the word, so
  /// a repeat submit comes back `Invalid`. The clock is checked before the
  /// matcher: a correct answer after expiry is still `TimeOver`.
  pub fn submit_answer(&mut self, answer: &str) -> SubmitOutcome {
    if self.outcome.is_some() {
      return SubmitOutcome { result: AnswerResult::Invalid, message: None, correct_answer: None };
    }
    let Some(word) = self.current.take() else {
      return SubmitOutcome { result: AnswerResult::Invalid, message: None, correct_answer: None };
    };
    if self.is_time_over() {
      return SubmitOutcome { result: AnswerResult::TimeOver, message: None, correct_answer: None };
    }

    self.answered += 1;
    match match_answer(answer, &word.korean, self.fuzzy_threshold) {
      MatchVerdict::Exact => {
        self.score += scoring::points_for(&word, self.score_weight);
        SubmitOutcome { result: AnswerResult::Correct, message: None, correct_answer: None }
      }
      MatchVerdict::Fuzzy { ratio } => {
        debug!(target: "quiz", token = %self.token, english = %word.english, ratio, "Accepted fuzzy answer");
        self.score += scoring::points_for(&word, self.score_weight);
        SubmitOutcome {
          result: AnswerResult::CorrectWithTypo,
          message: Some(format!("Accepted with a typo. Correct spelling: {}", word.korean)),
          correct_answer: Some(word.korean.clone()),
        }
      }
      MatchVerdict::NoMatch => {
        if !self.review {
          self.wrong_answers.push(WrongAnswerNote {
            question: word.english.clone(),
            user_answer: answer.to_string(),
            correct_answer: word.korean.clone(),
          });
        }
        SubmitOutcome {
          result: AnswerResult::Wrong,
          message: None,
          correct_answer: Some(word.korean.clone()),
        }
      }
    }
  }

  /// Running score plus seconds remaining. Always answers; after expiry the
  /// remaining time reads zero rather than erroring.
  pub fn get_score(&self) -> (u32, f64) {
    (self.score, self.remaining_secs())
  }

  /// `(final, base, remaining)` with the tiered bonus applied. Live until
  /// finalize, frozen afterwards.
  pub fn final_score(&self) -> (f64, u32, f64) {
    if let Some(o) = &self.outcome {
      return (o.final_score, o.base_score, o.remaining_secs);
    }
    let remaining = self.remaining_secs();
    (scoring::final_score(self.score, remaining, &self.bonus), self.score, remaining)
  }

  /// English prompt of the word currently awaiting an answer, if any.
  pub fn current_prompt(&self) -> Option<&str> {
    self.current.as_ref().map(|w| w.english.as_str())
  }

  pub fn answered(&self) -> u32 {
    self.answered
  }

  pub fn wrong_answers(&self) -> &[WrongAnswerNote] {
    &self.wrong_answers
  }

  pub fn finalized(&self) -> Option<&FinalOutcome> {
    self.outcome.as_ref()
  }

  /// Freeze the outcome. First write wins; finalize is idempotent above this.
  pub fn mark_finalized(&mut self, outcome: FinalOutcome) {
    if self.outcome.is_none() {
      self.outcome = Some(outcome);
    }
  }

  /// Shift the start time into the past to simulate elapsed play.
  #[cfg(test)]
  pub fn backdate(&mut self, secs: u64) {
    self.started_at = self
      .started_at
      .checked_sub(Duration::from_secs(secs))
      .expect("backdate before process start");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use std::collections::HashSet;

  fn word(english: &str, korean: &str, difficulty: u32) -> Word {
    Word { english: english.into(), korean: korean.into(), difficulty, used: false }
  }

  fn batch(n: usize) -> WordBatch {
    WordBatch {
      id: "batch-1".into(),
      words: (0..n).map(|i| word(&format!("w{}", i), &format!("한국어{}", i), 2)).collect(),
      active: true,
      created_at: Utc::now(),
    }
  }

  fn korean_for(batch: &WordBatch, english: &str) -> String {
    batch.words.iter().find(|w| w.english == english).unwrap().korean.clone()
  }

  #[test]
  fn start_requires_enough_words() {
    let err = QuizSession::start(&batch(4), &QuizPolicy::default()).unwrap_err();
    match err {
      ApiError::InsufficientWords { available, required } => {
        assert_eq!(available, 4);
        assert_eq!(required, 10);
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[test]
  fn serves_each_sampled_word_exactly_once_then_completes() {
    let b = batch(12);
    let mut s = QuizSession::start(&b, &QuizPolicy::default()).unwrap();
    let mut seen = HashSet::new();
    for _ in 0..10 {
      match s.next_question().unwrap() {
        QuestionStep::Question(english) => {
          assert!(seen.insert(english.clone()), "word {} served twice", english);
          let answer = korean_for(&b, &english);
          assert_eq!(s.submit_answer(&answer).result, AnswerResult::Correct);
        }
        other => panic!("expected question, got {:?}", other),
      }
    }
    assert_eq!(seen.len(), 10);
    assert_eq!(s.next_question().unwrap(), QuestionStep::Completed);
    assert_eq!(s.phase(), SessionPhase::Completed);
    // difficulty 2 × weight 10 × 10 words
    assert_eq!(s.get_score().0, 200);
    assert_eq!(s.answered(), 10);
  }

  #[test]
  fn wrong_answers_are_noted_with_the_correct_form() {
    let b = batch(10);
    let mut s = QuizSession::start(&b, &QuizPolicy::default()).unwrap();
    let QuestionStep::Question(english) = s.next_question().unwrap() else {
      panic!("expected question");
    };
    let out = s.submit_answer("완전틀림");
    assert_eq!(out.result, AnswerResult::Wrong);
    assert_eq!(out.correct_answer.as_deref(), Some(korean_for(&b, &english).as_str()));
    assert_eq!(s.wrong_answers().len(), 1);
    assert_eq!(s.wrong_answers()[0].question, english);
    assert_eq!(s.get_score().0, 0);
  }

  #[test]
  fn review_sessions_skip_wrong_answer_notes() {
    let words = vec![word("apple", "사과", 1), word("water", "물", 1)];
    let mut s = QuizSession::start_review(words, &QuizPolicy::default()).unwrap();
    s.next_question().unwrap();
    assert_eq!(s.submit_answer("오답").result, AnswerResult::Wrong);
    assert!(s.wrong_answers().is_empty());
  }

  #[test]
  fn review_start_rejects_empty_list() {
    assert!(QuizSession::start_review(vec![], &QuizPolicy::default()).is_err());
  }

  #[test]
  fn fuzzy_match_scores_and_reports_the_spelling() {
    let b = WordBatch {
      id: "b".into(),
      words: (0..10)
        .map(|i| word(&format!("w{}", i), "internationalization", 3))
        .collect(),
      active: true,
      created_at: Utc::now(),
    };
    let mut s = QuizSession::start(&b, &QuizPolicy::default()).unwrap();
    s.next_question().unwrap();
    let out = s.submit_answer("internationalisation");
    assert_eq!(out.result, AnswerResult::CorrectWithTypo);
    assert!(out.message.unwrap().contains("internationalization"));
    assert_eq!(s.get_score().0, 30);
  }

  #[test]
  fn submitting_twice_for_one_serving_is_invalid() {
    let b = batch(10);
    let mut s = QuizSession::start(&b, &QuizPolicy::default()).unwrap();
    let QuestionStep::Question(english) = s.next_question().unwrap() else {
      panic!("expected question");
    };
    let answer = korean_for(&b, &english);
    assert_eq!(s.submit_answer(&answer).result, AnswerResult::Correct);
    assert_eq!(s.submit_answer(&answer).result, AnswerResult::Invalid);
  }

  #[test]
  fn submit_before_any_question_is_invalid() {
    let mut s = QuizSession::start(&batch(10), &QuizPolicy::default()).unwrap();
    assert_eq!(s.submit_answer("사과").result, AnswerResult::Invalid);
  }

  #[test]
  fn expiry_beats_a_correct_answer() {
    let b = batch(10);
    let mut s = QuizSession::start(&b, &QuizPolicy::default()).unwrap();
    let QuestionStep::Question(english) = s.next_question().unwrap() else {
      panic!("expected question");
    };
    let answer = korean_for(&b, &english);
    s.backdate(31);
    assert!(s.is_time_over());
    assert_eq!(s.submit_answer(&answer).result, AnswerResult::TimeOver);
    assert_eq!(s.next_question().unwrap(), QuestionStep::Expired);
    assert_eq!(s.phase(), SessionPhase::Expired);
    let (_, remaining) = s.get_score();
    assert_eq!(remaining, 0.0);
  }

  #[test]
  fn final_score_applies_the_time_bonus() {
    let b = batch(10);
    let mut s = QuizSession::start(&b, &QuizPolicy::default()).unwrap();
    for _ in 0..2 {
      let QuestionStep::Question(english) = s.next_question().unwrap() else {
        panic!("expected question");
      };
      let answer = korean_for(&b, &english);
      s.submit_answer(&answer);
    }
    // base 40, plenty of clock left: high tier applies
    let (final_score, base, remaining) = s.final_score();
    assert_eq!(base, 40);
    assert!(remaining > 10.0);
    assert_eq!(final_score, 60.0);
  }

  #[test]
  fn finalize_freezes_the_outcome() {
    let mut s = QuizSession::start(&batch(10), &QuizPolicy::default()).unwrap();
    s.mark_finalized(FinalOutcome {
      final_score: 60.0,
      base_score: 40,
      remaining_secs: 12.0,
      exp_gained: 5,
      level_up: false,
      new_badge: None,
    });
    assert_eq!(s.phase(), SessionPhase::Finalized);
    assert_eq!(s.final_score(), (60.0, 40, 12.0));

    // second freeze is ignored
    s.mark_finalized(FinalOutcome {
      final_score: 0.0,
      base_score: 0,
      remaining_secs: 0.0,
      exp_gained: 0,
      level_up: false,
      new_badge: None,
    });
    assert_eq!(s.final_score(), (60.0, 40, 12.0));
    assert!(s.next_question().is_err());
    assert_eq!(s.submit_answer("x").result, AnswerResult::Invalid);
  }
}
