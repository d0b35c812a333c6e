//! Built-in seed words so the service is usable without an external bank.

use crate::domain::Word;

/// Small graded pool covering every difficulty tier. Comma-separated
/// korean fields carry alternate accepted forms.
pub fn seed_words() -> Vec<Word> {
  fn w(english: &str, korean: &str, difficulty: u32) -> Word {
    Word { english: english.into(), korean: korean.into(), difficulty, used: false }
  }

  vec![
    w("apple", "사과", 1),
    w("school", "학교", 1),
    w("house", "집,가정", 1),
    w("water", "물", 1),
    w("friend", "친구", 1),
    w("morning", "아침", 1),
    w("library", "도서관", 2),
    w("weather", "날씨", 2),
    w("travel", "여행,여행하다", 2),
    w("promise", "약속,약속하다", 2),
    w("exercise", "운동,운동하다", 2),
    w("environment", "환경", 3),
    w("economy", "경제", 3),
    w("society", "사회", 3),
    w("experience", "경험,체험", 3),
    w("achievement", "성취,업적", 4),
    w("consequence", "결과,영향", 4),
    w("perspective", "관점,시각", 4),
    w("phenomenon", "현상", 5),
    w("hypothesis", "가설", 5),
  ]
}
