//! Answer grading: normalization + Ratcliff/Obershelp similarity.
//!
//! Accepted translations arrive as one comma-separated string ("집,가정").
//! Grading is two-pass: exact equality against every accepted form first,
//! fuzzy similarity only when no form matched exactly.

/// Characters erased before comparison: bracketing punctuation plus the
/// Korean particles that answers commonly carry ("학교에" vs "학교").
const STRIP_CHARS: &[char] = &[
  '(', ')', '[', ']', '{', '}', '~', '·', ',',
  '에', '서', '로', '의', '을', '를', '이', '가', '은', '는', '과',
];

/// Outcome of grading one candidate against the accepted forms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchVerdict {
  /// Normalized equality with some accepted form.
  Exact,
  /// Best similarity ratio reached the threshold.
  Fuzzy { ratio: f64 },
  NoMatch,
}

/// Strip punctuation/particles (each becomes a space), collapse whitespace,
/// trim. Idempotent.
pub fn normalize(s: &str) -> String {
  let replaced: String = s
    .chars()
    .map(|c| if STRIP_CHARS.contains(&c) { ' ' } else { c })
    .collect();
  replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ratcliff/Obershelp similarity over chars: `2M / (|a| + |b|)` where `M`
/// counts chars in recursively matched common runs. Range [0, 1]; two empty
/// strings rate 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let total = a.len() + b.len();
  if total == 0 {
    return 1.0;
  }
  2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Grade `candidate` against the comma-separated `accepted` forms.
/// Exact wins outright, even when another form would rate higher on
/// similarity than the exactly-matched one.
pub fn match_answer(candidate: &str, accepted: &str, threshold: f64) -> MatchVerdict {
  let cand = normalize(candidate);
  let forms: Vec<String> = accepted
    .split(',')
    .map(normalize)
    .filter(|f| !f.is_empty())
    .collect();

  if forms.iter().any(|f| *f == cand) {
    return MatchVerdict::Exact;
  }

  let mut best = 0.0_f64;
  for form in &forms {
    let ratio = similarity(&cand, form);
    if ratio > best {
      best = ratio;
    }
  }
  if !forms.is_empty() && best >= threshold {
    MatchVerdict::Fuzzy { ratio: best }
  } else {
    MatchVerdict::NoMatch
  }
}

/// Total matched chars: take the longest common run, then recurse on the
/// slices to its left and right.
fn matching_chars(a: &[char], b: &[char]) -> usize {
  if a.is_empty() || b.is_empty() {
    return 0;
  }
  let (i, j, len) = longest_common_run(a, b);
  if len == 0 {
    return 0;
  }
  len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

/// Longest common contiguous run of `a` and `b`: returns (start in a,
/// start in b, length). Ties keep the earliest start in `a`, then in `b`.
fn longest_common_run(a: &[char], b: &[char]) -> (usize, usize, usize) {
  let (mut best_a, mut best_b, mut best_len) = (0usize, 0usize, 0usize);
  // run[j + 1] = length of the common run ending at a[i], b[j]; one row
  // reused across i, with prev_diag carrying the overwritten diagonal.
  let mut run = vec![0usize; b.len() + 1];
  for (i, ca) in a.iter().enumerate() {
    let mut prev_diag = 0usize;
    for (j, cb) in b.iter().enumerate() {
      let old = run[j + 1];
      let len = if ca == cb { prev_diag + 1 } else { 0 };
      run[j + 1] = len;
      prev_diag = old;
      if len > best_len {
        best_len = len;
        best_a = i + 1 - len;
        best_b = j + 1 - len;
      }
    }
  }
  (best_a, best_b, best_len)
}
