//! Experience and leveling: decade-bucketed exp tables, multi-level
//! rollover capped at level 100, and decade badges.

const MAX_LEVEL: u32 = 100;

/// Exp needed to advance one level, bucketed by decade (1-10, 11-20, ...).
const EXP_REQUIRED_BY_DECADE: [u32; 10] = [30, 60, 90, 150, 250, 400, 600, 900, 1300, 1800];

/// Exp granted per completed quiz, bucketed the same way.
const EXP_GAIN_BY_DECADE: [u32; 10] = [5, 8, 10, 12, 15, 20, 25, 30, 30, 30];

fn decade_index(level: u32) -> usize {
  (((level.max(1) - 1) / 10) as usize).min(9)
}

/// Exp required to advance from `level` to `level + 1`; `None` at the cap.
pub fn exp_required(level: u32) -> Option<u32> {
  if level >= MAX_LEVEL {
    return None;
  }
  Some(EXP_REQUIRED_BY_DECADE[decade_index(level)])
}

/// Exp granted for finishing a quiz at `level`. The table keys on level
/// only; the score stays in the signature so the policy can start using it
/// without touching callers.
pub fn exp_gain(_score: f64, level: u32) -> u32 {
  if level >= MAX_LEVEL {
    return 0;
  }
  EXP_GAIN_BY_DECADE[decade_index(level)]
}

/// Add `gained` exp and roll over as many levels as it covers.
/// Returns `(level, leftover_exp, leveled_up)`; stops at the cap with the
/// leftover retained.
pub fn apply_gain(level: u32, exp: u32, gained: u32) -> (u32, u32, bool) {
  let mut level = level.max(1);
  let mut total = exp + gained;
  let mut leveled_up = false;
  while level < MAX_LEVEL {
    let required = EXP_REQUIRED_BY_DECADE[decade_index(level)];
    if total < required {
      break;
    }
    total -= required;
    level += 1;
    leveled_up = true;
  }
  (level, total, leveled_up)
}

/// Badge granted when a level-up lands exactly on a decade boundary.
pub fn badge_for(level: u32) -> Option<String> {
  if level % 10 == 0 {
    Some(format!("level_{}_badge", level))
  } else {
    None
  }
}

/// How far through the current level the user is, as a percentage.
pub fn progress_percent(level: u32, exp: u32) -> f64 {
  match exp_required(level) {
    Some(required) => (exp as f64 / required as f64) * 100.0,
    None => 100.0,
  }
}
