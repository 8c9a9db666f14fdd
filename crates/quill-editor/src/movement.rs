//! Word-boundary scanning over a rope.
//!
//! A word boundary is the first position whose [`WordClass`] differs from
//! the class of the position the scan started at, so repeated motions hop
//! between runs of letters, whitespace, and symbols.

use quill_core::{
  chars::{self, WordClass},
  rope::Rope,
};

/// The direction of cursor movement or selection extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
  /// Toward the end of the document (increasing positions).
  Forward,
  /// Toward the start of the document (decreasing positions).
  Backward,
}

fn class_at(rope: &Rope, pos: usize) -> Option<WordClass> {
  rope.grapheme_at(pos).ok().and_then(|g| chars::classify(&g))
}

/// First position after `head` whose class differs from the class at
/// `head`. Runs past the end return the document length.
pub(crate) fn next_word_boundary(rope: &Rope, head: usize) -> usize {
  let total = rope.total_graphemes();
  if head >= total {
    return total;
  }
  let start_class = class_at(rope, head);
  let mut pos = head;
  loop {
    pos += 1;
    if pos >= total {
      return total;
    }
    if class_at(rope, pos) != start_class {
      return pos;
    }
  }
}

/// Start of the run of same-class clusters ending just before `head`.
/// Scans from `head - 1` backward; reaching the front returns 0.
pub(crate) fn prev_word_boundary(rope: &Rope, head: usize) -> usize {
  let Some(mut pos) = head.checked_sub(1) else {
    return 0;
  };
  let start_class = class_at(rope, pos);
  while pos > 0 {
    if class_at(rope, pos - 1) != start_class {
      return pos;
    }
    pos -= 1;
  }
  0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn forward_hops_between_runs() {
    let rope = Rope::new("foo bar_baz  qux");
    let mut pos = 0;
    let mut stops = Vec::new();
    loop {
      pos = next_word_boundary(&rope, pos);
      stops.push(pos);
      if pos == rope.total_graphemes() {
        break;
      }
    }
    assert_eq!(stops, vec![3, 4, 11, 13, 16]);
  }

  #[test]
  fn forward_at_end_stays_at_end() {
    let rope = Rope::new("abc");
    assert_eq!(next_word_boundary(&rope, 3), 3);
    assert_eq!(next_word_boundary(&rope, 99), 3);
  }

  #[test]
  fn backward_returns_run_starts() {
    let rope = Rope::new("foo bar");
    assert_eq!(prev_word_boundary(&rope, 7), 4);
    assert_eq!(prev_word_boundary(&rope, 4), 3);
    assert_eq!(prev_word_boundary(&rope, 3), 0);
  }

  #[test]
  fn backward_at_start_stays_at_start() {
    let rope = Rope::new("abc");
    assert_eq!(prev_word_boundary(&rope, 0), 0);
  }

  #[test]
  fn symbols_are_their_own_runs() {
    let rope = Rope::new("a+=b");
    assert_eq!(next_word_boundary(&rope, 0), 1);
    assert_eq!(next_word_boundary(&rope, 1), 3);
    assert_eq!(prev_word_boundary(&rope, 3), 1);
  }

  #[test]
  fn empty_document_is_inert() {
    let rope = Rope::new("");
    assert_eq!(next_word_boundary(&rope, 0), 0);
    assert_eq!(prev_word_boundary(&rope, 0), 0);
  }
}
