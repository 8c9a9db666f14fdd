//! Line-start index over a rope.
//!
//! A sorted vector of the grapheme positions where each line begins. The
//! first line always starts at 0, even in an empty document; every later
//! entry is the position immediately after a line feed. The index is
//! rebuilt from the rope after every mutation, which is cheap at the
//! scale this editor targets (interactive editing of files up to a few
//! MB).

use thiserror::Error;

use crate::{position::Position, rope::Rope};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineIndexError {
  #[error("position {0} outside the document")]
  InvalidPosition(usize),
  #[error("line {0}, column {1} out of bounds")]
  InvalidLineCol(usize, usize),
}

pub type Result<T> = std::result::Result<T, LineIndexError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
  starts: Vec<usize>,
  total:  usize,
}

impl LineIndex {
  #[must_use]
  pub fn new() -> Self {
    Self {
      starts: vec![0],
      total:  0,
    }
  }

  /// Rebuilds the index with one pass over the rope's clusters.
  ///
  /// Only a lone `"\n"` cluster starts a new line; `"\r\n"` segments as a
  /// single cluster and therefore does not.
  pub fn rebuild(&mut self, rope: &Rope) {
    self.starts.clear();
    self.starts.push(0);
    let mut pos = 0;
    for cluster in rope.iter() {
      pos += 1;
      if cluster == "\n" {
        self.starts.push(pos);
      }
    }
    self.total = pos;
  }

  /// Number of lines; at least 1.
  #[must_use]
  pub fn line_count(&self) -> usize {
    self.starts.len()
  }

  /// `[start, end)` of line `line` in grapheme positions. `end` excludes
  /// the trailing newline; the last line ends at the document length.
  pub fn line_bounds(&self, line: usize) -> Result<(usize, usize)> {
    if line >= self.starts.len() {
      return Err(LineIndexError::InvalidLineCol(line, 0));
    }
    let start = self.starts[line];
    let end = match self.starts.get(line + 1) {
      Some(next) => next - 1,
      None => self.total,
    };
    Ok((start, end))
  }

  /// Translates a grapheme position to (line, column).
  pub fn position_to_line_col(&self, pos: usize) -> Result<Position> {
    if pos > self.total {
      return Err(LineIndexError::InvalidPosition(pos));
    }
    // The target line is the last one starting at or before pos;
    // starts[0] == 0 guarantees a hit.
    let line = self.starts.partition_point(|&start| start <= pos) - 1;
    Ok(Position::new(line, pos - self.starts[line]))
  }

  /// Translates (line, column) to a grapheme position, clamping the
  /// column to the line's length.
  pub fn line_col_to_position(&self, line: usize, col: usize) -> Result<usize> {
    let (start, end) = self.line_bounds(line)?;
    Ok(start + col.min(end - start))
  }
}

impl Default for LineIndex {
  fn default() -> Self {
    Self::new()
  }
}
