//! The editor facade: buffers, modal state, and sticky-column motion.
//!
//! The editor owns a map from absolute file path to buffer, the current
//! buffer, the [`Mode`], and the *desired column* — the column vertical
//! motions aim for even when intermediate lines are shorter. Horizontal
//! motions overwrite the desired column; vertical motions adopt it (or
//! capture the current column on the first of a run) and never clear it
//! just because a short line clamped the cursor.
//!
//! Lock order is editor state, then buffer; the editor lock is taken in
//! the smallest mode needed to reach the current buffer.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use parking_lot::RwLock;
use quill_core::position::Position;
use thiserror::Error;
use tracing::debug;

use crate::{
  buffer::{Buffer, BufferError},
  mode::Mode,
};

#[derive(Debug, Error)]
pub enum EditorError {
  #[error("no buffer is open")]
  NoBuffer,
  #[error("no buffer for path {0}")]
  BufferNotFound(PathBuf),
  #[error("operation not permitted in {0} mode")]
  InvalidOperation(Mode),
  #[error(transparent)]
  Buffer(#[from] BufferError),
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Default)]
struct EditorState {
  buffers:        HashMap<PathBuf, Arc<Buffer>>,
  current:        Option<Arc<Buffer>>,
  mode:           Mode,
  desired_column: Option<usize>,
}

#[derive(Default)]
pub struct Editor {
  state: RwLock<EditorState>,
}

impl Editor {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Opens `path`, or switches to it when it is already open. The new
  /// buffer becomes current.
  pub fn open(&self, path: impl AsRef<Path>) -> Result<()> {
    let abs = path.as_ref().canonicalize()?;
    let mut state = self.state.write();
    if let Some(buffer) = state.buffers.get(&abs) {
      state.current = Some(Arc::clone(buffer));
      return Ok(());
    }
    let buffer = Arc::new(Buffer::open(&abs)?);
    state.buffers.insert(abs.clone(), Arc::clone(&buffer));
    state.current = Some(buffer);
    debug!(path = %abs.display(), open = state.buffers.len(), "opened file");
    Ok(())
  }

  /// Makes an already-open buffer current.
  pub fn switch(&self, path: impl AsRef<Path>) -> Result<()> {
    let abs = path.as_ref().canonicalize()?;
    let mut state = self.state.write();
    let buffer = state
      .buffers
      .get(&abs)
      .ok_or_else(|| EditorError::BufferNotFound(abs.clone()))?;
    state.current = Some(Arc::clone(buffer));
    Ok(())
  }

  /// Absolute paths of all open buffers.
  #[must_use]
  pub fn buffer_list(&self) -> Vec<PathBuf> {
    self.state.read().buffers.keys().cloned().collect()
  }

  /// The current buffer, if any.
  #[must_use]
  pub fn current_buffer(&self) -> Option<Arc<Buffer>> {
    self.state.read().current.clone()
  }

  #[must_use]
  pub fn mode(&self) -> Mode {
    self.state.read().mode
  }

  pub fn set_mode(&self, mode: Mode) {
    self.state.write().mode = mode;
  }

  /// The sticky column vertical motions aim for; `None` until a motion
  /// sets it.
  #[must_use]
  pub fn desired_column(&self) -> Option<usize> {
    self.state.read().desired_column
  }

  /// Inserts text at the cursor. Requires [`Mode::Insert`]; an active
  /// selection is collapsed onto its head first.
  pub fn insert_text(&self, text: &str) -> Result<()> {
    let buffer = {
      let state = self.state.read();
      let buffer = state.current.clone().ok_or(EditorError::NoBuffer)?;
      if state.mode != Mode::Insert {
        return Err(EditorError::InvalidOperation(state.mode));
      }
      buffer
    };
    buffer.collapse_selection_to_head();
    buffer.insert(text)?;
    Ok(())
  }

  /// Removes the selected text in the current buffer.
  pub fn delete_selection(&self) -> Result<()> {
    self.current()?.delete_selection()?;
    Ok(())
  }

  /// Deletes `count` clusters from the head: forward for positive counts,
  /// backward for negative ones. A backward delete that would run past
  /// the start of the document stops there.
  pub fn delete_text(&self, count: isize) -> Result<()> {
    let buffer = self.current()?;
    let head = buffer.selection().head;
    let (start, end) = if count < 0 {
      (head.saturating_sub(count.unsigned_abs()), head)
    } else {
      (head, head + count.unsigned_abs())
    };
    buffer.delete(start, end)?;
    Ok(())
  }

  /// (line, column) of the cursor head.
  pub fn current_position(&self) -> Result<Position> {
    let buffer = self.current()?;
    Ok(buffer.position_to_line_col(buffer.selection().head)?)
  }

  /// Moves the cursor by `offset` clusters and records the new column as
  /// the desired column.
  pub fn move_cursor_horizontal(&self, offset: isize, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    buffer.move_selection(offset, extend);
    self.remember_column(&buffer)
  }

  /// Moves the cursor `offset` lines down (negative: up), aiming for the
  /// desired column.
  pub fn jump_from_cursor(&self, offset: isize, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    let at = buffer.position_to_line_col(buffer.selection().head)?;
    let line = at
      .row
      .saturating_add_signed(offset)
      .min(buffer.line_count() - 1);
    self.jump_to(&buffer, line, extend)
  }

  /// Moves the cursor to `line` (clamped to the document), aiming for
  /// the desired column.
  pub fn jump_to_line(&self, line: usize, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    let line = line.min(buffer.line_count() - 1);
    self.jump_to(&buffer, line, extend)
  }

  pub fn jump_to_top(&self, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    self.jump_to(&buffer, 0, extend)
  }

  pub fn jump_to_bottom(&self, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    let line = buffer.line_count() - 1;
    self.jump_to(&buffer, line, extend)
  }

  /// Moves the cursor to the next word boundary; word motion is
  /// horizontal, so the desired column is re-recorded.
  pub fn move_to_next_word(&self, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    buffer.move_to_next_word(extend);
    self.remember_column(&buffer)
  }

  /// Moves the cursor to the previous word boundary.
  pub fn move_to_prev_word(&self, extend: bool) -> Result<()> {
    let buffer = self.current()?;
    buffer.move_to_prev_word(extend);
    self.remember_column(&buffer)
  }

  pub fn save_current_buffer(&self) -> Result<()> {
    self.current()?.save()?;
    Ok(())
  }

  /// Closes the current buffer (flushing it if dirty), removes it from
  /// the buffer map, and promotes any remaining buffer to current.
  pub fn close_current_buffer(&self) -> Result<()> {
    let mut state = self.state.write();
    let buffer = state.current.clone().ok_or(EditorError::NoBuffer)?;
    buffer.close()?;
    if let Some(path) = buffer.file_path() {
      state.buffers.remove(&path);
    }
    state.current = state.buffers.values().next().cloned();
    debug!(remaining = state.buffers.len(), "closed buffer");
    Ok(())
  }

  fn current(&self) -> Result<Arc<Buffer>> {
    self.state.read().current.clone().ok_or(EditorError::NoBuffer)
  }

  /// Vertical motion core: adopt the desired column (capturing the
  /// current one on the first vertical motion of a run), then let the
  /// buffer clamp it to the target line. Clamping does not erase the
  /// desired column; a later, longer line restores it.
  fn jump_to(&self, buffer: &Buffer, line: usize, extend: bool) -> Result<()> {
    let col = {
      let mut state = self.state.write();
      match state.desired_column {
        Some(col) => col,
        None => {
          let at = buffer.position_to_line_col(buffer.selection().head)?;
          state.desired_column = Some(at.col);
          at.col
        },
      }
    };
    buffer.move_selection_to_line_col(line, col, extend)?;
    Ok(())
  }

  fn remember_column(&self, buffer: &Buffer) -> Result<()> {
    let at = buffer.position_to_line_col(buffer.selection().head)?;
    self.state.write().desired_column = Some(at.col);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn operations_without_a_buffer_fail() {
    let editor = Editor::new();
    assert!(matches!(editor.insert_text("x"), Err(EditorError::NoBuffer)));
    assert!(matches!(editor.delete_text(1), Err(EditorError::NoBuffer)));
    assert!(matches!(
      editor.current_position(),
      Err(EditorError::NoBuffer)
    ));
    assert!(matches!(
      editor.save_current_buffer(),
      Err(EditorError::NoBuffer)
    ));
    assert!(matches!(
      editor.close_current_buffer(),
      Err(EditorError::NoBuffer)
    ));
  }

  #[test]
  fn switch_to_unopened_path_is_not_found() {
    let editor = Editor::new();
    // The path exists on disk but is not open in the editor.
    assert!(matches!(
      editor.switch(std::env::temp_dir()),
      Err(EditorError::BufferNotFound(_))
    ));
  }

  #[test]
  fn switch_to_nonexistent_path_surfaces_io_error() {
    let editor = Editor::new();
    assert!(matches!(
      editor.switch("/definitely/not/on/disk"),
      Err(EditorError::Io(_))
    ));
  }

  #[test]
  fn mode_roundtrip() {
    let editor = Editor::new();
    assert_eq!(editor.mode(), Mode::Normal);
    editor.set_mode(Mode::Insert);
    assert_eq!(editor.mode(), Mode::Insert);
  }
}
