//! A text buffer: one rope, one selection, one line index, one file.
//!
//! The buffer is the transaction boundary of the editing core. Every
//! mutator takes the buffer's state lock exclusively, edits the rope,
//! fixes up the selection, and rebuilds the line index before the lock is
//! released, so readers never observe a partially applied edit. Lock
//! order is buffer state, then line index, then rope; nothing acquires
//! them the other way around.
//!
//! Buffers open a file read-write and hold the handle until [`close`];
//! scratch buffers have no backing file and refuse to [`save`].
//!
//! [`save`]: Buffer::save
//! [`close`]: Buffer::close

use std::{
  fmt,
  fs::OpenOptions,
  io::{Read, Seek, SeekFrom, Write},
  path::{Path, PathBuf},
  sync::Arc,
  time::SystemTime,
};

use parking_lot::RwLock;
use quill_core::{
  grapheme,
  line_index::{LineIndex, LineIndexError},
  position::Position,
  rope::{Rope, RopeError},
};
use thiserror::Error;
use tracing::debug;

use crate::{
  highlight::{HighlightSpan, Highlighter},
  movement,
  selection::Selection,
};

#[derive(Debug, Error)]
pub enum BufferError {
  #[error(transparent)]
  Rope(#[from] RopeError),
  #[error(transparent)]
  LineIndex(#[from] LineIndexError),
  #[error("selection {anchor}..{head} is invalid for a document of {len} graphemes")]
  InvalidSelection {
    anchor: usize,
    head:   usize,
    len:    usize,
  },
  #[error("buffer has no backing file")]
  NoBackingFile,
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BufferError>;

struct BufferState {
  selection:   Selection,
  path:        Option<PathBuf>,
  file:        Option<std::fs::File>,
  last_save:   SystemTime,
  dirty:       bool,
  highlighter: Option<Arc<dyn Highlighter>>,
}

pub struct Buffer {
  document:   Rope,
  line_index: RwLock<LineIndex>,
  state:      RwLock<BufferState>,
}

impl Buffer {
  /// Opens `path` read-write and reads the whole file into a new buffer.
  /// The selection starts as a cursor at 0 and the buffer is clean.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let path = path.canonicalize()?;
    debug!(path = %path.display(), bytes = contents.len(), "opened buffer");
    Ok(Self::from_parts(
      Rope::new(&contents),
      Some(path),
      Some(file),
    ))
  }

  /// An empty buffer with no backing file.
  #[must_use]
  pub fn scratch() -> Self {
    Self::from_text("")
  }

  /// A buffer over `text` with no backing file.
  #[must_use]
  pub fn from_text(text: &str) -> Self {
    Self::from_parts(Rope::new(text), None, None)
  }

  fn from_parts(document: Rope, path: Option<PathBuf>, file: Option<std::fs::File>) -> Self {
    let mut line_index = LineIndex::new();
    line_index.rebuild(&document);
    Self {
      document,
      line_index: RwLock::new(line_index),
      state: RwLock::new(BufferState {
        selection: Selection::point(0),
        path,
        file,
        last_save: SystemTime::now(),
        dirty: false,
        highlighter: None,
      }),
    }
  }

  /// Inserts `text` at the selection. A non-empty selection is replaced;
  /// afterwards the selection is a cursor just past the inserted text.
  pub fn insert(&self, text: &str) -> Result<()> {
    let mut state = self.state.write();
    let total = self.document.total_graphemes();
    validate_selection(state.selection, total)?;

    let from = state.selection.from();
    if !state.selection.is_empty() {
      self.document.delete(from, state.selection.to())?;
    }
    self.document.insert(from, text)?;

    state.selection = Selection::point(from + grapheme::count(text));
    state.dirty = true;
    self.rebuild_line_index();
    Ok(())
  }

  /// Removes the clusters in `[start, end)`. A selection head at or past
  /// `start` collapses onto `start`.
  pub fn delete(&self, start: usize, end: usize) -> Result<()> {
    let mut state = self.state.write();
    self.document.delete(start, end)?;
    if state.selection.head >= start {
      state.selection = Selection::point(start);
    }
    state.dirty = true;
    self.rebuild_line_index();
    Ok(())
  }

  /// Removes the selected clusters and collapses the selection onto the
  /// start of the removed range. A cursor deletes nothing.
  pub fn delete_selection(&self) -> Result<()> {
    let mut state = self.state.write();
    let total = self.document.total_graphemes();
    validate_selection(state.selection, total)?;

    let (from, to) = (state.selection.from(), state.selection.to());
    self.document.delete(from, to)?;
    state.selection = Selection::point(from);
    state.dirty = true;
    self.rebuild_line_index();
    Ok(())
  }

  /// The selected text; `""` for a cursor.
  pub fn selected_text(&self) -> Result<String> {
    let state = self.state.read();
    if state.selection.is_empty() {
      return Ok(String::new());
    }
    Ok(
      self
        .document
        .substring(state.selection.from(), state.selection.to())?,
    )
  }

  /// Writes the whole document back to the file: truncate, rewind, write.
  /// No newline normalization is performed.
  pub fn save(&self) -> Result<()> {
    let mut state = self.state.write();
    self.save_locked(&mut state)
  }

  /// Flushes a dirty buffer and releases the file handle.
  pub fn close(&self) -> Result<()> {
    let mut state = self.state.write();
    if state.dirty && state.file.is_some() {
      self.save_locked(&mut state)?;
    }
    state.file = None;
    debug!(path = ?state.path, "closed buffer");
    Ok(())
  }

  fn save_locked(&self, state: &mut BufferState) -> Result<()> {
    let contents = self.document.to_string();
    {
      let Some(file) = state.file.as_mut() else {
        return Err(BufferError::NoBackingFile);
      };
      file.set_len(0)?;
      file.seek(SeekFrom::Start(0))?;
      file.write_all(contents.as_bytes())?;
      file.flush()?;
    }
    state.last_save = SystemTime::now();
    state.dirty = false;
    debug!(path = ?state.path, bytes = contents.len(), "saved buffer");
    Ok(())
  }

  /// Moves the head by `offset` clusters, clamped to the document.
  pub fn move_selection(&self, offset: isize, extend: bool) {
    let mut state = self.state.write();
    let total = self.document.total_graphemes();
    state.selection.shift(offset, extend, total);
  }

  /// Moves the head to `line`/`col`; the column clamps to the line's
  /// length, the line must exist.
  pub fn move_selection_to_line_col(&self, line: usize, col: usize, extend: bool) -> Result<()> {
    let mut state = self.state.write();
    let pos = self.line_index.read().line_col_to_position(line, col)?;
    state.selection.move_to(pos, extend);
    Ok(())
  }

  /// Moves the head to the next word boundary.
  pub fn move_to_next_word(&self, extend: bool) {
    let mut state = self.state.write();
    let pos = movement::next_word_boundary(&self.document, state.selection.head);
    state.selection.move_to(pos, extend);
  }

  /// Moves the head to the previous word boundary. With `extend` the
  /// anchor stays put and only the head travels backward.
  pub fn move_to_prev_word(&self, extend: bool) {
    let mut state = self.state.write();
    let pos = movement::prev_word_boundary(&self.document, state.selection.head);
    state.selection.move_to(pos, extend);
  }

  /// Collapses the selection onto its head.
  pub fn collapse_selection_to_head(&self) {
    self.state.write().selection.collapse_to_head();
  }

  /// Content of line `line`, excluding its newline.
  pub fn line(&self, line: usize) -> Result<String> {
    let (start, end) = self.line_index.read().line_bounds(line)?;
    Ok(self.document.substring(start, end)?)
  }

  #[must_use]
  pub fn line_count(&self) -> usize {
    self.line_index.read().line_count()
  }

  pub fn position_to_line_col(&self, pos: usize) -> Result<Position> {
    Ok(self.line_index.read().position_to_line_col(pos)?)
  }

  pub fn line_col_to_position(&self, line: usize, col: usize) -> Result<usize> {
    Ok(self.line_index.read().line_col_to_position(line, col)?)
  }

  #[must_use]
  pub fn total_graphemes(&self) -> usize {
    self.document.total_graphemes()
  }

  /// The full document as a string.
  #[must_use]
  pub fn text(&self) -> String {
    self.document.to_string()
  }

  #[must_use]
  pub fn selection(&self) -> Selection {
    self.state.read().selection
  }

  #[must_use]
  pub fn is_dirty(&self) -> bool {
    self.state.read().dirty
  }

  #[must_use]
  pub fn last_save(&self) -> SystemTime {
    self.state.read().last_save
  }

  /// Absolute path of the backing file; `None` for scratch buffers.
  #[must_use]
  pub fn file_path(&self) -> Option<PathBuf> {
    self.state.read().path.clone()
  }

  /// Final path component, with extension.
  #[must_use]
  pub fn file_name(&self) -> Option<String> {
    let state = self.state.read();
    state
      .path
      .as_deref()
      .and_then(Path::file_name)
      .map(|name| name.to_string_lossy().into_owned())
  }

  /// File extension without the leading dot; `None` when there is none.
  #[must_use]
  pub fn file_type(&self) -> Option<String> {
    let state = self.state.read();
    state
      .path
      .as_deref()
      .and_then(Path::extension)
      .map(|ext| ext.to_string_lossy().into_owned())
  }

  pub fn set_highlighter(&self, highlighter: Arc<dyn Highlighter>) {
    self.state.write().highlighter = Some(highlighter);
  }

  /// Style spans for the current document, or nothing when no
  /// highlighter is configured.
  #[must_use]
  pub fn highlights(&self) -> Vec<HighlightSpan> {
    let state = self.state.read();
    match &state.highlighter {
      Some(highlighter) => highlighter.highlights(self.document.to_string().as_bytes()),
      None => Vec::new(),
    }
  }

  fn rebuild_line_index(&self) {
    self.line_index.write().rebuild(&self.document);
  }
}

impl fmt::Debug for Buffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.read();
    f.debug_struct("Buffer")
      .field("path", &state.path)
      .field("selection", &state.selection)
      .field("dirty", &state.dirty)
      .field("graphemes", &self.document.total_graphemes())
      .finish_non_exhaustive()
  }
}

fn validate_selection(selection: Selection, total: usize) -> Result<()> {
  if selection.anchor > total || selection.head > total {
    return Err(BufferError::InvalidSelection {
      anchor: selection.anchor,
      head:   selection.head,
      len:    total,
    });
  }
  Ok(())
}
