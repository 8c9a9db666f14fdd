use std::fmt;

/// The editor's modal state.
///
/// The core never transitions modes itself; the key-dispatch layer calls
/// [`crate::Editor::set_mode`]. The mode gates exactly one operation:
/// text insertion requires [`Mode::Insert`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
  #[default]
  Normal,
  Insert,
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Mode::Normal => f.write_str("normal"),
      Mode::Insert => f.write_str("insert"),
    }
  }
}
