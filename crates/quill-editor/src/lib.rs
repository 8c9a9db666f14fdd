//! Buffers, selections, and the editor facade for quill.
//!
//! This crate is the stateful layer above `quill-core`: a [`Buffer`]
//! composes a rope with a selection, a line index, and a backing file;
//! the [`Editor`] coordinates multiple buffers, the modal state, and the
//! sticky desired column used by vertical motions. Rendering, key
//! dispatch, and configuration live outside this crate.

pub mod buffer;
pub mod editor;
pub mod highlight;
pub mod mode;
pub mod movement;
pub mod selection;

pub use buffer::{Buffer, BufferError};
pub use editor::{Editor, EditorError};
pub use mode::Mode;
pub use selection::Selection;
