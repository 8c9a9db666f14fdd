//! Unicode-aware document structures for the quill editor.
//!
//! Everything in this crate indexes text by *grapheme cluster* (UAX #29
//! extended grapheme clusters), never by byte or code point. The
//! [`grapheme`] module is the single seam over the segmenter; [`rope`]
//! stores the document; [`line_index`] translates between positions and
//! (line, column) coordinates.

pub mod chars;
pub mod grapheme;
pub mod line_index;
pub mod position;
pub mod rope;
