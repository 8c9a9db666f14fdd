//! The segmentation seam: every translation between text and grapheme
//! positions in this workspace goes through this module, so the segmenter
//! can be swapped without touching the rope or the buffer layer.

use unicode_segmentation::{GraphemeCursor, UnicodeSegmentation};

/// Number of extended grapheme clusters in `text`.
#[must_use]
pub fn count(text: &str) -> usize {
  text.graphemes(true).count()
}

/// Forward iterator over the clusters of `text`.
pub fn clusters(text: &str) -> impl Iterator<Item = &str> {
  text.graphemes(true)
}

/// The `n`-th cluster of `text`, if it has one.
#[must_use]
pub fn nth(text: &str, n: usize) -> Option<&str> {
  text.graphemes(true).nth(n)
}

/// Byte offset where the `n`-th cluster of `text` starts.
///
/// For `n` at or past the cluster count this is `text.len()`, so a pair of
/// boundaries always brackets a valid byte range.
#[must_use]
pub fn cluster_boundary(text: &str, n: usize) -> usize {
  text
    .grapheme_indices(true)
    .nth(n)
    .map_or(text.len(), |(offset, _)| offset)
}

/// Owning forward iterator over the clusters of a `String`.
///
/// Unlike [`clusters`] this does not borrow its input, which lets rope
/// iterators hand out clusters after the tree lock has been released.
#[derive(Debug)]
pub struct ClusterIter {
  text:   String,
  offset: usize,
}

impl ClusterIter {
  #[must_use]
  pub fn new(text: String) -> Self {
    Self { text, offset: 0 }
  }
}

impl Iterator for ClusterIter {
  type Item = String;

  fn next(&mut self) -> Option<String> {
    if self.offset >= self.text.len() {
      return None;
    }
    let mut cursor = GraphemeCursor::new(self.offset, self.text.len(), true);
    let end = match cursor.next_boundary(&self.text, 0) {
      Ok(Some(end)) => end,
      Ok(None) => return None,
      // The cursor is always given the full text as one chunk, so it can
      // never ask for more context.
      Err(_) => unreachable!(),
    };
    let cluster = self.text[self.offset..end].to_string();
    self.offset = end;
    Some(cluster)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_clusters_not_code_points() {
    assert_eq!(count(""), 0);
    assert_eq!(count("hello"), 5);
    assert_eq!(count("👋🌍"), 2);
    // A regional-indicator flag is one cluster built from two code points.
    assert_eq!(count("A🇺🇳B"), 3);
    // CRLF is a single cluster.
    assert_eq!(count("a\r\nb"), 3);
  }

  #[test]
  fn nth_cluster() {
    assert_eq!(nth("A🇺🇳B", 1), Some("🇺🇳"));
    assert_eq!(nth("abc", 3), None);
  }

  #[test]
  fn boundary_brackets_clusters() {
    let text = "A🇺🇳B";
    let start = cluster_boundary(text, 1);
    let end = cluster_boundary(text, 2);
    assert_eq!(&text[start..end], "🇺🇳");
    assert_eq!(cluster_boundary(text, 99), text.len());
  }

  #[test]
  fn owning_iterator_matches_borrowed() {
    let text = "née 👩‍👩‍👧 end";
    let owned: Vec<String> = ClusterIter::new(text.to_string()).collect();
    let borrowed: Vec<&str> = clusters(text).collect();
    assert_eq!(owned, borrowed);
  }
}
