//! Grapheme-indexed rope for document text.
//!
//! The rope is a balanced binary tree whose leaves hold short UTF-8
//! strings and whose internal nodes carry the cluster count of their left
//! subtree. All public positions are grapheme indices; byte offsets never
//! cross the API boundary.
//!
//! # Structure
//!
//! ```text
//! Internal { weight: 3 }
//! ├── Leaf { "a👋b", weight: 3 }
//! └── Leaf { "cd",   weight: 2 }
//! ```
//!
//! `weight` of an internal node is the total cluster count of its left
//! subtree, so descending to grapheme `i` compares `i` against `weight`
//! and subtracts on the way right. The empty rope is a `None` root; no
//! tree ever contains an empty leaf.
//!
//! # Mutation
//!
//! `insert`, `delete`, and `replace` are built from `split` and `concat`
//! and finish with a full rebalance (flatten to the leaf list, rebuild by
//! halving). Mutators take the rope's write lock for the whole
//! split + concat + rebalance sequence; readers share the read lock.
//!
//! # Iteration
//!
//! [`Rope::iter`] snapshots the leaf strings in order under the read lock
//! and then segments them lazily, so an iterator is never invalidated by a
//! later edit — it keeps yielding the document as it was when the iterator
//! was created.

use std::fmt;

use parking_lot::RwLock;
use thiserror::Error;

use crate::grapheme::{self, ClusterIter};

/// Maximum number of grapheme clusters stored in a single leaf.
pub const MAX_LEAF: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RopeError {
  #[error("grapheme index {0} out of bounds")]
  OutOfBounds(usize),
  #[error("invalid grapheme range {0}..{1}")]
  InvalidRange(usize, usize),
}

pub type Result<T> = std::result::Result<T, RopeError>;

#[derive(Debug)]
enum Node {
  Leaf {
    data:   String,
    weight: usize,
  },
  Internal {
    left:   Box<Node>,
    right:  Box<Node>,
    weight: usize,
  },
}

impl Node {
  fn total_graphemes(&self) -> usize {
    match self {
      Node::Leaf { weight, .. } => *weight,
      Node::Internal { right, weight, .. } => weight + right.total_graphemes(),
    }
  }

  /// Cluster at grapheme index `index`; the caller has bounds-checked.
  fn grapheme_at(&self, index: usize) -> Option<&str> {
    match self {
      Node::Leaf { data, .. } => grapheme::nth(data, index),
      Node::Internal { left, right, weight } => {
        if index < *weight {
          left.grapheme_at(index)
        } else {
          right.grapheme_at(index - weight)
        }
      },
    }
  }

  /// Appends the clusters in `[start, end)` to `out`. Indices are relative
  /// to this subtree and clamped per child on the way down.
  fn substring_into(&self, start: usize, end: usize, out: &mut String) {
    if start >= end {
      return;
    }
    match self {
      Node::Leaf { data, .. } => {
        let from = grapheme::cluster_boundary(data, start);
        let to = grapheme::cluster_boundary(data, end);
        out.push_str(&data[from..to]);
      },
      Node::Internal { left, right, weight } => {
        if start < *weight {
          left.substring_into(start, end.min(*weight), out);
        }
        if end > *weight {
          right.substring_into(start.saturating_sub(*weight), end - weight, out);
        }
      },
    }
  }

  fn fmt_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Node::Leaf { data, .. } => f.write_str(data),
      Node::Internal { left, right, .. } => {
        left.fmt_to(f)?;
        right.fmt_to(f)
      },
    }
  }

  /// In-order leaf data, cloned. Basis of the snapshot iterator.
  fn collect_leaf_data(&self, out: &mut Vec<String>) {
    match self {
      Node::Leaf { data, .. } => out.push(data.clone()),
      Node::Internal { left, right, .. } => {
        left.collect_leaf_data(out);
        right.collect_leaf_data(out);
      },
    }
  }
}

fn total(node: &Option<Box<Node>>) -> usize {
  node.as_deref().map_or(0, Node::total_graphemes)
}

/// Splits `node` so the left part holds exactly `index` clusters.
///
/// Splitting at 0 or at the subtree's full weight returns the node intact
/// on the other side; no empty leaf is ever materialized.
fn split(node: Option<Box<Node>>, index: usize) -> (Option<Box<Node>>, Option<Box<Node>>) {
  let Some(node) = node else {
    return (None, None);
  };
  match *node {
    Node::Leaf { data, weight } => {
      if index == 0 {
        return (None, Some(Box::new(Node::Leaf { data, weight })));
      }
      if index >= weight {
        return (Some(Box::new(Node::Leaf { data, weight })), None);
      }
      let mut left_data = data;
      let right_data = left_data.split_off(grapheme::cluster_boundary(&left_data, index));
      (
        Some(Box::new(Node::Leaf {
          data:   left_data,
          weight: index,
        })),
        Some(Box::new(Node::Leaf {
          data:   right_data,
          weight: weight - index,
        })),
      )
    },
    Node::Internal { left, right, weight } => {
      if index < weight {
        let (left_left, left_right) = split(Some(left), index);
        (left_left, concat(left_right, Some(right)))
      } else {
        let (right_left, right_right) = split(Some(right), index - weight);
        (concat(Some(left), right_left), right_right)
      }
    },
  }
}

/// Joins two subtrees under a new internal node; either side being empty
/// returns the other unchanged.
fn concat(left: Option<Box<Node>>, right: Option<Box<Node>>) -> Option<Box<Node>> {
  match (left, right) {
    (None, right) => right,
    (left, None) => left,
    (Some(left), Some(right)) => {
      let weight = left.total_graphemes();
      Some(Box::new(Node::Internal { left, right, weight }))
    },
  }
}

/// Splits `text` into leaves of at most [`MAX_LEAF`] clusters.
fn leaves_of(text: &str) -> Vec<Box<Node>> {
  let mut leaves = Vec::new();
  let mut data = String::new();
  let mut count = 0;
  for cluster in grapheme::clusters(text) {
    data.push_str(cluster);
    count += 1;
    if count == MAX_LEAF {
      leaves.push(Box::new(Node::Leaf {
        data:   std::mem::take(&mut data),
        weight: count,
      }));
      count = 0;
    }
  }
  if !data.is_empty() {
    leaves.push(Box::new(Node::Leaf { data, weight: count }));
  }
  leaves
}

/// Builds a balanced tree by recursively halving the leaf list.
fn build_balanced(mut leaves: Vec<Box<Node>>) -> Option<Box<Node>> {
  match leaves.len() {
    0 => None,
    1 => leaves.pop(),
    len => {
      let right = leaves.split_off(len / 2);
      concat(build_balanced(leaves), build_balanced(right))
    },
  }
}

fn flatten(node: Box<Node>, leaves: &mut Vec<Box<Node>>) {
  match *node {
    Node::Leaf { data, weight } => leaves.push(Box::new(Node::Leaf { data, weight })),
    Node::Internal { left, right, .. } => {
      flatten(left, leaves);
      flatten(right, leaves);
    },
  }
}

fn rebalance(node: Option<Box<Node>>) -> Option<Box<Node>> {
  let Some(node) = node else {
    return None;
  };
  let mut leaves = Vec::new();
  flatten(node, &mut leaves);
  build_balanced(leaves)
}

/// A thread-safe rope indexed by grapheme cluster.
///
/// Read methods take the shared lock; `insert`, `delete`, and `replace`
/// take the exclusive lock for the duration of the edit, so concurrent
/// readers always observe either the old or the new document, never a
/// partial one.
#[derive(Debug)]
pub struct Rope {
  root: RwLock<Option<Box<Node>>>,
}

impl Rope {
  /// Builds a rope from `text`. The empty string produces an empty rope.
  #[must_use]
  pub fn new(text: &str) -> Self {
    Self {
      root: RwLock::new(build_balanced(leaves_of(text))),
    }
  }

  /// Total number of grapheme clusters in the document.
  #[must_use]
  pub fn total_graphemes(&self) -> usize {
    total(&self.root.read())
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.root.read().is_none()
  }

  /// Inserts `text` at grapheme index `index`.
  pub fn insert(&self, index: usize, text: &str) -> Result<()> {
    let mut root = self.root.write();
    if index > total(&root) {
      return Err(RopeError::OutOfBounds(index));
    }
    let (left, right) = split(root.take(), index);
    let middle = build_balanced(leaves_of(text));
    *root = rebalance(concat(concat(left, middle), right));
    Ok(())
  }

  /// Removes the clusters in `[start, end)`.
  pub fn delete(&self, start: usize, end: usize) -> Result<()> {
    let mut root = self.root.write();
    if start > end || end > total(&root) {
      return Err(RopeError::InvalidRange(start, end));
    }
    let (left, rest) = split(root.take(), start);
    let (_, right) = split(rest, end - start);
    *root = rebalance(concat(left, right));
    Ok(())
  }

  /// Replaces the clusters in `[start, end)` with `text`, atomically with
  /// respect to readers.
  pub fn replace(&self, start: usize, end: usize, text: &str) -> Result<()> {
    let mut root = self.root.write();
    if start > end || end > total(&root) {
      return Err(RopeError::InvalidRange(start, end));
    }
    let (left, rest) = split(root.take(), start);
    let (_, right) = split(rest, end - start);
    let middle = build_balanced(leaves_of(text));
    *root = rebalance(concat(concat(left, middle), right));
    Ok(())
  }

  /// The clusters in `[start, end)` as an owned string.
  pub fn substring(&self, start: usize, end: usize) -> Result<String> {
    let root = self.root.read();
    if start > end || end > total(&root) {
      return Err(RopeError::InvalidRange(start, end));
    }
    let mut out = String::new();
    if let Some(node) = root.as_deref() {
      node.substring_into(start, end, &mut out);
    }
    Ok(out)
  }

  /// The cluster at grapheme index `index`.
  pub fn grapheme_at(&self, index: usize) -> Result<String> {
    let root = self.root.read();
    if index >= total(&root) {
      return Err(RopeError::OutOfBounds(index));
    }
    root
      .as_deref()
      .and_then(|node| node.grapheme_at(index))
      .map(str::to_string)
      .ok_or(RopeError::OutOfBounds(index))
  }

  /// Forward iterator over the document's clusters.
  ///
  /// The iterator snapshots the document under the read lock when it is
  /// created; edits performed afterwards do not affect it.
  #[must_use]
  pub fn iter(&self) -> Graphemes {
    let root = self.root.read();
    let mut leaves = Vec::new();
    if let Some(node) = root.as_deref() {
      node.collect_leaf_data(&mut leaves);
    }
    Graphemes {
      leaves:  leaves.into_iter(),
      current: None,
    }
  }
}

impl Default for Rope {
  fn default() -> Self {
    Self::new("")
  }
}

impl fmt::Display for Rope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.root.read().as_deref() {
      Some(node) => node.fmt_to(f),
      None => Ok(()),
    }
  }
}

/// Snapshot iterator over a rope's grapheme clusters, in document order.
#[derive(Debug)]
pub struct Graphemes {
  leaves:  std::vec::IntoIter<String>,
  current: Option<ClusterIter>,
}

impl Iterator for Graphemes {
  type Item = String;

  fn next(&mut self) -> Option<String> {
    loop {
      if let Some(current) = &mut self.current {
        if let Some(cluster) = current.next() {
          return Some(cluster);
        }
      }
      self.current = Some(ClusterIter::new(self.leaves.next()?));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grapheme;

  #[test]
  fn new_preserves_input() {
    for text in ["Hello, World!", "こんにちは世界", "👋🌍", "A🇺🇳B", ""] {
      let rope = Rope::new(text);
      assert_eq!(rope.to_string(), text);
      assert_eq!(rope.total_graphemes(), grapheme::count(text));
    }
  }

  #[test]
  fn empty_rope_is_empty() {
    let rope = Rope::default();
    assert!(rope.is_empty());
    assert_eq!(rope.total_graphemes(), 0);
    assert_eq!(rope.to_string(), "");
  }

  #[test]
  fn insert_at_cluster_positions() {
    let cases = [
      ("Hello, World!", 7, "Beautiful ", "Hello, Beautiful World!"),
      ("こんにちは世界", 5, "！", "こんにちは！世界"),
      ("👋🌍", 1, "😊", "👋😊🌍"),
      ("A🇺🇳B", 2, "C", "A🇺🇳CB"),
      ("", 0, "Start", "Start"),
    ];
    for (initial, at, text, expected) in cases {
      let rope = Rope::new(initial);
      rope.insert(at, text).unwrap();
      assert_eq!(rope.to_string(), expected);
      assert_eq!(rope.total_graphemes(), grapheme::count(expected));
    }
  }

  #[test]
  fn insert_at_both_ends() {
    let rope = Rope::new("bc");
    rope.insert(0, "a").unwrap();
    rope.insert(3, "d").unwrap();
    assert_eq!(rope.to_string(), "abcd");
  }

  #[test]
  fn insert_empty_is_noop() {
    let rope = Rope::new("abc");
    rope.insert(1, "").unwrap();
    assert_eq!(rope.to_string(), "abc");
    assert_eq!(rope.total_graphemes(), 3);
  }

  #[test]
  fn insert_out_of_bounds() {
    let rope = Rope::new("Test");
    assert_eq!(rope.insert(5, "x"), Err(RopeError::OutOfBounds(5)));
    assert_eq!(rope.to_string(), "Test");
  }

  #[test]
  fn delete_ranges() {
    let cases = [
      ("Hello, Beautiful World!", 7, 17, "Hello, World!"),
      ("こんにちは！世界", 5, 6, "こんにちは世界"),
      ("👋😊🌍", 1, 2, "👋🌍"),
      ("A🇺🇳CB", 1, 3, "AB"),
      ("Start and End", 0, 6, "and End"),
      ("Start and End", 10, 13, "Start and "),
      ("All to delete", 0, 13, ""),
    ];
    for (initial, start, end, expected) in cases {
      let rope = Rope::new(initial);
      rope.delete(start, end).unwrap();
      assert_eq!(rope.to_string(), expected);
      assert_eq!(rope.total_graphemes(), grapheme::count(expected));
    }
  }

  #[test]
  fn delete_empty_range_is_noop() {
    let rope = Rope::new("abc");
    rope.delete(2, 2).unwrap();
    assert_eq!(rope.to_string(), "abc");
  }

  #[test]
  fn delete_invalid_ranges() {
    let rope = Rope::new("Test");
    assert_eq!(rope.delete(1, 5), Err(RopeError::InvalidRange(1, 5)));
    assert_eq!(rope.delete(3, 2), Err(RopeError::InvalidRange(3, 2)));
    assert_eq!(rope.to_string(), "Test");
  }

  #[test]
  fn replace_range() {
    let rope = Rope::new("Hello, World!");
    rope.replace(7, 12, "quill").unwrap();
    assert_eq!(rope.to_string(), "Hello, quill!");

    rope.replace(0, 0, ">> ").unwrap();
    assert_eq!(rope.to_string(), ">> Hello, quill!");

    assert_eq!(rope.replace(4, 99, "x"), Err(RopeError::InvalidRange(4, 99)));
  }

  #[test]
  fn substring_within_leaf() {
    let rope = Rope::new("Hello, Beautiful World!");
    assert_eq!(rope.substring(7, 16).unwrap(), "Beautiful");
    assert_eq!(rope.substring(0, 0).unwrap(), "");
    assert_eq!(rope.substring(1, 5).unwrap(), "ello");
  }

  #[test]
  fn substring_of_clusters() {
    let rope = Rope::new("A🇺🇳CB");
    assert_eq!(rope.substring(1, 2).unwrap(), "🇺🇳");
    assert_eq!(rope.substring(3, 2), Err(RopeError::InvalidRange(3, 2)));
  }

  #[test]
  fn substring_across_leaves() {
    let text = "x".repeat(300) + &"y".repeat(300);
    let rope = Rope::new(&text);
    let expected = "x".repeat(50) + &"y".repeat(50);
    assert_eq!(rope.substring(250, 350).unwrap(), expected);
    assert_eq!(rope.to_string(), text);
  }

  #[test]
  fn grapheme_at_clusters() {
    let rope = Rope::new("A🇺🇳B");
    assert_eq!(rope.grapheme_at(0).unwrap(), "A");
    assert_eq!(rope.grapheme_at(1).unwrap(), "🇺🇳");
    assert_eq!(rope.grapheme_at(2).unwrap(), "B");
    assert_eq!(rope.grapheme_at(3), Err(RopeError::OutOfBounds(3)));
  }

  #[test]
  fn iterator_yields_document_order() {
    let text = "ab\ncd👋";
    let rope = Rope::new(text);
    let clusters: Vec<String> = rope.iter().collect();
    let expected: Vec<&str> = grapheme::clusters(text).collect();
    assert_eq!(clusters, expected);
  }

  #[test]
  fn iterator_crosses_leaves() {
    let text = "a".repeat(MAX_LEAF * 2 + 17);
    let rope = Rope::new(&text);
    assert_eq!(rope.iter().count(), text.len());
  }

  #[test]
  fn iterator_is_a_snapshot() {
    let rope = Rope::new("abc");
    let iter = rope.iter();
    rope.insert(0, "zzz").unwrap();
    assert_eq!(iter.collect::<String>(), "abc");
  }

  #[test]
  fn split_points_reassemble() {
    // insert of "" splits at every position and reassembles; the document
    // must come back identical each time.
    let text = "ab\nこん👋🌍 _x";
    let rope = Rope::new(text);
    let total = rope.total_graphemes();
    for p in 0..=total {
      rope.insert(p, "").unwrap();
      assert_eq!(rope.to_string(), text);
    }
  }

  #[test]
  fn delete_then_reinsert_restores() {
    let text = "foo 👋🌍 bar\nbaz";
    let total = grapheme::count(text);
    for start in 0..=total {
      for end in start..=total {
        let rope = Rope::new(text);
        let removed = rope.substring(start, end).unwrap();
        rope.delete(start, end).unwrap();
        rope.insert(start, &removed).unwrap();
        assert_eq!(rope.to_string(), text, "range {start}..{end}");
      }
    }
  }

  #[test]
  fn mutation_under_concurrent_readers() {
    let rope = Rope::new(&"a".repeat(1000));
    std::thread::scope(|scope| {
      for _ in 0..4 {
        scope.spawn(|| {
          for _ in 0..100 {
            // A reader sees the document before or after an edit, never a
            // torn one.
            let text = rope.to_string();
            assert!(text.chars().all(|c| c == 'a' || c == 'b'));
            assert!(rope.substring(0, 10).is_ok());
          }
        });
      }
      scope.spawn(|| {
        for i in 0..100 {
          rope.insert(i, "b").unwrap();
        }
      });
    });
    assert_eq!(rope.total_graphemes(), 1100);
  }
}
