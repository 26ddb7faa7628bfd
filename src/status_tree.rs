//! The status tree: the set of segments currently crossing the sweep
//! line, ordered by where they cross it.
//!
//! Ordinary balanced trees (and `std`'s `BTreeMap`) assume a key's
//! position is fixed once inserted. The status tree's position for a
//! given segment is only valid *at the sweep point active when it was
//! last placed* — the whole structure is implicitly re-sorted as the
//! sweep advances, without being rebuilt. That rules out both a
//! self-contained `Ord` (there is no such thing as "this segment's
//! place" without a sweep point) and removal-by-key (a stale key might
//! no longer compare the way it once did). The arena + [`Handle`] pattern
//! below sidesteps both: segments are located once via an
//! explicitly-supplied sweep point, and from then on are addressed,
//! relinked and removed purely through handles and tree structure.

use std::cmp::Ordering;

use crate::point::Point;
use crate::segment::{compare_at_sweep, Segment};
use crate::Error;

/// An index into the status tree's node arena.
///
/// Stable across insertions and rotations; invalidated only when the node
/// it names is removed. Using a handle after its node has been removed is
/// a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
  fn idx(self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
  Red,
  Black,
}

#[derive(Debug, Clone, Copy)]
struct Node {
  segment: Segment,
  color: Color,
  parent: Option<Handle>,
  left: Option<Handle>,
  right: Option<Handle>,
}

/// The segments crossing the sweep line, ordered left to right at the
/// current sweep point.
#[derive(Debug, Clone, Default)]
pub struct StatusTree {
  nodes: Vec<Node>,
  free: Vec<Handle>,
  root: Option<Handle>,
  len: usize,
}

impl StatusTree {
  pub fn new() -> StatusTree {
    StatusTree { nodes: Vec::new(), free: Vec::new(), root: None, len: 0 }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn clear(&mut self) {
    self.nodes.clear();
    self.free.clear();
    self.root = None;
    self.len = 0;
  }

  pub fn segment(&self, handle: Handle) -> Result<Segment, Error> {
    self.nodes.get(handle.idx()).map(|n| n.segment).ok_or(Error::InvalidArgument)
  }

  // --- arena bookkeeping -------------------------------------------------

  fn alloc(&mut self, segment: Segment) -> Handle {
    let node = Node { segment, color: Color::Red, parent: None, left: None, right: None };
    if let Some(h) = self.free.pop() {
      self.nodes[h.idx()] = node;
      h
    } else {
      self.nodes.push(node);
      Handle((self.nodes.len() - 1) as u32)
    }
  }

  fn free(&mut self, h: Handle) {
    self.free.push(h);
  }

  fn color_of(&self, h: Option<Handle>) -> Color {
    h.map_or(Color::Black, |h| self.nodes[h.idx()].color)
  }

  fn set_color(&mut self, h: Option<Handle>, c: Color) {
    if let Some(h) = h {
      self.nodes[h.idx()].color = c;
    }
  }

  fn parent_of(&self, h: Option<Handle>) -> Option<Handle> {
    h.and_then(|h| self.nodes[h.idx()].parent)
  }

  fn left_of(&self, h: Option<Handle>) -> Option<Handle> {
    h.and_then(|h| self.nodes[h.idx()].left)
  }

  fn right_of(&self, h: Option<Handle>) -> Option<Handle> {
    h.and_then(|h| self.nodes[h.idx()].right)
  }

  fn set_parent(&mut self, h: Handle, p: Option<Handle>) {
    self.nodes[h.idx()].parent = p;
  }

  fn set_left(&mut self, h: Handle, l: Option<Handle>) {
    self.nodes[h.idx()].left = l;
  }

  fn set_right(&mut self, h: Handle, r: Option<Handle>) {
    self.nodes[h.idx()].right = r;
  }

  fn minimum(&self, mut h: Handle) -> Handle {
    while let Some(l) = self.left_of(Some(h)) {
      h = l;
    }
    h
  }

  fn maximum(&self, mut h: Handle) -> Handle {
    while let Some(r) = self.right_of(Some(h)) {
      h = r;
    }
    h
  }

  // --- rotations & transplant ---------------------------------------------

  fn rotate_left(&mut self, x: Handle) {
    let y = self.right_of(Some(x)).expect("rotate_left requires a right child");
    self.set_right(x, self.left_of(Some(y)));
    if let Some(yl) = self.left_of(Some(y)) {
      self.set_parent(yl, Some(x));
    }
    self.set_parent(y, self.parent_of(Some(x)));
    match self.parent_of(Some(x)) {
      None => self.root = Some(y),
      Some(p) => {
        if self.left_of(Some(p)) == Some(x) {
          self.set_left(p, Some(y));
        } else {
          self.set_right(p, Some(y));
        }
      }
    }
    self.set_left(y, Some(x));
    self.set_parent(x, Some(y));
  }

  fn rotate_right(&mut self, x: Handle) {
    let y = self.left_of(Some(x)).expect("rotate_right requires a left child");
    self.set_left(x, self.right_of(Some(y)));
    if let Some(yr) = self.right_of(Some(y)) {
      self.set_parent(yr, Some(x));
    }
    self.set_parent(y, self.parent_of(Some(x)));
    match self.parent_of(Some(x)) {
      None => self.root = Some(y),
      Some(p) => {
        if self.right_of(Some(p)) == Some(x) {
          self.set_right(p, Some(y));
        } else {
          self.set_left(p, Some(y));
        }
      }
    }
    self.set_right(y, Some(x));
    self.set_parent(x, Some(y));
  }

  fn transplant(&mut self, u: Handle, v: Option<Handle>) {
    match self.parent_of(Some(u)) {
      None => self.root = v,
      Some(p) => {
        if self.left_of(Some(p)) == Some(u) {
          self.set_left(p, v);
        } else {
          self.set_right(p, v);
        }
      }
    }
    if let Some(v) = v {
      self.set_parent(v, self.parent_of(Some(u)));
    }
  }

  // --- public operations --------------------------------------------------

  /// Inserts `segment`, ordered at `sweep` against whatever is currently
  /// in the tree, and returns a handle to it.
  pub fn insert(&mut self, segment: Segment, sweep: &Point) -> Result<Handle, Error> {
    let new_handle = self.alloc(segment);
    let mut parent = None;
    let mut went_left = false;
    let mut cur = self.root;
    while let Some(c) = cur {
      parent = Some(c);
      let candidate = self.nodes[c.idx()].segment;
      match compare_at_sweep(&segment, &candidate, sweep)? {
        Ordering::Less | Ordering::Equal => {
          went_left = true;
          cur = self.left_of(Some(c));
        }
        Ordering::Greater => {
          went_left = false;
          cur = self.right_of(Some(c));
        }
      }
    }
    self.set_parent(new_handle, parent);
    match parent {
      None => self.root = Some(new_handle),
      Some(p) if went_left => self.set_left(p, Some(new_handle)),
      Some(p) => self.set_right(p, Some(new_handle)),
    }
    self.len += 1;
    self.insert_fixup(new_handle);
    Ok(new_handle)
  }

  fn insert_fixup(&mut self, mut z: Handle) {
    while self.color_of(self.parent_of(Some(z))) == Color::Red {
      let p = self.parent_of(Some(z)).unwrap();
      let g = self.parent_of(Some(p)).unwrap();
      if Some(p) == self.left_of(Some(g)) {
        let uncle = self.right_of(Some(g));
        if self.color_of(uncle) == Color::Red {
          self.set_color(Some(p), Color::Black);
          self.set_color(uncle, Color::Black);
          self.set_color(Some(g), Color::Red);
          z = g;
        } else {
          if Some(z) == self.right_of(Some(p)) {
            z = p;
            self.rotate_left(z);
          }
          let p2 = self.parent_of(Some(z)).unwrap();
          let g2 = self.parent_of(Some(p2)).unwrap();
          self.set_color(Some(p2), Color::Black);
          self.set_color(Some(g2), Color::Red);
          self.rotate_right(g2);
        }
      } else {
        let uncle = self.left_of(Some(g));
        if self.color_of(uncle) == Color::Red {
          self.set_color(Some(p), Color::Black);
          self.set_color(uncle, Color::Black);
          self.set_color(Some(g), Color::Red);
          z = g;
        } else {
          if Some(z) == self.left_of(Some(p)) {
            z = p;
            self.rotate_right(z);
          }
          let p2 = self.parent_of(Some(z)).unwrap();
          let g2 = self.parent_of(Some(p2)).unwrap();
          self.set_color(Some(p2), Color::Black);
          self.set_color(Some(g2), Color::Red);
          self.rotate_left(g2);
        }
      }
    }
    self.set_color(self.root, Color::Black);
  }

  /// Removes the node `handle` names and returns its segment.
  pub fn remove(&mut self, handle: Handle) -> Result<Segment, Error> {
    if handle.idx() >= self.nodes.len() {
      return Err(Error::InvalidArgument);
    }
    let removed = self.nodes[handle.idx()].segment;

    let mut y = handle;
    let mut y_original_color = self.color_of(Some(y));
    let x;
    let x_parent;

    if self.left_of(Some(handle)).is_none() {
      x = self.right_of(Some(handle));
      x_parent = self.parent_of(Some(handle));
      self.transplant(handle, x);
    } else if self.right_of(Some(handle)).is_none() {
      x = self.left_of(Some(handle));
      x_parent = self.parent_of(Some(handle));
      self.transplant(handle, x);
    } else {
      y = self.minimum(self.right_of(Some(handle)).unwrap());
      y_original_color = self.color_of(Some(y));
      x = self.right_of(Some(y));
      if self.parent_of(Some(y)) == Some(handle) {
        x_parent = Some(y);
        if let Some(xh) = x {
          self.set_parent(xh, Some(y));
        }
      } else {
        x_parent = self.parent_of(Some(y));
        self.transplant(y, self.right_of(Some(y)));
        self.set_right(y, self.right_of(Some(handle)));
        if let Some(r) = self.right_of(Some(y)) {
          self.set_parent(r, Some(y));
        }
      }
      self.transplant(handle, Some(y));
      self.set_left(y, self.left_of(Some(handle)));
      if let Some(l) = self.left_of(Some(y)) {
        self.set_parent(l, Some(y));
      }
      self.set_color(Some(y), self.color_of(Some(handle)));
    }

    if y_original_color == Color::Black {
      self.delete_fixup(x, x_parent);
    }

    self.free(handle);
    self.len -= 1;
    Ok(removed)
  }

  fn delete_fixup(&mut self, mut x: Option<Handle>, mut x_parent: Option<Handle>) {
    while x != self.root && self.color_of(x) == Color::Black {
      let Some(p) = x_parent else { break };
      if x == self.left_of(Some(p)) {
        let mut w = self.right_of(Some(p));
        if self.color_of(w) == Color::Red {
          self.set_color(w, Color::Black);
          self.set_color(Some(p), Color::Red);
          self.rotate_left(p);
          w = self.right_of(Some(p));
        }
        if self.color_of(self.left_of(w)) == Color::Black && self.color_of(self.right_of(w)) == Color::Black {
          self.set_color(w, Color::Red);
          x = Some(p);
          x_parent = self.parent_of(Some(p));
        } else {
          if self.color_of(self.right_of(w)) == Color::Black {
            self.set_color(self.left_of(w), Color::Black);
            self.set_color(w, Color::Red);
            if let Some(wh) = w {
              self.rotate_right(wh);
            }
            w = self.right_of(Some(p));
          }
          self.set_color(w, self.color_of(Some(p)));
          self.set_color(Some(p), Color::Black);
          self.set_color(self.right_of(w), Color::Black);
          self.rotate_left(p);
          x = self.root;
          x_parent = None;
        }
      } else {
        let mut w = self.left_of(Some(p));
        if self.color_of(w) == Color::Red {
          self.set_color(w, Color::Black);
          self.set_color(Some(p), Color::Red);
          self.rotate_right(p);
          w = self.left_of(Some(p));
        }
        if self.color_of(self.right_of(w)) == Color::Black && self.color_of(self.left_of(w)) == Color::Black {
          self.set_color(w, Color::Red);
          x = Some(p);
          x_parent = self.parent_of(Some(p));
        } else {
          if self.color_of(self.left_of(w)) == Color::Black {
            self.set_color(self.right_of(w), Color::Black);
            self.set_color(w, Color::Red);
            if let Some(wh) = w {
              self.rotate_left(wh);
            }
            w = self.left_of(Some(p));
          }
          self.set_color(w, self.color_of(Some(p)));
          self.set_color(Some(p), Color::Black);
          self.set_color(self.left_of(w), Color::Black);
          self.rotate_right(p);
          x = self.root;
          x_parent = None;
        }
      }
    }
    if let Some(xh) = x {
      self.set_color(Some(xh), Color::Black);
    }
  }

  /// The node immediately to the right of `handle`, in tree structure —
  /// purely a successor lookup, independent of any sweep point.
  pub fn next(&self, handle: Handle) -> Option<Handle> {
    if let Some(r) = self.right_of(Some(handle)) {
      return Some(self.minimum(r));
    }
    let mut x = handle;
    let mut p = self.parent_of(Some(x));
    while let Some(pp) = p {
      if self.right_of(Some(pp)) != Some(x) {
        return Some(pp);
      }
      x = pp;
      p = self.parent_of(Some(x));
    }
    None
  }

  /// The node immediately to the left of `handle`.
  pub fn prev(&self, handle: Handle) -> Option<Handle> {
    if let Some(l) = self.left_of(Some(handle)) {
      return Some(self.maximum(l));
    }
    let mut x = handle;
    let mut p = self.parent_of(Some(x));
    while let Some(pp) = p {
      if self.left_of(Some(pp)) != Some(x) {
        return Some(pp);
      }
      x = pp;
      p = self.parent_of(Some(x));
    }
    None
  }

  fn compare_to_sweep(&self, h: Handle, sweep: &Point) -> Result<Ordering, Error> {
    let i = self.nodes[h.idx()].segment.sweep_point(sweep)?;
    Ok(i.cmp(sweep))
  }

  /// The rightmost segment whose crossing of `sweep`'s horizontal line is
  /// at or to the left of `sweep` — the neighbor immediately above a point
  /// newly inserted at `sweep`.
  pub fn get_upper(&self, sweep: &Point) -> Result<Option<Handle>, Error> {
    let mut cur = self.root;
    let mut result = None;
    while let Some(c) = cur {
      match self.compare_to_sweep(c, sweep)? {
        Ordering::Less | Ordering::Equal => {
          result = Some(c);
          cur = self.right_of(Some(c));
        }
        Ordering::Greater => cur = self.left_of(Some(c)),
      }
    }
    Ok(result)
  }

  /// The leftmost segment whose crossing of `sweep`'s horizontal line is
  /// at or to the right of `sweep`.
  pub fn get_lower(&self, sweep: &Point) -> Result<Option<Handle>, Error> {
    let mut cur = self.root;
    let mut result = None;
    while let Some(c) = cur {
      match self.compare_to_sweep(c, sweep)? {
        Ordering::Greater | Ordering::Equal => {
          result = Some(c);
          cur = self.left_of(Some(c));
        }
        Ordering::Less => cur = self.right_of(Some(c)),
      }
    }
    Ok(result)
  }

  /// Of all segments passing through `sweep`, the one with no left
  /// neighbor also passing through it.
  pub fn get_leftmost(&self, sweep: &Point) -> Result<Option<Handle>, Error> {
    let Some(mut cur) = self.get_lower(sweep)? else {
      return Ok(None);
    };
    if !self.nodes[cur.idx()].segment.contains_sweep_point(sweep)? {
      return Ok(None);
    }
    while let Some(p) = self.prev(cur) {
      if self.nodes[p.idx()].segment.contains_sweep_point(sweep)? {
        cur = p;
      } else {
        break;
      }
    }
    Ok(Some(cur))
  }

  /// Of all segments passing through `sweep`, the one with no right
  /// neighbor also passing through it.
  pub fn get_rightmost(&self, sweep: &Point) -> Result<Option<Handle>, Error> {
    let Some(mut cur) = self.get_upper(sweep)? else {
      return Ok(None);
    };
    if !self.nodes[cur.idx()].segment.contains_sweep_point(sweep)? {
      return Ok(None);
    }
    while let Some(n) = self.next(cur) {
      if self.nodes[n.idx()].segment.contains_sweep_point(sweep)? {
        cur = n;
      } else {
        break;
      }
    }
    Ok(Some(cur))
  }

  /// Checks red-black balance invariants and, against `sweep`, that the
  /// in-order traversal is monotonically non-decreasing. Intended for test
  /// and `trace`-level diagnostic use, not the hot path.
  pub fn check_consistency(&self, sweep: &Point) -> Result<(), Error> {
    if self.color_of(self.root) != Color::Black {
      return Err(Error::InvariantViolation);
    }
    let mut black_height = None;
    self.check_node(self.root, 0, &mut black_height)?;

    let mut previous: Option<Segment> = None;
    for handle in self.iter_in_order() {
      let segment = self.nodes[handle.idx()].segment;
      if let Some(prev_segment) = previous {
        if compare_at_sweep(&prev_segment, &segment, sweep)? == Ordering::Greater {
          return Err(Error::InvariantViolation);
        }
      }
      previous = Some(segment);
    }
    Ok(())
  }

  fn check_node(&self, h: Option<Handle>, black_depth: u32, expected: &mut Option<u32>) -> Result<u32, Error> {
    let Some(h) = h else {
      let depth = black_depth + 1;
      match expected {
        None => *expected = Some(depth),
        Some(e) if *e != depth => return Err(Error::InvariantViolation),
        _ => {}
      }
      return Ok(depth);
    };
    let node = &self.nodes[h.idx()];
    if node.color == Color::Red {
      if self.color_of(node.left) == Color::Red || self.color_of(node.right) == Color::Red {
        return Err(Error::InvariantViolation);
      }
    }
    let next_depth = if node.color == Color::Black { black_depth + 1 } else { black_depth };
    let (left, right) = (node.left, node.right);
    self.check_node(left, next_depth, expected)?;
    self.check_node(right, next_depth, expected)
  }

  fn iter_in_order(&self) -> Vec<Handle> {
    let mut result = Vec::with_capacity(self.len);
    let mut stack = Vec::new();
    let mut cur = self.root;
    loop {
      while let Some(c) = cur {
        stack.push(c);
        cur = self.left_of(Some(c));
      }
      match stack.pop() {
        None => break,
        Some(h) => {
          result.push(h);
          cur = self.right_of(Some(h));
        }
      }
    }
    result
  }

  /// A human-readable in-order listing of `(x-at-sweep, tol)` pairs, for
  /// tests and `trace`-level logging.
  pub fn fmt_with_sweep(&self, sweep: &Point) -> String {
    let mut out = String::new();
    for handle in self.iter_in_order() {
      let seg = self.nodes[handle.idx()].segment;
      match seg.sweep_point(sweep) {
        Ok(i) => out.push_str(&format!("[{:.6} +/-{:.2e}] ", i.x, i.tol)),
        Err(_) => out.push_str("[off-sweep] "),
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
  }
  fn seg(a: (f64, f64), b: (f64, f64)) -> Segment {
    Segment::new(pt(a.0, a.1), pt(b.0, b.1))
  }

  #[test]
  fn insert_and_in_order_reflects_left_to_right() {
    let mut tree = StatusTree::new();
    let sweep = pt(0.0, 0.0);
    tree.insert(seg((2.0, 1.0), (2.0, -1.0)), &sweep).unwrap();
    tree.insert(seg((0.0, 1.0), (0.0, -1.0)), &sweep).unwrap();
    tree.insert(seg((1.0, 1.0), (1.0, -1.0)), &sweep).unwrap();

    let xs: Vec<f64> = tree
      .iter_in_order()
      .iter()
      .map(|h| tree.segment(*h).unwrap().sweep_point(&sweep).unwrap().x)
      .collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    claims::assert_ok!(tree.check_consistency(&sweep));
  }

  #[test]
  fn remove_keeps_the_tree_balanced() {
    let mut tree = StatusTree::new();
    let sweep = pt(0.0, 0.0);
    let mut handles = Vec::new();
    for x in 0..20 {
      let h = tree
        .insert(seg((x as f64, 1.0), (x as f64, -1.0)), &sweep)
        .unwrap();
      handles.push(h);
    }
    for h in handles.into_iter().step_by(2) {
      tree.remove(h).unwrap();
    }
    assert_eq!(tree.len(), 10);
    claims::assert_ok!(tree.check_consistency(&sweep));
  }

  #[test]
  fn get_upper_and_lower_bracket_a_gap() {
    let mut tree = StatusTree::new();
    let sweep = pt(0.0, 0.0);
    tree.insert(seg((0.0, 1.0), (0.0, -1.0)), &sweep).unwrap();
    tree.insert(seg((2.0, 1.0), (2.0, -1.0)), &sweep).unwrap();

    let probe = pt(1.0, 0.0);
    let upper = tree.segment(tree.get_upper(&probe).unwrap().unwrap()).unwrap();
    let lower = tree.segment(tree.get_lower(&probe).unwrap().unwrap()).unwrap();
    assert_eq!(upper.a.x, 0.0);
    assert_eq!(lower.a.x, 2.0);
  }

  #[test]
  fn leftmost_and_rightmost_span_coincident_segments() {
    let mut tree = StatusTree::new();
    let sweep = pt(0.0, 0.0);
    let through = pt(1.0, 0.0);
    tree.insert(seg((1.0, 1.0), (1.0, -1.0)), &sweep).unwrap();
    tree.insert(seg((0.0, 1.0), (2.0, -1.0)), &sweep).unwrap();
    tree.insert(seg((0.0, -1.0), (2.0, 1.0)), &sweep).unwrap();

    let left = tree.get_leftmost(&through).unwrap();
    let right = tree.get_rightmost(&through).unwrap();
    assert!(left.is_some());
    assert!(right.is_some());
  }

  #[test]
  fn insert_remove_churn_preserves_invariants() {
    let mut tree = StatusTree::new();
    let sweep = pt(0.0, 0.0);
    let mut handles = Vec::new();
    for round in 0..5 {
      for i in 0..8 {
        let x = (round * 8 + i) as f64 * 0.1;
        handles.push(tree.insert(seg((x, 1.0), (x, -1.0)), &sweep).unwrap());
      }
      while handles.len() > 4 {
        tree.remove(handles.remove(0)).unwrap();
      }
      claims::assert_ok!(tree.check_consistency(&sweep));
    }
  }
}
