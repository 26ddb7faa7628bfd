//! The ordered set of pending sweep events.

use std::collections::BTreeMap;

use crate::point::Point;
use crate::segment::Segment;
use crate::segment_list::SegmentList;
use crate::Error;

/// The segments anchored to one event point.
///
/// `upper_list` holds the segments for which this point is the *upper*
/// endpoint — the set the sweep driver must union with whatever is
/// already sitting in the status tree when it reaches this point. An
/// event arising purely from a lower endpoint or a computed intersection
/// carries an empty `upper_list`; the point still needs an entry so the
/// driver visits it.
#[derive(Debug, Clone, Default)]
pub struct Event {
  pub upper_list: SegmentList,
}

/// An ordered set of event points, each carrying the segments whose upper
/// endpoint is that point.
///
/// A point's position in this order is self-contained — both operands of
/// any comparison carry their own tolerance, with no externally supplied
/// sweep context — so a plain `BTreeMap<Point, Event>` already gives
/// O(log n) insert/remove and O(1) amortized max-extraction.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
  events: BTreeMap<Point, Event>,
}

impl EventQueue {
  pub fn new() -> EventQueue {
    EventQueue { events: BTreeMap::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  /// Ensures an (empty) event exists at `point`, without assigning it any
  /// segments. Idempotent: inserting the same point twice is a no-op.
  pub fn insert_point(&mut self, point: Point) {
    self.events.entry(point).or_default();
  }

  /// Adds `segment` to the upper list of the event at `point`, creating
  /// the event if it does not already exist.
  pub fn insert_segment(&mut self, point: Point, segment: Segment) {
    self.events.entry(point).or_default().upper_list.push(segment);
  }

  /// Adds every segment in `segments` to the upper list of the event at
  /// `point`.
  pub fn insert_segments(&mut self, point: Point, segments: &SegmentList) {
    let event = self.events.entry(point).or_default();
    event.upper_list.copy_from(segments);
  }

  /// Removes and returns the greatest pending event, under [`Point`]'s
  /// order (greatest `y`, ties broken by greatest `x`) — the point the
  /// sweep visits next.
  pub fn take_max(&mut self) -> Option<(Point, Event)> {
    self.events.pop_last()
  }

  /// Drops the event at `point`, if present.
  pub fn remove_point(&mut self, point: &Point) -> Result<(), Error> {
    self.events.remove(point).map(|_| ()).ok_or(Error::InvalidArgument)
  }

  pub fn clear(&mut self) {
    self.events.clear();
  }

  /// Iterates events from greatest to least, the order the sweep consumes
  /// them in.
  pub fn iter_descending(&self) -> impl DoubleEndedIterator<Item = (&Point, &Event)> {
    self.events.iter().rev()
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
  fn take_max_visits_top_to_bottom_then_left_to_right() {
    let mut q = EventQueue::new();
    q.insert_point(pt(0.0, 0.0));
    q.insert_point(pt(1.0, 5.0));
    q.insert_point(pt(2.0, 5.0));

    let (p1, _) = q.take_max().unwrap();
    assert_eq!((p1.x, p1.y), (2.0, 5.0));
    let (p2, _) = q.take_max().unwrap();
    assert_eq!((p2.x, p2.y), (1.0, 5.0));
    let (p3, _) = q.take_max().unwrap();
    assert_eq!((p3.x, p3.y), (0.0, 0.0));
    assert!(q.take_max().is_none());
  }

  #[test]
  fn insert_segment_is_idempotent_on_the_point_itself() {
    let mut q = EventQueue::new();
    let p = pt(0.0, 0.0);
    q.insert_point(p);
    q.insert_point(p);
    assert_eq!(q.len(), 1);
  }

  #[test]
  fn insert_segments_accumulates_into_one_event() {
    let mut q = EventQueue::new();
    let p = pt(1.0, 1.0);
    q.insert_segment(p, seg((1.0, 1.0), (2.0, 2.0)));
    q.insert_segment(p, seg((1.0, 1.0), (0.0, 2.0)));
    let (_, event) = q.take_max().unwrap();
    assert_eq!(event.upper_list.len(), 2);
  }

  #[test]
  fn remove_point_reports_missing_points() {
    let mut q = EventQueue::new();
    assert_eq!(q.remove_point(&pt(0.0, 0.0)), Err(Error::InvalidArgument));
    q.insert_point(pt(0.0, 0.0));
    assert_eq!(q.remove_point(&pt(0.0, 0.0)), Ok(()));
    assert!(q.is_empty());
  }

  #[test]
  fn clear_empties_the_queue() {
    let mut q = EventQueue::new();
    q.insert_point(pt(0.0, 0.0));
    q.insert_point(pt(1.0, 1.0));
    q.clear();
    assert!(q.is_empty());
  }
}
