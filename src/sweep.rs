//! The Bentley–Ottmann driver: ties the event queue and status tree
//! together into a single left-to-right, top-to-bottom sweep and records
//! every segment intersection it crosses.

use std::collections::HashSet;

use crate::event_queue::{Event, EventQueue};
use crate::point::Point;
use crate::segment::Segment;
use crate::segment_list::SegmentList;
use crate::status_tree::{Handle, StatusTree};
use crate::Error;

/// One point at which two or more input segments meet, and every segment
/// involved.
#[derive(Debug, Clone)]
pub struct IntersectionRecord {
  pub point: Point,
  pub segments: SegmentList,
}

/// The intersections a sweep found, in the order the sweep encountered
/// them — top to bottom, then left to right.
#[derive(Debug, Clone, Default)]
pub struct IntersectionList {
  records: Vec<IntersectionRecord>,
}

impl IntersectionList {
  pub fn new() -> IntersectionList {
    IntersectionList { records: Vec::new() }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn push(&mut self, record: IntersectionRecord) {
    self.records.push(record);
  }

  pub fn first(&self) -> Option<&IntersectionRecord> {
    self.records.first()
  }

  /// The record immediately after `record`, by position.
  pub fn next(&self, record: &IntersectionRecord) -> Option<&IntersectionRecord> {
    let idx = self.records.iter().position(|r| std::ptr::eq(r, record))?;
    self.records.get(idx + 1)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, IntersectionRecord> {
    self.records.iter()
  }

  pub fn clear(&mut self) {
    self.records.clear();
  }
}

/// Drives a Bentley–Ottmann sweep over a set of segments.
///
/// Owns the event queue, the status tree, the accumulated intersection
/// list, and a pair of scratch [`SegmentList`]s reused across events to
/// avoid reallocating on every step.
#[derive(Debug, Clone, Default)]
pub struct SweepDriver {
  events: EventQueue,
  status: StatusTree,
  intersections: IntersectionList,
  lower_scratch: SegmentList,
  interior_scratch: SegmentList,
  touching_scratch: SegmentList,
}

impl SweepDriver {
  pub fn new() -> SweepDriver {
    SweepDriver::default()
  }

  pub fn intersections(&self) -> &IntersectionList {
    &self.intersections
  }

  pub fn clear(&mut self) {
    self.events.clear();
    self.status.clear();
    self.intersections.clear();
    self.lower_scratch.clear();
    self.interior_scratch.clear();
    self.touching_scratch.clear();
  }

  fn is_fresh(&self) -> bool {
    self.events.is_empty() && self.status.is_empty() && self.intersections.is_empty()
  }

  /// Sweeps `segments` top to bottom, recording every intersection. The
  /// driver must be freshly constructed or freshly [`clear`](Self::clear)ed;
  /// calling `scan` again without clearing returns
  /// [`Error::NotIdempotent`].
  pub fn scan(&mut self, segments: &[Segment]) -> Result<(), Error> {
    debug_assert!(self.is_fresh(), "scan called on a driver with leftover state");
    if !self.is_fresh() {
      return Err(Error::NotIdempotent);
    }

    for segment in segments {
      let (lower, upper) = segment.ordered_endpoints();
      self.events.insert_segment(upper, *segment);
      self.events.insert_point(lower);
    }
    log::debug!("seeded {} events from {} segments", self.events.len(), segments.len());

    while let Some((sweep, event)) = self.events.take_max() {
      self.handle_event(sweep, event)?;
    }
    Ok(())
  }

  /// Partitions the segments currently in the status tree that pass
  /// through `sweep` into those ending here (lower endpoint) and those
  /// merely crossing (interior), returning their handles.
  fn classify(&self, sweep: &Point) -> Result<(Vec<Handle>, Vec<Handle>), Error> {
    let mut lower = Vec::new();
    let mut interior = Vec::new();
    let mut cur = self.status.get_leftmost(sweep)?;
    while let Some(h) = cur {
      let segment = self.status.segment(h)?;
      if !segment.contains_sweep_point(sweep)? {
        break;
      }
      let (segment_lower, _) = segment.ordered_endpoints();
      if segment_lower == *sweep {
        lower.push(h);
      } else {
        interior.push(h);
      }
      cur = self.status.next(h);
    }
    Ok((lower, interior))
  }

  fn handle_event(&mut self, sweep: Point, event: Event) -> Result<(), Error> {
    let (lower_handles, interior_handles) = self.classify(&sweep)?;

    self.lower_scratch.clear();
    for &h in &lower_handles {
      self.lower_scratch.push(self.status.segment(h)?);
    }
    self.interior_scratch.clear();
    for &h in &interior_handles {
      self.interior_scratch.push(self.status.segment(h)?);
    }

    let touching_count = self.lower_scratch.len() + self.interior_scratch.len() + event.upper_list.len();
    log::trace!(
      "event ({:.6}, {:.6}): {} lower, {} interior, {} upper",
      sweep.x,
      sweep.y,
      self.lower_scratch.len(),
      self.interior_scratch.len(),
      event.upper_list.len()
    );

    if touching_count > 1 {
      self.touching_scratch.clear();
      self.touching_scratch.copy_from(&self.lower_scratch);
      self.touching_scratch.copy_from(&self.interior_scratch);
      self.touching_scratch.copy_from(&event.upper_list);
      self.intersections.push(IntersectionRecord {
        point: sweep,
        segments: self.touching_scratch.clone(),
      });
    }

    for h in lower_handles.into_iter().chain(interior_handles) {
      self.status.remove(h)?;
    }

    let mut reinserted = Vec::with_capacity(self.interior_scratch.len() + event.upper_list.len());
    for segment in event.upper_list.iter().chain(self.interior_scratch.iter()) {
      let handle = self.status.insert(*segment, &sweep)?;
      self.forget_stale_neighbor_event(handle)?;
      reinserted.push(handle);
    }

    self.probe(sweep, &reinserted)
  }

  /// A segment just inserted between two others can separate a pair that
  /// used to be adjacent. If that pair crosses below the sweep line, the
  /// event already queued for their crossing is stale — the new segment
  /// sits between them now, so they can no longer meet there without first
  /// meeting the new segment. Drop the stale event; `probe` schedules it
  /// again once the new segment stops separating them.
  fn forget_stale_neighbor_event(&mut self, inserted: Handle) -> Result<(), Error> {
    if let (Some(next), Some(prev)) = (self.status.next(inserted), self.status.prev(inserted)) {
      let next_segment = self.status.segment(next)?;
      let prev_segment = self.status.segment(prev)?;
      let (tag, point) = next_segment.intersect(&prev_segment);
      use crate::segment::IntersectionTag::*;
      if matches!(tag, InteriorS1 | InteriorS2 | Interior) {
        let _ = self.events.remove_point(&point);
      }
    }
    Ok(())
  }

  /// Finds the pair(s) of newly-adjacent segments created by this event
  /// and schedules any crossing they have below the sweep line as a new
  /// event.
  fn probe(&mut self, sweep: Point, reinserted: &[Handle]) -> Result<(), Error> {
    if reinserted.is_empty() {
      if let (Some(left), Some(right)) = (self.status.get_upper(&sweep)?, self.status.get_lower(&sweep)?) {
        self.probe_pair(left, right, sweep)?;
      }
      return Ok(());
    }

    let group: HashSet<Handle> = reinserted.iter().copied().collect();

    let mut leftmost = reinserted[0];
    while let Some(prev) = self.status.prev(leftmost) {
      if group.contains(&prev) {
        leftmost = prev;
      } else {
        break;
      }
    }
    let mut rightmost = reinserted[0];
    while let Some(next) = self.status.next(rightmost) {
      if group.contains(&next) {
        rightmost = next;
      } else {
        break;
      }
    }

    if let Some(outer_left) = self.status.prev(leftmost) {
      self.probe_pair(outer_left, leftmost, sweep)?;
    }
    if let Some(outer_right) = self.status.next(rightmost) {
      self.probe_pair(rightmost, outer_right, sweep)?;
    }
    Ok(())
  }

  fn probe_pair(&mut self, h1: Handle, h2: Handle, sweep: Point) -> Result<(), Error> {
    let s1 = self.status.segment(h1)?;
    let s2 = self.status.segment(h2)?;
    let (tag, point) = s1.intersect(&s2);
    use crate::segment::IntersectionTag::*;
    if matches!(tag, Disjoint | PointsDisjoint) {
      return Ok(());
    }
    if point.cmp(&sweep) == std::cmp::Ordering::Less {
      log::trace!("scheduling future {tag} at ({:.6}, {:.6})", point.x, point.y);
      self.events.insert_point(point);
    }
    Ok(())
  }
}
