//! `sweepgeom` — a tolerant Bentley–Ottmann line-segment intersection sweep.
//!
//! The crate is built bottom-up out of a handful of small containers, each
//! responsible for one part of the sweep:
//!
//! - [`point`] — 2-D points with an attached tolerance radius, and the
//!   lexicographic order the sweep advances by.
//! - [`segment`] — oriented line segments, sweep-line intersection, and
//!   pairwise segment/segment classification.
//! - [`segment_list`] — an insertion-ordered, reference-preserving sequence
//!   of segments.
//! - [`event_queue`] — the ordered set of pending sweep events.
//! - [`status_tree`] — the order-statistics structure holding the segments
//!   currently crossing the sweep line, reordered as the sweep advances.
//! - [`sweep`] — the driver that ties the above together and produces the
//!   final [`sweep::IntersectionList`].
//!
//! # Control flow
//!
//! [`sweep::SweepDriver::scan`] seeds the event queue with every segment
//! endpoint, then repeatedly takes the greatest pending event (sweeping
//! top-to-bottom in `y`, then left-to-right in `x`), partitions the segments
//! touching that point into `lower`/`interior`/`upper` sets, rewrites the
//! status tree, and probes the newly adjacent segments for intersections
//! that become new events. See [`sweep`] for the full six-phase breakdown.
//!
//! # Tolerance
//!
//! Every [`point::Point`] carries a `tol` radius; two points within
//! `max(tol_a, tol_b)` of each other compare equal. [`EPS`] is the crate-wide
//! floor applied to *computed* intersection points, which is what collapses
//! near-coincident crossings into a single event instead of a cascade of
//! near-duplicates (see [`segment::Segment::intersect`]).

pub mod event_queue;
pub mod point;
pub mod segment;
pub mod segment_list;
pub mod status_tree;
pub mod sweep;

pub use event_queue::{Event, EventQueue};
pub use point::Point;
pub use segment::{IntersectionTag, Segment};
pub use segment_list::SegmentList;
pub use status_tree::StatusTree;
pub use sweep::{IntersectionList, IntersectionRecord, SweepDriver};

/// Minimum tolerance applied to any intersection point the sweep computes.
///
/// Every computed intersection point's tolerance is raised to at least
/// `EPS`, so the event queue's tolerance-aware point order treats
/// nearly-identical crossings as the same event instead of a cascade of
/// near-duplicates. Tunable at build time only, not per call.
pub const EPS: f64 = 1e-8;

/// Errors the sweep (and the containers it drives) can report.
///
/// Allocation failure is not modeled separately since Rust surfaces it as
/// an abort, not a recoverable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// A segment/sweep-line predicate was asked to evaluate a sweep point that
  /// lies entirely outside the segment's `y`-extent.
  OutsideSweep,
  /// A tree or queue consistency check found a structural violation
  /// (ordering, color balance, or size mismatch).
  InvariantViolation,
  /// An operation was given a null/empty argument where one was required.
  InvalidArgument,
  /// `scan` was called on a driver that was not freshly cleared.
  NotIdempotent,
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Error::OutsideSweep => write!(f, "sweep point lies outside the segment's y-range"),
      Error::InvariantViolation => write!(f, "container invariant violated"),
      Error::InvalidArgument => write!(f, "invalid argument"),
      Error::NotIdempotent => write!(f, "scan called on a driver that was not freshly cleared"),
    }
  }
}

impl std::error::Error for Error {}
