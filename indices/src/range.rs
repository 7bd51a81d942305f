use std::fmt;

use crate::IndicesError;

/// How far a view extends, as far as can be established without
/// resolving any element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extent {
    /// Exactly this many elements.
    Finite(u64),
    /// Unbounded to the right.
    Infinite,
    /// A rootless selection (or something derived from one): the
    /// number of positions is known, but there is nothing to resolve
    /// them against.
    Unbound(u64),
}

/// An arithmetic progression `start, start + step, start + 2 * step, ...`
/// bounded by an exclusive `stop`, or unbounded when `stop` is absent.
///
/// Ranges are always valid by construction: the step is non-zero, and
/// an unbounded range always ascends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: i64,
    stop: Option<i64>,
    step: i64,
}

impl Range {
    /// Creates a new range, validating its parameters.
    pub fn new(start: i64, stop: Option<i64>, step: i64) -> Result<Self, IndicesError> {
        if step == 0 {
            return Err(IndicesError::InvalidRange {
                reason: "step cannot be zero".to_string(),
            });
        }
        if stop.is_none() && step < 0 {
            return Err(IndicesError::InvalidRange {
                reason: format!("an unbounded range cannot descend (step {step})"),
            });
        }
        Ok(Self { start, stop, step })
    }

    /// The natural numbers `0, 1, 2, ...`.
    pub fn naturals() -> Self {
        Self {
            start: 0,
            stop: None,
            step: 1,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn stop(&self) -> Option<i64> {
        self.stop
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// The number of elements in the range, or `None` if it is
    /// unbounded.
    pub fn len(&self) -> Option<u64> {
        let stop = i128::from(self.stop?);
        let start = i128::from(self.start);
        let step = i128::from(self.step);
        let len = if step > 0 {
            if stop > start {
                (stop - start - 1) / step + 1
            } else {
                0
            }
        } else if start > stop {
            (start - stop - 1) / (-step) + 1
        } else {
            0
        };
        Some(u64::try_from(len).unwrap_or(u64::MAX))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// The element at position `pos`, if the position is in bounds.
    pub fn get(&self, pos: u64) -> Option<i64> {
        if self.len().is_some_and(|len| pos >= len) {
            return None;
        }
        let value = i128::from(self.start) + i128::from(pos) * i128::from(self.step);
        i64::try_from(value).ok()
    }

    /// Membership in O(1): `value` must be congruent to `start` modulo
    /// `step` and lie on the near side of `stop`.
    pub fn contains(&self, value: i64) -> bool {
        let offset = i128::from(value) - i128::from(self.start);
        let step = i128::from(self.step);
        if offset % step != 0 || offset / step < 0 {
            return false;
        }
        match self.stop {
            None => true,
            Some(stop) if self.step > 0 => value < stop,
            Some(stop) => value > stop,
        }
    }

    /// The range of `len` elements starting at `start`, when every
    /// element and a matching exclusive stop fit in `i64`.
    fn from_parts(start: i128, len: u64, step: i128) -> Option<Range> {
        let first = i64::try_from(start).ok()?;
        let step = i64::try_from(step).ok()?;
        if len == 0 {
            return Some(Range {
                start: first,
                stop: Some(first),
                step,
            });
        }
        let last = i64::try_from(start + (i128::from(len) - 1) * i128::from(step)).ok()?;
        // Prefer `start + len * step`; past the edge of `i64`, any
        // stop just beyond the last element will do.
        let stop = match i64::try_from(start + i128::from(len) * i128::from(step)) {
            Ok(stop) => stop,
            Err(_) => last.checked_add(step.signum())?,
        };
        Some(Range {
            start: first,
            stop: Some(stop),
            step,
        })
    }

    /// Whether both ranges enumerate the same elements in the same
    /// order. Unbounded ranges never do.
    pub(crate) fn same_elements(&self, other: &Range) -> bool {
        match (self.len(), other.len()) {
            (Some(lhs), Some(rhs)) if lhs == rhs => {
                lhs == 0 || (self.start == other.start && (lhs == 1 || self.step == other.step))
            }
            _ => false,
        }
    }

    /// Composes this range with `local`, a range of positions already
    /// resolved against this range's extent. The result enumerates
    /// `self[local[0]], self[local[1]], ...`, or is `None` when it
    /// cannot be expressed in `i64`.
    pub(crate) fn compose(&self, local: &Range) -> Option<Range> {
        let base_step = i128::from(self.step);
        let Some(len) = local.len() else {
            let start = i128::from(self.start) + i128::from(local.start) * base_step;
            return Some(Range {
                start: i64::try_from(start).ok()?,
                stop: None,
                step: i64::try_from(base_step * i128::from(local.step)).ok()?,
            });
        };
        // With at most one element the local step only matters for its
        // sign, and the local start not at all when there are none.
        let (offset, local_step) = match len {
            0 => (0, 1),
            1 => (local.start, local.step.signum()),
            _ => (local.start, local.step),
        };
        Range::from_parts(
            i128::from(self.start) + i128::from(offset) * base_step,
            len,
            base_step * i128::from(local_step),
        )
    }

    /// The same elements in reverse order. `None` for unbounded ranges,
    /// and for ranges whose reversal cannot be expressed in `i64`.
    pub(crate) fn reversed(&self) -> Option<Range> {
        let len = self.len()?;
        let step = i128::from(self.step);
        let last = match len {
            0 => i128::from(self.start),
            len => i128::from(self.start) + (i128::from(len) - 1) * step,
        };
        Range::from_parts(last, len, -step)
    }

    /// The local positions `len - 1, len - 2, ..., 0`.
    pub(crate) fn reversal(len: u64) -> Range {
        Range {
            start: i64::try_from(len).map_or(i64::MAX, |len| len - 1),
            stop: Some(-1),
            step: -1,
        }
    }

    /// Whether every position this range enumerates is a valid position
    /// in a view of the given extent.
    pub(crate) fn fits(&self, extent: Extent) -> bool {
        let len = match extent {
            Extent::Infinite => return self.step > 0 && self.start >= 0,
            Extent::Unbound(_) if self.step < 0 => return false,
            Extent::Finite(len) | Extent::Unbound(len) => len,
        };
        let in_bounds = |pos: i128| pos >= 0 && pos < i128::from(len);
        match self.len() {
            None => false,
            Some(0) => true,
            Some(n) => {
                let start = i128::from(self.start);
                let last = start + (i128::from(n) - 1) * i128::from(self.step);
                in_bounds(start) && in_bounds(last)
            }
        }
    }
}

/// The length of a view whose positions are all addressable as `i64`.
pub(crate) fn addressable(len: u64) -> Result<i64, IndicesError> {
    i64::try_from(len).map_err(|_| IndicesError::InvalidRange {
        reason: format!("{len} positions cannot be addressed by i64"),
    })
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stop {
            None => write!(f, "{}::{}", self.start, self.step),
            Some(stop) => write!(f, "{}:{}:{}", self.start, stop, self.step),
        }
    }
}

impl From<std::ops::Range<i64>> for Range {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self {
            start: r.start,
            stop: Some(r.end),
            step: 1,
        }
    }
}

impl From<std::ops::RangeFrom<i64>> for Range {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Self {
            start: r.start,
            stop: None,
            step: 1,
        }
    }
}

impl From<std::ops::RangeTo<i64>> for Range {
    fn from(r: std::ops::RangeTo<i64>) -> Self {
        Self {
            start: 0,
            stop: Some(r.end),
            step: 1,
        }
    }
}

/// An unresolved slice `start:stop:step`, expressed in the local index
/// space of the view it is applied to. Absent bounds take their usual
/// defaults, and negative bounds count from the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// The full slice `::`.
    pub fn full() -> Self {
        Self::default()
    }

    /// This slice with its step replaced.
    pub fn step_by(self, step: i64) -> Self {
        Self {
            step: Some(step),
            ..self
        }
    }

    /// Resolves this slice into concrete local positions for a view of
    /// the given extent.
    ///
    /// Finite extents follow the usual clamping rules. Without a known
    /// length only ascending slices with non-negative bounds can be
    /// resolved; anything counting from the end fails with
    /// [`IndicesError::InfiniteRange`].
    pub(crate) fn resolve(&self, extent: Extent) -> Result<Range, IndicesError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(IndicesError::InvalidRange {
                reason: "slice step cannot be zero".to_string(),
            });
        }

        let len = match extent {
            Extent::Finite(len) => len,
            Extent::Infinite | Extent::Unbound(_) => {
                let from_end = step < 0
                    || self.start.is_some_and(|start| start < 0)
                    || self.stop.is_some_and(|stop| stop < 0);
                if from_end {
                    return Err(IndicesError::InfiniteRange {
                        op: "resolve a reversed or end-relative slice",
                    });
                }
                match extent {
                    Extent::Unbound(len) => len,
                    _ => {
                        return Ok(Range {
                            start: self.start.unwrap_or(0),
                            stop: self.stop,
                            step,
                        });
                    }
                }
            }
        };

        let len = addressable(len)?;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: i64| {
            if bound < 0 {
                bound.saturating_add(len).max(lower)
            } else {
                bound.min(upper)
            }
        };
        let start = self
            .start
            .map_or(if step > 0 { lower } else { upper }, clamp);
        let stop = self.stop.map_or(if step > 0 { upper } else { lower }, clamp);
        Ok(Range {
            start,
            stop: Some(stop),
            step,
        })
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<i64>| b.map(|b| b.to_string()).unwrap_or_default();
        write!(f, "{}:{}", bound(self.start), bound(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

impl From<std::ops::Range<i64>> for Slice {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::new(Some(r.start), Some(r.end), None)
    }
}

impl From<std::ops::RangeFrom<i64>> for Slice {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Self::new(Some(r.start), None, None)
    }
}

impl From<std::ops::RangeTo<i64>> for Slice {
    fn from(r: std::ops::RangeTo<i64>) -> Self {
        Self::new(None, Some(r.end), None)
    }
}

impl From<std::ops::RangeFull> for Slice {
    fn from(_: std::ops::RangeFull) -> Self {
        Self::full()
    }
}

impl From<Range> for Slice {
    fn from(r: Range) -> Self {
        Self::new(Some(r.start), r.stop, Some(r.step))
    }
}
