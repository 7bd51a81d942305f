use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use itertools::EitherOrBoth;
use itertools::Itertools;

use crate::iter::Iter;
use crate::range::Extent;
use crate::range::addressable;
use crate::range::Range;
use crate::range::Slice;
use crate::subscript::Subscript;
use crate::subscript::Subscripted;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndicesError {
    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("invalid operand `{operand}`")]
    InvalidOperand { operand: String },

    #[error("index out of range: {index} for length {len}")]
    OutOfRange { index: i64, len: u64 },

    #[error("cannot {op} of an infinite range")]
    InfiniteRange { op: &'static str },

    #[error("no reference range found to resolve positions against")]
    NoRangeFound,

    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },
}

pub(crate) fn out_of_range(pos: u64, len: u64) -> IndicesError {
    IndicesError::OutOfRange {
        index: i64::try_from(pos).unwrap_or(i64::MAX),
        len,
    }
}

/// A node in the view tree. Derived nodes hold a handle to their
/// parent; ancestors are shared, never copied.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// An arithmetic progression.
    Base(Range),

    /// The parent's positions selected by `range`, which is already
    /// resolved against the parent's extent.
    Slice { parent: Indices, range: Range },

    /// The parent's elements at `positions`, in order. A selection
    /// without a parent is rootless.
    Select {
        parent: Option<Indices>,
        positions: Vec<i64>,
    },

    /// The parent's elements in reverse. The parent is finite, with
    /// `len` elements.
    Reversed { parent: Indices, len: u64 },
}

/// An immutable, lazily resolved view over a sequence of integers.
///
/// A view is either a base [`Range`] or a transform (slice, selection,
/// reversal) of a parent view. Deriving a view never touches the
/// parent, and resolving an element walks the chain of parents.
///
/// ```
/// use indices::Indices;
/// use indices::Slice;
///
/// let view = Indices::new()
///     .indices(Slice::new(None, Some(5000), Some(10)))
///     .unwrap()
///     .select([10, 20, 40, 50, 80, 120, 150])
///     .select([1, 3, 5, 7])
///     .indices(..2)
///     .unwrap();
/// assert_eq!(view.to_vec().unwrap(), vec![200, 500]);
/// ```
#[derive(Debug, Clone)]
pub struct Indices {
    node: Arc<Node>,
}

// Compile-time check: views are shared freely across threads.
fn _assert_indices_traits()
where
    Indices: Send + Sync + 'static,
{
}

impl Indices {
    /// The natural numbers `0, 1, 2, ...`.
    pub fn new() -> Self {
        Self::from(Range::naturals())
    }

    /// The integers `0..stop`.
    pub fn until(stop: i64) -> Self {
        Self::from(0..stop)
    }

    /// The progression `start, start + step, ...` bounded by `stop`
    /// when present.
    pub fn range(start: i64, stop: Option<i64>, step: i64) -> Result<Self, IndicesError> {
        Ok(Self::from(Range::new(start, stop, step)?))
    }

    /// A rootless selection: `positions` with no range to select them
    /// from yet. See [`Indices::bind`].
    pub fn from_positions(positions: impl IntoIterator<Item = i64>) -> Self {
        Self::from_node(Node::Select {
            parent: None,
            positions: positions.into_iter().collect(),
        })
    }

    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    /// The equivalent `(start, stop, step)` triple, when this view is a
    /// plain range.
    pub fn slice(&self) -> Option<Range> {
        match self.node() {
            Node::Base(range) => Some(*range),
            _ => None,
        }
    }

    /// The view this one was derived from.
    pub fn reference(&self) -> Option<&Indices> {
        match self.node() {
            Node::Base(_) => None,
            Node::Slice { parent, .. } | Node::Reversed { parent, .. } => Some(parent),
            Node::Select { parent, .. } => parent.as_ref(),
        }
    }

    /// A structurally identical view with its own top-level node.
    pub fn copy(&self) -> Self {
        Self::from_node(self.node().clone())
    }

    /// Whether `self` and `other` are the very same node.
    pub fn same_node(&self, other: &Indices) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub(crate) fn extent(&self) -> Extent {
        match self.node() {
            Node::Base(range) => range.len().map_or(Extent::Infinite, Extent::Finite),
            Node::Slice { parent, range } => match (parent.extent(), range.len()) {
                (Extent::Unbound(_), Some(len)) => Extent::Unbound(len),
                (_, Some(len)) => Extent::Finite(len),
                (extent, None) => extent,
            },
            Node::Select {
                parent: Some(parent),
                positions,
            } => match parent.extent() {
                Extent::Unbound(_) => Extent::Unbound(positions.len() as u64),
                _ => Extent::Finite(positions.len() as u64),
            },
            Node::Select {
                parent: None,
                positions,
            } => Extent::Unbound(positions.len() as u64),
            Node::Reversed { len, .. } => Extent::Finite(*len),
        }
    }

    /// Whether the view has a known, finite number of elements.
    pub fn is_finite(&self) -> bool {
        matches!(self.extent(), Extent::Finite(_))
    }

    /// The number of elements in the view.
    pub fn length(&self) -> Result<u64, IndicesError> {
        match self.extent() {
            Extent::Finite(len) => Ok(len),
            Extent::Infinite => Err(IndicesError::InfiniteRange {
                op: "compute length",
            }),
            Extent::Unbound(_) => Err(IndicesError::NoRangeFound),
        }
    }

    /// Resolves the element at `index`. Negative indices count from the
    /// end, and so require a finite view.
    pub fn get(&self, index: i64) -> Result<i64, IndicesError> {
        if index >= 0 {
            return self.resolve(index as u64);
        }
        let len = match self.extent() {
            Extent::Finite(len) => len,
            Extent::Infinite => {
                return Err(IndicesError::InfiniteRange {
                    op: "resolve a negative index",
                });
            }
            Extent::Unbound(_) => return Err(IndicesError::NoRangeFound),
        };
        let pos = u64::try_from(i128::from(index) + i128::from(len))
            .map_err(|_| IndicesError::OutOfRange { index, len })?;
        self.resolve(pos)
    }

    /// Resolves position `pos` by mapping it through each node down to
    /// the base.
    pub(crate) fn resolve(&self, pos: u64) -> Result<i64, IndicesError> {
        match self.node() {
            Node::Base(range) => range
                .get(pos)
                .ok_or_else(|| out_of_range(pos, range.len().unwrap_or(u64::MAX))),
            Node::Slice { parent, range } => {
                let len = range.len().unwrap_or(u64::MAX);
                let local = range.get(pos).ok_or_else(|| out_of_range(pos, len))?;
                let local = u64::try_from(local).map_err(|_| out_of_range(pos, len))?;
                parent.resolve(local)
            }
            Node::Select { parent, positions } => {
                let position = usize::try_from(pos)
                    .ok()
                    .and_then(|pos| positions.get(pos))
                    .ok_or_else(|| out_of_range(pos, positions.len() as u64))?;
                match parent {
                    Some(parent) => parent.get(*position),
                    None => Err(IndicesError::NoRangeFound),
                }
            }
            Node::Reversed { parent, len } => {
                if pos >= *len {
                    return Err(out_of_range(pos, *len));
                }
                parent.resolve(*len - 1 - pos)
            }
        }
    }

    /// The equivalent range, for chains made only of slices and
    /// reversals over a base.
    pub(crate) fn affine(&self) -> Option<Range> {
        match self.node() {
            Node::Base(range) => Some(*range),
            Node::Slice { parent, range } => parent.affine()?.compose(range),
            Node::Reversed { parent, .. } => parent.affine()?.reversed(),
            Node::Select { .. } => None,
        }
    }

    /// Membership test. Chains of slices and reversals over a base are
    /// checked in O(1); anything involving a selection scans its
    /// elements.
    pub fn contains(&self, value: i64) -> Result<bool, IndicesError> {
        if let Node::Reversed { parent, .. } = self.node() {
            return parent.contains(value);
        }
        if let Some(range) = self.affine() {
            return Ok(range.contains(value));
        }
        itertools::process_results(self.iter(), |mut iter| iter.any(|x| x == value))
    }

    /// A lazy iterator over the resolved elements. Each call starts a
    /// fresh traversal.
    pub fn iter(&self) -> Iter {
        Iter::new(self.clone())
    }

    /// Resolves every element.
    pub fn to_vec(&self) -> Result<Vec<i64>, IndicesError> {
        if self.extent() == Extent::Infinite {
            return Err(IndicesError::InfiniteRange {
                op: "materialize the elements",
            });
        }
        self.iter().collect()
    }

    /// Derives the view selected by `slice`, in this view's local index
    /// space.
    pub fn indices(&self, slice: impl Into<Slice>) -> Result<Indices, IndicesError> {
        let local = slice.into().resolve(self.extent())?;
        Ok(self.derive_range(local))
    }

    /// Derives a view of the local positions in `local`. A slice of a
    /// base collapses into a new base instead of growing the chain.
    pub(crate) fn derive_range(&self, local: Range) -> Indices {
        if let Node::Base(base) = self.node() {
            match base.compose(&local) {
                Some(composed) => {
                    tracing::trace!(%base, %local, %composed, "collapsed slice onto base range");
                    return Indices::from(composed);
                }
                None => tracing::debug!(%base, %local, "slice of base range exceeds i64"),
            }
        }
        Indices::from_node(Node::Slice {
            parent: self.clone(),
            range: local,
        })
    }

    /// Derives the view of this view's elements at `positions`, in the
    /// given order. Positions are checked only when resolved.
    pub fn select(&self, positions: impl IntoIterator<Item = i64>) -> Indices {
        Indices::from_node(Node::Select {
            parent: Some(self.clone()),
            positions: positions.into_iter().collect(),
        })
    }

    /// Derives the view of this view's elements in reverse order.
    pub fn reverse(&self) -> Result<Indices, IndicesError> {
        match self.extent() {
            Extent::Finite(len) => {
                addressable(len)?;
                Ok(Indices::from_node(Node::Reversed {
                    parent: self.clone(),
                    len,
                }))
            }
            _ => Err(IndicesError::InfiniteRange {
                op: "compute the reversal",
            }),
        }
    }

    /// Subscripts the view: an index resolves to an element, a slice or
    /// a list of positions derives a new view.
    pub fn subscript(&self, subscript: impl Into<Subscript>) -> Result<Subscripted, IndicesError> {
        match subscript.into() {
            Subscript::Index(index) => self.get(index).map(Subscripted::Value),
            Subscript::Slice(slice) => self.indices(slice).map(Subscripted::View),
            Subscript::Positions(positions) => Ok(Subscripted::View(self.select(positions))),
        }
    }

    /// Rebuilds a chain rooted at a rootless selection so that the
    /// selection resolves against `reference`.
    pub fn bind(&self, reference: &Indices) -> Result<Indices, IndicesError> {
        match self.node() {
            Node::Base(_) => Err(IndicesError::InvalidOperand {
                operand: format!("{self} is already bound to a reference range"),
            }),
            Node::Select {
                parent: None,
                positions,
            } => Ok(Indices::from_node(Node::Select {
                parent: Some(reference.clone()),
                positions: positions.clone(),
            })),
            Node::Select {
                parent: Some(parent),
                positions,
            } => Ok(parent.bind(reference)?.select(positions.iter().copied())),
            Node::Slice { parent, range } => Ok(parent.bind(reference)?.derive_range(*range)),
            Node::Reversed { parent, .. } => parent.bind(reference)?.reverse(),
        }
    }

    /// Orders two views by length alone. Unbounded views are longer than
    /// any finite view and equal to each other.
    pub fn cmp_len(&self, other: &Indices) -> Result<Ordering, IndicesError> {
        match (self.extent(), other.extent()) {
            (Extent::Finite(lhs), Extent::Finite(rhs)) => Ok(lhs.cmp(&rhs)),
            (Extent::Infinite, Extent::Infinite) => Ok(Ordering::Equal),
            (Extent::Infinite, Extent::Finite(_)) => Ok(Ordering::Greater),
            (Extent::Finite(_), Extent::Infinite) => Ok(Ordering::Less),
            _ => Err(IndicesError::NoRangeFound),
        }
    }
}

/// Compares two views for structural equality: the same node shapes
/// with the same parameters, all the way down the chain.
pub fn structurally_equal(a: &Indices, b: &Indices) -> bool {
    if a.same_node(b) {
        return true;
    }
    match (a.node(), b.node()) {
        (Node::Base(x), Node::Base(y)) => x == y,
        (
            Node::Slice {
                parent: p1,
                range: r1,
            },
            Node::Slice {
                parent: p2,
                range: r2,
            },
        ) => r1 == r2 && structurally_equal(p1, p2),
        (
            Node::Select {
                parent: p1,
                positions: x,
            },
            Node::Select {
                parent: p2,
                positions: y,
            },
        ) => {
            x == y
                && match (p1, p2) {
                    (Some(p1), Some(p2)) => structurally_equal(p1, p2),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Node::Reversed { parent: p1, .. }, Node::Reversed { parent: p2, .. }) => {
            structurally_equal(p1, p2)
        }
        _ => false,
    }
}

impl Default for Indices {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Range> for Indices {
    fn from(range: Range) -> Self {
        Self::from_node(Node::Base(range))
    }
}

impl From<std::ops::Range<i64>> for Indices {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::from(Range::from(r))
    }
}

impl From<std::ops::RangeFrom<i64>> for Indices {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Self::from(Range::from(r))
    }
}

impl From<std::ops::RangeTo<i64>> for Indices {
    fn from(r: std::ops::RangeTo<i64>) -> Self {
        Self::from(Range::from(r))
    }
}

/// A slice taken as a whole range: absent start and step default to 0
/// and 1, an absent stop leaves the range unbounded.
impl TryFrom<Slice> for Indices {
    type Error = IndicesError;

    fn try_from(slice: Slice) -> Result<Self, Self::Error> {
        Self::range(
            slice.start.unwrap_or(0),
            slice.stop,
            slice.step.unwrap_or(1),
        )
    }
}

impl IntoIterator for &Indices {
    type Item = Result<i64, IndicesError>;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Finite views compare by their elements; anything else falls back to
/// [`structurally_equal`].
impl PartialEq for Indices {
    fn eq(&self, other: &Self) -> bool {
        if self.same_node(other) {
            return true;
        }
        match (self.extent(), other.extent()) {
            (Extent::Finite(lhs), Extent::Finite(rhs)) if lhs != rhs => false,
            (Extent::Finite(_), Extent::Finite(_)) => {
                if let (Some(lhs), Some(rhs)) = (self.affine(), other.affine()) {
                    return lhs.same_elements(&rhs);
                }
                for pair in self.iter().zip_longest(other.iter()) {
                    match pair {
                        EitherOrBoth::Both(Ok(x), Ok(y)) if x == y => {}
                        EitherOrBoth::Both(Ok(_), Ok(_)) => return false,
                        EitherOrBoth::Both(..) => return structurally_equal(self, other),
                        EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => return false,
                    }
                }
                true
            }
            _ => structurally_equal(self, other),
        }
    }
}

/// Views are ordered by length alone, whatever their elements; all
/// unbounded views have the same length. Rootless selections are not
/// comparable. `Equal` here does not imply `==`.
impl PartialOrd for Indices {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.cmp_len(other).ok()
    }
}

impl fmt::Display for Indices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Base(range) => {
                write!(f, "Indices(start={}", range.start())?;
                if let Some(stop) = range.stop() {
                    write!(f, ", stop={stop}")?;
                }
                write!(f, ", step={})", range.step())
            }
            Node::Slice { parent, range } => write!(f, "Indices(slice={range}, ref={parent})"),
            Node::Select { parent, positions } => {
                write!(f, "Indices(values=[{}]", positions.iter().join(", "))?;
                if let Some(parent) = parent {
                    write!(f, ", ref={parent}")?;
                }
                write!(f, ")")
            }
            Node::Reversed { parent, .. } => write!(f, "Indices(reversed, ref={parent})"),
        }
    }
}
