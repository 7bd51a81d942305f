//! Lazy, composable views over sequences of integers.
//!
//! Provides [`Indices`], an immutable view that is either an
//! arithmetic progression (possibly unbounded) or a transform of
//! another view: a slice, an explicit selection of positions, or a
//! reversal. Deriving a view never materializes elements; resolving an
//! element walks the chain of parents. See [`Indices`] for details.
//!
//! Slicing a plain range collapses into a new range rather than
//! growing the chain, so chains only grow through selections,
//! reversals, and slices of derived views.
//!
//! Views round-trip through a nested record format (see [`Record`])
//! that serializes with serde to JSON or any other self-describing
//! format.

#[cfg(test)]
#[macro_use]
mod test_utils;

mod codec;
mod iter;
mod range;
mod subscript;
mod view;

pub use codec::Bounds;
pub use codec::CodecOpts;
pub use codec::Op;
pub use codec::Record;
pub use iter::Iter;
pub use range::Range;
pub use range::Slice;
pub use subscript::Subscript;
pub use subscript::Subscripted;
pub use view::Indices;
pub use view::IndicesError;
pub use view::structurally_equal;
