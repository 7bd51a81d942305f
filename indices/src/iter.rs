use std::iter::FusedIterator;

use crate::Indices;
use crate::IndicesError;
use crate::range::Extent;
use crate::range::Range;
use crate::view::out_of_range;

/// A pull-based iterator over the elements of a view.
///
/// Elements are resolved one at a time as they are requested; an
/// unbounded view yields forever, until the caller stops pulling.
/// Resolution failures (e.g. a selected position outside its parent)
/// are yielded once, after which the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Iter {
    view: Indices,
    // Set when the whole chain reduces to a single range; elements are
    // then computed directly instead of walking the chain.
    affine: Option<Range>,
    next: u64,
    end: Option<u64>,
    failed: bool,
}

impl Iter {
    pub(crate) fn new(view: Indices) -> Self {
        let end = match view.extent() {
            Extent::Finite(len) | Extent::Unbound(len) => Some(len),
            Extent::Infinite => None,
        };
        let affine = view.affine();
        Self {
            view,
            affine,
            next: 0,
            end,
            failed: false,
        }
    }

    fn remaining(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.next))
    }
}

impl Iterator for Iter {
    type Item = Result<i64, IndicesError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining() == Some(0) {
            return None;
        }
        let pos = self.next;
        self.next += 1;
        let item = match &self.affine {
            Some(range) => range
                .get(pos)
                .ok_or_else(|| out_of_range(pos, range.len().unwrap_or(u64::MAX))),
            None => self.view.resolve(pos),
        };
        self.failed = item.is_err();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        match self.remaining() {
            Some(remaining) => {
                let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
                (0, Some(remaining))
            }
            None => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Iter {}

#[cfg(test)]
mod tests {
    use crate::Indices;
    use crate::IndicesError;
    use crate::Slice;

    #[test]
    fn test_affine_and_walked_agree() {
        let base = Indices::range(3, Some(300), 7).unwrap();
        let walked = base.select(0..base.length().unwrap() as i64);
        assert!(walked.affine().is_none());
        assert_eq!(walked.to_vec().unwrap(), base.to_vec().unwrap());

        let reversed = base.reverse().unwrap();
        assert!(reversed.affine().is_some());
        let mut expected = base.to_vec().unwrap();
        expected.reverse();
        assert_eq!(reversed.to_vec().unwrap(), expected);
    }

    #[test]
    fn test_size_hint() {
        let view = Indices::until(5);
        let mut iter = view.iter();
        assert_eq!(iter.size_hint(), (0, Some(5)));
        iter.next();
        assert_eq!(iter.size_hint(), (0, Some(4)));
        assert_eq!(Indices::new().iter().size_hint(), (usize::MAX, None));
    }

    #[test]
    fn test_fused_after_error() {
        let view = Indices::until(3).select([0, 7, 1]);
        let mut iter = view.iter();
        assert_eq!(iter.next(), Some(Ok(0)));
        assert!(matches!(iter.next(), Some(Err(IndicesError::OutOfRange { .. }))));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_restartable() {
        let view = Indices::new()
            .indices(Slice::full().step_by(3))
            .unwrap()
            .select([2, 4]);
        let first: Vec<_> = view.iter().collect();
        let second: Vec<_> = view.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![Ok(6), Ok(12)]);
    }

    #[test]
    fn test_for_loop() {
        let mut sum = 0;
        for x in &Indices::until(5) {
            sum += x.unwrap();
        }
        assert_eq!(sum, 10);
    }
}
