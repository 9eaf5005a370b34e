//! Element storage and the logical-to-physical index translation.
//!
//! A [`Storage`] is a reference-counted flat `f64` buffer. Two matrix headers
//! may hold the same buffer (a matrix and its transpose view); the buffer is
//! freed exactly once, when the last holder goes away.
//!
//! An [`IndexOrder`] maps a logical, row-major position of a view onto an
//! offset in the physical buffer. Swapping the order is all it takes to read
//! the same buffer as its transpose.

use std::rc::Rc;

use tracing::trace;

use crate::error::{Error, Result};

/// How a view's logical positions map onto its physical buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrder {
    /// The buffer is laid out in the view's own row-major order.
    RowMajor,
    /// The buffer is laid out in row-major order of the transposed shape.
    ColumnMajor,
}

impl IndexOrder {
    /// The order a transpose view of this order reads with.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::RowMajor => Self::ColumnMajor,
            Self::ColumnMajor => Self::RowMajor,
        }
    }

    /// Physical offset of logical position `i` in a view of shape `(rows, cols)`.
    #[must_use]
    pub const fn offset(self, rows: usize, cols: usize, i: usize) -> usize {
        match self {
            Self::RowMajor => i,
            Self::ColumnMajor => (i % cols) * rows + i / cols,
        }
    }
}

#[cfg(test)]
thread_local! {
    // caps alloc_buffer in tests so allocation failure can be forced
    pub(crate) static ALLOC_LIMIT: std::cell::Cell<usize> = const { std::cell::Cell::new(usize::MAX) };
}

/// Allocates an empty buffer able to hold `len` elements without reallocating.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<f64>> {
    #[cfg(test)]
    if len > ALLOC_LIMIT.with(std::cell::Cell::get) {
        return Err(Error::Allocation { elements: len });
    }
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation { elements: len })?;
    trace!(elements = len, "allocated matrix buffer");
    Ok(buffer)
}

/// A shared flat buffer of matrix elements.
///
/// Cloning a `Storage` aliases the buffer, it never copies it.
#[derive(Debug, Clone)]
pub struct Storage {
    buffer: Rc<Vec<f64>>,
}

impl Storage {
    #[must_use]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            buffer: Rc::new(data),
        }
    }

    /// Allocates `len` elements all equal to `value`.
    pub fn filled(len: usize, value: f64) -> Result<Self> {
        let mut data = alloc_buffer(len)?;
        data.resize(len, value);
        Ok(Self::from_vec(data))
    }

    /// Allocates `len` elements, the `i`th set to `f(i)`.
    pub fn from_fn(len: usize, f: impl FnMut(usize) -> f64) -> Result<Self> {
        let mut data = alloc_buffer(len)?;
        data.extend((0..len).map(f));
        Ok(Self::from_vec(data))
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.buffer
    }

    /// Returns true if `self` and `other` are the same physical buffer.
    #[must_use]
    pub fn aliases(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Returns true if no other holder shares this buffer.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.buffer) == 1
    }

    /// Mutable access to the physical elements, copying first if the buffer is shared.
    pub fn make_mut(&mut self) -> &mut [f64] {
        Rc::make_mut(&mut self.buffer).as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn row_major_is_identity() {
        for i in 0..12 {
            assert_eq!(IndexOrder::RowMajor.offset(3, 4, i), i);
        }
    }

    #[test]
    fn column_major_reads_the_transposed_buffer() {
        // buffer of a 2x3 matrix [[1,2,3],[4,5,6]], read as its 3x2 transpose
        let buffer = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let logical: Vec<f64> = (0..6)
            .map(|i| buffer[IndexOrder::ColumnMajor.offset(3, 2, i)])
            .collect();
        assert_eq!(logical, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn flipping_twice_is_identity() {
        for order in [IndexOrder::RowMajor, IndexOrder::ColumnMajor] {
            assert_eq!(order.flipped().flipped(), order);
        }
    }

    #[test]
    fn clones_alias_one_buffer() {
        let a = Storage::filled(4, 2.5).unwrap();
        let b = a.clone();
        assert!(a.aliases(&b));
        assert!(!a.is_unique());
        drop(b);
        assert!(a.is_unique());
        assert_eq!(a.as_slice(), &[2.5; 4]);
    }

    #[test]
    fn make_mut_copies_shared_buffer() {
        let a = Storage::from_fn(3, |i| i as f64).unwrap();
        let mut b = a.clone();
        b.make_mut()[0] = 10.0;
        assert!(!a.aliases(&b));
        assert_eq!(a.as_slice(), &[0.0, 1.0, 2.0]);
        assert_eq!(b.as_slice(), &[10.0, 1.0, 2.0]);
    }

    #[test]
    fn oversized_allocation_is_an_error() {
        assert_eq!(
            alloc_buffer(usize::MAX).unwrap_err(),
            Error::Allocation {
                elements: usize::MAX
            }
        );
    }

    proptest! {
        #[test]
        fn prop_column_major_matches_decomposition(
            rows in 1_usize..40,
            cols in 1_usize..40,
            seed in any::<usize>(),
        ) {
            let i = seed % (rows * cols);
            let expected = (i % cols) * rows + (i / cols);
            prop_assert_eq!(IndexOrder::ColumnMajor.offset(rows, cols, i), expected);

            // the signed closed form i*rows + (i/cols)*(1-size) agrees as well
            let (r, c, n) = (rows as i64, cols as i64, (rows * cols) as i64);
            let closed = (i as i64) * r + ((i as i64) / c) * (1 - n);
            prop_assert_eq!(closed, expected as i64);
        }

        #[test]
        fn prop_column_major_is_a_permutation(rows in 1_usize..20, cols in 1_usize..20) {
            let size = rows * cols;
            let mut seen = vec![false; size];
            for i in 0..size {
                let offset = IndexOrder::ColumnMajor.offset(rows, cols, i);
                prop_assert!(offset < size);
                prop_assert!(!seen[offset]);
                seen[offset] = true;
            }
        }
    }
}
