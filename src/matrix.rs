//! The matrix header and the transpose partnership.
//!
//! A [`Matrix`] is a handle to a header holding the shape, the index order and
//! a [`Storage`] buffer. Reading the transpose of a matrix builds, once, a
//! second header over the same buffer with the shape and index order swapped.
//! The two headers stay linked: asking either one for its transpose returns
//! the other.
//!
//! Ownership of the link is one-directional so that the pair never forms a
//! reference cycle: a transpose view keeps its origin alive, the origin only
//! holds a weak link back to the view. The shared buffer is freed when the
//! last header holding it is dropped.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::Result;
use crate::storage::{IndexOrder, Storage};

/// A dense, rectangular matrix of `f64` values.
///
/// Cloning a `Matrix` clones the handle: both clones name the same matrix,
/// just like two references to one host object. Use [`Matrix::copy_of`] for a
/// deep copy.
pub struct Matrix {
    header: Rc<RefCell<Header>>,
}

pub(crate) struct Header {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) order: IndexOrder,
    pub(crate) storage: Storage,
    partner: Option<Partner>,
    pub(crate) cache: Cache,
}

enum Partner {
    /// This header is a transpose view of the held origin.
    Origin(Matrix),
    /// This header's transpose view, if it is still alive.
    View(Weak<RefCell<Header>>),
}

/// Memoized projections of the logical elements.
#[derive(Default)]
pub(crate) struct Cache {
    pub(crate) snapshot: Option<Rc<[f64]>>,
    pub(crate) debug: Option<Rc<str>>,
    pub(crate) display: Option<Rc<str>>,
}

impl Cache {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Header {
    pub(crate) const fn size(&self) -> usize {
        self.rows * self.cols
    }

    // offsets of logical position i, reading row-major or column-major
    pub(crate) const fn row_offset(&self, i: usize) -> usize {
        self.order.offset(self.rows, self.cols, i)
    }

    pub(crate) const fn col_offset(&self, i: usize) -> usize {
        self.order.flipped().offset(self.cols, self.rows, i)
    }

    pub(crate) fn at(&self, i: usize) -> f64 {
        self.storage.as_slice()[self.row_offset(i)]
    }

    pub(crate) fn logical(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.size()).map(|i| self.at(i))
    }
}

impl Matrix {
    /// Wraps a populated, row-major buffer of `rows * cols` elements.
    pub(crate) fn from_storage(rows: usize, cols: usize, storage: Storage) -> Self {
        debug_assert_eq!(rows * cols, storage.len(), "storage does not match dimensions");
        Self::from_header(Header {
            rows,
            cols,
            order: IndexOrder::RowMajor,
            storage,
            partner: None,
            cache: Cache::default(),
        })
    }

    fn from_header(header: Header) -> Self {
        Self {
            header: Rc::new(RefCell::new(header)),
        }
    }

    pub(crate) fn header(&self) -> Ref<'_, Header> {
        self.header.borrow()
    }

    pub(crate) fn header_mut(&self) -> RefMut<'_, Header> {
        self.header.borrow_mut()
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.header().rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.header().cols
    }

    /// Number of elements, always `rows * cols`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.header().size()
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        let header = self.header();
        (header.rows, header.cols)
    }

    /// Snapshot of the elements in row-major logical order.
    ///
    /// The snapshot is computed on first access and cached until the buffer
    /// changes.
    #[must_use]
    pub fn data(&self) -> Rc<[f64]> {
        if let Some(snapshot) = &self.header().cache.snapshot {
            return Rc::clone(snapshot);
        }
        let snapshot: Rc<[f64]> = self.header().logical().collect();
        self.header_mut().cache.snapshot = Some(Rc::clone(&snapshot));
        snapshot
    }

    /// The element at `(row, col)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let header = self.header();
        (row < header.rows && col < header.cols).then(|| header.at(row * header.cols + col))
    }

    /// Copies the elements out as one vector per row.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        let header = self.header();
        let mut rows = Vec::with_capacity(header.rows);
        for i in 0..header.rows {
            let row = (0..header.cols)
                .map(|j| header.at(i * header.cols + j))
                .collect();
            rows.push(row);
        }
        rows
    }

    /// The transpose of this matrix, sharing its buffer.
    ///
    /// The first call builds the view; later calls on either partner return
    /// the existing one, so `m.transpose().transpose()` is `m` itself.
    #[must_use]
    pub fn transpose(&self) -> Matrix {
        if let Some(partner) = self.partner() {
            return partner;
        }
        let mut header = self.header_mut();
        let view = Self::from_header(Header {
            rows: header.cols,
            cols: header.rows,
            order: header.order.flipped(),
            storage: header.storage.clone(),
            partner: Some(Partner::Origin(self.clone())),
            cache: Cache::default(),
        });
        header.partner = Some(Partner::View(Rc::downgrade(&view.header)));
        debug!(rows = header.rows, cols = header.cols, "created transpose view");
        view
    }

    /// Returns true if this matrix is a transpose view of another matrix.
    #[must_use]
    pub fn is_transpose_view(&self) -> bool {
        matches!(self.header().partner, Some(Partner::Origin(_)))
    }

    /// Returns true if this matrix currently has a live transpose partner.
    #[must_use]
    pub fn has_partner(&self) -> bool {
        self.partner().is_some()
    }

    /// Returns true if both matrices read the same physical buffer.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Matrix) -> bool {
        self.header().storage.aliases(&other.header().storage)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Matrix) -> bool {
        Rc::ptr_eq(&self.header, &other.header)
    }

    fn partner(&self) -> Option<Matrix> {
        match &self.header().partner {
            Some(Partner::Origin(origin)) => Some(origin.clone()),
            Some(Partner::View(view)) => view.upgrade().map(|header| Matrix { header }),
            None => None,
        }
    }

    /// Severs the transpose partnership, giving this matrix a private
    /// row-major copy of its logical elements.
    ///
    /// The partner keeps the old buffer and its view of the data. If the copy
    /// cannot be allocated, nothing is changed.
    pub(crate) fn detach_with_copy(&self) -> Result<()> {
        let Some(partner) = self.partner() else {
            // a dead weak link needs no copy, the buffer is ours alone
            let stale = self.header_mut().partner.take();
            drop(stale);
            return Ok(());
        };
        let copy = {
            let header = self.header();
            Storage::from_fn(header.size(), |i| header.at(i))?
        };
        let partner_link = partner.header_mut().partner.take();
        let own_link = {
            let mut header = self.header_mut();
            header.storage = copy;
            header.order = IndexOrder::RowMajor;
            header.cache.clear();
            header.partner.take()
        };
        debug!(
            rows = partner.cols(),
            cols = partner.rows(),
            "detached matrix from its transpose partner"
        );
        // dropping a link may drop the last handle to a header, so do it
        // with no borrows outstanding
        drop(partner_link);
        drop(own_link);
        Ok(())
    }

    pub(crate) fn cached_string(
        &self,
        slot: fn(&mut Cache) -> &mut Option<Rc<str>>,
        render: impl FnOnce(&Header) -> String,
    ) -> Rc<str> {
        if let Some(cached) = slot(&mut self.header_mut().cache) {
            return Rc::clone(cached);
        }
        let rendered: Rc<str> = render(&self.header()).into();
        *slot(&mut self.header_mut().cache) = Some(Rc::clone(&rendered));
        rendered
    }
}

impl Clone for Matrix {
    fn clone(&self) -> Self {
        Self {
            header: Rc::clone(&self.header),
        }
    }
}

/// Element-wise equality; matrices of different shapes are never equal.
impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        let lhs = self.header();
        let rhs = other.header();
        lhs.rows == rhs.rows && lhs.cols == rhs.cols && lhs.logical().eq(rhs.logical())
    }
}
