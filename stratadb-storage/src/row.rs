//! Row store.
//!
//! Tuples are placed in row-major order inside one growable arena whose
//! element stride is the computed row size. Per-attribute byte offsets
//! are computed once from the schema, honoring each attribute's alignment
//! requirement; the stride is rounded up to the widest alignment so rows
//! can be addressed by plain multiplication.
//!
//! Variable-length string attributes occupy an 8-byte slot holding an
//! index into a store-owned string pool, so a row survives arena
//! reallocation without dangling payload addresses. The pooled value is
//! only dropped with the store.
//!
//! Layout of a row for (Int4, Char(11), Int8), naive attribute order:
//!
//! ```text
//! |--------|-----------|-----------|
//! | field  | offset(B) | length(B) |
//! |--------|-----------|-----------|
//! | c0     | 0         | 4         |
//! | c1     | 4         | 11        |
//! | pad    | 15        | 1         |
//! | c2     | 16        | 8         |
//! |--------|-----------|-----------|
//! ```

use crate::buffer::{Growth, RawBuf};
use crate::col::Column;
use crate::error::{Error, Result};
use crate::value::VarStr;
use smallvec::SmallVec;
use std::fmt;
use std::mem;
use std::ptr;
use stratadb_catalog::{AttrType, Relation};

/// Slot index stored in a row for a Varchar attribute.
type VarSlot = u64;

const VAR_SLOT_SIZE: usize = mem::size_of::<VarSlot>();

/// Row-major store over one growable arena.
pub struct RowStore {
    buf: RawBuf,
    /// Byte offset of each attribute within a row, indexed by the
    /// attribute's relation offset.
    offsets: SmallVec<[usize; 16]>,
    /// In-row slot width of each attribute.
    slot_sizes: SmallVec<[usize; 16]>,
    types: SmallVec<[AttrType; 16]>,
    row_size: usize,
    /// Heap pool for Varchar payloads referenced from row slots.
    var_pool: Column<VarStr>,
}

#[inline]
fn slot_layout(attr_type: AttrType, size: usize) -> (usize, usize) {
    match attr_type {
        AttrType::Int | AttrType::Float | AttrType::Double => (size, size),
        AttrType::Char => (size, 1),
        AttrType::Varchar => (VAR_SLOT_SIZE, VAR_SLOT_SIZE),
    }
}

impl RowStore {
    /// Lay out attributes in schema order.
    #[inline]
    pub fn naive(relation: &Relation) -> Self {
        let order: Vec<usize> = (0..relation.len()).collect();
        Self::build(relation, &order, Growth::default())
    }

    /// Lay out attributes by decreasing alignment to minimize padding.
    /// Attribute offsets keep addressing the same logical attribute; only
    /// the physical placement changes.
    pub fn optimized(relation: &Relation) -> Self {
        let mut order: Vec<usize> = (0..relation.len()).collect();
        // stable: equal alignments keep schema order
        order.sort_by_key(|&i| {
            let attr = &relation[i];
            let (_, align) = slot_layout(attr.attr_type, attr.size);
            std::cmp::Reverse(align)
        });
        Self::build(relation, &order, Growth::default())
    }

    /// Lay out attributes in an explicit physical order, given as a
    /// permutation of the attribute offsets.
    pub fn with_order(relation: &Relation, order: &[usize]) -> Result<Self> {
        if order.len() != relation.len() {
            return Err(Error::InvalidArgument);
        }
        let mut seen = vec![false; order.len()];
        for &i in order {
            if i >= order.len() || seen[i] {
                return Err(Error::InvalidArgument);
            }
            seen[i] = true;
        }
        Ok(Self::build(relation, order, Growth::default()))
    }

    fn build(relation: &Relation, order: &[usize], growth: Growth) -> Self {
        let n = relation.len();
        let mut offsets: SmallVec<[usize; 16]> = smallvec::smallvec![0; n];
        let mut slot_sizes: SmallVec<[usize; 16]> = smallvec::smallvec![0; n];
        let mut types: SmallVec<[AttrType; 16]> = SmallVec::with_capacity(n);
        for attr in relation {
            types.push(attr.attr_type);
        }

        let mut row_size = 0usize;
        let mut max_align = 1usize;
        for &attr_offset in order {
            let attr = &relation[attr_offset];
            let (size, align) = slot_layout(attr.attr_type, attr.size);
            max_align = max_align.max(align);
            if row_size % align != 0 {
                row_size += align - row_size % align;
            }
            offsets[attr_offset] = row_size;
            slot_sizes[attr_offset] = size;
            row_size += size;
        }
        if row_size % max_align != 0 {
            row_size += max_align - row_size % max_align;
        }

        RowStore {
            buf: RawBuf::with_growth(row_size, max_align, growth),
            offsets,
            slot_sizes,
            types,
            row_size,
            var_pool: Column::new(),
        }
    }

    /// Number of used rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of allocated rows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.buf.len() * self.row_size + self.var_pool_bytes()
    }

    #[inline]
    pub fn capacity_in_bytes(&self) -> usize {
        self.buf.capacity() * self.row_size + self.var_pool_bytes()
    }

    #[inline]
    fn var_pool_bytes(&self) -> usize {
        self.var_pool.iter().map(|s| s.payload_len()).sum()
    }

    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Byte offset of an attribute within a row.
    #[inline]
    pub fn attr_offset(&self, attr: usize) -> usize {
        self.offsets[attr]
    }

    /// Raise capacity to at least `new_cap` rows.
    #[inline]
    pub fn reserve(&mut self, new_cap: usize) -> Result<()> {
        self.buf.reserve(new_cap)
    }

    /// Append `n_rows` zero-initialized rows, growing the arena when
    /// needed, and return the index of the first fresh row. Growth
    /// invalidates raw addresses into the arena; row indices stay valid.
    pub fn append(&mut self, n_rows: usize) -> Result<usize> {
        if n_rows == 0 {
            return Ok(self.buf.len());
        }
        self.buf.grow_for(n_rows)?;
        let first = self.buf.len();
        unsafe {
            ptr::write_bytes(self.buf.elem_ptr(first), 0, n_rows * self.row_size);
            self.buf.set_len(first + n_rows);
        }
        Ok(first)
    }

    /// Read-only view of the row at `idx`.
    #[inline]
    pub fn row(&self, idx: usize) -> RowRef<'_> {
        debug_assert!(idx < self.len(), "row index out of bound");
        RowRef { store: self, idx }
    }

    /// Mutable view of the row at `idx`.
    #[inline]
    pub fn row_mut(&mut self, idx: usize) -> RowMut<'_> {
        debug_assert!(idx < self.len(), "row index out of bound");
        RowMut { store: self, idx }
    }

    /// Iterate rows in order; reversible.
    #[inline]
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = RowRef<'_>> {
        (0..self.len()).map(move |idx| RowRef { store: self, idx })
    }

    #[inline]
    fn field_ptr(&self, idx: usize, attr: usize) -> *mut u8 {
        debug_assert!(attr < self.offsets.len(), "attribute out of bound");
        unsafe { self.buf.elem_ptr(idx).add(self.offsets[attr]) }
    }
}

impl fmt::Display for RowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RowStore ({}/{} rows, {}B, {} attributes, offsets: [",
            self.len(),
            self.capacity(),
            self.row_size,
            self.num_attributes()
        )?;
        for (i, off) in self.offsets.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", off)?;
        }
        write!(f, "])")
    }
}

/// Read-only view of one row.
#[derive(Clone, Copy)]
pub struct RowRef<'a> {
    store: &'a RowStore,
    idx: usize,
}

impl<'a> RowRef<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.idx
    }

    /// Read a fixed-size scalar field.
    ///
    /// Caller must name the type the attribute was declared with; the
    /// read is unchecked in release builds.
    #[inline]
    pub fn get<T: Copy + 'static>(&self, attr: usize) -> T {
        debug_assert_eq!(mem::size_of::<T>(), self.store.slot_sizes[attr]);
        unsafe { (self.store.field_ptr(self.idx, attr) as *const T).read() }
    }

    /// Raw bytes of a fixed-width field (Char(N) payloads).
    #[inline]
    pub fn bytes(&self, attr: usize) -> &'a [u8] {
        let size = self.store.slot_sizes[attr];
        unsafe { std::slice::from_raw_parts(self.store.field_ptr(self.idx, attr), size) }
    }

    /// Resolve a Varchar field through the string pool.
    /// Returns the empty string for a never-written slot.
    #[inline]
    pub fn get_str(&self, attr: usize) -> &'a str {
        debug_assert_eq!(self.store.types[attr], AttrType::Varchar);
        let slot: VarSlot = self.get(attr);
        match slot.checked_sub(1) {
            Some(pool_idx) => self
                .store
                .var_pool
                .get(pool_idx as usize)
                .map(|s| s.as_str())
                .unwrap_or(""),
            None => "",
        }
    }
}

/// Mutable view of one row.
pub struct RowMut<'a> {
    store: &'a mut RowStore,
    idx: usize,
}

impl<'a> RowMut<'a> {
    /// Write a fixed-size scalar field.
    #[inline]
    pub fn set<T: Copy + 'static>(&mut self, attr: usize, value: T) {
        debug_assert_eq!(mem::size_of::<T>(), self.store.slot_sizes[attr]);
        unsafe { (self.store.field_ptr(self.idx, attr) as *mut T).write(value) }
    }

    /// Write a fixed-width byte field, NUL padding the remainder.
    #[inline]
    pub fn set_bytes(&mut self, attr: usize, value: &[u8]) {
        let size = self.store.slot_sizes[attr];
        debug_assert!(value.len() <= size);
        unsafe {
            let dst = self.store.field_ptr(self.idx, attr);
            ptr::copy_nonoverlapping(value.as_ptr(), dst, value.len());
            ptr::write_bytes(dst.add(value.len()), 0, size - value.len());
        }
    }

    /// Write a Varchar field: the payload goes to the string pool, the
    /// row slot stores the pool index.
    #[inline]
    pub fn set_str(&mut self, attr: usize, value: &str) -> Result<()> {
        debug_assert_eq!(self.store.types[attr], AttrType::Varchar);
        self.store.var_pool.push(VarStr::new(value))?;
        let slot = self.store.var_pool.len() as VarSlot; // 1-based, 0 = unset
        self.set(attr, slot);
        Ok(())
    }

    #[inline]
    pub fn as_ref(&self) -> RowRef<'_> {
        RowRef {
            store: self.store,
            idx: self.idx,
        }
    }
}
