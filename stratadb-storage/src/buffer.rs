//! Growable untyped buffer.
//!
//! [`RawBuf`] owns one contiguous allocation of `capacity * elem_size`
//! bytes and tracks how many elements are in use. It knows the element
//! stride and alignment but nothing about the element type: construction
//! and destruction of elements inside the arena is the obligation of the
//! typed layer on top ([`crate::col::Column`]).
//!
//! Growth reallocates and preserves already-written bytes. Allocation
//! failure is reported to the caller and leaves the buffer untouched;
//! capacity never shrinks.

use crate::config::{DEFAULT_GROWTH_FACTOR, DEFAULT_MAX_ALLOC, DEFAULT_MIN_CAPACITY};
use crate::error::{Error, Result};
use std::alloc::{alloc, dealloc, realloc, Layout};
use std::ptr;

/// Amortized growth policy of a [`RawBuf`].
#[derive(Debug, Clone, Copy)]
pub struct Growth {
    /// Capacity multiplier on overflow, at least 1.5.
    pub factor: f64,
    /// Capacity in elements of the first allocation.
    pub min_capacity: usize,
    /// Upper bound in bytes of a single allocation.
    pub max_bytes: usize,
}

impl Default for Growth {
    #[inline]
    fn default() -> Self {
        Growth {
            factor: DEFAULT_GROWTH_FACTOR,
            min_capacity: DEFAULT_MIN_CAPACITY,
            max_bytes: DEFAULT_MAX_ALLOC.as_u64() as usize,
        }
    }
}

impl Growth {
    /// Next capacity when `required` elements must fit.
    #[inline]
    fn next_capacity(&self, current: usize, required: usize) -> usize {
        let amortized = (current as f64 * self.factor) as usize;
        amortized.max(required).max(self.min_capacity)
    }
}

/// Growable untyped buffer parameterized by element stride and alignment.
pub struct RawBuf {
    data: *mut u8,
    elem_size: usize,
    align: usize,
    len: usize,
    capacity: usize,
    growth: Growth,
}

impl RawBuf {
    /// Create an empty buffer. No allocation happens until the first
    /// reservation or growth.
    #[inline]
    pub fn new(elem_size: usize, align: usize) -> Self {
        Self::with_growth(elem_size, align, Growth::default())
    }

    #[inline]
    pub fn with_growth(elem_size: usize, align: usize, growth: Growth) -> Self {
        debug_assert!(elem_size > 0, "element size cannot be zero");
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
        debug_assert!(elem_size % align == 0, "stride must be a multiple of alignment");
        RawBuf {
            data: ptr::null_mut(),
            elem_size,
            align,
            len: 0,
            capacity: 0,
            growth,
        }
    }

    /// Number of elements in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Set the number of elements in use.
    ///
    /// Caller must have initialized all `new_len` elements, and must have
    /// destroyed any element beyond `new_len` it intends to abandon.
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity);
        self.len = new_len;
    }

    /// Base pointer of the arena. Null while capacity is zero.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.data
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data
    }

    /// Address of the element at `idx`. Unchecked in release builds.
    ///
    /// The returned address is invalidated by any growth of this buffer;
    /// re-derive it from the buffer and the index after an append.
    #[inline]
    pub fn elem_ptr(&self, idx: usize) -> *mut u8 {
        debug_assert!(idx < self.capacity, "element index out of allocated range");
        unsafe { self.data.add(idx * self.elem_size) }
    }

    /// Raise capacity to at least `new_cap` elements. Reserving at or
    /// below the current capacity is a no-op. Existing bytes are
    /// preserved across the reallocation. On allocation failure the
    /// buffer is left in its prior valid state.
    pub fn reserve(&mut self, new_cap: usize) -> Result<()> {
        if new_cap <= self.capacity {
            return Ok(());
        }
        let new_bytes = new_cap
            .checked_mul(self.elem_size)
            .ok_or(Error::InsufficientMemory(usize::MAX))?;
        if new_bytes > self.growth.max_bytes {
            return Err(Error::InsufficientMemory(new_bytes));
        }
        let new_layout = Layout::from_size_align(new_bytes, self.align)
            .map_err(|_| Error::InsufficientMemory(new_bytes))?;
        let new_data = unsafe {
            if self.data.is_null() {
                alloc(new_layout)
            } else {
                let old_layout =
                    Layout::from_size_align_unchecked(self.capacity * self.elem_size, self.align);
                realloc(self.data, old_layout, new_bytes)
            }
        };
        if new_data.is_null() {
            return Err(Error::InsufficientMemory(new_bytes));
        }
        self.data = new_data;
        self.capacity = new_cap;
        Ok(())
    }

    /// Ensure room for `additional` more elements, growing by the
    /// amortized policy when needed.
    #[inline]
    pub fn grow_for(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(Error::InsufficientMemory(usize::MAX))?;
        if required <= self.capacity {
            return Ok(());
        }
        let new_cap = self.growth.next_capacity(self.capacity, required);
        self.reserve(new_cap)
    }
}

impl Drop for RawBuf {
    fn drop(&mut self) {
        if !self.data.is_null() {
            unsafe {
                let layout =
                    Layout::from_size_align_unchecked(self.capacity * self.elem_size, self.align);
                dealloc(self.data, layout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_below_capacity_is_noop() {
        let mut buf = RawBuf::new(8, 8);
        buf.reserve(100).unwrap();
        let cap = buf.capacity();
        let ptr = buf.as_ptr();
        buf.reserve(10).unwrap();
        assert_eq!(buf.capacity(), cap);
        assert_eq!(buf.as_ptr(), ptr);
    }

    #[test]
    fn test_growth_preserves_bytes() {
        let mut buf = RawBuf::new(4, 4);
        buf.grow_for(1).unwrap();
        for i in 0u32..1000 {
            buf.grow_for(1).unwrap();
            unsafe {
                (buf.elem_ptr(i as usize) as *mut u32).write(i);
                buf.set_len(i as usize + 1);
            }
        }
        for i in 0u32..1000 {
            let v = unsafe { (buf.elem_ptr(i as usize) as *const u32).read() };
            assert_eq!(v, i);
        }
    }

    #[test]
    fn test_capacity_non_decreasing() {
        let mut buf = RawBuf::new(16, 8);
        let mut last_cap = 0;
        for i in 0..200 {
            buf.grow_for(1).unwrap();
            unsafe { buf.set_len(i + 1) };
            assert!(buf.len() <= buf.capacity());
            assert!(buf.capacity() >= last_cap);
            last_cap = buf.capacity();
        }
        // first allocation honors the minimum chunk
        assert!(last_cap >= DEFAULT_MIN_CAPACITY);
    }

    #[test]
    fn test_max_alloc_bound_reports_failure() {
        let growth = Growth {
            factor: 2.0,
            min_capacity: 8,
            max_bytes: 64,
        };
        let mut buf = RawBuf::with_growth(8, 8, growth);
        buf.reserve(8).unwrap();
        let cap = buf.capacity();
        // 9 elements of 8 bytes exceed the 64-byte bound
        let res = buf.reserve(9);
        assert!(matches!(res, Err(Error::InsufficientMemory(_))));
        assert_eq!(buf.capacity(), cap);
    }
}
