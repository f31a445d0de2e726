use alloc::{vec, vec::Vec};
use stackvm_types::{MAX_PAGES, MemoryType, PAGE_SIZE};

use crate::{Error, Result, cold, log};

/// A linear memory
///
/// A single contiguous, zero-initialized byte buffer addressed little-endian, growable in
/// pages of [`PAGE_SIZE`] bytes up to its maximum.
///
/// See <https://webassembly.github.io/spec/core/exec/runtime.html#memory-instances>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryInstance {
    ty: MemoryType,
    data: Vec<u8>,
    page_count: u32,
    max_pages: u32,
}

impl MemoryInstance {
    /// Allocate the initial pages of `ty`.
    ///
    /// `ceiling` limits growth when the type declares no maximum.
    pub fn new(ty: MemoryType, ceiling: u32) -> Self {
        let max_pages = ty.page_count_max.unwrap_or(ceiling).min(MAX_PAGES).max(ty.page_count_initial);
        log::debug!("initializing memory with {} pages (max {max_pages})", ty.page_count_initial);

        Self { ty, data: vec![0; ty.initial_size() as usize], page_count: ty.page_count_initial, max_pages }
    }

    /// The declared type of this memory.
    pub fn ty(&self) -> MemoryType {
        self.ty
    }

    /// Current size in pages.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Current size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether this memory can stand in for an import declared as `declared`.
    pub fn satisfies(&self, declared: &MemoryType) -> bool {
        self.page_count >= declared.page_count_initial
            && match declared.page_count_max {
                Some(max) => self.ty.page_count_max.is_some_and(|own| own <= max),
                None => true,
            }
    }

    #[inline(never)]
    #[cold]
    fn trap_oob(&self, addr: usize, len: usize) -> Error {
        Error::Trap(crate::Trap::MemoryOutOfBounds { offset: addr, len, max: self.data.len() })
    }

    fn range(&self, addr: usize, len: usize) -> Result<core::ops::Range<usize>> {
        match addr.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(addr..end),
            _ => {
                cold();
                Err(self.trap_oob(addr, len))
            }
        }
    }

    /// Write `data` at `addr`, trapping if any byte falls outside the memory.
    pub fn store(&mut self, addr: usize, data: &[u8]) -> Result<()> {
        let range = self.range(addr, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    /// Read `len` bytes at `addr`, trapping if any byte falls outside the memory.
    pub fn load(&self, addr: usize, len: usize) -> Result<&[u8]> {
        let range = self.range(addr, len)?;
        Ok(&self.data[range])
    }

    pub(crate) fn load_as<const SIZE: usize, T: MemLoadable<SIZE>>(&self, addr: usize) -> Result<T> {
        let range = self.range(addr, SIZE)?;
        match self.data[range].try_into() {
            Ok(bytes) => Ok(T::from_le_bytes(bytes)),
            Err(_) => Err(self.trap_oob(addr, SIZE)),
        }
    }

    pub(crate) fn store_as<const SIZE: usize, T: MemStorable<SIZE>>(&mut self, addr: usize, value: T) -> Result<()> {
        self.store(addr, &value.to_mem_bytes())
    }

    /// Grow by `pages_delta` pages, returning the previous page count.
    ///
    /// Fails without changing the memory if the new size would exceed the maximum.
    pub fn grow(&mut self, pages_delta: u32) -> Option<u32> {
        let current_pages = self.page_count;
        let new_pages = current_pages.checked_add(pages_delta)?;
        if new_pages > self.max_pages {
            return None;
        }

        let new_size = usize::try_from(new_pages as u64 * PAGE_SIZE).ok()?;
        self.data.resize(new_size, 0);
        self.page_count = new_pages;
        log::debug!("memory grown from {current_pages} to {new_pages} pages");
        Some(current_pages)
    }
}

/// Effective address of an access: the popped base plus the constant offset.
///
/// Saturates instead of wrapping so out-of-range sums always fail the bounds check.
pub(crate) fn effective_addr(base: u32, offset: u32) -> usize {
    usize::try_from(base as u64 + offset as u64).unwrap_or(usize::MAX)
}

/// A trait for types that can be stored in memory
pub(crate) trait MemStorable<const N: usize> {
    /// Store a value in memory
    fn to_mem_bytes(self) -> [u8; N];
}

/// A trait for types that can be loaded from memory
pub(crate) trait MemLoadable<const N: usize>: Sized + Copy {
    /// Load a value from memory
    fn from_le_bytes(bytes: [u8; N]) -> Self;
}

macro_rules! impl_mem_traits {
    ($($type:ty, $size:expr),*) => {
        $(
            impl MemLoadable<$size> for $type {
                #[inline(always)]
                fn from_le_bytes(bytes: [u8; $size]) -> Self {
                    <$type>::from_le_bytes(bytes)
                }
            }

            impl MemStorable<$size> for $type {
                #[inline(always)]
                fn to_mem_bytes(self) -> [u8; $size] {
                    self.to_le_bytes()
                }
            }
        )*
    }
}

impl_mem_traits!(u8, 1, i8, 1, u16, 2, i16, 2, u32, 4, i32, 4, f32, 4, u64, 8, i64, 8, f64, 8);

#[cfg(test)]
mod memory_instance_tests {
    use super::*;

    fn create_test_memory() -> MemoryInstance {
        MemoryInstance::new(MemoryType::new(1, Some(2)), MAX_PAGES)
    }

    #[test]
    fn test_memory_store_and_load() {
        let mut memory = create_test_memory();
        let data_to_store = [1, 2, 3, 4];
        assert!(memory.store(0, &data_to_store).is_ok());
        assert_eq!(memory.load(0, data_to_store.len()).unwrap(), &data_to_store);
    }

    #[test]
    fn test_memory_is_little_endian() {
        let mut memory = create_test_memory();
        memory.store_as(8, 0x0102_0304u32).unwrap();
        assert_eq!(memory.load(8, 4).unwrap(), &[4, 3, 2, 1]);
        assert_eq!(memory.load_as::<2, u16>(8).unwrap(), 0x0304);
    }

    #[test]
    fn test_memory_out_of_bounds() {
        let mut memory = create_test_memory();
        let end = memory.len();
        assert!(memory.store(end - 2, &[1, 2, 3, 4]).is_err());
        assert!(memory.load(end, 1).is_err());
        assert!(memory.load(usize::MAX, 1).is_err());
        assert!(memory.load_as::<8, u64>(end - 4).is_err());
        assert!(memory.load(end - 1, 1).is_ok());
    }

    #[test]
    fn test_memory_grow() {
        let mut memory = create_test_memory();
        assert_eq!(memory.grow(1), Some(1));
        assert_eq!(memory.page_count(), 2);
        assert_eq!(memory.len(), 2 * PAGE_SIZE as usize);

        let before = memory.clone();
        assert_eq!(memory.grow(1), None);
        assert_eq!(memory, before);
        assert_eq!(memory.grow(0), Some(2));
    }

    #[test]
    fn test_memory_ceiling_without_declared_max() {
        let mut memory = MemoryInstance::new(MemoryType::new(0, None), 3);
        assert_eq!(memory.grow(3), Some(0));
        assert_eq!(memory.grow(1), None);
        assert!(memory.grow(u32::MAX).is_none());
    }

    #[test]
    fn test_effective_addr_does_not_wrap() {
        assert_eq!(effective_addr(8, 4), 12);
        assert!(effective_addr(u32::MAX, u32::MAX) > u32::MAX as usize);
    }

    #[test]
    fn test_import_compatibility() {
        let memory = create_test_memory();
        assert!(memory.satisfies(&MemoryType::new(1, None)));
        assert!(memory.satisfies(&MemoryType::new(1, Some(4))));
        assert!(!memory.satisfies(&MemoryType::new(2, None)));
        assert!(!MemoryInstance::new(MemoryType::new(1, None), 10).satisfies(&MemoryType::new(1, Some(4))));
    }
}
