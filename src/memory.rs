use crate::{
    memory_units::{Bytes, Pages, RoundUpTo},
    value::LittleEndianConvert,
    Error,
};
use alloc::{rc::Rc, vec::Vec};
use core::{cell::RefCell, fmt, ops::Range, u32};

/// Size of a page of [linear memory][`MemoryInstance`] - 64KiB.
///
/// The size of a memory is always an integer multiple of a page size.
///
/// [`MemoryInstance`]: struct.MemoryInstance.html
pub const LINEAR_MEMORY_PAGE_SIZE: Bytes = Bytes(65536);

/// Maximum number of pages of a linear memory (4GiB of addressable bytes).
const LINEAR_MEMORY_MAX_PAGES: Pages = Pages(65536);

/// Reference to a memory (See [`MemoryInstance`] for details).
///
/// This reference has a reference-counting semantics.
///
/// [`MemoryInstance`]: struct.MemoryInstance.html
#[derive(Clone, Debug)]
pub struct MemoryRef(Rc<MemoryInstance>);

impl ::core::ops::Deref for MemoryRef {
    type Target = MemoryInstance;
    fn deref(&self) -> &MemoryInstance {
        &self.0
    }
}

/// Runtime representation of a linear memory (or `memory` for short).
///
/// A memory is a contiguous, mutable array of raw bytes. Wasm code can load
/// and store values from/to a linear memory at any byte address. An access
/// that is not within the bounds of the current memory size traps.
///
/// A memory is created with an initial size but can be grown dynamically.
/// The growth can be limited by specifying a maximum size. The size of a
/// memory is always an integer multiple of a
/// [page size][`LINEAR_MEMORY_PAGE_SIZE`] - 64KiB.
///
/// A memory also owns the passive data segments of its module. A passive
/// segment is not copied at instantiation; it is materialized on demand by
/// the `memory.init` instruction and can be discarded with `data.drop`,
/// after which materializing it traps.
///
/// [`LINEAR_MEMORY_PAGE_SIZE`]: constant.LINEAR_MEMORY_PAGE_SIZE.html
pub struct MemoryInstance {
    /// Linear memory buffer.
    buffer: RefCell<Vec<u8>>,
    initial: Pages,
    maximum: Option<Pages>,
    /// Passive data segments; a dropped segment is `None`.
    segments: RefCell<Vec<Option<Vec<u8>>>>,
}

impl fmt::Debug for MemoryInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryInstance")
            .field("buffer.len", &self.buffer.borrow().len())
            .field("initial", &self.initial)
            .field("maximum", &self.maximum)
            .finish()
    }
}

struct CheckedRegion {
    offset: usize,
    size: usize,
}

impl CheckedRegion {
    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }
}

impl MemoryInstance {
    /// Allocate a memory instance.
    ///
    /// The memory is allocated with the initial number of pages specified by
    /// `initial`. Minimal possible value for `initial` is 0 and maximum
    /// possible is `65536` (since maximum addressable memory is
    /// 2<sup>32</sup> = 4GiB = 65536 * [64KiB][`LINEAR_MEMORY_PAGE_SIZE`]).
    ///
    /// It is possible to limit the maximum number of pages this memory
    /// instance can have by specifying `maximum`. If not specified, this
    /// memory instance will be able to allocate up to 4GiB.
    ///
    /// Allocated memory is always zeroed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    ///
    /// - `initial` is greater than `maximum`
    /// - either `initial` or `maximum` is greater than `65536`.
    ///
    /// [`LINEAR_MEMORY_PAGE_SIZE`]: constant.LINEAR_MEMORY_PAGE_SIZE.html
    pub fn alloc(initial: Pages, maximum: Option<Pages>) -> Result<MemoryRef, Error> {
        if initial > LINEAR_MEMORY_MAX_PAGES {
            return Err(Error::Memory(format!(
                "initial ({}) can't be larger than {} pages",
                initial.0, LINEAR_MEMORY_MAX_PAGES.0
            )));
        }
        if let Some(maximum) = maximum {
            if maximum > LINEAR_MEMORY_MAX_PAGES {
                return Err(Error::Memory(format!(
                    "maximum ({}) can't be larger than {} pages",
                    maximum.0, LINEAR_MEMORY_MAX_PAGES.0
                )));
            }
            if initial > maximum {
                return Err(Error::Memory(format!(
                    "maximum ({}) can't be smaller than initial ({})",
                    maximum.0, initial.0
                )));
            }
        }

        let initial_size: Bytes = initial.into();
        let memory = MemoryInstance {
            buffer: RefCell::new(vec![0; initial_size.0]),
            initial,
            maximum,
            segments: RefCell::new(Vec::new()),
        };
        Ok(MemoryRef(Rc::new(memory)))
    }

    /// Returns number of pages this `MemoryInstance` was created with.
    pub fn initial(&self) -> Pages {
        self.initial
    }

    /// Returns maximum amount of pages this `MemoryInstance` can grow to.
    ///
    /// Returns `None` if there is no limit set.
    /// Maximum memory size cannot exceed `65536` pages or 4GiB.
    pub fn maximum(&self) -> Option<Pages> {
        self.maximum
    }

    /// Returns current linear memory size.
    ///
    /// Maximum memory size cannot exceed `65536` pages or 4GiB.
    pub fn current_size(&self) -> Pages {
        Bytes(self.buffer.borrow().len()).round_up_to()
    }

    /// Get value from memory at given offset.
    pub fn get_value<T: LittleEndianConvert>(&self, offset: u32) -> Result<T, Error> {
        let mut bytes = <<T as LittleEndianConvert>::Bytes as Default>::default();
        self.get_into(offset, bytes.as_mut())?;
        Ok(T::from_le_bytes(bytes))
    }

    /// Copy data from given offset in the memory into `target` slice.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the specified region is out of bounds.
    pub fn get_into(&self, offset: u32, target: &mut [u8]) -> Result<(), Error> {
        let buffer = self.buffer.borrow();
        let region = self.checked_region(&buffer, offset as usize, target.len())?;

        target.copy_from_slice(&buffer[region.range()]);

        Ok(())
    }

    /// Copy data in the memory at given offset.
    pub fn set(&self, offset: u32, value: &[u8]) -> Result<(), Error> {
        let mut buffer = self.buffer.borrow_mut();
        let range = self
            .checked_region(&buffer, offset as usize, value.len())?
            .range();

        buffer[range].copy_from_slice(value);

        Ok(())
    }

    /// Copy value in the memory at given offset.
    pub fn set_value<T: LittleEndianConvert>(&self, offset: u32, value: T) -> Result<(), Error> {
        let bytes = value.into_le_bytes();
        self.set(offset, bytes.as_ref())?;
        Ok(())
    }

    /// Increases the size of the linear memory by given number of pages.
    /// Returns previous memory size if succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Err` if attempted to allocate more memory than permitted by
    /// the limit.
    pub fn grow(&self, additional: Pages) -> Result<Pages, Error> {
        let size_before_grow: Pages = self.current_size();

        if additional == Pages(0) {
            return Ok(size_before_grow);
        }

        let maximum = self.maximum.unwrap_or(LINEAR_MEMORY_MAX_PAGES);
        let new_size = Pages(size_before_grow.0 + additional.0);
        if new_size > maximum {
            return Err(Error::Memory(format!(
                "Trying to grow memory by {} pages when already have {}",
                additional.0, size_before_grow.0,
            )));
        }

        let new_buffer_length: Bytes = new_size.into();
        self.buffer.borrow_mut().resize(new_buffer_length.0, 0);
        Ok(size_before_grow)
    }

    /// Copies `len` bytes within the memory from `src` to `dst`.
    ///
    /// The ranges may overlap; the copy behaves as if the source range was
    /// first read into a buffer and the buffer then written out.
    ///
    /// # Errors
    ///
    /// Returns `Err` if either of the regions is out of bounds.
    pub fn copy(&self, dst: u32, src: u32, len: u32) -> Result<(), Error> {
        let mut buffer = self.buffer.borrow_mut();

        let src_range = self
            .checked_region(&buffer, src as usize, len as usize)?
            .range();
        self.checked_region(&buffer, dst as usize, len as usize)?;

        buffer.copy_within(src_range, dst as usize);

        Ok(())
    }

    /// Fills `len` bytes of the memory starting at `offset` with `value`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the region is out of bounds.
    pub fn fill(&self, offset: u32, value: u8, len: u32) -> Result<(), Error> {
        let mut buffer = self.buffer.borrow_mut();
        let range = self
            .checked_region(&buffer, offset as usize, len as usize)?
            .range();

        for byte in &mut buffer[range] {
            *byte = value;
        }

        Ok(())
    }

    /// Registers a passive data segment with this memory and returns its
    /// index.
    pub fn add_passive_segment(&self, bytes: Vec<u8>) -> u32 {
        let mut segments = self.segments.borrow_mut();
        segments.push(Some(bytes));
        (segments.len() - 1) as u32
    }

    /// Copies `len` bytes starting at `src_offset` out of the passive
    /// segment `segment` to `dst` in the memory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the segment does not exist or has been dropped, if
    /// the source range is out of the segment bounds, or if the destination
    /// range is out of the memory bounds.
    pub fn init_passive_segment(
        &self,
        segment: u32,
        dst: u32,
        src_offset: u32,
        len: u32,
    ) -> Result<(), Error> {
        let segments = self.segments.borrow();
        let bytes = segments
            .get(segment as usize)
            .and_then(|entry| entry.as_ref())
            .ok_or_else(|| {
                Error::Memory(format!("passive data segment {} is not available", segment))
            })?;

        let src_end = (src_offset as usize)
            .checked_add(len as usize)
            .ok_or_else(|| Error::Memory("segment range overflows".into()))?;
        let src_range = src_offset as usize..src_end;
        if src_end > bytes.len() {
            return Err(Error::Memory(format!(
                "reading {} bytes at {} past the end of data segment {}",
                len, src_offset, segment
            )));
        }

        self.set(dst, &bytes[src_range])
    }

    /// Discards the passive segment `segment`.
    ///
    /// Dropping an already dropped segment is allowed and does nothing;
    /// materializing a dropped segment is not.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the segment was never registered.
    pub fn drop_segment(&self, segment: u32) -> Result<(), Error> {
        let mut segments = self.segments.borrow_mut();
        let entry = segments.get_mut(segment as usize).ok_or_else(|| {
            Error::Memory(format!("no passive data segment {} to drop", segment))
        })?;
        *entry = None;
        Ok(())
    }

    fn checked_region(
        &self,
        buffer: &[u8],
        offset: usize,
        size: usize,
    ) -> Result<CheckedRegion, Error> {
        let end = offset.checked_add(size).ok_or_else(|| {
            Error::Memory(format!(
                "trying to access memory block of size {} from offset {}",
                size, offset
            ))
        })?;

        if end > buffer.len() {
            return Err(Error::Memory(format!(
                "trying to access region [{}..{}] in memory [0..{}]",
                offset,
                end,
                buffer.len()
            )));
        }

        Ok(CheckedRegion { offset, size })
    }

    /// Provides direct access to the underlying memory buffer.
    ///
    /// # Panics
    ///
    /// Any call that requires write access to memory made within the closure
    /// will panic.
    pub fn with_direct_access<R, F: FnOnce(&[u8]) -> R>(&self, f: F) -> R {
        let buf = self.buffer.borrow();
        f(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryInstance, MemoryRef};
    use crate::memory_units::Pages;
    use crate::Error;
    use assert_matches::assert_matches;

    fn one_page() -> MemoryRef {
        MemoryInstance::alloc(Pages(1), Some(Pages(2))).unwrap()
    }

    #[test]
    fn alloc_validates_limits() {
        assert!(MemoryInstance::alloc(Pages(0), None).is_ok());
        assert!(MemoryInstance::alloc(Pages(65536), None).is_ok());
        assert_matches!(
            MemoryInstance::alloc(Pages(65537), None),
            Err(Error::Memory(_))
        );
        assert_matches!(
            MemoryInstance::alloc(Pages(2), Some(Pages(1))),
            Err(Error::Memory(_))
        );
    }

    #[test]
    fn values_round_trip() {
        let memory = one_page();
        memory.set_value(4, 0x12345678u32).unwrap();
        assert_eq!(memory.get_value::<u32>(4).unwrap(), 0x12345678);
        assert_eq!(memory.get_value::<u8>(4).unwrap(), 0x78);
        assert_eq!(memory.get_value::<u8>(7).unwrap(), 0x12);
    }

    #[test]
    fn out_of_bounds_access() {
        let memory = one_page();
        assert_matches!(memory.get_value::<u32>(65533), Err(Error::Memory(_)));
        assert_matches!(memory.set_value(65536, 0u8), Err(Error::Memory(_)));
        // A zero length access at the boundary is fine.
        assert!(memory.set(65536, &[]).is_ok());
    }

    #[test]
    fn grow_returns_previous_size() {
        let memory = one_page();
        assert_eq!(memory.grow(Pages(1)).unwrap(), Pages(1));
        assert_eq!(memory.current_size(), Pages(2));
        assert_matches!(memory.grow(Pages(1)), Err(Error::Memory(_)));
    }

    #[test]
    fn copy_handles_overlap() {
        let memory = one_page();
        memory.set(0, &[1, 2, 3, 4]).unwrap();
        memory.copy(1, 0, 4).unwrap();
        let mut out = [0u8; 5];
        memory.get_into(0, &mut out).unwrap();
        assert_eq!(out, [1, 1, 2, 3, 4]);
    }

    #[test]
    fn fill_writes_value() {
        let memory = one_page();
        memory.fill(8, 0xAB, 4).unwrap();
        assert_eq!(memory.get_value::<u32>(8).unwrap(), 0xABAB_ABAB);
        assert_eq!(memory.get_value::<u8>(12).unwrap(), 0);
    }

    #[test]
    fn passive_segments_materialize_and_drop() {
        let memory = one_page();
        let segment = memory.add_passive_segment(vec![10, 20, 30, 40]);

        memory.init_passive_segment(segment, 100, 1, 2).unwrap();
        assert_eq!(memory.get_value::<u8>(100).unwrap(), 20);
        assert_eq!(memory.get_value::<u8>(101).unwrap(), 30);

        // Reading past the end of the segment is out of bounds.
        assert_matches!(
            memory.init_passive_segment(segment, 0, 2, 3),
            Err(Error::Memory(_))
        );

        memory.drop_segment(segment).unwrap();
        // Dropping twice is allowed.
        memory.drop_segment(segment).unwrap();
        // Materializing a dropped segment is not.
        assert_matches!(
            memory.init_passive_segment(segment, 0, 0, 1),
            Err(Error::Memory(_))
        );
    }
}
