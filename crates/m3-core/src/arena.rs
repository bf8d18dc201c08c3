#![forbid(unsafe_code)]

//! Block-based linear allocator.
//!
//! An [`Arena`] hands out byte slices from a chain of blocks obtained from a
//! [`SharedAllocator`]. Allocation only bumps an offset; memory is reclaimed
//! all at once with [`Arena::reset`] (keeps the first block) or
//! [`Arena::shutdown`] (returns every block).
//!
//! ```text
//! blocks[0] (block_size)     blocks[1] (max(block_size, size))
//! ┌──────────────┬───────┐   ┌─────────────────┬──────────────┐
//! │ used ........│ free  │ → │ used ...........│ free         │
//! └──────────────┴───────┘   └─────────────────┴──────────────┘
//!                                  ^ current
//! ```
//!
//! Alignment is applied to the offset within a block; offset arithmetic is
//! checked and reports [`Error::Overflow`].

use crate::alloc::{Block, SharedAllocator, allocator_or_default};
use crate::error::{Error, Result};

/// Block size used when the caller passes `0`.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

#[derive(Debug)]
struct ArenaBlock {
    storage: Block,
    offset: usize,
}

impl ArenaBlock {
    fn capacity(&self) -> usize {
        self.storage.len()
    }
}

/// Usage summary across every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    pub block_count: usize,
    pub total_capacity: usize,
    pub total_used: usize,
}

/// Linear allocator over a chain of blocks.
#[derive(Debug)]
pub struct Arena {
    allocator: SharedAllocator,
    block_size: usize,
    blocks: Vec<ArenaBlock>,
    #[cfg(any(test, feature = "test-helpers"))]
    faults: ArenaFaults,
}

#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default, Clone, Copy)]
struct ArenaFaults {
    align_fail: bool,
    add_overflow: bool,
}

fn align_offset(offset: usize, alignment: usize) -> Result<usize> {
    let mask = alignment - 1;
    let bumped = offset.checked_add(mask).ok_or(Error::Overflow)?;
    Ok(bumped & !mask)
}

impl Arena {
    /// Create an arena and allocate its first block.
    ///
    /// `allocator: None` selects the default allocator; `block_size: 0`
    /// selects [`DEFAULT_BLOCK_SIZE`].
    pub fn new(allocator: Option<SharedAllocator>, block_size: usize) -> Result<Self> {
        let allocator = allocator_or_default(allocator);
        let block_size = if block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            block_size
        };
        let first = allocator.alloc(block_size)?;
        Ok(Self {
            allocator,
            block_size,
            blocks: vec![ArenaBlock {
                storage: first,
                offset: 0,
            }],
            #[cfg(any(test, feature = "test-helpers"))]
            faults: ArenaFaults::default(),
        })
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Carve `size` bytes aligned to `alignment` out of the current block,
    /// appending a new block when it is exhausted.
    pub fn alloc(&mut self, size: usize, alignment: usize) -> Result<&mut [u8]> {
        if size == 0 || !alignment.is_power_of_two() {
            return Err(Error::InvalidArgument);
        }
        let current = self.blocks.last().ok_or(Error::State)?;
        let mut aligned = align_offset(current.offset, alignment)?;
        let remaining = current.capacity().saturating_sub(aligned);

        if remaining < size {
            let capacity = self.block_size.max(size);
            let storage = self.allocator.alloc(capacity)?;
            self.blocks.push(ArenaBlock { storage, offset: 0 });
            let aligned_fresh = align_offset(0, alignment);
            #[cfg(any(test, feature = "test-helpers"))]
            let aligned_fresh = if self.faults.align_fail {
                Err(Error::Overflow)
            } else {
                aligned_fresh
            };
            aligned = aligned_fresh?;
        }

        let end = aligned.checked_add(size).ok_or(Error::Overflow);
        #[cfg(any(test, feature = "test-helpers"))]
        let end = if self.faults.add_overflow {
            Err(Error::Overflow)
        } else {
            end
        };
        let end = end?;

        let block = self.blocks.last_mut().ok_or(Error::State)?;
        block.offset = end;
        Ok(&mut block.storage[aligned..end])
    }

    /// Release every block but the first and rewind it.
    ///
    /// Every block is visited even when a free fails; the first failure is
    /// returned.
    pub fn reset(&mut self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(Error::State);
        }
        let mut first_error = None;
        for block in self.blocks.drain(1..) {
            if let Err(err) = self.allocator.free(block.storage) {
                first_error.get_or_insert(err);
            }
        }
        if let Some(head) = self.blocks.first_mut() {
            head.offset = 0;
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Release every block. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        let mut first_error = None;
        for block in self.blocks.drain(..) {
            if let Err(err) = self.allocator.free(block.storage) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn stats(&self) -> Result<ArenaStats> {
        if self.blocks.is_empty() {
            return Err(Error::State);
        }
        let mut stats = ArenaStats::default();
        for block in &self.blocks {
            stats.total_capacity = stats
                .total_capacity
                .checked_add(block.capacity())
                .ok_or(Error::Overflow)?;
            stats.total_used = stats
                .total_used
                .checked_add(block.offset)
                .ok_or(Error::Overflow)?;
            stats.block_count += 1;
        }
        Ok(stats)
    }

    /// Make the alignment step after appending a block fail with overflow.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn set_force_align_fail(&mut self, enable: bool) {
        self.faults.align_fail = enable;
    }

    /// Make the end-offset addition fail with overflow.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn set_force_add_overflow(&mut self, enable: bool) {
        self.faults.add_overflow = enable;
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::FaultyAllocator;
    use std::sync::Arc;

    fn faulty() -> (Arc<FaultyAllocator>, SharedAllocator) {
        let alloc = Arc::new(FaultyAllocator::new());
        let shared: SharedAllocator = alloc.clone();
        (alloc, shared)
    }

    #[test]
    fn zero_block_size_selects_default() {
        let arena = Arena::new(None, 0).unwrap();
        assert_eq!(arena.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(
            arena.stats().unwrap(),
            ArenaStats {
                block_count: 1,
                total_capacity: DEFAULT_BLOCK_SIZE,
                total_used: 0,
            }
        );
    }

    #[test]
    fn first_block_failure_propagates() {
        let (alloc, shared) = faulty();
        alloc.fail_alloc_on_call(1);
        assert_eq!(Arena::new(Some(shared), 64).unwrap_err(), Error::OutOfMemory);
    }

    #[test]
    fn alloc_validates_arguments() {
        let mut arena = Arena::new(None, 64).unwrap();
        assert_eq!(arena.alloc(0, 1).unwrap_err(), Error::InvalidArgument);
        assert_eq!(arena.alloc(8, 0).unwrap_err(), Error::InvalidArgument);
        assert_eq!(arena.alloc(8, 3).unwrap_err(), Error::InvalidArgument);
    }

    #[test]
    fn alloc_aligns_offsets() {
        let mut arena = Arena::new(None, 64).unwrap();
        assert_eq!(arena.alloc(3, 1).unwrap().len(), 3);
        arena.alloc(4, 8).unwrap();
        assert_eq!(arena.stats().unwrap().total_used, 12);
    }

    #[test]
    fn exhausted_block_appends_new_one() {
        let mut arena = Arena::new(None, 16).unwrap();
        arena.alloc(12, 1).unwrap();
        arena.alloc(8, 1).unwrap();
        let stats = arena.stats().unwrap();
        assert_eq!(stats.block_count, 2);
        assert_eq!(stats.total_capacity, 32);
        assert_eq!(stats.total_used, 20);
    }

    #[test]
    fn oversized_request_gets_exact_block() {
        let mut arena = Arena::new(None, 16).unwrap();
        let slice = arena.alloc(100, 4).unwrap();
        assert_eq!(slice.len(), 100);
        assert_eq!(arena.stats().unwrap().total_capacity, 116);
    }

    #[test]
    fn reset_keeps_first_block_and_reuses_it() {
        let (alloc, shared) = faulty();
        let mut arena = Arena::new(Some(shared), 16).unwrap();
        arena.alloc(16, 1).unwrap();
        arena.alloc(16, 1).unwrap();
        arena.alloc(16, 1).unwrap();
        assert_eq!(alloc.live_blocks(), 3);
        arena.reset().unwrap();
        assert_eq!(alloc.live_blocks(), 1);
        assert_eq!(
            arena.stats().unwrap(),
            ArenaStats {
                block_count: 1,
                total_capacity: 16,
                total_used: 0,
            }
        );
        let calls = alloc.alloc_calls();
        arena.alloc(8, 1).unwrap();
        assert_eq!(alloc.alloc_calls(), calls);
    }

    #[test]
    fn reset_reports_first_free_error_but_finishes() {
        let (alloc, shared) = faulty();
        let mut arena = Arena::new(Some(shared), 8).unwrap();
        arena.alloc(8, 1).unwrap();
        arena.alloc(8, 1).unwrap();
        alloc.fail_frees(true);
        assert_eq!(arena.reset(), Err(Error::Io));
        assert_eq!(arena.stats().unwrap().block_count, 1);
        alloc.fail_frees(false);
    }

    #[test]
    fn shutdown_is_idempotent_and_blocks_use() {
        let (alloc, shared) = faulty();
        let mut arena = Arena::new(Some(shared), 8).unwrap();
        arena.alloc(16, 1).unwrap();
        arena.shutdown().unwrap();
        assert_eq!(alloc.live_blocks(), 0);
        assert!(arena.is_shutdown());
        assert_eq!(arena.shutdown(), Ok(()));
        assert_eq!(arena.alloc(1, 1).unwrap_err(), Error::State);
        assert_eq!(arena.stats(), Err(Error::State));
        assert_eq!(arena.reset(), Err(Error::State));
    }

    #[test]
    fn new_block_failure_leaves_arena_usable() {
        let (alloc, shared) = faulty();
        let mut arena = Arena::new(Some(shared), 8).unwrap();
        arena.alloc(8, 1).unwrap();
        alloc.fail_alloc_on_call(2);
        assert_eq!(arena.alloc(4, 1).unwrap_err(), Error::OutOfMemory);
        assert_eq!(arena.stats().unwrap().block_count, 1);
        arena.alloc(4, 1).unwrap();
    }

    #[test]
    fn forced_overflow_hooks() {
        let mut arena = Arena::new(None, 8).unwrap();
        arena.set_force_add_overflow(true);
        assert_eq!(arena.alloc(4, 1).unwrap_err(), Error::Overflow);
        arena.set_force_add_overflow(false);

        arena.alloc(8, 1).unwrap();
        arena.set_force_align_fail(true);
        assert_eq!(arena.alloc(4, 1).unwrap_err(), Error::Overflow);
        arena.set_force_align_fail(false);
        assert!(arena.alloc(4, 1).is_ok());
    }

    #[test]
    fn drop_returns_blocks() {
        let (alloc, shared) = faulty();
        {
            let mut arena = Arena::new(Some(shared), 8).unwrap();
            arena.alloc(32, 1).unwrap();
        }
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn align_offset_overflow() {
        assert_eq!(align_offset(usize::MAX, 2), Err(Error::Overflow));
        assert_eq!(align_offset(5, 4), Ok(8));
    }
}
