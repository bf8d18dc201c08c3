#![forbid(unsafe_code)]

//! Pluggable byte allocator.
//!
//! Components never allocate their long-lived buffers directly; they go
//! through a [`SharedAllocator`] so embedders can account for memory or
//! inject failures. A [`Block`] is an owned, zero-initialised byte region
//! that must be handed back to the allocator that produced it.

use core::fmt;
use core::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Owned byte region produced by an [`Allocator`].
#[derive(Default, PartialEq, Eq)]
pub struct Block {
    bytes: Vec<u8>,
}

impl Block {
    /// Size of the block in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Address of the first byte, used for alignment arithmetic.
    #[must_use]
    pub fn addr(&self) -> usize {
        self.bytes.as_ptr() as usize
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("len", &self.bytes.len()).finish()
    }
}

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for Block {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Allocation interface consumed by every component.
///
/// `alloc` and `realloc` reject a size of zero with
/// [`Error::InvalidArgument`] and report exhaustion as
/// [`Error::OutOfMemory`]. A failed `realloc` leaves the block untouched.
pub trait Allocator: fmt::Debug + Send + Sync {
    fn alloc(&self, size: usize) -> Result<Block>;

    fn realloc(&self, block: &mut Block, size: usize) -> Result<()>;

    fn free(&self, block: Block) -> Result<()>;
}

/// Allocator shared between a component and its sub-objects.
pub type SharedAllocator = Arc<dyn Allocator>;

/// Heap allocator backed by the global Rust allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

fn zeroed(size: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(size)
        .map_err(|_| Error::OutOfMemory)?;
    bytes.resize(size, 0);
    Ok(bytes)
}

impl Allocator for SystemAllocator {
    fn alloc(&self, size: usize) -> Result<Block> {
        if size == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(Block {
            bytes: zeroed(size)?,
        })
    }

    fn realloc(&self, block: &mut Block, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidArgument);
        }
        let len = block.bytes.len();
        if size > len {
            block
                .bytes
                .try_reserve_exact(size - len)
                .map_err(|_| Error::OutOfMemory)?;
            block.bytes.resize(size, 0);
        } else {
            block.bytes.truncate(size);
            block.bytes.shrink_to_fit();
        }
        Ok(())
    }

    fn free(&self, block: Block) -> Result<()> {
        drop(block);
        Ok(())
    }
}

/// The process default allocator.
#[must_use]
pub fn default_allocator() -> SharedAllocator {
    Arc::new(SystemAllocator)
}

/// Resolve an optional caller allocator to a concrete one.
#[must_use]
pub fn allocator_or_default(allocator: Option<SharedAllocator>) -> SharedAllocator {
    allocator.unwrap_or_else(default_allocator)
}

// ============================================================================
// Fault injection
// ============================================================================

#[cfg(any(test, feature = "test-helpers"))]
pub use faulty::FaultyAllocator;

#[cfg(any(test, feature = "test-helpers"))]
mod faulty {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::{Allocator, Block, SystemAllocator};
    use crate::error::{Error, Result};

    /// Allocator wrapper that counts calls and fails on demand.
    ///
    /// Call numbers are 1-based; `0` disables the corresponding fault.
    #[derive(Debug, Default)]
    pub struct FaultyAllocator {
        alloc_calls: AtomicUsize,
        realloc_calls: AtomicUsize,
        free_calls: AtomicUsize,
        fail_alloc_on: AtomicUsize,
        fail_realloc_on: AtomicUsize,
        fail_frees: AtomicBool,
        live: AtomicUsize,
    }

    impl FaultyAllocator {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the `n`th call to `alloc` (counting every call so far).
        pub fn fail_alloc_on_call(&self, n: usize) {
            self.fail_alloc_on.store(n, Ordering::SeqCst);
        }

        /// Fail the `n`th call to `realloc`.
        pub fn fail_realloc_on_call(&self, n: usize) {
            self.fail_realloc_on.store(n, Ordering::SeqCst);
        }

        /// Make every `free` report [`Error::Io`]; the memory is still released.
        pub fn fail_frees(&self, fail: bool) {
            self.fail_frees.store(fail, Ordering::SeqCst);
        }

        #[must_use]
        pub fn alloc_calls(&self) -> usize {
            self.alloc_calls.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn realloc_calls(&self) -> usize {
            self.realloc_calls.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn free_calls(&self) -> usize {
            self.free_calls.load(Ordering::SeqCst)
        }

        /// Blocks handed out and not yet freed.
        #[must_use]
        pub fn live_blocks(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }
    }

    impl Allocator for FaultyAllocator {
        fn alloc(&self, size: usize) -> Result<Block> {
            let call = self.alloc_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_alloc_on.load(Ordering::SeqCst) {
                return Err(Error::OutOfMemory);
            }
            let block = SystemAllocator.alloc(size)?;
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(block)
        }

        fn realloc(&self, block: &mut Block, size: usize) -> Result<()> {
            let call = self.realloc_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_realloc_on.load(Ordering::SeqCst) {
                return Err(Error::OutOfMemory);
            }
            SystemAllocator.realloc(block, size)
        }

        fn free(&self, block: Block) -> Result<()> {
            self.free_calls.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_sub(1, Ordering::SeqCst);
            drop(block);
            if self.fail_frees.load(Ordering::SeqCst) {
                return Err(Error::Io);
            }
            Ok(())
        }
    }
}
