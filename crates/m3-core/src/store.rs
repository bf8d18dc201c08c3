#![forbid(unsafe_code)]

//! Reducer-driven state store with bounded undo/redo history.
//!
//! The state is an opaque, fixed-size byte buffer. Every [`Store::dispatch`]
//! runs the reducer from the committed state into a scratch buffer; the
//! candidate is only committed once the reducer succeeds.
//!
//! ```text
//! dispatch(a)         undo()              redo()
//! undo: [s0]          undo: []            undo: [s0]
//! state: s1           state: s0           state: s1
//! redo: []            redo: [s1]          redo: []
//! ```
//!
//! # Invariants
//!
//! - `undo_count() <= history_capacity` and `redo_count() <= history_capacity`.
//! - A failed reducer leaves state and history untouched.
//! - A successful dispatch empties the redo history.
//! - When a ring is full the oldest snapshot is evicted.
//! - With `history_capacity == 0` nothing is recorded and undo/redo report
//!   [`Error::NotFound`].

use crate::alloc::{Block, SharedAllocator, allocator_or_default};
use crate::error::{Error, Result};

/// An action delivered to the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action<'a> {
    pub kind: u32,
    pub data: &'a [u8],
}

impl<'a> Action<'a> {
    #[must_use]
    pub const fn new(kind: u32, data: &'a [u8]) -> Self {
        Self { kind, data }
    }

    /// An action without payload.
    #[must_use]
    pub const fn bare(kind: u32) -> Self {
        Self { kind, data: &[] }
    }
}

/// Computes the next state from the previous one.
///
/// `next` arrives holding unspecified bytes and must be fully written.
pub trait Reducer {
    fn reduce(&mut self, action: &Action<'_>, prev: &[u8], next: &mut [u8]) -> Result<()>;
}

impl<F> Reducer for F
where
    F: FnMut(&Action<'_>, &[u8], &mut [u8]) -> Result<()>,
{
    fn reduce(&mut self, action: &Action<'_>, prev: &[u8], next: &mut [u8]) -> Result<()> {
        self(action, prev, next)
    }
}

/// Store construction parameters.
#[derive(Debug, Clone)]
pub struct StoreConfig<R> {
    /// `None` selects the default allocator.
    pub allocator: Option<SharedAllocator>,
    pub state_size: usize,
    pub history_capacity: usize,
    pub reducer: R,
}

impl<R> StoreConfig<R> {
    #[must_use]
    pub fn new(state_size: usize, history_capacity: usize, reducer: R) -> Self {
        Self {
            allocator: None,
            state_size,
            history_capacity,
            reducer,
        }
    }

    #[must_use]
    pub fn with_allocator(mut self, allocator: SharedAllocator) -> Self {
        self.allocator = Some(allocator);
        self
    }
}

// ============================================================================
// History ring
// ============================================================================

#[derive(Debug)]
struct History {
    buffer: Option<Block>,
    count: usize,
}

impl History {
    /// Append a snapshot, evicting the oldest when full.
    fn push(&mut self, capacity: usize, state_size: usize, state: &[u8]) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        if self.count < capacity {
            let offset = self.count * state_size;
            buffer[offset..offset + state_size].copy_from_slice(state);
            self.count += 1;
            return;
        }
        buffer.copy_within(state_size.., 0);
        let offset = (capacity - 1) * state_size;
        buffer[offset..offset + state_size].copy_from_slice(state);
    }

    /// Remove the newest snapshot into `out`.
    fn pop(&mut self, state_size: usize, out: &mut [u8]) -> Result<()> {
        let buffer = self.buffer.as_ref().ok_or(Error::NotFound)?;
        if self.count == 0 {
            return Err(Error::NotFound);
        }
        let offset = (self.count - 1) * state_size;
        out.copy_from_slice(&buffer[offset..offset + state_size]);
        self.count -= 1;
        Ok(())
    }

    fn peek(&self, state_size: usize, index_from_latest: usize) -> Result<&[u8]> {
        let buffer = self.buffer.as_ref().ok_or(Error::NotFound)?;
        if index_from_latest >= self.count {
            return Err(Error::NotFound);
        }
        let offset = (self.count - 1 - index_from_latest) * state_size;
        Ok(&buffer[offset..offset + state_size])
    }
}

#[derive(Debug)]
struct Buffers {
    state: Block,
    scratch: Block,
    undo: History,
    redo: History,
}

// ============================================================================
// Store
// ============================================================================

/// Fixed-size state with undo/redo.
#[derive(Debug)]
pub struct Store<R> {
    allocator: SharedAllocator,
    reducer: R,
    state_size: usize,
    history_capacity: usize,
    buffers: Option<Buffers>,
}

impl<R: Reducer> Store<R> {
    /// Allocate the store. `initial: None` starts from a zeroed state.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] when `state_size` is zero.
    /// - [`Error::Range`] when `initial` is not `state_size` bytes long.
    /// - [`Error::Overflow`] when the history size overflows, before any
    ///   allocation happens.
    /// - Allocator failures; buffers already allocated are released.
    pub fn new(config: StoreConfig<R>, initial: Option<&[u8]>) -> Result<Self> {
        let StoreConfig {
            allocator,
            state_size,
            history_capacity,
            reducer,
        } = config;
        if state_size == 0 {
            return Err(Error::InvalidArgument);
        }
        if initial.is_some_and(|bytes| bytes.len() != state_size) {
            return Err(Error::Range);
        }
        let history_bytes = state_size
            .checked_mul(history_capacity)
            .ok_or(Error::Overflow)?;
        let allocator = allocator_or_default(allocator);

        let mut state = allocator.alloc(state_size)?;
        let scratch = match allocator.alloc(state_size) {
            Ok(block) => block,
            Err(err) => {
                let _ = allocator.free(state);
                return Err(err);
            }
        };
        let (undo, redo) = if history_capacity > 0 {
            let undo = match allocator.alloc(history_bytes) {
                Ok(block) => block,
                Err(err) => {
                    let _ = allocator.free(scratch);
                    let _ = allocator.free(state);
                    return Err(err);
                }
            };
            let redo = match allocator.alloc(history_bytes) {
                Ok(block) => block,
                Err(err) => {
                    let _ = allocator.free(undo);
                    let _ = allocator.free(scratch);
                    let _ = allocator.free(state);
                    return Err(err);
                }
            };
            (Some(undo), Some(redo))
        } else {
            (None, None)
        };

        match initial {
            Some(bytes) => state.copy_from_slice(bytes),
            None => state.fill(0),
        }

        Ok(Self {
            allocator,
            reducer,
            state_size,
            history_capacity,
            buffers: Some(Buffers {
                state,
                scratch,
                undo: History {
                    buffer: undo,
                    count: 0,
                },
                redo: History {
                    buffer: redo,
                    count: 0,
                },
            }),
        })
    }

    fn buffers(&self) -> Result<&Buffers> {
        self.buffers.as_ref().ok_or(Error::State)
    }

    /// Run the reducer and commit its result.
    pub fn dispatch(&mut self, action: &Action<'_>) -> Result<()> {
        let buffers = self.buffers.as_mut().ok_or(Error::State)?;
        self.reducer
            .reduce(action, &buffers.state, &mut buffers.scratch)?;
        buffers
            .undo
            .push(self.history_capacity, self.state_size, &buffers.state);
        buffers.state.copy_from_slice(&buffers.scratch);
        buffers.redo.count = 0;
        Ok(())
    }

    pub fn undo(&mut self) -> Result<()> {
        let buffers = self.buffers.as_mut().ok_or(Error::State)?;
        if buffers.undo.count == 0 {
            return Err(Error::NotFound);
        }
        buffers
            .redo
            .push(self.history_capacity, self.state_size, &buffers.state);
        buffers.undo.pop(self.state_size, &mut buffers.state)
    }

    pub fn redo(&mut self) -> Result<()> {
        let buffers = self.buffers.as_mut().ok_or(Error::State)?;
        if buffers.redo.count == 0 {
            return Err(Error::NotFound);
        }
        buffers
            .undo
            .push(self.history_capacity, self.state_size, &buffers.state);
        buffers.redo.pop(self.state_size, &mut buffers.state)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        let buffers = self.buffers.as_mut().ok_or(Error::State)?;
        buffers.undo.count = 0;
        buffers.redo.count = 0;
        Ok(())
    }

    /// Borrow the committed state.
    pub fn state(&self) -> Result<&[u8]> {
        Ok(self.buffers()?.state.as_slice())
    }

    /// Copy the committed state into `out`, which must be `state_size` long.
    pub fn get_state(&self, out: &mut [u8]) -> Result<()> {
        let buffers = self.buffers()?;
        if out.len() != self.state_size {
            return Err(Error::Range);
        }
        out.copy_from_slice(&buffers.state);
        Ok(())
    }

    pub fn can_undo(&self) -> Result<bool> {
        Ok(self.buffers()?.undo.count > 0)
    }

    pub fn can_redo(&self) -> Result<bool> {
        Ok(self.buffers()?.redo.count > 0)
    }

    pub fn undo_count(&self) -> Result<usize> {
        Ok(self.buffers()?.undo.count)
    }

    pub fn redo_count(&self) -> Result<usize> {
        Ok(self.buffers()?.redo.count)
    }

    /// Copy an undo snapshot; `0` is the most recent.
    pub fn copy_undo_state(&self, index_from_latest: usize, out: &mut [u8]) -> Result<()> {
        let buffers = self.buffers()?;
        if out.len() != self.state_size {
            return Err(Error::Range);
        }
        out.copy_from_slice(buffers.undo.peek(self.state_size, index_from_latest)?);
        Ok(())
    }

    /// Copy a redo snapshot; `0` is the most recent.
    pub fn copy_redo_state(&self, index_from_latest: usize, out: &mut [u8]) -> Result<()> {
        let buffers = self.buffers()?;
        if out.len() != self.state_size {
            return Err(Error::Range);
        }
        out.copy_from_slice(buffers.redo.peek(self.state_size, index_from_latest)?);
        Ok(())
    }

    #[must_use]
    pub fn state_size(&self) -> usize {
        self.state_size
    }

    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    #[must_use]
    pub fn reducer(&self) -> &R {
        &self.reducer
    }
}

impl<R> Store<R> {
    /// Release every buffer. Later calls fail [`Error::State`].
    pub fn shutdown(&mut self) -> Result<()> {
        let buffers = self.buffers.take().ok_or(Error::State)?;
        let mut first_error = None;
        let blocks = [buffers.undo.buffer, buffers.redo.buffer]
            .into_iter()
            .flatten()
            .chain([buffers.scratch, buffers.state]);
        for block in blocks {
            if let Err(err) = self.allocator.free(block) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<R> Drop for Store<R> {
    fn drop(&mut self) {
        if self.buffers.is_some() {
            let _ = self.shutdown();
        }
    }
}
