#![forbid(unsafe_code)]

//! Reference-counted objects addressed through generation-tagged handles.
//!
//! A [`HandleTable`] owns every registered object. Callers hold plain
//! [`Handle`] values (`{id, generation}`) which are checked on every lookup,
//! so a handle that outlived its object is rejected instead of aliasing
//! whatever reused the slot.
//!
//! ```text
//! slot index:   0        1        2        3
//!             ┌────────┬────────┬────────┬────────┐
//! generation  │   3    │   1    │   2    │   1    │
//! object      │ Window │  --    │ Font   │  --    │
//!             └────────┴────────┴────────┴────────┘
//! free list:  1 -> 3
//!
//! Handle { id: 1, generation: 3 } resolves to the window.
//! Handle { id: 1, generation: 2 } is stale -> InvalidArgument.
//! ```
//!
//! # Invariants
//!
//! - `Handle::NULL` (`{0, 0}`) never resolves.
//! - A slot's generation is never 0 and changes on every unregister.
//! - A registered object's header carries exactly the handle that resolves it.
//! - `live_count()` equals the number of occupied slots.

use core::any::Any;
use core::fmt;

use thiserror::Error;

use crate::error::{Error, Result};

/// Generation-tagged reference to a registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    pub id: u32,
    pub generation: u32,
}

impl Handle {
    /// The unregistered sentinel.
    pub const NULL: Handle = Handle {
        id: 0,
        generation: 0,
    };

    #[must_use]
    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.id == 0 && self.generation == 0
    }

    /// Structural check only; liveness is decided by the table.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.id != 0 && self.generation != 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.generation)
    }
}

/// Bookkeeping shared by every object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    handle: Handle,
    type_id: u32,
    flags: u32,
    ref_count: u32,
}

impl ObjectHeader {
    /// An unregistered header holding one reference.
    #[must_use]
    pub const fn new(type_id: u32, flags: u32) -> Self {
        Self {
            handle: Handle::NULL,
            type_id,
            flags,
            ref_count: 1,
        }
    }

    /// Header with an explicit initial reference count; zero is rejected.
    pub fn with_ref_count(type_id: u32, flags: u32, ref_count: u32) -> Result<Self> {
        if ref_count == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            ref_count,
            ..Self::new(type_id, flags)
        })
    }

    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    #[must_use]
    pub const fn type_id(&self) -> u32 {
        self.type_id
    }

    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    #[must_use]
    pub const fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn retain(&mut self) -> Result<()> {
        if self.ref_count == 0 {
            return Err(Error::State);
        }
        self.ref_count = self.ref_count.checked_add(1).ok_or(Error::Overflow)?;
        Ok(())
    }

    /// Drop one reference. Returns `true` when the count reached zero.
    pub fn release(&mut self) -> Result<bool> {
        if self.ref_count == 0 {
            return Err(Error::State);
        }
        self.ref_count -= 1;
        Ok(self.ref_count == 0)
    }
}

/// Anything that can live in a [`HandleTable`].
pub trait Object: Any + fmt::Debug {
    fn header(&self) -> &ObjectHeader;

    fn header_mut(&mut self) -> &mut ObjectHeader;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Release resources once the last reference is gone.
    ///
    /// Called after the object has left its table.
    fn destroy(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    /// Type tag recorded in the header.
    fn object_type(&self) -> u32 {
        self.header().type_id()
    }
}

/// Registration failure; hands the rejected object back to the caller.
#[derive(Debug, Error)]
#[error("object registration failed: {error}")]
pub struct RegisterError {
    pub error: Error,
    pub object: Box<dyn Object>,
}

impl From<RegisterError> for Error {
    fn from(err: RegisterError) -> Self {
        err.error
    }
}

#[derive(Debug)]
struct Slot {
    object: Option<Box<dyn Object>>,
    generation: u32,
    next_free: Option<u32>,
}

/// Fixed-capacity table of live objects.
#[derive(Debug)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
    closed: bool,
}

impl HandleTable {
    /// Create a table with room for `capacity` objects.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for zero, [`Error::Range`] when the
    /// capacity exceeds the id space, [`Error::OutOfMemory`] when the slot
    /// array cannot be reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument);
        }
        let capacity_u32 = u32::try_from(capacity).map_err(|_| Error::Range)?;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        for index in 0..capacity_u32 {
            let next = index + 1;
            slots.push(Slot {
                object: None,
                generation: 1,
                next_free: (next < capacity_u32).then_some(next),
            });
        }
        Ok(Self {
            slots,
            free_head: Some(0),
            live: 0,
            closed: false,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take ownership of `object` and assign it a live handle.
    pub fn register(&mut self, mut object: Box<dyn Object>) -> Result<Handle, RegisterError> {
        if self.closed || !object.header().handle().is_null() {
            return Err(RegisterError {
                error: Error::State,
                object,
            });
        }
        let Some(index) = self.free_head else {
            return Err(RegisterError {
                error: Error::OutOfMemory,
                object,
            });
        };
        let slot = &mut self.slots[index as usize];
        let handle = Handle::new(index + 1, slot.generation);
        self.free_head = slot.next_free.take();
        object.header_mut().handle = handle;
        slot.object = Some(object);
        self.live += 1;
        Ok(handle)
    }

    fn slot_index(&self, handle: Handle) -> Result<usize> {
        if handle.id == 0 {
            return Err(Error::InvalidArgument);
        }
        let index = (handle.id - 1) as usize;
        let slot = self.slots.get(index).ok_or(Error::InvalidArgument)?;
        if slot.object.is_none() || slot.generation != handle.generation {
            return Err(Error::InvalidArgument);
        }
        Ok(index)
    }

    /// Remove an object from the table without destroying it.
    pub fn unregister(&mut self, handle: Handle) -> Result<Box<dyn Object>> {
        let index = self.slot_index(handle)?;
        let slot = &mut self.slots[index];
        let mut object = slot.object.take().ok_or(Error::InvalidArgument)?;
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        slot.next_free = self.free_head;
        self.free_head = Some(handle.id - 1);
        self.live -= 1;
        object.header_mut().handle = Handle::NULL;
        Ok(object)
    }

    pub fn resolve(&self, handle: Handle) -> Result<&dyn Object> {
        let index = self.slot_index(handle)?;
        self.slots[index]
            .object
            .as_deref()
            .ok_or(Error::InvalidArgument)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Result<&mut dyn Object> {
        let index = self.slot_index(handle)?;
        self.slots[index]
            .object
            .as_deref_mut()
            .ok_or(Error::InvalidArgument)
    }

    /// Resolve and check the header type tag, then downcast.
    pub fn get<T: Object>(&self, handle: Handle, type_id: u32) -> Result<&T> {
        let object = self.resolve(handle)?;
        if object.header().type_id() != type_id {
            return Err(Error::InvalidArgument);
        }
        object
            .as_any()
            .downcast_ref::<T>()
            .ok_or(Error::InvalidArgument)
    }

    pub fn get_mut<T: Object>(&mut self, handle: Handle, type_id: u32) -> Result<&mut T> {
        let object = self.resolve_mut(handle)?;
        if object.header().type_id() != type_id {
            return Err(Error::InvalidArgument);
        }
        object
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(Error::InvalidArgument)
    }

    pub fn retain(&mut self, handle: Handle) -> Result<()> {
        self.resolve_mut(handle)?.header_mut().retain()
    }

    /// Drop one reference; the last one unregisters and destroys the object.
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        let reached_zero = self.resolve_mut(handle)?.header_mut().release()?;
        if reached_zero {
            self.unregister(handle)?.destroy()?;
        }
        Ok(())
    }

    /// Close the table. Fails [`Error::Busy`] while objects are registered.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::State);
        }
        if self.live != 0 {
            return Err(Error::Busy);
        }
        self.closed = true;
        self.free_head = None;
        self.slots = Vec::new();
        Ok(())
    }
}
