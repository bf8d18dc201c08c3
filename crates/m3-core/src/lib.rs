#![forbid(unsafe_code)]

//! Core runtime pieces for LibM3C.
//!
//! - [`error`]: the shared error code space.
//! - [`alloc`]: pluggable allocator and owned byte blocks.
//! - [`object`]: reference-counted objects behind generation-tagged handles.
//! - [`log`]: the process-wide log sink used by backends.
//! - [`arena`]: block-based linear allocator.
//! - [`store`]: reducer-driven state store with undo/redo.

pub mod alloc;
pub mod arena;
pub mod error;
pub mod log;
pub mod object;
pub mod store;

pub use alloc::{Allocator, Block, SharedAllocator, SystemAllocator, default_allocator};
pub use arena::{Arena, ArenaStats};
pub use error::{Error, Result};
pub use log::{LogLevel, LogSink};
pub use object::{Handle, HandleTable, Object, ObjectHeader, RegisterError};
pub use store::{Action, Reducer, Store, StoreConfig};
