#![forbid(unsafe_code)]

//! State shared by every capability of a live null backend.

use m3_backend::{BackendConfig, StubCapabilities};
use m3_core::log::{self, LogLevel};
use m3_core::{Allocator, Block, Error, Handle, HandleTable, Object, Result, SharedAllocator};

/// Tag on every log line written by this backend.
pub const LOG_TAG: &str = "m3.null";

/// Milliseconds the fake clock advances per query.
pub(crate) const TICK_MS: u32 = 16;

#[derive(Debug)]
pub(crate) struct NullDevice {
    pub(crate) allocator: SharedAllocator,
    pub(crate) handles: HandleTable,
    pub(crate) log_enabled: bool,
    pub(crate) log_owner: bool,
    pub(crate) stubs: StubCapabilities,
    pub(crate) time_ms: u32,
    pub(crate) clipboard: Option<Block>,
    pub(crate) clipboard_len: usize,
    pub(crate) clipboard_limit: usize,
}

impl NullDevice {
    pub(crate) fn new(config: BackendConfig) -> Result<Self> {
        config.validate_strict()?;
        let allocator = m3_core::alloc::allocator_or_default(config.allocator);

        let mut log_owner = false;
        if config.enable_logging {
            match log::init() {
                Ok(()) => log_owner = true,
                // Someone else already installed the process logger.
                Err(Error::State) => {}
                Err(err) => return Err(err),
            }
        }

        let handles = match HandleTable::with_capacity(config.handle_capacity) {
            Ok(handles) => handles,
            Err(err) => {
                if log_owner {
                    let _ = log::shutdown();
                }
                return Err(err);
            }
        };

        Ok(Self {
            allocator,
            handles,
            log_enabled: config.enable_logging,
            log_owner,
            stubs: StubCapabilities::new(LOG_TAG, config.enable_logging, config.inline_tasks),
            time_ms: 0,
            clipboard: None,
            clipboard_len: 0,
            clipboard_limit: config.clipboard_limit,
        })
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        if !self.log_enabled {
            return Ok(());
        }
        log::write(level, LOG_TAG, message)
    }

    /// Register a freshly built object, releasing its storage on failure.
    pub(crate) fn register(&mut self, object: Box<dyn Object>) -> Result<Handle> {
        self.handles.register(object).map_err(|err| {
            let _ = err.object.destroy();
            err.error
        })
    }

    pub(crate) fn tick(&mut self) -> u32 {
        self.time_ms = self.time_ms.wrapping_add(TICK_MS);
        self.time_ms
    }

    pub(crate) fn clipboard_text(&self) -> &[u8] {
        match &self.clipboard {
            Some(block) => &block.as_slice()[..self.clipboard_len],
            None => &[],
        }
    }

    /// Store `text` NUL-terminated, growing the buffer only when needed.
    pub(crate) fn store_clipboard(&mut self, text: &[u8]) -> Result<()> {
        if text.len() > self.clipboard_limit {
            return Err(Error::Range);
        }
        let required = text.len().checked_add(1).ok_or(Error::Overflow)?;
        match &mut self.clipboard {
            Some(block) if block.len() >= required => {}
            Some(block) => self.allocator.realloc(block, required)?,
            None => self.clipboard = Some(self.allocator.alloc(required)?),
        }
        let block = self.clipboard.as_mut().ok_or(Error::State)?;
        block[..text.len()].copy_from_slice(text);
        block[text.len()] = 0;
        self.clipboard_len = text.len();
        Ok(())
    }

    /// Tear down in order, attempting every step and keeping the first error.
    ///
    /// A non-empty handle table aborts before anything is released.
    pub(crate) fn teardown(&mut self) -> Result<()> {
        self.handles.shutdown()?;

        let mut first_error = Ok(());
        if let Some(block) = self.clipboard.take() {
            let rc = self.allocator.free(block);
            if first_error.is_ok() {
                first_error = rc;
            }
            self.clipboard_len = 0;
        }
        if self.log_owner {
            let rc = log::shutdown();
            if first_error.is_ok() {
                first_error = rc;
            }
            self.log_owner = false;
        }
        first_error
    }
}
