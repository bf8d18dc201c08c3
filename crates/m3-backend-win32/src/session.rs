#![forbid(unsafe_code)]

//! Backend state that does not depend on Win32: the allocator, handle table
//! and logger ownership, plus the capabilities that never reach the OS.

use m3_backend::{BackendConfig, StubCapabilities};
use m3_core::log::{self, LogLevel};
use m3_core::{Error, Handle, HandleTable, Object, Result, SharedAllocator};

/// Tag on every log line written by this backend.
pub const LOG_TAG: &str = "m3.win32";

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) allocator: SharedAllocator,
    pub(crate) handles: HandleTable,
    pub(crate) log_enabled: bool,
    pub(crate) log_owner: bool,
    pub(crate) stubs: StubCapabilities,
    pub(crate) clipboard_limit: usize,
}

impl Session {
    pub(crate) fn open(config: BackendConfig) -> Result<Self> {
        config.validate_strict()?;
        let allocator = m3_core::alloc::allocator_or_default(config.allocator);

        let mut log_owner = false;
        if config.enable_logging {
            match log::init() {
                Ok(()) => log_owner = true,
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
            clipboard_limit: config.clipboard_limit,
        })
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        if !self.log_enabled {
            return Ok(());
        }
        log::write(level, LOG_TAG, message)
    }

    /// Report a failed OS call at ERROR, followed by the system's text for
    /// it when there is one. Logging errors are dropped: the caller is
    /// already returning the original failure.
    pub(crate) fn log_failure(&self, operation: &str, detail: Option<&str>) {
        let _ = self.log(LogLevel::Error, operation);
        if let Some(detail) = detail {
            let _ = self.log(LogLevel::Error, &format!("{operation}: {detail}"));
        }
    }

    /// Register a freshly built object, releasing its storage on failure.
    pub(crate) fn register(&mut self, object: Box<dyn Object>) -> Result<Handle> {
        self.handles.register(object).map_err(|err| {
            let _ = err.object.destroy();
            err.error
        })
    }

    /// Shut down in order, keeping the first error.
    ///
    /// Live objects abort with [`Error::Busy`] before anything else runs.
    /// `release` frees the platform resources between the handle table and
    /// the logger.
    pub(crate) fn teardown(&mut self, release: impl FnOnce() -> Result<()>) -> Result<()> {
        self.handles.shutdown()?;

        let mut first_error = release();
        if self.log_owner {
            let rc = log::shutdown();
            if first_error.is_ok() {
                first_error = rc;
            }
            self.log_owner = false;
        }
        first_error
    }}
