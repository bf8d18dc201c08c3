#![forbid(unsafe_code)]
#![doc = "Null backend for LibM3C."]
#![doc = ""]
#![doc = "Implements every `m3-backend` capability without touching the operating"]
#![doc = "system: windows, textures and fonts are bookkeeping entries in a handle"]
#![doc = "table, drawing validates and logs, and OS services report `Unsupported`."]
#![doc = "Use it for headless tests and to exercise the interface contract."]

mod device;
mod env;
mod gfx;
mod objects;
mod ws;

use m3_backend::{Backend, BackendConfig, Environment, Graphics, WindowSystem};
use m3_core::{Error, Handle, Result};

use crate::device::NullDevice;

pub use crate::device::LOG_TAG;

/// Settings accepted by [`NullBackend::create`].
pub type NullBackendConfig = BackendConfig;

/// In-memory backend instance.
///
/// Every accessor fails with [`Error::State`] once [`Backend::destroy`] has
/// succeeded.
#[derive(Debug)]
pub struct NullBackend {
    inner: Option<NullDevice>,
}

impl NullBackend {
    /// The null backend runs everywhere.
    #[must_use]
    pub const fn is_available() -> bool {
        true
    }

    /// Default settings: 64 handles, unlimited clipboard, logging and inline
    /// tasks enabled, default allocator.
    #[must_use]
    pub fn config_init() -> NullBackendConfig {
        BackendConfig::default()
    }

    /// Create a backend.
    ///
    /// With logging enabled the process logger is initialized and owned by
    /// this backend unless it was already running.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a zero handle capacity, [`Error::Range`]
    /// for one past `u32::MAX`, or whatever the logger setup reports.
    pub fn create(config: NullBackendConfig) -> Result<Self> {
        let capacity = config.handle_capacity;
        let device = NullDevice::new(config)?;
        tracing::debug!(
            capacity,
            log_owner = device.log_owner,
            "null backend created"
        );
        Ok(Self {
            inner: Some(device),
        })
    }

    /// Whether [`Backend::destroy`] has not yet succeeded.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.is_some()
    }

    /// Number of windows, textures and fonts still registered.
    pub fn live_objects(&self) -> Result<usize> {
        Ok(self.device()?.handles.live_count())
    }

    pub fn window_visible(&self, window: Handle) -> Result<bool> {
        self.device()?.window_visible(window)
    }

    fn device(&self) -> Result<&NullDevice> {
        self.inner.as_ref().ok_or(Error::State)
    }

    fn device_mut(&mut self) -> Result<&mut NullDevice> {
        self.inner.as_mut().ok_or(Error::State)
    }
}

impl Backend for NullBackend {
    fn ws(&mut self) -> Result<&mut dyn WindowSystem> {
        Ok(self.device_mut()?)
    }

    fn gfx(&mut self) -> Result<&mut dyn Graphics> {
        Ok(self.device_mut()?)
    }

    fn env(&mut self) -> Result<&mut dyn Environment> {
        Ok(self.device_mut()?)
    }

    fn destroy(&mut self) -> Result<()> {
        let device = self.device_mut()?;
        let live = device.handles.live_count();
        let result = device.teardown();
        if result == Err(Error::Busy) && !device.handles.is_closed() {
            tracing::debug!(live, "null backend destroy refused");
            return result;
        }
        self.inner = None;
        tracing::debug!(ok = result.is_ok(), "null backend destroyed");
        result
    }
}

impl Drop for NullBackend {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m3_backend::WindowConfig;

    fn quiet() -> NullBackend {
        NullBackend::create(NullBackend::config_init().with_logging(false)).unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = NullBackend::config_init()
            .with_logging(false)
            .with_handle_capacity(0);
        assert_eq!(NullBackend::create(config).unwrap_err(), Error::InvalidArgument);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn capacity_beyond_handle_index_is_out_of_range() {
        let config = NullBackend::config_init()
            .with_logging(false)
            .with_handle_capacity(u32::MAX as usize + 1);
        assert_eq!(NullBackend::create(config).unwrap_err(), Error::Range);
    }

    #[test]
    fn destroy_with_live_window_is_busy_and_recoverable() {
        let mut backend = quiet();
        let window = backend
            .ws()
            .unwrap()
            .create_window(&WindowConfig::new(10, 10, "w"))
            .unwrap();
        assert_eq!(backend.destroy(), Err(Error::Busy));
        assert!(backend.is_live());
        assert_eq!(backend.live_objects(), Ok(1));
        backend.ws().unwrap().destroy_window(window).unwrap();
        assert_eq!(backend.destroy(), Ok(()));
        assert!(!backend.is_live());
    }

    #[test]
    fn accessors_fail_after_destroy() {
        let mut backend = quiet();
        backend.destroy().unwrap();
        assert_eq!(backend.ws().err(), Some(Error::State));
        assert_eq!(backend.gfx().err(), Some(Error::State));
        assert_eq!(backend.env().err(), Some(Error::State));
        assert_eq!(backend.destroy(), Err(Error::State));
        assert_eq!(backend.live_objects(), Err(Error::State));
    }

    #[test]
    fn capacity_bounds_live_objects() {
        let mut backend = NullBackend::create(
            NullBackend::config_init()
                .with_logging(false)
                .with_handle_capacity(4),
        )
        .unwrap();
        let ws = backend.ws().unwrap();
        let windows: Vec<_> = (0..4)
            .map(|_| ws.create_window(&WindowConfig::new(4, 4, "w")).unwrap())
            .collect();
        assert_eq!(
            ws.create_window(&WindowConfig::new(4, 4, "w")),
            Err(Error::OutOfMemory)
        );
        for window in windows {
            ws.destroy_window(window).unwrap();
        }
        backend.destroy().unwrap();
    }
}
