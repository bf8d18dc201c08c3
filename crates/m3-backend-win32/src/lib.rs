// Note: We allow unsafe code on Windows because the backend calls straight into
// user32, gdi32, msimg32 and winhttp. Other targets build without it.
#![cfg_attr(not(windows), forbid(unsafe_code))]
#![doc = "Win32/GDI backend for LibM3C."]
#![doc = ""]
#![doc = "Windows are top-level `HWND`s drawn through a per-window memory DC;"]
#![doc = "textures are DIB sections blitted with `AlphaBlend` or `StretchBlt`;"]
#![doc = "networking is synchronous WinHTTP. On other targets the crate still"]
#![doc = "builds, reports itself unavailable and fails every entry point with"]
#![doc = "`Unsupported`."]

pub mod frame;
pub mod geometry;
pub mod input;
pub mod net;
pub mod pixels;
pub mod style;
pub mod wide;

#[cfg_attr(not(windows), allow(dead_code))]
mod session;

#[cfg(windows)]
mod platform;

use m3_backend::{Backend, BackendConfig, Environment, Graphics, WindowSystem};
#[cfg(windows)]
use m3_core::Error;
use m3_core::Result;

pub use crate::session::LOG_TAG;

/// Settings accepted by [`Win32Backend::create`].
pub type Win32BackendConfig = BackendConfig;

/// Entries in the per-backend input queue.
pub const EVENT_CAPACITY: usize = 256;

/// Native Windows backend instance.
///
/// Every accessor fails with `Error::State` once [`Backend::destroy`] has
/// succeeded.
#[derive(Debug)]
pub struct Win32Backend {
    #[cfg(windows)]
    inner: Option<platform::Win32Device>,
    #[cfg(not(windows))]
    _unsupported: (),
}

impl Win32Backend {
    /// Whether this build can create a backend.
    #[must_use]
    pub const fn is_available() -> bool {
        cfg!(windows)
    }

    /// Default settings: 64 handles, unlimited clipboard, logging and inline
    /// tasks enabled, default allocator.
    #[must_use]
    pub fn config_init() -> Win32BackendConfig {
        BackendConfig::default()
    }

    /// Create a backend and register its window class.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` for a zero handle capacity,
    /// `Error::Unknown` when the window class cannot be registered, and
    /// `Error::Unsupported` on targets other than Windows.
    #[cfg(windows)]
    pub fn create(config: Win32BackendConfig) -> Result<Self> {
        let capacity = config.handle_capacity;
        let device = platform::Win32Device::create(config)?;
        tracing::debug!(
            capacity,
            log_owner = device.session.log_owner,
            alpha_blend = device.has_alpha_blend(),
            "win32 backend created"
        );
        Ok(Self {
            inner: Some(device),
        })
    }

    #[cfg(not(windows))]
    pub fn create(_config: Win32BackendConfig) -> Result<Self> {
        tracing::debug!("win32 backend requested on a non-windows target");
        Err(m3_core::Error::Unsupported)
    }

    /// Whether [`Backend::destroy`] has not yet succeeded.
    #[must_use]
    pub fn is_live(&self) -> bool {
        #[cfg(windows)]
        {
            self.inner.is_some()
        }
        #[cfg(not(windows))]
        {
            false
        }
    }

    /// Number of windows, textures and fonts still registered.
    pub fn live_objects(&self) -> Result<usize> {
        #[cfg(windows)]
        {
            Ok(self.device()?.session.handles.live_count())
        }
        #[cfg(not(windows))]
        {
            Err(m3_core::Error::Unsupported)
        }
    }

    #[cfg(windows)]
    fn device(&self) -> Result<&platform::Win32Device> {
        self.inner.as_ref().ok_or(Error::State)
    }

    #[cfg(windows)]
    fn device_mut(&mut self) -> Result<&mut platform::Win32Device> {
        self.inner.as_mut().ok_or(Error::State)
    }
}

#[cfg(windows)]
impl Backend for Win32Backend {
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
        let live = device.session.handles.live_count();
        let result = device.teardown();
        if result == Err(Error::Busy) && !device.session.handles.is_closed() {
            tracing::debug!(live, "win32 backend destroy refused");
            return result;
        }
        self.inner = None;
        tracing::debug!(ok = result.is_ok(), "win32 backend destroyed");
        result
    }
}

#[cfg(windows)]
impl Drop for Win32Backend {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.destroy();
        }
    }
}

#[cfg(not(windows))]
impl Backend for Win32Backend {
    fn ws(&mut self) -> Result<&mut dyn WindowSystem> {
        Err(m3_core::Error::Unsupported)
    }

    fn gfx(&mut self) -> Result<&mut dyn Graphics> {
        Err(m3_core::Error::Unsupported)
    }

    fn env(&mut self) -> Result<&mut dyn Environment> {
        Err(m3_core::Error::Unsupported)
    }

    fn destroy(&mut self) -> Result<()> {
        Err(m3_core::Error::Unsupported)
    }
}
