//! Native half of the backend: window class, `msimg32` and the capability
//! implementations that call into Win32.

mod gdi;
mod http;
mod sys;
mod window;

use std::cell::RefCell;
use std::mem::size_of;
use std::ptr;
use std::rc::Rc;

use m3_backend::{
    BackendConfig, Camera, Environment, EventQueue, Io, Network, Sensors, Tasks,
};
use m3_core::log::LogLevel;
use m3_core::{Error, Result};
use winapi::shared::minwindef::{BOOL, HINSTANCE, HMODULE};
use winapi::shared::windef::HDC;
use winapi::shared::winerror::ERROR_CLASS_ALREADY_EXISTS;
use winapi::um::libloaderapi::{FreeLibrary, GetModuleHandleW, GetProcAddress, LoadLibraryW};
use winapi::um::wingdi::BLENDFUNCTION;
use winapi::um::winuser::{
    CS_HREDRAW, CS_VREDRAW, IDC_ARROW, LoadCursorW, RegisterClassExW, UnregisterClassW,
    WNDCLASSEXW,
};

use crate::EVENT_CAPACITY;
use crate::frame::FrameState;
use crate::session::Session;
use crate::wide::to_wide;

/// `AlphaBlend` as exported by `msimg32.dll`.
type AlphaBlendFn = unsafe extern "system" fn(
    HDC,
    i32,
    i32,
    i32,
    i32,
    HDC,
    i32,
    i32,
    i32,
    i32,
    BLENDFUNCTION,
) -> BOOL;

const WINDOW_CLASS: &str = "LibM3CWindow";

#[derive(Debug)]
pub(crate) struct Win32Device {
    pub(crate) session: Session,
    instance: HINSTANCE,
    class_name: Vec<u16>,
    class_registered: bool,
    msimg32: HMODULE,
    alpha_blend: Option<AlphaBlendFn>,
    queue: Rc<RefCell<EventQueue>>,
    frame: FrameState,
}

impl Win32Device {
    pub(crate) fn create(config: BackendConfig) -> Result<Self> {
        let mut session = Session::open(config)?;
        let parts = to_wide(WINDOW_CLASS)
            .and_then(|class_name| Ok((class_name, EventQueue::with_capacity(EVENT_CAPACITY)?)));
        let (class_name, queue) = match parts {
            Ok(parts) => parts,
            Err(err) => {
                let _ = session.teardown(|| Ok(()));
                return Err(err);
            }
        };

        // SAFETY: a null module name yields the running executable's handle.
        let instance = unsafe { GetModuleHandleW(ptr::null()) };
        let mut device = Self {
            session,
            instance,
            class_name,
            class_registered: false,
            msimg32: ptr::null_mut(),
            alpha_blend: None,
            queue: Rc::new(RefCell::new(queue)),
            frame: FrameState::new(),
        };
        if let Err(err) = device.register_class() {
            let _ = device.teardown();
            return Err(err);
        }
        device.load_alpha_blend();
        Ok(device)
    }

    pub(crate) fn has_alpha_blend(&self) -> bool {
        self.alpha_blend.is_some()
    }

    fn register_class(&mut self) -> Result<()> {
        let class = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window::wndproc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: self.instance,
            hIcon: ptr::null_mut(),
            // SAFETY: loads a shared system cursor; nothing to release.
            hCursor: unsafe { LoadCursorW(ptr::null_mut(), IDC_ARROW) },
            hbrBackground: ptr::null_mut(),
            lpszMenuName: ptr::null(),
            lpszClassName: self.class_name.as_ptr(),
            hIconSm: ptr::null_mut(),
        };
        // SAFETY: `class` and the class name outlive the call.
        if unsafe { RegisterClassExW(&class) } != 0 {
            self.class_registered = true;
            return Ok(());
        }
        let code = sys::last_error();
        if code == ERROR_CLASS_ALREADY_EXISTS {
            return Ok(());
        }
        let detail = sys::error_message(code);
        self.session
            .log_failure("backend.register_class", detail.as_deref());
        Err(Error::Unknown)
    }

    /// Resolve `AlphaBlend`; without it only opaque texture draws work.
    fn load_alpha_blend(&mut self) {
        let Ok(name) = to_wide("msimg32.dll") else {
            return;
        };
        // SAFETY: `name` is NUL-terminated.
        let module = unsafe { LoadLibraryW(name.as_ptr()) };
        if module.is_null() {
            return;
        }
        // SAFETY: `module` is loaded and the symbol name is NUL-terminated.
        let symbol = unsafe { GetProcAddress(module, c"AlphaBlend".as_ptr()) };
        if symbol.is_null() {
            // SAFETY: `module` came from LoadLibraryW above.
            unsafe { FreeLibrary(module) };
            return;
        }
        self.msimg32 = module;
        // SAFETY: msimg32 exports AlphaBlend with exactly this signature.
        self.alpha_blend = Some(unsafe { std::mem::transmute::<_, AlphaBlendFn>(symbol) });
    }

    /// Handle table first (BUSY aborts), then class and library, then the
    /// logger. The first error wins.
    pub(crate) fn teardown(&mut self) -> Result<()> {
        self.session.teardown(|| {
            let mut result = Ok(());
            if self.class_registered {
                // SAFETY: every window of this class went with its handle.
                if unsafe { UnregisterClassW(self.class_name.as_ptr(), self.instance) } == 0 {
                    result = Err(Error::Unknown);
                }
                self.class_registered = false;
            }
            if !self.msimg32.is_null() {
                self.alpha_blend = None;
                // SAFETY: loaded by `load_alpha_blend`; no pointer into it remains.
                unsafe { FreeLibrary(self.msimg32) };
                self.msimg32 = ptr::null_mut();
            }
            result
        })
    }
}

impl Environment for Win32Device {
    fn io(&mut self) -> Result<&mut dyn Io> {
        self.session.log(LogLevel::Info, "env.get_io")?;
        Ok(&mut self.session.stubs)
    }

    fn sensors(&mut self) -> Result<&mut dyn Sensors> {
        self.session.log(LogLevel::Info, "env.get_sensors")?;
        Ok(&mut self.session.stubs)
    }

    fn camera(&mut self) -> Result<&mut dyn Camera> {
        self.session.log(LogLevel::Info, "env.get_camera")?;
        Ok(&mut self.session.stubs)
    }

    fn network(&mut self) -> Result<&mut dyn Network> {
        self.session.log(LogLevel::Info, "env.get_network")?;
        Ok(self)
    }

    fn tasks(&mut self) -> Result<&mut dyn Tasks> {
        self.session.log(LogLevel::Info, "env.get_tasks")?;
        Ok(&mut self.session.stubs)
    }

    fn get_time_ms(&mut self) -> Result<u32> {
        self.session.log(LogLevel::Info, "env.get_time_ms")?;
        Ok(sys::tick_count())
    }
}
