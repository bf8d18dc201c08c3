//! Top-level windows, the window procedure and the clipboard.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::mem::size_of;
use std::ptr;
use std::rc::Rc;

use m3_backend::{
    ClipboardError, EventData, EventQueue, Footprint, InputEvent, WindowConfig, WindowSystem,
    WsConfig, object_type, validate, write_clipboard,
};
use m3_core::log::LogLevel;
use m3_core::{Error, Handle, Object, ObjectHeader, Result};
use winapi::ctypes::c_void;
use winapi::shared::minwindef::{FALSE, LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::{HWND, RECT};
use winapi::um::winbase::{GMEM_MOVEABLE, GlobalAlloc, GlobalFree, GlobalLock, GlobalSize, GlobalUnlock};
use winapi::um::wingdi::{GetDeviceCaps, LOGPIXELSX};
use winapi::um::winuser::{
    AdjustWindowRectEx, BeginPaint, CF_UNICODETEXT, CREATESTRUCTW, CW_USEDEFAULT, CloseClipboard,
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, EmptyClipboard,
    EndPaint, GWL_EXSTYLE, GWL_STYLE, GWLP_USERDATA, GetClientRect, GetClipboardData, GetDC,
    GetSystemMetrics, GetWindowLongPtrW, MSG, OpenClipboard, PAINTSTRUCT, PM_REMOVE,
    PeekMessageW, ReleaseDC, SM_CXSCREEN, SM_CYSCREEN, SW_HIDE, SW_SHOW, SWP_NOACTIVATE,
    SWP_NOMOVE, SWP_NOZORDER, SetClipboardData, SetWindowLongPtrW, SetWindowPos,
    SetWindowTextW, ShowWindow, TranslateMessage, WM_NCCREATE, WM_NCDESTROY, WM_PAINT,
};

use super::Win32Device;
use super::gdi::DibSurface;
use super::sys;
use crate::input::{self, CharDecoder, MessageContext};
use crate::style::WindowStyle;
use crate::wide::{from_wide, to_wide};

/// State the window procedure reaches through `GWLP_USERDATA`.
#[derive(Debug)]
pub(super) struct WindowShared {
    handle: Cell<Handle>,
    hwnd: Cell<HWND>,
    client_size: Cell<(i32, i32)>,
    chars: Cell<CharDecoder>,
    queue: Rc<RefCell<EventQueue>>,
}

impl WindowShared {
    fn new(queue: Rc<RefCell<EventQueue>>, width: i32, height: i32) -> Self {
        Self {
            handle: Cell::new(Handle::NULL),
            hwnd: Cell::new(ptr::null_mut()),
            client_size: Cell::new((width, height)),
            chars: Cell::new(CharDecoder::default()),
            queue,
        }
    }

    /// Queue `event`; a full queue drops it.
    fn push(&self, event: InputEvent) {
        if let Ok(mut queue) = self.queue.try_borrow_mut() {
            let _ = queue.push(event);
        }
    }
}

/// Owns the `HWND`; destroying it runs `WM_NCDESTROY` while the shared
/// state is still alive.
#[derive(Debug)]
struct NativeWindow {
    shared: Rc<WindowShared>,
}

impl Drop for NativeWindow {
    fn drop(&mut self) {
        let hwnd = self.shared.hwnd.get();
        if !hwnd.is_null() {
            // SAFETY: the window was created by this backend and is
            // destroyed exactly once; WM_NCDESTROY clears `hwnd`.
            unsafe { DestroyWindow(hwnd) };
        }
    }
}

#[derive(Debug)]
pub(super) struct Win32Window {
    header: ObjectHeader,
    footprint: Footprint,
    pub(super) surface: Option<DibSurface>,
    native: NativeWindow,
    dpi_scale: f32,
    dpi_override: Option<f32>,
}

impl Win32Window {
    pub(super) fn hwnd(&self) -> HWND {
        self.native.shared.hwnd.get()
    }

    /// Memory DC with a back buffer of exactly `width x height`.
    pub(super) fn ensure_surface(&mut self, width: i32, height: i32) -> Result<&mut DibSurface> {
        match &mut self.surface {
            Some(surface) => surface.resize(width, height)?,
            None => self.surface = Some(DibSurface::new(width, height)?),
        }
        self.surface.as_mut().ok_or(Error::State)
    }

    pub(super) fn set_dpi_scale(&mut self, scale: f32) {
        self.dpi_scale = scale;
    }
}

impl Object for Win32Window {
    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn destroy(self: Box<Self>) -> Result<()> {
        let Win32Window {
            footprint,
            surface,
            native,
            ..
        } = *self;
        drop(surface);
        drop(native);
        footprint.free()
    }
}

/// `LOGPIXELSX / 96`, falling back to 1 when the DC cannot be queried.
fn query_dpi_scale(hwnd: HWND) -> f32 {
    // SAFETY: `hwnd` is a live window; the DC is released below.
    let dc = unsafe { GetDC(hwnd) };
    if dc.is_null() {
        return 1.0;
    }
    // SAFETY: `dc` was just obtained for `hwnd`.
    let dpi = unsafe {
        let dpi = GetDeviceCaps(dc, LOGPIXELSX);
        ReleaseDC(hwnd, dc);
        dpi
    };
    if dpi <= 0 {
        return 1.0;
    }
    dpi as f32 / 96.0
}

/// Outer size for a client area of `width x height` under `style`.
fn outer_size(style: WindowStyle, width: i32, height: i32) -> Result<(i32, i32)> {
    let mut rect = RECT {
        left: 0,
        top: 0,
        right: width,
        bottom: height,
    };
    // SAFETY: `rect` is a valid RECT for the duration of the call.
    if unsafe { AdjustWindowRectEx(&mut rect, style.style, FALSE, style.ex_style) } == 0 {
        return Err(Error::Unknown);
    }
    Ok((rect.right - rect.left, rect.bottom - rect.top))
}

pub(super) unsafe extern "system" fn wndproc(
    hwnd: HWND,
    msg: UINT,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_NCCREATE {
        // SAFETY: for WM_NCCREATE `lparam` is the CREATESTRUCTW built by
        // CreateWindowExW; `lpCreateParams` is null or the window's shared
        // state, kept alive by its `NativeWindow` until WM_NCDESTROY.
        unsafe {
            let create = &*(lparam as *const CREATESTRUCTW);
            let shared = create.lpCreateParams as *const WindowShared;
            if !shared.is_null() {
                (*shared).hwnd.set(hwnd);
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, shared as isize);
            }
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
    }

    // SAFETY: GWLP_USERDATA holds null or the pointer stored at WM_NCCREATE,
    // which stays valid until it is cleared at WM_NCDESTROY.
    let shared = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const WindowShared;
    if shared.is_null() {
        // SAFETY: forwarding the message unchanged.
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }
    // SAFETY: see above; only `Cell`/`RefCell` state is touched.
    let shared = unsafe { &*shared };

    match msg {
        WM_PAINT => {
            // SAFETY: `ps` is plain data filled in by BeginPaint.
            unsafe {
                let mut ps: PAINTSTRUCT = std::mem::zeroed();
                BeginPaint(hwnd, &mut ps);
                EndPaint(hwnd, &ps);
            }
            return 0;
        }
        WM_NCDESTROY => {
            // SAFETY: detaching the shared state from a window being destroyed.
            unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) };
            shared.hwnd.set(ptr::null_mut());
            // SAFETY: forwarding the message unchanged.
            return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
        }
        _ => {}
    }

    let ctx = MessageContext {
        window: shared.handle.get(),
        time_ms: sys::message_time(),
        modifiers: sys::modifiers(),
    };
    let mut chars = shared.chars.get();
    let translated = input::translate(msg, wparam, lparam, ctx, &mut chars);
    shared.chars.set(chars);

    match translated {
        None => {
            // SAFETY: forwarding the message unchanged.
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        }
        Some(event) => {
            if let Some(event) = event {
                if let EventData::Window(resized) = event.data {
                    shared.client_size.set((resized.width, resized.height));
                }
                shared.push(event);
            }
            0
        }
    }
}

fn pump_messages() {
    // SAFETY: MSG is plain data; PeekMessageW fills it before use.
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Open clipboard, closed on drop.
struct ClipboardGuard;

impl ClipboardGuard {
    fn open() -> Result<Self> {
        // SAFETY: no owner window; another process holding it makes this fail.
        if unsafe { OpenClipboard(ptr::null_mut()) } == 0 {
            return Err(Error::State);
        }
        Ok(Self)
    }
}

impl Drop for ClipboardGuard {
    fn drop(&mut self) {
        // SAFETY: paired with the successful OpenClipboard in `open`.
        unsafe { CloseClipboard() };
    }
}

impl Win32Device {
    pub(super) fn window(&self, window: Handle) -> Result<&Win32Window> {
        self.session
            .handles
            .get::<Win32Window>(window, object_type::WINDOW)
    }

    pub(super) fn window_mut(&mut self, window: Handle) -> Result<&mut Win32Window> {
        self.session
            .handles
            .get_mut::<Win32Window>(window, object_type::WINDOW)
    }

    fn open_native(&self, window: &Win32Window, config: &WindowConfig<'_>) -> Result<HWND> {
        let style = WindowStyle::from_flags(config.flags);
        let (width, height) = if WindowStyle::covers_screen(config.flags) {
            // SAFETY: no preconditions.
            unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
        } else {
            outer_size(style, config.width, config.height)?
        };
        let title = to_wide(config.title)?;

        // SAFETY: class name and title are NUL-terminated; the create
        // parameter points at state owned by `window.native`, which
        // destroys the HWND before releasing it.
        let hwnd = unsafe {
            CreateWindowExW(
                style.ex_style,
                self.class_name.as_ptr(),
                title.as_ptr(),
                style.style,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                width,
                height,
                ptr::null_mut(),
                ptr::null_mut(),
                self.instance,
                Rc::as_ptr(&window.native.shared) as *mut c_void,
            )
        };
        if hwnd.is_null() {
            self.session.log_last_error("ws.create_window");
            return Err(Error::Unknown);
        }
        window.native.shared.hwnd.set(hwnd);
        Ok(hwnd)
    }
}

impl WindowSystem for Win32Device {
    fn init(&mut self, _config: &WsConfig<'_>) -> Result<()> {
        self.session.log(LogLevel::Info, "ws.init")
    }

    fn shutdown(&mut self) -> Result<()> {
        self.session.log(LogLevel::Info, "ws.shutdown")
    }

    fn create_window(&mut self, config: &WindowConfig<'_>) -> Result<Handle> {
        validate::positive_size(config.width, config.height)?;
        self.session.log(LogLevel::Info, "ws.create_window")?;

        let shared = Rc::new(WindowShared::new(
            self.queue.clone(),
            config.width,
            config.height,
        ));
        let mut window = Win32Window {
            header: ObjectHeader::new(object_type::WINDOW, 0),
            footprint: Footprint::alloc(&self.session.allocator, size_of::<Win32Window>())?,
            surface: None,
            native: NativeWindow {
                shared: shared.clone(),
            },
            dpi_scale: 1.0,
            dpi_override: None,
        };
        match self.open_native(&window, config) {
            Ok(hwnd) => window.dpi_scale = query_dpi_scale(hwnd),
            Err(err) => {
                let _ = Box::new(window).destroy();
                return Err(err);
            }
        }

        let handle = self.session.register(Box::new(window))?;
        shared.handle.set(handle);
        Ok(handle)
    }

    fn destroy_window(&mut self, window: Handle) -> Result<()> {
        self.window(window)?;
        self.session.log(LogLevel::Info, "ws.destroy_window")?;
        if self.frame.is_active(window) {
            self.frame.end();
        }
        self.session.handles.release(window)
    }

    fn show_window(&mut self, window: Handle) -> Result<()> {
        let hwnd = self.window(window)?.hwnd();
        self.session.log(LogLevel::Info, "ws.show_window")?;
        // SAFETY: `hwnd` belongs to a live window object.
        unsafe { ShowWindow(hwnd, SW_SHOW) };
        Ok(())
    }

    fn hide_window(&mut self, window: Handle) -> Result<()> {
        let hwnd = self.window(window)?.hwnd();
        self.session.log(LogLevel::Info, "ws.hide_window")?;
        // SAFETY: `hwnd` belongs to a live window object.
        unsafe { ShowWindow(hwnd, SW_HIDE) };
        Ok(())
    }

    fn set_window_title(&mut self, window: Handle, title: &str) -> Result<()> {
        let hwnd = self.window(window)?.hwnd();
        self.session.log(LogLevel::Info, "ws.set_window_title")?;
        let title = to_wide(title)?;
        // SAFETY: `title` is NUL-terminated and outlives the call.
        if unsafe { SetWindowTextW(hwnd, title.as_ptr()) } == 0 {
            return Err(Error::Unknown);
        }
        Ok(())
    }

    fn set_window_size(&mut self, window: Handle, width: i32, height: i32) -> Result<()> {
        validate::positive_size(width, height)?;
        let resolved = self.window(window)?;
        let hwnd = resolved.hwnd();
        let shared = resolved.native.shared.clone();
        self.session.log(LogLevel::Info, "ws.set_window_size")?;

        // SAFETY: `hwnd` belongs to a live window object.
        let style = unsafe {
            WindowStyle {
                style: GetWindowLongPtrW(hwnd, GWL_STYLE) as u32,
                ex_style: GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32,
            }
        };
        let (outer_width, outer_height) = outer_size(style, width, height)?;
        // SAFETY: as above; only the size changes.
        let moved = unsafe {
            SetWindowPos(
                hwnd,
                ptr::null_mut(),
                0,
                0,
                outer_width,
                outer_height,
                SWP_NOZORDER | SWP_NOMOVE | SWP_NOACTIVATE,
            )
        };
        if moved == 0 {
            return Err(Error::Unknown);
        }
        shared.client_size.set((width, height));
        Ok(())
    }

    fn get_window_size(&mut self, window: Handle) -> Result<(i32, i32)> {
        let resolved = self.window(window)?;
        let hwnd = resolved.hwnd();
        let shared = resolved.native.shared.clone();
        self.session.log(LogLevel::Info, "ws.get_window_size")?;

        let mut rect = RECT {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        };
        // SAFETY: `rect` is valid for writes during the call.
        if unsafe { GetClientRect(hwnd, &mut rect) } == 0 {
            return Err(Error::Unknown);
        }
        let size = (rect.right - rect.left, rect.bottom - rect.top);
        shared.client_size.set(size);
        Ok(size)
    }

    fn set_window_dpi_scale(&mut self, window: Handle, scale: f32) -> Result<()> {
        validate::dpi_scale(scale)?;
        self.window(window)?;
        self.session.log(LogLevel::Info, "ws.set_window_dpi_scale")?;
        self.window_mut(window)?.dpi_override = Some(scale);
        Ok(())
    }

    fn get_window_dpi_scale(&mut self, window: Handle) -> Result<f32> {
        self.window(window)?;
        self.session.log(LogLevel::Info, "ws.get_window_dpi_scale")?;
        let resolved = self.window_mut(window)?;
        if let Some(scale) = resolved.dpi_override {
            return Ok(scale);
        }
        resolved.dpi_scale = query_dpi_scale(resolved.hwnd());
        Ok(resolved.dpi_scale)
    }

    fn set_clipboard_text(&mut self, text: &str) -> Result<()> {
        self.session.log(LogLevel::Info, "ws.set_clipboard_text")?;
        if text.len() > self.session.clipboard_limit {
            return Err(Error::Range);
        }
        let wide = to_wide(text)?;
        let bytes = wide.len() * size_of::<u16>();

        let _clipboard = ClipboardGuard::open()?;
        // SAFETY: the clipboard is open; ownership of `memory` passes to the
        // system only when SetClipboardData succeeds, otherwise it is freed.
        unsafe {
            EmptyClipboard();
            let memory = GlobalAlloc(GMEM_MOVEABLE, bytes);
            if memory.is_null() {
                return Err(Error::OutOfMemory);
            }
            let dest = GlobalLock(memory) as *mut u16;
            if dest.is_null() {
                GlobalFree(memory);
                return Err(Error::Unknown);
            }
            ptr::copy_nonoverlapping(wide.as_ptr(), dest, wide.len());
            GlobalUnlock(memory);
            if SetClipboardData(CF_UNICODETEXT, memory).is_null() {
                GlobalFree(memory);
                return Err(Error::Unknown);
            }
        }
        Ok(())
    }

    fn get_clipboard_text(&mut self, buffer: &mut [u8]) -> Result<usize, ClipboardError> {
        self.session.log(LogLevel::Info, "ws.get_clipboard_text")?;
        let _clipboard = ClipboardGuard::open()?;

        // SAFETY: the clipboard is open; the data handle is only read while
        // locked and belongs to the system.
        let text = unsafe {
            let memory = GetClipboardData(CF_UNICODETEXT);
            if memory.is_null() {
                return write_clipboard(b"", buffer);
            }
            let units = GlobalLock(memory) as *const u16;
            if units.is_null() {
                return Err(Error::Unknown.into());
            }
            let len = GlobalSize(memory) / size_of::<u16>();
            let text = from_wide(std::slice::from_raw_parts(units, len));
            GlobalUnlock(memory);
            text
        };
        write_clipboard(text.as_bytes(), buffer)
    }

    fn poll_event(&mut self) -> Result<Option<InputEvent>> {
        self.session.log(LogLevel::Debug, "ws.poll_event")?;
        let empty = self.queue.borrow().is_empty();
        if empty {
            pump_messages();
        }
        Ok(self.queue.borrow_mut().pop())
    }

    fn pump_events(&mut self) -> Result<()> {
        self.session.log(LogLevel::Debug, "ws.pump_events")?;
        pump_messages();
        Ok(())
    }

    fn get_time_ms(&mut self) -> Result<u32> {
        self.session.log(LogLevel::Debug, "ws.get_time_ms")?;
        Ok(sys::tick_count())
    }
}
