#![forbid(unsafe_code)]
#![doc = "Backend capability traits for LibM3C: window system, graphics, text and environment."]
#![doc = ""]
#![doc = "This crate defines the boundary between the toolkit core and platform"]
#![doc = "implementations (`m3-backend-null`, `m3-backend-win32`). Every operation"]
#![doc = "returns `m3_core::Result`; arguments are validated before any side effect."]

pub mod config;
pub mod event;
pub mod stub;
pub mod types;
pub mod validate;

use thiserror::Error;

use m3_core::{Allocator, Block, Error, Handle, Result};

pub use config::{BackendConfig, DEFAULT_HANDLE_CAPACITY};
pub use event::{
    EventData, EventQueue, InputEvent, InputKind, KeyEvent, PointerEvent, TextEditEvent,
    TextEvent, WindowEvent,
};
pub use stub::{Footprint, StubCapabilities};
pub use types::{
    CAMERA_ID_DEFAULT, CameraConfig, CameraFacing, CameraFormat, CameraFrame, Color, FileInfo,
    Mat3, Modifiers, NetworkRequest, NetworkResponse, Path, PathCommand, Rect, SensorReading,
    SensorType, Task, TextMetrics, TextureFormat, ThreadEntry, WindowConfig, WindowFlags,
    WsConfig,
};

/// Object type tags shared by backend objects.
pub mod object_type {
    pub const WINDOW: u32 = 1;
    pub const TEXTURE: u32 = 2;
    pub const FONT: u32 = 3;
}

/// Clipboard read into a buffer that cannot hold the text.
///
/// `required` is the text length in bytes; the buffer needs one extra byte
/// for the terminating NUL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("clipboard read failed: {error} (text is {required} bytes)")]
pub struct ClipboardError {
    pub error: Error,
    pub required: usize,
}

impl From<Error> for ClipboardError {
    fn from(error: Error) -> Self {
        Self { error, required: 0 }
    }
}

impl From<ClipboardError> for Error {
    fn from(err: ClipboardError) -> Self {
        err.error
    }
}

/// Windows, clipboard, input and time.
pub trait WindowSystem {
    fn init(&mut self, config: &WsConfig<'_>) -> Result<()>;

    fn shutdown(&mut self) -> Result<()>;

    fn create_window(&mut self, config: &WindowConfig<'_>) -> Result<Handle>;

    /// Drop the caller's reference; the window is destroyed with the last one.
    fn destroy_window(&mut self, window: Handle) -> Result<()>;

    fn show_window(&mut self, window: Handle) -> Result<()>;

    fn hide_window(&mut self, window: Handle) -> Result<()>;

    fn set_window_title(&mut self, window: Handle, title: &str) -> Result<()>;

    fn set_window_size(&mut self, window: Handle, width: i32, height: i32) -> Result<()>;

    fn get_window_size(&mut self, window: Handle) -> Result<(i32, i32)>;

    fn set_window_dpi_scale(&mut self, window: Handle, scale: f32) -> Result<()>;

    fn get_window_dpi_scale(&mut self, window: Handle) -> Result<f32>;

    fn set_clipboard_text(&mut self, text: &str) -> Result<()>;

    /// Copy the clipboard text plus a NUL terminator into `buffer` and
    /// return the text length.
    fn get_clipboard_text(&mut self, buffer: &mut [u8]) -> Result<usize, ClipboardError>;

    fn poll_event(&mut self) -> Result<Option<InputEvent>>;

    fn pump_events(&mut self) -> Result<()>;

    fn get_time_ms(&mut self) -> Result<u32>;
}

/// Frame-based 2D drawing.
pub trait Graphics {
    fn begin_frame(&mut self, window: Handle, width: i32, height: i32, dpi_scale: f32)
    -> Result<()>;

    fn end_frame(&mut self, window: Handle) -> Result<()>;

    fn clear(&mut self, color: Color) -> Result<()>;

    fn draw_rect(&mut self, rect: &Rect, color: Color, corner_radius: f32) -> Result<()>;

    #[allow(clippy::too_many_arguments)]
    fn draw_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: Color,
        thickness: f32,
    ) -> Result<()>;

    fn draw_path(&mut self, path: &Path, color: Color) -> Result<()>;

    fn push_clip(&mut self, rect: &Rect) -> Result<()>;

    fn pop_clip(&mut self) -> Result<()>;

    fn set_transform(&mut self, transform: &Mat3) -> Result<()>;

    /// `format` is a [`TextureFormat`] value; `pixels` may be empty.
    fn create_texture(&mut self, width: i32, height: i32, format: u32, pixels: &[u8])
    -> Result<Handle>;

    #[allow(clippy::too_many_arguments)]
    fn update_texture(
        &mut self,
        texture: Handle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        pixels: &[u8],
    ) -> Result<()>;

    fn destroy_texture(&mut self, texture: Handle) -> Result<()>;

    fn draw_texture(&mut self, texture: Handle, src: &Rect, dst: &Rect, opacity: f32)
    -> Result<()>;

    /// Text rendering shares the graphics context.
    fn text(&mut self) -> &mut dyn Text;
}

/// Fonts and text drawing.
pub trait Text {
    fn create_font(&mut self, family: &str, size_px: i32, weight: i32, italic: bool)
    -> Result<Handle>;

    fn destroy_font(&mut self, font: Handle) -> Result<()>;

    fn measure_text(&mut self, font: Handle, text: &str) -> Result<TextMetrics>;

    fn draw_text(&mut self, font: Handle, text: &str, x: f32, y: f32, color: Color) -> Result<()>;
}

/// File access.
pub trait Io {
    /// Read into `buffer`, returning the byte count.
    fn read_file(&mut self, path: &str, buffer: &mut [u8]) -> Result<usize>;

    fn read_file_alloc(&mut self, path: &str, allocator: &dyn Allocator) -> Result<Block>;

    fn write_file(&mut self, path: &str, data: &[u8], overwrite: bool) -> Result<()>;

    fn file_exists(&mut self, path: &str) -> Result<bool>;

    fn delete_file(&mut self, path: &str) -> Result<()>;

    fn stat_file(&mut self, path: &str) -> Result<FileInfo>;
}

pub trait Sensors {
    fn is_available(&mut self, sensor: SensorType) -> Result<bool>;

    fn start(&mut self, sensor: SensorType) -> Result<()>;

    fn stop(&mut self, sensor: SensorType) -> Result<()>;

    fn read(&mut self, sensor: SensorType) -> Result<Option<SensorReading>>;
}

pub trait Camera {
    fn open(&mut self, camera_id: u32) -> Result<()>;

    fn open_with_config(&mut self, config: &CameraConfig) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn read_frame(&mut self) -> Result<Option<CameraFrame<'_>>>;
}

/// Synchronous HTTP.
pub trait Network {
    /// Perform `request`; the response body is allocated with `allocator`.
    fn request(
        &mut self,
        request: &NetworkRequest<'_>,
        allocator: &dyn Allocator,
    ) -> Result<NetworkResponse>;

    /// Return the body to `allocator` and reset the response.
    fn free_response(
        &mut self,
        allocator: &dyn Allocator,
        response: &mut NetworkResponse,
    ) -> Result<()>;
}

/// Threads, mutexes and task posting.
pub trait Tasks {
    fn thread_create(&mut self, entry: ThreadEntry) -> Result<Handle>;

    fn thread_join(&mut self, thread: Handle) -> Result<()>;

    fn mutex_create(&mut self) -> Result<Handle>;

    fn mutex_destroy(&mut self, mutex: Handle) -> Result<()>;

    fn mutex_lock(&mut self, mutex: Handle) -> Result<()>;

    fn mutex_unlock(&mut self, mutex: Handle) -> Result<()>;

    fn sleep_ms(&mut self, ms: u32) -> Result<()>;

    fn post(&mut self, task: Task) -> Result<()>;

    fn post_delayed(&mut self, task: Task, delay_ms: u32) -> Result<()>;
}

/// Access to the environment capabilities.
pub trait Environment {
    fn io(&mut self) -> Result<&mut dyn Io>;

    fn sensors(&mut self) -> Result<&mut dyn Sensors>;

    fn camera(&mut self) -> Result<&mut dyn Camera>;

    fn network(&mut self) -> Result<&mut dyn Network>;

    fn tasks(&mut self) -> Result<&mut dyn Tasks>;

    fn get_time_ms(&mut self) -> Result<u32>;
}

/// A backend instance bundling the three capability groups.
///
/// After [`destroy`](Backend::destroy) succeeds every accessor fails with
/// [`Error::State`].
pub trait Backend {
    fn ws(&mut self) -> Result<&mut dyn WindowSystem>;

    fn gfx(&mut self) -> Result<&mut dyn Graphics>;

    fn env(&mut self) -> Result<&mut dyn Environment>;

    /// Tear the backend down. Fails [`Error::Busy`] (and stays usable) while
    /// windows, textures or fonts are still alive.
    fn destroy(&mut self) -> Result<()>;
}

/// Copy `text` plus a NUL terminator into `buffer`.
///
/// Shared by backends implementing [`WindowSystem::get_clipboard_text`].
pub fn write_clipboard(text: &[u8], buffer: &mut [u8]) -> Result<usize, ClipboardError> {
    let required = text.len();
    if buffer.len() <= required {
        return Err(ClipboardError {
            error: Error::Range,
            required,
        });
    }
    buffer[..required].copy_from_slice(text);
    buffer[required] = 0;
    Ok(required)
}
