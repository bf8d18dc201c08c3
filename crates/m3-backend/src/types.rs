#![forbid(unsafe_code)]

//! Plain value types exchanged across the backend traits.

use bitflags::bitflags;

use m3_core::{Block, Error};

/// Axis-aligned rectangle in window pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Straight (non-premultiplied) RGBA colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// `true` when every channel lies in `[0, 1]` (NaN fails).
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        [self.r, self.g, self.b, self.a]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

/// Row-major 3x3 affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub m: [f32; 9],
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    #[must_use]
    pub const fn translate(x: f32, y: f32) -> Self {
        Mat3 {
            m: [1.0, 0.0, x, 0.0, 1.0, y, 0.0, 0.0, 1.0],
        }
    }

    #[must_use]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Mat3 {
            m: [sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const SHIFT = 0x01;
        const CTRL = 0x02;
        const ALT = 0x04;
        const META = 0x08;
        const CAPS = 0x10;
        const NUM = 0x20;
    }
}

bitflags! {
    /// Window creation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u32 {
        const RESIZABLE = 0x01;
        const BORDERLESS = 0x02;
        const FULLSCREEN = 0x04;
        const HIGH_DPI = 0x08;
    }
}

/// Parameters for [`WindowSystem::init`](crate::WindowSystem::init).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WsConfig<'a> {
    pub app_name: &'a str,
    pub app_id: &'a str,
}

/// Parameters for [`WindowSystem::create_window`](crate::WindowSystem::create_window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig<'a> {
    pub width: i32,
    pub height: i32,
    pub title: &'a str,
    pub flags: WindowFlags,
}

impl<'a> WindowConfig<'a> {
    #[must_use]
    pub const fn new(width: i32, height: i32, title: &'a str) -> Self {
        Self {
            width,
            height,
            title,
            flags: WindowFlags::empty(),
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Pixel layouts accepted by texture uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TextureFormat {
    Rgba8 = 1,
    Bgra8 = 2,
    A8 = 3,
}

impl TextureFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Bgra8 => 4,
            TextureFormat::A8 => 1,
        }
    }
}

impl TryFrom<u32> for TextureFormat {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Error> {
        match value {
            1 => Ok(TextureFormat::Rgba8),
            2 => Ok(TextureFormat::Bgra8),
            3 => Ok(TextureFormat::A8),
            _ => Err(Error::InvalidArgument),
        }
    }
}

impl From<TextureFormat> for u32 {
    fn from(format: TextureFormat) -> u32 {
        format as u32
    }
}

/// Result of measuring a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    pub baseline: f32,
}

// ============================================================================
// Paths
// ============================================================================

/// One step of a vector path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    QuadTo { cx: f32, cy: f32, x: f32, y: f32 },
    CubicTo { cx1: f32, cy1: f32, cx2: f32, cy2: f32, x: f32, y: f32 },
    Close,
}

/// Filled vector path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub commands: Vec<PathCommand>,
}

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.commands.push(PathCommand::MoveTo { x, y });
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.commands.push(PathCommand::LineTo { x, y });
        self
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> &mut Self {
        self.commands.push(PathCommand::QuadTo { cx, cy, x, y });
        self
    }

    pub fn cubic_to(&mut self, cx1: f32, cy1: f32, cx2: f32, cy2: f32, x: f32, y: f32) -> &mut Self {
        self.commands.push(PathCommand::CubicTo {
            cx1,
            cy1,
            cx2,
            cy2,
            x,
            y,
        });
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.commands.push(PathCommand::Close);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Check that every segment follows a current point.
    ///
    /// `LineTo`, `QuadTo`, `CubicTo` and `Close` need a preceding `MoveTo`
    /// in the same figure; `Close` ends the figure.
    pub fn validate(&self) -> Result<(), Error> {
        let mut has_current = false;
        for command in &self.commands {
            match command {
                PathCommand::MoveTo { .. } => has_current = true,
                PathCommand::Close if has_current => has_current = false,
                _ if !has_current => return Err(Error::State),
                _ => {}
            }
        }
        Ok(())
    }
}

// ============================================================================
// Environment payloads
// ============================================================================

/// File metadata reported by [`Io::stat_file`](crate::Io::stat_file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub size_bytes: u32,
    pub flags: u32,
}

/// Sensor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SensorType {
    Accelerometer = 1,
    Gyroscope = 2,
    Magnetometer = 3,
    Gps = 4,
}

/// One sensor sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub sensor: SensorType,
    pub time_ms: u32,
    pub values: [f32; 4],
    pub value_count: u32,
}

/// Camera pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum CameraFormat {
    #[default]
    Any = 0,
    Rgba8 = 1,
    Bgra8 = 2,
    Nv12 = 3,
}

/// Requested camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum CameraFacing {
    #[default]
    Unspecified = 0,
    Front = 1,
    Back = 2,
    External = 3,
}

/// Let the backend pick a camera.
pub const CAMERA_ID_DEFAULT: u32 = u32::MAX;

/// Parameters for [`Camera::open_with_config`](crate::Camera::open_with_config).
///
/// Zero width/height select the backend default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConfig {
    pub camera_id: u32,
    pub facing: CameraFacing,
    pub width: u32,
    pub height: u32,
    pub format: CameraFormat,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_id: CAMERA_ID_DEFAULT,
            facing: CameraFacing::Unspecified,
            width: 0,
            height: 0,
            format: CameraFormat::Any,
        }
    }
}

/// A captured frame borrowed from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFrame<'a> {
    pub format: CameraFormat,
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

/// Synchronous HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    /// Raw `Name: value` lines separated by CRLF.
    pub headers: Option<&'a str>,
    pub body: &'a [u8],
    pub timeout_ms: u32,
}

impl<'a> NetworkRequest<'a> {
    #[must_use]
    pub const fn get(url: &'a str) -> Self {
        Self {
            method: "GET",
            url,
            headers: None,
            body: &[],
            timeout_ms: 0,
        }
    }
}

/// Response whose body was allocated with the caller's allocator.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NetworkResponse {
    pub status_code: u32,
    pub body: Option<Block>,
}

impl NetworkResponse {
    /// Body bytes, empty when the response had none.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_ref().map_or(&[], |b| b.as_slice())
    }
}

/// Deferred work handed to [`Tasks::post`](crate::Tasks::post).
pub type Task = Box<dyn FnOnce() -> m3_core::Result<()> + Send>;

/// Thread entry point for [`Tasks::thread_create`](crate::Tasks::thread_create).
pub type ThreadEntry = Box<dyn FnOnce() -> m3_core::Result<()> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_format_round_trip_and_rejects_unknown() {
        assert_eq!(TextureFormat::try_from(2), Ok(TextureFormat::Bgra8));
        assert_eq!(u32::from(TextureFormat::A8), 3);
        assert_eq!(TextureFormat::try_from(0), Err(Error::InvalidArgument));
        assert_eq!(TextureFormat::try_from(4), Err(Error::InvalidArgument));
        assert_eq!(TextureFormat::Rgba8.bytes_per_pixel(), 4);
        assert_eq!(TextureFormat::A8.bytes_per_pixel(), 1);
    }

    #[test]
    fn color_normalization() {
        assert!(Color::WHITE.is_normalized());
        assert!(!Color::rgba(1.5, 0.0, 0.0, 1.0).is_normalized());
        assert!(!Color::rgba(0.0, -0.1, 0.0, 1.0).is_normalized());
        assert!(!Color::rgba(0.0, 0.0, f32::NAN, 1.0).is_normalized());
    }

    #[test]
    fn flag_bits_match_wire_values() {
        assert_eq!(Modifiers::SHIFT.bits(), 1);
        assert_eq!((Modifiers::CTRL | Modifiers::NUM).bits(), 0x22);
        assert_eq!(WindowFlags::HIGH_DPI.bits(), 8);
        assert_eq!(WindowFlags::from_bits_truncate(0xff).bits(), 0x0f);
    }

    #[test]
    fn path_validation_requires_current_point() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0).line_to(4.0, 0.0).quad_to(4.0, 4.0, 0.0, 4.0).close();
        assert_eq!(path.validate(), Ok(()));

        let mut dangling = Path::new();
        dangling.line_to(1.0, 1.0);
        assert_eq!(dangling.validate(), Err(Error::State));

        let mut after_close = Path::new();
        after_close.move_to(0.0, 0.0).close().line_to(1.0, 1.0);
        assert_eq!(after_close.validate(), Err(Error::State));
    }

    #[test]
    fn camera_config_defaults_to_automatic_selection() {
        let config = CameraConfig::default();
        assert_eq!(config.camera_id, CAMERA_ID_DEFAULT);
        assert_eq!(config.format, CameraFormat::Any);
    }

    #[test]
    fn empty_response_body() {
        let response = NetworkResponse::default();
        assert!(response.body_bytes().is_empty());
    }
}
