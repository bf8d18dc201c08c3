//! GDI drawing into per-window back buffers, DIB textures and fonts.

use std::any::Any;
use std::mem::size_of;
use std::ptr;

use m3_backend::{
    Color, Footprint, Graphics, Mat3, Path, Rect, Text, TextMetrics, TextureFormat, object_type,
    validate,
};
use m3_core::log::LogLevel;
use m3_core::{Error, Handle, Object, ObjectHeader, Result, SharedAllocator};
use winapi::ctypes::c_void;
use winapi::shared::minwindef::FALSE;
use winapi::shared::windef::{HBITMAP, HDC, HFONT, HGDIOBJ, POINT, RECT, SIZE};
use winapi::um::wingdi::{
    AC_SRC_ALPHA, AC_SRC_OVER, BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BLENDFUNCTION, BeginPath,
    BitBlt, CLIP_DEFAULT_PRECIS, CloseFigure, CreateCompatibleDC, CreateDIBSection, CreateFontW,
    CreatePen, CreateSolidBrush, DEFAULT_CHARSET, DEFAULT_PITCH, DEFAULT_QUALITY, DIB_RGB_COLORS,
    DeleteDC, DeleteObject, EndPath, FF_DONTCARE, FillPath, GM_ADVANCED, GdiFlush,
    GetTextExtentPoint32W, GetTextMetricsW, HALFTONE, IntersectClipRect, LineTo, MoveToEx,
    OUT_DEFAULT_PRECIS, PS_NULL, PS_SOLID, PolyBezierTo, RestoreDC, RoundRect, SRCCOPY, SaveDC,
    SelectClipRgn, SelectObject, SetBkMode, SetGraphicsMode, SetPolyFillMode,
    SetStretchBltMode, SetTextColor, SetWorldTransform, StretchBlt, TEXTMETRICW, TRANSPARENT,
    TextOutW, WINDING, XFORM,
};
use winapi::um::winuser::{FillRect, GetDC, ReleaseDC};

use super::Win32Device;
use super::window::Win32Window;
use crate::geometry::{self, Blit, Bounds, Segment};
use crate::pixels::{self, SURFACE_BPP};
use crate::wide::to_wide;

// ============================================================================
// GDI handles
// ============================================================================

/// Brush, pen or font deleted on drop.
#[derive(Debug)]
struct GdiObject(HGDIOBJ);

impl GdiObject {
    fn new(object: HGDIOBJ) -> Result<Self> {
        if object.is_null() {
            return Err(Error::Unknown);
        }
        Ok(Self(object))
    }

    fn solid_brush(color: Color) -> Result<Self> {
        // SAFETY: creates a new brush owned by the returned value.
        Self::new(unsafe { CreateSolidBrush(pixels::colorref(color)) } as HGDIOBJ)
    }

    fn pen(style: i32, width: i32, color: Color) -> Result<Self> {
        // SAFETY: creates a new pen owned by the returned value.
        Self::new(unsafe { CreatePen(style, width, pixels::colorref(color)) } as HGDIOBJ)
    }
}

impl Drop for GdiObject {
    fn drop(&mut self) {
        // SAFETY: the object is owned and no longer selected into any DC.
        unsafe { DeleteObject(self.0) };
    }
}

/// Object selected into a DC, restored on drop.
///
/// Declare it after the object it selects so it is dropped first.
struct Selection {
    dc: HDC,
    previous: HGDIOBJ,
}

impl Selection {
    fn new(dc: HDC, object: HGDIOBJ) -> Self {
        // SAFETY: `dc` and `object` are live for the selection's lifetime.
        let previous = unsafe { SelectObject(dc, object) };
        Self { dc, previous }
    }
}

impl Drop for Selection {
    fn drop(&mut self) {
        // SAFETY: restores what `new` replaced.
        unsafe { SelectObject(self.dc, self.previous) };
    }
}

/// Screen DC used for text measurement.
struct ScreenDc(HDC);

impl ScreenDc {
    fn get() -> Result<Self> {
        // SAFETY: a null window requests the screen DC.
        let dc = unsafe { GetDC(ptr::null_mut()) };
        if dc.is_null() {
            return Err(Error::Unknown);
        }
        Ok(Self(dc))
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        // SAFETY: paired with GetDC(NULL) in `get`.
        unsafe { ReleaseDC(ptr::null_mut(), self.0) };
    }
}

/// Memory DC holding a 32 bpp top-down DIB section.
#[derive(Debug)]
pub(super) struct DibSurface {
    dc: HDC,
    bitmap: HBITMAP,
    original: HGDIOBJ,
    bits: *mut u8,
    width: i32,
    height: i32,
    stride: usize,
}

impl DibSurface {
    pub(super) fn new(width: i32, height: i32) -> Result<Self> {
        // SAFETY: a null DC requests a memory DC compatible with the screen.
        let dc = unsafe { CreateCompatibleDC(ptr::null_mut()) };
        if dc.is_null() {
            return Err(Error::Unknown);
        }
        let mut surface = Self {
            dc,
            bitmap: ptr::null_mut(),
            original: ptr::null_mut(),
            bits: ptr::null_mut(),
            width: 0,
            height: 0,
            stride: 0,
        };
        surface.resize(width, height)?;
        Ok(surface)
    }

    /// Swap in a new bitmap when the size differs from the current one.
    pub(super) fn resize(&mut self, width: i32, height: i32) -> Result<()> {
        if !self.bitmap.is_null() && self.width == width && self.height == height {
            return Ok(());
        }
        if width <= 0 || height <= 0 {
            return Err(Error::Range);
        }
        let stride = pixels::surface_stride(width)?;

        // SAFETY: BITMAPINFO is plain data; every field GDI reads is set.
        let mut info: BITMAPINFO = unsafe { std::mem::zeroed() };
        info.bmiHeader.biSize = size_of::<BITMAPINFOHEADER>() as u32;
        info.bmiHeader.biWidth = width;
        info.bmiHeader.biHeight = -height;
        info.bmiHeader.biPlanes = 1;
        info.bmiHeader.biBitCount = 32;
        info.bmiHeader.biCompression = BI_RGB as u32;

        let mut bits: *mut c_void = ptr::null_mut();
        // SAFETY: `info` describes the bitmap and `bits` receives its storage.
        let bitmap = unsafe {
            CreateDIBSection(self.dc, &info, DIB_RGB_COLORS as u32, &mut bits, ptr::null_mut(), 0)
        };
        if bitmap.is_null() || bits.is_null() {
            if !bitmap.is_null() {
                // SAFETY: never selected anywhere.
                unsafe { DeleteObject(bitmap as HGDIOBJ) };
            }
            return Err(Error::Unknown);
        }

        // SAFETY: `bitmap` is a fresh DIB compatible with `dc`; the bitmap it
        // replaces is owned here and no longer selected.
        unsafe {
            let replaced = SelectObject(self.dc, bitmap as HGDIOBJ);
            if self.bitmap.is_null() {
                self.original = replaced;
            } else {
                DeleteObject(self.bitmap as HGDIOBJ);
            }
        }
        self.bitmap = bitmap;
        self.bits = bits.cast();
        self.width = width;
        self.height = height;
        self.stride = stride;
        Ok(())
    }

    pub(super) fn dc(&self) -> HDC {
        self.dc
    }

    pub(super) fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub(super) fn stride(&self) -> usize {
        self.stride
    }

    /// CPU view of the pixels, after pending GDI drawing has landed.
    pub(super) fn pixels_mut(&mut self) -> &mut [u8] {
        let len = self.stride * self.height as usize;
        // SAFETY: the DIB section owns `stride * height` bytes at `bits`
        // until the bitmap is deleted, and `&mut self` makes this the only
        // view.
        unsafe {
            GdiFlush();
            std::slice::from_raw_parts_mut(self.bits, len)
        }
    }
}

impl Drop for DibSurface {
    fn drop(&mut self) {
        // SAFETY: the DC and bitmap are owned; the original bitmap is put
        // back before ours is deleted.
        unsafe {
            if !self.original.is_null() {
                SelectObject(self.dc, self.original);
            }
            if !self.bitmap.is_null() {
                DeleteObject(self.bitmap as HGDIOBJ);
            }
            DeleteDC(self.dc);
        }
    }
}

// ============================================================================
// Objects
// ============================================================================

#[derive(Debug)]
pub(super) struct Win32Texture {
    header: ObjectHeader,
    footprint: Footprint,
    surface: DibSurface,
    width: i32,
    height: i32,
    format: TextureFormat,
}

impl Win32Texture {
    fn new(
        allocator: &SharedAllocator,
        width: i32,
        height: i32,
        format: TextureFormat,
    ) -> Result<Self> {
        let footprint = Footprint::alloc(allocator, size_of::<Self>())?;
        let surface = match DibSurface::new(width, height) {
            Ok(surface) => surface,
            Err(err) => {
                let _ = footprint.free();
                return Err(err);
            }
        };
        Ok(Self {
            header: ObjectHeader::new(object_type::TEXTURE, 0),
            footprint,
            surface,
            width,
            height,
            format,
        })
    }

    /// Upload `height` rows of `width` texels at `(x, y)`.
    fn upload(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        row_bytes: usize,
        data: &[u8],
    ) -> Result<()> {
        let stride = self.surface.stride();
        let offset = (y as usize)
            .checked_mul(stride)
            .and_then(|row| row.checked_add(x as usize * SURFACE_BPP))
            .ok_or(Error::Overflow)?;
        let format = self.format;
        let dst = self
            .surface
            .pixels_mut()
            .get_mut(offset..)
            .ok_or(Error::Range)?;
        pixels::copy_pixels(
            dst,
            stride,
            data,
            row_bytes,
            width as usize,
            height as usize,
            format,
        )
    }
}

#[derive(Debug)]
pub(super) struct Win32Font {
    header: ObjectHeader,
    footprint: Footprint,
    font: GdiObject,
}

impl Win32Font {
    fn handle(&self) -> HFONT {
        self.font.0 as HFONT
    }
}

macro_rules! gdi_object {
    ($ty:ident, $($resource:ident),+) => {
        impl Object for $ty {
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
                let $ty { footprint, $($resource,)+ .. } = *self;
                $(drop($resource);)+
                footprint.free()
            }
        }
    };
}

gdi_object!(Win32Texture, surface);
gdi_object!(Win32Font, font);

// ============================================================================
// Graphics
// ============================================================================

impl Win32Device {
    /// Back buffer of the window inside `begin_frame`.
    fn target(&self) -> Result<(HDC, (i32, i32))> {
        let window = self.frame.active()?;
        let surface = self.window(window)?.surface.as_ref().ok_or(Error::State)?;
        Ok((surface.dc(), surface.size()))
    }

    fn apply_transform(&self, dc: HDC) -> Result<()> {
        let [m11, m12, m21, m22, dx, dy] = geometry::xform(self.frame.transform());
        let xform = XFORM {
            eM11: m11,
            eM12: m12,
            eM21: m21,
            eM22: m22,
            eDx: dx,
            eDy: dy,
        };
        // SAFETY: `dc` is the live back buffer; `xform` outlives the call.
        unsafe {
            if SetGraphicsMode(dc, GM_ADVANCED as i32) == 0 {
                return Err(Error::Unknown);
            }
            if SetWorldTransform(dc, &xform) == 0 {
                return Err(Error::Unknown);
            }
        }
        Ok(())
    }

    fn texture(&self, texture: Handle) -> Result<&Win32Texture> {
        self.session
            .handles
            .get::<Win32Texture>(texture, object_type::TEXTURE)
    }

    fn texture_mut(&mut self, texture: Handle) -> Result<&mut Win32Texture> {
        self.session
            .handles
            .get_mut::<Win32Texture>(texture, object_type::TEXTURE)
    }

    fn font(&self, font: Handle) -> Result<&Win32Font> {
        self.session.handles.get::<Win32Font>(font, object_type::FONT)
    }
}

fn text_units(text: &str) -> Result<Vec<u16>> {
    if i32::try_from(text.len()).is_err() {
        return Err(Error::Range);
    }
    let mut units = Vec::new();
    units
        .try_reserve_exact(text.len())
        .map_err(|_| Error::OutOfMemory)?;
    units.extend(text.encode_utf16());
    Ok(units)
}

fn point(p: geometry::Point) -> POINT {
    POINT { x: p.x, y: p.y }
}

impl Graphics for Win32Device {
    fn begin_frame(&mut self, window: Handle, width: i32, height: i32, dpi_scale: f32) -> Result<()> {
        validate::positive_size(width, height)?;
        validate::dpi_scale(dpi_scale)?;
        self.frame.check_begin()?;
        self.window(window)?;
        self.session.log(LogLevel::Debug, "gfx.begin_frame")?;

        let resolved: &mut Win32Window = self.window_mut(window)?;
        let dc = resolved.ensure_surface(width, height)?.dc();
        resolved.set_dpi_scale(dpi_scale);

        let stale = self.frame.begin(window);
        // SAFETY: `dc` is the window's live back buffer.
        unsafe {
            for _ in 0..stale {
                RestoreDC(dc, -1);
            }
            SelectClipRgn(dc, ptr::null_mut());
        }
        self.apply_transform(dc)
    }

    fn end_frame(&mut self, window: Handle) -> Result<()> {
        let hwnd = self.window(window)?.hwnd();
        self.frame.check_end(window)?;
        self.session.log(LogLevel::Debug, "gfx.end_frame")?;

        let (dc, (width, height)) = self.target()?;
        if !hwnd.is_null() {
            // SAFETY: `hwnd` is live; its DC is released right after the copy.
            unsafe {
                let screen = GetDC(hwnd);
                if !screen.is_null() {
                    BitBlt(screen, 0, 0, width, height, dc, 0, 0, SRCCOPY);
                    ReleaseDC(hwnd, screen);
                }
            }
        }
        let depth = self.frame.end();
        // SAFETY: unwinds the SaveDC levels pushed during this frame.
        unsafe {
            for _ in 0..depth {
                RestoreDC(dc, -1);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        validate::color(&color)?;
        let (dc, (width, height)) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.clear")?;

        let brush = GdiObject::solid_brush(color)?;
        let rect = RECT {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        };
        // SAFETY: `dc`, `rect` and the brush are live for the call.
        unsafe { FillRect(dc, &rect, brush.0 as _) };
        Ok(())
    }

    fn draw_rect(&mut self, rect: &Rect, color: Color, corner_radius: f32) -> Result<()> {
        validate::rect_extent(rect)?;
        validate::non_negative(corner_radius)?;
        validate::color(&color)?;
        let (dc, _) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.draw_rect")?;
        if rect.width == 0.0 || rect.height == 0.0 {
            return Ok(());
        }

        let bounds = Bounds::from_rect(rect);
        let brush = GdiObject::solid_brush(color)?;
        let radius = geometry::corner_radius(corner_radius);
        if radius <= 0 {
            let area = RECT {
                left: bounds.left,
                top: bounds.top,
                right: bounds.right,
                bottom: bounds.bottom,
            };
            // SAFETY: `dc`, `area` and the brush are live for the call.
            unsafe { FillRect(dc, &area, brush.0 as _) };
            return Ok(());
        }

        let pen = GdiObject::pen(PS_NULL as i32, 0, color)?;
        let _pen = Selection::new(dc, pen.0);
        let _brush = Selection::new(dc, brush.0);
        // SAFETY: both objects are selected into `dc` for the call.
        unsafe {
            RoundRect(
                dc,
                bounds.left,
                bounds.top,
                bounds.right,
                bounds.bottom,
                radius * 2,
                radius * 2,
            )
        };
        Ok(())
    }

    fn draw_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: Color,
        thickness: f32,
    ) -> Result<()> {
        validate::non_negative(thickness)?;
        validate::color(&color)?;
        let (dc, _) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.draw_line")?;

        let pen = GdiObject::pen(PS_SOLID as i32, geometry::pen_width(thickness), color)?;
        let _pen = Selection::new(dc, pen.0);
        // SAFETY: the pen is selected into the live `dc`.
        unsafe {
            MoveToEx(dc, x0 as i32, y0 as i32, ptr::null_mut());
            LineTo(dc, x1 as i32, y1 as i32);
        }
        Ok(())
    }

    fn draw_path(&mut self, path: &Path, color: Color) -> Result<()> {
        let segments = geometry::path_segments(path)?;
        validate::color(&color)?;
        let (dc, _) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.draw_path")?;
        if segments.is_empty() {
            return Ok(());
        }

        let brush = GdiObject::solid_brush(color)?;
        let _brush = Selection::new(dc, brush.0);
        // SAFETY: the path bracket and every point array stay on this DC.
        unsafe {
            if BeginPath(dc) == 0 {
                return Err(Error::Unknown);
            }
            for segment in &segments {
                match *segment {
                    Segment::MoveTo(p) => {
                        MoveToEx(dc, p.x, p.y, ptr::null_mut());
                    }
                    Segment::LineTo(p) => {
                        LineTo(dc, p.x, p.y);
                    }
                    Segment::BezierTo(points) => {
                        let points = points.map(point);
                        PolyBezierTo(dc, points.as_ptr(), points.len() as u32);
                    }
                    Segment::CloseFigure => {
                        CloseFigure(dc);
                    }
                }
            }
            if EndPath(dc) == 0 {
                return Err(Error::Unknown);
            }
            SetPolyFillMode(dc, WINDING as i32);
            if FillPath(dc) == 0 {
                return Err(Error::Unknown);
            }
        }
        Ok(())
    }

    fn push_clip(&mut self, rect: &Rect) -> Result<()> {
        validate::rect_extent(rect)?;
        let (dc, _) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.push_clip")?;
        self.frame.check_push_clip()?;

        let bounds = Bounds::from_rect(rect);
        // SAFETY: `dc` is the live back buffer.
        unsafe {
            if SaveDC(dc) == 0 {
                return Err(Error::Unknown);
            }
            IntersectClipRect(dc, bounds.left, bounds.top, bounds.right, bounds.bottom);
        }
        self.frame.clip_pushed();
        Ok(())
    }

    fn pop_clip(&mut self) -> Result<()> {
        let (dc, _) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.pop_clip")?;
        self.frame.check_pop_clip()?;

        // SAFETY: a level saved by `push_clip` exists.
        if unsafe { RestoreDC(dc, -1) } == 0 {
            return Err(Error::Unknown);
        }
        self.frame.clip_popped();
        self.apply_transform(dc)
    }

    fn set_transform(&mut self, transform: &Mat3) -> Result<()> {
        let (dc, _) = self.target()?;
        self.session.log(LogLevel::Debug, "gfx.set_transform")?;
        self.frame.set_transform(*transform);
        self.apply_transform(dc)
    }

    fn create_texture(&mut self, width: i32, height: i32, format: u32, data: &[u8]) -> Result<Handle> {
        validate::positive_size(width, height)?;
        let format = TextureFormat::try_from(format)?;
        self.session.log(LogLevel::Debug, "gfx.create_texture")?;
        let row_bytes = pixels::check_upload(width, height, format, data)?;

        let mut texture = Win32Texture::new(&self.session.allocator, width, height, format)?;
        if !data.is_empty() {
            if let Err(err) = texture.upload(0, 0, width, height, row_bytes, data) {
                let _ = Box::new(texture).destroy();
                return Err(err);
            }
        }
        self.session.register(Box::new(texture))
    }

    fn update_texture(
        &mut self,
        texture: Handle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        data: &[u8],
    ) -> Result<()> {
        validate::texture_region(x, y, width, height)?;
        self.texture(texture)?;
        self.session.log(LogLevel::Debug, "gfx.update_texture")?;

        let resolved = self.texture_mut(texture)?;
        geometry::region_within(x, y, width, height, resolved.width, resolved.height)?;
        let row_bytes = pixels::check_upload(width, height, resolved.format, data)?;
        if data.is_empty() {
            return Ok(());
        }
        resolved.upload(x, y, width, height, row_bytes, data)
    }

    fn destroy_texture(&mut self, texture: Handle) -> Result<()> {
        self.texture(texture)?;
        self.session.log(LogLevel::Debug, "gfx.destroy_texture")?;
        self.session.handles.release(texture)
    }

    fn draw_texture(&mut self, texture: Handle, src: &Rect, dst: &Rect, opacity: f32) -> Result<()> {
        validate::opacity(opacity)?;
        let (target, _) = self.target()?;
        let resolved = self.texture(texture)?;
        let source = resolved.surface.dc();
        let texture_size = (resolved.width, resolved.height);
        self.session.log(LogLevel::Debug, "gfx.draw_texture")?;

        match geometry::plan_blit(src, dst, opacity, texture_size, self.alpha_blend.is_some())? {
            Blit::Skip => Ok(()),
            Blit::AlphaBlend { src, dst, alpha } => {
                let alpha_blend = self.alpha_blend.ok_or(Error::Unsupported)?;
                let blend = BLENDFUNCTION {
                    BlendOp: AC_SRC_OVER as u8,
                    BlendFlags: 0,
                    SourceConstantAlpha: alpha,
                    AlphaFormat: AC_SRC_ALPHA as u8,
                };
                // SAFETY: both DCs are live memory DCs and `alpha_blend` came
                // from the still-loaded msimg32.
                let drawn = unsafe {
                    alpha_blend(
                        target, dst.x, dst.y, dst.width, dst.height, source, src.x, src.y,
                        src.width, src.height, blend,
                    )
                };
                if drawn == FALSE {
                    return Err(Error::Unknown);
                }
                Ok(())
            }
            Blit::Stretch { src, dst } => {
                // SAFETY: both DCs are live memory DCs; the stretch mode is
                // restored before returning.
                let drawn = unsafe {
                    let previous = SetStretchBltMode(target, HALFTONE as i32);
                    let drawn = StretchBlt(
                        target, dst.x, dst.y, dst.width, dst.height, source, src.x, src.y,
                        src.width, src.height, SRCCOPY,
                    );
                    if previous != 0 {
                        SetStretchBltMode(target, previous);
                    }
                    drawn
                };
                if drawn == FALSE {
                    return Err(Error::Unknown);
                }
                Ok(())
            }
        }
    }

    fn text(&mut self) -> &mut dyn Text {
        self
    }
}

// ============================================================================
// Text
// ============================================================================

impl Text for Win32Device {
    fn create_font(&mut self, family: &str, size_px: i32, weight: i32, italic: bool) -> Result<Handle> {
        validate::font(size_px, weight)?;
        self.session.log(LogLevel::Debug, "text.create_font")?;

        let family = to_wide(family)?;
        // SAFETY: `family` is NUL-terminated and outlives the call.
        let hfont = unsafe {
            CreateFontW(
                -size_px,
                0,
                0,
                0,
                weight,
                u32::from(italic),
                FALSE as u32,
                FALSE as u32,
                DEFAULT_CHARSET as u32,
                OUT_DEFAULT_PRECIS as u32,
                CLIP_DEFAULT_PRECIS as u32,
                DEFAULT_QUALITY as u32,
                DEFAULT_PITCH as u32 | FF_DONTCARE as u32,
                family.as_ptr(),
            )
        };
        let font = GdiObject::new(hfont as HGDIOBJ)?;
        let font = Win32Font {
            header: ObjectHeader::new(object_type::FONT, 0),
            footprint: Footprint::alloc(&self.session.allocator, size_of::<Win32Font>())?,
            font,
        };
        self.session.register(Box::new(font))
    }

    fn destroy_font(&mut self, font: Handle) -> Result<()> {
        self.font(font)?;
        self.session.log(LogLevel::Debug, "text.destroy_font")?;
        self.session.handles.release(font)
    }

    fn measure_text(&mut self, font: Handle, text: &str) -> Result<TextMetrics> {
        let units = text_units(text)?;
        let hfont = self.font(font)?.handle();
        self.session.log(LogLevel::Debug, "text.measure_text")?;

        let screen = ScreenDc::get()?;
        let _font = Selection::new(screen.0, hfont as HGDIOBJ);
        // SAFETY: TEXTMETRICW and SIZE are plain data written by GDI; the
        // font is selected into the screen DC.
        unsafe {
            let mut metrics: TEXTMETRICW = std::mem::zeroed();
            if GetTextMetricsW(screen.0, &mut metrics) == 0 {
                return Err(Error::Unknown);
            }
            let mut size = SIZE {
                cx: 0,
                cy: metrics.tmHeight,
            };
            if !units.is_empty()
                && GetTextExtentPoint32W(screen.0, units.as_ptr(), units.len() as i32, &mut size) == 0
            {
                return Err(Error::Unknown);
            }
            Ok(TextMetrics {
                width: size.cx as f32,
                height: size.cy as f32,
                baseline: metrics.tmAscent as f32,
            })
        }
    }

    fn draw_text(&mut self, font: Handle, text: &str, x: f32, y: f32, color: Color) -> Result<()> {
        validate::color(&color)?;
        let units = text_units(text)?;
        let (dc, _) = self.target()?;
        let hfont = self.font(font)?.handle();
        self.session.log(LogLevel::Debug, "text.draw_text")?;
        if units.is_empty() {
            return Ok(());
        }

        let _font = Selection::new(dc, hfont as HGDIOBJ);
        // SAFETY: the font is selected into the live back buffer.
        unsafe {
            SetBkMode(dc, TRANSPARENT as i32);
            SetTextColor(dc, pixels::colorref(color));
            TextOutW(dc, x as i32, y as i32, units.as_ptr(), units.len() as i32);
        }
        Ok(())
    }
}
