#![forbid(unsafe_code)]

use m3_backend::{
    Color, Graphics, Mat3, Path, Rect, Text, TextMetrics, TextureFormat, object_type, validate,
};
use m3_core::log::LogLevel;
use m3_core::{Handle, Result};

use crate::device::NullDevice;
use crate::objects::{NullFont, NullTexture, NullWindow};

impl NullDevice {
    fn resolve<T: m3_core::Object>(&self, handle: Handle, type_id: u32) -> Result<&T> {
        self.handles.get::<T>(handle, type_id)
    }
}

impl Graphics for NullDevice {
    fn begin_frame(&mut self, window: Handle, width: i32, height: i32, dpi_scale: f32) -> Result<()> {
        validate::positive_size(width, height)?;
        validate::dpi_scale(dpi_scale)?;
        self.resolve::<NullWindow>(window, object_type::WINDOW)?;
        self.log(LogLevel::Debug, "gfx.begin_frame")
    }

    fn end_frame(&mut self, window: Handle) -> Result<()> {
        self.resolve::<NullWindow>(window, object_type::WINDOW)?;
        self.log(LogLevel::Debug, "gfx.end_frame")
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        validate::color(&color)?;
        self.log(LogLevel::Debug, "gfx.clear")
    }

    fn draw_rect(&mut self, rect: &Rect, color: Color, corner_radius: f32) -> Result<()> {
        validate::rect_extent(rect)?;
        validate::non_negative(corner_radius)?;
        validate::color(&color)?;
        self.log(LogLevel::Debug, "gfx.draw_rect")
    }

    fn draw_line(
        &mut self,
        _x0: f32,
        _y0: f32,
        _x1: f32,
        _y1: f32,
        color: Color,
        thickness: f32,
    ) -> Result<()> {
        validate::non_negative(thickness)?;
        validate::color(&color)?;
        self.log(LogLevel::Debug, "gfx.draw_line")
    }

    fn draw_path(&mut self, path: &Path, color: Color) -> Result<()> {
        path.validate()?;
        validate::color(&color)?;
        self.log(LogLevel::Debug, "gfx.draw_path")
    }

    fn push_clip(&mut self, rect: &Rect) -> Result<()> {
        validate::rect_extent(rect)?;
        self.log(LogLevel::Debug, "gfx.push_clip")
    }

    fn pop_clip(&mut self) -> Result<()> {
        self.log(LogLevel::Debug, "gfx.pop_clip")
    }

    fn set_transform(&mut self, _transform: &Mat3) -> Result<()> {
        self.log(LogLevel::Debug, "gfx.set_transform")
    }

    fn create_texture(&mut self, width: i32, height: i32, format: u32, _pixels: &[u8]) -> Result<Handle> {
        validate::positive_size(width, height)?;
        let format = TextureFormat::try_from(format)?;
        self.log(LogLevel::Debug, "gfx.create_texture")?;
        let texture = NullTexture::new(&self.allocator, width, height, format)?;
        self.register(Box::new(texture))
    }

    fn update_texture(
        &mut self,
        texture: Handle,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        _pixels: &[u8],
    ) -> Result<()> {
        validate::texture_region(x, y, width, height)?;
        self.resolve::<NullTexture>(texture, object_type::TEXTURE)?;
        self.log(LogLevel::Debug, "gfx.update_texture")
    }

    fn destroy_texture(&mut self, texture: Handle) -> Result<()> {
        self.resolve::<NullTexture>(texture, object_type::TEXTURE)?;
        self.log(LogLevel::Debug, "gfx.destroy_texture")?;
        self.handles.release(texture)
    }

    fn draw_texture(&mut self, texture: Handle, _src: &Rect, _dst: &Rect, opacity: f32) -> Result<()> {
        validate::opacity(opacity)?;
        self.resolve::<NullTexture>(texture, object_type::TEXTURE)?;
        self.log(LogLevel::Debug, "gfx.draw_texture")
    }

    fn text(&mut self) -> &mut dyn Text {
        self
    }
}

impl Text for NullDevice {
    fn create_font(&mut self, _family: &str, size_px: i32, weight: i32, italic: bool) -> Result<Handle> {
        validate::font(size_px, weight)?;
        self.log(LogLevel::Debug, "text.create_font")?;
        let font = NullFont::new(&self.allocator, size_px, weight, italic)?;
        self.register(Box::new(font))
    }

    fn destroy_font(&mut self, font: Handle) -> Result<()> {
        self.resolve::<NullFont>(font, object_type::FONT)?;
        self.log(LogLevel::Debug, "text.destroy_font")?;
        self.handles.release(font)
    }

    fn measure_text(&mut self, font: Handle, text: &str) -> Result<TextMetrics> {
        let size = self.resolve::<NullFont>(font, object_type::FONT)?.size_px as f32;
        self.log(LogLevel::Debug, "text.measure_text")?;
        Ok(TextMetrics {
            width: size * text.len() as f32 * 0.5,
            height: size,
            baseline: size * 0.8,
        })
    }

    fn draw_text(&mut self, font: Handle, _text: &str, _x: f32, _y: f32, color: Color) -> Result<()> {
        validate::color(&color)?;
        self.resolve::<NullFont>(font, object_type::FONT)?;
        self.log(LogLevel::Debug, "text.draw_text")
    }
}
