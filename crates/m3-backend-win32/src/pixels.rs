#![forbid(unsafe_code)]

//! Colour and pixel conversion for GDI.
//!
//! GDI surfaces are 32 bpp BGRA with premultiplied alpha (what `AlphaBlend`
//! expects with `AC_SRC_ALPHA`). Uploads in any [`TextureFormat`] are
//! converted into that layout.

use m3_backend::{Color, TextureFormat};
use m3_core::{Error, Result};

/// Bytes per pixel of every GDI surface.
pub const SURFACE_BPP: usize = 4;

/// Map a `[0, 1]` channel to a byte, clamping out-of-range input.
#[must_use]
pub fn channel_from_scalar(value: f32) -> u8 {
    if value <= 0.0 {
        return 0;
    }
    if value >= 1.0 {
        return 255;
    }
    (value * 255.0 + 0.5) as u8
}

/// `COLORREF` (`0x00BBGGRR`); alpha is dropped.
#[must_use]
pub fn colorref(color: Color) -> u32 {
    let r = u32::from(channel_from_scalar(color.r));
    let g = u32::from(channel_from_scalar(color.g));
    let b = u32::from(channel_from_scalar(color.b));
    r | (g << 8) | (b << 16)
}

/// Rounded `c * a / 255`.
#[must_use]
pub fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((u32::from(channel) * u32::from(alpha) + 127) / 255) as u8
}

fn checked_mul(a: usize, b: usize) -> Result<usize> {
    a.checked_mul(b).ok_or(Error::Overflow)
}

/// Bytes of caller data describing a `width x height` region.
pub fn upload_size(width: i32, height: i32, format: TextureFormat) -> Result<usize> {
    let width = usize::try_from(width).map_err(|_| Error::Range)?;
    let height = usize::try_from(height).map_err(|_| Error::Range)?;
    checked_mul(checked_mul(width, height)?, format.bytes_per_pixel())
}

/// Check that `pixels` covers the region; empty means "no data".
///
/// Returns the source row length in bytes.
pub fn check_upload(width: i32, height: i32, format: TextureFormat, pixels: &[u8]) -> Result<usize> {
    let required = upload_size(width, height, format)?;
    if !pixels.is_empty() && pixels.len() < required {
        return Err(Error::Range);
    }
    let width = usize::try_from(width).map_err(|_| Error::Range)?;
    checked_mul(width, format.bytes_per_pixel())
}

/// Row stride of a `width`-pixel surface.
pub fn surface_stride(width: i32) -> Result<usize> {
    let width = usize::try_from(width).map_err(|_| Error::Range)?;
    checked_mul(width, SURFACE_BPP)
}

/// Convert `height` rows of `src` into premultiplied BGRA rows of `dst`.
///
/// Rows are `src_row` and `dst_stride` bytes apart; both slices must cover
/// the region.
pub fn copy_pixels(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_row: usize,
    width: usize,
    height: usize,
    format: TextureFormat,
) -> Result<()> {
    let bpp = format.bytes_per_pixel();
    for row in 0..height {
        let src_start = checked_mul(row, src_row)?;
        let dst_start = checked_mul(row, dst_stride)?;
        let src_row_bytes = src
            .get(src_start..src_start + width * bpp)
            .ok_or(Error::Range)?;
        let dst_row_bytes = dst
            .get_mut(dst_start..dst_start + width * SURFACE_BPP)
            .ok_or(Error::Range)?;

        for (texel, out) in src_row_bytes
            .chunks_exact(bpp)
            .zip(dst_row_bytes.chunks_exact_mut(SURFACE_BPP))
        {
            let (r, g, b, a) = match format {
                TextureFormat::Rgba8 => (texel[0], texel[1], texel[2], texel[3]),
                TextureFormat::Bgra8 => (texel[2], texel[1], texel[0], texel[3]),
                TextureFormat::A8 => (255, 255, 255, texel[0]),
            };
            out[0] = premultiply(b, a);
            out[1] = premultiply(g, a);
            out[2] = premultiply(r, a);
            out[3] = a;
        }
    }
    Ok(())
}
