#![forbid(unsafe_code)]

//! Argument checks shared by every backend.
//!
//! Backends run these before touching handles, logging or allocating, so a
//! rejected call never has side effects.

use m3_core::{Error, Result};

use crate::types::{Color, Rect};

/// Lightest accepted font weight.
pub const FONT_WEIGHT_MIN: i32 = 100;
/// Heaviest accepted font weight.
pub const FONT_WEIGHT_MAX: i32 = 900;

/// Window and texture dimensions must be positive.
pub fn positive_size(width: i32, height: i32) -> Result<()> {
    if width <= 0 || height <= 0 {
        return Err(Error::Range);
    }
    Ok(())
}

/// Rectangles may be empty but not negative.
pub fn rect_extent(rect: &Rect) -> Result<()> {
    if rect.width < 0.0 || rect.height < 0.0 {
        return Err(Error::Range);
    }
    Ok(())
}

pub fn color(color: &Color) -> Result<()> {
    if !color.is_normalized() {
        return Err(Error::Range);
    }
    Ok(())
}

pub fn non_negative(value: f32) -> Result<()> {
    if value < 0.0 {
        return Err(Error::Range);
    }
    Ok(())
}

pub fn dpi_scale(scale: f32) -> Result<()> {
    if scale <= 0.0 {
        return Err(Error::Range);
    }
    Ok(())
}

pub fn opacity(opacity: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(Error::Range);
    }
    Ok(())
}

pub fn font(size_px: i32, weight: i32) -> Result<()> {
    if size_px <= 0 {
        return Err(Error::Range);
    }
    if !(FONT_WEIGHT_MIN..=FONT_WEIGHT_MAX).contains(&weight) {
        return Err(Error::Range);
    }
    Ok(())
}

/// Sub-rectangle origin must be non-negative and its size positive.
pub fn texture_region(x: i32, y: i32, width: i32, height: i32) -> Result<()> {
    if x < 0 || y < 0 || width <= 0 || height <= 0 {
        return Err(Error::Range);
    }
    Ok(())
}
