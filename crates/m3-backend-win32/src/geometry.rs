#![forbid(unsafe_code)]

//! Float geometry lowered to the integer forms GDI draws with.
//!
//! Coordinates truncate toward zero, the way a C `(int)` cast does, so
//! output matches other GDI clients pixel for pixel.

use m3_backend::{Mat3, Path, PathCommand, Rect};
use m3_core::{Error, Result};

/// Integer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn from_f32(x: f32, y: f32) -> Self {
        Self::new(x as i32, y as i32)
    }
}

/// `left/top/right/bottom` rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    #[must_use]
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            left: rect.x as i32,
            top: rect.y as i32,
            right: rect.right() as i32,
            bottom: rect.bottom() as i32,
        }
    }
}

/// Origin-and-size rectangle used by the blit calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    #[must_use]
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            x: rect.x as i32,
            y: rect.y as i32,
            width: rect.width as i32,
            height: rect.height as i32,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    fn fits_within(&self, width: i32, height: i32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

/// `RoundRect` takes the ellipse diameter; `0` means a square fill.
#[must_use]
pub fn corner_radius(radius: f32) -> i32 {
    (radius + 0.5) as i32
}

/// Pen width for `draw_line`; hairlines still draw one pixel.
#[must_use]
pub fn pen_width(thickness: f32) -> i32 {
    ((thickness + 0.5) as i32).max(1)
}

/// GDI world transform `[eM11, eM12, eM21, eM22, eDx, eDy]`.
///
/// [`Mat3`] is row-major, so `x' = m0*x + m1*y + m2` and
/// `y' = m3*x + m4*y + m5`.
#[must_use]
pub fn xform(transform: Option<&Mat3>) -> [f32; 6] {
    match transform {
        Some(t) => [t.m[0], t.m[3], t.m[1], t.m[4], t.m[2], t.m[5]],
        None => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    }
}

// ============================================================================
// Paths
// ============================================================================

/// One GDI path call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    /// `PolyBezierTo` with two control points and the end point.
    BezierTo([Point; 3]),
    CloseFigure,
}

/// Elevate a quadratic from `from` through `control` to `to` into cubic
/// control points.
#[must_use]
pub fn quad_to_cubic(from: (f32, f32), control: (f32, f32), to: (f32, f32)) -> [(f32, f32); 2] {
    const TWO_THIRDS: f32 = 2.0 / 3.0;
    [
        (
            from.0 + (control.0 - from.0) * TWO_THIRDS,
            from.1 + (control.1 - from.1) * TWO_THIRDS,
        ),
        (
            to.0 + (control.0 - to.0) * TWO_THIRDS,
            to.1 + (control.1 - to.1) * TWO_THIRDS,
        ),
    ]
}

/// Lower `path` to GDI path calls.
///
/// Segments and `Close` need a current point from a preceding `MoveTo`
/// ([`Error::State`] otherwise).
pub fn path_segments(path: &Path) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    segments
        .try_reserve_exact(path.commands.len())
        .map_err(|_| Error::OutOfMemory)?;
    let mut current: Option<(f32, f32)> = None;

    for command in &path.commands {
        let segment = match *command {
            PathCommand::MoveTo { x, y } => {
                current = Some((x, y));
                Segment::MoveTo(Point::from_f32(x, y))
            }
            PathCommand::LineTo { x, y } => {
                current.ok_or(Error::State)?;
                current = Some((x, y));
                Segment::LineTo(Point::from_f32(x, y))
            }
            PathCommand::QuadTo { cx, cy, x, y } => {
                let from = current.ok_or(Error::State)?;
                let [c1, c2] = quad_to_cubic(from, (cx, cy), (x, y));
                current = Some((x, y));
                Segment::BezierTo([
                    Point::from_f32(c1.0, c1.1),
                    Point::from_f32(c2.0, c2.1),
                    Point::from_f32(x, y),
                ])
            }
            PathCommand::CubicTo {
                cx1,
                cy1,
                cx2,
                cy2,
                x,
                y,
            } => {
                current.ok_or(Error::State)?;
                current = Some((x, y));
                Segment::BezierTo([
                    Point::from_f32(cx1, cy1),
                    Point::from_f32(cx2, cy2),
                    Point::from_f32(x, y),
                ])
            }
            PathCommand::Close => {
                current.take().ok_or(Error::State)?;
                Segment::CloseFigure
            }
        };
        segments.push(segment);
    }
    Ok(segments)
}

// ============================================================================
// Texture blits
// ============================================================================

/// How `draw_texture` reaches the back buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blit {
    /// Nothing visible to draw.
    Skip,
    /// `AlphaBlend` with a constant alpha over per-pixel alpha.
    AlphaBlend {
        src: Region,
        dst: Region,
        alpha: u8,
    },
    /// Opaque `StretchBlt` in `HALFTONE` mode.
    Stretch { src: Region, dst: Region },
}

/// Choose the blit for a texture of `texture_size`.
///
/// Degenerate rectangles and zero opacity draw nothing. A source outside the
/// texture is [`Error::Range`]. Without `AlphaBlend` only fully opaque
/// draws are possible; anything else is [`Error::Unsupported`].
pub fn plan_blit(
    src: &Rect,
    dst: &Rect,
    opacity: f32,
    texture_size: (i32, i32),
    alpha_blend: bool,
) -> Result<Blit> {
    let src = Region::from_rect(src);
    let dst = Region::from_rect(dst);
    if src.is_degenerate() || dst.is_degenerate() {
        return Ok(Blit::Skip);
    }
    if !src.fits_within(texture_size.0, texture_size.1) {
        return Err(Error::Range);
    }
    if opacity <= 0.0 {
        return Ok(Blit::Skip);
    }
    if alpha_blend {
        return Ok(Blit::AlphaBlend {
            src,
            dst,
            alpha: (opacity * 255.0 + 0.5) as u8,
        });
    }
    if opacity < 1.0 {
        return Err(Error::Unsupported);
    }
    Ok(Blit::Stretch { src, dst })
}

/// Check that an update region lies inside a `width x height` texture.
pub fn region_within(x: i32, y: i32, w: i32, h: i32, width: i32, height: i32) -> Result<()> {
    let region = Region {
        x,
        y,
        width: w,
        height: h,
    };
    if !region.fits_within(width, height) {
        return Err(Error::Range);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: Rect = Rect::new(0.0, 0.0, 8.0, 8.0);

    #[test]
    fn rects_truncate_toward_zero() {
        let bounds = Bounds::from_rect(&Rect::new(1.7, -2.5, 3.6, 4.0));
        assert_eq!(
            bounds,
            Bounds {
                left: 1,
                top: -2,
                right: 5,
                bottom: 1
            }
        );
    }

    #[test]
    fn radius_and_pen_rounding() {
        assert_eq!(corner_radius(0.0), 0);
        assert_eq!(corner_radius(0.4), 0);
        assert_eq!(corner_radius(2.5), 3);
        assert_eq!(pen_width(0.0), 1);
        assert_eq!(pen_width(2.4), 2);
        assert_eq!(pen_width(2.6), 3);
    }

    #[test]
    fn xform_reads_row_major_matrix() {
        assert_eq!(xform(None), [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(
            xform(Some(&Mat3::translate(5.0, -3.0))),
            [1.0, 0.0, 0.0, 1.0, 5.0, -3.0]
        );
        let shear = Mat3 {
            m: [1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 1.0],
        };
        // x' = x + 2y, y' = 3x + 4y
        assert_eq!(xform(Some(&shear)), [1.0, 3.0, 2.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn quadratic_elevation() {
        let [c1, c2] = quad_to_cubic((0.0, 0.0), (3.0, 3.0), (6.0, 0.0));
        assert_eq!(c1, (2.0, 2.0));
        assert_eq!(c2, (4.0, 2.0));
    }

    #[test]
    fn path_lowering() {
        let mut path = Path::new();
        path.move_to(0.0, 0.0)
            .line_to(6.0, 0.0)
            .quad_to(3.0, 3.0, 0.0, 0.0)
            .cubic_to(1.0, 1.0, 2.0, 2.0, 3.5, 3.9)
            .close();
        assert_eq!(
            path_segments(&path).unwrap(),
            vec![
                Segment::MoveTo(Point::new(0, 0)),
                Segment::LineTo(Point::new(6, 0)),
                Segment::BezierTo([Point::new(4, 2), Point::new(2, 2), Point::new(0, 0)]),
                Segment::BezierTo([Point::new(1, 1), Point::new(2, 2), Point::new(3, 3)]),
                Segment::CloseFigure,
            ]
        );
    }

    #[test]
    fn path_without_current_point() {
        let mut path = Path::new();
        path.quad_to(1.0, 1.0, 2.0, 2.0);
        assert_eq!(path_segments(&path), Err(Error::State));

        let mut reclosed = Path::new();
        reclosed.move_to(0.0, 0.0).close().close();
        assert_eq!(path_segments(&reclosed), Err(Error::State));

        assert_eq!(path_segments(&Path::new()), Ok(Vec::new()));
    }

    #[test]
    fn blit_prefers_alpha_blend() {
        assert_eq!(
            plan_blit(&FULL, &FULL, 0.5, (8, 8), true),
            Ok(Blit::AlphaBlend {
                src: Region::from_rect(&FULL),
                dst: Region::from_rect(&FULL),
                alpha: 128,
            })
        );
    }

    #[test]
    fn blit_without_alpha_blend_needs_full_opacity() {
        assert_eq!(
            plan_blit(&FULL, &FULL, 0.5, (8, 8), false),
            Err(Error::Unsupported)
        );
        assert_eq!(
            plan_blit(&FULL, &FULL, 1.0, (8, 8), false),
            Ok(Blit::Stretch {
                src: Region::from_rect(&FULL),
                dst: Region::from_rect(&FULL),
            })
        );
    }

    #[test]
    fn blit_skips_invisible_draws() {
        let empty = Rect::new(0.0, 0.0, 0.0, 8.0);
        assert_eq!(plan_blit(&empty, &FULL, 1.0, (8, 8), false), Ok(Blit::Skip));
        assert_eq!(plan_blit(&FULL, &empty, 1.0, (8, 8), false), Ok(Blit::Skip));
        assert_eq!(plan_blit(&FULL, &FULL, 0.0, (8, 8), false), Ok(Blit::Skip));
    }

    #[test]
    fn blit_source_must_fit_texture() {
        let outside = Rect::new(4.0, 0.0, 8.0, 8.0);
        assert_eq!(plan_blit(&outside, &FULL, 1.0, (8, 8), true), Err(Error::Range));
        // Degenerate rectangles win over the bounds check.
        let tiny = Rect::new(100.0, 0.0, 0.5, 8.0);
        assert_eq!(plan_blit(&tiny, &FULL, 1.0, (8, 8), true), Ok(Blit::Skip));
    }

    #[test]
    fn update_regions() {
        assert_eq!(region_within(0, 0, 4, 4, 4, 4), Ok(()));
        assert_eq!(region_within(1, 0, 4, 4, 4, 4), Err(Error::Range));
        assert_eq!(region_within(0, 0, i32::MAX, 1, 4, 4), Err(Error::Range));
    }
}
