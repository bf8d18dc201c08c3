#![forbid(unsafe_code)]

//! Window style bits derived from [`WindowFlags`].
//!
//! The values are the documented `WS_*` constants, kept here so the mapping
//! is testable on every target.

use m3_backend::WindowFlags;

pub const WS_OVERLAPPED: u32 = 0x0000_0000;
pub const WS_POPUP: u32 = 0x8000_0000;
pub const WS_CAPTION: u32 = 0x00C0_0000;
pub const WS_SYSMENU: u32 = 0x0008_0000;
pub const WS_SIZEBOX: u32 = 0x0004_0000;
pub const WS_MINIMIZEBOX: u32 = 0x0002_0000;
pub const WS_MAXIMIZEBOX: u32 = 0x0001_0000;
pub const WS_EX_TOPMOST: u32 = 0x0000_0008;

/// `dwStyle` / `dwExStyle` pair passed to `CreateWindowExW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStyle {
    pub style: u32,
    pub ex_style: u32,
}

impl WindowStyle {
    /// Fullscreen wins over borderless; `RESIZABLE` only affects framed
    /// windows.
    #[must_use]
    pub fn from_flags(flags: WindowFlags) -> Self {
        if flags.contains(WindowFlags::FULLSCREEN) {
            return Self {
                style: WS_POPUP,
                ex_style: WS_EX_TOPMOST,
            };
        }
        if flags.contains(WindowFlags::BORDERLESS) {
            return Self {
                style: WS_POPUP,
                ex_style: 0,
            };
        }
        let mut style = WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;
        if flags.contains(WindowFlags::RESIZABLE) {
            style |= WS_SIZEBOX | WS_MAXIMIZEBOX;
        }
        Self { style, ex_style: 0 }
    }

    /// Fullscreen windows cover the primary screen instead of the requested
    /// client size.
    #[must_use]
    pub fn covers_screen(flags: WindowFlags) -> bool {
        flags.contains(WindowFlags::FULLSCREEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMED: u32 = WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;

    #[test]
    fn plain_window_is_framed_and_fixed_size() {
        let style = WindowStyle::from_flags(WindowFlags::empty());
        assert_eq!(style.style, FRAMED);
        assert_eq!(style.style & WS_SIZEBOX, 0);
        assert_eq!(style.ex_style, 0);
    }

    #[test]
    fn resizable_adds_sizing_frame() {
        let style = WindowStyle::from_flags(WindowFlags::RESIZABLE | WindowFlags::HIGH_DPI);
        assert_eq!(style.style, FRAMED | WS_SIZEBOX | WS_MAXIMIZEBOX);
    }

    #[test]
    fn borderless_ignores_resizable() {
        let style = WindowStyle::from_flags(WindowFlags::BORDERLESS | WindowFlags::RESIZABLE);
        assert_eq!(
            style,
            WindowStyle {
                style: WS_POPUP,
                ex_style: 0
            }
        );
    }

    #[test]
    fn fullscreen_is_topmost_popup() {
        let flags = WindowFlags::FULLSCREEN | WindowFlags::BORDERLESS;
        assert_eq!(
            WindowStyle::from_flags(flags),
            WindowStyle {
                style: WS_POPUP,
                ex_style: WS_EX_TOPMOST
            }
        );
        assert!(WindowStyle::covers_screen(flags));
        assert!(!WindowStyle::covers_screen(WindowFlags::BORDERLESS));
    }

    #[cfg(windows)]
    #[test]
    fn constants_match_system_headers() {
        use winapi::um::winuser;

        assert_eq!(WS_POPUP, winuser::WS_POPUP);
        assert_eq!(WS_CAPTION, winuser::WS_CAPTION);
        assert_eq!(WS_SYSMENU, winuser::WS_SYSMENU);
        assert_eq!(WS_SIZEBOX, winuser::WS_SIZEBOX);
        assert_eq!(WS_MINIMIZEBOX, winuser::WS_MINIMIZEBOX);
        assert_eq!(WS_MAXIMIZEBOX, winuser::WS_MAXIMIZEBOX);
        assert_eq!(WS_EX_TOPMOST, winuser::WS_EX_TOPMOST);
    }
}
