#![forbid(unsafe_code)]

//! Translation of window messages into [`InputEvent`]s.
//!
//! The window procedure feeds every message through [`translate`]; messages
//! that produce no event fall through to `DefWindowProcW`.

use m3_backend::{
    EventData, InputEvent, InputKind, KeyEvent, Modifiers, PointerEvent, TextEvent, WindowEvent,
};
use m3_core::Handle;

pub const WM_SIZE: u32 = 0x0005;
pub const WM_SETFOCUS: u32 = 0x0007;
pub const WM_KILLFOCUS: u32 = 0x0008;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MOUSEWHEEL: u32 = 0x020A;

pub const VK_SHIFT: i32 = 0x10;
pub const VK_CONTROL: i32 = 0x11;
pub const VK_MENU: i32 = 0x12;
pub const VK_CAPITAL: i32 = 0x14;
pub const VK_LWIN: i32 = 0x5B;
pub const VK_RWIN: i32 = 0x5C;
pub const VK_NUMLOCK: i32 = 0x90;

/// Bit 30 of a key message's `lParam`: the key was already down.
const KEY_PREVIOUS_STATE: isize = 1 << 30;

fn loword(value: usize) -> u16 {
    (value & 0xffff) as u16
}

fn hiword(value: usize) -> u16 {
    ((value >> 16) & 0xffff) as u16
}

/// Signed coordinate packed in the low word.
fn x_param(lparam: isize) -> i32 {
    i32::from(loword(lparam as usize) as i16)
}

fn y_param(lparam: isize) -> i32 {
    i32::from(hiword(lparam as usize) as i16)
}

/// Modifier state from a `GetKeyState`-shaped query.
///
/// The high bit reports a held key; the low bit the lock toggles.
pub fn modifiers_from(key_state: impl Fn(i32) -> i16) -> Modifiers {
    let held = |vk: i32| (key_state(vk) as u16) & 0x8000 != 0;
    let toggled = |vk: i32| (key_state(vk) as u16) & 0x0001 != 0;

    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, held(VK_SHIFT));
    modifiers.set(Modifiers::CTRL, held(VK_CONTROL));
    modifiers.set(Modifiers::ALT, held(VK_MENU));
    modifiers.set(Modifiers::META, held(VK_LWIN) || held(VK_RWIN));
    modifiers.set(Modifiers::CAPS, toggled(VK_CAPITAL));
    modifiers.set(Modifiers::NUM, toggled(VK_NUMLOCK));
    modifiers
}

/// Joins `WM_CHAR` UTF-16 units into characters across surrogate pairs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharDecoder {
    high: Option<u16>,
}

impl CharDecoder {
    /// Feed one unit; returns a character once one is complete.
    ///
    /// Unpaired surrogates are dropped.
    pub fn push(&mut self, unit: u16) -> Option<char> {
        match unit {
            0xD800..=0xDBFF => {
                self.high = Some(unit);
                None
            }
            0xDC00..=0xDFFF => {
                let high = self.high.take()?;
                char::decode_utf16([high, unit]).next()?.ok()
            }
            _ => {
                self.high = None;
                char::from_u32(u32::from(unit))
            }
        }
    }
}

/// Per-message context captured by the window procedure.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext {
    pub window: Handle,
    pub time_ms: u32,
    pub modifiers: Modifiers,
}

/// Turn one message into an event.
///
/// `Some(None)` means the message was consumed without producing an event;
/// `None` means it is not an input message.
pub fn translate(
    msg: u32,
    wparam: usize,
    lparam: isize,
    ctx: MessageContext,
    chars: &mut CharDecoder,
) -> Option<Option<InputEvent>> {
    let event = |kind: InputKind| {
        InputEvent::new(kind, ctx.window, ctx.time_ms).with_modifiers(ctx.modifiers)
    };
    let pointer = |kind: InputKind| {
        event(kind).with_data(EventData::Pointer(PointerEvent {
            pointer_id: 0,
            x: x_param(lparam),
            y: y_param(lparam),
            buttons: wparam as i32,
            ..PointerEvent::default()
        }))
    };
    let key = |kind: InputKind, is_repeat: bool| {
        event(kind).with_data(EventData::Key(KeyEvent {
            key_code: wparam as u32,
            native_code: wparam as u32,
            is_repeat,
        }))
    };

    let translated = match msg {
        WM_CLOSE => event(InputKind::WindowClose),
        WM_SETFOCUS => event(InputKind::WindowFocus),
        WM_KILLFOCUS => event(InputKind::WindowBlur),
        WM_SIZE => event(InputKind::WindowResize).with_data(EventData::Window(WindowEvent {
            width: i32::from(loword(lparam as usize)),
            height: i32::from(hiword(lparam as usize)),
        })),
        WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN => pointer(InputKind::PointerDown),
        WM_LBUTTONUP | WM_RBUTTONUP | WM_MBUTTONUP => pointer(InputKind::PointerUp),
        WM_MOUSEMOVE => pointer(InputKind::PointerMove),
        WM_MOUSEWHEEL => event(InputKind::PointerScroll).with_data(EventData::Pointer(
            PointerEvent {
                pointer_id: 0,
                x: x_param(lparam),
                y: y_param(lparam),
                buttons: 0,
                scroll_x: 0,
                scroll_y: i32::from(hiword(wparam) as i16),
            },
        )),
        WM_KEYDOWN | WM_SYSKEYDOWN => key(InputKind::KeyDown, lparam & KEY_PREVIOUS_STATE != 0),
        WM_KEYUP | WM_SYSKEYUP => key(InputKind::KeyUp, false),
        WM_CHAR => {
            return Some(
                chars
                    .push(loword(wparam))
                    .map(|ch| event(InputKind::Text).with_data(EventData::Text(TextEvent::from_char(ch)))),
            );
        }
        _ => return None,
    };
    Some(Some(translated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> MessageContext {
        MessageContext {
            window: Handle::new(3, 1),
            time_ms: 1234,
            modifiers: Modifiers::CTRL,
        }
    }

    fn one(msg: u32, wparam: usize, lparam: isize) -> InputEvent {
        translate(msg, wparam, lparam, ctx(), &mut CharDecoder::default())
            .flatten()
            .unwrap()
    }

    fn make_lparam(lo: u16, hi: u16) -> isize {
        ((u32::from(hi) << 16) | u32::from(lo)) as i32 as isize
    }

    #[test]
    fn window_messages() {
        let close = one(WM_CLOSE, 0, 0);
        assert_eq!(close.kind, InputKind::WindowClose);
        assert_eq!(close.window, Handle::new(3, 1));
        assert_eq!(close.time_ms, 1234);
        assert_eq!(close.modifiers, Modifiers::CTRL);
        assert_eq!(one(WM_SETFOCUS, 0, 0).kind, InputKind::WindowFocus);
        assert_eq!(one(WM_KILLFOCUS, 0, 0).kind, InputKind::WindowBlur);

        let resize = one(WM_SIZE, 0, make_lparam(800, 600));
        assert_eq!(resize.kind, InputKind::WindowResize);
        assert_eq!(
            resize.data,
            EventData::Window(WindowEvent {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn pointer_coordinates_are_signed() {
        let down = one(WM_RBUTTONDOWN, 0x0002, make_lparam(-5i16 as u16, 40));
        assert_eq!(down.kind, InputKind::PointerDown);
        assert_eq!(
            down.data,
            EventData::Pointer(PointerEvent {
                pointer_id: 0,
                x: -5,
                y: 40,
                buttons: 2,
                scroll_x: 0,
                scroll_y: 0,
            })
        );
        assert_eq!(one(WM_MBUTTONUP, 0, 0).kind, InputKind::PointerUp);
        assert_eq!(one(WM_MOUSEMOVE, 1, 0).kind, InputKind::PointerMove);
    }

    #[test]
    fn wheel_delta_from_high_word() {
        let wparam = ((-120i16 as u16 as usize) << 16) | 0x0004;
        let scroll = one(WM_MOUSEWHEEL, wparam, make_lparam(10, 20));
        assert_eq!(scroll.kind, InputKind::PointerScroll);
        match scroll.data {
            EventData::Pointer(p) => {
                assert_eq!((p.x, p.y), (10, 20));
                assert_eq!(p.scroll_y, -120);
                assert_eq!(p.scroll_x, 0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn key_repeat_bit() {
        let first = one(WM_KEYDOWN, 0x41, 0x0001_0001);
        assert_eq!(
            first.data,
            EventData::Key(KeyEvent {
                key_code: 0x41,
                native_code: 0x41,
                is_repeat: false
            })
        );
        let repeat = one(WM_SYSKEYDOWN, 0x41, 0x4001_0001);
        assert!(matches!(repeat.data, EventData::Key(KeyEvent { is_repeat: true, .. })));
        let up = one(WM_KEYUP, 0x41, 0x4001_0001);
        assert_eq!(up.kind, InputKind::KeyUp);
        assert!(matches!(up.data, EventData::Key(KeyEvent { is_repeat: false, .. })));
    }

    #[test]
    fn char_messages_join_surrogates() {
        let mut chars = CharDecoder::default();
        let first = translate(WM_CHAR, 0xD83E, 0, ctx(), &mut chars);
        assert_eq!(first, Some(None));
        let second = translate(WM_CHAR, 0xDD80, 0, ctx(), &mut chars)
            .flatten()
            .unwrap();
        assert_eq!(second.kind, InputKind::Text);
        assert_eq!(second.data, EventData::Text(TextEvent::from_char('🦀')));

        let e = translate(WM_CHAR, 0xE9, 0, ctx(), &mut chars).flatten().unwrap();
        assert_eq!(e.data, EventData::Text(TextEvent::from_char('é')));
    }

    #[test]
    fn lone_low_surrogate_is_dropped() {
        let mut chars = CharDecoder::default();
        assert_eq!(chars.push(0xDC00), None);
        assert_eq!(chars.push(u16::from(b'a')), Some('a'));
    }

    #[test]
    fn other_messages_fall_through() {
        assert_eq!(
            translate(0x000F, 0, 0, ctx(), &mut CharDecoder::default()),
            None
        );
    }

    #[test]
    fn modifier_bits() {
        let state = |vk: i32| -> i16 {
            match vk {
                VK_SHIFT | VK_RWIN => i16::MIN,
                VK_CAPITAL => 1,
                VK_NUMLOCK => i16::MIN,
                _ => 0,
            }
        };
        assert_eq!(
            modifiers_from(state),
            Modifiers::SHIFT | Modifiers::META | Modifiers::CAPS
        );
        assert_eq!(modifiers_from(|_| 0), Modifiers::empty());
    }
}
