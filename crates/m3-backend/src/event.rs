#![forbid(unsafe_code)]

//! Input events and the bounded queue backends buffer them in.

use std::collections::VecDeque;

use m3_core::{Error, Handle, Result};

use crate::types::Modifiers;

/// Event kinds, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum InputKind {
    PointerDown = 1,
    PointerUp = 2,
    PointerMove = 3,
    PointerScroll = 4,
    KeyDown = 5,
    KeyUp = 6,
    Text = 7,
    WindowResize = 8,
    WindowClose = 9,
    WindowFocus = 10,
    WindowBlur = 11,
    TextUtf8 = 12,
    TextEdit = 13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerEvent {
    pub pointer_id: i32,
    pub x: i32,
    pub y: i32,
    /// Bitmask of pressed buttons (bit 0 left, bit 1 right, bit 2 middle).
    pub buttons: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub key_code: u32,
    pub native_code: u32,
    pub is_repeat: bool,
}

/// Up to one encoded scalar value of text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextEvent {
    pub utf8: [u8; 8],
    pub length: u32,
}

impl TextEvent {
    /// Encode one character.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        let mut utf8 = [0u8; 8];
        let length = ch.encode_utf8(&mut utf8).len() as u32;
        Self { utf8, length }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.utf8[..self.length as usize]).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextEditEvent {
    pub utf8: String,
    pub cursor: i32,
    pub selection_length: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowEvent {
    pub width: i32,
    pub height: i32,
}

/// Payload carried by an [`InputEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventData {
    #[default]
    None,
    Pointer(PointerEvent),
    Key(KeyEvent),
    Text(TextEvent),
    TextUtf8(String),
    TextEdit(TextEditEvent),
    Window(WindowEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub modifiers: Modifiers,
    pub time_ms: u32,
    pub window: Handle,
    pub data: EventData,
}

impl InputEvent {
    #[must_use]
    pub fn new(kind: InputKind, window: Handle, time_ms: u32) -> Self {
        Self {
            kind,
            modifiers: Modifiers::empty(),
            time_ms,
            window,
            data: EventData::None,
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }
}

/// Fixed-capacity FIFO of pending events.
///
/// The queue never grows: pushing into a full queue fails with
/// [`Error::Overflow`] and leaves the queued events untouched.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
    capacity: usize,
}

impl EventQueue {
    /// Create a queue; a capacity of zero is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument);
        }
        let mut events = VecDeque::new();
        events
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Self { events, capacity })
    }

    pub fn push(&mut self, event: InputEvent) -> Result<()> {
        if self.events.len() >= self.capacity {
            return Err(Error::Overflow);
        }
        self.events.push_back(event);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
