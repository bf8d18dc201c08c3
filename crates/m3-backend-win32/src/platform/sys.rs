//! Process-level kernel32/user32 queries.

use std::ptr;

use m3_backend::Modifiers;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::sysinfoapi::GetTickCount;
use winapi::um::winbase::{
    FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS, FormatMessageW,
};
use winapi::um::winuser::{GetKeyState, GetMessageTime};

use crate::input;
use crate::session::Session;
use crate::wide::from_wide;

pub(crate) fn last_error() -> u32 {
    // SAFETY: reads the calling thread's last-error value.
    unsafe { GetLastError() }
}

/// System description of `code`, trimmed of its trailing line break.
pub(crate) fn error_message(code: u32) -> Option<String> {
    if code == 0 {
        return None;
    }
    let mut buffer = [0u16; 256];
    // SAFETY: the buffer is valid for `buffer.len()` units and no insert
    // arguments are read.
    let written = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            ptr::null(),
            code,
            0,
            buffer.as_mut_ptr(),
            buffer.len() as u32,
            ptr::null_mut(),
        )
    };
    if written == 0 {
        return None;
    }
    let text = from_wide(&buffer[..written as usize]);
    let text = text.trim_end();
    (!text.is_empty()).then(|| text.to_owned())
}

pub(crate) fn tick_count() -> u32 {
    // SAFETY: no preconditions.
    unsafe { GetTickCount() }
}

/// Timestamp of the message being dispatched.
pub(crate) fn message_time() -> u32 {
    // SAFETY: no preconditions.
    unsafe { GetMessageTime() as u32 }
}

pub(crate) fn modifiers() -> Modifiers {
    // SAFETY: GetKeyState only reads the thread's keyboard state.
    input::modifiers_from(|vk| unsafe { GetKeyState(vk) })
}

impl Session {
    /// Log a failed call with the thread's last-error text and return the
    /// error code.
    pub(crate) fn log_last_error(&self, operation: &str) -> u32 {
        let code = last_error();
        let detail = error_message(code);
        self.log_failure(operation, detail.as_deref());
        code
    }
}
