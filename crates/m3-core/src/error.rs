#![forbid(unsafe_code)]

//! Error code space shared by every LibM3C component.
//!
//! Each variant corresponds to a stable negative integer code. Success is
//! `Ok(..)` rather than a code; [`OK`] is kept for callers that bridge to
//! integer status values.

use thiserror::Error;

/// Integer status value for success.
pub const OK: i32 = 0;

/// Failure kinds reported by LibM3C operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Error {
    #[error("unknown error")]
    Unknown,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("out of memory")]
    OutOfMemory,
    #[error("not found")]
    NotFound,
    #[error("not ready")]
    NotReady,
    #[error("unsupported")]
    Unsupported,
    #[error("i/o failure")]
    Io,
    #[error("invalid state")]
    State,
    #[error("value out of range")]
    Range,
    #[error("timed out")]
    Timeout,
    #[error("permission denied")]
    Permission,
    #[error("busy")]
    Busy,
    #[error("corrupt data")]
    Corrupt,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
}

/// Result alias used throughout the workspace.
pub type Result<T, E = Error> = core::result::Result<T, E>;

impl Error {
    /// Every variant, in code order (-1 downwards).
    pub const ALL: [Error; 15] = [
        Error::Unknown,
        Error::InvalidArgument,
        Error::OutOfMemory,
        Error::NotFound,
        Error::NotReady,
        Error::Unsupported,
        Error::Io,
        Error::State,
        Error::Range,
        Error::Timeout,
        Error::Permission,
        Error::Busy,
        Error::Corrupt,
        Error::Overflow,
        Error::Underflow,
    ];

    /// Stable integer code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Error::Unknown => -1,
            Error::InvalidArgument => -2,
            Error::OutOfMemory => -3,
            Error::NotFound => -4,
            Error::NotReady => -5,
            Error::Unsupported => -6,
            Error::Io => -7,
            Error::State => -8,
            Error::Range => -9,
            Error::Timeout => -10,
            Error::Permission => -11,
            Error::Busy => -12,
            Error::Corrupt => -13,
            Error::Overflow => -14,
            Error::Underflow => -15,
        }
    }

    /// Map an integer code back to an error.
    ///
    /// Returns `None` for [`OK`] and for codes outside the known space.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Error> {
        if code >= 0 || code < -15 {
            return None;
        }
        Some(Error::ALL[(-code - 1) as usize])
    }
}

/// Collapse a result into an integer status value.
#[must_use]
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => OK,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Unknown.code(), -1);
        assert_eq!(Error::State.code(), -8);
        assert_eq!(Error::Busy.code(), -12);
        assert_eq!(Error::Underflow.code(), -15);
    }

    #[test]
    fn from_code_inverts_code() {
        for err in Error::ALL {
            assert_eq!(Error::from_code(err.code()), Some(err));
        }
    }

    #[test]
    fn from_code_rejects_unknown_values() {
        assert_eq!(Error::from_code(OK), None);
        assert_eq!(Error::from_code(1), None);
        assert_eq!(Error::from_code(-16), None);
        assert_eq!(Error::from_code(i32::MIN), None);
    }

    #[test]
    fn status_code_maps_results() {
        assert_eq!(status_code::<()>(&Ok(())), OK);
        assert_eq!(status_code::<()>(&Err(Error::Range)), -9);
    }

    #[test]
    fn display_is_lowercase_message() {
        assert_eq!(Error::OutOfMemory.to_string(), "out of memory");
        assert_eq!(Error::State.to_string(), "invalid state");
    }
}
