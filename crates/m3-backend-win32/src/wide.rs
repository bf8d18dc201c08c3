#![forbid(unsafe_code)]

//! UTF-8 / UTF-16 conversion at the Win32 boundary.

use m3_core::{Error, Result};

/// Encode `text` as a NUL-terminated wide string.
///
/// Interior NULs would silently truncate the string on the Win32 side, so
/// they are rejected.
pub fn to_wide(text: &str) -> Result<Vec<u16>> {
    if text.contains('\0') {
        return Err(Error::InvalidArgument);
    }
    let mut wide = Vec::new();
    wide.try_reserve_exact(text.len() + 1)
        .map_err(|_| Error::OutOfMemory)?;
    wide.extend(text.encode_utf16());
    wide.push(0);
    Ok(wide)
}

/// Decode wide text up to the first NUL, replacing unpaired surrogates.
#[must_use]
pub fn from_wide(wide: &[u16]) -> String {
    let end = wide.iter().position(|&unit| unit == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

/// Length of a wide string without its terminator.
#[must_use]
pub fn wide_len(wide: &[u16]) -> usize {
    wide.len().saturating_sub(1)
}
