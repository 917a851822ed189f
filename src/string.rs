//! String conversion utilities for Windows APIs.
//!
//! Windows APIs use UTF-16 encoded strings (wide strings), while Rust uses UTF-8.
//! Besides the null-terminated forms, many of the structures this crate mirrors
//! embed fixed-size `WCHAR` arrays (`szDevice[32]`, `szTip[260]`,
//! `monitorFriendlyDeviceName[64]`), so there are helpers for those too.

use crate::error::{Error, Result};

/// Converts a Rust string to a null-terminated UTF-16 vector.
///
/// # Example
///
/// ```
/// use win32_surface::string::to_wide;
///
/// let wide = to_wide("Hello");
/// assert_eq!(wide, vec![72, 101, 108, 108, 111, 0]);
/// ```
#[inline]
pub fn to_wide(s: &str) -> Vec<u16> {
    // UTF-16 length is at most the UTF-8 length, +1 for the terminator.
    let mut result = Vec::with_capacity(s.len() + 1);
    result.extend(s.encode_utf16());
    result.push(0);
    result
}

/// Converts a UTF-16 slice to a Rust `String`, stopping at the first null.
///
/// The slice may or may not include the null terminator, which makes this
/// the right call for fixed-size `WCHAR` arrays embedded in structures.
///
/// # Example
///
/// ```
/// use win32_surface::string::{to_wide, from_wide};
///
/// let wide = to_wide("Hello");
/// let s = from_wide(&wide).unwrap();
/// assert_eq!(s, "Hello");
/// ```
#[inline]
pub fn from_wide(wide: &[u16]) -> Result<String> {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16(&wide[..len])
        .map_err(|_| Error::string_conversion("Invalid UTF-16 sequence"))
}

/// Like [`from_wide`], replacing invalid sequences with U+FFFD instead of failing.
///
/// Window titles and device names come from other processes and drivers; a
/// lone surrogate there should not make an enumeration fail.
#[inline]
pub fn from_wide_lossy(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

/// Copies `s` into a fixed-size `WCHAR` array, null-terminating it.
///
/// Fails with [`Error::BufferTooSmall`] when the string plus its terminator
/// does not fit. The remainder of `dest` is zeroed.
pub fn copy_to_fixed(s: &str, dest: &mut [u16]) -> Result<()> {
    let needed = s.encode_utf16().count() + 1;
    if needed > dest.len() {
        return Err(Error::buffer_too_small(needed, dest.len()));
    }

    dest.fill(0);
    for (slot, unit) in dest.iter_mut().zip(s.encode_utf16()) {
        *slot = unit;
    }
    Ok(())
}

/// PCWSTR helper - a wrapper for passing wide strings to Windows APIs.
///
/// This type holds ownership of the string buffer and provides a pointer
/// that can be passed to Windows APIs expecting `PCWSTR`.
#[derive(Clone, Debug)]
pub struct WideString {
    buffer: Vec<u16>,
}

impl WideString {
    /// Creates a new `WideString` from a Rust string.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self { buffer: to_wide(s) }
    }

    /// Creates a new `WideString` from a path.
    #[cfg(windows)]
    #[inline]
    pub fn from_path(path: &std::path::Path) -> Self {
        use std::os::windows::ffi::OsStrExt;

        let os_str = path.as_os_str();
        let mut buffer = Vec::with_capacity(os_str.len() + 1);
        buffer.extend(os_str.encode_wide());
        buffer.push(0);
        Self { buffer }
    }

    /// Returns a pointer to the null-terminated wide string.
    #[inline]
    pub fn as_ptr(&self) -> *const u16 {
        self.buffer.as_ptr()
    }

    /// Returns the string as a PCWSTR for use with Windows APIs.
    #[cfg(windows)]
    #[inline]
    pub fn as_pcwstr(&self) -> windows::core::PCWSTR {
        windows::core::PCWSTR::from_raw(self.buffer.as_ptr())
    }

    /// Returns the length in UTF-16 code units, not including the null terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    /// Returns true if the string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the underlying buffer, including the terminator.
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.buffer
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WideString {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}
