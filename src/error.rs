//! Error handling utilities for Windows API calls and PE decoding.
//!
//! One error type covers OS failures (as HRESULTs with their system message)
//! and malformed PE images.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A Windows API error with its HRESULT and system message.
    #[error("Windows API error {code:#010x}: {message}")]
    Windows {
        /// The HRESULT reported by the API (Win32 codes are wrapped as `0x8007xxxx`).
        code: i32,
        /// The system-provided message for the code.
        message: String,
    },

    /// An invalid handle was provided or returned.
    #[error("Invalid handle: {context}")]
    InvalidHandle {
        /// Description of the invalid handle context.
        context: &'static str,
    },

    /// A string conversion error occurred.
    #[error("String conversion error: {0}")]
    StringConversion(String),

    /// A buffer was too small for the requested operation.
    #[error("Buffer too small: needed {needed}, got {actual}")]
    BufferTooSmall {
        /// The required buffer size.
        needed: usize,
        /// The actual buffer size provided.
        actual: usize,
    },

    /// The requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access was denied to the requested resource.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The running system does not provide the requested interface or entry point.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image ended before a header field could be read.
    #[error("Truncated image: needed {needed} bytes at offset {offset:#x}")]
    Truncated {
        /// Offset of the read that failed.
        offset: u64,
        /// Number of bytes the read wanted.
        needed: usize,
    },

    /// The file does not start with the `MZ` DOS signature.
    #[error("Invalid DOS signature {0:#06x}")]
    InvalidDosSignature(u16),

    /// The `PE\0\0` signature was not found at `e_lfanew`.
    #[error("Invalid PE signature {found:#010x} at offset {offset:#x}")]
    InvalidPeSignature {
        /// Offset named by `e_lfanew`.
        offset: u32,
        /// The four bytes actually found there.
        found: u32,
    },

    /// The optional header magic is neither PE32 nor PE32+.
    #[error("Unsupported optional header magic {0:#06x}")]
    UnsupportedOptionalHeader(u16),

    /// Two entries of a set share an id that must be unique.
    #[error("Duplicate id {0}")]
    DuplicateId(u32),

    /// A custom error with a message.
    #[error("{0}")]
    Custom(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new invalid handle error with the given context.
    pub fn invalid_handle(context: &'static str) -> Self {
        Error::InvalidHandle { context }
    }

    /// Creates a new string conversion error.
    pub fn string_conversion(msg: impl Into<String>) -> Self {
        Error::StringConversion(msg.into())
    }

    /// Creates a new buffer too small error.
    pub fn buffer_too_small(needed: usize, actual: usize) -> Self {
        Error::BufferTooSmall { needed, actual }
    }

    /// Creates a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a new access denied error.
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Error::AccessDenied(msg.into())
    }

    /// Creates a new unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Creates a new duplicate id error.
    pub fn duplicate_id(id: u32) -> Self {
        Error::DuplicateId(id)
    }

    /// Creates a custom error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Creates a Windows error from a raw Win32 error code (as returned by `GetLastError`
    /// or by APIs that return `WIN32_ERROR`/`LONG` status values directly).
    pub fn from_win32_code(code: u32) -> Self {
        let hresult = if code == 0 || (code as i32) < 0 {
            code as i32
        } else {
            ((code & 0x0000_FFFF) | 0x8007_0000) as i32
        };
        Error::Windows {
            code: hresult,
            message: win32_message(hresult),
        }
    }

    /// Returns the HRESULT if this is a Windows error.
    pub fn win32_error_code(&self) -> Option<u32> {
        match self {
            Error::Windows { code, .. } => Some(*code as u32),
            _ => None,
        }
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for Error {
    fn from(err: windows::core::Error) -> Self {
        Error::Windows {
            code: err.code().0,
            message: err.message(),
        }
    }
}

#[cfg(windows)]
fn win32_message(hresult: i32) -> String {
    windows::core::HRESULT(hresult).message()
}

#[cfg(not(windows))]
fn win32_message(_hresult: i32) -> String {
    String::new()
}

/// Extension trait for converting Windows `Result` types.
#[cfg(windows)]
pub trait ResultExt<T> {
    /// Converts a Windows result to our Result type.
    fn to_result(self) -> Result<T>;
}

#[cfg(windows)]
impl<T> ResultExt<T> for windows::core::Result<T> {
    fn to_result(self) -> Result<T> {
        self.map_err(Error::from)
    }
}

/// Gets the last Windows error as our Error type.
#[cfg(windows)]
pub fn last_error() -> Error {
    Error::from(windows::core::Error::from_win32())
}
