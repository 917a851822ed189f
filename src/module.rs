//! Loaded-module handles.
//!
//! Used to resolve entry points that only exist on newer Windows releases
//! (`SetProcessDpiAwarenessContext`, shcore's `SetProcessDpiAwareness`) so the
//! crate still loads on systems that lack them, and to locate the files of
//! loaded modules for PE inspection.

use crate::error::{Error, Result};
use crate::string::WideString;
use std::path::{Path, PathBuf};
use tracing::debug;
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{
    GetModuleFileNameW, GetModuleHandleW, GetProcAddress, LoadLibraryExW, LOAD_LIBRARY_FLAGS,
    LOAD_LIBRARY_SEARCH_DEFAULT_DIRS, LOAD_LIBRARY_SEARCH_SYSTEM32,
};

/// A loaded module (DLL or executable).
///
/// Modules obtained with [`Library::load`] or [`Library::load_system`] are
/// freed on drop; modules borrowed with [`Library::get`] are not.
pub struct Library {
    handle: HMODULE,
    owned: bool,
}

impl Library {
    /// Loads a library, searching the default directories.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_flags(path.as_ref(), LOAD_LIBRARY_SEARCH_DEFAULT_DIRS)
    }

    /// Loads a library from System32 only.
    pub fn load_system(name: &str) -> Result<Self> {
        Self::load_with_flags(Path::new(name), LOAD_LIBRARY_SEARCH_SYSTEM32)
    }

    fn load_with_flags(path: &Path, flags: LOAD_LIBRARY_FLAGS) -> Result<Self> {
        let path_wide = WideString::from_path(path);

        // SAFETY: the path buffer is null-terminated and outlives the call.
        let handle = unsafe { LoadLibraryExW(path_wide.as_pcwstr(), None, flags)? };
        debug!(path = %path.display(), "loaded library");

        Ok(Self {
            handle,
            owned: true,
        })
    }

    /// Gets a handle to an already-loaded module without taking a reference.
    pub fn get(name: &str) -> Result<Self> {
        let name_wide = WideString::new(name);

        // SAFETY: the name buffer is null-terminated and outlives the call.
        let handle = unsafe { GetModuleHandleW(name_wide.as_pcwstr())? };

        Ok(Self {
            handle,
            owned: false,
        })
    }

    /// Gets a handle to the current executable.
    pub fn current() -> Result<Self> {
        // SAFETY: a null name returns the module of the calling process.
        let handle = unsafe { GetModuleHandleW(None)? };

        Ok(Self {
            handle,
            owned: false,
        })
    }

    /// Looks up an exported function, returning `None` when it is absent.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the export's real signature.
    pub unsafe fn symbol<F: Copy>(&self, name: &str) -> Option<F> {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<unsafe extern "system" fn() -> isize>()
        );
        let name_cstr = std::ffi::CString::new(name).ok()?;

        let proc = GetProcAddress(
            self.handle,
            windows::core::PCSTR(name_cstr.as_ptr() as *const u8),
        );

        proc.map(|p| std::mem::transmute_copy(&p))
    }

    /// Like [`Library::symbol`], failing with [`Error::NotFound`] when the export is absent.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the export's real signature.
    pub unsafe fn get_proc<F: Copy>(&self, name: &str) -> Result<F> {
        self.symbol(name)
            .ok_or_else(|| Error::not_found(format!("Function '{name}' not found")))
    }

    /// Gets the path of the module file.
    pub fn path(&self) -> Result<PathBuf> {
        // Extended-length paths exceed MAX_PATH.
        let mut buffer = vec![0u16; 32768];

        // SAFETY: the buffer is valid for its whole length.
        let len = unsafe { GetModuleFileNameW(self.handle, &mut buffer) } as usize;

        if len == 0 {
            return Err(crate::error::last_error());
        }

        let path_str = crate::string::from_wide(&buffer[..len])?;
        Ok(PathBuf::from(path_str))
    }

    /// Returns the raw module handle.
    pub fn as_raw(&self) -> HMODULE {
        self.handle
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: we hold the reference taken by LoadLibraryExW.
            unsafe {
                let _ = FreeLibrary(self.handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_loaded_module() {
        let kernel32 = Library::get("kernel32.dll").unwrap();
        let path = kernel32.path().unwrap();
        assert!(path.to_string_lossy().to_lowercase().contains("kernel32"));
    }

    #[test]
    fn test_get_proc() {
        let kernel32 = Library::get("kernel32.dll").unwrap();

        type GetCurrentProcessIdFn = unsafe extern "system" fn() -> u32;
        let get_pid: GetCurrentProcessIdFn =
            unsafe { kernel32.get_proc("GetCurrentProcessId").unwrap() };

        assert_eq!(unsafe { get_pid() }, std::process::id());
    }

    #[test]
    fn test_missing_symbol() {
        let kernel32 = Library::get("kernel32.dll").unwrap();
        type Fn0 = unsafe extern "system" fn() -> u32;
        let missing: Option<Fn0> = unsafe { kernel32.symbol("NoSuchExportHere") };
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_system() {
        let user32 = Library::load_system("user32.dll").unwrap();
        assert!(user32.path().unwrap().exists());
    }

    #[test]
    fn test_current_module() {
        let module = Library::current().unwrap();
        assert!(module.path().unwrap().exists());
    }
}
