//! # Win32 Surface
//!
//! Safe Rust wrappers for a slice of the Windows desktop API, plus a portable
//! PE/COFF header reader.
//!
//! - **PE headers** ([`pe`]): DOS, COFF, optional header, data directories,
//!   section table and the CLR header; machine type and managed/native
//!   classification of executables. Works on every platform.
//! - **Windows** ([`window`]): find, enumerate, query and reposition windows.
//! - **GDI** ([`gdi`]): device contexts, device capabilities, monitors and
//!   display modes.
//! - **Display configuration** ([`display`]): `QueryDisplayConfig` paths and
//!   modes, device names, topology switching.
//! - **DPI** ([`dpi`]): awareness with fallbacks for older systems, per-window
//!   and per-monitor DPI, scaling helpers.
//! - **Taskbar** ([`taskbar`]): progress, overlays, thumbnail toolbars and tab
//!   registration through `ITaskbarList3`/`ITaskbarList4`.
//! - **Console** ([`console`]): control-event handlers and console attachment.
//! - **Modules** ([`module`]): library loading and symbol lookup.
//!
//! Value types, flag sets and the pure parts of each module compile on every
//! target; anything that calls into the OS is only present on Windows.
//!
//! ## Quick Start
//!
//! ```no_run
//! use win32_surface::pe::{classify, dll_machine_type, PeHeaders};
//!
//! let machine = dll_machine_type("app.exe")?;
//! println!("machine: {machine}");
//!
//! let headers = PeHeaders::from_file("app.exe")?;
//! for (entry, dir) in headers.present_directories() {
//!     println!("{:<16} rva={:#x} size={:#x}", entry.name(), dir.virtual_address, dir.size);
//! }
//! println!("kind: {}", classify("app.exe")?);
//!
//! # Ok::<(), win32_surface::error::Error>(())
//! ```
//!
//! ## Feature Highlights
//!
//! ### DPI Awareness
//!
//! The best available mechanism is used, from per-monitor v2 contexts down to
//! `SetProcessDPIAware`:
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_surface::error::Result<()> {
//! use win32_surface::dpi::{dpi_for_window, set_process_awareness, DpiAwareness, DpiScale};
//! use win32_surface::window::WindowHandle;
//!
//! let applied = set_process_awareness(DpiAwareness::PerMonitorAwareV2)?;
//! println!("running as {applied:?}");
//!
//! let scale = DpiScale::from_dpi(dpi_for_window(WindowHandle::foreground()?)?);
//! println!("100px is {}px at {}%", scale.scale(100), scale.percent());
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ### Display Paths
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_surface::error::Result<()> {
//! use win32_surface::display::{DisplayConfig, QueryFlags};
//!
//! let config = DisplayConfig::query(QueryFlags::ONLY_ACTIVE_PATHS)?;
//! for display in config.displays() {
//!     println!("{:?} @ {:.2}Hz", display.friendly_name, display.refresh_rate);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ### Console Control Events
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_surface::error::Result<()> {
//! use win32_surface::console::{ctrl_channel, CtrlEvent};
//!
//! let events = ctrl_channel()?;
//! while let Ok(event) = events.recv() {
//!     if event == CtrlEvent::CtrlC {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

#![warn(missing_docs)]

// Core modules
pub mod error;
pub mod geometry;
pub mod string;

// Binary formats
pub mod pe;

// Desktop surfaces
pub mod console;
pub mod display;
pub mod dpi;
pub mod gdi;
pub mod taskbar;

#[cfg(windows)]
pub mod module;
#[cfg(windows)]
pub mod window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::pe::{classify, dll_machine_type, ImageKind, Machine, PeHeaders};
    pub use crate::string::{from_wide, to_wide, WideString};

    pub use crate::console::CtrlEvent;
    pub use crate::display::{DisplayConfig, QueryFlags};
    pub use crate::dpi::{DpiAwareness, DpiScale};
    pub use crate::gdi::{Color, DisplayMode, MonitorInfo};
    pub use crate::taskbar::{Progress, ProgressState};

    #[cfg(windows)]
    pub use crate::console::CtrlHandlerGuard;
    #[cfg(windows)]
    pub use crate::error::ResultExt;
    #[cfg(windows)]
    pub use crate::gdi::Monitor;
    #[cfg(windows)]
    pub use crate::module::Library;
    #[cfg(windows)]
    pub use crate::taskbar::{ComApartment, Taskbar};
    #[cfg(windows)]
    pub use crate::window::{enumerate_windows, ShowCommand, WindowHandle};
}
