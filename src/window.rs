//! User32 window management.
//!
//! [`WindowHandle`] wraps an `HWND` the caller does not own: it is `Copy`,
//! never destroys the window, and every operation reports the OS error when
//! the window has gone away in the meantime.
//!
//! # Example
//!
//! ```no_run
//! use win32_surface::window::{self, ShowCommand};
//!
//! for w in window::enumerate_windows(|w| w.is_visible() && !w.title().is_empty())? {
//!     println!("{:?} {} ({})", w.as_raw(), w.title(), w.class_name()?);
//! }
//!
//! let notepad = window::WindowHandle::find(Some("Notepad"), None)?;
//! notepad.show(ShowCommand::RESTORE);
//! # Ok::<(), win32_surface::error::Error>(())
//! ```

use crate::error::{last_error, Error, Result};
use crate::geometry::{Point, Rect};
use crate::string::{from_wide_lossy, WideString};
use tracing::trace;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE, WPARAM};
use windows::Win32::System::Console::GetConsoleWindow;
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, FindWindowW, FlashWindowEx, GetAncestor, GetClassNameW,
    GetClientRect, GetDesktopWindow, GetForegroundWindow, GetParent, GetShellWindow,
    GetWindowLongPtrW, GetWindowPlacement, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsIconic, IsWindow, IsWindowVisible, IsZoomed, PostMessageW,
    SetForegroundWindow, SetWindowPlacement, SetWindowPos, SetWindowTextW, ShowWindow,
    WindowFromPoint, FLASHWINFO, FLASHWINFO_FLAGS, FLASHW_ALL, FLASHW_CAPTION, FLASHW_STOP,
    FLASHW_TIMER, FLASHW_TIMERNOFG, FLASHW_TRAY, GA_ROOTOWNER, GWL_EXSTYLE, GWL_STYLE,
    HWND_BOTTOM, HWND_NOTOPMOST, HWND_TOP, HWND_TOPMOST, SET_WINDOW_POS_FLAGS, SHOW_WINDOW_CMD,
    SWP_ASYNCWINDOWPOS, SWP_FRAMECHANGED, SWP_HIDEWINDOW, SWP_NOACTIVATE, SWP_NOMOVE,
    SWP_NOOWNERZORDER, SWP_NOSIZE, SWP_NOZORDER, SWP_SHOWWINDOW, SW_FORCEMINIMIZE, SW_HIDE,
    SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, SW_SHOW, SW_SHOWDEFAULT, SW_SHOWMINIMIZED,
    SW_SHOWMINNOACTIVE, SW_SHOWNA, SW_SHOWNOACTIVATE, SW_SHOWNORMAL, WINDOWPLACEMENT,
    WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE, WS_CAPTION, WS_CHILD, WS_DISABLED,
    WS_EX_APPWINDOW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
    WS_EX_TRANSPARENT, WS_MAXIMIZE, WS_MAXIMIZEBOX, WS_MINIMIZE, WS_MINIMIZEBOX,
    WS_OVERLAPPEDWINDOW, WS_POPUP, WS_SYSMENU, WS_THICKFRAME, WS_VISIBLE,
};

/// Window styles (`WS_*`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Style(pub WINDOW_STYLE);

impl Style {
    /// A standard overlapped window with title bar, border, and system menu.
    pub const OVERLAPPED: Self = Self(WS_OVERLAPPEDWINDOW);
    /// A pop-up window.
    pub const POPUP: Self = Self(WS_POPUP);
    /// A child window.
    pub const CHILD: Self = Self(WS_CHILD);
    /// A window with a caption.
    pub const CAPTION: Self = Self(WS_CAPTION);
    /// A window with a system menu.
    pub const SYSMENU: Self = Self(WS_SYSMENU);
    /// A resizable border.
    pub const THICKFRAME: Self = Self(WS_THICKFRAME);
    /// A minimize button.
    pub const MINIMIZEBOX: Self = Self(WS_MINIMIZEBOX);
    /// A maximize button.
    pub const MAXIMIZEBOX: Self = Self(WS_MAXIMIZEBOX);
    /// Initially minimized.
    pub const MINIMIZE: Self = Self(WS_MINIMIZE);
    /// Initially maximized.
    pub const MAXIMIZE: Self = Self(WS_MAXIMIZE);
    /// A visible window.
    pub const VISIBLE: Self = Self(WS_VISIBLE);
    /// A disabled window.
    pub const DISABLED: Self = Self(WS_DISABLED);

    /// Combines two styles.
    pub fn with(self, other: Self) -> Self {
        Self(WINDOW_STYLE(self.0 .0 | other.0 .0))
    }

    /// True when every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 .0 & other.0 .0 == other.0 .0
    }
}

/// Extended window styles (`WS_EX_*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExStyle(pub WINDOW_EX_STYLE);

impl ExStyle {
    /// No extended styles.
    pub const NONE: Self = Self(WINDOW_EX_STYLE(0));
    /// Always on top.
    pub const TOPMOST: Self = Self(WS_EX_TOPMOST);
    /// Tool window, hidden from the taskbar and Alt+Tab.
    pub const TOOLWINDOW: Self = Self(WS_EX_TOOLWINDOW);
    /// Forces a taskbar button.
    pub const APPWINDOW: Self = Self(WS_EX_APPWINDOW);
    /// Never becomes the foreground window.
    pub const NOACTIVATE: Self = Self(WS_EX_NOACTIVATE);
    /// A layered window.
    pub const LAYERED: Self = Self(WS_EX_LAYERED);
    /// Transparent to hit testing.
    pub const TRANSPARENT: Self = Self(WS_EX_TRANSPARENT);

    /// Combines two extended styles.
    pub fn with(self, other: Self) -> Self {
        Self(WINDOW_EX_STYLE(self.0 .0 | other.0 .0))
    }

    /// True when every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 .0 & other.0 .0 == other.0 .0
    }
}

/// Show window commands (`SW_*`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShowCommand(pub SHOW_WINDOW_CMD);

impl ShowCommand {
    /// Hides the window.
    pub const HIDE: Self = Self(SW_HIDE);
    /// Activates and displays the window in its normal position.
    pub const SHOW_NORMAL: Self = Self(SW_SHOWNORMAL);
    /// Activates and minimizes the window.
    pub const SHOW_MINIMIZED: Self = Self(SW_SHOWMINIMIZED);
    /// Activates and maximizes the window.
    pub const MAXIMIZE: Self = Self(SW_MAXIMIZE);
    /// Shows the window in its most recent position without activating it.
    pub const SHOW_NO_ACTIVATE: Self = Self(SW_SHOWNOACTIVATE);
    /// Activates and shows the window in its current position.
    pub const SHOW: Self = Self(SW_SHOW);
    /// Minimizes the window and activates the next one.
    pub const MINIMIZE: Self = Self(SW_MINIMIZE);
    /// Minimizes the window without activating it.
    pub const SHOW_MIN_NO_ACTIVE: Self = Self(SW_SHOWMINNOACTIVE);
    /// Shows the window in its current state without activating it.
    pub const SHOW_NA: Self = Self(SW_SHOWNA);
    /// Restores a minimized or maximized window.
    pub const RESTORE: Self = Self(SW_RESTORE);
    /// Shows the window in its default state.
    pub const DEFAULT: Self = Self(SW_SHOWDEFAULT);
    /// Minimizes the window even if its thread is not responding.
    pub const FORCE_MINIMIZE: Self = Self(SW_FORCEMINIMIZE);
}

/// `SetWindowPos` flags (`SWP_*`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetPosFlags(pub SET_WINDOW_POS_FLAGS);

impl SetPosFlags {
    /// No flags.
    pub const NONE: Self = Self(SET_WINDOW_POS_FLAGS(0));
    /// Keep the current size.
    pub const NO_SIZE: Self = Self(SWP_NOSIZE);
    /// Keep the current position.
    pub const NO_MOVE: Self = Self(SWP_NOMOVE);
    /// Keep the current Z order.
    pub const NO_Z_ORDER: Self = Self(SWP_NOZORDER);
    /// Do not activate the window.
    pub const NO_ACTIVATE: Self = Self(SWP_NOACTIVATE);
    /// Do not change the owner's Z order.
    pub const NO_OWNER_Z_ORDER: Self = Self(SWP_NOOWNERZORDER);
    /// Send `WM_NCCALCSIZE` even if the size does not change.
    pub const FRAME_CHANGED: Self = Self(SWP_FRAMECHANGED);
    /// Show the window.
    pub const SHOW_WINDOW: Self = Self(SWP_SHOWWINDOW);
    /// Hide the window.
    pub const HIDE_WINDOW: Self = Self(SWP_HIDEWINDOW);
    /// Post the request instead of blocking on the owning thread.
    pub const ASYNC: Self = Self(SWP_ASYNCWINDOWPOS);

    /// Combines two flag sets.
    pub fn with(self, other: Self) -> Self {
        Self(SET_WINDOW_POS_FLAGS(self.0 .0 | other.0 .0))
    }
}

/// Z-order placement for [`WindowHandle::set_position`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertAfter {
    /// Top of the Z order.
    Top,
    /// Bottom of the Z order.
    Bottom,
    /// Above all non-topmost windows, staying there.
    Topmost,
    /// Above all non-topmost windows, dropping topmost status.
    NoTopmost,
    /// Directly below the given window.
    After(WindowHandle),
}

impl InsertAfter {
    fn to_native(self) -> HWND {
        match self {
            InsertAfter::Top => HWND_TOP,
            InsertAfter::Bottom => HWND_BOTTOM,
            InsertAfter::Topmost => HWND_TOPMOST,
            InsertAfter::NoTopmost => HWND_NOTOPMOST,
            InsertAfter::After(w) => w.0,
        }
    }
}

/// Show state and restored, minimized and maximized positions of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPlacement {
    /// Current show state.
    pub show: ShowCommand,
    /// Upper-left corner when minimized.
    pub min_position: Point,
    /// Upper-left corner when maximized.
    pub max_position: Point,
    /// Position when restored, in workspace coordinates.
    pub normal_position: Rect,
}

/// `FlashWindowEx` flags (`FLASHW_*`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashFlags(pub FLASHWINFO_FLAGS);

impl FlashFlags {
    /// Stop flashing.
    pub const STOP: Self = Self(FLASHW_STOP);
    /// Flash the caption.
    pub const CAPTION: Self = Self(FLASHW_CAPTION);
    /// Flash the taskbar button.
    pub const TRAY: Self = Self(FLASHW_TRAY);
    /// Flash both caption and taskbar button.
    pub const ALL: Self = Self(FLASHW_ALL);
    /// Flash until stopped.
    pub const TIMER: Self = Self(FLASHW_TIMER);
    /// Flash until the window comes to the foreground.
    pub const TIMER_NO_FOREGROUND: Self = Self(FLASHW_TIMERNOFG);

    /// Combines two flag sets.
    pub fn with(self, other: Self) -> Self {
        Self(FLASHWINFO_FLAGS(self.0 .0 | other.0 .0))
    }
}

/// Arguments for [`WindowHandle::flash`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashOptions {
    /// What to flash and for how long.
    pub flags: FlashFlags,
    /// Number of flashes.
    pub count: u32,
    /// Flash interval in milliseconds; 0 uses the cursor blink rate.
    pub timeout_ms: u32,
}

impl FlashOptions {
    /// Flash caption and taskbar button until the window is activated.
    pub fn until_foreground() -> Self {
        Self {
            flags: FlashFlags::ALL.with(FlashFlags::TIMER_NO_FOREGROUND),
            count: 0,
            timeout_ms: 0,
        }
    }

    /// Flash caption and taskbar button `count` times.
    pub fn times(count: u32) -> Self {
        Self {
            flags: FlashFlags::ALL,
            count,
            timeout_ms: 0,
        }
    }

    /// Stop flashing.
    pub fn stop() -> Self {
        Self {
            flags: FlashFlags::STOP,
            count: 0,
            timeout_ms: 0,
        }
    }
}

/// A borrowed window handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowHandle(HWND);

impl WindowHandle {
    /// Wraps a raw handle.
    pub fn from_raw(hwnd: HWND) -> Self {
        Self(hwnd)
    }

    /// Returns the raw handle.
    pub fn as_raw(&self) -> HWND {
        self.0
    }

    /// True for a null handle.
    pub fn is_null(&self) -> bool {
        self.0 .0.is_null()
    }

    fn non_null(hwnd: HWND, what: &'static str) -> Result<Self> {
        if hwnd.0.is_null() {
            Err(Error::invalid_handle(what))
        } else {
            Ok(Self(hwnd))
        }
    }

    /// Finds a top-level window by class name and/or title.
    pub fn find(class: Option<&str>, title: Option<&str>) -> Result<Self> {
        let class_wide = class.map(WideString::new);
        let title_wide = title.map(WideString::new);
        let class_ptr = class_wide.as_ref().map_or(PCWSTR::null(), |w| w.as_pcwstr());
        let title_ptr = title_wide.as_ref().map_or(PCWSTR::null(), |w| w.as_pcwstr());

        // SAFETY: both strings are null-terminated or null and outlive the call.
        match unsafe { FindWindowW(class_ptr, title_ptr) } {
            Ok(hwnd) if !hwnd.0.is_null() => Ok(Self(hwnd)),
            _ => Err(Error::not_found(format!(
                "window class={:?} title={:?}",
                class, title
            ))),
        }
    }

    /// The window the user is currently working with.
    pub fn foreground() -> Result<Self> {
        // SAFETY: no preconditions.
        Self::non_null(unsafe { GetForegroundWindow() }, "no foreground window")
    }

    /// The desktop window.
    pub fn desktop() -> Self {
        // SAFETY: no preconditions.
        Self(unsafe { GetDesktopWindow() })
    }

    /// The shell's desktop window (Progman).
    pub fn shell() -> Result<Self> {
        // SAFETY: no preconditions.
        Self::non_null(unsafe { GetShellWindow() }, "no shell window")
    }

    /// The console window of the calling process.
    pub fn console() -> Result<Self> {
        // SAFETY: no preconditions.
        Self::non_null(unsafe { GetConsoleWindow() }, "process has no console window")
    }

    /// The window containing a screen point.
    pub fn from_point(point: Point) -> Result<Self> {
        // SAFETY: no preconditions.
        Self::non_null(unsafe { WindowFromPoint(POINT::from(point)) }, "no window at point")
    }

    /// True while the handle names an existing window.
    pub fn is_valid(&self) -> bool {
        // SAFETY: IsWindow accepts any value.
        unsafe { IsWindow(self.0) }.as_bool()
    }

    /// The window title; empty if it has none.
    pub fn title(&self) -> String {
        // SAFETY: the buffer is valid for its whole length.
        unsafe {
            let len = GetWindowTextLengthW(self.0);
            if len <= 0 {
                return String::new();
            }
            let mut buffer = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(self.0, &mut buffer);
            from_wide_lossy(&buffer[..copied.max(0) as usize])
        }
    }

    /// Sets the window title.
    pub fn set_title(&self, title: &str) -> Result<()> {
        let title_wide = WideString::new(title);
        // SAFETY: the string is null-terminated and outlives the call.
        unsafe { SetWindowTextW(self.0, title_wide.as_pcwstr())? };
        Ok(())
    }

    /// The window class name.
    pub fn class_name(&self) -> Result<String> {
        // Class names are at most 256 characters.
        let mut buffer = [0u16; 257];
        // SAFETY: the buffer is valid for its whole length.
        let len = unsafe { GetClassNameW(self.0, &mut buffer) };
        if len == 0 {
            return Err(last_error());
        }
        Ok(from_wide_lossy(&buffer[..len as usize]))
    }

    /// The window rectangle in screen coordinates.
    pub fn rect(&self) -> Result<Rect> {
        let mut rect = RECT::default();
        // SAFETY: rect is a valid out pointer.
        unsafe { GetWindowRect(self.0, &mut rect)? };
        Ok(rect.into())
    }

    /// The client area, relative to its own upper-left corner.
    pub fn client_rect(&self) -> Result<Rect> {
        let mut rect = RECT::default();
        // SAFETY: rect is a valid out pointer.
        unsafe { GetClientRect(self.0, &mut rect)? };
        Ok(rect.into())
    }

    /// Moves, resizes and reorders the window.
    pub fn set_position(&self, rect: Rect, insert_after: InsertAfter, flags: SetPosFlags) -> Result<()> {
        // SAFETY: plain value arguments.
        unsafe {
            SetWindowPos(
                self.0,
                insert_after.to_native(),
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                flags.0,
            )?
        };
        Ok(())
    }

    /// Moves and resizes the window without changing Z order or activation.
    pub fn move_to(&self, rect: Rect) -> Result<()> {
        self.set_position(
            rect,
            InsertAfter::Top,
            SetPosFlags::NO_Z_ORDER.with(SetPosFlags::NO_ACTIVATE),
        )
    }

    /// Changes the show state. Returns whether the window was previously visible.
    pub fn show(&self, command: ShowCommand) -> bool {
        // SAFETY: plain value arguments.
        unsafe { ShowWindow(self.0, command.0) }.as_bool()
    }

    /// Asks for the window to become the foreground window.
    ///
    /// Returns `false` when the foreground lock prevented it.
    pub fn set_foreground(&self) -> bool {
        // SAFETY: plain value arguments.
        unsafe { SetForegroundWindow(self.0) }.as_bool()
    }

    /// Brings the window to the top of the Z order.
    pub fn bring_to_top(&self) -> Result<()> {
        // SAFETY: plain value arguments.
        unsafe { BringWindowToTop(self.0)? };
        Ok(())
    }

    /// True if the window has `WS_VISIBLE`.
    pub fn is_visible(&self) -> bool {
        // SAFETY: plain value arguments.
        unsafe { IsWindowVisible(self.0) }.as_bool()
    }

    /// True if the window is minimized.
    pub fn is_minimized(&self) -> bool {
        // SAFETY: plain value arguments.
        unsafe { IsIconic(self.0) }.as_bool()
    }

    /// True if the window is maximized.
    pub fn is_maximized(&self) -> bool {
        // SAFETY: plain value arguments.
        unsafe { IsZoomed(self.0) }.as_bool()
    }

    /// The window style.
    pub fn style(&self) -> Style {
        // SAFETY: plain value arguments.
        let value = unsafe { GetWindowLongPtrW(self.0, GWL_STYLE) };
        Style(WINDOW_STYLE(value as u32))
    }

    /// The extended window style.
    pub fn ex_style(&self) -> ExStyle {
        // SAFETY: plain value arguments.
        let value = unsafe { GetWindowLongPtrW(self.0, GWL_EXSTYLE) };
        ExStyle(WINDOW_EX_STYLE(value as u32))
    }

    /// The id of the process that created the window.
    pub fn process_id(&self) -> Result<u32> {
        let mut pid = 0u32;
        // SAFETY: pid is a valid out pointer.
        let tid = unsafe { GetWindowThreadProcessId(self.0, Some(&mut pid)) };
        if tid == 0 {
            return Err(last_error());
        }
        Ok(pid)
    }

    /// The id of the thread that created the window.
    pub fn thread_id(&self) -> Result<u32> {
        // SAFETY: a null process id pointer is allowed.
        let tid = unsafe { GetWindowThreadProcessId(self.0, None) };
        if tid == 0 {
            return Err(last_error());
        }
        Ok(tid)
    }

    /// The show state and positions.
    pub fn placement(&self) -> Result<WindowPlacement> {
        let mut wp = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        // SAFETY: wp is valid and its length is set.
        unsafe { GetWindowPlacement(self.0, &mut wp)? };
        Ok(WindowPlacement {
            show: ShowCommand(SHOW_WINDOW_CMD(wp.showCmd as i32)),
            min_position: wp.ptMinPosition.into(),
            max_position: wp.ptMaxPosition.into(),
            normal_position: wp.rcNormalPosition.into(),
        })
    }

    /// Restores a placement obtained from [`WindowHandle::placement`].
    pub fn set_placement(&self, placement: &WindowPlacement) -> Result<()> {
        let wp = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            showCmd: placement.show.0 .0 as u32,
            ptMinPosition: placement.min_position.into(),
            ptMaxPosition: placement.max_position.into(),
            rcNormalPosition: placement.normal_position.into(),
            ..Default::default()
        };
        // SAFETY: wp is valid and its length is set.
        unsafe { SetWindowPlacement(self.0, &wp)? };
        Ok(())
    }

    /// Flashes the caption and/or taskbar button.
    ///
    /// Returns whether the window was active before the call.
    pub fn flash(&self, options: FlashOptions) -> bool {
        let info = FLASHWINFO {
            cbSize: std::mem::size_of::<FLASHWINFO>() as u32,
            hwnd: self.0,
            dwFlags: options.flags.0,
            uCount: options.count,
            dwTimeout: options.timeout_ms,
        };
        // SAFETY: info is fully initialized.
        unsafe { FlashWindowEx(&info) }.as_bool()
    }

    /// Posts `WM_CLOSE`; the window may still refuse to close.
    pub fn close(&self) -> Result<()> {
        // SAFETY: plain value arguments.
        unsafe { PostMessageW(self.0, WM_CLOSE, WPARAM(0), LPARAM(0))? };
        Ok(())
    }

    /// The parent or owner window.
    pub fn parent(&self) -> Option<Self> {
        // SAFETY: plain value arguments.
        unsafe { GetParent(self.0) }
            .ok()
            .filter(|hwnd| !hwnd.0.is_null())
            .map(Self)
    }

    /// The owned root window, following parent and owner chains.
    pub fn root_owner(&self) -> Option<Self> {
        // SAFETY: plain value arguments.
        let hwnd = unsafe { GetAncestor(self.0, GA_ROOTOWNER) };
        (!hwnd.0.is_null()).then_some(Self(hwnd))
    }
}

struct EnumState<'a> {
    filter: &'a mut dyn FnMut(WindowHandle) -> bool,
    found: Vec<WindowHandle>,
}

unsafe extern "system" fn enum_windows_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is the EnumState passed by enumerate_windows, alive for
    // the whole EnumWindows call.
    let state = &mut *(lparam.0 as *mut EnumState<'_>);
    let window = WindowHandle(hwnd);
    if (state.filter)(window) {
        trace!(hwnd = ?hwnd.0, "window matched");
        state.found.push(window);
    }
    TRUE
}

/// Enumerates top-level windows, keeping those for which `filter` returns true.
pub fn enumerate_windows<F>(mut filter: F) -> Result<Vec<WindowHandle>>
where
    F: FnMut(WindowHandle) -> bool,
{
    let mut state = EnumState {
        filter: &mut filter,
        found: Vec::new(),
    };

    // SAFETY: the callback only dereferences lparam during this call.
    unsafe {
        EnumWindows(
            Some(enum_windows_proc),
            LPARAM(&mut state as *mut EnumState<'_> as isize),
        )?
    };

    Ok(state.found)
}

/// All top-level windows.
pub fn top_level_windows() -> Result<Vec<WindowHandle>> {
    enumerate_windows(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_window() {
        let desktop = WindowHandle::desktop();
        assert!(desktop.is_valid());
        let rect = desktop.rect().unwrap();
        assert!(rect.width() > 0 && rect.height() > 0);
    }

    #[test]
    fn test_enumerate_windows_filters() {
        let all = top_level_windows().unwrap();
        let visible = enumerate_windows(|w| w.is_visible()).unwrap();
        assert!(visible.len() <= all.len());
        assert!(visible.iter().all(|w| all.contains(w)));
    }

    #[test]
    fn test_find_missing_window() {
        let err = WindowHandle::find(Some("win32-surface-no-such-class"), None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_null_handle_is_invalid() {
        let null = WindowHandle::from_raw(HWND::default());
        assert!(null.is_null());
        assert!(!null.is_valid());
        assert!(null.rect().is_err());
    }

    #[test]
    fn test_flags_combine() {
        let style = Style::CAPTION.with(Style::SYSMENU);
        assert!(style.contains(Style::CAPTION));
        assert!(!style.contains(Style::POPUP));
        assert!(ExStyle::NONE.with(ExStyle::TOPMOST).contains(ExStyle::TOPMOST));
        assert_eq!(
            SetPosFlags::NO_MOVE.with(SetPosFlags::NO_SIZE).0,
            SWP_NOMOVE | SWP_NOSIZE
        );
    }

    #[test]
    fn test_insert_after_maps_to_sentinels() {
        assert_eq!(InsertAfter::Topmost.to_native(), HWND_TOPMOST);
        let desktop = WindowHandle::desktop();
        assert_eq!(InsertAfter::After(desktop).to_native(), desktop.as_raw());
    }
}
