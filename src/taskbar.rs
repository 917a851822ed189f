//! Taskbar button integration through `ITaskbarList3` and `ITaskbarList4`.
//!
//! A [`Taskbar`] must be created on a thread that has joined a COM apartment
//! (see [`ComApartment`]), and only after the shell has created the window's
//! button: wait for the message returned by
//! [`taskbar_button_created_message`] before calling into it.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_surface::error::Result<()> {
//! use win32_surface::taskbar::{ComApartment, Progress, ProgressState, Taskbar};
//! use win32_surface::window::WindowHandle;
//!
//! let _com = ComApartment::init_sta()?;
//! let taskbar = Taskbar::new()?;
//! let window = WindowHandle::foreground()?;
//!
//! taskbar.set_progress(window, Progress::new(40, 100))?;
//! taskbar.set_progress_state(window, ProgressState::Paused)?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

use crate::error::{Error, Result};

/// Maximum number of thumbnail toolbar buttons per window.
pub const MAX_THUMB_BUTTONS: usize = 7;

/// Capacity of `THUMBBUTTON::szTip`, including the terminator.
pub const THUMB_TOOLTIP_CAPACITY: usize = 260;

/// Taskbar progress indicator state (`TBPFLAG`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ProgressState {
    /// No progress indicator.
    #[default]
    None = 0,
    /// Marquee animation.
    Indeterminate = 1,
    /// Green bar.
    Normal = 2,
    /// Red bar.
    Error = 4,
    /// Yellow bar.
    Paused = 8,
}

/// A progress value, with `completed` never exceeding `total`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Progress {
    completed: u64,
    total: u64,
}

impl Progress {
    /// Creates a progress value, clamping `completed` to `total`.
    pub fn new(completed: u64, total: u64) -> Self {
        Self {
            completed: completed.min(total),
            total,
        }
    }

    /// A progress value from a fraction in `0.0..=1.0`, at 1/10000 resolution.
    pub fn from_fraction(fraction: f64) -> Self {
        const TOTAL: u64 = 10_000;
        let f = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        Self::new((f * TOTAL as f64).round() as u64, TOTAL)
    }

    /// Units completed.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Total units.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Completed fraction; 0.0 when `total` is 0.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// `STPFLAG` values for [`Taskbar::set_tab_properties`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TabProperties(pub u32);

impl TabProperties {
    /// Let the system pick the thumbnail and peek sources.
    pub const NONE: Self = Self(0x0);
    /// Always use the main application frame for the thumbnail.
    pub const USE_APP_THUMBNAIL_ALWAYS: Self = Self(0x1);
    /// Use the main frame for the thumbnail while the tab is active.
    pub const USE_APP_THUMBNAIL_WHEN_ACTIVE: Self = Self(0x2);
    /// Always use the main application frame for peek.
    pub const USE_APP_PEEK_ALWAYS: Self = Self(0x4);
    /// Use the main frame for peek while the tab is active.
    pub const USE_APP_PEEK_WHEN_ACTIVE: Self = Self(0x8);

    /// Combines two flag sets.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// `THUMBBUTTONFLAGS`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ThumbButtonFlags(pub u32);

impl ThumbButtonFlags {
    /// Enabled and interactive.
    pub const ENABLED: Self = Self(0x00);
    /// Shown greyed out.
    pub const DISABLED: Self = Self(0x01);
    /// Clicking closes the thumbnail.
    pub const DISMISS_ON_CLICK: Self = Self(0x02);
    /// No button border.
    pub const NO_BACKGROUND: Self = Self(0x04);
    /// Not shown.
    pub const HIDDEN: Self = Self(0x08);
    /// Shown enabled but not clickable.
    pub const NON_INTERACTIVE: Self = Self(0x10);

    /// Combines two flag sets.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// A thumbnail toolbar button.
///
/// Clicks arrive as `WM_COMMAND` with `HIWORD(wParam) == THBN_CLICKED` and
/// `LOWORD(wParam)` equal to [`ThumbButton::id`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbButton {
    id: u32,
    tooltip: Option<String>,
    flags: ThumbButtonFlags,
    #[cfg(windows)]
    icon: Option<windows::Win32::UI::WindowsAndMessaging::HICON>,
}

impl ThumbButton {
    /// A button with the given command id.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            tooltip: None,
            flags: ThumbButtonFlags::ENABLED,
            #[cfg(windows)]
            icon: None,
        }
    }

    /// Sets the tooltip; it must fit `szTip` (259 UTF-16 units).
    pub fn tooltip(mut self, text: &str) -> Result<Self> {
        let needed = text.encode_utf16().count() + 1;
        if needed > THUMB_TOOLTIP_CAPACITY {
            return Err(Error::buffer_too_small(needed, THUMB_TOOLTIP_CAPACITY));
        }
        self.tooltip = Some(text.to_owned());
        Ok(self)
    }

    /// Sets the button flags.
    pub fn flags(mut self, flags: ThumbButtonFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the icon. The caller keeps ownership of the icon handle.
    #[cfg(windows)]
    pub fn icon(mut self, icon: windows::Win32::UI::WindowsAndMessaging::HICON) -> Self {
        self.icon = Some(icon);
        self
    }

    /// The command id.
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Checks a button set against the toolbar limits: 1 to 7 buttons, unique ids.
pub fn validate_thumb_buttons(buttons: &[ThumbButton]) -> Result<()> {
    if buttons.is_empty() {
        return Err(Error::buffer_too_small(1, 0));
    }
    if buttons.len() > MAX_THUMB_BUTTONS {
        return Err(Error::buffer_too_small(buttons.len(), MAX_THUMB_BUTTONS));
    }
    for (i, button) in buttons.iter().enumerate() {
        if buttons[..i].iter().any(|b| b.id == button.id) {
            return Err(Error::duplicate_id(button.id));
        }
    }
    Ok(())
}

#[cfg(windows)]
pub use native::{taskbar_button_created_message, ComApartment, Taskbar};

#[cfg(windows)]
mod native {
    use super::*;
    use crate::geometry::Rect;
    use crate::string::{copy_to_fixed, WideString};
    use crate::window::WindowHandle;
    use std::marker::PhantomData;
    use tracing::{debug, warn};
    use windows::core::{w, Interface, PCWSTR};
    use windows::Win32::Foundation::{BOOL, RECT, RPC_E_CHANGED_MODE};
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_INPROC_SERVER, COINIT,
        COINIT_APARTMENTTHREADED, COINIT_MULTITHREADED,
    };
    use windows::Win32::UI::Shell::{
        ITaskbarList3, ITaskbarList4, TaskbarList, STPFLAG, TBPFLAG, THB_FLAGS,
        THB_ICON, THB_TOOLTIP, THUMBBUTTON, THUMBBUTTONFLAGS,
    };
    use windows::Win32::UI::WindowsAndMessaging::{RegisterWindowMessageW, HICON};

    /// Membership of the calling thread in a COM apartment.
    ///
    /// `CoUninitialize` runs on drop, except when the thread was already in
    /// an apartment of the other model (`RPC_E_CHANGED_MODE`), in which case
    /// this call did not add a reference.
    pub struct ComApartment {
        uninitialize: bool,
        // COM initialization is per thread.
        _not_send: PhantomData<*const ()>,
    }

    impl ComApartment {
        /// Joins a single-threaded apartment.
        pub fn init_sta() -> Result<Self> {
            Self::init(COINIT_APARTMENTTHREADED)
        }

        /// Joins the multithreaded apartment.
        pub fn init_mta() -> Result<Self> {
            Self::init(COINIT_MULTITHREADED)
        }

        fn init(model: COINIT) -> Result<Self> {
            // SAFETY: the matching CoUninitialize runs in Drop on this thread.
            let hr = unsafe { CoInitializeEx(None, model) };
            if hr == RPC_E_CHANGED_MODE {
                warn!("thread already belongs to a different COM apartment");
                return Ok(Self {
                    uninitialize: false,
                    _not_send: PhantomData,
                });
            }
            // S_FALSE (already initialized) is a success code and still needs a CoUninitialize.
            hr.ok()?;
            Ok(Self {
                uninitialize: true,
                _not_send: PhantomData,
            })
        }
    }

    impl Drop for ComApartment {
        fn drop(&mut self) {
            if self.uninitialize {
                // SAFETY: balances the successful CoInitializeEx in init.
                unsafe { CoUninitialize() };
            }
        }
    }

    /// The shell's taskbar list object.
    pub struct Taskbar {
        list: ITaskbarList3,
        list4: Option<ITaskbarList4>,
    }

    impl Taskbar {
        /// Creates and initializes the taskbar list object.
        pub fn new() -> Result<Self> {
            // SAFETY: the caller's thread is in a COM apartment.
            let list: ITaskbarList3 =
                unsafe { CoCreateInstance(&TaskbarList, None, CLSCTX_INPROC_SERVER)? };
            // SAFETY: list is a live interface.
            unsafe { list.HrInit()? };

            let list4 = match list.cast::<ITaskbarList4>() {
                Ok(list4) => Some(list4),
                Err(e) => {
                    debug!("ITaskbarList4 unavailable: {e}");
                    None
                }
            };

            Ok(Self { list, list4 })
        }

        /// Adds a button for a window that would not otherwise have one.
        pub fn add_tab(&self, window: WindowHandle) -> Result<()> {
            // SAFETY: list is live; hwnd is passed by value.
            unsafe { self.list.AddTab(window.as_raw())? };
            Ok(())
        }

        /// Removes a window's button.
        pub fn delete_tab(&self, window: WindowHandle) -> Result<()> {
            // SAFETY: list is live; hwnd is passed by value.
            unsafe { self.list.DeleteTab(window.as_raw())? };
            Ok(())
        }

        /// Shows a window's button as active without activating the window.
        pub fn activate_tab(&self, window: WindowHandle) -> Result<()> {
            // SAFETY: list is live; hwnd is passed by value.
            unsafe { self.list.ActivateTab(window.as_raw())? };
            Ok(())
        }

        /// Marks a button as active, visual state only.
        pub fn set_active_alt(&self, window: WindowHandle) -> Result<()> {
            // SAFETY: list is live; hwnd is passed by value.
            unsafe { self.list.SetActiveAlt(window.as_raw())? };
            Ok(())
        }

        /// Tells the taskbar whether a window is full screen.
        pub fn mark_fullscreen(&self, window: WindowHandle, fullscreen: bool) -> Result<()> {
            // SAFETY: list is live; arguments are passed by value.
            unsafe {
                self.list
                    .MarkFullscreenWindow(window.as_raw(), BOOL::from(fullscreen))?
            };
            Ok(())
        }

        /// Sets the progress indicator state.
        pub fn set_progress_state(&self, window: WindowHandle, state: ProgressState) -> Result<()> {
            // SAFETY: list is live; arguments are passed by value.
            unsafe {
                self.list
                    .SetProgressState(window.as_raw(), TBPFLAG(state as i32))?
            };
            Ok(())
        }

        /// Sets the progress value, switching to [`ProgressState::Normal`] if no state is set.
        pub fn set_progress(&self, window: WindowHandle, progress: Progress) -> Result<()> {
            // SAFETY: list is live; arguments are passed by value.
            unsafe {
                self.list.SetProgressValue(
                    window.as_raw(),
                    progress.completed(),
                    progress.total(),
                )?
            };
            Ok(())
        }

        /// Registers an MDI or tabbed child with its main window.
        pub fn register_tab(&self, tab: WindowHandle, main: WindowHandle) -> Result<()> {
            // SAFETY: list is live; arguments are passed by value.
            unsafe { self.list.RegisterTab(tab.as_raw(), main.as_raw())? };
            Ok(())
        }

        /// Removes a tab registered with [`Taskbar::register_tab`].
        pub fn unregister_tab(&self, tab: WindowHandle) -> Result<()> {
            // SAFETY: list is live; arguments are passed by value.
            unsafe { self.list.UnregisterTab(tab.as_raw())? };
            Ok(())
        }

        /// Draws an overlay icon over the button.
        pub fn set_overlay_icon(
            &self,
            window: WindowHandle,
            icon: HICON,
            description: &str,
        ) -> Result<()> {
            let description = WideString::new(description);
            // SAFETY: the description outlives the call; the caller owns the icon.
            unsafe {
                self.list
                    .SetOverlayIcon(window.as_raw(), icon, description.as_pcwstr())?
            };
            Ok(())
        }

        /// Removes the overlay icon.
        pub fn clear_overlay_icon(&self, window: WindowHandle) -> Result<()> {
            // SAFETY: a null icon clears the overlay.
            unsafe {
                self.list
                    .SetOverlayIcon(window.as_raw(), HICON::default(), PCWSTR::null())?
            };
            Ok(())
        }

        /// Sets the thumbnail tooltip, or restores the window title for `None`.
        pub fn set_thumbnail_tooltip(&self, window: WindowHandle, tip: Option<&str>) -> Result<()> {
            let tip = tip.map(WideString::new);
            let ptr = tip.as_ref().map_or(PCWSTR::null(), |t| t.as_pcwstr());
            // SAFETY: the string outlives the call.
            unsafe { self.list.SetThumbnailTooltip(window.as_raw(), ptr)? };
            Ok(())
        }

        /// Restricts the thumbnail to part of the client area, or shows it all for `None`.
        pub fn set_thumbnail_clip(&self, window: WindowHandle, clip: Option<Rect>) -> Result<()> {
            let rect = clip.map(RECT::from);
            let ptr = rect.as_ref().map_or(std::ptr::null(), |r| r as *const RECT);
            // SAFETY: the rect outlives the call.
            unsafe { self.list.SetThumbnailClip(window.as_raw(), ptr)? };
            Ok(())
        }

        /// Adds the thumbnail toolbar. The shell accepts this once per window.
        pub fn add_thumb_buttons(&self, window: WindowHandle, buttons: &[ThumbButton]) -> Result<()> {
            validate_thumb_buttons(buttons)?;
            let native = to_native_buttons(buttons)?;
            // SAFETY: the array outlives the call.
            unsafe { self.list.ThumbBarAddButtons(window.as_raw(), &native)? };
            Ok(())
        }

        /// Updates buttons previously added, matched by id.
        pub fn update_thumb_buttons(&self, window: WindowHandle, buttons: &[ThumbButton]) -> Result<()> {
            validate_thumb_buttons(buttons)?;
            let native = to_native_buttons(buttons)?;
            // SAFETY: the array outlives the call.
            unsafe { self.list.ThumbBarUpdateButtons(window.as_raw(), &native)? };
            Ok(())
        }

        /// Chooses thumbnail and peek sources for a tab (`ITaskbarList4`).
        pub fn set_tab_properties(&self, tab: WindowHandle, properties: TabProperties) -> Result<()> {
            let list4 = self
                .list4
                .as_ref()
                .ok_or_else(|| Error::unsupported("ITaskbarList4 is not available"))?;
            // SAFETY: list4 is live; arguments are passed by value.
            unsafe { list4.SetTabProperties(tab.as_raw(), STPFLAG(properties.0 as i32))? };
            Ok(())
        }
    }

    fn to_native_buttons(buttons: &[ThumbButton]) -> Result<Vec<THUMBBUTTON>> {
        buttons
            .iter()
            .map(|button| {
                let mut native = THUMBBUTTON {
                    dwMask: THB_FLAGS,
                    iId: button.id,
                    dwFlags: THUMBBUTTONFLAGS(button.flags.0 as i32),
                    ..Default::default()
                };
                if let Some(tip) = &button.tooltip {
                    copy_to_fixed(tip, &mut native.szTip)?;
                    native.dwMask |= THB_TOOLTIP;
                }
                if let Some(icon) = button.icon {
                    native.hIcon = icon;
                    native.dwMask |= THB_ICON;
                }
                Ok(native)
            })
            .collect()
    }

    /// The message id the shell sends once a window's taskbar button exists.
    pub fn taskbar_button_created_message() -> Result<u32> {
        // SAFETY: the literal is null-terminated.
        match unsafe { RegisterWindowMessageW(w!("TaskbarButtonCreated")) } {
            0 => Err(crate::error::last_error()),
            id => Ok(id),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_clamps() {
        let p = Progress::new(150, 100);
        assert_eq!(p.completed(), 100);
        assert_eq!(p.fraction(), 1.0);
        assert_eq!(Progress::new(5, 0).fraction(), 0.0);
        assert_eq!(Progress::new(25, 100).fraction(), 0.25);
    }

    #[test]
    fn test_progress_from_fraction() {
        assert_eq!(Progress::from_fraction(0.5), Progress::new(5_000, 10_000));
        assert_eq!(Progress::from_fraction(2.0).fraction(), 1.0);
        assert_eq!(Progress::from_fraction(f64::NAN).completed(), 0);
    }

    #[test]
    fn test_progress_state_values() {
        assert_eq!(ProgressState::None as i32, 0);
        assert_eq!(ProgressState::Indeterminate as i32, 1);
        assert_eq!(ProgressState::Normal as i32, 2);
        assert_eq!(ProgressState::Error as i32, 4);
        assert_eq!(ProgressState::Paused as i32, 8);
    }

    #[test]
    fn test_tooltip_capacity() {
        let fits = "x".repeat(259);
        assert!(ThumbButton::new(1).tooltip(&fits).is_ok());
        let too_long = "x".repeat(260);
        assert!(matches!(
            ThumbButton::new(1).tooltip(&too_long),
            Err(Error::BufferTooSmall { needed: 261, actual: 260 })
        ));
    }

    #[test]
    fn test_button_set_limits() {
        assert!(matches!(
            validate_thumb_buttons(&[]),
            Err(Error::BufferTooSmall { needed: 1, actual: 0 })
        ));
        let seven: Vec<_> = (0..7).map(ThumbButton::new).collect();
        assert!(validate_thumb_buttons(&seven).is_ok());
        let eight: Vec<_> = (0..8).map(ThumbButton::new).collect();
        assert!(matches!(
            validate_thumb_buttons(&eight),
            Err(Error::BufferTooSmall { needed: 8, actual: MAX_THUMB_BUTTONS })
        ));
        let dup = [ThumbButton::new(1), ThumbButton::new(3), ThumbButton::new(3)];
        assert!(matches!(validate_thumb_buttons(&dup), Err(Error::DuplicateId(3))));
    }

    #[test]
    fn test_flag_combination() {
        let flags = ThumbButtonFlags::DISABLED.with(ThumbButtonFlags::NO_BACKGROUND);
        assert_eq!(flags.0, 0x05);
        let props = TabProperties::USE_APP_THUMBNAIL_ALWAYS.with(TabProperties::USE_APP_PEEK_ALWAYS);
        assert_eq!(props.0, 0x05);
    }
}
