//! Gdi32: device contexts, GDI objects, monitors and display modes.
//!
//! The value types ([`Color`], [`DeviceCap`], [`MonitorInfo`],
//! [`DisplayMode`]) are available everywhere; the handle wrappers only exist
//! on Windows.

use crate::geometry::Rect;
use std::fmt;

/// An RGB color, stored as a `COLORREF` (`0x00BBGGRR`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// White.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Creates a color from its components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(r as u32 | (g as u32) << 8 | (b as u32) << 16)
    }

    /// Wraps a raw `COLORREF`; the high byte is cleared.
    pub const fn from_colorref(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    /// The raw `COLORREF`.
    pub const fn to_colorref(self) -> u32 {
        self.0
    }

    /// Red component.
    pub const fn r(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Green component.
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Blue component.
    pub const fn b(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

/// `GetDeviceCaps` indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DeviceCap {
    /// Width of the screen in pixels.
    HorzRes = 8,
    /// Height of the screen in pixels.
    VertRes = 10,
    /// Color bits per pixel.
    BitsPerPixel = 12,
    /// Logical pixels per inch horizontally.
    LogPixelsX = 88,
    /// Logical pixels per inch vertically.
    LogPixelsY = 90,
    /// Vertical refresh rate in Hz.
    VRefresh = 116,
    /// Physical desktop height, unaffected by DPI virtualization.
    DesktopVertRes = 117,
    /// Physical desktop width, unaffected by DPI virtualization.
    DesktopHorzRes = 118,
}

/// Monitor geometry and name, from `GetMonitorInfoW`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Monitor rectangle in virtual-screen coordinates.
    pub rect: Rect,
    /// Work area, excluding taskbar and app bars.
    pub work_area: Rect,
    /// True for the primary monitor.
    pub is_primary: bool,
    /// GDI device name (`\\.\DISPLAYn`).
    pub device_name: String,
}

/// A display mode, from `EnumDisplaySettingsW`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// Color depth.
    pub bits_per_pixel: u32,
    /// Refresh rate in Hz; 0 or 1 mean the hardware default.
    pub frequency: u32,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {}bpp @ {}Hz",
            self.width, self.height, self.bits_per_pixel, self.frequency
        )
    }
}

#[cfg(windows)]
pub use native::{monitors, DeviceContext, GdiObject, Monitor};

#[cfg(windows)]
mod native {
    use super::{Color, DeviceCap, DisplayMode, MonitorInfo};
    use crate::error::{Error, Result};
    use crate::geometry::Point;
    use crate::string::{from_wide_lossy, WideString};
    use crate::window::WindowHandle;
    use tracing::trace;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{BOOL, COLORREF, HWND, LPARAM, POINT, RECT, TRUE};
    use windows::Win32::Graphics::Gdi::{
        CreateSolidBrush, DeleteObject, EnumDisplayMonitors, EnumDisplaySettingsW, GetDC,
        GetDeviceCaps, GetMonitorInfoW, MonitorFromPoint, MonitorFromWindow, ReleaseDC, DEVMODEW,
        ENUM_CURRENT_SETTINGS, GET_DEVICE_CAPS_INDEX, HDC, HGDIOBJ, HMONITOR, MONITORINFO,
        MONITORINFOEXW, MONITOR_DEFAULTTONEAREST, MONITOR_DEFAULTTOPRIMARY,
    };

    const MONITORINFOF_PRIMARY: u32 = 0x1;

    /// A device context obtained with `GetDC`, released on drop.
    pub struct DeviceContext {
        hwnd: HWND,
        hdc: HDC,
    }

    impl DeviceContext {
        /// The device context of the whole screen.
        pub fn screen() -> Result<Self> {
            Self::get(HWND::default())
        }

        /// The client-area device context of a window.
        pub fn for_window(window: WindowHandle) -> Result<Self> {
            Self::get(window.as_raw())
        }

        fn get(hwnd: HWND) -> Result<Self> {
            // SAFETY: a null hwnd selects the screen.
            let hdc = unsafe { GetDC(hwnd) };
            if hdc.is_invalid() {
                return Err(Error::invalid_handle("GetDC returned null"));
            }
            Ok(Self { hwnd, hdc })
        }

        /// Queries a device capability.
        pub fn device_caps(&self, cap: DeviceCap) -> i32 {
            // SAFETY: self.hdc is valid until drop.
            unsafe { GetDeviceCaps(self.hdc, GET_DEVICE_CAPS_INDEX(cap as _)) }
        }

        /// Returns the raw handle.
        pub fn as_raw(&self) -> HDC {
            self.hdc
        }
    }

    impl Drop for DeviceContext {
        fn drop(&mut self) {
            // SAFETY: the DC was obtained from GetDC for self.hwnd.
            unsafe {
                ReleaseDC(self.hwnd, self.hdc);
            }
        }
    }

    /// An owned GDI object, deleted on drop.
    pub struct GdiObject(HGDIOBJ);

    impl GdiObject {
        /// Creates a solid brush.
        pub fn solid_brush(color: Color) -> Result<Self> {
            // SAFETY: plain value argument.
            let brush = unsafe { CreateSolidBrush(COLORREF(color.to_colorref())) };
            if brush.is_invalid() {
                return Err(Error::invalid_handle("CreateSolidBrush returned null"));
            }
            Ok(Self(HGDIOBJ(brush.0)))
        }

        /// Returns the raw handle.
        pub fn as_raw(&self) -> HGDIOBJ {
            self.0
        }
    }

    impl Drop for GdiObject {
        fn drop(&mut self) {
            // SAFETY: we own the object and it is not selected into a DC by us.
            unsafe {
                let _ = DeleteObject(self.0);
            }
        }
    }

    /// A display monitor handle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Monitor(HMONITOR);

    impl Monitor {
        /// The monitor that contains most of the window, or the nearest one.
        pub fn from_window(window: WindowHandle) -> Self {
            // SAFETY: plain value arguments.
            Self(unsafe { MonitorFromWindow(window.as_raw(), MONITOR_DEFAULTTONEAREST) })
        }

        /// The monitor containing the point, or the nearest one.
        pub fn from_point(point: Point) -> Self {
            // SAFETY: plain value arguments.
            Self(unsafe { MonitorFromPoint(POINT::from(point), MONITOR_DEFAULTTONEAREST) })
        }

        /// The primary monitor.
        pub fn primary() -> Self {
            // SAFETY: plain value arguments.
            Self(unsafe { MonitorFromPoint(POINT::default(), MONITOR_DEFAULTTOPRIMARY) })
        }

        /// Wraps a raw handle.
        pub fn from_raw(handle: HMONITOR) -> Self {
            Self(handle)
        }

        /// Returns the raw handle.
        pub fn as_raw(&self) -> HMONITOR {
            self.0
        }

        /// Geometry and device name.
        pub fn info(&self) -> Result<MonitorInfo> {
            let mut info = MONITORINFOEXW::default();
            info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;

            // SAFETY: cbSize announces the extended structure.
            let ok = unsafe {
                GetMonitorInfoW(self.0, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO)
            };
            if !ok.as_bool() {
                return Err(Error::not_found("monitor is no longer attached"));
            }

            Ok(MonitorInfo {
                rect: info.monitorInfo.rcMonitor.into(),
                work_area: info.monitorInfo.rcWork.into(),
                is_primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                device_name: from_wide_lossy(&info.szDevice),
            })
        }

        /// The current display mode of the monitor's device.
        pub fn display_mode(&self) -> Result<DisplayMode> {
            current_display_mode(Some(&self.info()?.device_name))
        }
    }

    unsafe extern "system" fn monitor_enum_proc(
        hmonitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        // SAFETY: lparam is the Vec passed by monitors(), alive for the whole call.
        let found = &mut *(lparam.0 as *mut Vec<Monitor>);
        trace!(hmonitor = ?hmonitor.0, "monitor");
        found.push(Monitor(hmonitor));
        TRUE
    }

    /// All display monitors, in enumeration order.
    pub fn monitors() -> Result<Vec<Monitor>> {
        let mut found: Vec<Monitor> = Vec::new();
        // SAFETY: the callback only dereferences lparam during this call.
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(monitor_enum_proc),
                LPARAM(&mut found as *mut Vec<Monitor> as isize),
            )
        };
        if !ok.as_bool() {
            return Err(crate::error::last_error());
        }
        Ok(found)
    }

    /// The current display mode of a GDI device, or of the primary display for `None`.
    pub(crate) fn current_display_mode(device: Option<&str>) -> Result<DisplayMode> {
        let device_wide = device.map(WideString::new);
        let device_ptr = device_wide.as_ref().map_or(PCWSTR::null(), |w| w.as_pcwstr());

        let mut mode = DEVMODEW {
            dmSize: std::mem::size_of::<DEVMODEW>() as u16,
            ..Default::default()
        };
        // SAFETY: dmSize is set; the name is null-terminated or null.
        let ok = unsafe { EnumDisplaySettingsW(device_ptr, ENUM_CURRENT_SETTINGS, &mut mode) };
        if !ok.as_bool() {
            return Err(Error::not_found(format!(
                "no display settings for {}",
                device.unwrap_or("the primary display")
            )));
        }

        Ok(DisplayMode {
            width: mode.dmPelsWidth,
            height: mode.dmPelsHeight,
            bits_per_pixel: mode.dmBitsPerPel,
            frequency: mode.dmDisplayFrequency,
        })
    }

    impl DisplayMode {
        /// The current mode of a GDI device (`\\.\DISPLAYn`), or of the primary display.
        pub fn current(device: Option<&str>) -> Result<Self> {
            current_display_mode(device)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorref_packing() {
        let c = Color::rgb(0x12, 0x34, 0x56);
        assert_eq!(c.to_colorref(), 0x0056_3412);
        assert_eq!((c.r(), c.g(), c.b()), (0x12, 0x34, 0x56));
        assert_eq!(Color::from_colorref(0xFF56_3412), c);
        assert_eq!(c.to_string(), "#123456");
    }

    #[test]
    fn test_device_cap_indices() {
        assert_eq!(DeviceCap::LogPixelsX as i32, 88);
        assert_eq!(DeviceCap::DesktopHorzRes as i32, 118);
    }

    #[test]
    fn test_display_mode_display() {
        let mode = DisplayMode {
            width: 2560,
            height: 1440,
            bits_per_pixel: 32,
            frequency: 144,
        };
        assert_eq!(mode.to_string(), "2560x1440 32bpp @ 144Hz");
    }

    #[cfg(windows)]
    mod native {
        use super::super::*;

        #[test]
        fn test_screen_dc_caps() {
            let dc = DeviceContext::screen().unwrap();
            assert!(dc.device_caps(DeviceCap::HorzRes) > 0);
            assert!(dc.device_caps(DeviceCap::LogPixelsX) >= 96);
        }

        #[test]
        fn test_primary_monitor_is_enumerated() {
            let all = monitors().unwrap();
            let primary = Monitor::primary();
            assert!(all.contains(&primary));
            let info = primary.info().unwrap();
            assert!(info.is_primary);
            assert!(info.device_name.starts_with(r"\\.\DISPLAY"));
            assert!(info.rect.contains(crate::geometry::Point::new(0, 0)));
        }

        #[test]
        fn test_solid_brush() {
            assert!(GdiObject::solid_brush(Color::WHITE).is_ok());
        }
    }
}
