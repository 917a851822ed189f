//! DPI awareness and scaling.
//!
//! [`set_process_awareness`] walks the same ladder Windows itself grew over
//! time: `SetProcessDpiAwarenessContext` (Windows 10 1607+), shcore's
//! `SetProcessDpiAwareness` (8.1+), then `SetProcessDPIAware` (Vista+). The
//! newer entry points are resolved at runtime so the crate keeps loading on
//! systems that lack them.
//!
//! [`DpiScale`] is plain arithmetic and works everywhere.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_surface::error::Result<()> {
//! use win32_surface::dpi::{self, DpiAwareness, DpiScale};
//!
//! let applied = dpi::set_process_awareness(DpiAwareness::PerMonitorAwareV2)?;
//! let scale = DpiScale::from_dpi(dpi::system_dpi());
//! println!("{applied:?}, 16px -> {}px", scale.scale(16));
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

use crate::error::{Error, Result};
use crate::geometry::Rect;
use tracing::{debug, warn};

/// The DPI every unscaled coordinate is expressed in.
pub const BASE_DPI: u32 = 96;

/// Process or thread DPI awareness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DpiAwareness {
    /// Bitmap-stretched by the system on every display.
    Unaware,
    /// Rendered for the primary display's DPI at logon.
    SystemAware,
    /// Handles `WM_DPICHANGED` itself.
    PerMonitorAware,
    /// Per-monitor aware with non-client and child window scaling.
    PerMonitorAwareV2,
    /// Unaware, but GDI content is scaled sharply.
    UnawareGdiScaled,
}

impl DpiAwareness {
    /// The `DPI_AWARENESS_CONTEXT` pseudo-handle value.
    pub const fn context(self) -> isize {
        match self {
            DpiAwareness::Unaware => -1,
            DpiAwareness::SystemAware => -2,
            DpiAwareness::PerMonitorAware => -3,
            DpiAwareness::PerMonitorAwareV2 => -4,
            DpiAwareness::UnawareGdiScaled => -5,
        }
    }

    /// The closest level shcore's `PROCESS_DPI_AWARENESS` can express.
    pub const fn shcore_equivalent(self) -> Self {
        match self {
            DpiAwareness::PerMonitorAwareV2 => DpiAwareness::PerMonitorAware,
            DpiAwareness::UnawareGdiScaled => DpiAwareness::Unaware,
            other => other,
        }
    }

    /// `PROCESS_DPI_AWARENESS` value of [`DpiAwareness::shcore_equivalent`].
    pub const fn shcore_value(self) -> i32 {
        match self.shcore_equivalent() {
            DpiAwareness::SystemAware => 1,
            DpiAwareness::PerMonitorAware => 2,
            _ => 0,
        }
    }

    /// The next weaker context to try when a context is rejected as invalid.
    #[cfg_attr(not(windows), allow(dead_code))]
    const fn downgrade(self) -> Option<Self> {
        match self {
            DpiAwareness::PerMonitorAwareV2 => Some(DpiAwareness::PerMonitorAware),
            DpiAwareness::PerMonitorAware => Some(DpiAwareness::SystemAware),
            DpiAwareness::UnawareGdiScaled => Some(DpiAwareness::Unaware),
            _ => None,
        }
    }

    /// Maps a `DPI_AWARENESS` value (from `GetAwarenessFromDpiAwarenessContext`).
    pub const fn from_awareness_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(DpiAwareness::Unaware),
            1 => Some(DpiAwareness::SystemAware),
            2 => Some(DpiAwareness::PerMonitorAware),
            _ => None,
        }
    }
}

/// `MONITOR_DPI_TYPE` for [`dpi_for_monitor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MonitorDpiType {
    /// The DPI used for scaling UI (the user's scale setting).
    #[default]
    Effective = 0,
    /// The angular DPI, for rendering at a compliant angular resolution.
    Angular = 1,
    /// The physical DPI of the panel.
    Raw = 2,
}

/// Converts between 96-DPI logical units and physical pixels at a given DPI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DpiScale {
    dpi: u32,
}

impl Default for DpiScale {
    fn default() -> Self {
        Self { dpi: BASE_DPI }
    }
}

impl DpiScale {
    /// A scale for `dpi`; 0 is treated as [`BASE_DPI`].
    pub const fn from_dpi(dpi: u32) -> Self {
        Self {
            dpi: if dpi == 0 { BASE_DPI } else { dpi },
        }
    }

    /// The DPI.
    pub const fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Scale factor, 1.0 at 96 DPI.
    pub fn factor(&self) -> f64 {
        f64::from(self.dpi) / f64::from(BASE_DPI)
    }

    /// Scale as a percentage, as shown in Settings (100, 125, 150, ...).
    pub fn percent(&self) -> u32 {
        rescale(100, BASE_DPI, self.dpi) as u32
    }

    /// Logical to physical, rounding to nearest.
    pub fn scale(&self, value: i32) -> i32 {
        rescale(value, BASE_DPI, self.dpi)
    }

    /// Physical to logical, rounding to nearest.
    pub fn unscale(&self, value: i32) -> i32 {
        rescale(value, self.dpi, BASE_DPI)
    }

    /// Scales every edge of a logical rectangle.
    pub fn scale_rect(&self, rect: Rect) -> Rect {
        Rect::new(
            self.scale(rect.left),
            self.scale(rect.top),
            self.scale(rect.right),
            self.scale(rect.bottom),
        )
    }
}

/// `value * to / from`, rounded half away from zero like `MulDiv`.
pub fn rescale(value: i32, from: u32, to: u32) -> i32 {
    if from == 0 {
        return value;
    }
    let n = i64::from(value) * i64::from(to);
    let d = i64::from(from);
    let rounded = if n >= 0 { (n + d / 2) / d } else { (n - d / 2) / d };
    rounded.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg_attr(not(windows), allow(dead_code))]
const ERROR_ACCESS_DENIED: u32 = 5;
#[cfg_attr(not(windows), allow(dead_code))]
const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;

/// The three generations of process-awareness setters.
///
/// Each returns `None` when the entry point does not exist on this system.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) trait AwarenessSetters {
    /// `SetProcessDpiAwarenessContext`; `Err` carries `GetLastError`.
    fn set_context(&self, level: DpiAwareness) -> Option<std::result::Result<(), u32>>;
    /// shcore `SetProcessDpiAwareness`; `Err` carries the HRESULT.
    fn set_shcore(&self, value: i32) -> Option<std::result::Result<(), i32>>;
    /// `SetProcessDPIAware`.
    fn set_legacy(&self) -> bool;
}

#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn apply_awareness<S: AwarenessSetters>(
    setters: &S,
    level: DpiAwareness,
) -> Result<DpiAwareness> {
    let mut candidate = Some(level);
    while let Some(attempt) = candidate {
        match setters.set_context(attempt) {
            None => {
                debug!("SetProcessDpiAwarenessContext unavailable");
                break;
            }
            Some(Ok(())) => {
                if attempt != level {
                    warn!(requested = ?level, applied = ?attempt, "DPI awareness downgraded");
                }
                return Ok(attempt);
            }
            Some(Err(ERROR_ACCESS_DENIED)) => {
                return Err(Error::access_denied("process DPI awareness is already set"));
            }
            Some(Err(code)) => {
                debug!(?attempt, code, "awareness context rejected");
                candidate = attempt.downgrade();
            }
        }
    }

    match setters.set_shcore(level.shcore_value()) {
        Some(Ok(())) => {
            let applied = level.shcore_equivalent();
            if applied != level {
                warn!(requested = ?level, ?applied, "DPI awareness downgraded");
            }
            return Ok(applied);
        }
        Some(Err(E_ACCESSDENIED)) => {
            return Err(Error::access_denied("process DPI awareness is already set"));
        }
        Some(Err(hr)) => return Err(Error::from_win32_code(hr as u32)),
        None => debug!("SetProcessDpiAwareness unavailable"),
    }

    match level.shcore_equivalent() {
        DpiAwareness::Unaware => Ok(DpiAwareness::Unaware),
        _ if setters.set_legacy() => {
            if level != DpiAwareness::SystemAware {
                warn!(requested = ?level, "only system DPI awareness is available");
            }
            Ok(DpiAwareness::SystemAware)
        }
        _ => Err(Error::unsupported("SetProcessDPIAware failed")),
    }
}

#[cfg(windows)]
pub use native::{
    dpi_for_monitor, dpi_for_window, set_process_awareness, system_dpi, system_metric_for_dpi,
    thread_awareness, window_awareness,
};

#[cfg(windows)]
mod native {
    use super::*;
    use crate::gdi::{DeviceCap, DeviceContext, Monitor};
    use crate::module::Library;
    use crate::window::WindowHandle;
    use std::sync::OnceLock;
    use windows::Win32::Foundation::{GetLastError, BOOL, HWND};
    use windows::Win32::Graphics::Gdi::HMONITOR;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, IsProcessDPIAware, SetProcessDPIAware, SYSTEM_METRICS_INDEX,
    };

    type SetContextFn = unsafe extern "system" fn(isize) -> BOOL;
    type GetThreadContextFn = unsafe extern "system" fn() -> isize;
    type GetWindowContextFn = unsafe extern "system" fn(HWND) -> isize;
    type GetAwarenessFn = unsafe extern "system" fn(isize) -> i32;
    type ContextsEqualFn = unsafe extern "system" fn(isize, isize) -> BOOL;
    type GetDpiForWindowFn = unsafe extern "system" fn(HWND) -> u32;
    type GetDpiForSystemFn = unsafe extern "system" fn() -> u32;
    type GetSystemMetricsForDpiFn = unsafe extern "system" fn(i32, u32) -> i32;
    type SetShcoreAwarenessFn = unsafe extern "system" fn(i32) -> i32;
    type GetDpiForMonitorFn = unsafe extern "system" fn(HMONITOR, i32, *mut u32, *mut u32) -> i32;

    /// Entry points resolved once per process.
    #[derive(Default)]
    struct DpiApi {
        set_context: Option<SetContextFn>,
        get_thread_context: Option<GetThreadContextFn>,
        get_window_context: Option<GetWindowContextFn>,
        get_awareness: Option<GetAwarenessFn>,
        contexts_equal: Option<ContextsEqualFn>,
        get_dpi_for_window: Option<GetDpiForWindowFn>,
        get_dpi_for_system: Option<GetDpiForSystemFn>,
        get_system_metrics_for_dpi: Option<GetSystemMetricsForDpiFn>,
        set_shcore_awareness: Option<SetShcoreAwarenessFn>,
        get_dpi_for_monitor: Option<GetDpiForMonitorFn>,
    }

    fn api() -> &'static DpiApi {
        static API: OnceLock<DpiApi> = OnceLock::new();
        API.get_or_init(|| {
            let mut api = DpiApi::default();

            // SAFETY: each type alias matches the documented export signature.
            unsafe {
                if let Ok(user32) = Library::get("user32.dll") {
                    api.set_context = user32.symbol("SetProcessDpiAwarenessContext");
                    api.get_thread_context = user32.symbol("GetThreadDpiAwarenessContext");
                    api.get_window_context = user32.symbol("GetWindowDpiAwarenessContext");
                    api.get_awareness = user32.symbol("GetAwarenessFromDpiAwarenessContext");
                    api.contexts_equal = user32.symbol("AreDpiAwarenessContextsEqual");
                    api.get_dpi_for_window = user32.symbol("GetDpiForWindow");
                    api.get_dpi_for_system = user32.symbol("GetDpiForSystem");
                    api.get_system_metrics_for_dpi = user32.symbol("GetSystemMetricsForDpi");
                }

                match Library::load_system("shcore.dll") {
                    Ok(shcore) => {
                        api.set_shcore_awareness = shcore.symbol("SetProcessDpiAwareness");
                        api.get_dpi_for_monitor = shcore.symbol("GetDpiForMonitor");
                        // The resolved pointers live as long as the process.
                        std::mem::forget(shcore);
                    }
                    Err(e) => debug!("shcore.dll unavailable: {e}"),
                }
            }

            api
        })
    }

    impl AwarenessSetters for DpiApi {
        fn set_context(&self, level: DpiAwareness) -> Option<std::result::Result<(), u32>> {
            let set_context = self.set_context?;
            // SAFETY: the argument is one of the documented pseudo-handles.
            let ok = unsafe { set_context(level.context()) };
            if ok.as_bool() {
                Some(Ok(()))
            } else {
                // SAFETY: no preconditions.
                Some(Err(unsafe { GetLastError() }.0))
            }
        }

        fn set_shcore(&self, value: i32) -> Option<std::result::Result<(), i32>> {
            let set_awareness = self.set_shcore_awareness?;
            // SAFETY: value is a valid PROCESS_DPI_AWARENESS.
            let hr = unsafe { set_awareness(value) };
            Some(if hr >= 0 { Ok(()) } else { Err(hr) })
        }

        fn set_legacy(&self) -> bool {
            // SAFETY: no preconditions.
            unsafe { SetProcessDPIAware() }.as_bool()
        }
    }

    /// Sets the process DPI awareness, returning the level actually applied.
    ///
    /// Fails with [`Error::AccessDenied`] when the awareness was already
    /// fixed by the application manifest or an earlier call.
    pub fn set_process_awareness(level: DpiAwareness) -> Result<DpiAwareness> {
        apply_awareness(api(), level)
    }

    fn awareness_from_context(api: &DpiApi, context: isize) -> Option<DpiAwareness> {
        if let Some(equal) = api.contexts_equal {
            for special in [DpiAwareness::PerMonitorAwareV2, DpiAwareness::UnawareGdiScaled] {
                // SAFETY: both arguments are awareness contexts.
                if unsafe { equal(context, special.context()) }.as_bool() {
                    return Some(special);
                }
            }
        }
        let get_awareness = api.get_awareness?;
        // SAFETY: context came from the system.
        DpiAwareness::from_awareness_value(unsafe { get_awareness(context) })
    }

    fn legacy_awareness() -> DpiAwareness {
        // SAFETY: no preconditions.
        if unsafe { IsProcessDPIAware() }.as_bool() {
            DpiAwareness::SystemAware
        } else {
            DpiAwareness::Unaware
        }
    }

    /// The awareness of the calling thread.
    pub fn thread_awareness() -> DpiAwareness {
        let api = api();
        api.get_thread_context
            // SAFETY: no preconditions.
            .and_then(|get| awareness_from_context(api, unsafe { get() }))
            .unwrap_or_else(legacy_awareness)
    }

    /// The awareness a window was created with.
    pub fn window_awareness(window: WindowHandle) -> Result<DpiAwareness> {
        let api = api();
        let Some(get) = api.get_window_context else {
            return Ok(legacy_awareness());
        };
        // SAFETY: any hwnd value is accepted; invalid ones return null.
        let context = unsafe { get(window.as_raw()) };
        if context == 0 {
            return Err(Error::invalid_handle("window has no DPI awareness context"));
        }
        awareness_from_context(api, context)
            .ok_or_else(|| Error::unsupported("unknown DPI awareness context"))
    }

    /// The DPI of a window.
    pub fn dpi_for_window(window: WindowHandle) -> Result<u32> {
        if let Some(get) = api().get_dpi_for_window {
            // SAFETY: any hwnd value is accepted; invalid ones return 0.
            return match unsafe { get(window.as_raw()) } {
                0 => Err(Error::invalid_handle("GetDpiForWindow returned 0")),
                dpi => Ok(dpi),
            };
        }
        let dc = DeviceContext::for_window(window)?;
        Ok(dc.device_caps(DeviceCap::LogPixelsX) as u32)
    }

    /// The DPI of a monitor.
    pub fn dpi_for_monitor(monitor: Monitor, kind: MonitorDpiType) -> Result<u32> {
        let get = api()
            .get_dpi_for_monitor
            .ok_or_else(|| Error::unsupported("GetDpiForMonitor requires Windows 8.1"))?;
        let (mut x, mut y) = (0u32, 0u32);
        // SAFETY: both out pointers are valid.
        let hr = unsafe { get(monitor.as_raw(), kind as i32, &mut x, &mut y) };
        if hr < 0 {
            return Err(Error::from_win32_code(hr as u32));
        }
        Ok(x)
    }

    /// The system DPI.
    pub fn system_dpi() -> u32 {
        if let Some(get) = api().get_dpi_for_system {
            // SAFETY: no preconditions.
            return unsafe { get() };
        }
        DeviceContext::screen()
            .map(|dc| dc.device_caps(DeviceCap::LogPixelsX) as u32)
            .unwrap_or(BASE_DPI)
    }

    /// A `GetSystemMetrics` value as it would be at `dpi`.
    pub fn system_metric_for_dpi(index: i32, dpi: u32) -> i32 {
        if let Some(get) = api().get_system_metrics_for_dpi {
            // SAFETY: plain value arguments.
            return unsafe { get(index, dpi) };
        }
        // SAFETY: plain value arguments.
        let metric = unsafe { GetSystemMetrics(SYSTEM_METRICS_INDEX(index)) };
        rescale(metric, system_dpi(), dpi)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_system_dpi_is_sane() {
            let dpi = system_dpi();
            assert!((96..=960).contains(&dpi), "{dpi}");
        }

        #[test]
        fn test_primary_monitor_dpi() {
            let dpi = dpi_for_monitor(Monitor::primary(), MonitorDpiType::Effective).unwrap();
            assert!(dpi >= 96);
        }

        #[test]
        fn test_metric_at_base_dpi() {
            // SM_CXVSCROLL
            assert!(system_metric_for_dpi(2, 96) > 0);
            assert!(system_metric_for_dpi(2, 192) >= system_metric_for_dpi(2, 96));
        }

        #[test]
        fn test_invalid_window_dpi() {
            let null = WindowHandle::from_raw(HWND::default());
            assert!(dpi_for_window(null).is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_scale_rounds_to_nearest() {
        let s = DpiScale::from_dpi(144);
        assert_eq!(s.factor(), 1.5);
        assert_eq!(s.percent(), 150);
        assert_eq!(s.scale(10), 15);
        assert_eq!(s.scale(1), 2);
        assert_eq!(s.scale(-1), -2);
        assert_eq!(s.unscale(15), 10);
        assert_eq!(s.unscale(16), 11);

        let s = DpiScale::from_dpi(120);
        assert_eq!(s.percent(), 125);
        assert_eq!(s.scale(3), 4);
    }

    #[test]
    fn test_zero_dpi_is_base() {
        assert_eq!(DpiScale::from_dpi(0), DpiScale::default());
        assert_eq!(DpiScale::default().scale(37), 37);
        assert_eq!(rescale(5, 0, 96), 5);
    }

    #[test]
    fn test_scale_rect() {
        let s = DpiScale::from_dpi(192);
        assert_eq!(
            s.scale_rect(Rect::new(-10, 0, 100, 50)),
            Rect::new(-20, 0, 200, 100)
        );
    }

    #[test]
    fn test_shcore_mapping() {
        assert_eq!(DpiAwareness::PerMonitorAwareV2.shcore_value(), 2);
        assert_eq!(DpiAwareness::UnawareGdiScaled.shcore_value(), 0);
        assert_eq!(DpiAwareness::SystemAware.shcore_value(), 1);
        assert_eq!(DpiAwareness::PerMonitorAwareV2.context(), -4);
    }

    /// Records calls and answers from a script.
    struct Scripted {
        context: Vec<Option<std::result::Result<(), u32>>>,
        shcore: Option<std::result::Result<(), i32>>,
        legacy: bool,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                context: vec![None],
                shcore: None,
                legacy: true,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl AwarenessSetters for Scripted {
        fn set_context(&self, level: DpiAwareness) -> Option<std::result::Result<(), u32>> {
            let mut calls = self.calls.borrow_mut();
            calls.push(format!("context {level:?}"));
            let n = calls.iter().filter(|c| c.starts_with("context")).count();
            self.context.get(n - 1).copied().flatten()
        }

        fn set_shcore(&self, value: i32) -> Option<std::result::Result<(), i32>> {
            self.calls.borrow_mut().push(format!("shcore {value}"));
            self.shcore
        }

        fn set_legacy(&self) -> bool {
            self.calls.borrow_mut().push("legacy".into());
            self.legacy
        }
    }

    #[test]
    fn test_context_api_wins() {
        let mut s = Scripted::new();
        s.context = vec![Some(Ok(()))];
        let applied = apply_awareness(&s, DpiAwareness::PerMonitorAwareV2).unwrap();
        assert_eq!(applied, DpiAwareness::PerMonitorAwareV2);
        assert_eq!(*s.calls.borrow(), vec!["context PerMonitorAwareV2"]);
    }

    #[test]
    fn test_invalid_v2_context_downgrades() {
        let mut s = Scripted::new();
        // ERROR_INVALID_PARAMETER for V2, then success for V1.
        s.context = vec![Some(Err(87)), Some(Ok(()))];
        let applied = apply_awareness(&s, DpiAwareness::PerMonitorAwareV2).unwrap();
        assert_eq!(applied, DpiAwareness::PerMonitorAware);
    }

    #[test]
    fn test_invalid_per_monitor_context_downgrades_to_system() {
        let mut s = Scripted::new();
        s.context = vec![Some(Err(87)), Some(Err(87)), Some(Ok(()))];
        let applied = apply_awareness(&s, DpiAwareness::PerMonitorAwareV2).unwrap();
        assert_eq!(applied, DpiAwareness::SystemAware);
        assert_eq!(
            *s.calls.borrow(),
            vec![
                "context PerMonitorAwareV2",
                "context PerMonitorAware",
                "context SystemAware",
            ]
        );
    }

    #[test]
    fn test_rejected_context_ladder_ends_at_shcore() {
        let mut s = Scripted::new();
        s.context = vec![Some(Err(87)), Some(Err(87))];
        s.shcore = Some(Ok(()));
        let applied = apply_awareness(&s, DpiAwareness::PerMonitorAware).unwrap();
        assert_eq!(applied, DpiAwareness::PerMonitorAware);
        assert_eq!(
            *s.calls.borrow(),
            vec!["context PerMonitorAware", "context SystemAware", "shcore 2"]
        );
    }

    #[test]
    fn test_access_denied_is_reported() {
        let mut s = Scripted::new();
        s.context = vec![Some(Err(ERROR_ACCESS_DENIED))];
        let err = apply_awareness(&s, DpiAwareness::SystemAware).unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));

        let mut s = Scripted::new();
        s.shcore = Some(Err(E_ACCESSDENIED));
        let err = apply_awareness(&s, DpiAwareness::SystemAware).unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    #[test]
    fn test_falls_back_to_shcore() {
        let mut s = Scripted::new();
        s.shcore = Some(Ok(()));
        let applied = apply_awareness(&s, DpiAwareness::PerMonitorAwareV2).unwrap();
        assert_eq!(applied, DpiAwareness::PerMonitorAware);
        assert_eq!(
            *s.calls.borrow(),
            vec!["context PerMonitorAwareV2", "shcore 2"]
        );
    }

    #[test]
    fn test_falls_back_to_legacy() {
        let s = Scripted::new();
        let applied = apply_awareness(&s, DpiAwareness::PerMonitorAware).unwrap();
        assert_eq!(applied, DpiAwareness::SystemAware);
        assert_eq!(s.calls.borrow().last().map(String::as_str), Some("legacy"));
    }

    #[test]
    fn test_unaware_needs_no_legacy_call() {
        let s = Scripted::new();
        let applied = apply_awareness(&s, DpiAwareness::Unaware).unwrap();
        assert_eq!(applied, DpiAwareness::Unaware);
        assert!(!s.calls.borrow().iter().any(|c| c == "legacy"));
    }

    #[test]
    fn test_legacy_failure_is_unsupported() {
        let mut s = Scripted::new();
        s.legacy = false;
        let err = apply_awareness(&s, DpiAwareness::SystemAware).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
