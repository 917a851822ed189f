//! Display configuration through the CCD API (`QueryDisplayConfig`).
//!
//! The `DISPLAYCONFIG_*` structures are declared here with `#[repr(C)]` so
//! their layouts are pinned by tests on every platform. The calls that fill
//! them only exist on Windows.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> win32_surface::error::Result<()> {
//! use win32_surface::display::{DisplayConfig, QueryFlags};
//!
//! let config = DisplayConfig::query(QueryFlags::ONLY_ACTIVE_PATHS)?;
//! for display in config.displays() {
//!     println!(
//!         "{} {:?} {:.2} Hz",
//!         display.gdi_device_name.as_deref().unwrap_or("?"),
//!         display.friendly_name,
//!         display.refresh_rate,
//!     );
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

use crate::geometry::Rect;
use std::fmt;

/// Locally unique identifier of a display adapter.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Luid {
    /// Low 32 bits.
    pub low_part: u32,
    /// High 32 bits.
    pub high_part: i32,
}

impl fmt::Display for Luid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{:08x}", self.high_part as u32, self.low_part)
    }
}

/// `DISPLAYCONFIG_RATIONAL`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub numerator: u32,
    /// Denominator.
    pub denominator: u32,
}

impl Rational {
    /// The frequency in Hz; 0 when the denominator is 0.
    pub fn hz(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            f64::from(self.numerator) / f64::from(self.denominator)
        }
    }
}

/// `POINTL`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointL {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

/// `RECTL`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectL {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge.
    pub right: i32,
    /// Bottom edge.
    pub bottom: i32,
}

/// `DISPLAYCONFIG_2DREGION`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region2D {
    /// Width.
    pub cx: u32,
    /// Height.
    pub cy: u32,
}

/// `DISPLAYCONFIG_PATH_SOURCE_INFO`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigPathSourceInfo {
    /// Adapter of the source.
    pub adapter_id: Luid,
    /// Source id on that adapter.
    pub id: u32,
    /// Index into the mode array, or a packed clone-group/mode index pair
    /// when queried with [`QueryFlags::VIRTUAL_MODE_AWARE`].
    pub mode_info_idx: u32,
    /// `DISPLAYCONFIG_SOURCE_IN_USE` and friends.
    pub status_flags: u32,
}

/// `DISPLAYCONFIG_PATH_TARGET_INFO`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigPathTargetInfo {
    /// Adapter of the target.
    pub adapter_id: Luid,
    /// Target id on that adapter.
    pub id: u32,
    /// Index into the mode array (packed when virtual-mode aware).
    pub mode_info_idx: u32,
    /// `DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY`.
    pub output_technology: u32,
    /// `DISPLAYCONFIG_ROTATION`.
    pub rotation: u32,
    /// `DISPLAYCONFIG_SCALING`.
    pub scaling: u32,
    /// Refresh rate of the path.
    pub refresh_rate: Rational,
    /// `DISPLAYCONFIG_SCANLINE_ORDERING`.
    pub scan_line_ordering: u32,
    /// Nonzero when a monitor is connected.
    pub target_available: i32,
    /// `DISPLAYCONFIG_TARGET_IN_USE` and friends.
    pub status_flags: u32,
}

/// `DISPLAYCONFIG_PATH_INFO`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigPathInfo {
    /// The source end.
    pub source_info: DisplayConfigPathSourceInfo,
    /// The target end.
    pub target_info: DisplayConfigPathTargetInfo,
    /// `DISPLAYCONFIG_PATH_ACTIVE` and friends.
    pub flags: u32,
}

impl DisplayConfigPathInfo {
    /// True when the path is part of the active topology.
    pub fn is_active(&self) -> bool {
        self.flags & DISPLAYCONFIG_PATH_ACTIVE != 0
    }
}

/// `DISPLAYCONFIG_PATH_ACTIVE`.
pub const DISPLAYCONFIG_PATH_ACTIVE: u32 = 0x0000_0001;
/// `DISPLAYCONFIG_PATH_MODE_IDX_INVALID`.
pub const DISPLAYCONFIG_PATH_MODE_IDX_INVALID: u32 = 0xFFFF_FFFF;

/// `DISPLAYCONFIG_VIDEO_SIGNAL_INFO`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoSignalInfo {
    /// Pixel clock in Hz.
    pub pixel_rate: u64,
    /// Horizontal sync frequency.
    pub h_sync_freq: Rational,
    /// Vertical sync frequency.
    pub v_sync_freq: Rational,
    /// Active region.
    pub active_size: Region2D,
    /// Total region including blanking.
    pub total_size: Region2D,
    /// Video standard and vsync divider bitfield.
    pub video_standard: u32,
    /// `DISPLAYCONFIG_SCANLINE_ORDERING`.
    pub scan_line_ordering: u32,
}

/// `DISPLAYCONFIG_TARGET_MODE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigTargetMode {
    /// The signal driven to the monitor.
    pub target_video_signal_info: VideoSignalInfo,
}

/// `DISPLAYCONFIG_SOURCE_MODE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigSourceMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `DISPLAYCONFIG_PIXELFORMAT`.
    pub pixel_format: u32,
    /// Position in desktop coordinates.
    pub position: PointL,
}

/// `DISPLAYCONFIG_DESKTOP_IMAGE_INFO`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigDesktopImageInfo {
    /// Size of the VidPN source surface.
    pub path_source_size: PointL,
    /// Desktop image region.
    pub desktop_image_region: RectL,
    /// Desktop image clip.
    pub desktop_image_clip: RectL,
}

/// The mode payload of [`DisplayConfigModeInfo`], selected by `info_type`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union DisplayConfigModeInfoUnion {
    /// Valid when `info_type` is [`MODE_INFO_TYPE_TARGET`].
    pub target_mode: DisplayConfigTargetMode,
    /// Valid when `info_type` is [`MODE_INFO_TYPE_SOURCE`].
    pub source_mode: DisplayConfigSourceMode,
    /// Valid when `info_type` is [`MODE_INFO_TYPE_DESKTOP_IMAGE`].
    pub desktop_image_info: DisplayConfigDesktopImageInfo,
}

impl Default for DisplayConfigModeInfoUnion {
    fn default() -> Self {
        Self {
            target_mode: DisplayConfigTargetMode::default(),
        }
    }
}

/// `DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE`.
pub const MODE_INFO_TYPE_SOURCE: u32 = 1;
/// `DISPLAYCONFIG_MODE_INFO_TYPE_TARGET`.
pub const MODE_INFO_TYPE_TARGET: u32 = 2;
/// `DISPLAYCONFIG_MODE_INFO_TYPE_DESKTOP_IMAGE`.
pub const MODE_INFO_TYPE_DESKTOP_IMAGE: u32 = 3;

/// `DISPLAYCONFIG_MODE_INFO`.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct DisplayConfigModeInfo {
    /// One of the `MODE_INFO_TYPE_*` values.
    pub info_type: u32,
    /// Source or target id.
    pub id: u32,
    /// Adapter the mode belongs to.
    pub adapter_id: Luid,
    /// The mode itself.
    pub mode: DisplayConfigModeInfoUnion,
}

impl DisplayConfigModeInfo {
    /// The source mode, if this entry is one.
    pub fn source_mode(&self) -> Option<&DisplayConfigSourceMode> {
        // SAFETY: info_type names the initialized union member.
        (self.info_type == MODE_INFO_TYPE_SOURCE).then(|| unsafe { &self.mode.source_mode })
    }

    /// The target mode, if this entry is one.
    pub fn target_mode(&self) -> Option<&DisplayConfigTargetMode> {
        // SAFETY: info_type names the initialized union member.
        (self.info_type == MODE_INFO_TYPE_TARGET).then(|| unsafe { &self.mode.target_mode })
    }

    /// The desktop image info, if this entry is one.
    pub fn desktop_image_info(&self) -> Option<&DisplayConfigDesktopImageInfo> {
        // SAFETY: info_type names the initialized union member.
        (self.info_type == MODE_INFO_TYPE_DESKTOP_IMAGE)
            .then(|| unsafe { &self.mode.desktop_image_info })
    }
}

impl fmt::Debug for DisplayConfigModeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("DisplayConfigModeInfo");
        s.field("info_type", &self.info_type)
            .field("id", &self.id)
            .field("adapter_id", &self.adapter_id);
        if let Some(m) = self.source_mode() {
            s.field("source_mode", m);
        } else if let Some(m) = self.target_mode() {
            s.field("target_mode", m);
        } else if let Some(m) = self.desktop_image_info() {
            s.field("desktop_image_info", m);
        }
        s.finish()
    }
}

/// `DISPLAYCONFIG_DEVICE_INFO_HEADER`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigDeviceInfoHeader {
    /// `DISPLAYCONFIG_DEVICE_INFO_TYPE`.
    pub info_type: u32,
    /// Size of the whole request packet.
    pub size: u32,
    /// Adapter to query.
    pub adapter_id: Luid,
    /// Source or target id.
    pub id: u32,
}

const DEVICE_INFO_GET_SOURCE_NAME: u32 = 1;
const DEVICE_INFO_GET_TARGET_NAME: u32 = 2;
const DEVICE_INFO_GET_TARGET_PREFERRED_MODE: u32 = 3;
const DEVICE_INFO_GET_ADAPTER_NAME: u32 = 4;

/// `DISPLAYCONFIG_SOURCE_DEVICE_NAME`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigSourceDeviceName {
    /// Request header.
    pub header: DisplayConfigDeviceInfoHeader,
    /// GDI device name (`\\.\DISPLAYn`).
    pub view_gdi_device_name: [u16; 32],
}

/// `DISPLAYCONFIG_TARGET_DEVICE_NAME`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfigTargetDeviceName {
    /// Request header.
    pub header: DisplayConfigDeviceInfoHeader,
    /// `DISPLAYCONFIG_TARGET_DEVICE_NAME_FLAGS`.
    pub flags: u32,
    /// `DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY`.
    pub output_technology: u32,
    /// EDID manufacturer id.
    pub edid_manufacture_id: u16,
    /// EDID product code.
    pub edid_product_code_id: u16,
    /// Connector instance on the adapter.
    pub connector_instance: u32,
    /// Monitor name, usually from the EDID.
    pub monitor_friendly_device_name: [u16; 64],
    /// Monitor device interface path.
    pub monitor_device_path: [u16; 128],
}

impl Default for DisplayConfigTargetDeviceName {
    fn default() -> Self {
        Self {
            header: DisplayConfigDeviceInfoHeader::default(),
            flags: 0,
            output_technology: 0,
            edid_manufacture_id: 0,
            edid_product_code_id: 0,
            connector_instance: 0,
            monitor_friendly_device_name: [0; 64],
            monitor_device_path: [0; 128],
        }
    }
}

/// `DISPLAYCONFIG_TARGET_PREFERRED_MODE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayConfigTargetPreferredMode {
    /// Request header.
    pub header: DisplayConfigDeviceInfoHeader,
    /// Preferred width.
    pub width: u32,
    /// Preferred height.
    pub height: u32,
    /// Preferred signal.
    pub target_mode: DisplayConfigTargetMode,
}

/// `DISPLAYCONFIG_ADAPTER_NAME`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfigAdapterName {
    /// Request header.
    pub header: DisplayConfigDeviceInfoHeader,
    /// Adapter device interface path.
    pub adapter_device_path: [u16; 128],
}

impl Default for DisplayConfigAdapterName {
    fn default() -> Self {
        Self {
            header: DisplayConfigDeviceInfoHeader::default(),
            adapter_device_path: [0; 128],
        }
    }
}

/// `QDC_*` flags for [`DisplayConfig::query`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryFlags(pub u32);

impl QueryFlags {
    /// Every path, active or not.
    pub const ALL_PATHS: Self = Self(0x0000_0001);
    /// Only active paths.
    pub const ONLY_ACTIVE_PATHS: Self = Self(0x0000_0002);
    /// The configuration in the persistence database, with its topology id.
    pub const DATABASE_CURRENT: Self = Self(0x0000_0004);
    /// Report virtual modes; mode indices become packed pairs.
    pub const VIRTUAL_MODE_AWARE: Self = Self(0x0000_0010);
    /// Include head-mounted displays.
    pub const INCLUDE_HMD: Self = Self(0x0000_0020);

    /// Combines two flag sets.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// `DISPLAYCONFIG_TOPOLOGY_ID`; the values double as `SDC_TOPOLOGY_*` flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Topology {
    /// Internal display only.
    Internal = 0x1,
    /// All displays show the same image.
    Clone = 0x2,
    /// Desktop spans all displays.
    Extend = 0x4,
    /// External display only.
    External = 0x8,
}

impl Topology {
    /// Maps a raw topology id.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x1 => Some(Topology::Internal),
            0x2 => Some(Topology::Clone),
            0x4 => Some(Topology::Extend),
            0x8 => Some(Topology::External),
            _ => None,
        }
    }
}

/// `DISPLAYCONFIG_ROTATION`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// No rotation.
    Identity,
    /// 90 degrees clockwise.
    Rotate90,
    /// 180 degrees.
    Rotate180,
    /// 270 degrees clockwise.
    Rotate270,
}

impl Rotation {
    /// Maps a raw rotation value.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Rotation::Identity),
            2 => Some(Rotation::Rotate90),
            3 => Some(Rotation::Rotate180),
            4 => Some(Rotation::Rotate270),
            _ => None,
        }
    }

    /// Rotation in degrees.
    pub const fn degrees(self) -> u32 {
        match self {
            Rotation::Identity => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

/// `DISPLAYCONFIG_SCALING`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scaling {
    /// No scaling.
    Identity,
    /// Centered without scaling.
    Centered,
    /// Stretched to fill.
    Stretched,
    /// Scaled preserving aspect ratio.
    AspectRatioCenteredMax,
    /// Driver-specific custom scaling.
    Custom,
    /// The driver's preferred scaling.
    Preferred,
}

impl Scaling {
    /// Maps a raw scaling value.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Scaling::Identity),
            2 => Some(Scaling::Centered),
            3 => Some(Scaling::Stretched),
            4 => Some(Scaling::AspectRatioCenteredMax),
            5 => Some(Scaling::Custom),
            128 => Some(Scaling::Preferred),
            _ => None,
        }
    }
}

/// `DISPLAYCONFIG_SCANLINE_ORDERING`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScanLineOrdering {
    /// Not specified.
    Unspecified,
    /// Progressive.
    Progressive,
    /// Interlaced, upper field first.
    InterlacedUpperFieldFirst,
    /// Interlaced, lower field first.
    InterlacedLowerFieldFirst,
}

impl ScanLineOrdering {
    /// Maps a raw scan line ordering value.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ScanLineOrdering::Unspecified),
            1 => Some(ScanLineOrdering::Progressive),
            2 => Some(ScanLineOrdering::InterlacedUpperFieldFirst),
            3 => Some(ScanLineOrdering::InterlacedLowerFieldFirst),
            _ => None,
        }
    }
}

/// `DISPLAYCONFIG_VIDEO_OUTPUT_TECHNOLOGY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputTechnology {
    /// Unknown connector.
    Other,
    /// VGA.
    Hd15,
    /// S-Video.
    SVideo,
    /// Composite video.
    CompositeVideo,
    /// Component video.
    ComponentVideo,
    /// DVI.
    Dvi,
    /// HDMI.
    Hdmi,
    /// LVDS panel.
    Lvds,
    /// D-Jpn.
    DJpn,
    /// SDI.
    Sdi,
    /// External DisplayPort.
    DisplayPortExternal,
    /// Embedded DisplayPort panel.
    DisplayPortEmbedded,
    /// External UDI.
    UdiExternal,
    /// Embedded UDI panel.
    UdiEmbedded,
    /// SDTV dongle.
    SdtvDongle,
    /// Miracast wireless display.
    Miracast,
    /// Indirect display over a wired link.
    IndirectWired,
    /// Indirect virtual display.
    IndirectVirtual,
    /// DisplayPort tunnelled over USB4.
    DisplayPortUsbTunnel,
    /// Internal connection (laptop panel).
    Internal,
    /// A value this crate does not know.
    Unknown(u32),
}

impl OutputTechnology {
    /// Maps a raw output technology value.
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0xFFFF_FFFF => OutputTechnology::Other,
            0 => OutputTechnology::Hd15,
            1 => OutputTechnology::SVideo,
            2 => OutputTechnology::CompositeVideo,
            3 => OutputTechnology::ComponentVideo,
            4 => OutputTechnology::Dvi,
            5 => OutputTechnology::Hdmi,
            6 => OutputTechnology::Lvds,
            8 => OutputTechnology::DJpn,
            9 => OutputTechnology::Sdi,
            10 => OutputTechnology::DisplayPortExternal,
            11 => OutputTechnology::DisplayPortEmbedded,
            12 => OutputTechnology::UdiExternal,
            13 => OutputTechnology::UdiEmbedded,
            14 => OutputTechnology::SdtvDongle,
            15 => OutputTechnology::Miracast,
            16 => OutputTechnology::IndirectWired,
            17 => OutputTechnology::IndirectVirtual,
            18 => OutputTechnology::DisplayPortUsbTunnel,
            0x8000_0000 => OutputTechnology::Internal,
            other => OutputTechnology::Unknown(other),
        }
    }

    /// True for panels built into the device.
    pub const fn is_internal(self) -> bool {
        matches!(
            self,
            OutputTechnology::Internal
                | OutputTechnology::Lvds
                | OutputTechnology::DisplayPortEmbedded
                | OutputTechnology::UdiEmbedded
        )
    }
}

/// A preferred mode reported for a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreferredMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Vertical refresh rate in Hz.
    pub refresh_rate: f64,
}

/// Monitor identification for a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDeviceName {
    /// Monitor name, usually from the EDID; may be empty.
    pub friendly_name: String,
    /// Monitor device interface path.
    pub device_path: String,
    /// Connector type.
    pub output_technology: OutputTechnology,
    /// EDID manufacturer id, when the EDID ids are valid.
    pub edid_manufacture_id: Option<u16>,
    /// EDID product code, when the EDID ids are valid.
    pub edid_product_code_id: Option<u16>,
    /// Connector instance on the adapter.
    pub connector_instance: u32,
}

const TARGET_NAME_EDID_IDS_VALID: u32 = 0x4;

impl From<&DisplayConfigTargetDeviceName> for TargetDeviceName {
    fn from(raw: &DisplayConfigTargetDeviceName) -> Self {
        let edid_valid = raw.flags & TARGET_NAME_EDID_IDS_VALID != 0;
        Self {
            friendly_name: crate::string::from_wide_lossy(&raw.monitor_friendly_device_name),
            device_path: crate::string::from_wide_lossy(&raw.monitor_device_path),
            output_technology: OutputTechnology::from_raw(raw.output_technology),
            edid_manufacture_id: edid_valid.then_some(raw.edid_manufacture_id),
            edid_product_code_id: edid_valid.then_some(raw.edid_product_code_id),
            connector_instance: raw.connector_instance,
        }
    }
}

/// A per-path summary combining the path, its modes and device names.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayPath {
    /// Adapter driving the path.
    pub adapter_id: Luid,
    /// Source id on the adapter.
    pub source_id: u32,
    /// Target id on the adapter.
    pub target_id: u32,
    /// True when the path is active.
    pub active: bool,
    /// Refresh rate in Hz.
    pub refresh_rate: f64,
    /// Rotation, when reported.
    pub rotation: Option<Rotation>,
    /// Scaling, when reported.
    pub scaling: Option<Scaling>,
    /// Connector type.
    pub output_technology: OutputTechnology,
    /// Source position and resolution in desktop coordinates.
    pub source_bounds: Option<Rect>,
    /// GDI device name of the source (`\\.\DISPLAYn`).
    pub gdi_device_name: Option<String>,
    /// Monitor name.
    pub friendly_name: Option<String>,
    /// Monitor device interface path.
    pub device_path: Option<String>,
}

/// A snapshot of the display paths and modes.
#[derive(Clone, Debug, Default)]
pub struct DisplayConfig {
    flags: Option<QueryFlags>,
    paths: Vec<DisplayConfigPathInfo>,
    modes: Vec<DisplayConfigModeInfo>,
    topology: Option<Topology>,
}

impl DisplayConfig {
    /// Builds a snapshot from already-queried arrays.
    pub fn from_parts(
        flags: QueryFlags,
        paths: Vec<DisplayConfigPathInfo>,
        modes: Vec<DisplayConfigModeInfo>,
        topology: Option<Topology>,
    ) -> Self {
        Self {
            flags: Some(flags),
            paths,
            modes,
            topology,
        }
    }

    /// The path array.
    pub fn paths(&self) -> &[DisplayConfigPathInfo] {
        &self.paths
    }

    /// The mode array.
    pub fn modes(&self) -> &[DisplayConfigModeInfo] {
        &self.modes
    }

    /// The topology id; only reported for [`QueryFlags::DATABASE_CURRENT`].
    pub fn topology(&self) -> Option<Topology> {
        self.topology
    }

    fn virtual_mode_aware(&self) -> bool {
        self.flags
            .is_some_and(|f| f.contains(QueryFlags::VIRTUAL_MODE_AWARE))
    }

    /// The source mode referenced by a path.
    pub fn source_mode(&self, path: &DisplayConfigPathInfo) -> Option<&DisplayConfigSourceMode> {
        let idx = if self.virtual_mode_aware() {
            // sourceModeInfoIdx is the high 16 bits; the low 16 are cloneGroupId.
            match path.source_info.mode_info_idx >> 16 {
                0xFFFF => return None,
                idx => idx,
            }
        } else {
            path.source_info.mode_info_idx
        };
        self.modes.get(idx as usize)?.source_mode()
    }

    /// The target mode referenced by a path.
    pub fn target_mode(&self, path: &DisplayConfigPathInfo) -> Option<&DisplayConfigTargetMode> {
        let idx = if self.virtual_mode_aware() {
            // targetModeInfoIdx is the high 16 bits; the low 16 are desktopModeInfoIdx.
            match path.target_info.mode_info_idx >> 16 {
                0xFFFF => return None,
                idx => idx,
            }
        } else {
            path.target_info.mode_info_idx
        };
        self.modes.get(idx as usize)?.target_mode()
    }

    /// Per-path summaries without device names.
    pub fn summaries(&self) -> Vec<DisplayPath> {
        self.paths.iter().map(|p| self.summarize(p)).collect()
    }

    fn summarize(&self, path: &DisplayConfigPathInfo) -> DisplayPath {
        let target = &path.target_info;
        let mut refresh_rate = target.refresh_rate.hz();
        if refresh_rate == 0.0 {
            if let Some(mode) = self.target_mode(path) {
                refresh_rate = mode.target_video_signal_info.v_sync_freq.hz();
            }
        }

        let source_bounds = self.source_mode(path).map(|m| {
            Rect::new(
                m.position.x,
                m.position.y,
                m.position.x.saturating_add(i32::try_from(m.width).unwrap_or(i32::MAX)),
                m.position.y.saturating_add(i32::try_from(m.height).unwrap_or(i32::MAX)),
            )
        });

        DisplayPath {
            adapter_id: path.source_info.adapter_id,
            source_id: path.source_info.id,
            target_id: target.id,
            active: path.is_active(),
            refresh_rate,
            rotation: Rotation::from_raw(target.rotation),
            scaling: Scaling::from_raw(target.scaling),
            output_technology: OutputTechnology::from_raw(target.output_technology),
            source_bounds,
            gdi_device_name: None,
            friendly_name: None,
            device_path: None,
        }
    }
}

#[cfg(windows)]
pub use native::{
    adapter_device_path, set_topology, source_device_name, target_device_name,
    target_preferred_mode,
};

#[cfg(windows)]
mod native {
    use super::*;
    use crate::error::{Error, Result};
    use crate::string::from_wide_lossy;
    use tracing::debug;

    const ERROR_SUCCESS: i32 = 0;
    const ERROR_INSUFFICIENT_BUFFER: i32 = 122;
    const SDC_APPLY: u32 = 0x0000_0080;

    #[link(name = "user32")]
    extern "system" {
        fn GetDisplayConfigBufferSizes(
            flags: u32,
            num_path_array_elements: *mut u32,
            num_mode_info_array_elements: *mut u32,
        ) -> i32;

        fn QueryDisplayConfig(
            flags: u32,
            num_path_array_elements: *mut u32,
            path_array: *mut DisplayConfigPathInfo,
            num_mode_info_array_elements: *mut u32,
            mode_info_array: *mut DisplayConfigModeInfo,
            current_topology_id: *mut u32,
        ) -> i32;

        fn DisplayConfigGetDeviceInfo(request_packet: *mut DisplayConfigDeviceInfoHeader) -> i32;

        fn SetDisplayConfig(
            num_path_array_elements: u32,
            path_array: *mut DisplayConfigPathInfo,
            num_mode_info_array_elements: u32,
            mode_info_array: *mut DisplayConfigModeInfo,
            flags: u32,
        ) -> i32;
    }

    fn check(status: i32) -> Result<()> {
        if status == ERROR_SUCCESS {
            Ok(())
        } else {
            Err(Error::from_win32_code(status as u32))
        }
    }

    impl DisplayConfig {
        /// Queries the current display paths and modes.
        ///
        /// The path count can change between sizing the buffers and filling
        /// them; the query is repeated until the buffers are large enough.
        pub fn query(flags: QueryFlags) -> Result<Self> {
            let wants_topology = flags.contains(QueryFlags::DATABASE_CURRENT);

            loop {
                let mut path_count = 0u32;
                let mut mode_count = 0u32;
                // SAFETY: both out pointers are valid.
                check(unsafe {
                    GetDisplayConfigBufferSizes(flags.0, &mut path_count, &mut mode_count)
                })?;

                let mut paths = vec![DisplayConfigPathInfo::default(); path_count as usize];
                let mut modes = vec![DisplayConfigModeInfo::default(); mode_count as usize];
                let mut topology_id = 0u32;
                let topology_ptr = if wants_topology {
                    &mut topology_id as *mut u32
                } else {
                    std::ptr::null_mut()
                };

                // SAFETY: the arrays hold exactly the announced number of elements.
                let status = unsafe {
                    QueryDisplayConfig(
                        flags.0,
                        &mut path_count,
                        paths.as_mut_ptr(),
                        &mut mode_count,
                        modes.as_mut_ptr(),
                        topology_ptr,
                    )
                };

                if status == ERROR_INSUFFICIENT_BUFFER {
                    debug!("display configuration changed while querying, retrying");
                    continue;
                }
                check(status)?;

                paths.truncate(path_count as usize);
                modes.truncate(mode_count as usize);
                debug!(paths = paths.len(), modes = modes.len(), "queried display configuration");

                let topology = if wants_topology {
                    Topology::from_raw(topology_id)
                } else {
                    None
                };
                return Ok(Self::from_parts(flags, paths, modes, topology));
            }
        }

        /// Per-path summaries, including GDI and monitor names.
        ///
        /// Name lookups that fail (typically for inactive paths) leave the
        /// corresponding fields `None`.
        pub fn displays(&self) -> Vec<DisplayPath> {
            self.paths
                .iter()
                .map(|path| {
                    let mut display = self.summarize(path);
                    match source_device_name(display.adapter_id, display.source_id) {
                        Ok(name) => display.gdi_device_name = Some(name),
                        Err(e) => debug!(source = display.source_id, "no source name: {e}"),
                    }
                    match target_device_name(display.adapter_id, display.target_id) {
                        Ok(target) => {
                            display.friendly_name =
                                Some(target.friendly_name).filter(|n| !n.is_empty());
                            display.device_path = Some(target.device_path);
                        }
                        Err(e) => debug!(target = display.target_id, "no target name: {e}"),
                    }
                    display
                })
                .collect()
        }
    }

    trait DeviceInfoPacket: Default {
        const INFO_TYPE: u32;
    }

    impl DeviceInfoPacket for DisplayConfigSourceDeviceName {
        const INFO_TYPE: u32 = DEVICE_INFO_GET_SOURCE_NAME;
    }

    impl DeviceInfoPacket for DisplayConfigTargetDeviceName {
        const INFO_TYPE: u32 = DEVICE_INFO_GET_TARGET_NAME;
    }

    impl DeviceInfoPacket for DisplayConfigTargetPreferredMode {
        const INFO_TYPE: u32 = DEVICE_INFO_GET_TARGET_PREFERRED_MODE;
    }

    impl DeviceInfoPacket for DisplayConfigAdapterName {
        const INFO_TYPE: u32 = DEVICE_INFO_GET_ADAPTER_NAME;
    }

    fn device_info<T: DeviceInfoPacket>(adapter_id: Luid, id: u32) -> Result<T> {
        let mut packet = T::default();
        let header = DisplayConfigDeviceInfoHeader {
            info_type: T::INFO_TYPE,
            size: std::mem::size_of::<T>() as u32,
            adapter_id,
            id,
        };
        let ptr = &mut packet as *mut T as *mut DisplayConfigDeviceInfoHeader;
        // SAFETY: every packet type is repr(C) and starts with the header;
        // header.size bounds what the OS writes.
        check(unsafe {
            ptr.write(header);
            DisplayConfigGetDeviceInfo(ptr)
        })?;
        Ok(packet)
    }

    /// The GDI device name (`\\.\DISPLAYn`) of a source.
    pub fn source_device_name(adapter_id: Luid, source_id: u32) -> Result<String> {
        let packet: DisplayConfigSourceDeviceName = device_info(adapter_id, source_id)?;
        Ok(from_wide_lossy(&packet.view_gdi_device_name))
    }

    /// Monitor name, path and connector of a target.
    pub fn target_device_name(adapter_id: Luid, target_id: u32) -> Result<TargetDeviceName> {
        let packet: DisplayConfigTargetDeviceName = device_info(adapter_id, target_id)?;
        Ok(TargetDeviceName::from(&packet))
    }

    /// The monitor's preferred mode for a target.
    pub fn target_preferred_mode(adapter_id: Luid, target_id: u32) -> Result<PreferredMode> {
        let packet: DisplayConfigTargetPreferredMode = device_info(adapter_id, target_id)?;
        Ok(PreferredMode {
            width: packet.width,
            height: packet.height,
            refresh_rate: packet.target_mode.target_video_signal_info.v_sync_freq.hz(),
        })
    }

    /// The device interface path of an adapter.
    pub fn adapter_device_path(adapter_id: Luid) -> Result<String> {
        let packet: DisplayConfigAdapterName = device_info(adapter_id, 0)?;
        Ok(from_wide_lossy(&packet.adapter_device_path))
    }

    /// Switches to one of the database topologies (`SetDisplayConfig` with `SDC_APPLY`).
    pub fn set_topology(topology: Topology) -> Result<()> {
        debug!(?topology, "applying display topology");
        // SAFETY: topology-only calls take null arrays.
        check(unsafe {
            SetDisplayConfig(
                0,
                std::ptr::null_mut(),
                0,
                std::ptr::null_mut(),
                SDC_APPLY | topology as u32,
            )
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_layouts_match_wingdi() {
        assert_eq!(size_of::<Luid>(), 8);
        assert_eq!(size_of::<Rational>(), 8);
        assert_eq!(size_of::<DisplayConfigPathSourceInfo>(), 20);
        assert_eq!(size_of::<DisplayConfigPathTargetInfo>(), 48);
        assert_eq!(size_of::<DisplayConfigPathInfo>(), 72);
        assert_eq!(size_of::<VideoSignalInfo>(), 48);
        assert_eq!(size_of::<DisplayConfigSourceMode>(), 20);
        assert_eq!(size_of::<DisplayConfigDesktopImageInfo>(), 40);
        assert_eq!(size_of::<DisplayConfigModeInfoUnion>(), 48);
        assert_eq!(size_of::<DisplayConfigModeInfo>(), 64);
        assert_eq!(align_of::<DisplayConfigModeInfo>(), 8);
        assert_eq!(size_of::<DisplayConfigDeviceInfoHeader>(), 20);
        assert_eq!(size_of::<DisplayConfigSourceDeviceName>(), 84);
        assert_eq!(size_of::<DisplayConfigTargetDeviceName>(), 420);
        assert_eq!(size_of::<DisplayConfigTargetPreferredMode>(), 80);
        assert_eq!(size_of::<DisplayConfigAdapterName>(), 276);
    }

    #[test]
    fn test_rational_hz() {
        let r = Rational {
            numerator: 143_981,
            denominator: 1_000,
        };
        assert!((r.hz() - 143.981).abs() < 1e-9);
        assert_eq!(Rational::default().hz(), 0.0);
    }

    #[test]
    fn test_output_technology_mapping() {
        assert_eq!(OutputTechnology::from_raw(5), OutputTechnology::Hdmi);
        assert_eq!(OutputTechnology::from_raw(0x8000_0000), OutputTechnology::Internal);
        assert_eq!(OutputTechnology::from_raw(0xFFFF_FFFF), OutputTechnology::Other);
        assert_eq!(OutputTechnology::from_raw(7), OutputTechnology::Unknown(7));
        assert!(OutputTechnology::DisplayPortEmbedded.is_internal());
        assert!(!OutputTechnology::Hdmi.is_internal());
    }

    #[test]
    fn test_enum_mappings() {
        assert_eq!(Rotation::from_raw(2).map(Rotation::degrees), Some(90));
        assert_eq!(Rotation::from_raw(0), None);
        assert_eq!(Scaling::from_raw(128), Some(Scaling::Preferred));
        assert_eq!(Topology::from_raw(4), Some(Topology::Extend));
        assert_eq!(Topology::Extend as u32, 0x4);
        assert_eq!(ScanLineOrdering::from_raw(1), Some(ScanLineOrdering::Progressive));
    }

    fn source_mode(x: i32, y: i32, width: u32, height: u32) -> DisplayConfigModeInfo {
        DisplayConfigModeInfo {
            info_type: MODE_INFO_TYPE_SOURCE,
            id: 0,
            adapter_id: Luid::default(),
            mode: DisplayConfigModeInfoUnion {
                source_mode: DisplayConfigSourceMode {
                    width,
                    height,
                    pixel_format: 4,
                    position: PointL { x, y },
                },
            },
        }
    }

    fn target_mode(v_sync: Rational) -> DisplayConfigModeInfo {
        DisplayConfigModeInfo {
            info_type: MODE_INFO_TYPE_TARGET,
            mode: DisplayConfigModeInfoUnion {
                target_mode: DisplayConfigTargetMode {
                    target_video_signal_info: VideoSignalInfo {
                        v_sync_freq: v_sync,
                        ..Default::default()
                    },
                },
            },
            ..Default::default()
        }
    }

    fn path(source_idx: u32, target_idx: u32, refresh: Rational) -> DisplayConfigPathInfo {
        DisplayConfigPathInfo {
            source_info: DisplayConfigPathSourceInfo {
                id: 3,
                mode_info_idx: source_idx,
                ..Default::default()
            },
            target_info: DisplayConfigPathTargetInfo {
                id: 0x1100,
                mode_info_idx: target_idx,
                output_technology: 10,
                rotation: 1,
                scaling: 1,
                refresh_rate: refresh,
                ..Default::default()
            },
            flags: DISPLAYCONFIG_PATH_ACTIVE,
        }
    }

    #[test]
    fn test_summary_resolves_modes() {
        let config = DisplayConfig::from_parts(
            QueryFlags::ONLY_ACTIVE_PATHS,
            vec![path(0, 1, Rational { numerator: 60, denominator: 1 })],
            vec![source_mode(-1920, 0, 1920, 1080), target_mode(Rational::default())],
            None,
        );
        let summary = &config.summaries()[0];
        assert!(summary.active);
        assert_eq!(summary.source_id, 3);
        assert_eq!(summary.target_id, 0x1100);
        assert_eq!(summary.refresh_rate, 60.0);
        assert_eq!(summary.rotation, Some(Rotation::Identity));
        assert_eq!(summary.output_technology, OutputTechnology::DisplayPortExternal);
        assert_eq!(summary.source_bounds, Some(Rect::new(-1920, 0, 0, 1080)));
        assert_eq!(summary.gdi_device_name, None);
    }

    #[test]
    fn test_summary_falls_back_to_target_vsync() {
        let config = DisplayConfig::from_parts(
            QueryFlags::ONLY_ACTIVE_PATHS,
            vec![path(0, 1, Rational::default())],
            vec![
                source_mode(0, 0, 800, 600),
                target_mode(Rational { numerator: 120, denominator: 2 }),
            ],
            None,
        );
        assert_eq!(config.summaries()[0].refresh_rate, 60.0);
    }

    #[test]
    fn test_invalid_and_mistyped_mode_indices() {
        let config = DisplayConfig::from_parts(
            QueryFlags::ALL_PATHS,
            vec![
                path(DISPLAYCONFIG_PATH_MODE_IDX_INVALID, DISPLAYCONFIG_PATH_MODE_IDX_INVALID, Rational::default()),
                // Index 0 is a target mode, not a source mode.
                path(0, 0, Rational::default()),
            ],
            vec![target_mode(Rational::default())],
            None,
        );
        let paths = config.paths();
        assert!(config.source_mode(&paths[0]).is_none());
        assert!(config.target_mode(&paths[0]).is_none());
        assert!(config.source_mode(&paths[1]).is_none());
        assert!(config.target_mode(&paths[1]).is_some());
    }

    fn desktop_image_mode() -> DisplayConfigModeInfo {
        DisplayConfigModeInfo {
            info_type: MODE_INFO_TYPE_DESKTOP_IMAGE,
            mode: DisplayConfigModeInfoUnion {
                desktop_image_info: DisplayConfigDesktopImageInfo::default(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_virtual_mode_aware_indices_are_unpacked() {
        // sourceModeInfoIdx = 2 in the high half, cloneGroupId = 0 in the low half.
        let packed_source = 2 << 16;
        // targetModeInfoIdx = 1 in the high half, desktopModeInfoIdx = 0 in the low half.
        let packed_target = 1 << 16;
        let config = DisplayConfig::from_parts(
            QueryFlags::ONLY_ACTIVE_PATHS.with(QueryFlags::VIRTUAL_MODE_AWARE),
            vec![path(packed_source, packed_target, Rational::default())],
            vec![
                desktop_image_mode(),
                target_mode(Rational { numerator: 60, denominator: 1 }),
                source_mode(0, 0, 1280, 720),
            ],
            None,
        );
        let p = &config.paths()[0];
        assert_eq!(config.source_mode(p).map(|m| m.width), Some(1280));
        assert!(config.target_mode(p).is_some());
        assert!(config.modes()[0].desktop_image_info().is_some());

        let summary = &config.summaries()[0];
        assert_eq!(summary.refresh_rate, 60.0);
        assert_eq!(summary.source_bounds, Some(Rect::new(0, 0, 1280, 720)));
    }

    #[test]
    fn test_virtual_mode_aware_invalid_halves() {
        // Both target and source halves are 0xFFFF; the low halves point at valid modes.
        let config = DisplayConfig::from_parts(
            QueryFlags::ONLY_ACTIVE_PATHS.with(QueryFlags::VIRTUAL_MODE_AWARE),
            vec![path(0xFFFF_0001, 0xFFFF_0000, Rational::default())],
            vec![target_mode(Rational { numerator: 60, denominator: 1 }), source_mode(0, 0, 640, 480)],
            None,
        );
        let p = &config.paths()[0];
        assert!(config.source_mode(p).is_none());
        assert!(config.target_mode(p).is_none());
        assert_eq!(config.summaries()[0].refresh_rate, 0.0);
    }

    #[test]
    fn test_source_bounds_saturate() {
        let config = DisplayConfig::from_parts(
            QueryFlags::ONLY_ACTIVE_PATHS,
            vec![path(0, DISPLAYCONFIG_PATH_MODE_IDX_INVALID, Rational::default())],
            vec![source_mode(100, -50, u32::MAX, u32::MAX)],
            None,
        );
        assert_eq!(
            config.summaries()[0].source_bounds,
            Some(Rect::new(100, -50, i32::MAX, i32::MAX - 50))
        );
    }

    #[test]
    fn test_target_name_conversion() {
        let mut raw = DisplayConfigTargetDeviceName::default();
        crate::string::copy_to_fixed("DELL U2720Q", &mut raw.monitor_friendly_device_name).unwrap();
        raw.output_technology = 10;
        raw.edid_manufacture_id = 0xAC10;
        let name = TargetDeviceName::from(&raw);
        assert_eq!(name.friendly_name, "DELL U2720Q");
        assert_eq!(name.edid_manufacture_id, None);

        raw.flags = TARGET_NAME_EDID_IDS_VALID;
        assert_eq!(TargetDeviceName::from(&raw).edid_manufacture_id, Some(0xAC10));
    }
}
