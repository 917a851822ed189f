//! PE/COFF header decoding.
//!
//! Reads just enough of a Portable Executable to answer the questions a host
//! asks before loading a DLL: which machine it targets, whether it is a PE32
//! or PE32+ image, what its data directories contain and whether it carries a
//! CLR runtime header (i.e. is a managed assembly).
//!
//! The decode is a single forward pass over fixed-layout headers:
//!
//! 1. `e_lfanew` at offset `0x3C` of the DOS header locates the PE header;
//! 2. the `PE\0\0` signature is validated;
//! 3. the 20-byte COFF file header is read field by field;
//! 4. the optional-header magic selects the PE32 or PE32+ layout;
//! 5. the data directory table (up to 16 RVA/size pairs) and the section
//!    table are read.
//!
//! This module has no Windows dependency and works on any host.
//!
//! # Example
//!
//! ```no_run
//! use win32_surface::pe::{self, ImageKind};
//!
//! let headers = pe::PeHeaders::from_file(r"C:\Windows\System32\kernel32.dll")?;
//! println!("machine: {}", headers.file_header.machine());
//! assert!(!headers.is_managed());
//!
//! match pe::classify(r"plugin.dll")? {
//!     ImageKind::Native64 | ImageKind::Managed64 | ImageKind::ManagedAnyCpu => {}
//!     other => println!("cannot load {other} into a 64-bit host"),
//! }
//! # Ok::<(), win32_surface::error::Error>(())
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// `MZ`.
pub const DOS_SIGNATURE: u16 = 0x5A4D;
/// `PE\0\0`.
pub const PE_SIGNATURE: u32 = 0x0000_4550;
/// Offset of `e_lfanew` in the DOS header.
pub const PE_POINTER_OFFSET: u64 = 0x3C;
/// Optional header magic of a PE32 image.
pub const PE32_MAGIC: u16 = 0x010B;
/// Optional header magic of a PE32+ image.
pub const PE32_PLUS_MAGIC: u16 = 0x020B;
/// Number of entries in a full data directory table.
pub const NUMBER_OF_DIRECTORY_ENTRIES: usize = 16;

const FILE_HEADER_SIZE: u64 = 20;
const SECTION_HEADER_SIZE: u64 = 40;

/// The two DOS header fields the decoder needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DosHeader {
    /// `MZ` at offset 0.
    pub e_magic: u16,
    /// File offset of the PE signature, stored at `0x3C`.
    pub e_lfanew: u32,
}

impl DosHeader {
    fn read<R: Read + Seek>(fields: &mut FieldReader<'_, R>) -> Result<Self> {
        fields.seek_to(0)?;
        let e_magic = fields.read_u16()?;
        if e_magic != DOS_SIGNATURE {
            return Err(Error::InvalidDosSignature(e_magic));
        }
        fields.seek_to(PE_POINTER_OFFSET)?;
        let e_lfanew = fields.read_u32()?;
        Ok(Self { e_magic, e_lfanew })
    }
}

/// Target machine of an image (`IMAGE_FILE_MACHINE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Machine {
    /// Applicable to any machine type.
    Unknown,
    /// Intel 386 and compatibles.
    I386,
    /// MIPS little endian.
    R4000,
    /// ARM little endian.
    Arm,
    /// ARM Thumb-2 little endian.
    ArmNt,
    /// Intel Itanium.
    Ia64,
    /// x64.
    Amd64,
    /// ARM64 little endian.
    Arm64,
    /// ARM64EC, x64-compatible ARM64 code.
    Arm64Ec,
    /// Any other machine value.
    Other(u16),
}

impl Machine {
    /// Maps a raw `Machine` field value.
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0x0000 => Machine::Unknown,
            0x014C => Machine::I386,
            0x0166 => Machine::R4000,
            0x01C0 => Machine::Arm,
            0x01C4 => Machine::ArmNt,
            0x0200 => Machine::Ia64,
            0x8664 => Machine::Amd64,
            0xAA64 => Machine::Arm64,
            0xA641 => Machine::Arm64Ec,
            other => Machine::Other(other),
        }
    }

    /// The raw field value.
    pub const fn raw(self) -> u16 {
        match self {
            Machine::Unknown => 0x0000,
            Machine::I386 => 0x014C,
            Machine::R4000 => 0x0166,
            Machine::Arm => 0x01C0,
            Machine::ArmNt => 0x01C4,
            Machine::Ia64 => 0x0200,
            Machine::Amd64 => 0x8664,
            Machine::Arm64 => 0xAA64,
            Machine::Arm64Ec => 0xA641,
            Machine::Other(raw) => raw,
        }
    }

    /// True for 64-bit architectures.
    pub const fn is_64bit(self) -> bool {
        matches!(
            self,
            Machine::Amd64 | Machine::Arm64 | Machine::Arm64Ec | Machine::Ia64
        )
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Machine::Unknown => f.write_str("unknown"),
            Machine::I386 => f.write_str("x86"),
            Machine::R4000 => f.write_str("mips"),
            Machine::Arm => f.write_str("arm"),
            Machine::ArmNt => f.write_str("armnt"),
            Machine::Ia64 => f.write_str("ia64"),
            Machine::Amd64 => f.write_str("x64"),
            Machine::Arm64 => f.write_str("arm64"),
            Machine::Arm64Ec => f.write_str("arm64ec"),
            Machine::Other(raw) => write!(f, "{raw:#06x}"),
        }
    }
}

/// COFF file header characteristics (`IMAGE_FILE_*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Characteristics(pub u16);

impl Characteristics {
    /// Relocation information was stripped.
    pub const RELOCS_STRIPPED: Self = Self(0x0001);
    /// The image is valid and can be run.
    pub const EXECUTABLE_IMAGE: Self = Self(0x0002);
    /// The application can handle addresses above 2 GB.
    pub const LARGE_ADDRESS_AWARE: Self = Self(0x0020);
    /// The machine is based on a 32-bit-word architecture.
    pub const MACHINE_32BIT: Self = Self(0x0100);
    /// Debugging information was removed.
    pub const DEBUG_STRIPPED: Self = Self(0x0200);
    /// Copy to swap if run from removable media.
    pub const REMOVABLE_RUN_FROM_SWAP: Self = Self(0x0400);
    /// Copy to swap if run from the network.
    pub const NET_RUN_FROM_SWAP: Self = Self(0x0800);
    /// The image is a system file.
    pub const SYSTEM: Self = Self(0x1000);
    /// The image is a DLL.
    pub const DLL: Self = Self(0x2000);
    /// Run only on a uniprocessor machine.
    pub const UP_SYSTEM_ONLY: Self = Self(0x4000);

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Combines two flag sets.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Optional header `DllCharacteristics` (`IMAGE_DLLCHARACTERISTICS_*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DllCharacteristics(pub u16);

impl DllCharacteristics {
    /// Can handle a high-entropy 64-bit address space.
    pub const HIGH_ENTROPY_VA: Self = Self(0x0020);
    /// Can be relocated at load time (ASLR).
    pub const DYNAMIC_BASE: Self = Self(0x0040);
    /// Code integrity checks are enforced.
    pub const FORCE_INTEGRITY: Self = Self(0x0080);
    /// Compatible with data execution prevention.
    pub const NX_COMPAT: Self = Self(0x0100);
    /// Isolation aware, but do not isolate.
    pub const NO_ISOLATION: Self = Self(0x0200);
    /// Does not use structured exception handling.
    pub const NO_SEH: Self = Self(0x0400);
    /// Do not bind the image.
    pub const NO_BIND: Self = Self(0x0800);
    /// Must execute in an AppContainer.
    pub const APPCONTAINER: Self = Self(0x1000);
    /// A WDM driver.
    pub const WDM_DRIVER: Self = Self(0x2000);
    /// Supports Control Flow Guard.
    pub const GUARD_CF: Self = Self(0x4000);
    /// Terminal Server aware.
    pub const TERMINAL_SERVER_AWARE: Self = Self(0x8000);

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// CLR runtime header flags (`COMIMAGE_FLAGS_*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClrFlags(pub u32);

impl ClrFlags {
    /// The image contains only IL code.
    pub const IL_ONLY: Self = Self(0x0000_0001);
    /// The image can only be loaded into a 32-bit process.
    pub const REQUIRES_32BIT: Self = Self(0x0000_0002);
    /// The image is an IL library.
    pub const IL_LIBRARY: Self = Self(0x0000_0004);
    /// The image has a strong-name signature.
    pub const STRONG_NAME_SIGNED: Self = Self(0x0000_0008);
    /// The entry point is native code.
    pub const NATIVE_ENTRYPOINT: Self = Self(0x0000_0010);
    /// Debug data is tracked.
    pub const TRACK_DEBUG_DATA: Self = Self(0x0001_0000);
    /// The image prefers to run in a 32-bit process.
    pub const PREFERS_32BIT: Self = Self(0x0002_0000);

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// The COFF file header, in on-disk field order (`IMAGE_FILE_HEADER`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileHeader {
    /// Raw target machine value; see [`FileHeader::machine`].
    pub machine: u16,
    /// Number of entries in the section table.
    pub number_of_sections: u16,
    /// Link time, seconds since the Unix epoch.
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table, zero for images.
    pub pointer_to_symbol_table: u32,
    /// Number of COFF symbol table entries.
    pub number_of_symbols: u32,
    /// Size of the optional header that follows.
    pub size_of_optional_header: u16,
    /// Raw characteristics; see [`FileHeader::characteristics`].
    pub characteristics: u16,
}

impl FileHeader {
    /// The target machine.
    pub const fn machine(&self) -> Machine {
        Machine::from_raw(self.machine)
    }

    /// The characteristic flags.
    pub const fn characteristics(&self) -> Characteristics {
        Characteristics(self.characteristics)
    }
}

/// Optional header layout, selected by its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalHeaderKind {
    /// 32-bit layout (magic `0x10B`).
    Pe32,
    /// 64-bit layout (magic `0x20B`).
    Pe32Plus,
}

impl OptionalHeaderKind {
    /// Maps an optional header magic, or `None` for ROM and unknown images.
    pub const fn from_magic(magic: u16) -> Option<Self> {
        match magic {
            PE32_MAGIC => Some(OptionalHeaderKind::Pe32),
            PE32_PLUS_MAGIC => Some(OptionalHeaderKind::Pe32Plus),
            _ => None,
        }
    }

    /// Offset of the data directory table from the start of the optional header.
    pub const fn data_directory_offset(self) -> u64 {
        match self {
            OptionalHeaderKind::Pe32 => 96,
            OptionalHeaderKind::Pe32Plus => 112,
        }
    }
}

impl fmt::Display for OptionalHeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionalHeaderKind::Pe32 => f.write_str("PE32"),
            OptionalHeaderKind::Pe32Plus => f.write_str("PE32+"),
        }
    }
}

/// One RVA/size pair of the data directory table (`IMAGE_DATA_DIRECTORY`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    /// Relative virtual address of the table.
    pub virtual_address: u32,
    /// Size of the table in bytes.
    pub size: u32,
}

impl DataDirectory {
    /// True when the directory points somewhere.
    pub const fn is_present(&self) -> bool {
        self.virtual_address != 0
    }
}

/// Well-known data directory indices (`IMAGE_DIRECTORY_ENTRY_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum DirectoryEntry {
    /// Export table.
    Export = 0,
    /// Import table.
    Import = 1,
    /// Resource table.
    Resource = 2,
    /// Exception table.
    Exception = 3,
    /// Attribute certificate table.
    Security = 4,
    /// Base relocation table.
    BaseReloc = 5,
    /// Debug data.
    Debug = 6,
    /// Architecture, reserved.
    Architecture = 7,
    /// Global pointer register value.
    GlobalPtr = 8,
    /// Thread local storage table.
    Tls = 9,
    /// Load configuration table.
    LoadConfig = 10,
    /// Bound import table.
    BoundImport = 11,
    /// Import address table.
    Iat = 12,
    /// Delay import descriptor.
    DelayImport = 13,
    /// CLR runtime header.
    ClrRuntime = 14,
    /// Reserved, must be zero.
    Reserved = 15,
}

impl DirectoryEntry {
    /// All entries in table order.
    pub const ALL: [DirectoryEntry; NUMBER_OF_DIRECTORY_ENTRIES] = [
        DirectoryEntry::Export,
        DirectoryEntry::Import,
        DirectoryEntry::Resource,
        DirectoryEntry::Exception,
        DirectoryEntry::Security,
        DirectoryEntry::BaseReloc,
        DirectoryEntry::Debug,
        DirectoryEntry::Architecture,
        DirectoryEntry::GlobalPtr,
        DirectoryEntry::Tls,
        DirectoryEntry::LoadConfig,
        DirectoryEntry::BoundImport,
        DirectoryEntry::Iat,
        DirectoryEntry::DelayImport,
        DirectoryEntry::ClrRuntime,
        DirectoryEntry::Reserved,
    ];

    /// Short display name.
    pub const fn name(self) -> &'static str {
        match self {
            DirectoryEntry::Export => "export",
            DirectoryEntry::Import => "import",
            DirectoryEntry::Resource => "resource",
            DirectoryEntry::Exception => "exception",
            DirectoryEntry::Security => "security",
            DirectoryEntry::BaseReloc => "basereloc",
            DirectoryEntry::Debug => "debug",
            DirectoryEntry::Architecture => "architecture",
            DirectoryEntry::GlobalPtr => "globalptr",
            DirectoryEntry::Tls => "tls",
            DirectoryEntry::LoadConfig => "loadconfig",
            DirectoryEntry::BoundImport => "boundimport",
            DirectoryEntry::Iat => "iat",
            DirectoryEntry::DelayImport => "delayimport",
            DirectoryEntry::ClrRuntime => "clr",
            DirectoryEntry::Reserved => "reserved",
        }
    }
}

/// A section table entry (`IMAGE_SECTION_HEADER`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionHeader {
    /// Null-padded UTF-8 name.
    pub name: [u8; 8],
    /// Size of the section when loaded.
    pub virtual_size: u32,
    /// RVA of the section when loaded.
    pub virtual_address: u32,
    /// Size of the initialized data on disk.
    pub size_of_raw_data: u32,
    /// File offset of the section data.
    pub pointer_to_raw_data: u32,
    /// File offset of relocation entries, zero for images.
    pub pointer_to_relocations: u32,
    /// Deprecated COFF line numbers.
    pub pointer_to_linenumbers: u32,
    /// Number of relocation entries.
    pub number_of_relocations: u16,
    /// Number of line number entries.
    pub number_of_linenumbers: u16,
    /// Section flags (`IMAGE_SCN_*`).
    pub characteristics: u32,
}

impl SectionHeader {
    /// The section name with trailing padding removed.
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// True when `rva` falls inside the loaded section.
    pub fn contains_rva(&self, rva: u32) -> bool {
        let start = u64::from(self.virtual_address);
        let extent = u64::from(self.virtual_size.max(self.size_of_raw_data));
        let rva = u64::from(rva);
        rva >= start && rva < start + extent
    }
}

/// The parts of the CLR runtime header (`IMAGE_COR20_HEADER`) needed for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClrHeader {
    /// Minimum runtime major version.
    pub major_runtime_version: u16,
    /// Minimum runtime minor version.
    pub minor_runtime_version: u16,
    /// Image flags.
    pub flags: ClrFlags,
}

/// How an image can be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Native 32-bit code.
    Native32,
    /// Native 64-bit code.
    Native64,
    /// IL-only assembly that loads into either bitness.
    ManagedAnyCpu,
    /// Managed image bound to a 32-bit process.
    Managed32,
    /// Managed image bound to a 64-bit process.
    Managed64,
}

impl ImageKind {
    /// True for the managed kinds.
    pub const fn is_managed(self) -> bool {
        matches!(
            self,
            ImageKind::ManagedAnyCpu | ImageKind::Managed32 | ImageKind::Managed64
        )
    }

    /// True when a 64-bit process can load the image.
    pub const fn loads_in_64bit_process(self) -> bool {
        matches!(
            self,
            ImageKind::Native64 | ImageKind::Managed64 | ImageKind::ManagedAnyCpu
        )
    }

    /// True when a 32-bit process can load the image.
    pub const fn loads_in_32bit_process(self) -> bool {
        matches!(
            self,
            ImageKind::Native32 | ImageKind::Managed32 | ImageKind::ManagedAnyCpu
        )
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageKind::Native32 => "native 32-bit",
            ImageKind::Native64 => "native 64-bit",
            ImageKind::ManagedAnyCpu => "managed AnyCPU",
            ImageKind::Managed32 => "managed 32-bit",
            ImageKind::Managed64 => "managed 64-bit",
        })
    }
}

/// Decoded PE headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeHeaders {
    /// File offset of the `PE\0\0` signature (`e_lfanew`).
    pub pe_offset: u32,
    /// The COFF file header.
    pub file_header: FileHeader,
    /// PE32 or PE32+.
    pub optional_kind: OptionalHeaderKind,
    /// RVA of the entry point, zero if none.
    pub entry_point: u32,
    /// Preferred load address.
    pub image_base: u64,
    /// Raw `Subsystem` value (2 = GUI, 3 = console, ...).
    pub subsystem: u16,
    /// `DllCharacteristics` flags.
    pub dll_characteristics: DllCharacteristics,
    /// `NumberOfRvaAndSizes` as stored, which may exceed the table size.
    pub number_of_rva_and_sizes: u32,
    /// The data directory table; entries past `NumberOfRvaAndSizes` are zero.
    pub data_directories: [DataDirectory; NUMBER_OF_DIRECTORY_ENTRIES],
    /// The section table.
    pub sections: Vec<SectionHeader>,
    /// The CLR runtime header, when present and mapped by a section.
    pub clr_header: Option<ClrHeader>,
}

impl PeHeaders {
    /// Decodes the headers from a seekable reader.
    ///
    /// Offsets are absolute: the reader is rewound to 0 first.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut fields = FieldReader::new(reader);
        let (pe_offset, file_header) = read_file_header(&mut fields)?;

        let optional_start = fields.position();
        let magic = fields.read_u16()?;
        let optional_kind = OptionalHeaderKind::from_magic(magic)
            .ok_or(Error::UnsupportedOptionalHeader(magic))?;
        debug!(%optional_kind, machine = %file_header.machine(), "decoding optional header");

        // Linker versions and code/data sizes.
        fields.skip(14)?;
        let entry_point = fields.read_u32()?;
        // BaseOfCode, plus BaseOfData in PE32.
        let image_base = match optional_kind {
            OptionalHeaderKind::Pe32 => {
                fields.skip(8)?;
                u64::from(fields.read_u32()?)
            }
            OptionalHeaderKind::Pe32Plus => {
                fields.skip(4)?;
                fields.read_u64()?
            }
        };

        // Alignment, versions, image sizes and checksum.
        fields.seek_to(optional_start + 68)?;
        let subsystem = fields.read_u16()?;
        let dll_characteristics = DllCharacteristics(fields.read_u16()?);

        // Stack/heap sizes and loader flags.
        fields.seek_to(optional_start + optional_kind.data_directory_offset() - 4)?;
        let number_of_rva_and_sizes = fields.read_u32()?;

        let mut data_directories = [DataDirectory::default(); NUMBER_OF_DIRECTORY_ENTRIES];
        let count = (number_of_rva_and_sizes as usize).min(NUMBER_OF_DIRECTORY_ENTRIES);
        for dir in data_directories.iter_mut().take(count) {
            dir.virtual_address = fields.read_u32()?;
            dir.size = fields.read_u32()?;
        }

        fields.seek_to(optional_start + u64::from(file_header.size_of_optional_header))?;
        let sections = read_sections(&mut fields, file_header.number_of_sections)?;

        let mut headers = PeHeaders {
            pe_offset,
            file_header,
            optional_kind,
            entry_point,
            image_base,
            subsystem,
            dll_characteristics,
            number_of_rva_and_sizes,
            data_directories,
            sections,
            clr_header: None,
        };

        let clr = headers.data_directory(DirectoryEntry::ClrRuntime);
        if clr.is_present() {
            headers.clr_header = match headers.rva_to_file_offset(clr.virtual_address) {
                Some(offset) => Some(read_clr_header(&mut fields, offset)?),
                None => {
                    debug!(rva = clr.virtual_address, "CLR header is not mapped by any section");
                    None
                }
            };
        }

        Ok(headers)
    }

    /// Decodes the headers from an in-memory image.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(bytes))
    }

    /// Decodes the headers of the file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading PE headers");
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    /// Returns a data directory entry.
    pub fn data_directory(&self, entry: DirectoryEntry) -> DataDirectory {
        self.data_directories[entry as usize]
    }

    /// Iterates over the directories that point somewhere.
    pub fn present_directories(&self) -> impl Iterator<Item = (DirectoryEntry, DataDirectory)> + '_ {
        DirectoryEntry::ALL
            .iter()
            .map(move |&entry| (entry, self.data_directory(entry)))
            .filter(|(_, dir)| dir.is_present())
    }

    /// Maps an RVA to a file offset through the section table.
    pub fn rva_to_file_offset(&self, rva: u32) -> Option<u64> {
        self.sections
            .iter()
            .find(|section| section.contains_rva(rva))
            .map(|section| {
                u64::from(rva - section.virtual_address) + u64::from(section.pointer_to_raw_data)
            })
    }

    /// True if the image is a DLL.
    pub fn is_dll(&self) -> bool {
        self.file_header
            .characteristics()
            .contains(Characteristics::DLL)
    }

    /// True if the image uses the PE32+ layout.
    pub fn is_64bit(&self) -> bool {
        self.optional_kind == OptionalHeaderKind::Pe32Plus
    }

    /// True if the image carries a CLR runtime header directory.
    pub fn is_managed(&self) -> bool {
        self.data_directory(DirectoryEntry::ClrRuntime).is_present()
    }

    /// True if the image can use addresses above 2 GB.
    pub fn is_large_address_aware(&self) -> bool {
        self.is_64bit()
            || self
                .file_header
                .characteristics()
                .contains(Characteristics::LARGE_ADDRESS_AWARE)
    }

    /// Classifies the image by bitness and runtime.
    pub fn kind(&self) -> ImageKind {
        if !self.is_managed() {
            return if self.is_64bit() {
                ImageKind::Native64
            } else {
                ImageKind::Native32
            };
        }

        if self.is_64bit() {
            return ImageKind::Managed64;
        }

        let Some(clr) = self.clr_header else {
            return ImageKind::ManagedAnyCpu;
        };
        let flags = clr.flags;
        let bound_to_32bit = flags.contains(ClrFlags::REQUIRES_32BIT)
            || !flags.contains(ClrFlags::IL_ONLY)
            || (flags.contains(ClrFlags::PREFERS_32BIT) && !self.is_dll());
        if bound_to_32bit {
            ImageKind::Managed32
        } else {
            ImageKind::ManagedAnyCpu
        }
    }
}

/// Reads only as far as the COFF file header and returns the target machine.
pub fn dll_machine_type(path: impl AsRef<Path>) -> Result<Machine> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut fields = FieldReader::new(&mut reader);
    let (_, header) = read_file_header(&mut fields)?;
    Ok(header.machine())
}

/// Decodes the headers of `path` and classifies the image.
pub fn classify(path: impl AsRef<Path>) -> Result<ImageKind> {
    Ok(PeHeaders::from_file(path)?.kind())
}

fn read_file_header<R: Read + Seek>(fields: &mut FieldReader<'_, R>) -> Result<(u32, FileHeader)> {
    let pe_offset = DosHeader::read(fields)?.e_lfanew;

    fields.seek_to(u64::from(pe_offset))?;
    let signature = fields.read_u32()?;
    if signature != PE_SIGNATURE {
        return Err(Error::InvalidPeSignature {
            offset: pe_offset,
            found: signature,
        });
    }

    let header = FileHeader {
        machine: fields.read_u16()?,
        number_of_sections: fields.read_u16()?,
        time_date_stamp: fields.read_u32()?,
        pointer_to_symbol_table: fields.read_u32()?,
        number_of_symbols: fields.read_u32()?,
        size_of_optional_header: fields.read_u16()?,
        characteristics: fields.read_u16()?,
    };
    trace!(?header, pe_offset, "file header");
    debug_assert_eq!(fields.position(), u64::from(pe_offset) + 4 + FILE_HEADER_SIZE);

    Ok((pe_offset, header))
}

fn read_sections<R: Read + Seek>(
    fields: &mut FieldReader<'_, R>,
    count: u16,
) -> Result<Vec<SectionHeader>> {
    // A header can claim far more sections than the file holds; cap the
    // up-front allocation and let a short read end the decode.
    let mut sections = Vec::with_capacity(usize::from(count.min(96)));
    for _ in 0..count {
        let start = fields.position();
        let section = SectionHeader {
            name: fields.read_array()?,
            virtual_size: fields.read_u32()?,
            virtual_address: fields.read_u32()?,
            size_of_raw_data: fields.read_u32()?,
            pointer_to_raw_data: fields.read_u32()?,
            pointer_to_relocations: fields.read_u32()?,
            pointer_to_linenumbers: fields.read_u32()?,
            number_of_relocations: fields.read_u16()?,
            number_of_linenumbers: fields.read_u16()?,
            characteristics: fields.read_u32()?,
        };
        debug_assert_eq!(fields.position() - start, SECTION_HEADER_SIZE);
        sections.push(section);
    }
    Ok(sections)
}

fn read_clr_header<R: Read + Seek>(fields: &mut FieldReader<'_, R>, offset: u64) -> Result<ClrHeader> {
    fields.seek_to(offset)?;
    let _cb = fields.read_u32()?;
    let major_runtime_version = fields.read_u16()?;
    let minor_runtime_version = fields.read_u16()?;
    // MetaData directory.
    fields.skip(8)?;
    let flags = ClrFlags(fields.read_u32()?);
    Ok(ClrHeader {
        major_runtime_version,
        minor_runtime_version,
        flags,
    })
}

/// Little-endian field reader that tracks its absolute offset and reports
/// short reads as [`Error::Truncated`].
struct FieldReader<'a, R> {
    inner: &'a mut R,
    offset: u64,
}

impl<'a, R: Read + Seek> FieldReader<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self { inner, offset: 0 }
    }

    fn position(&self) -> u64 {
        self.offset
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        self.seek_to(self.offset + count)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => {
                self.offset += N as u64;
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::Truncated {
                offset: self.offset,
                needed: N,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }
}

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod fixture;

#[cfg(test)]
mod tests {
    use super::fixture::{ImageBuilder, TEXT_RVA};
    use super::*;

    #[test]
    fn test_header_layouts_match_the_format() {
        assert_eq!(std::mem::size_of::<FileHeader>(), 20);
        assert_eq!(std::mem::size_of::<DataDirectory>(), 8);
        assert_eq!(std::mem::size_of::<SectionHeader>(), 40);
    }

    #[test]
    fn test_native_32bit_dll() {
        let headers = PeHeaders::parse(&ImageBuilder::dll32().build()).unwrap();
        assert_eq!(headers.file_header.machine(), Machine::I386);
        assert_eq!(headers.optional_kind, OptionalHeaderKind::Pe32);
        assert_eq!(headers.image_base, 0x1000_0000);
        assert_eq!(headers.entry_point, 0x1010);
        assert!(headers.is_dll());
        assert!(!headers.is_managed());
        assert_eq!(headers.kind(), ImageKind::Native32);
        assert_eq!(headers.sections.len(), 1);
        assert_eq!(headers.sections[0].name(), ".text");
    }

    #[test]
    fn test_native_64bit_dll() {
        let headers = PeHeaders::parse(&ImageBuilder::dll64().build()).unwrap();
        assert_eq!(headers.file_header.machine(), Machine::Amd64);
        assert_eq!(headers.optional_kind, OptionalHeaderKind::Pe32Plus);
        assert_eq!(headers.image_base, 0x1_8000_0000);
        assert!(headers.is_large_address_aware());
        assert_eq!(headers.kind(), ImageKind::Native64);
    }

    #[test]
    fn test_data_directories_are_read_in_order() {
        let bytes = ImageBuilder::dll64()
            .directory(DirectoryEntry::Export as usize, 0x2000, 0x80)
            .directory(DirectoryEntry::Import as usize, 0x2100, 0x28)
            .build();
        let headers = PeHeaders::parse(&bytes).unwrap();

        let export = headers.data_directory(DirectoryEntry::Export);
        assert_eq!(export, DataDirectory { virtual_address: 0x2000, size: 0x80 });
        let present: Vec<_> = headers.present_directories().map(|(e, _)| e).collect();
        assert_eq!(present, vec![DirectoryEntry::Export, DirectoryEntry::Import]);
    }

    #[test]
    fn test_short_directory_table_leaves_rest_zero() {
        let bytes = ImageBuilder::dll32()
            .directory(DirectoryEntry::Export as usize, 0x2000, 0x80)
            .directory(DirectoryEntry::Tls as usize, 0x3000, 0x18)
            .rva_and_sizes(2)
            .build();
        let headers = PeHeaders::parse(&bytes).unwrap();
        assert_eq!(headers.number_of_rva_and_sizes, 2);
        assert!(headers.data_directory(DirectoryEntry::Export).is_present());
        assert!(!headers.data_directory(DirectoryEntry::Tls).is_present());
    }

    #[test]
    fn test_section_table_follows_padded_optional_header() {
        for builder in [ImageBuilder::dll32(), ImageBuilder::dll64()] {
            let bytes = builder
                .managed(ClrFlags::IL_ONLY.0)
                .pad_optional_header(0x10)
                .build();
            let headers = PeHeaders::parse(&bytes).unwrap();
            assert_eq!(headers.sections.len(), 1);
            assert_eq!(headers.sections[0].name(), ".text");
            assert_eq!(headers.rva_to_file_offset(TEXT_RVA + 8), Some(0x408));
            assert!(headers.clr_header.is_some());
        }
    }

    #[test]
    fn test_section_table_follows_short_optional_header() {
        let bytes = ImageBuilder::dll32()
            .directory(DirectoryEntry::Export as usize, 0x2000, 0x80)
            .rva_and_sizes(2)
            .size_of_optional_header(96 + 2 * 8)
            .build();
        let headers = PeHeaders::parse(&bytes).unwrap();
        assert_eq!(headers.file_header.size_of_optional_header, 96 + 16);
        assert!(headers.data_directory(DirectoryEntry::Export).is_present());
        assert_eq!(headers.sections.len(), 1);
        assert_eq!(headers.sections[0].name(), ".text");
        assert_eq!(headers.rva_to_file_offset(TEXT_RVA + 8), Some(0x408));
    }

    #[test]
    fn test_managed_anycpu() {
        let bytes = ImageBuilder::dll32()
            .managed(ClrFlags::IL_ONLY.0)
            .build();
        let headers = PeHeaders::parse(&bytes).unwrap();
        let clr = headers.clr_header.unwrap();
        assert_eq!(clr.major_runtime_version, 2);
        assert_eq!(clr.minor_runtime_version, 5);
        assert_eq!(headers.kind(), ImageKind::ManagedAnyCpu);
        assert!(headers.kind().loads_in_64bit_process());
    }

    #[test]
    fn test_managed_32bit_required() {
        let bytes = ImageBuilder::dll32()
            .managed(ClrFlags::IL_ONLY.0 | ClrFlags::REQUIRES_32BIT.0)
            .build();
        let kind = PeHeaders::parse(&bytes).unwrap().kind();
        assert_eq!(kind, ImageKind::Managed32);
        assert!(!kind.loads_in_64bit_process());
    }

    #[test]
    fn test_mixed_mode_pe32_is_32bit() {
        let bytes = ImageBuilder::dll32().managed(0).build();
        assert_eq!(PeHeaders::parse(&bytes).unwrap().kind(), ImageKind::Managed32);
    }

    #[test]
    fn test_prefers_32bit_only_binds_executables() {
        let flags = ClrFlags::IL_ONLY.0 | ClrFlags::PREFERS_32BIT.0;
        let dll = ImageBuilder::dll32().managed(flags).build();
        assert_eq!(PeHeaders::parse(&dll).unwrap().kind(), ImageKind::ManagedAnyCpu);

        let exe = ImageBuilder::dll32().characteristics(0x0102).managed(flags).build();
        assert_eq!(PeHeaders::parse(&exe).unwrap().kind(), ImageKind::Managed32);
    }

    #[test]
    fn test_managed_64bit() {
        let bytes = ImageBuilder::dll64().managed(ClrFlags::IL_ONLY.0).build();
        assert_eq!(PeHeaders::parse(&bytes).unwrap().kind(), ImageKind::Managed64);
    }

    #[test]
    fn test_unmapped_clr_directory_is_still_managed() {
        let bytes = ImageBuilder::dll32()
            .directory(DirectoryEntry::ClrRuntime as usize, 0x9000_0000, 72)
            .build();
        let headers = PeHeaders::parse(&bytes).unwrap();
        assert!(headers.is_managed());
        assert_eq!(headers.clr_header, None);
        assert_eq!(headers.kind(), ImageKind::ManagedAnyCpu);
    }

    #[test]
    fn test_rejects_missing_mz() {
        let mut bytes = ImageBuilder::dll32().build();
        bytes[0] = b'Z';
        assert!(matches!(
            PeHeaders::parse(&bytes),
            Err(Error::InvalidDosSignature(0x5A5A))
        ));
    }

    #[test]
    fn test_rejects_bad_pe_signature() {
        let mut bytes = ImageBuilder::dll32().build();
        bytes[0x80] = b'N';
        bytes[0x81] = b'E';
        match PeHeaders::parse(&bytes) {
            Err(Error::InvalidPeSignature { offset, found }) => {
                assert_eq!(offset, 0x80);
                assert_eq!(found, 0x0000_454E);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_rom_image() {
        let bytes = ImageBuilder::dll32().magic(0x0107).build();
        assert!(matches!(
            PeHeaders::parse(&bytes),
            Err(Error::UnsupportedOptionalHeader(0x0107))
        ));
    }

    #[test]
    fn test_truncated_inputs() {
        assert!(matches!(
            PeHeaders::parse(&[0x4D]),
            Err(Error::Truncated { offset: 0, needed: 2 })
        ));

        let bytes = ImageBuilder::dll32().build();
        // Cut inside the COFF header.
        assert!(matches!(
            PeHeaders::parse(&bytes[..0x90]),
            Err(Error::Truncated { .. })
        ));
        // Cut inside the section table.
        assert!(matches!(
            PeHeaders::parse(&bytes[..0x190]),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_e_lfanew_past_end() {
        let mut bytes = ImageBuilder::dll32().build();
        bytes[0x3C..0x40].copy_from_slice(&0x7FFF_FFF0u32.to_le_bytes());
        assert!(matches!(
            PeHeaders::parse(&bytes),
            Err(Error::Truncated { offset: 0x7FFF_FFF0, needed: 4 })
        ));
    }

    #[test]
    fn test_rva_to_file_offset() {
        let headers = PeHeaders::parse(&ImageBuilder::dll32().build()).unwrap();
        assert_eq!(headers.rva_to_file_offset(0x1008), Some(0x408));
        assert_eq!(headers.rva_to_file_offset(0x0FFF), None);
        assert_eq!(headers.rva_to_file_offset(0x2000), None);
    }

    #[test]
    fn test_machine_raw_is_lossless() {
        for raw in [0x0000, 0x014C, 0x8664, 0xAA64, 0xA641, 0x1234] {
            assert_eq!(Machine::from_raw(raw).raw(), raw);
        }
        assert!(Machine::Arm64.is_64bit());
        assert!(!Machine::ArmNt.is_64bit());
        assert_eq!(Machine::Other(0x1234).to_string(), "0x1234");
    }
}
