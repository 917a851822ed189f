//! Synthetic PE images for tests and benchmarks.
//!
//! Layout of a built image:
//!
//! ```text
//! 0x000  DOS header, e_lfanew = 0x80
//! 0x080  "PE\0\0", COFF file header, optional header (optionally padded), one section header
//! 0x400  .text raw data (RVA 0x1000), CLR header at RVA 0x1008 when managed
//! 0x600  end of file
//! ```

#![allow(dead_code)]

pub const E_LFANEW: usize = 0x80;
pub const TEXT_RVA: u32 = 0x1000;
pub const TEXT_FILE_OFFSET: u32 = 0x400;
pub const CLR_RVA: u32 = 0x1008;
pub const IMAGE_LEN: usize = 0x600;

#[derive(Debug, Clone)]
pub struct ImageBuilder {
    machine: u16,
    characteristics: u16,
    pe32_plus: bool,
    magic: Option<u16>,
    rva_and_sizes: u32,
    directories: [(u32, u32); 16],
    clr_flags: Option<u32>,
    optional_padding: usize,
    optional_size: Option<usize>,
}

impl ImageBuilder {
    /// An x86 DLL with a PE32 optional header.
    pub fn dll32() -> Self {
        Self {
            machine: 0x014C,
            // EXECUTABLE_IMAGE | 32BIT_MACHINE | DLL
            characteristics: 0x2102,
            pe32_plus: false,
            magic: None,
            rva_and_sizes: 16,
            directories: [(0, 0); 16],
            clr_flags: None,
            optional_padding: 0,
            optional_size: None,
        }
    }

    /// An x64 DLL with a PE32+ optional header.
    pub fn dll64() -> Self {
        Self {
            machine: 0x8664,
            // EXECUTABLE_IMAGE | LARGE_ADDRESS_AWARE | DLL
            characteristics: 0x2022,
            pe32_plus: true,
            ..Self::dll32()
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn characteristics(mut self, characteristics: u16) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn magic(mut self, magic: u16) -> Self {
        self.magic = Some(magic);
        self
    }

    pub fn rva_and_sizes(mut self, count: u32) -> Self {
        self.rva_and_sizes = count;
        self
    }

    pub fn directory(mut self, index: usize, rva: u32, size: u32) -> Self {
        self.directories[index] = (rva, size);
        self
    }

    /// Pads the optional header past its directory table with filler bytes.
    pub fn pad_optional_header(mut self, extra: usize) -> Self {
        self.optional_padding = extra;
        self
    }

    /// Declares an explicit `SizeOfOptionalHeader`. Only the directories that
    /// fit in it are written; the section table follows it directly.
    pub fn size_of_optional_header(mut self, size: usize) -> Self {
        self.optional_size = Some(size);
        self
    }

    /// Adds a CLR runtime header (v2.5) with the given `COMIMAGE_FLAGS_*`.
    pub fn managed(mut self, flags: u32) -> Self {
        self.clr_flags = Some(flags);
        self.directories[14] = (CLR_RVA, 72);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; IMAGE_LEN];

        put16(&mut image, 0, 0x5A4D);
        put32(&mut image, 0x3C, E_LFANEW as u32);

        let table_offset: usize = if self.pe32_plus { 112 } else { 96 };
        let optional_size = self
            .optional_size
            .unwrap_or(table_offset + 16 * 8 + self.optional_padding);
        let written = (optional_size.saturating_sub(table_offset) / 8).min(16);

        let mut at = E_LFANEW;
        image[at..at + 4].copy_from_slice(b"PE\0\0");
        at += 4;

        put16(&mut image, at, self.machine);
        put16(&mut image, at + 2, 1);
        put32(&mut image, at + 4, 0x5F00_0000);
        put16(&mut image, at + 16, optional_size as u16);
        put16(&mut image, at + 18, self.characteristics);
        at += 20;

        let opt = at;
        let default_magic = if self.pe32_plus { 0x020B } else { 0x010B };
        put16(&mut image, opt, self.magic.unwrap_or(default_magic));
        image[opt + 2] = 14;
        put32(&mut image, opt + 16, 0x1010);
        put32(&mut image, opt + 20, TEXT_RVA);
        if self.pe32_plus {
            put64(&mut image, opt + 24, 0x1_8000_0000);
        } else {
            put32(&mut image, opt + 28, 0x1000_0000);
        }
        put32(&mut image, opt + 32, 0x1000);
        put32(&mut image, opt + 36, 0x200);
        put32(&mut image, opt + 56, 0x2000);
        put32(&mut image, opt + 60, 0x400);
        put16(&mut image, opt + 68, 2);
        // DYNAMIC_BASE | NX_COMPAT | HIGH_ENTROPY_VA
        put16(&mut image, opt + 70, 0x0160);
        put32(&mut image, opt + table_offset - 4, self.rva_and_sizes);
        for (i, (rva, size)) in self.directories.iter().enumerate().take(written) {
            put32(&mut image, opt + table_offset + i * 8, *rva);
            put32(&mut image, opt + table_offset + i * 8 + 4, *size);
        }
        let table_end = opt + table_offset + written * 8;
        for byte in &mut image[table_end..opt + optional_size] {
            *byte = 0xEE;
        }
        at = opt + optional_size;

        image[at..at + 5].copy_from_slice(b".text");
        put32(&mut image, at + 8, 0x1000);
        put32(&mut image, at + 12, TEXT_RVA);
        put32(&mut image, at + 16, 0x200);
        put32(&mut image, at + 20, TEXT_FILE_OFFSET);
        put32(&mut image, at + 36, 0x6000_0020);

        if let Some(flags) = self.clr_flags {
            let clr = (TEXT_FILE_OFFSET + (CLR_RVA - TEXT_RVA)) as usize;
            put32(&mut image, clr, 72);
            put16(&mut image, clr + 4, 2);
            put16(&mut image, clr + 6, 5);
            put32(&mut image, clr + 8, 0x1050);
            put32(&mut image, clr + 12, 0x100);
            put32(&mut image, clr + 16, flags);
        }

        image
    }
}

fn put16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
