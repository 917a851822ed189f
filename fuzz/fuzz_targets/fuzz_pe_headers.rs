//! Fuzz target for PE header decoding with arbitrary bytes.
//!
//! Decoding must return an error rather than panic on any input, and a
//! successful decode must be internally consistent.

#![no_main]

use libfuzzer_sys::fuzz_target;
use win32_surface::pe::{DirectoryEntry, PeHeaders};

fuzz_target!(|data: &[u8]| {
    let Ok(headers) = PeHeaders::parse(data) else {
        return;
    };

    assert_eq!(
        headers.sections.len(),
        usize::from(headers.file_header.number_of_sections)
    );

    // Classification and lookups never panic on decoded headers.
    let _ = headers.kind();
    for (entry, dir) in headers.present_directories() {
        assert!(dir.is_present());
        let _ = headers.rva_to_file_offset(dir.virtual_address);
        let _ = entry.name();
    }

    // A CLR header is only decoded when its directory exists.
    if headers.clr_header.is_some() {
        assert!(headers.data_directory(DirectoryEntry::ClrRuntime).is_present());
    }
});
