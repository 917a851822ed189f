//! Header decoding of images written to disk.

mod common;

use std::fs;
use std::path::PathBuf;

use common::ImageBuilder;
use win32_surface::error::Error;
use win32_surface::pe::{classify, dll_machine_type, ImageKind, Machine, OptionalHeaderKind, PeHeaders};

struct TempImage(PathBuf);

impl TempImage {
    fn write(name: &str, bytes: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!(
            "win32-surface-{}-{}",
            std::process::id(),
            name
        ));
        fs::write(&path, bytes).unwrap();
        Self(path)
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

#[test]
fn test_native_images_from_disk() {
    let x86 = TempImage::write("x86.dll", &ImageBuilder::dll32().build());
    let x64 = TempImage::write("x64.dll", &ImageBuilder::dll64().build());

    assert_eq!(dll_machine_type(&x86.0).unwrap(), Machine::I386);
    assert_eq!(dll_machine_type(&x64.0).unwrap(), Machine::Amd64);
    assert_eq!(classify(&x86.0).unwrap(), ImageKind::Native32);
    assert_eq!(classify(&x64.0).unwrap(), ImageKind::Native64);

    let headers = PeHeaders::from_file(&x64.0).unwrap();
    assert_eq!(headers.optional_kind, OptionalHeaderKind::Pe32Plus);
    assert!(headers.is_dll());
    assert_eq!(headers.sections.len(), 1);
}

#[test]
fn test_managed_images_from_disk() {
    let any_cpu = TempImage::write("anycpu.dll", &ImageBuilder::dll32().managed(0x1).build());
    let x86_only = TempImage::write("x86only.dll", &ImageBuilder::dll32().managed(0x3).build());

    assert_eq!(classify(&any_cpu.0).unwrap(), ImageKind::ManagedAnyCpu);
    assert_eq!(classify(&x86_only.0).unwrap(), ImageKind::Managed32);
    // A managed image still reports the machine of its COFF header.
    assert_eq!(dll_machine_type(&any_cpu.0).unwrap(), Machine::I386);
}

#[test]
fn test_machine_type_ignores_optional_header() {
    // The machine comes from the COFF header alone; a bad magic does not matter.
    let image = ImageBuilder::dll64().magic(0x0107).build();
    let file = TempImage::write("rom.dll", &image);

    assert_eq!(dll_machine_type(&file.0).unwrap(), Machine::Amd64);
    assert!(matches!(
        PeHeaders::from_file(&file.0),
        Err(Error::UnsupportedOptionalHeader(0x0107))
    ));
}

#[test]
fn test_truncated_file() {
    let image = ImageBuilder::dll32().build();
    let file = TempImage::write("short.dll", &image[..0x90]);

    assert!(matches!(dll_machine_type(&file.0), Err(Error::Truncated { .. })));
}

#[test]
fn test_not_a_pe_file() {
    let file = TempImage::write("text.txt", b"just some text, definitely not an image");

    assert!(matches!(
        dll_machine_type(&file.0),
        Err(Error::InvalidDosSignature(_))
    ));
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("win32-surface-does-not-exist.dll");

    assert!(matches!(dll_machine_type(&path), Err(Error::Io(_))));
    assert!(matches!(PeHeaders::from_file(&path), Err(Error::Io(_))));
}

#[cfg(windows)]
#[test]
fn test_system_library() {
    let system = std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    let kernel32 = system.join("System32").join("kernel32.dll");

    let headers = PeHeaders::from_file(&kernel32).unwrap();
    assert!(headers.is_dll());
    assert!(!headers.is_managed());
    assert_eq!(headers.is_64bit(), cfg!(target_pointer_width = "64"));
}
