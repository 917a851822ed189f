//! Fuzz target for copying strings into fixed `WCHAR` arrays.
//!
//! Fixed-size arrays appear throughout the display, monitor and taskbar
//! structures; a copy must either fit with its terminator or fail cleanly.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use win32_surface::error::Error;
use win32_surface::string::{copy_to_fixed, from_wide_lossy};

#[derive(Arbitrary, Debug)]
struct Input {
    text: String,
    capacity: u16,
    fill: u16,
}

fuzz_target!(|input: Input| {
    let mut dest = vec![input.fill; usize::from(input.capacity)];
    let units = input.text.encode_utf16().count();

    match copy_to_fixed(&input.text, &mut dest) {
        Ok(()) => {
            assert!(units < dest.len());
            assert!(dest[units..].iter().all(|&c| c == 0));
            // Reading back stops at the first NUL, embedded ones included.
            let expected: String = input.text.split('\0').next().unwrap_or("").to_owned();
            assert_eq!(from_wide_lossy(&dest), expected);
        }
        Err(Error::BufferTooSmall { needed, actual }) => {
            assert_eq!(needed, units + 1);
            assert_eq!(actual, dest.len());
            assert!(dest.iter().all(|&c| c == input.fill));
        }
        Err(e) => panic!("unexpected error: {e}"),
    }
});
