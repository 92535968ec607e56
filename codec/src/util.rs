//! Codec utility functions

use crate::Error;
use bytes::Buf;

/// Checks if the buffer has at least `len` bytes remaining. Returns an [`Error::EndOfBuffer`] if not.
#[inline]
pub fn at_least<B: Buf>(buf: &mut B, len: usize) -> Result<(), Error> {
    let rem = buf.remaining();
    if rem < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}

/// Converts a decoded length prefix to `usize`, failing if it can't be addressed on this platform.
#[inline]
pub fn length(len: u64) -> Result<usize, Error> {
    usize::try_from(len).map_err(|_| Error::Invalid("length", "exceeds addressable memory"))
}

/// Converts bytes to a lowercase hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter() {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Converts a hexadecimal string to bytes.
pub fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
