//! Wire format constants and length-prefix handling.
//!
//! Every frame is one BSON document:
//! ```text
//! ┌──────────────┬──────────────────────┬──────┐
//! │ Total length │ Elements             │ 0x00 │
//! │ 4 bytes      │ (length - 5) bytes   │      │
//! │ int32 LE     │                      │      │
//! └──────────────┴──────────────────────┴──────┘
//! ```
//!
//! The length counts itself, so there is no outer transport prefix.

use crate::error::{BridgeError, Result};

/// Size of the embedded length field in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Smallest legal document: length field plus terminator.
pub const MIN_FRAME_SIZE: usize = 5;

/// Default maximum inbound frame size (16 MiB, the usual BSON document cap).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default read buffer size for the matcher.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Read the declared total length from the first four bytes.
///
/// Returns `None` if fewer than four bytes are available.
///
/// # Example
///
/// ```
/// use bridgewire_client::protocol::read_length_prefix;
///
/// assert_eq!(read_length_prefix(&[5, 0, 0, 0, 0]), Some(5));
/// assert_eq!(read_length_prefix(&[5, 0]), None);
/// ```
#[inline]
pub fn read_length_prefix(buf: &[u8]) -> Option<i32> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    Some(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Check that a declared length is usable as a frame boundary.
///
/// Negative, undersized, and oversized lengths cannot be resynchronized on a
/// stream, so they are format errors.
pub fn validate_length(declared: i32, max_frame_size: usize) -> Result<usize> {
    if declared < MIN_FRAME_SIZE as i32 {
        return Err(BridgeError::Format(format!(
            "Declared length {} below minimum {}",
            declared, MIN_FRAME_SIZE
        )));
    }

    let declared = declared as usize;
    if declared > max_frame_size {
        return Err(BridgeError::Format(format!(
            "Declared length {} exceeds maximum {}",
            declared, max_frame_size
        )));
    }

    Ok(declared)
}
