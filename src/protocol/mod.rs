//! Protocol module - wire format, framing, and bridge messages.
//!
//! This module implements the binary protocol spoken with the bridge:
//! - Self-delimited document framing (4-byte little-endian length)
//! - Frame buffer for reassembling partial reads
//! - The four bridge operations as a typed [`Message`]

mod frame;
mod frame_buffer;
mod message;
mod wire_format;

pub use frame::{decode_frame, DecodedDocument, Frame};
pub use frame_buffer::FrameBuffer;
pub use message::{Message, Payload};
pub use wire_format::{
    read_length_prefix, validate_length, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_BUFFER_SIZE,
    LENGTH_PREFIX_SIZE, MIN_FRAME_SIZE,
};
