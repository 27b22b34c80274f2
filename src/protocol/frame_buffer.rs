//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented documents:
//! - `WaitingForLength`: Need at least 4 bytes
//! - `WaitingForBody`: Length parsed, need the rest of the document
//!
//! # Example
//!
//! ```
//! use bridgewire_client::protocol::{FrameBuffer, Message};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = Message::publish("/t", "hello").encode().unwrap();
//!
//! // Data arrives in pieces from the socket
//! buffer.extend(&bytes[..3]);
//! assert!(buffer.next_frame().unwrap().is_none());
//!
//! buffer.extend(&bytes[3..]);
//! let frame = buffer.next_frame().unwrap().unwrap();
//! assert_eq!(frame.len(), bytes.len());
//! ```

use bytes::BytesMut;

use super::wire_format::{
    read_length_prefix, validate_length, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE,
};
use super::Frame;
use crate::error::Result;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the 4-byte length field.
    WaitingForLength,
    /// Length parsed, waiting until `total` bytes are buffered.
    WaitingForBody { total: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// The embedded length of each document marks the frame boundary, so frames
/// split across reads are reassembled and several frames in one read are
/// yielded one by one.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed frame size.
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max frame: 16MB.
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with custom max frame size.
    pub fn with_max_frame(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForLength,
            max_frame_size,
        }
    }

    /// Append data from a socket read.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// # Errors
    ///
    /// Returns error if a declared length is out of range. Frames extracted
    /// before the bad length are dropped with it, so callers that need them
    /// should use [`extend`](Self::extend) and [`next_frame`](Self::next_frame).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the declared length is unusable
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForLength => {
                let Some(declared) = read_length_prefix(&self.buffer) else {
                    return Ok(None);
                };

                let total = validate_length(declared, self.max_frame_size)?;
                self.state = State::WaitingForBody { total };

                self.next_frame()
            }

            State::WaitingForBody { total } => {
                if self.buffer.len() < total {
                    return Ok(None);
                }

                // Length prefix is part of the frame, so split the whole thing.
                let bytes = self.buffer.split_to(total).freeze();
                self.state = State::WaitingForLength;

                Ok(Some(Frame::from_validated(bytes)))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    ///
    /// Used to resynchronize after an unusable length prefix.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    /// Bytes still missing for the frame in progress, if known.
    pub fn missing(&self) -> Option<usize> {
        match self.state {
            State::WaitingForLength => None,
            State::WaitingForBody { total } => Some(total.saturating_sub(self.buffer.len())),
        }
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
