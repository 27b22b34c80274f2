//! Frame struct and document decoding.
//!
//! A [`Frame`] is the raw bytes of exactly one document. Decoding it yields
//! a [`DecodedDocument`] holding both the parsed document and its canonical
//! text, which is what reply matching runs against.
//!
//! # Example
//!
//! ```
//! use bridgewire_client::protocol::{Frame, Message};
//!
//! let bytes = Message::advertise("/x", "t").encode().unwrap();
//! let frame = Frame::new(bytes).unwrap();
//! let decoded = frame.decode().unwrap();
//! assert!(decoded.contains("advertise"));
//! ```

use bson::Document;
use bytes::Bytes;

use super::message::Message;
use super::wire_format::{read_length_prefix, validate_length, DEFAULT_MAX_FRAME_SIZE};
use crate::codec::BsonCodec;
use crate::error::{BridgeError, Result};

/// The bytes of one complete document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Wrap bytes as a frame, checking the self-delimiting invariant.
    ///
    /// # Errors
    ///
    /// Returns a format error if the declared length is missing, out of
    /// range, or differs from the byte count.
    pub fn new(bytes: Bytes) -> Result<Self> {
        let declared = read_length_prefix(&bytes).ok_or_else(|| {
            BridgeError::Format(format!("Frame of {} bytes has no length prefix", bytes.len()))
        })?;
        let declared = validate_length(declared, DEFAULT_MAX_FRAME_SIZE.max(bytes.len()))?;

        if declared != bytes.len() {
            return Err(BridgeError::Format(format!(
                "Declared length {} does not match {} bytes read",
                declared,
                bytes.len()
            )));
        }

        Ok(Self { bytes })
    }

    /// Wrap bytes already split on a validated boundary.
    #[inline]
    pub(crate) fn from_validated(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Raw frame bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame length (equal to the declared length).
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; the smallest frame is five bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse the document and render its canonical text.
    pub fn decode(&self) -> Result<DecodedDocument> {
        let document = BsonCodec::decode_document(&self.bytes)
            .map_err(|e| BridgeError::Format(e.to_string()))?;
        let text = BsonCodec::canonical_text(&document);
        Ok(DecodedDocument { document, text })
    }

    /// Consume the frame, returning its bytes.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// A decoded inbound document plus its canonical text form.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    /// The parsed document.
    pub document: Document,
    /// Canonical extended JSON with sorted keys.
    pub text: String,
}

impl DecodedDocument {
    /// Whether the canonical text contains `needle`.
    #[inline]
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Convert to a typed message, if the document is one of the four ops.
    pub fn to_message(&self) -> Result<Message> {
        Ok(bson::from_document(self.document.clone())?)
    }
}

/// Decode raw bytes as exactly one frame.
///
/// This is the per-read decoding path: anything other than one complete,
/// well-formed document is a format error.
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedDocument> {
    Frame::new(Bytes::copy_from_slice(bytes))?.decode()
}
