//! BSON codec using the `bson` crate.
//!
//! Every value on the wire is a complete BSON document. Its first four bytes
//! are a little-endian `i32` holding the document's total length, so the
//! encoded bytes are sent as-is with no extra framing.
//!
//! # Example
//!
//! ```
//! use bridgewire_client::codec::BsonCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Ping {
//!     op: String,
//!     id: i32,
//! }
//!
//! let ping = Ping { op: "ping".to_string(), id: 7 };
//! let encoded = BsonCodec::encode(&ping).unwrap();
//! assert_eq!(encoded.len() as u32, u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]));
//!
//! let decoded: Ping = BsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, ping);
//! ```

use bson::{Bson, Document};
use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Element type tag for a UTF-8 string.
const ELEMENT_STRING: u8 = 0x02;

/// Element type tag for an embedded document.
const ELEMENT_DOCUMENT: u8 = 0x03;

/// BSON codec for structured data.
///
/// Structs must serialize to a map; BSON has no top-level scalar form.
pub struct BsonCodec;

impl BsonCodec {
    /// Encode a value to raw BSON document bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value does not serialize to a document.
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let document = bson::to_document(value)?;
        Self::encode_document(&document)
    }

    /// Encode an already-built document.
    pub fn encode_document(document: &Document) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        document.to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Decode BSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a document or do not match `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        let document = Self::decode_document(bytes)?;
        Ok(bson::from_document(document)?)
    }

    /// Decode BSON bytes into an untyped document.
    ///
    /// # Errors
    ///
    /// Returns a format error unless the embedded length equals `bytes.len()`.
    pub fn decode_document(bytes: &[u8]) -> Result<Document> {
        let Some(prefix) = bytes.get(..4) else {
            return Err(BridgeError::Format(format!(
                "Document of {} bytes has no length prefix",
                bytes.len()
            )));
        };
        let declared = i32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        if usize::try_from(declared).ok() != Some(bytes.len()) {
            return Err(BridgeError::Format(format!(
                "Declared length {} does not match {} bytes",
                declared,
                bytes.len()
            )));
        }
        Ok(Document::from_reader(bytes)?)
    }

    /// Append a string element whose value is `parts` joined, byte for byte.
    ///
    /// The value is written as-is, so a caller may split one string across
    /// several documents at any byte offset.
    pub fn write_string_element(out: &mut Vec<u8>, name: &str, parts: &[&[u8]]) -> Result<()> {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        let declared = encoded_len(len + 1)?;

        out.push(ELEMENT_STRING);
        write_cstring(out, name)?;
        out.extend_from_slice(&declared.to_le_bytes());
        for part in parts {
            out.extend_from_slice(part);
        }
        out.push(0);
        Ok(())
    }

    /// Append an embedded document element built from raw `elements`.
    pub fn write_document_element(out: &mut Vec<u8>, name: &str, elements: &[u8]) -> Result<()> {
        out.push(ELEMENT_DOCUMENT);
        write_cstring(out, name)?;
        out.extend_from_slice(&Self::document_from_elements(elements)?);
        Ok(())
    }

    /// Wrap raw element bytes as a complete document.
    pub fn document_from_elements(elements: &[u8]) -> Result<Vec<u8>> {
        let total = encoded_len(4 + elements.len() + 1)?;
        let mut out = Vec::with_capacity(elements.len() + 5);
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(elements);
        out.push(0);
        Ok(out)
    }

    /// Render a document as canonical extended JSON with sorted keys.
    ///
    /// The output is deterministic for a given document regardless of the
    /// field order it arrived in.
    pub fn canonical_text(document: &Document) -> String {
        let value = Bson::Document(document.clone()).into_canonical_extjson();
        sort_keys(value).to_string()
    }
}

fn encoded_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| BridgeError::Format(format!("Length {len} exceeds i32")))
}

fn write_cstring(out: &mut Vec<u8>, name: &str) -> Result<()> {
    if name.as_bytes().contains(&0) {
        return Err(BridgeError::Format(format!("Key {name:?} contains NUL")));
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    Ok(())
}

/// Rebuild every object with its keys in lexicographic order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
