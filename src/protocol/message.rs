//! Bridge operations.
//!
//! The bridge speaks four operations, distinguished by the `op` field:
//!
//! ```text
//! {op:"advertise",   topic, type}
//! {op:"publish",     topic, msg:{<field>: value}}
//! {op:"subscribe",   topic, [type]}
//! {op:"unsubscribe", topic}
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::BsonCodec;
use crate::error::Result;

/// One bridge operation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Message {
    /// Announce that this client will publish on `topic`.
    Advertise {
        topic: String,
        #[serde(rename = "type")]
        msg_type: String,
    },

    /// Publish a payload on `topic`.
    Publish { topic: String, msg: Payload },

    /// Ask the bridge to forward traffic on `topic`.
    Subscribe {
        topic: String,
        #[serde(
            rename = "type",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        msg_type: Option<String>,
    },

    /// Stop forwarding traffic on `topic`.
    Unsubscribe { topic: String },
}

/// The single-entry body of a publish.
///
/// `Data` is what every producer in this crate emits. `FileContents` is kept
/// so peers that label file payloads differently still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// `{data: value}`
    Data(String),
    /// `{file_contents: value}`
    FileContents(String),
}

impl Payload {
    /// Field name this payload is stored under.
    pub fn field(&self) -> &'static str {
        match self {
            Payload::Data(_) => "data",
            Payload::FileContents(_) => "file_contents",
        }
    }

    /// The payload text.
    pub fn value(&self) -> &str {
        match self {
            Payload::Data(v) | Payload::FileContents(v) => v,
        }
    }
}

impl Message {
    /// Build an advertise message.
    pub fn advertise(topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        Self::Advertise {
            topic: topic.into(),
            msg_type: msg_type.into(),
        }
    }

    /// Build a publish message with a `data` payload.
    pub fn publish(topic: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            msg: Payload::Data(data.into()),
        }
    }

    /// Build a publish message with an explicit payload.
    pub fn publish_payload(topic: impl Into<String>, payload: Payload) -> Self {
        Self::Publish {
            topic: topic.into(),
            msg: payload,
        }
    }

    /// Build a subscribe message.
    pub fn subscribe(topic: impl Into<String>, msg_type: Option<String>) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            msg_type,
        }
    }

    /// Build an unsubscribe message.
    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        Self::Unsubscribe {
            topic: topic.into(),
        }
    }

    /// The `op` field value.
    pub fn op(&self) -> &'static str {
        match self {
            Message::Advertise { .. } => "advertise",
            Message::Publish { .. } => "publish",
            Message::Subscribe { .. } => "subscribe",
            Message::Unsubscribe { .. } => "unsubscribe",
        }
    }

    /// Topic this message targets.
    pub fn topic(&self) -> &str {
        match self {
            Message::Advertise { topic, .. }
            | Message::Publish { topic, .. }
            | Message::Subscribe { topic, .. }
            | Message::Unsubscribe { topic } => topic,
        }
    }

    /// Encode to the exact bytes sent on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// use bridgewire_client::protocol::Message;
    ///
    /// let bytes = Message::unsubscribe("/a").encode().unwrap();
    /// let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    /// assert_eq!(declared as usize, bytes.len());
    /// ```
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(BsonCodec::encode(self)?))
    }

    /// Encode a `data` publish whose value is raw bytes.
    ///
    /// `parts` are joined as-is and never checked for UTF-8, so a payload
    /// sliced at fixed byte offsets can split a multi-byte character across
    /// two publishes. The layout matches [`Message::publish`] byte for byte.
    pub fn encode_publish_bytes(topic: &str, parts: &[&[u8]]) -> Result<Bytes> {
        let mut msg = Vec::new();
        BsonCodec::write_string_element(&mut msg, "data", parts)?;

        let mut elements = Vec::with_capacity(msg.len() + topic.len() + 32);
        BsonCodec::write_string_element(&mut elements, "op", &["publish".as_bytes()])?;
        BsonCodec::write_string_element(&mut elements, "topic", &[topic.as_bytes()])?;
        BsonCodec::write_document_element(&mut elements, "msg", &msg)?;

        Ok(Bytes::from(BsonCodec::document_from_elements(&elements)?))
    }

    /// Decode wire bytes back into a message.
    ///
    /// The bytes must be exactly one document; trailing or missing bytes
    /// are a format error.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        BsonCodec::decode(bytes)
    }
}
