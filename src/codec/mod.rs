//! Codec module - document serialization for the bridge wire.
//!
//! - [`BsonCodec`] - BSON documents via the `bson` crate
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so the encoding is chosen at compile time.
//!
//! # Example
//!
//! ```
//! use bridgewire_client::codec::BsonCodec;
//! use bson::doc;
//!
//! let encoded = BsonCodec::encode(&doc! { "op": "unsubscribe", "topic": "/a" }).unwrap();
//! let document = BsonCodec::decode_document(&encoded).unwrap();
//! assert_eq!(document.get_str("topic").unwrap(), "/a");
//! ```

mod bson;

pub use self::bson::BsonCodec;
