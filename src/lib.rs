//! # bridgewire-client
//!
//! Client driver for a rosbridge-style server speaking raw BSON over TCP.
//!
//! The crate pushes procedurally generated meshes to a game engine through
//! the bridge. Every step is a request followed by a blocking wait for a
//! reply whose text contains an expected marker.
//!
//! ## Layers
//!
//! - [`codec`] / [`protocol`]: BSON documents, frames and the four bridge ops
//! - [`transport`]: the framed connection and its read-until-match wait
//! - [`transfer`]: ack-gated chunked publishing
//! - [`artifact`]: bounded wait for files written by external tools
//! - [`session`]: the per-iteration protocol
//!
//! ## Example
//!
//! ```ignore
//! use bridgewire_client::session::{CommandPostprocessor, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut driver = SessionBuilder::new()
//!         .iterations(10)
//!         .connect("127.0.0.1:9090", MyGenerator::new(), CommandPostprocessor::default())
//!         .await
//!         .unwrap();
//!
//!     driver.run_or_exit().await;
//! }
//! ```

pub mod artifact;
pub mod codec;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transfer;
pub mod transport;

pub use error::{BridgeError, Result};
pub use protocol::Message;
pub use session::{SessionBuilder, SessionDriver};
pub use transport::{connect, Connection};
