//! Transport module - the framed bridge connection.

mod connection;
mod tcp;

pub use connection::{Connection, ConnectionConfig, FramingMode};
pub(crate) use connection::deadline_after;
pub use tcp::{connect, connect_with_config};
