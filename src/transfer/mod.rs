//! Transfer module - ack-gated chunked payload delivery.
//!
//! Provides:
//! - [`ChunkSequence`] - fixed-size partition of a payload
//! - [`TransferState`] - the send/ack state machine
//! - [`ChunkedTransfer`] - drives the machine over a [`Connection`](crate::transport::Connection)

mod chunked;
mod chunks;
mod state;

pub use chunked::{ChunkedTransfer, Completion, TransferReport, DEFAULT_CHUNK_TIMEOUT};
pub use chunks::{ChunkSequence, DEFAULT_CHUNK_SIZE};
pub use state::TransferState;
