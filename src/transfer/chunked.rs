//! Ack-gated chunked publishing.
//!
//! Each chunk is published as `prefix + chunk` on one topic, and the next
//! chunk is not written until a reply containing the ack text arrives.
//! A single missed ack fails the whole transfer; nothing is retried.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bridgewire_client::transfer::ChunkedTransfer;
//!
//! let transfer = ChunkedTransfer::new("/ue5/game_commands", "OBJData:", "OBJReceived")
//!     .chunk_timeout(Duration::from_secs(5))
//!     .completion("OBJFinished:OBJFinished", "true", Duration::from_secs(1));
//!
//! let report = transfer.send(&mut conn, mesh_bytes).await?;
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use super::chunks::{ChunkSequence, DEFAULT_CHUNK_SIZE};
use super::state::TransferState;
use crate::error::{BridgeError, Result};
use crate::protocol::Message;
use crate::transport::Connection;

/// Default wait for each chunk's ack.
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(5);

/// Marker published after the last chunk, and the ack it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Full text of the completion message.
    pub marker: String,
    /// Substring expected in the reply.
    pub ack: String,
    /// Wait for that reply.
    pub timeout: Duration,
}

/// Outcome of a finished transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Chunks published and acknowledged.
    pub chunks: usize,
    /// Payload bytes sent, prefixes excluded.
    pub bytes: usize,
    /// Text of the last matched reply.
    pub last_reply: Option<String>,
}

/// A configured chunked transfer on one topic.
#[derive(Debug, Clone)]
pub struct ChunkedTransfer {
    topic: String,
    chunk_prefix: String,
    chunk_ack: String,
    chunk_timeout: Duration,
    chunk_size: usize,
    completion: Option<Completion>,
}

impl ChunkedTransfer {
    /// Create a transfer publishing on `topic`.
    ///
    /// Defaults: 64 KiB chunks, 5 s per ack, no completion step.
    pub fn new(
        topic: impl Into<String>,
        chunk_prefix: impl Into<String>,
        chunk_ack: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            chunk_prefix: chunk_prefix.into(),
            chunk_ack: chunk_ack.into(),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            completion: None,
        }
    }

    /// Set the wait for each chunk's ack.
    pub fn chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    /// Set the chunk size in bytes.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Publish `marker` after the last chunk and wait for `ack`.
    pub fn completion(
        mut self,
        marker: impl Into<String>,
        ack: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        self.completion = Some(Completion {
            marker: marker.into(),
            ack: ack.into(),
            timeout,
        });
        self
    }

    /// Topic this transfer publishes on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Send `payload` in chunks, each gated on its ack.
    pub async fn send<S>(&self, conn: &mut Connection<S>, payload: Bytes) -> Result<TransferReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let chunks: Vec<Bytes> = ChunkSequence::new(payload, self.chunk_size).iter().collect();
        self.run(conn, &chunks, self.completion.as_ref()).await
    }

    /// Send `payload` as one prefixed message and wait for one ack.
    ///
    /// The payload is never split and the completion step is skipped.
    pub async fn send_single<S>(
        &self,
        conn: &mut Connection<S>,
        payload: Bytes,
    ) -> Result<TransferReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.run(conn, std::slice::from_ref(&payload), None).await
    }

    async fn run<S>(
        &self,
        conn: &mut Connection<S>,
        chunks: &[Bytes],
        completion: Option<&Completion>,
    ) -> Result<TransferReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let total = chunks.len();
        let completes = completion.is_some();
        let mut state = TransferState::start(total, completes);
        let mut report = TransferReport::default();

        tracing::debug!(topic = %self.topic, total, "Starting transfer");

        while !state.is_terminal() {
            let next = match state {
                TransferState::Sending(i) => {
                    let frame = self
                        .chunk_frame(&chunks[i])
                        .map_err(|e| self.fail(state, e))?;
                    conn.send_frame(&frame)
                        .await
                        .map_err(|e| self.fail(state, e))?;
                    tracing::debug!(chunk = i, total, len = chunks[i].len(), "Chunk sent");
                    report.bytes += chunks[i].len();
                    state.on_sent()
                }
                TransferState::AwaitingAck(_) => {
                    let reply = conn
                        .read_until(&self.chunk_ack, self.chunk_timeout)
                        .await
                        .map_err(|e| self.fail(state, e))?;
                    report.chunks += 1;
                    report.last_reply = Some(reply);
                    state.on_ack(total, completes)
                }
                TransferState::Completing => match completion {
                    Some(step) => {
                        conn.send(&Message::publish(&self.topic, step.marker.as_str()))
                            .await
                            .map_err(|e| self.fail(state, e))?;
                        let reply = conn
                            .read_until(&step.ack, step.timeout)
                            .await
                            .map_err(|e| self.fail(state, e))?;
                        report.last_reply = Some(reply);
                        state.on_ack(total, completes)
                    }
                    None => TransferState::Done,
                },
                TransferState::Done | TransferState::Failed => state,
            };
            tracing::trace!(from = %state, to = %next, "Transfer transition");
            state = next;
        }

        tracing::info!(topic = %self.topic, chunks = report.chunks, bytes = report.bytes, "Transfer done");
        Ok(report)
    }

    /// Encode `prefix + chunk` as a publish. Chunk bytes go out unchanged.
    fn chunk_frame(&self, chunk: &[u8]) -> Result<Bytes> {
        Message::encode_publish_bytes(&self.topic, &[self.chunk_prefix.as_bytes(), chunk])
    }

    fn fail(&self, state: TransferState, error: BridgeError) -> BridgeError {
        tracing::error!(topic = %self.topic, %state, to = %state.on_failure(), "Transfer aborted: {}", error);
        error
    }
}
