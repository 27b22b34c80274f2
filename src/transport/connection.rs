//! Framed connection with the read-until-match primitive.
//!
//! A [`Connection`] owns one byte stream to the bridge. Writes send whole
//! encoded messages; reads are only ever driven by [`Connection::read_until`],
//! which blocks the caller until a reply containing a given substring
//! arrives, the deadline passes, or the transport fails.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bridgewire_client::protocol::Message;
//! use bridgewire_client::transport::connect;
//!
//! let mut conn = connect("127.0.0.1:9090").await?;
//! conn.send(&Message::publish("/cmd", "OBJClear:OBJClear")).await?;
//! let reply = conn.read_until("OBJCleared", Duration::from_secs(5)).await?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::error::{BridgeError, Result};
use crate::protocol::{
    decode_frame, DecodedDocument, FrameBuffer, Message, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_READ_BUFFER_SIZE,
};

/// How inbound bytes are cut into documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Accumulate bytes across reads and split on each document's length.
    #[default]
    Reassemble,
    /// Treat the bytes of every read as exactly one document.
    ///
    /// Only correct when the peer's documents each arrive in a single read;
    /// a partial document is discarded as unreadable.
    PerRead,
}

/// Tunables for a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Size of the working read buffer.
    pub read_buffer_size: usize,
    /// Largest inbound document accepted when reassembling.
    pub max_frame_size: usize,
    /// Framing strategy.
    pub framing: FramingMode,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            framing: FramingMode::default(),
        }
    }
}

/// Stand-in for "never" when a timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Instant `timeout` from now, saturating to a far-future instant.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// One outstanding wait: what to look for and when to give up.
#[derive(Debug)]
struct PendingWait<'a> {
    needle: &'a str,
    deadline: Instant,
}

impl<'a> PendingWait<'a> {
    fn new(needle: &'a str, timeout: Duration) -> Self {
        Self {
            needle,
            deadline: deadline_after(timeout),
        }
    }

    /// Return the text if the document satisfies the wait.
    fn check(&self, decoded: DecodedDocument) -> Option<String> {
        if decoded.contains(self.needle) {
            Some(decoded.text)
        } else {
            tracing::trace!(needle = self.needle, text = %decoded.text, "Skipping reply");
            None
        }
    }
}

/// An exclusively owned, framed connection to the bridge.
pub struct Connection<S> {
    stream: S,
    frames: FrameBuffer,
    read_buf: Vec<u8>,
    framing: FramingMode,
    read_events: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream with default settings.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, &ConnectionConfig::default())
    }

    /// Wrap a stream with custom settings.
    pub fn with_config(stream: S, config: &ConnectionConfig) -> Self {
        Self {
            stream,
            frames: FrameBuffer::with_max_frame(config.max_frame_size),
            read_buf: vec![0u8; config.read_buffer_size.max(1)],
            framing: config.framing,
            read_events: 0,
        }
    }

    /// Encode and write one message.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        let bytes = message.encode()?;
        tracing::debug!(op = message.op(), topic = message.topic(), len = bytes.len(), "Sending");
        self.send_frame(&bytes).await
    }

    /// Write pre-encoded frame bytes.
    pub async fn send_frame(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read replies until one contains `needle`, or `timeout` elapses.
    ///
    /// The deadline covers the whole call, not each read. Unreadable bytes
    /// never end the wait; they are logged and reading continues.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Timeout`] if nothing matched in time. The pending
    ///   read is dropped and no further reads happen.
    /// - [`BridgeError::ConnectionClosed`] or [`BridgeError::Io`] as soon as
    ///   the transport fails.
    pub async fn read_until(&mut self, needle: &str, timeout: Duration) -> Result<String> {
        let wait = PendingWait::new(needle, timeout);
        tracing::debug!(needle, ?timeout, "Waiting for reply");

        match tokio::time::timeout_at(wait.deadline, self.next_match(&wait)).await {
            Ok(Ok(text)) => {
                tracing::debug!(needle, %text, "Matched reply");
                Ok(text)
            }
            Ok(Err(e)) => {
                tracing::error!(needle, "Transport failed while waiting: {}", e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(needle, ?timeout, "Timed out waiting for reply");
                Err(BridgeError::Timeout {
                    waiting_for: needle.to_string(),
                    after: timeout,
                })
            }
        }
    }

    /// Read loop behind [`read_until`](Self::read_until).
    async fn next_match(&mut self, wait: &PendingWait<'_>) -> Result<String> {
        loop {
            if let Some(text) = self.drain_buffered(wait) {
                return Ok(text);
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(BridgeError::ConnectionClosed);
            }
            self.read_events += 1;

            match self.framing {
                FramingMode::Reassemble => self.frames.extend(&self.read_buf[..n]),
                FramingMode::PerRead => match decode_frame(&self.read_buf[..n]) {
                    Ok(decoded) => {
                        if let Some(text) = wait.check(decoded) {
                            return Ok(text);
                        }
                    }
                    Err(e) => tracing::debug!(len = n, "Discarding unreadable read: {}", e),
                },
            }
        }
    }

    /// Check every complete frame already buffered, in arrival order.
    fn drain_buffered(&mut self, wait: &PendingWait<'_>) -> Option<String> {
        loop {
            match self.frames.next_frame() {
                Ok(Some(frame)) => match frame.decode() {
                    Ok(decoded) => {
                        if let Some(text) = wait.check(decoded) {
                            return Some(text);
                        }
                    }
                    Err(e) => tracing::debug!(len = frame.len(), "Discarding unreadable frame: {}", e),
                },
                Ok(None) => return None,
                Err(e) => {
                    // A bad length cannot be skipped over; drop what is buffered.
                    tracing::warn!(dropped = self.frames.len(), "Resynchronizing stream: {}", e);
                    self.frames.clear();
                    return None;
                }
            }
        }
    }

    /// Number of successful transport reads so far.
    #[inline]
    pub fn read_events(&self) -> u64 {
        self.read_events
    }

    /// Framing strategy in use.
    #[inline]
    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    /// Bytes received but not yet consumed as frames.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.frames.len()
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
