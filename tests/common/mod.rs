//! In-memory bridge that answers each written frame from a script.
//!
//! Every inbound frame is recorded as [`Event::Sent`] and handed to a
//! responder closure. Replies are queued and served one frame per read;
//! when a reply is consumed it is recorded as [`Event::Delivered`]. With no
//! reply queued, reads stay pending, so a missing ack surfaces as a timeout.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use bridgewire_client::protocol::{FrameBuffer, Message, Payload};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Topic replies are published on.
pub const REPLY_TOPIC: &str = "/ue5/LoadModel";

/// One step observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The client wrote this message.
    Sent(Message),
    /// The client read a reply carrying this data.
    Delivered(String),
}

impl Event {
    /// Publish data of a sent message, if any.
    pub fn sent_data(&self) -> Option<&str> {
        match self {
            Event::Sent(Message::Publish { msg, .. }) => Some(msg.value()),
            _ => None,
        }
    }
}

type Responder = Box<dyn FnMut(&Message) -> Vec<String> + Send>;

#[derive(Default)]
struct Shared {
    events: Vec<Event>,
    replies: VecDeque<(String, Vec<u8>)>,
    read_waker: Option<Waker>,
}

/// Inspect a [`ScriptedStream`] after it has been moved into a connection.
#[derive(Clone)]
pub struct ScriptHandle {
    shared: Arc<Mutex<Shared>>,
}

impl ScriptHandle {
    /// Everything observed so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.shared.lock().unwrap().events.clone()
    }

    /// Only the messages the client wrote.
    pub fn sent(&self) -> Vec<Message> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Sent(m) => Some(m),
                Event::Delivered(_) => None,
            })
            .collect()
    }
}

/// A duplex stream whose far side is a reply script.
pub struct ScriptedStream {
    shared: Arc<Mutex<Shared>>,
    inbound: FrameBuffer,
    responder: Responder,
}

impl ScriptedStream {
    /// Create a stream answering with `responder`.
    pub fn new<F>(responder: F) -> (Self, ScriptHandle)
    where
        F: FnMut(&Message) -> Vec<String> + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let stream = Self {
            shared: shared.clone(),
            inbound: FrameBuffer::new(),
            responder: Box::new(responder),
        };
        (stream, ScriptHandle { shared })
    }

    /// A stream that acks the default markers of the mesh protocol.
    pub fn mesh_bridge() -> (Self, ScriptHandle) {
        Self::new(|message| {
            let Message::Publish { msg: Payload::Data(data), .. } = message else {
                return vec![];
            };
            let replies: &[&str] = match data.as_str() {
                "OBJClear:OBJClear" => &["OBJCleared"],
                "OBJFinished:OBJFinished" => &["true", "NextAge"],
                d if d.starts_with("MTLData:") => &["MTLReceived"],
                d if d.starts_with("OBJData:") => &["OBJReceived"],
                _ => &[],
            };
            replies.iter().map(|r| r.to_string()).collect()
        })
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let frames = this
            .inbound
            .push(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        for frame in frames {
            let message = frame
                .decode()
                .and_then(|d| d.to_message())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            let replies = (this.responder)(&message);

            let mut shared = this.shared.lock().unwrap();
            shared.events.push(Event::Sent(message));
            for reply in replies {
                let bytes = Message::publish(REPLY_TOPIC, reply.as_str())
                    .encode()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
                shared.replies.push_back((reply, bytes.to_vec()));
            }
            if let Some(waker) = shared.read_waker.take() {
                waker.wake();
            }
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut shared = self.shared.lock().unwrap();
        match shared.replies.pop_front() {
            Some((text, mut bytes)) => {
                let n = bytes.len().min(buf.remaining());
                buf.put_slice(&bytes[..n]);
                if n < bytes.len() {
                    bytes.drain(..n);
                    shared.replies.push_front((text, bytes));
                } else {
                    shared.events.push(Event::Delivered(text));
                }
                Poll::Ready(Ok(()))
            }
            None => {
                shared.read_waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
