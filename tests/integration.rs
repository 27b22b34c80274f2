//! Integration tests for bridgewire-client.
//!
//! These tests drive the public API against in-memory and TCP bridges.

mod common;

use std::time::Duration;

use bridgewire_client::artifact::PollConfig;
use bridgewire_client::protocol::{decode_frame, FrameBuffer, Message, Payload};
use bridgewire_client::session::{
    ArtifactPaths, BoxFuture, MeshGenerator, Postprocessor, SessionBuilder, Timeouts,
};
use bridgewire_client::transfer::ChunkedTransfer;
use bridgewire_client::transport::connect;
use bridgewire_client::{BridgeError, Connection, Result};
use bytes::Bytes;
use common::{Event, ScriptedStream};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn obj_transfer(chunk_size: usize) -> ChunkedTransfer {
    ChunkedTransfer::new("/ue5/game_commands", "OBJData:", "OBJReceived")
        .chunk_size(chunk_size)
        .completion("OBJFinished:OBJFinished", "true", Duration::from_secs(1))
}

/// The advertise document is exactly the three string fields, `op` first.
#[test]
fn test_advertise_wire_bytes() {
    let bytes = Message::advertise("/x", "t").encode().unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&49i32.to_le_bytes());
    expected.extend_from_slice(b"\x02op\0");
    expected.extend_from_slice(&10i32.to_le_bytes());
    expected.extend_from_slice(b"advertise\0");
    expected.extend_from_slice(b"\x02topic\0");
    expected.extend_from_slice(&3i32.to_le_bytes());
    expected.extend_from_slice(b"/x\0");
    expected.extend_from_slice(b"\x02type\0");
    expected.extend_from_slice(&2i32.to_le_bytes());
    expected.extend_from_slice(b"t\0");
    expected.push(0);

    assert_eq!(&bytes[..], &expected[..]);

    let decoded = decode_frame(&bytes).unwrap();
    assert_eq!(decoded.text, r#"{"op":"advertise","topic":"/x","type":"t"}"#);
    assert_eq!(decoded.to_message().unwrap(), Message::advertise("/x", "t"));
}

/// Each encoded message declares its own length; back to back they split cleanly.
#[test]
fn test_concatenated_messages_split_back() {
    let messages = vec![
        Message::advertise("/ue5/game_commands", "std_msgs/String"),
        Message::subscribe("/ue5/LoadModel", Some("std_msgs/String".to_string())),
        Message::publish("/ue5/game_commands", "OBJClear:OBJClear"),
        Message::publish_payload("/t", Payload::FileContents("v 0 0 0".to_string())),
        Message::unsubscribe("/ue5/LoadModel"),
    ];

    let mut stream = Vec::new();
    for m in &messages {
        stream.extend_from_slice(&m.encode().unwrap());
    }

    let mut buffer = FrameBuffer::new();
    let frames = buffer.push(&stream).unwrap();
    let decoded: Vec<Message> = frames
        .iter()
        .map(|f| f.decode().unwrap().to_message().unwrap())
        .collect();

    assert_eq!(decoded, messages);
    assert!(buffer.is_empty());
}

/// Chunk i+1 is never written before the ack for chunk i has been read.
#[tokio::test]
async fn test_chunks_are_ack_gated() {
    let (stream, handle) = ScriptedStream::mesh_bridge();
    let mut conn = Connection::new(stream);

    let payload = Bytes::from(vec![b'f'; 20]);
    let report = obj_transfer(4).send(&mut conn, payload).await.unwrap();
    assert_eq!(report.chunks, 5);

    let events = handle.events();
    // 5 x (chunk, ack) then (finished, true)
    assert_eq!(events.len(), 12);
    for pair in events.chunks(2) {
        assert!(matches!(pair[0], Event::Sent(_)), "{pair:?}");
        assert!(matches!(pair[1], Event::Delivered(_)), "{pair:?}");
    }
    assert_eq!(events[10].sent_data(), Some("OBJFinished:OBJFinished"));
    assert_eq!(events[11], Event::Delivered("true".to_string()));
}

/// One missing ack aborts the transfer; nothing else is sent.
#[tokio::test(start_paused = true)]
async fn test_single_timeout_fails_fast() {
    let (stream, handle) = ScriptedStream::new(|_| vec![]);
    let mut conn = Connection::new(stream);

    let err = obj_transfer(4)
        .send(&mut conn, Bytes::from(vec![b'f'; 20]))
        .await
        .unwrap_err();

    match err {
        BridgeError::Timeout { waiting_for, after } => {
            assert_eq!(waiting_for, "OBJReceived");
            assert_eq!(after, Duration::from_secs(5));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(handle.sent().len(), 1);
    assert_eq!(handle.events()[0].sent_data(), Some("OBJData:ffff"));
}

/// A 150,000-byte mesh goes out as 65536 + 65536 + 18928 with three ack rounds.
#[tokio::test]
async fn test_reference_mesh_transfer() {
    let (stream, handle) = ScriptedStream::mesh_bridge();
    let mut conn = Connection::new(stream);

    let mesh: Vec<u8> = (0..150_000).map(|i| b'a' + (i % 26) as u8).collect();
    let report = obj_transfer(64 * 1024)
        .send(&mut conn, Bytes::from(mesh.clone()))
        .await
        .unwrap();

    assert_eq!(report.chunks, 3);
    assert_eq!(report.bytes, 150_000);

    let events = handle.events();
    let chunk_sizes: Vec<usize> = events
        .iter()
        .filter_map(Event::sent_data)
        .filter_map(|d| d.strip_prefix("OBJData:"))
        .map(str::len)
        .collect();
    assert_eq!(chunk_sizes, vec![65_536, 65_536, 18_928]);

    let finished_at = events
        .iter()
        .position(|e| e.sent_data() == Some("OBJFinished:OBJFinished"))
        .unwrap();
    let acks_before = events[..finished_at]
        .iter()
        .filter(|e| **e == Event::Delivered("OBJReceived".to_string()))
        .count();
    assert_eq!(acks_before, 3);

    let rebuilt: String = events
        .iter()
        .filter_map(Event::sent_data)
        .filter_map(|d| d.strip_prefix("OBJData:"))
        .collect();
    assert_eq!(rebuilt.as_bytes(), &mesh[..]);
}

/// Raw `msg.data` bytes of a publish frame, without UTF-8 checks.
fn raw_data(frame: &[u8]) -> Vec<u8> {
    let key = b"\x02data\0";
    let at = frame.windows(key.len()).position(|w| w == key).unwrap() + key.len();
    let len = i32::from_le_bytes(frame[at..at + 4].try_into().unwrap()) as usize;
    frame[at + 4..at + 4 + len - 1].to_vec()
}

/// A two-byte character straddling the 64 KiB boundary is split across chunks.
#[tokio::test]
async fn test_character_split_across_chunk_boundary() {
    let mut mesh = vec![b'v'; 65_535];
    mesh.extend_from_slice("é\n".as_bytes());
    assert!(std::str::from_utf8(&mesh).is_ok());

    let (client, mut server) = tokio::io::duplex(256 * 1024);
    let bridge = tokio::spawn(async move {
        let mut frames = FrameBuffer::new();
        let mut buf = vec![0u8; 128 * 1024];
        let mut seen = Vec::new();
        while seen.len() < 3 {
            let n = server.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            for frame in frames.push(&buf[..n]).unwrap() {
                seen.push(raw_data(frame.as_bytes()));
                let ack = Message::publish("/ue5/LoadModel", "OBJReceived true").encode().unwrap();
                server.write_all(&ack).await.unwrap();
            }
        }
        seen
    });

    let mut conn = Connection::new(client);
    let report = obj_transfer(64 * 1024)
        .send(&mut conn, Bytes::from(mesh.clone()))
        .await
        .unwrap();
    assert_eq!(report.chunks, 2);
    assert_eq!(report.bytes, mesh.len());

    let seen = bridge.await.unwrap();
    assert_eq!(seen.len(), 3);
    let first = seen[0].strip_prefix(b"OBJData:".as_slice()).unwrap();
    let second = seen[1].strip_prefix(b"OBJData:".as_slice()).unwrap();
    assert_eq!(first.len(), 65_536);
    assert_eq!(first.last(), Some(&0xC3));
    assert_eq!(second, &[0xA9, b'\n'][..]);
    assert_eq!([first, second].concat(), mesh);
    assert_eq!(seen[2], b"OBJFinished:OBJFinished".to_vec());
}

/// The matcher returns the k-th reply and leaves later ones for the next wait.
#[tokio::test]
async fn test_read_until_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut all = Vec::new();
        for data in ["status: busy", "status: loading", "OBJCleared", "NextAge"] {
            all.extend_from_slice(&Message::publish("/ue5/LoadModel", data).encode().unwrap());
        }
        socket.write_all(&all).await.unwrap();

        let mut buf = [0u8; 1];
        let _ = socket.read(&mut buf).await;
    });

    let mut conn = connect(addr).await.unwrap();
    let first = conn.read_until("OBJCleared", Duration::from_secs(5)).await.unwrap();
    assert!(first.contains("OBJCleared"));
    let second = conn.read_until("NextAge", Duration::from_secs(5)).await.unwrap();
    assert!(second.contains("NextAge"));

    drop(conn);
    server.await.unwrap();
}

struct FileGenerator {
    metadata: std::path::PathBuf,
    size: usize,
    advanced: f32,
}

impl MeshGenerator for FileGenerator {
    fn export_mesh(&mut self, path: &std::path::Path) -> Result<()> {
        let body: String = "v 0.0 1.0 2.0\n".repeat(self.size / 14 + 1);
        std::fs::write(path, &body.as_bytes()[..self.size])?;
        std::fs::write(&self.metadata, "newmtl stem\nKd 0.2 0.6 0.1\n")?;
        Ok(())
    }

    fn advance(&mut self, amount: f32) -> Result<()> {
        self.advanced += amount;
        Ok(())
    }
}

struct RenamePostprocessor;

impl Postprocessor for RenamePostprocessor {
    fn run<'a>(
        &'a mut self,
        input: &'a std::path::Path,
        output: &'a std::path::Path,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tokio::fs::copy(input, output).await?;
            Ok(())
        })
    }
}

/// A full session against the scripted bridge, checking the wire order.
#[tokio::test]
async fn test_session_iteration_order() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactPaths::in_dir(dir.path());
    let generator = FileGenerator {
        metadata: artifacts.metadata.clone(),
        size: 150_000,
        advanced: 0.0,
    };

    let (stream, handle) = ScriptedStream::mesh_bridge();
    let mut driver = SessionBuilder::new()
        .iterations(2)
        .artifacts(artifacts)
        .poll(PollConfig {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        })
        .build(stream, generator, RenamePostprocessor);

    let report = driver.run().await.unwrap();
    assert_eq!(report.iterations.len(), 2);
    assert_eq!(report.total_chunks(), 6);
    assert_eq!(driver.generator().advanced, 14.0);

    let sent = handle.sent();
    assert_eq!(sent[0], Message::advertise("/ue5/game_commands", "std_msgs/String"));
    assert_eq!(
        sent[1],
        Message::subscribe("/ue5/LoadModel", Some("std_msgs/String".to_string()))
    );
    assert_eq!(sent.last(), Some(&Message::unsubscribe("/ue5/LoadModel")));

    let labels: Vec<&str> = sent[2..sent.len() - 1]
        .iter()
        .map(|m| match m {
            Message::Publish { msg, .. } => msg.value().split(':').next().unwrap_or(""),
            _ => "?",
        })
        .collect();
    let one_iteration = ["OBJClear", "MTLData", "OBJData", "OBJData", "OBJData", "OBJFinished"];
    assert_eq!(labels, [one_iteration, one_iteration].concat());
}

/// A session whose bridge stops answering the metadata ends with a timeout.
#[tokio::test]
async fn test_session_aborts_on_missing_metadata_ack() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactPaths::in_dir(dir.path());
    let generator = FileGenerator {
        metadata: artifacts.metadata.clone(),
        size: 100,
        advanced: 0.0,
    };

    let (stream, handle) = ScriptedStream::new(|message| match message {
        Message::Publish { msg, .. } if msg.value() == "OBJClear:OBJClear" => {
            vec!["OBJCleared".to_string()]
        }
        _ => vec![],
    });

    let timeouts = Timeouts {
        metadata: Duration::from_millis(50),
        ..Default::default()
    };

    let mut driver = SessionBuilder::new()
        .artifacts(artifacts)
        .timeouts(timeouts)
        .build(stream, generator, RenamePostprocessor);

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { ref waiting_for, .. } if waiting_for == "MTLReceived"));
    assert_eq!(driver.generator().advanced, 0.0);

    let last = handle.sent().pop().unwrap();
    assert!(matches!(last, Message::Publish { ref msg, .. } if msg.value().starts_with("MTLData:")));
}
