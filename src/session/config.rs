//! Session configuration and builder.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::collaborator::{MeshGenerator, Postprocessor};
use super::driver::SessionDriver;
use crate::artifact::PollConfig;
use crate::error::Result;
use crate::transfer::DEFAULT_CHUNK_SIZE;
use crate::transport::{connect_with_config, Connection, ConnectionConfig, FramingMode};

/// Default command topic.
pub const DEFAULT_COMMAND_TOPIC: &str = "/ue5/game_commands";

/// Default reply topic.
pub const DEFAULT_REPLY_TOPIC: &str = "/ue5/LoadModel";

/// Default message type for both topics.
pub const DEFAULT_MESSAGE_TYPE: &str = "std_msgs/String";

/// Default number of iterations per session.
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Default generator advance per iteration.
pub const DEFAULT_ADVANCE_AMOUNT: f32 = 7.0;

/// Text markers exchanged with the bridge's consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlMarkers {
    /// Published to reset the consumer's scene.
    pub clear: String,
    /// Reply to `clear`.
    pub cleared: String,
    /// Prefix of the metadata message.
    pub metadata_prefix: String,
    /// Reply to the metadata message.
    pub metadata_ack: String,
    /// Prefix of each mesh chunk.
    pub chunk_prefix: String,
    /// Reply to each mesh chunk.
    pub chunk_ack: String,
    /// Published after the last chunk.
    pub finished: String,
    /// Reply to `finished`.
    pub finished_ack: String,
    /// Announces that the next generation stage may start.
    pub next_stage: String,
}

impl Default for ControlMarkers {
    fn default() -> Self {
        Self {
            clear: "OBJClear:OBJClear".to_string(),
            cleared: "OBJCleared".to_string(),
            metadata_prefix: "MTLData:".to_string(),
            metadata_ack: "MTLReceived".to_string(),
            chunk_prefix: "OBJData:".to_string(),
            chunk_ack: "OBJReceived".to_string(),
            finished: "OBJFinished:OBJFinished".to_string(),
            finished_ack: "true".to_string(),
            next_stage: "NextAge".to_string(),
        }
    }
}

/// Per-wait deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Wait for the cleared reply.
    pub clear: Duration,
    /// Wait for the metadata ack.
    pub metadata: Duration,
    /// Wait for each chunk ack.
    pub chunk: Duration,
    /// Wait for the completion ack.
    pub completion: Duration,
    /// Wait for the next-stage signal.
    pub next_stage: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            clear: Duration::from_secs(5),
            metadata: Duration::from_secs(5),
            chunk: Duration::from_secs(5),
            completion: Duration::from_secs(1),
            next_stage: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Files exchanged with the generator and post-processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Raw mesh written by the generator.
    pub export: PathBuf,
    /// Material library written next to the export.
    pub metadata: PathBuf,
    /// Mesh produced by the post-processor.
    pub processed: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            export: PathBuf::from("test.obj"),
            metadata: PathBuf::from("test.mtl"),
            processed: PathBuf::from("test_merge.obj"),
        }
    }
}

impl ArtifactPaths {
    /// Resolve every path against `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let defaults = Self::default();
        Self {
            export: dir.join(defaults.export),
            metadata: dir.join(defaults.metadata),
            processed: dir.join(defaults.processed),
        }
    }
}

/// A topic to subscribe to on announce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Topic name.
    pub topic: String,
    /// Message type, if the bridge needs one.
    #[serde(default, rename = "type")]
    pub msg_type: Option<String>,
}

impl Subscription {
    /// Subscription with an explicit type.
    pub fn typed(topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            msg_type: Some(msg_type.into()),
        }
    }
}

/// Everything a [`SessionDriver`] needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Topic all commands and payloads are published on.
    pub command_topic: String,
    /// Message type advertised for the command topic.
    pub command_type: String,
    /// Reply topics.
    pub subscriptions: Vec<Subscription>,
    /// Iterations to run.
    pub iterations: u32,
    /// Generator advance after each iteration.
    pub advance_amount: f32,
    /// Mesh chunk size in bytes.
    pub chunk_size: usize,
    /// Control markers.
    pub markers: ControlMarkers,
    /// Wait deadlines.
    pub timeouts: Timeouts,
    /// Artifact locations.
    pub artifacts: ArtifactPaths,
    /// Processed-artifact polling.
    pub poll: PollConfig,
    /// Connection tunables.
    pub connection: ConnectionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_topic: DEFAULT_COMMAND_TOPIC.to_string(),
            command_type: DEFAULT_MESSAGE_TYPE.to_string(),
            subscriptions: vec![Subscription::typed(DEFAULT_REPLY_TOPIC, DEFAULT_MESSAGE_TYPE)],
            iterations: DEFAULT_ITERATIONS,
            advance_amount: DEFAULT_ADVANCE_AMOUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            markers: ControlMarkers::default(),
            timeouts: Timeouts::default(),
            artifacts: ArtifactPaths::default(),
            poll: PollConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

/// Fluent builder for a [`SessionDriver`].
///
/// # Example
///
/// ```ignore
/// use bridgewire_client::session::{CommandPostprocessor, SessionBuilder};
///
/// let mut driver = SessionBuilder::new()
///     .iterations(3)
///     .connect("127.0.0.1:9090", generator, CommandPostprocessor::default())
///     .await?;
/// driver.run_or_exit().await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Set the command topic and its advertised type.
    pub fn command_topic(mut self, topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        self.config.command_topic = topic.into();
        self.config.command_type = msg_type.into();
        self
    }

    /// Add a reply topic to subscribe to.
    pub fn subscribe(mut self, topic: impl Into<String>, msg_type: Option<String>) -> Self {
        self.config.subscriptions.push(Subscription {
            topic: topic.into(),
            msg_type,
        });
        self
    }

    /// Drop all reply subscriptions, including the default one.
    pub fn clear_subscriptions(mut self) -> Self {
        self.config.subscriptions.clear();
        self
    }

    /// Set the iteration count.
    ///
    /// Default: 10
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Set the generator advance per iteration.
    ///
    /// Default: 7.0
    pub fn advance_amount(mut self, amount: f32) -> Self {
        self.config.advance_amount = amount;
        self
    }

    /// Set the mesh chunk size.
    ///
    /// Default: 64 KiB
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size.max(1);
        self
    }

    /// Replace the control markers.
    pub fn markers(mut self, markers: ControlMarkers) -> Self {
        self.config.markers = markers;
        self
    }

    /// Replace the wait deadlines.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Replace the artifact paths.
    pub fn artifacts(mut self, artifacts: ArtifactPaths) -> Self {
        self.config.artifacts = artifacts;
        self
    }

    /// Set the processed-artifact polling schedule.
    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.config.poll = poll;
        self
    }

    /// Set how inbound bytes are framed.
    ///
    /// Default: [`FramingMode::Reassemble`]
    pub fn framing(mut self, framing: FramingMode) -> Self {
        self.config.connection.framing = framing;
        self
    }

    /// Set the working read buffer size.
    ///
    /// Default: 64 KiB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.connection.read_buffer_size = size;
        self
    }

    /// Configuration built so far.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build a driver over an already open stream.
    pub fn build<S, G, P>(self, stream: S, generator: G, postprocessor: P) -> SessionDriver<S, G, P>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        G: MeshGenerator,
        P: Postprocessor,
    {
        let conn = Connection::with_config(stream, &self.config.connection);
        SessionDriver::new(conn, self.config, generator, postprocessor)
    }

    /// Connect to the bridge over TCP and build a driver.
    pub async fn connect<A, G, P>(
        self,
        addr: A,
        generator: G,
        postprocessor: P,
    ) -> Result<SessionDriver<TcpStream, G, P>>
    where
        A: ToSocketAddrs,
        G: MeshGenerator,
        P: Postprocessor,
    {
        let conn = connect_with_config(addr, &self.config.connection).await?;
        Ok(SessionDriver::new(conn, self.config, generator, postprocessor))
    }
}
