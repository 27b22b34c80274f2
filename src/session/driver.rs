//! The iteration protocol on top of one bridge connection.
//!
//! Every iteration runs these steps in order, each gated on its reply:
//!
//! 1. publish the clear marker, await "cleared"
//! 2. export, post-process and wait for the processed mesh
//! 3. send the material library single-shot, await its ack
//! 4. send the processed mesh in acked chunks, then the completion marker
//! 5. advance the generator
//! 6. await the next-stage signal
//!
//! Any failure ends the session.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use super::collaborator::{MeshGenerator, Postprocessor};
use super::config::SessionConfig;
use crate::artifact::wait_for_artifact;
use crate::error::Result;
use crate::protocol::Message;
use crate::transfer::ChunkedTransfer;
use crate::transport::Connection;

/// What one iteration sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Zero-based iteration index.
    pub index: u32,
    /// Bytes of the material library.
    pub metadata_bytes: usize,
    /// Bytes of the processed mesh.
    pub mesh_bytes: usize,
    /// Mesh chunks acknowledged.
    pub chunks: usize,
    /// Time spent waiting for the processed mesh.
    pub artifact_wait: Duration,
}

/// What a whole session sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// One entry per completed iteration.
    pub iterations: Vec<IterationReport>,
}

impl SessionReport {
    /// Total mesh chunks over all iterations.
    pub fn total_chunks(&self) -> usize {
        self.iterations.iter().map(|it| it.chunks).sum()
    }
}

/// Drives the iteration protocol. Owns the connection exclusively.
pub struct SessionDriver<S, G, P> {
    conn: Connection<S>,
    config: SessionConfig,
    generator: G,
    postprocessor: P,
}

impl<S, G, P> SessionDriver<S, G, P>
where
    S: AsyncRead + AsyncWrite + Unpin,
    G: MeshGenerator,
    P: Postprocessor,
{
    /// Create a driver. See [`SessionBuilder`](super::SessionBuilder).
    pub fn new(conn: Connection<S>, config: SessionConfig, generator: G, postprocessor: P) -> Self {
        Self {
            conn,
            config,
            generator,
            postprocessor,
        }
    }

    /// Advertise the command topic and subscribe to the reply topics.
    pub async fn announce(&mut self) -> Result<()> {
        let advertise = Message::advertise(&self.config.command_topic, &self.config.command_type);
        self.conn.send(&advertise).await?;

        for sub in &self.config.subscriptions {
            let subscribe = Message::subscribe(&sub.topic, sub.msg_type.clone());
            self.conn.send(&subscribe).await?;
        }

        tracing::info!(
            topic = %self.config.command_topic,
            subscriptions = self.config.subscriptions.len(),
            "Announced"
        );
        Ok(())
    }

    /// Unsubscribe from every reply topic.
    pub async fn retire(&mut self) -> Result<()> {
        for sub in &self.config.subscriptions {
            self.conn.send(&Message::unsubscribe(&sub.topic)).await?;
        }
        tracing::info!("Retired");
        Ok(())
    }

    /// Run one iteration of the protocol.
    pub async fn run_iteration(&mut self, index: u32) -> Result<IterationReport> {
        let mut report = IterationReport {
            index,
            ..Default::default()
        };

        // 1. clear
        let markers = &self.config.markers;
        let timeouts = &self.config.timeouts;
        self.conn
            .send(&Message::publish(&self.config.command_topic, markers.clear.as_str()))
            .await?;
        self.conn.read_until(&markers.cleared, timeouts.clear).await?;
        tracing::info!(iteration = index, "Scene cleared");

        // 2. export and post-process
        report.artifact_wait = self.prepare_mesh().await?;
        let markers = &self.config.markers;
        let timeouts = &self.config.timeouts;

        // 3. metadata
        let metadata = read_artifact(&self.config.artifacts.metadata).await?;
        report.metadata_bytes = metadata.len();
        ChunkedTransfer::new(
            &self.config.command_topic,
            &markers.metadata_prefix,
            &markers.metadata_ack,
        )
        .chunk_timeout(timeouts.metadata)
        .send_single(&mut self.conn, metadata)
        .await?;
        tracing::info!(iteration = index, bytes = report.metadata_bytes, "Metadata sent");

        // 4. mesh
        let mesh = read_artifact(&self.config.artifacts.processed).await?;
        report.mesh_bytes = mesh.len();
        let transfer = ChunkedTransfer::new(
            &self.config.command_topic,
            &markers.chunk_prefix,
            &markers.chunk_ack,
        )
        .chunk_size(self.config.chunk_size)
        .chunk_timeout(timeouts.chunk)
        .completion(&markers.finished, &markers.finished_ack, timeouts.completion);
        report.chunks = transfer.send(&mut self.conn, mesh).await?.chunks;
        tracing::info!(iteration = index, bytes = report.mesh_bytes, chunks = report.chunks, "Mesh sent");

        // 5. advance
        self.generator.advance(self.config.advance_amount)?;

        // 6. next stage
        self.conn
            .read_until(&markers.next_stage, timeouts.next_stage)
            .await?;
        tracing::info!(iteration = index, "Next stage signalled");

        Ok(report)
    }

    /// Announce, run every iteration, retire.
    ///
    /// Stops at the first error.
    pub async fn run(&mut self) -> Result<SessionReport> {
        self.announce().await?;

        let mut report = SessionReport::default();
        for index in 0..self.config.iterations {
            report.iterations.push(self.run_iteration(index).await?);
        }

        self.retire().await?;
        tracing::info!(iterations = report.iterations.len(), chunks = report.total_chunks(), "Session complete");
        Ok(report)
    }

    /// [`run`](Self::run), terminating the process with status 1 on error.
    pub async fn run_or_exit(&mut self) -> SessionReport {
        match self.run().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Session aborted: {}", e);
                eprintln!("Session aborted: {e}");
                std::process::exit(1);
            }
        }
    }

    /// Produce the processed mesh for this iteration.
    async fn prepare_mesh(&mut self) -> Result<Duration> {
        let paths = &self.config.artifacts;

        match tokio::fs::remove_file(&paths.processed).await {
            Ok(()) => tracing::debug!(path = %paths.processed.display(), "Removed stale artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.generator.export_mesh(&paths.export)?;
        self.postprocessor
            .run(&paths.export, &paths.processed)
            .await?;

        let waited = wait_for_artifact(&paths.processed, &self.config.poll).await?;
        tracing::info!(path = %paths.processed.display(), ?waited, "Mesh processed");
        Ok(waited)
    }

    /// Configuration in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The generation engine.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// The bridge connection.
    pub fn connection(&self) -> &Connection<S> {
        &self.conn
    }
}

async fn read_artifact(path: &Path) -> Result<Bytes> {
    let data = tokio::fs::read(path).await?;
    tracing::debug!(path = %path.display(), len = data.len(), "Read artifact");
    Ok(Bytes::from(data))
}
