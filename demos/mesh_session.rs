//! Mesh Session - push a growing mesh to a bridge for N iterations.
//!
//! This demo:
//! - Connects to a BSON-over-TCP bridge (rosbridge `bson_only_mode`)
//! - Stands in for a procedural generator with a box that grows each stage
//! - Runs the configured post-processor, then streams the mesh in acked chunks
//!
//! # Running
//!
//! ```bash
//! cargo run --example mesh_session -- --addr 127.0.0.1:9090 --iterations 3
//!
//! # Skip the python post-processor and send the export as-is
//! cargo run --example mesh_session -- --postprocess cp --postprocess-arg {input} --postprocess-arg {output}
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bridgewire_client::session::{ArtifactPaths, CommandPostprocessor, MeshGenerator, SessionBuilder};
use bridgewire_client::{BridgeError, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Push procedurally generated meshes through a bridge.
#[derive(Parser, Debug)]
#[command(name = "mesh_session")]
#[command(version)]
struct Args {
    /// Bridge address
    #[arg(short, long, default_value = "127.0.0.1:9090")]
    addr: String,

    /// Iterations to run
    #[arg(short, long, default_value_t = 10)]
    iterations: u32,

    /// Generator advance per iteration
    #[arg(long, default_value_t = 7.0)]
    advance: f32,

    /// Directory for the exported and processed meshes
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Post-processor program; defaults to the python mesh merger
    #[arg(long)]
    postprocess: Option<String>,

    /// Post-processor argument (repeatable; `{input}`/`{output}` are substituted)
    #[arg(long = "postprocess-arg")]
    postprocess_args: Vec<String>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Writes a box whose height tracks the generator's age.
struct GrowingBox {
    age: f32,
    metadata: PathBuf,
}

impl GrowingBox {
    fn obj(&self) -> String {
        let h = 0.1 * self.age;
        let mut out = String::from("mtllib test.mtl\no stem\nusemtl stem\n");
        for (x, y, z) in [
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 1.0, 0.0),
            (0.0, 0.0, h),
            (1.0, 0.0, h),
            (1.0, 1.0, h),
            (0.0, 1.0, h),
        ] {
            let _ = writeln!(out, "v {x:.3} {y:.3} {z:.3}");
        }
        for face in [
            [1, 2, 3, 4],
            [5, 8, 7, 6],
            [1, 5, 6, 2],
            [2, 6, 7, 3],
            [3, 7, 8, 4],
            [4, 8, 5, 1],
        ] {
            let _ = writeln!(out, "f {} {} {} {}", face[0], face[1], face[2], face[3]);
        }
        out
    }
}

impl MeshGenerator for GrowingBox {
    fn export_mesh(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, self.obj())?;
        std::fs::write(&self.metadata, "newmtl stem\nKd 0.20 0.55 0.10\n")?;
        Ok(())
    }

    fn advance(&mut self, amount: f32) -> Result<()> {
        if !amount.is_finite() {
            return Err(BridgeError::Collaborator(format!("invalid advance {amount}")));
        }
        self.age += amount;
        tracing::info!(age = self.age, "Generator advanced");
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with_target(false)
        .init();

    let artifacts = ArtifactPaths::in_dir(&args.workdir);
    let generator = GrowingBox {
        age: 0.0,
        metadata: artifacts.metadata.clone(),
    };
    let postprocessor = match args.postprocess {
        Some(program) => CommandPostprocessor::new(program, args.postprocess_args),
        None => CommandPostprocessor::default(),
    };

    let mut driver = SessionBuilder::new()
        .iterations(args.iterations)
        .advance_amount(args.advance)
        .artifacts(artifacts)
        .connect(args.addr.as_str(), generator, postprocessor)
        .await?;

    let report = driver.run_or_exit().await;
    tracing::info!(
        iterations = report.iterations.len(),
        chunks = report.total_chunks(),
        "Done"
    );
    Ok(())
}
