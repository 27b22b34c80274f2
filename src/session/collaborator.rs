//! Seams to the generation engine and the mesh post-processor.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use crate::error::{BridgeError, Result};

/// Boxed future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The procedural generation engine.
pub trait MeshGenerator {
    /// Write the current state as a mesh file at `path`.
    ///
    /// A material library may be written alongside it.
    fn export_mesh(&mut self, path: &Path) -> Result<()>;

    /// Advance the engine's internal time by `amount` units.
    fn advance(&mut self, amount: f32) -> Result<()>;
}

/// A step that turns the exported mesh into the one that is sent.
pub trait Postprocessor {
    /// Read `input`, write `output`.
    ///
    /// Completion of the returned future does not guarantee `output` is
    /// visible yet; the driver polls for it separately.
    fn run<'a>(&'a mut self, input: &'a Path, output: &'a Path) -> BoxFuture<'a, Result<()>>;
}

/// Placeholder replaced by the input path in command arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Placeholder replaced by the output path in command arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs an external program as the post-processing step.
///
/// Arguments may contain `{input}` and `{output}`, which are replaced with
/// the paths passed to [`Postprocessor::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPostprocessor {
    program: String,
    args: Vec<String>,
}

impl CommandPostprocessor {
    /// Create a post-processor running `program` with `args`.
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with both placeholders substituted.
    pub fn resolved_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

impl Default for CommandPostprocessor {
    /// `python3 preprocess_mesh.py --input_obj {input} --output_obj {output}`
    fn default() -> Self {
        Self::new(
            "python3",
            [
                "preprocess_mesh.py",
                "--input_obj",
                INPUT_PLACEHOLDER,
                "--output_obj",
                OUTPUT_PLACEHOLDER,
            ],
        )
    }
}

impl Postprocessor for CommandPostprocessor {
    fn run<'a>(&'a mut self, input: &'a Path, output: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let args = self.resolved_args(input, output);
            tracing::info!(program = %self.program, ?args, "Running post-processor");

            let mut cmd = tokio::process::Command::new(&self.program);
            cmd.args(&args)
                .stdin(Stdio::null())
                .kill_on_drop(true);

            let status = cmd.status().await.map_err(|e| {
                BridgeError::Collaborator(format!("failed to spawn {}: {e}", self.program))
            })?;

            if !status.success() {
                return Err(BridgeError::Collaborator(format!(
                    "{} exited with {status}",
                    self.program
                )));
            }
            Ok(())
        })
    }
}
