//! ExternalProcessWork - runs an external helper executable as a task.
//!
//! The helper is invoked as `program <input> <input><suffix>`. The input path
//! is written from the owning thread and read by the worker, so it lives
//! behind a [`SharedPath`] (reader/writer lock) instead of being marshaled as
//! a request.
//!
//! A helper that cannot be launched or exits abnormally is logged and turned
//! into [`TaskError`]; the task still completes and returns to idle.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::{Arc, PoisonError, RwLock};

use super::{RunContext, TaskError, TaskWork};

/// Suffix appended to the input path to name the helper's output.
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".xml.gz";

/// Path field shared between the owning thread and a worker.
///
/// Thread-safe: reads and writes take the lock.
#[derive(Clone, Debug, Default)]
pub struct SharedPath(Arc<RwLock<PathBuf>>);

impl SharedPath {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(Arc::new(RwLock::new(path.into())))
  }

  pub fn set(&self, path: impl Into<PathBuf>) {
    *self.0.write().unwrap_or_else(PoisonError::into_inner) = path.into();
  }

  pub fn get(&self) -> PathBuf {
    self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

/// Result of a successful helper run.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
  /// Path the helper was asked to write.
  pub output_file: PathBuf,
  pub status: ExitStatus,
}

/// Task work that runs one external helper per run.
pub struct ExternalProcessWork {
  program: PathBuf,
  input_file: SharedPath,
  output_suffix: String,
}

impl ExternalProcessWork {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      input_file: SharedPath::default(),
      output_suffix: DEFAULT_OUTPUT_SUFFIX.to_owned(),
    }
  }

  /// Use a different output suffix.
  pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.output_suffix = suffix.into();
    self
  }

  /// Handle for setting the input file from the owning thread.
  pub fn input_file(&self) -> SharedPath {
    self.input_file.clone()
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  /// Output path for the current input, or `None` if the helper has not
  /// produced it.
  pub fn output_file(&self) -> Option<PathBuf> {
    let output = output_path(&self.input_file.get(), &self.output_suffix);
    output.exists().then_some(output)
  }
}

impl TaskWork for ExternalProcessWork {
  type Output = ProcessOutput;

  #[tracing::instrument(skip_all, name = "task::external_process")]
  fn run(&mut self, ctx: &RunContext<'_>) -> Result<ProcessOutput, TaskError> {
    let input = self.input_file.get();
    if input.as_os_str().is_empty() {
      return Err(TaskError::Failed("no input file set".to_owned()));
    }
    let output_file = output_path(&input, &self.output_suffix);

    ctx.checkpoint()?;

    let output = Command::new(&self.program)
      .arg(&input)
      .arg(&output_file)
      .output()
      .map_err(|source| {
        tracing::error!(
          program = %self.program.display(),
          error = %source,
          "helper failed to launch"
        );
        TaskError::ProcessLaunch {
          program: self.program.clone(),
          source,
        }
      })?;

    if !output.status.success() {
      tracing::error!(
        program = %self.program.display(),
        status = %output.status,
        stderr = %String::from_utf8_lossy(&output.stderr),
        "helper exited abnormally"
      );
      return Err(TaskError::ProcessExit {
        program: self.program.clone(),
        status: output.status,
      });
    }

    tracing::debug!(output = %output_file.display(), "helper finished");
    Ok(ProcessOutput {
      output_file,
      status: output.status,
    })
  }
}

fn output_path(input: &Path, suffix: &str) -> PathBuf {
  let mut name = OsString::from(input.as_os_str());
  name.push(suffix);
  PathBuf::from(name)
}
