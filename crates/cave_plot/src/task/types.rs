//! Task state, events, errors and the context handed to running work.

use std::cell::Cell;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-task run counter. Increases by one for every run, reruns included.
pub type RunId = u64;

// =============================================================================
// TaskState
// =============================================================================

/// Lifecycle of a task.
///
/// ```text
///          start()/restart()           finished, no rerun
///   Idle ────────────────────► Running ───────────────────► Idle
///    ▲                           │  ▲
///    │                    stop() │  └── finished + rerun pending
///    │                           ▼       (flag cleared, runs again)
///    └──────────────────────── Stopping
///         worker hits a checkpoint
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
  Idle,
  Running,
  Stopping,
}

// =============================================================================
// TaskEvent - worker → owner notifications
// =============================================================================

/// Notification sent from the worker back to the task's owner.
///
/// Exactly one terminal event (`Finished`, `Stopped` or `Failed`) is sent per
/// run, always before the next run of the same task begins.
#[derive(Debug)]
pub enum TaskEvent<T> {
  /// A run began executing on the worker.
  Started { run: RunId },

  /// Intermediate progress reported by the work.
  Progress { run: RunId, done: usize, total: usize },

  /// The run completed and published its output.
  Finished { run: RunId, output: T },

  /// The run was cancelled; partial output was discarded.
  Stopped { run: RunId },

  /// The run ended with an error.
  Failed { run: RunId, error: TaskError },
}

impl<T> TaskEvent<T> {
  /// Run this event belongs to.
  pub fn run(&self) -> RunId {
    match self {
      TaskEvent::Started { run }
      | TaskEvent::Progress { run, .. }
      | TaskEvent::Finished { run, .. }
      | TaskEvent::Stopped { run }
      | TaskEvent::Failed { run, .. } => *run,
    }
  }

  /// True for the events that end a run.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      TaskEvent::Finished { .. } | TaskEvent::Stopped { .. } | TaskEvent::Failed { .. }
    )
  }
}

// =============================================================================
// TaskError
// =============================================================================

/// Errors produced by tasks and the worker framework.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
  #[error("task was cancelled")]
  Cancelled,

  #[error("task is running; stop it before reassigning its worker")]
  Busy,

  #[error("failed to start worker thread: {0}")]
  WorkerSpawn(String),

  #[error("failed to launch {}: {source}", .program.display())]
  ProcessLaunch {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{} exited abnormally: {status}", .program.display())]
  ProcessExit { program: PathBuf, status: ExitStatus },

  #[error("recompute source is gone")]
  SourceGone,

  #[error("task failed: {0}")]
  Failed(String),
}

// =============================================================================
// RunContext
// =============================================================================

/// Handle given to [`TaskWork::run`](super::TaskWork::run) for cooperative
/// cancellation and progress reporting.
pub struct RunContext<'a> {
  run: RunId,
  cancel: &'a AtomicBool,
  report: &'a dyn Fn(RunId, usize, usize),
  total: Cell<usize>,
  done: Cell<usize>,
}

impl<'a> RunContext<'a> {
  pub(crate) fn new(
    run: RunId,
    cancel: &'a AtomicBool,
    report: &'a dyn Fn(RunId, usize, usize),
  ) -> Self {
    Self {
      run,
      cancel,
      report,
      total: Cell::new(0),
      done: Cell::new(0),
    }
  }

  /// Id of the current run.
  pub fn run(&self) -> RunId {
    self.run
  }

  /// True once `stop()` has been requested.
  pub fn is_cancelled(&self) -> bool {
    self.cancel.load(Ordering::Acquire)
  }

  /// Cancellation checkpoint. Returns `Err(Cancelled)` once a stop was
  /// requested, so work can bail out with `?`.
  pub fn checkpoint(&self) -> Result<(), TaskError> {
    if self.is_cancelled() {
      Err(TaskError::Cancelled)
    } else {
      Ok(())
    }
  }

  /// Set the number of progress steps and reset progress to zero.
  pub fn set_steps(&self, total: usize) {
    self.total.set(total);
    self.set_progress(0);
  }

  /// Report absolute progress.
  pub fn set_progress(&self, done: usize) {
    self.done.set(done);
    (self.report)(self.run, done, self.total.get());
  }

  /// Advance progress by one step.
  pub fn advance(&self) {
    self.set_progress(self.done.get() + 1);
  }
}
