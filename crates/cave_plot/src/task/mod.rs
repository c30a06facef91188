//! Cancellable, restartable background tasks.
//!
//! ```text
//! Owner thread                          Worker thread (FIFO)
//! ┌────────────────────┐
//! │ post(set inputs)   │──► request queue
//! │ start()/restart()  │──────────────────► ┌──────────────────────┐
//! └────────────────────┘                    │ apply queued requests│
//!                                           │ work.run(ctx)        │
//!                                           │  ├─ ctx.checkpoint()?│
//!                                           │  └─ ctx.advance()    │──► Progress
//!                                           └──────────┬───────────┘
//!                                                      │ Finished / Stopped / Failed
//! ┌────────────────────┐                               │
//! │ poll_events()      │◄──────────────────────────────┘
//! └────────────────────┘   rerun pending? → requeue on the worker
//! ```
//!
//! A [`Task`] owns its [`TaskWork`] and a handle to the worker it runs on.
//! All state transitions happen under one lock, which also guards the single
//! pending-rerun flag: any number of `restart()` calls made during a run
//! collapse into exactly one extra run.

pub mod handle;
pub mod process;
pub mod types;

pub use handle::Task;
pub use process::{ExternalProcessWork, ProcessOutput, SharedPath};
pub use types::{RunContext, RunId, TaskError, TaskEvent, TaskState};

/// The work a [`Task`] performs on its worker.
///
/// `run` is called once per run with exclusive access to the work; inputs are
/// delivered beforehand through [`Task::post`].
pub trait TaskWork: Send + 'static {
  /// Result published when a run finishes.
  type Output: Send + 'static;

  /// Execute one run. Return `Err(TaskError::Cancelled)` (usually via
  /// `ctx.checkpoint()?`) to stop early without publishing anything.
  fn run(&mut self, ctx: &RunContext<'_>) -> Result<Self::Output, TaskError>;
}

/// Adapter turning a closure into [`TaskWork`].
pub struct FnWork<F>(pub F);

impl<F, T> TaskWork for FnWork<F>
where
  F: FnMut(&RunContext<'_>) -> Result<T, TaskError> + Send + 'static,
  T: Send + 'static,
{
  type Output = T;

  fn run(&mut self, ctx: &RunContext<'_>) -> Result<T, TaskError> {
    (self.0)(ctx)
  }
}
