//! Task - state machine, thread affinity and coalesced reruns.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{self as channel, Receiver, Sender};
use web_time::Instant;

use super::types::{RunContext, RunId, TaskError, TaskEvent, TaskState};
use super::TaskWork;
use crate::threading::WorkerThread;

/// Input setter marshaled onto the worker.
type Request<W> = Box<dyn FnOnce(&mut W) + Send>;

/// Fields guarded by the state lock.
struct Control {
  state: TaskState,
  rerun: bool,
  /// A rerun job sits in the worker queue and has not begun yet.
  rerun_queued: bool,
  last_run: RunId,
  last_elapsed: Option<Duration>,
}

/// State shared between the owner and the worker.
struct Shared<W: TaskWork> {
  name: String,
  control: Mutex<Control>,
  idle: Condvar,
  cancel: AtomicBool,
  work: Mutex<W>,
  requests: Mutex<Vec<Request<W>>>,
  events: Sender<TaskEvent<W::Output>>,
}

impl<W: TaskWork> Shared<W> {
  fn control(&self) -> MutexGuard<'_, Control> {
    self.control.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn take_requests(&self) -> Vec<Request<W>> {
    std::mem::take(&mut *self.requests.lock().unwrap_or_else(PoisonError::into_inner))
  }

  fn send(&self, event: TaskEvent<W::Output>) {
    // Receiver dropped = owner gone, nobody left to notify.
    let _ = self.events.send(event);
  }
}

/// A cancellable, restartable unit of background work bound to one worker.
///
/// `start`, `restart` and `post` never block. `stop` blocks until the worker
/// acknowledges and the task is back to [`TaskState::Idle`]. Dropping a task
/// stops it.
pub struct Task<W: TaskWork> {
  shared: Arc<Shared<W>>,
  worker: WorkerThread,
  events: Receiver<TaskEvent<W::Output>>,
}

impl<W: TaskWork> Task<W> {
  /// Create an idle task that will run `work` on `worker`.
  pub fn new(name: impl Into<String>, work: W, worker: WorkerThread) -> Self {
    let (sender, receiver) = channel::unbounded();
    Self {
      shared: Arc::new(Shared {
        name: name.into(),
        control: Mutex::new(Control {
          state: TaskState::Idle,
          rerun: false,
          rerun_queued: false,
          last_run: 0,
          last_elapsed: None,
        }),
        idle: Condvar::new(),
        cancel: AtomicBool::new(false),
        work: Mutex::new(work),
        requests: Mutex::new(Vec::new()),
        events: sender,
      }),
      worker,
      events: receiver,
    }
  }

  pub fn name(&self) -> &str {
    &self.shared.name
  }

  pub fn state(&self) -> TaskState {
    self.shared.control().state
  }

  /// True while a run is in flight (running or stopping).
  pub fn is_running(&self) -> bool {
    self.state() != TaskState::Idle
  }

  /// True when idle with no rerun pending.
  pub fn is_ready(&self) -> bool {
    let control = self.shared.control();
    control.state == TaskState::Idle && !control.rerun
  }

  pub fn rerun_pending(&self) -> bool {
    self.shared.control().rerun
  }

  /// Id of the most recent run, 0 before the first.
  pub fn last_run(&self) -> RunId {
    self.shared.control().last_run
  }

  /// Wall time of the most recently ended run, measured on the worker.
  pub fn last_run_duration(&self) -> Option<Duration> {
    self.shared.control().last_elapsed
  }

  /// Start a run if idle. Returns `false` (and does nothing) otherwise.
  pub fn start(&self) -> bool {
    let mut control = self.shared.control();
    if control.state != TaskState::Idle {
      tracing::trace!(task = %self.shared.name, state = ?control.state, "start ignored");
      return false;
    }
    self.launch(&mut control);
    true
  }

  /// Start if idle, otherwise request one more run after the current one.
  ///
  /// Requests made during a run coalesce into a single rerun.
  pub fn restart(&self) {
    let mut control = self.shared.control();
    match control.state {
      TaskState::Idle => self.launch(&mut control),
      // The queued rerun has not taken its requests yet.
      TaskState::Running if control.rerun_queued => {}
      TaskState::Running => {
        if !control.rerun {
          tracing::debug!(task = %self.shared.name, "rerun queued");
        }
        control.rerun = true;
      }
      TaskState::Stopping => {
        tracing::trace!(task = %self.shared.name, "restart ignored while stopping");
      }
    }
  }

  /// Ask the current run to exit at its next checkpoint and wait until the
  /// task is idle. Clears any pending rerun.
  ///
  /// When called from the task's own worker thread the request is recorded
  /// but not waited for, since the worker could never reach idle.
  pub fn stop(&self) {
    let mut control = self.shared.control();
    if control.state == TaskState::Idle {
      return;
    }

    control.state = TaskState::Stopping;
    control.rerun = false;
    self.shared.cancel.store(true, Ordering::Release);
    tracing::debug!(task = %self.shared.name, "stop requested");

    if self.worker.is_current() {
      return;
    }

    while control.state != TaskState::Idle {
      control = self
        .shared
        .idle
        .wait(control)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }

  /// Bind the task to another worker. Takes effect on the next start.
  pub fn set_thread(&mut self, worker: WorkerThread) -> Result<(), TaskError> {
    if self.is_running() {
      return Err(TaskError::Busy);
    }
    self.worker = worker;
    Ok(())
  }

  /// Worker the task runs on.
  pub fn thread(&self) -> &WorkerThread {
    &self.worker
  }

  /// Queue a request to run on the worker, with exclusive access to the
  /// work, right before the next run starts.
  pub fn post<F>(&self, request: F)
  where
    F: FnOnce(&mut W) + Send + 'static,
  {
    self
      .shared
      .requests
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(Box::new(request));
  }

  /// Drain every event delivered so far (non-blocking).
  pub fn poll_events(&self) -> Vec<TaskEvent<W::Output>> {
    self.events.try_iter().collect()
  }

  /// Wait up to `timeout` for the next event.
  pub fn recv_event_timeout(&self, timeout: Duration) -> Option<TaskEvent<W::Output>> {
    self.events.recv_timeout(timeout).ok()
  }

  fn launch(&self, control: &mut Control) {
    control.state = TaskState::Running;
    control.rerun = false;
    self.shared.cancel.store(false, Ordering::Release);

    let shared = Arc::clone(&self.shared);
    let worker = self.worker.clone();
    self.worker.spawn(move || run_once(shared, worker));
  }
}

impl<W: TaskWork> Drop for Task<W> {
  fn drop(&mut self) {
    self.stop();
  }
}

impl<W: TaskWork> fmt::Debug for Task<W> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let control = self.shared.control();
    f.debug_struct("Task")
      .field("name", &self.shared.name)
      .field("state", &control.state)
      .field("rerun", &control.rerun)
      .field("worker", &self.worker)
      .finish()
  }
}

// =============================================================================
// Worker side
// =============================================================================

/// Body of one worker job. A pending rerun is queued as a fresh job behind
/// whatever else was started on the worker meanwhile.
fn run_once<W: TaskWork>(shared: Arc<Shared<W>>, worker: WorkerThread) {
  let (run, requests) = {
    let mut control = shared.control();
    control.rerun_queued = false;
    control.last_run += 1;
    (control.last_run, shared.take_requests())
  };
  let started_at = Instant::now();

  let result = {
    let mut work = shared.work.lock().unwrap_or_else(PoisonError::into_inner);
    panic::catch_unwind(AssertUnwindSafe(|| {
      for request in requests {
        request(&mut work);
      }
      if shared.cancel.load(Ordering::Acquire) {
        return Err(TaskError::Cancelled);
      }

      shared.send(TaskEvent::Started { run });
      tracing::debug!(task = %shared.name, run, "run started");

      let report = |run, done, total| shared.send(TaskEvent::Progress { run, done, total });
      let ctx = RunContext::new(run, &shared.cancel, &report);
      work.run(&ctx)
    }))
    .unwrap_or_else(|payload| Err(TaskError::Failed(panic_message(payload))))
  };

  let mut control = shared.control();
  let stopping = control.state == TaskState::Stopping;
  control.last_elapsed = Some(started_at.elapsed());

  match result {
    Ok(output) if !stopping => {
      tracing::debug!(task = %shared.name, run, "run finished");
      shared.send(TaskEvent::Finished { run, output });
    }
    Ok(_) | Err(TaskError::Cancelled) => {
      tracing::debug!(task = %shared.name, run, "run stopped");
      shared.send(TaskEvent::Stopped { run });
    }
    Err(error) => {
      tracing::warn!(task = %shared.name, run, %error, "run failed");
      shared.send(TaskEvent::Failed { run, error });
    }
  }

  if !stopping && control.rerun {
    control.rerun = false;
    control.rerun_queued = true;
    drop(control);
    tracing::trace!(task = %shared.name, "rerun queued on worker");
    let next = worker.clone();
    worker.spawn(move || run_once(shared, next));
    return;
  }

  control.state = TaskState::Idle;
  control.rerun = false;
  drop(control);
  shared.idle.notify_all();
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_owned()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "work panicked".to_owned()
  }
}

#[cfg(test)]
#[path = "handle_test.rs"]
mod handle_test;
