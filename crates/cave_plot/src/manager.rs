//! Recompute managers - keep a derived value in step with a survey source.
//!
//! ```text
//!   Cave / Region ──SurveyEvent──► manager.update()
//!                                      │ relevant + listening
//!                                      ▼
//!                         capture input, post, start/restart
//!                                      │
//!   worker ──TaskEvent──► manager.update() ──► result + ResultChanged
//! ```
//!
//! The manager lives on the owning thread and is pumped with
//! [`RecomputeTaskManager::update`]. The source is held weakly, so dropping
//! the last strong handle detaches it and stops further recomputation.

use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use web_time::Instant;

use crate::metrics::{RunOutcome, TaskMetrics};
use crate::notify::Notifier;
use crate::survey::{Cave, Region, SurveyEvent};
use crate::task::{RunId, Task, TaskError, TaskEvent, TaskWork};

/// Longest single wait in [`RecomputeTaskManager::wait_for_result`] before
/// source events are pumped again.
const WAIT_SLICE: Duration = Duration::from_millis(10);

// =============================================================================
// Traits
// =============================================================================

/// Anything a manager can watch for changes.
pub trait RecomputeSource: Send + Sync + 'static {
  fn events(&self) -> &Notifier<SurveyEvent>;
}

impl RecomputeSource for Cave {
  fn events(&self) -> &Notifier<SurveyEvent> {
    Cave::events(self)
  }
}

impl RecomputeSource for Region {
  fn events(&self) -> &Notifier<SurveyEvent> {
    Region::events(self)
  }
}

/// Work that can be fed from a [`RecomputeSource`].
pub trait RecomputeWork: TaskWork {
  type Source: RecomputeSource;
  /// Immutable copy of whatever the work reads from the source.
  type Input: Send + 'static;

  /// Copy the input out of the source. Called on the owning thread.
  fn capture(source: &Self::Source) -> Self::Input;

  /// Install a captured input. Called on the worker before a run.
  fn set_input(&mut self, input: Self::Input);

  /// Whether an event invalidates the current result.
  fn is_relevant(event: &SurveyEvent) -> bool;
}

/// Notifications published to manager subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerEvent {
  /// A run finished and its output is now [`RecomputeTaskManager::result`].
  ResultChanged { run: RunId },
}

// =============================================================================
// RecomputeTaskManager
// =============================================================================

pub struct RecomputeTaskManager<W: RecomputeWork> {
  task: Task<W>,
  source: Option<Weak<RwLock<W::Source>>>,
  source_events: Option<Receiver<SurveyEvent>>,
  listening: bool,

  result: Option<W::Output>,
  result_run: Option<RunId>,
  last_error: Option<TaskError>,
  progress: Option<(usize, usize)>,
  recompute_count: u64,

  observers: Notifier<ManagerEvent>,
  metrics: TaskMetrics,
}

impl<W: RecomputeWork> RecomputeTaskManager<W> {
  pub fn new(task: Task<W>, listening: bool) -> Self {
    Self {
      task,
      source: None,
      source_events: None,
      listening,
      result: None,
      result_run: None,
      last_error: None,
      progress: None,
      recompute_count: 0,
      observers: Notifier::new(),
      metrics: TaskMetrics::new(),
    }
  }

  /// Watch `source` instead of the current one.
  ///
  /// Setting the source already watched does nothing. While listening, a new
  /// source is subscribed to and recomputed right away.
  pub fn set_source(&mut self, source: Option<&Arc<RwLock<W::Source>>>) {
    let same = match (&self.source, source) {
      (Some(current), Some(next)) => Weak::ptr_eq(current, &Arc::downgrade(next)),
      (None, None) => true,
      _ => false,
    };
    if same {
      return;
    }

    self.source_events = None;
    self.source = source.map(Arc::downgrade);
    tracing::debug!(task = self.task.name(), attached = source.is_some(), "source changed");

    if self.listening && source.is_some() {
      self.subscribe_source();
      self.try_recompute();
    }
  }

  /// Turn automatic recomputation on or off.
  ///
  /// Turning it off drops the source subscription, so edits made meanwhile
  /// are never seen. Turning it on catches up with one recomputation.
  pub fn set_listening_enabled(&mut self, enabled: bool) {
    if self.listening == enabled {
      return;
    }
    self.listening = enabled;

    if enabled {
      self.subscribe_source();
      if self.has_source() {
        self.try_recompute();
      }
    } else {
      self.source_events = None;
    }
  }

  /// Capture the source and schedule a run.
  ///
  /// The input is captured on every call. If a run is in flight the new input
  /// is applied by the coalesced rerun, so the last result always reflects
  /// the latest capture.
  #[tracing::instrument(skip_all, name = "manager::recompute", fields(task = self.task.name()))]
  pub fn recompute(&mut self) -> Result<(), TaskError> {
    let Some(source) = self.source.as_ref().and_then(Weak::upgrade) else {
      self.drop_source();
      return Err(TaskError::SourceGone);
    };

    let input = W::capture(&source.read().unwrap_or_else(PoisonError::into_inner));
    self.task.post(move |work| work.set_input(input));

    if self.task.is_ready() {
      self.task.start();
    } else {
      self.task.restart();
    }
    self.recompute_count += 1;
    Ok(())
  }

  /// Process pending source and task events. Returns `true` when a new
  /// result was adopted.
  pub fn update(&mut self) -> bool {
    self.pump_source();

    let mut changed = false;
    for event in self.task.poll_events() {
      changed |= self.handle_task_event(event);
    }
    changed
  }

  /// Pump events until a new result is adopted or `timeout` elapses.
  pub fn wait_for_result(&mut self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      self.pump_source();
      let remaining = deadline.saturating_duration_since(Instant::now());
      match self.task.recv_event_timeout(remaining.min(WAIT_SLICE)) {
        Some(event) => {
          if self.handle_task_event(event) {
            return true;
          }
        }
        None if remaining.is_zero() => return false,
        None => {}
      }
    }
  }

  /// Stop the current run and wait for the worker to let go.
  pub fn stop(&self) {
    self.task.stop();
  }

  pub fn subscribe(&self) -> Receiver<ManagerEvent> {
    self.observers.subscribe()
  }

  /// Output of the most recent finished run.
  pub fn result(&self) -> Option<&W::Output> {
    self.result.as_ref()
  }

  pub fn result_run(&self) -> Option<RunId> {
    self.result_run
  }

  /// Error of the most recent run, cleared by the next finished run.
  pub fn last_error(&self) -> Option<&TaskError> {
    self.last_error.as_ref()
  }

  /// `(done, total)` of the run in flight.
  pub fn progress(&self) -> Option<(usize, usize)> {
    self.progress
  }

  /// Number of recomputations scheduled so far.
  pub fn recompute_count(&self) -> u64 {
    self.recompute_count
  }

  pub fn is_listening(&self) -> bool {
    self.listening
  }

  pub fn has_source(&self) -> bool {
    self.source.as_ref().is_some_and(|source| source.strong_count() > 0)
  }

  pub fn metrics(&self) -> &TaskMetrics {
    &self.metrics
  }

  pub fn task(&self) -> &Task<W> {
    &self.task
  }

  // ---------------------------------------------------------------------------

  fn subscribe_source(&mut self) {
    if let Some(source) = self.source.as_ref().and_then(Weak::upgrade) {
      let source = source.read().unwrap_or_else(PoisonError::into_inner);
      self.source_events = Some(source.events().subscribe());
    }
  }

  /// Recompute on a source change. A missing source is not an error here.
  fn try_recompute(&mut self) {
    if let Err(error) = self.recompute() {
      tracing::trace!(task = self.task.name(), %error, "recompute skipped");
    }
  }

  fn drop_source(&mut self) {
    if self.source.take().is_some() {
      tracing::debug!(task = self.task.name(), "source dropped");
    }
    self.source_events = None;
  }

  /// Drain source events, recomputing at most once per batch.
  fn pump_source(&mut self) {
    if self.source.is_some() && !self.has_source() {
      self.drop_source();
      return;
    }
    let Some(events) = &self.source_events else {
      return;
    };

    let mut relevant = 0usize;
    let mut disconnected = false;
    loop {
      match events.try_recv() {
        Ok(event) => {
          if W::is_relevant(&event) {
            relevant += 1;
          }
        }
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => {
          disconnected = true;
          break;
        }
      }
    }

    if disconnected || !self.has_source() {
      self.drop_source();
      return;
    }
    if relevant > 0 && self.listening {
      tracing::trace!(task = self.task.name(), relevant, "source changed, recomputing");
      self.try_recompute();
    }
  }

  fn handle_task_event(&mut self, event: TaskEvent<W::Output>) -> bool {
    match event {
      TaskEvent::Started { .. } => {
        self.progress = Some((0, 0));
        false
      }
      TaskEvent::Progress { done, total, .. } => {
        self.progress = Some((done, total));
        false
      }
      TaskEvent::Finished { run, output } => {
        self.progress = None;
        self
          .metrics
          .record_run(RunOutcome::Finished, self.task.last_run_duration());
        self.result = Some(output);
        self.result_run = Some(run);
        self.last_error = None;
        self.observers.emit(ManagerEvent::ResultChanged { run });
        true
      }
      TaskEvent::Stopped { .. } => {
        self.progress = None;
        self.metrics.record_run(RunOutcome::Stopped, None);
        false
      }
      TaskEvent::Failed { error, .. } => {
        self.progress = None;
        self
          .metrics
          .record_run(RunOutcome::Failed, self.task.last_run_duration());
        self.last_error = Some(error);
        false
      }
    }
  }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
