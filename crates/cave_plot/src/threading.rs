//! Long-lived worker threads for background tasks.
//!
//! Each task family (line geometry, station queries, helper processes) gets
//! one dedicated worker: a single-threaded rayon pool that runs its jobs in
//! FIFO order. Tasks that share a worker therefore run one after another in
//! the order they were started, while the owning thread keeps going.
//!
//! Workers are owned by an explicitly constructed [`WorkerPool`] rather than
//! module-level state; the pool creates a family's thread on first request
//! and releases all of them on [`WorkerPool::shutdown`].
//!
//! # Usage
//!
//! ```ignore
//! let pool = WorkerPool::new(&PlotConfig::default());
//! let worker = pool.thread(WorkerFamily::Geometry)?;
//!
//! worker.spawn(move || expensive_computation());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{self as channel, Receiver, Sender};

use crate::config::PlotConfig;
use crate::task::TaskError;

// =============================================================================
// WorkerThread - one FIFO execution context
// =============================================================================

/// Handle to a single worker execution context.
///
/// Cloning the handle shares the underlying thread. The thread exits once
/// every handle is dropped and its queued jobs have drained.
#[derive(Clone)]
pub struct WorkerThread {
  name: Arc<str>,
  pool: Arc<rayon::ThreadPool>,
  /// Submission order. Each pool job pops exactly one entry.
  queue: Sender<Job>,
  jobs: Receiver<Job>,
}

type Job = Box<dyn FnOnce() + Send>;

impl WorkerThread {
  /// Spawn a new named worker thread.
  pub fn new(name: &str) -> Result<Self, TaskError> {
    let thread_name = name.to_owned();
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(1)
      .thread_name(move |_| thread_name.clone())
      .build()
      .map_err(|err| TaskError::WorkerSpawn(err.to_string()))?;

    tracing::debug!(worker = name, "worker thread started");

    let (queue, jobs) = channel::unbounded();
    Ok(Self {
      name: name.into(),
      pool: Arc::new(pool),
      queue,
      jobs,
    })
  }

  /// Name given to the OS thread.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Queue a job behind everything already submitted to this worker,
  /// including when called from the worker itself.
  pub fn spawn<F>(&self, job: F)
  where
    F: FnOnce() + Send + 'static,
  {
    // Rayon runs jobs spawned from inside the pool ahead of injected ones,
    // so the order lives in the channel and pool jobs only pop from it.
    let _ = self.queue.send(Box::new(job));
    let jobs = self.jobs.clone();
    self.pool.spawn_fifo(move || {
      if let Ok(job) = jobs.try_recv() {
        job();
      }
    });
  }

  /// True when called from this worker's own thread.
  pub fn is_current(&self) -> bool {
    self.pool.current_thread_index().is_some()
  }

  /// True when both handles refer to the same thread.
  pub fn same_thread(&self, other: &WorkerThread) -> bool {
    Arc::ptr_eq(&self.pool, &other.pool)
  }
}

impl fmt::Debug for WorkerThread {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkerThread").field("name", &self.name).finish()
  }
}

// =============================================================================
// WorkerPool - process-wide registry of worker families
// =============================================================================

/// Families of background work. Tasks of one family share a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerFamily {
  /// Line-plot geometry reductions.
  Geometry,
  /// Derived station queries (used stations).
  Stations,
  /// External helper processes and file work.
  Io,
}

/// Owner of every worker thread used by the plot engine.
pub struct WorkerPool {
  names: HashMap<WorkerFamily, String>,
  threads: Mutex<HashMap<WorkerFamily, WorkerThread>>,
}

impl WorkerPool {
  /// Create an empty pool. No thread is started until first requested.
  pub fn new(config: &PlotConfig) -> Self {
    let names = HashMap::from([
      (WorkerFamily::Geometry, config.geometry_thread.clone()),
      (WorkerFamily::Stations, config.station_thread.clone()),
      (WorkerFamily::Io, config.io_thread.clone()),
    ]);

    Self {
      names,
      threads: Mutex::new(HashMap::new()),
    }
  }

  /// Get the worker for a family, starting it on first use.
  pub fn thread(&self, family: WorkerFamily) -> Result<WorkerThread, TaskError> {
    let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(thread) = threads.get(&family) {
      return Ok(thread.clone());
    }

    let name = self
      .names
      .get(&family)
      .map(String::as_str)
      .unwrap_or("cave-plot-worker");
    let thread = WorkerThread::new(name)?;
    threads.insert(family, thread.clone());
    Ok(thread)
  }

  /// Number of families whose worker has been started.
  pub fn live_count(&self) -> usize {
    self.threads.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  /// Release every worker. Tasks still holding a handle keep their thread
  /// until they are dropped; later requests start fresh threads.
  pub fn shutdown(&self) {
    let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
    for (family, thread) in threads.drain() {
      tracing::debug!(?family, worker = thread.name(), "worker released");
    }
  }
}

impl Drop for WorkerPool {
  fn drop(&mut self) {
    self.shutdown();
  }
}

// =============================================================================
// Tests
// =============================================================================
