//! PlotEngine - one place that owns the worker threads and builds tasks.
//!
//! Tasks of the same family share one worker, so a line plot never competes
//! with another line plot for a core, and a slow helper process never delays
//! geometry.

use std::path::PathBuf;

use crate::config::PlotConfig;
use crate::manager::RecomputeTaskManager;
use crate::plot::{LineGeometryWork, LinePlotManager, UsedStationsManager, UsedStationsWork};
use crate::task::{ExternalProcessWork, Task, TaskError};
use crate::threading::{WorkerFamily, WorkerPool};

pub struct PlotEngine {
  config: PlotConfig,
  workers: WorkerPool,
}

impl PlotEngine {
  pub fn new(config: PlotConfig) -> Self {
    let workers = WorkerPool::new(&config);
    Self { config, workers }
  }

  pub fn config(&self) -> &PlotConfig {
    &self.config
  }

  pub fn workers(&self) -> &WorkerPool {
    &self.workers
  }

  /// Manager for a region's line plot, on the geometry worker.
  pub fn line_plot_manager(&self) -> Result<LinePlotManager, TaskError> {
    let worker = self.workers.thread(WorkerFamily::Geometry)?;
    let work = LineGeometryWork::new(self.config.reduction);
    Ok(RecomputeTaskManager::new(
      Task::new("line-plot", work, worker),
      self.config.listen_on_start,
    ))
  }

  /// Manager for a cave's used-station list, on the stations worker.
  pub fn used_stations_manager(&self) -> Result<UsedStationsManager, TaskError> {
    let worker = self.workers.thread(WorkerFamily::Stations)?;
    Ok(RecomputeTaskManager::new(
      Task::new("used-stations", UsedStationsWork::new(), worker),
      self.config.listen_on_start,
    ))
  }

  /// Task wrapping an external helper program, on the io worker.
  pub fn external_process_task(
    &self,
    program: impl Into<PathBuf>,
  ) -> Result<Task<ExternalProcessWork>, TaskError> {
    let program = program.into();
    let worker = self.workers.thread(WorkerFamily::Io)?;
    let name = program
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "external-process".to_owned());
    Ok(Task::new(name, ExternalProcessWork::new(program), worker))
  }

  /// Release the worker threads. Tasks still holding one keep it alive until
  /// they are dropped.
  pub fn shutdown(&self) {
    self.workers.shutdown();
  }
}

impl Default for PlotEngine {
  fn default() -> Self {
    Self::new(PlotConfig::default())
  }
}
