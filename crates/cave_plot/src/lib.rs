//! cave_plot - background recomputation of cave survey views
//!
//! This crate keeps derived views of a cave survey (the 3D line plot, the
//! list of used station names) current while the survey is being edited.
//! Work runs on dedicated worker threads; the owning thread only captures
//! immutable snapshots and adopts finished results.
//!
//! # Features
//!
//! - **Tasks**: Cancellable, restartable background runs with coalesced
//!   reruns and progress reporting
//! - **Thread affinity**: Tasks of one family share a named FIFO worker
//! - **Survey model**: Region → Cave → Trip → Chunk with change notifications
//!   and copy-on-write snapshots
//! - **Line plot**: Station positions and shot chains reduced to point and
//!   index buffers
//! - **Recompute managers**: Debounced, listening-aware recomputation driven
//!   by survey change events
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, RwLock};
//! use cave_plot::{PlotEngine, Region};
//!
//! let engine = PlotEngine::default();
//! let region = Arc::new(RwLock::new(Region::new()));
//!
//! let mut plot = engine.line_plot_manager()?;
//! plot.set_source(Some(&region));
//!
//! // Once per frame on the owning thread:
//! if plot.update() {
//!     let geometry = plot.result().unwrap();
//!     upload(&geometry.points, &geometry.index_buffer());
//! }
//! ```

pub mod config;
pub use config::{MissingLeadingStation, PlotConfig, ReductionConfig, StationHoles};

// Background task framework
pub mod task;
pub use task::{RunContext, RunId, Task, TaskError, TaskEvent, TaskState, TaskWork};

// Named worker threads
pub mod threading;
pub use threading::{WorkerFamily, WorkerPool, WorkerThread};

// Change notification bus
pub mod notify;
pub use notify::Notifier;

// Survey data model
pub mod survey;
pub use survey::{Cave, Region, RegionSnapshot, StationPositionLookup, SurveyChunk, SurveyEvent};

// Derived views
pub mod plot;
pub use plot::{LineGeometry, LinePlotManager, UsedStationsManager};

pub mod manager;
pub use manager::{ManagerEvent, RecomputeSource, RecomputeTaskManager, RecomputeWork};

pub mod engine;
pub use engine::PlotEngine;

pub mod metrics;

#[cfg(test)]
mod test_utils;
