//! Derived survey views computed off the owning thread.
//!
//! - [`line_geometry`]: centerline point/index buffers for a whole region
//! - [`used_stations`]: compact list of the station names a cave uses

pub mod line_geometry;
pub mod used_stations;

pub use line_geometry::{reduce, LineGeometry, LineGeometryWork, MissingStation};
pub use used_stations::{compress_station_names, UsedStationsWork};

use crate::manager::RecomputeTaskManager;

/// Keeps a region's line plot current.
pub type LinePlotManager = RecomputeTaskManager<LineGeometryWork>;

/// Keeps a cave's used-station list current.
pub type UsedStationsManager = RecomputeTaskManager<UsedStationsWork>;
