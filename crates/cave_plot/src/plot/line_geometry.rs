//! Line plot reduction: survey snapshot + solved positions → line buffers.
//!
//! ```text
//! for each cave (ordinal i):
//!   positions ──► points[]            key "i/cave/station" → point index
//!   chunks    ──► indices[]           consecutive resolved stations → edge
//! ```
//!
//! Points come only from the position table, one per entry, independent of
//! chunk structure. Edges come only from chunks with at least two stations.
//! A station without a position never aborts the run: it is logged, recorded
//! in [`LineGeometry::missing_stations`] and handled per [`ReductionConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;

use crate::config::{MissingLeadingStation, ReductionConfig, StationHoles};
use crate::survey::{CaveSnapshot, Region, RegionSnapshot, StationKey, SurveyChunk, SurveyEvent};
use crate::task::{RunContext, TaskError, TaskWork};

// =============================================================================
// Output
// =============================================================================

/// A station referenced by a chunk but absent from the position table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingStation {
  pub key: StationKey,
  /// True when the station starts its chunk.
  pub leading: bool,
}

/// Renderable line plot: a point buffer and edges indexing into it.
///
/// Rebuilt from scratch by every run and published as one value, so a reader
/// never sees points and indices from different runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineGeometry {
  pub points: Vec<Vec3>,
  pub indices: Vec<[u32; 2]>,
  pub missing_stations: Vec<MissingStation>,
}

impl LineGeometry {
  pub fn point_count(&self) -> usize {
    self.points.len()
  }

  pub fn edge_count(&self) -> usize {
    self.indices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty() && self.indices.is_empty()
  }

  /// Indices flattened for a `GL_LINES`-style index buffer.
  pub fn index_buffer(&self) -> Vec<u32> {
    self.indices.iter().flatten().copied().collect()
  }
}

// =============================================================================
// Reduction
// =============================================================================

/// Reduce a whole region in one go on the calling thread.
pub fn reduce(snapshot: &RegionSnapshot, config: &ReductionConfig) -> LineGeometry {
  let mut reducer = Reducer::new(*config);
  for (cave_index, cave) in snapshot.caves.iter().enumerate() {
    reducer.add_cave(cave_index, cave);
  }
  reducer.finish()
}

struct Reducer {
  config: ReductionConfig,
  geometry: LineGeometry,
  station_index: HashMap<StationKey, u32>,
}

impl Reducer {
  fn new(config: ReductionConfig) -> Self {
    Self {
      config,
      geometry: LineGeometry::default(),
      station_index: HashMap::new(),
    }
  }

  fn add_cave(&mut self, cave_index: usize, cave: &CaveSnapshot) {
    self.add_station_positions(cave_index, cave);
    for chunk in cave.chunks() {
      self.add_shot_lines(cave_index, cave, chunk);
    }
  }

  fn add_station_positions(&mut self, cave_index: usize, cave: &CaveSnapshot) {
    self.geometry.points.reserve(cave.positions.len());
    for (name, position) in cave.positions.iter() {
      let index = self.geometry.points.len() as u32;
      self
        .station_index
        .insert(StationKey::new(cave_index, &cave.name, name), index);
      self.geometry.points.push(position);
    }
  }

  fn add_shot_lines(&mut self, cave_index: usize, cave: &CaveSnapshot, chunk: &SurveyChunk) {
    let [first, rest @ ..] = chunk.stations() else {
      return;
    };
    if rest.is_empty() {
      return;
    }

    let mut previous = match self.resolve(cave_index, cave, first.name(), true) {
      Some(index) => Some(index),
      None => match self.config.missing_leading_station {
        MissingLeadingStation::DropLeadingEdge => None,
        // Only when point 0 exists, so every emitted index stays valid.
        MissingLeadingStation::LinkToFirstPoint => (!self.geometry.points.is_empty()).then_some(0),
      },
    };

    for station in rest {
      match self.resolve(cave_index, cave, station.name(), false) {
        Some(current) => {
          if let Some(previous) = previous {
            self.geometry.indices.push([previous, current]);
          }
          previous = Some(current);
        }
        None => {
          if self.config.station_holes == StationHoles::Break {
            previous = None;
          }
        }
      }
    }
  }

  /// Point index of a station, recording a warning when it has no position.
  /// Blank placeholder stations resolve to nothing without a warning.
  fn resolve(
    &mut self,
    cave_index: usize,
    cave: &CaveSnapshot,
    station: &str,
    leading: bool,
  ) -> Option<u32> {
    if station.is_empty() {
      return None;
    }
    let key = StationKey::new(cave_index, &cave.name, station);
    if let Some(index) = self.station_index.get(&key) {
      return Some(*index);
    }

    tracing::warn!(
      station = %key,
      leading,
      "no position for station, line plot will have a gap"
    );
    self
      .geometry
      .missing_stations
      .push(MissingStation { key, leading });
    None
  }

  fn finish(mut self) -> LineGeometry {
    self.geometry.points.shrink_to_fit();
    self.geometry.indices.shrink_to_fit();
    self.geometry
  }
}

// =============================================================================
// Task work
// =============================================================================

/// Background line plot reduction of a whole region.
///
/// Input is a [`RegionSnapshot`] delivered through
/// [`Task::post`](crate::task::Task::post). Checks for cancellation between
/// caves.
#[derive(Debug, Default)]
pub struct LineGeometryWork {
  snapshot: RegionSnapshot,
  config: ReductionConfig,
}

impl LineGeometryWork {
  pub fn new(config: ReductionConfig) -> Self {
    Self {
      snapshot: RegionSnapshot::default(),
      config,
    }
  }

  pub fn set_snapshot(&mut self, snapshot: RegionSnapshot) {
    self.snapshot = snapshot;
  }

  pub fn set_config(&mut self, config: ReductionConfig) {
    self.config = config;
  }
}

impl TaskWork for LineGeometryWork {
  type Output = Arc<LineGeometry>;

  #[tracing::instrument(skip_all, name = "plot::line_geometry", fields(run = ctx.run()))]
  fn run(&mut self, ctx: &RunContext<'_>) -> Result<Arc<LineGeometry>, TaskError> {
    ctx.set_steps(self.snapshot.cave_count());

    let mut reducer = Reducer::new(self.config);
    for (cave_index, cave) in self.snapshot.caves.iter().enumerate() {
      ctx.checkpoint()?;
      reducer.add_cave(cave_index, cave);
      ctx.advance();
    }

    let geometry = reducer.finish();
    tracing::debug!(
      points = geometry.point_count(),
      edges = geometry.edge_count(),
      missing = geometry.missing_stations.len(),
      "line plot reduced"
    );
    Ok(Arc::new(geometry))
  }
}

impl crate::manager::RecomputeWork for LineGeometryWork {
  type Source = Region;
  type Input = RegionSnapshot;

  fn capture(source: &Region) -> RegionSnapshot {
    source.snapshot()
  }

  fn set_input(&mut self, input: RegionSnapshot) {
    self.snapshot = input;
  }

  /// Every hierarchy, data or position change can move a line.
  fn is_relevant(_event: &SurveyEvent) -> bool {
    true
  }
}

#[cfg(test)]
#[path = "line_geometry_test.rs"]
mod line_geometry_test;
