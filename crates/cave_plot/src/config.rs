//! PlotConfig - worker naming, listening defaults and reduction policies.

/// How a chunk whose first station has no resolved position is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingLeadingStation {
  /// Skip the leading edge; the first resolved station starts the line.
  #[default]
  DropLeadingEdge,

  /// Link the next resolved station to point 0, whatever occupies it.
  /// Draws a spurious line; kept for comparing against older plots.
  LinkToFirstPoint,
}

/// How unresolved stations in the middle of a chunk are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StationHoles {
  /// Break the line at the hole: no edge touches or spans the station.
  #[default]
  Break,

  /// Join the stations on either side of the hole with one edge.
  Bridge,
}

/// Policies applied by the line geometry reduction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReductionConfig {
  /// Unresolved first station of a chunk.
  pub missing_leading_station: MissingLeadingStation,

  /// Unresolved stations after the first.
  pub station_holes: StationHoles,
}

impl ReductionConfig {
  /// Behaviour of the historical plotter: link to point 0 and bridge holes.
  pub fn legacy() -> Self {
    Self {
      missing_leading_station: MissingLeadingStation::LinkToFirstPoint,
      station_holes: StationHoles::Bridge,
    }
  }
}

/// Engine-wide configuration.
#[derive(Clone, Debug)]
pub struct PlotConfig {
  /// Worker thread name for line geometry tasks.
  pub geometry_thread: String,

  /// Worker thread name for used-station queries.
  pub station_thread: String,

  /// Worker thread name for external helper processes.
  pub io_thread: String,

  /// Whether new managers start out listening to source changes.
  pub listen_on_start: bool,

  /// Line geometry reduction policies.
  pub reduction: ReductionConfig,
}

impl Default for PlotConfig {
  fn default() -> Self {
    Self {
      geometry_thread: "cave-plot-geometry".to_owned(),
      station_thread: "cave-plot-stations".to_owned(),
      io_thread: "cave-plot-io".to_owned(),
      listen_on_start: true,
      reduction: ReductionConfig::default(),
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
