//! Change notifications emitted by caves and regions.

use std::ops::Range;

use super::ids::{CaveId, ChunkId};
use super::types::DataRole;

/// One change to the survey hierarchy.
///
/// Index ranges are half-open. Every variant names the cave it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurveyEvent {
  NameChanged { cave: CaveId },

  BeginInsertTrips { cave: CaveId, trips: Range<usize> },
  InsertedTrips { cave: CaveId, trips: Range<usize> },
  BeginRemoveTrips { cave: CaveId, trips: Range<usize> },
  RemovedTrips { cave: CaveId, trips: Range<usize> },

  ChunksAdded { cave: CaveId, trip: usize, chunks: Range<usize> },
  ChunksRemoved { cave: CaveId, trip: usize, chunks: Range<usize> },

  StationsAdded { cave: CaveId, chunk: ChunkId, stations: Range<usize> },
  StationsRemoved { cave: CaveId, chunk: ChunkId, stations: Range<usize> },
  ShotsAdded { cave: CaveId, chunk: ChunkId, shots: Range<usize> },
  ShotsRemoved { cave: CaveId, chunk: ChunkId, shots: Range<usize> },

  /// A single field of a chunk changed.
  DataChanged {
    cave: CaveId,
    chunk: ChunkId,
    role: DataRole,
    index: usize,
  },

  /// A station name is now used somewhere in the cave.
  StationAddedToCave { cave: CaveId, name: String },
  /// No chunk of the cave uses this station name any more.
  StationRemovedFromCave { cave: CaveId, name: String },
  /// Passage dimensions of a named station changed.
  StationDataChanged {
    cave: CaveId,
    name: String,
    role: DataRole,
  },

  /// The solver published new station positions.
  StationPositionsChanged { cave: CaveId },

  CaveAdded { cave: CaveId, index: usize },
  CaveRemoved { cave: CaveId, index: usize },
}

impl SurveyEvent {
  /// Cave the event originated from.
  pub fn cave(&self) -> CaveId {
    match self {
      SurveyEvent::NameChanged { cave }
      | SurveyEvent::BeginInsertTrips { cave, .. }
      | SurveyEvent::InsertedTrips { cave, .. }
      | SurveyEvent::BeginRemoveTrips { cave, .. }
      | SurveyEvent::RemovedTrips { cave, .. }
      | SurveyEvent::ChunksAdded { cave, .. }
      | SurveyEvent::ChunksRemoved { cave, .. }
      | SurveyEvent::StationsAdded { cave, .. }
      | SurveyEvent::StationsRemoved { cave, .. }
      | SurveyEvent::ShotsAdded { cave, .. }
      | SurveyEvent::ShotsRemoved { cave, .. }
      | SurveyEvent::DataChanged { cave, .. }
      | SurveyEvent::StationAddedToCave { cave, .. }
      | SurveyEvent::StationRemovedFromCave { cave, .. }
      | SurveyEvent::StationDataChanged { cave, .. }
      | SurveyEvent::StationPositionsChanged { cave }
      | SurveyEvent::CaveAdded { cave, .. }
      | SurveyEvent::CaveRemoved { cave, .. } => *cave,
    }
  }

  /// True when the set of station names used by the cave changed.
  pub fn is_station_membership(&self) -> bool {
    matches!(
      self,
      SurveyEvent::StationAddedToCave { .. } | SurveyEvent::StationRemovedFromCave { .. }
    )
  }
}
