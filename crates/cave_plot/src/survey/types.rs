//! Field roles, edit directions and survey edit errors.

// =============================================================================
// DataRole - addressable survey fields
// =============================================================================

/// A single editable field of a station or shot, as addressed by the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataRole {
  StationName,
  StationLeft,
  StationRight,
  StationUp,
  StationDown,
  ShotDistance,
  ShotDistanceIncluded,
  ShotCompass,
  ShotBackCompass,
  ShotClino,
  ShotBackClino,
}

impl DataRole {
  pub const ALL: [DataRole; 11] = [
    DataRole::StationName,
    DataRole::StationLeft,
    DataRole::StationRight,
    DataRole::StationUp,
    DataRole::StationDown,
    DataRole::ShotDistance,
    DataRole::ShotDistanceIncluded,
    DataRole::ShotCompass,
    DataRole::ShotBackCompass,
    DataRole::ShotClino,
    DataRole::ShotBackClino,
  ];

  pub fn is_station_role(self) -> bool {
    matches!(
      self,
      DataRole::StationName
        | DataRole::StationLeft
        | DataRole::StationRight
        | DataRole::StationUp
        | DataRole::StationDown
    )
  }

  pub fn is_shot_role(self) -> bool {
    !self.is_station_role()
  }
}

/// Which neighbour an insert or remove applies to.
///
/// For stations, `Above` is the shot before the station and `Below` the shot
/// after it. For shots, `Above` is the station before the shot and `Below`
/// the station after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
  Above,
  Below,
}

// =============================================================================
// SurveyError
// =============================================================================

/// Rejected edit of the survey hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurveyError {
  #[error("cave index {index} out of range (len {len})")]
  CaveOutOfRange { index: usize, len: usize },

  #[error("trip index {index} out of range (len {len})")]
  TripOutOfRange { index: usize, len: usize },

  #[error("chunk index {index} out of range (len {len})")]
  ChunkOutOfRange { index: usize, len: usize },

  #[error("station index {index} out of range (len {len})")]
  StationOutOfRange { index: usize, len: usize },

  #[error("shot index {index} out of range (len {len})")]
  ShotOutOfRange { index: usize, len: usize },

  #[error("{role:?} does not address a {target}")]
  WrongRole { role: DataRole, target: &'static str },

  #[error("cannot remove index {index} {direction:?}")]
  CannotRemove { index: usize, direction: Direction },

  #[error("shot from {from:?} does not continue from last station {last:?}")]
  NotConnected { from: String, last: String },

  #[error("invalid value {value:?} for {role:?}")]
  InvalidValue { role: DataRole, value: String },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_roles_partition() {
    let stations = DataRole::ALL.iter().filter(|r| r.is_station_role()).count();
    let shots = DataRole::ALL.iter().filter(|r| r.is_shot_role()).count();
    assert_eq!(stations, 5);
    assert_eq!(shots, 6);
  }

  #[test]
  fn test_error_messages() {
    let err = SurveyError::TripOutOfRange { index: 3, len: 1 };
    assert_eq!(err.to_string(), "trip index 3 out of range (len 1)");
  }
}
