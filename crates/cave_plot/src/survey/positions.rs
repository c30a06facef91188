//! Station positions produced by the external loop-closure solver.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec3;

/// Solved position of every station of one cave, keyed by station name.
///
/// Produced by a separate pass with no freshness guarantee: a station present
/// in the survey may be missing here and consumers must tolerate that.
/// Iteration order is by name, so readers are deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StationPositionLookup {
  positions: BTreeMap<String, Vec3>,
}

impl StationPositionLookup {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_position(&mut self, name: impl Into<String>, position: Vec3) {
    self.positions.insert(name.into(), position);
  }

  pub fn position(&self, name: &str) -> Option<Vec3> {
    self.positions.get(name).copied()
  }

  pub fn has_position(&self, name: &str) -> bool {
    self.positions.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn clear(&mut self) {
    self.positions.clear();
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Vec3)> + '_ {
    self
      .positions
      .iter()
      .map(|(name, position)| (name.as_str(), *position))
  }
}

impl<S: Into<String>> FromIterator<(S, Vec3)> for StationPositionLookup {
  fn from_iter<I: IntoIterator<Item = (S, Vec3)>>(iter: I) -> Self {
    Self {
      positions: iter
        .into_iter()
        .map(|(name, position)| (name.into(), position))
        .collect(),
    }
  }
}

/// Fully-qualified station key: the cave's ordinal in its region, the cave
/// name, and the station name. The ordinal keeps same-named caves apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationKey {
  pub cave_index: usize,
  pub cave_name: String,
  pub station: String,
}

impl StationKey {
  pub fn new(cave_index: usize, cave_name: &str, station: &str) -> Self {
    Self {
      cave_index,
      cave_name: cave_name.to_owned(),
      station: station.to_owned(),
    }
  }
}

impl fmt::Display for StationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.cave_index, self.cave_name, self.station)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lookup_iterates_by_name() {
    let lookup: StationPositionLookup = [
      ("B", Vec3::new(1.0, 0.0, 0.0)),
      ("A", Vec3::ZERO),
      ("C", Vec3::Y),
    ]
    .into_iter()
    .collect();

    let names: Vec<&str> = lookup.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["A", "B", "C"]);
    assert_eq!(lookup.position("C"), Some(Vec3::Y));
    assert!(!lookup.has_position("D"));
  }

  #[test]
  fn test_station_key_display() {
    let key = StationKey::new(2, "Main", "A1");
    assert_eq!(key.to_string(), "2/Main/A1");
    assert_ne!(key, StationKey::new(3, "Main", "A1"));
  }
}
