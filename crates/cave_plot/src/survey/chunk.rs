//! SurveyChunk - a contiguous run of stations joined by shots.
//!
//! Layout invariant: `shots[i]` connects `stations[i]` to `stations[i + 1]`,
//! so a valid chunk holds `max(stations - 1, 0)` shots.
//!
//! ```text
//!   stations:  S0 ──── S1 ──── S2 ──── S3
//!   shots:         0       1       2
//! ```
//!
//! Stations are `Arc`-shared with other chunks of the same cave (tie points).
//! Field edits go through `Arc::make_mut`, so a snapshot holding the old
//! station never observes the change.

use std::sync::Arc;

use smallvec::SmallVec;

use super::ids::ChunkId;
use super::shot::Shot;
use super::station::{split_trailing_number, Station};
use super::types::{DataRole, Direction, SurveyError};

/// Contiguous survey leg within a trip.
///
/// `Clone` keeps the id, so a copy-on-write clone is still the same chunk.
/// Use [`SurveyChunk::duplicate`] for an independent copy.
#[derive(Clone, Debug)]
pub struct SurveyChunk {
  id: ChunkId,
  stations: Vec<Arc<Station>>,
  shots: Vec<Shot>,
  /// Keep a blank station/shot pair at the end for data entry.
  editing: bool,
}

impl Default for SurveyChunk {
  fn default() -> Self {
    Self::new()
  }
}

impl SurveyChunk {
  pub fn new() -> Self {
    Self {
      id: ChunkId::new(),
      stations: Vec::new(),
      shots: Vec::new(),
      editing: false,
    }
  }

  pub fn id(&self) -> ChunkId {
    self.id
  }

  /// Copy with a fresh id. Shots are re-parented to the copy, stations stay
  /// shared.
  pub fn duplicate(&self) -> Self {
    let mut copy = self.clone();
    copy.id = ChunkId::new();
    for shot in &mut copy.shots {
      shot.set_parent_chunk(Some(copy.id));
    }
    copy
  }

  pub fn stations(&self) -> &[Arc<Station>] {
    &self.stations
  }

  pub fn shots(&self) -> &[Shot] {
    &self.shots
  }

  pub fn station_count(&self) -> usize {
    self.stations.len()
  }

  pub fn shot_count(&self) -> usize {
    self.shots.len()
  }

  pub fn station(&self, index: usize) -> Option<&Arc<Station>> {
    self.stations.get(index)
  }

  pub fn shot(&self, index: usize) -> Option<&Shot> {
    self.shots.get(index)
  }

  pub fn is_editing(&self) -> bool {
    self.editing
  }

  /// Enter or leave editing mode. Entering appends a blank station/shot
  /// pair unless the chunk already ends with one.
  pub fn set_editing(&mut self, editing: bool) {
    self.editing = editing;
    if editing && !self.has_trailing_blank() {
      self.append_new_shot();
    }
  }

  /// Layout invariant holds and every shot points back at this chunk.
  pub fn is_valid(&self) -> bool {
    self.shots.len() == self.stations.len().saturating_sub(1)
      && self
        .shots
        .iter()
        .all(|shot| shot.parent_chunk() == Some(self.id))
  }

  /// True when every station and shot is blank.
  pub fn is_station_and_shots_empty(&self) -> bool {
    self.stations.iter().all(|s| s.is_empty()) && self.shots.iter().all(Shot::is_empty)
  }

  pub fn has_station(&self, name: &str) -> bool {
    self.stations.iter().any(|s| s.name() == name)
  }

  /// Every position at which a station with this name appears.
  pub fn indices_of_station(&self, name: &str) -> Vec<usize> {
    self
      .stations
      .iter()
      .enumerate()
      .filter(|(_, s)| s.name() == name)
      .map(|(i, _)| i)
      .collect()
  }

  /// Stations directly connected to `name` by a shot of this chunk.
  pub fn neighboring_stations(&self, name: &str) -> SmallVec<[Arc<Station>; 4]> {
    let mut neighbors: SmallVec<[Arc<Station>; 4]> = SmallVec::new();
    for index in self.indices_of_station(name) {
      let before = index.checked_sub(1).and_then(|i| self.stations.get(i));
      let after = self.stations.get(index + 1);
      for station in before.into_iter().chain(after) {
        if station.name().is_empty() || neighbors.iter().any(|n| n.name() == station.name()) {
          continue;
        }
        neighbors.push(Arc::clone(station));
      }
    }
    neighbors
  }

  // ===========================================================================
  // Structural edits
  // ===========================================================================

  /// Append a shot from the current last station to `to`. On an empty chunk
  /// both stations are added.
  pub fn append_shot(
    &mut self,
    from: Arc<Station>,
    to: Arc<Station>,
    shot: Shot,
  ) -> Result<(), SurveyError> {
    match self.stations.last() {
      None => self.stations.push(from),
      Some(last) if last.name() == from.name() => {}
      Some(last) => {
        return Err(SurveyError::NotConnected {
          from: from.name().to_owned(),
          last: last.name().to_owned(),
        })
      }
    }
    self.stations.push(to);
    self.push_shot(shot);
    Ok(())
  }

  /// Append a blank station and shot (two blank stations on an empty chunk).
  pub fn append_new_shot(&mut self) {
    if self.stations.is_empty() {
      self.stations.push(Arc::default());
    }
    self.stations.push(Arc::default());
    self.push_shot(Shot::default());
  }

  /// Insert `station` next to the station at `index`, adding the shot that
  /// connects it. Returns the new station's index and the inserted shot's
  /// index (`None` when the chunk was empty).
  pub fn insert_station(
    &mut self,
    index: usize,
    direction: Direction,
    station: Arc<Station>,
  ) -> Result<(usize, Option<usize>), SurveyError> {
    if self.stations.is_empty() {
      if index != 0 {
        return Err(SurveyError::StationOutOfRange { index, len: 0 });
      }
      self.stations.push(station);
      return Ok((0, None));
    }
    self.check_station(index)?;

    let at = match direction {
      Direction::Above => index,
      Direction::Below => index + 1,
    };
    let shot_at = at.min(self.shots.len());

    self.stations.insert(at, station);
    let mut shot = Shot::default();
    shot.set_parent_chunk(Some(self.id));
    self.shots.insert(shot_at, shot);
    Ok((at, Some(shot_at)))
  }

  pub fn can_remove_station(&self, index: usize, direction: Direction) -> bool {
    self.stations.len() > 2
      && index < self.stations.len()
      && match direction {
        Direction::Above => index > 0,
        Direction::Below => index < self.shots.len(),
      }
  }

  /// Remove a station and the shot on the given side. Returns the removed
  /// shot's index.
  pub fn remove_station(&mut self, index: usize, direction: Direction) -> Result<usize, SurveyError> {
    if !self.can_remove_station(index, direction) {
      return Err(SurveyError::CannotRemove { index, direction });
    }
    let shot_index = match direction {
      Direction::Above => index - 1,
      Direction::Below => index,
    };
    self.stations.remove(index);
    self.shots.remove(shot_index);
    Ok(shot_index)
  }

  pub fn can_remove_shot(&self, index: usize, _direction: Direction) -> bool {
    self.shots.len() > 1 && index < self.shots.len()
  }

  /// Remove a shot and the station on the given side. Returns the removed
  /// station's index.
  pub fn remove_shot(&mut self, index: usize, direction: Direction) -> Result<usize, SurveyError> {
    if !self.can_remove_shot(index, direction) {
      return Err(SurveyError::CannotRemove { index, direction });
    }
    let station_index = match direction {
      Direction::Above => index,
      Direction::Below => index + 1,
    };
    self.shots.remove(index);
    self.stations.remove(station_index);
    Ok(station_index)
  }

  /// Replace the station at `index`, returning the previous one.
  pub fn set_station(
    &mut self,
    index: usize,
    station: Arc<Station>,
  ) -> Result<Arc<Station>, SurveyError> {
    self.check_station(index)?;
    Ok(std::mem::replace(&mut self.stations[index], station))
  }

  // ===========================================================================
  // Field access
  // ===========================================================================

  /// Value of a station or shot field, `None` if `index` is out of range.
  pub fn data(&self, role: DataRole, index: usize) -> Option<String> {
    if role.is_station_role() {
      self
        .stations
        .get(index)
        .and_then(|s| s.data(role))
        .map(str::to_owned)
    } else {
      self.shots.get(index).and_then(|s| s.data(role))
    }
  }

  pub fn set_data(
    &mut self,
    role: DataRole,
    index: usize,
    value: impl Into<String>,
  ) -> Result<(), SurveyError> {
    if role.is_station_role() {
      self.check_station(index)?;
      Arc::make_mut(&mut self.stations[index]).set_data(role, value)
    } else {
      let len = self.shots.len();
      self
        .shots
        .get_mut(index)
        .ok_or(SurveyError::ShotOutOfRange { index, len })?
        .set_data(role, value)
    }
  }

  // ===========================================================================
  // Name guessing
  // ===========================================================================

  /// Name following `name` in numeric sequence: `A9` → `A10`, `B07` → `B08`.
  /// `None` when the name has no trailing number.
  pub fn guess_next_station(&self, name: &str) -> Option<String> {
    let (prefix, digits) = split_trailing_number(name);
    let number: u64 = digits.parse().ok()?;
    let next = number.checked_add(1)?;
    Some(format!("{prefix}{next:0width$}", width = digits.len()))
  }

  /// Likely name for the station after the last named one.
  pub fn guess_last_station_name(&self) -> Option<String> {
    let last = self.stations.iter().rev().find(|s| !s.name().is_empty())?;
    self.guess_next_station(last.name())
  }

  fn push_shot(&mut self, mut shot: Shot) {
    shot.set_parent_chunk(Some(self.id));
    self.shots.push(shot);
  }

  fn has_trailing_blank(&self) -> bool {
    matches!(
      (self.stations.last(), self.shots.last()),
      (Some(station), Some(shot)) if station.is_empty() && shot.is_empty()
    )
  }

  fn check_station(&self, index: usize) -> Result<(), SurveyError> {
    if index < self.stations.len() {
      Ok(())
    } else {
      Err(SurveyError::StationOutOfRange {
        index,
        len: self.stations.len(),
      })
    }
  }
}

#[cfg(test)]
#[path = "chunk_test.rs"]
mod chunk_test;
