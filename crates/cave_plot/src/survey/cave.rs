//! Cave - trips, the cave-wide station registry and solved positions.
//!
//! All edits are made on the owning thread through `&mut Cave` and announced
//! on the cave's [`Notifier`]. Trips and chunks are shared copy-on-write, so
//! [`Cave::snapshot`] is cheap and later edits never reach a snapshot that a
//! background run is reading.
//!
//! Stations with the same name are shared between chunks (tie points). The
//! cave only keeps `Weak` handles to them: chunks own stations, the registry
//! just finds them.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::{Arc, Weak};

use crossbeam_channel::Receiver;

use super::chunk::SurveyChunk;
use super::events::SurveyEvent;
use super::ids::{CaveId, ChunkId};
use super::positions::StationPositionLookup;
use super::shot::Shot;
use super::station::Station;
use super::trip::Trip;
use super::types::{DataRole, Direction, SurveyError};
use crate::notify::Notifier;

/// A cave: ordered trips plus the stations they share.
#[derive(Debug)]
pub struct Cave {
  id: CaveId,
  name: String,
  trips: Vec<Arc<Trip>>,
  station_lookup: BTreeMap<String, Weak<Station>>,
  positions: Arc<StationPositionLookup>,
  events: Notifier<SurveyEvent>,
  /// Bus of the region this cave belongs to, if any.
  forward: Option<Notifier<SurveyEvent>>,
}

impl Cave {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      id: CaveId::new(),
      name: name.into(),
      trips: Vec::new(),
      station_lookup: BTreeMap::new(),
      positions: Arc::default(),
      events: Notifier::new(),
      forward: None,
    }
  }

  pub fn id(&self) -> CaveId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn set_name(&mut self, name: impl Into<String>) {
    let name = name.into();
    if name != self.name {
      self.name = name;
      self.emit(SurveyEvent::NameChanged { cave: self.id });
    }
  }

  pub fn events(&self) -> &Notifier<SurveyEvent> {
    &self.events
  }

  pub fn subscribe(&self) -> Receiver<SurveyEvent> {
    self.events.subscribe()
  }

  // ===========================================================================
  // Trips and chunks
  // ===========================================================================

  pub fn trips(&self) -> &[Arc<Trip>] {
    &self.trips
  }

  pub fn trip_count(&self) -> usize {
    self.trips.len()
  }

  pub fn trip(&self, index: usize) -> Option<&Trip> {
    self.trips.get(index).map(Arc::as_ref)
  }

  pub fn chunk(&self, trip: usize, chunk: usize) -> Option<&SurveyChunk> {
    self.trip(trip).and_then(|t| t.chunk(chunk))
  }

  /// Append a trip and return its index.
  pub fn add_trip(&mut self, trip: Trip) -> usize {
    let index = self.trips.len();
    self.insert_trips_at(index, vec![trip]);
    index
  }

  pub fn insert_trips(&mut self, index: usize, trips: Vec<Trip>) -> Result<(), SurveyError> {
    if index > self.trips.len() {
      return Err(SurveyError::TripOutOfRange {
        index,
        len: self.trips.len(),
      });
    }
    self.insert_trips_at(index, trips);
    Ok(())
  }

  pub fn remove_trips(&mut self, range: Range<usize>) -> Result<Vec<Arc<Trip>>, SurveyError> {
    if range.start > range.end || range.end > self.trips.len() {
      return Err(SurveyError::TripOutOfRange {
        index: range.end,
        len: self.trips.len(),
      });
    }
    let before = self.station_name_set();

    self.emit(SurveyEvent::BeginRemoveTrips {
      cave: self.id,
      trips: range.clone(),
    });
    let removed: Vec<_> = self.trips.drain(range.clone()).collect();
    self.emit(SurveyEvent::RemovedTrips {
      cave: self.id,
      trips: range,
    });

    self.sync_stations(before);
    Ok(removed)
  }

  /// Append a chunk to a trip and return its index within the trip.
  pub fn add_chunk(&mut self, trip: usize, mut chunk: SurveyChunk) -> Result<usize, SurveyError> {
    self.check_trip(trip)?;
    let before = self.station_name_set();
    self.adopt_stations(&mut chunk);

    let index = Arc::make_mut(&mut self.trips[trip]).add_chunk(chunk);
    self.emit(SurveyEvent::ChunksAdded {
      cave: self.id,
      trip,
      chunks: index..index + 1,
    });

    self.sync_stations(before);
    Ok(index)
  }

  pub fn remove_chunks(&mut self, trip: usize, chunks: Range<usize>) -> Result<(), SurveyError> {
    self.check_trip(trip)?;
    let before = self.station_name_set();

    Arc::make_mut(&mut self.trips[trip]).remove_chunks(chunks.clone())?;
    self.emit(SurveyEvent::ChunksRemoved {
      cave: self.id,
      trip,
      chunks,
    });

    self.sync_stations(before);
    Ok(())
  }

  // ===========================================================================
  // Chunk edits, addressed by (trip, chunk)
  // ===========================================================================

  pub fn append_shot(
    &mut self,
    trip: usize,
    chunk: usize,
    from: Station,
    to: Station,
    shot: Shot,
  ) -> Result<(), SurveyError> {
    let from = self.share(from);
    let to = self.share(to);
    self.edit_growing(trip, chunk, |c| c.append_shot(from, to, shot))
  }

  pub fn append_new_shot(&mut self, trip: usize, chunk: usize) -> Result<(), SurveyError> {
    self.edit_growing(trip, chunk, |c| {
      c.append_new_shot();
      Ok(())
    })
  }

  pub fn set_chunk_editing(
    &mut self,
    trip: usize,
    chunk: usize,
    editing: bool,
  ) -> Result<(), SurveyError> {
    self.edit_growing(trip, chunk, |c| {
      c.set_editing(editing);
      Ok(())
    })
  }

  /// Insert a station next to `index`. Returns the new station's index.
  pub fn insert_station(
    &mut self,
    trip: usize,
    chunk: usize,
    index: usize,
    direction: Direction,
    station: Station,
  ) -> Result<usize, SurveyError> {
    let station = self.share(station);
    let before = self.station_name_set();

    let (id, (at, shot)) = self.edit_chunk(trip, chunk, |c| {
      c.insert_station(index, direction, station)
    })?;
    self.emit(SurveyEvent::StationsAdded {
      cave: self.id,
      chunk: id,
      stations: at..at + 1,
    });
    if let Some(shot) = shot {
      self.emit(SurveyEvent::ShotsAdded {
        cave: self.id,
        chunk: id,
        shots: shot..shot + 1,
      });
    }

    self.sync_stations(before);
    Ok(at)
  }

  pub fn remove_station(
    &mut self,
    trip: usize,
    chunk: usize,
    index: usize,
    direction: Direction,
  ) -> Result<(), SurveyError> {
    let before = self.station_name_set();
    let (id, shot) = self.edit_chunk(trip, chunk, |c| c.remove_station(index, direction))?;
    self.emit(SurveyEvent::StationsRemoved {
      cave: self.id,
      chunk: id,
      stations: index..index + 1,
    });
    self.emit(SurveyEvent::ShotsRemoved {
      cave: self.id,
      chunk: id,
      shots: shot..shot + 1,
    });
    self.sync_stations(before);
    Ok(())
  }

  pub fn remove_shot(
    &mut self,
    trip: usize,
    chunk: usize,
    index: usize,
    direction: Direction,
  ) -> Result<(), SurveyError> {
    let before = self.station_name_set();
    let (id, station) = self.edit_chunk(trip, chunk, |c| c.remove_shot(index, direction))?;
    self.emit(SurveyEvent::ShotsRemoved {
      cave: self.id,
      chunk: id,
      shots: index..index + 1,
    });
    self.emit(SurveyEvent::StationsRemoved {
      cave: self.id,
      chunk: id,
      stations: station..station + 1,
    });
    self.sync_stations(before);
    Ok(())
  }

  /// Set one field of a chunk.
  ///
  /// Renaming a station attaches it to the cave's existing station of that
  /// name, if any. Other station fields are edited on the shared station, so
  /// every chunk tied to it sees the change.
  pub fn set_data(
    &mut self,
    trip: usize,
    chunk: usize,
    role: DataRole,
    index: usize,
    value: &str,
  ) -> Result<(), SurveyError> {
    let before = self.station_name_set();

    let id = if role == DataRole::StationName {
      let current = self.chunk_ref(trip, chunk)?;
      let mut renamed = Station::clone(current.station(index).ok_or(
        SurveyError::StationOutOfRange {
          index,
          len: current.station_count(),
        },
      )?);
      renamed.set_name(value);
      let renamed = self.share(renamed);
      self.edit_chunk(trip, chunk, |c| c.set_station(index, renamed))?.0
    } else if role.is_station_role() {
      let current = self.chunk_ref(trip, chunk)?;
      let id = current.id();
      let old = Arc::clone(current.station(index).ok_or(SurveyError::StationOutOfRange {
        index,
        len: current.station_count(),
      })?);
      let mut edited = Station::clone(&old);
      edited.set_data(role, value)?;
      self.replace_station(&old, Arc::new(edited))?;
      id
    } else {
      self.edit_chunk(trip, chunk, |c| c.set_data(role, index, value))?.0
    };

    self.emit(SurveyEvent::DataChanged {
      cave: self.id,
      chunk: id,
      role,
      index,
    });
    if role.is_station_role() && role != DataRole::StationName {
      if let Some(station) = self.chunk(trip, chunk).and_then(|c| c.station(index)) {
        self.emit(SurveyEvent::StationDataChanged {
          cave: self.id,
          name: station.name().to_owned(),
          role,
        });
      }
    }

    self.sync_stations(before);
    Ok(())
  }

  // ===========================================================================
  // Stations and positions
  // ===========================================================================

  pub fn has_station(&self, name: &str) -> bool {
    self.station(name).is_some()
  }

  /// Live station with this name, if any chunk still uses it.
  pub fn station(&self, name: &str) -> Option<Arc<Station>> {
    self.station_lookup.get(name).and_then(Weak::upgrade)
  }

  /// Every live station, ordered by name.
  pub fn stations(&self) -> Vec<Arc<Station>> {
    self
      .station_lookup
      .values()
      .filter_map(Weak::upgrade)
      .collect()
  }

  /// Names of every live station, ordered.
  pub fn station_names(&self) -> Vec<String> {
    self.stations().iter().map(|s| s.name().to_owned()).collect()
  }

  pub fn station_positions(&self) -> &StationPositionLookup {
    &self.positions
  }

  /// Replace the solved positions (published by the external solver).
  pub fn set_station_positions(&mut self, positions: StationPositionLookup) {
    self.positions = Arc::new(positions);
    self.emit(SurveyEvent::StationPositionsChanged { cave: self.id });
  }

  /// Immutable view for background readers.
  pub fn snapshot(&self) -> CaveSnapshot {
    CaveSnapshot {
      id: self.id,
      name: self.name.clone(),
      trips: self.trips.clone(),
      positions: Arc::clone(&self.positions),
    }
  }

  pub(crate) fn set_forward(&mut self, forward: Option<Notifier<SurveyEvent>>) {
    self.forward = forward;
  }

  // ===========================================================================
  // Internals
  // ===========================================================================

  fn emit(&self, event: SurveyEvent) {
    if let Some(forward) = &self.forward {
      forward.emit(event.clone());
    }
    self.events.emit(event);
  }

  fn check_trip(&self, trip: usize) -> Result<(), SurveyError> {
    if trip < self.trips.len() {
      Ok(())
    } else {
      Err(SurveyError::TripOutOfRange {
        index: trip,
        len: self.trips.len(),
      })
    }
  }

  fn chunk_ref(&self, trip: usize, chunk: usize) -> Result<&SurveyChunk, SurveyError> {
    let t = self.trip(trip).ok_or(SurveyError::TripOutOfRange {
      index: trip,
      len: self.trips.len(),
    })?;
    t.chunk(chunk).ok_or(SurveyError::ChunkOutOfRange {
      index: chunk,
      len: t.chunk_count(),
    })
  }

  /// Run `edit` on a chunk, cloning the trip and chunk first if a snapshot
  /// still shares them.
  fn edit_chunk<R>(
    &mut self,
    trip: usize,
    chunk: usize,
    edit: impl FnOnce(&mut SurveyChunk) -> Result<R, SurveyError>,
  ) -> Result<(ChunkId, R), SurveyError> {
    self.chunk_ref(trip, chunk)?;
    let target = Arc::make_mut(&mut self.trips[trip]).chunk_mut(chunk)?;
    let id = target.id();
    let result = edit(target)?;
    Ok((id, result))
  }

  /// Edit that only appends; announces the grown station and shot ranges.
  fn edit_growing(
    &mut self,
    trip: usize,
    chunk: usize,
    edit: impl FnOnce(&mut SurveyChunk) -> Result<(), SurveyError>,
  ) -> Result<(), SurveyError> {
    let before = self.station_name_set();
    let (id, (stations, shots)) = self.edit_chunk(trip, chunk, |c| {
      let counts = (c.station_count(), c.shot_count());
      edit(c)?;
      Ok((counts.0..c.station_count(), counts.1..c.shot_count()))
    })?;

    if !stations.is_empty() {
      self.emit(SurveyEvent::StationsAdded {
        cave: self.id,
        chunk: id,
        stations,
      });
    }
    if !shots.is_empty() {
      self.emit(SurveyEvent::ShotsAdded {
        cave: self.id,
        chunk: id,
        shots,
      });
    }

    self.sync_stations(before);
    Ok(())
  }

  fn insert_trips_at(&mut self, index: usize, trips: Vec<Trip>) {
    let before = self.station_name_set();
    let range = index..index + trips.len();

    let trips: Vec<Arc<Trip>> = trips
      .into_iter()
      .map(|mut trip| {
        for chunk in trip.chunks_mut() {
          self.adopt_stations(chunk);
        }
        Arc::new(trip)
      })
      .collect();

    self.emit(SurveyEvent::BeginInsertTrips {
      cave: self.id,
      trips: range.clone(),
    });
    self.trips.splice(index..index, trips);
    self.emit(SurveyEvent::InsertedTrips {
      cave: self.id,
      trips: range,
    });

    self.sync_stations(before);
  }

  /// Reuse the cave's live station for `station`'s name when the incoming
  /// one adds no measurements of its own.
  fn share(&self, station: Station) -> Arc<Station> {
    if let Some(live) = self.shareable(&station) {
      return live;
    }
    Arc::new(station)
  }

  fn shareable(&self, station: &Station) -> Option<Arc<Station>> {
    if station.name().is_empty() {
      return None;
    }
    let live = self.station(station.name())?;
    (*live == *station || station.has_no_measurements()).then_some(live)
  }

  /// Point a chunk built outside the cave at the cave's shared stations.
  fn adopt_stations(&self, chunk: &mut SurveyChunk) {
    for index in 0..chunk.station_count() {
      let Some(live) = chunk.station(index).and_then(|s| self.shareable(s)) else {
        continue;
      };
      // In range: index < station_count.
      let _ = chunk.set_station(index, live);
    }
  }

  /// Put `edited` in every chunk slot holding `old`.
  fn replace_station(
    &mut self,
    old: &Arc<Station>,
    edited: Arc<Station>,
  ) -> Result<(), SurveyError> {
    let mut slots = Vec::new();
    for (t, trip) in self.trips.iter().enumerate() {
      for (c, chunk) in trip.chunks().iter().enumerate() {
        for (s, station) in chunk.stations().iter().enumerate() {
          if Arc::ptr_eq(station, old) {
            slots.push((t, c, s));
          }
        }
      }
    }

    for (trip, chunk, index) in slots {
      self.edit_chunk(trip, chunk, |c| c.set_station(index, Arc::clone(&edited)))?;
    }
    Ok(())
  }

  fn station_name_set(&self) -> BTreeSet<String> {
    self.station_lookup.keys().cloned().collect()
  }

  /// Rebuild the registry from the chunks and announce membership changes.
  fn sync_stations(&mut self, before: BTreeSet<String>) {
    let mut lookup: BTreeMap<String, Weak<Station>> = BTreeMap::new();
    for station in self.trips.iter().flat_map(|trip| trip.stations()) {
      if station.name().is_empty() {
        continue;
      }
      lookup
        .entry(station.name().to_owned())
        .or_insert_with(|| Arc::downgrade(station));
    }

    let added: Vec<String> = lookup
      .keys()
      .filter(|name| !before.contains(*name))
      .cloned()
      .collect();
    let removed: Vec<String> = before
      .into_iter()
      .filter(|name| !lookup.contains_key(name))
      .collect();
    self.station_lookup = lookup;

    for name in removed {
      tracing::trace!(cave = %self.name, station = %name, "station left cave");
      self.emit(SurveyEvent::StationRemovedFromCave { cave: self.id, name });
    }
    for name in added {
      tracing::trace!(cave = %self.name, station = %name, "station joined cave");
      self.emit(SurveyEvent::StationAddedToCave { cave: self.id, name });
    }
  }
}

// =============================================================================
// CaveSnapshot
// =============================================================================

/// Immutable, cheaply cloned view of a cave taken on the owning thread.
///
/// Holds no notifier, so a snapshot never keeps the cave observable.
#[derive(Clone, Debug)]
pub struct CaveSnapshot {
  pub id: CaveId,
  pub name: String,
  pub trips: Vec<Arc<Trip>>,
  pub positions: Arc<StationPositionLookup>,
}

impl CaveSnapshot {
  /// Every chunk of every trip, in survey order.
  pub fn chunks(&self) -> impl Iterator<Item = &SurveyChunk> + '_ {
    self
      .trips
      .iter()
      .flat_map(|trip| trip.chunks().iter().map(Arc::as_ref))
  }
}

#[cfg(test)]
#[path = "cave_test.rs"]
mod cave_test;
