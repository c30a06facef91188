//! Region - the ordered set of caves of one project.

use std::sync::{Arc, PoisonError, RwLock};

use crossbeam_channel::Receiver;

use super::cave::{Cave, CaveSnapshot};
use super::events::SurveyEvent;
use super::types::SurveyError;
use crate::notify::Notifier;

/// A cave shared between the editor and the region.
pub type SharedCave = Arc<RwLock<Cave>>;

/// Ordered caves. A cave's position in the region is its ordinal in station
/// keys. Every event of a member cave is forwarded to the region's bus.
#[derive(Debug, Default)]
pub struct Region {
  caves: Vec<SharedCave>,
  events: Notifier<SurveyEvent>,
}

impl Region {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> &Notifier<SurveyEvent> {
    &self.events
  }

  pub fn subscribe(&self) -> Receiver<SurveyEvent> {
    self.events.subscribe()
  }

  pub fn cave_count(&self) -> usize {
    self.caves.len()
  }

  pub fn cave(&self, index: usize) -> Option<SharedCave> {
    self.caves.get(index).cloned()
  }

  pub fn caves(&self) -> &[SharedCave] {
    &self.caves
  }

  /// Append a cave and return the shared handle.
  pub fn add_cave(&mut self, cave: Cave) -> SharedCave {
    let index = self.caves.len();
    self.insert_at(index, cave)
  }

  pub fn insert_cave(&mut self, index: usize, cave: Cave) -> Result<SharedCave, SurveyError> {
    if index > self.caves.len() {
      return Err(SurveyError::CaveOutOfRange {
        index,
        len: self.caves.len(),
      });
    }
    Ok(self.insert_at(index, cave))
  }

  /// Detach a cave. It stops forwarding events to the region.
  pub fn remove_cave(&mut self, index: usize) -> Result<SharedCave, SurveyError> {
    if index >= self.caves.len() {
      return Err(SurveyError::CaveOutOfRange {
        index,
        len: self.caves.len(),
      });
    }
    let cave = self.caves.remove(index);
    let id = {
      let mut guard = cave.write().unwrap_or_else(PoisonError::into_inner);
      guard.set_forward(None);
      guard.id()
    };
    self.events.emit(SurveyEvent::CaveRemoved { cave: id, index });
    Ok(cave)
  }

  /// Immutable view of every cave, taken under each cave's read lock.
  pub fn snapshot(&self) -> RegionSnapshot {
    RegionSnapshot {
      caves: self
        .caves
        .iter()
        .map(|cave| cave.read().unwrap_or_else(PoisonError::into_inner).snapshot())
        .collect(),
    }
  }

  fn insert_at(&mut self, index: usize, mut cave: Cave) -> SharedCave {
    cave.set_forward(Some(self.events.clone()));
    let id = cave.id();
    let shared = Arc::new(RwLock::new(cave));
    self.caves.insert(index, Arc::clone(&shared));
    self.events.emit(SurveyEvent::CaveAdded { cave: id, index });
    shared
  }
}

/// Region contents as seen by one background run.
#[derive(Clone, Debug, Default)]
pub struct RegionSnapshot {
  pub caves: Vec<CaveSnapshot>,
}

impl RegionSnapshot {
  pub fn cave_count(&self) -> usize {
    self.caves.len()
  }
}
