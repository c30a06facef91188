//! Trip - one survey outing, an ordered list of chunks.

use std::ops::Range;
use std::sync::Arc;

use super::chunk::SurveyChunk;
use super::station::Station;
use super::types::SurveyError;

/// Ordered chunks surveyed together. Chunks are shared copy-on-write.
#[derive(Clone, Debug, Default)]
pub struct Trip {
  name: String,
  chunks: Vec<Arc<SurveyChunk>>,
}

impl Trip {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      chunks: Vec::new(),
    }
  }

  /// Copy whose chunks all get fresh ids. A plain clone shares them.
  pub fn duplicate(&self) -> Self {
    Self {
      name: self.name.clone(),
      chunks: self
        .chunks
        .iter()
        .map(|chunk| Arc::new(chunk.duplicate()))
        .collect(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn set_name(&mut self, name: impl Into<String>) {
    self.name = name.into();
  }

  pub fn chunks(&self) -> &[Arc<SurveyChunk>] {
    &self.chunks
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  pub fn chunk(&self, index: usize) -> Option<&SurveyChunk> {
    self.chunks.get(index).map(Arc::as_ref)
  }

  /// Mutable access; clones the chunk if a snapshot still shares it.
  pub fn chunk_mut(&mut self, index: usize) -> Result<&mut SurveyChunk, SurveyError> {
    let len = self.chunks.len();
    self
      .chunks
      .get_mut(index)
      .map(Arc::make_mut)
      .ok_or(SurveyError::ChunkOutOfRange { index, len })
  }

  pub fn add_chunk(&mut self, chunk: SurveyChunk) -> usize {
    self.chunks.push(Arc::new(chunk));
    self.chunks.len() - 1
  }

  pub fn insert_chunk(&mut self, index: usize, chunk: SurveyChunk) -> Result<(), SurveyError> {
    if index > self.chunks.len() {
      return Err(SurveyError::ChunkOutOfRange {
        index,
        len: self.chunks.len(),
      });
    }
    self.chunks.insert(index, Arc::new(chunk));
    Ok(())
  }

  pub fn remove_chunks(&mut self, range: Range<usize>) -> Result<Vec<Arc<SurveyChunk>>, SurveyError> {
    if range.start > range.end || range.end > self.chunks.len() {
      return Err(SurveyError::ChunkOutOfRange {
        index: range.end,
        len: self.chunks.len(),
      });
    }
    Ok(self.chunks.drain(range).collect())
  }

  /// Every station reference in every chunk, in survey order.
  pub fn stations(&self) -> impl Iterator<Item = &Arc<Station>> + '_ {
    self.chunks.iter().flat_map(|chunk| chunk.stations().iter())
  }

  pub(crate) fn chunks_mut(&mut self) -> impl Iterator<Item = &mut SurveyChunk> + '_ {
    self.chunks.iter_mut().map(Arc::make_mut)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::survey::Shot;

  fn leg(from: &str, to: &str) -> SurveyChunk {
    let mut chunk = SurveyChunk::new();
    chunk
      .append_shot(
        Arc::new(Station::new(from)),
        Arc::new(Station::new(to)),
        Shot::default(),
      )
      .unwrap();
    chunk
  }

  #[test]
  fn test_chunk_edits() {
    let mut trip = Trip::new("Trip 1");
    trip.add_chunk(leg("A1", "A2"));
    trip.insert_chunk(0, leg("B1", "B2")).unwrap();
    assert_eq!(trip.chunk_count(), 2);
    assert_eq!(trip.chunk(0).unwrap().station(0).unwrap().name(), "B1");

    assert!(trip.insert_chunk(5, leg("C1", "C2")).is_err());

    let removed = trip.remove_chunks(0..1).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(trip.stations().count(), 2);
  }

  #[test]
  fn test_chunk_mut_is_copy_on_write() {
    let mut trip = Trip::new("Trip 1");
    trip.add_chunk(leg("A1", "A2"));
    let snapshot = trip.clone();

    trip.chunk_mut(0).unwrap().append_new_shot();

    assert_eq!(trip.chunk(0).unwrap().station_count(), 3);
    assert_eq!(snapshot.chunk(0).unwrap().station_count(), 2);
    assert_eq!(
      trip.chunk(0).unwrap().id(),
      snapshot.chunk(0).unwrap().id()
    );
  }

  #[test]
  fn test_duplicate_gets_new_chunk_ids() {
    let mut trip = Trip::new("Trip 1");
    trip.add_chunk(leg("A1", "A2"));
    trip.add_chunk(leg("A2", "A3"));

    let copy = trip.duplicate();
    assert_eq!(copy.name(), "Trip 1");
    assert_eq!(copy.chunk_count(), 2);
    for (original, duplicate) in trip.chunks().iter().zip(copy.chunks()) {
      assert_ne!(original.id(), duplicate.id());
      assert!(duplicate.is_valid());
    }
  }
}
