//! Shot - one measurement between two consecutive stations of a chunk.

use super::ids::ChunkId;
use super::types::{DataRole, SurveyError};

/// A survey shot. Readings are stored as entered; empty means "not measured".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shot {
  distance: String,
  distance_included: bool,
  compass: String,
  back_compass: String,
  clino: String,
  back_clino: String,
  parent_chunk: Option<ChunkId>,
}

impl Default for Shot {
  fn default() -> Self {
    Self {
      distance: String::new(),
      distance_included: true,
      compass: String::new(),
      back_compass: String::new(),
      clino: String::new(),
      back_clino: String::new(),
      parent_chunk: None,
    }
  }
}

impl Shot {
  /// Shot with forward readings only.
  pub fn new(
    distance: impl Into<String>,
    compass: impl Into<String>,
    clino: impl Into<String>,
  ) -> Self {
    Self {
      distance: distance.into(),
      compass: compass.into(),
      clino: clino.into(),
      ..Self::default()
    }
  }

  pub fn with_backsights(
    mut self,
    back_compass: impl Into<String>,
    back_clino: impl Into<String>,
  ) -> Self {
    self.back_compass = back_compass.into();
    self.back_clino = back_clino.into();
    self
  }

  pub fn distance(&self) -> &str {
    &self.distance
  }

  /// Whether the shot counts towards the surveyed length.
  pub fn distance_included(&self) -> bool {
    self.distance_included
  }

  pub fn compass(&self) -> &str {
    &self.compass
  }

  pub fn back_compass(&self) -> &str {
    &self.back_compass
  }

  pub fn clino(&self) -> &str {
    &self.clino
  }

  pub fn back_clino(&self) -> &str {
    &self.back_clino
  }

  /// Chunk this shot belongs to. Not an owning reference.
  pub fn parent_chunk(&self) -> Option<ChunkId> {
    self.parent_chunk
  }

  pub(crate) fn set_parent_chunk(&mut self, chunk: Option<ChunkId>) {
    self.parent_chunk = chunk;
  }

  pub fn is_empty(&self) -> bool {
    self.distance.is_empty()
      && self.compass.is_empty()
      && self.back_compass.is_empty()
      && self.clino.is_empty()
      && self.back_clino.is_empty()
  }

  pub fn data(&self, role: DataRole) -> Option<String> {
    let value = match role {
      DataRole::ShotDistance => &self.distance,
      DataRole::ShotDistanceIncluded => return Some(self.distance_included.to_string()),
      DataRole::ShotCompass => &self.compass,
      DataRole::ShotBackCompass => &self.back_compass,
      DataRole::ShotClino => &self.clino,
      DataRole::ShotBackClino => &self.back_clino,
      _ => return None,
    };
    Some(value.clone())
  }

  pub fn set_data(&mut self, role: DataRole, value: impl Into<String>) -> Result<(), SurveyError> {
    let value = value.into();
    let field = match role {
      DataRole::ShotDistance => &mut self.distance,
      DataRole::ShotCompass => &mut self.compass,
      DataRole::ShotBackCompass => &mut self.back_compass,
      DataRole::ShotClino => &mut self.clino,
      DataRole::ShotBackClino => &mut self.back_clino,
      DataRole::ShotDistanceIncluded => {
        self.distance_included = parse_flag(&value).ok_or(SurveyError::InvalidValue {
          role,
          value: value.clone(),
        })?;
        return Ok(());
      }
      _ => return Err(SurveyError::WrongRole { role, target: "shot" }),
    };
    *field = value;
    Ok(())
  }
}

fn parse_flag(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" => Some(true),
    "false" | "0" | "no" => Some(false),
    _ => None,
  }
}
