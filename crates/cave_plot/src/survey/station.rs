//! Station - a named survey point with optional passage dimensions.

use super::types::{DataRole, SurveyError};

/// A survey station.
///
/// Measurements are kept as entered; an empty string means "not measured".
/// Names are free text and only unique within a cave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Station {
  name: String,
  left: String,
  right: String,
  up: String,
  down: String,
}

impl Station {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  /// Station with left/right/up/down measurements.
  pub fn with_lrud(
    name: impl Into<String>,
    left: impl Into<String>,
    right: impl Into<String>,
    up: impl Into<String>,
    down: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      left: left.into(),
      right: right.into(),
      up: up.into(),
      down: down.into(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn set_name(&mut self, name: impl Into<String>) {
    self.name = name.into();
  }

  pub fn left(&self) -> &str {
    &self.left
  }

  pub fn right(&self) -> &str {
    &self.right
  }

  pub fn up(&self) -> &str {
    &self.up
  }

  pub fn down(&self) -> &str {
    &self.down
  }

  /// True when the station carries nothing but (possibly) a name.
  pub fn has_no_measurements(&self) -> bool {
    self.left.is_empty() && self.right.is_empty() && self.up.is_empty() && self.down.is_empty()
  }

  /// True for the blank placeholder kept at the end of a chunk being edited.
  pub fn is_empty(&self) -> bool {
    self.name.is_empty() && self.has_no_measurements()
  }

  pub fn data(&self, role: DataRole) -> Option<&str> {
    match role {
      DataRole::StationName => Some(&self.name),
      DataRole::StationLeft => Some(&self.left),
      DataRole::StationRight => Some(&self.right),
      DataRole::StationUp => Some(&self.up),
      DataRole::StationDown => Some(&self.down),
      _ => None,
    }
  }

  pub fn set_data(&mut self, role: DataRole, value: impl Into<String>) -> Result<(), SurveyError> {
    let field = match role {
      DataRole::StationName => &mut self.name,
      DataRole::StationLeft => &mut self.left,
      DataRole::StationRight => &mut self.right,
      DataRole::StationUp => &mut self.up,
      DataRole::StationDown => &mut self.down,
      _ => {
        return Err(SurveyError::WrongRole {
          role,
          target: "station",
        })
      }
    };
    *field = value.into();
    Ok(())
  }
}

/// Split a station name into its prefix and trailing decimal digits.
///
/// `"A12"` → `("A", "12")`, `"ENT"` → `("ENT", "")`.
pub fn split_trailing_number(name: &str) -> (&str, &str) {
  let digits = name
    .bytes()
    .rev()
    .take_while(u8::is_ascii_digit)
    .count();
  name.split_at(name.len() - digits)
}
