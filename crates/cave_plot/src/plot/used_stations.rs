//! Used stations - the compact list of station names a cave already uses.
//!
//! Shown to surveyors picking the next free station name. Runs of
//! consecutively numbered stations collapse into ranges:
//!
//! ```text
//! A1 A2 A3 A4 A5 A7 B1 ENT  →  A1-A5, A7, B1, ENT
//! ```

use crate::survey::{split_trailing_number, Cave, SurveyEvent};
use crate::task::{RunContext, TaskError, TaskWork};

struct Entry<'a> {
  name: &'a str,
  prefix: String,
  number: Option<u64>,
}

/// Sort station names and collapse consecutive numbers sharing a prefix.
///
/// Prefixes compare case-insensitively. Names without a trailing number are
/// listed on their own.
pub fn compress_station_names<I, S>(names: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let names: Vec<S> = names.into_iter().collect();
  let mut entries: Vec<Entry<'_>> = names
    .iter()
    .map(|name| {
      let name = name.as_ref();
      let (prefix, digits) = split_trailing_number(name);
      Entry {
        name,
        prefix: prefix.to_lowercase(),
        number: digits.parse().ok(),
      }
    })
    .filter(|entry| !entry.name.is_empty())
    .collect();

  entries.sort_by(|a, b| {
    (&a.prefix, a.number, a.name).cmp(&(&b.prefix, b.number, b.name))
  });
  entries.dedup_by(|a, b| a.name == b.name);

  let mut compressed = Vec::new();
  let mut start = 0;
  while start < entries.len() {
    let mut end = start;
    while let (Some(current), Some(next)) = (entries[end].number, entries.get(end + 1)) {
      if next.prefix != entries[start].prefix || next.number != current.checked_add(1) {
        break;
      }
      end += 1;
    }

    if end > start {
      compressed.push(format!("{}-{}", entries[start].name, entries[end].name));
    } else {
      compressed.push(entries[start].name.to_owned());
    }
    start = end + 1;
  }
  compressed
}

/// Background computation of a cave's used-station list.
#[derive(Debug, Default)]
pub struct UsedStationsWork {
  station_names: Vec<String>,
}

impl UsedStationsWork {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_station_names(&mut self, names: Vec<String>) {
    self.station_names = names;
  }
}

impl TaskWork for UsedStationsWork {
  type Output = Vec<String>;

  #[tracing::instrument(skip_all, name = "plot::used_stations")]
  fn run(&mut self, ctx: &RunContext<'_>) -> Result<Vec<String>, TaskError> {
    ctx.checkpoint()?;
    Ok(compress_station_names(&self.station_names))
  }
}

impl crate::manager::RecomputeWork for UsedStationsWork {
  type Source = Cave;
  type Input = Vec<String>;

  fn capture(source: &Cave) -> Vec<String> {
    source.station_names()
  }

  fn set_input(&mut self, input: Vec<String>) {
    self.station_names = input;
  }

  fn is_relevant(event: &SurveyEvent) -> bool {
    event.is_station_membership()
  }
}
