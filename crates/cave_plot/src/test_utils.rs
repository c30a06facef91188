//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{self as channel, Receiver, RecvTimeoutError, Sender};
use glam::Vec3;
use web_time::Instant;

use crate::survey::{Cave, Region, Shot, Station, StationPositionLookup, SurveyChunk, Trip};
use crate::task::{RunContext, RunId, Task, TaskError, TaskEvent, TaskState, TaskWork};

/// Upper bound for any wait in a test.
pub const TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Task probes
// =============================================================================

/// Work that reports entry, then blocks until the test opens its gate.
pub struct ProbeWork {
  pub input: u32,
  runs: Arc<AtomicUsize>,
  entered: Sender<(RunId, u32)>,
  gate: Receiver<()>,
}

/// Test-side ends of a [`ProbeWork`].
pub struct ProbeHandles {
  /// Number of runs that reached the work.
  pub runs: Arc<AtomicUsize>,
  /// `(run, input)` sent as each run starts.
  pub entered: Receiver<(RunId, u32)>,
  /// One message lets one run finish.
  pub gate: Sender<()>,
}

pub fn probe(input: u32) -> (ProbeWork, ProbeHandles) {
  let runs = Arc::new(AtomicUsize::new(0));
  let (entered_tx, entered_rx) = channel::unbounded();
  let (gate_tx, gate_rx) = channel::unbounded();
  (
    ProbeWork {
      input,
      runs: Arc::clone(&runs),
      entered: entered_tx,
      gate: gate_rx,
    },
    ProbeHandles {
      runs,
      entered: entered_rx,
      gate: gate_tx,
    },
  )
}

impl TaskWork for ProbeWork {
  type Output = u32;

  fn run(&mut self, ctx: &RunContext<'_>) -> Result<u32, TaskError> {
    self.runs.fetch_add(1, Ordering::SeqCst);
    let _ = self.entered.send((ctx.run(), self.input));
    loop {
      match self.gate.recv_timeout(Duration::from_millis(1)) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(self.input),
        Err(RecvTimeoutError::Timeout) => ctx.checkpoint()?,
      }
    }
  }
}

/// Receive events until `terminal` runs have ended. Panics on timeout.
pub fn collect_terminal<W: TaskWork>(task: &Task<W>, terminal: usize) -> Vec<TaskEvent<W::Output>> {
  let deadline = Instant::now() + TIMEOUT;
  let mut events = Vec::new();
  let mut seen = 0;
  while seen < terminal {
    let remaining = deadline.saturating_duration_since(Instant::now());
    let Some(event) = task.recv_event_timeout(remaining) else {
      panic!("timed out waiting for {terminal} terminal events, got {seen}");
    };
    if event.is_terminal() {
      seen += 1;
    }
    events.push(event);
  }
  events
}

/// Poll until the task is idle. The terminal event is sent before the state
/// flips, so this closes the small gap after [`collect_terminal`].
pub fn wait_until_idle<W: TaskWork>(task: &Task<W>) {
  let deadline = Instant::now() + TIMEOUT;
  while task.state() != TaskState::Idle {
    assert!(Instant::now() < deadline, "task {} never went idle", task.name());
    std::thread::yield_now();
  }
}

// =============================================================================
// Survey fixtures
// =============================================================================

/// Chunk visiting `names` in order, one shot per consecutive pair.
pub fn chunk(names: &[&str]) -> SurveyChunk {
  let mut chunk = SurveyChunk::new();
  match names {
    [] => {}
    [only] => {
      chunk
        .insert_station(0, crate::survey::Direction::Above, Arc::new(Station::new(*only)))
        .unwrap();
    }
    _ => {
      for pair in names.windows(2) {
        chunk
          .append_shot(
            Arc::new(Station::new(pair[0])),
            Arc::new(Station::new(pair[1])),
            Shot::new("10", "0", "0"),
          )
          .unwrap();
      }
    }
  }
  chunk
}

pub fn positions(entries: &[(&str, [f32; 3])]) -> StationPositionLookup {
  entries
    .iter()
    .map(|(name, p)| (*name, Vec3::from_array(*p)))
    .collect()
}

/// Positions along the x axis for every name, 1 m apart.
pub fn line_positions(names: &[&str]) -> StationPositionLookup {
  names
    .iter()
    .enumerate()
    .map(|(i, name)| (*name, Vec3::new(i as f32, 0.0, 0.0)))
    .collect()
}

/// Cave with a single trip holding `chunks`, plus the given positions.
pub fn cave(name: &str, chunks: &[&[&str]], positions: StationPositionLookup) -> Cave {
  let mut cave = Cave::new(name);
  let trip = cave.add_trip(Trip::new("Trip 1"));
  for names in chunks {
    cave.add_chunk(trip, chunk(names)).unwrap();
  }
  cave.set_station_positions(positions);
  cave
}

pub fn region(caves: Vec<Cave>) -> Region {
  let mut region = Region::new();
  for cave in caves {
    region.add_cave(cave);
  }
  region
}
