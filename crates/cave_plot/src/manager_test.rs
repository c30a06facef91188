use std::sync::{Arc, RwLock};

use web_time::Instant;

use super::*;
use crate::config::ReductionConfig;
use crate::plot::{line_geometry, LineGeometryWork, LinePlotManager, UsedStationsManager, UsedStationsWork};
use crate::survey::SharedCave;
use crate::task::RunContext;
use crate::test_utils::{cave, chunk, line_positions, positions, region, TIMEOUT};
use crate::threading::WorkerThread;

fn shared_cave(name: &str, chunks: &[&[&str]]) -> SharedCave {
  Arc::new(RwLock::new(cave(name, chunks, positions(&[]))))
}

fn used_stations_manager(listening: bool) -> UsedStationsManager {
  let worker = WorkerThread::new("used-stations-test").unwrap();
  RecomputeTaskManager::new(
    Task::new("used-stations", UsedStationsWork::new(), worker),
    listening,
  )
}

/// Pump until the task is idle, then drain what it sent before going idle.
fn settle<W: RecomputeWork>(manager: &mut RecomputeTaskManager<W>) {
  let deadline = Instant::now() + TIMEOUT;
  loop {
    manager.update();
    if manager.task().is_ready() {
      manager.update();
      return;
    }
    assert!(Instant::now() < deadline, "manager never settled");
    std::thread::yield_now();
  }
}

/// Counts station names and refuses empty caves.
#[derive(Default)]
struct NameCountWork {
  names: Vec<String>,
}

impl TaskWork for NameCountWork {
  type Output = usize;

  fn run(&mut self, _ctx: &RunContext<'_>) -> Result<usize, TaskError> {
    if self.names.is_empty() {
      return Err(TaskError::Failed("no stations".into()));
    }
    Ok(self.names.len())
  }
}

impl RecomputeWork for NameCountWork {
  type Source = Cave;
  type Input = Vec<String>;

  fn capture(source: &Cave) -> Vec<String> {
    source.station_names()
  }

  fn set_input(&mut self, input: Vec<String>) {
    self.names = input;
  }

  fn is_relevant(event: &SurveyEvent) -> bool {
    event.is_station_membership()
  }
}

// =============================================================================
// Listening
// =============================================================================

#[test]
fn test_edits_while_not_listening_are_ignored() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(false);

  manager.set_source(Some(&cave));
  assert_eq!(manager.recompute_count(), 0);

  cave.write().unwrap().add_chunk(0, chunk(&["A2", "A3"])).unwrap();
  manager.update();
  assert_eq!(manager.recompute_count(), 0);
  assert!(manager.result().is_none());

  manager.set_listening_enabled(true);
  assert_eq!(manager.recompute_count(), 1);
  assert!(manager.wait_for_result(TIMEOUT));
  assert_eq!(manager.result().unwrap(), &["A1-A3"]);

  // Events from before listening was enabled are never replayed.
  settle(&mut manager);
  assert_eq!(manager.recompute_count(), 1);
}

#[test]
fn test_disabling_listening_drops_subscription() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  manager.set_source(Some(&cave));
  settle(&mut manager);

  manager.set_listening_enabled(false);
  cave.write().unwrap().add_chunk(0, chunk(&["B1", "B2"])).unwrap();
  assert_eq!(cave.read().unwrap().events().subscriber_count(), 0);

  manager.update();
  assert_eq!(manager.recompute_count(), 1);
  assert_eq!(manager.result().unwrap(), &["A1-A2"]);
}

#[test]
fn test_batch_of_edits_recomputes_once() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  manager.set_source(Some(&cave));
  assert_eq!(manager.recompute_count(), 1);
  settle(&mut manager);

  {
    let mut cave = cave.write().unwrap();
    cave.add_chunk(0, chunk(&["B1", "B2"])).unwrap();
    cave.add_chunk(0, chunk(&["C1", "C2"])).unwrap();
    cave.add_chunk(0, chunk(&["D1"])).unwrap();
  }
  manager.update();
  assert_eq!(manager.recompute_count(), 2);

  settle(&mut manager);
  assert_eq!(manager.result().unwrap(), &["A1-A2", "B1-B2", "C1-C2", "D1"]);
}

#[test]
fn test_irrelevant_events_do_not_recompute() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  manager.set_source(Some(&cave));
  settle(&mut manager);

  {
    let mut cave = cave.write().unwrap();
    cave.set_name("Renamed");
    cave.set_station_positions(line_positions(&["A1", "A2"]));
  }
  manager.update();
  assert_eq!(manager.recompute_count(), 1);
}

// =============================================================================
// Results
// =============================================================================

#[test]
fn test_result_change_is_published() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  let observer = manager.subscribe();

  manager.set_source(Some(&cave));
  assert!(manager.wait_for_result(TIMEOUT));

  let run = manager.result_run().unwrap();
  assert_eq!(observer.try_recv(), Ok(ManagerEvent::ResultChanged { run }));
  assert!(manager.progress().is_none());
}

#[test]
fn test_failure_is_recorded_and_cleared() {
  let cave = shared_cave("Main", &[]);
  let worker = WorkerThread::new("name-count-test").unwrap();
  let mut manager = RecomputeTaskManager::new(
    Task::new("name-count", NameCountWork::default(), worker),
    true,
  );

  manager.set_source(Some(&cave));
  settle(&mut manager);
  assert!(manager.result().is_none());
  assert!(matches!(manager.last_error(), Some(TaskError::Failed(_))));

  cave.write().unwrap().add_chunk(0, chunk(&["A1", "A2"])).unwrap();
  settle(&mut manager);
  assert_eq!(manager.result(), Some(&2));
  assert!(manager.last_error().is_none());
}

#[cfg(feature = "metrics")]
#[test]
fn test_runs_are_counted_in_metrics() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  manager.set_source(Some(&cave));
  settle(&mut manager);

  assert_eq!(manager.metrics().finished_runs, 1);
  assert_eq!(manager.metrics().run_timings.len(), 1);
}

// =============================================================================
// Sources
// =============================================================================

#[test]
fn test_destroyed_source_stops_recomputation() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  manager.set_source(Some(&cave));
  settle(&mut manager);

  drop(cave);
  manager.update();
  assert!(!manager.has_source());
  assert!(matches!(manager.recompute(), Err(TaskError::SourceGone)));
  assert_eq!(manager.recompute_count(), 1);

  // The last result outlives its source.
  assert_eq!(manager.result().unwrap(), &["A1-A2"]);
}

#[test]
fn test_enabling_listening_without_live_source() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(false);
  manager.set_source(Some(&cave));
  drop(cave);

  manager.set_listening_enabled(true);
  assert!(manager.is_listening());
  assert!(!manager.has_source());
  assert_eq!(manager.recompute_count(), 0);
  assert!(!manager.update());
  assert!(manager.result().is_none());
  assert!(manager.last_error().is_none());
}

#[test]
fn test_switching_sources() {
  let first = shared_cave("First", &[&["A1", "A2"]]);
  let second = shared_cave("Second", &[&["B1", "B2"]]);
  let mut manager = used_stations_manager(true);

  manager.set_source(Some(&first));
  settle(&mut manager);
  manager.set_source(Some(&first));
  assert_eq!(manager.recompute_count(), 1);

  manager.set_source(Some(&second));
  assert_eq!(manager.recompute_count(), 2);
  settle(&mut manager);
  assert_eq!(manager.result().unwrap(), &["B1-B2"]);

  first.write().unwrap().add_chunk(0, chunk(&["A3", "A4"])).unwrap();
  manager.update();
  assert_eq!(manager.recompute_count(), 2);
  assert_eq!(first.read().unwrap().events().subscriber_count(), 0);
}

#[test]
fn test_clearing_source() {
  let cave = shared_cave("Main", &[&["A1", "A2"]]);
  let mut manager = used_stations_manager(true);
  manager.set_source(Some(&cave));
  settle(&mut manager);

  manager.set_source(None);
  assert!(!manager.has_source());
  assert!(matches!(manager.recompute(), Err(TaskError::SourceGone)));
  assert_eq!(manager.recompute_count(), 1);
}

// =============================================================================
// Line plot
// =============================================================================

fn line_plot_manager() -> LinePlotManager {
  let worker = WorkerThread::new("line-plot-manager-test").unwrap();
  RecomputeTaskManager::new(
    Task::new("line-plot", LineGeometryWork::new(ReductionConfig::default()), worker),
    true,
  )
}

#[test]
fn test_line_plot_follows_region_edits() {
  let main = cave("Main", &[&["A1", "A2"]], line_positions(&["A1", "A2"]));
  let region = Arc::new(RwLock::new(region(vec![main])));
  let mut manager = line_plot_manager();

  manager.set_source(Some(&region));
  settle(&mut manager);
  assert_eq!(manager.result().unwrap().edge_count(), 1);

  let cave = region.read().unwrap().cave(0).unwrap();
  {
    let mut cave = cave.write().unwrap();
    cave.add_chunk(0, chunk(&["A2", "A3"])).unwrap();
    cave.set_station_positions(line_positions(&["A1", "A2", "A3"]));
  }
  settle(&mut manager);

  let geometry = manager.result().unwrap();
  assert_eq!(geometry.point_count(), 3);
  assert_eq!(geometry.edge_count(), 2);
  assert!(geometry.missing_stations.is_empty());
}

#[test]
fn test_line_plot_result_matches_latest_edit() {
  let main = cave("Main", &[&["S0", "S1"]], line_positions(&["S0", "S1"]));
  let region = Arc::new(RwLock::new(region(vec![main])));
  let cave = region.read().unwrap().cave(0).unwrap();
  let mut manager = line_plot_manager();
  manager.set_source(Some(&region));

  // Edits land while earlier runs are still in flight.
  let mut names = vec!["S0".to_owned(), "S1".to_owned()];
  for i in 2..20 {
    let from = format!("S{}", i - 1);
    let to = format!("S{i}");
    names.push(to.clone());
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    {
      let mut cave = cave.write().unwrap();
      cave.add_chunk(0, chunk(&[from.as_str(), to.as_str()])).unwrap();
      cave.set_station_positions(line_positions(&refs));
    }
    manager.update();
  }
  settle(&mut manager);

  let expected = line_geometry::reduce(&region.read().unwrap().snapshot(), &ReductionConfig::default());
  assert_eq!(**manager.result().unwrap(), expected);
  assert_eq!(expected.edge_count(), 19);
}
