use super::*;

fn station(name: &str) -> Arc<Station> {
  Arc::new(Station::new(name))
}

fn chunk_of(names: &[&str]) -> SurveyChunk {
  let mut chunk = SurveyChunk::new();
  for pair in names.windows(2) {
    chunk
      .append_shot(station(pair[0]), station(pair[1]), Shot::new("10", "0", "0"))
      .unwrap();
  }
  chunk
}

fn names(chunk: &SurveyChunk) -> Vec<&str> {
  chunk.stations().iter().map(|s| s.name()).collect()
}

#[test]
fn test_append_shot_keeps_layout() {
  let chunk = chunk_of(&["A1", "A2", "A3"]);
  assert_eq!(chunk.station_count(), 3);
  assert_eq!(chunk.shot_count(), 2);
  assert!(chunk.is_valid());
  assert!(chunk
    .shots()
    .iter()
    .all(|shot| shot.parent_chunk() == Some(chunk.id())));
}

#[test]
fn test_append_shot_must_continue_line() {
  let mut chunk = chunk_of(&["A1", "A2"]);
  let err = chunk
    .append_shot(station("B1"), station("B2"), Shot::default())
    .unwrap_err();
  assert_eq!(
    err,
    SurveyError::NotConnected {
      from: "B1".into(),
      last: "A2".into()
    }
  );
  assert_eq!(chunk.station_count(), 2);
}

#[test]
fn test_append_new_shot_on_empty_chunk() {
  let mut chunk = SurveyChunk::new();
  chunk.append_new_shot();
  assert_eq!(chunk.station_count(), 2);
  assert_eq!(chunk.shot_count(), 1);
  assert!(chunk.is_station_and_shots_empty());
  assert!(chunk.is_valid());
}

#[test]
fn test_editing_keeps_one_trailing_blank() {
  let mut chunk = chunk_of(&["A1", "A2"]);
  chunk.set_editing(true);
  assert_eq!(chunk.station_count(), 3);
  assert!(chunk.station(2).unwrap().is_empty());

  // Already has a blank pair.
  chunk.set_editing(true);
  assert_eq!(chunk.station_count(), 3);
  assert!(chunk.is_valid());
}

#[test]
fn test_insert_station_above_and_below() {
  let mut chunk = chunk_of(&["A1", "A3"]);

  let (at, shot) = chunk
    .insert_station(1, Direction::Above, station("A2"))
    .unwrap();
  assert_eq!((at, shot), (1, Some(1)));
  assert_eq!(names(&chunk), ["A1", "A2", "A3"]);

  let (at, shot) = chunk
    .insert_station(2, Direction::Below, station("A4"))
    .unwrap();
  assert_eq!((at, shot), (3, Some(2)));
  assert_eq!(names(&chunk), ["A1", "A2", "A3", "A4"]);

  let (at, shot) = chunk
    .insert_station(0, Direction::Above, station("A0"))
    .unwrap();
  assert_eq!((at, shot), (0, Some(0)));
  assert_eq!(chunk.shot_count(), 4);
  assert!(chunk.is_valid());
}

#[test]
fn test_insert_into_empty_chunk() {
  let mut chunk = SurveyChunk::new();
  assert_eq!(
    chunk.insert_station(0, Direction::Below, station("A1")),
    Ok((0, None))
  );
  assert!(chunk.is_valid());
  assert!(matches!(
    chunk.insert_station(5, Direction::Below, station("A2")),
    Err(SurveyError::StationOutOfRange { index: 5, len: 1 })
  ));
}

#[test]
fn test_remove_station_rules() {
  let mut chunk = chunk_of(&["A1", "A2", "A3", "A4"]);

  assert!(!chunk.can_remove_station(0, Direction::Above));
  assert!(!chunk.can_remove_station(3, Direction::Below));
  assert!(chunk.can_remove_station(0, Direction::Below));
  assert!(chunk.can_remove_station(3, Direction::Above));

  assert_eq!(chunk.remove_station(1, Direction::Above), Ok(0));
  assert_eq!(names(&chunk), ["A1", "A3", "A4"]);
  assert!(chunk.is_valid());

  assert_eq!(chunk.remove_station(2, Direction::Above), Ok(1));
  assert_eq!(names(&chunk), ["A1", "A3"]);

  // Two stations is the minimum.
  assert!(!chunk.can_remove_station(0, Direction::Below));
  assert!(matches!(
    chunk.remove_station(0, Direction::Below),
    Err(SurveyError::CannotRemove { index: 0, .. })
  ));
}

#[test]
fn test_remove_shot_takes_station_on_given_side() {
  let mut chunk = chunk_of(&["A1", "A2", "A3"]);
  assert_eq!(chunk.remove_shot(0, Direction::Below), Ok(1));
  assert_eq!(names(&chunk), ["A1", "A3"]);
  assert!(chunk.is_valid());
  assert!(!chunk.can_remove_shot(0, Direction::Above));
}

#[test]
fn test_data_roundtrip_through_roles() {
  let mut chunk = chunk_of(&["A1", "A2"]);
  chunk.set_data(DataRole::StationUp, 1, "2.5").unwrap();
  chunk.set_data(DataRole::ShotCompass, 0, "123").unwrap();

  assert_eq!(chunk.data(DataRole::StationUp, 1).as_deref(), Some("2.5"));
  assert_eq!(chunk.data(DataRole::ShotCompass, 0).as_deref(), Some("123"));
  assert_eq!(chunk.data(DataRole::StationName, 0).as_deref(), Some("A1"));
  assert_eq!(chunk.data(DataRole::ShotDistance, 9), None);

  assert!(matches!(
    chunk.set_data(DataRole::ShotClino, 1, "0"),
    Err(SurveyError::ShotOutOfRange { index: 1, len: 1 })
  ));
}

#[test]
fn test_field_edit_does_not_touch_shared_station() {
  let shared = station("A2");
  let mut chunk = SurveyChunk::new();
  chunk
    .append_shot(station("A1"), Arc::clone(&shared), Shot::default())
    .unwrap();

  chunk.set_data(DataRole::StationLeft, 1, "3").unwrap();
  assert_eq!(shared.left(), "");
  assert_eq!(chunk.station(1).unwrap().left(), "3");
}

#[test]
fn test_duplicate_is_a_separate_chunk() {
  let chunk = chunk_of(&["A1", "A2", "A3"]);
  let copy = chunk.duplicate();

  assert_ne!(copy.id(), chunk.id());
  assert!(copy.is_valid());
  assert!(copy
    .shots()
    .iter()
    .all(|shot| shot.parent_chunk() == Some(copy.id())));
  assert!(Arc::ptr_eq(copy.station(1).unwrap(), chunk.station(1).unwrap()));

  // The copy-on-write clone stays the same chunk.
  assert_eq!(chunk.clone().id(), chunk.id());
}

#[test]
fn test_neighboring_stations() {
  let chunk = chunk_of(&["A1", "A2", "A3", "A2", "A4"]);
  let neighbors: Vec<String> = chunk
    .neighboring_stations("A2")
    .iter()
    .map(|s| s.name().to_owned())
    .collect();
  assert_eq!(neighbors, ["A1", "A3", "A4"]);
  assert_eq!(chunk.indices_of_station("A2"), vec![1, 3]);
  assert!(chunk.neighboring_stations("Z9").is_empty());
}

#[test]
fn test_guess_next_station() {
  let chunk = chunk_of(&["A8", "A9"]);
  assert_eq!(chunk.guess_next_station("A9").as_deref(), Some("A10"));
  assert_eq!(chunk.guess_next_station("B07").as_deref(), Some("B08"));
  assert_eq!(chunk.guess_next_station("ENT"), None);
  assert_eq!(chunk.guess_last_station_name().as_deref(), Some("A10"));
}

#[test]
fn test_guess_last_skips_trailing_blank() {
  let mut chunk = chunk_of(&["C1", "C2"]);
  chunk.set_editing(true);
  assert_eq!(chunk.guess_last_station_name().as_deref(), Some("C3"));
}
