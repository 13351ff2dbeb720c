use super::*;

#[test]
fn chunk_id_round_trip() {
  for &pos in &[
    IVec3::ZERO,
    IVec3::new(1, 0, 0),
    IVec3::new(-1, -2, -3),
    IVec3::new(MAX_CHUNK_COORD, -(MAX_CHUNK_COORD + 1), 12345),
  ] {
    let id = ChunkId::from_pos(pos);
    assert_eq!(id.to_pos(), pos, "round trip failed for {pos}");
  }
}

#[test]
fn chunk_id_is_injective_near_origin() {
  use std::collections::HashSet;
  let mut seen = HashSet::new();
  for x in -3..=3 {
    for y in -3..=3 {
      for z in -3..=3 {
        assert!(seen.insert(ChunkId::from_pos(IVec3::new(x, y, z))));
      }
    }
  }
}

#[test]
fn stitch_dir_opposites() {
  for dir in StitchDir::ALL {
    assert_eq!(dir.opposite().opposite(), dir);
    assert_eq!(dir.offset() + dir.opposite().offset(), IVec3::ZERO);
  }
}

#[test]
fn stitch_dir_offsets_are_lateral() {
  for dir in StitchDir::ALL {
    assert_eq!(dir.offset().y, 0);
    assert_ne!(dir.offset(), IVec3::ZERO);
  }
}

#[test]
fn stage_transitions() {
  let stage = StageAtomic::default();
  assert_eq!(stage.get(), StageState::None);

  stage.mark_pending();
  assert_eq!(stage.get(), StageState::Pending);

  assert_eq!(stage.begin(), StageState::Pending);
  assert_eq!(stage.get(), StageState::Active);

  stage.finish();
  assert!(stage.is_complete());

  // mark_pending must not regress a completed stage.
  stage.mark_pending();
  assert!(stage.is_complete());
}
