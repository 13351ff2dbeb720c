use super::*;

#[test]
fn index_round_trip() {
  for &(x, y, z) in &[(0, 0, 0), (1, 2, 3), (31, 31, 31), (16, 0, 31)] {
    let idx = voxel_index(x, y, z);
    assert_eq!(index_to_voxel(idx), (x, y, z));
  }
}

#[test]
fn index_strides() {
  assert_eq!(voxel_index(0, 0, 1), 1);
  assert_eq!(voxel_index(0, 1, 0), CHUNK_SIZE);
  assert_eq!(voxel_index(1, 0, 0), CHUNK_SIZE_SQ);
  assert_eq!(voxel_index(31, 31, 31), CHUNK_SIZE_CB - 1);
}

#[test]
fn index_is_dense() {
  // Every coordinate maps to a unique index below CHUNK_SIZE_CB.
  let mut seen = vec![false; CHUNK_SIZE_CB];
  for x in 0..CHUNK_SIZE {
    for y in 0..CHUNK_SIZE {
      for z in 0..CHUNK_SIZE {
        let idx = voxel_index(x, y, z);
        assert!(!seen[idx]);
        seen[idx] = true;
      }
    }
  }
  assert!(seen.iter().all(|&s| s));
}
