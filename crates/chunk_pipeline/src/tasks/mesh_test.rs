use std::sync::{Arc, Weak};

use glam::IVec3;

use super::*;
use crate::allocator::{AllocatorConfig, ChunkAllocator};
use crate::constants::{voxel_index, CHUNK_SIZE, CHUNK_SIZE_CB};
use crate::task_queue::TaskQueue;
use crate::types::{Face, StageState, VoxelId, AIR};

/// Merges any two exposed faces.
struct MergeAll;

impl MergeComparator for MergeAll {
  fn can_merge(&self, _a: VoxelId, _b: VoxelId, _face: Face) -> bool {
    true
  }
}

/// Merges only identical voxel ids.
struct MergeEqual;

impl MergeComparator for MergeEqual {
  fn can_merge(&self, a: VoxelId, b: VoxelId, _face: Face) -> bool {
    a == b
  }
}

fn empty_voxels() -> Vec<VoxelId> {
  vec![AIR; CHUNK_SIZE_CB]
}

fn slab(fill: impl Fn(usize, usize) -> VoxelId) -> Vec<VoxelId> {
  let mut voxels = empty_voxels();
  for x in 0..CHUNK_SIZE {
    for z in 0..CHUNK_SIZE {
      voxels[voxel_index(x, 0, z)] = fill(x, z);
    }
  }
  voxels
}

#[test]
fn single_voxel_has_six_faces() {
  let mut voxels = empty_voxels();
  voxels[voxel_index(5, 5, 5)] = 7;

  let naive = naive_mesh(&voxels);
  assert_eq!(naive.quad_count(), 6);
  assert!(naive.quads.iter().all(|q| q.voxel == 7));
  assert!(naive.quads.iter().all(|q| q.width == 1 && q.height == 1));

  let greedy = greedy_mesh(&voxels, &MergeAll);
  assert_eq!(greedy.quad_count(), 6);
}

#[test]
fn buried_voxel_has_no_faces() {
  let mut voxels = empty_voxels();
  for x in 4..7 {
    for y in 4..7 {
      for z in 4..7 {
        voxels[voxel_index(x, y, z)] = 1;
      }
    }
  }
  let naive = naive_mesh(&voxels);
  // 3×3×3 cube: 9 quads per side.
  assert_eq!(naive.quad_count(), 6 * 9);
  // The center voxel contributes nothing.
  assert!(!naive
    .quads
    .iter()
    .any(|q| q.origin == (5, 5, 5)));
}

#[test]
fn greedy_collapses_uniform_slab() {
  let voxels = slab(|_, _| 1);

  let naive = naive_mesh(&voxels);
  // 1024 up, 1024 down, 4×32 sides.
  assert_eq!(naive.quad_count(), 2 * CHUNK_SIZE * CHUNK_SIZE + 4 * CHUNK_SIZE);

  let greedy = greedy_mesh(&voxels, &MergeAll);
  // One quad per slab face.
  assert_eq!(greedy.quad_count(), 6);

  let top = greedy
    .quads
    .iter()
    .find(|q| q.face == Face::PosY)
    .unwrap();
  assert_eq!((top.width, top.height), (CHUNK_SIZE as u8, CHUNK_SIZE as u8));
}

#[test]
fn comparator_controls_merging_not_raw_equality() {
  // Checkerboard of two ids: raw-equality merging finds nothing to merge,
  // a comparator that treats both ids as interchangeable collapses the lot.
  let voxels = slab(|x, z| if (x + z) % 2 == 0 { 1 } else { 2 });

  let strict = greedy_mesh(&voxels, &MergeEqual);
  let top_strict = strict.quads.iter().filter(|q| q.face == Face::PosY).count();
  assert_eq!(top_strict, CHUNK_SIZE * CHUNK_SIZE);

  let loose = greedy_mesh(&voxels, &MergeAll);
  let top_loose = loose.quads.iter().filter(|q| q.face == Face::PosY).count();
  assert_eq!(top_loose, 1);
}

#[test]
fn greedy_never_exceeds_naive() {
  let mut voxels = empty_voxels();
  // Scattered towers of varying heights.
  for x in 0..CHUNK_SIZE {
    for z in 0..CHUNK_SIZE {
      let height = (x * 7 + z * 13) % 5;
      for y in 0..height {
        voxels[voxel_index(x, y, z)] = 1 + ((x + z) % 3) as VoxelId;
      }
    }
  }
  let naive = naive_mesh(&voxels);
  let greedy = greedy_mesh(&voxels, &MergeEqual);
  assert!(greedy.quad_count() <= naive.quad_count());
}

#[test]
fn mesh_task_waits_for_generation() {
  let alloc = ChunkAllocator::new(AllocatorConfig::default());
  let chunk = alloc.acquire(IVec3::ZERO).unwrap();
  let queue = TaskQueue::new();

  let binding = TaskBinding::new(Arc::downgrade(&chunk), Weak::new());
  let mut task = ChunkTask::MeshNaive(NaiveMeshTask::new(binding));

  // Not generated yet: incomplete, must be re-queued, not failed.
  assert!(!task.execute(&queue));
  assert_eq!(chunk.meshing().get(), StageState::None);

  chunk.voxels_mut()[voxel_index(0, 0, 0)] = 1;
  chunk.generation().finish();

  assert!(task.execute(&queue));
  assert_eq!(chunk.meshing().get(), StageState::Complete);
  assert_eq!(chunk.mesh().as_ref().unwrap().quad_count(), 6);
}

#[test]
fn greedy_task_stores_merged_mesh() {
  let alloc = ChunkAllocator::new(AllocatorConfig::default());
  let chunk = alloc.acquire(IVec3::ZERO).unwrap();
  let queue = TaskQueue::new();

  {
    let mut voxels = chunk.voxels_mut();
    for x in 0..CHUNK_SIZE {
      for z in 0..CHUNK_SIZE {
        voxels[voxel_index(x, 0, z)] = 1;
      }
    }
  }
  chunk.generation().finish();

  let binding = TaskBinding::new(Arc::downgrade(&chunk), Weak::new());
  let mut task = ChunkTask::MeshGreedy(GreedyMeshTask::new(binding, Arc::new(MergeAll)));
  assert!(task.execute(&queue));

  let mesh = chunk.mesh();
  let mesh = mesh.as_ref().unwrap();
  assert!(mesh.greedy);
  assert_eq!(mesh.quad_count(), 6);
}
