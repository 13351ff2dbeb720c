//! Chunk meshing tasks: naive (one quad per exposed face) and greedy
//! (comparator-driven rectangle merging).
//!
//! Both require the chunk's generation stage to be complete; until then the
//! task reports incomplete and is re-queued.

use std::sync::Arc;

use glam::IVec3;
use tracing::trace;

use crate::constants::{voxel_index, CHUNK_SIZE, CHUNK_SIZE_SQ};
use crate::task_queue::TaskQueue;
use crate::types::{Face, VoxelId, AIR};

use super::{ChunkMesh, MergeComparator, MeshQuad, TaskBinding};

/// Map a face's (slice, u, v) coordinates to voxel (x, y, z).
///
/// The slice runs along the face normal's axis; u/v span the quad plane.
#[inline]
fn face_cell(face: Face, s: usize, u: usize, v: usize) -> (usize, usize, usize) {
  match face {
    Face::PosX | Face::NegX => (s, v, u),
    Face::PosY | Face::NegY => (u, s, v),
    Face::PosZ | Face::NegZ => (u, v, s),
  }
}

/// The voxel at (x, y, z) if it exposes a face in `face`'s direction:
/// non-air with air (or the chunk boundary) on the far side.
#[inline]
fn exposed(voxels: &[VoxelId], x: usize, y: usize, z: usize, face: Face) -> Option<VoxelId> {
  let voxel = voxels[voxel_index(x, y, z)];
  if voxel == AIR {
    return None;
  }
  let n = IVec3::new(x as i32, y as i32, z as i32) + face.normal();
  let outside = n.cmplt(IVec3::ZERO).any() || n.cmpge(IVec3::splat(CHUNK_SIZE as i32)).any();
  if outside || voxels[voxel_index(n.x as usize, n.y as usize, n.z as usize)] == AIR {
    Some(voxel)
  } else {
    None
  }
}

/// One 1×1 quad per exposed voxel face.
pub fn naive_mesh(voxels: &[VoxelId]) -> ChunkMesh {
  let mut quads = Vec::new();
  for face in Face::ALL {
    for x in 0..CHUNK_SIZE {
      for y in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
          if let Some(voxel) = exposed(voxels, x, y, z, face) {
            quads.push(MeshQuad {
              face,
              voxel,
              origin: (x as u8, y as u8, z as u8),
              width: 1,
              height: 1,
            });
          }
        }
      }
    }
  }
  ChunkMesh {
    quads,
    greedy: false,
  }
}

/// Greedy rectangle merge per face slice.
///
/// Within each slice a 2D mask of exposed faces is swept row-major; each
/// unvisited cell seeds a rectangle grown first along U, then along V while
/// every covered cell is comparator-mergeable with the seed. The comparator
/// decides merge-equality, so distinct voxel ids can still share a quad.
pub fn greedy_mesh(voxels: &[VoxelId], comparator: &dyn MergeComparator) -> ChunkMesh {
  let mut quads = Vec::new();
  let mut mask: [Option<VoxelId>; CHUNK_SIZE_SQ] = [None; CHUNK_SIZE_SQ];

  for face in Face::ALL {
    for s in 0..CHUNK_SIZE {
      for v in 0..CHUNK_SIZE {
        for u in 0..CHUNK_SIZE {
          let (x, y, z) = face_cell(face, s, u, v);
          mask[v * CHUNK_SIZE + u] = exposed(voxels, x, y, z, face);
        }
      }

      for v in 0..CHUNK_SIZE {
        let mut u = 0;
        while u < CHUNK_SIZE {
          let Some(seed) = mask[v * CHUNK_SIZE + u] else {
            u += 1;
            continue;
          };

          let mut width = 1;
          while u + width < CHUNK_SIZE {
            match mask[v * CHUNK_SIZE + u + width] {
              Some(c) if comparator.can_merge(seed, c, face) => width += 1,
              _ => break,
            }
          }

          let mut height = 1;
          'grow: while v + height < CHUNK_SIZE {
            for du in 0..width {
              match mask[(v + height) * CHUNK_SIZE + u + du] {
                Some(c) if comparator.can_merge(seed, c, face) => {}
                _ => break 'grow,
              }
            }
            height += 1;
          }

          for dv in 0..height {
            for du in 0..width {
              mask[(v + dv) * CHUNK_SIZE + u + du] = None;
            }
          }

          let (x, y, z) = face_cell(face, s, u, v);
          quads.push(MeshQuad {
            face,
            voxel: seed,
            origin: (x as u8, y as u8, z as u8),
            width: width as u8,
            height: height as u8,
          });
          u += width;
        }
      }
    }
  }

  ChunkMesh {
    quads,
    greedy: true,
  }
}

/// Naive meshing task.
pub struct NaiveMeshTask {
  pub(super) binding: TaskBinding,
}

impl NaiveMeshTask {
  pub fn new(binding: TaskBinding) -> Self {
    Self { binding }
  }

  pub(super) fn run(&mut self, _queue: &TaskQueue) -> bool {
    let Some(chunk) = self.binding.chunk() else {
      return true;
    };
    if !chunk.generation().is_complete() {
      trace!(pos = ?chunk.position(), "mesh waiting on generation");
      return false;
    }

    let _claim = chunk.claim();
    chunk.meshing().begin();
    let mesh = {
      let voxels = chunk.voxels();
      naive_mesh(&voxels)
    };
    chunk.set_mesh(mesh);
    chunk.meshing().finish();
    true
  }
}

/// Greedy meshing task with a pluggable merge comparator.
pub struct GreedyMeshTask {
  pub(super) binding: TaskBinding,
  comparator: Arc<dyn MergeComparator>,
}

impl GreedyMeshTask {
  pub fn new(binding: TaskBinding, comparator: Arc<dyn MergeComparator>) -> Self {
    Self {
      binding,
      comparator,
    }
  }

  pub(super) fn run(&mut self, _queue: &TaskQueue) -> bool {
    let Some(chunk) = self.binding.chunk() else {
      return true;
    };
    if !chunk.generation().is_complete() {
      trace!(pos = ?chunk.position(), "mesh waiting on generation");
      return false;
    }

    let _claim = chunk.claim();
    chunk.meshing().begin();
    let mesh = {
      let voxels = chunk.voxels();
      greedy_mesh(&voxels, &*self.comparator)
    };
    chunk.set_mesh(mesh);
    chunk.meshing().finish();
    true
  }
}
