//! Navmesh tasks: per-chunk bulk walkability and the eight directional
//! stitch passes joining walkable surfaces across chunk boundaries.
//!
//! A stitch in direction `d` requires the neighbour chunk in `d` to have
//! finished its own bulk pass; until then the stitch reports incomplete and
//! circulates through the queue. Each direction's progress lives in its own
//! atomic slot on the chunk, so stitches against different neighbours run
//! concurrently without touching each other.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::constants::{voxel_index, CHUNK_SIZE, CHUNK_SIZE_CB, STEP_HEIGHT, WALK_CLEARANCE};
use crate::events::GridEvent;
use crate::task_queue::TaskQueue;
use crate::types::{StitchDir, VoxelId};

use super::{NavmeshData, SolidityPredicate, TaskBinding};

/// Walkability over a voxel buffer: a cell is walkable when it is solid and
/// has `WALK_CLEARANCE` non-solid cells above it (the space above the chunk
/// counts as clear).
pub fn compute_walkable(voxels: &[VoxelId], solidity: &dyn SolidityPredicate) -> NavmeshData {
  let mut walkable = vec![false; CHUNK_SIZE_CB];
  for x in 0..CHUNK_SIZE {
    for z in 0..CHUNK_SIZE {
      for y in 0..CHUNK_SIZE {
        if !solidity.is_solid(voxels[voxel_index(x, y, z)]) {
          continue;
        }
        let clear = (1..=WALK_CLEARANCE).all(|dy| {
          y + dy >= CHUNK_SIZE || !solidity.is_solid(voxels[voxel_index(x, y + dy, z)])
        });
        walkable[voxel_index(x, y, z)] = clear;
      }
    }
  }
  NavmeshData::new(walkable)
}

/// Column pairs along the shared boundary for a stitch direction, as
/// `((own_x, own_z), (neighbour_x, neighbour_z))` in each chunk's local
/// coordinates. Edge directions pair a full row of columns; diagonals a
/// single corner column.
fn boundary_columns(dir: StitchDir) -> Vec<((usize, usize), (usize, usize))> {
  const M: usize = CHUNK_SIZE - 1;
  match dir {
    StitchDir::North => (0..CHUNK_SIZE).map(|x| ((x, 0), (x, M))).collect(),
    StitchDir::South => (0..CHUNK_SIZE).map(|x| ((x, M), (x, 0))).collect(),
    StitchDir::East => (0..CHUNK_SIZE).map(|z| ((M, z), (0, z))).collect(),
    StitchDir::West => (0..CHUNK_SIZE).map(|z| ((0, z), (M, z))).collect(),
    StitchDir::NorthEast => vec![((M, 0), (0, M))],
    StitchDir::SouthEast => vec![((M, M), (0, 0))],
    StitchDir::SouthWest => vec![((0, M), (M, 0))],
    StitchDir::NorthWest => vec![((0, 0), (M, M))],
  }
}

/// Count walkable-to-walkable links across the boundary: a link joins two
/// walkable cells in facing columns whose heights differ by at most
/// `STEP_HEIGHT`.
fn count_links(own: &NavmeshData, other: &NavmeshData, dir: StitchDir) -> u32 {
  let mut links = 0;
  for ((ox, oz), (nx, nz)) in boundary_columns(dir) {
    for &h in &own.column_heights(ox, oz) {
      for &nh in &other.column_heights(nx, nz) {
        if h.abs_diff(nh) as usize <= STEP_HEIGHT {
          links += 1;
        }
      }
    }
  }
  links
}

/// Computes the chunk's walkability grid once generation is complete.
pub struct NavmeshBulkTask {
  pub(super) binding: TaskBinding,
  solidity: Arc<dyn SolidityPredicate>,
}

impl NavmeshBulkTask {
  pub fn new(binding: TaskBinding, solidity: Arc<dyn SolidityPredicate>) -> Self {
    Self { binding, solidity }
  }

  pub(super) fn run(&mut self, _queue: &TaskQueue) -> bool {
    let Some(chunk) = self.binding.chunk() else {
      return true;
    };
    if !chunk.generation().is_complete() {
      trace!(pos = ?chunk.position(), "navmesh bulk waiting on generation");
      return false;
    }

    let _claim = chunk.claim();
    chunk.navmesh().begin();
    let nav = {
      let voxels = chunk.voxels();
      compute_walkable(&voxels, &*self.solidity)
    };
    let cells = nav.walkable_count();
    chunk.set_nav(nav);
    chunk.navmesh().finish();
    debug!(pos = ?chunk.position(), cells, "navmesh bulk pass complete");

    if let Some(grid) = self.binding.grid() {
      grid.events().emit(&GridEvent::NavmeshChanged {
        pos: chunk.position(),
      });
    }
    true
  }
}

/// Joins this chunk's walkable surface to one neighbour's.
pub struct NavmeshStitchTask {
  pub(super) binding: TaskBinding,
  dir: StitchDir,
}

impl NavmeshStitchTask {
  pub fn new(binding: TaskBinding, dir: StitchDir) -> Self {
    Self { binding, dir }
  }

  pub fn dir(&self) -> StitchDir {
    self.dir
  }

  pub(super) fn run(&mut self, _queue: &TaskQueue) -> bool {
    let Some(chunk) = self.binding.chunk() else {
      return true;
    };
    if !chunk.navmesh().is_complete() {
      trace!(pos = ?chunk.position(), dir = ?self.dir, "stitch waiting on own bulk pass");
      return false;
    }

    // The neighbour slot may lag behind a concurrent load; fall back to a
    // grid lookup before concluding there is nothing to stitch.
    let neighbour = chunk.neighbour(self.dir).or_else(|| {
      self
        .binding
        .grid()
        .and_then(|grid| grid.chunk_at(chunk.position() + self.dir.offset()))
    });
    let Some(neighbour) = neighbour else {
      // No chunk on the far side: the seam is trivially complete.
      chunk.stitch(self.dir).finish();
      return true;
    };

    if !neighbour.navmesh().is_complete() {
      trace!(
        pos = ?chunk.position(),
        dir = ?self.dir,
        "stitch waiting on neighbour bulk pass"
      );
      return false;
    }

    let _claim = chunk.claim();
    chunk.stitch(self.dir).begin();
    let links = {
      let own = chunk.nav();
      let other = neighbour.nav();
      match (own.as_ref(), other.as_ref()) {
        (Some(own), Some(other)) => count_links(own, other, self.dir),
        _ => 0,
      }
    };
    chunk.set_stitch_links(self.dir, links);
    chunk.stitch(self.dir).finish();
    debug!(pos = ?chunk.position(), dir = ?self.dir, links, "navmesh stitch complete");

    if let Some(grid) = self.binding.grid() {
      grid.events().emit(&GridEvent::NavmeshChanged {
        pos: chunk.position(),
      });
    }
    true
  }
}
