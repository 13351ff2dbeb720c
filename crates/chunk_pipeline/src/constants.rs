//! Storage layout constants for 32³ voxel chunks.
//!
//! Chunk dimensions are fixed at 32 per axis so that linear indexing reduces
//! to bit shifts and masks.
//!
//! # Memory Layout
//!
//! ```text
//! Chunk memory layout (row-major, Z innermost):
//!
//! Address:  0    1    2   ...  31   32   33  ...  1023  1024 ...
//! Content: [0,0,0][0,0,1]...[0,0,31][0,1,0]...[0,31,31][1,0,0]...
//!          └─────── Z ───────┘└─────── Z ───────┘
//! ```
//!
//! # 3D Indexing
//!
//! ```text
//! index = x << 10 | y << 5 | z
//!       = x * 1024 + y * 32 + z
//! ```

use std::time::Duration;

/// Voxels per axis (must be 32 for bit-shift indexing)
pub const CHUNK_SIZE: usize = 32;

/// Voxels per chunk face (32² = 1024)
pub const CHUNK_SIZE_SQ: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Voxels per chunk (32³ = 32768)
pub const CHUNK_SIZE_CB: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Maximum valid voxel coordinate (31)
pub const MAX_VOXEL_COORD: usize = CHUNK_SIZE - 1;

/// Bit shift for Y coordinate indexing (log2(32) = 5)
pub const Y_SHIFT: u32 = 5;

/// Bit shift for X coordinate indexing (log2(1024) = 10)
pub const X_SHIFT: u32 = 10;

/// Mask for extracting a single axis from an index (0x1F = 31)
pub const INDEX_MASK: usize = 0x1F;

/// How long a worker blocks in a timed dequeue before re-checking the
/// stop/suspend flags.
pub const DEQUEUE_WAIT: Duration = Duration::from_millis(20);

/// Sleep interval while a worker pool is suspended.
pub const SUSPEND_POLL: Duration = Duration::from_millis(5);

/// Air voxels required above a solid voxel for the cell to count as walkable.
pub const WALK_CLEARANCE: usize = 2;

/// Maximum height difference (in voxels) bridged by a navmesh stitch link.
pub const STEP_HEIGHT: usize = 1;

/// Convert 3D voxel coordinates to a linear index using bit shifts.
///
/// Layout: X is major axis (stride 1024), Y is middle (stride 32), Z is minor
/// (stride 1)
#[inline(always)]
pub const fn voxel_index(x: usize, y: usize, z: usize) -> usize {
  (x << X_SHIFT) | (y << Y_SHIFT) | z
}

/// Convert a linear index back to 3D voxel coordinates.
#[inline(always)]
pub const fn index_to_voxel(idx: usize) -> (usize, usize, usize) {
  let x = idx >> X_SHIFT;
  let y = (idx >> Y_SHIFT) & INDEX_MASK;
  let z = idx & INDEX_MASK;
  (x, y, z)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
