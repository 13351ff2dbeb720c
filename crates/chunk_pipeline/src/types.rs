//! Core identifier and state types shared across the chunk pipeline.

use std::sync::atomic::{AtomicU8, Ordering};

use glam::IVec3;

// =============================================================================
// Voxels
// =============================================================================

/// A single voxel's type identifier. Zero is always air.
pub type VoxelId = u16;

/// The empty voxel.
pub const AIR: VoxelId = 0;

// =============================================================================
// Chunk coordinates
// =============================================================================

/// Integer grid coordinate of a chunk (units of one chunk per step).
pub type ChunkPos = IVec3;

/// Bits per axis when packing a [`ChunkPos`] into a [`ChunkId`].
const AXIS_BITS: u32 = 21;

/// Signed offset applied per axis so negative coordinates pack cleanly.
const AXIS_OFFSET: i64 = 1 << (AXIS_BITS - 1);

const AXIS_MASK: u64 = (1 << AXIS_BITS) - 1;

/// Inclusive coordinate bound representable by [`ChunkId`] packing.
pub const MAX_CHUNK_COORD: i32 = (1 << (AXIS_BITS - 1)) - 1;

/// Stable integer key for a chunk, bijective with its grid position.
///
/// Packs each axis into 21 bits (valid range ±2²⁰), X highest. Positions
/// outside that range are a caller error, not a runtime condition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ChunkId(u64);

impl ChunkId {
  /// Derive the id for a grid position.
  ///
  /// Debug-asserts the position is within ±2²⁰ per axis; out-of-range
  /// positions violate the caller contract.
  pub fn from_pos(pos: ChunkPos) -> Self {
    debug_assert!(
      pos.cmpge(IVec3::splat(-(MAX_CHUNK_COORD + 1))).all()
        && pos.cmple(IVec3::splat(MAX_CHUNK_COORD)).all(),
      "chunk position {pos} outside addressable range"
    );
    let pack = |c: i32| ((c as i64 + AXIS_OFFSET) as u64) & AXIS_MASK;
    Self((pack(pos.x) << (2 * AXIS_BITS)) | (pack(pos.y) << AXIS_BITS) | pack(pos.z))
  }

  /// Recover the grid position this id was derived from.
  pub fn to_pos(self) -> ChunkPos {
    let unpack = |v: u64| ((v & AXIS_MASK) as i64 - AXIS_OFFSET) as i32;
    IVec3::new(
      unpack(self.0 >> (2 * AXIS_BITS)),
      unpack(self.0 >> AXIS_BITS),
      unpack(self.0),
    )
  }

  /// Raw key value.
  pub fn raw(self) -> u64 {
    self.0
  }
}

// =============================================================================
// Stitch directions
// =============================================================================

/// The eight lateral neighbour directions used for navmesh stitching.
///
/// Stitching joins walkable surfaces across vertical chunk boundaries, so the
/// directions span the XZ plane (four edges plus four diagonals).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum StitchDir {
  North = 0,
  NorthEast,
  East,
  SouthEast,
  South,
  SouthWest,
  West,
  NorthWest,
}

impl StitchDir {
  pub const COUNT: usize = 8;

  pub const ALL: [StitchDir; 8] = [
    StitchDir::North,
    StitchDir::NorthEast,
    StitchDir::East,
    StitchDir::SouthEast,
    StitchDir::South,
    StitchDir::SouthWest,
    StitchDir::West,
    StitchDir::NorthWest,
  ];

  /// Grid offset to the neighbour chunk in this direction.
  pub fn offset(self) -> IVec3 {
    match self {
      StitchDir::North => IVec3::new(0, 0, -1),
      StitchDir::NorthEast => IVec3::new(1, 0, -1),
      StitchDir::East => IVec3::new(1, 0, 0),
      StitchDir::SouthEast => IVec3::new(1, 0, 1),
      StitchDir::South => IVec3::new(0, 0, 1),
      StitchDir::SouthWest => IVec3::new(-1, 0, 1),
      StitchDir::West => IVec3::new(-1, 0, 0),
      StitchDir::NorthWest => IVec3::new(-1, 0, -1),
    }
  }

  /// The direction pointing back at this one.
  pub fn opposite(self) -> StitchDir {
    StitchDir::ALL[(self as usize + 4) % 8]
  }

  /// Stable slot index for per-direction chunk state.
  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }
}

// =============================================================================
// Voxel faces
// =============================================================================

/// One of the six axis-aligned voxel faces.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
  PosX,
  NegX,
  PosY,
  NegY,
  PosZ,
  NegZ,
}

impl Face {
  pub const ALL: [Face; 6] = [
    Face::PosX,
    Face::NegX,
    Face::PosY,
    Face::NegY,
    Face::PosZ,
    Face::NegZ,
  ];

  /// Outward normal of this face.
  pub fn normal(self) -> IVec3 {
    match self {
      Face::PosX => IVec3::X,
      Face::NegX => IVec3::NEG_X,
      Face::PosY => IVec3::Y,
      Face::NegY => IVec3::NEG_Y,
      Face::PosZ => IVec3::Z,
      Face::NegZ => IVec3::NEG_Z,
    }
  }
}

// =============================================================================
// Task kinds
// =============================================================================

/// The closed set of chunk task variants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TaskKind {
  Generate,
  MeshNaive,
  MeshGreedy,
  NavmeshBulk,
  NavmeshStitch,
}

// =============================================================================
// Per-stage chunk state
// =============================================================================

/// Progress of one pipeline stage on one chunk.
///
/// `None` → `Pending` (queued) → `Active` (a task holds processing rights) →
/// `Complete`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum StageState {
  None = 0,
  Pending = 1,
  Active = 2,
  Complete = 3,
}

impl StageState {
  fn from_u8(v: u8) -> Self {
    match v {
      1 => StageState::Pending,
      2 => StageState::Active,
      3 => StageState::Complete,
      _ => StageState::None,
    }
  }
}

/// Atomic cell holding a [`StageState`], shared between the grid and workers.
#[derive(Debug)]
pub struct StageAtomic(AtomicU8);

impl StageAtomic {
  pub fn new(state: StageState) -> Self {
    Self(AtomicU8::new(state as u8))
  }

  pub fn get(&self) -> StageState {
    StageState::from_u8(self.0.load(Ordering::Acquire))
  }

  pub fn set(&self, state: StageState) {
    self.0.store(state as u8, Ordering::Release);
  }

  /// Mark the stage queued. No-op if work already started.
  pub fn mark_pending(&self) {
    let _ = self.0.compare_exchange(
      StageState::None as u8,
      StageState::Pending as u8,
      Ordering::AcqRel,
      Ordering::Acquire,
    );
  }

  /// Transition to `Active`, returning the previous state.
  pub fn begin(&self) -> StageState {
    StageState::from_u8(self.0.swap(StageState::Active as u8, Ordering::AcqRel))
  }

  /// Transition to `Complete`.
  pub fn finish(&self) {
    self.0.store(StageState::Complete as u8, Ordering::Release);
  }

  pub fn is_complete(&self) -> bool {
    self.get() == StageState::Complete
  }
}

impl Default for StageAtomic {
  fn default() -> Self {
    Self::new(StageState::None)
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
