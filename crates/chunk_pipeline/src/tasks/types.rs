//! Task I/O types and the pluggable strategy seams.
//!
//! The three strategies are the crate's only extension points: world
//! generation supplies the [`VoxelGenerator`], rendering supplies the
//! [`MergeComparator`], AI/pathing supplies the [`SolidityPredicate`]. The
//! scheduling core never interprets voxel values itself beyond "zero is
//! air".

use smallvec::SmallVec;

use crate::constants::{voxel_index, CHUNK_SIZE, CHUNK_SIZE_CB};
use crate::types::{ChunkPos, Face, VoxelId};

// =============================================================================
// Strategies
// =============================================================================

/// Populates a chunk's voxel storage. Supplied by world-generation code.
pub trait VoxelGenerator: Send + Sync {
  /// Fill `voxels` (length `CHUNK_SIZE_CB`, layout per
  /// [`voxel_index`](crate::constants::voxel_index)) for the chunk at `pos`.
  fn generate(&self, pos: ChunkPos, voxels: &mut [VoxelId]);
}

/// Blanket impl for boxed trait objects.
impl VoxelGenerator for Box<dyn VoxelGenerator> {
  fn generate(&self, pos: ChunkPos, voxels: &mut [VoxelId]) {
    (**self).generate(pos, voxels)
  }
}

/// Decides whether two exposed voxel faces may merge into one mesh quad.
///
/// This is merge-equality, not raw equality: distinct voxel ids that are
/// visually interchangeable may merge. Supplied by rendering code.
pub trait MergeComparator: Send + Sync {
  fn can_merge(&self, a: VoxelId, b: VoxelId, face: Face) -> bool;
}

impl MergeComparator for Box<dyn MergeComparator> {
  fn can_merge(&self, a: VoxelId, b: VoxelId, face: Face) -> bool {
    (**self).can_merge(a, b, face)
  }
}

/// Classifies a voxel as solid for walkability. Supplied by AI/pathing code.
pub trait SolidityPredicate: Send + Sync {
  fn is_solid(&self, voxel: VoxelId) -> bool;
}

impl SolidityPredicate for Box<dyn SolidityPredicate> {
  fn is_solid(&self, voxel: VoxelId) -> bool {
    (**self).is_solid(voxel)
  }
}

// =============================================================================
// Mesh output
// =============================================================================

/// One axis-aligned quad of the chunk mesh.
///
/// `origin` is the quad's minimum voxel coordinate; `width`/`height` span
/// the face's U/V axes (always 1×1 for naive meshing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshQuad {
  pub face: Face,
  pub voxel: VoxelId,
  pub origin: (u8, u8, u8),
  pub width: u8,
  pub height: u8,
}

/// Mesh output for one chunk.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
  pub quads: Vec<MeshQuad>,
  /// Whether the greedy merger produced this mesh.
  pub greedy: bool,
}

impl ChunkMesh {
  pub fn quad_count(&self) -> usize {
    self.quads.len()
  }
}

// =============================================================================
// Navmesh output
// =============================================================================

/// Per-chunk walkability grid produced by the bulk navmesh pass.
#[derive(Clone, Debug)]
pub struct NavmeshData {
  /// One flag per voxel cell, layout per `voxel_index`.
  walkable: Vec<bool>,
}

impl NavmeshData {
  pub(crate) fn new(walkable: Vec<bool>) -> Self {
    debug_assert_eq!(walkable.len(), CHUNK_SIZE_CB);
    Self { walkable }
  }

  pub fn is_walkable(&self, x: usize, y: usize, z: usize) -> bool {
    self.walkable[voxel_index(x, y, z)]
  }

  pub fn walkable_count(&self) -> usize {
    self.walkable.iter().filter(|&&w| w).count()
  }

  /// Heights (Y values) of walkable cells in the column at `(x, z)`,
  /// ascending. Columns rarely hold more than a few surfaces.
  pub fn column_heights(&self, x: usize, z: usize) -> SmallVec<[u8; 4]> {
    let mut heights = SmallVec::new();
    for y in 0..CHUNK_SIZE {
      if self.walkable[voxel_index(x, y, z)] {
        heights.push(y as u8);
      }
    }
    heights
  }
}
