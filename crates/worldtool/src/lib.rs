//! Application side of the cubeview engine: saving and loading map chunks,
//! flat terrain generation, and the `cubeview` command-line driver.

pub mod generate;
pub mod options;
pub mod persistence;

use cubeview_engine::world::World;

/// Counts reported by the binary after loading and generating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub chunks: usize,
    pub pending: usize,
    pub visible_voxels: usize,
}

pub fn world_stats(world: &World) -> WorldStats {
    WorldStats {
        chunks: world.chunk_count(),
        pending: world.pending_count(),
        visible_voxels: world.chunks().map(|c| c.visible_indices().len()).sum(),
    }
}
