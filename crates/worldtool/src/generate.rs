//! Flat terrain generation.

use std::time::Instant;

use cubeview_engine::world::World;
use cubeview_engine::world::block::{Block, BlockId};
use cubeview_engine::world::chunk::{Chunk, ChunkSize};
use cubeview_engine::world::position::{CHUNK_HEIGHT, CHUNK_WIDTH, ChunkPos};

/// Full daylight.
const SKY: u8 = 15;

/// Stacked layers from y = 0 upwards; everything above is air lit by the sky.
#[derive(Debug, Clone)]
pub struct FlatGenerator {
    pub layers: Vec<(BlockId, usize)>,
}

impl Default for FlatGenerator {
    fn default() -> Self {
        Self {
            layers: vec![
                (BlockId::BEDROCK, 1),
                (BlockId::STONE, 58),
                (BlockId::DIRT, 3),
                (BlockId::GRASS, 1),
            ],
        }
    }
}

impl FlatGenerator {
    /// Height of the first air voxel, clamped to the column.
    pub fn surface(&self) -> usize {
        self.layers
            .iter()
            .map(|(_, depth)| depth)
            .sum::<usize>()
            .min(CHUNK_HEIGHT)
    }

    /// Block at height `y` of every column.
    pub fn block_at(&self, y: usize) -> Block {
        let mut top = 0;
        for &(id, depth) in &self.layers {
            top += depth;
            if y < top {
                return Block::new(id);
            }
        }
        Block::AIR.with_light(0, SKY)
    }

    fn fill(&self, chunk: &mut Chunk) {
        let column: Vec<Block> = (0..CHUNK_HEIGHT).map(|y| self.block_at(y)).collect();
        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                for (y, block) in column.iter().enumerate() {
                    chunk.set_block(x, y, z, *block);
                }
            }
        }
    }

    /// Queue one full column at `pos`.
    pub fn queue_column(&self, world: &mut World, pos: ChunkPos) {
        let (_, chunk) = world.new_chunk(pos.block_origin(), ChunkSize::COLUMN);
        self.fill(chunk);
    }

    /// Generate every missing column in the square of `radius` chunks around
    /// the origin and merge them. Already loaded columns are left alone.
    ///
    /// Returns the number of columns generated.
    pub fn generate_area(&self, world: &mut World, radius: u32) -> usize {
        let start = Instant::now();
        let r = radius as i32;
        let mut queued = 0usize;
        for cx in -r..=r {
            for cz in -r..=r {
                let pos = ChunkPos::new(cx, cz);
                if world.get_chunk_at(pos).is_some() {
                    continue;
                }
                self.queue_column(world, pos);
                queued += 1;
            }
        }
        let report = world.update_map_chunks(true);
        tracing::info!(
            "Generated {} flat chunks, surface at y={} ({:.2?})",
            report.merged,
            self.surface(),
            start.elapsed(),
        );
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubeview_engine::world::position::{BlockPos, map_index};

    #[test]
    fn default_layers() {
        let generator = FlatGenerator::default();
        assert_eq!(generator.surface(), 63);
        assert_eq!(generator.block_at(0).id, BlockId::BEDROCK);
        assert_eq!(generator.block_at(1).id, BlockId::STONE);
        assert_eq!(generator.block_at(61).id, BlockId::DIRT);
        assert_eq!(generator.block_at(62).id, BlockId::GRASS);
        assert_eq!(generator.block_at(63), Block::AIR.with_light(0, 15));
    }

    #[test]
    fn generated_area_shows_only_the_surface() {
        let mut world = World::new();
        let generated = FlatGenerator::default().generate_area(&mut world, 1);
        assert_eq!(generated, 9);
        assert_eq!(world.chunk_count(), 9);
        assert_eq!(world.pending_count(), 0);

        // The middle column is surrounded on every side, so only the grass
        // layer is drawn.
        let middle = world.get_chunk(0, 0).unwrap();
        assert_eq!(middle.visible_indices().len(), 256);
        assert!(middle.is_visible(map_index(4, 62, 9)));
        assert!(!middle.is_visible(map_index(4, 61, 9)));
        assert_eq!(
            world.block_at(BlockPos::new(-1, 100, -1)).map(|b| b.sky_light()),
            Some(15)
        );
    }

    #[test]
    fn loaded_columns_are_kept() {
        let mut world = World::new();
        let (_, chunk) = world.new_chunk(BlockPos::new(0, 0, 0), ChunkSize::new(0, 0, 0));
        chunk.set_block(0, 0, 0, Block::new(BlockId::GLASS));
        world.update_map_chunks(true);

        let generated = FlatGenerator::default().generate_area(&mut world, 0);
        assert_eq!(generated, 0);
        assert_eq!(world.block_at(BlockPos::new(0, 0, 0)).map(|b| b.id), Some(BlockId::GLASS));
        assert_eq!(world.block_at(BlockPos::new(0, 10, 0)), Some(Block::AIR));
    }
}
