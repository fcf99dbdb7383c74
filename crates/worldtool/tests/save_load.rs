//! Generate, save, edit and reload a small world through a temp directory.

use std::fs;

use cubeview_engine::world::World;
use cubeview_engine::world::block::{Block, BlockId};
use cubeview_engine::world::position::{BlockPos, ChunkPos};
use cubeview_worldtool::generate::FlatGenerator;
use cubeview_worldtool::persistence::{load_into, read_manifest, save_world};
use cubeview_worldtool::world_stats;

#[test]
fn generated_world_survives_a_reload() {
    let tmp = std::env::temp_dir().join("cubeview_test_generated_world");
    let _ = fs::remove_dir_all(&tmp);

    let mut world = World::new();
    assert_eq!(FlatGenerator::default().generate_area(&mut world, 1), 9);
    assert_eq!(save_world(&mut world, &tmp).unwrap(), 9);
    assert_eq!(read_manifest(&tmp).unwrap().unwrap().chunk_count, 9);

    // Dig a shaft through the middle column's surface.
    for y in 55..63 {
        assert!(world.set_block(BlockPos::new(8, y, 8), Block::AIR));
    }
    assert_eq!(save_world(&mut world, &tmp).unwrap(), 1);

    let mut loaded = World::new();
    assert_eq!(load_into(&mut loaded, &tmp).unwrap(), 9);
    assert_eq!(world_stats(&loaded), world_stats(&world));
    for z in -1..=1 {
        for x in -1..=1 {
            let pos = ChunkPos::new(x, z);
            let a = world.get_chunk_at(pos).unwrap();
            let b = loaded.get_chunk_at(pos).unwrap();
            assert_eq!(a.blocks(), b.blocks(), "chunk ({}, {})", x, z);
            assert_eq!(a.visible_indices(), b.visible_indices(), "chunk ({}, {})", x, z);
        }
    }
    assert_eq!(loaded.block_at(BlockPos::new(8, 58, 8)), Some(Block::AIR));
    assert_eq!(
        loaded.block_at(BlockPos::new(8, 54, 8)).map(|b| b.id),
        Some(BlockId::STONE)
    );

    // A second generate pass over the loaded area adds only the new ring.
    assert_eq!(FlatGenerator::default().generate_area(&mut loaded, 2), 16);
    assert_eq!(loaded.block_at(BlockPos::new(8, 58, 8)), Some(Block::AIR));

    let _ = fs::remove_dir_all(&tmp);
}
