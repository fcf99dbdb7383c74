//! Chunk storage and face visibility for a block-world renderer.
//!
//! Raw chunks arrive compressed, are queued in the [`world::World`], and get
//! merged into 16x128x16 [`world::map_chunk::MapChunk`] columns that keep a
//! per-voxel record of which faces are hidden by their neighbors.

pub mod error;
pub mod world;
