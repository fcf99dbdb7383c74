pub mod block;
pub mod chunk;
pub mod codec;
pub mod map_chunk;
pub mod position;
pub mod visibility;

use std::collections::HashMap;

use indexmap::IndexMap;
use slotmap::SlotMap;

use crate::error::{MergeError, PendingError};
use block::{Block, BlockId};
use chunk::{Chunk, ChunkSize};
use map_chunk::{MapChunk, MergeReport, Neighborhood};
use position::{BlockPos, ChunkPos, Side};

slotmap::new_key_type! {
    /// Handle to a loaded map chunk. Stale handles (after unload) resolve to
    /// nothing.
    pub struct MapChunkKey;
}

/// Handle to a chunk waiting in the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
    /// Mark neighbor map chunks updated when a merge changes their flags.
    pub propagate_neighbor_updates: bool,
    /// Treat cells in unloaded chunks, and above or below the world, as
    /// stone. When off they count as air and edge faces stay visible.
    pub unloaded_is_solid: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            propagate_neighbor_updates: true,
            unloaded_is_solid: true,
        }
    }
}

/// Summary of one [`World::update_map_chunks`] flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Pending chunks merged into a map chunk.
    pub merged: usize,
    /// Pending chunks whose data could not be decoded.
    pub unusable: usize,
    /// Pending chunks refused by their map chunk.
    pub rejected: usize,
    /// Map chunks created during the flush.
    pub created: usize,
}

/// The loaded map chunk grid plus the queue of chunks waiting to be merged.
///
/// Single-threaded: merges, visibility updates and unloads all run to
/// completion on the calling thread.
pub struct World {
    chunks: SlotMap<MapChunkKey, MapChunk>,
    index: HashMap<ChunkPos, MapChunkKey>,
    /// Processed in insertion order.
    pending: IndexMap<PendingId, Chunk>,
    next_pending: u64,
    config: WorldConfig,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            chunks: SlotMap::with_key(),
            index: HashMap::new(),
            pending: IndexMap::new(),
            next_pending: 0,
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    fn unloaded_block(&self) -> Block {
        if self.config.unloaded_is_solid {
            Block::new(BlockId::STONE)
        } else {
            Block::AIR
        }
    }

    fn next_id(&mut self) -> PendingId {
        let id = PendingId(self.next_pending);
        self.next_pending += 1;
        id
    }

    // ── Pending queue ───────────────────────────────────────────────────

    /// Queue compressed chunk data for a later merge, optionally decoding it
    /// right away.
    ///
    /// If eager decoding fails the chunk still stays queued under the
    /// returned id, without usable block data.
    pub fn add_chunk_zip(
        &mut self,
        origin: BlockPos,
        size: ChunkSize,
        data: &[u8],
        unzip: bool,
    ) -> Result<PendingId, PendingError> {
        let id = self.next_id();
        let mut chunk = Chunk::from_zipped(origin, size, data);
        let decoded = if unzip { chunk.materialize() } else { Ok(()) };
        self.pending.insert(id, chunk);
        match decoded {
            Ok(()) => Ok(id),
            Err(source) => {
                tracing::warn!(
                    "Chunk at ({}, {}, {}) failed to decode: {}",
                    origin.x,
                    origin.y,
                    origin.z,
                    source
                );
                Err(PendingError { id, source })
            }
        }
    }

    /// Queue a fresh zeroed chunk and hand it back for filling.
    pub fn new_chunk(&mut self, origin: BlockPos, size: ChunkSize) -> (PendingId, &mut Chunk) {
        let id = self.next_id();
        let chunk = self
            .pending
            .entry(id)
            .or_insert_with(|| Chunk::with_origin(origin, size, true));
        (id, chunk)
    }

    pub fn pending(&self, id: PendingId) -> Option<&Chunk> {
        self.pending.get(&id)
    }

    pub fn pending_mut(&mut self, id: PendingId) -> Option<&mut Chunk> {
        self.pending.get_mut(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Merge every queued chunk, oldest first.
    ///
    /// With `cleanup` the queue is emptied afterwards, dropping chunks that
    /// could not be decoded. Without it every chunk stays queued and is
    /// merged again by the next flush.
    pub fn update_map_chunks(&mut self, cleanup: bool) -> FlushReport {
        let mut report = FlushReport::default();
        let queue = std::mem::take(&mut self.pending);
        let mut kept = IndexMap::new();

        for (id, mut chunk) in queue {
            if let Err(e) = chunk.materialize() {
                report.unusable += 1;
                if cleanup {
                    tracing::warn!("Dropping undecodable pending chunk {:?}: {}", id, e);
                } else {
                    kept.insert(id, chunk);
                }
                continue;
            }
            tracing::debug!("Materialized pending chunk {:?}", id);

            let known = self.index.len();
            match self.add_map_chunk(&chunk) {
                Ok(_) => report.merged += 1,
                Err(e) => {
                    tracing::warn!("Rejected pending chunk {:?}: {}", id, e);
                    report.rejected += 1;
                }
            }
            report.created += self.index.len() - known;

            if !cleanup {
                kept.insert(id, chunk);
            }
        }

        self.pending = kept;
        report
    }

    // ── Map chunks ──────────────────────────────────────────────────────

    /// The map chunk containing block column (x, z), if loaded.
    pub fn get_chunk(&self, x: i32, z: i32) -> Option<&MapChunk> {
        self.get_chunk_at(ChunkPos::containing(x, z))
    }

    pub fn get_chunk_at(&self, pos: ChunkPos) -> Option<&MapChunk> {
        self.key_at(pos).and_then(|key| self.chunks.get(key))
    }

    pub fn key_at(&self, pos: ChunkPos) -> Option<MapChunkKey> {
        self.index.get(&pos).copied()
    }

    /// Resolve a key, e.g. a neighbor link.
    pub fn map_chunk(&self, key: MapChunkKey) -> Option<&MapChunk> {
        self.chunks.get(key)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &MapChunk> {
        self.chunks.values()
    }

    /// Merge a materialized sub-chunk into the map chunk owning its origin,
    /// creating and linking that map chunk first if needed.
    ///
    /// The sub-chunk is validated before anything is created, so a rejected
    /// merge leaves the world unchanged.
    pub fn add_map_chunk(&mut self, sub: &Chunk) -> Result<MergeReport, MergeError> {
        let origin = sub.origin();
        let pos = ChunkPos::containing(origin.x, origin.z);
        MapChunk::check_fits(pos, sub)?;

        let (key, created) = match self.index.get(&pos) {
            Some(&key) => (key, false),
            None => (self.insert_map_chunk(pos), true),
        };

        let propagate = self.config.propagate_neighbor_updates;
        let Some((map, mut hood)) = self.neighborhood(key) else {
            return Err(MergeError::NotMaterialized);
        };
        let mut report = map.add_chunk(sub, &mut hood)?;

        if created {
            // Cells of the new column that the sub-chunk did not cover are
            // air; bring both sides of every shared edge in line with them.
            for side in Side::ALL {
                if map.neighbor(side).is_some() {
                    let edge = map.reevaluate_edge(side, &mut hood);
                    for (t, e) in report.touched.iter_mut().zip(edge.touched) {
                        *t |= e;
                    }
                }
            }
        }
        if propagate {
            hood.mark_updated(&report.touched);
        }
        Ok(report)
    }

    /// Register an empty map chunk at `pos` and link it both ways with its
    /// loaded horizontal neighbors.
    fn insert_map_chunk(&mut self, pos: ChunkPos) -> MapChunkKey {
        let key = self.chunks.insert(MapChunk::with_unloaded(pos, self.unloaded_block()));
        self.index.insert(pos, key);
        for side in Side::ALL {
            if let Some(&other) = self.index.get(&pos.offset(side)) {
                if let Some(neighbor) = self.chunks.get_mut(other) {
                    neighbor.set_neighbor(side.opposite(), Some(key));
                }
                if let Some(map) = self.chunks.get_mut(key) {
                    map.set_neighbor(side, Some(other));
                }
            }
        }
        tracing::debug!("Created map chunk ({}, {})", pos.x, pos.z);
        key
    }

    /// Borrow a map chunk mutably together with its linked neighbors.
    fn neighborhood(&mut self, key: MapChunkKey) -> Option<(&mut MapChunk, Neighborhood<'_>)> {
        let links = self.chunks.get(key)?.neighbors();
        let unloaded = self.unloaded_block();

        // Center first, then each linked side; `slots` maps them back.
        let mut keys = [key; 5];
        let mut slots = [0usize; 4];
        let mut linked = 0;
        for (slot, link) in links.iter().enumerate() {
            if let Some(other) = *link {
                keys[linked + 1] = other;
                slots[linked] = slot;
                linked += 1;
            }
        }

        let mut sides: [Option<&mut MapChunk>; 4] = [None, None, None, None];
        let chunks = &mut self.chunks;
        let slots = &slots[..linked];
        let center = match linked {
            0 => borrow_disjoint(chunks, [keys[0]], slots, &mut sides),
            1 => borrow_disjoint(chunks, [keys[0], keys[1]], slots, &mut sides),
            2 => borrow_disjoint(chunks, [keys[0], keys[1], keys[2]], slots, &mut sides),
            3 => borrow_disjoint(chunks, [keys[0], keys[1], keys[2], keys[3]], slots, &mut sides),
            _ => borrow_disjoint(chunks, keys, slots, &mut sides),
        }?;
        Some((center, Neighborhood::new(sides, unloaded)))
    }

    /// Remove a loaded map chunk. Its neighbors drop their links and
    /// recompute the faces along the vacated edge.
    pub fn unload_chunk(&mut self, x: i32, z: i32) -> Option<MapChunk> {
        let pos = ChunkPos::containing(x, z);
        let key = self.index.remove(&pos)?;
        let removed = self.chunks.remove(key)?;
        let propagate = self.config.propagate_neighbor_updates;

        for side in Side::ALL {
            let Some(other) = removed.neighbor(side) else {
                continue;
            };
            let facing = side.opposite();
            if let Some(neighbor) = self.chunks.get_mut(other) {
                neighbor.set_neighbor(facing, None);
            }
            if let Some((neighbor, mut hood)) = self.neighborhood(other) {
                let report = neighbor.reevaluate_edge(facing, &mut hood);
                if propagate {
                    hood.mark_updated(&report.touched);
                }
            }
        }
        tracing::debug!("Unloaded map chunk ({}, {})", pos.x, pos.z);
        Some(removed)
    }

    // ── Voxels ──────────────────────────────────────────────────────────

    /// The block at an absolute position, if its map chunk is loaded.
    pub fn block_at(&self, pos: BlockPos) -> Option<Block> {
        let index = pos.map_index()?;
        self.get_chunk_at(pos.chunk()).map(|chunk| chunk.block(index))
    }

    /// Write one block in a loaded map chunk and update visibility around it.
    /// Returns false if the map chunk is not loaded or `y` is out of range.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) -> bool {
        let Some(index) = pos.map_index() else {
            return false;
        };
        let Some(key) = self.key_at(pos.chunk()) else {
            return false;
        };
        let propagate = self.config.propagate_neighbor_updates;
        let Some((map, mut hood)) = self.neighborhood(key) else {
            return false;
        };
        let report = map.set_block(index, block, &mut hood);
        if propagate {
            hood.mark_updated(&report.touched);
        }
        true
    }

    /// Positions of map chunks with the updated flag set, sorted. The flags
    /// are left alone.
    pub fn updated_chunks(&self) -> Vec<ChunkPos> {
        let mut updated: Vec<ChunkPos> = self
            .chunks
            .values()
            .filter(|chunk| chunk.is_updated())
            .map(|chunk| chunk.pos())
            .collect();
        updated.sort_unstable();
        updated
    }

    /// Clear the updated flag of one map chunk, returning its previous value.
    pub fn clear_updated(&mut self, pos: ChunkPos) -> bool {
        self.key_at(pos)
            .and_then(|key| self.chunks.get_mut(key))
            .is_some_and(|chunk| chunk.take_updated())
    }

    /// Clear every map chunk's updated flag, returning the positions that
    /// had it set, sorted.
    pub fn take_updated_chunks(&mut self) -> Vec<ChunkPos> {
        let mut updated: Vec<ChunkPos> = self
            .chunks
            .values_mut()
            .filter_map(|chunk| chunk.take_updated().then(|| chunk.pos()))
            .collect();
        updated.sort_unstable();
        updated
    }
}

/// Borrow `keys[0]` and the chunks at `keys[1..]` in one go, placing the
/// latter into `sides` at the matching `slots`.
fn borrow_disjoint<'a, const N: usize>(
    chunks: &'a mut SlotMap<MapChunkKey, MapChunk>,
    keys: [MapChunkKey; N],
    slots: &[usize],
    sides: &mut [Option<&'a mut MapChunk>; 4],
) -> Option<&'a mut MapChunk> {
    let mut borrowed = chunks.get_disjoint_mut(keys)?.into_iter();
    let center = borrowed.next()?;
    for (&slot, chunk) in slots.iter().zip(borrowed) {
        sides[slot] = Some(chunk);
    }
    Some(center)
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
