use std::collections::BTreeSet;

use super::MapChunkKey;
use super::block::{Block, BlockId};
use super::chunk::{Chunk, ChunkSize};
use super::position::{
    BlockPos, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, ChunkPos, Face, NeighborCell, Side,
    map_index, neighbor_cell,
};
use super::visibility::{self, face_bit, occludes, with_bit};
use crate::error::MergeError;

/// The horizontal neighbors of a map chunk, borrowed for one update.
///
/// `unloaded` is the block assumed for cells that have no loaded chunk
/// (missing neighbors, and above or below the world).
pub struct Neighborhood<'a> {
    sides: [Option<&'a mut MapChunk>; 4],
    unloaded: Block,
}

impl<'a> Neighborhood<'a> {
    pub fn new(sides: [Option<&'a mut MapChunk>; 4], unloaded: Block) -> Self {
        Self { sides, unloaded }
    }

    /// No neighbors loaded; everything outside counts as stone.
    pub fn isolated() -> Self {
        Self::new([None, None, None, None], Block::new(BlockId::STONE))
    }

    pub fn side(&self, side: Side) -> Option<&MapChunk> {
        self.sides[side as usize].as_deref()
    }

    fn side_mut(&mut self, side: Side) -> Option<&mut MapChunk> {
        self.sides[side as usize].as_deref_mut()
    }

    /// Flag the neighbors listed in `touched` as updated.
    pub fn mark_updated(&mut self, touched: &[bool; 4]) {
        for side in Side::ALL {
            if touched[side as usize] {
                if let Some(chunk) = self.side_mut(side) {
                    chunk.updated = true;
                }
            }
        }
    }
}

/// Outcome of a merge or single-voxel write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Voxels written.
    pub voxels: usize,
    /// Voxels of this chunk whose flag byte changed.
    pub changed: usize,
    /// Neighbor chunks (by [`Side`]) whose flag bytes changed.
    pub touched: [bool; 4],
}

impl MergeReport {
    pub fn touched_sides(&self) -> impl Iterator<Item = Side> + '_ {
        Side::ALL.into_iter().filter(|side| self.touched[*side as usize])
    }
}

/// A 16x128x16 column with live per-face visibility.
///
/// Blocks are indexed with [`map_index`]. `visible` always holds exactly the
/// indices whose flag byte passes [`visibility::is_visible`].
pub struct MapChunk {
    pos: ChunkPos,
    blocks: Box<[Block]>,
    visflags: Box<[u8]>,
    visible: BTreeSet<usize>,
    neighbors: [Option<MapChunkKey>; 4],
    updated: bool,
}

impl MapChunk {
    /// An all-air column with nothing loaded around it, where unloaded
    /// cells count as stone.
    pub fn new(pos: ChunkPos) -> Self {
        Self::with_unloaded(pos, Block::new(BlockId::STONE))
    }

    /// An all-air column whose boundary faces are flagged against
    /// `unloaded`, the block assumed outside it.
    pub fn with_unloaded(pos: ChunkPos, unloaded: Block) -> Self {
        let covered = occludes(unloaded, Block::AIR);
        let visflags = (0..CHUNK_VOLUME)
            .map(|index| {
                let mut flags = visibility::AIR;
                for face in Face::ALL {
                    let boundary = !matches!(neighbor_cell(index, face), NeighborCell::Local(_));
                    flags = with_bit(flags, face_bit(face), covered && boundary);
                }
                flags
            })
            .collect();
        Self {
            pos,
            blocks: vec![Block::AIR; CHUNK_VOLUME].into_boxed_slice(),
            visflags,
            visible: BTreeSet::new(),
            neighbors: [None; 4],
            updated: false,
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn origin(&self) -> BlockPos {
        self.pos.block_origin()
    }

    #[inline]
    pub fn block(&self, index: usize) -> Block {
        self.blocks[index]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn visflags(&self, index: usize) -> u8 {
        self.visflags[index]
    }

    /// Indices of every voxel the renderer has to draw, ascending.
    pub fn visible_indices(&self) -> &BTreeSet<usize> {
        &self.visible
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.contains(&index)
    }

    pub fn neighbor(&self, side: Side) -> Option<MapChunkKey> {
        self.neighbors[side as usize]
    }

    pub(crate) fn neighbors(&self) -> [Option<MapChunkKey>; 4] {
        self.neighbors
    }

    pub(crate) fn set_neighbor(&mut self, side: Side, key: Option<MapChunkKey>) {
        self.neighbors[side as usize] = key;
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Clear the updated flag, returning its previous value.
    pub fn take_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }

    /// Check that `sub` is materialized and lies entirely inside the column
    /// at `pos`.
    pub fn check_fits(pos: ChunkPos, sub: &Chunk) -> Result<(), MergeError> {
        if !sub.is_materialized() {
            return Err(MergeError::NotMaterialized);
        }
        let base = pos.block_origin();
        let o = sub.origin();
        let extent = sub.size().extent();
        let fits = |start: i32, len: usize, limit: usize| start >= 0 && start as usize + len <= limit;
        if fits(o.x - base.x, extent.0, CHUNK_WIDTH)
            && fits(o.y, extent.1, CHUNK_HEIGHT)
            && fits(o.z - base.z, extent.2, CHUNK_WIDTH)
        {
            Ok(())
        } else {
            Err(MergeError::OutOfBounds {
                x: o.x,
                y: o.y,
                z: o.z,
                extent,
            })
        }
    }

    /// Copy a sub-chunk into this column and bring visibility up to date for
    /// every written voxel and its neighbors, across chunk edges included.
    ///
    /// A rejected sub-chunk leaves the column untouched.
    pub fn add_chunk(
        &mut self,
        sub: &Chunk,
        hood: &mut Neighborhood<'_>,
    ) -> Result<MergeReport, MergeError> {
        Self::check_fits(self.pos, sub)?;
        let src = sub.blocks().ok_or(MergeError::NotMaterialized)?;

        let base = self.origin();
        let o = sub.origin();
        let (bx, by, bz) = (
            (o.x - base.x) as usize,
            o.y as usize,
            (o.z - base.z) as usize,
        );
        let (ex, ey, ez) = sub.size().extent();

        let mut written = Vec::with_capacity(src.len());
        for x in 0..ex {
            for z in 0..ez {
                for y in 0..ey {
                    let index = map_index(bx + x, by + y, bz + z);
                    self.blocks[index] = src[sub.local_index(x, y, z)];
                    written.push(index);
                }
            }
        }

        let report = self.refresh(&written, true, hood);
        tracing::debug!(
            "Merged {} voxels into chunk ({}, {}): {} flags changed",
            report.voxels,
            self.pos.x,
            self.pos.z,
            report.changed,
        );
        Ok(report)
    }

    /// Write one voxel and update visibility around it.
    pub fn set_block(
        &mut self,
        index: usize,
        block: Block,
        hood: &mut Neighborhood<'_>,
    ) -> MergeReport {
        self.blocks[index] = block;
        self.refresh(&[index], true, hood)
    }

    /// Recompute the voxels along one horizontal edge, e.g. after the
    /// neighbor on that side appeared or went away.
    pub fn reevaluate_edge(&mut self, side: Side, hood: &mut Neighborhood<'_>) -> MergeReport {
        let edge: Vec<usize> = edge_indices(side).collect();
        self.refresh(&edge, false, hood)
    }

    fn refresh(
        &mut self,
        indices: &[usize],
        wrote_blocks: bool,
        hood: &mut Neighborhood<'_>,
    ) -> MergeReport {
        let mut changes = BTreeSet::new();
        let mut touched = [false; 4];
        for &index in indices {
            self.update_vis_flags(index, hood, &mut changes, &mut touched);
        }
        for &index in &changes {
            self.refresh_visibility(index);
        }
        if wrote_blocks || !changes.is_empty() {
            self.updated = true;
        }
        MergeReport {
            voxels: if wrote_blocks { indices.len() } else { 0 },
            changed: changes.len(),
            touched,
        }
    }

    /// Recompute the flag byte of `index` against its six neighbors, and the
    /// neighbors' bits facing it.
    ///
    /// Local indices whose flags changed are added to `changes`; their
    /// visible-set membership is left to the caller. Cells in neighbor
    /// chunks are updated in place, visible set included, and their side is
    /// recorded in `touched`. Changes are not propagated further than the
    /// immediate neighbors.
    pub fn update_vis_flags(
        &mut self,
        index: usize,
        hood: &mut Neighborhood<'_>,
        changes: &mut BTreeSet<usize>,
        touched: &mut [bool; 4],
    ) {
        let me = self.blocks[index];
        let mut flags = visibility::base_flags(me);

        for face in Face::ALL {
            let bit = face_bit(face);
            let back = face_bit(face.opposite());
            match neighbor_cell(index, face) {
                NeighborCell::Local(n) => {
                    let other = self.blocks[n];
                    flags = with_bit(flags, bit, occludes(other, me));
                    let old = self.visflags[n];
                    let new = with_bit(old, back, occludes(me, other));
                    if new != old {
                        self.visflags[n] = new;
                        changes.insert(n);
                    }
                }
                NeighborCell::Remote(side, n) => {
                    let unloaded = hood.unloaded;
                    match hood.side_mut(side) {
                        Some(chunk) => {
                            let other = chunk.blocks[n];
                            flags = with_bit(flags, bit, occludes(other, me));
                            if chunk.set_face_bit(n, back, occludes(me, other)) {
                                touched[side as usize] = true;
                            }
                        }
                        None => flags = with_bit(flags, bit, occludes(unloaded, me)),
                    }
                }
                NeighborCell::OutOfWorld => {
                    flags = with_bit(flags, bit, occludes(hood.unloaded, me));
                }
            }
        }

        if self.visflags[index] != flags {
            self.visflags[index] = flags;
            changes.insert(index);
        }
    }

    /// Set or clear one face bit, keeping the visible set in step.
    fn set_face_bit(&mut self, index: usize, bit: u8, on: bool) -> bool {
        let old = self.visflags[index];
        let new = with_bit(old, bit, on);
        if new == old {
            return false;
        }
        self.visflags[index] = new;
        self.refresh_visibility(index);
        true
    }

    fn refresh_visibility(&mut self, index: usize) {
        if visibility::is_visible(self.visflags[index]) {
            self.visible.insert(index);
        } else {
            self.visible.remove(&index);
        }
    }

    /// Export the column as a materialized chunk. The chunk's local order
    /// matches the map index, so the block array is copied as is.
    pub fn to_chunk(&self) -> Chunk {
        let mut chunk = Chunk::with_origin(self.origin(), ChunkSize::COLUMN, true);
        if let Some(blocks) = chunk.blocks_mut() {
            blocks.copy_from_slice(&self.blocks);
        }
        chunk
    }
}

/// Indices of the voxels on one horizontal edge of a column.
pub fn edge_indices(side: Side) -> impl Iterator<Item = usize> {
    let last = CHUNK_WIDTH - 1;
    (0..CHUNK_WIDTH).flat_map(move |a| {
        (0..CHUNK_HEIGHT).map(move |y| match side {
            Side::NegX => map_index(0, y, a),
            Side::PosX => map_index(last, y, a),
            Side::NegZ => map_index(a, y, 0),
            Side::PosZ => map_index(a, y, last),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::visibility::{AIR, ALL_FACES, OPAQUE};

    fn filled(origin: BlockPos, size: ChunkSize, block: Block) -> Chunk {
        let mut chunk = Chunk::with_origin(origin, size, true);
        chunk.blocks_mut().unwrap().fill(block);
        chunk
    }

    fn stone_column(pos: ChunkPos) -> MapChunk {
        let mut map = MapChunk::new(pos);
        let sub = filled(pos.block_origin(), ChunkSize::COLUMN, Block::new(BlockId::STONE));
        map.add_chunk(&sub, &mut Neighborhood::isolated()).unwrap();
        map
    }

    fn face_neighbors(index: usize) -> Vec<usize> {
        Face::ALL
            .into_iter()
            .filter_map(|face| match neighbor_cell(index, face) {
                NeighborCell::Local(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_column_is_air_and_invisible() {
        let map = MapChunk::new(ChunkPos::new(0, 0));
        assert!(map.visible_indices().is_empty());
        assert!(!map.is_updated());
        assert_eq!(map.visflags(map_index(7, 64, 7)), AIR);
    }

    #[test]
    fn new_column_boundary_faces_follow_the_unloaded_block() {
        let bottom = face_bit(Face::NegY);
        let top = face_bit(Face::PosY);
        let west = face_bit(Face::NegX);

        let solid = MapChunk::new(ChunkPos::new(0, 0));
        assert_eq!(solid.visflags(map_index(5, 0, 5)), AIR | bottom);
        assert_eq!(solid.visflags(map_index(5, 127, 5)), AIR | top);
        assert_eq!(
            solid.visflags(map_index(0, 0, 0)),
            AIR | bottom | west | face_bit(Face::NegZ)
        );

        // Matches a from-scratch evaluation of an untouched bottom cell.
        let mut scratch = MapChunk::new(ChunkPos::new(0, 0));
        let cell = map_index(9, 0, 4);
        let mut changes = BTreeSet::new();
        scratch.update_vis_flags(cell, &mut Neighborhood::isolated(), &mut changes, &mut [false; 4]);
        assert!(changes.is_empty());
        assert_eq!(scratch.visflags(cell), solid.visflags(cell));

        let open = MapChunk::with_unloaded(ChunkPos::new(0, 0), Block::AIR);
        assert_eq!(open.visflags(map_index(5, 0, 5)), AIR);
        assert_eq!(open.visflags(map_index(0, 127, 15)), AIR);
    }

    #[test]
    fn solid_column_with_unloaded_surroundings_is_fully_hidden() {
        let map = stone_column(ChunkPos::new(0, 0));
        assert!(map.visible_indices().is_empty());
        assert!(map.is_updated());
        for index in [0, 1234, CHUNK_VOLUME - 1] {
            assert_eq!(map.visflags(index), ALL_FACES | OPAQUE);
        }
    }

    #[test]
    fn carving_a_voxel_exposes_its_six_neighbors() {
        let pos = ChunkPos::new(2, -1);
        let mut map = stone_column(pos);
        let base = pos.block_origin();
        let hole = filled(
            BlockPos::new(base.x + 7, 60, base.z + 8),
            ChunkSize::new(0, 0, 0),
            Block::AIR,
        );
        map.add_chunk(&hole, &mut Neighborhood::isolated()).unwrap();

        let carved = map_index(7, 60, 8);
        let mut expected = face_neighbors(carved);
        expected.sort_unstable();
        assert_eq!(expected.len(), 6);
        let visible: Vec<usize> = map.visible_indices().iter().copied().collect();
        assert_eq!(visible, expected);
        // Air itself is never drawn.
        assert!(!map.is_visible(carved));
        assert_eq!(map.visflags(carved) & AIR, AIR);

        // The voxel above the hole has exactly its bottom face open.
        let above = map_index(7, 61, 8);
        assert_eq!(map.visflags(above) & ALL_FACES, ALL_FACES & !face_bit(Face::NegY));
    }

    #[test]
    fn air_slab_exposes_the_shared_boundary() {
        let pos = ChunkPos::new(0, 0);
        let mut map = stone_column(pos);
        let air = filled(BlockPos::new(0, 64, 0), ChunkSize::new(15, 63, 15), Block::AIR);
        map.add_chunk(&air, &mut Neighborhood::isolated()).unwrap();

        for x in 0..16 {
            for z in 0..16 {
                let top = map_index(x, 63, z);
                assert!(map.is_visible(top), "surface ({}, 63, {}) hidden", x, z);
                assert_eq!(map.visflags(top) & face_bit(Face::PosY), 0);
                assert!(!map.is_visible(map_index(x, 62, z)));
            }
        }
        assert_eq!(map.visible_indices().len(), 256);
    }

    #[test]
    fn glass_next_to_stone_is_one_sided() {
        let mut map = stone_column(ChunkPos::new(0, 0));
        let glass = filled(BlockPos::new(5, 40, 5), ChunkSize::new(0, 0, 0), Block::new(BlockId::GLASS));
        map.add_chunk(&glass, &mut Neighborhood::isolated()).unwrap();

        let g = map_index(5, 40, 5);
        let east = map_index(6, 40, 5);
        // Stone covers every glass face.
        assert_eq!(map.visflags(g) & ALL_FACES, ALL_FACES);
        assert!(!map.is_visible(g));
        // Glass does not cover the stone face behind it.
        assert_eq!(map.visflags(east) & face_bit(Face::NegX), 0);
        assert!(map.is_visible(east));
    }

    #[test]
    fn adjacent_glass_culls_shared_faces() {
        let mut map = MapChunk::new(ChunkPos::new(0, 0));
        let pane = filled(BlockPos::new(3, 10, 3), ChunkSize::new(1, 0, 0), Block::new(BlockId::GLASS));
        map.add_chunk(&pane, &mut Neighborhood::isolated()).unwrap();

        let a = map_index(3, 10, 3);
        let b = map_index(4, 10, 3);
        assert_ne!(map.visflags(a) & face_bit(Face::PosX), 0);
        assert_ne!(map.visflags(b) & face_bit(Face::NegX), 0);
        assert_eq!(map.visflags(a) & face_bit(Face::PosY), 0);
        assert!(map.is_visible(a) && map.is_visible(b));
    }

    #[test]
    fn sprites_do_not_hide_stone() {
        let mut map = stone_column(ChunkPos::new(0, 0));
        let flower = filled(BlockPos::new(8, 100, 8), ChunkSize::new(0, 0, 0), Block::new(BlockId::TALL_GRASS));
        map.add_chunk(&flower, &mut Neighborhood::isolated()).unwrap();
        let f = map_index(8, 100, 8);
        assert!(map.is_visible(map_index(8, 101, 8)));
        assert!(map.is_visible(map_index(8, 99, 8)));
        // Surrounded by stone, the flower itself is fully covered.
        assert_eq!(map.visflags(f) & ALL_FACES, ALL_FACES);
    }

    #[test]
    fn unloaded_policy_can_expose_edges() {
        let mut map = MapChunk::with_unloaded(ChunkPos::new(0, 0), Block::AIR);
        let mut open = Neighborhood::new([None, None, None, None], Block::AIR);
        let one = filled(BlockPos::new(0, 0, 0), ChunkSize::new(0, 0, 0), Block::new(BlockId::STONE));
        map.add_chunk(&one, &mut open).unwrap();
        let i = map_index(0, 0, 0);
        assert_eq!(map.visflags(i) & ALL_FACES, 0);
        assert!(map.is_visible(i));
    }

    #[test]
    fn out_of_range_sub_chunk_is_rejected_without_mutation() {
        let mut map = MapChunk::new(ChunkPos::new(1, 1));
        let too_wide = filled(BlockPos::new(20, 0, 16), ChunkSize::new(15, 0, 0), Block::new(BlockId::STONE));
        assert!(matches!(
            map.add_chunk(&too_wide, &mut Neighborhood::isolated()),
            Err(MergeError::OutOfBounds { .. })
        ));
        let too_tall = filled(BlockPos::new(16, 100, 16), ChunkSize::new(0, 31, 0), Block::new(BlockId::STONE));
        assert!(map.add_chunk(&too_tall, &mut Neighborhood::isolated()).is_err());
        let other_column = filled(BlockPos::new(0, 0, 0), ChunkSize::new(0, 0, 0), Block::new(BlockId::STONE));
        assert!(map.add_chunk(&other_column, &mut Neighborhood::isolated()).is_err());

        assert!(map.blocks().iter().all(|b| *b == Block::AIR));
        assert!(!map.is_updated());
    }

    #[test]
    fn unmaterialized_sub_chunk_is_rejected() {
        let mut map = MapChunk::new(ChunkPos::new(0, 0));
        let lazy = Chunk::from_zipped(BlockPos::new(0, 0, 0), ChunkSize::new(0, 0, 0), &[1, 2, 3]);
        assert_eq!(
            map.add_chunk(&lazy, &mut Neighborhood::isolated()),
            Err(MergeError::NotMaterialized)
        );
    }

    #[test]
    fn set_block_matches_a_one_voxel_merge() {
        let mut a = stone_column(ChunkPos::new(0, 0));
        let mut b = stone_column(ChunkPos::new(0, 0));
        let index = map_index(9, 20, 4);
        a.set_block(index, Block::AIR, &mut Neighborhood::isolated());
        let hole = filled(BlockPos::new(9, 20, 4), ChunkSize::new(0, 0, 0), Block::AIR);
        b.add_chunk(&hole, &mut Neighborhood::isolated()).unwrap();
        assert_eq!(a.visible_indices(), b.visible_indices());
        assert_eq!(a.visflags, b.visflags);
    }

    #[test]
    fn export_round_trips_through_a_chunk() {
        let mut map = stone_column(ChunkPos::new(3, 4));
        map.set_block(map_index(1, 2, 3), Block::new(BlockId::GLASS).with_light(4, 9), &mut Neighborhood::isolated());
        let chunk = map.to_chunk();
        assert_eq!(chunk.origin(), BlockPos::new(48, 0, 64));
        assert_eq!(chunk.block(1, 2, 3), Some(map.block(map_index(1, 2, 3))));

        let mut copy = MapChunk::new(ChunkPos::new(3, 4));
        copy.add_chunk(&chunk, &mut Neighborhood::isolated()).unwrap();
        assert_eq!(copy.blocks(), map.blocks());
        assert_eq!(copy.visible_indices(), map.visible_indices());
    }

    #[test]
    fn edge_indices_cover_one_face() {
        let edge: Vec<usize> = edge_indices(Side::PosZ).collect();
        assert_eq!(edge.len(), CHUNK_WIDTH * CHUNK_HEIGHT);
        assert!(edge.iter().all(|&i| crate::world::position::map_coords(i).2 == 15));
    }
}
