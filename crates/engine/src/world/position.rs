/// Column width of a map chunk along X and Z.
pub const CHUNK_WIDTH: usize = 16;
/// Height of a map chunk.
pub const CHUNK_HEIGHT: usize = 128;
/// Voxels per map chunk.
pub const CHUNK_VOLUME: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH;

/// Absolute block position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The map chunk column this block belongs to.
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos::containing(self.x, self.z)
    }

    /// Index inside the owning map chunk, or `None` above or below the world.
    pub const fn map_index(&self) -> Option<usize> {
        if self.y < 0 || self.y >= CHUNK_HEIGHT as i32 {
            return None;
        }
        Some(map_index(
            (self.x & 0xF) as usize,
            self.y as usize,
            (self.z & 0xF) as usize,
        ))
    }
}

/// Map chunk column position, in chunk units (block coordinate >> 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The column that owns block column (x, z).
    pub const fn containing(x: i32, z: i32) -> Self {
        Self { x: x >> 4, z: z >> 4 }
    }

    /// World-space origin of the column (`X & !0xF`, 0, `Z & !0xF`).
    pub const fn block_origin(&self) -> BlockPos {
        BlockPos::new(self.x << 4, 0, self.z << 4)
    }

    /// The adjacent column on `side`.
    pub const fn offset(&self, side: Side) -> ChunkPos {
        match side {
            Side::NegX => Self::new(self.x - 1, self.z),
            Side::PosX => Self::new(self.x + 1, self.z),
            Side::NegZ => Self::new(self.x, self.z - 1),
            Side::PosZ => Self::new(self.x, self.z + 1),
        }
    }
}

/// Horizontal neighbor slots of a map chunk, in link order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    NegX = 0,
    PosX = 1,
    NegZ = 2,
    PosZ = 3,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::NegX, Side::PosX, Side::NegZ, Side::PosZ];

    pub const fn opposite(self) -> Side {
        match self {
            Side::NegX => Side::PosX,
            Side::PosX => Side::NegX,
            Side::NegZ => Side::PosZ,
            Side::PosZ => Side::NegZ,
        }
    }

    pub const fn face(self) -> Face {
        match self {
            Side::NegX => Face::NegX,
            Side::PosX => Face::PosX,
            Side::NegZ => Face::NegZ,
            Side::PosZ => Face::PosZ,
        }
    }
}

/// The six faces of a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::NegX,
        Face::PosX,
        Face::NegY,
        Face::PosY,
        Face::NegZ,
        Face::PosZ,
    ];

    pub const fn opposite(self) -> Face {
        match self {
            Face::NegX => Face::PosX,
            Face::PosX => Face::NegX,
            Face::NegY => Face::PosY,
            Face::PosY => Face::NegY,
            Face::NegZ => Face::PosZ,
            Face::PosZ => Face::NegZ,
        }
    }

    /// The horizontal neighbor chunk this face crosses into at the edge.
    pub const fn side(self) -> Option<Side> {
        match self {
            Face::NegX => Some(Side::NegX),
            Face::PosX => Some(Side::PosX),
            Face::NegZ => Some(Side::NegZ),
            Face::PosZ => Some(Side::PosZ),
            Face::NegY | Face::PosY => None,
        }
    }
}

/// Map chunk index: `y | z << 7 | x << 11`.
#[inline]
pub const fn map_index(x: usize, y: usize, z: usize) -> usize {
    y | (z << 7) | (x << 11)
}

/// Inverse of [`map_index`], returning (x, y, z).
#[inline]
pub const fn map_coords(index: usize) -> (usize, usize, usize) {
    (index >> 11, index & 0x7F, (index >> 7) & 0xF)
}

/// Where the cell across `face` from a map chunk voxel lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborCell {
    /// Inside the same map chunk.
    Local(usize),
    /// In the neighbor chunk on `side`, at `index`.
    Remote(Side, usize),
    /// Above or below the world.
    OutOfWorld,
}

/// Locate the neighbor of voxel `index` across `face`.
pub const fn neighbor_cell(index: usize, face: Face) -> NeighborCell {
    let (x, y, z) = map_coords(index);
    let last = CHUNK_WIDTH - 1;
    match face {
        Face::NegX if x == 0 => NeighborCell::Remote(Side::NegX, map_index(last, y, z)),
        Face::NegX => NeighborCell::Local(map_index(x - 1, y, z)),
        Face::PosX if x == last => NeighborCell::Remote(Side::PosX, map_index(0, y, z)),
        Face::PosX => NeighborCell::Local(map_index(x + 1, y, z)),
        Face::NegY if y == 0 => NeighborCell::OutOfWorld,
        Face::NegY => NeighborCell::Local(map_index(x, y - 1, z)),
        Face::PosY if y == CHUNK_HEIGHT - 1 => NeighborCell::OutOfWorld,
        Face::PosY => NeighborCell::Local(map_index(x, y + 1, z)),
        Face::NegZ if z == 0 => NeighborCell::Remote(Side::NegZ, map_index(x, y, last)),
        Face::NegZ => NeighborCell::Local(map_index(x, y, z - 1)),
        Face::PosZ if z == last => NeighborCell::Remote(Side::PosZ, map_index(x, y, 0)),
        Face::PosZ => NeighborCell::Local(map_index(x, y, z + 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_layout() {
        assert_eq!(map_index(0, 0, 0), 0);
        assert_eq!(map_index(0, 1, 0), 1);
        assert_eq!(map_index(0, 0, 1), 128);
        assert_eq!(map_index(1, 0, 0), 2048);
        assert_eq!(map_index(15, 127, 15), CHUNK_VOLUME - 1);
        assert_eq!(map_coords(map_index(3, 77, 9)), (3, 77, 9));
    }

    #[test]
    fn chunk_pos_handles_negative_coordinates() {
        assert_eq!(ChunkPos::containing(-1, -16), ChunkPos::new(-1, -1));
        assert_eq!(ChunkPos::containing(-17, 15), ChunkPos::new(-2, 0));
        assert_eq!(BlockPos::new(-1, 5, 0).map_index(), Some(map_index(15, 5, 0)));
        assert_eq!(ChunkPos::new(-2, 3).block_origin(), BlockPos::new(-32, 0, 48));
    }

    #[test]
    fn neighbor_cells_cross_edges() {
        let corner = map_index(0, 0, 15);
        assert_eq!(
            neighbor_cell(corner, Face::NegX),
            NeighborCell::Remote(Side::NegX, map_index(15, 0, 15))
        );
        assert_eq!(
            neighbor_cell(corner, Face::PosZ),
            NeighborCell::Remote(Side::PosZ, map_index(0, 0, 0))
        );
        assert_eq!(neighbor_cell(corner, Face::NegY), NeighborCell::OutOfWorld);
        assert_eq!(
            neighbor_cell(corner, Face::PosX),
            NeighborCell::Local(map_index(1, 0, 15))
        );
    }

    #[test]
    fn opposites_round_trip() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
        }
        for side in Side::ALL {
            assert_eq!(side.face().side(), Some(side));
            assert_eq!(side.opposite().opposite(), side);
        }
    }
}
