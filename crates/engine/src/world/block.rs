//! Voxel records and the static per-ID property table.
//!
//! A [`Block`] is the three-byte record every chunk stores per voxel. What a
//! block ID *means* for occlusion and drawing lives in [`BLOCK_TABLE`], a
//! fixed 256-entry table indexed by the raw ID.

/// Raw block identifier. `u8` on the wire, so every value indexes the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BlockId(pub u8);

impl BlockId {
    /// The universal "empty" block. Never rendered.
    pub const AIR: BlockId = BlockId(0);
    /// Stands in for cells of chunks that are not loaded.
    pub const STONE: BlockId = BlockId(1);
    pub const GRASS: BlockId = BlockId(2);
    pub const DIRT: BlockId = BlockId(3);
    pub const BEDROCK: BlockId = BlockId(7);
    pub const WATER: BlockId = BlockId(9);
    pub const LEAVES: BlockId = BlockId(18);
    pub const GLASS: BlockId = BlockId(20);
    pub const TALL_GRASS: BlockId = BlockId(31);
    pub const TORCH: BlockId = BlockId(50);

    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn properties(self) -> &'static BlockProperties {
        &BLOCK_TABLE[self.0 as usize]
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.properties().opaque
    }

    #[inline]
    pub fn is_cube(self) -> bool {
        self.properties().cube
    }

    #[inline]
    pub fn is_logic(self) -> bool {
        self.properties().logic
    }

    #[inline]
    pub fn does_burn(self) -> bool {
        self.properties().burns
    }

    #[inline]
    pub fn draw_kind(self) -> DrawKind {
        self.properties().draw
    }
}

/// One voxel: ID, 4-bit metadata and a light byte.
///
/// `light` holds block light in the high nibble and sky light in the low
/// nibble, the same split the packed format stores as two nibble regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct Block {
    pub id: BlockId,
    pub metadata: u8,
    pub light: u8,
}

impl Block {
    pub const AIR: Block = Block::new(BlockId::AIR);

    pub const fn new(id: BlockId) -> Self {
        Self {
            id,
            metadata: 0,
            light: 0,
        }
    }

    pub const fn with_metadata(mut self, metadata: u8) -> Self {
        self.metadata = metadata;
        self
    }

    pub const fn with_light(mut self, block_light: u8, sky_light: u8) -> Self {
        self.light = ((block_light & 0x0F) << 4) | (sky_light & 0x0F);
        self
    }

    #[inline]
    pub const fn block_light(&self) -> u8 {
        self.light >> 4
    }

    #[inline]
    pub const fn sky_light(&self) -> u8 {
        self.light & 0x0F
    }
}

/// How the renderer emits geometry for a block ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKind {
    /// Nothing is drawn (air).
    None,
    /// Six textured faces.
    Cube,
    /// Two crossed quads (flowers, saplings, crops).
    Cross,
    /// Cube faces with a lowered top and transparency.
    Liquid,
    /// Thin post anchored to the metadata-selected face.
    Torch,
    /// Half-height box.
    Slab,
    Stairs,
    /// Flat quad lying on the floor (rails, wire, plates, snow).
    Flat,
    /// Thin panel (doors, ladders, signs, trapdoors).
    Panel,
    Fence,
    Cactus,
    /// Anything with a bespoke model.
    Special,
}

/// Capability flags for one block ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProperties {
    /// Fully hides any face behind it.
    pub opaque: bool,
    /// Occupies the whole voxel, as opposed to a sprite or partial model.
    pub cube: bool,
    pub burns: bool,
    /// Takes part in redstone or other interaction logic.
    pub logic: bool,
    pub draw: DrawKind,
}

impl BlockProperties {
    const fn new(opaque: bool, cube: bool, draw: DrawKind) -> Self {
        Self {
            opaque,
            cube,
            burns: false,
            logic: false,
            draw,
        }
    }

    const SOLID: Self = Self::new(true, true, DrawKind::Cube);
    const CLEAR_CUBE: Self = Self::new(false, true, DrawKind::Cube);
    const AIR: Self = Self::new(false, false, DrawKind::None);

    const fn shaped(draw: DrawKind) -> Self {
        Self::new(false, false, draw)
    }

    const fn burning(mut self) -> Self {
        self.burns = true;
        self
    }

    const fn logic(mut self) -> Self {
        self.logic = true;
        self
    }
}

/// Properties for every possible block ID. IDs without an explicit entry are
/// treated as plain opaque cubes.
pub static BLOCK_TABLE: [BlockProperties; 256] = build_table();

const fn build_table() -> [BlockProperties; 256] {
    use BlockProperties as P;
    use DrawKind as D;

    let mut t = [P::SOLID; 256];
    t[0] = P::AIR;
    t[5] = P::SOLID.burning(); // planks
    t[6] = P::shaped(D::Cross).burning(); // sapling
    t[8] = P::new(false, true, D::Liquid); // flowing water
    t[9] = P::new(false, true, D::Liquid);
    t[10] = P::new(false, true, D::Liquid); // flowing lava
    t[11] = P::new(false, true, D::Liquid);
    t[17] = P::SOLID.burning(); // log
    t[18] = P::CLEAR_CUBE.burning(); // leaves
    t[20] = P::CLEAR_CUBE; // glass
    t[23] = P::SOLID.logic(); // dispenser
    t[25] = P::SOLID.logic(); // note block
    t[26] = P::shaped(D::Special).logic(); // bed
    t[27] = P::shaped(D::Flat).logic(); // powered rail
    t[28] = P::shaped(D::Flat).logic(); // detector rail
    t[29] = P::shaped(D::Special).logic(); // sticky piston
    t[30] = P::shaped(D::Cross); // web
    t[31] = P::shaped(D::Cross).burning(); // tall grass
    t[32] = P::shaped(D::Cross).burning(); // dead bush
    t[33] = P::shaped(D::Special).logic(); // piston
    t[34] = P::shaped(D::Special).logic(); // piston head
    t[35] = P::SOLID.burning(); // wool
    t[37] = P::shaped(D::Cross); // dandelion
    t[38] = P::shaped(D::Cross); // rose
    t[39] = P::shaped(D::Cross); // brown mushroom
    t[40] = P::shaped(D::Cross); // red mushroom
    t[44] = P::shaped(D::Slab);
    t[46] = P::SOLID.burning().logic(); // tnt
    t[47] = P::SOLID.burning(); // bookshelf
    t[50] = P::shaped(D::Torch);
    t[51] = P::shaped(D::Special); // fire
    t[52] = P::CLEAR_CUBE; // spawner
    t[53] = P::shaped(D::Stairs).burning(); // wooden stairs
    t[54] = P::SOLID.burning().logic(); // chest
    t[55] = P::shaped(D::Flat).logic(); // redstone wire
    t[58] = P::SOLID.burning(); // workbench
    t[59] = P::shaped(D::Cross); // crops
    t[60] = P::shaped(D::Special); // farmland
    t[61] = P::SOLID.logic(); // furnace
    t[62] = P::SOLID.logic(); // lit furnace
    t[63] = P::shaped(D::Special).burning().logic(); // sign post
    t[64] = P::shaped(D::Panel).burning().logic(); // wooden door
    t[65] = P::shaped(D::Panel).burning(); // ladder
    t[66] = P::shaped(D::Flat).logic(); // rail
    t[67] = P::shaped(D::Stairs); // cobblestone stairs
    t[68] = P::shaped(D::Panel).burning().logic(); // wall sign
    t[69] = P::shaped(D::Special).logic(); // lever
    t[70] = P::shaped(D::Flat).logic(); // stone plate
    t[71] = P::shaped(D::Panel).logic(); // iron door
    t[72] = P::shaped(D::Flat).burning().logic(); // wooden plate
    t[75] = P::shaped(D::Torch).logic(); // redstone torch (off)
    t[76] = P::shaped(D::Torch).logic(); // redstone torch (on)
    t[77] = P::shaped(D::Special).logic(); // button
    t[78] = P::shaped(D::Flat); // snow layer
    t[79] = P::CLEAR_CUBE; // ice
    t[81] = P::shaped(D::Cactus);
    t[83] = P::shaped(D::Cross); // reeds
    t[84] = P::SOLID.logic(); // jukebox
    t[85] = P::shaped(D::Fence).burning();
    t[90] = P::shaped(D::Special); // portal
    t[92] = P::shaped(D::Special); // cake
    t[93] = P::shaped(D::Flat).logic(); // repeater (off)
    t[94] = P::shaped(D::Flat).logic(); // repeater (on)
    t[95] = P::SOLID.logic(); // locked chest
    t[96] = P::shaped(D::Panel).burning().logic(); // trapdoor
    t
}
