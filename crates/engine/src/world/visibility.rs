//! Per-voxel face occlusion.
//!
//! Each map chunk voxel carries one flag byte:
//!
//! ```text
//! bit 7  -X face covered      bit 3  -Z face covered
//! bit 6  +X face covered      bit 2  +Z face covered
//! bit 5  -Y face covered      bit 1  air (never drawn)
//! bit 4  +Y face covered      bit 0  voxel is opaque
//! ```
//!
//! A face bit is set when the neighbor across that face hides it, so the
//! renderer can skip the face. The byte is a pure function of the voxel and
//! its six neighbors.

use super::block::Block;
use super::position::Face;

pub const AIR: u8 = 1 << 1;
pub const OPAQUE: u8 = 1 << 0;
/// All six face bits.
pub const ALL_FACES: u8 = 0b1111_1100;

/// Flag bit for `face`.
#[inline]
pub const fn face_bit(face: Face) -> u8 {
    match face {
        Face::NegX => 1 << 7,
        Face::PosX => 1 << 6,
        Face::NegY => 1 << 5,
        Face::PosY => 1 << 4,
        Face::NegZ => 1 << 3,
        Face::PosZ => 1 << 2,
    }
}

/// Does `cover` hide the face of `target` that touches it?
///
/// - opaque blocks hide every neighbor face;
/// - two transparent cubes (glass, leaves, water) hide their shared faces;
/// - nothing else hides anything: sprites never cover, and a transparent
///   cube does not hide an opaque block behind it.
#[inline]
pub fn occludes(cover: Block, target: Block) -> bool {
    let c = cover.id.properties();
    if c.opaque {
        return true;
    }
    let t = target.id.properties();
    c.cube && t.cube && !t.opaque
}

/// Flags contributed by the voxel itself, before any face bits.
#[inline]
pub fn base_flags(block: Block) -> u8 {
    let mut flags = 0;
    if block.id.is_air() {
        flags |= AIR;
    }
    if block.id.is_opaque() {
        flags |= OPAQUE;
    }
    flags
}

/// A voxel is drawn unless it is air or covered on all six faces.
#[inline]
pub const fn is_visible(flags: u8) -> bool {
    flags & AIR == 0 && flags & ALL_FACES != ALL_FACES
}

#[inline]
pub const fn with_bit(flags: u8, bit: u8, on: bool) -> u8 {
    if on { flags | bit } else { flags & !bit }
}
