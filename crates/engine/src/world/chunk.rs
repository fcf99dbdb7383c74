use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::block::Block;
use super::codec;
use super::position::BlockPos;
use crate::error::{ChunkError, Repr};

/// Chunk dimensions, each stored as extent minus one (the wire convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSize {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl ChunkSize {
    /// A full 16x128x16 map chunk column.
    pub const COLUMN: ChunkSize = ChunkSize::new(15, 127, 15);

    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Actual voxel extent along (x, y, z).
    pub const fn extent(&self) -> (usize, usize, usize) {
        (self.x as usize + 1, self.y as usize + 1, self.z as usize + 1)
    }

    pub const fn volume(&self) -> usize {
        let (x, y, z) = self.extent();
        x * y * z
    }
}

/// A rectangular prism of voxels with up to three encodings.
///
/// - `blocks`: one [`Block`] per voxel, for reads and writes.
/// - `packed`: the nibble-packed byte layout from [`codec`].
/// - `zipped`: zlib-compressed `packed` bytes.
///
/// Any of them may be absent. A chunk built from wire data holds only the
/// zipped form until [`Chunk::materialize`] is called, so queued chunks are
/// not decompressed before they are consumed.
///
/// Voxels are ordered with Y fastest, then Z, then X.
#[derive(Clone)]
pub struct Chunk {
    origin: BlockPos,
    size: ChunkSize,
    blocks: Option<Box<[Block]>>,
    packed: Option<Box<[u8]>>,
    zipped: Option<Vec<u8>>,
}

impl Chunk {
    /// A chunk at the world origin. With `allocate`, the block and packed
    /// arrays are created zeroed.
    pub fn new(size: ChunkSize, allocate: bool) -> Self {
        Self::with_origin(BlockPos::default(), size, allocate)
    }

    pub fn with_origin(origin: BlockPos, size: ChunkSize, allocate: bool) -> Self {
        let mut chunk = Self {
            origin,
            size,
            blocks: None,
            packed: None,
            zipped: None,
        };
        if allocate {
            chunk.blocks = Some(vec![Block::AIR; chunk.array_len()].into_boxed_slice());
            chunk.packed = Some(vec![0u8; chunk.byte_len()].into_boxed_slice());
        }
        chunk
    }

    /// A chunk holding only a copy of compressed wire data.
    pub fn from_zipped(origin: BlockPos, size: ChunkSize, data: &[u8]) -> Self {
        let mut chunk = Self::with_origin(origin, size, false);
        chunk.copy_zip(data);
        chunk
    }

    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    pub fn size(&self) -> ChunkSize {
        self.size
    }

    /// Number of voxels.
    pub fn array_len(&self) -> usize {
        self.size.volume()
    }

    /// Length of the packed representation.
    pub fn byte_len(&self) -> usize {
        codec::packed_len(self.array_len())
    }

    /// Length of the compressed representation, zero when absent.
    pub fn zipped_len(&self) -> usize {
        self.zipped.as_ref().map_or(0, Vec::len)
    }

    pub fn blocks(&self) -> Option<&[Block]> {
        self.blocks.as_deref()
    }

    pub fn blocks_mut(&mut self) -> Option<&mut [Block]> {
        self.blocks.as_deref_mut()
    }

    pub fn packed(&self) -> Option<&[u8]> {
        self.packed.as_deref()
    }

    pub fn zipped(&self) -> Option<&[u8]> {
        self.zipped.as_deref()
    }

    /// Whether the block array is present.
    pub fn is_materialized(&self) -> bool {
        self.blocks.is_some()
    }

    /// Index of local voxel (x, y, z) in the block array.
    #[inline]
    pub fn local_index(&self, x: usize, y: usize, z: usize) -> usize {
        let (_, ey, ez) = self.size.extent();
        y + ey * (z + ez * x)
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> Option<Block> {
        if !self.contains_local(x, y, z) {
            return None;
        }
        let index = self.local_index(x, y, z);
        self.blocks.as_ref().map(|blocks| blocks[index])
    }

    /// Overwrite one local voxel. Returns false when out of range or the
    /// block array is absent.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: Block) -> bool {
        if !self.contains_local(x, y, z) {
            return false;
        }
        let index = self.local_index(x, y, z);
        match self.blocks.as_mut() {
            Some(blocks) => {
                blocks[index] = block;
                true
            }
            None => false,
        }
    }

    fn contains_local(&self, x: usize, y: usize, z: usize) -> bool {
        let (ex, ey, ez) = self.size.extent();
        x < ex && y < ey && z < ez
    }

    /// Encode the block array into the packed array.
    pub fn pack(&mut self) -> Result<(), ChunkError> {
        let blocks = self
            .blocks
            .as_deref()
            .ok_or(ChunkError::NotMaterialized(Repr::Blocks))?;
        let len = codec::packed_len(blocks.len());
        let mut packed = match self.packed.take() {
            Some(buf) if buf.len() == len => buf,
            _ => vec![0u8; len].into_boxed_slice(),
        };
        codec::pack_into(blocks, &mut packed);
        self.packed = Some(packed);
        Ok(())
    }

    /// Decode the packed array into the block array.
    pub fn unpack(&mut self) -> Result<(), ChunkError> {
        let n = self.array_len();
        let packed = self
            .packed
            .as_deref()
            .ok_or(ChunkError::NotMaterialized(Repr::Packed))?;
        if packed.len() < codec::packed_len(n) {
            return Err(ChunkError::SizeMismatch {
                expected: codec::packed_len(n),
                actual: packed.len(),
            });
        }
        let mut blocks = match self.blocks.take() {
            Some(buf) if buf.len() == n => buf,
            _ => vec![Block::AIR; n].into_boxed_slice(),
        };
        codec::unpack_into(packed, &mut blocks);
        self.blocks = Some(blocks);
        Ok(())
    }

    /// Compress the packed array at zlib's fastest level.
    ///
    /// On failure the compressed form is cleared; the other representations
    /// are untouched.
    pub fn zip(&mut self) -> Result<(), ChunkError> {
        let packed = self
            .packed
            .as_deref()
            .ok_or(ChunkError::NotMaterialized(Repr::Packed))?;
        match compress(packed) {
            Ok(zipped) => {
                self.zipped = Some(zipped);
                Ok(())
            }
            Err(e) => {
                self.zipped = None;
                Err(ChunkError::Compress(e))
            }
        }
    }

    /// Decompress into the packed array. The output must be exactly
    /// [`Chunk::byte_len`] bytes.
    ///
    /// On failure the packed array is cleared.
    pub fn unzip(&mut self) -> Result<(), ChunkError> {
        let zipped = self
            .zipped
            .as_deref()
            .ok_or(ChunkError::NotMaterialized(Repr::Zipped))?;
        match decompress(zipped, self.byte_len()) {
            Ok(packed) => {
                self.packed = Some(packed.into_boxed_slice());
                Ok(())
            }
            Err(e) => {
                self.packed = None;
                Err(e)
            }
        }
    }

    /// Replace the compressed form with a copy of `data`.
    pub fn copy_zip(&mut self, data: &[u8]) {
        self.zipped = Some(data.to_vec());
    }

    /// Bring the block array into existence from whatever is held, unzipping
    /// and unpacking as needed.
    pub fn materialize(&mut self) -> Result<(), ChunkError> {
        if self.blocks.is_some() {
            return Ok(());
        }
        if self.packed.is_none() {
            self.unzip()?;
        }
        self.unpack()
    }
}

fn compress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::fast());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>, ChunkError> {
    let mut out = Vec::with_capacity(expected);
    // One byte past `expected` is enough to detect oversized streams.
    ZlibDecoder::new(data)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(ChunkError::Decompress)?;
    if out.len() != expected {
        return Err(ChunkError::SizeMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}
