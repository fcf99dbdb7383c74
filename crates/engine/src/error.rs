//! Error types for chunk transcoding and merging.

use std::io;

use thiserror::Error;

use crate::world::PendingId;

/// One of a chunk's three representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    Blocks,
    Packed,
    Zipped,
}

/// Failures while converting a chunk between representations.
///
/// The representation being produced is left empty when one of these is
/// returned.
#[derive(Error, Debug)]
pub enum ChunkError {
    /// The source representation has not been materialized.
    #[error("chunk has no {0:?} data")]
    NotMaterialized(Repr),

    #[error("zlib compression failed: {0}")]
    Compress(#[source] io::Error),

    #[error("zlib decompression failed: {0}")]
    Decompress(#[source] io::Error),

    /// Decompressed data does not match the size implied by the dimensions.
    #[error("decompressed {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Reasons a sub-chunk is refused by a map chunk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("sub-chunk has no block data")]
    NotMaterialized,

    /// The sub-chunk extends past the 16x128x16 column that owns its origin.
    #[error("sub-chunk at ({x}, {y}, {z}) with extent {extent:?} leaves its column")]
    OutOfBounds {
        x: i32,
        y: i32,
        z: i32,
        extent: (usize, usize, usize),
    },
}

/// A chunk was queued but could not be decoded.
///
/// The chunk stays registered under `id`; it can be inspected or retried
/// through the world's pending accessors.
#[derive(Error, Debug)]
#[error("pending chunk {id:?} is unusable: {source}")]
pub struct PendingError {
    pub id: PendingId,
    #[source]
    pub source: ChunkError,
}
