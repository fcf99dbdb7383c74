//! Packed chunk byte layout.
//!
//! For `n` voxels with `h = ceil(n / 2)`:
//!
//! ```text
//! [0, n)          block ID per voxel
//! [n, n+h)        metadata nibbles
//! [n+h, 2n+h)     light nibbles: block light at nibble i, sky light at n+i
//! ```
//!
//! Nibble `k` of a region lives in byte `k / 2`: even `k` in the low nibble,
//! odd `k` in the high nibble. For even `n` the light region is a block-light
//! half followed by a sky-light half.

use super::block::{Block, BlockId};

/// Bytes per nibble region for `voxels` entries.
#[inline]
pub const fn nibble_len(voxels: usize) -> usize {
    voxels.div_ceil(2)
}

/// Total packed length for `voxels` entries: `2n + ceil(n / 2)`.
#[inline]
pub const fn packed_len(voxels: usize) -> usize {
    voxels * 2 + nibble_len(voxels)
}

#[inline]
fn get_nibble(region: &[u8], i: usize) -> u8 {
    let byte = region[i >> 1];
    if i & 1 == 0 { byte & 0x0F } else { byte >> 4 }
}

#[inline]
fn set_nibble(region: &mut [u8], i: usize, value: u8) {
    let byte = &mut region[i >> 1];
    if i & 1 == 0 {
        *byte = (*byte & 0xF0) | (value & 0x0F);
    } else {
        *byte = (*byte & 0x0F) | ((value & 0x0F) << 4);
    }
}

/// Split a packed buffer into its ID, metadata and light regions.
fn regions(bytes: &[u8], voxels: usize) -> (&[u8], &[u8], &[u8]) {
    let (ids, rest) = bytes.split_at(voxels);
    let (meta, light) = rest.split_at(nibble_len(voxels));
    (ids, meta, &light[..voxels])
}

fn regions_mut(bytes: &mut [u8], voxels: usize) -> (&mut [u8], &mut [u8], &mut [u8]) {
    let (ids, rest) = bytes.split_at_mut(voxels);
    let (meta, light) = rest.split_at_mut(nibble_len(voxels));
    (ids, meta, &mut light[..voxels])
}

/// Encode `blocks` into `out`. Metadata above 15 is truncated to 4 bits.
///
/// `out` must be at least [`packed_len`] bytes; its previous contents are
/// overwritten.
pub fn pack_into(blocks: &[Block], out: &mut [u8]) {
    let n = blocks.len();
    debug_assert!(out.len() >= packed_len(n));
    out[..packed_len(n)].fill(0);

    let (ids, meta, light) = regions_mut(out, n);
    for (i, block) in blocks.iter().enumerate() {
        ids[i] = block.id.0;
        set_nibble(meta, i, block.metadata);
        set_nibble(light, i, block.block_light());
        set_nibble(light, n + i, block.sky_light());
    }
}

/// Decode `bytes` into `out`, one block per entry of `out`.
pub fn unpack_into(bytes: &[u8], out: &mut [Block]) {
    let n = out.len();
    debug_assert!(bytes.len() >= packed_len(n));

    let (ids, meta, light) = regions(bytes, n);
    for (i, block) in out.iter_mut().enumerate() {
        *block = Block {
            id: BlockId(ids[i]),
            metadata: get_nibble(meta, i),
            light: (get_nibble(light, i) << 4) | get_nibble(light, n + i),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(packed_len(32768), 32768 * 2 + 16384);
        assert_eq!(packed_len(2), 5);
        assert_eq!(packed_len(1), 3);
        assert_eq!(packed_len(3), 8);
        assert_eq!(packed_len(0), 0);
    }

    #[test]
    fn nibble_parity() {
        let blocks = [
            Block { id: BlockId(1), metadata: 0x2, light: 0x34 },
            Block { id: BlockId(5), metadata: 0x6, light: 0x78 },
        ];
        let mut out = [0u8; 5];
        pack_into(&blocks, &mut out);
        // ids, then one byte per nibble region with voxel 0 low / voxel 1 high.
        assert_eq!(out, [1, 5, 0x62, 0x73, 0x84]);
    }

    #[test]
    fn odd_voxel_count_keeps_regions_apart() {
        let blocks = [
            Block { id: BlockId(9), metadata: 0xF, light: 0xFF },
            Block { id: BlockId(8), metadata: 0x1, light: 0x12 },
            Block { id: BlockId(7), metadata: 0xE, light: 0xED },
        ];
        let mut out = vec![0u8; packed_len(3)];
        pack_into(&blocks, &mut out);
        assert_eq!(out.len(), 8);
        assert_eq!(&out[..3], &[9, 8, 7]);
        assert_eq!(&out[3..5], &[0x1F, 0x0E]);
        // Block light F, 1, E at nibbles 0..3, sky light F, 2, D at 3..6.
        assert_eq!(&out[5..8], &[0x1F, 0xFE, 0xD2]);

        let mut back = [Block::AIR; 3];
        unpack_into(&out, &mut back);
        assert_eq!(back, blocks);
    }

    #[test]
    fn single_voxel_uses_three_bytes() {
        let block = Block { id: BlockId(20), metadata: 0x5, light: 0xA3 };
        let mut out = [0u8; 3];
        pack_into(&[block], &mut out);
        assert_eq!(out, [20, 0x05, 0x3A]);
        let mut back = [Block::AIR];
        unpack_into(&out, &mut back);
        assert_eq!(back, [block]);
    }

    #[test]
    fn metadata_is_truncated_to_four_bits() {
        let blocks = [Block { id: BlockId(3), metadata: 0x1A, light: 0 }, Block::AIR];
        let mut out = [0u8; 5];
        pack_into(&blocks, &mut out);
        let mut back = [Block::AIR; 2];
        unpack_into(&out, &mut back);
        assert_eq!(back[0].metadata, 0xA);
        assert_eq!(back[1], Block::AIR);
    }

    #[test]
    fn random_round_trip() {
        let mut rng = fastrand::Rng::with_seed(0xC0FFEE);
        let blocks: Vec<Block> = (0..4097)
            .map(|_| Block {
                id: BlockId(rng.u8(..)),
                metadata: rng.u8(0..16),
                light: rng.u8(..),
            })
            .collect();
        let mut packed = vec![0u8; packed_len(blocks.len())];
        pack_into(&blocks, &mut packed);
        let mut back = vec![Block::AIR; blocks.len()];
        unpack_into(&packed, &mut back);
        assert_eq!(back, blocks);
    }
}
