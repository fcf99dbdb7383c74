//! World persistence: one file per map chunk column.
//!
//! Columns are saved to `<dir>/chunks/c.X.Z.bin` (X, Z in chunk units), each
//! holding a small big-endian header followed by the zlib-compressed packed
//! column, the same bytes a chunk producer sends over the wire. A
//! `world.json` manifest records the format version.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail, ensure};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use cubeview_engine::world::World;
use cubeview_engine::world::chunk::ChunkSize;
use cubeview_engine::world::position::ChunkPos;

const MAGIC: &[u8; 4] = b"CVMC";
pub const FORMAT_VERSION: u8 = 1;
/// Magic, version, x, z, payload length.
const HEADER_LEN: usize = 4 + 1 + 4 + 4 + 4;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub format_version: u8,
    pub chunk_count: usize,
}

fn chunk_file_name(pos: ChunkPos) -> String {
    format!("c.{}.{}.bin", pos.x, pos.z)
}

/// Parse `c.X.Z.bin`.
fn parse_chunk_file_name(name: &str) -> Option<ChunkPos> {
    let parts: Vec<&str> = name.strip_suffix(".bin")?.split('.').collect();
    if parts.len() != 3 || parts[0] != "c" {
        return None;
    }
    Some(ChunkPos::new(parts[1].parse().ok()?, parts[2].parse().ok()?))
}

// ── File format ──────────────────────────────────────────────────────────────

pub fn encode_chunk_file(pos: ChunkPos, zipped: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(zipped.len()).context("compressed column too large")?;
    let mut out = Vec::with_capacity(HEADER_LEN + zipped.len());
    out.extend_from_slice(MAGIC);
    out.write_u8(FORMAT_VERSION)?;
    out.write_i32::<BigEndian>(pos.x)?;
    out.write_i32::<BigEndian>(pos.z)?;
    out.write_u32::<BigEndian>(len)?;
    out.extend_from_slice(zipped);
    Ok(out)
}

/// Split a chunk file into its position and compressed payload.
pub fn decode_chunk_file(bytes: &[u8]) -> Result<(ChunkPos, &[u8])> {
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic).context("reading magic")?;
    ensure!(&magic == MAGIC, "not a chunk file (magic {:02x?})", magic);
    let version = cursor.read_u8().context("reading version")?;
    ensure!(version == FORMAT_VERSION, "unsupported chunk format version {}", version);
    let x = cursor.read_i32::<BigEndian>().context("reading x")?;
    let z = cursor.read_i32::<BigEndian>().context("reading z")?;
    let len = cursor.read_u32::<BigEndian>().context("reading length")? as usize;

    let start = cursor.position() as usize;
    let payload = bytes
        .get(start..start + len)
        .with_context(|| format!("payload truncated: want {} bytes, have {}", len, bytes.len() - start))?;
    Ok((ChunkPos::new(x, z), payload))
}

// ── Save ─────────────────────────────────────────────────────────────────────

/// Save only updated map chunks to `<dir>/chunks/`. Returns the number of
/// columns written.
///
/// A column's updated flag is cleared once its file is on disk, so after a
/// failed save the remaining columns are picked up by the next one.
pub fn save_world(world: &mut World, dir: &Path) -> Result<usize> {
    let updated = world.updated_chunks();
    if updated.is_empty() {
        tracing::info!("World save: nothing to save (no updated chunks)");
        return Ok(0);
    }

    let start = Instant::now();
    let chunk_dir = dir.join("chunks");
    fs::create_dir_all(&chunk_dir)
        .with_context(|| format!("creating {}", chunk_dir.display()))?;

    let mut written = 0usize;
    for pos in &updated {
        let Some(map) = world.get_chunk_at(*pos) else {
            continue;
        };
        let mut chunk = map.to_chunk();
        chunk
            .pack()
            .with_context(|| format!("packing chunk ({}, {})", pos.x, pos.z))?;
        chunk
            .zip()
            .with_context(|| format!("compressing chunk ({}, {})", pos.x, pos.z))?;
        let zipped = chunk
            .zipped()
            .with_context(|| format!("chunk ({}, {}) has no compressed data", pos.x, pos.z))?;

        let path = chunk_dir.join(chunk_file_name(*pos));
        let bytes = encode_chunk_file(*pos, zipped)?;
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        world.clear_updated(*pos);
        written += 1;
    }

    write_manifest(dir, world.chunk_count())?;

    tracing::info!(
        "World saved: {} updated chunks ({:.2?})",
        written,
        start.elapsed(),
    );
    Ok(written)
}

fn write_manifest(dir: &Path, chunk_count: usize) -> Result<()> {
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        chunk_count,
    };
    let path = dir.join("world.json");
    let json = serde_json::to_string_pretty(&manifest).context("serializing manifest")?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
}

pub fn read_manifest(dir: &Path) -> Result<Option<Manifest>> {
    let path = dir.join("world.json");
    if !path.is_file() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let manifest = serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(manifest))
}

// ── Load ─────────────────────────────────────────────────────────────────────

/// Queue every saved column under `<dir>/chunks/` and merge them.
///
/// Columns are queued compressed and decoded during the flush. Loading is a
/// start-up step: the updated flags set by the merge are cleared afterwards,
/// so freshly loaded columns are not written straight back.
///
/// Returns the number of columns merged; 0 when nothing has been saved.
pub fn load_into(world: &mut World, dir: &Path) -> Result<usize> {
    let chunk_dir = dir.join("chunks");
    if !chunk_dir.is_dir() {
        return Ok(0);
    }
    if let Some(manifest) = read_manifest(dir)? {
        if manifest.format_version != FORMAT_VERSION {
            bail!(
                "world format version {} is not supported (expected {})",
                manifest.format_version,
                FORMAT_VERSION
            );
        }
    }

    let start = Instant::now();
    let mut queued = 0usize;
    for entry in fs::read_dir(&chunk_dir).with_context(|| format!("listing {}", chunk_dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(named) = parse_chunk_file_name(name) else {
            tracing::warn!("Skipping unexpected file in chunk dir: {}", name);
            continue;
        };

        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let (pos, zipped) =
            decode_chunk_file(&bytes).with_context(|| format!("decoding {}", path.display()))?;
        if pos != named {
            tracing::warn!(
                "{} holds chunk ({}, {}); loading it there",
                name,
                pos.x,
                pos.z
            );
        }
        world
            .add_chunk_zip(pos.block_origin(), ChunkSize::COLUMN, zipped, false)
            .with_context(|| format!("queueing {}", path.display()))?;
        queued += 1;
    }

    let report = world.update_map_chunks(true);
    if report.unusable > 0 {
        tracing::warn!("{} of {} saved chunks could not be decoded", report.unusable, queued);
    }
    world.take_updated_chunks();

    tracing::info!(
        "World loaded: {} chunks ({:.2?})",
        report.merged,
        start.elapsed(),
    );
    Ok(report.merged)
}
