//! # File-backed Chunk Store
//!
//! One file per chunk under a root directory, plus a town index.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   chunk_<x>_<y>_<quadrant>.bin
//!   towns.toml
//! ```
//!
//! ## Chunk File Format
//!
//! ```text
//! [4 bytes: magic "TCHK"]
//! [4 bytes: version]
//! [4 bytes: width]        [4 bytes: height]
//! [4 bytes: trees]        [4 bytes: stones]
//! [4 bytes: animals]      [4 bytes: plants]
//! [4 bytes: water level, f32 bits]
//! [N bytes: encoded terrain, see crate::codec]
//! ```
//!
//! All header words are little-endian.
//!
//! ## Writes
//!
//! Every write goes to a temporary file that is renamed over the target, so
//! readers see either the old or the new record, never a torn one. Writers
//! are serialized by a lock, so concurrent upserts of one chunk apply one
//! after the other.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::{merge_record, ChunkStore};
use crate::chunk::{ChunkId, ChunkRange, ChunkRecord, Quadrant, ResourceCounts, ResourceDelta};
use crate::coords::WorldRect;
use crate::error::{StoreError, StoreResult};
use crate::structures::Town;

/// Magic bytes identifying a chunk file.
const CHUNK_MAGIC: [u8; 4] = *b"TCHK";

/// Current chunk file version.
const CHUNK_VERSION: u32 = 1;

/// Header words before the terrain payload.
const HEADER_WORDS: usize = 9;

/// Header length in bytes.
const HEADER_LEN: usize = HEADER_WORDS * 4;

/// File name of the town index.
const TOWN_INDEX: &str = "towns.toml";

/// Contents of `towns.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
struct TownIndex {
    /// Last assigned town id.
    #[serde(default)]
    last_id: i64,
    /// All towns.
    #[serde(default)]
    towns: Vec<Town>,
}

/// A [`ChunkStore`] persisting to a directory.
pub struct FileChunkStore {
    /// Directory holding all files.
    root: PathBuf,
    /// Serializes read-modify-write cycles on chunk files.
    write_lock: Mutex<()>,
    /// In-memory copy of the town index.
    towns: RwLock<TownIndex>,
}

impl FileChunkStore {
    /// Opens (or creates) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or an existing
    /// town index cannot be parsed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let index_path = root.join(TOWN_INDEX);
        let towns = match fs::read_to_string(&index_path) {
            Ok(text) => toml::from_str(&text)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", index_path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => TownIndex::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Opened chunk store at {} ({} towns)", root.display(), towns.towns.len());

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            towns: RwLock::new(towns),
        })
    }

    /// Path of the file holding `id`.
    fn chunk_path(&self, id: ChunkId) -> PathBuf {
        self.root
            .join(format!("chunk_{}_{}_{}.bin", id.x, id.y, id.quadrant.number()))
    }

    /// Reads the record for `id`, if any.
    fn read_record(&self, id: ChunkId) -> StoreResult<Option<ChunkRecord>> {
        match fs::read(self.chunk_path(id)) {
            Ok(bytes) => decode_record(id, &bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes `record` over its file.
    fn write_record(&self, record: &ChunkRecord) -> StoreResult<()> {
        write_atomic(&self.chunk_path(record.id), &encode_record(record))
    }
}

impl ChunkStore for FileChunkStore {
    fn get_chunk(&self, id: ChunkId) -> StoreResult<Option<ChunkRecord>> {
        self.read_record(id)
    }

    fn save_or_update(&self, record: ChunkRecord) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let existing = self.read_record(record.id)?;
        let merged = merge_record(existing.as_ref(), record);
        self.write_record(&merged)
    }

    fn towns_in_rect(&self, rect: WorldRect) -> StoreResult<Vec<Town>> {
        Ok(self
            .towns
            .read()
            .towns
            .iter()
            .filter(|town| town.is_within(&rect))
            .cloned()
            .collect())
    }

    fn adjust_resources(&self, id: ChunkId, delta: ResourceDelta) -> StoreResult<Option<ResourceCounts>> {
        let _guard = self.write_lock.lock();
        let Some(mut record) = self.read_record(id)? else {
            return Ok(None);
        };

        record.resources = record.resources.apply(delta);
        self.write_record(&record)?;
        Ok(Some(record.resources))
    }

    fn add_town(&self, mut town: Town) -> StoreResult<i64> {
        let mut index = self.towns.write();

        let mut updated = index.clone();
        updated.last_id += 1;
        town.id = updated.last_id;
        updated.towns.push(town);

        let text = toml::to_string(&updated).map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.root.join(TOWN_INDEX), text.as_bytes())?;

        *index = updated;
        Ok(index.last_id)
    }

    fn chunk_range(&self) -> StoreResult<Option<ChunkRange>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(id) = entry.file_name().to_str().and_then(parse_chunk_file_name) {
                ids.push(id);
            }
        }
        Ok(ChunkRange::of_global(ids))
    }
}

/// Serializes a record into the chunk file format.
fn encode_record(record: &ChunkRecord) -> Vec<u8> {
    let header: [u32; HEADER_WORDS] = [
        u32::from_ne_bytes(CHUNK_MAGIC),
        CHUNK_VERSION.to_le(),
        record.width.to_le(),
        record.height.to_le(),
        record.resources.trees.to_le(),
        record.resources.stones.to_le(),
        record.resources.animals.to_le(),
        record.resources.plants.to_le(),
        record.water_level.to_bits().to_le(),
    ];

    let mut bytes = Vec::with_capacity(HEADER_LEN + record.terrain.len());
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(&record.terrain);
    bytes
}

/// Parses a chunk file.
fn decode_record(id: ChunkId, bytes: &[u8]) -> StoreResult<ChunkRecord> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::Corrupted(format!(
            "chunk {id}: file too short ({} bytes)",
            bytes.len()
        )));
    }

    let (head, terrain) = bytes.split_at(HEADER_LEN);
    let header: [u32; HEADER_WORDS] = bytemuck::pod_read_unaligned(head);

    if header[0].to_ne_bytes() != CHUNK_MAGIC {
        return Err(StoreError::Corrupted(format!("chunk {id}: bad magic")));
    }
    let version = u32::from_le(header[1]);
    if version != CHUNK_VERSION {
        return Err(StoreError::Corrupted(format!("chunk {id}: unsupported version {version}")));
    }

    let word = |i: usize| u32::from_le(header[i]);
    let resources = ResourceCounts {
        trees: word(4),
        stones: word(5),
        animals: word(6),
        plants: word(7),
    };
    if !resources.within_limits() {
        return Err(StoreError::Corrupted(format!("chunk {id}: resources out of range {resources:?}")));
    }

    Ok(ChunkRecord {
        id,
        width: word(2),
        height: word(3),
        terrain: terrain.to_vec(),
        resources,
        water_level: f32::from_bits(word(8)),
    })
}

/// Parses `chunk_<x>_<y>_<q>.bin`.
fn parse_chunk_file_name(name: &str) -> Option<ChunkId> {
    let stem = name.strip_prefix("chunk_")?.strip_suffix(".bin")?;
    let mut parts = stem.split('_');
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let quadrant = Quadrant::from_number(parts.next()?.parse().ok()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(ChunkId::local(x, y, quadrant))
}

/// Writes `bytes` to `path` through a temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
