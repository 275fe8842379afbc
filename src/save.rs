//! Compressed chunk persistence.
//!
//! Chunks are serialized with bincode and deflated into an in-memory blob per
//! chunk position. The whole store can be written to a single file whose
//! header carries a magic number, a format version and the payload length.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use glam::IVec3;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info};

use crate::core::chunk::Chunk;
use crate::error::StoreError;

const MAGIC_HEADER: &[u8; 4] = b"VXCS";
const VERSION: u32 = 1;
// magic + version + payload length
const HEADER_LEN: u64 = 4 + 4 + 8;

pub const STORE_FILE_EXTENSION: &str = "vxcs";
pub const DEFAULT_STORE_FILE: &str = "world.vxcs";

/// Thread-safe map from chunk position to a deflated chunk blob.
pub struct ChunkStore {
    blobs: RwLock<FxHashMap<IVec3, Vec<u8>>>,
    size_in_bytes: AtomicUsize,
    compression: Compression,
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::with_compression_level(6)
    }

    /// `level` ranges from 0 (store) to 9 (smallest).
    pub fn with_compression_level(level: u32) -> Self {
        ChunkStore {
            blobs: RwLock::new(FxHashMap::default()),
            size_in_bytes: AtomicUsize::new(0),
            compression: Compression::new(level.min(9)),
        }
    }

    /// Compresses `chunk` and stores it under its position, replacing any
    /// earlier version. Returns the size of the stored blob.
    pub fn put(&self, chunk: &Chunk) -> Result<usize, StoreError> {
        let blob = self.encode(chunk).inspect_err(|e| {
            error!("Failed to store chunk {}: {}", chunk.position(), e);
        })?;
        let len = blob.len();
        self.insert_blob(chunk.position(), blob);
        debug!("Stored chunk {} ({} bytes)", chunk.position(), len);
        Ok(len)
    }

    fn encode(&self, chunk: &Chunk) -> Result<Vec<u8>, StoreError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), self.compression);
        bincode::serialize_into(&mut encoder, chunk).map_err(|source| StoreError::Encode {
            position: chunk.position(),
            source,
        })?;
        Ok(encoder.finish()?)
    }

    fn insert_blob(&self, position: IVec3, blob: Vec<u8>) {
        let added = blob.len();
        let mut blobs = self.blobs.write();
        if let Some(old) = blobs.insert(position, blob) {
            self.size_in_bytes.fetch_sub(old.len(), Ordering::Relaxed);
        }
        self.size_in_bytes.fetch_add(added, Ordering::Relaxed);
    }

    /// Restores the chunk stored at `position`.
    ///
    /// A blob that fails to inflate or decode is reported and treated as
    /// missing, so the caller regenerates the chunk.
    pub fn get(&self, position: IVec3) -> Option<Chunk> {
        let blobs = self.blobs.read();
        let blob = blobs.get(&position)?;
        match Self::decode(position, blob) {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    fn decode(position: IVec3, blob: &[u8]) -> Result<Chunk, StoreError> {
        let chunk: Chunk = bincode::deserialize_from(DeflateDecoder::new(blob))
            .map_err(|source| StoreError::Decode { position, source })?;
        if !chunk.is_well_formed() {
            return Err(StoreError::MalformedChunk(position));
        }
        Ok(chunk)
    }

    pub fn contains(&self, position: IVec3) -> bool {
        self.blobs.read().contains_key(&position)
    }

    /// Drops the stored blob, returning whether there was one.
    pub fn remove(&self, position: IVec3) -> bool {
        match self.blobs.write().remove(&position) {
            Some(old) => {
                self.size_in_bytes.fetch_sub(old.len(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Total compressed size of all stored chunks.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes.load(Ordering::Relaxed)
    }

    /// Positions of every stored chunk, in no particular order.
    pub fn list(&self) -> Vec<IVec3> {
        self.blobs.read().keys().copied().collect()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC_HEADER)?;
        writer.write_all(&VERSION.to_le_bytes())?;

        let data = {
            let blobs = self.blobs.read();
            let entries: Vec<(&IVec3, &Vec<u8>)> = blobs.iter().collect();
            bincode::serialize(&entries)?
        };

        let size = data.len() as u64;
        writer.write_all(&size.to_le_bytes())?;
        writer.write_all(&data)?;
        writer.flush()?;

        info!("Saved {} chunks to {}", self.len(), path.display());
        Ok(())
    }

    /// Reads a store file written by [`ChunkStore::save_to_file`].
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
        compression_level: u32,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC_HEADER {
            return Err(StoreError::BadMagic);
        }

        let mut version_bytes = [0u8; 4];
        reader.read_exact(&mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != VERSION {
            return Err(StoreError::UnsupportedVersion(version));
        }

        let mut size_bytes = [0u8; 8];
        reader.read_exact(&mut size_bytes)?;
        let size = u64::from_le_bytes(size_bytes);
        let available = file_len.saturating_sub(HEADER_LEN);
        if size > available {
            return Err(StoreError::Truncated {
                expected: size,
                available,
            });
        }

        let mut data = vec![0u8; size as usize];
        reader.read_exact(&mut data)?;
        let entries: Vec<(IVec3, Vec<u8>)> = bincode::deserialize(&data)?;

        let store = Self::with_compression_level(compression_level);
        for (position, blob) in entries {
            store.insert_blob(position, blob);
        }
        info!("Loaded {} chunks from {}", store.len(), path.display());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::BlockId;
    use crate::core::chunk::CHUNK_SIZE;
    use crate::core::liquid::{LiquidData, LiquidType};
    use crate::core::math::Region3;

    #[test]
    fn test_round_trip_all_air() {
        let store = ChunkStore::new();
        let chunk = Chunk::new(IVec3::new(2, 0, -7));
        store.put(&chunk).unwrap();

        assert!(store.contains(IVec3::new(2, 0, -7)));
        assert_eq!(store.get(IVec3::new(2, 0, -7)), Some(chunk));
    }

    #[test]
    fn test_round_trip_fully_solid() {
        let store = ChunkStore::new();
        let mut chunk = Chunk::new(IVec3::ZERO);
        for pos in Region3::from_min_and_size(IVec3::ZERO, CHUNK_SIZE).iter() {
            chunk.set_block(pos, BlockId(1));
        }
        chunk.mark_generated();
        store.put(&chunk).unwrap();

        let restored = store.get(IVec3::ZERO).unwrap();
        assert_eq!(restored.block(IVec3::new(15, 255, 15)), BlockId(1));
        assert_eq!(restored, chunk);
    }

    #[test]
    fn test_round_trip_keeps_light_and_liquid() {
        let store = ChunkStore::new();
        let mut chunk = Chunk::new(IVec3::new(-1, 0, 0));
        chunk.set_sunlight(IVec3::new(3, 100, 3), 11);
        chunk.set_light(IVec3::new(3, 100, 4), 6);
        chunk.set_liquid(IVec3::new(8, 40, 8), LiquidData::new(LiquidType::Lava, 3));
        store.put(&chunk).unwrap();

        let restored = store.get(chunk.position()).unwrap();
        assert_eq!(restored.sunlight(IVec3::new(3, 100, 3)), 11);
        assert_eq!(restored.light(IVec3::new(3, 100, 4)), 6);
        assert_eq!(
            restored.liquid(IVec3::new(8, 40, 8)),
            LiquidData::new(LiquidType::Lava, 3)
        );
    }

    #[test]
    fn test_size_tracks_replacement_and_removal() {
        let store = ChunkStore::new();
        let mut chunk = Chunk::new(IVec3::ZERO);
        let first = store.put(&chunk).unwrap();
        assert_eq!(store.size_in_bytes(), first);

        for x in 0..16 {
            chunk.set_block(IVec3::new(x, x * 3, 0), BlockId(x as u8));
        }
        let second = store.put(&chunk).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.size_in_bytes(), second);

        assert!(store.remove(IVec3::ZERO));
        assert!(!store.remove(IVec3::ZERO));
        assert_eq!(store.size_in_bytes(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupted_blob_reads_as_missing() {
        let store = ChunkStore::new();
        store.insert_blob(IVec3::ONE, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(store.contains(IVec3::ONE));
        assert_eq!(store.get(IVec3::ONE), None);
        assert_eq!(store.get(IVec3::ZERO), None);
    }

    /// Same field layout as `Chunk`, with arrays of any length.
    #[derive(serde::Serialize)]
    struct RawChunk {
        position: IVec3,
        blocks: Vec<u8>,
        sunlight: Vec<u8>,
        light: Vec<u8>,
        liquid: Vec<u8>,
        fresh: bool,
        light_dirty: bool,
        dirty: bool,
    }

    #[test]
    fn test_short_arrays_read_as_missing() {
        let position = IVec3::new(0, 0, 3);
        let raw = RawChunk {
            position,
            blocks: vec![1; 4],
            sunlight: vec![0; 4],
            light: vec![0; 4],
            liquid: vec![0; 4],
            fresh: false,
            light_dirty: false,
            dirty: false,
        };
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut encoder, &raw).unwrap();

        let store = ChunkStore::new();
        store.insert_blob(position, encoder.finish().unwrap());
        assert!(matches!(
            ChunkStore::decode(position, &store.blobs.read()[&position]),
            Err(StoreError::MalformedChunk(p)) if p == position
        ));
        assert_eq!(store.get(position), None);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STORE_FILE);

        let store = ChunkStore::new();
        let mut chunk = Chunk::new(IVec3::new(4, 0, 4));
        chunk.set_block(IVec3::new(1, 2, 3), BlockId(3));
        store.put(&chunk).unwrap();
        store.put(&Chunk::new(IVec3::new(5, 0, 4))).unwrap();
        store.save_to_file(&path).unwrap();

        let loaded = ChunkStore::load_from_file(&path, 6).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.size_in_bytes(), store.size_in_bytes());
        let mut positions = loaded.list();
        positions.sort_by_key(|p| p.x);
        assert_eq!(positions, vec![IVec3::new(4, 0, 4), IVec3::new(5, 0, 4)]);
        assert_eq!(loaded.get(IVec3::new(4, 0, 4)), Some(chunk));
    }

    #[test]
    fn test_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.bin");
        std::fs::write(&path, b"R3DW\x01\x00\x00\x00").unwrap();
        assert!(matches!(
            ChunkStore::load_from_file(&path, 6),
            Err(StoreError::BadMagic)
        ));

        std::fs::write(&path, b"VXCS\x09\x00\x00\x00").unwrap();
        assert!(matches!(
            ChunkStore::load_from_file(&path, 6),
            Err(StoreError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_oversized_length_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.vxcs");
        let mut bytes = b"VXCS".to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            ChunkStore::load_from_file(&path, 6),
            Err(StoreError::Truncated {
                expected: u64::MAX,
                available: 8
            })
        ));
    }
}
