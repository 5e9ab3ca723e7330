use crate::error::{FormatError, PersistError};
use crate::format::{
    decode_index, encode_index, ChunkData, ChunkFileRecord, DATA_EXTENSION, INDEX_EXTENSION,
};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use terrane_core::{ChunkBuffer, ChunkCoord};

/// Chunk persistence store: an index file plus an append-only data file.
///
/// Writes are serialized through a single cursor. Reads open their own file
/// handle and may run concurrently with each other and with writes to other
/// chunks. The index lives in memory and is rewritten in full by
/// [`ChunkStore::flush_index`] and [`ChunkStore::close`], or on drop.
pub struct ChunkStore {
    index_path: PathBuf,
    data_path: PathBuf,
    records: RwLock<HashMap<ChunkCoord, ChunkFileRecord>>,
    writer: Mutex<DataWriter>,
    closed: bool,
}

struct DataWriter {
    file: File,
    cursor: u64,
}

impl DataWriter {
    /// Append a block at the cursor and return its offset.
    /// Offsets must fit the index's 32-bit field.
    fn append(&mut self, bytes: &[u8]) -> Result<u32, PersistError> {
        let offset = self.cursor;
        if offset + bytes.len() as u64 > u32::MAX as u64 {
            return Err(PersistError::DataFileExhausted {
                offset,
                len: bytes.len(),
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        self.cursor = offset + bytes.len() as u64;
        Ok(offset as u32)
    }
}

fn with_extension_appended(path: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

impl ChunkStore {
    /// Open the store at `<path>.cix` / `<path>.cdf`, creating it if needed.
    ///
    /// A missing, unreadable, version-mismatched or inconsistent index resets
    /// the store to empty and truncates the data file. Only failures to open
    /// or truncate the data file are returned as errors.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let index_path = with_extension_appended(path, INDEX_EXTENSION);
        let data_path = with_extension_appended(path, DATA_EXTENSION);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&data_path)?;
        let data_len = file.metadata()?.len();

        let records = match std::fs::read(&index_path) {
            Ok(bytes) => match decode_index(&bytes, data_len) {
                Ok(records) => Some(records),
                Err(e) => {
                    log::warn!(
                        "resetting chunk store {}: unusable index: {e}",
                        index_path.display()
                    );
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("creating chunk store at {}", index_path.display());
                None
            }
            Err(e) => {
                log::warn!(
                    "resetting chunk store {}: failed to read index: {e}",
                    index_path.display()
                );
                None
            }
        };

        let (records, cursor) = match records {
            Some(records) => {
                let map: HashMap<_, _> = records.into_iter().map(|r| (r.coord, r)).collect();
                (map, data_len)
            }
            None => {
                file.set_len(0)?;
                (HashMap::new(), 0)
            }
        };
        log::debug!(
            "opened chunk store {} with {} records, {} data bytes",
            data_path.display(),
            records.len(),
            cursor
        );

        Ok(Self {
            index_path,
            data_path,
            records: RwLock::new(records),
            writer: Mutex::new(DataWriter { file, cursor }),
            closed: false,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Persist a chunk. Chunks without solid or liquid voxels get a
    /// zero-length record and write no data bytes.
    ///
    /// The record is only updated after the block is fully written, so a
    /// failed write leaves the previous record in place.
    pub fn write(&self, coord: ChunkCoord, data: &ChunkData) -> Result<(), PersistError> {
        // Lock order: writer, then records. The record lands while the
        // cursor is still held so index and data file never disagree.
        let mut writer = self.writer.lock().map_err(|_| PersistError::Poisoned)?;
        let record = if data.flags.has_content() {
            let bytes = data.encode();
            let offset = writer.append(&bytes)?;
            ChunkFileRecord {
                coord,
                flags: data.flags,
                offset,
                size: bytes.len() as u32,
            }
        } else {
            ChunkFileRecord {
                coord,
                flags: data.flags,
                offset: 0,
                size: 0,
            }
        };

        self.records
            .write()
            .map_err(|_| PersistError::Poisoned)?
            .insert(coord, record);
        drop(writer);
        Ok(())
    }

    /// Persist the voxels and flags of a buffer.
    pub fn write_buffer(&self, buffer: &ChunkBuffer) -> Result<(), PersistError> {
        self.write(buffer.coord(), &ChunkData::from_buffer(buffer))
    }

    /// Read a chunk. `Ok(None)` when the chunk was never written.
    pub fn try_read(&self, coord: ChunkCoord) -> Result<Option<ChunkData>, PersistError> {
        let Some(record) = self.record(coord)? else {
            return Ok(None);
        };
        if record.is_sparse() {
            return Ok(Some(ChunkData::all_air(record.flags)));
        }

        let mut file = File::open(&self.data_path)?;
        file.seek(SeekFrom::Start(record.offset as u64))?;
        let mut bytes = vec![0u8; record.size as usize];
        if let Err(e) = file.read_exact(&mut bytes) {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                return Err(e.into());
            }
            log::warn!("chunk {coord} block is truncated in {}", self.data_path.display());
            return Err(PersistError::Corrupt {
                coord,
                source: FormatError::TruncatedBlock {
                    expected: record.size as usize,
                    actual: file.metadata()?.len().saturating_sub(record.offset as u64) as usize,
                },
            });
        }

        ChunkData::decode(&bytes, record.flags)
            .map(Some)
            .map_err(|source| {
                log::warn!("chunk {coord} failed to decode: {source}");
                PersistError::Corrupt { coord, source }
            })
    }

    /// Read a chunk straight into `buffer`. Returns false (buffer untouched) on a miss.
    pub fn try_read_into(
        &self,
        coord: ChunkCoord,
        buffer: &mut ChunkBuffer,
    ) -> Result<bool, PersistError> {
        match self.try_read(coord)? {
            Some(data) => {
                data.copy_into(coord, buffer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn record(&self, coord: ChunkCoord) -> Result<Option<ChunkFileRecord>, PersistError> {
        let records = self.records.read().map_err(|_| PersistError::Poisoned)?;
        Ok(records.get(&coord).copied())
    }

    pub fn contains(&self, coord: ChunkCoord) -> Result<bool, PersistError> {
        Ok(self.record(coord)?.is_some())
    }

    pub fn len(&self) -> Result<usize, PersistError> {
        Ok(self.records.read().map_err(|_| PersistError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, PersistError> {
        Ok(self.len()? == 0)
    }

    /// Bytes written to the data file so far.
    pub fn data_len(&self) -> Result<u64, PersistError> {
        Ok(self.writer.lock().map_err(|_| PersistError::Poisoned)?.cursor)
    }

    /// Rewrite the index file from the in-memory records.
    ///
    /// The data file is synced first, then the index is written to a
    /// temporary file and renamed over the old one.
    pub fn flush_index(&self) -> Result<(), PersistError> {
        self.writer
            .lock()
            .map_err(|_| PersistError::Poisoned)?
            .file
            .sync_data()?;

        let mut records: Vec<ChunkFileRecord> = self
            .records
            .read()
            .map_err(|_| PersistError::Poisoned)?
            .values()
            .copied()
            .collect();
        records.sort_by_key(|r| (r.coord.x, r.coord.y, r.coord.z));
        let bytes = encode_index(&records);

        let tmp_path = with_extension_appended(&self.index_path, "tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&bytes)?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.index_path)?;
        log::debug!(
            "wrote index {} ({} records)",
            self.index_path.display(),
            records.len()
        );
        Ok(())
    }

    /// Flush the index and release both files.
    pub fn close(mut self) -> Result<(), PersistError> {
        let result = self.flush_index();
        self.closed = true;
        result
    }
}

impl Drop for ChunkStore {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush_index() {
            log::warn!(
                "failed to flush chunk index {} on drop: {e}",
                self.index_path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{MeshLayerInfo, MESH_LAYER_COUNT, MIN_BLOCK_SIZE};
    use glam::IVec3;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use terrane_core::{BlockType, ChunkFlags, Voxel};
    use terrane_world::{ChunkGenerator, WorldGenConfig};

    static TEST_UNIQUIFIER: AtomicU64 = AtomicU64::new(0);

    fn test_root(name: &str) -> PathBuf {
        let serial = TEST_UNIQUIFIER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!(
            "terrane-store-{name}-{}-{}",
            std::process::id(),
            serial
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).expect("create test store root");
        path
    }

    fn rocky_buffer(coord: ChunkCoord) -> ChunkBuffer {
        let mut buffer = ChunkBuffer::new();
        buffer.reset(coord);
        for z in 0..32 {
            for x in 0..32 {
                buffer.set(x, 0, z, Voxel::new(BlockType::Rock, (x + z) % 3 == 0));
                buffer.set(x, 1, z, Voxel::from(BlockType::Grass));
            }
        }
        buffer.recompute_flags(true);
        buffer
    }

    #[test]
    fn test_roundtrip_after_reopen() {
        let root = test_root("roundtrip");
        let path = root.join("world");
        let coord = IVec3::new(-3, 0, 7);
        let buffer = rocky_buffer(coord);
        let mut mesh = [MeshLayerInfo::default(); MESH_LAYER_COUNT];
        mesh[1] = MeshLayerInfo {
            vertex_count: 36,
            submesh_count: 1,
        };
        let data = ChunkData::from_buffer(&buffer).with_mesh(mesh, vec![1, 2, 3, 4]);

        let store = ChunkStore::open_or_create(&path).expect("open");
        store.write(coord, &data).expect("write");
        assert_eq!(store.try_read(coord).expect("read"), Some(data.clone()));
        store.close().expect("close");

        let store = ChunkStore::open_or_create(&path).expect("reopen");
        assert_eq!(store.len().expect("len"), 1);
        assert_eq!(store.try_read(coord).expect("read"), Some(data));
        let mut out = ChunkBuffer::new();
        assert!(store.try_read_into(coord, &mut out).expect("read into"));
        assert_eq!(out.as_bytes(), buffer.as_bytes());
        assert_eq!(out.flags(), buffer.flags());
        assert_eq!(store.try_read(IVec3::ZERO).expect("miss"), None);
    }

    #[test]
    fn test_generated_chunks_roundtrip() {
        let root = test_root("generated");
        let path = root.join("world");
        let generator = ChunkGenerator::new(WorldGenConfig::default());
        let coords = [
            IVec3::new(0, 0, 0),
            IVec3::new(1, 0, -1),
            IVec3::new(0, 10, 0),
            IVec3::new(-2, -2, 3),
        ];
        let buffers: Vec<_> = coords.iter().map(|&c| generator.generate_new(c, true)).collect();

        {
            let store = ChunkStore::open_or_create(&path).expect("open");
            for buffer in &buffers {
                store.write_buffer(buffer).expect("write");
            }
            // Dropped without close: Drop flushes the index.
        }

        let store = ChunkStore::open_or_create(&path).expect("reopen");
        for buffer in &buffers {
            let mut out = ChunkBuffer::new();
            assert!(store.try_read_into(buffer.coord(), &mut out).expect("read"));
            assert_eq!(out.as_bytes(), buffer.as_bytes());
            let mut expected = buffer.flags();
            expected.remove(ChunkFlags::DECORATIONS);
            assert_eq!(out.flags(), expected);
        }
    }

    #[test]
    fn test_all_air_is_sparse() {
        let root = test_root("sparse");
        let path = root.join("world");
        let store = ChunkStore::open_or_create(&path).expect("open");

        let air = ChunkBuffer::new();
        store.write(IVec3::new(0, 9, 0), &ChunkData::from_buffer(&air)).expect("write");
        assert_eq!(store.data_len().expect("len"), 0);
        let record = store.record(IVec3::new(0, 9, 0)).expect("record").expect("present");
        assert_eq!((record.offset, record.size), (0, 0));

        let read = store.try_read(IVec3::new(0, 9, 0)).expect("read").expect("hit");
        assert!(read.voxels.iter().all(|v| v.is_air()));
        assert_eq!(read.flags, ChunkFlags::AIR);

        store.write_buffer(&rocky_buffer(IVec3::ONE)).expect("write");
        assert_eq!(store.data_len().expect("len"), MIN_BLOCK_SIZE as u64);
        store.close().expect("close");

        let on_disk = std::fs::metadata(root.join("world.cdf")).expect("data file").len();
        assert_eq!(on_disk, MIN_BLOCK_SIZE as u64);
    }

    #[test]
    fn test_water_only_chunk_is_stored() {
        let root = test_root("water");
        let path = root.join("world");
        let coord = IVec3::new(0, -1, 0);
        let mut buffer = ChunkBuffer::new();
        buffer.reset(coord);
        for v in buffer.voxels_mut() {
            *v = Voxel::from(BlockType::Water);
        }
        let flags = buffer.recompute_flags(false);
        assert_eq!(flags, ChunkFlags::LIQUID);

        let store = ChunkStore::open_or_create(&path).expect("open");
        store.write_buffer(&buffer).expect("write");
        assert_eq!(store.data_len().expect("len"), MIN_BLOCK_SIZE as u64);
        store.close().expect("close");

        let store = ChunkStore::open_or_create(&path).expect("reopen");
        let mut out = ChunkBuffer::new();
        assert!(store.try_read_into(coord, &mut out).expect("read"));
        assert_eq!(out.as_bytes(), buffer.as_bytes());
        assert_eq!(out.flags(), ChunkFlags::LIQUID);
    }

    #[test]
    fn test_rewrite_replaces_record() {
        let root = test_root("rewrite");
        let store = ChunkStore::open_or_create(root.join("world")).expect("open");
        let coord = IVec3::new(2, 0, 2);
        let mut buffer = rocky_buffer(coord);
        store.write_buffer(&buffer).expect("write");

        buffer.set(5, 5, 5, Voxel::from(BlockType::Brick));
        let mut flags = buffer.recompute_flags(false);
        flags.insert(ChunkFlags::EDITED);
        buffer.set_flags(flags);
        store.write_buffer(&buffer).expect("rewrite");

        assert_eq!(store.len().expect("len"), 1);
        let record = store.record(coord).expect("record").expect("present");
        assert_eq!(record.offset as usize, MIN_BLOCK_SIZE);
        assert!(record.flags.contains(ChunkFlags::EDITED));
        let read = store.try_read(coord).expect("read").expect("hit");
        assert_eq!(read.voxels[terrane_core::math::voxel_index(5, 5, 5)].block(), BlockType::Brick);
    }

    #[test]
    fn test_missing_index_with_stale_data_resets() {
        let root = test_root("stale");
        std::fs::write(root.join("world.cdf"), vec![7u8; 1000]).expect("seed data");
        let store = ChunkStore::open_or_create(root.join("world")).expect("open");
        assert!(store.is_empty().expect("empty"));
        assert_eq!(store.data_len().expect("len"), 0);
    }

    #[test]
    fn test_truncated_index_resets() {
        let root = test_root("truncated");
        let path = root.join("world");
        {
            let store = ChunkStore::open_or_create(&path).expect("open");
            store.write_buffer(&rocky_buffer(IVec3::ZERO)).expect("write");
            store.write_buffer(&rocky_buffer(IVec3::X)).expect("write");
            store.close().expect("close");
        }
        let index = root.join("world.cix");
        let bytes = std::fs::read(&index).expect("index");
        std::fs::write(&index, &bytes[..bytes.len() - 5]).expect("truncate");

        let store = ChunkStore::open_or_create(&path).expect("reopen");
        assert!(store.is_empty().expect("empty"));
        assert_eq!(store.try_read(IVec3::ZERO).expect("read"), None);
        assert_eq!(store.data_len().expect("len"), 0);
    }

    #[test]
    fn test_garbage_index_resets() {
        let root = test_root("garbage");
        std::fs::write(root.join("world.cix"), b"not an index at all").expect("seed");
        let store = ChunkStore::open_or_create(root.join("world")).expect("open");
        assert!(store.is_empty().expect("empty"));
    }

    #[test]
    fn test_version_mismatch_resets() {
        let root = test_root("version");
        let path = root.join("world");
        {
            let store = ChunkStore::open_or_create(&path).expect("open");
            store.write_buffer(&rocky_buffer(IVec3::ZERO)).expect("write");
            store.close().expect("close");
        }
        let index = root.join("world.cix");
        let mut bytes = std::fs::read(&index).expect("index");
        bytes[0] = 99;
        std::fs::write(&index, &bytes).expect("rewrite");

        let store = ChunkStore::open_or_create(&path).expect("reopen");
        assert!(store.is_empty().expect("empty"));
    }

    #[test]
    fn test_truncated_data_is_corrupt() {
        let root = test_root("corrupt-len");
        let store = ChunkStore::open_or_create(root.join("world")).expect("open");
        store.write_buffer(&rocky_buffer(IVec3::ZERO)).expect("write");

        let data = OpenOptions::new()
            .write(true)
            .open(root.join("world.cdf"))
            .expect("data file");
        data.set_len(100).expect("truncate");

        let err = store.try_read(IVec3::ZERO).expect_err("should be corrupt");
        assert!(matches!(err, PersistError::Corrupt { .. }), "{err}");
    }

    #[test]
    fn test_bad_voxel_is_corrupt() {
        let root = test_root("corrupt-voxel");
        let store = ChunkStore::open_or_create(root.join("world")).expect("open");
        store.write_buffer(&rocky_buffer(IVec3::ZERO)).expect("write");

        let mut data = OpenOptions::new()
            .write(true)
            .open(root.join("world.cdf"))
            .expect("data file");
        data.seek(SeekFrom::Start(10)).expect("seek");
        data.write_all(&[0x1F]).expect("poke");
        drop(data);

        let err = store.try_read(IVec3::ZERO).expect_err("should be corrupt");
        assert!(matches!(
            err,
            PersistError::Corrupt {
                source: FormatError::InvalidVoxel(_),
                ..
            }
        ));
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        let root = test_root("concurrent");
        let store = Arc::new(ChunkStore::open_or_create(root.join("world")).expect("open"));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..8 {
                        let coord = IVec3::new(t, 0, i);
                        let buffer = rocky_buffer(coord);
                        store.write_buffer(&buffer).expect("write");
                        let read = store.try_read(coord).expect("read").expect("hit");
                        assert_eq!(&*read.voxels, buffer.voxels());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(store.len().expect("len"), 32);
        assert_eq!(store.data_len().expect("len"), 32 * MIN_BLOCK_SIZE as u64);
    }

    #[test]
    fn test_flush_index_checkpoint() {
        let root = test_root("checkpoint");
        let path = root.join("world");
        let store = ChunkStore::open_or_create(&path).expect("open");
        store.write_buffer(&rocky_buffer(IVec3::ZERO)).expect("write");
        store.flush_index().expect("flush");
        assert!(!root.join("world.cix.tmp").exists());

        let len = std::fs::metadata(root.join("world.cix")).expect("index").len();
        assert_eq!(len, 8 + 24);
        assert!(store.contains(IVec3::ZERO).expect("contains"));
        store.close().expect("close");
    }

    #[test]
    fn test_exhausted_data_file_keeps_previous_record() {
        let root = test_root("exhausted");
        let path = root.join("world");
        let coord = IVec3::new(1, 0, -1);
        let original = rocky_buffer(coord);

        let store = ChunkStore::open_or_create(&path).expect("open");
        store.write_buffer(&original).expect("write");
        let before = store.record(coord).expect("record").expect("present");

        store.writer.lock().expect("lock").cursor = u32::MAX as u64 - 10;
        let mut edited = original.clone();
        edited.set(3, 3, 3, Voxel::from(BlockType::Brick));
        edited.recompute_flags(false);
        let err = store.write_buffer(&edited).expect_err("data file is full");
        assert!(matches!(err, PersistError::DataFileExhausted { .. }), "{err}");
        assert_eq!(store.record(coord).expect("record"), Some(before));

        store.flush_index().expect("flush");
        assert_eq!(store.record(coord).expect("record"), Some(before));
        drop(store);

        let store = ChunkStore::open_or_create(&path).expect("reopen");
        assert_eq!(store.record(coord).expect("record"), Some(before));
        let read = store.try_read(coord).expect("read").expect("hit");
        assert_eq!(&*read.voxels, original.voxels());
    }
}
