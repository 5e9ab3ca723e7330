//! On-disk layout of the chunk index (`.cix`) and data (`.cdf`) files.
//!
//! Index: 8-byte header `(i32 version, i32 count)` followed by `count`
//! 24-byte records, all little-endian. Data: concatenated chunk blocks, each
//! `CHUNK_VOXELS` voxel bytes, then `MESH_LAYER_COUNT` pairs of
//! `(i32 vertex_count, i32 submesh_count)`, then an opaque mesh payload that
//! runs to the end of the block.

use crate::error::FormatError;
use glam::IVec3;
use terrane_core::constants::CHUNK_VOXELS;
use terrane_core::{ChunkBuffer, ChunkCoord, ChunkFlags, CoreError, Voxel};

/// Index file extension.
pub const INDEX_EXTENSION: &str = "cix";

/// Data file extension.
pub const DATA_EXTENSION: &str = "cdf";

/// Current index format version. Any other version resets the store.
pub const INDEX_VERSION: i32 = 1;

pub const INDEX_HEADER_SIZE: usize = 8;

pub const INDEX_RECORD_SIZE: usize = 24;

/// Mesh layers described in every data block.
pub const MESH_LAYER_COUNT: usize = 4;

/// Bytes of per-layer mesh metadata in a data block.
pub const MESH_METADATA_SIZE: usize = MESH_LAYER_COUNT * 8;

/// Voxel bytes in a data block.
pub const VOXEL_BLOCK_SIZE: usize = CHUNK_VOXELS as usize;

/// Smallest valid data block.
pub const MIN_BLOCK_SIZE: usize = VOXEL_BLOCK_SIZE + MESH_METADATA_SIZE;

/// Index file header. Fields are stored little-endian.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IndexHeader {
    pub version: i32,
    pub count: i32,
}

/// One index entry as laid out on disk. Fields are stored little-endian.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IndexRecord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
    pub flags: u32,
    pub offset: u32,
    pub size: u32,
}

impl IndexHeader {
    fn to_le(self) -> Self {
        Self {
            version: self.version.to_le(),
            count: self.count.to_le(),
        }
    }

    fn to_native(self) -> Self {
        Self {
            version: i32::from_le(self.version),
            count: i32::from_le(self.count),
        }
    }
}

impl IndexRecord {
    fn to_le(self) -> Self {
        Self {
            cx: self.cx.to_le(),
            cy: self.cy.to_le(),
            cz: self.cz.to_le(),
            flags: self.flags.to_le(),
            offset: self.offset.to_le(),
            size: self.size.to_le(),
        }
    }

    fn to_native(self) -> Self {
        Self {
            cx: i32::from_le(self.cx),
            cy: i32::from_le(self.cy),
            cz: i32::from_le(self.cz),
            flags: u32::from_le(self.flags),
            offset: u32::from_le(self.offset),
            size: u32::from_le(self.size),
        }
    }
}

/// Location and flags of one persisted chunk.
///
/// Chunks without content have `offset == size == 0` and no data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkFileRecord {
    pub coord: ChunkCoord,
    pub flags: ChunkFlags,
    pub offset: u32,
    pub size: u32,
}

impl ChunkFileRecord {
    pub fn is_sparse(&self) -> bool {
        self.size == 0
    }

    /// First byte past this record's block.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

impl From<ChunkFileRecord> for IndexRecord {
    fn from(r: ChunkFileRecord) -> Self {
        IndexRecord {
            cx: r.coord.x,
            cy: r.coord.y,
            cz: r.coord.z,
            flags: r.flags.bits(),
            offset: r.offset,
            size: r.size,
        }
    }
}

impl From<IndexRecord> for ChunkFileRecord {
    fn from(r: IndexRecord) -> Self {
        ChunkFileRecord {
            coord: IVec3::new(r.cx, r.cy, r.cz),
            flags: ChunkFlags::from_bits(r.flags),
            offset: r.offset,
            size: r.size,
        }
    }
}

/// Serialize a full index. Records are written in the given order.
pub fn encode_index(records: &[ChunkFileRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(INDEX_HEADER_SIZE + records.len() * INDEX_RECORD_SIZE);
    let header = IndexHeader {
        version: INDEX_VERSION,
        count: records.len() as i32,
    };
    out.extend_from_slice(bytemuck::bytes_of(&header.to_le()));
    for record in records {
        let raw = IndexRecord::from(*record).to_le();
        out.extend_from_slice(bytemuck::bytes_of(&raw));
    }
    out
}

/// Parse an index and check every record against the data file length.
pub fn decode_index(bytes: &[u8], data_len: u64) -> Result<Vec<ChunkFileRecord>, FormatError> {
    if bytes.len() < INDEX_HEADER_SIZE {
        return Err(FormatError::IndexTooSmall(bytes.len(), INDEX_HEADER_SIZE));
    }
    let header =
        bytemuck::pod_read_unaligned::<IndexHeader>(&bytes[..INDEX_HEADER_SIZE]).to_native();
    if header.version != INDEX_VERSION {
        return Err(FormatError::UnsupportedVersion(header.version));
    }
    if header.count < 0 {
        return Err(FormatError::NegativeCount(header.count));
    }
    let expected = INDEX_HEADER_SIZE + header.count as usize * INDEX_RECORD_SIZE;
    if bytes.len() != expected {
        return Err(FormatError::IndexSizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }

    let mut records = Vec::with_capacity(header.count as usize);
    for raw in bytes[INDEX_HEADER_SIZE..].chunks_exact(INDEX_RECORD_SIZE) {
        let record = ChunkFileRecord::from(bytemuck::pod_read_unaligned::<IndexRecord>(raw).to_native());
        if record.end() > data_len {
            return Err(FormatError::RecordOutOfBounds {
                coord: record.coord,
                end: record.end(),
                data_len,
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Per-layer mesh counts stored alongside the voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshLayerInfo {
    pub vertex_count: i32,
    pub submesh_count: i32,
}

pub type MeshMetadata = [MeshLayerInfo; MESH_LAYER_COUNT];

/// The persisted form of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    pub flags: ChunkFlags,
    pub voxels: Box<[Voxel]>,
    pub mesh: MeshMetadata,
    /// Opaque mesh bytes owned by the renderer.
    pub payload: Vec<u8>,
}

impl ChunkData {
    pub fn all_air(flags: ChunkFlags) -> Self {
        Self {
            flags,
            voxels: vec![Voxel::AIR; VOXEL_BLOCK_SIZE].into_boxed_slice(),
            mesh: [MeshLayerInfo::default(); MESH_LAYER_COUNT],
            payload: Vec::new(),
        }
    }

    /// Voxels and flags of a buffer, with no mesh data.
    pub fn from_buffer(buffer: &ChunkBuffer) -> Self {
        Self {
            flags: buffer.flags(),
            voxels: buffer.voxels().into(),
            mesh: [MeshLayerInfo::default(); MESH_LAYER_COUNT],
            payload: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: MeshMetadata, payload: Vec<u8>) -> Self {
        self.mesh = mesh;
        self.payload = payload;
        self
    }

    /// Load into `buffer` as chunk `coord`.
    ///
    /// Decorations are not persisted, so the buffer's list is empty and its
    /// `DECORATIONS` flag is cleared to match. The stored flags keep it.
    pub fn copy_into(&self, coord: ChunkCoord, buffer: &mut ChunkBuffer) {
        buffer.reset(coord);
        buffer.voxels_mut().copy_from_slice(&self.voxels);
        let mut flags = self.flags;
        flags.remove(ChunkFlags::DECORATIONS);
        buffer.set_flags(flags);
    }

    pub fn encoded_len(&self) -> usize {
        MIN_BLOCK_SIZE + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(bytemuck::cast_slice(&self.voxels));
        for layer in &self.mesh {
            out.extend_from_slice(&layer.vertex_count.to_le_bytes());
            out.extend_from_slice(&layer.submesh_count.to_le_bytes());
        }
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode a data block. Every voxel byte is validated.
    pub fn decode(bytes: &[u8], flags: ChunkFlags) -> Result<Self, FormatError> {
        if bytes.len() < MIN_BLOCK_SIZE {
            return Err(FormatError::TruncatedBlock {
                expected: MIN_BLOCK_SIZE,
                actual: bytes.len(),
            });
        }
        let voxels = bytes[..VOXEL_BLOCK_SIZE]
            .iter()
            .map(|&raw| Voxel::from_raw(raw))
            .collect::<Result<Box<[Voxel]>, CoreError>>()?;

        let mut mesh = [MeshLayerInfo::default(); MESH_LAYER_COUNT];
        let meta = &bytes[VOXEL_BLOCK_SIZE..MIN_BLOCK_SIZE];
        for (layer, raw) in mesh.iter_mut().zip(meta.chunks_exact(8)) {
            layer.vertex_count = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            layer.submesh_count = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        }

        Ok(Self {
            flags,
            voxels,
            mesh,
            payload: bytes[MIN_BLOCK_SIZE..].to_vec(),
        })
    }
}
