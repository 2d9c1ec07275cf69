//! # Container Format
//!
//! A container is one seekable stream laid out as follows (integers little-endian,
//! strings prefixed with their byte length as a 7-bit varint):
//!
//! ```text
//! magic      string "FastCdcFs"
//! version    u8
//! modes      u8        bit0 = no zstd, bit1 = no hash
//! metaLength u32
//! metaBlob   [metaLength]   zstd frame unless no zstd
//! metaHash   u64       xxHash64 of metaBlob, only when hashed
//! payload    stored chunk bytes in chunk-id order
//! ```
//!
//! The decoded metadata holds the directory, file, solid-block and chunk tables
//! (see [`Metadata`]). Chunk payload offsets are not stored; they are the running
//! sum of the stored chunk lengths.

pub mod wire;
pub mod writer;

use std::io::{Read, Write};

use crate::common::{is_valid_name, Modes, FORMAT_VERSION, MAGIC};
use crate::error::{CdcFsError, Result};
use wire::{WireRead, WireWrite};

pub use writer::{BuildSummary, Writer};

/// A directory other than the root. Its id is its table index plus one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub parent_id: u32,
    pub name: String,
}

/// How a file's bytes are found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Ordered chunk ids; empty for a zero-length file.
    Chunks(Vec<u32>),
    /// A slice of a solid block starting at `offset`.
    Solid { block_id: u32, offset: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub directory_id: u32,
    pub name: String,
    pub length: u32,
    pub content: FileContent,
}

/// One row of the chunk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Uncompressed length.
    pub length: u32,
    /// Present iff the container is compressed.
    pub compressed_length: Option<u32>,
    /// Present iff the container is hashed.
    pub hash: Option<u64>,
}

impl ChunkRecord {
    /// Bytes this chunk occupies in the payload blob.
    pub fn stored_length(&self) -> u32 {
        self.compressed_length.unwrap_or(self.length)
    }
}

/// Everything inside the metadata blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub directories: Vec<DirectoryRecord>,
    pub files: Vec<FileRecord>,
    /// Chunk ids of each solid block, indexed by block id.
    pub solid_blocks: Vec<Vec<u32>>,
    pub dictionary: Option<Vec<u8>>,
    pub chunks: Vec<ChunkRecord>,
}

fn put_len<W: Write + ?Sized>(w: &mut W, len: usize, what: &str) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| CdcFsError::InvalidOptions(format!("too many {} for a 4-byte count", what)))?;
    w.put_u32(len)?;
    Ok(())
}

fn put_ids<W: Write + ?Sized>(w: &mut W, ids: &[u32]) -> Result<()> {
    put_len(w, ids.len(), "chunk ids")?;
    for id in ids {
        w.put_u32(*id)?;
    }
    Ok(())
}

fn get_ids<R: Read + ?Sized>(r: &mut R) -> Result<Vec<u32>> {
    let count = r.get_u32()?;
    // Each id is 4 bytes, so a lying count fails on read instead of allocating.
    let mut ids = Vec::with_capacity(count.min(1 << 16) as usize);
    for _ in 0..count {
        ids.push(r.get_u32()?);
    }
    Ok(ids)
}

impl Metadata {
    /// Serialize the tables in container order for the given modes.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W, modes: Modes) -> Result<()> {
        put_len(w, self.directories.len(), "directories")?;
        for dir in &self.directories {
            w.put_u32(dir.parent_id)?;
            w.put_string(&dir.name)?;
        }

        put_len(w, self.files.len(), "files")?;
        for file in &self.files {
            w.put_u32(file.directory_id)?;
            w.put_string(&file.name)?;
            w.put_u32(file.length)?;
            match &file.content {
                FileContent::Chunks(ids) => put_ids(w, ids)?,
                FileContent::Solid { block_id, offset } => {
                    w.put_u32(0)?; // zero chunks marks a packed file
                    w.put_u32(*block_id)?;
                    w.put_u32(*offset)?;
                }
            }
        }

        put_len(w, self.solid_blocks.len(), "solid blocks")?;
        for block in &self.solid_blocks {
            put_ids(w, block)?;
        }

        if modes.compressed() {
            match &self.dictionary {
                Some(dict) => {
                    put_len(w, dict.len(), "dictionary bytes")?;
                    w.write_all(dict)?;
                }
                None => w.put_u32(0)?,
            }
        }

        put_len(w, self.chunks.len(), "chunks")?;
        for chunk in &self.chunks {
            w.put_u32(chunk.length)?;
            if modes.compressed() {
                w.put_u32(chunk.compressed_length.unwrap_or(chunk.length))?;
            }
            if modes.hashed() {
                w.put_u64(chunk.hash.unwrap_or_default())?;
            }
        }
        Ok(())
    }

    /// Parse the tables and check that every id they contain resolves.
    pub fn read_from<R: Read + ?Sized>(r: &mut R, modes: Modes) -> Result<Self> {
        let dir_count = r.get_u32()?;
        let mut directories = Vec::with_capacity(dir_count.min(1 << 16) as usize);
        for i in 0..dir_count {
            let parent_id = r.get_u32()?;
            let name = get_name(r)?;
            // Parents are always created before their children.
            if parent_id > i {
                return Err(CdcFsError::InvalidFormat(format!(
                    "directory {} refers to unknown parent {}",
                    i + 1,
                    parent_id
                )));
            }
            directories.push(DirectoryRecord { parent_id, name });
        }

        let file_count = r.get_u32()?;
        let mut files = Vec::with_capacity(file_count.min(1 << 16) as usize);
        for _ in 0..file_count {
            let directory_id = r.get_u32()?;
            let name = get_name(r)?;
            let length = r.get_u32()?;
            let ids = get_ids(r)?;
            let content = if ids.is_empty() && length > 0 {
                let block_id = r.get_u32()?;
                let offset = r.get_u32()?;
                FileContent::Solid { block_id, offset }
            } else {
                FileContent::Chunks(ids)
            };
            if directory_id > dir_count {
                return Err(CdcFsError::InvalidFormat(format!(
                    "file '{}' refers to unknown directory {}",
                    name, directory_id
                )));
            }
            files.push(FileRecord { directory_id, name, length, content });
        }

        let block_count = r.get_u32()?;
        let mut solid_blocks = Vec::with_capacity(block_count.min(1 << 16) as usize);
        for _ in 0..block_count {
            solid_blocks.push(get_ids(r)?);
        }

        let dictionary = if modes.compressed() {
            let len = r.get_u32()? as usize;
            if len > 0 {
                Some(r.get_bytes(len)?)
            } else {
                None
            }
        } else {
            None
        };

        let chunk_count = r.get_u32()?;
        let mut chunks = Vec::with_capacity(chunk_count.min(1 << 16) as usize);
        for _ in 0..chunk_count {
            let length = r.get_u32()?;
            let compressed_length = if modes.compressed() { Some(r.get_u32()?) } else { None };
            let hash = if modes.hashed() { Some(r.get_u64()?) } else { None };
            chunks.push(ChunkRecord { length, compressed_length, hash });
        }

        let meta = Metadata { directories, files, solid_blocks, dictionary, chunks };
        meta.check_references()?;
        Ok(meta)
    }

    fn check_references(&self) -> Result<()> {
        let chunk_count = self.chunks.len();
        let bad_chunk = |id: &u32| *id as usize >= chunk_count;

        for block in &self.solid_blocks {
            if block.iter().any(bad_chunk) {
                return Err(CdcFsError::InvalidFormat("solid block refers to unknown chunk".into()));
            }
        }

        for file in &self.files {
            match &file.content {
                FileContent::Chunks(ids) => {
                    if ids.iter().any(bad_chunk) {
                        return Err(CdcFsError::InvalidFormat(format!(
                            "file '{}' refers to unknown chunk",
                            file.name
                        )));
                    }
                    let total: u64 = ids.iter().map(|id| self.chunks[*id as usize].length as u64).sum();
                    if total != file.length as u64 {
                        return Err(CdcFsError::InvalidFormat(format!(
                            "file '{}' is {} bytes but its chunks hold {}",
                            file.name, file.length, total
                        )));
                    }
                }
                FileContent::Solid { block_id, offset } => {
                    let block = self.solid_blocks.get(*block_id as usize).ok_or_else(|| {
                        CdcFsError::InvalidFormat(format!("file '{}' refers to unknown solid block", file.name))
                    })?;
                    let block_len: u64 = block.iter().map(|id| self.chunks[*id as usize].length as u64).sum();
                    if *offset as u64 + file.length as u64 > block_len {
                        return Err(CdcFsError::InvalidFormat(format!(
                            "file '{}' extends past the end of solid block {}",
                            file.name, block_id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Write magic, version and mode byte.
pub fn write_header<W: Write + ?Sized>(w: &mut W, modes: Modes) -> Result<()> {
    w.put_string(MAGIC)?;
    w.put_u8(FORMAT_VERSION)?;
    w.put_u8(modes.bits())?;
    Ok(())
}

/// An entry name must be one plain path segment.
fn get_name<R: Read + ?Sized>(r: &mut R) -> Result<String> {
    let name = r.get_string()?;
    if !is_valid_name(&name) {
        return Err(CdcFsError::InvalidFormat(format!("invalid entry name {:?}", name)));
    }
    Ok(name)
}

/// Read and validate magic and version, returning the version and modes.
pub fn read_header<R: Read + ?Sized>(r: &mut R) -> Result<(u8, Modes)> {
    let magic = r
        .get_string()
        .map_err(|_| CdcFsError::InvalidFormat("not a FastCdcFs container".into()))?;
    if magic != MAGIC {
        return Err(CdcFsError::InvalidFormat("not a FastCdcFs container".into()));
    }

    let version = r.get_u8()?;
    if version != FORMAT_VERSION {
        return Err(CdcFsError::UnsupportedVersion(version));
    }

    let modes = Modes::from_bits(r.get_u8()?)?;
    Ok((version, modes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_metadata() -> Metadata {
        Metadata {
            directories: vec![
                DirectoryRecord { parent_id: 0, name: "dirA".into() },
                DirectoryRecord { parent_id: 1, name: "sub".into() },
            ],
            files: vec![
                FileRecord { directory_id: 0, name: "fileA".into(), length: 30, content: FileContent::Chunks(vec![0, 1]) },
                FileRecord { directory_id: 2, name: "empty".into(), length: 0, content: FileContent::Chunks(vec![]) },
                FileRecord {
                    directory_id: 1,
                    name: "small".into(),
                    length: 5,
                    content: FileContent::Solid { block_id: 0, offset: 3 },
                },
            ],
            solid_blocks: vec![vec![1]],
            dictionary: Some(vec![1, 2, 3]),
            chunks: vec![
                ChunkRecord { length: 20, compressed_length: Some(9), hash: Some(11) },
                ChunkRecord { length: 10, compressed_length: Some(4), hash: Some(12) },
            ],
        }
    }

    #[test]
    fn metadata_survives_all_modes() {
        for (no_zstd, no_hash) in [(false, false), (true, false), (false, true), (true, true)] {
            let modes = Modes::new(no_zstd, no_hash);
            let mut expected = sample_metadata();
            if no_zstd {
                expected.dictionary = None;
            }
            for c in &mut expected.chunks {
                if no_zstd {
                    c.compressed_length = None;
                }
                if no_hash {
                    c.hash = None;
                }
            }

            let mut buf = Vec::new();
            expected.write_to(&mut buf, modes).unwrap();
            let decoded = Metadata::read_from(&mut Cursor::new(buf), modes).unwrap();
            assert_eq!(decoded, expected);
        }
    }

    #[test]
    fn packed_file_is_marked_by_zero_chunks() {
        let meta = Metadata {
            files: vec![FileRecord {
                directory_id: 0,
                name: "f".into(),
                length: 4,
                content: FileContent::Solid { block_id: 7, offset: 9 },
            }],
            ..Default::default()
        };
        let mut buf = Vec::new();
        meta.write_to(&mut buf, Modes::new(true, true)).unwrap();
        // dirs=0, files=1, dirId, name, length, chunkCount=0, block, offset
        let tail = &buf[4 + 4 + 4 + 2 + 4..];
        assert_eq!(&tail[..12], &[0, 0, 0, 0, 7, 0, 0, 0, 9, 0, 0, 0]);
    }

    #[test]
    fn dangling_references_are_rejected() {
        let mut meta = sample_metadata();
        meta.files[0].content = FileContent::Chunks(vec![0, 5]);
        let mut buf = Vec::new();
        meta.write_to(&mut buf, Modes::NONE).unwrap();
        let err = Metadata::read_from(&mut Cursor::new(buf), Modes::NONE).unwrap_err();
        assert!(matches!(err, CdcFsError::InvalidFormat(_)));
    }

    #[test]
    fn escaping_names_are_rejected() {
        for bad in ["..", ".", "", "a/b", "..\\x"] {
            let mut meta = sample_metadata();
            meta.directories[1].name = bad.into();
            let mut buf = Vec::new();
            meta.write_to(&mut buf, Modes::NONE).unwrap();
            let err = Metadata::read_from(&mut Cursor::new(buf), Modes::NONE).unwrap_err();
            assert!(matches!(err, CdcFsError::InvalidFormat(_)), "{:?}", bad);

            let mut meta = sample_metadata();
            meta.files[0].name = bad.into();
            let mut buf = Vec::new();
            meta.write_to(&mut buf, Modes::NONE).unwrap();
            let err = Metadata::read_from(&mut Cursor::new(buf), Modes::NONE).unwrap_err();
            assert!(matches!(err, CdcFsError::InvalidFormat(_)), "{:?}", bad);
        }
    }

    #[test]
    fn header_checks_magic_and_version() {
        let mut buf = Vec::new();
        write_header(&mut buf, Modes::new(false, true)).unwrap();
        assert_eq!(&buf[..10], b"\x09FastCdcFs");
        let (version, modes) = read_header(&mut Cursor::new(buf.clone())).unwrap();
        assert_eq!(version, FORMAT_VERSION);
        assert!(modes.compressed() && !modes.hashed());

        buf[10] = 1;
        assert!(matches!(read_header(&mut Cursor::new(buf)), Err(CdcFsError::UnsupportedVersion(1))));

        let junk = b"\x09NotCdcFs!\x02\x00".to_vec();
        assert!(matches!(read_header(&mut Cursor::new(junk)), Err(CdcFsError::InvalidFormat(_))));

        let mut future = Vec::new();
        write_header(&mut future, Modes::NONE).unwrap();
        future[11] = 0x04;
        assert!(matches!(read_header(&mut Cursor::new(future)), Err(CdcFsError::InvalidFormat(_))));
    }
}
