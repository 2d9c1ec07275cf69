//! Random access to single chunks of the payload blob.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use tracing::warn;

use crate::archive::wire::WireRead;
use crate::archive::ChunkRecord;
use crate::compress::integrity_hash;
use crate::error::{CdcFsError, Result};

/// Location and size of one chunk inside the payload blob.
#[derive(Debug, Clone, Copy)]
pub struct ChunkInfo {
    /// Offset relative to the start of the payload blob.
    pub offset: u64,
    pub record: ChunkRecord,
}

impl ChunkInfo {
    pub fn length(&self) -> usize {
        self.record.length as usize
    }
}

/// Decodes chunks from the shared stream and verifies each one the first time it is read.
///
/// Uses interior mutability for the stream, the decoder and the verified set, so it is
/// not `Sync`: one reader per thread.
pub struct ChunkReader<R> {
    stream: RefCell<R>,
    data_offset: u64,
    chunks: Vec<ChunkInfo>,
    dictionary: Option<Vec<u8>>,
    compressed: bool,
    hashed: bool,
    decoder: RefCell<Option<zstd::bulk::Decompressor<'static>>>,
    verified: RefCell<HashSet<u32>>,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(
        stream: R,
        data_offset: u64,
        records: &[ChunkRecord],
        dictionary: Option<Vec<u8>>,
        compressed: bool,
        hashed: bool,
    ) -> Self {
        let mut offset = 0u64;
        let chunks = records
            .iter()
            .map(|record| {
                let info = ChunkInfo { offset, record: *record };
                offset += record.stored_length() as u64;
                info
            })
            .collect();

        Self {
            stream: RefCell::new(stream),
            data_offset,
            chunks,
            dictionary,
            compressed,
            hashed,
            decoder: RefCell::new(None),
            verified: RefCell::new(HashSet::new()),
        }
    }

    pub fn info(&self, id: u32) -> Result<ChunkInfo> {
        self.chunks
            .get(id as usize)
            .copied()
            .ok_or_else(|| CdcFsError::InvalidFormat(format!("unknown chunk {}", id)))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dictionary(&self) -> Option<&[u8]> {
        self.dictionary.as_deref()
    }

    pub fn is_verified(&self, id: u32) -> bool {
        self.verified.borrow().contains(&id)
    }

    /// Decode chunk `id` into a new buffer.
    pub fn read_chunk(&self, id: u32) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.info(id)?.length()];
        self.read_chunk_into(id, &mut data)?;
        Ok(data)
    }

    /// Decode chunk `id` into `dest`, which must be exactly the chunk's length.
    pub fn read_chunk_into(&self, id: u32, dest: &mut [u8]) -> Result<()> {
        let info = self.info(id)?;
        if dest.len() != info.length() {
            return Err(CdcFsError::InvalidOptions(format!(
                "buffer of {} bytes for chunk {} of {} bytes",
                dest.len(),
                id,
                info.length()
            )));
        }

        {
            let mut stream = self.stream.borrow_mut();
            stream.seek(SeekFrom::Start(self.data_offset + info.offset))?;

            if self.compressed {
                let frame = stream.get_bytes(info.record.stored_length() as usize)?;
                drop(stream);
                self.decompress(id, &frame, dest)?;
            } else {
                stream.read_exact(dest)?;
            }
        }

        if self.hashed && !self.is_verified(id) {
            let expected = info.record.hash.unwrap_or_default();
            if integrity_hash(dest) != expected {
                warn!(chunk = id, "chunk hash mismatch");
                return Err(CdcFsError::CorruptedChunk { chunk_id: id });
            }
            self.verified.borrow_mut().insert(id);
        }
        Ok(())
    }

    fn decompress(&self, id: u32, frame: &[u8], dest: &mut [u8]) -> Result<()> {
        let mut decoder = self.decoder.borrow_mut();
        if decoder.is_none() {
            *decoder = Some(match &self.dictionary {
                Some(dict) => zstd::bulk::Decompressor::with_dictionary(dict)?,
                None => zstd::bulk::Decompressor::new()?,
            });
        }
        let Some(decoder) = decoder.as_mut() else {
            return Err(CdcFsError::InvalidFormat("decoder unavailable".into()));
        };

        match decoder.decompress_to_buffer(frame, dest) {
            Ok(n) if n == dest.len() => Ok(()),
            Ok(n) => {
                warn!(chunk = id, expected = dest.len(), got = n, "chunk decoded to the wrong length");
                Err(CdcFsError::CorruptedChunk { chunk_id: id })
            }
            Err(e) => {
                warn!(chunk = id, "chunk failed to decode: {}", e);
                Err(CdcFsError::CorruptedChunk { chunk_id: id })
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }
}
