//! Write-side content-addressable chunk registry.

use std::collections::HashMap;

use crate::chunker::{ChunkBounds, FastCdc};

/// A unique chunk discovered while adding files.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: u32,
    /// Offset of this chunk in the uncompressed concatenation of all chunks.
    pub offset: u64,
    pub data: Vec<u8>,
}

impl StoredChunk {
    pub fn next_offset(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

/// Deduplicating chunk table keyed by a BLAKE3 digest of the chunk bytes.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: Vec<StoredChunk>,
    index: HashMap<[u8; 32], u32>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of a chunk with exactly these bytes, registering it if new.
    pub fn get_or_create(&mut self, data: &[u8]) -> u32 {
        let strong_hash = *blake3::hash(data).as_bytes();
        if let Some(&id) = self.index.get(&strong_hash) {
            return id;
        }

        let id = self.chunks.len() as u32;
        let offset = self.chunks.last().map_or(0, StoredChunk::next_offset);
        self.chunks.push(StoredChunk { id, offset, data: data.to_vec() });
        self.index.insert(strong_hash, id);
        id
    }

    /// Chunk `data` with FastCDC and register every piece, returning the ordered ids.
    pub fn ingest(&mut self, data: &[u8], bounds: ChunkBounds) -> Vec<u32> {
        FastCdc::new(data, bounds)
            .map(|chunk| self.get_or_create(chunk.data(data)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&StoredChunk> {
        self.chunks.get(id as usize)
    }

    pub fn chunks(&self) -> &[StoredChunk] {
        &self.chunks
    }

    /// Sum of the uncompressed chunk lengths.
    pub fn total_len(&self) -> u64 {
        self.chunks.last().map_or(0, StoredChunk::next_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    #[test]
    fn identical_bytes_share_an_id() {
        let mut store = ChunkStore::new();
        let a = store.get_or_create(b"hello world");
        let b = store.get_or_create(b"another chunk");
        let c = store.get_or_create(b"hello world");
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, a);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn offsets_are_contiguous() {
        let mut store = ChunkStore::new();
        store.get_or_create(&[1u8; 10]);
        store.get_or_create(&[2u8; 25]);
        store.get_or_create(&[1u8; 10]);
        store.get_or_create(&[3u8; 5]);
        let offsets: Vec<_> = store.chunks().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 10, 35]);
        assert_eq!(store.total_len(), 40);
    }

    #[test]
    fn ingesting_twice_adds_no_chunks() {
        let mut data = vec![0u8; 200 * 1024];
        StdRng::seed_from_u64(3).fill_bytes(&mut data);
        let bounds = ChunkBounds::new(1024, 4096, 16384).unwrap();

        let mut store = ChunkStore::new();
        let first = store.ingest(&data, bounds);
        let count = store.len();
        let second = store.ingest(&data, bounds);

        assert_eq!(first, second);
        assert_eq!(store.len(), count);
        let rebuilt: Vec<u8> = first
            .iter()
            .flat_map(|id| store.get(*id).unwrap().data.clone())
            .collect();
        assert_eq!(rebuilt, data);
    }
}
