//! Small-file packing into shared solid blocks.

use tracing::debug;

use crate::chunker::ChunkBounds;
use crate::store::ChunkStore;

/// A packed buffer, chunked like a regular file once it is closed.
#[derive(Debug, Clone, Default)]
pub struct SolidBlock {
    pub id: u32,
    pub chunk_ids: Vec<u32>,
}

/// Where a packed file lives inside its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidBlockRef {
    pub block_id: u32,
    pub offset: u32,
}

/// Accumulates small files and hands full buffers to the [`ChunkStore`].
#[derive(Debug)]
pub struct SolidBlockPacker {
    block_size: usize,
    blocks: Vec<SolidBlock>,
    /// Bytes of the last block in `blocks` while it is still open.
    pending: Option<Vec<u8>>,
}

impl SolidBlockPacker {
    pub fn new(block_size: u32) -> Self {
        Self { block_size: block_size as usize, blocks: Vec::new(), pending: None }
    }

    /// Append a file's bytes, closing the open block first if they would not fit.
    pub fn push(&mut self, data: &[u8], store: &mut ChunkStore, bounds: ChunkBounds) -> SolidBlockRef {
        let fits = self
            .pending
            .as_ref()
            .is_some_and(|buf| buf.len() + data.len() <= self.block_size);

        if !fits {
            self.finish(store, bounds);
            self.blocks.push(SolidBlock { id: self.blocks.len() as u32, chunk_ids: Vec::new() });
            self.pending = Some(Vec::with_capacity(self.block_size.min(1 << 20)));
        }

        let block_id = self.blocks.len() as u32 - 1;
        let buf = self.pending.get_or_insert_with(Vec::new);
        let offset = buf.len() as u32;
        buf.extend_from_slice(data);
        SolidBlockRef { block_id, offset }
    }

    /// Chunk the open block, if any. Safe to call repeatedly.
    pub fn finish(&mut self, store: &mut ChunkStore, bounds: ChunkBounds) {
        let Some(buf) = self.pending.take() else { return };
        let Some(block) = self.blocks.last_mut() else { return };

        block.chunk_ids = store.ingest(&buf, bounds);
        debug!(block = block.id, bytes = buf.len(), chunks = block.chunk_ids.len(), "finalized solid block");
    }

    pub fn blocks(&self) -> &[SolidBlock] {
        &self.blocks
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
