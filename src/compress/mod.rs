//! # Compression Pipeline
//!
//! Turns the deduplicated chunk list into stored payloads just before the container is written.
//!
//! ## Key Features:
//! - **Dictionary Training**: One shared `zstd` dictionary is trained from a bounded sample of
//!   chunk payloads. Training must finish before any chunk is compressed.
//! - **Parallel Compression**: Every chunk is an independent zstd frame, so chunks are compressed
//!   on a `rayon` pool with no shared mutable state.
//! - **Integrity Hashing**: xxHash64 (seed 0) over each chunk's *uncompressed* bytes.

use std::io;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{CdcFsError, Result};
use crate::store::StoredChunk;

/// Total bytes handed to the dictionary trainer, regardless of chunk count.
pub const SAMPLE_BUDGET: usize = 32 * 1024 * 1024; // 32 MiB
/// Only a prefix of each chunk is sampled.
pub const SAMPLE_SIZE: usize = 128 * 1024; // 128 KiB
/// Below this many samples training is skipped.
pub const MIN_SAMPLES: usize = 8;

/// Settings for [`prepare_chunks`], derived from the writer options.
#[derive(Debug, Clone, Copy)]
pub struct CompressSettings {
    pub compress: bool,
    pub hash: bool,
    pub level: i32,
    pub dict_size: usize,
    pub threads: usize,
}

/// Stored form of one chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkPayload {
    /// zstd frame, `None` when compression is off.
    pub compressed: Option<Vec<u8>>,
    /// xxHash64 of the raw bytes, `None` when hashing is off.
    pub hash: Option<u64>,
}

/// Output of the compression stage.
#[derive(Debug, Default)]
pub struct PreparedChunks {
    pub dictionary: Option<Vec<u8>>,
    pub payloads: Vec<ChunkPayload>,
    pub compression_ratio_percent: i32,
}

/// Integrity hash stored for chunks and the metadata blob.
pub fn integrity_hash(data: &[u8]) -> u64 {
    xxhash_rust::xxh64::xxh64(data, 0)
}

/// Pick evenly spaced chunk prefixes until the sample budget is used.
fn collect_samples(chunks: &[StoredChunk]) -> Vec<&[u8]> {
    let total: usize = chunks.iter().map(|c| c.data.len().min(SAMPLE_SIZE)).sum();
    let stride = total.div_ceil(SAMPLE_BUDGET).max(1);

    let mut samples = Vec::new();
    let mut used = 0;
    for chunk in chunks.iter().step_by(stride) {
        let sample = &chunk.data[..chunk.data.len().min(SAMPLE_SIZE)];
        if sample.is_empty() {
            continue;
        }
        if used + sample.len() > SAMPLE_BUDGET {
            break;
        }
        used += sample.len();
        samples.push(sample);
    }
    samples
}

/// Train the shared dictionary. Any failure means "no dictionary", never an error.
pub fn train_dictionary(chunks: &[StoredChunk], dict_size: usize) -> Option<Vec<u8>> {
    let samples = collect_samples(chunks);
    if samples.len() < MIN_SAMPLES {
        debug!(samples = samples.len(), "too few samples, skipping dictionary training");
        return None;
    }

    match zstd::dict::from_samples(&samples, dict_size) {
        Ok(dict) if !dict.is_empty() => {
            debug!(size = dict.len(), samples = samples.len(), "trained dictionary");
            Some(dict)
        }
        Ok(_) => None,
        Err(e) => {
            warn!("Dictionary training failed, compressing without a dictionary: {}", e);
            None
        }
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let threads = if threads == 0 { num_cpus::get() } else { threads };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("cdcfs-compress-{}", i))
        .build()
        .map_err(|e| CdcFsError::from(io::Error::new(io::ErrorKind::Other, e.to_string())))
}

fn new_compressor(level: i32, dictionary: Option<&[u8]>) -> io::Result<zstd::bulk::Compressor<'static>> {
    match dictionary {
        Some(dict) => zstd::bulk::Compressor::with_dictionary(level, dict),
        None => zstd::bulk::Compressor::new(level),
    }
}

/// Train, compress and hash every chunk. Payloads come back in chunk-id order.
pub fn prepare_chunks(chunks: &[StoredChunk], settings: CompressSettings) -> Result<PreparedChunks> {
    let dictionary = if settings.compress && !chunks.is_empty() {
        train_dictionary(chunks, settings.dict_size)
    } else {
        None
    };

    let pool = build_pool(settings.threads)?;
    let dict_ref = dictionary.as_deref();

    let payloads: io::Result<Vec<ChunkPayload>> = pool.install(|| {
        chunks
            .par_iter()
            .map_init(
                || settings.compress.then(|| new_compressor(settings.level, dict_ref)),
                |compressor, chunk| {
                    let compressed = match compressor {
                        Some(Ok(c)) => Some(c.compress(&chunk.data)?),
                        Some(Err(e)) => return Err(io::Error::new(e.kind(), e.to_string())),
                        None => None,
                    };
                    let hash = settings.hash.then(|| integrity_hash(&chunk.data));
                    Ok(ChunkPayload { compressed, hash })
                },
            )
            .collect()
    });
    let payloads = payloads?;

    let compression_ratio_percent = if settings.compress {
        let raw: u64 = chunks.iter().map(|c| c.data.len() as u64).sum();
        let stored: u64 = payloads
            .iter()
            .map(|p| p.compressed.as_ref().map_or(0, |c| c.len() as u64))
            .sum();
        ratio_percent(raw, stored)
    } else {
        0
    };

    Ok(PreparedChunks { dictionary, payloads, compression_ratio_percent })
}

/// `100 - stored / raw * 100`, truncated. Zero when there is nothing to compare.
pub fn ratio_percent(raw: u64, stored: u64) -> i32 {
    if raw == 0 {
        return 0;
    }
    (100.0 - stored as f64 / raw as f64 * 100.0) as i32
}
