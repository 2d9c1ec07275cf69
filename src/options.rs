//! Writer configuration.

use std::fmt;

use crate::chunker::ChunkBounds;
use crate::error::{CdcFsError, Result};

pub const DEFAULT_FASTCDC_MIN: u32 = 32 * 1024;
pub const DEFAULT_FASTCDC_AVG: u32 = 64 * 1024;
pub const DEFAULT_FASTCDC_MAX: u32 = 256 * 1024;
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 22;
pub const DEFAULT_SOLID_BLOCK_SIZE: u32 = 16 * 1024 * 1024; // 16 MiB
pub const DEFAULT_DICT_SIZE: u32 = 1024 * 1024; // 1 MiB
/// zstd refuses to train anything smaller than this.
pub const MIN_DICT_SIZE: u32 = 256;

/// Holds all configuration options for building a container.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// Minimum chunk size for FastCDC.
    pub fastcdc_min: u32,
    /// Average (target) chunk size for FastCDC.
    pub fastcdc_avg: u32,
    /// Maximum chunk size for FastCDC.
    pub fastcdc_max: u32,
    /// Store chunks and metadata without zstd.
    pub no_zstd: bool,
    /// Skip the metadata hash and per-chunk integrity hashes.
    pub no_hash: bool,
    /// zstd level for chunks and metadata.
    pub compression_level: i32,
    /// Files strictly smaller than this are packed into solid blocks. 0 disables packing.
    pub small_file_threshold: u32,
    /// Capacity of one solid block.
    pub solid_block_size: u32,
    /// Upper bound for the trained zstd dictionary.
    pub compression_dict_size: u32,
    /// Compression worker threads. [0 = auto-detect based on CPU cores]
    pub threads: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            fastcdc_min: DEFAULT_FASTCDC_MIN,
            fastcdc_avg: DEFAULT_FASTCDC_AVG,
            fastcdc_max: DEFAULT_FASTCDC_MAX,
            no_zstd: false,
            no_hash: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            small_file_threshold: 0,
            solid_block_size: DEFAULT_SOLID_BLOCK_SIZE,
            compression_dict_size: DEFAULT_DICT_SIZE,
            threads: 0,
        }
    }
}

impl WriterOptions {
    pub fn with_chunk_sizes(mut self, min: u32, avg: u32, max: u32) -> Self {
        self.fastcdc_min = min;
        self.fastcdc_avg = avg;
        self.fastcdc_max = max;
        self
    }

    pub fn with_no_zstd(mut self, no_zstd: bool) -> Self {
        self.no_zstd = no_zstd;
        self
    }

    pub fn with_no_hash(mut self, no_hash: bool) -> Self {
        self.no_hash = no_hash;
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_small_file_handling(mut self, threshold: u32, solid_block_size: u32) -> Self {
        self.small_file_threshold = threshold;
        self.solid_block_size = solid_block_size;
        self
    }

    pub fn with_compression_dict_size(mut self, size: u32) -> Self {
        self.compression_dict_size = size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn chunk_bounds(&self) -> Result<ChunkBounds> {
        ChunkBounds::new(self.fastcdc_min, self.fastcdc_avg, self.fastcdc_max)
    }

    pub fn small_files_enabled(&self) -> bool {
        self.small_file_threshold > 0
    }

    /// Reject inconsistent settings before anything is read or written.
    pub fn validate(&self) -> Result<ChunkBounds> {
        let bounds = self.chunk_bounds()?;

        if !self.no_zstd {
            let range = zstd::compression_level_range();
            if !range.contains(&self.compression_level) {
                return Err(CdcFsError::InvalidOptions(format!(
                    "compression level {} is outside {}..={}",
                    self.compression_level,
                    range.start(),
                    range.end()
                )));
            }
            if self.compression_dict_size < MIN_DICT_SIZE {
                return Err(CdcFsError::InvalidOptions(format!(
                    "dictionary size must be at least {} bytes",
                    MIN_DICT_SIZE
                )));
            }
        }

        if self.small_files_enabled() {
            if self.solid_block_size == 0 {
                return Err(CdcFsError::InvalidOptions("solid block size must be greater than zero".into()));
            }
            if self.solid_block_size < self.small_file_threshold {
                return Err(CdcFsError::InvalidOptions(format!(
                    "solid block size {} is smaller than the small file threshold {}",
                    self.solid_block_size, self.small_file_threshold
                )));
            }
        }

        Ok(bounds)
    }
}

impl fmt::Display for WriterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FastCdcMin: {}, FastCdcAvg: {}, FastCdcMax: {}, NoZstd: {}, NoHash: {}, CompressionLevel: {}, \
             SmallFileThreshold: {}, SolidBlockSize: {}, CompressionDictSize: {}, Threads: {}",
            self.fastcdc_min,
            self.fastcdc_avg,
            self.fastcdc_max,
            self.no_zstd,
            self.no_hash,
            self.compression_level,
            self.small_file_threshold,
            self.solid_block_size,
            self.compression_dict_size,
            self.threads
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_are_valid() {
        let opts = WriterOptions::default();
        let bounds = opts.validate().unwrap();
        assert_eq!(bounds.avg(), 64 * 1024);
        assert!(!opts.small_files_enabled());
    }

    #[test]
    fn builder_sets_fields() {
        let opts = WriterOptions::default()
            .with_no_zstd(true)
            .with_no_hash(true)
            .with_compression_level(3)
            .with_chunk_sizes(1024, 4096, 16384)
            .with_small_file_handling(10 * 1024, 32 * 1024);
        assert!(opts.no_zstd && opts.no_hash);
        assert_eq!(opts.compression_level, 3);
        assert_eq!((opts.fastcdc_min, opts.fastcdc_avg, opts.fastcdc_max), (1024, 4096, 16384));
        assert_eq!((opts.small_file_threshold, opts.solid_block_size), (10 * 1024, 32 * 1024));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_bad_bounds_and_block_sizes() {
        let err = WriterOptions::default().with_chunk_sizes(4096, 1024, 16384).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);

        let err = WriterOptions::default().with_small_file_handling(10_000, 5_000).validate().unwrap_err();
        assert!(matches!(err, CdcFsError::InvalidOptions(_)));

        let err = WriterOptions::default().with_compression_level(1000).validate().unwrap_err();
        assert!(matches!(err, CdcFsError::InvalidOptions(_)));
    }

    #[test]
    fn level_is_ignored_without_zstd() {
        assert!(WriterOptions::default().with_no_zstd(true).with_compression_level(1000).validate().is_ok());
    }

    #[test]
    fn display_lists_every_option() {
        let text = WriterOptions::default().to_string();
        assert!(text.starts_with("FastCdcMin: 32768"));
        assert!(text.contains("SolidBlockSize: 16777216"));
    }
}
