//! # Content-Defined Chunking
//!
//! FastCDC (Xia et al., USENIX ATC 2016) over an in-memory byte buffer.
//!
//! A gear-style rolling hash is fed one byte at a time, `hash = (hash >> 1) + GEAR[byte]`,
//! and a chunk ends at the first position where `hash & mask == 0`. Two masks are derived
//! from `round(log2(avg))`:
//!
//! - **`mask_s`** has one bit more than the average and is used up to the *center size*,
//!   which makes early cuts less likely.
//! - **`mask_l`** has one bit less and is used from the center size up to `max`,
//!   which pulls late chunks back toward the average.
//!
//! The output only depends on the bytes and the three bounds, so identical runs of
//! data (even inside unrelated files) produce identical chunks and can be deduplicated.

mod table;

use crate::error::{CdcFsError, Result};
use table::GEAR;

/// Smallest acceptable value for the minimum chunk size.
pub const MINIMUM_MIN: u32 = 64;
/// Largest acceptable value for the minimum chunk size.
pub const MINIMUM_MAX: u32 = 67_108_864;
/// Smallest acceptable value for the average chunk size.
pub const AVERAGE_MIN: u32 = 256;
/// Largest acceptable value for the average chunk size.
pub const AVERAGE_MAX: u32 = 268_435_456;
/// Smallest acceptable value for the maximum chunk size.
pub const MAXIMUM_MIN: u32 = 1024;
/// Largest acceptable value for the maximum chunk size.
pub const MAXIMUM_MAX: u32 = 1_073_741_824;

/// Validated `(min, avg, max)` chunk size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    min: u32,
    avg: u32,
    max: u32,
}

impl ChunkBounds {
    pub fn new(min: u32, avg: u32, max: u32) -> Result<Self> {
        if min == 0 || avg == 0 || max == 0 {
            return Err(CdcFsError::InvalidChunkSizes("chunk sizes must be greater than zero".into()));
        }
        if !(MINIMUM_MIN..=MINIMUM_MAX).contains(&min) {
            return Err(CdcFsError::InvalidChunkSizes(format!(
                "minimum chunk size {} must be between {} and {}",
                min, MINIMUM_MIN, MINIMUM_MAX
            )));
        }
        if !(AVERAGE_MIN..=AVERAGE_MAX).contains(&avg) {
            return Err(CdcFsError::InvalidChunkSizes(format!(
                "average chunk size {} must be between {} and {}",
                avg, AVERAGE_MIN, AVERAGE_MAX
            )));
        }
        if !(MAXIMUM_MIN..=MAXIMUM_MAX).contains(&max) {
            return Err(CdcFsError::InvalidChunkSizes(format!(
                "maximum chunk size {} must be between {} and {}",
                max, MAXIMUM_MIN, MAXIMUM_MAX
            )));
        }
        if min > avg {
            return Err(CdcFsError::InvalidChunkSizes(
                "minimum chunk size must not be greater than average chunk size".into(),
            ));
        }
        if avg > max {
            return Err(CdcFsError::InvalidChunkSizes(
                "average chunk size must not be greater than maximum chunk size".into(),
            ));
        }
        Ok(Self { min, avg, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn avg(&self) -> u32 {
        self.avg
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

/// One cut produced by [`FastCdc`]: the rolling hash at the cut point and the
/// byte range of the chunk within the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub hash: u32,
    pub offset: usize,
    pub length: usize,
}

impl Chunk {
    pub fn data<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        &source[self.offset..self.offset + self.length]
    }
}

/// Lazy chunk iterator over one buffer. Consume it fully to cover the input.
pub struct FastCdc<'a> {
    source: &'a [u8],
    min: usize,
    avg: usize,
    max: usize,
    mask_s: u32,
    mask_l: u32,
    eof: bool,
    processed: usize,
    remaining: usize,
}

impl<'a> FastCdc<'a> {
    /// Chunk a complete buffer; the tail is always emitted.
    pub fn new(source: &'a [u8], bounds: ChunkBounds) -> Self {
        Self::with_eof(source, bounds, true)
    }

    /// When `eof` is false the buffer is treated as a prefix of a longer stream and
    /// a trailing piece that could still grow is left unconsumed.
    pub fn with_eof(source: &'a [u8], bounds: ChunkBounds, eof: bool) -> Self {
        let bits = logarithm2(bounds.avg);
        Self {
            source,
            min: bounds.min as usize,
            avg: bounds.avg as usize,
            max: bounds.max as usize,
            mask_s: mask(bits + 1),
            mask_l: mask(bits - 1),
            eof,
            processed: 0,
            remaining: source.len(),
        }
    }

    /// Bytes not yet covered by an emitted chunk.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn cut(&self, mut offset: usize, size: usize) -> (u32, usize) {
        if size <= self.min {
            return if self.eof { (0, size) } else { (0, 0) };
        }

        let size = size.min(self.max);
        let start = offset;
        let center_end = offset + center_size(self.avg, self.min, size);
        let end = offset + size;

        let mut hash = 0u32;
        offset += self.min;

        while offset < center_end {
            hash = (hash >> 1).wrapping_add(GEAR[self.source[offset] as usize]);
            offset += 1;
            if hash & self.mask_s == 0 {
                return (hash, offset - start);
            }
        }

        while offset < end {
            hash = (hash >> 1).wrapping_add(GEAR[self.source[offset] as usize]);
            offset += 1;
            if hash & self.mask_l == 0 {
                return (hash, offset - start);
            }
        }

        if !self.eof && size < self.max {
            (hash, 0)
        } else {
            (hash, size)
        }
    }
}

impl Iterator for FastCdc<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.remaining == 0 {
            return None;
        }

        let (hash, length) = self.cut(self.processed, self.remaining);
        if length == 0 {
            return None;
        }

        let offset = self.processed;
        self.processed += length;
        self.remaining -= length;
        Some(Chunk { hash, offset, length })
    }
}

/// End of the region scanned with the harder mask, relative to the chunk start.
pub fn center_size(avg: usize, min: usize, source_size: usize) -> usize {
    let offset = (min + min.div_ceil(2)).min(avg);
    let size = avg - offset;
    size.min(source_size)
}

fn logarithm2(value: u32) -> u32 {
    (value as f64).log2().round() as u32
}

fn mask(bits: u32) -> u32 {
    // Valid bounds keep bits in 7..=29.
    debug_assert!((1..=31).contains(&bits));
    (1u32 << bits) - 1
}
