use std::io::{self, Read, Seek};

use super::chunk_reader::ChunkReader;
use crate::error::{CdcFsError, Result};

/// A contiguous piece of one chunk that belongs to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub chunk_id: u32,
    pub skip: u32,
    pub take: u32,
}

/// Map the byte range `[offset, offset + length)` of a chunk sequence onto segments.
pub(crate) fn segments_for_range<R: Read + Seek>(
    chunks: &ChunkReader<R>,
    ids: &[u32],
    offset: u64,
    length: u64,
) -> Result<Vec<Segment>> {
    let end = offset + length;
    let mut segments = Vec::new();
    let mut chunk_start = 0u64;

    for id in ids {
        if chunk_start >= end {
            break;
        }
        let chunk_len = chunks.info(*id)?.length() as u64;
        let chunk_end = chunk_start + chunk_len;
        if chunk_end > offset {
            let skip = offset.saturating_sub(chunk_start);
            let take = chunk_end.min(end) - (chunk_start + skip);
            segments.push(Segment { chunk_id: *id, skip: skip as u32, take: take as u32 });
        }
        chunk_start = chunk_end;
    }

    let covered: u64 = segments.iter().map(|s| s.take as u64).sum();
    if covered != length {
        return Err(CdcFsError::InvalidFormat(format!(
            "range {}..{} is not covered by its chunks",
            offset, end
        )));
    }
    Ok(segments)
}

/// Forward-only reader over one file's bytes.
///
/// Whole chunks that fit in the caller's buffer are decoded straight into it; everything
/// else goes through an internal one-chunk buffer. Streams opened from the same
/// [`Reader`](super::Reader) share its underlying stream and must be used sequentially.
pub struct EntryStream<'a, R> {
    chunks: &'a ChunkReader<R>,
    segments: Vec<Segment>,
    next_segment: usize,
    buffer: Vec<u8>,
    buf_pos: usize,
    buf_end: usize,
    position: u64,
    length: u64,
}

impl<'a, R: Read + Seek> EntryStream<'a, R> {
    pub(crate) fn new(chunks: &'a ChunkReader<R>, segments: Vec<Segment>, length: u64) -> Self {
        Self { chunks, segments, next_segment: 0, buffer: Vec::new(), buf_pos: 0, buf_end: 0, position: 0, length }
    }

    /// Total length of the file.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Bytes returned so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn fill(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut total = 0;

        while total < out.len() {
            if self.buf_pos == self.buf_end {
                let Some(seg) = self.segments.get(self.next_segment).copied() else { break };
                self.next_segment += 1;

                let chunk_len = self.chunks.info(seg.chunk_id)?.length();
                let rest = &mut out[total..];
                if seg.skip == 0 && seg.take as usize == chunk_len && rest.len() >= chunk_len {
                    self.chunks.read_chunk_into(seg.chunk_id, &mut rest[..chunk_len])?;
                    total += chunk_len;
                    continue;
                }

                self.buffer.resize(chunk_len, 0);
                self.chunks.read_chunk_into(seg.chunk_id, &mut self.buffer)?;
                self.buf_pos = seg.skip as usize;
                self.buf_end = (seg.skip + seg.take) as usize;
            }

            let n = (out.len() - total).min(self.buf_end - self.buf_pos);
            out[total..total + n].copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + n]);
            self.buf_pos += n;
            total += n;
        }

        self.position += total as u64;
        Ok(total)
    }
}

impl<R: Read + Seek> Read for EntryStream<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill(buf).map_err(|e| match e {
            CdcFsError::Io { source, .. } => source,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ChunkRecord;
    use std::io::Cursor;

    fn reader(chunks: &[&[u8]]) -> ChunkReader<Cursor<Vec<u8>>> {
        let blob: Vec<u8> = chunks.concat();
        let records: Vec<_> = chunks
            .iter()
            .map(|c| ChunkRecord { length: c.len() as u32, compressed_length: None, hash: None })
            .collect();
        ChunkReader::new(Cursor::new(blob), 0, &records, None, false, false)
    }

    #[test]
    fn range_maps_to_partial_segments() {
        let r = reader(&[b"0123", b"4567", b"89"]);
        let segs = segments_for_range(&r, &[0, 1, 2], 3, 6).unwrap();
        assert_eq!(
            segs,
            vec![
                Segment { chunk_id: 0, skip: 3, take: 1 },
                Segment { chunk_id: 1, skip: 0, take: 4 },
                Segment { chunk_id: 2, skip: 0, take: 1 },
            ]
        );
        assert!(segments_for_range(&r, &[0, 1, 2], 8, 5).is_err());
    }

    #[test]
    fn small_reads_cross_chunk_boundaries() {
        let r = reader(&[b"hello ", b"chunked ", b"world"]);
        let segs = segments_for_range(&r, &[0, 1, 2], 0, 19).unwrap();
        let mut stream = EntryStream::new(&r, segs, 19);

        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"hello chunked world");
        assert_eq!(stream.position(), 19);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn large_read_spans_all_chunks() {
        let r = reader(&[b"abc", b"defg", b"hi"]);
        let segs = segments_for_range(&r, &[0, 1, 2], 1, 7).unwrap();
        let mut stream = EntryStream::new(&r, segs, 7);
        let mut buf = [0u8; 64];
        assert_eq!(stream.read(&mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], b"bcdefgh");
    }
}
