use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::wire::WireWrite;
use super::{write_header, ChunkRecord, DirectoryRecord, FileContent, FileRecord, Metadata};
use crate::chunker::ChunkBounds;
use crate::common::{canonical_target, split_parent, Modes};
use crate::compress::{self, CompressSettings};
use crate::error::{CdcFsError, Result};
use crate::options::WriterOptions;
use crate::solid::SolidBlockPacker;
use crate::store::ChunkStore;

/// Result of [`Writer::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    /// Bytes written to the output, header to last payload byte.
    pub total_length: u64,
    /// `100 - compressed / raw * 100`, 0 when compression is off.
    pub compression_ratio_percent: i32,
    pub chunk_count: usize,
    pub solid_block_count: usize,
}

/// Mutable builder for a container.
///
/// Files are chunked and deduplicated as they are added; compression and
/// serialization happen in [`Writer::build`]. Additions must not be made
/// concurrently.
pub struct Writer {
    options: WriterOptions,
    bounds: ChunkBounds,
    directories: Vec<DirectoryRecord>,
    directory_ids: HashMap<String, u32>,
    files: Vec<FileRecord>,
    file_paths: HashSet<String>,
    store: ChunkStore,
    packer: SolidBlockPacker,
}

impl Writer {
    /// Creates a new `Writer`. Options are validated here, before any I/O.
    pub fn new(options: WriterOptions) -> Result<Self> {
        let bounds = options.validate()?;
        debug!("writer options: {}", options);
        Ok(Self {
            packer: SolidBlockPacker::new(options.solid_block_size),
            options,
            bounds,
            directories: Vec::new(),
            directory_ids: HashMap::new(),
            files: Vec::new(),
            file_paths: HashSet::new(),
            store: ChunkStore::new(),
        })
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Unique chunks discovered so far.
    pub fn chunk_count(&self) -> usize {
        self.store.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Add `data` under `target`. Adding the same path twice is an error.
    pub fn add_file(&mut self, data: &[u8], target: &str) -> Result<()> {
        let path = canonical_target(target)?;
        let (parent, name) = split_parent(&path);
        if name.is_empty() {
            return Err(CdcFsError::InvalidPath(target.to_string()));
        }
        if self.file_paths.contains(&path) {
            return Err(CdcFsError::DuplicatePath(path));
        }
        let length = u32::try_from(data.len()).map_err(|_| {
            CdcFsError::InvalidOptions(format!("'{}' is larger than 4 GiB", path))
        })?;

        let directory_id = self.get_or_create_directory(parent);
        let content = if data.is_empty() {
            FileContent::Chunks(Vec::new())
        } else if length < self.options.small_file_threshold {
            let slot = self.packer.push(data, &mut self.store, self.bounds);
            FileContent::Solid { block_id: slot.block_id, offset: slot.offset }
        } else {
            FileContent::Chunks(self.store.ingest(data, self.bounds))
        };

        debug!(path = %path, length, content = ?content, "added file");
        self.files.push(FileRecord { directory_id, name: name.to_string(), length, content });
        self.file_paths.insert(path);
        Ok(())
    }

    /// Read a file from disk and add it under `target`.
    pub fn add_file_from_path(&mut self, source: impl AsRef<Path>, target: &str) -> Result<()> {
        let source = source.as_ref();
        let data = fs::read(source).map_err(|e| CdcFsError::io_at(e, source))?;
        self.add_file(&data, target)
    }

    /// Add every file below `source`. Archive paths are relative to `source`,
    /// prefixed with `target_root` unless it is empty or `"."`.
    pub fn add_directory(&mut self, source: impl AsRef<Path>, recursive: bool, target_root: Option<&str>) -> Result<()> {
        let source = source.as_ref();
        if !source.is_dir() {
            return Err(CdcFsError::io_at(
                io::Error::new(io::ErrorKind::NotFound, "directory not found"),
                source,
            ));
        }

        let root = target_root.map(|r| r.trim_end_matches('/')).filter(|r| !r.is_empty() && *r != ".");
        let walker = WalkDir::new(source)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                let io = e.into_io_error().unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed"));
                CdcFsError::io_at(io, path)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|_| CdcFsError::InvalidPath(entry.path().display().to_string()))?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let target = match root {
                Some(root) => format!("{}/{}", root, relative),
                None => relative,
            };

            self.add_file_from_path(entry.path(), &target)?;
        }
        Ok(())
    }

    fn get_or_create_directory(&mut self, path: &str) -> u32 {
        if path.is_empty() {
            return 0;
        }
        if let Some(&id) = self.directory_ids.get(path) {
            return id;
        }

        let (parent, name) = split_parent(path);
        let parent_id = self.get_or_create_directory(parent);
        self.directories.push(DirectoryRecord { parent_id, name: name.to_string() });
        let id = self.directories.len() as u32;
        self.directory_ids.insert(path.to_string(), id);
        id
    }

    /// Serialize the container. Any open solid block is closed first.
    pub fn build<W: Write>(&mut self, out: W) -> Result<BuildSummary> {
        self.packer.finish(&mut self.store, self.bounds);

        let modes = Modes::new(self.options.no_zstd, self.options.no_hash);
        let prepared = compress::prepare_chunks(
            self.store.chunks(),
            CompressSettings {
                compress: modes.compressed(),
                hash: modes.hashed(),
                level: self.options.compression_level,
                dict_size: self.options.compression_dict_size as usize,
                threads: self.options.threads,
            },
        )?;

        let chunks = self
            .store
            .chunks()
            .iter()
            .zip(&prepared.payloads)
            .map(|(chunk, payload)| ChunkRecord {
                length: chunk.data.len() as u32,
                compressed_length: payload.compressed.as_ref().map(|c| c.len() as u32),
                hash: payload.hash,
            })
            .collect();

        let meta = Metadata {
            directories: self.directories.clone(),
            files: self.files.clone(),
            solid_blocks: self.packer.blocks().iter().map(|b| b.chunk_ids.clone()).collect(),
            dictionary: prepared.dictionary,
            chunks,
        };

        let mut raw = Vec::new();
        meta.write_to(&mut raw, modes)?;
        let blob = if modes.compressed() {
            zstd::bulk::compress(&raw, self.options.compression_level)?
        } else {
            raw
        };
        let blob_len = u32::try_from(blob.len()).map_err(|_| {
            CdcFsError::InvalidOptions("metadata exceeds 4 GiB and cannot be written as a 4-byte length".into())
        })?;

        let mut header = Vec::new();
        write_header(&mut header, modes)?;

        let mut w = BufWriter::new(out);
        w.write_all(&header)?;
        w.put_u32(blob_len)?;
        w.write_all(&blob)?;
        let mut total_length = header.len() as u64 + 4 + blob.len() as u64;

        if modes.hashed() {
            w.put_u64(compress::integrity_hash(&blob))?;
            total_length += 8;
        }

        for (chunk, payload) in self.store.chunks().iter().zip(&prepared.payloads) {
            let stored = payload.compressed.as_deref().unwrap_or(&chunk.data);
            w.write_all(stored)?;
            total_length += stored.len() as u64;
        }
        w.flush()?;

        let summary = BuildSummary {
            total_length,
            compression_ratio_percent: prepared.compression_ratio_percent,
            chunk_count: self.store.len(),
            solid_block_count: self.packer.blocks().len(),
        };
        info!(
            files = self.files.len(),
            directories = self.directories.len(),
            chunks = summary.chunk_count,
            solid_blocks = summary.solid_block_count,
            bytes = summary.total_length,
            ratio = summary.compression_ratio_percent,
            "container built"
        );
        Ok(summary)
    }

    /// Build into a file, replacing anything already at `path`.
    pub fn build_to_path(&mut self, path: impl AsRef<Path>) -> Result<BuildSummary> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CdcFsError::io_at(e, path))?;
        self.build(file)
    }
}
