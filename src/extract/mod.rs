//! # Container Reader
//!
//! Parses a container once into an immutable index and serves files from it.
//!
//! ## Key Features:
//! - **Validation**: Magic and version are checked first; the metadata hash is verified before
//!   any offset inside the metadata is trusted.
//! - **Index**: Directories live in an id-indexed arena with their full path computed once;
//!   files are looked up by full path.
//! - **Lazy Reads**: [`EntryStream`] decodes one chunk at a time, verifying each chunk's hash the
//!   first time this reader touches it.

pub mod chunk_reader;
pub mod stream;

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::archive::wire::WireRead;
use crate::archive::{read_header, FileContent, Metadata};
use crate::common::{normalize, path_combine, Modes};
use crate::compress::integrity_hash;
use crate::error::{CdcFsError, Result};
use chunk_reader::ChunkReader;
use stream::{segments_for_range, Segment};

pub use stream::EntryStream;

#[derive(Debug, Clone)]
struct DirectoryNode {
    id: u32,
    parent_id: u32,
    name: String,
    full_path: String,
}

#[derive(Debug, Clone)]
struct FileNode {
    directory_id: u32,
    name: String,
    length: u32,
    content: FileContent,
}

/// Whether an [`Entry`] is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or directory resolved from a [`Reader`].
pub struct Entry<'r, R> {
    reader: &'r Reader<R>,
    full_name: String,
    name: String,
    length: u32,
    kind: EntryKind,
}

impl<'r, R: Read + Seek> Entry<'r, R> {
    /// Path from the root without a leading separator; `""` for the root.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File length in bytes, 0 for directories.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn open(&self) -> Result<EntryStream<'r, R>> {
        match self.kind {
            EntryKind::File => self.reader.open_file(&self.full_name),
            EntryKind::Directory => Err(CdcFsError::NotAFile(self.full_name.clone())),
        }
    }

    pub fn read_all_bytes(&self) -> Result<Vec<u8>> {
        match self.kind {
            EntryKind::File => self.reader.read_file(&self.full_name),
            EntryKind::Directory => Err(CdcFsError::NotAFile(self.full_name.clone())),
        }
    }
}

impl<R> std::fmt::Debug for Entry<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("full_name", &self.full_name)
            .field("name", &self.name)
            .field("length", &self.length)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Read-only view of a container over any seekable stream.
///
/// Not safe for concurrent use; open one `Reader` per thread over its own stream handle.
pub struct Reader<R> {
    version: u8,
    modes: Modes,
    directories: Vec<DirectoryNode>,
    directory_index: HashMap<String, u32>,
    files: HashMap<String, FileNode>,
    solid_blocks: Vec<Vec<u32>>,
    chunks: ChunkReader<R>,
}

impl Reader<BufReader<File>> {
    /// Open a container file.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CdcFsError::io_at(e, path))?;
        Reader::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Parse and validate the container at the current position of `stream`.
    pub fn new(mut stream: R) -> Result<Self> {
        let (version, modes) = read_header(&mut stream)?;

        let meta_len = stream.get_u32()? as usize;
        let blob = stream.get_bytes(meta_len)?;
        if modes.hashed() {
            let expected = stream.get_u64()?;
            if integrity_hash(&blob) != expected {
                return Err(CdcFsError::CorruptedMetadata);
            }
        }
        let data_offset = stream.stream_position()?;

        let raw = if modes.compressed() {
            zstd::decode_all(blob.as_slice())
                .map_err(|e| CdcFsError::InvalidFormat(format!("metadata failed to decompress: {}", e)))?
        } else {
            blob
        };
        let meta = Metadata::read_from(&mut raw.as_slice(), modes)?;

        let mut directories = Vec::with_capacity(meta.directories.len() + 1);
        directories.push(DirectoryNode { id: 0, parent_id: 0, name: String::new(), full_path: String::new() });
        for (i, dir) in meta.directories.iter().enumerate() {
            let full_path = path_combine(&directories[dir.parent_id as usize].full_path, &dir.name);
            directories.push(DirectoryNode {
                id: i as u32 + 1,
                parent_id: dir.parent_id,
                name: dir.name.clone(),
                full_path,
            });
        }
        let directory_index = directories.iter().map(|d| (d.full_path.clone(), d.id)).collect();

        let files: HashMap<String, FileNode> = meta
            .files
            .into_iter()
            .map(|f| {
                let path = path_combine(&directories[f.directory_id as usize].full_path, &f.name);
                (path, FileNode { directory_id: f.directory_id, name: f.name, length: f.length, content: f.content })
            })
            .collect();

        let chunks = ChunkReader::new(
            stream,
            data_offset,
            &meta.chunks,
            meta.dictionary,
            modes.compressed(),
            modes.hashed(),
        );

        debug!(
            version,
            directories = directories.len(),
            files = files.len(),
            chunks = chunks.len(),
            "opened container"
        );
        Ok(Self { version, modes, directories, directory_index, files, solid_blocks: meta.solid_blocks, chunks })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_compressed(&self) -> bool {
        self.modes.compressed()
    }

    pub fn is_hashed(&self) -> bool {
        self.modes.hashed()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn solid_block_count(&self) -> usize {
        self.solid_blocks.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Directories including the root.
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// The shared zstd dictionary, if one was trained.
    pub fn dictionary(&self) -> Option<&[u8]> {
        self.chunks.dictionary()
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> R {
        self.chunks.into_inner()
    }

    pub fn root(&self) -> Entry<'_, R> {
        self.directory_entry(&self.directories[0])
    }

    /// Resolve `path` as a file first, then as a directory. `""` and `"/"` are the root.
    pub fn get(&self, path: &str) -> Result<Entry<'_, R>> {
        let path = normalize(path);

        if let Some(file) = self.files.get(path) {
            return Ok(Entry {
                reader: self,
                full_name: path.to_string(),
                name: file.name.clone(),
                length: file.length,
                kind: EntryKind::File,
            });
        }

        match self.directory_index.get(path) {
            Some(&id) => Ok(self.directory_entry(&self.directories[id as usize])),
            None => Err(CdcFsError::NotFound(path.to_string())),
        }
    }

    /// Immediate children of a directory: subdirectories by name, then files by name.
    pub fn list(&self, path: &str) -> Result<Vec<Entry<'_, R>>> {
        let path = normalize(path);
        let Some(&dir_id) = self.directory_index.get(path) else {
            return Err(if self.files.contains_key(path) {
                CdcFsError::NotADirectory(path.to_string())
            } else {
                CdcFsError::NotFound(path.to_string())
            });
        };

        let mut dirs: Vec<&DirectoryNode> =
            self.directories.iter().filter(|d| d.parent_id == dir_id && d.id > 0).collect();
        dirs.sort_by(|a, b| a.name.cmp(&b.name));

        let mut files: Vec<(&String, &FileNode)> =
            self.files.iter().filter(|(_, f)| f.directory_id == dir_id).collect();
        files.sort_by(|a, b| a.1.name.cmp(&b.1.name));

        let entries = dirs
            .into_iter()
            .map(|d| self.directory_entry(d))
            .chain(files.into_iter().map(|(full, f)| Entry {
                reader: self,
                full_name: full.clone(),
                name: f.name.clone(),
                length: f.length,
                kind: EntryKind::File,
            }))
            .collect();
        Ok(entries)
    }

    fn directory_entry(&self, dir: &DirectoryNode) -> Entry<'_, R> {
        Entry {
            reader: self,
            full_name: dir.full_path.clone(),
            name: dir.name.clone(),
            length: 0,
            kind: EntryKind::Directory,
        }
    }

    fn file_node(&self, path: &str) -> Result<&FileNode> {
        let path = normalize(path);
        match self.files.get(path) {
            Some(file) => Ok(file),
            None if self.directory_index.contains_key(path) => Err(CdcFsError::NotAFile(path.to_string())),
            None => Err(CdcFsError::NotFound(path.to_string())),
        }
    }

    fn segments(&self, file: &FileNode) -> Result<Vec<Segment>> {
        let length = file.length as u64;
        match &file.content {
            FileContent::Chunks(ids) => segments_for_range(&self.chunks, ids, 0, length),
            FileContent::Solid { block_id, offset } => {
                let block = self.solid_blocks.get(*block_id as usize).ok_or_else(|| {
                    CdcFsError::InvalidFormat(format!("unknown solid block {}", block_id))
                })?;
                segments_for_range(&self.chunks, block, *offset as u64, length)
            }
        }
    }

    /// Open a forward-only stream over a file's bytes.
    pub fn open_file(&self, path: &str) -> Result<EntryStream<'_, R>> {
        let file = self.file_node(path)?;
        let segments = self.segments(file)?;
        Ok(EntryStream::new(&self.chunks, segments, file.length as u64))
    }

    /// Read a whole file into memory.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.file_node(path)?;
        let mut data = Vec::with_capacity(file.length as usize);
        for seg in self.segments(file)? {
            let info = self.chunks.info(seg.chunk_id)?;
            if seg.skip == 0 && seg.take as usize == info.length() {
                let start = data.len();
                data.resize(start + info.length(), 0);
                self.chunks.read_chunk_into(seg.chunk_id, &mut data[start..])?;
            } else {
                let chunk = self.chunks.read_chunk(seg.chunk_id)?;
                data.extend_from_slice(&chunk[seg.skip as usize..(seg.skip + seg.take) as usize]);
            }
        }
        Ok(data)
    }

    /// Write `path` (a file, or a directory's files) below `dest`. Returns the number of files written.
    pub fn extract_to(&self, path: &str, dest: impl AsRef<Path>, recursive: bool) -> Result<usize> {
        let dest = dest.as_ref();
        let entry = self.get(path)?;

        if entry.is_file() {
            let target = join_inside(dest, entry.name())?;
            self.extract_file(entry.full_name(), &target)?;
            return Ok(1);
        }

        let base = entry.full_name().to_string();
        let mut written = 0;
        let mut paths: Vec<&String> = self.files.keys().collect();
        paths.sort();

        for full in paths {
            let relative = if base.is_empty() {
                full.as_str()
            } else {
                match full.strip_prefix(&base).and_then(|r| r.strip_prefix('/')) {
                    Some(rel) => rel,
                    None => continue,
                }
            };
            if !recursive && relative.contains('/') {
                continue;
            }
            self.extract_file(full, &join_inside(dest, relative)?)?;
            written += 1;
        }

        info!(files = written, dest = %dest.display(), "extracted");
        Ok(written)
    }

    fn extract_file(&self, path: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| CdcFsError::io_at(e, parent))?;
        }
        let mut stream = self.open_file(path)?;
        let mut out = File::create(target).map_err(|e| CdcFsError::io_at(e, target))?;
        io::copy(&mut stream, &mut out)?;
        debug!(path, target = %target.display(), "extracted file");
        Ok(())
    }

    /// Human-readable listing of the directory, file, solid-block and chunk tables.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "version: {}, compressed: {}, hashed: {}",
            self.version,
            self.is_compressed(),
            self.is_hashed()
        );
        if let Some(dict) = self.dictionary() {
            let _ = writeln!(out, "dictionary: {} bytes", dict.len());
        }

        let _ = writeln!(out, "\ndirectories:");
        for dir in &self.directories {
            let _ = writeln!(out, "{}: {} (parent: {})", dir.id, dir.full_path, dir.parent_id);
        }

        let _ = writeln!(out, "\nfiles:");
        let mut paths: Vec<&String> = self.files.keys().collect();
        paths.sort();
        for path in paths {
            let file = &self.files[path];
            match &file.content {
                FileContent::Chunks(ids) => {
                    let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
                    let _ = writeln!(out, "{}: len: {} [{}]", path, file.length, ids.join(","));
                }
                FileContent::Solid { block_id, offset } => {
                    let _ = writeln!(
                        out,
                        "{}: len: {} (solid block: {}, offset: {})",
                        path, file.length, block_id, offset
                    );
                }
            }
        }

        let _ = writeln!(out, "\nsolid blocks:");
        for (id, block) in self.solid_blocks.iter().enumerate() {
            let ids: Vec<String> = block.iter().map(u32::to_string).collect();
            let _ = writeln!(out, "{}: [{}]", id, ids.join(","));
        }

        let _ = writeln!(out, "\nchunks:");
        for id in 0..self.chunks.len() as u32 {
            if let Ok(info) = self.chunks.info(id) {
                let _ = write!(out, "{}: offset {} length {}", id, info.offset, info.record.length);
                if let Some(c) = info.record.compressed_length {
                    let _ = write!(out, " stored {}", c);
                }
                if let Some(h) = info.record.hash {
                    let _ = write!(out, " hash {:016x}", h);
                }
                out.push('\n');
            }
        }
        out
    }
}

/// Join an archive path onto `dest`, refusing anything that would land outside it.
fn join_inside(dest: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(CdcFsError::InvalidPath(relative.display().to_string()));
    }
    Ok(dest.join(relative))
}
