//! Common utilities and types module.
// Format constants, mode flags and the path helpers shared by writer and reader.

use crate::error::{CdcFsError, Result};

/// Magic string at the start of every container.
pub const MAGIC: &str = "FastCdcFs";

/// Format version emitted by the writer and the only one the reader accepts.
pub const FORMAT_VERSION: u8 = 2;

/// Longest directory or file name the tables can hold.
pub const MAX_NAME_LEN: usize = 64 * 1024;

/// Bit flags stored in the mode byte of the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modes(u8);

impl Modes {
    pub const NONE: Modes = Modes(0);
    /// Chunks and metadata are stored without zstd.
    pub const NO_ZSTD: Modes = Modes(0b01);
    /// No metadata hash and no per-chunk integrity hashes.
    pub const NO_HASH: Modes = Modes(0b10);

    pub fn new(no_zstd: bool, no_hash: bool) -> Self {
        let mut mode = Modes::NONE;
        if no_zstd {
            mode.0 |= Modes::NO_ZSTD.0;
        }
        if no_hash {
            mode.0 |= Modes::NO_HASH.0;
        }
        mode
    }

    const KNOWN: u8 = Modes::NO_ZSTD.0 | Modes::NO_HASH.0;

    /// Unknown bits mean a newer format this reader cannot interpret.
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !Modes::KNOWN != 0 {
            return Err(CdcFsError::InvalidFormat(format!("unknown mode flags {:#04x}", bits)));
        }
        Ok(Modes(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn compressed(self) -> bool {
        self.0 & Modes::NO_ZSTD.0 == 0
    }

    pub fn hashed(self) -> bool {
        self.0 & Modes::NO_HASH.0 == 0
    }
}

/// Strip one leading separator, so `""` and `"/"` both name the root.
pub fn normalize(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Join a directory path and an entry name; the root directory is `""`.
pub fn path_combine(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Split an archive path into (parent directory, final segment).
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// A single directory or file name as stored in the tables.
/// Names that could step out of an extraction directory are not valid.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.len() <= MAX_NAME_LEN
        && !name.contains(['/', '\\', '\0'])
}

/// Turn a caller supplied target path into canonical archive form:
/// forward slashes, no leading, trailing or repeated separators.
/// `..` segments, NUL bytes and over-long names are rejected.
pub fn canonical_target(path: &str) -> Result<String> {
    let normalized = path.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in normalized.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if !is_valid_name(segment) {
            return Err(CdcFsError::InvalidPath(truncate_for_display(path)));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

fn truncate_for_display(path: &str) -> String {
    match path.char_indices().nth(256) {
        Some((idx, _)) => format!("{}...", &path[..idx]),
        None => path.to_string(),
    }
}
