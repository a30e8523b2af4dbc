//! Spec sources and the injectable file reader seam

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a spec document came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SpecSource {
    /// Text compiled into the binary at build time
    Embedded,
    /// A local file path
    File { path: PathBuf },
    /// An HTTP(S) URL
    Url { url: String },
}

impl std::fmt::Display for SpecSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecSource::Embedded => write!(f, "embedded"),
            SpecSource::File { path } => write!(f, "file:{}", path.display()),
            SpecSource::Url { url } => write!(f, "{}", url),
        }
    }
}

/// Trait for reading spec text from disk
///
/// Injectable so tests can supply spec text without touching the
/// filesystem.
pub trait SpecReader: Send + Sync {
    /// Read the full contents of the file at `path`
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// Default reader backed by the real filesystem
#[derive(Debug, Default)]
pub struct FsReader;

impl SpecReader for FsReader {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}
