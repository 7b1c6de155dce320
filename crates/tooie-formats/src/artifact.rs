//! Per-asset artifact files
//!
//! Extracted assets are kept in one directory, one file per asset and
//! stage, named `<NAME><SUFFIX>` where `NAME` is the asset's pointer table
//! offset in upper-case hex.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Artifact store errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// A file or directory operation failed
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being attempted
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Result type for artifact operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ArtifactError {
    let path = path.to_path_buf();
    move |source| ArtifactError::Io {
        action,
        path,
        source,
    }
}

/// Stage an artifact file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Blob exactly as stored in the pool
    Compressed,
    /// Inflated payload
    Decompressed,
    /// Uncompressed asset copied verbatim
    Raw,
}

impl ArtifactKind {
    /// File name suffix
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Compressed => "-Compressed.bin",
            Self::Decompressed => "-Decompressed.bin",
            Self::Raw => "-Raw.bin",
        }
    }
}

/// Directory of extracted asset files
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open `dir`, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> ArtifactResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            info!("creating artifact directory {}", dir.display());
            fs::create_dir_all(&dir).map_err(io_error("create", &dir))?;
        }
        Ok(Self { dir })
    }

    /// Directory holding the artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `name` at `kind`
    pub fn path(&self, name: &str, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!("{name}{}", kind.suffix()))
    }

    /// Whether the artifact exists
    pub fn exists(&self, name: &str, kind: ArtifactKind) -> bool {
        self.path(name, kind).is_file()
    }

    /// Write (or replace) an artifact
    pub fn write(&self, name: &str, kind: ArtifactKind, bytes: &[u8]) -> ArtifactResult<PathBuf> {
        let path = self.path(name, kind);
        fs::write(&path, bytes).map_err(io_error("write", &path))?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Read an artifact
    pub fn read(&self, name: &str, kind: ArtifactKind) -> ArtifactResult<Vec<u8>> {
        let path = self.path(name, kind);
        fs::read(&path).map_err(io_error("read", &path))
    }

    /// Remove every file whose name ends with `suffix`; returns the count removed
    pub fn clear(&self, suffix: &str) -> ArtifactResult<usize> {
        info!(
            "removing files ending in {suffix:?} from {}",
            self.dir.display()
        );
        let entries = fs::read_dir(&self.dir).map_err(io_error("list", &self.dir))?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(io_error("list", &self.dir))?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(suffix));
            if matches && path.is_file() {
                fs::remove_file(&path).map_err(io_error("remove", &path))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
