use std::fs::{File, Metadata};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::SelectError;

/// Upper bound on the buffer reserved from an archive's declared entry size.
const MAX_PREALLOC: u64 = 1 << 20;

/// A single file-like item produced by a resource collection.
///
/// Resources come from two places: a directory scan (or a literal path
/// element), in which case they are backed by a real file, or an archive
/// scan, in which case they only name an entry inside a container. Anything
/// that needs a concrete path goes through [`Resource::file`], which fails
/// for archive entries instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Name relative to the owning collection, `/` separated.
    /// The base directory of a scan itself has the empty name.
    pub name: String,

    /// Whether this is a file or a directory.
    pub kind: ResourceKind,

    /// Whether the resource existed when it was produced.
    pub exists: bool,

    /// Modification time, when the source knows one.
    pub last_modified: Option<SystemTime>,

    /// Size in bytes, when the source knows it.
    pub size: Option<u64>,

    origin: Origin,
}

/// The kind of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A regular file (or an archive entry holding data).
    File,

    /// A directory.
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    File {
        basedir: Option<PathBuf>,
        path: PathBuf,
    },
    Archive {
        archive: PathBuf,
    },
}

impl Resource {
    /// A filesystem resource described by already-fetched metadata.
    pub fn from_metadata(basedir: Option<&Path>, name: &str, path: PathBuf, meta: &Metadata) -> Self {
        Self {
            name: name.to_string(),
            kind: if meta.is_dir() {
                ResourceKind::Dir
            } else {
                ResourceKind::File
            },
            exists: true,
            last_modified: meta.modified().ok(),
            size: if meta.is_dir() { None } else { Some(meta.len()) },
            origin: Origin::File {
                basedir: basedir.map(Path::to_path_buf),
                path,
            },
        }
    }

    /// A filesystem resource; stats `path` now. A missing file produces a
    /// resource with `exists == false` rather than an error.
    pub fn from_path(basedir: Option<&Path>, name: &str, path: PathBuf) -> Self {
        match std::fs::metadata(&path) {
            Ok(meta) => Self::from_metadata(basedir, name, path, &meta),
            Err(_) => Self {
                name: name.to_string(),
                kind: ResourceKind::File,
                exists: false,
                last_modified: None,
                size: None,
                origin: Origin::File {
                    basedir: basedir.map(Path::to_path_buf),
                    path,
                },
            },
        }
    }

    /// An entry inside `archive`.
    pub fn archive_entry(
        archive: &Path,
        name: &str,
        kind: ResourceKind,
        size: Option<u64>,
        last_modified: Option<SystemTime>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            exists: true,
            last_modified,
            size,
            origin: Origin::Archive {
                archive: archive.to_path_buf(),
            },
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == ResourceKind::Dir
    }

    /// Whether this resource has a concrete backing path.
    pub fn is_filesystem_backed(&self) -> bool {
        matches!(self.origin, Origin::File { .. })
    }

    /// The backing file.
    ///
    /// # Errors
    ///
    /// [`SelectError::NotFilesystemBacked`] for archive entries.
    pub fn file(&self) -> Result<&Path, SelectError> {
        match &self.origin {
            Origin::File { path, .. } => Ok(path),
            Origin::Archive { .. } => Err(SelectError::NotFilesystemBacked(self.to_long_string())),
        }
    }

    /// The directory this resource's name is relative to, if any.
    pub fn basedir(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File { basedir, .. } => basedir.as_deref(),
            Origin::Archive { .. } => None,
        }
    }

    /// The archive this entry lives in, if any.
    pub fn archive(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Archive { archive } => Some(archive),
            Origin::File { .. } => None,
        }
    }

    /// Modification time in milliseconds since the epoch; `0` when unknown.
    pub fn last_modified_millis(&self) -> i64 {
        self.last_modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    /// Read the whole content of the resource.
    pub fn read_content(&self) -> Result<Vec<u8>, SelectError> {
        match &self.origin {
            Origin::File { path, .. } => std::fs::read(path).map_err(|e| SelectError::io(path, e)),
            Origin::Archive { archive } => {
                let file = File::open(archive).map_err(|e| SelectError::io(archive, e))?;
                let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
                    SelectError::Archive {
                        path: archive.clone(),
                        message: e.to_string(),
                    }
                })?;
                let mut entry = zip.by_name(&self.name).map_err(|e| SelectError::Archive {
                    path: archive.clone(),
                    message: format!("{}: {e}", self.name),
                })?;
                let mut buf = Vec::with_capacity(initial_capacity(entry.size()));
                entry
                    .read_to_end(&mut buf)
                    .map_err(|e| SelectError::io(archive, e))?;
                Ok(buf)
            }
        }
    }

    /// A description unique across collections: the absolute path for
    /// files, `archive!/entry` for archive entries.
    pub fn to_long_string(&self) -> String {
        match &self.origin {
            Origin::File { path, .. } => path.display().to_string(),
            Origin::Archive { archive } => format!("{}!/{}", archive.display(), self.name),
        }
    }
}

/// The declared size comes from the archive header and is not trusted.
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}
