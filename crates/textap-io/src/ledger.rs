//! Content ledger: decides which files in a directory are new for this run.
//!
//! A file is identified by the BLAKE3 digest of its full content, never by
//! name, size or mtime. A fingerprint is added to the state's ledger the
//! moment its file is accepted, so the same content is taken at most once
//! even when it appears twice within one run. A directory is fingerprinted
//! in full before anything is marked, so a file that cannot be read leaves
//! the ledger untouched.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use textap_core::hash::ContentHasher;
use textap_core::RunState;
use tracing::info;

use crate::error::{Error, Result};

const FINGERPRINT_BLOCK: usize = 1 << 20;

/// A file accepted for this run. Only `fingerprint` outlives the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub display_name: String,
    pub absolute_path: PathBuf,
    pub fingerprint: String,
}

/// New files for one stream, in display-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFiles {
    pub name: String,
    pub directories: Vec<PathBuf>,
    pub files: Vec<FileEntry>,
    /// Candidates dropped because their content was already seen.
    pub skipped: usize,
}

impl StreamFiles {
    fn absorb(&mut self, other: StreamFiles) {
        self.directories.extend(other.directories);
        self.files.extend(other.files);
        self.skipped += other.skipped;
        self.files.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    }
}

pub struct ContentLedger<'s> {
    state: &'s mut RunState,
    extension: String,
}

impl<'s> ContentLedger<'s> {
    pub fn new(state: &'s mut RunState, extension: impl Into<String>) -> Self {
        Self {
            state,
            extension: extension.into(),
        }
    }

    /// Scan every directory. Directories sharing a base name feed one stream.
    pub fn scan_all(&mut self, dirs: &[PathBuf]) -> Result<BTreeMap<String, StreamFiles>> {
        let mut streams: BTreeMap<String, StreamFiles> = BTreeMap::new();
        let mut total = 0usize;
        for dir in dirs {
            let Some(found) = self.scan_directory(dir)? else {
                continue;
            };
            total += found.files.len();
            match streams.get_mut(&found.name) {
                Some(existing) => existing.absorb(found),
                None => {
                    streams.insert(found.name.clone(), found);
                }
            }
        }
        info!(
            "Found {} total new or newly-changed .{} files in {} streams",
            total,
            self.extension,
            streams.len()
        );
        Ok(streams)
    }

    /// Scan one directory. `None` when it holds no candidate files at all.
    pub fn scan_directory(&mut self, dir: &Path) -> Result<Option<StreamFiles>> {
        info!("Finding .{} files in {}...", self.extension, dir.display());
        let name = stream_name(dir)?;
        let candidates = list_candidates(dir, &self.extension)?;
        if candidates.is_empty() {
            info!("No .{} files in {}", self.extension, dir.display());
            return Ok(None);
        }

        let fingerprinted = candidates
            .into_iter()
            .map(|(display_name, absolute_path)| {
                let fingerprint = fingerprint_file(&absolute_path)?;
                Ok((display_name, absolute_path, fingerprint))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = StreamFiles {
            name: name.clone(),
            directories: vec![dir.to_path_buf()],
            ..Default::default()
        };
        for (display_name, absolute_path, fingerprint) in fingerprinted {
            if !self.state.mark_seen(&name, &fingerprint) {
                info!(
                    "File {} has not changed since last run so it will be skipped",
                    display_name
                );
                out.skipped += 1;
                continue;
            }
            out.files.push(FileEntry {
                display_name,
                absolute_path,
                fingerprint,
            });
        }

        info!(
            "Found {} new or newly-changed .{} files in {}",
            out.files.len(),
            self.extension,
            dir.display()
        );
        Ok(Some(out))
    }
}

/// Stream name for a directory: its base name, ignoring a trailing separator.
pub fn stream_name(dir: &Path) -> Result<String> {
    let base = match dir.file_name() {
        Some(n) => n.to_os_string(),
        None => {
            let canonical = fs::canonicalize(dir).map_err(|source| Error::Enumerate {
                path: dir.to_path_buf(),
                source,
            })?;
            canonical
                .file_name()
                .map(|n| n.to_os_string())
                .ok_or_else(|| Error::Enumerate {
                    path: dir.to_path_buf(),
                    source: std::io::Error::new(
                        ErrorKind::InvalidInput,
                        "directory has no base name to use as a stream name",
                    ),
                })?
        }
    };
    Ok(base.to_string_lossy().into_owned())
}

/// Regular files in `dir` ending in `.<extension>`, sorted by file name.
/// Entries whose metadata cannot be read (a dangling symlink, say) are kept;
/// fingerprinting reports them.
pub fn list_candidates(dir: &Path, extension: &str) -> Result<Vec<(String, PathBuf)>> {
    let enumerate_err = |source| Error::Enumerate {
        path: dir.to_path_buf(),
        source,
    };
    let root = fs::canonicalize(dir).map_err(enumerate_err)?;
    let suffix = format!(".{extension}");

    let mut out = Vec::new();
    for entry in fs::read_dir(&root).map_err(enumerate_err)? {
        let entry = entry.map_err(enumerate_err)?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.ends_with(&suffix) {
            continue;
        }
        let path = entry.path();
        // follows symlinks
        if let Ok(meta) = fs::metadata(&path) {
            if !meta.is_file() {
                continue;
            }
        }
        out.push((file_name, path));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// Hex BLAKE3 digest of the whole file, read in 1 MiB blocks.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let fp_err = |source| Error::Fingerprint {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(fp_err)?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; FINGERPRINT_BLOCK];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(fp_err(e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish().to_hex())
}
