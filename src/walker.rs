use std::path::{Path, PathBuf};

use crate::{document::key_from_relative, error::Result};

/// A discovered document file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the document set root directory.
    pub relative_path: PathBuf,
    /// `/`-separated relative path, used as the document key.
    pub key: String,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

/// A directory entry the walk could not read.
#[derive(Debug)]
pub struct WalkFailure {
    pub path: PathBuf,
    pub error: std::io::Error,
}

/// Supported file extensions for document discovery.
const SUPPORTED_EXTENSIONS: &[&str] = &["html", "htm"];

/// Lazily walks a directory tree, yielding HTML files in path order.
///
/// Each directory is listed only when the walk reaches it, and its entries
/// are sorted by name, so the overall order is the lexicographic order of
/// relative paths. Hidden files and directories (names starting with `.`)
/// are skipped. Symlinked files are followed; symlinked directories are not.
#[derive(Debug)]
pub struct FileWalk {
    root: PathBuf,
    stack: Vec<std::vec::IntoIter<PathBuf>>,
    pending_failure: Option<WalkFailure>,
}

impl FileWalk {
    pub fn new(root: &Path) -> Result<Self> {
        let root = root.canonicalize()?;
        let entries = sorted_entries(&root)?;
        Ok(Self {
            root,
            stack: vec![entries.into_iter()],
            pending_failure: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn visit(
        &mut self,
        path: PathBuf,
    ) -> std::io::Result<Option<DiscoveredFile>> {
        let hidden = path
            .file_name()
            .is_some_and(|n| n.as_encoded_bytes().starts_with(b"."));
        if hidden {
            return Ok(None);
        }

        let file_type = std::fs::symlink_metadata(&path)?.file_type();

        if file_type.is_dir() {
            match sorted_entries(&path) {
                Ok(entries) => self.stack.push(entries.into_iter()),
                Err(error) => {
                    self.pending_failure = Some(WalkFailure { path, error });
                }
            }
            Ok(None)
        } else if file_type.is_symlink() {
            // Skip broken symlinks and never descend through linked
            // directories.
            let Ok(resolved) = path.canonicalize() else {
                return Ok(None);
            };
            if resolved.is_file() && is_supported(&path) {
                self.discovered(&path, resolved).map(Some)
            } else {
                Ok(None)
            }
        } else if file_type.is_file() && is_supported(&path) {
            self.discovered(&path, path.clone()).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Keys must be unique within a set, so names that are not valid UTF-8
    /// are refused rather than converted lossily.
    fn discovered(
        &self,
        path: &Path,
        absolute: PathBuf,
    ) -> std::io::Result<DiscoveredFile> {
        let relative_path =
            path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
        let key = key_from_relative(&relative_path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "path is not valid UTF-8",
            )
        })?;
        Ok(DiscoveredFile {
            relative_path,
            key,
            absolute_path: absolute,
        })
    }
}

impl Iterator for FileWalk {
    type Item = std::result::Result<DiscoveredFile, WalkFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(failure) = self.pending_failure.take() {
                return Some(Err(failure));
            }
            let top = self.stack.last_mut()?;
            let Some(path) = top.next() else {
                self.stack.pop();
                continue;
            };
            match self.visit(path.clone()) {
                Ok(Some(file)) => return Some(Ok(file)),
                Ok(None) => {}
                Err(error) => return Some(Err(WalkFailure { path, error })),
            }
        }
    }
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}
