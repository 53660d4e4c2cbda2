use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A named collection of HTML documents living under one root directory.
///
/// Sets are declared by configuration (see [`crate::ConfigDb`]) and are
/// re-synchronised on every indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    /// Identifier, unique within a deployment.
    pub id: String,
    /// Directory the set's documents live under.
    pub root: PathBuf,
    /// Glob patterns, matched against document keys, of files to leave out.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// CSS selector for the region of each page holding the searchable
    /// text (e.g. `div.body` for Sphinx output). The whole `<body>` is used
    /// when unset or when nothing matches.
    #[serde(default)]
    pub content_selector: Option<String>,
}

impl DocumentSet {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            ignore: Vec::new(),
            content_selector: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A harvested document, ready to be written into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the set root, `/`-separated. Unique within the set.
    pub key: String,
    /// Identifier of the owning document set.
    pub set_id: String,
    /// Content of the `<title>` element, or empty.
    pub title: String,
    /// Visible text with whitespace collapsed.
    pub body: String,
}

/// Build a document key from a path relative to the set root.
///
/// Components are joined with `/` whatever the platform separator is, so
/// keys stay stable across systems. Returns `None` if any component is not
/// valid UTF-8.
pub fn key_from_relative(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
