//! Entry points used by the command line and other embedders.
//!
//! Each operation opens the index at an explicit location, does its work,
//! and releases every handle before returning.

use std::path::Path;

use crate::{
    document::DocumentSet,
    error::Result,
    events::{Event, EventSink},
    harvest::harvest,
    indexer::Indexer,
    search::Searcher,
    tantivy_index::{Hit, IndexStore},
};

/// Create an empty index at `location`.
///
/// Fails with [`Error::AlreadyExists`](crate::Error::AlreadyExists) when an
/// index is already there, unless `force` is set.
pub fn initialize_index(
    location: &Path,
    force: bool,
    sink: &dyn EventSink,
) -> Result<()> {
    IndexStore::initialize(location, force)?;
    sink.log(&Event::IndexCreated { location });
    Ok(())
}

/// Harvest `set` from disk and replace its entries in the index.
///
/// Returns the number of documents now indexed for the set. If the set's
/// root is missing the call fails before anything is written.
pub fn reindex(
    location: &Path,
    set: &DocumentSet,
    sink: &dyn EventSink,
) -> Result<usize> {
    let store = IndexStore::open(location)?;
    let documents = harvest(set, sink)?;
    Indexer::new(&store, sink).index_document_set(&set.id, documents)
}

/// Search every document set in the index at `location`.
pub fn query_index(
    location: &Path,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<Hit>> {
    let store = IndexStore::open(location)?;
    Searcher::new(&store).search(query, limit)
}

/// Search a single document set in the index at `location`.
pub fn query_set(
    location: &Path,
    query: &str,
    set_id: &str,
    limit: Option<usize>,
) -> Result<Vec<Hit>> {
    let store = IndexStore::open(location)?;
    Searcher::new(&store).search_in_set(query, set_id, limit)
}

/// Drop every entry of `set_id` from the index.
pub fn remove_set(
    location: &Path,
    set_id: &str,
    sink: &dyn EventSink,
) -> Result<()> {
    let store = IndexStore::open(location)?;
    Indexer::new(&store, sink).index_document_set(set_id, Vec::new())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, events::testing::RecordingSink};

    #[test]
    fn operations_require_an_index() {
        let tmp = tempfile::tempdir().unwrap();
        let location = tmp.path().join("index");
        let sink = RecordingSink::default();
        let set = DocumentSet::new("docs", tmp.path());

        assert!(matches!(
            reindex(&location, &set, &sink),
            Err(Error::NotInitialized(_))
        ));
        assert!(matches!(
            query_index(&location, "hello", None),
            Err(Error::NotInitialized(_))
        ));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn initialize_reports_creation() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = RecordingSink::default();

        initialize_index(tmp.path(), false, &sink).unwrap();
        assert_eq!(sink.lines(), vec!["created"]);
    }

    #[test]
    fn missing_root_keeps_previous_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let location = tmp.path().join("index");
        let root = tmp.path().join("site");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.html"), "<title>A</title><p>kept</p>")
            .unwrap();

        let sink = RecordingSink::default();
        initialize_index(&location, false, &sink).unwrap();
        let set = DocumentSet::new("docs", &root);
        assert_eq!(reindex(&location, &set, &sink).unwrap(), 1);

        std::fs::remove_dir_all(&root).unwrap();
        assert!(matches!(
            reindex(&location, &set, &sink),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(query_index(&location, "kept", None).unwrap().len(), 1);
    }

    #[test]
    fn remove_set_drops_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let location = tmp.path().join("index");
        let root = tmp.path().join("site");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.html"), "<title>A</title><p>gone</p>")
            .unwrap();

        let sink = RecordingSink::default();
        initialize_index(&location, false, &sink).unwrap();
        reindex(&location, &DocumentSet::new("docs", &root), &sink).unwrap();
        remove_set(&location, "docs", &sink).unwrap();

        assert!(query_index(&location, "gone", None).unwrap().is_empty());
        assert_eq!(sink.lines().last().unwrap(), "replaced docs 0");
    }
}
