//! dokang - a lightweight harvesting, indexing and search engine for sets of
//! HTML documents.
//!
//! Document sets are directories of HTML pages (typically generated
//! documentation). dokang walks each set, extracts titles and visible text,
//! and keeps one full-text index covering every set, backed by
//! [Tantivy](https://github.com/quickwit-oss/tantivy).
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use dokang::{DocumentSet, events::TracingSink, operations};
//!
//! let index = Path::new("/tmp/dokang-index");
//! operations::initialize_index(index, false, &TracingSink).unwrap();
//!
//! let set = DocumentSet::new("docs", "/usr/share/doc/python3/html");
//! operations::reindex(index, &set, &TracingSink).unwrap();
//!
//! for hit in operations::query_index(index, "context manager", Some(10)).unwrap() {
//!     println!("[{}] {} ({:.3})", hit.set_id, hit.title, hit.score);
//! }
//! ```

pub mod cli;
pub mod config_db;
pub mod data_dir;
pub mod document;
pub mod error;
pub mod events;
pub mod extract;
pub mod harvest;
pub mod indexer;
pub mod operations;
pub mod search;
pub mod tantivy_index;
pub mod walker;

pub use config_db::ConfigDb;
pub use data_dir::DataDir;
pub use document::{Document, DocumentSet};
pub use error::{Error, Result};
pub use events::{Event, EventSink};
pub use indexer::Indexer;
pub use search::Searcher;
pub use tantivy_index::{Hit, IndexStore};
