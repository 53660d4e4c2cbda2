//! Observability hooks for the indexing pipeline.
//!
//! The library never configures logging itself. Callers hand an
//! [`EventSink`] to the entry points and decide where events end up; the
//! binary uses [`TracingSink`].

use std::path::Path;

use crate::extract::ExtractionError;

/// Something worth reporting that happened while indexing.
#[derive(Debug)]
pub enum Event<'a> {
    /// A fresh, empty index was written at `location`.
    IndexCreated { location: &'a Path },
    /// Walking of a document set began.
    HarvestStarted { set_id: &'a str, root: &'a Path },
    /// A file could not be extracted and was left out of the set.
    DocumentSkipped {
        set_id: &'a str,
        path: &'a Path,
        error: &'a ExtractionError,
    },
    /// A directory entry could not be read during the walk, or its path is
    /// not valid UTF-8.
    WalkFailed {
        set_id: &'a str,
        path: &'a Path,
        error: &'a std::io::Error,
    },
    /// A set's entries were replaced and committed.
    SetReplaced { set_id: &'a str, documents: usize },
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    fn log(&self, event: &Event<'_>);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log(&self, event: &Event<'_>) {
        match event {
            Event::IndexCreated { location } => {
                tracing::info!(
                    location = %location.display(),
                    "created index"
                );
            }
            Event::HarvestStarted { set_id, root } => {
                tracing::info!(
                    set = set_id,
                    root = %root.display(),
                    "indexing document set"
                );
            }
            Event::DocumentSkipped {
                set_id,
                path,
                error,
            } => {
                tracing::warn!(
                    set = set_id,
                    path = %path.display(),
                    %error,
                    "skipping document"
                );
            }
            Event::WalkFailed {
                set_id,
                path,
                error,
            } => {
                tracing::warn!(
                    set = set_id,
                    path = %path.display(),
                    %error,
                    "skipping unreadable directory entry"
                );
            }
            Event::SetReplaced { set_id, documents } => {
                tracing::debug!(
                    set = set_id,
                    documents,
                    "committed document set"
                );
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log(&self, _event: &Event<'_>) {}
}
