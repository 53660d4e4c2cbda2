use std::io::Write;

use serde::Serialize;

use crate::{
    error::Result,
    tantivy_index::{Hit, IndexStore},
};

/// Runs free-text queries against an [`IndexStore`].
///
/// A searcher keeps no state between calls. An empty or whitespace-only
/// query matches nothing and returns zero hits; it is not a syntax error.
#[derive(Debug, Clone, Copy)]
pub struct Searcher<'a> {
    store: &'a IndexStore,
}

impl<'a> Searcher<'a> {
    pub fn new(store: &'a IndexStore) -> Self {
        Self { store }
    }

    /// Ranked hits across every document set, best first.
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Hit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.store.search(query, limit)
    }

    /// Ranked hits from one document set only.
    pub fn search_in_set(
        &self,
        query: &str,
        set_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Hit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.store.search_in_set(query, set_id, limit)
    }
}

#[derive(Serialize)]
struct JsonResults<'a> {
    query: &'a str,
    result_count: usize,
    results: &'a [Hit],
}

/// Write hits for a terminal: a count line, then `[set] title` per hit.
pub fn write_human(out: &mut impl Write, hits: &[Hit]) -> std::io::Result<()> {
    writeln!(out, "Found {} results.", hits.len())?;
    for hit in hits {
        writeln!(out, "[{}] {}", hit.set_id, hit.title)?;
    }
    Ok(())
}

/// Write hits as a single JSON document.
pub fn write_json(
    out: &mut impl Write,
    query: &str,
    hits: &[Hit],
) -> std::io::Result<()> {
    let results = JsonResults {
        query,
        result_count: hits.len(),
        results: hits,
    };
    serde_json::to_writer(&mut *out, &results)?;
    writeln!(out)
}
