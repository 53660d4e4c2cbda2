use std::collections::VecDeque;

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;

use crate::{
    document::{Document, DocumentSet},
    error::{Error, Result},
    events::{Event, EventSink},
    extract::Extractor,
    walker::{DiscoveredFile, FileWalk},
};

/// Default number of files read and extracted together on the rayon pool.
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct HarvestOptions {
    /// Files extracted in parallel per batch. Bounds how many documents are
    /// held in memory ahead of the consumer.
    pub batch_size: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// A lazy, finite, single-pass stream of the documents in one set.
///
/// Documents come out in path order. Files that fail extraction are
/// reported to the sink and left out; they never end the stream.
pub struct Harvest<'a> {
    set_id: String,
    walk: FileWalk,
    ignore: GlobSet,
    extractor: Extractor,
    sink: &'a dyn EventSink,
    batch_size: usize,
    ready: VecDeque<Document>,
    exhausted: bool,
}

/// Start harvesting `set` with default options.
pub fn harvest<'a>(
    set: &DocumentSet,
    sink: &'a dyn EventSink,
) -> Result<Harvest<'a>> {
    harvest_with(set, HarvestOptions::default(), sink)
}

/// Start harvesting `set`.
///
/// Fails up front if the root is not a directory or the set's ignore
/// patterns or content selector are invalid. Nothing is read beyond the
/// root listing until the stream is polled.
pub fn harvest_with<'a>(
    set: &DocumentSet,
    options: HarvestOptions,
    sink: &'a dyn EventSink,
) -> Result<Harvest<'a>> {
    if !set.root.is_dir() {
        return Err(Error::NotFound {
            kind: "document set root",
            name: set.root.display().to_string(),
        });
    }

    let ignore = build_ignore(&set.ignore)?;
    let extractor = Extractor::new(set.content_selector.as_deref())?;
    let walk = FileWalk::new(&set.root)?;

    sink.log(&Event::HarvestStarted {
        set_id: &set.id,
        root: walk.root(),
    });

    Ok(Harvest {
        set_id: set.id.clone(),
        walk,
        ignore,
        extractor,
        sink,
        batch_size: options.batch_size.max(1),
        ready: VecDeque::new(),
        exhausted: false,
    })
}

/// Check a set's ignore patterns and content selector without walking it.
pub fn validate(set: &DocumentSet) -> Result<()> {
    build_ignore(&set.ignore)?;
    Extractor::new(set.content_selector.as_deref())?;
    Ok(())
}

fn build_ignore(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            Error::Config(format!("invalid ignore pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("invalid ignore patterns: {e}")))
}

impl Harvest<'_> {
    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    fn next_batch(&mut self) -> Vec<DiscoveredFile> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.walk.next() {
                Some(Ok(file)) => {
                    if !self.ignore.is_match(&file.key) {
                        batch.push(file);
                    }
                }
                Some(Err(failure)) => {
                    self.sink.log(&Event::WalkFailed {
                        set_id: &self.set_id,
                        path: &failure.path,
                        error: &failure.error,
                    });
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        batch
    }

    fn fill(&mut self) {
        let batch = self.next_batch();
        let extractor = &self.extractor;
        let extracted: Vec<_> = batch
            .par_iter()
            .map(|file| extractor.extract_file(&file.absolute_path))
            .collect();

        for (file, result) in batch.into_iter().zip(extracted) {
            match result {
                Ok(page) => self.ready.push_back(Document {
                    key: file.key,
                    set_id: self.set_id.clone(),
                    title: page.title,
                    body: page.body,
                }),
                Err(error) => self.sink.log(&Event::DocumentSkipped {
                    set_id: &self.set_id,
                    path: &file.absolute_path,
                    error: &error,
                }),
            }
        }
    }
}

impl Iterator for Harvest<'_> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            if let Some(doc) = self.ready.pop_front() {
                return Some(doc);
            }
            if self.exhausted {
                return None;
            }
            self.fill();
        }
    }
}

impl std::fmt::Debug for Harvest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvest")
            .field("set_id", &self.set_id)
            .field("ready", &self.ready.len())
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::events::{NullSink, testing::RecordingSink};

    fn page(title: &str, body: &str) -> String {
        format!(
            "<html><head><title>{title}</title></head>\
             <body><p>{body}</p></body></html>"
        )
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn yields_documents_in_path_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b.html", &page("Guide", "hello again"));
        write(tmp.path(), "a.html", &page("Intro", "hello world"));
        write(tmp.path(), "api/ref.html", &page("Reference", "calls"));

        let set = DocumentSet::new("docs", tmp.path());
        let docs: Vec<_> = harvest(&set, &NullSink).unwrap().collect();

        let keys: Vec<_> = docs.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["a.html", "api/ref.html", "b.html"]);
        assert_eq!(docs[0].title, "Intro");
        assert_eq!(docs[0].body, "hello world");
        assert!(docs.iter().all(|d| d.set_id == "docs"));
    }

    #[test]
    fn extraction_failures_are_reported_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.html", &page("A", "first"));
        write(tmp.path(), "b.html", "");
        write(tmp.path(), "c.html", &page("C", "third"));

        let sink = RecordingSink::default();
        let set = DocumentSet::new("docs", tmp.path());
        let docs: Vec<_> = harvest(&set, &sink).unwrap().collect();

        let titles: Vec<_> = docs.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);

        let lines = sink.lines();
        assert_eq!(lines[0], "harvest docs");
        assert!(lines[1].starts_with("skipped "));
        assert!(lines[1].ends_with("b.html"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_reported_not_indexed() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.html", &page("A", "first"));
        std::fs::write(
            tmp.path().join(OsStr::from_bytes(b"b\xff.html")),
            page("B", "second"),
        )
        .unwrap();

        let sink = RecordingSink::default();
        let set = DocumentSet::new("docs", tmp.path());
        let keys: Vec<_> =
            harvest(&set, &sink).unwrap().map(|d| d.key).collect();

        assert_eq!(keys, vec!["a.html"]);
        assert!(sink.lines().iter().any(|l| l.starts_with("walk failed ")));
    }

    #[test]
    fn small_batches_keep_order() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..7 {
            write(tmp.path(), &format!("p{i}.html"), &page(&i.to_string(), "x"));
        }

        let set = DocumentSet::new("docs", tmp.path());
        let docs: Vec<_> =
            harvest_with(&set, HarvestOptions { batch_size: 2 }, &NullSink)
                .unwrap()
                .collect();
        let titles: Vec<_> = docs.iter().map(|d| d.title.clone()).collect();
        assert_eq!(titles, vec!["0", "1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.html", &page("A", "x"));

        let set = DocumentSet::new("docs", tmp.path());
        let count =
            harvest_with(&set, HarvestOptions { batch_size: 0 }, &NullSink)
                .unwrap()
                .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn ignore_patterns_match_keys() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "index.html", &page("Home", "x"));
        write(tmp.path(), "genindex.html", &page("Index", "x"));
        write(tmp.path(), "_static/widget.html", &page("Widget", "x"));

        let mut set = DocumentSet::new("docs", tmp.path());
        set.ignore = vec!["genindex.html".into(), "_static/**".into()];
        let keys: Vec<_> =
            harvest(&set, &NullSink).unwrap().map(|d| d.key).collect();
        assert_eq!(keys, vec!["index.html"]);
    }

    #[test]
    fn content_selector_applies_to_every_page() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "a.html",
            "<body><div class=\"sidebar\">nav</div>\
             <div class=\"body\">content</div></body>",
        );

        let mut set = DocumentSet::new("docs", tmp.path());
        set.content_selector = Some("div.body".into());
        let docs: Vec<_> = harvest(&set, &NullSink).unwrap().collect();
        assert_eq!(docs[0].body, "content");
    }

    #[test]
    fn empty_set_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let set = DocumentSet::new("docs", tmp.path());
        assert_eq!(harvest(&set, &NullSink).unwrap().count(), 0);
    }

    #[test]
    fn missing_root_fails_up_front() {
        let tmp = tempfile::tempdir().unwrap();
        let set = DocumentSet::new("docs", tmp.path().join("gone"));
        assert!(matches!(
            harvest(&set, &NullSink),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn validate_checks_options_only() {
        let mut set = DocumentSet::new("docs", "/does/not/exist");
        assert!(validate(&set).is_ok());

        set.content_selector = Some("div[[".into());
        assert!(matches!(validate(&set), Err(Error::Config(_))));
    }

    #[test]
    fn invalid_ignore_pattern_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut set = DocumentSet::new("docs", tmp.path());
        set.ignore = vec!["[unclosed".into()];
        assert!(matches!(harvest(&set, &NullSink), Err(Error::Config(_))));
    }
}
