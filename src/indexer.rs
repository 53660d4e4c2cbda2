use crate::{
    document::Document,
    error::Result,
    events::{Event, EventSink},
    tantivy_index::IndexStore,
};

/// Writes harvested document sets into an [`IndexStore`].
pub struct Indexer<'a> {
    store: &'a IndexStore,
    sink: &'a dyn EventSink,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a IndexStore, sink: &'a dyn EventSink) -> Self {
        Self { store, sink }
    }

    /// Replace every entry of `set_id` with `documents`.
    ///
    /// The stream is drained into a single commit. An empty stream empties
    /// the set, which is a valid outcome. Other sets are never touched.
    pub fn index_document_set<I>(
        &self,
        set_id: &str,
        documents: I,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let count = self.store.replace_set(set_id, documents)?;
        self.sink.log(&Event::SetReplaced {
            set_id,
            documents: count,
        });
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::DocumentSet,
        events::testing::RecordingSink,
        harvest::harvest,
    };

    fn write_page(dir: &std::path::Path, name: &str, title: &str, body: &str) {
        std::fs::write(
            dir.join(name),
            format!("<title>{title}</title><body><p>{body}</p></body>"),
        )
        .unwrap();
    }

    #[test]
    fn indexes_harvested_set() {
        let tmp = tempfile::tempdir().unwrap();
        write_page(tmp.path(), "a.html", "Intro", "hello world");
        write_page(tmp.path(), "b.html", "Guide", "hello again");

        let store = IndexStore::open_in_ram().unwrap();
        let sink = RecordingSink::default();
        let set = DocumentSet::new("docs", tmp.path());

        let count = Indexer::new(&store, &sink)
            .index_document_set("docs", harvest(&set, &sink).unwrap())
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.search("hello", None).unwrap().len(), 2);
        assert_eq!(sink.lines().last().unwrap(), "replaced docs 2");
    }

    #[test]
    fn empty_stream_empties_the_set() {
        let store = IndexStore::open_in_ram().unwrap();
        let sink = RecordingSink::default();
        let indexer = Indexer::new(&store, &sink);

        indexer
            .index_document_set(
                "docs",
                vec![Document {
                    key: "a.html".into(),
                    set_id: "docs".into(),
                    title: "Intro".into(),
                    body: "hello".into(),
                }],
            )
            .unwrap();
        assert_eq!(indexer.index_document_set("docs", Vec::new()).unwrap(), 0);

        assert_eq!(store.count(Some("docs")).unwrap(), 0);
        assert_eq!(sink.lines(), vec!["replaced docs 1", "replaced docs 0"]);
    }

    #[test]
    fn other_sets_untouched() {
        let store = IndexStore::open_in_ram().unwrap();
        let sink = RecordingSink::default();
        let indexer = Indexer::new(&store, &sink);
        let doc = |set: &str| Document {
            key: "a.html".into(),
            set_id: set.into(),
            title: set.into(),
            body: "shared words".into(),
        };

        indexer.index_document_set("docs", vec![doc("docs")]).unwrap();
        indexer.index_document_set("api", vec![doc("api")]).unwrap();
        indexer.index_document_set("docs", Vec::new()).unwrap();

        let hits = store.search("shared", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].set_id, "api");
    }

    #[test]
    fn failed_replace_reports_nothing() {
        let store = IndexStore::open_in_ram().unwrap();
        let sink = RecordingSink::default();
        let foreign = Document {
            key: "a.html".into(),
            set_id: "api".into(),
            title: String::new(),
            body: "x".into(),
        };

        assert!(
            Indexer::new(&store, &sink)
                .index_document_set("docs", vec![foreign])
                .is_err()
        );
        assert!(sink.lines().is_empty());
    }
}
