use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    ReloadPolicy,
    TantivyDocument,
    TantivyError,
    Term,
    collector::{Count, TopDocs},
    directory::{MmapDirectory, error::LockError},
    doc,
    query::{BooleanQuery, ConstScoreQuery, Occur, Query, QueryParser, TermQuery},
    schema::*,
    snippet::SnippetGenerator,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{
    document::Document,
    error::{Error, Result},
};

/// Version of the on-disk layout written by this build.
pub const FORMAT_VERSION: u32 = 1;

const FORMAT_NAME: &str = "dokang";

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// How long a writer waits for another handle or process to finish.
const WRITER_LOCK_TIMEOUT: Duration = Duration::from_secs(600);

const WRITER_RETRY_MAX: Duration = Duration::from_millis(250);

/// Bookkeeping files tantivy writes that are not in its managed list.
const INDEX_META_FILES: &[&str] = &[
    "meta.json",
    ".managed.json",
    ".tantivy-meta.lock",
    ".tantivy-writer.lock",
];

const SNIPPET_MAX_CHARS: usize = 160;

/// Field names used in the schema.
pub mod fields {
    pub const KEY: &str = "key";
    pub const SET: &str = "set";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
}

/// Resolved field handles for the schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
    pub key: Field,
    pub set: Field,
    pub title: Field,
    pub body: Field,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub set_id: String,
    pub key: String,
    pub title: String,
    pub score: f32,
    pub snippet: String,
}

/// Marker stored as the payload of every commit, identifying the layout.
#[derive(Debug, Serialize, Deserialize)]
struct FormatMarker {
    format: String,
    version: u32,
}

impl FormatMarker {
    fn current() -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
        }
    }
}

/// The persistent inverted index holding every document set.
///
/// A store is a scoped handle: writers are created per mutation and always
/// either committed or rolled back before the call returns, so dropping the
/// store never leaves half-written state behind.
pub struct IndexStore {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    location: Option<PathBuf>,
    write_lock: Mutex<()>,
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(fields::KEY, STRING | STORED);
    builder.add_text_field(fields::SET, STRING | STORED);

    let text_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("en_stem")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    builder.add_text_field(fields::TITLE, text_opts.clone());
    builder.add_text_field(fields::BODY, text_opts);

    builder.build()
}

fn resolve_fields(schema: &Schema) -> Result<SchemaFields> {
    Ok(SchemaFields {
        key: schema.get_field(fields::KEY)?,
        set: schema.get_field(fields::SET)?,
        title: schema.get_field(fields::TITLE)?,
        body: schema.get_field(fields::BODY)?,
    })
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

fn open_directory(location: &Path) -> Result<MmapDirectory> {
    MmapDirectory::open(location).map_err(|e| {
        Error::Storage(tantivy::TantivyError::SystemError(e.to_string()))
    })
}

fn index_exists(dir: &MmapDirectory) -> Result<bool> {
    Index::exists(dir).map_err(|e| {
        Error::Storage(tantivy::TantivyError::SystemError(e.to_string()))
    })
}

/// Open a writer, waiting while another handle or process holds the
/// writer lock on the same directory.
fn acquire_writer(index: &Index) -> Result<IndexWriter> {
    let deadline = Instant::now() + WRITER_LOCK_TIMEOUT;
    let mut backoff = Duration::from_millis(5);
    loop {
        match index.writer(WRITER_MEMORY_BUDGET) {
            Err(TantivyError::LockFailure(LockError::LockBusy, _))
                if Instant::now() < deadline =>
            {
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(WRITER_RETRY_MAX);
            }
            result => return Ok(result?),
        }
    }
}

/// Delete the files of the index stored in `dir`, leaving anything else in
/// `location` untouched.
fn remove_index_files(location: &Path, dir: MmapDirectory) -> Result<()> {
    let managed = Index::open(dir)?.directory().list_managed_files();
    let meta = INDEX_META_FILES.iter().map(PathBuf::from);

    for file in managed.into_iter().chain(meta) {
        match std::fs::remove_file(location.join(&file)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Commit pending operations, stamping the commit with the format marker.
fn commit_with_marker(writer: &mut IndexWriter) -> Result<()> {
    let marker = serde_json::json!(FormatMarker::current()).to_string();
    let mut prepared = writer.prepare_commit()?;
    prepared.set_payload(&marker);
    prepared.commit()?;
    Ok(())
}

impl IndexStore {
    /// Create a new, empty index at `location`.
    ///
    /// Fails with [`Error::AlreadyExists`] if the location already holds an
    /// index, unless `force` is set, in which case the old index files are
    /// deleted first. Other files in `location` are left alone.
    pub fn initialize(location: &Path, force: bool) -> Result<Self> {
        std::fs::create_dir_all(location)?;
        let mut dir = open_directory(location)?;

        if index_exists(&dir)? {
            if !force {
                return Err(Error::AlreadyExists(location.to_path_buf()));
            }
            remove_index_files(location, dir)?;
            dir = open_directory(location)?;
        }

        let index =
            Index::create(dir, build_schema(), tantivy::IndexSettings::default())?;
        Self::stamp_new(index, Some(location.to_path_buf()))
    }

    /// Open the index at `location` for reading and writing.
    pub fn open(location: &Path) -> Result<Self> {
        if !location.is_dir() {
            return Err(Error::NotInitialized(location.to_path_buf()));
        }
        let dir = open_directory(location)?;
        if !index_exists(&dir)? {
            return Err(Error::NotInitialized(location.to_path_buf()));
        }

        let index = Index::open(dir)?;
        check_marker(&index, location)?;
        register_tokenizers(&index);
        Self::from_index(index, Some(location.to_path_buf()))
    }

    /// Create an in-memory index (for testing).
    pub fn open_in_ram() -> Result<Self> {
        Self::stamp_new(Index::create_in_ram(build_schema()), None)
    }

    fn stamp_new(index: Index, location: Option<PathBuf>) -> Result<Self> {
        register_tokenizers(&index);
        let mut writer = acquire_writer(&index)?;
        commit_with_marker(&mut writer)?;
        writer.wait_merging_threads()?;
        Self::from_index(index, location)
    }

    fn from_index(index: Index, location: Option<PathBuf>) -> Result<Self> {
        let fields = resolve_fields(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            fields,
            location,
            write_lock: Mutex::new(()),
        })
    }

    /// Where the index lives on disk, if anywhere.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn fields(&self) -> SchemaFields {
        self.fields
    }

    /// Replace every entry of `set_id` with `documents`, then commit.
    ///
    /// The deletion of the previous generation and the insertion of the new
    /// one land in a single commit: searchers see either the old set or the
    /// new one, never both. If anything fails before the commit the staged
    /// changes are rolled back and the previous generation stays current.
    /// Concurrent calls, from this handle or any other, run one at a time.
    /// Returns the number of documents written.
    pub fn replace_set<I>(&self, set_id: &str, documents: I) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let _guard =
            self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut writer = acquire_writer(&self.index)?;
        let staged = self.stage(&writer, set_id, documents);

        match staged {
            Ok(count) => {
                commit_with_marker(&mut writer)?;
                writer.wait_merging_threads()?;
                Ok(count)
            }
            Err(e) => {
                writer.rollback()?;
                Err(e)
            }
        }
    }

    fn stage<I>(
        &self,
        writer: &IndexWriter,
        set_id: &str,
        documents: I,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let f = self.fields;
        writer.delete_term(Term::from_field_text(f.set, set_id));

        let mut count = 0;
        for document in documents {
            if document.set_id != set_id {
                return Err(Error::ForeignDocument {
                    expected: set_id.to_string(),
                    found: document.set_id,
                });
            }
            writer.add_document(doc!(
                f.key => document.key,
                f.set => document.set_id,
                f.title => document.title,
                f.body => document.body,
            ))?;
            count += 1;
        }
        Ok(count)
    }

    /// Search every set with BM25 scoring.
    ///
    /// Terms are matched against title and body, with the title boosted 2x,
    /// and are ANDed unless the query says otherwise. Returns at most `limit`
    /// hits, or every match when `limit` is `None`.
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Hit>> {
        self.run_search(query, None, limit)
    }

    /// Search within a single document set only.
    pub fn search_in_set(
        &self,
        query: &str,
        set_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Hit>> {
        self.run_search(query, Some(set_id), limit)
    }

    fn run_search(
        &self,
        query_str: &str,
        set_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Hit>> {
        let f = self.fields;

        let mut parser =
            QueryParser::for_index(&self.index, vec![f.title, f.body]);
        parser.set_field_boost(f.title, 2.0);
        parser.set_conjunction_by_default();
        let user_query = parser.parse_query(query_str)?;

        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let limit = limit.unwrap_or(searcher.num_docs() as usize);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query: Box<dyn Query> = match set_id {
            Some(set_id) => {
                let set_query = TermQuery::new(
                    Term::from_field_text(f.set, set_id),
                    IndexRecordOption::Basic,
                );
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, user_query),
                    (
                        Occur::Must,
                        Box::new(ConstScoreQuery::new(Box::new(set_query), 0.0)),
                    ),
                ]))
            }
            None => user_query,
        };

        let top_docs = searcher.search(&*query, &TopDocs::with_limit(limit))?;

        let mut snippets = SnippetGenerator::create(&searcher, &*query, f.body)?;
        snippets.set_max_num_chars(SNIPPET_MAX_CHARS);

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let snippet = snippets.snippet_from_doc(&doc);
            let snippet = if snippet.fragment().is_empty() {
                leading_text(&extract_text(&doc, f.body), SNIPPET_MAX_CHARS)
            } else {
                snippet.fragment().to_string()
            };
            hits.push(Hit {
                set_id: extract_text(&doc, f.set),
                key: extract_text(&doc, f.key),
                title: extract_text(&doc, f.title),
                score,
                snippet,
            });
        }

        Ok(hits)
    }

    /// Number of committed documents, optionally restricted to one set.
    pub fn count(&self, set_id: Option<&str>) -> Result<usize> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();
        match set_id {
            Some(set_id) => {
                let query = TermQuery::new(
                    Term::from_field_text(self.fields.set, set_id),
                    IndexRecordOption::Basic,
                );
                Ok(searcher.search(&query, &Count)?)
            }
            None => Ok(searcher.num_docs() as usize),
        }
    }
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

fn check_marker(index: &Index, location: &Path) -> Result<()> {
    let metas = index.load_metas()?;
    let marker = metas
        .payload
        .as_deref()
        .and_then(|p| serde_json::from_str::<FormatMarker>(p).ok());

    match marker {
        Some(m) if m.format == FORMAT_NAME && m.version == FORMAT_VERSION => {
            Ok(())
        }
        Some(m) => Err(Error::IncompatibleIndex {
            path: location.to_path_buf(),
            found: format!("{} version {}", m.format, m.version),
        }),
        None => Err(Error::IncompatibleIndex {
            path: location.to_path_buf(),
            found: "no format marker".to_string(),
        }),
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn leading_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
