use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("cannot open database: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index storage error: {0}")]
    Storage(#[from] tantivy::TantivyError),

    #[error("invalid query: {0}")]
    QuerySyntax(#[from] tantivy::query::QueryParserError),

    #[error(
        "index already exists at {}; use `--force` to overwrite it",
        .0.display()
    )]
    AlreadyExists(PathBuf),

    #[error(
        "no index at {}; run `dokang init` first",
        .0.display()
    )]
    NotInitialized(PathBuf),

    #[error("index at {} is not a dokang index (found {found})", path.display())]
    IncompatibleIndex { path: PathBuf, found: String },

    #[error("document from set '{found}' cannot be indexed into set '{expected}'")]
    ForeignDocument { expected: String, found: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}
