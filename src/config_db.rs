use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{document::DocumentSet, error::Result};

/// Set id → JSON-encoded [`DocumentSet`].
const DOC_SETS: TableDefinition<&str, &str> = TableDefinition::new("doc_sets");

/// The registry of declared document sets.
pub struct ConfigDb {
    db: Database,
}

impl ConfigDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure the table exists so read transactions never miss it.
        let txn = db.begin_write()?;
        txn.open_table(DOC_SETS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or replace a document set declaration.
    pub fn set_doc_set(&self, set: &DocumentSet) -> Result<()> {
        let encoded = serde_json::to_string(set)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DOC_SETS)?;
            table.insert(set.id.as_str(), encoded.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_doc_set(&self, id: &str) -> Result<Option<DocumentSet>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOC_SETS)?;
        match table.get(id)? {
            Some(v) => Ok(Some(serde_json::from_str(v.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_doc_set(&self, id: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(DOC_SETS)?;
            table.remove(id)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// All declared sets, ordered by id.
    pub fn list_doc_sets(&self) -> Result<Vec<DocumentSet>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOC_SETS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_k, v) = entry?;
            result.push(serde_json::from_str(v.value())?);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for ConfigDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDb").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, ConfigDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = ConfigDb::open(&tmp.path().join("config.redb")).unwrap();
        (tmp, db)
    }

    #[test]
    fn doc_sets_crud() {
        let (_tmp, db) = test_db();

        assert_eq!(db.list_doc_sets().unwrap(), vec![]);
        assert_eq!(db.get_doc_set("docs").unwrap(), None);

        let mut set = DocumentSet::new("docs", "/srv/docs/html");
        set.ignore = vec!["_static/**".into()];
        set.content_selector = Some("div.body".into());
        db.set_doc_set(&set).unwrap();
        assert_eq!(db.get_doc_set("docs").unwrap(), Some(set.clone()));

        assert!(db.remove_doc_set("docs").unwrap());
        assert!(!db.remove_doc_set("docs").unwrap());
        assert_eq!(db.get_doc_set("docs").unwrap(), None);
    }

    #[test]
    fn set_replaces_existing() {
        let (_tmp, db) = test_db();

        db.set_doc_set(&DocumentSet::new("docs", "/old")).unwrap();
        db.set_doc_set(&DocumentSet::new("docs", "/new")).unwrap();

        let sets = db.list_doc_sets().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].root(), Path::new("/new"));
    }

    #[test]
    fn list_is_ordered_by_id() {
        let (_tmp, db) = test_db();

        for id in ["zeta", "alpha", "mid"] {
            db.set_doc_set(&DocumentSet::new(id, "/x")).unwrap();
        }
        let ids: Vec<_> =
            db.list_doc_sets().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.redb");

        {
            let db = ConfigDb::open(&path).unwrap();
            db.set_doc_set(&DocumentSet::new("docs", "/path/to/docs"))
                .unwrap();
        }

        {
            let db = ConfigDb::open(&path).unwrap();
            assert_eq!(
                db.get_doc_set("docs").unwrap().unwrap().root(),
                Path::new("/path/to/docs")
            );
        }
    }
}
