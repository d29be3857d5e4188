use crate::collection::Collection;
use crate::common::{validate_collection_name, INDEX_DIR_NAME};
use crate::database_builder::DatabaseBuilder;
use crate::database_config::DatabaseConfig;
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};
use crate::store::collection_names;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

/// Handle on a database directory and the collections stored in it.
///
/// Cloning a `Database` is cheap; all clones share the same configuration
/// and the same set of open collections. A collection name can only be open
/// once at a time through a database; the name is released when the
/// [`Collection`] is dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use flatdoc::database::Database;
/// use flatdoc::doc;
///
/// let db = Database::builder().db_path("./data").open()?;
/// let mut users = db.collection("users")?;
/// users.insert_document(&mut doc! { name: "Alice" })?;
/// # Ok::<(), flatdoc::errors::FlatDocError>(())
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    config: DatabaseConfig,
    open_collections: Arc<Mutex<HashSet<String>>>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Opens the database described by `config`, creating its directory and
    /// index directory when missing.
    pub fn open(config: DatabaseConfig) -> FlatDocResult<Self> {
        config.validate()?;

        let index_dir = config.db_path().join(INDEX_DIR_NAME);
        fs::create_dir_all(&index_dir).map_err(|e| {
            log::error!("Failed to create database directory {:?}: {}", index_dir, e);
            FlatDocError::from(e)
        })?;

        log::info!("Opened database at {:?}", config.db_path());
        Ok(Database {
            inner: Arc::new(DatabaseInner {
                config,
                open_collections: Arc::new(Mutex::new(HashSet::new())),
            }),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Opens collection `name`, loading what was persisted for it.
    ///
    /// Fails with [`ErrorKind::InvalidOperation`] while another `Collection`
    /// for the same name obtained from this database is alive.
    pub fn collection(&self, name: &str) -> FlatDocResult<Collection> {
        validate_collection_name(name)?;

        {
            let mut open = self.inner.open_collections.lock();
            if !open.insert(name.to_string()) {
                log::error!("Collection {} is already open", name);
                return Err(FlatDocError::new(
                    &format!("Collection {} is already open", name),
                    ErrorKind::InvalidOperation,
                ));
            }
        }

        let registration = CollectionRegistration {
            name: name.to_string(),
            open_collections: Arc::clone(&self.inner.open_collections),
        };

        let mut collection = Collection::open_with_config(&self.inner.config, name)?;
        collection.set_registration(registration);
        Ok(collection)
    }

    /// Names of the collections persisted in the database directory, sorted.
    pub fn collection_names(&self) -> FlatDocResult<Vec<String>> {
        collection_names(self.inner.config.db_path())
    }

    /// Whether `name` is persisted or currently open.
    pub fn has_collection(&self, name: &str) -> FlatDocResult<bool> {
        if self.is_open(name) {
            return Ok(true);
        }
        Ok(self.collection_names()?.iter().any(|n| n == name))
    }

    /// Whether a `Collection` for `name` obtained from this database is alive.
    pub fn is_open(&self, name: &str) -> bool {
        self.inner.open_collections.lock().contains(name)
    }
}

/// Releases a collection name when the owning [`Collection`] is dropped.
pub(crate) struct CollectionRegistration {
    name: String,
    open_collections: Arc<Mutex<HashSet<String>>>,
}

impl Drop for CollectionRegistration {
    fn drop(&mut self) {
        self.open_collections.lock().remove(&self.name);
        log::debug!("Released collection {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn open(dir: &std::path::Path) -> Database {
        let config = DatabaseConfig::with_path(dir.join("db"));
        Database::open(config).unwrap()
    }

    #[test]
    fn open_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());
        assert!(dir.path().join("db").join("indexes").is_dir());
        assert_eq!(db.config().db_path(), dir.path().join("db"));
        assert!(db.collection_names().unwrap().is_empty());
    }

    #[test]
    fn collection_name_is_exclusive_while_open() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());
        let users = db.collection("users").unwrap();
        assert!(db.is_open("users"));

        let err = db.collection("users").err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
        let clone = db.clone();
        assert!(clone.collection("users").is_err());

        drop(users);
        assert!(!db.is_open("users"));
        assert!(db.collection("users").is_ok());
    }

    #[test]
    fn failed_open_releases_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());
        let file = dir.path().join("db").join("users.json");
        fs::write(file, "not json").unwrap();
        assert_eq!(
            db.collection("users").err().unwrap().kind(),
            &ErrorKind::EncodingError
        );
        assert!(!db.is_open("users"));
    }

    #[test]
    fn lists_saved_collections() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());
        {
            let mut orders = db.collection("orders").unwrap();
            orders.insert_document(&mut doc! { total: 10 }).unwrap();
            let _users = db.collection("users").unwrap();
            assert!(db.has_collection("users").unwrap());
        }
        assert_eq!(db.collection_names().unwrap(), vec!["orders", "users"]);
        assert!(db.has_collection("orders").unwrap());
        assert!(!db.has_collection("missing").unwrap());
    }

    #[test]
    fn invalid_collection_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());
        assert_eq!(
            db.collection(".hidden").err().unwrap().kind(),
            &ErrorKind::InvalidCollectionName
        );
        assert!(!db.is_open(".hidden"));
    }

    #[test]
    fn open_rejects_invalid_config() {
        let config: DatabaseConfig = serde_json::from_str(r#"{"btree_min_degree": 1}"#).unwrap();
        assert_eq!(
            Database::open(config).err().unwrap().kind(),
            &ErrorKind::ValidationError
        );
    }
}
