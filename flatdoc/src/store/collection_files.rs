use crate::common::{
    is_valid_collection_name, Value, COLLECTION_FILE_SUFFIX, EQUALITY_INDEX_SUFFIX, INDEX_DIR_NAME,
    RANGE_INDEX_SUFFIX, TEMP_FILE_SUFFIX,
};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};
use crate::index::IndexKind;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// An index file found in the index directory of a collection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PersistedIndex {
    pub(crate) field: String,
    pub(crate) kind: IndexKind,
    pub(crate) path: PathBuf,
}

/// On-disk layout of one collection `C` inside database directory `D`:
///
/// - `D/C.json` holds the document table,
/// - `D/indexes/C.<field>.index.json` holds an equality index,
/// - `D/indexes/C.<field>.btree.json` holds a range index.
///
/// Every file is written whole: content goes to a sibling `.tmp` file which
/// is then renamed over the target.
#[derive(Debug, Clone)]
pub(crate) struct CollectionFiles {
    name: String,
    db_path: PathBuf,
    collection_file: PathBuf,
    index_dir: PathBuf,
    pretty_print: bool,
}

impl CollectionFiles {
    pub(crate) fn new(db_path: &Path, name: &str, pretty_print: bool) -> Self {
        CollectionFiles {
            name: name.to_string(),
            db_path: db_path.to_path_buf(),
            collection_file: db_path.join(format!("{}{}", name, COLLECTION_FILE_SUFFIX)),
            index_dir: db_path.join(INDEX_DIR_NAME),
            pretty_print,
        }
    }

    #[cfg(test)]
    pub(crate) fn collection_file(&self) -> &Path {
        &self.collection_file
    }

    #[cfg(test)]
    pub(crate) fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub(crate) fn ensure_dirs(&self) -> FlatDocResult<()> {
        fs::create_dir_all(&self.db_path).map_err(|e| {
            log::error!(
                "Failed to create database directory {:?}: {}",
                self.db_path,
                e
            );
            FlatDocError::from(e)
        })?;
        fs::create_dir_all(&self.index_dir).map_err(|e| {
            log::error!(
                "Failed to create index directory {:?}: {}",
                self.index_dir,
                e
            );
            FlatDocError::from(e)
        })?;
        Ok(())
    }

    pub(crate) fn index_path(&self, field: &str, kind: IndexKind) -> PathBuf {
        let suffix = match kind {
            IndexKind::Equality => EQUALITY_INDEX_SUFFIX,
            IndexKind::Range => RANGE_INDEX_SUFFIX,
        };
        let file_name = format!("{}.{}{}", self.name, field, suffix);
        self.index_dir.join(file_name)
    }

    /// Reads the document table, `None` when the file does not exist.
    pub(crate) fn read_documents(&self) -> FlatDocResult<Option<Value>> {
        read_value(&self.collection_file)
    }

    pub(crate) fn write_documents(&self, value: &Value) -> FlatDocResult<()> {
        write_value(&self.collection_file, value, self.pretty_print)
    }

    pub(crate) fn read_index(&self, index: &PersistedIndex) -> FlatDocResult<Option<Value>> {
        read_value(&index.path)
    }

    pub(crate) fn write_index(
        &self,
        field: &str,
        kind: IndexKind,
        value: &Value,
    ) -> FlatDocResult<()> {
        write_value(&self.index_path(field, kind), value, self.pretty_print)
    }

    /// Deletes the file of an index, ignoring a file that is already gone.
    pub(crate) fn remove_index(&self, field: &str, kind: IndexKind) -> FlatDocResult<()> {
        let path = self.index_path(field, kind);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                log::error!("Failed to remove index file {:?}: {}", path, e);
                Err(e.into())
            }
        }
    }

    /// Lists the index files that belong to this collection, sorted by file
    /// name. A missing index directory yields no indexes.
    pub(crate) fn list_indexes(&self) -> FlatDocResult<Vec<PersistedIndex>> {
        let entries = match fs::read_dir(&self.index_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                log::error!("Failed to read index directory {:?}: {}", self.index_dir, e);
                return Err(e.into());
            }
        };

        let prefix = format!("{}.", self.name);
        let mut indexes = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = match file_name.to_str() {
                Some(name) => name,
                None => {
                    log::warn!("Skipping index file with non UTF-8 name {:?}", file_name);
                    continue;
                }
            };

            let rest = match file_name.strip_prefix(&prefix) {
                Some(rest) => rest,
                None => continue,
            };

            let parsed = if let Some(field) = rest.strip_suffix(EQUALITY_INDEX_SUFFIX) {
                Some((field, IndexKind::Equality))
            } else {
                rest.strip_suffix(RANGE_INDEX_SUFFIX)
                    .map(|field| (field, IndexKind::Range))
            };

            if let Some((field, kind)) = parsed {
                if field.is_empty() {
                    log::warn!("Skipping index file {} without a field name", file_name);
                    continue;
                }
                indexes.push(PersistedIndex {
                    field: field.to_string(),
                    kind,
                    path: entry.path(),
                });
            }
        }

        indexes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(indexes)
    }
}

/// Names of the collections persisted directly inside `db_path`. Files whose
/// stem is not a valid collection name are ignored.
pub(crate) fn collection_names(db_path: &Path) -> FlatDocResult<Vec<String>> {
    let entries = match fs::read_dir(db_path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry
            .file_name()
            .to_str()
            .and_then(|n| n.strip_suffix(COLLECTION_FILE_SUFFIX))
        {
            if is_valid_collection_name(name) {
                names.push(name.to_string());
            } else {
                log::debug!(
                    "Ignoring {}{} in {:?}",
                    name,
                    COLLECTION_FILE_SUFFIX,
                    db_path
                );
            }
        }
    }
    names.sort();
    Ok(names)
}

fn read_value(path: &Path) -> FlatDocResult<Option<Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            log::error!("Failed to read {:?}: {}", path, e);
            return Err(e.into());
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::error!("Malformed content in {:?}: {}", path, e);
            Err(FlatDocError::new_with_cause(
                &format!("Failed to parse {}", path.display()),
                ErrorKind::EncodingError,
                e.into(),
            ))
        }
    }
}

fn write_value(path: &Path, value: &Value, pretty_print: bool) -> FlatDocResult<()> {
    let mut content = if pretty_print {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    content.push('\n');

    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(TEMP_FILE_SUFFIX);
    let temp_path = PathBuf::from(temp_name);

    let result = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.flush()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    result.map_err(|e| {
        log::error!("Failed to write {:?}: {}", path, e);
        let _ = fs::remove_file(&temp_path);
        FlatDocError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn files(dir: &Path) -> CollectionFiles {
        let files = CollectionFiles::new(dir, "users", true);
        files.ensure_dirs().unwrap();
        files
    }

    #[test]
    fn layout_matches_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(dir.path());
        assert_eq!(files.collection_file(), dir.path().join("users.json"));
        assert_eq!(files.index_dir(), dir.path().join("indexes"));
        assert_eq!(
            files.index_path("age", IndexKind::Range),
            dir.path().join("indexes").join("users.age.btree.json")
        );
        assert_eq!(
            files.index_path("tag", IndexKind::Equality),
            dir.path().join("indexes").join("users.tag.index.json")
        );
    }

    #[test]
    fn missing_files_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let files = CollectionFiles::new(&dir.path().join("nowhere"), "users", true);
        assert!(files.read_documents().unwrap().is_none());
        assert!(files.list_indexes().unwrap().is_empty());
    }

    #[test]
    fn documents_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(dir.path());
        let value = Value::from(doc! { "1": { "_id": "1", age: 30 } });
        files.write_documents(&value).unwrap();
        assert_eq!(files.read_documents().unwrap(), Some(value));

        let text = fs::read_to_string(files.collection_file()).unwrap();
        assert!(text.contains("\n  \"1\""));
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[test]
    fn compact_output_when_not_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let files = CollectionFiles::new(dir.path(), "users", false);
        files.ensure_dirs().unwrap();
        files.write_documents(&Value::from(doc! { a: 1 })).unwrap();
        let text = fs::read_to_string(files.collection_file()).unwrap();
        assert_eq!(text, "{\"a\":1}\n");
    }

    #[test]
    fn malformed_content_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(dir.path());
        fs::write(files.collection_file(), "{ broken").unwrap();
        let err = files.read_documents().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EncodingError);
        assert!(err.cause().is_some());
    }

    #[test]
    fn list_indexes_only_returns_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(dir.path());
        let empty = Value::from(doc! {});
        for (field, kind) in [("tag", IndexKind::Equality), ("age", IndexKind::Range)] {
            files.write_index(field, kind, &empty).unwrap();
        }
        let index_dir = files.index_dir();
        let strays = [
            "orders.total.btree.json",
            "users.notes.txt",
            "users..index.json",
        ];
        for stray in strays {
            fs::write(index_dir.join(stray), "{}").unwrap();
        }

        let indexes = files.list_indexes().unwrap();
        let found: Vec<(String, IndexKind)> =
            indexes.into_iter().map(|i| (i.field, i.kind)).collect();
        assert_eq!(
            found,
            vec![
                ("age".to_string(), IndexKind::Range),
                ("tag".to_string(), IndexKind::Equality),
            ]
        );
    }

    #[test]
    fn dotted_field_index_belongs_to_the_undotted_collection() {
        let dir = tempfile::tempdir().unwrap();
        let users = CollectionFiles::new(dir.path(), "a", true);
        users.ensure_dirs().unwrap();
        users
            .write_index("b.x", IndexKind::Equality, &Value::from(doc! {}))
            .unwrap();

        let indexes = users.list_indexes().unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].field, "b.x");
        assert_eq!(
            indexes[0].path,
            dir.path().join("indexes").join("a.b.x.index.json")
        );
    }

    #[test]
    fn remove_index_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(dir.path());
        files
            .write_index("tag", IndexKind::Equality, &Value::from(doc! {}))
            .unwrap();
        files.remove_index("tag", IndexKind::Equality).unwrap();
        assert!(!files.index_path("tag", IndexKind::Equality).exists());
        files.remove_index("tag", IndexKind::Equality).unwrap();
    }

    #[test]
    fn collection_names_lists_top_level_json_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["users", "orders"] {
            let files = CollectionFiles::new(dir.path(), name, true);
            files.write_documents(&Value::from(doc! {})).unwrap();
        }
        fs::write(dir.path().join("readme.txt"), "").unwrap();
        let archive = dir.path().join("users.archive.json");
        fs::write(archive, "{}").unwrap();

        let names = collection_names(dir.path()).unwrap();
        assert_eq!(names, vec!["orders", "users"]);
        let missing = dir.path().join("missing");
        assert!(collection_names(&missing).unwrap().is_empty());
    }
}
