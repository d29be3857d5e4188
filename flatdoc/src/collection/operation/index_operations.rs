use crate::collection::Document;
use crate::common::validate_field_name;
use crate::database_config::DatabaseConfig;
use crate::errors::FlatDocResult;
use crate::index::{EqualityIndex, IndexDescriptor, IndexKind, OrderedIndex};
use crate::store::{CollectionFiles, KeyedTable};
use indexmap::IndexMap;

/// Owns the secondary indexes of a collection and keeps them in step with
/// the document table.
///
/// A field is a key of at most one of the two maps.
pub(crate) struct IndexOperations {
    collection_name: String,
    equality_indexes: IndexMap<String, EqualityIndex>,
    range_indexes: IndexMap<String, OrderedIndex>,
    min_degree: usize,
    initial_bucket_count: usize,
    max_load_factor: f64,
}

impl IndexOperations {
    pub(crate) fn new(collection_name: &str, config: &DatabaseConfig) -> Self {
        IndexOperations {
            collection_name: collection_name.to_string(),
            equality_indexes: IndexMap::new(),
            range_indexes: IndexMap::new(),
            min_degree: config.btree_min_degree(),
            initial_bucket_count: config.initial_bucket_count(),
            max_load_factor: config.max_load_factor(),
        }
    }

    fn new_equality_index(&self) -> EqualityIndex {
        EqualityIndex::with_layout(self.initial_bucket_count, self.max_load_factor)
    }

    /// Loads every index file of the collection.
    pub(crate) fn load(&mut self, files: &CollectionFiles) -> FlatDocResult<()> {
        for persisted in files.list_indexes()? {
            let value = match files.read_index(&persisted)? {
                Some(value) => value,
                None => continue,
            };

            match persisted.kind {
                IndexKind::Equality => {
                    let mut index = self.new_equality_index();
                    index.deserialize(&value)?;
                    self.install_equality(&persisted.field, index);
                }
                IndexKind::Range => {
                    let index = OrderedIndex::from_value(&value, self.min_degree)?;
                    self.install_range(&persisted.field, index);
                }
            }
            log::debug!(
                "Loaded {} index on '{}' for collection {}",
                persisted.kind,
                persisted.field,
                self.collection_name
            );
        }
        Ok(())
    }

    /// Writes every equality index. Range indexes are only written when
    /// they are created.
    pub(crate) fn save(&self, files: &CollectionFiles) -> FlatDocResult<()> {
        for (field, index) in &self.equality_indexes {
            let value = index.serialize()?;
            files.write_index(field, IndexKind::Equality, &value)?;
        }
        Ok(())
    }

    fn install_equality(&mut self, field: &str, index: EqualityIndex) {
        if self.range_indexes.shift_remove(field).is_some() {
            log::warn!(
                "Replacing range index on '{}' with an equality index",
                field
            );
        }
        self.equality_indexes.insert(field.to_string(), index);
    }

    fn install_range(&mut self, field: &str, index: OrderedIndex) {
        if self.equality_indexes.shift_remove(field).is_some() {
            log::warn!("Replacing equality index on '{}' with a range index", field);
        }
        self.range_indexes.insert(field.to_string(), index);
    }

    /// Adds a freshly stored document to every index whose field it holds.
    /// Range indexes only take numeric values.
    pub(crate) fn index_document(&mut self, document: &Document, id: &str) -> FlatDocResult<()> {
        for (field, index) in self.equality_indexes.iter_mut() {
            if let Some(value) = document.get_path(field) {
                index.add(value, id)?;
            }
        }
        for (field, index) in self.range_indexes.iter_mut() {
            if let Some(key) = numeric_value(document, field) {
                index.insert(key, id);
            }
        }
        Ok(())
    }

    /// Scrubs a removed document out of the equality indexes. Range indexes
    /// keep its postings.
    pub(crate) fn unindex_document(&mut self, document: &Document, id: &str) -> FlatDocResult<()> {
        for (field, index) in self.equality_indexes.iter_mut() {
            if let Some(value) = document.get_path(field) {
                index.scrub(value, id)?;
            }
        }
        Ok(())
    }

    /// Builds and persists an index on `field`, replacing any index it had.
    ///
    /// The index is a range index when at least one document holds a number
    /// in `field`, an equality index otherwise.
    pub(crate) fn create_index(
        &mut self,
        field: &str,
        documents: &KeyedTable<Document>,
        files: &CollectionFiles,
    ) -> FlatDocResult<IndexKind> {
        validate_field_name(field)?;

        let numeric = documents
            .values()
            .any(|document| numeric_value(document, field).is_some());

        let kind = if numeric {
            let mut index = OrderedIndex::new(self.min_degree);
            for (id, document) in documents.iter() {
                if let Some(key) = numeric_value(document, field) {
                    index.insert(key, id);
                }
            }
            let value = index.serialize()?;
            files.write_index(field, IndexKind::Range, &value)?;
            files.remove_index(field, IndexKind::Equality)?;
            self.install_range(field, index);
            IndexKind::Range
        } else {
            let mut index = self.new_equality_index();
            for (id, document) in documents.iter() {
                if let Some(value) = document.get_path(field) {
                    index.add(value, id)?;
                }
            }
            let value = index.serialize()?;
            files.write_index(field, IndexKind::Equality, &value)?;
            files.remove_index(field, IndexKind::Range)?;
            self.install_equality(field, index);
            IndexKind::Equality
        };

        log::info!(
            "Created {} index on '{}' for collection {}",
            kind,
            field,
            self.collection_name
        );
        Ok(kind)
    }

    pub(crate) fn equality_index(&self, field: &str) -> Option<&EqualityIndex> {
        self.equality_indexes.get(field)
    }

    pub(crate) fn range_index(&self, field: &str) -> Option<&OrderedIndex> {
        self.range_indexes.get(field)
    }

    pub(crate) fn index_kind(&self, field: &str) -> Option<IndexKind> {
        if self.range_indexes.contains_key(field) {
            Some(IndexKind::Range)
        } else if self.equality_indexes.contains_key(field) {
            Some(IndexKind::Equality)
        } else {
            None
        }
    }

    pub(crate) fn list_indexes(&self) -> Vec<IndexDescriptor> {
        let mut descriptors: Vec<IndexDescriptor> = self
            .equality_indexes
            .keys()
            .map(|field| IndexDescriptor::new(field, IndexKind::Equality))
            .chain(
                self.range_indexes
                    .keys()
                    .map(|field| IndexDescriptor::new(field, IndexKind::Range)),
            )
            .collect();
        descriptors.sort();
        descriptors
    }
}

/// The value at `field`, a dotted path, as a range index key if it is a
/// finite number.
pub(crate) fn numeric_value(document: &Document, field: &str) -> Option<f64> {
    document
        .get_path(field)
        .filter(|value| value.is_number())
        .and_then(|value| value.as_f64())
        .filter(|key| key.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;
    use crate::doc;
    use crate::errors::ErrorKind;

    fn table(documents: Vec<Document>) -> KeyedTable<Document> {
        let mut table = KeyedTable::new();
        for (i, mut document) in documents.into_iter().enumerate() {
            let id = format!("{}", i + 1);
            document.set_id(&id);
            table.put(&id, document);
        }
        table
    }

    fn setup(dir: &std::path::Path) -> (IndexOperations, CollectionFiles) {
        let config = DatabaseConfig::with_path(dir);
        let files = CollectionFiles::new(dir, "people", true);
        files.ensure_dirs().unwrap();
        (IndexOperations::new("people", &config), files)
    }

    #[test]
    fn numeric_field_gets_a_range_index() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        let documents = table(vec![
            doc! { age: "unknown" },
            doc! { age: 30 },
            doc! { age: 45.5 },
        ]);

        let kind = ops.create_index("age", &documents, &files).unwrap();
        assert_eq!(kind, IndexKind::Range);
        let index = ops.range_index("age").unwrap();
        assert_eq!(index.search(30.0), vec!["2"]);
        assert_eq!(index.len(), 2);
        assert!(files.index_path("age", IndexKind::Range).exists());
    }

    #[test]
    fn other_fields_get_an_equality_index() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        let documents = table(vec![
            doc! { tag: "x" },
            doc! { tag: true },
            doc! { other: 1 },
        ]);

        let kind = ops.create_index("tag", &documents, &files).unwrap();
        assert_eq!(kind, IndexKind::Equality);
        let index = ops.equality_index("tag").unwrap();
        let first = vec!["1".to_string()];
        let second = vec!["2".to_string()];
        assert_eq!(index.lookup(&Value::from("x")).unwrap(), Some(&first));
        assert_eq!(index.lookup(&Value::from(true)).unwrap(), Some(&second));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn recreating_switches_kind_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        let mut documents = table(vec![doc! { score: "high" }]);
        ops.create_index("score", &documents, &files).unwrap();

        documents.put("9", doc! { "_id": "9", score: 7 });
        let kind = ops.create_index("score", &documents, &files).unwrap();
        assert_eq!(kind, IndexKind::Range);
        assert_eq!(ops.index_kind("score"), Some(IndexKind::Range));
        assert!(ops.equality_index("score").is_none());
        assert!(!files.index_path("score", IndexKind::Equality).exists());
        let descriptor = IndexDescriptor::new("score", IndexKind::Range);
        assert_eq!(ops.list_indexes(), vec![descriptor]);
    }

    #[test]
    fn maintenance_on_insert_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        let documents = table(vec![doc! { age: 30, tag: "x" }]);
        ops.create_index("age", &documents, &files).unwrap();
        ops.create_index("tag", &documents, &files).unwrap();

        let added = doc! { "_id": "7", age: 45, tag: "x" };
        ops.index_document(&added, "7").unwrap();
        assert_eq!(ops.range_index("age").unwrap().search(45.0), vec!["7"]);
        let tag = Value::from("x");
        let bucket = ops.equality_index("tag").unwrap().lookup(&tag).unwrap();
        assert_eq!(bucket.map(Vec::len), Some(2));

        ops.unindex_document(&added, "7").unwrap();
        let bucket = ops.equality_index("tag").unwrap().lookup(&tag).unwrap();
        assert_eq!(bucket, Some(&vec!["1".to_string()]));
        assert_eq!(ops.range_index("age").unwrap().search(45.0), vec!["7"]);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        let documents = table(vec![
            doc! { age: 30, tag: "x" },
            doc! { age: 31, tag: "y" },
        ]);
        ops.create_index("age", &documents, &files).unwrap();
        ops.create_index("tag", &documents, &files).unwrap();
        ops.save(&files).unwrap();

        let (mut loaded, _) = setup(dir.path());
        loaded.load(&files).unwrap();
        assert_eq!(loaded.list_indexes(), ops.list_indexes());
        assert_eq!(loaded.range_index("age").unwrap().search(31.0), vec!["2"]);
        let tags = loaded.equality_index("tag").unwrap();
        let bucket = tags.lookup(&Value::from("y")).unwrap();
        assert_eq!(bucket, Some(&vec!["2".to_string()]));
    }

    #[test]
    fn corrupted_index_file_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        std::fs::write(
            files.index_path("age", IndexKind::Range),
            r#"{"leaf": true, "keys": [1, 2], "ids": []}"#,
        )
        .unwrap();
        let err = ops.load(&files).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IndexCorrupted);
    }

    #[test]
    fn invalid_field_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ops, files) = setup(dir.path());
        let documents = KeyedTable::new();
        let err = ops.create_index("a/b", &documents, &files).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidFieldName);
    }
}
