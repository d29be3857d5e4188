use super::operation::{IndexOperations, ReadOperations, WriteOperations};
use super::{Document, IdGenerator};
use crate::common::{validate_collection_name, Value};
use crate::database::CollectionRegistration;
use crate::database_config::DatabaseConfig;
use crate::errors::FlatDocResult;
use crate::index::{EqualityIndex, IndexDescriptor, IndexKind, OrderedIndex};
use crate::query::{DefaultQueryEvaluator, QueryEvaluator};
use crate::store::{CollectionFiles, KeyedTable};
use crate::ID_GENERATOR;
use std::path::Path;
use std::sync::Arc;

/// A named set of documents persisted as flat JSON files.
///
/// A collection `C` of database directory `D` lives in `D/C.json`, with its
/// secondary indexes under `D/indexes/`. Opening a collection loads every
/// one of those files; [`Collection::save`] writes the documents and the
/// equality indexes back, and so does dropping the collection unless the
/// configuration disables it. A range index is written once, when it is
/// created.
///
/// Every operation runs to completion on the calling thread. A collection
/// has a single owner; mutating operations take `&mut self`.
///
/// # Examples
///
/// ```rust,no_run
/// use flatdoc::collection::Collection;
/// use flatdoc::common::Value;
/// use flatdoc::doc;
///
/// let mut people = Collection::open("./data", "people")?;
/// let mut alice = Value::from(doc! { name: "Alice", age: 30 });
/// let id = people.insert(&mut alice)?;
///
/// people.create_index("age")?;
/// let found = people.find(&doc! { age: { "$gt": 20 } })?;
/// assert_eq!(found[0].id(), Some(id.as_str()));
/// # Ok::<(), flatdoc::errors::FlatDocError>(())
/// ```
///
/// # Known limitation
///
/// [`Collection::remove`] scrubs removed documents from equality indexes but
/// not from range indexes. The postings of a removed document stay in the
/// [`OrderedIndex`] (see [`Collection::range_index`]) until the index is
/// created again; `find` skips them because the document is gone from the
/// table.
pub struct Collection {
    name: String,
    files: CollectionFiles,
    documents: KeyedTable<Document>,
    index_operations: IndexOperations,
    read_operations: ReadOperations,
    write_operations: WriteOperations,
    save_on_drop: bool,
    registration: Option<CollectionRegistration>,
}

impl Collection {
    /// Opens collection `name` in directory `db_path` with the default
    /// configuration.
    pub fn open(db_path: impl AsRef<Path>, name: &str) -> FlatDocResult<Self> {
        Self::open_with_config(&DatabaseConfig::with_path(db_path), name)
    }

    /// Opens collection `name` in the directory of `config`, creating the
    /// directories if needed and loading whatever was persisted.
    ///
    /// A missing document file or index directory is an empty collection;
    /// malformed persisted content fails the open.
    pub fn open_with_config(config: &DatabaseConfig, name: &str) -> FlatDocResult<Self> {
        config.validate()?;
        validate_collection_name(name)?;

        let files = CollectionFiles::new(config.db_path(), name, config.pretty_print());
        files.ensure_dirs()?;

        let mut documents =
            KeyedTable::with_layout(config.initial_bucket_count(), config.max_load_factor());
        if let Some(value) = files.read_documents()? {
            documents.deserialize(&value)?;
        }

        let mut index_operations = IndexOperations::new(name, config);
        index_operations.load(&files)?;

        let evaluator: Arc<dyn QueryEvaluator> = Arc::new(DefaultQueryEvaluator::new());
        let id_generator: Arc<dyn IdGenerator> = ID_GENERATOR.clone();

        log::info!(
            "Opened collection {} with {} documents and {} indexes",
            name,
            documents.size(),
            index_operations.list_indexes().len()
        );

        Ok(Collection {
            name: name.to_string(),
            files,
            documents,
            index_operations,
            read_operations: ReadOperations::new(name, evaluator),
            write_operations: WriteOperations::new(name, id_generator),
            save_on_drop: config.save_on_drop(),
            registration: None,
        })
    }

    /// Replaces the evaluator used for queries no index serves.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn QueryEvaluator>) -> Self {
        self.read_operations.set_evaluator(evaluator);
        self
    }

    /// Replaces the generator of document ids.
    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.write_operations.set_id_generator(id_generator);
        self
    }

    pub(crate) fn set_registration(&mut self, registration: CollectionRegistration) {
        self.registration = Some(registration);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents.
    pub fn size(&self) -> usize {
        self.documents.size()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Inserts an object-shaped value and returns its new id.
    ///
    /// The value is stamped with the `_id` it is stored under. Any other
    /// value fails with [`ErrorKind::InvalidDocument`](crate::errors::ErrorKind)
    /// and leaves the collection untouched.
    pub fn insert(&mut self, document: &mut Value) -> FlatDocResult<String> {
        self.write_operations
            .insert(&mut self.documents, &mut self.index_operations, document)
    }

    /// Inserts a document and returns its new id, stamping `_id` on it.
    pub fn insert_document(&mut self, document: &mut Document) -> FlatDocResult<String> {
        let mut value = Value::Document(std::mem::take(document));
        let result = self.insert(&mut value);
        if let Value::Document(stamped) = value {
            *document = stamped;
        }
        result
    }

    /// Documents matching `query`.
    ///
    /// A query on one field with an index on that field is answered by the
    /// index:
    ///
    /// - a range index serves `{$eq: n}`, `{$gt: n}`, `{$lt: n}` and
    ///   `{$gt: a, $lt: b}` with numeric operands, as long as it finds at
    ///   least one id; otherwise the table is scanned,
    /// - an equality index serves a bare value or `{$eq: v}` whose bucket
    ///   exists, and `{$in: [..]}` always.
    ///
    /// Every other query is evaluated against each stored document in table
    /// order.
    pub fn find(&self, query: &Document) -> FlatDocResult<Vec<Document>> {
        self.read_operations
            .find(&self.documents, &self.index_operations, query)
    }

    /// Every stored document, in table order.
    pub fn find_all(&self) -> Vec<Document> {
        self.documents.values().cloned().collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Document> {
        self.documents.get(id).cloned()
    }

    /// Removes the documents matching `query` and returns how many were
    /// removed. See the known limitation on range indexes.
    pub fn remove(&mut self, query: &Document) -> FlatDocResult<usize> {
        let found = self.find(query)?;
        self.write_operations
            .remove(&mut self.documents, &mut self.index_operations, found)
    }

    /// Builds an index on `field` and writes it to disk right away.
    ///
    /// If any stored document holds a number in `field` the index is a range
    /// index over every numeric value, otherwise an equality index over every
    /// value. An existing index on `field` is replaced.
    pub fn create_index(&mut self, field: &str) -> FlatDocResult<IndexKind> {
        self.index_operations
            .create_index(field, &self.documents, &self.files)
    }

    pub fn has_index(&self, field: &str) -> bool {
        self.index_kind(field).is_some()
    }

    pub fn index_kind(&self, field: &str) -> Option<IndexKind> {
        self.index_operations.index_kind(field)
    }

    /// Indexes of this collection, sorted by field.
    pub fn list_indexes(&self) -> Vec<IndexDescriptor> {
        self.index_operations.list_indexes()
    }

    /// Read access to the range index on `field`.
    pub fn range_index(&self, field: &str) -> Option<&OrderedIndex> {
        self.index_operations.range_index(field)
    }

    /// Read access to the equality index on `field`.
    pub fn equality_index(&self, field: &str) -> Option<&EqualityIndex> {
        self.index_operations.equality_index(field)
    }

    /// Writes the document table and every equality index.
    pub fn save(&self) -> FlatDocResult<()> {
        self.files.write_documents(&self.documents.serialize()?)?;
        self.index_operations.save(&self.files)?;
        log::info!(
            "Saved collection {} with {} documents",
            self.name,
            self.documents.size()
        );
        Ok(())
    }
}

impl Drop for Collection {
    fn drop(&mut self) {
        if self.save_on_drop {
            if let Err(e) = self.save() {
                log::error!("Failed to save collection {} on drop: {}", self.name, e);
            }
        }
    }
}
