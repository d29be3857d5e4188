use super::IndexOperations;
use crate::collection::{Document, IdGenerator};
use crate::common::Value;
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};
use crate::store::KeyedTable;
use std::sync::Arc;

/// Inserts and removes documents, fanning every change out to the indexes.
pub(crate) struct WriteOperations {
    collection_name: String,
    id_generator: Arc<dyn IdGenerator>,
}

impl WriteOperations {
    pub(crate) fn new(collection_name: &str, id_generator: Arc<dyn IdGenerator>) -> Self {
        WriteOperations {
            collection_name: collection_name.to_string(),
            id_generator,
        }
    }

    pub(crate) fn set_id_generator(&mut self, id_generator: Arc<dyn IdGenerator>) {
        self.id_generator = id_generator;
    }

    /// Stamps a fresh `_id` on `document`, stores it and indexes it.
    pub(crate) fn insert(
        &self,
        documents: &mut KeyedTable<Document>,
        indexes: &mut IndexOperations,
        document: &mut Value,
    ) -> FlatDocResult<String> {
        let type_name = document.type_name();
        let document = document.as_document_mut().ok_or_else(|| {
            log::error!(
                "Cannot insert {} into collection {}",
                type_name,
                self.collection_name
            );
            FlatDocError::new(
                &format!("Document must be an object, found {}", type_name),
                ErrorKind::InvalidDocument,
            )
        })?;

        let id = self.id_generator.generate_id();
        if id.is_empty() || documents.contains_key(&id) {
            log::error!("Generated id '{}' is empty or already in use", id);
            return Err(FlatDocError::new(
                &format!("Generated id '{}' is empty or already in use", id),
                ErrorKind::InvalidId,
            ));
        }

        document.set_id(&id);
        documents.put(&id, document.clone());
        indexes.index_document(document, &id)?;
        Ok(id)
    }

    /// Removes `found` documents from the table and scrubs them from the
    /// equality indexes. Returns how many were actually in the table.
    pub(crate) fn remove(
        &self,
        documents: &mut KeyedTable<Document>,
        indexes: &mut IndexOperations,
        found: Vec<Document>,
    ) -> FlatDocResult<usize> {
        let mut removed = 0;
        for document in found {
            let id = match document.id() {
                Some(id) => id,
                None => continue,
            };
            if documents.remove(id) {
                removed += 1;
                indexes.unindex_document(&document, id)?;
            }
        }
        log::debug!(
            "Removed {} documents from collection {}",
            removed,
            self.collection_name
        );
        Ok(removed)
    }
}
