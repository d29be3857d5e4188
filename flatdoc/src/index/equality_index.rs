use crate::common::Value;
use crate::errors::FlatDocResult;
use crate::index::encode_index_key;
use crate::store::KeyedTable;

/// Hash based secondary index: encoded field value to the ids of the
/// documents holding that value, in insertion order.
///
/// A bucket, once created, stays in the index even after every id has been
/// scrubbed from it. Looking up such a bucket is a definitive empty answer.
#[derive(Debug, Clone, Default)]
pub struct EqualityIndex {
    buckets: KeyedTable<Vec<String>>,
}

impl EqualityIndex {
    pub fn new() -> Self {
        EqualityIndex {
            buckets: KeyedTable::new(),
        }
    }

    pub fn with_layout(initial_bucket_count: usize, max_load_factor: f64) -> Self {
        EqualityIndex {
            buckets: KeyedTable::with_layout(initial_bucket_count, max_load_factor),
        }
    }

    /// Appends `id` to the bucket of `value`, creating the bucket if needed.
    pub fn add(&mut self, value: &Value, id: &str) -> FlatDocResult<()> {
        let key = encode_index_key(value)?;
        match self.buckets.get_mut(&key) {
            Some(ids) => ids.push(id.to_string()),
            None => self.buckets.put(&key, vec![id.to_string()]),
        }
        Ok(())
    }

    /// Returns the bucket of `value`, `None` when no such bucket exists.
    pub fn lookup(&self, value: &Value) -> FlatDocResult<Option<&Vec<String>>> {
        let key = encode_index_key(value)?;
        Ok(self.buckets.get(&key))
    }

    /// Removes every occurrence of `id` from the bucket of `value`.
    pub fn scrub(&mut self, value: &Value, id: &str) -> FlatDocResult<()> {
        let key = encode_index_key(value)?;
        if let Some(ids) = self.buckets.get_mut(&key) {
            ids.retain(|candidate| candidate != id);
        }
        Ok(())
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.size()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Serializes to an object mapping encoded value to an array of ids.
    pub fn serialize(&self) -> FlatDocResult<Value> {
        self.buckets.serialize()
    }

    /// Replaces the content of this index with a serialized one.
    pub fn deserialize(&mut self, value: &Value) -> FlatDocResult<()> {
        self.buckets.deserialize(value)
    }
}
