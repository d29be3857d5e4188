use crate::collection::Document;
use crate::common::{Convertible, Value, DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};

type Entry<V> = (String, V);

/// A chained hash table keyed by strings.
///
/// Entries live in a fixed number of buckets, each an ordered chain. Before
/// an insertion would push `size / bucket_count` above the maximum load
/// factor, the bucket count doubles and every entry is redistributed, so the
/// load factor bound holds after every `put`. Removal never shrinks the
/// bucket array.
///
/// The table backs the document store (`KeyedTable<Document>`) and the
/// equality-index buckets (`KeyedTable<Vec<String>>`), and doubles as their
/// serialization substrate through [`KeyedTable::serialize`] and
/// [`KeyedTable::deserialize`].
///
/// Iteration order is bucket order then chain order. It is deterministic for
/// a given insertion history but changes across rehashes.
#[derive(Clone, Debug)]
pub struct KeyedTable<V> {
    buckets: Vec<Vec<Entry<V>>>,
    size: usize,
    initial_bucket_count: usize,
    max_load_factor: f64,
}

impl<V> KeyedTable<V> {
    /// Creates a table with 16 buckets and a maximum load factor of 0.75.
    pub fn new() -> Self {
        Self::with_layout(DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR)
    }

    /// Creates a table with the given initial bucket count and load factor.
    ///
    /// A bucket count of zero is raised to one; a non-positive or non-finite
    /// load factor falls back to the default.
    pub fn with_layout(initial_bucket_count: usize, max_load_factor: f64) -> Self {
        let initial_bucket_count = initial_bucket_count.max(1);
        let max_load_factor = if max_load_factor.is_finite() && max_load_factor > 0.0 {
            max_load_factor
        } else {
            log::warn!(
                "Invalid max load factor {}, using {}",
                max_load_factor,
                DEFAULT_MAX_LOAD_FACTOR
            );
            DEFAULT_MAX_LOAD_FACTOR
        };

        KeyedTable {
            buckets: Self::empty_buckets(initial_bucket_count),
            size: 0,
            initial_bucket_count,
            max_load_factor,
        }
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn put(&mut self, key: &str, value: V) {
        while (self.size + 1) as f64 / self.buckets.len() as f64 > self.max_load_factor {
            self.rehash(self.buckets.len() * 2);
        }

        let index = self.bucket_index(key);
        let chain = &mut self.buckets[index];
        if let Some(entry) = chain.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
            return;
        }
        chain.push((key.to_string(), value));
        self.size += 1;
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let index = self.bucket_index(key);
        self.buckets[index]
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes the entry for `key`. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.take(key).is_some()
    }

    /// Removes the entry for `key` and returns its value.
    pub fn take(&mut self, key: &str) -> Option<V> {
        let index = self.bucket_index(key);
        let chain = &mut self.buckets[index];
        let position = chain.iter().position(|(k, _)| k == key)?;
        let (_, value) = chain.remove(position);
        self.size -= 1;
        Some(value)
    }

    /// Every live entry, in bucket order then chain order.
    pub fn items(&self) -> Vec<(&String, &V)> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|(k, v)| (k, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Drops every entry and restores the initial bucket count.
    pub fn clear(&mut self) {
        self.buckets = Self::empty_buckets(self.initial_bucket_count);
        self.size = 0;
    }

    fn bucket_index(&self, key: &str) -> usize {
        (str_hash(key) % self.buckets.len() as u64) as usize
    }

    fn rehash(&mut self, new_bucket_count: usize) {
        log::debug!(
            "Rehashing table of {} entries from {} to {} buckets",
            self.size,
            self.buckets.len(),
            new_bucket_count
        );
        let old = std::mem::replace(&mut self.buckets, Self::empty_buckets(new_bucket_count));
        for (key, value) in old.into_iter().flatten() {
            let index = (str_hash(&key) % new_bucket_count as u64) as usize;
            self.buckets[index].push((key, value));
        }
    }

    fn empty_buckets(count: usize) -> Vec<Vec<Entry<V>>> {
        std::iter::repeat_with(Vec::new).take(count).collect()
    }
}

impl<V> Default for KeyedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeyedTable<V>
where
    V: Convertible<Output = V>,
{
    /// Encodes the table as one object value mapping each key to its value.
    pub fn serialize(&self) -> FlatDocResult<Value> {
        let mut doc = Document::new();
        for (key, value) in self.iter() {
            doc.insert_raw(key.clone(), value.to_value()?);
        }
        Ok(Value::Document(doc))
    }

    /// Resets the table and puts every member of the object `value`.
    ///
    /// The table is left empty if any member fails to convert.
    pub fn deserialize(&mut self, value: &Value) -> FlatDocResult<()> {
        self.clear();
        let doc = match value {
            Value::Document(doc) => doc,
            other => {
                log::error!("Cannot load a keyed table from {}", other.type_name());
                return Err(FlatDocError::new(
                    &format!("Keyed table must be an object, found {}", other.type_name()),
                    ErrorKind::EncodingError,
                ));
            }
        };

        for (key, member) in doc.iter() {
            match V::from_value(member) {
                Ok(v) => self.put(key, v),
                Err(e) => {
                    self.clear();
                    return Err(FlatDocError::new_with_cause(
                        &format!("Failed to load entry '{}'", key),
                        e.kind().clone(),
                        e,
                    ));
                }
            }
        }
        Ok(())
    }
}

/// 64-bit FNV-1a with a murmur-style finalizer folded into every step.
fn str_hash(key: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        hash ^= hash >> 33;
        hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
        hash ^= hash >> 33;
    }
    hash
}
