use im::OrdMap;
use smallvec::SmallVec;

use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// Represents a document stored in a [`crate::collection::Collection`].
///
/// A document is an object-shaped structured value: string keys mapped to
/// [Value]s, possibly nested. Every stored document carries a system-assigned
/// `_id` string, stamped by the collection on insertion.
///
/// Fields are kept in key order, so the JSON text of a document is canonical.
///
/// ## Persistent map
///
/// The fields live in an `im::OrdMap`, so cloning a document (which every
/// `find` result does) is O(1) and shares structure with the stored copy.
#[derive(Clone, PartialEq, Default)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    /// Parses JSON text into a document.
    ///
    /// Fails with [`ErrorKind::EncodingError`] on malformed JSON and with
    /// [`ErrorKind::InvalidDocument`] when the text is valid JSON but not an
    /// object.
    ///
    /// ```rust
    /// use flatdoc::collection::Document;
    ///
    /// let doc = Document::parse(r#"{"name": "Alice", "age": 30}"#).unwrap();
    /// assert_eq!(doc.size(), 2);
    /// ```
    pub fn parse(json: &str) -> FlatDocResult<Document> {
        Document::try_from(Value::parse(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates the specified [Value] with the specified key in this document,
    /// replacing any previous value.
    ///
    /// # Errors
    ///
    /// An empty key is rejected with [`ErrorKind::InvalidFieldName`].
    ///
    /// ```rust
    /// use flatdoc::collection::Document;
    ///
    /// let mut doc = Document::new();
    /// doc.put("name", "Alice").unwrap();
    /// doc.put("age", 30).unwrap();
    /// assert_eq!(doc.size(), 2);
    /// ```
    pub fn put<'a, T: Into<Value>>(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> FlatDocResult<()> {
        let key = key.into();
        // key cannot be empty
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(FlatDocError::new(
                "Document does not support empty key",
                ErrorKind::InvalidFieldName,
            ));
        }
        self.data.insert(key.into_owned(), value.into());
        Ok(())
    }

    /// Returns the top-level value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the value at a dotted path such as `address.city` or `tags.0`,
    /// descending through nested documents and array positions.
    ///
    /// A top-level key that itself contains the separator wins over the
    /// nested interpretation.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }
        if !path.contains(FIELD_SEPARATOR) {
            return None;
        }

        let mut segments = path.split(FIELD_SEPARATOR);
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Document(doc) => doc.get(segment)?,
                Value::Array(values) => values.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns the `_id` of this document, if it has been stamped.
    pub fn id(&self) -> Option<&str> {
        self.data.get(DOC_ID).and_then(|v| v.as_str())
    }

    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    pub(crate) fn set_id(&mut self, id: &str) {
        self.data
            .insert(DOC_ID.to_string(), Value::String(id.to_string()));
    }

    /// Removes a top-level field, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Top-level field names, in key order.
    pub fn fields(&self) -> FieldVec {
        self.data.keys().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Compact canonical JSON text of this document.
    pub fn to_json_string(&self) -> FlatDocResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub(crate) fn insert_raw(&mut self, key: String, value: Value) {
        self.data.insert(key, value);
    }

    #[doc(hidden)]
    pub fn insert_normalized(&mut self, key: &str, value: Value) {
        self.data.insert(normalize(key), value);
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .data
            .iter()
            .map(|(key, value)| format!("{:?}: {:?}", key, value))
            .join(", ");
        write!(f, "{{{}}}", fields)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.data.iter())
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Document, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Document(doc) => Ok(doc),
            other => Err(serde::de::Error::custom(format!(
                "expected an object, found {}",
                other.type_name()
            ))),
        }
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys.
pub fn normalize(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builds a [Document] from key-value pairs.
///
/// Keys may be bare identifiers or string literals; values may be literals,
/// parenthesised expressions, nested `{ .. }` documents, `[ .. ]` arrays or
/// `null`.
///
/// ```rust
/// use flatdoc::doc;
///
/// let base = 100;
/// let doc = doc! {
///     "name": "Alice",
///     score: (base * 2),
///     address: { city: "Oslo" },
///     tags: ["a", "b"],
///     manager: null,
/// };
/// assert_eq!(doc.size(), 5);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::collection::Document::new();
            $(
                doc.insert_normalized(stringify!($key), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    (null) => {
        $crate::common::Value::Null
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
