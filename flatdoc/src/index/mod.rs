//! Secondary indexes of a collection.
//!
//! A field carries at most one index, and its kind is decided when the index
//! is created:
//!
//! - **Range index**: an [`OrderedIndex`] (B-tree) over the numeric values of
//!   the field. Serves `$eq`, `$gt`, `$lt` and `$gt`+`$lt` queries.
//! - **Equality index**: an [`EqualityIndex`] mapping the encoded value of the
//!   field to the ids of the documents holding it. Serves bare values, `$eq`
//!   and `$in`.
//!
//! ```rust,ignore
//! let kind = collection.create_index("age")?;
//! assert_eq!(kind, IndexKind::Range);
//! ```

mod descriptor;
mod equality_index;
mod index_key;
mod ordered_index;

pub use descriptor::*;
pub use equality_index::*;
pub use index_key::*;
pub use ordered_index::*;
