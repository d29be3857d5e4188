//! Storage primitives: the generic [`KeyedTable`] that holds documents and
//! equality-index buckets, and the flat-file layout of a collection.

mod collection_files;
mod keyed_table;

pub(crate) use collection_files::*;
pub use keyed_table::*;
