//! Collections and documents.
//!
//! A [`Document`] is an ordered map of string keys to [`Value`](crate::common::Value)s.
//! A [`Collection`] stores documents under generated ids, keeps secondary
//! indexes over single fields and persists everything as flat JSON files.
//!
//! ```rust,ignore
//! use flatdoc::doc;
//!
//! let mut users = db.collection("users")?;
//! let id = users.insert_document(&mut doc! { name: "Alice", age: 30 })?;
//!
//! users.create_index("age")?;
//! let adults = users.find(&doc! { age: { "$gt": 17 } })?;
//! ```
//!
//! # Document IDs
//!
//! Every stored document carries a string `_id`, assigned on insertion by an
//! [`IdGenerator`]. The default generator is a [`SnowflakeIdGenerator`]
//! shared by the whole process.

mod document;
mod document_collection;
pub(crate) mod operation;
mod snowflake;

pub use document::*;
pub use document_collection::*;
pub use snowflake::*;
