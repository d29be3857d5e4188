//! # FlatDoc - Embedded Document Store
//!
//! FlatDoc stores schemaless JSON documents in named collections, keeps
//! optional single-field secondary indexes over them and persists everything
//! as plain JSON files in one directory.
//!
//! ## Key Features
//!
//! - **Embedded**: a library, no server process
//! - **Schemaless documents**: nested objects, arrays, numbers, strings, booleans
//! - **Two index kinds**: B-tree range indexes over numeric fields and hash
//!   equality indexes over any other field, chosen when the index is created
//! - **Query language**: comparison, membership, pattern and logical operators
//!   for queries no index serves
//! - **Flat files**: `D/C.json` per collection, `D/indexes/C.<field>.*.json`
//!   per index, readable and editable by hand
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flatdoc::database::Database;
//! use flatdoc::doc;
//!
//! # fn main() -> Result<(), flatdoc::errors::FlatDocError> {
//! let db = Database::builder().db_path("./data").open()?;
//! let mut people = db.collection("people")?;
//!
//! people.insert_document(&mut doc! { name: "Alice", age: 30 })?;
//! people.insert_document(&mut doc! { name: "Bob", age: 45 })?;
//!
//! people.create_index("age")?;
//! let found = people.find(&doc! { age: { "$gt": 40 } })?;
//! assert_eq!(found.len(), 1);
//!
//! people.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, collections and id generation
//! - [`common`] - The structured value type, conversions and constants
//! - [`database`] - Database handle
//! - [`database_builder`] - Fluent database builder
//! - [`database_config`] - Database configuration
//! - [`errors`] - Error types and result definitions
//! - [`index`] - Range and equality indexes
//! - [`query`] - Query evaluation
//! - [`store`] - Hash table and on-disk layout

use crate::collection::SnowflakeIdGenerator;
use std::sync::{Arc, LazyLock};

pub mod collection;
pub mod common;
pub mod database;
pub mod database_builder;
pub mod database_config;
pub mod errors;
pub mod index;
pub mod query;
pub mod store;

pub(crate) static ID_GENERATOR: LazyLock<Arc<SnowflakeIdGenerator>> =
    LazyLock::new(|| Arc::new(SnowflakeIdGenerator::new()));
