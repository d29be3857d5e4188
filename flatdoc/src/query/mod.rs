//! Predicate evaluation for queries no index can serve.
//!
//! A query is a [`Document`](crate::collection::Document) whose keys are field
//! paths or logical operators:
//!
//! ```rust,ignore
//! use flatdoc::doc;
//!
//! // age strictly between 30 and 50, and tag either x or y
//! let query = doc! {
//!     "$and": [
//!         { age: { "$gt": 30, "$lt": 50 } },
//!         { tag: { "$in": ["x", "y"] } }
//!     ]
//! };
//! ```
//!
//! # Supported Operators
//!
//! - **Equality**: bare value, `$eq`, `$ne`
//! - **Comparison**: `$gt`, `$gte`, `$lt`, `$lte`
//! - **Membership**: `$in`, `$nin`, `$exists`
//! - **Pattern**: `$regex`
//! - **Logical**: `$and`, `$or`, `$nor`, `$not`

mod evaluator;

pub use evaluator::*;
