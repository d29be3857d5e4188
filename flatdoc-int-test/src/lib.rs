//! Shared helpers for the flatdoc integration tests.

pub mod test_util;
