use crate::common::{
    DEFAULT_BTREE_MIN_DEGREE, DEFAULT_BUCKET_COUNT, DEFAULT_DB_PATH, DEFAULT_MAX_LOAD_FACTOR,
};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration of a [`Database`](crate::database::Database) and of every
/// collection it opens.
///
/// Setters validate their input and leave the configuration unchanged on
/// error. A configuration read through serde is checked with
/// [`DatabaseConfig::validate`] when the database opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    db_path: PathBuf,
    initial_bucket_count: usize,
    max_load_factor: f64,
    btree_min_degree: usize,
    save_on_drop: bool,
    pretty_print: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            initial_bucket_count: DEFAULT_BUCKET_COUNT,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            btree_min_degree: DEFAULT_BTREE_MIN_DEGREE,
            save_on_drop: true,
            pretty_print: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration rooted at `db_path`.
    pub fn with_path(db_path: impl AsRef<Path>) -> Self {
        DatabaseConfig {
            db_path: db_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// The database directory.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn initial_bucket_count(&self) -> usize {
        self.initial_bucket_count
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Minimum degree `t` of every range index.
    pub fn btree_min_degree(&self) -> usize {
        self.btree_min_degree
    }

    pub fn save_on_drop(&self) -> bool {
        self.save_on_drop
    }

    pub fn pretty_print(&self) -> bool {
        self.pretty_print
    }

    pub fn set_db_path(&mut self, db_path: impl AsRef<Path>) -> FlatDocResult<()> {
        let db_path = db_path.as_ref();
        check_db_path(db_path)?;
        self.db_path = db_path.to_path_buf();
        Ok(())
    }

    pub fn set_initial_bucket_count(&mut self, count: usize) -> FlatDocResult<()> {
        check_bucket_count(count)?;
        self.initial_bucket_count = count;
        Ok(())
    }

    pub fn set_max_load_factor(&mut self, load_factor: f64) -> FlatDocResult<()> {
        check_load_factor(load_factor)?;
        self.max_load_factor = load_factor;
        Ok(())
    }

    pub fn set_btree_min_degree(&mut self, min_degree: usize) -> FlatDocResult<()> {
        check_min_degree(min_degree)?;
        self.btree_min_degree = min_degree;
        Ok(())
    }

    pub fn set_save_on_drop(&mut self, save_on_drop: bool) {
        self.save_on_drop = save_on_drop;
    }

    pub fn set_pretty_print(&mut self, pretty_print: bool) {
        self.pretty_print = pretty_print;
    }

    /// Checks every setting, failing with [`ErrorKind::ValidationError`].
    pub fn validate(&self) -> FlatDocResult<()> {
        check_db_path(&self.db_path)?;
        check_bucket_count(self.initial_bucket_count)?;
        check_load_factor(self.max_load_factor)?;
        check_min_degree(self.btree_min_degree)?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> FlatDocError {
    let message = message.into();
    log::error!("{}", message);
    FlatDocError::new(&message, ErrorKind::ValidationError)
}

fn check_db_path(db_path: &Path) -> FlatDocResult<()> {
    if db_path.as_os_str().is_empty() {
        return Err(invalid("Database path cannot be empty"));
    }
    Ok(())
}

fn check_bucket_count(count: usize) -> FlatDocResult<()> {
    if count == 0 {
        return Err(invalid("Initial bucket count must be at least 1"));
    }
    Ok(())
}

fn check_load_factor(load_factor: f64) -> FlatDocResult<()> {
    if !load_factor.is_finite() || load_factor <= 0.0 {
        return Err(invalid(format!(
            "Max load factor must be a positive finite number, got {}",
            load_factor
        )));
    }
    Ok(())
}

fn check_min_degree(min_degree: usize) -> FlatDocResult<()> {
    if min_degree < 2 {
        return Err(invalid(format!(
            "B-tree minimum degree must be at least 2, got {}",
            min_degree
        )));
    }
    Ok(())
}
