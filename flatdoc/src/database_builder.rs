use crate::database::Database;
use crate::database_config::DatabaseConfig;
use crate::errors::{FlatDocError, FlatDocResult};
use std::path::Path;

/// Fluent builder of a [Database].
///
/// The first invalid setting is remembered, later settings are ignored, and
/// [`DatabaseBuilder::open`] returns that error.
///
/// ```rust,no_run
/// use flatdoc::database::Database;
///
/// let db = Database::builder()
///     .db_path("./data")
///     .max_load_factor(0.5)
///     .btree_min_degree(4)
///     .open()?;
/// # Ok::<(), flatdoc::errors::FlatDocError>(())
/// ```
#[derive(Default)]
pub struct DatabaseBuilder {
    error: Option<FlatDocError>,
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder {
            error: None,
            config: DatabaseConfig::new(),
        }
    }

    fn apply(mut self, setting: impl FnOnce(&mut DatabaseConfig) -> FlatDocResult<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = setting(&mut self.config) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn db_path(self, db_path: impl AsRef<Path>) -> Self {
        self.apply(|config| config.set_db_path(db_path))
    }

    pub fn initial_bucket_count(self, count: usize) -> Self {
        self.apply(|config| config.set_initial_bucket_count(count))
    }

    pub fn max_load_factor(self, load_factor: f64) -> Self {
        self.apply(|config| config.set_max_load_factor(load_factor))
    }

    pub fn btree_min_degree(self, min_degree: usize) -> Self {
        self.apply(|config| config.set_btree_min_degree(min_degree))
    }

    pub fn save_on_drop(mut self, save_on_drop: bool) -> Self {
        self.config.set_save_on_drop(save_on_drop);
        self
    }

    pub fn pretty_print(mut self, pretty_print: bool) -> Self {
        self.config.set_pretty_print(pretty_print);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Opens the database, or returns the first configuration error.
    pub fn open(self) -> FlatDocResult<Database> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Database::open(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn settings_reach_the_config() {
        let builder = DatabaseBuilder::new()
            .db_path("/tmp/somewhere")
            .initial_bucket_count(4)
            .max_load_factor(1.5)
            .btree_min_degree(2)
            .save_on_drop(false)
            .pretty_print(false);

        let config = builder.config();
        assert_eq!(config.db_path(), Path::new("/tmp/somewhere"));
        assert_eq!(config.initial_bucket_count(), 4);
        assert_eq!(config.max_load_factor(), 1.5);
        assert_eq!(config.btree_min_degree(), 2);
        assert!(!config.save_on_drop());
        assert!(!config.pretty_print());
    }

    #[test]
    fn first_error_wins() {
        let builder = DatabaseBuilder::new()
            .btree_min_degree(0)
            .max_load_factor(-1.0)
            .initial_bucket_count(8);
        assert_eq!(builder.config().btree_min_degree(), 3);
        assert_eq!(builder.config().initial_bucket_count(), 16);

        let err = builder.open().err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
        assert!(err.message().contains("minimum degree"));
    }

    #[test]
    fn opens_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseBuilder::new()
            .db_path(dir.path())
            .open()
            .unwrap();
        assert_eq!(db.config().db_path(), dir.path());
    }
}
