use flatdoc::collection::Collection;
use flatdoc::common::Value;
use flatdoc::database::Database;
use flatdoc::doc;
use flatdoc::errors::{ErrorKind, FlatDocError, FlatDocResult};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{env, fs, thread};

/// Runs `test` between `before` and `after`. `after` runs even when the test
/// fails, and the test panics with the first error it sees.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> FlatDocResult<()>,
    B: Fn() -> FlatDocResult<TestContext>,
    A: Fn(TestContext) -> FlatDocResult<()>,
{
    let start_time = Instant::now();
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| test(ctx.clone())));
    let after_result = after(ctx);

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed after {:?}: {:?}", start_time.elapsed(), e),
        Err(panic) => std::panic::resume_unwind(panic),
    }

    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

#[derive(Clone)]
pub struct TestContext {
    path: PathBuf,
    db: Database,
}

impl TestContext {
    pub fn new(path: PathBuf, db: Database) -> Self {
        Self { path, db }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn db(&self) -> Database {
        self.db.clone()
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("flatdoc-{}", id))
}

pub fn create_test_context() -> FlatDocResult<TestContext> {
    let path = random_path();
    if path.exists() {
        let _ = fs::remove_dir_all(&path);
    }

    let db = Database::builder().db_path(&path).open()?;
    Ok(TestContext::new(path, db))
}

/// Same as [create_test_context] but collections do not save when dropped.
pub fn create_manual_save_context() -> FlatDocResult<TestContext> {
    let path = random_path();
    let db = Database::builder()
        .db_path(&path)
        .save_on_drop(false)
        .open()?;
    Ok(TestContext::new(path, db))
}

pub fn cleanup(ctx: TestContext) -> FlatDocResult<()> {
    let path = ctx.path().to_path_buf();
    drop(ctx);

    let max_retries = 5;
    for retry in 0..max_retries {
        if !path.exists() {
            return Ok(());
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => return Ok(()),
            Err(e) if retry < max_retries - 1 => {
                log::warn!("Retrying removal of {:?}: {}", path, e);
                thread::sleep(Duration::from_millis(20 * (retry + 1) as u64));
            }
            Err(e) => {
                return Err(FlatDocError::new(
                    &format!("Failed to remove {:?}: {}", path, e),
                    ErrorKind::IOError,
                ))
            }
        }
    }
    Ok(())
}

pub fn create_test_docs() -> Vec<Value> {
    vec![
        Value::from(doc! {
            first_name: "fn1",
            last_name: "ln1",
            age: 30,
            tags: ["a", "b"],
            address: { city: "Oslo", zip: "0150" },
        }),
        Value::from(doc! {
            first_name: "fn2",
            last_name: "ln2",
            age: 45,
            tags: ["b", "c"],
            address: { city: "Bergen", zip: "5003" },
        }),
        Value::from(doc! {
            first_name: "fn3",
            last_name: "ln2",
            age: 45.5,
            tags: [],
            active: true,
        }),
    ]
}

/// Inserts [create_test_docs] and returns their ids in insertion order.
pub fn insert_test_documents(collection: &mut Collection) -> FlatDocResult<Vec<String>> {
    let mut ids = Vec::new();
    for mut document in create_test_docs() {
        ids.push(collection.insert(&mut document)?);
    }
    Ok(ids)
}

/// The `_id`s of `documents`, in order.
pub fn ids_of(documents: &[flatdoc::collection::Document]) -> Vec<String> {
    documents
        .iter()
        .filter_map(|d| d.id().map(str::to_string))
        .collect()
}
