use flatdoc::doc;
use flatdoc::errors::ErrorKind;
use flatdoc::index::{IndexDescriptor, IndexKind};
use flatdoc_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_create_index_picks_kind_from_data() {
    run_test(
        create_test_context,
        |ctx| {
            let mut collection = ctx.db().collection("index_kind")?;
            insert_test_documents(&mut collection)?;

            assert_eq!(collection.create_index("age")?, IndexKind::Range);
            assert_eq!(collection.create_index("first_name")?, IndexKind::Equality);
            assert_eq!(collection.create_index("missing")?, IndexKind::Equality);

            assert_eq!(
                collection.list_indexes(),
                vec![
                    IndexDescriptor::new("age", IndexKind::Range),
                    IndexDescriptor::new("first_name", IndexKind::Equality),
                    IndexDescriptor::new("missing", IndexKind::Equality),
                ]
            );
            assert!(collection.has_index("age"));
            assert!(!collection.has_index("last_name"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_create_index_writes_files_immediately() {
    run_test(
        create_test_context,
        |ctx| {
            let mut collection = ctx.db().collection("people")?;
            insert_test_documents(&mut collection)?;
            collection.create_index("age")?;
            collection.create_index("last_name")?;

            let index_dir = ctx.path().join("indexes");
            assert!(index_dir.join("people.age.btree.json").is_file());
            assert!(index_dir.join("people.last_name.index.json").is_file());
            assert!(!ctx.path().join("people.json").exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_recreating_index_switches_kind() {
    run_test(
        create_test_context,
        |ctx| {
            let mut collection = ctx.db().collection("switch")?;
            collection.insert_document(&mut doc! { code: "a" })?;
            assert_eq!(collection.create_index("code")?, IndexKind::Equality);

            collection.insert_document(&mut doc! { code: 7 })?;
            assert_eq!(collection.create_index("code")?, IndexKind::Range);
            assert_eq!(collection.index_kind("code"), Some(IndexKind::Range));
            assert!(collection.equality_index("code").is_none());

            let index_dir = ctx.path().join("indexes");
            assert!(index_dir.join("switch.code.btree.json").is_file());
            assert!(!index_dir.join("switch.code.index.json").exists());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_range_index_stays_balanced() {
    run_test(
        create_test_context,
        |ctx| {
            let mut collection = ctx.db().collection("balanced")?;
            for i in 0..500 {
                let score = (i * 7919) % 1000;
                collection.insert_document(&mut doc! { score: score })?;
            }
            collection.create_index("score")?;

            let index = collection.range_index("score").expect("range index");
            index.check_invariants()?;
            assert_eq!(index.len(), 500);
            assert!(index.height() > 1);

            let query = doc! { score: { "$gt": 100, "$lt": 200 } };
            let found = collection.find(&query)?;
            assert!(!found.is_empty());
            for document in &found {
                let score = document.get("score").and_then(|v| v.as_f64()).unwrap();
                assert!(score > 100.0 && score < 200.0);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_field_name() {
    run_test(
        create_test_context,
        |ctx| {
            let mut collection = ctx.db().collection("fields")?;
            for field in ["", "$age", "..", "a/b"] {
                let err = collection.create_index(field).unwrap_err();
                assert_eq!(err.kind(), &ErrorKind::InvalidFieldName);
            }
            assert!(collection.list_indexes().is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_on_nested_field() {
    run_test(
        create_test_context,
        |ctx| {
            let mut collection = ctx.db().collection("nested")?;
            insert_test_documents(&mut collection)?;

            let kind = collection.create_index("address.city")?;
            assert_eq!(kind, IndexKind::Equality);
            let index = collection
                .equality_index("address.city")
                .expect("equality index");
            assert_eq!(index.len(), 2);

            let query = doc! { "address.city": { "$in": ["Oslo", "Bergen"] } };
            let found = collection.find(&query)?;
            assert_eq!(found.len(), 2);
            assert!(ctx
                .path()
                .join("indexes")
                .join("nested.address.city.index.json")
                .is_file());
            Ok(())
        },
        cleanup,
    )
}
