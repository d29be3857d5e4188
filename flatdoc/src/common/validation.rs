use crate::common::{FIELD_SEPARATOR, OPERATOR_PREFIX};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};

fn name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("cannot be empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("cannot contain a path separator")
    } else if name == "." || name == ".." {
        Some("cannot be a relative directory")
    } else {
        None
    }
}

fn collection_name_problem(name: &str) -> Option<&'static str> {
    name_problem(name).or_else(|| {
        if name.contains(FIELD_SEPARATOR) {
            Some("cannot contain '.'")
        } else {
            None
        }
    })
}

/// Whether `name` can be used as a collection name.
pub fn is_valid_collection_name(name: &str) -> bool {
    collection_name_problem(name).is_none()
}

/// Checks that `name` can be used as the file stem of a collection.
///
/// Index files are named `<collection>.<field>...`, so the name must not
/// contain `.` either.
pub fn validate_collection_name(name: &str) -> FlatDocResult<()> {
    match collection_name_problem(name) {
        Some(problem) => {
            log::error!("Collection name '{}' {}", name, problem);
            Err(FlatDocError::new(
                &format!("Collection name '{}' {}", name, problem),
                ErrorKind::InvalidCollectionName,
            ))
        }
        None => Ok(()),
    }
}

/// Checks that `field` can be indexed and used in an index file name.
pub fn validate_field_name(field: &str) -> FlatDocResult<()> {
    let problem = name_problem(field).or_else(|| {
        if field.starts_with(OPERATOR_PREFIX) {
            Some("cannot start with an operator prefix")
        } else {
            None
        }
    });

    match problem {
        Some(problem) => {
            log::error!("Field name '{}' {}", field, problem);
            Err(FlatDocError::new(
                &format!("Field name '{}' {}", field, problem),
                ErrorKind::InvalidFieldName,
            ))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names() {
        assert!(validate_collection_name("users").is_ok());
        assert!(validate_collection_name("users_archive").is_ok());
        assert!(is_valid_collection_name("users"));
        assert!(!is_valid_collection_name("a.b"));
        let bad_names = [
            "",
            ".",
            "..",
            ".hidden",
            "users.archive",
            "a.",
            "a/b",
            "a\\b",
        ];
        for bad in bad_names {
            let err = validate_collection_name(bad).unwrap_err();
            let kind = err.kind();
            assert_eq!(kind, &ErrorKind::InvalidCollectionName, "name {:?}", bad);
        }
    }

    #[test]
    fn field_names() {
        assert!(validate_field_name("age").is_ok());
        assert!(validate_field_name("address.city").is_ok());
        assert!(validate_field_name(".x").is_ok());
        for bad in ["", ".", "..", "$or", "a/b"] {
            let err = validate_field_name(bad).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidFieldName, "field {:?}", bad);
        }
    }
}
