use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};

/// Maps a type to and from the structured [Value] representation.
///
/// [`crate::store::KeyedTable`] requires its stored type to be `Convertible`
/// so that a whole table can be serialized to one object value and rebuilt
/// from it.
pub trait Convertible {
    type Output;

    fn to_value(&self) -> FlatDocResult<Value>;
    fn from_value(value: &Value) -> FlatDocResult<Self::Output>;
}

fn mapping_error(expected: &str, value: &Value) -> FlatDocError {
    log::error!("Value {} is not {}", value, expected);
    FlatDocError::new(
        &format!("Expected {} but found {}", expected, value.type_name()),
        ErrorKind::ObjectMappingError,
    )
}

impl Convertible for Value {
    type Output = Value;

    fn to_value(&self) -> FlatDocResult<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value) -> FlatDocResult<Value> {
        Ok(value.clone())
    }
}

impl Convertible for Document {
    type Output = Document;

    fn to_value(&self) -> FlatDocResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> FlatDocResult<Document> {
        match value {
            Value::Document(doc) => Ok(doc.clone()),
            _ => {
                log::error!("Persisted document {} is not an object", value);
                Err(FlatDocError::new(
                    &format!("Document must be an object, found {}", value.type_name()),
                    ErrorKind::InvalidDocument,
                ))
            }
        }
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> FlatDocResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> FlatDocResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mapping_error("a string", value)),
        }
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> FlatDocResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> FlatDocResult<f64> {
        value
            .as_f64()
            .ok_or_else(|| mapping_error("a number", value))
    }
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> FlatDocResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> FlatDocResult<bool> {
        value
            .as_bool()
            .ok_or_else(|| mapping_error("a bool", value))
    }
}

impl<T> Convertible for Vec<T>
where
    T: Convertible<Output = T>,
{
    type Output = Vec<T>;

    fn to_value(&self) -> FlatDocResult<Value> {
        let values = self
            .iter()
            .map(|item| item.to_value())
            .collect::<FlatDocResult<Vec<Value>>>()?;
        Ok(Value::Array(values))
    }

    fn from_value(value: &Value) -> FlatDocResult<Vec<T>> {
        match value {
            Value::Array(values) => values.iter().map(T::from_value).collect(),
            _ => Err(mapping_error("an array", value)),
        }
    }
}
