use crate::common::{format_general, Value, BOOL_TAG, JSON_TAG, NUMBER_TAG, STRING_TAG};
use crate::errors::FlatDocResult;

/// Encodes a field value into the bucket key of an equality index.
///
/// The type tag keeps differently typed values apart even when their text is
/// the same, so the string `"1"` and the number `1` land in different buckets:
///
/// | value            | key           |
/// |------------------|---------------|
/// | `"x"`            | `s:x`         |
/// | `45`, `45.0`     | `n:45`        |
/// | `1234567`        | `n:1.23457e+06` |
/// | `true` / `false` | `b:1` / `b:0` |
/// | anything else    | `j:` + compact JSON |
///
/// Numbers are rendered like `printf("%g")`, so integers and floats with the
/// same numeric value share a key.
pub fn encode_index_key(value: &Value) -> FlatDocResult<String> {
    let key = match value {
        Value::String(s) => format!("{}{}", STRING_TAG, s),
        Value::I64(i) => format!("{}{}", NUMBER_TAG, format_general(*i as f64)),
        Value::F64(f) => format!("{}{}", NUMBER_TAG, format_general(*f)),
        Value::Bool(b) => format!("{}{}", BOOL_TAG, if *b { "1" } else { "0" }),
        Value::Null | Value::Array(_) | Value::Document(_) => {
            format!("{}{}", JSON_TAG, value.to_json_string()?)
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn tags_scalars() {
        assert_eq!(encode_index_key(&Value::from("x")).unwrap(), "s:x");
        assert_eq!(encode_index_key(&Value::from(true)).unwrap(), "b:1");
        assert_eq!(encode_index_key(&Value::from(false)).unwrap(), "b:0");
        assert_eq!(encode_index_key(&Value::from(30)).unwrap(), "n:30");
        assert_eq!(encode_index_key(&Value::from(45.5)).unwrap(), "n:45.5");
    }

    #[test]
    fn string_and_number_do_not_collide() {
        let text = encode_index_key(&Value::from("1")).unwrap();
        let number = encode_index_key(&Value::from(1)).unwrap();
        assert_ne!(text, number);
    }

    #[test]
    fn integer_and_float_share_a_key() {
        assert_eq!(
            encode_index_key(&Value::from(45)).unwrap(),
            encode_index_key(&Value::from(45.0)).unwrap()
        );
    }

    #[test]
    fn numbers_use_six_significant_digits() {
        let large = encode_index_key(&Value::from(1234567)).unwrap();
        assert_eq!(large, "n:1.23457e+06");
        assert_eq!(encode_index_key(&Value::from(0.00001)).unwrap(), "n:1e-05");
    }

    #[test]
    fn containers_are_dumped_as_json() {
        assert_eq!(encode_index_key(&Value::Null).unwrap(), "j:null");
        assert_eq!(
            encode_index_key(&Value::from(vec![1, 2])).unwrap(),
            "j:[1,2]"
        );
        assert_eq!(
            encode_index_key(&Value::from(doc! { b: 2, a: 1 })).unwrap(),
            "j:{\"a\":1,\"b\":2}"
        );
    }
}
