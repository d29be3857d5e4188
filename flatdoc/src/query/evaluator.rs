use crate::collection::Document;
use crate::common::{
    Value, DEFAULT_REGEX_CACHE_SIZE, OPERATOR_PREFIX, OP_AND, OP_EQ, OP_EXISTS, OP_GT, OP_GTE,
    OP_IN, OP_LT, OP_LTE, OP_NE, OP_NIN, OP_NOR, OP_NOT, OP_OR, OP_REGEX,
};
use crate::errors::{ErrorKind, FlatDocError, FlatDocResult};
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::num::NonZeroUsize;

/// Matches a document against a query.
///
/// A collection hands every query it cannot resolve through an index to its
/// evaluator, one stored document at a time.
pub trait QueryEvaluator: Send + Sync {
    /// Returns whether `document` satisfies `query`. A malformed query is a
    /// [`ErrorKind::FilterError`].
    fn evaluate(&self, document: &Document, query: &Document) -> FlatDocResult<bool>;
}

/// The built-in [QueryEvaluator].
///
/// Field keys may be dotted paths. A bare value matches a field equal to it,
/// or an array field containing it. A missing field only equals `null`.
/// Comparisons order numbers with numbers and strings with strings; any other
/// pairing does not match. An empty query matches every document.
///
/// Compiled `$regex` patterns are kept in a least-recently-used cache of
/// [`DEFAULT_REGEX_CACHE_SIZE`] entries.
pub struct DefaultQueryEvaluator {
    patterns: Mutex<LruCache<String, Regex>>,
}

impl DefaultQueryEvaluator {
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_REGEX_CACHE_SIZE)
    }

    /// Creates an evaluator caching at most `cache_size` compiled patterns.
    /// A size of zero is raised to one.
    pub fn with_cache_size(cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        DefaultQueryEvaluator {
            patterns: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn evaluate_clauses(
        &self,
        clauses: &Value,
        operator: &str,
        document: &Document,
    ) -> FlatDocResult<Vec<bool>> {
        let clauses = clauses.as_array().ok_or_else(|| {
            filter_error(&format!("{} expects an array of queries", operator))
        })?;

        clauses
            .iter()
            .map(|clause| match clause {
                Value::Document(query) => self.evaluate(document, query),
                other => Err(filter_error(&format!(
                    "{} expects queries, found {}",
                    operator,
                    other.type_name()
                ))),
            })
            .collect()
    }

    fn matches_condition(&self, value: Option<&Value>, condition: &Value) -> FlatDocResult<bool> {
        match condition {
            Value::Document(operators) if is_operator_document(operators) => {
                for (operator, operand) in operators.iter() {
                    if !self.matches_operator(value, operator, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(matches_equal(value, condition)),
        }
    }

    fn matches_operator(
        &self,
        value: Option<&Value>,
        operator: &str,
        operand: &Value,
    ) -> FlatDocResult<bool> {
        match operator {
            OP_EQ => Ok(matches_equal(value, operand)),
            OP_NE => Ok(!matches_equal(value, operand)),
            OP_GT => Ok(matches_order(value, operand, |o| o == Ordering::Greater)),
            OP_GTE => Ok(matches_order(value, operand, |o| o != Ordering::Less)),
            OP_LT => Ok(matches_order(value, operand, |o| o == Ordering::Less)),
            OP_LTE => Ok(matches_order(value, operand, |o| o != Ordering::Greater)),
            OP_IN => matches_any(value, operand, OP_IN),
            OP_NIN => Ok(!matches_any(value, operand, OP_NIN)?),
            OP_EXISTS => match operand {
                Value::Bool(expected) => Ok(value.is_some() == *expected),
                other => Err(filter_error(&format!(
                    "{} expects a bool, found {}",
                    OP_EXISTS,
                    other.type_name()
                ))),
            },
            OP_REGEX => self.matches_pattern(value, operand),
            OP_NOT => match operand {
                Value::Document(operators) if is_operator_document(operators) => {
                    Ok(!self.matches_condition(value, operand)?)
                }
                _ => Err(filter_error(&format!(
                    "{} expects an operator object",
                    OP_NOT
                ))),
            },
            other => Err(filter_error(&format!("Unknown operator {}", other))),
        }
    }

    fn matches_pattern(&self, value: Option<&Value>, operand: &Value) -> FlatDocResult<bool> {
        let pattern = operand.as_str().ok_or_else(|| {
            filter_error(&format!("{} expects a string pattern", OP_REGEX))
        })?;

        let text = match value.and_then(|v| v.as_str()) {
            Some(text) => text,
            None => return Ok(false),
        };

        let mut patterns = self.patterns.lock();
        if let Some(regex) = patterns.get(pattern) {
            return Ok(regex.is_match(text));
        }

        let regex = Regex::new(pattern).map_err(|e| {
            log::error!("Invalid regex pattern '{}': {}", pattern, e);
            FlatDocError::from(e)
        })?;
        let matched = regex.is_match(text);
        patterns.put(pattern.to_string(), regex);
        Ok(matched)
    }
}

impl Default for DefaultQueryEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEvaluator for DefaultQueryEvaluator {
    fn evaluate(&self, document: &Document, query: &Document) -> FlatDocResult<bool> {
        for (key, condition) in query.iter() {
            let matched = match key.as_str() {
                OP_AND => self
                    .evaluate_clauses(condition, OP_AND, document)?
                    .into_iter()
                    .all(|m| m),
                OP_OR => self
                    .evaluate_clauses(condition, OP_OR, document)?
                    .into_iter()
                    .any(|m| m),
                OP_NOR => !self
                    .evaluate_clauses(condition, OP_NOR, document)?
                    .into_iter()
                    .any(|m| m),
                operator if operator.starts_with(OPERATOR_PREFIX) => {
                    return Err(filter_error(&format!(
                        "Operator {} is not allowed at the top level",
                        operator
                    )));
                }
                field => self.matches_condition(document.get_path(field), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn filter_error(message: &str) -> FlatDocError {
    log::error!("{}", message);
    FlatDocError::new(message, ErrorKind::FilterError)
}

/// An object whose keys are all operators, as opposed to a literal
/// sub-document to compare against.
fn is_operator_document(doc: &Document) -> bool {
    !doc.is_empty() && doc.iter().all(|(key, _)| key.starts_with(OPERATOR_PREFIX))
}

fn matches_equal(value: Option<&Value>, target: &Value) -> bool {
    match value {
        None => target.is_null(),
        Some(value) if value == target => true,
        Some(Value::Array(items)) => items.iter().any(|item| item == target),
        Some(_) => false,
    }
}

fn matches_order(
    value: Option<&Value>,
    operand: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    let compare = |candidate: &Value| candidate.compare(operand).map(&accept).unwrap_or(false);
    match value {
        None => false,
        Some(Value::Array(items)) => items.iter().any(compare),
        Some(value) => compare(value),
    }
}

fn matches_any(value: Option<&Value>, operand: &Value, operator: &str) -> FlatDocResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| filter_error(&format!("{} expects an array", operator)))?;
    Ok(candidates
        .iter()
        .any(|candidate| matches_equal(value, candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn person() -> Document {
        doc! {
            name: "Alice",
            age: 30,
            score: 4.5,
            tags: ["x", "y"],
            address: { city: "Oslo", zip: "0150" },
            manager: null,
        }
    }

    fn eval(query: Document) -> FlatDocResult<bool> {
        DefaultQueryEvaluator::new().evaluate(&person(), &query)
    }

    #[test]
    fn empty_query_matches() {
        assert!(eval(doc! {}).unwrap());
    }

    #[test]
    fn bare_values() {
        assert!(eval(doc! { name: "Alice" }).unwrap());
        assert!(!eval(doc! { name: "Bob" }).unwrap());
        assert!(eval(doc! { age: 30.0 }).unwrap());
        assert!(eval(doc! { tags: "y" }).unwrap());
        assert!(eval(doc! { "address.city": "Oslo" }).unwrap());
        let address = doc! { address: { city: "Oslo", zip: "0150" } };
        assert!(eval(address).unwrap());
        assert!(eval(doc! { missing: null }).unwrap());
        assert!(!eval(doc! { missing: 1 }).unwrap());
    }

    #[test]
    fn comparisons() {
        assert!(eval(doc! { age: { "$gt": 20, "$lt": 40 } }).unwrap());
        assert!(!eval(doc! { age: { "$gt": 30 } }).unwrap());
        assert!(eval(doc! { age: { "$gte": 30 } }).unwrap());
        assert!(eval(doc! { score: { "$lte": 4.5 } }).unwrap());
        assert!(eval(doc! { name: { "$lt": "Bob" } }).unwrap());
        assert!(!eval(doc! { name: { "$gt": 1 } }).unwrap());
        assert!(!eval(doc! { missing: { "$lt": 1 } }).unwrap());
        assert!(eval(doc! { age: { "$ne": 31 } }).unwrap());
        assert!(eval(doc! { age: { "$eq": 30 } }).unwrap());
    }

    #[test]
    fn membership() {
        assert!(eval(doc! { name: { "$in": ["Bob", "Alice"] } }).unwrap());
        assert!(eval(doc! { tags: { "$in": ["z", "x"] } }).unwrap());
        assert!(eval(doc! { name: { "$nin": ["Bob"] } }).unwrap());
        assert!(eval(doc! { manager: { "$exists": true } }).unwrap());
        assert!(eval(doc! { missing: { "$exists": false } }).unwrap());
        assert!(!eval(doc! { age: { "$exists": false } }).unwrap());
    }

    #[test]
    fn regex_and_not() {
        assert!(eval(doc! { name: { "$regex": "^Al" } }).unwrap());
        assert!(!eval(doc! { age: { "$regex": "3" } }).unwrap());
        assert!(eval(doc! { age: { "$not": { "$gt": 40 } } }).unwrap());
        let not_ending = doc! { name: { "$not": { "$regex": "ice$" } } };
        assert!(!eval(not_ending).unwrap());
    }

    #[test]
    fn logical_combinators() -> FlatDocResult<()> {
        assert!(eval(doc! { "$or": [{ name: "Bob" }, { age: 30 }] })?);
        assert!(!eval(doc! { "$and": [{ name: "Alice" }, { age: 31 }] })?);
        assert!(eval(doc! { "$nor": [{ name: "Bob" }, { age: 31 }] })?);
        assert!(!eval(doc! { "$or": [] })?);
        assert!(eval(doc! { "$and": [] })?);
        Ok(())
    }

    #[test]
    fn malformed_queries_are_filter_errors() {
        let cases = vec![
            doc! { age: { "$in": 30 } },
            doc! { age: { "$exists": "yes" } },
            doc! { name: { "$regex": "(" } },
            doc! { age: { "$not": 3 } },
            doc! { age: { "$between": [1, 2] } },
            doc! { "$or": { age: 30 } },
            doc! { "$and": [1] },
            doc! { "$where": "true" },
        ];
        for query in cases {
            let err = eval(query.clone()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FilterError, "query {:?}", query);
        }
    }

    #[test]
    fn regex_is_compiled_once() {
        let evaluator = DefaultQueryEvaluator::new();
        let query = doc! { name: { "$regex": "^A" } };
        assert!(evaluator.evaluate(&person(), &query).unwrap());
        assert!(evaluator.evaluate(&person(), &query).unwrap());
        assert_eq!(evaluator.patterns.lock().len(), 1);
    }

    #[test]
    fn regex_cache_is_bounded() {
        let evaluator = DefaultQueryEvaluator::with_cache_size(2);
        for pattern in ["^A", "^Al", "^Ali", "ice$"] {
            let query = doc! { name: { "$regex": pattern } };
            assert!(evaluator.evaluate(&person(), &query).unwrap());
        }

        let patterns = evaluator.patterns.lock();
        assert_eq!(patterns.len(), 2);
        assert!(patterns.contains("ice$"));
        assert!(patterns.contains("^Ali"));
        assert!(!patterns.contains("^A"));
    }
}
