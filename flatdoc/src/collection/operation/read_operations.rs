use super::IndexOperations;
use crate::collection::Document;
use crate::common::{Value, OP_EQ, OP_GT, OP_IN, OP_LT, OP_OR, RANGE_SENTINEL};
use crate::errors::FlatDocResult;
use crate::index::{EqualityIndex, OrderedIndex};
use crate::query::QueryEvaluator;
use crate::store::KeyedTable;
use itertools::Itertools;
use std::sync::Arc;

/// Resolves queries, through an index when one applies to the query and by
/// scanning the document table otherwise.
pub(crate) struct ReadOperations {
    collection_name: String,
    evaluator: Arc<dyn QueryEvaluator>,
}

impl ReadOperations {
    pub(crate) fn new(collection_name: &str, evaluator: Arc<dyn QueryEvaluator>) -> Self {
        ReadOperations {
            collection_name: collection_name.to_string(),
            evaluator,
        }
    }

    pub(crate) fn set_evaluator(&mut self, evaluator: Arc<dyn QueryEvaluator>) {
        self.evaluator = evaluator;
    }

    /// Finds the documents matching `query`.
    ///
    /// A query on a single field is first offered to the range index of that
    /// field, whose answer is used only when it found ids; then to its
    /// equality index, whose answer is final once the lookup applies.
    /// Anything else scans the table in iteration order.
    pub(crate) fn find(
        &self,
        documents: &KeyedTable<Document>,
        indexes: &IndexOperations,
        query: &Document,
    ) -> FlatDocResult<Vec<Document>> {
        if let Some((field, condition)) = single_field(query) {
            if let Some(index) = indexes.range_index(field) {
                if let Some(ids) = range_lookup(index, condition) {
                    if !ids.is_empty() {
                        log::debug!(
                            "Range index on '{}' served {} ids in collection {}",
                            field,
                            ids.len(),
                            self.collection_name
                        );
                        return Ok(fetch(documents, &ids));
                    }
                    log::debug!("Range index on '{}' found nothing, scanning", field);
                }
            }

            if let Some(index) = indexes.equality_index(field) {
                if let Some(ids) = equality_lookup(index, condition)? {
                    log::debug!(
                        "Equality index on '{}' served {} ids in collection {}",
                        field,
                        ids.len(),
                        self.collection_name
                    );
                    return Ok(fetch(documents, &ids));
                }
            }
        }

        log::debug!(
            "Scanning {} documents of collection {}",
            documents.size(),
            self.collection_name
        );
        let mut result = Vec::new();
        for (_, document) in documents.iter() {
            if self.evaluator.evaluate(document, query)? {
                result.push(document.clone());
            }
        }
        Ok(result)
    }
}

/// The field and condition of a query with exactly one key, other than the
/// logical or.
fn single_field(query: &Document) -> Option<(&str, &Value)> {
    if query.size() != 1 {
        return None;
    }
    query
        .iter()
        .next()
        .filter(|(field, _)| field.as_str() != OP_OR)
        .map(|(field, condition)| (field.as_str(), condition))
}

/// Stored documents of `ids`, in the given order. Ids no longer in the
/// table are skipped.
fn fetch(documents: &KeyedTable<Document>, ids: &[String]) -> Vec<Document> {
    ids.iter()
        .filter_map(|id| documents.get(id).cloned())
        .collect()
}

fn numeric_operand(condition: &Document, operator: &str) -> Option<f64> {
    condition
        .get(operator)
        .filter(|value| value.is_number())
        .and_then(|value| value.as_f64())
}

/// Range index answer for a condition of exactly `{$eq}`, `{$gt}`, `{$lt}`
/// or `{$gt, $lt}` with numeric operands. `None` when the index does not
/// apply.
fn range_lookup(index: &OrderedIndex, condition: &Value) -> Option<Vec<String>> {
    let condition = condition.as_document()?;
    let operators: Vec<&str> = condition
        .iter()
        .map(|(key, _)| key.as_str())
        .sorted()
        .collect();

    match operators.as_slice() {
        [OP_EQ] => Some(index.search(numeric_operand(condition, OP_EQ)?)),
        [OP_GT] => Some(index.range_search(
            numeric_operand(condition, OP_GT)?,
            RANGE_SENTINEL,
            false,
            false,
        )),
        [OP_LT] => Some(index.range_search(
            -RANGE_SENTINEL,
            numeric_operand(condition, OP_LT)?,
            false,
            false,
        )),
        [OP_GT, OP_LT] => Some(index.range_search(
            numeric_operand(condition, OP_GT)?,
            numeric_operand(condition, OP_LT)?,
            false,
            false,
        )),
        _ => None,
    }
}

/// Equality index answer for a bare value, `{$eq}` or `{$in}`. `None` when
/// the index does not apply, or when the bucket of a single value does not
/// exist.
fn equality_lookup(
    index: &EqualityIndex,
    condition: &Value,
) -> FlatDocResult<Option<Vec<String>>> {
    let operators = match condition {
        Value::Document(operators) => operators,
        value => return Ok(index.lookup(value)?.cloned()),
    };

    if operators.size() != 1 {
        return Ok(None);
    }

    if let Some(value) = operators.get(OP_EQ) {
        return Ok(index.lookup(value)?.cloned());
    }

    if let Some(Value::Array(values)) = operators.get(OP_IN) {
        let mut ids = Vec::new();
        for value in values {
            if let Some(bucket) = index.lookup(value)? {
                ids.extend(bucket.iter().cloned());
            }
        }
        return Ok(Some(ids.into_iter().unique().collect()));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn single_field_excludes_or_and_multi_key_queries() {
        assert_eq!(single_field(&doc! { age: 3 }).map(|(f, _)| f), Some("age"));
        assert!(single_field(&doc! { "$or": [] }).is_none());
        assert!(single_field(&doc! { a: 1, b: 2 }).is_none());
        assert!(single_field(&doc! {}).is_none());
    }

    #[test]
    fn range_lookup_shapes() {
        let mut index = OrderedIndex::default();
        index.insert(30.0, "a");
        index.insert(45.0, "b");
        index.insert(45.0, "c");

        let lookup = |condition: Document| range_lookup(&index, &Value::from(condition));
        let upper: Vec<String> = vec!["b".into(), "c".into()];
        assert_eq!(lookup(doc! { "$eq": 45 }), Some(upper.clone()));
        assert_eq!(lookup(doc! { "$gt": 30 }), Some(upper));
        assert_eq!(lookup(doc! { "$lt": 45 }), Some(vec!["a".into()]));
        assert_eq!(
            lookup(doc! { "$gt": 29, "$lt": 50 }),
            Some(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(lookup(doc! { "$eq": 1 }), Some(vec![]));
        assert_eq!(lookup(doc! { "$gte": 30 }), None);
        assert_eq!(lookup(doc! { "$gt": 30, "$ne": 45 }), None);
        assert_eq!(lookup(doc! { "$eq": "45" }), None);
        assert_eq!(range_lookup(&index, &Value::from(45)), None);
    }

    #[test]
    fn equality_lookup_shapes() {
        let mut index = EqualityIndex::new();
        index.add(&Value::from("x"), "1").unwrap();
        index.add(&Value::from("y"), "2").unwrap();

        let lookup = |condition: Value| equality_lookup(&index, &condition).unwrap();
        assert_eq!(lookup(Value::from("x")), Some(vec!["1".into()]));
        assert_eq!(lookup(Value::from("z")), None);
        let eq_y = Value::from(doc! { "$eq": "y" });
        assert_eq!(lookup(eq_y), Some(vec!["2".into()]));
        assert_eq!(lookup(Value::from(doc! { "$eq": "z" })), None);
        assert_eq!(
            lookup(Value::from(doc! { "$in": ["y", "x", "y", "z"] })),
            Some(vec!["2".into(), "1".into()])
        );
        assert_eq!(lookup(Value::from(doc! { "$in": ["z"] })), Some(vec![]));
        assert_eq!(lookup(Value::from(doc! { "$ne": "x" })), None);
        assert_eq!(lookup(Value::from(doc! { "$in": "x" })), None);
    }
}
