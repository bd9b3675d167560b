//! Document evaluation: operand casting, matching, sorting, projection, and
//! aggregation over JSON documents
//!
//! Values compare within a type bracket, with brackets ordered
//! null < number < string < object < array < boolean < date. Strings that
//! parse as RFC 3339 timestamps are dates. A condition on an array field
//! holds when it holds for any element.

use chrono::{DateTime, Datelike, Utc};
use serde_json::{Number, Value};
use std::cmp::Ordering;

use super::error::{StoreError, StoreOperation};
use crate::pipeline::{Accumulator, Expr, Pipeline, Stage};
use crate::query::{Condition, Filter, Operator, Projection, SortDirection, SortKey};
use crate::tour::{cast_value, field_kind, fields, parse_date, CastError, Document, HIDDEN_FIELDS};

/// Comparison an operator resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Gte,
    Gt,
    Lte,
    Lt,
    Ne,
    In,
    Nin,
}

/// Resolve an operator; engine-spelled verbatim keys are honored
fn resolve(op: &Operator) -> Option<Comparison> {
    match op {
        Operator::Gte => Some(Comparison::Gte),
        Operator::Gt => Some(Comparison::Gt),
        Operator::Lte => Some(Comparison::Lte),
        Operator::Lt => Some(Comparison::Lt),
        Operator::Ne => Some(Comparison::Ne),
        Operator::Verbatim(key) => match key.as_str() {
            "$gte" => Some(Comparison::Gte),
            "$gt" => Some(Comparison::Gt),
            "$lte" => Some(Comparison::Lte),
            "$lt" => Some(Comparison::Lt),
            "$ne" => Some(Comparison::Ne),
            "$in" => Some(Comparison::In),
            "$nin" => Some(Comparison::Nin),
            _ => None,
        },
    }
}

/// Cast every operand of `filter` to the schema type of its field
///
/// Fields unknown to the schema keep their operands as given. Operators the
/// engine does not know are cast failures on their field.
pub(crate) fn cast_filter(filter: &Filter, operation: StoreOperation) -> Result<Filter, StoreError> {
    let mut cast = Filter::new();

    for (field, condition) in filter.clauses() {
        let Some(kind) = field_kind(field) else {
            cast = cast.with_condition(field.clone(), condition.clone());
            continue;
        };
        let element = kind.element();
        let operand = |value: &Value| -> Result<Value, CastError> {
            match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| cast_value(element, item, field))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                single => cast_value(element, single, field),
            }
        };

        let condition = match condition {
            Condition::Equals(value) => Condition::Equals(
                operand(value).map_err(|err| StoreError::cast(operation, &err))?,
            ),
            Condition::Compare(ops) => {
                let mut cast_ops = Vec::with_capacity(ops.len());
                for (op, value) in ops {
                    let cast_operand = match resolve(op) {
                        Some(_) => operand(value),
                        None => {
                            let mut shown = serde_json::Map::new();
                            shown.insert(op.as_str().to_string(), value.clone());
                            Err(CastError::new(kind, &Value::Object(shown), field.clone()))
                        }
                    }
                    .map_err(|err| StoreError::cast(operation, &err))?;
                    cast_ops.push((op.clone(), cast_operand));
                }
                Condition::Compare(cast_ops)
            }
        };
        cast = cast.with_condition(field.clone(), condition);
    }

    Ok(cast)
}

/// Whether `document` satisfies every clause of `filter`
pub(crate) fn matches(document: &Document, filter: &Filter) -> bool {
    filter
        .clauses()
        .iter()
        .all(|(field, condition)| condition_holds(document.get(field), condition))
}

fn condition_holds(actual: Option<&Value>, condition: &Condition) -> bool {
    match condition {
        Condition::Equals(Value::Array(options)) => options.iter().any(|o| equals(actual, o)),
        Condition::Equals(expected) => equals(actual, expected),
        Condition::Compare(ops) => ops.iter().all(|(op, operand)| match resolve(op) {
            Some(Comparison::Ne) => !equals(actual, operand),
            Some(Comparison::In) => members(operand).iter().any(|o| equals(actual, o)),
            Some(Comparison::Nin) => !members(operand).iter().any(|o| equals(actual, o)),
            Some(range) => candidates(actual)
                .iter()
                .any(|value| in_range(value, operand, range)),
            None => false,
        }),
    }
}

fn members(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        single => vec![single.clone()],
    }
}

/// Values a condition is tested against: the elements of an array, else the value
fn candidates(actual: Option<&Value>) -> Vec<&Value> {
    match actual {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    if expected.is_null() {
        return matches!(actual, None | Some(Value::Null));
    }
    if let Some(Value::Array(items)) = actual {
        if expected.is_array() && compare_values(actual, Some(expected)) == Ordering::Equal {
            return true;
        }
        return items
            .iter()
            .any(|item| compare_values(Some(item), Some(expected)) == Ordering::Equal);
    }
    actual.is_some_and(|value| compare_values(Some(value), Some(expected)) == Ordering::Equal)
}

fn in_range(value: &Value, bound: &Value, comparison: Comparison) -> bool {
    if bracket(Some(value)) != bracket(Some(bound)) {
        return false;
    }
    let ordering = compare_values(Some(value), Some(bound));
    match comparison {
        Comparison::Gte => ordering != Ordering::Less,
        Comparison::Gt => ordering == Ordering::Greater,
        Comparison::Lte => ordering != Ordering::Greater,
        Comparison::Lt => ordering == Ordering::Less,
        _ => false,
    }
}

fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|date| date.with_timezone(&Utc)),
        _ => None,
    }
}

fn bracket(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(v @ Value::String(_)) if as_date(v).is_some() => 6,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over JSON values; missing sorts with `null`
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a_bracket, b_bracket) = (bracket(a), bracket(b));
    if a_bracket != b_bracket {
        return a_bracket.cmp(&b_bracket);
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => compare_numbers(x, y),
        (Some(x @ Value::String(_)), Some(y @ Value::String(_))) if a_bracket == 6 => {
            as_date(x).cmp(&as_date(y))
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(xs)), Some(Value::Array(ys))) => {
            for (x, y) in xs.iter().zip(ys) {
                let ordering = compare_values(Some(x), Some(y));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Some(Value::Object(xs)), Some(Value::Object(ys))) => {
            for ((xk, xv), (yk, yv)) in xs.iter().zip(ys) {
                let ordering = xk.cmp(yk).then_with(|| compare_values(Some(xv), Some(yv)));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            xs.len().cmp(&ys.len())
        }
        _ => Ordering::Equal,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Value a document sorts by: arrays sort by their smallest element
/// ascending and their largest descending
fn sort_value<'a>(document: &'a Document, key: &SortKey) -> Option<&'a Value> {
    match document.get(&key.field) {
        Some(Value::Array(items)) => {
            let ordered = |a: &&Value, b: &&Value| compare_values(Some(*a), Some(*b));
            match key.direction {
                SortDirection::Ascending => items.iter().min_by(ordered),
                SortDirection::Descending => items.iter().max_by(ordered),
            }
        }
        other => other,
    }
}

/// Stable multi-key sort
pub(crate) fn sort(documents: &mut [Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ordering = compare_values(sort_value(a, key), sort_value(b, key));
                match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Apply a skip/limit window
///
/// A negative skip is rejected; a negative limit counts as its absolute
/// value and zero means no limit.
pub(crate) fn window(
    documents: Vec<Document>,
    skip: Option<i64>,
    limit: Option<i64>,
    operation: StoreOperation,
) -> Result<Vec<Document>, StoreError> {
    let skip = skip.unwrap_or(0);
    if skip < 0 {
        return Err(StoreError::invalid_query(
            operation,
            format!("Skip value must be non-negative, but received: {}", skip),
        ));
    }
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let limit = match limit.map(i64::unsigned_abs) {
        None | Some(0) => usize::MAX,
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
    };

    Ok(documents.into_iter().skip(skip).take(limit).collect())
}

/// Shape a stored document for a read
///
/// Hidden fields are dropped unless an inclusion projection names them.
pub(crate) fn project(document: &Document, projection: Option<&Projection>) -> Document {
    let hidden = |field: &str| {
        HIDDEN_FIELDS.contains(&field) && !projection.is_some_and(|p| p.includes(field))
    };

    let shaped = match projection {
        Some(projection) => reshape(document, projection),
        None => document.clone(),
    };
    shaped.into_iter().filter(|(field, _)| !hidden(field)).collect()
}

/// Apply a projection with no hidden-field rules
pub(crate) fn reshape(document: &Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include { fields: names, exclude_id } => document
            .iter()
            .filter(|(field, _)| {
                if field.as_str() == fields::ID {
                    !exclude_id
                } else {
                    names.iter().any(|name| name == *field)
                }
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect(),
        Projection::Exclude(names) => document
            .iter()
            .filter(|(field, _)| !names.iter().any(|name| name == *field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect(),
    }
}

/// Run `pipeline` over `documents`
pub(crate) fn aggregate(
    documents: Vec<Document>,
    pipeline: &Pipeline,
) -> Result<Vec<Document>, StoreError> {
    let mut documents = documents;

    for stage in pipeline.stages() {
        documents = match stage {
            Stage::Match(filter) => {
                let filter = cast_filter(filter, StoreOperation::Aggregate)?;
                documents
                    .into_iter()
                    .filter(|document| matches(document, &filter))
                    .collect()
            }
            Stage::Unwind(field) => unwind(documents, field),
            Stage::Group { key, accumulators } => group(&documents, key, accumulators),
            Stage::AddFields(assignments) => documents
                .into_iter()
                .map(|mut document| {
                    for (name, expr) in assignments {
                        let value = evaluate(&document, expr);
                        document.insert(name.clone(), value);
                    }
                    document
                })
                .collect(),
            Stage::Project(projection) => documents
                .iter()
                .map(|document| reshape(document, projection))
                .collect(),
            Stage::Sort(keys) => {
                sort(&mut documents, keys);
                documents
            }
            Stage::Limit(n) => {
                documents.truncate(*n);
                documents
            }
        };
    }

    Ok(documents)
}

fn unwind(documents: Vec<Document>, field: &str) -> Vec<Document> {
    documents
        .into_iter()
        .flat_map(|document| match document.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    let mut copy = document.clone();
                    copy.insert(field.to_string(), item.clone());
                    copy
                })
                .collect::<Vec<_>>(),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => vec![document],
        })
        .collect()
}

fn group(documents: &[Document], key: &Expr, accumulators: &[(String, Accumulator)]) -> Vec<Document> {
    let mut groups: Vec<(Value, Vec<&Document>)> = Vec::new();
    for document in documents {
        let value = evaluate(document, key);
        match groups.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, members)) => members.push(document),
            None => groups.push((value, vec![document])),
        }
    }

    groups
        .into_iter()
        .map(|(value, members)| {
            let mut output = Document::new();
            output.insert(fields::ID.to_string(), value);
            for (name, accumulator) in accumulators {
                output.insert(name.clone(), accumulate(&members, accumulator));
            }
            output
        })
        .collect()
}

fn accumulate(members: &[&Document], accumulator: &Accumulator) -> Value {
    let values = |expr: &Expr| -> Vec<Value> {
        members
            .iter()
            .map(|document| evaluate(document, expr))
            .filter(|value| !value.is_null())
            .collect()
    };

    match accumulator {
        Accumulator::Sum(expr) => sum(&values(expr)),
        Accumulator::Avg(expr) => {
            let numbers: Vec<f64> = values(expr).iter().filter_map(Value::as_f64).collect();
            if numbers.is_empty() {
                return Value::Null;
            }
            let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
            Number::from_f64(mean).map_or(Value::Null, Value::Number)
        }
        Accumulator::Min(expr) => values(expr)
            .into_iter()
            .min_by(|a, b| compare_values(Some(a), Some(b)))
            .unwrap_or(Value::Null),
        Accumulator::Max(expr) => values(expr)
            .into_iter()
            .max_by(|a, b| compare_values(Some(a), Some(b)))
            .unwrap_or(Value::Null),
        Accumulator::Push(expr) => Value::Array(values(expr)),
    }
}

fn sum(values: &[Value]) -> Value {
    let numbers: Vec<&Number> = values
        .iter()
        .filter_map(|value| match value {
            Value::Number(n) => Some(n),
            _ => None,
        })
        .collect();

    let integers: Option<Vec<i64>> = numbers.iter().map(|n| n.as_i64()).collect();
    match integers {
        Some(ints) => Value::from(ints.iter().sum::<i64>()),
        None => {
            let total: f64 = numbers.iter().filter_map(|n| n.as_f64()).sum();
            Number::from_f64(total).map_or(Value::Null, Value::Number)
        }
    }
}

fn evaluate(document: &Document, expr: &Expr) -> Value {
    match expr {
        Expr::Field(name) => document.get(name).cloned().unwrap_or(Value::Null),
        Expr::Literal(value) => value.clone(),
        Expr::ToUpper(inner) => match evaluate(document, inner) {
            Value::Null => Value::String(String::new()),
            Value::String(s) => Value::String(s.to_uppercase()),
            other => Value::String(other.to_string().to_uppercase()),
        },
        Expr::Month(inner) => match evaluate(document, inner) {
            Value::String(s) => parse_date(&s).map_or(Value::Null, |date| Value::from(date.month())),
            _ => Value::Null,
        },
    }
}
