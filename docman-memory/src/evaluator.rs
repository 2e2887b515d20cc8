//! Filter evaluation and value ordering for in-memory documents.

use bson::{Bson, DateTime, Document, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use docman_core::{
    error::DocumentError,
    query::{Filter, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Comparable view of a BSON value.
///
/// Integers and doubles collapse into one numeric variant so that `1`, `1_i64` and
/// `1.0` compare equal, as they do on a database server.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Anything else, compared by exact equality only.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'b> PartialEq<Comparable<'b>> for Comparable<'_> {
    fn eq(&self, other: &Comparable<'b>) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(*key).is_some_and(|other| value == other))
            }
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'b> PartialOrd<Comparable<'b>> for Comparable<'_> {
    fn partial_cmp(&self, other: &Comparable<'b>) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Looks up `path` in `document`, descending into sub-documents on `.`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head) {
            Some(Bson::Document(inner)) => lookup(inner, rest),
            _ => None,
        },
    }
}

/// Orders two documents by `sort` keys, most significant first.
///
/// Missing fields sort as null, before any other value.
pub(crate) fn compare_documents(left: &Document, right: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let a = lookup(left, &key.field).map(Comparable::from);
        let b = lookup(right, &key.field).map(Comparable::from);

        let ordering = match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        };

        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Evaluates filters against a single document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn matches(document: &'a Document, filter: &Filter) -> bool {
        DocumentEvaluator::new(document)
            .visit_filter(filter)
            .unwrap_or(false)
    }
}

/// Whether `actual` or, for arrays, any of its elements satisfies `predicate`.
fn any_value<'a>(actual: &Comparable<'a>, predicate: impl Fn(&Comparable<'a>) -> bool) -> bool {
    predicate(actual)
        || matches!(actual, Comparable::Array(items) if items.iter().any(|item| predicate(item)))
}

fn string_test(
    actual: &Comparable<'_>,
    expected: &Comparable<'_>,
    test: fn(&str, &str) -> bool,
) -> bool {
    let Comparable::String(needle) = expected else {
        return false;
    };

    any_value(actual, |value| match value {
        Comparable::String(text) => test(text, needle),
        _ => false,
    })
}

fn contains(actual: &Comparable<'_>, expected: &Comparable<'_>) -> bool {
    match expected {
        Comparable::String(_) => string_test(actual, expected, |text, needle| text.contains(needle)),
        _ => match actual {
            Comparable::Array(items) => items.iter().any(|item| item == expected),
            _ => false,
        },
    }
}

fn any_of(actual: &Comparable<'_>, expected: &Comparable<'_>) -> bool {
    match expected {
        Comparable::Array(values) => values
            .iter()
            .any(|value| any_value(actual, |candidate| candidate == value)),
        single => any_value(actual, |candidate| candidate == single),
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentError;

    fn visit_all(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(true)
    }

    fn visit_and(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        for filter in filters {
            if !self.visit_filter(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        for filter in filters {
            if self.visit_filter(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_filter(filter)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let expected = Comparable::from(value);

        // a missing field behaves as null for equality, and never satisfies anything else
        let Some(field_value) = lookup(self.document, field) else {
            return Ok(match op {
                FieldOp::Eq => expected == Comparable::Null,
                FieldOp::Ne => expected != Comparable::Null,
                FieldOp::NotContains | FieldOp::NoneOf => true,
                _ => false,
            });
        };
        let actual = Comparable::from(field_value);

        // array fields match when the whole array or any element does
        Ok(match op {
            FieldOp::Eq => any_value(&actual, |value| *value == expected),
            FieldOp::Ne => !any_value(&actual, |value| *value == expected),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                any_value(&actual, |value| match value.partial_cmp(&expected) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                })
            }
            FieldOp::Contains => contains(&actual, &expected),
            FieldOp::NotContains => !contains(&actual, &expected),
            FieldOp::StartsWith => {
                string_test(&actual, &expected, |text, prefix| text.starts_with(prefix))
            }
            FieldOp::EndsWith => {
                string_test(&actual, &expected, |text, suffix| text.ends_with(suffix))
            }
            FieldOp::AnyOf => any_of(&actual, &expected),
            FieldOp::NoneOf => !any_of(&actual, &expected),
        })
    }
}
