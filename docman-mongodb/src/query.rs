//! Translation of docman filters and updates into MongoDB query syntax.
//!
//! String operators are matched case-sensitively against the literal text, the same
//! way the in-memory backend evaluates them, so user input is regex-escaped. Operators
//! on array fields are left to the server, which applies them to each element.

use bson::{Bson, Document, doc};

use docman_core::{
    error::DocumentError,
    query::{FieldOp, Filter, QueryVisitor, Sort, SortDirection, Update, UpdateOp},
};

/// Translates docman filters into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub fn translate(filter: &Filter) -> Result<Document, DocumentError> {
        MongoQueryTranslator.visit_filter(filter)
    }
}

/// Escapes regex metacharacters so `text` matches literally.
pub(crate) fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}/-".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn regex(pattern: String) -> Document {
    doc! { "$regex": pattern }
}

fn as_array(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentError;

    fn visit_all(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(doc! {})
    }

    fn visit_and(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        if filters.is_empty() {
            return self.visit_all();
        }

        Ok(doc! {
            "$and": filters
                .iter()
                .map(|filter| self.visit_filter(filter))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        // $or rejects an empty list; every stored document has an _id
        if filters.is_empty() {
            return Ok(doc! { "_id": { "$exists": false } });
        }

        Ok(doc! {
            "$or": filters
                .iter()
                .map(|filter| self.visit_filter(filter))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_filter(filter)?],
        })
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let invalid = |expected: &str| {
            DocumentError::InvalidDocument(format!(
                "{:?} on '{}' requires {}, got {}",
                op, field, expected, value
            ))
        };

        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => regex(escape_regex(s)),
                    other => doc! { "$elemMatch": { "$eq": other } },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": regex(escape_regex(s)) },
                    other => doc! { "$not": { "$elemMatch": { "$eq": other } } },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => regex(format!("^{}", escape_regex(s))),
                    _ => return Err(invalid("a string")),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => regex(format!("{}$", escape_regex(s))),
                    _ => return Err(invalid("a string")),
                },
                FieldOp::AnyOf => doc! { "$in": as_array(value) },
                FieldOp::NoneOf => doc! { "$nin": as_array(value) },
            }
        })
    }
}

/// Builds the `$set`/`$unset`/`$inc` update document for `update`.
///
/// Later operations on the same field override earlier ones within a group.
pub(crate) fn translate_update(update: &Update) -> Document {
    let mut set = Document::new();
    let mut unset = Document::new();
    let mut inc = Document::new();

    for op in &update.ops {
        match op {
            UpdateOp::Set(field, value) => {
                set.insert(field.clone(), value.clone());
            }
            UpdateOp::Unset(field) => {
                unset.insert(field.clone(), "");
            }
            UpdateOp::Inc(field, amount) => {
                inc.insert(field.clone(), amount.clone());
            }
        }
    }

    let mut translated = Document::new();
    for (operator, fields) in [("$set", set), ("$unset", unset), ("$inc", inc)] {
        if !fields.is_empty() {
            translated.insert(operator, fields);
        }
    }
    translated
}

/// Builds the sort document for `sort`, keeping key order.
pub(crate) fn translate_sort(sort: &[Sort]) -> Document {
    sort.iter()
        .map(|key| {
            (
                key.field.clone(),
                Bson::Int32(match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }),
            )
        })
        .collect()
}
