//! Filters, queries and updates passed from managers to backends.
//!
//! Managers never build driver-specific query documents themselves. They hand a
//! [`Filter`] tree (optionally wrapped in a [`Query`] with paging and sorting) or an
//! [`Update`] to the backend, which translates it with a [`QueryVisitor`].
//!
//! # Example
//!
//! ```ignore
//! use docman::query::{Filter, Query, SortDirection, Update};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("status", "active").and(Filter::gte("age", 18)))
//!     .sort("created_at", SortDirection::Desc)
//!     .limit(10)
//!     .build();
//!
//! let update = Update::new().set("status", "archived").inc("revision", 1);
//! ```

use bson::Bson;
use std::fmt;

use crate::error::DocumentError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// String contains substring, or array contains element.
    Contains,
    /// Negation of [`FieldOp::Contains`].
    NotContains,
    StartsWith,
    EndsWith,
    /// Field equals, or array field holds, any of the values.
    AnyOf,
    /// Negation of [`FieldOp::AnyOf`].
    NoneOf,
}

impl FieldOp {
    fn symbol(&self) -> &'static str {
        match self {
            FieldOp::Eq => "==",
            FieldOp::Ne => "!=",
            FieldOp::Gt => ">",
            FieldOp::Gte => ">=",
            FieldOp::Lt => "<",
            FieldOp::Lte => "<=",
            FieldOp::Contains => "contains",
            FieldOp::NotContains => "not contains",
            FieldOp::StartsWith => "starts with",
            FieldOp::EndsWith => "ends with",
            FieldOp::AnyOf => "any of",
            FieldOp::NoneOf => "none of",
        }
    }
}

/// A filter expression selecting documents of a collection.
///
/// `Filter::All` matches every document and is what managers use for `{}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    /// Logical AND (all must match).
    And(Vec<Filter>),
    /// Logical OR (any must match).
    Or(Vec<Filter>),
    /// Logical NOT.
    Not(Box<Filter>),
    /// Field presence check.
    Exists(String, bool),
    /// Field comparison.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Filter {
    fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Filter::Field { field: field.into(), op, value: value.into() }
    }

    /// Matches the document whose `_id` equals `id`.
    pub fn id(id: impl Into<Bson>) -> Self {
        Filter::eq("_id", id)
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Lte, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::Contains, value)
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::NotContains, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::field(field, FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::field(field, FieldOp::EndsWith, value.into())
    }

    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::AnyOf, values)
    }

    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Self {
        Filter::field(field, FieldOp::NoneOf, values)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into(), false)
    }

    pub fn all_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn either(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Combines with `other` using logical AND, flattening nested ANDs.
    ///
    /// `Filter::All` is the identity element.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And(mut list), other) => {
                list.push(other);
                Filter::And(list)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// Combines with `other` using logical OR, flattening nested ORs.
    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut list) => {
                list.push(other);
                Filter::Or(list)
            }
            _ => Filter::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, filters: &[Filter], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", filter)?;
            }
            write!(f, ")")
        }

        match self {
            Filter::All => write!(f, "{{}}"),
            Filter::And(filters) => join(f, filters, "and"),
            Filter::Or(filters) => join(f, filters, "or"),
            Filter::Not(filter) => write!(f, "not {}", filter),
            Filter::Exists(field, true) => write!(f, "{} exists", field),
            Filter::Exists(field, false) => write!(f, "{} not exists", field),
            Filter::Field { field, op, value } => write!(f, "{} {} {}", field, op.symbol(), value),
        }
    }
}

/// A structured find request: filter plus paging and sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub skip: Option<usize>,
    /// Sort keys, most significant first.
    pub sort: Vec<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

impl From<Filter> for Query {
    fn from(filter: Filter) -> Self {
        Query { filter, ..Query::default() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.query.filter = filter;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.query.skip = Some(skip);
        self
    }

    /// Appends a sort key. Earlier keys take precedence.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// A single field modification.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Bson),
    Unset(String),
    /// Adds a numeric amount to a field, creating it when absent.
    Inc(String, Bson),
}

/// An ordered list of field modifications applied to every matched document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), amount.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Outcome of an update or replace operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the filter.
    pub matched: u64,
    /// Number of documents actually changed.
    pub modified: u64,
    /// `_id` of the document inserted by an upsert, if any.
    pub upserted_id: Option<Bson>,
}

/// Walks a [`Filter`] tree, producing a backend-specific representation.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentError>;

    fn visit_all(&mut self) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_filter(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        match filter {
            Filter::All => self.visit_all(),
            Filter::And(filters) => self.visit_and(filters),
            Filter::Or(filters) => self.visit_or(filters),
            Filter::Not(filter) => self.visit_not(filter),
            Filter::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Filter::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
