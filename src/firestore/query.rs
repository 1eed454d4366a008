use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::firestore::backup::codec;
use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{CollectionKey, DocumentKey, FieldPath, IntoFieldPath};
use crate::firestore::value::FirestoreValue;

/// Comparison operators usable in a filtered listing.
///
/// Only equality and range comparisons are modelled; the serde form uses the
/// operator spellings of the Firestore query language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "==",
            FilterOperator::NotEqual => "!=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = FirestoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "==" => Ok(FilterOperator::Equal),
            "!=" => Ok(FilterOperator::NotEqual),
            "<" => Ok(FilterOperator::LessThan),
            "<=" => Ok(FilterOperator::LessThanOrEqual),
            ">" => Ok(FilterOperator::GreaterThan),
            ">=" => Ok(FilterOperator::GreaterThanOrEqual),
            other => Err(invalid_argument(format!(
                "Unsupported filter operator '{other}'"
            ))),
        }
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{field, operator, value}` clause of a filtered listing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldFilter")]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn new(
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        Ok(Self {
            field: field.into_field_path()?,
            operator,
            value: value.into(),
        })
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

/// Configuration-file form of a [`FieldFilter`]; `value` is in portable form.
#[derive(Deserialize)]
struct RawFieldFilter {
    field: String,
    op: FilterOperator,
    value: JsonValue,
}

impl TryFrom<RawFieldFilter> for FieldFilter {
    type Error = FirestoreError;

    fn try_from(raw: RawFieldFilter) -> Result<Self, Self::Error> {
        let value = codec::decode_value(&raw.value)?;
        FieldFilter::new(raw.field, raw.op, value)
    }
}

/// A single page request against one collection.
///
/// Results are ordered by document id; `start_after` is the exclusive cursor.
#[derive(Clone, Debug)]
pub struct CollectionQuery {
    collection: CollectionKey,
    filters: Vec<FieldFilter>,
    limit: Option<u32>,
    start_after: Option<DocumentKey>,
}

impl CollectionQuery {
    pub fn new(collection: CollectionKey) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            limit: None,
            start_after: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<FieldFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_start_after(mut self, cursor: Option<DocumentKey>) -> Self {
        self.start_after = cursor;
        self
    }

    pub fn collection(&self) -> &CollectionKey {
        &self.collection
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn start_after(&self) -> Option<&DocumentKey> {
        self.start_after.as_ref()
    }

    pub(crate) fn matches_collection(&self, key: &DocumentKey) -> bool {
        &key.parent() == self.collection()
    }
}
