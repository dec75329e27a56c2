use std::fmt;

use serde::Serialize;

use crate::attribute::AttributeValue;

/// Equality condition on an index's partition key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub attribute: String,
    pub value: AttributeValue,
}

impl KeyCondition {
    pub fn equals(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Table metadata returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub name: String,
    pub status: String,
    pub item_count: Option<i64>,
}

/// Store call that failed, carried in [`RepositoryError::Store`](super::RepositoryError).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Put,
    Get,
    Scan,
    Query,
    Delete,
    Update,
    Describe,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Put => "put",
            StoreOperation::Get => "get",
            StoreOperation::Scan => "scan",
            StoreOperation::Query => "query",
            StoreOperation::Delete => "delete",
            StoreOperation::Update => "update",
            StoreOperation::Describe => "describe",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
