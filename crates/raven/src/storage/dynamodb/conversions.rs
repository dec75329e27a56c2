//! Conversions between the core attribute tree and the SDK's attribute values.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue as DdbValue;

use raven_core::attribute::{AttributeValue, Item};
use raven_core::storage::StoreError;

pub type DdbItem = HashMap<String, DdbValue>;

pub fn to_ddb(value: AttributeValue) -> DdbValue {
    match value {
        AttributeValue::S(s) => DdbValue::S(s),
        AttributeValue::N(n) => DdbValue::N(n),
        AttributeValue::Bool(b) => DdbValue::Bool(b),
        AttributeValue::Null => DdbValue::Null(true),
        AttributeValue::L(items) => DdbValue::L(items.into_iter().map(to_ddb).collect()),
        AttributeValue::M(entries) => DdbValue::M(to_ddb_item(entries)),
        AttributeValue::Ss(members) => DdbValue::Ss(members),
        AttributeValue::Ns(members) => DdbValue::Ns(members),
    }
}

pub fn to_ddb_item(item: Item) -> DdbItem {
    item.into_iter().map(|(k, v)| (k, to_ddb(v))).collect()
}

/// Binary attributes have no counterpart in the attribute tree and are rejected.
pub fn from_ddb(value: DdbValue) -> Result<AttributeValue, StoreError> {
    match value {
        DdbValue::S(s) => Ok(AttributeValue::S(s)),
        DdbValue::N(n) => Ok(AttributeValue::N(n)),
        DdbValue::Bool(b) => Ok(AttributeValue::Bool(b)),
        DdbValue::Null(_) => Ok(AttributeValue::Null),
        DdbValue::L(items) => items
            .into_iter()
            .map(from_ddb)
            .collect::<Result<_, _>>()
            .map(AttributeValue::L),
        DdbValue::M(entries) => from_ddb_item(entries).map(AttributeValue::M),
        DdbValue::Ss(members) => Ok(AttributeValue::Ss(members)),
        DdbValue::Ns(members) => Ok(AttributeValue::Ns(members)),
        DdbValue::B(_) | DdbValue::Bs(_) => Err(StoreError::InvalidData(
            "binary attributes are not supported".to_string(),
        )),
        other => Err(StoreError::InvalidData(format!(
            "unsupported attribute value: {other:?}"
        ))),
    }
}

pub fn from_ddb_item(item: DdbItem) -> Result<Item, StoreError> {
    item.into_iter()
        .map(|(k, v)| from_ddb(v).map(|v| (k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::primitives::Blob;

    use super::*;

    #[test]
    fn test_nested_values_convert_both_ways() {
        let item: Item = HashMap::from([
            ("id".to_string(), AttributeValue::S("a1".to_string())),
            ("price".to_string(), AttributeValue::N("2.5".to_string())),
            (
                "tags".to_string(),
                AttributeValue::L(vec![AttributeValue::S("x".to_string())]),
            ),
            ("note".to_string(), AttributeValue::Null),
            (
                "allergens".to_string(),
                AttributeValue::Ss(vec!["nuts".to_string()]),
            ),
        ]);

        let ddb = to_ddb_item(item.clone());
        assert_eq!(ddb.get("note"), Some(&DdbValue::Null(true)));
        assert_eq!(ddb.get("price"), Some(&DdbValue::N("2.5".to_string())));

        assert_eq!(from_ddb_item(ddb).unwrap(), item);
    }

    #[test]
    fn test_binary_is_rejected() {
        let err = from_ddb(DdbValue::B(Blob::new(vec![1, 2]))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }
}
