//! DynamoDB implementation of the core `KeyValueStore`.

use async_trait::async_trait;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::types::ReturnValue;
use aws_sdk_dynamodb::Client;

use raven_core::attribute::Item;
use raven_core::keys::KEY_ATTRIBUTE;
use raven_core::storage::{KeyCondition, KeyValueStore, StoreError, TableDescription};

use super::conversions::{from_ddb_item, to_ddb, to_ddb_item, DdbItem};
use super::error::map_sdk_error;
use crate::config::Config;

/// DynamoDB-based store; every table is keyed by the `id` string attribute.
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store using the default credential chain, the configured
    /// region and the optional endpoint override.
    pub async fn connect(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));

        match &config.dynamodb_endpoint {
            Some(endpoint) => {
                tracing::warn!(%endpoint, "using custom DynamoDB endpoint");
                loader = loader.endpoint_url(endpoint);
            }
            None => tracing::info!(region = %config.aws_region, "using AWS DynamoDB endpoint"),
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }

    fn collect(items: Option<Vec<DdbItem>>, into: &mut Vec<Item>) -> Result<(), StoreError> {
        for item in items.unwrap_or_default() {
            into.push(from_ddb_item(item)?);
        }
        Ok(())
    }
}

/// Builds `SET #f0 = :v0, #f1 = :v1` for the given attribute names.
fn set_expression(count: usize) -> String {
    let assignments: Vec<String> = (0..count).map(|i| format!("#f{i} = :v{i}")).collect();
    format!("SET {}", assignments.join(", "))
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_ddb_item(item)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table, "PutItem"))?;
        Ok(())
    }

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_ddb_item(key)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table, "GetItem"))?;

        result.item.map(from_ddb_item).transpose()
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<DdbItem> = None;

        loop {
            let result = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, table, "Scan"))?;

            Self::collect(result.items, &mut items)?;

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        tracing::debug!(table, count = items.len(), "scan complete");
        Ok(items)
    }

    async fn query(
        &self,
        table: &str,
        index: &str,
        condition: &KeyCondition,
    ) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<DdbItem> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(table)
                .index_name(index)
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", &condition.attribute)
                .expression_attribute_values(":v", to_ddb(condition.value.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, table, "Query"))?;

            Self::collect(result.items, &mut items)?;

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn delete(&self, table: &str, key: Item) -> Result<bool, StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_ddb_item(key)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table, "DeleteItem"))?;

        Ok(result.attributes.is_some_and(|old| !old.is_empty()))
    }

    async fn update(
        &self,
        table: &str,
        key: Item,
        changes: Item,
    ) -> Result<Option<Item>, StoreError> {
        let changes: Vec<_> = changes
            .into_iter()
            .filter(|(name, _)| name != KEY_ATTRIBUTE)
            .collect();
        if changes.is_empty() {
            return self.get(table, key).await;
        }

        let mut request = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(to_ddb_item(key)))
            .update_expression(set_expression(changes.len()))
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", KEY_ATTRIBUTE)
            .return_values(ReturnValue::AllNew);

        for (i, (name, value)) in changes.into_iter().enumerate() {
            request = request
                .expression_attribute_names(format!("#f{i}"), name)
                .expression_attribute_values(format!(":v{i}"), to_ddb(value));
        }

        match request.send().await {
            Ok(result) => result.attributes.map(from_ddb_item).transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(map_sdk_error(err, table, "UpdateItem")),
        }
    }

    async fn describe(&self, table: &str) -> Result<TableDescription, StoreError> {
        let result = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, table, "DescribeTable"))?;

        let description = result.table;
        Ok(TableDescription {
            name: description
                .as_ref()
                .and_then(|t| t.table_name.clone())
                .unwrap_or_else(|| table.to_string()),
            status: description
                .as_ref()
                .and_then(|t| t.table_status.as_ref())
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            item_count: description.as_ref().and_then(|t| t.item_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_expression() {
        assert_eq!(set_expression(1), "SET #f0 = :v0");
        assert_eq!(set_expression(2), "SET #f0 = :v0, #f1 = :v1");
    }
}
