use std::{env, time::Duration};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Orders table name (default: "orders")
    pub orders_table: String,
    /// Categories table name (default: "categories")
    pub categories_table: String,
    /// Products table name (default: "products")
    pub products_table: String,
    /// Secondary index on the products table keyed by `categoryId`
    /// (default: "categoryId-index")
    pub products_by_category_index: String,
    /// AWS region (default: "eu-central-1")
    pub aws_region: String,
    /// DynamoDB endpoint override for local development.
    /// Note: Only used when the `dynamodb` feature is enabled.
    #[allow(dead_code)]
    pub dynamodb_endpoint: Option<String>,
    /// Per-subscriber queue length for the order stream (default: 64)
    pub subscriber_buffer: usize,
    /// Maximum lifetime of one order stream connection in seconds (default: 3600)
    pub stream_max_duration_seconds: u64,
    /// Request timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ORDERS_TABLE`, `CATEGORIES_TABLE`, `PRODUCTS_TABLE` - table names
    /// - `PRODUCTS_BY_CATEGORY_INDEX` - products-by-category index name
    /// - `AWS_REGION` - AWS region (default: "eu-central-1")
    /// - `DYNAMODB_ENDPOINT` - endpoint override, ignored when blank
    /// - `SUBSCRIBER_BUFFER` - order stream queue length (default: 64)
    /// - `STREAM_MAX_DURATION_SECONDS` - order stream lifetime (default: 3600)
    /// - `REQUEST_TIMEOUT_SECONDS` - request timeout (default: 10)
    pub fn from_env() -> Self {
        Self {
            orders_table: env::var("ORDERS_TABLE").unwrap_or_else(|_| "orders".to_string()),
            categories_table: env::var("CATEGORIES_TABLE")
                .unwrap_or_else(|_| "categories".to_string()),
            products_table: env::var("PRODUCTS_TABLE").unwrap_or_else(|_| "products".to_string()),
            products_by_category_index: env::var("PRODUCTS_BY_CATEGORY_INDEX")
                .unwrap_or_else(|_| "categoryId-index".to_string()),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-central-1".to_string()),
            dynamodb_endpoint: env::var("DYNAMODB_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            subscriber_buffer: env::var("SUBSCRIBER_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(raven_core::broadcast::DEFAULT_BUFFER),
            stream_max_duration_seconds: env::var("STREAM_MAX_DURATION_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    /// Get the order stream lifetime as a Duration.
    pub fn stream_max_duration(&self) -> Duration {
        Duration::from_secs(self.stream_max_duration_seconds)
    }

    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
