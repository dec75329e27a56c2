use chrono::{SecondsFormat, Utc};

use crate::catalog::{Category, Product};
use crate::orders::Order;

use super::traits::Entity;

/// Current UTC time as ISO-8601 text with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Entity for Order {
    const KIND: &'static str = "Order";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn on_create(&mut self, now: &str) {
        self.created_at = now.to_string();
        self.updated_at = now.to_string();
    }

    fn on_update(&mut self, existing: &Self, now: &str) {
        self.created_at = existing.created_at.clone();
        self.updated_at = now.to_string();
    }
}

impl Entity for Category {
    const KIND: &'static str = "Category";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Entity for Product {
    const KIND: &'static str = "Product";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
