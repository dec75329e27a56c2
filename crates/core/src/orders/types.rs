use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::OrderError;

/// Status given to orders created without one.
pub const DEFAULT_STATUS: OrderStatus = OrderStatus::New;
/// Source given to orders created without one.
pub const DEFAULT_SOURCE: &str = "mobile";
/// Channel given to orders created without one.
pub const DEFAULT_CHANNEL: &str = "counter";

/// A customer order as stored in the orders table.
///
/// `status` is kept as text so stored values outside [`OrderStatus`] still
/// load. Identifier and timestamps are blank until the repository assigns
/// them on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub channel: String,
    pub eta_minutes: Option<i32>,
    pub customer: Option<Customer>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Order {
    /// Creates an order with the default status, source and channel.
    pub fn new(items: Vec<OrderItem>) -> Self {
        Self {
            id: String::new(),
            status: DEFAULT_STATUS.as_str().to_string(),
            source: DEFAULT_SOURCE.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            eta_minutes: None,
            customer: None,
            notes: None,
            items,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            email: None,
        }
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    /// Product name at the time the order was placed.
    pub name_snapshot: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    pub notes: Option<String>,
    /// Kitchen station the line is routed to.
    pub station: Option<String>,
    pub course: Option<String>,
}

impl OrderItem {
    pub fn new(product_id: impl Into<String>, quantity: i32, unit_price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            name_snapshot: None,
            quantity,
            unit_price,
            modifiers: Vec::new(),
            notes: None,
            station: None,
            course: None,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    pub id: Option<String>,
    pub name: String,
    pub price_delta: f64,
}

impl Modifier {
    pub fn new(name: impl Into<String>, price_delta: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price_delta,
        }
    }
}

/// The closed set of statuses accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Accepted,
    InProgress,
    Ready,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::New,
        OrderStatus::Accepted,
        OrderStatus::InProgress,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    /// Parses a status case-insensitively, e.g. `in_progress` or `READY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}
