mod error;
mod operations;
mod types;

pub use error::OrderError;
pub use operations::{apply_create_defaults, parse_status, validate_order};
pub use types::{
    Customer, Modifier, Order, OrderItem, OrderStatus, DEFAULT_CHANNEL, DEFAULT_SOURCE,
    DEFAULT_STATUS,
};
