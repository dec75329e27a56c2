use super::error::OrderError;
use super::types::{Order, OrderStatus, DEFAULT_CHANNEL, DEFAULT_SOURCE, DEFAULT_STATUS};

/// Fills blank status, source and channel with their defaults.
pub fn apply_create_defaults(order: &mut Order) {
    if order.status.trim().is_empty() {
        order.status = DEFAULT_STATUS.as_str().to_string();
    }
    if order.source.trim().is_empty() {
        order.source = DEFAULT_SOURCE.to_string();
    }
    if order.channel.trim().is_empty() {
        order.channel = DEFAULT_CHANNEL.to_string();
    }
}

/// Parses a client-supplied status against the closed status set.
pub fn parse_status(status: &str) -> Result<OrderStatus, OrderError> {
    if status.trim().is_empty() {
        return Err(OrderError::MissingStatus);
    }
    status.parse()
}

/// Validates an order submitted by a client.
pub fn validate_order(order: &Order) -> Result<(), OrderError> {
    parse_status(&order.status)?;
    if order.items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for (index, item) in order.items.iter().enumerate() {
        if item.product_id.trim().is_empty() {
            return Err(OrderError::MissingProductId(index));
        }
        if item.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(index));
        }
        let deltas_finite = item.modifiers.iter().all(|m| m.price_delta.is_finite());
        if !item.unit_price.is_finite() || item.unit_price < 0.0 || !deltas_finite {
            return Err(OrderError::InvalidPrice(index));
        }
    }
    Ok(())
}
