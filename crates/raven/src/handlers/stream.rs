//! SSE endpoint streaming created and updated orders.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};

use crate::state::AppState;

/// SSE endpoint for live orders (GET /api/orders/stream).
///
/// Each event carries one order as JSON. The subscription is dropped, and
/// with it unregistered, when the client disconnects, the server shuts down,
/// or the session exceeds its maximum duration.
pub async fn order_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.broadcaster.subscribe();
    let mut shutdown_rx = state.subscribe_shutdown();
    let max_duration = state.config.stream_max_duration();
    let subscriber = subscription.id();

    tracing::info!(
        subscriber,
        subscribers = state.broadcaster.subscriber_count(),
        "order stream opened"
    );

    let stream = async_stream::stream! {
        let deadline = tokio::time::sleep(max_duration);
        tokio::pin!(deadline);

        loop {
            let next = tokio::select! {
                order = subscription.recv() => order,
                _ = shutdown_rx.recv() => {
                    tracing::info!(subscriber, "order stream received shutdown signal");
                    None
                }
                _ = &mut deadline => {
                    tracing::info!(subscriber, "order stream exceeded max duration, closing");
                    None
                }
            };

            let Some(order) = next else { break };

            match Event::default().json_data(&order) {
                Ok(event) => yield Ok(event),
                Err(err) => {
                    tracing::warn!(subscriber, order_id = %order.id, error = %err, "failed to encode order event");
                }
            }
        }

        subscription.unsubscribe();
        tracing::info!(subscriber, "order stream closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
