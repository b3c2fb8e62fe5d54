//! Best-effort NATS notifications.

use serde_json::json;

use crate::models::Order;

pub const ORDER_PLACED_SUBJECT: &str = "kie.orders.placed";

/// Publish an order-placed event after the transaction committed.
///
/// The event stream is advisory; a publish failure is logged and never
/// propagated to the caller.
pub async fn publish_order_placed(nats: Option<&async_nats::Client>, order: &Order) {
    let Some(client) = nats else { return };

    let payload = json!({
        "order_id": order.id,
        "order_number": order.order_number,
        "user_id": order.user_id,
        "total": order.total,
        "created_at": order.created_at,
    });
    let bytes = match serde_json::to_vec(&payload) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(%err, "failed to encode order event");
            return;
        }
    };

    if let Err(err) = client
        .publish(ORDER_PLACED_SUBJECT.to_string(), bytes.into())
        .await
    {
        tracing::warn!(%err, order_number = %order.order_number, "failed to publish order event");
    }
}
