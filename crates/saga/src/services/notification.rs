//! Announcement of new orders on the messaging channel.

use common::DealId;
use crm::Notifier;
use order_store::OrderRecord;

/// Formats the announcement of a newly created order.
pub fn order_announcement(
    order: &OrderRecord,
    vehicle_count: usize,
    deal_id: &DealId,
    crm_web_url: &str,
) -> String {
    format!(
        "🚚 *New Transport Request* \n - Order ID: `{}` \n - Vehicles: `{}` \n - Pickup: `{}` \n - Drop-off: `{}` \n <{}/{}|View Order Details>",
        order.id,
        vehicle_count,
        order.pickup_location,
        order.dropoff_location,
        crm_web_url.trim_end_matches('/'),
        deal_id,
    )
}

/// Posts the announcement, logging instead of failing.
///
/// Returns whether the message was delivered.
pub async fn announce_order(notifier: &dyn Notifier, message: &str) -> bool {
    match notifier.post_message(message).await {
        Ok(()) => {
            tracing::info!("order announced");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "order announcement failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::OrderId;
    use crm::InMemoryNotifier;
    use order_store::NewOrder;

    fn order() -> OrderRecord {
        let new = NewOrder {
            pickup_location: "Toronto, ON".to_string(),
            dropoff_location: "Montreal, QC".to_string(),
            ..NewOrder::default()
        };
        OrderRecord::pending(OrderId::new(12), &new, Utc::now())
    }

    #[test]
    fn message_links_to_deal() {
        let message = order_announcement(
            &order(),
            2,
            &DealId::new("3384000000123"),
            "https://crm.example.com/tab/Potentials/",
        );

        assert!(message.contains("Order ID: `12`"));
        assert!(message.contains("Vehicles: `2`"));
        assert!(message.contains("Pickup: `Toronto, ON`"));
        assert!(message.contains("Drop-off: `Montreal, QC`"));
        assert!(message.ends_with(
            "<https://crm.example.com/tab/Potentials/3384000000123|View Order Details>"
        ));
    }

    #[tokio::test]
    async fn failure_is_reported_not_raised() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail_on_post(true);
        assert!(!announce_order(&notifier, "hello").await);

        notifier.set_fail_on_post(false);
        assert!(announce_order(&notifier, "hello").await);
        assert_eq!(notifier.messages(), vec!["hello".to_string()]);
    }
}
