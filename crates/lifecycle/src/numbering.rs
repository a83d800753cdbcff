//! Order numbering authority.

use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::OrderNumber;
use order_store::{OrderStore, StoreError, with_timeout};
use uuid::Uuid;

const FALLBACK_SUFFIX_LEN: usize = 6;

/// Hands out human-readable order numbers.
///
/// The next number is derived from the highest sequential number in the
/// store. Two placements can read the same value; the store's unique
/// constraint rejects the loser, which then retries with [`fallback`].
/// Numbers therefore increase on a best-effort basis only.
///
/// [`fallback`]: OrderNumberAuthority::fallback
#[derive(Clone)]
pub struct OrderNumberAuthority<S> {
    store: S,
    timeout: Duration,
}

impl<S: OrderStore> OrderNumberAuthority<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Returns the number the next order should get.
    ///
    /// Falls back to a timestamped number when the latest stored number
    /// cannot be continued.
    #[tracing::instrument(skip(self))]
    pub async fn next(&self) -> Result<OrderNumber, StoreError> {
        let latest = with_timeout(self.timeout, self.store.latest_sequential_number()).await?;

        match OrderNumber::next_after(latest.as_ref()) {
            Some(number) => Ok(number),
            None => {
                let number = Self::fallback(Utc::now());
                tracing::warn!(
                    latest = latest.as_ref().map(OrderNumber::as_str),
                    %number,
                    "order sequence cannot continue, using fallback number"
                );
                metrics::counter!("order_number_fallbacks_total").increment(1);
                Ok(number)
            }
        }
    }

    /// Builds a collision-resistant number from `now` and a random suffix.
    pub fn fallback(now: DateTime<Utc>) -> OrderNumber {
        let random = Uuid::new_v4().simple().to_string();
        OrderNumber::fallback(now, &random[..FALLBACK_SUFFIX_LEN])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::{Aggregate, Money, Order, OrderItem, PlaceOrder, ShippingAddress};
    use order_store::InMemoryOrderStore;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Test Customer".to_string(),
            email: None,
            phone: "555-0100".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: None,
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    async fn insert_numbered(store: &InMemoryOrderStore, number: &str) {
        let cmd = PlaceOrder::new(
            vec![OrderItem::new("SKU-A", "Widget", 1, Money::from_cents(100))],
            address(),
            "cod_1",
            Money::from_cents(100),
            Money::zero(),
            Money::from_cents(100),
        );
        let mut order = Order::default();
        let events = order
            .place(&cmd, OrderNumber::new(number), Utc::now())
            .unwrap();
        order.apply_events(events);
        store.insert(&order).await.unwrap();
    }

    fn authority(store: &InMemoryOrderStore) -> OrderNumberAuthority<InMemoryOrderStore> {
        OrderNumberAuthority::new(store.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_empty_store_starts_at_one() {
        let store = InMemoryOrderStore::new();
        let number = authority(&store).next().await.unwrap();
        assert_eq!(number.as_str(), "ORD-000001");
    }

    #[tokio::test]
    async fn test_continues_latest_sequence() {
        let store = InMemoryOrderStore::new();
        insert_numbered(&store, "ORD-000041").await;
        insert_numbered(&store, "ORD-1718020800000-AB12CD").await;

        let number = authority(&store).next().await.unwrap();
        assert_eq!(number.as_str(), "ORD-000042");
    }

    #[tokio::test]
    async fn test_exhausted_sequence_falls_back() {
        let store = InMemoryOrderStore::new();
        insert_numbered(&store, "ORD-999999").await;

        let number = authority(&store).next().await.unwrap();
        assert!(!number.is_sequential());
        assert!(number.as_str().starts_with("ORD-"));
    }

    #[test]
    fn test_fallback_shape() {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let number = OrderNumberAuthority::<InMemoryOrderStore>::fallback(at);

        let rest = number
            .as_str()
            .strip_prefix("ORD-1718020800000-")
            .unwrap();
        assert_eq!(rest.len(), FALLBACK_SUFFIX_LEN);
        assert!(rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_fallbacks_differ() {
        let at = Utc::now();
        let a = OrderNumberAuthority::<InMemoryOrderStore>::fallback(at);
        let b = OrderNumberAuthority::<InMemoryOrderStore>::fallback(at);
        assert_ne!(a, b);
    }
}
