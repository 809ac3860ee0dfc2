//! Synthetic order generator.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::{round2, Source};
use crate::core::{Event, Message, Payload};
use crate::errors::Result;
use crate::metrics::Metrics;
use crate::queue::BoundedQueue;

/// Default seed for the order generator.
pub const DEFAULT_INGEST_SEED: u64 = 123;

/// Source that emits random, well-formed order events.
///
/// Payload: `order_id`, `price` (5..=200, two decimals), `qty` (1..=5), `sku`.
#[derive(Debug, Clone)]
pub struct OrdersIngest {
    name: String,
    rng: StdRng,
}

impl OrdersIngest {
    /// Creates a generator with the given seed.
    #[must_use]
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_payload(&mut self) -> Payload {
        let price = round2(self.rng.gen_range(5.0..=200.0));
        let qty: u32 = self.rng.gen_range(1..=5);
        let order_id: u32 = self.rng.gen_range(100_000..=999_999);
        let sku: u32 = self.rng.gen_range(1..=200);

        let mut payload = Payload::new();
        payload.insert("order_id".to_string(), json!(order_id));
        payload.insert("price".to_string(), json!(price));
        payload.insert("qty".to_string(), json!(qty));
        payload.insert("sku".to_string(), json!(format!("SKU-{sku:03}")));
        payload
    }
}

#[async_trait]
impl Source for OrdersIngest {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&mut self, count: usize, output: &BoundedQueue, metrics: &Metrics) -> Result<()> {
        let out_counter = format!("{}.out", self.name);
        for _ in 0..count {
            let event = Event::new(self.next_payload());
            output.put(Message::Data(event), None).await?;
            metrics.inc(&out_counter, 1);
        }
        tracing::debug!(stage = %self.name, count, "Source finished emitting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(source: &mut OrdersIngest, n: usize) -> (Vec<Payload>, Metrics) {
        let queue = BoundedQueue::unbounded("q0");
        let metrics = Metrics::new();
        source.emit(n, &queue, &metrics).await.unwrap();

        let mut payloads = Vec::new();
        while let Some(Message::Data(event)) = queue.try_get() {
            payloads.push(event.payload().clone());
        }
        (payloads, metrics)
    }

    #[tokio::test]
    async fn test_emits_requested_count() {
        let mut source = OrdersIngest::new("ingest", DEFAULT_INGEST_SEED);
        let (payloads, metrics) = collect(&mut source, 25).await;

        assert_eq!(payloads.len(), 25);
        assert_eq!(metrics.counter("ingest.out"), 25);
    }

    #[tokio::test]
    async fn test_payloads_are_well_formed() {
        let mut source = OrdersIngest::new("ingest", 7);
        let (payloads, _) = collect(&mut source, 200).await;

        for payload in payloads {
            let price = payload["price"].as_f64().unwrap();
            let qty = payload["qty"].as_u64().unwrap();
            let order_id = payload["order_id"].as_u64().unwrap();
            let sku = payload["sku"].as_str().unwrap();

            assert!((5.0..=200.0).contains(&price));
            assert!((1..=5).contains(&qty));
            assert!((100_000..=999_999).contains(&order_id));
            assert!(sku.starts_with("SKU-") && sku.len() >= 7);
        }
    }

    #[tokio::test]
    async fn test_same_seed_same_payloads() {
        let (a, _) = collect(&mut OrdersIngest::new("a", 99), 10).await;
        let (b, _) = collect(&mut OrdersIngest::new("b", 99), 10).await;
        assert_eq!(a, b);
    }
}
