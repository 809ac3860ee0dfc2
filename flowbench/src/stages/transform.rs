//! Order total computation.

use serde_json::json;

use super::{round2, Transform};
use crate::core::{Event, Payload};
use crate::errors::ProcessingError;

/// Adds `total = price * qty` (two decimals) to each order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddTotal;

impl AddTotal {
    /// Creates the transform.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn number_field(payload: &Payload, key: &str) -> Result<f64, ProcessingError> {
    payload
        .get(key)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| ProcessingError::transient(format!("Field '{key}' is missing or not numeric")))
}

impl Transform for AddTotal {
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        let price = number_field(event.payload(), "price")?;
        let qty = number_field(event.payload(), "qty")?.trunc();

        let mut payload = event.payload().clone();
        payload.insert("total".to_string(), json!(round2(price * qty)));
        Ok(Some(event.with_payload(payload)))
    }
}
