//! Order validation.

use super::Transform;
use crate::core::Event;
use crate::errors::ProcessingError;

/// Fields an order must carry by default.
pub const DEFAULT_REQUIRED_FIELDS: [&str; 5] = ["order_id", "price", "qty", "sku", "total"];

/// Rejects orders with missing fields or non-positive price/quantity.
///
/// Rejections are [`ProcessingError::Validation`] and go through the same
/// retry policy as any other failure.
#[derive(Debug, Clone)]
pub struct ValidateOrder {
    required: Vec<String>,
}

impl Default for ValidateOrder {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_FIELDS.iter().map(ToString::to_string).collect())
    }
}

impl ValidateOrder {
    /// Creates a validator requiring `required` fields.
    #[must_use]
    pub fn new(required: Vec<String>) -> Self {
        Self { required }
    }

    /// The required field names.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl Transform for ValidateOrder {
    fn process(&mut self, event: &Event) -> Result<Option<Event>, ProcessingError> {
        let payload = event.payload();
        if let Some(missing) = self.required.iter().find(|k| !payload.contains_key(k.as_str())) {
            return Err(ProcessingError::validation(format!("Missing field {missing}")));
        }

        let positive = |key: &str| {
            payload
                .get(key)
                .and_then(serde_json::Value::as_f64)
                .is_some_and(|v| v > 0.0)
        };
        if !positive("price") || !positive("qty") {
            return Err(ProcessingError::validation("Invalid price/qty"));
        }

        Ok(Some(event.clone()))
    }
}
