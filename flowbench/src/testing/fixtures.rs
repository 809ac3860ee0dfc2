//! Test fixtures.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use crate::core::{Event, Payload};

/// A cloneable in-memory writer.
///
/// Clones share the same buffer, so a test can hand one to a sink and read
/// the output through another.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Returns the written lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// An order payload with the given sequence number.
#[must_use]
pub fn order_payload(seq: u64, price: f64, qty: u64) -> Payload {
    let mut payload = Payload::new();
    payload.insert("order_id".to_string(), json!(seq));
    payload.insert("price".to_string(), json!(price));
    payload.insert("qty".to_string(), json!(qty));
    payload.insert("sku".to_string(), json!(format!("SKU-{seq:03}")));
    payload
}

/// An order event with the given sequence number.
#[must_use]
pub fn order_event(seq: u64) -> Event {
    Event::new(order_payload(seq, 10.0, 1))
}
