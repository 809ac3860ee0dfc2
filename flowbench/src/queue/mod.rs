//! Bounded FIFO queues between pipeline stages.
//!
//! The queue is the only place backpressure is enforced: a producer that
//! would exceed the capacity waits until the consumer frees a slot.

mod bounded;

pub use bounded::{BoundedQueue, TaskGuard};
