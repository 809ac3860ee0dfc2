//! Console sink.

use std::fmt::Debug;
use std::io::Write;

use async_trait::async_trait;

use super::Sink;
use crate::core::{Message, Sentinel};
use crate::errors::{FlowbenchError, Result};
use crate::metrics::Metrics;
use crate::queue::BoundedQueue;

/// Default number of payloads printed by the console sink.
pub const DEFAULT_SINK_LIMIT: usize = 5;

/// Drains the final queue, printing the first `limit` payloads as JSON lines.
///
/// Every event is counted under `<name>.in`; only printing is limited.
pub struct ConsoleSink {
    name: String,
    limit: usize,
    writer: Box<dyn Write + Send>,
}

impl ConsoleSink {
    /// Creates a sink writing to `writer`.
    pub fn new(name: impl Into<String>, limit: usize, writer: impl Write + Send + 'static) -> Self {
        Self {
            name: name.into(),
            limit,
            writer: Box::new(writer),
        }
    }

    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout(name: impl Into<String>, limit: usize) -> Self {
        Self::new(name, limit, std::io::stdout())
    }

    /// The print limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn consume(
        &mut self,
        input: &BoundedQueue,
        sentinel: &Sentinel,
        metrics: &Metrics,
    ) -> Result<()> {
        let in_counter = format!("{}.in", self.name);
        let mut printed = 0;

        loop {
            let message = input.get(None).await?;
            let _ack = input.task_guard();

            match message {
                Message::Stop(received) if &received == sentinel => break,
                Message::Stop(received) => {
                    return Err(FlowbenchError::UnexpectedSentinel {
                        stage: self.name.clone(),
                        expected: sentinel.id().to_string(),
                        received: received.id().to_string(),
                    });
                }
                Message::Data(event) => {
                    metrics.inc(&in_counter, 1);
                    if printed < self.limit {
                        let line = serde_json::to_string(event.payload())?;
                        writeln!(self.writer, "{line}")?;
                        printed += 1;
                    }
                }
            }
        }

        self.writer.flush()?;
        Ok(())
    }
}
