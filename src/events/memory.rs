// In-memory event publisher for tests and single-process runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::events::{BookingEvent, EventPublisher, PublishError};

/// Collects published events in memory; can be switched into a failing
/// mode to exercise the fire-and-forget dispatch path.
#[derive(Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<BookingEvent>>,
    fail: Mutex<bool>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail
    pub fn fail_publishes(&self, fail: bool) {
        *self.fail.lock().expect("publisher lock poisoned") = fail;
    }

    pub fn published(&self) -> Vec<BookingEvent> {
        self.events.lock().expect("publisher lock poisoned").clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.published().iter().map(|e| e.kind()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().expect("publisher lock poisoned").clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError> {
        if *self.fail.lock().expect("publisher lock poisoned") {
            return Err(PublishError {
                kind: event.kind(),
                message: "publisher in failing mode".to_string(),
            });
        }
        self.events
            .lock()
            .expect("publisher lock poisoned")
            .push(event.clone());
        Ok(())
    }
}
