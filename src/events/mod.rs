// Side-effect messages published after a booking commit.
//
// Delivery is at-least-once and fully decoupled from the commit path: the
// coordinator's commit succeeds or fails independently of whether these
// messages have been processed. Consumers deduplicate on `dedup_key()`
// (kind + reservation id).

pub mod memory;
pub mod redis;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::memory::InMemoryEventPublisher;
pub use self::redis::RedisEventPublisher;

/// Event emitted by the booking coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingEvent {
    /// Ask the payment collaborator to start collecting for a reservation.
    PaymentInitiate {
        reservation_id: Uuid,
        reserver_id: Uuid,
        amount: Decimal,
    },
    /// Notify the reserver that their booking is confirmed.
    BookingConfirmed {
        reservation_id: Uuid,
        pitch_id: Uuid,
        reserver_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    /// Notify the reserver that their booking was cancelled.
    BookingCancelled {
        reservation_id: Uuid,
        reserver_id: Uuid,
        reason: Option<String>,
    },
}

impl BookingEvent {
    /// Routing key consumed by the downstream queue workers
    pub fn kind(&self) -> &'static str {
        match self {
            BookingEvent::PaymentInitiate { .. } => "payment.initiate",
            BookingEvent::BookingConfirmed { .. } => "notification.booking_confirmed",
            BookingEvent::BookingCancelled { .. } => "notification.booking_cancelled",
        }
    }

    pub fn reservation_id(&self) -> Uuid {
        match self {
            BookingEvent::PaymentInitiate { reservation_id, .. }
            | BookingEvent::BookingConfirmed { reservation_id, .. }
            | BookingEvent::BookingCancelled { reservation_id, .. } => *reservation_id,
        }
    }

    /// Key consumers use for idempotent processing under at-least-once
    /// delivery
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.kind(), self.reservation_id())
    }
}

/// Failure to hand an event to the message queue.
/// Never rolls back an already-committed reservation; the messaging
/// collaborator owns the retry policy.
#[derive(Debug, thiserror::Error)]
#[error("failed to publish {kind}: {message}")]
pub struct PublishError {
    pub kind: &'static str,
    pub message: String,
}

/// Message-queue seam the coordinator publishes through
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_kinds() {
        let id = Uuid::new_v4();
        let payment = BookingEvent::PaymentInitiate {
            reservation_id: id,
            reserver_id: Uuid::new_v4(),
            amount: dec!(45),
        };
        assert_eq!(payment.kind(), "payment.initiate");
        assert_eq!(payment.dedup_key(), format!("payment.initiate:{}", id));

        let cancelled = BookingEvent::BookingCancelled {
            reservation_id: id,
            reserver_id: Uuid::new_v4(),
            reason: None,
        };
        assert_eq!(cancelled.kind(), "notification.booking_cancelled");
    }

    #[test]
    fn test_event_serialization_carries_kind_tag() {
        let event = BookingEvent::PaymentInitiate {
            reservation_id: Uuid::new_v4(),
            reserver_id: Uuid::new_v4(),
            amount: dec!(60.50),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "payment_initiate");
        assert_eq!(json["amount"], "60.50");
    }
}
