use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::BookingError;
use crate::interval::TimeInterval;
use crate::reservations::{Reservation, ReservationStatus};

/// Storage interface for reservations.
/// The engine depends only on this trait, not on a storage technology.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn save(&self, reservation: &Reservation) -> Result<(), BookingError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, BookingError>;

    /// All `scheduled` reservations on a pitch whose interval overlaps
    /// the given range. This is the source the slot calendar is rebuilt
    /// from.
    async fn find_scheduled_by_pitch(
        &self,
        pitch_id: Uuid,
        range: TimeInterval,
    ) -> Result<Vec<Reservation>, BookingError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        cancel_reason: Option<&str>,
    ) -> Result<Reservation, BookingError>;

    /// Scheduled reservations that ended at or before the cutoff.
    /// Used by the completion sweeper.
    async fn find_scheduled_ending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, BookingError>;
}

/// Postgres-backed reservation repository
#[derive(Clone)]
pub struct PostgresReservationRepository {
    pool: PgPool,
}

impl PostgresReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESERVATION_COLUMNS: &str = "id, pitch_id, reserver_id, start_time, end_time, recurring, \
     series_id, status, payment_id, cancel_reason, created_at, updated_at";

#[async_trait]
impl ReservationRepository for PostgresReservationRepository {
    async fn save(&self, reservation: &Reservation) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, pitch_id, reserver_id, start_time, end_time, recurring,
                 series_id, status, payment_id, cancel_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.pitch_id)
        .bind(reservation.reserver_id)
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .bind(reservation.recurring)
        .bind(reservation.series_id)
        .bind(reservation.status)
        .bind(reservation.payment_id)
        .bind(&reservation.cancel_reason)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, BookingError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reservation)
    }

    async fn find_scheduled_by_pitch(
        &self,
        pitch_id: Uuid,
        range: TimeInterval,
    ) -> Result<Vec<Reservation>, BookingError> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE pitch_id = $1
              AND status = 'scheduled'
              AND start_time < $2
              AND end_time > $3
            ORDER BY start_time
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(pitch_id)
        .bind(range.end())
        .bind(range.start())
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        cancel_reason: Option<&str>,
    ) -> Result<Reservation, BookingError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            UPDATE reservations
            SET status = $1, cancel_reason = COALESCE($2, cancel_reason), updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(status)
        .bind(cancel_reason)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BookingError::ReservationNotFound(id))?;

        Ok(reservation)
    }

    async fn find_scheduled_ending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, BookingError> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE status = 'scheduled' AND end_time <= $1
            ORDER BY end_time
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }
}

/// In-memory reservation repository for tests and single-process
/// deployments
#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reservations.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Reservation>>, BookingError> {
        self.reservations
            .write()
            .map_err(|_| BookingError::Repository("reservation store lock poisoned".to_string()))
    }

    fn snapshot(&self) -> Result<Vec<Reservation>, BookingError> {
        Ok(self
            .reservations
            .read()
            .map_err(|_| BookingError::Repository("reservation store lock poisoned".to_string()))?
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn save(&self, reservation: &Reservation) -> Result<(), BookingError> {
        self.store()?
            .entry(reservation.id)
            .or_insert_with(|| reservation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, BookingError> {
        Ok(self
            .reservations
            .read()
            .map_err(|_| BookingError::Repository("reservation store lock poisoned".to_string()))?
            .get(&id)
            .cloned())
    }

    async fn find_scheduled_by_pitch(
        &self,
        pitch_id: Uuid,
        range: TimeInterval,
    ) -> Result<Vec<Reservation>, BookingError> {
        let mut matches: Vec<Reservation> = self
            .snapshot()?
            .into_iter()
            .filter(|r| {
                r.pitch_id == pitch_id
                    && r.status == ReservationStatus::Scheduled
                    && r.interval().overlaps(&range)
            })
            .collect();
        matches.sort_by_key(|r| r.start_time);
        Ok(matches)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        cancel_reason: Option<&str>,
    ) -> Result<Reservation, BookingError> {
        let mut store = self.store()?;
        let reservation = store
            .get_mut(&id)
            .ok_or(BookingError::ReservationNotFound(id))?;
        reservation.status = status;
        if let Some(reason) = cancel_reason {
            reservation.cancel_reason = Some(reason.to_string());
        }
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn find_scheduled_ending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, BookingError> {
        let mut matches: Vec<Reservation> = self
            .snapshot()?
            .into_iter()
            .filter(|r| r.status == ReservationStatus::Scheduled && r.end_time <= cutoff)
            .collect();
        matches.sort_by_key(|r| r.end_time);
        Ok(matches)
    }
}
