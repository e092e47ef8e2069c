use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::BookingError;
use crate::pitches::{Pitch, PitchSize, SurfaceType, WeeklySchedule};

/// Storage interface for pitches.
/// The engine depends only on this trait, not on a storage technology.
#[async_trait]
pub trait PitchRepository: Send + Sync {
    async fn save(&self, pitch: &Pitch) -> Result<(), BookingError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pitch>, BookingError>;
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Pitch>, BookingError>;
}

/// Database row for a pitch; the weekly schedule is stored as JSONB
#[derive(FromRow)]
struct PitchRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    size: PitchSize,
    surface: SurfaceType,
    location: String,
    hourly_rate: rust_decimal::Decimal,
    hours: Json<WeeklySchedule>,
}

impl From<PitchRow> for Pitch {
    fn from(row: PitchRow) -> Self {
        Pitch {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            size: row.size,
            surface: row.surface,
            location: row.location,
            hourly_rate: row.hourly_rate,
            hours: row.hours.0,
        }
    }
}

/// Postgres-backed pitch repository
#[derive(Clone)]
pub struct PostgresPitchRepository {
    pool: PgPool,
}

impl PostgresPitchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PitchRepository for PostgresPitchRepository {
    async fn save(&self, pitch: &Pitch) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO pitches (id, owner_id, name, size, surface, location, hourly_rate, hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id)
            DO UPDATE SET
                name = $3,
                size = $4,
                surface = $5,
                location = $6,
                hourly_rate = $7,
                hours = $8
            "#,
        )
        .bind(pitch.id)
        .bind(pitch.owner_id)
        .bind(&pitch.name)
        .bind(pitch.size)
        .bind(pitch.surface)
        .bind(&pitch.location)
        .bind(pitch.hourly_rate)
        .bind(Json(&pitch.hours))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pitch>, BookingError> {
        let row = sqlx::query_as::<_, PitchRow>(
            r#"
            SELECT id, owner_id, name, size, surface, location, hourly_rate, hours
            FROM pitches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Pitch::from))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Pitch>, BookingError> {
        let rows = sqlx::query_as::<_, PitchRow>(
            r#"
            SELECT id, owner_id, name, size, surface, location, hourly_rate, hours
            FROM pitches
            WHERE owner_id = $1
            ORDER BY name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Pitch::from).collect())
    }
}

/// In-memory pitch repository for tests and single-process deployments
#[derive(Default)]
pub struct InMemoryPitchRepository {
    pitches: RwLock<HashMap<Uuid, Pitch>>,
}

impl InMemoryPitchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PitchRepository for InMemoryPitchRepository {
    async fn save(&self, pitch: &Pitch) -> Result<(), BookingError> {
        self.pitches
            .write()
            .map_err(|_| BookingError::Repository("pitch store lock poisoned".to_string()))?
            .insert(pitch.id, pitch.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pitch>, BookingError> {
        Ok(self
            .pitches
            .read()
            .map_err(|_| BookingError::Repository("pitch store lock poisoned".to_string()))?
            .get(&id)
            .cloned())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Pitch>, BookingError> {
        let mut pitches: Vec<Pitch> = self
            .pitches
            .read()
            .map_err(|_| BookingError::Repository("pitch store lock poisoned".to_string()))?
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        pitches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pitches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitches::DayHours;
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;

    fn sample_pitch(owner_id: Uuid, name: &str) -> Pitch {
        Pitch {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            size: PitchSize::SevenASide,
            surface: SurfaceType::NaturalGrass,
            location: "North End".to_string(),
            hourly_rate: dec!(60),
            hours: WeeklySchedule::uniform(
                DayHours::new(
                    NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                )
                .unwrap(),
            ),
        }
    }

    #[tokio::test]
    async fn test_in_memory_save_and_find() {
        let repo = InMemoryPitchRepository::new();
        let pitch = sample_pitch(Uuid::new_v4(), "Astro A");

        repo.save(&pitch).await.unwrap();
        let found = repo.find_by_id(pitch.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Astro A");

        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_find_by_owner_sorted() {
        let repo = InMemoryPitchRepository::new();
        let owner = Uuid::new_v4();
        repo.save(&sample_pitch(owner, "Zebra")).await.unwrap();
        repo.save(&sample_pitch(owner, "Alpha")).await.unwrap();
        repo.save(&sample_pitch(Uuid::new_v4(), "Other")).await.unwrap();

        let pitches = repo.find_by_owner(owner).await.unwrap();
        assert_eq!(pitches.len(), 2);
        assert_eq!(pitches[0].name, "Alpha");
        assert_eq!(pitches[1].name, "Zebra");
    }
}
