//! Journey persistence.
//!
//! The orchestrator keeps live journeys in memory and writes every
//! completed step through a [`JourneyStore`]. Restarting a process and
//! pointing it at the same store resumes every journey exactly where
//! its artifacts say it stopped.
//!
//! SQLite is the primary backend, wrapped in async via
//! `tokio::task::spawn_blocking`; the in-memory store backs tests and
//! short-lived tools.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use latchkey_core::{from_cbor_bytes, to_canonical_bytes, CoreError, JourneyId};

use crate::journey::{JourneyData, PublishJourney};

/// Errors from journey persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Journey (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Durable storage for publishing journeys.
///
/// `save` persists the whole journey; it must be atomic per journey so
/// a reloaded journey never shows a half-written step.
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Fetch a journey by id. `None` when it does not exist.
    async fn load(&self, id: JourneyId) -> Result<Option<PublishJourney>, StoreError>;

    /// Insert or replace a journey.
    async fn save(&self, journey: &PublishJourney) -> Result<(), StoreError>;

    /// All stored journey ids, oldest first.
    async fn list_ids(&self) -> Result<Vec<JourneyId>, StoreError>;
}

// ───────────────────────── Memory ─────────────────────────

/// In-memory journey store for tests and ephemeral pipelines.
#[derive(Default)]
pub struct MemoryJourneyStore {
    journeys: RwLock<HashMap<JourneyId, PublishJourney>>,
}

impl MemoryJourneyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JourneyStore for MemoryJourneyStore {
    async fn load(&self, id: JourneyId) -> Result<Option<PublishJourney>, StoreError> {
        let journeys = self.journeys.read().unwrap();
        Ok(journeys.get(&id).cloned())
    }

    async fn save(&self, journey: &PublishJourney) -> Result<(), StoreError> {
        let mut journeys = self.journeys.write().unwrap();
        journeys.insert(journey.id(), journey.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<JourneyId>, StoreError> {
        let journeys = self.journeys.read().unwrap();
        let mut ids: Vec<_> = journeys.values().collect();
        ids.sort_by_key(|journey| (journey.created_at(), journey.id().to_hex()));
        Ok(ids.into_iter().map(|journey| journey.id()).collect())
    }
}

// ───────────────────────── SQLite ─────────────────────────

/// Current schema version.
const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the journey schema. Idempotent.
fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;
        for version in (current + 1)..=CURRENT_VERSION {
            match version {
                1 => apply_v1(&tx)?,
                _ => {
                    return Err(StoreError::Migration(format!(
                        "unknown migration version: {}",
                        version
                    )))
                }
            }
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, latchkey_core::now_millis()],
            )?;
        }
        tx.commit()?;
    }

    Ok(())
}

/// Migration v1: initial schema.
fn apply_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        -- Journeys table: one row per publishing journey
        CREATE TABLE journeys (
            journey_id BLOB PRIMARY KEY,   -- 32 bytes
            data BLOB NOT NULL,            -- CBOR-encoded journey data
            error TEXT,                    -- last failed attempt, if any
            created_at INTEGER NOT NULL,   -- Unix ms
            updated_at INTEGER NOT NULL    -- Unix ms
        );

        CREATE INDEX idx_journeys_created ON journeys(created_at);
        "#,
    )?;
    Ok(())
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
        Some(format!("mutex poisoned: {}", e)),
    ))
}

fn join_failed(e: tokio::task::JoinError) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
        Some(format!("spawn_blocking failed: {}", e)),
    ))
}

fn row_to_journey(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Vec<u8>, Vec<u8>, Option<String>, i64, i64)> {
    Ok((
        row.get("journey_id")?,
        row.get("data")?,
        row.get("error")?,
        row.get("created_at")?,
        row.get("updated_at")?,
    ))
}

fn decode_journey(
    (id_bytes, data_cbor, error, created_at, updated_at): (Vec<u8>, Vec<u8>, Option<String>, i64, i64),
) -> Result<PublishJourney, StoreError> {
    let id = JourneyId::try_from(id_bytes.as_slice()).map_err(|_| {
        StoreError::Serialization(CoreError::DecodingError(
            "journey_id column is not 32 bytes".to_string(),
        ))
    })?;
    let data: JourneyData = from_cbor_bytes(&data_cbor)?;
    Ok(PublishJourney::from_parts(id, data, error, created_at, updated_at))
}

/// SQLite-backed journey store.
///
/// Thread-safe via an internal mutex; every operation runs on the
/// blocking pool so the async runtime is never stalled on disk I/O.
pub struct SqliteJourneyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJourneyStore {
    /// Open a database at `path`, creating and migrating as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database. Useful for testing.
    pub fn open_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl JourneyStore for SqliteJourneyStore {
    async fn load(&self, id: JourneyId) -> Result<Option<PublishJourney>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(poisoned)?;

            let row = conn
                .query_row(
                    "SELECT journey_id, data, error, created_at, updated_at
                     FROM journeys WHERE journey_id = ?1",
                    params![id.as_bytes().as_slice()],
                    row_to_journey,
                )
                .optional()?;

            row.map(decode_journey).transpose()
        })
        .await
        .map_err(join_failed)?
    }

    async fn save(&self, journey: &PublishJourney) -> Result<(), StoreError> {
        let id = journey.id();
        let data_cbor = to_canonical_bytes(journey.data())?;
        let error = journey.error().map(str::to_string);
        let created_at = journey.created_at();
        let updated_at = journey.updated_at();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(poisoned)?;

            conn.execute(
                "INSERT INTO journeys (journey_id, data, error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(journey_id) DO UPDATE SET
                     data = excluded.data,
                     error = excluded.error,
                     updated_at = excluded.updated_at",
                params![
                    id.as_bytes().as_slice(),
                    data_cbor,
                    error,
                    created_at,
                    updated_at,
                ],
            )?;

            Ok(())
        })
        .await
        .map_err(join_failed)?
    }

    async fn list_ids(&self) -> Result<Vec<JourneyId>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(poisoned)?;

            let mut stmt = conn.prepare(
                "SELECT journey_id FROM journeys ORDER BY created_at, journey_id",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

            let mut ids = Vec::new();
            for row in rows {
                let bytes = row?;
                let id = JourneyId::try_from(bytes.as_slice()).map_err(|_| {
                    StoreError::Serialization(CoreError::DecodingError(
                        "journey_id column is not 32 bytes".to_string(),
                    ))
                })?;
                ids.push(id);
            }
            Ok(ids)
        })
        .await
        .map_err(join_failed)?
    }
}
