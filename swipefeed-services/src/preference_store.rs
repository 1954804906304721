//! Preference storage
//!
//! One document per user. `update` is the read-modify-write boundary: the
//! SQLite store runs it inside a transaction, the in-memory store under the
//! map's per-key lock.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use swipefeed_core::UserPreferenceState;

use crate::error::StoreError;

/// Mutation applied to a user's state inside `PreferenceStore::update`
pub type UpdateFn = Box<dyn FnOnce(&mut UserPreferenceState) + Send>;

/// Key-value store for per-user preference state
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferenceState>, StoreError>;

    async fn put(&self, user_id: &str, state: &UserPreferenceState) -> Result<(), StoreError>;

    /// Apply `apply` to the user's record (default state when absent) and
    /// persist it in one logical step. Returns the new state.
    async fn update(&self, user_id: &str, apply: UpdateFn) -> Result<UserPreferenceState, StoreError>;
}

/// Process-local store; contents are lost on restart
#[derive(Default)]
pub struct MemoryPreferenceStore {
    states: DashMap<String, UserPreferenceState>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferenceState>, StoreError> {
        Ok(self.states.get(user_id).map(|s| s.value().clone()))
    }

    async fn put(&self, user_id: &str, state: &UserPreferenceState) -> Result<(), StoreError> {
        self.states.insert(user_id.to_string(), state.clone());
        Ok(())
    }

    async fn update(&self, user_id: &str, apply: UpdateFn) -> Result<UserPreferenceState, StoreError> {
        let mut entry = self.states.entry(user_id.to_string()).or_default();
        apply(entry.value_mut());
        Ok(entry.value().clone())
    }
}

/// SQLite-backed store, one JSON document per user
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    /// Open (or create) the database file and its schema
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Io(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory database (useful for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn read_state(conn: &Connection, user_id: &str) -> Result<Option<UserPreferenceState>, StoreError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT state FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_state(conn: &Connection, user_id: &str, state: &UserPreferenceState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        conn.execute(
            r#"
            INSERT INTO user_preferences (user_id, state) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE
            SET state = excluded.state, updated_at = strftime('%s', 'now')
            "#,
            params![user_id, json],
        )?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferenceState>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        Self::read_state(&conn, user_id)
    }

    async fn put(&self, user_id: &str, state: &UserPreferenceState) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        Self::write_state(&conn, user_id, state)
    }

    async fn update(&self, user_id: &str, apply: UpdateFn) -> Result<UserPreferenceState, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let tx = conn.transaction()?;

        let mut state = Self::read_state(&tx, user_id)?.unwrap_or_default();
        apply(&mut state);
        Self::write_state(&tx, user_id, &state)?;

        tx.commit()?;
        Ok(state)
    }
}
