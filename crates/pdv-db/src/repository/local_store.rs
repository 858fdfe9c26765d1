//! # Local Store Repository
//!
//! Key → JSON document storage for the collections that are read and
//! written whole (budgets, expenses, productions, withdrawals) and for
//! single documents such as the company info.
//!
//! ## Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load("expenses")        missing key → []                              │
//! │  save("expenses", &v)    whole overwrite                               │
//! │  update("expenses", f)   BEGIN; load; f(&mut v); save; COMMIT          │
//! │                          f returning Err leaves the document as it was │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Fixed document keys.
pub mod keys {
    pub const BUDGETS: &str = "budget";
    pub const EXPENSES: &str = "expenses";
    pub const PRODUCTIONS: &str = "productions";
    pub const WITHDRAWALS: &str = "withdrawals";
    pub const COMPANY: &str = "company";

    /// Collections included in backups, in restore order.
    pub const COLLECTIONS: [&str; 4] = [BUDGETS, EXPENSES, PRODUCTIONS, WITHDRAWALS];
}

#[derive(Debug, Clone)]
pub struct LocalStoreRepository {
    pool: SqlitePool,
}

impl LocalStoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LocalStoreRepository { pool }
    }

    /// Loads the collection under `key`; a missing key is an empty list.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> DbResult<Vec<T>> {
        let mut conn = self.pool.acquire().await?;
        load_in(&mut conn, key).await
    }

    /// Replaces the collection under `key`.
    pub async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        save_in(&mut conn, key, items).await
    }

    /// Read-modify-write of a collection in one transaction.
    pub async fn update<T, R, F>(&self, key: &str, f: F) -> DbResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> DbResult<R>,
    {
        let mut tx = self.pool.begin().await?;
        let mut items: Vec<T> = load_in(&mut tx, key).await?;
        let result = f(&mut items)?;
        save_in(&mut tx, key, &items).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Loads a single document.
    pub async fn load_doc<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.acquire().await?;
        load_doc_in(&mut conn, key).await
    }

    /// Stores a single document.
    pub async fn save_doc<T: Serialize>(&self, key: &str, doc: &T) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        save_doc_in(&mut conn, key, doc).await
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

pub(crate) async fn load_doc_in<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    key: &str,
) -> DbResult<Option<T>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT value FROM local_store WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub(crate) async fn save_doc_in<T: Serialize + ?Sized>(
    conn: &mut SqliteConnection,
    key: &str,
    doc: &T,
) -> DbResult<()> {
    let raw = serde_json::to_string(doc)?;
    debug!(key = %key, bytes = raw.len(), "Saving local store document");

    sqlx::query(
        r#"
        INSERT INTO local_store (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(raw)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn load_in<T: DeserializeOwned>(conn: &mut SqliteConnection, key: &str) -> DbResult<Vec<T>> {
    Ok(load_doc_in(conn, key).await?.unwrap_or_default())
}

pub(crate) async fn save_in<T: Serialize>(conn: &mut SqliteConnection, key: &str, items: &[T]) -> DbResult<()> {
    save_doc_in(conn, key, items).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use crate::DbError;
    use pdv_core::CoreError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u32,
        text: String,
    }

    #[tokio::test]
    async fn test_missing_key_is_empty() {
        let db = test_db().await;
        let notes: Vec<Note> = db.local_store().load("notes").await.unwrap();
        assert!(notes.is_empty());
        let doc: Option<Note> = db.local_store().load_doc("nothing").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let db = test_db().await;
        let store = db.local_store();
        let first = vec![Note { id: 1, text: "a".into() }, Note { id: 2, text: "b".into() }];
        store.save("notes", &first).await.unwrap();
        store.save("notes", &first[..1]).await.unwrap();

        let loaded: Vec<Note> = store.load("notes").await.unwrap();
        assert_eq!(loaded, vec![Note { id: 1, text: "a".into() }]);
    }

    #[tokio::test]
    async fn test_update_rolls_back_on_error() {
        let db = test_db().await;
        let store = db.local_store();
        store.save("notes", &[Note { id: 1, text: "a".into() }]).await.unwrap();

        let added = store
            .update("notes", |notes: &mut Vec<Note>| {
                notes.push(Note { id: 2, text: "b".into() });
                Ok(notes.len())
            })
            .await
            .unwrap();
        assert_eq!(added, 2);

        let failed: DbResult<()> = store
            .update("notes", |notes: &mut Vec<Note>| {
                notes.clear();
                Err(CoreError::CartEmpty.into())
            })
            .await;
        assert!(matches!(failed, Err(DbError::Core(CoreError::CartEmpty))));

        let loaded: Vec<Note> = store.load("notes").await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_serialization_error() {
        let db = test_db().await;
        sqlx::query("INSERT INTO local_store (key, value, updated_at) VALUES ('notes', 'not json', '2024-01-01T00:00:00Z')")
            .execute(db.pool())
            .await
            .unwrap();
        let result: DbResult<Vec<Note>> = db.local_store().load("notes").await;
        assert!(matches!(result, Err(DbError::Serialization(_))));
    }
}
