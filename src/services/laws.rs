//! Law catalog: local records searchable apart from the chat flow.
//!
//! DESIGN
//! ======
//! The free functions are thin SQL wrappers that surface `sqlx::Error`.
//! `LawCatalog` is what the rest of the app talks to: it swallows store
//! failures into empty results (logged), so "no matches" and "store error"
//! look the same to callers. There is no update operation; replacing a row
//! means inserting a `NewLaw` that carries the existing id.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info};

// =============================================================================
// TYPES
// =============================================================================

/// A stored law or scheme entry. Mirrors the `laws` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LawRecord {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub description: String,
    #[sqlx(rename = "referenceLink")]
    pub reference_link: Option<String>,
}

/// Insert payload. `id: None` lets the store assign one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewLaw {
    pub id: Option<i64>,
    pub title: String,
    pub category: String,
    pub description: String,
    pub reference_link: Option<String>,
}

// =============================================================================
// QUERIES
// =============================================================================

const SELECT_COLUMNS: &str = "SELECT id, title, category, description, referenceLink FROM laws";

/// Insert a law, replacing any existing row with the same id. Returns the row id.
pub async fn insert_law(pool: &SqlitePool, law: &NewLaw) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR REPLACE INTO laws (id, title, category, description, referenceLink) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(law.id)
    .bind(&law.title)
    .bind(&law.category)
    .bind(&law.description)
    .bind(&law.reference_link)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Laws whose title or category contains `query`. The query is matched
/// literally: `%` and `_` carry no wildcard meaning.
pub async fn search_laws(pool: &SqlitePool, query: &str) -> Result<Vec<LawRecord>, sqlx::Error> {
    let sql = format!(
        r"{SELECT_COLUMNS}
          WHERE title LIKE '%' || ?1 || '%' ESCAPE '\'
             OR category LIKE '%' || ?1 || '%' ESCAPE '\'
          ORDER BY id"
    );
    sqlx::query_as::<_, LawRecord>(&sql)
        .bind(escape_like(query))
        .fetch_all(pool)
        .await
}

/// All laws in insertion order.
pub async fn list_laws(pool: &SqlitePool) -> Result<Vec<LawRecord>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY id");
    sqlx::query_as::<_, LawRecord>(&sql).fetch_all(pool).await
}

/// Delete by id. Returns the number of rows removed (0 or 1).
pub async fn delete_law(pool: &SqlitePool, id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM laws WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Catalog operations as seen by the session and the console.
#[async_trait::async_trait]
pub trait LawStore: Send + Sync {
    /// Returns the assigned id, or `None` if the store rejected the write.
    async fn insert(&self, law: &NewLaw) -> Option<i64>;
    async fn search(&self, query: &str) -> Vec<LawRecord>;
    async fn list_all(&self) -> Vec<LawRecord>;
    /// Returns the number of rows removed.
    async fn delete(&self, law: &LawRecord) -> u64;
}

/// SQLite-backed [`LawStore`] used by the chat session. The `laws`
/// subcommands call the free functions instead so failures reach the exit
/// status.
#[derive(Clone)]
pub struct LawCatalog {
    pool: SqlitePool,
}

impl LawCatalog {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LawStore for LawCatalog {
    async fn insert(&self, law: &NewLaw) -> Option<i64> {
        match insert_law(&self.pool, law).await {
            Ok(id) => {
                info!(id, title = %law.title, "law inserted");
                Some(id)
            }
            Err(e) => {
                error!(error = %e, title = %law.title, "law insert failed");
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Vec<LawRecord> {
        search_laws(&self.pool, query).await.unwrap_or_else(|e| {
            error!(error = %e, query, "law search failed");
            Vec::new()
        })
    }

    async fn list_all(&self) -> Vec<LawRecord> {
        list_laws(&self.pool).await.unwrap_or_else(|e| {
            error!(error = %e, "law listing failed");
            Vec::new()
        })
    }

    async fn delete(&self, law: &LawRecord) -> u64 {
        delete_law(&self.pool, law.id).await.unwrap_or_else(|e| {
            error!(error = %e, id = law.id, "law delete failed");
            0
        })
    }
}

#[cfg(test)]
#[path = "laws_test.rs"]
mod tests;
