//! JSONB document persistence.
//!
//! One table holds every collection:
//!
//! ```text
//! documents(collection TEXT, id UUID, body JSONB, created_at, updated_at)
//!           PRIMARY KEY (collection, id)
//! ```

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::Document;

/// Insert or replace a document.
pub async fn upsert<D: Document>(pool: &PgPool, doc: &D) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO documents (collection, id, body, created_at, updated_at)
         VALUES ($1, $2, $3, now(), now())
         ON CONFLICT (collection, id)
         DO UPDATE SET body = EXCLUDED.body, updated_at = now()",
    )
    .bind(D::COLLECTION)
    .bind(doc.id())
    .bind(Json(doc))
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a document. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, collection: &str, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
        .bind(collection)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every document of a collection, oldest first.
pub async fn load_all<D: Document>(pool: &PgPool) -> Result<Vec<D>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, body FROM documents WHERE collection = $1 ORDER BY created_at",
    )
    .bind(D::COLLECTION)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DocumentRow::into_document).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    body: serde_json::Value,
}

impl DocumentRow {
    fn into_document<D: Document>(self) -> Result<D, sqlx::Error> {
        serde_json::from_value(self.body).map_err(|e| {
            tracing::error!(
                collection = D::COLLECTION,
                id = %self.id,
                error = %e,
                "stored document does not match its record type"
            );
            sqlx::Error::Decode(Box::new(e))
        })
    }
}
