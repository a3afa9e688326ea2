//! PostgreSQL-backed document store.
//!
//! Documents are rows of a single JSONB table keyed by
//! `(collection, id)`. The pool is separate from the relational one and may
//! point at a different database.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::types::Json;

use crate::documents::{CollectionPath, Document, DocumentPath, DocumentStore};
use crate::error::StoreResult;
use crate::schema;
use crate::store::StoreConfig;

/// Document store on a PostgreSQL `documents` table.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connect to the document database.
    ///
    /// Optionally runs the document migration if `config.run_migrations` is true.
    pub async fn connect(config: StoreConfig) -> StoreResult<Self> {
        tracing::info!("Connecting to document database...");
        let pool = config.pool().await?;
        tracing::info!("Connected to document database");

        if config.run_migrations {
            schema::run_document_migrations(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Value>> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as(r#"SELECT body FROM documents WHERE collection = $1 AND id = $2"#)
                .bind(path.collection.as_str())
                .bind(&path.id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(body,)| body.0))
    }

    async fn set(&self, path: &DocumentPath, body: &Value) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated = NOW()
            "#,
        )
        .bind(path.collection.as_str())
        .bind(&path.id)
        .bind(Json(body))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<bool> {
        let result = sqlx::query(r#"DELETE FROM documents WHERE collection = $1 AND id = $2"#)
            .bind(path.collection.as_str())
            .bind(&path.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>> {
        let rows: Vec<(String, Json<Value>)> = sqlx::query_as(
            r#"SELECT id, body FROM documents WHERE collection = $1 ORDER BY id"#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, body)| Document { id, body: body.0 })
            .collect())
    }

    async fn close(&self) {
        tracing::info!("Closing document pool");
        self.pool.close().await;
    }
}
