//! Schema definitions and migration utilities.
//!
//! The relational and document databases are separate, so each has its own
//! migration entry point.

use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

/// Embedded migration SQL for the relational schema (001_schema.sql).
pub const SCHEMA_MIGRATION: &str = include_str!("../../../migrations/001_schema.sql");

/// Embedded migration SQL for the document table (002_documents.sql).
pub const DOCUMENTS_MIGRATION: &str = include_str!("../../../migrations/002_documents.sql");

/// Run the relational migrations.
///
/// Idempotent: every statement checks for existing objects first.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    tracing::info!("Running relational migrations...");
    sqlx::raw_sql(SCHEMA_MIGRATION)
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationError(format!("Schema migration failed: {}", e)))?;
    tracing::info!("Relational migrations completed");
    Ok(())
}

/// Run the document store migrations against the document database.
pub async fn run_document_migrations(pool: &PgPool) -> StoreResult<()> {
    tracing::info!("Running document store migrations...");
    sqlx::raw_sql(DOCUMENTS_MIGRATION)
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationError(format!("Documents migration failed: {}", e)))?;
    tracing::info!("Document store migrations completed");
    Ok(())
}

/// Check if the relational schema has been initialized.
///
/// Returns true if the `boards` table exists.
pub async fn is_schema_initialized(pool: &PgPool) -> StoreResult<bool> {
    let result: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = 'boards'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent_sql() {
        for sql in [SCHEMA_MIGRATION, DOCUMENTS_MIGRATION] {
            for stmt in sql.split(';').map(str::trim).filter(|s| s.contains("CREATE")) {
                assert!(stmt.contains("IF NOT EXISTS"), "not idempotent: {}", stmt);
            }
        }
    }

    #[test]
    fn test_schema_declares_cascades() {
        assert!(SCHEMA_MIGRATION.contains("note_groups"));
        assert!(SCHEMA_MIGRATION.matches("ON DELETE CASCADE").count() >= 4);
    }
}
