use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create documents table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            source_label TEXT NOT NULL,
            raw_text TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create passages table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            document_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            source_label TEXT NOT NULL,
            total_chunks INTEGER NOT NULL,
            PRIMARY KEY (document_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create turns table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS turns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            role TEXT NOT NULL,
            text TEXT NOT NULL,
            retrieved_context TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_passages_owner_id ON passages(owner_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_owner_id ON documents(owner_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}
