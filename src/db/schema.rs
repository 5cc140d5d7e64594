use rusqlite::Connection;

/// Initialize the license store schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL lets validations read while an admin batch holds the write lock.
    // In-memory databases ignore it and stay in "memory" mode.
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        -- License keys, one row per key.
        -- hwid is UNIQUE so two keys can never hold the same device, even under
        -- concurrent binds. NULL = not yet bound (SQLite allows many NULLs).
        -- expires_at NULL = never expires.
        CREATE TABLE IF NOT EXISTS license_keys (
            key TEXT PRIMARY KEY,
            hwid TEXT UNIQUE,
            expires_at INTEGER,
            active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
            name TEXT,
            created_at INTEGER NOT NULL
        );
        -- Compensation touches only active, finite keys
        CREATE INDEX IF NOT EXISTS idx_license_keys_finite_active
            ON license_keys(expires_at) WHERE active = 1 AND expires_at IS NOT NULL;
        "#,
    )?;
    Ok(())
}
