use rusqlite::{Connection, Result};

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS responses (
            key TEXT PRIMARY KEY,
            endpoint TEXT NOT NULL,
            params TEXT NOT NULL,
            body TEXT NOT NULL,
            fetched_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_responses_endpoint ON responses(endpoint);
        ",
    )?;

    Ok(())
}
