//! Connection PRAGMAs shared by every SQLite handle
//!
//! WAL lets the dashboard read while a scoring run writes; the batch job is
//! the only writer.

use rusqlite::Connection;

/// Apply WAL, NORMAL sync, in-memory temp store, page cache and
/// autocheckpoint settings to a freshly opened connection
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode and wal_autocheckpoint answer with the new value
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::debug!("📊 SQLite journal_mode={}", mode);
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "cache_size", -64_000i64)?;
    conn.pragma_update_and_check(None, "wal_autocheckpoint", 1000i64, |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(())
}
