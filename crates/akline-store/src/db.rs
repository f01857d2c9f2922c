use akline_models::schema::{
    historical_table_ddl, FUND_SPLITS_TABLE_DDL, INTRADAY_TABLE_DDL, UNIVERSE_TABLE_DDL,
};
use akline_models::Resolution;
use rusqlite::Connection;

use crate::error::StoreError;

const RESOLUTIONS: [Resolution; 8] = [
    Resolution::Min1,
    Resolution::Min5,
    Resolution::Min15,
    Resolution::Min30,
    Resolution::Min60,
    Resolution::Day,
    Resolution::Week,
    Resolution::Month,
];

pub fn historical_table_name(resolution: Resolution) -> String {
    format!("candles_{}", resolution.table_suffix())
}

/// Opens (creating if necessary) the SQLite store at `path`, applies
/// the full schema, and sets WAL journal mode for concurrent readers.
pub fn open(path: &str, busy_timeout_ms: u64) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    for resolution in RESOLUTIONS {
        conn.execute_batch(&historical_table_ddl(&historical_table_name(resolution)))?;
    }
    conn.execute_batch(INTRADAY_TABLE_DDL)?;
    conn.execute_batch(UNIVERSE_TABLE_DDL)?;
    conn.execute_batch(FUND_SPLITS_TABLE_DDL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_schema_creates_all_tables() {
        let conn = open_in_memory().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [historical_table_name(Resolution::Day)],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn wal_mode_set_on_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let conn = open(path.to_str().unwrap(), 5_000).unwrap();
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
