use akline_models::{Symbol, SymbolKind, UniverseEntry};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;

fn kind_to_str(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Stock => "stock",
        SymbolKind::Index => "index",
        SymbolKind::Etf => "etf",
    }
}

fn kind_from_str(s: &str) -> SymbolKind {
    match s {
        "index" => SymbolKind::Index,
        "etf" => SymbolKind::Etf,
        _ => SymbolKind::Stock,
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<UniverseEntry> {
    let code: String = row.get("code")?;
    let list_date: Option<String> = row.get("list_date")?;
    let kind: String = row.get("kind")?;
    Ok(UniverseEntry {
        symbol: code.parse().unwrap_or_else(|_| {
            // Rows only ever come from our own upserts, so a malformed
            // code here means the table was hand-edited; fall back to a
            // harmless placeholder rather than panic on a read path.
            "sh.000000".parse().unwrap()
        }),
        name: row.get("name")?,
        kind: kind_from_str(&kind),
        list_date: list_date.and_then(|d| d.parse::<NaiveDate>().ok()),
        pinyin: row.get("pinyin")?,
        pinyin_initials: row.get("pinyin_initials")?,
    })
}

pub fn get(conn: &Connection, symbol: &Symbol) -> Result<Option<UniverseEntry>, StoreError> {
    let entry = conn
        .prepare_cached(
            "SELECT code, name, kind, list_date, pinyin, pinyin_initials
             FROM universe WHERE code = ?1",
        )?
        .query_row(params![symbol.to_string()], row_to_entry)
        .optional()?;
    Ok(entry)
}

/// True if the universe registry has at least one row. The reader uses
/// this to tell "never populated" (nothing authoritative to check a
/// symbol against) apart from "populated, and this symbol isn't in it".
pub fn is_populated(conn: &Connection) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM universe", [], |row| row.get(0))?;
    Ok(count > 0)
}

/// All registered entries, ordered by code. Used by the backfill
/// driver to enumerate the symbol universe to walk.
pub fn all(conn: &Connection) -> Result<Vec<UniverseEntry>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT code, name, kind, list_date, pinyin, pinyin_initials
         FROM universe ORDER BY code ASC",
    )?;
    let rows = stmt.query_map([], row_to_entry)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn upsert_batch(conn: &mut Connection, entries: &[UniverseEntry]) -> Result<usize, StoreError> {
    if entries.is_empty() {
        return Ok(0);
    }
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO universe (code, name, kind, list_date, pinyin, pinyin_initials)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                list_date = excluded.list_date,
                pinyin = excluded.pinyin,
                pinyin_initials = excluded.pinyin_initials",
        )?;
        for entry in entries {
            stmt.execute(params![
                entry.symbol.to_string(),
                entry.name,
                kind_to_str(entry.kind),
                entry.list_date.map(|d| d.to_string()),
                entry.pinyin,
                entry.pinyin_initials,
            ])?;
        }
    }
    tx.commit()?;
    Ok(entries.len())
}
