//! Universe registry, read side. `symbol -> UniverseEntry` lookup backed
//! by `akline-store::universe`; falls back to the structural `is_index`
//! rule when the registry has no row yet.

use akline_models::{Resolution, Symbol, SymbolKind};
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::ReaderError;

/// Classifies `symbol` as stock/index/etf. The registry's `kind` is
/// authoritative when populated; otherwise falls back to the structural
/// prefix rule on `Symbol`. Infallible: by the time the router reaches
/// this call, [`list_date`] has already gated unknown symbols out of the
/// read at the top of the pipeline, so there is nothing left to reject
/// here.
pub fn classify(conn: &Connection, symbol: &Symbol) -> SymbolKind {
    match akline_store::universe::get(conn, symbol) {
        Ok(Some(entry)) => entry.kind,
        Ok(None) | Err(_) => {
            if symbol.is_index() {
                SymbolKind::Index
            } else {
                SymbolKind::Stock
            }
        }
    }
}

/// `list_date` of `symbol`, if the registry has a row for it. The reader
/// uses this to clamp `begin` upward before snapping to a trading day.
///
/// Errors with [`ReaderError::UnknownSymbol`] only when the registry has
/// actually been populated (so it has something authoritative to check
/// against), this symbol isn't in it, *and* neither store has ever seen a
/// row for it either. An empty, never-populated registry has nothing to
/// judge a symbol against, so a cold first-ever read of a symbol the
/// universe feed hasn't ingested yet is not treated as unknown.
pub fn list_date(
    conn: &Connection,
    symbol: &Symbol,
    resolution: Resolution,
) -> Result<Option<NaiveDate>, ReaderError> {
    if let Some(entry) = akline_store::universe::get(conn, symbol)? {
        return Ok(entry.list_date);
    }
    if !akline_store::universe::is_populated(conn)? {
        return Ok(None);
    }
    if akline_store::historical::has_any_row(conn, symbol, resolution)?
        || akline_store::intraday::has_any_row(conn, symbol, resolution)?
    {
        return Ok(None);
    }
    Err(ReaderError::UnknownSymbol(symbol.to_string()))
}
