//! SQLite DDL constants shared by `akline-store`'s historical and intraday
//! repositories. Kept here, next to the types they back.

/// One table per resolution (`candles_1min`, `candles_daily`, ...). The
/// conflict key is `(end_ts, code)`; OHLCV fields replace on conflict.
pub fn historical_table_ddl(table_name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table_name} (
    end_ts      TEXT NOT NULL,
    code        TEXT NOT NULL,
    open        REAL NOT NULL,
    high        REAL NOT NULL,
    low         REAL NOT NULL,
    close       REAL NOT NULL,
    volume      REAL NOT NULL,
    amount      REAL NOT NULL,
    turn        REAL,
    PRIMARY KEY (end_ts, code)
);
CREATE INDEX IF NOT EXISTS idx_{table_name}_code ON {table_name}(code);
"
    )
}

/// The single intraday table, holding today's forming and sealed bars for
/// every resolution. Swept by `akline-store::CandleStore::sweep_intraday`
/// once a session date's bars have been promoted into the historical
/// tables. The conflict key is `(code, resolution, end_ts)`; `sealed`
/// replaces on conflict alongside the OHLCV fields.
pub const INTRADAY_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS intraday_candles (
    code        TEXT NOT NULL,
    resolution  TEXT NOT NULL,
    end_ts      TEXT NOT NULL,
    open        REAL NOT NULL,
    high        REAL NOT NULL,
    low         REAL NOT NULL,
    close       REAL NOT NULL,
    volume      REAL NOT NULL,
    amount      REAL NOT NULL,
    turn        REAL,
    sealed      INTEGER NOT NULL DEFAULT 0,
    session_date TEXT NOT NULL,
    PRIMARY KEY (code, resolution, end_ts)
);
CREATE INDEX IF NOT EXISTS idx_intraday_session ON intraday_candles(session_date);
";

/// The universe registry. Populated by `akline-backfill`'s
/// `refresh-universe` subcommand, read by `akline-core::registry`.
pub const UNIVERSE_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS universe (
    code            TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    kind            TEXT NOT NULL,
    list_date       TEXT,
    pinyin          TEXT NOT NULL,
    pinyin_initials TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_universe_pinyin ON universe(pinyin);
CREATE INDEX IF NOT EXISTS idx_universe_initials ON universe(pinyin_initials);
";

/// Fund split/dividend events. Written by the backfill driver alongside
/// forward-adjusted history; not read by any component in this repo's
/// scope (the adjustment math lives vendor-side), kept only so the
/// column is available to downstream consumers.
pub const FUND_SPLITS_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS fund_splits (
    code        TEXT NOT NULL,
    ex_date     TEXT NOT NULL,
    ratio       REAL NOT NULL,
    PRIMARY KEY (code, ex_date)
);
";
