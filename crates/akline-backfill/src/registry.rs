//! Universe registry ingestion: fetches and merges the four exchange
//! boards (sh main/STAR, sz, bj), derives full-pinyin and
//! first-letter-initials for each name, and upserts the result via
//! `akline-store::universe`.

use async_trait::async_trait;
use chrono::NaiveDate;
use pinyin::ToPinyin;
use rusqlite::Connection;

use akline_models::{SymbolKind, UniverseEntry};

use crate::error::BackfillError;

/// One board's raw listing: `(code, name, list_date)`, where `code` is
/// the bare digits (no market prefix) exactly as the vendor reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardListing {
    pub code: String,
    pub name: String,
    pub list_date: Option<NaiveDate>,
}

/// Fetches each exchange board's raw listing. Mirrors
/// `fetch_and_transform_stock_info`'s four `try`/`except`-independent
/// calls: a board that fails to fetch simply contributes nothing,
/// it doesn't abort the refresh.
#[async_trait]
pub trait RegistryFeed: Send + Sync {
    async fn fetch_sh_main(&self) -> Result<Vec<BoardListing>, BackfillError>;
    async fn fetch_sh_star(&self) -> Result<Vec<BoardListing>, BackfillError>;
    async fn fetch_sz(&self) -> Result<Vec<BoardListing>, BackfillError>;
    async fn fetch_bj(&self) -> Result<Vec<BoardListing>, BackfillError>;
}

/// HTTP-backed feed: a `reqwest`-based client against a registry
/// endpoint, one call per board.
pub struct HttpRegistryFeed {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRegistryFeed {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    async fn fetch_board(&self, path: &str) -> Result<Vec<BoardListing>, BackfillError> {
        #[derive(serde::Deserialize)]
        struct Row {
            code: String,
            name: String,
            list_date: Option<NaiveDate>,
        }

        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .send()
            .await
            .map_err(akline_vendor::VendorError::Http)?;
        let rows: Vec<Row> = response
            .error_for_status()
            .map_err(akline_vendor::VendorError::Http)?
            .json()
            .await
            .map_err(akline_vendor::VendorError::Http)?;
        Ok(rows
            .into_iter()
            .map(|r| BoardListing {
                code: r.code,
                name: r.name,
                list_date: r.list_date,
            })
            .collect())
    }
}

#[async_trait]
impl RegistryFeed for HttpRegistryFeed {
    async fn fetch_sh_main(&self) -> Result<Vec<BoardListing>, BackfillError> {
        self.fetch_board("sh-main").await
    }
    async fn fetch_sh_star(&self) -> Result<Vec<BoardListing>, BackfillError> {
        self.fetch_board("sh-star").await
    }
    async fn fetch_sz(&self) -> Result<Vec<BoardListing>, BackfillError> {
        self.fetch_board("sz").await
    }
    async fn fetch_bj(&self) -> Result<Vec<BoardListing>, BackfillError> {
        self.fetch_board("bj").await
    }
}

/// In-memory feed for tests, seeded per board.
#[derive(Default)]
pub struct MockRegistryFeed {
    pub sh_main: Vec<BoardListing>,
    pub sh_star: Vec<BoardListing>,
    pub sz: Vec<BoardListing>,
    pub bj: Vec<BoardListing>,
}

#[async_trait]
impl RegistryFeed for MockRegistryFeed {
    async fn fetch_sh_main(&self) -> Result<Vec<BoardListing>, BackfillError> {
        Ok(self.sh_main.clone())
    }
    async fn fetch_sh_star(&self) -> Result<Vec<BoardListing>, BackfillError> {
        Ok(self.sh_star.clone())
    }
    async fn fetch_sz(&self) -> Result<Vec<BoardListing>, BackfillError> {
        Ok(self.sz.clone())
    }
    async fn fetch_bj(&self) -> Result<Vec<BoardListing>, BackfillError> {
        Ok(self.bj.clone())
    }
}

/// Full pinyin (tone-stripped, concatenated) and first-letter initials
/// for a Chinese name, the way `generate_pinyin_for_stocks` derives
/// `lazy_pinyin(name)` and `lazy_pinyin(name, style=Style.FIRST_LETTER)`.
/// Characters with no pinyin mapping (latin letters, digits, punctuation)
/// pass through unchanged in the full form and are dropped from initials.
pub fn derive_pinyin(name: &str) -> (String, String) {
    let mut full = String::new();
    let mut initials = String::new();
    for ch in name.chars() {
        match ch.to_pinyin() {
            Some(p) => {
                full.push_str(p.plain());
                if let Some(first) = p.plain().chars().next() {
                    initials.push(first);
                }
            }
            None => {
                if ch.is_ascii_alphanumeric() {
                    full.push(ch.to_ascii_lowercase());
                    initials.push(ch.to_ascii_lowercase());
                }
            }
        }
    }
    (full, initials)
}

fn listing_to_entry(prefix: &str, listing: BoardListing) -> Option<UniverseEntry> {
    if listing.code.is_empty() || listing.name.is_empty() {
        return None;
    }
    let symbol = format!("{prefix}.{}", listing.code).parse().ok()?;
    let (pinyin, pinyin_initials) = derive_pinyin(&listing.name);
    Some(UniverseEntry {
        symbol,
        name: listing.name,
        kind: SymbolKind::Stock,
        list_date: listing.list_date,
        pinyin,
        pinyin_initials,
    })
}

/// Merges all four boards and upserts the universe table. Mirrors
/// `fetch_and_transform_stock_info`'s concat-then-dropna-then-save
/// pipeline: a board whose fetch errors just contributes zero rows.
pub async fn refresh_universe(
    conn: &mut Connection,
    feed: &dyn RegistryFeed,
) -> Result<usize, BackfillError> {
    let mut entries = Vec::new();

    for (prefix, listings) in [
        ("sh", feed.fetch_sh_main().await.unwrap_or_default()),
        ("sh", feed.fetch_sh_star().await.unwrap_or_default()),
        ("sz", feed.fetch_sz().await.unwrap_or_default()),
        ("bj", feed.fetch_bj().await.unwrap_or_default()),
    ] {
        for listing in listings {
            if let Some(entry) = listing_to_entry(prefix, listing) {
                entries.push(entry);
            }
        }
    }

    if entries.is_empty() {
        return Ok(0);
    }
    let count = akline_store::universe::upsert_batch(conn, &entries)?;
    Ok(count)
}
