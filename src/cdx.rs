//! Wayback CDX index: query parameters and row normalization.
//!
//! The CDX API answers `output=json` requests with an array of arrays whose
//! first row names the columns:
//!
//! ```text
//! [["urlkey","timestamp","original","mimetype","statuscode","digest","length"],
//!  ["com,example)/","20200101000000","http://example.com/","text/html","200","ABC","1234"],
//!  ...]
//! ```
//!
//! Column order and presence are not guaranteed, and individual rows are
//! occasionally short. [`normalize_rows`] resolves each field by header name
//! with a fixed positional fallback and drops rows it cannot read, so one bad
//! row never costs the whole listing. A payload that is not a non-empty array
//! means "no captures".

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{ArchiveError, Result};
use crate::http::fetch_json;
use crate::models::{SnapshotListing, SnapshotRecord};
use crate::wayback::archived_url;

/// Default row cap for a listing.
pub const DEFAULT_LIMIT: u32 = 100;

/// CDX field name and the position used when the header does not name it.
/// Position 0 is always `urlkey`, which is not reported.
const FIELDS: [(&str, usize); 6] = [
    ("timestamp", 1),
    ("original", 2),
    ("mimetype", 3),
    ("statuscode", 4),
    ("digest", 5),
    ("length", 6),
];

/// How the CDX server matches `url` against captured URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Exact,
    Prefix,
    Host,
    Domain,
}

impl MatchType {
    pub const ALL: [&'static str; 4] = ["exact", "prefix", "host", "domain"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Prefix => "prefix",
            MatchType::Host => "host",
            MatchType::Domain => "domain",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(MatchType::Exact),
            "prefix" => Ok(MatchType::Prefix),
            "host" => Ok(MatchType::Host),
            "domain" => Ok(MatchType::Domain),
            other => Err(ArchiveError::InvalidArgument(format!(
                "match_type must be one of {}, got '{}'",
                MatchType::ALL.join(", "),
                other
            ))),
        }
    }
}

/// A snapshot listing request.
#[derive(Debug, Clone)]
pub struct CdxQuery {
    pub url: String,
    /// `YYYYMMDD` or any prefix of `YYYYMMDDHHMMSS`; passed through as given.
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub limit: u32,
    pub match_type: MatchType,
}

impl CdxQuery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            from_date: None,
            to_date: None,
            limit: DEFAULT_LIMIT,
            match_type: MatchType::default(),
        }
    }

    /// Query parameters for the CDX endpoint. Only 200 captures are asked
    /// for, collapsed on digest so identical captures appear once.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("url".to_string(), self.url.clone()),
            ("output".to_string(), "json".to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("matchType".to_string(), self.match_type.to_string()),
            ("filter".to_string(), "statuscode:200".to_string()),
            ("collapse".to_string(), "digest".to_string()),
        ];
        if let Some(from) = self.from_date.as_deref().filter(|s| !s.is_empty()) {
            params.push(("from".to_string(), from.to_string()));
        }
        if let Some(to) = self.to_date.as_deref().filter(|s| !s.is_empty()) {
            params.push(("to".to_string(), to.to_string()));
        }
        params
    }
}

/// Result of reading one data row.
#[derive(Debug)]
enum RowOutcome {
    Record(SnapshotRecord),
    Skip(String),
}

/// Column positions resolved from the header row.
struct Columns([usize; 6]);

impl Columns {
    fn from_header(header: Option<&Value>) -> Self {
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        if let Some(names) = header.and_then(Value::as_array) {
            for (idx, name) in names.iter().enumerate() {
                if let Some(name) = name.as_str() {
                    by_name.insert(name, idx);
                }
            }
        }

        let mut positions = [0usize; 6];
        for (slot, (name, fallback)) in positions.iter_mut().zip(FIELDS) {
            *slot = by_name.get(name).copied().unwrap_or(fallback);
        }
        Columns(positions)
    }

    fn read(&self, row: &Value, base: &str) -> RowOutcome {
        let Some(cells) = row.as_array() else {
            return RowOutcome::Skip("row is not an array".to_string());
        };

        let mut values: [String; 6] = Default::default();
        for (i, (value, &idx)) in values.iter_mut().zip(self.0.iter()).enumerate() {
            match cells.get(idx).and_then(cell_text) {
                Some(text) => *value = text,
                None => {
                    return RowOutcome::Skip(format!(
                        "no usable '{}' at column {} (row has {} cells)",
                        FIELDS[i].0,
                        idx,
                        cells.len()
                    ))
                }
            }
        }

        let [timestamp, original_url, mimetype, statuscode, digest, length] = values;
        let archived_url = archived_url(base, &original_url, &timestamp, false);
        RowOutcome::Record(SnapshotRecord {
            timestamp,
            original_url,
            mimetype,
            statuscode,
            digest,
            length,
            archived_url,
        })
    }
}

/// Strings verbatim, numbers by their JSON text, `null` as empty.
/// Nested arrays and objects are unusable.
fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Convert a raw CDX JSON payload into snapshot records.
///
/// `base` is the replay endpoint used for `archived_url`. Never fails: an
/// unexpected payload yields no records and unreadable rows are skipped.
/// Upstream row order is preserved.
pub fn normalize_rows(raw: &Value, base: &str) -> Vec<SnapshotRecord> {
    let rows = match raw.as_array() {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Vec::new(),
    };

    let columns = Columns::from_header(rows.first());

    rows[1..]
        .iter()
        .enumerate()
        .filter_map(|(i, row)| match columns.read(row, base) {
            RowOutcome::Record(record) => Some(record),
            RowOutcome::Skip(reason) => {
                tracing::debug!(row = i + 1, %reason, "skipping CDX row");
                None
            }
        })
        .collect()
}

/// List captures for a URL.
pub async fn get_snapshots(config: &Config, query: &CdxQuery) -> Result<SnapshotListing> {
    if query.limit == 0 {
        return Err(ArchiveError::InvalidArgument(
            "limit must be a positive count".to_string(),
        ));
    }

    let raw = fetch_json(&config.http, &config.archive.cdx_endpoint, &query.to_params()).await?;
    let snapshots = normalize_rows(&raw, &config.archive.wayback_endpoint);

    Ok(SnapshotListing::new(query.url.clone(), snapshots))
}

/// CLI entry point: list captures and print them.
pub async fn run_snapshots(config: &Config, query: &CdxQuery, json: bool) -> anyhow::Result<()> {
    let listing = get_snapshots(config, query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.snapshots.is_empty() {
        println!("No snapshots found for {}.", listing.url);
        return Ok(());
    }

    println!("{} snapshot(s) for {}:", listing.count, listing.url);
    for s in &listing.snapshots {
        println!(
            "  {}  {:>3}  {:<24} {}",
            s.timestamp, s.statuscode, s.mimetype, s.archived_url
        );
    }

    Ok(())
}
