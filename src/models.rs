//! Result shapes returned to the host.
//!
//! Field names are part of the host contract and are serialized exactly as
//! written here (`numFound`, `mimeType` included).

use serde::Serialize;
use std::collections::BTreeMap;

/// One capture from the CDX index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    /// `YYYYMMDDHHMMSS`.
    pub timestamp: String,
    pub original_url: String,
    pub mimetype: String,
    pub statuscode: String,
    pub digest: String,
    pub length: String,
    /// Always `{wayback_endpoint}/{timestamp}/{original_url}`.
    pub archived_url: String,
}

/// Output of `get_snapshots`.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotListing {
    pub url: String,
    pub snapshots: Vec<SnapshotRecord>,
    pub count: usize,
}

impl SnapshotListing {
    pub fn new(url: impl Into<String>, snapshots: Vec<SnapshotRecord>) -> Self {
        Self {
            url: url.into(),
            count: snapshots.len(),
            snapshots,
        }
    }
}

/// Output of `get_archived_page`.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedPageResult {
    pub url: String,
    pub timestamp: String,
    pub archived_url: String,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// `None` (serialized as `null`) when the body is not decodable as text.
    pub text: Option<String>,
}

/// One element of the `wayback://{url}/{timestamp}` resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: Option<String>,
    /// Raw body, kept so hosts that cannot accept `null` text can fall back
    /// to binary contents.
    #[serde(skip)]
    pub body: Vec<u8>,
}

/// Output of `search_items`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub q: String,
    pub rows: u32,
    pub page: u32,
    #[serde(rename = "numFound")]
    pub num_found: u64,
    /// Upstream documents, passed through unmodified.
    pub docs: Vec<serde_json::Value>,
}
