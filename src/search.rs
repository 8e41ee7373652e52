//! archive.org Advanced Search.
//!
//! Builds the Lucene-style `q` string and the repeated `fl[]` / `sort[]`
//! parameters, then passes the upstream document list through untouched.
//! Filter values are appended verbatim with no escaping; the upstream
//! service is authoritative for query syntax and for `rows`/`page` bounds.

use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::http::fetch_json;
use crate::models::SearchResult;

pub const DEFAULT_FIELDS: [&str; 5] = ["identifier", "title", "mediatype", "publicdate", "downloads"];
pub const DEFAULT_SORT: &str = "downloads desc";
pub const DEFAULT_ROWS: u32 = 50;
pub const DEFAULT_PAGE: u32 = 1;

/// An item search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    /// e.g. `texts`, `movies`, `audio`, `software`, `image`.
    pub mediatype: Option<String>,
    /// e.g. `web`.
    pub collection: Option<String>,
    pub fields: Vec<String>,
    /// Entries like `"downloads desc"` or `"publicdate asc"`.
    pub sort: Vec<String>,
    pub rows: u32,
    pub page: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mediatype: None,
            collection: None,
            fields: Vec::new(),
            sort: Vec::new(),
            rows: DEFAULT_ROWS,
            page: DEFAULT_PAGE,
        }
    }
}

/// Output of [`build_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub q: String,
    pub fl: Vec<String>,
    pub sort: Vec<String>,
}

/// Compose the final query string, field list, and sort list.
///
/// An empty or whitespace-only query becomes `*:*`. Filters are appended as
/// ` AND mediatype:<v>` then ` AND collection:<v>`.
pub fn build_query(
    query: &str,
    mediatype: Option<&str>,
    collection: Option<&str>,
    fields: &[String],
    sort: &[String],
) -> BuiltQuery {
    let base = query.trim();
    let mut q = if base.is_empty() {
        "*:*".to_string()
    } else {
        base.to_string()
    };

    if let Some(m) = mediatype.filter(|m| !m.is_empty()) {
        q.push_str(" AND mediatype:");
        q.push_str(m);
    }
    if let Some(c) = collection.filter(|c| !c.is_empty()) {
        q.push_str(" AND collection:");
        q.push_str(c);
    }

    let fl = if fields.is_empty() {
        DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
    } else {
        fields.to_vec()
    };
    let sort = if sort.is_empty() {
        vec![DEFAULT_SORT.to_string()]
    } else {
        sort.to_vec()
    };

    BuiltQuery { q, fl, sort }
}

/// Query parameters for the Advanced Search endpoint.
pub fn search_params(built: &BuiltQuery, rows: u32, page: u32) -> Vec<(String, String)> {
    let mut params = vec![("q".to_string(), built.q.clone())];
    params.extend(built.fl.iter().map(|f| ("fl[]".to_string(), f.clone())));
    params.extend(built.sort.iter().map(|s| ("sort[]".to_string(), s.clone())));
    params.push(("rows".to_string(), rows.to_string()));
    params.push(("page".to_string(), page.to_string()));
    params.push(("output".to_string(), "json".to_string()));
    params
}

/// Shape the upstream payload. A missing `response` container, or a
/// `numFound`/`docs` of the wrong type, reads as zero results.
pub fn parse_search_response(data: &Value, q: String, rows: u32, page: u32) -> SearchResult {
    let response = data.get("response");
    let num_found = response
        .and_then(|r| r.get("numFound"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let docs = response
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    SearchResult {
        q,
        rows,
        page,
        num_found,
        docs,
    }
}

/// Search archive.org items.
pub async fn search_items(config: &Config, query: &SearchQuery) -> Result<SearchResult> {
    let built = build_query(
        &query.query,
        query.mediatype.as_deref(),
        query.collection.as_deref(),
        &query.fields,
        &query.sort,
    );
    let params = search_params(&built, query.rows, query.page);

    let data = fetch_json(
        &config.http,
        &config.archive.advanced_search_endpoint,
        &params,
    )
    .await?;

    Ok(parse_search_response(&data, built.q, query.rows, query.page))
}

/// CLI entry point: search and print matching items.
pub async fn run_search(config: &Config, query: &SearchQuery, json: bool) -> anyhow::Result<()> {
    let result = search_items(config, query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "q: {}  (page {}, {} per page, {} found)",
        result.q, result.page, result.rows, result.num_found
    );
    if result.docs.is_empty() {
        println!("No items.");
        return Ok(());
    }
    for doc in &result.docs {
        let identifier = doc.get("identifier").and_then(Value::as_str).unwrap_or("?");
        let title = doc
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("(untitled)");
        println!("  {:<40} {}", identifier, title);
    }

    Ok(())
}
