//! Wayback replay: URL formatting, archived page retrieval, and the
//! `wayback://{url}/{timestamp}` resource.

use crate::config::Config;
use crate::error::{ArchiveError, Result};
use crate::http::fetch_text;
use crate::models::{ArchivedPageResult, ResourceContent};

/// URI scheme of the archived-page resource.
pub const RESOURCE_SCHEME: &str = "wayback://";

/// Template advertised to hosts.
pub const RESOURCE_TEMPLATE: &str = "wayback://{url}/{timestamp}";

/// Mime type reported when the capture carries no `Content-Type`.
pub const DEFAULT_MIME_TYPE: &str = "text/html";

/// Build a replay URL.
///
/// `original` selects `id_` mode, which asks the Wayback Machine to serve the
/// capture with minimal link rewriting and no banner. Inputs are not
/// validated and are inserted verbatim.
pub fn archived_url(base: &str, url: &str, timestamp: &str, original: bool) -> String {
    if original {
        format!("{}/{}/id_/{}", base, timestamp, url)
    } else {
        format!("{}/{}/{}", base, timestamp, url)
    }
}

/// Split a `wayback://{url}/{timestamp}` URI into `(url, timestamp)`.
///
/// The timestamp is everything after the last `/`, so the url part may
/// itself contain path segments.
pub fn parse_resource_uri(uri: &str) -> Result<(&str, &str)> {
    let rest = uri.strip_prefix(RESOURCE_SCHEME).ok_or_else(|| {
        ArchiveError::InvalidArgument(format!("resource URI must start with {}", RESOURCE_SCHEME))
    })?;
    match rest.rsplit_once('/') {
        Some((url, timestamp)) if !url.is_empty() && !timestamp.is_empty() => {
            Ok((url, timestamp))
        }
        _ => Err(ArchiveError::InvalidArgument(format!(
            "resource URI must look like {}, got '{}'",
            RESOURCE_TEMPLATE, uri
        ))),
    }
}

/// Fetch one archived capture.
///
/// Non-2xx captures are returned as data with their status code.
pub async fn get_archived_page(
    config: &Config,
    url: &str,
    timestamp: &str,
    original: bool,
) -> Result<ArchivedPageResult> {
    let archived_url = archived_url(&config.archive.wayback_endpoint, url, timestamp, original);
    let page = fetch_text(&config.http, &archived_url).await?;

    let text = page.text();
    if text.is_none() {
        tracing::debug!(%archived_url, "body is not decodable as text");
    }

    Ok(ArchivedPageResult {
        url: url.to_string(),
        timestamp: timestamp.to_string(),
        archived_url,
        status_code: page.status_code,
        headers: page.headers,
        text,
    })
}

/// Resolve a `wayback://{url}/{timestamp}` resource.
///
/// Always fetched in normal replay mode. Returns a single-element list.
pub async fn read_resource(config: &Config, uri: &str) -> Result<Vec<ResourceContent>> {
    let (url, timestamp) = parse_resource_uri(uri)?;
    let archived_url = archived_url(&config.archive.wayback_endpoint, url, timestamp, false);
    let page = fetch_text(&config.http, &archived_url).await?;

    let mime_type = page
        .header("content-type")
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();
    let text = page.text();

    Ok(vec![ResourceContent {
        uri: archived_url,
        mime_type,
        text,
        body: page.body,
    }])
}

/// CLI entry point: fetch a capture and print it.
pub async fn run_page(
    config: &Config,
    url: &str,
    timestamp: &str,
    original: bool,
    json: bool,
) -> anyhow::Result<()> {
    let page = get_archived_page(config, url, timestamp, original).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("--- Capture ---");
    println!("archived_url: {}", page.archived_url);
    println!("status_code:  {}", page.status_code);
    for (name, value) in &page.headers {
        println!("{:<14}{}", format!("{}:", name), value);
    }
    println!();
    match page.text {
        Some(text) => println!("{}", text),
        None => println!("(body is not decodable as text)"),
    }

    Ok(())
}
