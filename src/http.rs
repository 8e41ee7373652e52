//! Outbound HTTP adapter.
//!
//! The only module that touches the network. Each call builds its own
//! [`reqwest::Client`] carrying the configured client signature, issues a
//! single GET, and drops the client before returning, so no connection
//! outlives the invocation that opened it. There are no retries: a failed
//! request surfaces directly to the caller.
//!
//! Two flavours:
//!
//! - [`fetch_json`]: 20 s default timeout, non-2xx is an error.
//! - [`fetch_text`]: 30 s default timeout, any status is returned as data.

use std::collections::BTreeMap;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use serde_json::Value;

use crate::config::HttpConfig;
use crate::error::{ArchiveError, Result};

/// Raw response from [`fetch_text`].
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status_code: u16,
    /// Response headers. Repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body decoded as text, or `None` when it is not decodable.
    pub fn text(&self) -> Option<String> {
        decode_text(self.header("content-type"), &self.body)
    }
}

fn build_client(http: &HttpConfig, timeout: Duration, endpoint: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(http.user_agent())
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(http.max_redirects))
        .build()
        .map_err(|e| ArchiveError::from_reqwest(endpoint, timeout.as_secs(), e))
}

/// GET `endpoint` with query `params` and decode the body as JSON.
///
/// Keys may repeat (`fl[]`, `sort[]`); they are sent in the given order.
///
/// # Errors
///
/// [`ArchiveError::UpstreamStatus`] on a non-2xx status,
/// [`ArchiveError::Timeout`] when the deadline passes, and
/// [`ArchiveError::InvalidJson`] when a 2xx body is not JSON.
pub async fn fetch_json(
    http: &HttpConfig,
    endpoint: &str,
    params: &[(String, String)],
) -> Result<Value> {
    let timeout = http.json_timeout();
    let secs = timeout.as_secs();
    let client = build_client(http, timeout, endpoint)?;

    tracing::debug!(endpoint, params = params.len(), "GET json");

    let response = client
        .get(endpoint)
        .query(params)
        .send()
        .await
        .map_err(|e| ArchiveError::from_reqwest(endpoint, secs, e))?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(endpoint, status = status.as_u16(), "upstream error status");
        return Err(ArchiveError::UpstreamStatus {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ArchiveError::from_reqwest(endpoint, secs, e))?;

    serde_json::from_slice(&body).map_err(|e| ArchiveError::InvalidJson {
        endpoint: endpoint.to_string(),
        source: e,
    })
}

/// GET `url` and return whatever came back, whatever the status.
///
/// Archived captures legitimately carry 3xx/4xx/5xx statuses, so only
/// transport failures (connect, timeout) are errors here.
pub async fn fetch_text(http: &HttpConfig, url: &str) -> Result<FetchedPage> {
    let timeout = http.text_timeout();
    let secs = timeout.as_secs();
    let client = build_client(http, timeout, url)?;

    tracing::debug!(url, "GET page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ArchiveError::from_reqwest(url, secs, e))?;

    let status_code = response.status().as_u16();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in response.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ArchiveError::from_reqwest(url, secs, e))?
        .to_vec();

    Ok(FetchedPage {
        status_code,
        headers,
        body,
    })
}

/// Extract the `charset` parameter from a `Content-Type` value.
fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Decode a response body as text.
///
/// A byte-order mark wins over the declared charset. Otherwise the
/// `charset` label is resolved the way browsers do (`iso-8859-1` reads as
/// windows-1252); an undeclared or unknown charset means UTF-8. Decoding
/// is strict: a body with any malformed sequence yields `None`.
pub fn decode_text(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    let (encoding, body) = match Encoding::for_bom(body) {
        Some((encoding, bom_len)) => (encoding, &body[bom_len..]),
        None => {
            let declared = content_type
                .and_then(charset_of)
                .and_then(|label| Encoding::for_label(label.as_bytes()));
            (declared.unwrap_or(UTF_8), body)
        }
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}
