//! End-to-end tests for the archive operations against a fake upstream.
//!
//! A `mockito` server stands in for web.archive.org and archive.org; the
//! config points every endpoint at it.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use wayback_mcp::cdx::{get_snapshots, CdxQuery, MatchType};
use wayback_mcp::config::Config;
use wayback_mcp::search::{search_items, SearchQuery};
use wayback_mcp::traits::{ToolContext, ToolRegistry};
use wayback_mcp::wayback::{get_archived_page, read_resource};
use wayback_mcp::ArchiveError;

// ─── Helpers ────────────────────────────────────────────────────────

fn config_for(server: &ServerGuard) -> Config {
    let mut cfg = Config::default();
    cfg.archive.cdx_endpoint = format!("{}/cdx/search/cdx", server.url());
    cfg.archive.wayback_endpoint = format!("{}/web", server.url());
    cfg.archive.advanced_search_endpoint = format!("{}/advancedsearch.php", server.url());
    cfg
}

fn cdx_header() -> Value {
    json!(["urlkey", "timestamp", "original", "mimetype", "statuscode", "digest", "length"])
}

// ─── Snapshots ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_snapshots_sends_cdx_params_and_normalizes() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    let body = json!([
        cdx_header(),
        ["com,example)/", "20200101000000", "example.com", "text/html", "200", "AAA", "1024"],
        ["com,example)/", "20200102000000", "example.com"],
        ["com,example)/", "20210101000000", "example.com", "text/html", "200", "BBB", "2048"]
    ]);

    let mock = server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("url".into(), "example.com".into()),
            Matcher::UrlEncoded("output".into(), "json".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
            Matcher::UrlEncoded("matchType".into(), "prefix".into()),
            Matcher::UrlEncoded("filter".into(), "statuscode:200".into()),
            Matcher::UrlEncoded("collapse".into(), "digest".into()),
            Matcher::UrlEncoded("from".into(), "2020".into()),
        ]))
        .match_header("user-agent", Matcher::Regex(r"^wayback-mcp/\S+ \(\+https://".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let mut query = CdxQuery::new("example.com");
    query.limit = 10;
    query.match_type = MatchType::Prefix;
    query.from_date = Some("2020".to_string());

    let listing = get_snapshots(&cfg, &query).await.unwrap();
    mock.assert_async().await;

    assert_eq!(listing.url, "example.com");
    assert_eq!(listing.count, 2);
    assert_eq!(listing.snapshots.len(), 2);
    assert_eq!(listing.snapshots[0].timestamp, "20200101000000");
    assert_eq!(listing.snapshots[1].digest, "BBB");
    for s in &listing.snapshots {
        assert_eq!(
            s.archived_url,
            format!("{}/{}/{}", cfg.archive.wayback_endpoint, s.timestamp, s.original_url)
        );
    }
}

#[tokio::test]
async fn test_snapshots_empty_listing_is_not_an_error() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let listing = get_snapshots(&cfg, &CdxQuery::new("nothing.example"))
        .await
        .unwrap();
    let value = serde_json::to_value(&listing).unwrap();
    assert_eq!(
        value,
        json!({ "url": "nothing.example", "snapshots": [], "count": 0 })
    );
}

#[tokio::test]
async fn test_snapshots_upstream_error_propagates() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let err = get_snapshots(&cfg, &CdxQuery::new("example.com"))
        .await
        .unwrap_err();
    match err {
        ArchiveError::UpstreamStatus { status, endpoint } => {
            assert_eq!(status, 503);
            assert_eq!(endpoint, cfg.archive.cdx_endpoint);
        }
        other => panic!("expected UpstreamStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_snapshots_non_json_body_is_an_error() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = get_snapshots(&cfg, &CdxQuery::new("example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidJson { .. }));
}

#[tokio::test]
async fn test_snapshots_zero_limit_rejected_before_network() {
    let server = Server::new_async().await;
    let cfg = config_for(&server);

    let mut query = CdxQuery::new("example.com");
    query.limit = 0;
    let err = get_snapshots(&cfg, &query).await.unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_json_timeout_surfaces() {
    // Accepts connections but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let mut cfg = Config::default();
    cfg.archive.cdx_endpoint = format!("http://{}/cdx", addr);
    cfg.http.json_timeout_secs = 1;

    let started = Instant::now();
    let err = get_snapshots(&cfg, &CdxQuery::new("example.com"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ArchiveError::Timeout { secs: 1, .. }),
        "got {:?}",
        err
    );
    assert!(started.elapsed().as_secs() < 10);
    drop(listener);
}

// ─── Archived pages ─────────────────────────────────────────────────

#[tokio::test]
async fn test_archived_page_original_mode() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    let mock = server
        .mock("GET", "/web/20200101000000/id_/example.com")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_header("X-Archive-Src", "crawl-1.warc.gz")
        .with_body("<html>hello</html>")
        .create_async()
        .await;

    let page = get_archived_page(&cfg, "example.com", "20200101000000", true)
        .await
        .unwrap();
    mock.assert_async().await;

    assert_eq!(
        page.archived_url,
        format!("{}/web/20200101000000/id_/example.com", server.url())
    );
    assert_eq!(page.status_code, 200);
    assert_eq!(page.text.as_deref(), Some("<html>hello</html>"));
    assert_eq!(
        page.headers.get("x-archive-src").map(String::as_str),
        Some("crawl-1.warc.gz")
    );
}

#[tokio::test]
async fn test_archived_page_404_is_data() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/web/2019/example.com/missing")
        .with_status(404)
        .with_header("content-type", "text/html")
        .with_body("Not Found")
        .create_async()
        .await;

    let page = get_archived_page(&cfg, "example.com/missing", "2019", false)
        .await
        .unwrap();
    assert_eq!(page.status_code, 404);
    assert_eq!(page.text.as_deref(), Some("Not Found"));
}

#[tokio::test]
async fn test_archived_page_binary_body_has_null_text() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/web/2019/example.com/logo.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(vec![0x89u8, 0x50, 0x4E, 0x47, 0xFF, 0xFE, 0x00])
        .create_async()
        .await;

    let page = get_archived_page(&cfg, "example.com/logo.png", "2019", false)
        .await
        .unwrap();
    assert_eq!(page.status_code, 200);
    assert!(page.text.is_none());
    assert_eq!(serde_json::to_value(&page).unwrap()["text"], Value::Null);
}

#[tokio::test]
async fn test_snapshot_url_round_trips_through_page_fetch() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!([
                cdx_header(),
                ["com,example)/", "20200101000000", "example.com", "text/html", "200", "A", "1"]
            ])
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/web/20200101000000/example.com")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let listing = get_snapshots(&cfg, &CdxQuery::new("example.com"))
        .await
        .unwrap();
    let snap = &listing.snapshots[0];
    let page = get_archived_page(&cfg, &snap.original_url, &snap.timestamp, false)
        .await
        .unwrap();
    assert_eq!(page.archived_url, snap.archived_url);
}

#[tokio::test]
async fn test_archived_page_legacy_charset_decodes() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/web/2003/example.com")
        .with_status(200)
        .with_header("content-type", "text/html; charset=windows-1252")
        .with_body(b"<p>caf\xE9 \x93quoted\x94</p>".to_vec())
        .create_async()
        .await;

    let page = get_archived_page(&cfg, "example.com", "2003", false)
        .await
        .unwrap();
    assert_eq!(
        page.text.as_deref(),
        Some("<p>café \u{201C}quoted\u{201D}</p>")
    );
}

#[tokio::test]
async fn test_archived_page_follows_redirects() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    // Replay of an inexact timestamp points at the nearest capture.
    server
        .mock("GET", "/web/2020/example.com")
        .with_status(302)
        .with_header(
            "location",
            &format!("{}/web/20200101000000/example.com", server.url()),
        )
        .create_async()
        .await;
    let target = server
        .mock("GET", "/web/20200101000000/example.com")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("nearest capture")
        .create_async()
        .await;

    let page = get_archived_page(&cfg, "example.com", "2020", false)
        .await
        .unwrap();
    target.assert_async().await;

    assert_eq!(page.status_code, 200);
    assert_eq!(page.text.as_deref(), Some("nearest capture"));
    assert_eq!(
        page.archived_url,
        format!("{}/web/2020/example.com", server.url())
    );
}

#[tokio::test]
async fn test_archived_page_redirect_cap() {
    let mut server = Server::new_async().await;
    let mut cfg = config_for(&server);
    cfg.http.max_redirects = 2;

    for (from, to) in [("a", "b"), ("b", "c"), ("c", "d")] {
        server
            .mock("GET", format!("/web/2020/{}.example", from).as_str())
            .with_status(302)
            .with_header("location", &format!("{}/web/2020/{}.example", server.url(), to))
            .create_async()
            .await;
    }
    server
        .mock("GET", "/web/2020/d.example")
        .with_status(200)
        .with_body("too far")
        .create_async()
        .await;

    let err = get_archived_page(&cfg, "a.example", "2020", false)
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Transport { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_snapshots_follow_redirects() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::Any)
        .with_status(301)
        .with_header(
            "location",
            &format!("{}/cdx/moved?url=example.com&output=json", server.url()),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/cdx/moved")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                cdx_header(),
                ["k", "20200101000000", "example.com", "text/html", "200", "A", "1"]
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let listing = get_snapshots(&cfg, &CdxQuery::new("example.com"))
        .await
        .unwrap();
    assert_eq!(listing.count, 1);
}

#[tokio::test]
async fn test_text_timeout_surfaces() {
    // Accepts connections but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let mut cfg = Config::default();
    cfg.archive.wayback_endpoint = format!("http://{}/web", addr);
    cfg.http.text_timeout_secs = 1;

    let started = Instant::now();
    let err = get_archived_page(&cfg, "example.com", "2020", false)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ArchiveError::Timeout { secs: 1, .. }),
        "got {:?}",
        err
    );
    assert!(started.elapsed().as_secs() < 10);
    drop(listener);
}

// ─── Resource ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_resource_uses_upstream_content_type() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/web/20200101000000/example.com/feed.xml")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body("<rss/>")
        .create_async()
        .await;

    let contents = read_resource(&cfg, "wayback://example.com/feed.xml/20200101000000")
        .await
        .unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(
        contents[0].uri,
        format!("{}/web/20200101000000/example.com/feed.xml", server.url())
    );
    assert_eq!(contents[0].mime_type, "application/rss+xml");
    assert_eq!(contents[0].text.as_deref(), Some("<rss/>"));
}

#[tokio::test]
async fn test_resource_defaults_mime_type() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/web/2020/example.com")
        .with_status(200)
        .with_body("<p>hi</p>")
        .create_async()
        .await;

    let contents = read_resource(&cfg, "wayback://example.com/2020").await.unwrap();
    assert_eq!(contents[0].mime_type, "text/html");
    let wire = serde_json::to_value(&contents).unwrap();
    assert_eq!(wire[0]["mimeType"], "text/html");
    assert!(wire[0].get("body").is_none());
}

#[tokio::test]
async fn test_resource_bad_uri() {
    let server = Server::new_async().await;
    let cfg = config_for(&server);

    let err = read_resource(&cfg, "wayback://example.com").await.unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidArgument(_)));
}

// ─── Search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_defaults_and_passthrough() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    let mock = server
        .mock("GET", "/advancedsearch.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "*:* AND mediatype:texts".into()),
            Matcher::UrlEncoded("fl[]".into(), "identifier".into()),
            Matcher::UrlEncoded("fl[]".into(), "downloads".into()),
            Matcher::UrlEncoded("sort[]".into(), "downloads desc".into()),
            Matcher::UrlEncoded("rows".into(), "50".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("output".into(), "json".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "responseHeader": { "status": 0 },
                "response": {
                    "numFound": 1234,
                    "start": 0,
                    "docs": [ { "identifier": "alice", "title": "Alice", "downloads": 9 } ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut query = SearchQuery::new("");
    query.mediatype = Some("texts".to_string());
    let result = search_items(&cfg, &query).await.unwrap();
    mock.assert_async().await;

    assert_eq!(result.q, "*:* AND mediatype:texts");
    assert_eq!(result.num_found, 1234);
    assert_eq!(
        result.docs,
        vec![json!({ "identifier": "alice", "title": "Alice", "downloads": 9 })]
    );
}

#[tokio::test]
async fn test_search_missing_container_reads_as_empty() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/advancedsearch.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error": "query parse failure"}"#)
        .create_async()
        .await;

    let result = search_items(&cfg, &SearchQuery::new("title:(")).await.unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["numFound"], 0);
    assert_eq!(value["docs"], json!([]));
    assert_eq!(value["q"], "title:(");
}

// ─── Tool registry ──────────────────────────────────────────────────

#[tokio::test]
async fn test_tools_execute_through_context() {
    let mut server = Server::new_async().await;
    let cfg = config_for(&server);

    server
        .mock("GET", "/cdx/search/cdx")
        .match_query(Matcher::UrlEncoded("to".into(), "2021".into()))
        .with_status(200)
        .with_body(
            json!([
                cdx_header(),
                ["k", "20200101000000", "example.com", "text/html", "200", "A", "1"]
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let registry = ToolRegistry::with_builtins();
    let ctx = ToolContext::new(Arc::new(cfg));
    let tool = registry.find("get_snapshots").unwrap();
    let result = tool
        .execute(json!({ "url": "example.com", "to": "2021" }), &ctx)
        .await
        .unwrap();

    assert_eq!(result["count"], 1);
    assert_eq!(result["snapshots"][0]["original_url"], "example.com");
    assert_eq!(result["snapshots"][0]["statuscode"], "200");
}

#[tokio::test]
async fn test_tool_argument_errors() {
    let server = Server::new_async().await;
    let ctx = ToolContext::new(Arc::new(config_for(&server)));
    let registry = ToolRegistry::with_builtins();

    let page = registry.find("get_archived_page").unwrap();
    let err = page
        .execute(json!({ "url": "example.com", "timestamp": " " }), &ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timestamp must not be empty"));

    let snaps = registry.find("get_snapshots").unwrap();
    let err = snaps
        .execute(json!({ "url": "example.com", "match_type": "everything" }), &ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid arguments for get_snapshots"));
}
