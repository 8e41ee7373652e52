//! Tool abstraction and the built-in archive tools.
//!
//! Every operation the server exposes is a [`Tool`]: a name, a one-line
//! description, a JSON Schema for its parameters, and an async `execute`.
//! Both the HTTP API and the MCP bridge dispatch through a [`ToolRegistry`],
//! so the two surfaces cannot drift apart.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  get_snapshots  get_archived_page        │
//! │  search_items   (+ custom Rust tools)    │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     McpBridge (stdio / streamable HTTP)
//!     run_server() → POST /tools/{name}
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::cdx::{get_snapshots, CdxQuery, MatchType, DEFAULT_LIMIT};
use crate::config::Config;
use crate::models::{ArchivedPageResult, ResourceContent, SearchResult, SnapshotListing};
use crate::search::{search_items, SearchQuery, DEFAULT_PAGE, DEFAULT_ROWS};
use crate::wayback::{get_archived_page, read_resource};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// An operation that hosts can discover and call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use wayback_mcp::traits::{Tool, ToolContext};
///
/// pub struct EndpointsTool;
///
/// #[async_trait]
/// impl Tool for EndpointsTool {
///     fn name(&self) -> &str { "endpoints" }
///     fn description(&self) -> &str { "Show the configured archive endpoints" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         Ok(json!({ "wayback": ctx.config().archive.wayback_endpoint }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores, used as the route and MCP tool name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether this tool ships with the crate. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema object with `type: "object"`, `properties`, and
    /// optionally `required`.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is always a JSON object.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Serializable tool descriptor for `GET /tools/list` and `wayback tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Per-invocation handle to the configured archive endpoints.
///
/// Cheap to create; holds only a shared, read-only [`Config`].
pub struct ToolContext {
    config: Arc<Config>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Equivalent to the `get_snapshots` tool.
    pub async fn snapshots(&self, query: &CdxQuery) -> Result<SnapshotListing> {
        Ok(get_snapshots(&self.config, query).await?)
    }

    /// Equivalent to the `get_archived_page` tool.
    pub async fn archived_page(
        &self,
        url: &str,
        timestamp: &str,
        original: bool,
    ) -> Result<ArchivedPageResult> {
        Ok(get_archived_page(&self.config, url, timestamp, original).await?)
    }

    /// Equivalent to the `search_items` tool.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        Ok(search_items(&self.config, query).await?)
    }

    /// Resolve a `wayback://{url}/{timestamp}` resource URI.
    pub async fn resource(&self, uri: &str) -> Result<Vec<ResourceContent>> {
        Ok(read_resource(&self.config, uri).await?)
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, params: Value) -> Result<T> {
    serde_json::from_value(params).with_context(|| format!("invalid arguments for {}", tool))
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct SnapshotsArgs {
    url: String,
    #[serde(default, rename = "from_", alias = "from", alias = "from_date")]
    from: Option<String>,
    #[serde(default, alias = "to_date")]
    to: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    match_type: Option<MatchType>,
}

impl SnapshotsArgs {
    /// Omitted and `null` arguments both take their defaults.
    fn into_query(self) -> CdxQuery {
        CdxQuery {
            url: self.url,
            from_date: self.from,
            to_date: self.to,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            match_type: self.match_type.unwrap_or_default(),
        }
    }
}

/// Lists Wayback captures of a URL via the CDX index.
pub struct SnapshotsTool;

#[async_trait]
impl Tool for SnapshotsTool {
    fn name(&self) -> &str {
        "get_snapshots"
    }

    fn description(&self) -> &str {
        "Get a list of available Wayback Machine snapshots for a URL. \
         Dates use YYYYMMDD, match_type is one of: exact, prefix, host, domain."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to look up" },
                "from_": { "type": "string", "description": "Earliest capture date (YYYYMMDD)" },
                "to": { "type": "string", "description": "Latest capture date (YYYYMMDD)" },
                "limit": { "type": "integer", "minimum": 1, "default": DEFAULT_LIMIT, "description": "Maximum number of snapshots" },
                "match_type": { "type": "string", "enum": MatchType::ALL, "default": "exact" }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let args: SnapshotsArgs = parse_args(self.name(), params)?;
        if args.url.trim().is_empty() {
            bail!("url must not be empty");
        }

        let listing = ctx.snapshots(&args.into_query()).await?;
        Ok(serde_json::to_value(&listing)?)
    }
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    url: String,
    timestamp: String,
    #[serde(default)]
    original: Option<bool>,
}

/// Retrieves one archived capture.
pub struct ArchivedPageTool;

#[async_trait]
impl Tool for ArchivedPageTool {
    fn name(&self) -> &str {
        "get_archived_page"
    }

    fn description(&self) -> &str {
        "Retrieve content of an archived webpage from the Wayback Machine \
         using YYYYMMDDHHMMSS timestamp. If original=true, request id_ mode."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Original URL of the page" },
                "timestamp": { "type": "string", "description": "Capture timestamp (YYYYMMDDHHMMSS, prefixes allowed)" },
                "original": { "type": "boolean", "default": false, "description": "Use id_ mode to minimize Wayback rewriting" }
            },
            "required": ["url", "timestamp"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let args: PageArgs = parse_args(self.name(), params)?;
        if args.url.trim().is_empty() {
            bail!("url must not be empty");
        }
        if args.timestamp.trim().is_empty() {
            bail!("timestamp must not be empty");
        }

        let page = ctx
            .archived_page(&args.url, &args.timestamp, args.original.unwrap_or(false))
            .await?;
        Ok(serde_json::to_value(&page)?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    mediatype: Option<String>,
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    sort: Option<Vec<String>>,
    #[serde(default)]
    rows: Option<u32>,
    #[serde(default)]
    page: Option<u32>,
}

impl SearchArgs {
    fn into_query(self) -> SearchQuery {
        SearchQuery {
            query: self.query,
            mediatype: self.mediatype,
            collection: self.collection,
            fields: self.fields.unwrap_or_default(),
            sort: self.sort.unwrap_or_default(),
            rows: self.rows.unwrap_or(DEFAULT_ROWS),
            page: self.page.unwrap_or(DEFAULT_PAGE),
        }
    }
}

/// Searches archive.org items through Advanced Search.
pub struct SearchItemsTool;

#[async_trait]
impl Tool for SearchItemsTool {
    fn name(&self) -> &str {
        "search_items"
    }

    fn description(&self) -> &str {
        "Search Internet Archive items using Advanced Search (archive.org). \
         Supports basic query, optional mediatype/collection filters, fields, sort, rows, and page."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Lucene-like search string; empty matches everything" },
                "mediatype": { "type": "string", "description": "e.g. texts, movies, audio, software, image" },
                "collection": { "type": "string", "description": "e.g. web" },
                "fields": { "type": "array", "items": { "type": "string" }, "description": "Fields to return" },
                "sort": { "type": "array", "items": { "type": "string" }, "description": "e.g. [\"downloads desc\", \"publicdate desc\"]" },
                "rows": { "type": "integer", "minimum": 1, "default": DEFAULT_ROWS },
                "page": { "type": "integer", "minimum": 1, "default": DEFAULT_PAGE }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let args: SearchArgs = parse_args(self.name(), params)?;

        let result = ctx.search(&args.into_query()).await?;
        Ok(serde_json::to_value(&result)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter validation
// ═══════════════════════════════════════════════════════════════════════

/// Check `params` against a tool's parameter schema.
///
/// Enforces `required`, primitive `type`, `enum`, and integer `minimum`.
/// Returns the params as an object (non-objects become `{}` before the
/// required check).
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = params.as_object().cloned().unwrap_or_default();

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in &required {
        if !params_obj.contains_key(*field) {
            bail!("missing required parameter: {}", field);
        }
    }

    for (name, prop) in &properties {
        let Some(value) = params_obj.get(name) else {
            continue;
        };
        if value.is_null() && !required.contains(&name.as_str()) {
            continue;
        }

        if let Some(expected) = prop.get("type").and_then(|t| t.as_str()) {
            let ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !ok {
                bail!(
                    "parameter '{}' must be of type '{}', got {}",
                    name,
                    expected,
                    json_type_name(value)
                );
            }
        }

        if let Some(allowed) = prop.get("enum").and_then(|e| e.as_array()) {
            if !allowed.contains(value) {
                bail!(
                    "parameter '{}' must be one of {}, got {}",
                    name,
                    Value::Array(allowed.clone()),
                    value
                );
            }
        }

        if let (Some(min), Some(n)) = (prop.get("minimum").and_then(|m| m.as_i64()), value.as_i64())
        {
            if n < min {
                bail!("parameter '{}' must be >= {}, got {}", name, min, n);
            }
        }
    }

    Ok(Value::Object(params_obj))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered collection of tools.
///
/// ```rust
/// use wayback_mcp::traits::ToolRegistry;
///
/// let tools = ToolRegistry::with_builtins();
/// assert!(tools.find("get_snapshots").is_some());
/// ```
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with `get_snapshots`, `get_archived_page`, and `search_items`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SnapshotsTool));
        registry.register(Box::new(ArchivedPageTool));
        registry.register(Box::new(SearchItemsTool));
        registry
    }

    /// Register a tool. A tool with the same name as an existing one replaces it.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn into_tools(self) -> Vec<Box<dyn Tool>> {
        self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
