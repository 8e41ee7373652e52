//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] and the archived-page resource to the MCP
//! server protocol, over stdio ([`serve_stdio`]) or mounted as a Streamable
//! HTTP endpoint by [`crate::server`].
//!
//! * **Tools** are exposed via `list_tools` / `call_tool`.
//! * **`wayback://{url}/{timestamp}`** is exposed as a resource template via
//!   `list_resource_templates` / `read_resource`.

use std::borrow::Cow;
use std::sync::Arc;

use base64::Engine;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::ArchiveError;
use crate::models::ResourceContent;
use crate::traits::{validate_params, ToolContext, ToolRegistry};
use crate::wayback::RESOURCE_TEMPLATE;

/// Bridges the tool registry to the MCP protocol.
///
/// Each MCP session receives a clone of this struct; everything is behind
/// `Arc`, so sessions share one read-only tool set.
#[derive(Clone)]
pub struct McpBridge {
    config: Arc<Config>,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(config: Arc<Config>, tools: Arc<ToolRegistry>) -> Self {
        Self { config, tools }
    }

    /// Convert a tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

/// Build an rmcp model value from its MCP wire (JSON) shape.
fn from_wire<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, McpError> {
    serde_json::from_value(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

/// Text contents when the body decoded, base64 blob contents otherwise.
fn resource_wire(content: &ResourceContent) -> serde_json::Value {
    match &content.text {
        Some(text) => serde_json::json!({
            "uri": content.uri,
            "mimeType": content.mime_type,
            "text": text,
        }),
        None => serde_json::json!({
            "uri": content.uri,
            "mimeType": content.mime_type,
            "blob": base64::engine::general_purpose::STANDARD.encode(&content.body),
        }),
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "wayback-machine".to_string(),
                title: Some("Wayback Machine".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only access to the Internet Archive. Use get_snapshots to list \
                 Wayback captures of a URL, get_archived_page to fetch one capture, and \
                 search_items to search archive.org items. Captures are also readable as \
                 resources at wayback://{url}/{timestamp}."
                    .to_string(),
            ),
        }
    }

    // ── Tools ────────────────────────────────────────────────────────────

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let params = match validate_params(&tool.parameters_schema(), &params) {
            Ok(p) => p,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        };

        let ctx = ToolContext::new(self.config.clone());
        match tool.execute(params, &ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(format!("{:#}", e))]))
            }
        }
    }

    // ── Resources ────────────────────────────────────────────────────────

    fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourceTemplatesResult, McpError>> + Send + '_
    {
        let template = from_wire::<ResourceTemplate>(serde_json::json!({
            "uriTemplate": RESOURCE_TEMPLATE,
            "name": "Archived page",
            "description": "Content of an archived capture from the Wayback Machine",
            "mimeType": "text/html",
        }));
        std::future::ready(
            template.map(|t| ListResourceTemplatesResult::with_all_items(vec![t])),
        )
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let ctx = ToolContext::new(self.config.clone());
        let contents = ctx.resource(&request.uri).await.map_err(|e| {
            match e.downcast_ref::<ArchiveError>() {
                Some(ArchiveError::InvalidArgument(msg)) => {
                    McpError::invalid_params(msg.clone(), None)
                }
                _ => McpError::internal_error(format!("{}: {:#}", request.uri, e), None),
            }
        })?;

        let contents: Vec<serde_json::Value> = contents.iter().map(resource_wire).collect();
        from_wire(serde_json::json!({ "contents": contents }))
    }
}

/// Serve the MCP protocol over stdin/stdout until the client disconnects.
pub async fn serve_stdio(config: &Config, tools: ToolRegistry) -> anyhow::Result<()> {
    let bridge = McpBridge::new(Arc::new(config.clone()), Arc::new(tools));

    tracing::info!("serving MCP over stdio");
    let running = bridge.serve(rmcp::transport::stdio()).await?;
    let reason = running.waiting().await?;
    tracing::info!(?reason, "MCP session ended");

    Ok(())
}
