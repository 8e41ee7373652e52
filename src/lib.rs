//! # Wayback MCP
//!
//! Read-only Internet Archive tools for AI agents.
//!
//! Exposes the Wayback Machine CDX index, Wayback page replay, and the
//! archive.org Advanced Search API as MCP tools, plus one resource template
//! (`wayback://{url}/{timestamp}`). The interesting part is normalization:
//! CDX answers with positional rows under an optional header, replayed pages
//! come back with any status and any content type, and search responses are
//! passed through only when they have the expected container. Each tool turns
//! that into a stable, predictable result.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  MCP / HTTP  │──▶│    Tools     │──▶│  cdx / search │
//! │ stdio, /mcp  │   │  (registry)  │   │   / wayback   │
//! └──────────────┘   └──────────────┘   └──────┬────────┘
//!                                              ▼
//!                                       ┌──────────────┐
//!                                       │  http (GET)  │──▶ archive.org
//!                                       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wayback serve stdio                       # MCP over stdin/stdout
//! wayback serve http                        # JSON API + /mcp endpoint
//! wayback snapshots example.com --limit 5
//! wayback page example.com 20200101000000 --original
//! wayback search "grateful dead" --mediatype audio
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Propagated upstream failures |
//! | [`models`] | Result shapes returned to the host |
//! | [`http`] | Single-shot outbound GET with client signature and timeouts |
//! | [`cdx`] | CDX query parameters and row normalization |
//! | [`wayback`] | Replay URL formatting, page fetch, resource template |
//! | [`search`] | Advanced Search query builder |
//! | [`traits`] | `Tool` trait, `ToolContext`, `ToolRegistry`, built-in tools |
//! | [`mcp`] | MCP protocol bridge (stdio and Streamable HTTP) |
//! | [`server`] | Axum HTTP server |

pub mod cdx;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod models;
pub mod search;
pub mod server;
pub mod traits;
pub mod wayback;

pub use error::ArchiveError;
pub use traits::{Tool, ToolContext, ToolRegistry};
