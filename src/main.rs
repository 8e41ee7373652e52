//! # Wayback CLI (`wayback`)
//!
//! Runs the MCP server (stdio or HTTP) and offers the same three archive
//! operations as one-shot commands.
//!
//! ## Usage
//!
//! ```bash
//! wayback --config ./config/wayback.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wayback serve stdio` | Serve MCP over stdin/stdout |
//! | `wayback serve http` | Serve the JSON API and the `/mcp` endpoint |
//! | `wayback snapshots <url>` | List Wayback captures of a URL |
//! | `wayback page <url> <timestamp>` | Fetch one archived capture |
//! | `wayback search [query]` | Search archive.org items |
//! | `wayback tools` | List registered tools and their schemas |
//!
//! Logs go to stderr; `-v` raises verbosity and `RUST_LOG` overrides it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wayback_mcp::cdx::{self, CdxQuery, MatchType};
use wayback_mcp::config;
use wayback_mcp::mcp;
use wayback_mcp::search::{self, SearchQuery};
use wayback_mcp::server;
use wayback_mcp::traits::{ToolInfo, ToolRegistry};
use wayback_mcp::wayback;

/// Read-only Internet Archive tools for AI agents.
#[derive(Parser)]
#[command(
    name = "wayback",
    about = "Wayback Machine and archive.org search tools, served over MCP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/wayback.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server.
    Serve {
        #[command(subcommand)]
        transport: ServeTransport,
    },

    /// List Wayback Machine captures of a URL.
    Snapshots {
        url: String,

        /// Earliest capture date (YYYYMMDD).
        #[arg(long)]
        from: Option<String>,

        /// Latest capture date (YYYYMMDD).
        #[arg(long)]
        to: Option<String>,

        /// Maximum number of captures.
        #[arg(long, default_value_t = cdx::DEFAULT_LIMIT)]
        limit: u32,

        /// One of: exact, prefix, host, domain.
        #[arg(long, default_value = "exact")]
        match_type: MatchType,

        /// Print the raw JSON result.
        #[arg(long)]
        json: bool,
    },

    /// Fetch one archived capture.
    Page {
        url: String,

        /// Capture timestamp (YYYYMMDDHHMMSS, prefixes allowed).
        timestamp: String,

        /// Use id_ mode (no Wayback banner or link rewriting).
        #[arg(long)]
        original: bool,

        #[arg(long)]
        json: bool,
    },

    /// Search archive.org items with Advanced Search.
    Search {
        /// Lucene-like query; empty matches everything.
        #[arg(default_value = "")]
        query: String,

        #[arg(long)]
        mediatype: Option<String>,

        #[arg(long)]
        collection: Option<String>,

        /// Field to return (repeatable).
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Sort entry such as "downloads desc" (repeatable).
        #[arg(long = "sort")]
        sort: Vec<String>,

        #[arg(long, default_value_t = search::DEFAULT_ROWS)]
        rows: u32,

        #[arg(long, default_value_t = search::DEFAULT_PAGE)]
        page: u32,

        #[arg(long)]
        json: bool,
    },

    /// List registered tools with their parameter schemas.
    Tools,
}

#[derive(Subcommand)]
enum ServeTransport {
    /// MCP over stdin/stdout (what desktop MCP hosts launch).
    Stdio,
    /// JSON API and MCP Streamable HTTP, bound to `[server].bind`.
    Http,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve { transport } => match transport {
            ServeTransport::Stdio => {
                mcp::serve_stdio(&cfg, ToolRegistry::with_builtins()).await?;
            }
            ServeTransport::Http => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Snapshots {
            url,
            from,
            to,
            limit,
            match_type,
            json,
        } => {
            let query = CdxQuery {
                url,
                from_date: from,
                to_date: to,
                limit,
                match_type,
            };
            cdx::run_snapshots(&cfg, &query, json).await?;
        }
        Commands::Page {
            url,
            timestamp,
            original,
            json,
        } => {
            wayback::run_page(&cfg, &url, &timestamp, original, json).await?;
        }
        Commands::Search {
            query,
            mediatype,
            collection,
            fields,
            sort,
            rows,
            page,
            json,
        } => {
            let query = SearchQuery {
                query,
                mediatype,
                collection,
                fields,
                sort,
                rows,
                page,
            };
            search::run_search(&cfg, &query, json).await?;
        }
        Commands::Tools => {
            let registry = ToolRegistry::with_builtins();
            let infos: Vec<ToolInfo> = registry
                .tools()
                .iter()
                .map(|t| ToolInfo::of(t.as_ref()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
    }

    Ok(())
}
