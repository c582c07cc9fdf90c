//! Process configuration for the registry server.
//!
//! Every option can be given on the command line or through an
//! `MCP_REGISTRY_*` environment variable.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use mcp_registry::config::SqliteConfig;
use mcp_registry::{BackendKind, StorageSettings};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// HTTP-level limits.
pub struct ServerConfig;

impl ServerConfig {
    /// Largest page a client may request from `/v0/servers`.
    pub const MAX_PAGE_LIMIT: i64 = 100;
    /// Requests handled at once; the rest wait.
    pub const MAX_CONCURRENT_REQUESTS: usize = 256;
    /// Local dashboard origins allowed by CORS.
    pub const CORS_ORIGINS: [&'static str; 4] = [
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:3001",
        "http://127.0.0.1:3001",
    ];
}

#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-registry-server")]
#[command(about = "HTTP server for the MCP server registry")]
pub struct Args {
    /// Address to listen on; ":8080" binds every interface
    #[arg(long, env = "MCP_REGISTRY_SERVER_ADDRESS", default_value = ":8080")]
    pub server_address: String,

    /// Storage backend: "memory" or "sqlite"
    #[arg(long, env = "MCP_REGISTRY_DATABASE_TYPE", default_value = "sqlite")]
    pub database_type: String,

    /// SQLite database file (or ":memory:")
    #[arg(long, env = "MCP_REGISTRY_DATABASE_URL", default_value = SqliteConfig::DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Table holding registry entries
    #[arg(long, env = "MCP_REGISTRY_COLLECTION_NAME", default_value = SqliteConfig::DEFAULT_TABLE)]
    pub collection_name: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "MCP_REGISTRY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seed file imported at startup; empty to skip
    #[arg(long, env = "MCP_REGISTRY_SEED_FILE_PATH", default_value = "data/seed.json")]
    pub seed_file_path: String,

    /// Import the seed file at startup
    #[arg(long, env = "MCP_REGISTRY_SEED_IMPORT", default_value_t = true, action = ArgAction::Set)]
    pub seed_import: bool,

    /// Require authentication on publish
    #[arg(long, env = "MCP_REGISTRY_AUTH_ENABLED", default_value_t = false, action = ArgAction::Set)]
    pub auth_enabled: bool,

    /// Authentication method; "simple_token" checks against --auth-tokens
    #[arg(long, env = "MCP_REGISTRY_AUTH_METHOD")]
    pub auth_method: Option<String>,

    /// Accepted tokens, comma separated
    #[arg(long, env = "MCP_REGISTRY_AUTH_TOKENS", value_delimiter = ',')]
    pub auth_tokens: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    pub fn storage_settings(&self) -> Result<StorageSettings> {
        let kind = BackendKind::from_str(&self.database_type)
            .ok_or_else(|| anyhow!("Unsupported database type: {}", self.database_type))?;
        Ok(StorageSettings {
            kind,
            database_url: self.database_url.clone(),
            collection_name: self.collection_name.clone(),
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        parse_server_address(&self.server_address)
    }

    /// Seed file to import, if importing is enabled.
    pub fn seed_path(&self) -> Option<PathBuf> {
        let path = self.seed_file_path.trim();
        if self.seed_import && !path.is_empty() {
            Some(PathBuf::from(path))
        } else {
            None
        }
    }

    /// Log filter directive, `--debug` overriding the configured level.
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}

/// Parse `host:port`, `:port` or `[v6]:port`.
///
/// An empty host binds every IPv4 interface and `localhost` means loopback.
pub fn parse_server_address(address: &str) -> Result<SocketAddr> {
    let address = address.trim();
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("Invalid server address {:?}: missing port", address))?;
    let port: u16 = port
        .parse()
        .map_err(|e| anyhow!("Invalid port in server address {:?}: {}", address, e))?;

    let ip = match host {
        "" => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other
            .parse()
            .map_err(|e| anyhow!("Invalid host in server address {:?}: {}", address, e))?,
    };
    Ok(SocketAddr::new(ip, port))
}
