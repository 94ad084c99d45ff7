//! Configuration management for the entity API.
//!
//! This module provides the command-line interface:
//! - `serve` runs the HTTP server
//! - `token` issues a session token for a person
//!
//! Every `serve` option can also be set through an environment variable with
//! the `ENTITY_` prefix, and has a default where one makes sense.
//!
//! # Example
//!
//! ```ignore
//! use entity_api::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Token(config) => println!("Token for {}", config.person_id),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `ENTITY_HOST` - Server bind address (default: 0.0.0.0)
//! - `ENTITY_PORT` - Server port (default: 3000)
//! - `ENTITY_AUTH_SECRET` - HMAC secret for session tokens
//! - `ENTITY_AUTH_ENABLED` - Require session tokens (default: true)
//! - `ENTITY_CACHE_ENTITIES` - Max full-entity views to cache (default: 1000)
//! - `ENTITY_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `ENTITY_FIXTURES` - JSON fixture file to seed the store from
//! - `ENTITY_VERBOSE` - Debug-level logging (default: false)
//! - `ENTITY_NO_TRACING` - Disable request tracing (default: false)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::store::DEFAULT_ENTITY_CACHE_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default session token lifetime in seconds (12 hours).
pub const DEFAULT_TOKEN_TTL: u64 = 12 * 60 * 60;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Entity API - production-tracking entity endpoints.
#[derive(Parser, Debug, Clone)]
#[command(name = "entity-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Issue a session token for a person
    Token(TokenConfig),
}

/// Options of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "ENTITY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ENTITY_PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 session tokens.
    ///
    /// If not provided and auth is enabled, the server will fail to start.
    #[arg(long, env = "ENTITY_AUTH_SECRET")]
    pub auth_secret: Option<String>,

    /// Require bearer session tokens on /data routes.
    ///
    /// When disabled, callers are identified by the X-Person-Id header.
    /// WARNING: Only disable authentication in development/testing.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "ENTITY_AUTH_ENABLED")]
    pub auth_enabled: bool,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// JSON fixture file to seed the in-memory store from.
    ///
    /// If not specified, the store starts empty.
    #[arg(long, env = "ENTITY_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Maximum number of full-entity views to cache.
    #[arg(long, default_value_t = DEFAULT_ENTITY_CACHE_CAPACITY, env = "ENTITY_CACHE_ENTITIES")]
    pub cache_entities: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "ENTITY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false, env = "ENTITY_VERBOSE")]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false, env = "ENTITY_NO_TRACING")]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_enabled && self.auth_secret_or_empty().is_empty() {
            return Err(
                "Authentication is enabled but no secret provided. \
                 Set --auth-secret or ENTITY_AUTH_SECRET, or disable auth with --auth-enabled=false"
                    .to_string(),
            );
        }

        if self.cache_entities == 0 {
            return Err("cache_entities must be greater than 0".to_string());
        }

        if let Some(path) = &self.fixtures {
            if !path.is_file() {
                return Err(format!("Fixture file not found: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn auth_secret_or_empty(&self) -> &str {
        self.auth_secret.as_deref().unwrap_or("")
    }
}

/// Output format of the `token` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOutputFormat {
    /// The bare token
    #[default]
    Token,
    /// Token, person and expiry as JSON
    Json,
    /// A ready-to-use `Authorization` header
    Header,
}

/// Options of the `token` command.
#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Id of the person the token identifies.
    #[arg(long)]
    pub person_id: String,

    /// Secret key the server verifies tokens with.
    #[arg(long, env = "ENTITY_AUTH_SECRET")]
    pub secret: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.person_id.is_empty() {
            return Err("person_id must not be empty".to_string());
        }
        if self.secret.is_empty() {
            return Err("secret must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
