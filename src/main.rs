//! Entity API - production-tracking entity endpoints.
//!
//! This binary starts the HTTP server or issues session tokens.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entity_api::{
    config::{Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat},
    server::{create_router, RouterConfig, SessionAuth},
    store::{EntityService, MemoryStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    if config.auth_enabled {
        info!("  Auth: enabled");
    } else {
        warn!("  Auth: DISABLED - callers are trusted from the X-Person-Id header");
        warn!("        Enable for production: --auth-enabled=true --auth-secret=<secret>");
    }
    info!("  Cache: {} full entities", config.cache_entities);

    let store = match &config.fixtures {
        Some(path) => match MemoryStore::load(path) {
            Ok(store) => {
                let stats = store.snapshot().await;
                info!(
                    "  Fixtures: {} ({} projects, {} entities, {} tasks)",
                    path.display(),
                    stats.projects.len(),
                    stats.entities.len(),
                    stats.tasks.len()
                );
                store
            }
            Err(e) => {
                error!("Failed to load fixtures: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("  Fixtures: none, starting with an empty store");
            MemoryStore::new()
        }
    };

    let service = EntityService::with_cache_capacity(store, config.cache_entities);
    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    if config.auth_enabled {
        info!("    curl -H \"Authorization: Bearer $(entity-api token --person-id <id>)\" \\");
        info!("         http://{}/data/entities", addr);
    } else {
        info!(
            "    curl -H \"X-Person-Id: <id>\" http://{}/data/entities",
            addr
        );
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "entity_api=debug,tower_http=debug"
    } else {
        "entity_api=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = if config.auth_enabled {
        RouterConfig::new(config.auth_secret_or_empty())
    } else {
        RouterConfig::without_auth()
    };

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let auth = SessionAuth::new(&config.secret);
    let (token, expiry) = auth.issue(&config.person_id, Duration::from_secs(config.ttl));

    match config.format {
        TokenOutputFormat::Token => println!("{}", token),
        TokenOutputFormat::Header => println!("Authorization: Bearer {}", token),
        TokenOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "person_id": config.person_id,
                "expiry": expiry,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
