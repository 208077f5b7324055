//! facetry server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), connects to
//! the configured SPARQL endpoint, and serves the facet API over HTTP.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use facetry_engine::FacetHandler;
use facetry_server::ServerConfig;
use facetry_sparql::HttpEndpoint;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Facetry faceted search server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration. Nested keys come from the environment as
  // `FACETRY_SEARCH__ENDPOINT_URL`.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("FACETRY")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let search = &server_cfg.search;
  let endpoint = HttpEndpoint::new(&search.endpoint_url, Duration::from_secs(search.timeout_secs))
    .context("failed to build SPARQL client")?;
  tracing::info!(endpoint = endpoint.url(), "using SPARQL endpoint");

  let handler = FacetHandler::new(
    server_cfg.facets.clone(),
    search.handler_options(),
    endpoint,
  )
  .context("invalid facet configuration")?
  .with_on_update(|selections| {
    tracing::debug!(selections = selections.len(), "facet update requested");
  });
  let handler = Arc::new(handler);

  // Prime the candidate lists; a failure here is not fatal.
  if let Err(e) = handler.update(None).await {
    tracing::warn!("initial facet update failed: {e}");
  }

  let app = facetry_server::router(handler);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
