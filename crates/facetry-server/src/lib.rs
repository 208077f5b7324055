//! JSON API over a [`FacetHandler`].
//!
//! Exposes an axum [`Router`] driving one shared handler. Facet ids are
//! bracketed IRIs, so they travel in JSON bodies or query strings rather
//! than path segments.

pub mod error;
pub mod facets;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use facetry_core::{definition::FacetDefinition, endpoint::Endpoint, selection::Seed};
use facetry_engine::{FacetHandler, HandlerOptions};
use facetry_query::QueryOptions;
use indexmap::IndexMap;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:   String,
  pub port:   u16,
  pub search: SearchConfig,
  #[serde(default)]
  pub facets: Vec<FacetDefinition>,
}

/// The `[search]` table: where to query and how to scope every query.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
  pub endpoint_url:   String,
  /// Bracketed IRI of the class every result must have.
  #[serde(default)]
  pub rdf_class:      Option<String>,
  /// Extra pattern over `?s`, inserted verbatim.
  #[serde(default)]
  pub constraint:     Option<String>,
  #[serde(default)]
  pub graph:          Option<String>,
  #[serde(default = "default_lang")]
  pub preferred_lang: String,
  #[serde(default)]
  pub initial_values: IndexMap<String, Seed>,
  #[serde(default = "default_timeout")]
  pub timeout_secs:   u64,
}

fn default_lang() -> String { "en".to_owned() }

fn default_timeout() -> u64 { 30 }

impl SearchConfig {
  pub fn handler_options(&self) -> HandlerOptions {
    HandlerOptions {
      query:          QueryOptions {
        rdf_class:      self.rdf_class.clone(),
        constraint:     self.constraint.clone(),
        graph:          self.graph.clone(),
        preferred_lang: self.preferred_lang.clone(),
      },
      initial_values: self.initial_values.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `handler`.
pub fn router<E>(handler: Arc<FacetHandler<E>>) -> Router
where
  E: Endpoint + 'static,
{
  Router::new()
    .route("/facets", get(facets::list::<E>))
    .route("/facets/disabled", get(facets::disabled::<E>))
    .route("/facets/values", get(facets::values::<E>))
    .route("/facets/update", post(facets::update::<E>))
    .route("/facets/change", post(facets::change::<E>))
    .route("/facets/enable", post(facets::enable::<E>))
    .route("/facets/disable", post(facets::disable::<E>))
    .layer(TraceLayer::new_for_http())
    .with_state(handler)
}
