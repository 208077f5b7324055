//! SPARQL 1.1 protocol transport for Facetry.
//!
//! [`HttpEndpoint`] posts each query as an `application/x-www-form-urlencoded`
//! `query=` body and decodes the `application/sparql-results+json` answer
//! into [`Row`]s.

pub mod error;

use std::{future::Future, time::Duration};

use facetry_core::endpoint::{Endpoint, Row};
use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;
use tracing::debug;

pub use error::{Error, Result};

pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

// ─── Results document ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ResultsDocument {
  results: ResultSet,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
  #[serde(default)]
  bindings: Vec<Row>,
}

/// Decode a SPARQL JSON results document into its rows.
pub fn decode(body: &[u8]) -> Result<Vec<Row>> {
  let doc: ResultsDocument = serde_json::from_slice(body)?;
  Ok(doc.results.bindings)
}

// ─── Endpoint ────────────────────────────────────────────────────────────────

/// A remote SPARQL endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
  client: Client,
  url:    String,
}

impl HttpEndpoint {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      url: url.into(),
    })
  }

  pub fn url(&self) -> &str { &self.url }
}

impl Endpoint for HttpEndpoint {
  type Error = Error;

  fn execute<'a>(&'a self, query: &'a str) -> impl Future<Output = Result<Vec<Row>>> + Send + 'a {
    async move {
      let resp = self
        .client
        .post(&self.url)
        .header(ACCEPT, SPARQL_RESULTS_JSON)
        .form(&[("query", query)])
        .send()
        .await?;

      let status = resp.status();
      if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
          status: status.as_u16(),
          body,
        });
      }

      let rows = decode(&resp.bytes().await?)?;
      debug!(url = %self.url, rows = rows.len(), "endpoint answered");
      Ok(rows)
    }
  }
}
