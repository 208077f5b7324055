//! Error type for `facetry-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] facetry_core::Error),

  #[error("query error: {0}")]
  Query(#[from] facetry_query::Error),

  /// The endpoint call failed. Not retried.
  #[error("endpoint error: {0}")]
  Endpoint(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("malformed result row: {0}")]
  MalformedRow(String),

  #[error("unknown facet: {0}")]
  UnknownFacet(String),

  #[error("a {kind} facet cannot hold a {selection} selection ({id})")]
  SelectionMismatch {
    id:        String,
    kind:      String,
    selection: String,
  },

  /// A selected value is not a term and would alter the query text.
  #[error("facet {id} cannot select {value:?}: not an RDF term")]
  InvalidTerm { id: String, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
