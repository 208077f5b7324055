//! Error types for `facetry-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("facet {0} is defined more than once")]
  DuplicateFacet(String),

  #[error("unknown facet: {0}")]
  UnknownFacet(String),

  #[error("invalid initial value for facet {id}: {reason}")]
  InvalidSeed { id: String, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
