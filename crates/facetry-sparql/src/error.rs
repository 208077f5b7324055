//! Error type for `facetry-sparql`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("endpoint answered {status}: {body}")]
  Status { status: u16, body: String },

  #[error("invalid results document: {0}")]
  Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
