//! Error type for `facetry-query`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A template placeholder had no value. This is a defect in the composer,
  /// never a consequence of user input.
  #[error("unresolved placeholder {placeholder:?} in template {template}")]
  UnresolvedPlaceholder {
    template:    &'static str,
    placeholder: String,
  },

  #[error("unterminated placeholder in template {0}")]
  UnterminatedPlaceholder(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
