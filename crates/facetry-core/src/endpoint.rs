//! The `Endpoint` trait and the row types it returns.
//!
//! The trait is implemented by transports (e.g. `facetry-sparql`). The
//! engine depends on this abstraction, not on any concrete transport.

use std::{collections::HashMap, future::Future};

use serde::{Deserialize, Serialize};

// ─── Bindings ────────────────────────────────────────────────────────────────

/// The RDF term type of a bound variable, as reported by the SPARQL 1.1
/// JSON results format. `typed-literal` is emitted by older endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TermKind {
  Uri,
  Literal,
  TypedLiteral,
  Bnode,
}

/// One bound variable in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
  #[serde(rename = "type")]
  pub kind:     TermKind,
  pub value:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub datatype: Option<String>,
  #[serde(default, rename = "xml:lang", skip_serializing_if = "Option::is_none")]
  pub lang:     Option<String>,
}

impl Binding {
  pub fn uri(value: impl Into<String>) -> Self {
    Self {
      kind:     TermKind::Uri,
      value:    value.into(),
      datatype: None,
      lang:     None,
    }
  }

  pub fn literal(value: impl Into<String>) -> Self {
    Self {
      kind:     TermKind::Literal,
      value:    value.into(),
      datatype: None,
      lang:     None,
    }
  }

  pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
    Self {
      kind:     TermKind::Literal,
      value:    value.into(),
      datatype: Some(datatype.into()),
      lang:     None,
    }
  }
}

/// A result row: projected variable name → binding. Unbound variables are
/// simply absent.
pub type Row = HashMap<String, Binding>;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a query endpoint.
///
/// Executing a query has no side effects on the engine. A failed call is not
/// retried; the error is surfaced to the caller unchanged.
///
/// The returned future is `Send` so the trait can be used from multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Endpoint: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Execute `query` and return its result rows in endpoint order.
  fn execute<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn binding_decodes_sparql_json_term() {
    let json = serde_json::json!({
      "type": "typed-literal",
      "value": "42",
      "datatype": "http://www.w3.org/2001/XMLSchema#integer",
    });
    let binding: Binding = serde_json::from_value(json).unwrap();
    assert_eq!(binding.kind, TermKind::TypedLiteral);
    assert_eq!(binding.lang, None);

    let json = serde_json::json!({ "type": "literal", "value": "kissa", "xml:lang": "fi" });
    let binding: Binding = serde_json::from_value(json).unwrap();
    assert_eq!(binding.lang.as_deref(), Some("fi"));
  }
}
