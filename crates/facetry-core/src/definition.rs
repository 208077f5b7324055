//! Facet definitions: the immutable description of one filterable dimension.
//!
//! A definition is supplied once at setup. Its `id` is the bracketed IRI of
//! the property that links a subject to the facet's values, and is used
//! verbatim in composed query text.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{Error, Result};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The shape of a facet. Every dispatch point matches on this exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetKind {
  /// Exact-match set over the objects of the facet property.
  Basic,
  /// Free-text token match over the objects of the facet property.
  Text,
  /// Date range over a start and an end date property.
  Timespan {
    /// Property holding the start date.
    start:       String,
    /// Property holding the end date. May equal `start`.
    end:         String,
    /// Whether the dates live on a separate resource reached through the
    /// facet property (`true`) or on the subject itself (`false`).
    #[serde(default)]
    is_resource: bool,
  },
  /// Two-level class hierarchy linked through `property`.
  Hierarchy {
    /// Parent link, e.g. `<http://www.w3.org/2004/02/skos/core#broader>`.
    property: String,
    /// Root classes shown when nothing is selected.
    classes:  Vec<String>,
  },
}

impl FacetKind {
  /// Text and timespan facets are "free": their candidate set is not a
  /// finite enumeration, and enabling one does not change any count.
  pub fn is_free(&self) -> bool { matches!(self, Self::Text | Self::Timespan { .. }) }

  pub fn is_basic(&self) -> bool { matches!(self, Self::Basic) }
}

// ─── Definition ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDefinition {
  /// Bracketed IRI of the facet property, e.g. `<http://schema.org/genre>`.
  pub id:      String,
  /// Display name; never used in query text.
  #[serde(default)]
  pub name:    String,
  #[serde(flatten)]
  pub kind:    FacetKind,
  /// Federated endpoint used to resolve labels of this facet's values.
  #[serde(default)]
  pub service: Option<String>,
  /// Initial visibility when no initial values are supplied.
  #[serde(default)]
  pub enabled: bool,
}

impl FacetDefinition {
  pub fn basic(id: impl Into<String>) -> Self {
    Self::with_kind(id, FacetKind::Basic)
  }

  pub fn with_kind(id: impl Into<String>, kind: FacetKind) -> Self {
    Self {
      id: id.into(),
      name: String::new(),
      kind,
      service: None,
      enabled: true,
    }
  }
}

/// Facet definitions keyed by id, in definition order.
///
/// Order is significant: the default count facet is the first basic facet.
pub type FacetMap = IndexMap<String, FacetDefinition>;

/// Index a list of definitions by id, rejecting duplicates.
pub fn index_definitions(
  definitions: impl IntoIterator<Item = FacetDefinition>,
) -> Result<FacetMap> {
  let mut map = FacetMap::new();
  for definition in definitions {
    if map.contains_key(&definition.id) {
      return Err(Error::DuplicateFacet(definition.id));
    }
    map.insert(definition.id.clone(), definition);
  }
  Ok(map)
}

/// The facet whose baseline count stands in for "the current result count":
/// the first basic facet, else the first facet of any kind.
pub fn default_count_key(facets: &FacetMap) -> Option<String> {
  facets
    .values()
    .find(|f| f.kind.is_basic())
    .or_else(|| facets.values().next())
    .map(|f| f.id.clone())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn timespan(id: &str) -> FacetDefinition {
    FacetDefinition::with_kind(id, FacetKind::Timespan {
      start:       "<s>".into(),
      end:         "<e>".into(),
      is_resource: false,
    })
  }

  #[test]
  fn default_count_key_prefers_first_basic_facet() {
    let facets = index_definitions([
      timespan("<period>"),
      FacetDefinition::with_kind("<title>", FacetKind::Text),
      FacetDefinition::basic("<category>"),
      FacetDefinition::basic("<author>"),
    ])
    .unwrap();
    assert_eq!(default_count_key(&facets).as_deref(), Some("<category>"));
  }

  #[test]
  fn default_count_key_falls_back_to_first_facet() {
    let facets = index_definitions([
      timespan("<period>"),
      FacetDefinition::with_kind("<title>", FacetKind::Text),
    ])
    .unwrap();
    assert_eq!(default_count_key(&facets).as_deref(), Some("<period>"));
    assert_eq!(default_count_key(&FacetMap::new()), None);
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let err = index_definitions([
      FacetDefinition::basic("<a>"),
      FacetDefinition::basic("<a>"),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateFacet(id) if id == "<a>"));
  }

  #[test]
  fn kind_deserializes_from_flat_table() {
    let json = serde_json::json!({
      "id": "<http://example.org/period>",
      "name": "Period",
      "type": "timespan",
      "start": "<http://example.org/start>",
      "end": "<http://example.org/start>",
      "is_resource": true,
    });
    let def: FacetDefinition = serde_json::from_value(json).unwrap();
    assert_eq!(def.name, "Period");
    assert!(def.kind.is_free());
    assert!(!def.enabled);
    assert_eq!(def.kind.as_ref(), "timespan");
    match def.kind {
      FacetKind::Timespan { start, end, is_resource } => {
        assert_eq!(start, end);
        assert!(is_resource);
      }
      other => panic!("unexpected kind {other:?}"),
    }
  }
}
