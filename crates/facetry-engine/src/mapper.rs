//! Result mapper: SPARQL rows → per-facet candidate lists.

use facetry_core::{
  endpoint::{Binding, Row, TermKind},
  value::{FacetState, FacetValue},
};
use facetry_query::template::literal;
use indexmap::IndexMap;

use crate::{Error, Result};

pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

/// Turn a bound term back into query-ready text.
///
/// An absent binding is the no-selection marker and maps to `None`, never to
/// an empty string.
pub fn parse_value(binding: Option<&Binding>) -> Option<String> {
  let binding = binding?;
  let term = match binding.kind {
    TermKind::Uri => format!("<{}>", binding.value),
    TermKind::Bnode => format!("_:{}", binding.value),
    TermKind::Literal | TermKind::TypedLiteral => match binding.datatype.as_deref() {
      Some(XSD_INTEGER) => binding.value.clone(),
      Some(XSD_DATE) => format!("{}^^<{XSD_DATE}>", literal(&binding.value)),
      _ => literal(&binding.value),
    },
  };
  Some(term)
}

fn map_row(row: &Row) -> Result<FacetState> {
  let id = parse_value(row.get("id"))
    .ok_or_else(|| Error::MalformedRow("row without ?id".into()))?;
  let count = match row.get("cnt") {
    Some(cnt) => cnt
      .value
      .parse()
      .map_err(|_| Error::MalformedRow(format!("count {:?} for {id}", cnt.value)))?,
    None => 0,
  };
  let text = row
    .get("facet_text")
    .map(|b| b.value.clone())
    .unwrap_or_default();

  Ok(FacetState {
    values: vec![FacetValue {
      value: parse_value(row.get("value")),
      text,
      count,
    }],
    id,
  })
}

/// Fold `row` into `into`; both must share a facet id.
pub fn merge_row(into: &mut FacetState, row: FacetState) {
  debug_assert_eq!(into.id, row.id);
  into.values.extend(row.values);
}

/// Group rows by facet id, keeping endpoint order within and across facets.
///
/// Any malformed row fails the whole mapping.
pub fn map_rows(rows: &[Row]) -> Result<Vec<FacetState>> {
  let mut states: IndexMap<String, FacetState> = IndexMap::new();
  for row in rows {
    let state = map_row(row)?;
    match states.get_mut(&state.id) {
      Some(existing) => merge_row(existing, state),
      None => {
        states.insert(state.id.clone(), state);
      }
    }
  }
  Ok(states.into_values().collect())
}

/// Move each list's no-selection entry to the front.
pub fn reconcile(mut states: Vec<FacetState>) -> Vec<FacetState> {
  for state in &mut states {
    if let Some(pos) = state.values.iter().position(FacetValue::is_no_selection)
      && pos > 0
    {
      let entry = state.values.remove(pos);
      state.values.insert(0, entry);
    }
  }
  states
}
