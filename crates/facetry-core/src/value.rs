//! Candidate values and per-facet state.

use serde::{Deserialize, Serialize};

use crate::selection::FacetSelection;

/// Display text of the "no selection" candidate.
pub const NO_SELECTION_TEXT: &str = "-- No Selection --";

// ─── FacetValue ──────────────────────────────────────────────────────────────

/// One candidate option for a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
  /// Query-ready term (`<iri>`, `"literal"`, numeral, typed date), or `None`
  /// for the no-selection baseline entry.
  pub value: Option<String>,
  pub text:  String,
  /// Number of matching subjects.
  #[serde(default)]
  pub count: u64,
}

impl FacetValue {
  pub fn new(value: impl Into<String>, text: impl Into<String>, count: u64) -> Self {
    Self {
      value: Some(value.into()),
      text: text.into(),
      count,
    }
  }

  /// The baseline entry shown for "no selection".
  pub fn no_selection(count: u64) -> Self {
    Self {
      value: None,
      text: NO_SELECTION_TEXT.to_owned(),
      count,
    }
  }

  pub fn is_no_selection(&self) -> bool { self.value.is_none() }
}

// ─── Terms ───────────────────────────────────────────────────────────────────

/// Whether `term` is one of the forms a result row maps back to: a
/// bracketed IRI, a blank node label, an integer, or a quoted literal with an
/// optional datatype or language tag. Only such terms are spliced into
/// queries.
pub fn is_term(term: &str) -> bool {
  if let Some(label) = term.strip_prefix("_:") {
    return !label.is_empty()
      && label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
  }
  match term.as_bytes().first() {
    Some(b'<') => is_iri(term),
    Some(b'"') => is_literal(term),
    Some(_) => is_integer(term),
    None => false,
  }
}

fn is_iri(term: &str) -> bool {
  let Some(inner) = term.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
    return false;
  };
  !inner.is_empty()
    && !inner.chars().any(|c| {
      c.is_whitespace()
        || c.is_control()
        || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
    })
}

fn is_integer(term: &str) -> bool {
  let digits = term.strip_prefix(['+', '-']).unwrap_or(term);
  !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_literal(term: &str) -> bool {
  let mut chars = term.char_indices().skip(1);
  let close = loop {
    match chars.next() {
      Some((_, '\\')) => match chars.next() {
        Some((_, '"' | '\\' | 'n' | 'r' | 't')) => {}
        _ => return false,
      },
      Some((at, '"')) => break at,
      Some((_, '\n' | '\r')) | None => return false,
      Some(_) => {}
    }
  };

  let suffix = &term[close + 1..];
  if suffix.is_empty() {
    true
  } else if let Some(datatype) = suffix.strip_prefix("^^") {
    is_iri(datatype)
  } else if let Some(lang) = suffix.strip_prefix('@') {
    !lang.is_empty() && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
  } else {
    false
  }
}

// ─── FacetState ──────────────────────────────────────────────────────────────

/// The full candidate list for one facet after a query round.
/// The no-selection entry, when present, is always first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetState {
  pub id:     String,
  pub values: Vec<FacetValue>,
}

impl FacetState {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id:     id.into(),
      values: Vec::new(),
    }
  }

  /// The no-selection entry, if the list has one.
  pub fn no_selection(&self) -> Option<&FacetValue> {
    self.values.iter().find(|v| v.is_no_selection())
  }

  /// Count of the entry whose value equals `value` (`None` matches the
  /// no-selection entry).
  pub fn count_of(&self, value: Option<&str>) -> Option<u64> {
    self
      .values
      .iter()
      .find(|v| v.value.as_deref() == value)
      .map(|v| v.count)
  }
}

// ─── Text filter ─────────────────────────────────────────────────────────────

/// Narrow a candidate list by a case-insensitive label search.
///
/// Values that are currently selected, and the no-selection entry, are
/// always kept so the visible selection never disappears from the list.
pub fn filter_values<'a>(
  values: &'a [FacetValue],
  text: &str,
  selection: Option<&FacetSelection>,
) -> Vec<&'a FacetValue> {
  if text.is_empty() {
    return values.iter().collect();
  }
  let needle = text.to_lowercase();
  let selected: Vec<&str> = selection.map(FacetSelection::chosen).unwrap_or_default();

  values
    .iter()
    .filter(|v| {
      v.text.to_lowercase().contains(&needle)
        || match v.value.as_deref() {
          None => true,
          Some(value) => selected.contains(&value),
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn values() -> Vec<FacetValue> {
    vec![
      FacetValue::no_selection(10),
      FacetValue::new("<a>", "Apple", 4),
      FacetValue::new("<b>", "Banana", 3),
      FacetValue::new("<c>", "Cherry", 3),
    ]
  }

  #[test]
  fn count_of_finds_no_selection_entry() {
    let state = FacetState {
      id:     "<f>".into(),
      values: values(),
    };
    assert_eq!(state.count_of(None), Some(10));
    assert_eq!(state.count_of(Some("<b>")), Some(3));
    assert_eq!(state.count_of(Some("<z>")), None);
  }

  #[test]
  fn filter_keeps_matches_selection_and_baseline() {
    let values = values();
    let selection = FacetSelection::One(FacetValue::new("<c>", "Cherry", 3));
    let kept: Vec<_> = filter_values(&values, "APP", Some(&selection))
      .into_iter()
      .map(|v| v.text.as_str())
      .collect();
    assert_eq!(kept, vec![NO_SELECTION_TEXT, "Apple", "Cherry"]);
  }

  #[test]
  fn mapped_term_forms_are_accepted() {
    for term in [
      "<http://example.org/rock>",
      "_:b0",
      "1984",
      "-3",
      "\"\"",
      r#""Blue \"Moon\"""#,
      "\"1984-06-08\"^^<http://www.w3.org/2001/XMLSchema#date>",
      "\"kissa\"@fi",
    ] {
      assert!(is_term(term), "{term}");
    }
  }

  #[test]
  fn query_text_is_not_a_term() {
    for term in [
      "",
      "<x> . } SERVICE <http://attacker.example/sparql> { ?a ?b ?c } {",
      "<a b>",
      "<a{b>",
      "<>",
      "?s",
      "rock",
      "12 .",
      "\"x\" . ?s ?p ?o",
      "\"unterminated",
      "\"x\"^^xsd:date",
      "\"x\"@fi }",
      "_:b0 }",
    ] {
      assert!(!is_term(term), "{term}");
    }
  }

  #[test]
  fn empty_filter_keeps_everything() {
    let values = values();
    assert_eq!(filter_values(&values, "", None).len(), 4);
  }
}
