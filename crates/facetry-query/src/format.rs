//! Selection formatter: selection map → constraint patterns over `?s`.
//!
//! Selections are emitted hierarchy facets first, then the remaining
//! non-text facets by ascending candidate count, then text facets last.
//! Incomplete selections are skipped and never filter the result set.

use chrono::NaiveDate;
use facetry_core::{
  definition::{FacetDefinition, FacetKind, FacetMap},
  selection::{FacetSelection, TimeSpan},
};

const XSD_DATE: &str = "<http://www.w3.org/2001/XMLSchema#date>";

/// Format `selections` against `facets`.
///
/// Selections for ids missing from `facets` are ignored.
pub fn format_selections<'a, I>(facets: &FacetMap, selections: I) -> String
where
  I: IntoIterator<Item = (&'a str, &'a FacetSelection)>,
{
  let mut ordered: Vec<(&FacetDefinition, &FacetSelection)> = selections
    .into_iter()
    .filter_map(|(id, sel)| facets.get(id).map(|def| (def, sel)))
    .collect();

  // Stable: equal counts keep map order; selections without a count go last.
  ordered.sort_by_key(|(_, sel)| (sel.sort_count().is_none(), sel.sort_count()));
  ordered.sort_by_key(|(def, _)| rank(&def.kind));

  let mut out = String::new();
  let mut var = 0usize;
  for (def, sel) in ordered {
    if !sel.is_complete() {
      continue;
    }
    match &def.kind {
      FacetKind::Basic => out.push_str(&basic(&def.id, sel)),
      FacetKind::Hierarchy { property, .. } => {
        out.push_str(&hierarchy(&def.id, property, sel, var));
        var += 1;
      }
      FacetKind::Text => {
        if let FacetSelection::Text(Some(text)) = sel {
          out.push_str(&text_match(&def.id, text, var));
          var += 1;
        }
      }
      FacetKind::Timespan { start, end, is_resource } => {
        if let FacetSelection::Timespan(span) = sel {
          let props = SpanProperties {
            facet: &def.id,
            start,
            end,
            is_resource: *is_resource,
          };
          out.push_str(&timespan(&props, span, var));
          var += 1;
        }
      }
    }
  }
  out
}

fn rank(kind: &FacetKind) -> u8 {
  match kind {
    FacetKind::Hierarchy { .. } => 0,
    FacetKind::Basic | FacetKind::Timespan { .. } => 1,
    FacetKind::Text => 2,
  }
}

// ─── Per-kind fragments ──────────────────────────────────────────────────────

/// One equality pattern per selected value.
pub fn basic(facet: &str, selection: &FacetSelection) -> String {
  selection
    .chosen()
    .into_iter()
    .map(|value| format!(" ?s {facet} {value} ."))
    .collect()
}

/// Each selected value gets a fresh intermediate node linked to it through
/// the hierarchy property.
pub fn hierarchy(facet: &str, property: &str, selection: &FacetSelection, var: usize) -> String {
  selection
    .chosen()
    .into_iter()
    .enumerate()
    .map(|(level, value)| {
      let node = if level == 0 { format!("?h{var}") } else { format!("?h{var}_{level}") };
      format!(" {node} {property} {value} . ?s {facet} {node} .")
    })
    .collect()
}

/// Lowercased tokens of a free-text query with punctuation removed.
pub fn tokens(text: &str) -> Vec<String> {
  text
    .chars()
    .filter(|c| !c.is_ascii_punctuation())
    .collect::<String>()
    .split_whitespace()
    .map(str::to_lowercase)
    .collect()
}

/// Every token must occur in the facet property's value.
pub fn text_match(facet: &str, text: &str, var: usize) -> String {
  let tokens = tokens(text);
  if tokens.is_empty() {
    return String::new();
  }
  let mut out = format!(" ?s {facet} ?text{var} .");
  for token in tokens {
    out.push_str(&format!(" FILTER(CONTAINS(LCASE(?text{var}), \"{token}\"))"));
  }
  out
}

pub struct SpanProperties<'a> {
  pub facet:       &'a str,
  pub start:       &'a str,
  pub end:         &'a str,
  pub is_resource: bool,
}

fn date(d: NaiveDate) -> String { format!("\"{}\"^^{XSD_DATE}", d.format("%Y-%m-%d")) }

/// Bound filters for whichever ends of `span` are set.
///
/// When the start and end properties coincide and the start bound is
/// emitted, the end bound compares the same date variable.
pub fn timespan(props: &SpanProperties<'_>, span: &TimeSpan, var: usize) -> String {
  let (node, mut out) = if props.is_resource {
    (format!("?span{var}"), format!(" ?s {} ?span{var} .", props.facet))
  } else {
    ("?s".to_owned(), String::new())
  };

  let start_var = format!("?start{var}");
  if let Some(start) = span.start {
    out.push_str(&format!(
      " {node} {} {start_var} . FILTER({start_var} >= {})",
      props.start,
      date(start)
    ));
  }
  if let Some(end) = span.end {
    if props.start == props.end && span.start.is_some() {
      out.push_str(&format!(" FILTER({start_var} <= {})", date(end)));
    } else {
      out.push_str(&format!(
        " {node} {} ?end{var} . FILTER(?end{var} <= {})",
        props.end,
        date(end)
      ));
    }
  }
  out
}
