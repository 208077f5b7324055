//! Query composer: one aggregate facet query per update cycle.
//!
//! The composed query is a union of branches, each projecting
//! `?cnt ?id ?facet_text ?value`:
//!
//! | Branch | Emitted for | `?value` |
//! |--------|-------------|----------|
//! | deselection | every facet with a complete selection, plus the default count facet | unbound |
//! | free count | every text or timespan facet with a complete selection | sentinel |
//! | candidates | every basic facet | each distinct value |
//! | hierarchy | every hierarchy facet with root classes | each root or child node |
//!
//! Every branch except "free count" applies all selections *but* its own
//! facet's, so a facet's candidates and baseline are what re-selecting would
//! yield.

use facetry_core::{
  definition::{FacetDefinition, FacetKind, FacetMap},
  selection::{FacetSelection, Selections},
  value::NO_SELECTION_TEXT,
};
use tracing::debug;

use crate::{
  Result,
  format::format_selections,
  template::{
    CANDIDATE_UNION, COUNT_AGGREGATE, DESELECTION_UNION, FACET_QUERY, FREE_COUNT_UNION,
    HIERARCHY_UNION, LABEL_PART, PREFIXES, SERVICE_PART, literal,
  },
};

/// `?value` of a free facet's count row.
pub const FREE_FACET_SENTINEL: &str = "selection";

/// Binds `?s` when neither selections nor a setup constraint do.
const SUBJECT_FALLBACK: &str = "?s ?subject_p ?subject_o .";

// ─── Options ─────────────────────────────────────────────────────────────────

/// Setup-level query options.
#[derive(Debug, Clone)]
pub struct QueryOptions {
  /// Class every subject must have (`?s a <class>`).
  pub rdf_class:      Option<String>,
  /// Extra pattern over `?s`, inserted verbatim.
  pub constraint:     Option<String>,
  /// Named graph wrapping every pattern.
  pub graph:          Option<String>,
  /// Language tag preferred for labels.
  pub preferred_lang: String,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      rdf_class:      None,
      constraint:     None,
      graph:          None,
      preferred_lang: "en".to_owned(),
    }
  }
}

// ─── Composer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Composer {
  constraint:  String,
  graph_start: String,
  graph_end:   String,
  lang:        String,
}

type Active<'a> = [(&'a str, &'a FacetSelection)];

impl Composer {
  pub fn new(options: &QueryOptions) -> Self {
    let mut constraint = String::new();
    if let Some(class) = &options.rdf_class {
      constraint.push_str(&format!("?s a {class} . "));
    }
    if let Some(extra) = &options.constraint {
      constraint.push_str(extra);
    }

    let (graph_start, graph_end) = match &options.graph {
      Some(graph) => (format!("GRAPH {graph} {{"), "}".to_owned()),
      None => (String::new(), String::new()),
    };

    let lang = options
      .preferred_lang
      .chars()
      .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
      .collect();

    Self {
      constraint,
      graph_start,
      graph_end,
      lang,
    }
  }

  /// Compose the facet query for `facets` under `selections`.
  ///
  /// Returns `Ok(None)` when there are no facets: there is nothing to ask
  /// the endpoint. Selections for facets outside `facets` are ignored.
  pub fn compose(
    &self,
    facets: &FacetMap,
    selections: &Selections,
    pivot: Option<&str>,
    default_count_key: Option<&str>,
  ) -> Result<Option<String>> {
    if facets.is_empty() {
      return Ok(None);
    }

    let active: Vec<(&str, &FacetSelection)> = selections
      .iter()
      .filter(|(id, sel)| facets.contains_key(id.as_str()) && sel.is_complete())
      .map(|(id, sel)| (id.as_str(), sel))
      .collect();

    let mut branches = self.count_unions(facets, &active, default_count_key)?;
    for facet in facets.values() {
      match &facet.kind {
        FacetKind::Basic => branches.push(self.candidate_union(facets, facet, &active)?),
        FacetKind::Hierarchy { property, classes } => {
          if let Some(branch) = self.hierarchy_union(facets, facet, property, classes, &active)? {
            branches.push(branch);
          }
        }
        FacetKind::Text | FacetKind::Timespan { .. } => {}
      }
    }

    let query = FACET_QUERY.render(&[
      ("PREFIXES", PREFIXES),
      ("BRANCHES", &branches.join("\n UNION\n")),
    ])?;

    debug!(
      facets = facets.len(),
      selections = active.len(),
      branches = branches.len(),
      pivot = pivot.unwrap_or("-"),
      bytes = query.len(),
      "composed facet query"
    );
    Ok(Some(query))
  }

  /// Deselection branches, each followed by a free-count branch when the
  /// facet is a free facet carrying a selection.
  pub fn count_unions(
    &self,
    facets: &FacetMap,
    active: &Active<'_>,
    default_count_key: Option<&str>,
  ) -> Result<Vec<String>> {
    let mut targets: Vec<(&str, Option<&FacetSelection>)> =
      active.iter().map(|(id, sel)| (*id, Some(*sel))).collect();
    if let Some(key) = default_count_key
      && facets.contains_key(key)
      && !active.iter().any(|(id, _)| *id == key)
    {
      targets.push((key, None));
    }

    let no_selection = literal(NO_SELECTION_TEXT);
    let sentinel = literal(FREE_FACET_SENTINEL);
    let mut branches = Vec::new();

    for (id, own) in targets {
      let others = format_selections(facets, without(active, id));
      branches.push(DESELECTION_UNION.render(&[
        ("COUNT", &self.count(&others)?),
        ("NO_SELECTION", &no_selection),
        ("FACET", id),
      ])?);

      if let Some(own) = own
        && facets.get(id).is_some_and(|f| f.kind.is_free())
      {
        let all = format_selections(facets, active.iter().copied());
        branches.push(FREE_COUNT_UNION.render(&[
          ("COUNT", &self.count(&all)?),
          ("LABEL", &literal(&free_label(own))),
          ("SENTINEL", &sentinel),
          ("FACET", id),
        ])?);
      }
    }
    Ok(branches)
  }

  fn count(&self, selections: &str) -> Result<String> {
    let constraint = if selections.trim().is_empty() && self.constraint.is_empty() {
      SUBJECT_FALLBACK
    } else {
      self.constraint.as_str()
    };
    COUNT_AGGREGATE.render(&[
      ("GRAPH_START", &self.graph_start),
      ("SELECTIONS", selections),
      ("CONSTRAINT", constraint),
      ("GRAPH_END", &self.graph_end),
    ])
  }

  fn candidate_union(
    &self,
    facets: &FacetMap,
    facet: &FacetDefinition,
    active: &Active<'_>,
  ) -> Result<String> {
    let others = format_selections(facets, without(active, &facet.id));
    CANDIDATE_UNION.render(&[
      ("FACET", &facet.id),
      ("GRAPH_START", &self.graph_start),
      ("SELECTIONS", &others),
      ("CONSTRAINT", &self.constraint),
      ("GRAPH_END", &self.graph_end),
      ("LABEL_PART", &self.label_part(facet)?),
    ])
  }

  /// Roots are the selected classes if the facet has a selection, else the
  /// configured classes. No roots means no branch.
  fn hierarchy_union(
    &self,
    facets: &FacetMap,
    facet: &FacetDefinition,
    property: &str,
    classes: &[String],
    active: &Active<'_>,
  ) -> Result<Option<String>> {
    let selected: Vec<&str> = active
      .iter()
      .find(|(id, _)| *id == facet.id)
      .map(|(_, sel)| sel.chosen())
      .unwrap_or_default();
    let roots = if selected.is_empty() {
      classes.join(" ")
    } else {
      selected.join(" ")
    };
    if roots.trim().is_empty() {
      return Ok(None);
    }

    let others = format_selections(facets, without(active, &facet.id));
    HIERARCHY_UNION
      .render(&[
        ("FACET", &facet.id),
        ("CLASSES", &roots),
        ("GRAPH_START", &self.graph_start),
        ("PROPERTY", property),
        ("SELECTIONS", &others),
        ("CONSTRAINT", &self.constraint),
        ("GRAPH_END", &self.graph_end),
        ("LABEL_PART", &self.label_part(facet)?),
      ])
      .map(Some)
  }

  fn label_part(&self, facet: &FacetDefinition) -> Result<String> {
    let service_part = match &facet.service {
      Some(service) => SERVICE_PART.render(&[("SERVICE", service)])?,
      None => String::new(),
    };
    LABEL_PART.render(&[("LANG", &self.lang), ("SERVICE_PART", &service_part)])
  }
}

fn without<'a, 'b>(
  active: &'b Active<'a>,
  id: &'b str,
) -> impl Iterator<Item = (&'a str, &'a FacetSelection)> + 'b {
  active.iter().copied().filter(move |(other, _)| *other != id)
}

fn free_label(selection: &FacetSelection) -> String {
  match selection {
    FacetSelection::Text(Some(text)) => text.clone(),
    FacetSelection::Timespan(span) => match (span.start, span.end) {
      (Some(start), Some(end)) => format!("{start}/{end}"),
      _ => String::new(),
    },
    FacetSelection::Text(None)
    | FacetSelection::One(_)
    | FacetSelection::Many(_)
    | FacetSelection::Collapsed => String::new(),
  }
}
