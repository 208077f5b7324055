//! Parameterized query skeletons with named `{{PLACEHOLDER}}` slots.
//!
//! Rendering is a single pass: substituted text is never rescanned, so values
//! may safely contain braces. Every placeholder in a skeleton must be given a
//! value; a missing one is a defect and fails rendering.

use crate::{Error, Result};

// ─── Template ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Template {
  name: &'static str,
  text: &'static str,
}

impl Template {
  pub const fn new(name: &'static str, text: &'static str) -> Self { Self { name, text } }

  pub fn name(&self) -> &'static str { self.name }

  /// Names of all placeholders, in order of appearance (with repeats).
  pub fn placeholders(&self) -> Vec<&'static str> {
    let mut names = Vec::new();
    let mut rest = self.text;
    while let Some(open) = rest.find("{{") {
      let after = &rest[open + 2..];
      let Some(close) = after.find("}}") else { break };
      names.push(&after[..close]);
      rest = &after[close + 2..];
    }
    names
  }

  /// Substitute every placeholder from `vars`.
  pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(self.text.len());
    let mut rest = self.text;

    while let Some(open) = rest.find("{{") {
      out.push_str(&rest[..open]);
      let after = &rest[open + 2..];
      let close = after
        .find("}}")
        .ok_or(Error::UnterminatedPlaceholder(self.name))?;
      let name = &after[..close];
      let value = vars
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| *v)
        .ok_or_else(|| Error::UnresolvedPlaceholder {
          template:    self.name,
          placeholder: name.to_owned(),
        })?;
      out.push_str(value);
      rest = &after[close + 2..];
    }

    out.push_str(rest);
    Ok(out)
  }
}

/// Quote `s` as a plain string literal.
pub fn literal(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      other => out.push(other),
    }
  }
  out.push('"');
  out
}

// ─── Skeletons ───────────────────────────────────────────────────────────────

pub const PREFIXES: &str = "\
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>";

/// The outer query: every branch is a union member projecting
/// `?cnt ?id ?facet_text ?value`.
pub const FACET_QUERY: Template = Template::new("facet_query", "\
{{PREFIXES}}
SELECT DISTINCT ?cnt ?id ?facet_text ?value WHERE {
{{BRANCHES}}
}");

/// Count of distinct subjects matching a constraint block.
pub const COUNT_AGGREGATE: Template = Template::new("count_aggregate", "\
  {
   SELECT DISTINCT (COUNT(DISTINCT ?s) AS ?cnt) WHERE {
    {{GRAPH_START}}
     {{SELECTIONS}}
     {{CONSTRAINT}}
    {{GRAPH_END}}
   }
  }");

/// Baseline count for a facet with its own constraint removed. `?value`
/// stays unbound, which marks the row as the no-selection entry.
pub const DESELECTION_UNION: Template = Template::new("deselection_union", "\
 {
{{COUNT}}
  BIND({{NO_SELECTION}} AS ?facet_text)
  BIND({{FACET}} AS ?id)
 }");

/// Count for a free facet with its own constraint applied. `?value` is a
/// fixed sentinel since the facet has no enumerable candidates.
pub const FREE_COUNT_UNION: Template = Template::new("free_count_union", "\
 {
{{COUNT}}
  BIND({{LABEL}} AS ?facet_text)
  BIND({{SENTINEL}} AS ?value)
  BIND({{FACET}} AS ?id)
 }");

/// Enumerated candidate values of one basic facet, counted with every other
/// facet's constraint applied.
pub const CANDIDATE_UNION: Template = Template::new("candidate_union", "\
 {
  SELECT ?cnt ?id ?value (SAMPLE(?label) AS ?facet_text) {
   {
    SELECT DISTINCT (COUNT(DISTINCT ?s) AS ?cnt) ?id ?value {
     BIND({{FACET}} AS ?id)
     {{GRAPH_START}}
      {{SELECTIONS}}
      {{CONSTRAINT}}
      ?s {{FACET}} ?value .
     {{GRAPH_END}}
    } GROUP BY ?id ?value
   }
{{LABEL_PART}}
  } GROUP BY ?cnt ?id ?value
  ORDER BY ?facet_text
 }");

/// Two-level expansion of a hierarchy facet below its root classes.
/// `{{PROPERTY}}` is expected to be reflexive (e.g. `skos:broader*`) so that
/// each root appears as its own candidate.
pub const HIERARCHY_UNION: Template = Template::new("hierarchy_union", "\
 {
  SELECT ?cnt ?id ?value ?facet_text {
   {
    SELECT ?cnt ?id ?value ?class (SAMPLE(?label) AS ?node_text) {
     {
      SELECT DISTINCT (COUNT(DISTINCT ?s) AS ?cnt) ?id ?value ?class {
       BIND({{FACET}} AS ?id)
       VALUES ?class { {{CLASSES}} }
       {{GRAPH_START}}
        ?value {{PROPERTY}} ?class .
        ?h {{PROPERTY}} ?value .
        ?s {{FACET}} ?h .
        {{SELECTIONS}}
        {{CONSTRAINT}}
       {{GRAPH_END}}
      } GROUP BY ?class ?value ?id
     }
{{LABEL_PART}}
    } GROUP BY ?cnt ?id ?value ?class
   }
   BIND(IF(?value = ?class, ?node_text, CONCAT(\"-- \", ?node_text)) AS ?facet_text)
   BIND(IF(?value = ?class, 0, 1) AS ?order)
  } ORDER BY ?class ?order ?facet_text
 }");

/// Label fallback chain for `?value`, binding `?label`.
pub const LABEL_PART: Template = Template::new("label_part", "\
   OPTIONAL { ?value skos:prefLabel ?pref_lbl . FILTER(langMatches(lang(?pref_lbl), \"{{LANG}}\")) }
   OPTIONAL { ?value rdfs:label ?rdfs_lbl . FILTER(langMatches(lang(?rdfs_lbl), \"{{LANG}}\")) }
   OPTIONAL { ?value skos:prefLabel ?any_pref_lbl . }
   OPTIONAL { ?value rdfs:label ?any_rdfs_lbl . }
{{SERVICE_PART}}
   BIND(COALESCE(?pref_lbl, ?rdfs_lbl, ?any_pref_lbl, ?any_rdfs_lbl, ?service_lbl,
     IF(ISURI(?value), REPLACE(STR(?value), \"^.+/(.+?)$\", \"$1\"), STR(?value))) AS ?label)");

/// Federated label lookup against an external vocabulary endpoint.
pub const SERVICE_PART: Template = Template::new("service_part", "\
   OPTIONAL { SERVICE SILENT {{SERVICE}} { ?value skos:prefLabel|rdfs:label ?service_lbl . } }");

#[cfg(test)]
mod tests {
  use super::*;

  const ALL: [Template; 8] = [
    FACET_QUERY,
    COUNT_AGGREGATE,
    DESELECTION_UNION,
    FREE_COUNT_UNION,
    CANDIDATE_UNION,
    HIERARCHY_UNION,
    LABEL_PART,
    SERVICE_PART,
  ];

  #[test]
  fn render_substitutes_every_occurrence() {
    let t = Template::new("t", "?s {{P}} ?o . ?x {{P}} {{O}} .");
    let out = t.render(&[("P", "<p>"), ("O", "<o>")]).unwrap();
    assert_eq!(out, "?s <p> ?o . ?x <p> <o> .");
  }

  #[test]
  fn render_does_not_rescan_substituted_text() {
    let t = Template::new("t", "a {{X}} b");
    let out = t.render(&[("X", "{{Y}}")]).unwrap();
    assert_eq!(out, "a {{Y}} b");
  }

  #[test]
  fn missing_placeholder_fails_fast() {
    let err = HIERARCHY_UNION.render(&[("FACET", "<f>")]).unwrap_err();
    assert!(matches!(
      err,
      Error::UnresolvedPlaceholder { template: "hierarchy_union", .. }
    ));
  }

  #[test]
  fn unterminated_placeholder_is_an_error() {
    let t = Template::new("broken", "x {{OOPS");
    assert!(matches!(t.render(&[]), Err(Error::UnterminatedPlaceholder("broken"))));
  }

  #[test]
  fn every_skeleton_renders_when_all_placeholders_are_given() {
    for template in ALL {
      let names = template.placeholders();
      let vars: Vec<(&str, &str)> = names.iter().map(|n| (*n, "x")).collect();
      let out = template.render(&vars).unwrap();
      assert!(!out.contains("{{"), "{} left a placeholder", template.name());
    }
  }

  #[test]
  fn literal_escapes_quotes_and_backslashes() {
    assert_eq!(literal(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
  }
}
