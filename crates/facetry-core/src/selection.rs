//! Facet selections, the user's current input for each facet.
//!
//! A facet with no entry in [`Selections`] has no selection. Selections are
//! plain data; cloning one is a structural copy.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{
  Error, Result,
  definition::{FacetDefinition, FacetKind},
  value::{FacetValue, is_term},
};

/// Current selections keyed by facet id.
pub type Selections = IndexMap<String, FacetSelection>;

// ─── TimeSpan ────────────────────────────────────────────────────────────────

/// A date range. Either bound may be missing while the user is still typing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
  #[serde(default)]
  pub start: Option<NaiveDate>,
  #[serde(default)]
  pub end:   Option<NaiveDate>,
}

impl TimeSpan {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
    Self {
      start: Some(start),
      end:   Some(end),
    }
  }

  pub fn is_complete(&self) -> bool { self.start.is_some() && self.end.is_some() }

  pub fn is_cleared(&self) -> bool { self.start.is_none() && self.end.is_none() }

  /// Exactly one bound is set.
  pub fn is_partial(&self) -> bool { !self.is_complete() && !self.is_cleared() }
}

// ─── FacetSelection ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetSelection {
  /// A single chosen candidate (basic or hierarchy facet).
  One(FacetValue),
  /// Multiselect, in selection order.
  Many(Vec<FacetValue>),
  /// Free-text input.
  Text(Option<String>),
  Timespan(TimeSpan),
  /// The facet's value was nulled because another facet's change removed it
  /// from this facet's candidates. The previous selection is kept visible.
  Collapsed,
}

/// What two selections are compared by: the chosen values only, never their
/// counts or labels.
#[derive(Debug, PartialEq, Eq)]
enum ValueKey<'a> {
  Terms(Vec<&'a str>),
  Text(&'a str),
  Span(Option<NaiveDate>, Option<NaiveDate>),
}

impl FacetSelection {
  pub fn text(value: impl Into<String>) -> Self { Self::Text(Some(value.into())) }

  /// `true` when the selection carries no value at all.
  pub fn is_empty(&self) -> bool {
    match self {
      Self::One(v) => v.value.is_none(),
      Self::Many(vs) => vs.iter().all(|v| v.value.is_none()),
      Self::Text(t) => t.as_deref().is_none_or(|t| t.trim().is_empty()),
      Self::Timespan(span) => span.is_cleared(),
      Self::Collapsed => true,
    }
  }

  /// `true` when every required part is present, i.e. the selection may
  /// constrain the result set. Partial selections never filter anything.
  pub fn is_complete(&self) -> bool {
    match self {
      Self::One(v) => v.value.is_some(),
      Self::Many(vs) => !vs.is_empty() && vs.iter().all(|v| v.value.is_some()),
      Self::Text(t) => t.as_deref().is_some_and(|t| !t.trim().is_empty()),
      Self::Timespan(span) => span.is_complete(),
      Self::Collapsed => false,
    }
  }

  /// Whether this selection has the right shape for a facet of `kind`.
  /// `Collapsed` fits every kind.
  pub fn fits(&self, kind: &FacetKind) -> bool {
    match kind {
      FacetKind::Basic | FacetKind::Hierarchy { .. } => {
        matches!(self, Self::One(_) | Self::Many(_) | Self::Collapsed)
      }
      FacetKind::Text => matches!(self, Self::Text(_) | Self::Collapsed),
      FacetKind::Timespan { .. } => matches!(self, Self::Timespan(_) | Self::Collapsed),
    }
  }

  /// The chosen value terms of a basic or hierarchy selection.
  pub fn chosen(&self) -> Vec<&str> {
    match self {
      Self::One(v) => v.value.as_deref().into_iter().collect(),
      Self::Many(vs) => vs.iter().filter_map(|v| v.value.as_deref()).collect(),
      Self::Text(_) | Self::Timespan(_) | Self::Collapsed => Vec::new(),
    }
  }

  /// The first chosen value that is not a well-formed term, if any.
  pub fn invalid_term(&self) -> Option<&str> {
    self.chosen().into_iter().find(|term| !is_term(term))
  }

  /// Candidate count of the selection, used to put the most restrictive
  /// constraints first. Multiselects use their smallest count.
  pub fn sort_count(&self) -> Option<u64> {
    match self {
      Self::One(v) => Some(v.count),
      Self::Many(vs) => vs.iter().map(|v| v.count).min(),
      Self::Text(_) | Self::Timespan(_) | Self::Collapsed => None,
    }
  }

  fn key(&self) -> ValueKey<'_> {
    match self {
      Self::One(_) | Self::Many(_) | Self::Collapsed => {
        let mut terms = self.chosen();
        terms.sort_unstable();
        ValueKey::Terms(terms)
      }
      Self::Text(t) => ValueKey::Text(t.as_deref().unwrap_or_default()),
      Self::Timespan(span) => ValueKey::Span(span.start, span.end),
    }
  }

  /// Value equality used for change detection. Two absent or empty
  /// selections are equal; otherwise only the chosen values are compared.
  pub fn same_value(a: Option<&Self>, b: Option<&Self>) -> bool {
    let a = a.filter(|s| !s.is_empty());
    let b = b.filter(|s| !s.is_empty());
    match (a, b) {
      (None, None) => true,
      (Some(a), Some(b)) => a.key() == b.key(),
      _ => false,
    }
  }
}

// ─── Seeds ───────────────────────────────────────────────────────────────────

/// A serialized initial value: one string, or a list for multiselect.
/// Timespan seeds are JSON strings `{"start":"YYYY-MM-DD","end":"YYYY-MM-DD"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seed {
  One(String),
  Many(Vec<String>),
}

impl FacetSelection {
  /// Parse a seed into a selection shaped for `definition`.
  pub fn from_seed(definition: &FacetDefinition, seed: &Seed) -> Result<Self> {
    let invalid = |reason: String| Error::InvalidSeed {
      id: definition.id.clone(),
      reason,
    };

    let selection = match (&definition.kind, seed) {
      (FacetKind::Basic | FacetKind::Hierarchy { .. }, Seed::One(v)) => {
        Self::One(FacetValue::new(v.clone(), v.clone(), 0))
      }
      (FacetKind::Basic | FacetKind::Hierarchy { .. }, Seed::Many(vs)) => Self::Many(
        vs.iter()
          .map(|v| FacetValue::new(v.clone(), v.clone(), 0))
          .collect(),
      ),
      (FacetKind::Text, Seed::One(v)) => Self::text(v.clone()),
      (FacetKind::Timespan { .. }, Seed::One(raw)) => {
        let span: TimeSpan =
          serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        Self::Timespan(span)
      }
      (FacetKind::Text | FacetKind::Timespan { .. }, Seed::Many(_)) => {
        return Err(invalid("expected a single value".into()));
      }
    };

    if let Some(term) = selection.invalid_term() {
      return Err(invalid(format!("{term:?} is not an RDF term")));
    }
    Ok(selection)
  }
}
