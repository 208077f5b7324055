//! The facet state coordinator.
//!
//! Per facet id the handler tracks one of three states:
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Disabled` | defined but hidden; holds no selection |
//! | `Idle` | enabled, no update in flight |
//! | `Pending` | enabled, an update is in flight |
//!
//! All mutation happens under one lock that is never held across the
//! endpoint call. Every issued update takes a generation number; a response
//! is applied only if no newer update was issued. If the enabled set changed
//! while it was in flight, the update is reissued against the new set.
//! Selections become committed (and later changes are compared against
//! them) only once a response built from them has been applied.

use facetry_core::{
  definition::{FacetDefinition, FacetKind, FacetMap, default_count_key, index_definitions},
  endpoint::Endpoint,
  selection::{FacetSelection, Seed, Selections},
  value::{FacetState, FacetValue},
};
use facetry_query::{Composer, FREE_FACET_SENTINEL, QueryOptions, template::literal};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{Error, Result, mapper};

// ─── Public types ────────────────────────────────────────────────────────────

/// Handler setup beyond the facet definitions.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
  pub query:          QueryOptions,
  /// Seed selections by facet id. Seeding any facet restricts the initially
  /// enabled set to the seeded facets.
  pub initial_values: IndexMap<String, Seed>,
}

/// Called with the current selections on every update attempt.
pub type UpdateHook = Box<dyn Fn(&Selections) + Send + Sync>;

/// A facet's definition with its latest candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetEntry {
  pub definition: FacetDefinition,
  /// `None` until the first applied update.
  pub state:      Option<FacetState>,
}

/// Enabled facets keyed by id, in enable order.
pub type EnabledFacets = IndexMap<String, FacetEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetStatus {
  Disabled,
  Idle,
  Pending,
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HandlerState {
  enabled:           EnabledFacets,
  disabled:          EnabledFacets,
  selections:        Selections,
  /// Selection per enabled facet as of the last applied response; change
  /// detection compares against this.
  previous:          IndexMap<String, Option<FacetSelection>>,
  default_count_key: Option<String>,
  /// Generation of the most recently issued update.
  issued:            u64,
  /// Bumped whenever the enabled set changes.
  epoch:             u64,
  loading:           bool,
}

/// What an in-flight update was composed against.
struct Ticket {
  generation:        u64,
  epoch:             u64,
  selections:        Selections,
  default_count_key: Option<String>,
}

impl HandlerState {
  fn facet_map(&self) -> FacetMap {
    self
      .enabled
      .iter()
      .map(|(id, entry)| (id.clone(), entry.definition.clone()))
      .collect()
  }

  fn refresh_default_count_key(&mut self) {
    self.default_count_key = default_count_key(&self.facet_map());
  }

  fn entry(&self, id: &str) -> Result<&FacetEntry> {
    self
      .enabled
      .get(id)
      .ok_or_else(|| Error::UnknownFacet(id.to_owned()))
  }

  /// Replace every enabled facet's state from a mapped response.
  fn apply(&mut self, states: Vec<FacetState>, pivot: Option<&str>, ticket: &Ticket) {
    let mut states: IndexMap<String, FacetState> =
      states.into_iter().map(|s| (s.id.clone(), s)).collect();

    let baseline = no_selection_count(
      &states,
      &ticket.selections,
      ticket.default_count_key.as_deref(),
    );
    let free_pivot = pivot.filter(|id| {
      self
        .enabled
        .get(*id)
        .is_some_and(|e| e.definition.kind.is_free())
    });
    let count = match free_pivot {
      Some(id) => free_facet_count(states.get(id), ticket.selections.get(id), baseline),
      None => baseline,
    };

    for (id, entry) in &mut self.enabled {
      let mut state = states
        .swap_remove(id)
        .unwrap_or_else(|| FacetState::new(id.clone()));
      if state.no_selection().is_none() {
        state.values.insert(0, FacetValue::no_selection(count));
      }
      entry.state = Some(state);
    }

    for id in self.enabled.keys() {
      match ticket.selections.get(id) {
        Some(FacetSelection::Collapsed) => {}
        committed => {
          self.previous.insert(id.clone(), committed.cloned());
        }
      }
    }
    self.previous.retain(|id, _| self.enabled.contains_key(id));
  }

  /// Put back a selection that another facet's change removed from this
  /// facet's candidates. Its values re-enter the list with count 0 and no
  /// requery is issued.
  fn restore_collapsed(&mut self, id: &str, previous: Option<FacetSelection>) {
    let Some(previous) = previous else {
      self.selections.shift_remove(id);
      return;
    };
    let restored = match &previous {
      FacetSelection::One(value) => vec![value.clone()],
      FacetSelection::Many(values) => values.clone(),
      FacetSelection::Text(_) | FacetSelection::Timespan(_) | FacetSelection::Collapsed => {
        Vec::new()
      }
    };

    if let Some(entry) = self.enabled.get_mut(id) {
      let state = entry.state.get_or_insert_with(|| FacetState::new(id));
      state
        .values
        .extend(restored.into_iter().map(|v| FacetValue { count: 0, ..v }));
    }
    self.selections.insert(id.to_owned(), previous);
  }
}

/// The current result count as seen through the default count facet: the
/// count of its selected value, or its no-selection entry.
fn no_selection_count(
  states: &IndexMap<String, FacetState>,
  selections: &Selections,
  key: Option<&str>,
) -> u64 {
  let Some(key) = key else { return 0 };
  let sentinel = literal(FREE_FACET_SENTINEL);
  let target = match selections.get(key).filter(|s| s.is_complete()) {
    Some(FacetSelection::Text(_) | FacetSelection::Timespan(_)) => Some(sentinel.as_str()),
    Some(selection) => selection.chosen().first().copied(),
    None => None,
  };
  states
    .get(key)
    .and_then(|s| s.count_of(target))
    .unwrap_or(0)
}

/// Count shown for a text or timespan facet: the baseline if it has no
/// value, otherwise the sum of its returned candidate counts.
fn free_facet_count(
  state: Option<&FacetState>,
  selection: Option<&FacetSelection>,
  baseline: u64,
) -> u64 {
  if selection.is_none_or(FacetSelection::is_empty) {
    return baseline;
  }
  state
    .map(|s| {
      s.values
        .iter()
        .filter(|v| !v.is_no_selection())
        .map(|v| v.count)
        .sum::<u64>()
    })
    .unwrap_or(0)
}

// ─── Handler ─────────────────────────────────────────────────────────────────

pub struct FacetHandler<E> {
  endpoint:  E,
  composer:  Composer,
  state:     Mutex<HandlerState>,
  on_update: Option<UpdateHook>,
}

impl<E: Endpoint> FacetHandler<E> {
  /// Build a handler over `definitions`.
  ///
  /// Seeds for undefined facets are skipped; a seed that does not parse for
  /// its facet, or whose values are not terms, is an error.
  pub fn new(
    definitions: impl IntoIterator<Item = FacetDefinition>,
    options: HandlerOptions,
    endpoint: E,
  ) -> Result<Self> {
    let facets = index_definitions(definitions)?;

    let mut selections = Selections::new();
    for (id, seed) in &options.initial_values {
      match facets.get(id) {
        Some(definition) => {
          selections.insert(id.clone(), FacetSelection::from_seed(definition, seed)?);
        }
        None => warn!(facet = %id, "ignoring initial value for undefined facet"),
      }
    }

    let mut state = HandlerState::default();
    for (id, definition) in facets {
      let enabled = if selections.is_empty() {
        definition.enabled
      } else {
        selections.contains_key(&id)
      };
      let entry = FacetEntry {
        definition,
        state: None,
      };
      if enabled {
        state.previous.insert(id.clone(), selections.get(&id).cloned());
        state.enabled.insert(id, entry);
      } else {
        state.disabled.insert(id, entry);
      }
    }
    state.selections = selections;
    state.refresh_default_count_key();

    Ok(Self {
      endpoint,
      composer: Composer::new(&options.query),
      state: Mutex::new(state),
      on_update: None,
    })
  }

  /// Register the callback run with the selections on every update attempt.
  pub fn with_on_update(mut self, hook: impl Fn(&Selections) + Send + Sync + 'static) -> Self {
    self.on_update = Some(Box::new(hook));
    self
  }

  pub fn endpoint(&self) -> &E { &self.endpoint }

  // ─── Reads ─────────────────────────────────────────────────────────────────

  pub async fn enabled(&self) -> EnabledFacets { self.state.lock().await.enabled.clone() }

  pub async fn disabled(&self) -> Vec<FacetDefinition> {
    let st = self.state.lock().await;
    st.disabled.values().map(|e| e.definition.clone()).collect()
  }

  pub async fn selections(&self) -> Selections { self.state.lock().await.selections.clone() }

  pub async fn default_count_key(&self) -> Option<String> {
    self.state.lock().await.default_count_key.clone()
  }

  pub async fn is_loading(&self) -> bool { self.state.lock().await.loading }

  #[cfg(test)]
  pub(crate) async fn committed_ids(&self) -> Vec<String> {
    self.state.lock().await.previous.keys().cloned().collect()
  }

  /// `None` for an id that was never defined.
  pub async fn status(&self, id: &str) -> Option<FacetStatus> {
    let st = self.state.lock().await;
    if st.enabled.contains_key(id) {
      Some(if st.loading { FacetStatus::Pending } else { FacetStatus::Idle })
    } else if st.disabled.contains_key(id) {
      Some(FacetStatus::Disabled)
    } else {
      None
    }
  }

  // ─── Selection input ───────────────────────────────────────────────────────

  /// Store `selection` for an enabled facet without triggering anything.
  /// Follow with [`facet_changed`](Self::facet_changed).
  pub async fn set_selection(&self, id: &str, selection: Option<FacetSelection>) -> Result<()> {
    let mut st = self.state.lock().await;
    let kind = st.entry(id)?.definition.kind.clone();
    let Some(selection) = selection else {
      st.selections.shift_remove(id);
      return Ok(());
    };

    if !selection.fits(&kind) {
      return Err(Error::SelectionMismatch {
        id:        id.to_owned(),
        kind:      kind.as_ref().to_owned(),
        selection: selection.as_ref().to_owned(),
      });
    }
    if let Some(term) = selection.invalid_term() {
      return Err(Error::InvalidTerm {
        id:    id.to_owned(),
        value: term.to_owned(),
      });
    }
    st.selections.insert(id.to_owned(), selection);
    Ok(())
  }

  /// React to a new selection on `id`. Unchanged values are a no-op.
  pub async fn facet_changed(&self, id: &str) -> Result<EnabledFacets> {
    {
      let mut st = self.state.lock().await;
      let kind = st.entry(id)?.definition.kind.clone();
      let current = st.selections.get(id).cloned();
      let previous = st.previous.get(id).cloned().flatten();

      if FacetSelection::same_value(current.as_ref(), previous.as_ref()) {
        debug!(facet = id, "selection unchanged");
        return Ok(st.enabled.clone());
      }

      match kind {
        FacetKind::Timespan { .. } => {
          if let Some(FacetSelection::Timespan(span)) = &current
            && span.is_partial()
          {
            debug!(facet = id, "time span incomplete, not requerying");
            return Ok(st.enabled.clone());
          }
        }
        FacetKind::Text => {}
        FacetKind::Basic | FacetKind::Hierarchy { .. } => {
          if matches!(current, Some(FacetSelection::Collapsed)) {
            debug!(facet = id, "restoring collapsed selection");
            st.restore_collapsed(id, previous);
            return Ok(st.enabled.clone());
          }
        }
      }
    }
    self.update(Some(id)).await
  }

  // ─── Facet set ─────────────────────────────────────────────────────────────

  /// Hide `id` and drop its selection. Always requeries the rest, since
  /// every baseline count may shift.
  pub async fn disable_facet(&self, id: &str) -> Result<EnabledFacets> {
    {
      let mut st = self.state.lock().await;
      let Some(entry) = st.enabled.shift_remove(id) else {
        if st.disabled.contains_key(id) {
          return Ok(st.enabled.clone());
        }
        return Err(Error::UnknownFacet(id.to_owned()));
      };
      st.disabled.insert(id.to_owned(), entry);
      st.selections.shift_remove(id);
      st.previous.shift_remove(id);
      st.refresh_default_count_key();
      st.epoch += 1;
      info!(facet = id, enabled = st.enabled.len(), "facet disabled");
    }
    self.update(None).await
  }

  /// Show `id` again with its last known state and no selection. Text and
  /// timespan facets carry no value yet, so they do not requery.
  pub async fn enable_facet(&self, id: &str) -> Result<EnabledFacets> {
    {
      let mut st = self.state.lock().await;
      let Some(entry) = st.disabled.shift_remove(id) else {
        if st.enabled.contains_key(id) {
          return Ok(st.enabled.clone());
        }
        return Err(Error::UnknownFacet(id.to_owned()));
      };
      let free = entry.definition.kind.is_free();
      st.enabled.insert(id.to_owned(), entry);
      st.previous.insert(id.to_owned(), None);
      st.refresh_default_count_key();
      st.epoch += 1;
      info!(facet = id, enabled = st.enabled.len(), "facet enabled");
      if free {
        return Ok(st.enabled.clone());
      }
    }
    self.update(None).await
  }

  // ─── Update ────────────────────────────────────────────────────────────────

  /// Requery every enabled facet. `pivot` is the facet whose change caused
  /// the update, if any.
  ///
  /// A response superseded by a newer update, failed or not, resolves to the
  /// current state; the newer update reports its own outcome.
  pub async fn update(&self, pivot: Option<&str>) -> Result<EnabledFacets> {
    let mut st = self.state.lock().await;
    if let Some(hook) = &self.on_update {
      hook(&st.selections);
    }

    let mut reissued = false;
    loop {
      let facets = st.facet_map();
      let composed = self.composer.compose(
        &facets,
        &st.selections,
        pivot,
        st.default_count_key.as_deref(),
      );
      let query = match composed {
        Ok(Some(query)) => query,
        other => {
          // A reissued update still owns the loading flag.
          if reissued {
            st.loading = false;
          }
          return other.map(|_| EnabledFacets::new()).map_err(Error::from);
        }
      };

      st.issued += 1;
      st.loading = true;
      let ticket = Ticket {
        generation:        st.issued,
        epoch:             st.epoch,
        selections:        st.selections.clone(),
        default_count_key: st.default_count_key.clone(),
      };
      drop(st);

      let result = self.endpoint.execute(&query).await;

      st = self.state.lock().await;
      if ticket.generation != st.issued {
        warn!(
          generation = ticket.generation,
          latest = st.issued,
          failed = result.is_err(),
          "discarding stale facet results"
        );
        return Ok(st.enabled.clone());
      }
      if ticket.epoch != st.epoch {
        info!(
          generation = ticket.generation,
          "facet set changed while in flight, requerying"
        );
        reissued = true;
        continue;
      }

      st.loading = false;
      let rows = result.map_err(|e| Error::Endpoint(Box::new(e)))?;
      let states = mapper::reconcile(mapper::map_rows(&rows)?);
      st.apply(states, pivot, &ticket);
      info!(
        generation = ticket.generation,
        rows = rows.len(),
        pivot = pivot.unwrap_or("-"),
        "applied facet results"
      );
      return Ok(st.enabled.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn state(values: Vec<FacetValue>) -> FacetState {
    FacetState {
      id: "<f>".into(),
      values,
    }
  }

  #[test]
  fn free_count_sums_valued_rows() {
    let s = state(vec![
      FacetValue::no_selection(50),
      FacetValue::new("\"selection\"", "moon", 3),
    ]);
    let sel = FacetSelection::text("moon");
    assert_eq!(free_facet_count(Some(&s), Some(&sel), 50), 3);
  }

  #[test]
  fn free_count_falls_back_to_baseline_when_empty() {
    let s = state(vec![FacetValue::no_selection(50)]);
    assert_eq!(free_facet_count(Some(&s), None, 42), 42);
    assert_eq!(
      free_facet_count(Some(&s), Some(&FacetSelection::Text(None)), 42),
      42
    );
  }

  #[test]
  fn baseline_reads_the_selected_value_of_the_count_facet() {
    let mut states = IndexMap::new();
    states.insert(
      "<genre>".to_owned(),
      FacetState {
        id:     "<genre>".into(),
        values: vec![
          FacetValue::no_selection(10),
          FacetValue::new("<rock>", "Rock", 6),
        ],
      },
    );
    let mut selections = Selections::new();
    assert_eq!(no_selection_count(&states, &selections, Some("<genre>")), 10);

    selections.insert(
      "<genre>".into(),
      FacetSelection::One(FacetValue::new("<rock>", "Rock", 6)),
    );
    assert_eq!(no_selection_count(&states, &selections, Some("<genre>")), 6);
    assert_eq!(no_selection_count(&states, &selections, None), 0);
  }
}
