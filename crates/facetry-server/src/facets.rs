//! Handlers for `/facets` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/facets` | Enabled facets with their candidate lists |
//! | `GET`  | `/facets/disabled` | Disabled definitions |
//! | `GET`  | `/facets/values` | `?id` required; optional `text` narrows by label |
//! | `POST` | `/facets/update` | Body: `{"pivot": id?}` |
//! | `POST` | `/facets/change` | Body: [`ChangeBody`] |
//! | `POST` | `/facets/enable` | Body: `{"id": id}` |
//! | `POST` | `/facets/disable` | Body: `{"id": id}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use facetry_core::{
  definition::FacetDefinition,
  endpoint::Endpoint,
  selection::FacetSelection,
  value::{FacetValue, filter_values},
};
use facetry_engine::{EnabledFacets, FacetHandler};
use serde::Deserialize;

use crate::error::ApiError;

type Handler<E> = State<Arc<FacetHandler<E>>>;

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /facets`
pub async fn list<E: Endpoint>(State(handler): Handler<E>) -> Json<EnabledFacets> {
  Json(handler.enabled().await)
}

/// `GET /facets/disabled`
pub async fn disabled<E: Endpoint>(State(handler): Handler<E>) -> Json<Vec<FacetDefinition>> {
  Json(handler.disabled().await)
}

#[derive(Debug, Deserialize)]
pub struct ValuesParams {
  pub id:   String,
  #[serde(default)]
  pub text: String,
}

/// `GET /facets/values?id=<id>[&text=...]`
///
/// The facet's current candidates, narrowed by label. The selected values
/// and the no-selection entry are always kept.
pub async fn values<E: Endpoint>(
  State(handler): Handler<E>,
  Query(params): Query<ValuesParams>,
) -> Result<Json<Vec<FacetValue>>, ApiError> {
  let enabled = handler.enabled().await;
  let entry = enabled
    .get(&params.id)
    .ok_or_else(|| ApiError::NotFound(format!("facet {} not found", params.id)))?;
  let selections = handler.selections().await;

  let values = entry
    .state
    .as_ref()
    .map(|state| {
      filter_values(&state.values, &params.text, selections.get(&params.id))
        .into_iter()
        .cloned()
        .collect()
    })
    .unwrap_or_default();
  Ok(Json(values))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub pivot: Option<String>,
}

/// `POST /facets/update`
pub async fn update<E: Endpoint>(
  State(handler): Handler<E>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<EnabledFacets>, ApiError> {
  Ok(Json(handler.update(body.pivot.as_deref()).await?))
}

// ─── Change ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /facets/change`.
///
/// A `null` selection clears the facet. Send `{"kind": "collapsed"}` when
/// another facet's change removed this facet's selected value.
#[derive(Debug, Deserialize)]
pub struct ChangeBody {
  pub id:        String,
  #[serde(default)]
  pub selection: Option<FacetSelection>,
}

/// `POST /facets/change`
pub async fn change<E: Endpoint>(
  State(handler): Handler<E>,
  Json(body): Json<ChangeBody>,
) -> Result<Json<EnabledFacets>, ApiError> {
  handler.set_selection(&body.id, body.selection).await?;
  Ok(Json(handler.facet_changed(&body.id).await?))
}

// ─── Enable / disable ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IdBody {
  pub id: String,
}

/// `POST /facets/enable`
pub async fn enable<E: Endpoint>(
  State(handler): Handler<E>,
  Json(body): Json<IdBody>,
) -> Result<Json<EnabledFacets>, ApiError> {
  Ok(Json(handler.enable_facet(&body.id).await?))
}

/// `POST /facets/disable`
pub async fn disable<E: Endpoint>(
  State(handler): Handler<E>,
  Json(body): Json<IdBody>,
) -> Result<Json<EnabledFacets>, ApiError> {
  Ok(Json(handler.disable_facet(&body.id).await?))
}
