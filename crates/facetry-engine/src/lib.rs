//! Facet state coordination for Facetry.
//!
//! [`FacetHandler`] owns the enabled and disabled facet sets, the current
//! and previously committed selections, and the per-facet candidate lists.
//! Each update composes one query, runs it against an
//! [`Endpoint`](facetry_core::endpoint::Endpoint), and maps the rows back
//! into [`FacetState`](facetry_core::value::FacetState)s.

pub mod error;
pub mod handler;
pub mod mapper;


pub use error::{Error, Result};
pub use handler::{EnabledFacets, FacetEntry, FacetHandler, FacetStatus, HandlerOptions};
