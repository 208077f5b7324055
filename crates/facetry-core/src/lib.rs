//! Core types and trait definitions for Facetry.
//!
//! This crate is deliberately free of HTTP and query-text dependencies.
//! Every other crate depends on it: the facet data model, selection
//! equality, initial-value seeds, and the [`endpoint::Endpoint`] seam live
//! here.

pub mod definition;
pub mod endpoint;
pub mod error;
pub mod selection;
pub mod value;

pub use error::{Error, Result};
