//! Query synthesis for Facetry.
//!
//! - [`format`] turns a selection map into constraint patterns.
//! - [`template`] holds the parameterized query skeletons.
//! - [`compose`] assembles the single aggregate facet query per update.

pub mod compose;
pub mod error;
pub mod format;
pub mod template;

pub use compose::{Composer, FREE_FACET_SENTINEL, QueryOptions};
pub use error::{Error, Result};
pub use format::format_selections;
