//! Type definitions for rollcall storage.

mod ids;
mod registrants;

pub use ids::*;
pub use registrants::*;
