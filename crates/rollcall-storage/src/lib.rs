//! Storage abstraction for rollcall.
//!
//! Backend crates (rollcall-store-sqlite, rollcall-store-postgres) implement
//! the [`RegistrantStore`] trait so the server doesn't depend on any specific
//! database engine or schema details.

use thiserror::Error;

mod store;
mod types;

pub use store::RegistrantStore;
#[cfg(feature = "test-support")]
pub use store::MockRegistrantStore;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    /// A conditional update lost a race: the row changed between read and write.
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
