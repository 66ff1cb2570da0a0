//! The RegistrantStore trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// Durable mapping from normalized email to a registrant record.
///
/// All operations take emails that the caller has already trimmed and
/// lowercased; the store never normalizes.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait RegistrantStore: Send + Sync {
    /// Create or refresh the registrant for an email in a single statement.
    ///
    /// A missing row is created with a fresh id, `verified = false` and the
    /// given pending token. An existing row has only its token (code +
    /// expiry) replaced; `id`, `created_at` and `verified` are untouched.
    /// The returned flag is `true` when the call created the row.
    async fn upsert_registrant(
        &self,
        params: &UpsertRegistrantParams,
    ) -> Result<(Registrant, bool), StoreError>;

    /// Get the registrant for an email.
    async fn get_registrant_by_email(&self, email: &str) -> Result<Registrant, StoreError>;

    /// Mark a registrant verified and clear its token, but only if the
    /// stored code still equals `expected_token`.
    ///
    /// The check and the write are one conditional UPDATE, so a code that
    /// was concurrently replaced by a resend can never be accepted. Returns
    /// `StoreError::Conflict` when the token no longer matches (replaced or
    /// already cleared) and `StoreError::NotFound` when no row exists.
    async fn mark_verified(&self, email: &str, expected_token: &str) -> Result<(), StoreError>;

    /// Clear all tokens whose expiry has passed (the rows themselves are
    /// kept). Returns the number of rows touched.
    async fn cleanup_expired_tokens(&self) -> Result<u64, StoreError>;
}
