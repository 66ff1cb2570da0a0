//! Registrant record types.

use chrono::{DateTime, Utc};

use super::RegistrantId;

/// An outstanding one-time code and its expiry.
///
/// The two always travel together: a row can't have an expiry without a
/// code or a code without an expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingToken {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingToken {
    /// Whether the code is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Registrant record, one row per unique normalized email.
#[derive(Clone, Debug)]
pub struct Registrant {
    pub id: RegistrantId,
    pub email: String,
    /// The active one-time code, or `None` when no issuance is pending.
    pub token: Option<PendingToken>,
    /// Monotonic false→true; never reverts.
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating/refreshing a registrant.
#[derive(Clone, Debug)]
pub struct UpsertRegistrantParams {
    /// Email being verified (already trimmed and lowercased).
    pub email: String,
    /// Freshly generated one-time code.
    pub code: String,
    /// When the code stops being valid.
    pub expires_at: DateTime<Utc>,
}
