//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use uuid::Uuid;

/// Registrant identifier. Assigned once on first creation, immutable after.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrantId(pub Uuid);
