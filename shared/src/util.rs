use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Current UTC time truncated to microseconds (PostgreSQL TIMESTAMPTZ precision),
/// so values read back from the store compare equal to the ones written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Generate a new random resource id.
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}

/// Treat `Uuid::nil()` as "no id supplied".
///
/// Input payloads carry plain `Uuid` fields; an all-zero value means the
/// client left the field empty.
pub fn non_nil(id: Uuid) -> Option<Uuid> {
    if id.is_nil() { None } else { Some(id) }
}
