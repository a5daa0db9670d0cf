use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub code: String,
    pub name: String,
    /// `DateTime::UNIX_EPOCH` until the first successful lecture refresh.
    pub last_update: DateTime<Utc>,
}

impl Course {
    /// A window reaching past the representable range never expires.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
        match now.checked_sub_signed(max_age) {
            Some(cutoff) => self.last_update < cutoff,
            None => false,
        }
    }
}
