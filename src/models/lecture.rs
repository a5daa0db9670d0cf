use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored lecture row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Lecture {
    pub id: String,
    pub course_code: String,
    pub description: String,
    pub time_from: NaiveDateTime,
    pub time_to: NaiveDateTime,
    pub location: Option<String>,
    pub lecturer: Option<String>,
}

/// A lecture as scraped from the portal, before it is attached to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureRecord {
    pub description: String,
    pub time_from: NaiveDateTime,
    pub time_to: NaiveDateTime,
    pub location: Option<String>,
    pub lecturer: Option<String>,
}

impl LectureRecord {
    /// Identifier derived from description and start time, so unchanged
    /// source data keeps its id across refreshes. Two lectures sharing both
    /// fields collide.
    pub fn uid(&self) -> String {
        let name = format!(
            "{}\u{1f}{}",
            self.description,
            self.time_from.format("%Y-%m-%dT%H:%M")
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }
}
