use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::Course;
use crate::portal::{TimetableManager, env_parse};

/// Keeps the local course and lecture cache in step with the portal.
pub struct RefreshService {
    db: SqlitePool,
    manager: Arc<TimetableManager>,
    stale_after: TimeDelta,
}

const DEFAULT_STALE_HOURS: i64 = 48;

/// Builds the stale window from `TIMETABLE_STALE_HOURS` (default 48).
pub fn stale_window_from_env() -> Result<TimeDelta, AppError> {
    stale_window(env_parse::<i64>("TIMETABLE_STALE_HOURS")?.unwrap_or(DEFAULT_STALE_HOURS))
}

pub fn stale_window(hours: i64) -> Result<TimeDelta, AppError> {
    if hours < 0 {
        return Err(AppError::Config(
            "TIMETABLE_STALE_HOURS must not be negative".to_string(),
        ));
    }
    TimeDelta::try_hours(hours).ok_or_else(|| {
        AppError::Config(format!("TIMETABLE_STALE_HOURS is out of range: {}", hours))
    })
}

#[derive(Debug, Serialize)]
pub struct RefreshStats {
    pub course_code: String,
    pub lectures_fetched: usize,
    /// `false` when the portal returned nothing and the cached set was kept.
    pub replaced: bool,
}

impl RefreshService {
    pub fn new(db: SqlitePool, manager: Arc<TimetableManager>, stale_after: TimeDelta) -> Self {
        Self {
            db,
            manager,
            stale_after,
        }
    }

    /// Fills an empty course table from the portal's course list.
    pub async fn seed_courses(&self) -> Result<usize, AppError> {
        if !repository::fetch_courses(&self.db).await?.is_empty() {
            info!("Course table already populated, skipping course list scrape");
            return Ok(0);
        }

        info!("Loading course list from portal...");
        match self.manager.load_courses_retry().await? {
            Some(courses) => {
                let inserted = repository::upsert_courses(&self.db, &courses).await?;
                info!("Stored {} of {} courses", inserted, courses.len());
                Ok(inserted)
            }
            None => {
                warn!(
                    "Portal returned no courses after {} attempts",
                    self.manager.config().retries
                );
                Ok(0)
            }
        }
    }

    /// Refreshes the course if its lectures are older than the stale window.
    pub async fn ensure_fresh(&self, course: &Course) -> Result<Option<RefreshStats>, AppError> {
        if !course.is_stale(Utc::now(), self.stale_after) {
            return Ok(None);
        }

        info!(course = %course.code, last_update = %course.last_update, "Course is stale, refreshing");
        self.refresh_course(&course.code).await.map(Some)
    }

    /// Scrapes a course's lectures and replaces the stored set, unless the
    /// scrape came back empty.
    pub async fn refresh_course(&self, course_code: &str) -> Result<RefreshStats, AppError> {
        repository::find_course_by_code(&self.db, course_code)
            .await?
            .ok_or(AppError::NotFound)?;

        let lectures = self.manager.fetch_lectures(course_code).await?;
        if lectures.is_empty() {
            warn!(course = course_code, "Portal returned no lectures, keeping cached set");
            return Ok(RefreshStats {
                course_code: course_code.to_string(),
                lectures_fetched: 0,
                replaced: false,
            });
        }

        repository::refresh_lectures(&self.db, course_code, &lectures).await?;

        Ok(RefreshStats {
            course_code: course_code.to_string(),
            lectures_fetched: lectures.len(),
            replaced: true,
        })
    }
}
