use std::sync::Arc;

use chrono::TimeDelta;
use sqlx::SqlitePool;

use crate::portal::TimetableManager;
use crate::services::RefreshService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub manager: Arc<TimetableManager>,
    /// How old a course's lectures may get before a request triggers a refresh.
    pub stale_after: TimeDelta,
}

impl AppState {
    pub fn refresh_service(&self) -> RefreshService {
        RefreshService::new(self.db.clone(), self.manager.clone(), self.stale_after)
    }
}
