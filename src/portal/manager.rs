use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::LectureRecord;
use crate::portal::{
    CourseList, PortalConfig, PortalTransport, extract_form_state, parse_courses, parse_lectures,
};

/// The link on the landing page that switches to the course list view.
const COURSE_LIST_EVENT_TARGET: &str = "LinkBtn_modules";

/// Shown by the portal when a postback arrives before its session is ready.
const NO_ACTION_MARKER: &str = "no action taken";

/// Drives the timetable portal through one cookie-backed session.
pub struct TimetableManager {
    transport: Arc<dyn PortalTransport>,
    config: PortalConfig,
    weeks: String,
}

impl TimetableManager {
    pub fn new(transport: Arc<dyn PortalTransport>, config: PortalConfig) -> Self {
        let weeks = config.week_list();
        Self {
            transport,
            config,
            weeks,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Returns the raw course list page: GET the landing page, then post its
    /// form back with the event target of the course list link.
    pub async fn fetch_course_page(&self) -> Result<String, AppError> {
        self.fetch_course_page_after(self.config.settle_delay).await
    }

    async fn fetch_course_page_after(&self, settle: Duration) -> Result<String, AppError> {
        let landing = self.transport.get(&self.config.list_url).await?;

        let mut fields = extract_form_state(&landing);
        debug!(fields = fields.len(), "Extracted landing page form state");
        if fields.get("__VIEWSTATE").is_none() {
            warn!("Landing page has no __VIEWSTATE, postback will likely be ignored");
        }

        fields.set("__EVENTTARGET", COURSE_LIST_EVENT_TARGET);
        fields.set("__EVENTARGUMENT", "");

        // Posting right after the GET races the portal persisting the new session.
        tokio::time::sleep(settle).await;

        let page = self.transport.post_form(&self.config.list_url, &fields).await?;
        if page.to_lowercase().contains(NO_ACTION_MARKER) {
            warn!("Portal answered \"{}\"", NO_ACTION_MARKER);
        }

        Ok(page)
    }

    /// One pass of the course list sequence. May legitimately come back empty.
    pub async fn load_courses(&self) -> Result<CourseList, AppError> {
        self.load_courses_after(self.config.settle_delay).await
    }

    async fn load_courses_after(&self, settle: Duration) -> Result<CourseList, AppError> {
        let page = self.fetch_course_page_after(settle).await?;
        Ok(parse_courses(&page))
    }

    /// Repeats the course list sequence until it yields courses, at most
    /// `retries` times. `Ok(None)` means every attempt came back empty.
    pub async fn load_courses_retry(&self) -> Result<Option<CourseList>, AppError> {
        for attempt in 0..self.config.retries {
            let settle = self
                .config
                .settle_delay
                .saturating_mul(1u32 << attempt.min(16));

            let courses = self.load_courses_after(settle).await?;
            if !courses.is_empty() {
                info!(
                    count = courses.len(),
                    attempt = attempt + 1,
                    "Loaded course list from portal"
                );
                return Ok(Some(courses));
            }

            warn!(
                attempt = attempt + 1,
                retries = self.config.retries,
                "Course list came back empty"
            );
        }

        Ok(None)
    }

    pub fn lectures_url(&self, course_code: &str) -> String {
        format!(
            "{}?ModuleByWeek&p1=;{};&p2={}",
            self.config.show_url, course_code, self.weeks
        )
    }

    /// Loads every lecture of a course over the configured weeks.
    pub async fn fetch_lectures(&self, course_code: &str) -> Result<Vec<LectureRecord>, AppError> {
        let page = self.transport.get(&self.lectures_url(course_code)).await?;
        let lectures = parse_lectures(&page, self.config.year)?;

        info!(
            course = course_code,
            count = lectures.len(),
            "Loaded lectures from portal"
        );
        Ok(lectures)
    }
}
