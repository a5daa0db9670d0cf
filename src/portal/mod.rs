pub mod form;
pub mod manager;
pub mod parse;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Local};
use reqwest::Client;

use crate::error::AppError;

pub use form::{FormState, extract_form_state};
pub use manager::TimetableManager;
pub use parse::{CourseList, parse_courses, parse_lectures};

/// Teaching term; each one is served by its own portal instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Semester {
    Spring,
    Autumn,
}

impl Semester {
    pub fn weeks(self) -> Vec<u32> {
        match self {
            Semester::Spring => (0..33).collect(),
            Semester::Autumn => (32..52).collect(),
        }
    }

    pub fn list_url(self) -> &'static str {
        match self {
            Semester::Spring => "http://timeplan.uia.no/swsuiav/restrict/no/default.aspx",
            Semester::Autumn => "http://timeplan.uia.no/swsuiah/restrict/no/default.aspx",
        }
    }

    pub fn show_url(self) -> &'static str {
        match self {
            Semester::Spring => "http://timeplan.uia.no/swsuiav/XMLEngine/default.aspx",
            Semester::Autumn => "http://timeplan.uia.no/swsuiah/XMLEngine/default.aspx",
        }
    }
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spring" | "var" | "vår" => Ok(Semester::Spring),
            "autumn" | "fall" | "host" | "høst" => Ok(Semester::Autumn),
            other => Err(format!("unknown semester '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    /// The portal only prints day and month, so the year comes from here.
    pub year: i32,
    pub weeks: Vec<u32>,
    pub list_url: String,
    pub show_url: String,
    /// Course list attempts before giving up.
    pub retries: u32,
    /// Pause between the landing GET and the postback, doubled on each retry.
    pub settle_delay: Duration,
}

impl PortalConfig {
    pub fn for_semester(semester: Semester, year: i32) -> Self {
        Self {
            year,
            weeks: semester.weeks(),
            list_url: semester.list_url().to_string(),
            show_url: semester.show_url().to_string(),
            retries: 3,
            settle_delay: Duration::from_secs(2),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let semester = env_parse::<Semester>("TIMETABLE_SEMESTER")?.unwrap_or(Semester::Autumn);
        let year = env_parse::<i32>("TIMETABLE_YEAR")?.unwrap_or_else(|| Local::now().year());

        let mut config = Self::for_semester(semester, year);

        if let Ok(url) = env::var("TIMETABLE_LIST_URL") {
            config.list_url = url;
        }
        if let Ok(url) = env::var("TIMETABLE_SHOW_URL") {
            config.show_url = url;
        }
        if let Some(retries) = env_parse::<u32>("TIMETABLE_RETRIES")? {
            if retries == 0 {
                return Err(AppError::Config("TIMETABLE_RETRIES must be at least 1".to_string()));
            }
            config.retries = retries;
        }
        if let Some(millis) = env_parse::<u64>("TIMETABLE_SETTLE_MS")? {
            config.settle_delay = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Week numbers in the `;`-separated form the show page expects.
    pub fn week_list(&self) -> String {
        self.weeks
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Reads an optional environment variable, failing only when it is set but unparsable.
pub fn env_parse<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} is invalid: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Network seam between the loaders and the portal. Implementations must keep
/// session cookies between calls, since the postback only works inside the
/// session opened by the preceding GET.
#[async_trait]
pub trait PortalTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, AppError>;
    async fn post_form(&self, url: &str, fields: &FormState) -> Result<String, AppError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PortalTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn post_form(&self, url: &str, fields: &FormState) -> Result<String, AppError> {
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
