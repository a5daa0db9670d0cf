#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use timeplaner::error::AppError;
use timeplaner::portal::{FormState, PortalTransport};

pub const LIST_URL: &str = "http://portal.test/restrict/no/default.aspx";
pub const SHOW_URL: &str = "http://portal.test/XMLEngine/default.aspx";

pub const LANDING_PAGE: &str = r#"
<html><body>
<form method="post" action="default.aspx">
    <input type="hidden" name="__EVENTTARGET" value="" />
    <input type="hidden" name="__EVENTARGUMENT" value="" />
    <input type="hidden" name="__VIEWSTATE" value="dDwtMTA4MTY2" />
    <a href="javascript:__doPostBack('LinkBtn_modules','')" id="LinkBtn_modules">Emner</a>
</form>
</body></html>
"#;

pub const COURSE_PAGE: &str = r#"
<html><body>
<select name="dlObject" id="dlObject" size="20">
    <option value="TFL115-G Intro">TFL115-G Intro</option>
    <option value="---">---</option>
    <option value="ABC123 Something">ABC123 Something</option>
</select>
</body></html>
"#;

pub const NO_ACTION_PAGE: &str = "<html><body><p>No action taken</p></body></html>";

pub const LECTURE_PAGE: &str = r#"
<html><body><table>
<tr class="tr1"><td>Uke</td><td>Dato</td><td>Tid</td><td>Aktivitet</td><td>Rom</td><td>Lærer</td></tr>
<tr class="tr2"><td>Fre</td><td>18 Nov</td><td>14.15-16.00</td><td>Lecture A</td><td>Room 1</td><td>Smith</td></tr>
<tr class="tr2"><td>Man</td><td>21 Nov</td><td>08.15-10.00</td><td>Lab B</td><td></td><td></td></tr>
</table></body></html>
"#;

/// Scripted portal: every GET of the list URL serves the landing page, each
/// postback serves the next queued page (repeating the last one), and GETs
/// of any other URL serve `show_page`.
pub struct FakePortal {
    postbacks: Vec<String>,
    show_page: Mutex<String>,
    pub gets: AtomicUsize,
    pub posts: AtomicUsize,
    pub last_form: Mutex<Option<FormState>>,
    pub last_url: Mutex<Option<String>>,
}

impl FakePortal {
    pub fn new(postbacks: &[&str], show_page: &str) -> Self {
        Self {
            postbacks: postbacks.iter().map(|p| p.to_string()).collect(),
            show_page: Mutex::new(show_page.to_string()),
            gets: AtomicUsize::new(0),
            posts: AtomicUsize::new(0),
            last_form: Mutex::new(None),
            last_url: Mutex::new(None),
        }
    }

    pub fn set_show_page(&self, page: &str) {
        *self.show_page.lock().unwrap() = page.to_string();
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalTransport for FakePortal {
    async fn get(&self, url: &str) -> Result<String, AppError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.to_string());
        if url == LIST_URL {
            Ok(LANDING_PAGE.to_string())
        } else {
            Ok(self.show_page.lock().unwrap().clone())
        }
    }

    async fn post_form(&self, _url: &str, fields: &FormState) -> Result<String, AppError> {
        let index = self.posts.fetch_add(1, Ordering::SeqCst);
        *self.last_form.lock().unwrap() = Some(fields.clone());
        let page = self
            .postbacks
            .get(index)
            .or_else(|| self.postbacks.last())
            .cloned()
            .unwrap_or_default();
        Ok(page)
    }
}

pub fn test_config() -> timeplaner::portal::PortalConfig {
    use std::time::Duration;
    use timeplaner::portal::{PortalConfig, Semester};

    let mut config = PortalConfig::for_semester(Semester::Autumn, 2016);
    config.list_url = LIST_URL.to_string();
    config.show_url = SHOW_URL.to_string();
    config.settle_delay = Duration::ZERO;
    config
}

/// In-memory database on a single connection, so every query sees the same schema.
pub async fn test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}
