mod common;

use std::sync::Arc;

use common::{COURSE_PAGE, FakePortal, LECTURE_PAGE, NO_ACTION_PAGE, SHOW_URL, test_config};
use timeplaner::portal::TimetableManager;

#[tokio::test]
async fn test_course_page_posts_back_landing_form_with_event_target() {
    let portal = Arc::new(FakePortal::new(&[COURSE_PAGE], LECTURE_PAGE));
    let manager = TimetableManager::new(portal.clone(), test_config());

    let page = manager.fetch_course_page().await.expect("sequence should succeed");

    assert!(page.contains("dlObject"));
    assert_eq!(portal.gets(), 1);
    assert_eq!(portal.posts(), 1);

    let form = portal.last_form.lock().unwrap().clone().expect("form was posted");
    assert_eq!(form.get("__EVENTTARGET"), Some("LinkBtn_modules"));
    assert_eq!(form.get("__EVENTARGUMENT"), Some(""));
    assert_eq!(form.get("__VIEWSTATE"), Some("dDwtMTA4MTY2"));
}

#[tokio::test]
async fn test_load_courses_retry_recovers_after_no_action_taken() {
    let portal = Arc::new(FakePortal::new(&[NO_ACTION_PAGE, COURSE_PAGE], LECTURE_PAGE));
    let manager = TimetableManager::new(portal.clone(), test_config());

    let courses = manager
        .load_courses_retry()
        .await
        .expect("transport never fails")
        .expect("second attempt has courses");

    assert_eq!(courses.len(), 2);
    assert_eq!(courses.get("TFL115-G").map(String::as_str), Some("Intro"));
    assert_eq!(portal.gets(), 2);
    assert_eq!(portal.posts(), 2);
}

#[tokio::test]
async fn test_load_courses_retry_gives_up_after_configured_attempts() {
    let portal = Arc::new(FakePortal::new(&[NO_ACTION_PAGE], LECTURE_PAGE));
    let mut config = test_config();
    config.retries = 4;
    let manager = TimetableManager::new(portal.clone(), config);

    let courses = manager.load_courses_retry().await.expect("transport never fails");

    assert!(courses.is_none());
    assert_eq!(portal.gets(), 4);
    assert_eq!(portal.posts(), 4);
}

#[tokio::test]
async fn test_fetch_lectures_requests_course_for_configured_weeks() {
    let portal = Arc::new(FakePortal::new(&[COURSE_PAGE], LECTURE_PAGE));
    let manager = TimetableManager::new(portal.clone(), test_config());

    let lectures = manager.fetch_lectures("DAT100").await.expect("page should parse");

    assert_eq!(lectures.len(), 2);
    assert_eq!(portal.gets(), 1);
    assert_eq!(portal.posts(), 0);

    let weeks = (32..52).map(|w| w.to_string()).collect::<Vec<_>>().join(";");
    let expected = format!("{}?ModuleByWeek&p1=;DAT100;&p2={}", SHOW_URL, weeks);
    assert_eq!(portal.last_url.lock().unwrap().as_deref(), Some(expected.as_str()));
}
