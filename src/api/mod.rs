use axum::Json;
use axum::extract::Path;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use indexmap::IndexSet;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::RefreshStats;
use crate::state::AppState;

/// Refreshing is one portal round trip per stale course, so cap the fan-out.
const MAX_COURSES_PER_REQUEST: usize = 5;

/// Unknown codes are ignored, but every code becomes a bound query parameter.
const MAX_CODES_PER_REQUEST: usize = 50;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/{code}", get(get_course))
        .route("/courses/{code}/lectures", get(list_lectures))
        .route("/courses/{code}/refresh", post(refresh_course))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn get_course(
    State(state): State<AppState>,
    Path(code): Path<String>
) -> Result<Json<Course>, AppError> {
    let course = repository::find_course_by_code(&state.db, &code)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

/// `codes` is a `+`-separated list, e.g. `DAT100+MA-178`.
async fn list_lectures(
    State(state): State<AppState>,
    Path(codes): Path<String>
) -> Result<Json<Vec<Lecture>>, AppError> {
    let codes: IndexSet<String> = codes
        .split('+')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if codes.len() > MAX_CODES_PER_REQUEST {
        return Err(AppError::BadRequest("Too many courses selected".to_string()));
    }
    let codes: Vec<String> = codes.into_iter().collect();

    let courses = repository::fetch_courses_by_codes(&state.db, &codes).await?;
    if courses.len() > MAX_COURSES_PER_REQUEST {
        return Err(AppError::BadRequest("Too many courses selected".to_string()));
    }

    let service = state.refresh_service();
    for course in &courses {
        service.ensure_fresh(course).await?;
    }

    let known: Vec<String> = courses.into_iter().map(|c| c.code).collect();
    let lectures = repository::fetch_lectures_for_courses(&state.db, &known).await?;
    Ok(Json(lectures))
}

async fn refresh_course(
    State(state): State<AppState>,
    Path(code): Path<String>
) -> Result<Json<RefreshStats>, AppError> {
    let stats = state.refresh_service().refresh_course(&code).await?;
    Ok(Json(stats))
}
