use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::models::{Course, Lecture, LectureRecord};
use crate::portal::CourseList;

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT code, name, last_update FROM courses ORDER BY code")
        .fetch_all(db)
        .await
}

pub async fn find_course_by_code(db: &SqlitePool, code: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT code, name, last_update FROM courses WHERE code = ?")
        .bind(code)
        .fetch_optional(db)
        .await
}

/// Courses whose code is in `codes`; unknown codes are ignored.
pub async fn fetch_courses_by_codes(
    db: &SqlitePool,
    codes: &[String],
) -> Result<Vec<Course>, sqlx::Error> {
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT code, name, last_update FROM courses WHERE code IN ({}) ORDER BY code",
        placeholders(codes.len())
    );
    let mut query = sqlx::query_as::<_, Course>(&sql);
    for code in codes {
        query = query.bind(code);
    }
    query.fetch_all(db).await
}

/// Inserts a never-refreshed course. Returns `false` if the code already exists.
pub async fn create_course_if_absent<'e, E>(
    db: E,
    code: &str,
    name: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO courses (code, name, last_update) VALUES (?, ?, ?) ON CONFLICT(code) DO NOTHING",
    )
    .bind(code)
    .bind(name)
    .bind(DateTime::<Utc>::UNIX_EPOCH)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Adds every course not stored yet. Existing courses keep their name and
/// lectures. Returns how many were inserted.
pub async fn upsert_courses(db: &SqlitePool, courses: &CourseList) -> Result<usize, sqlx::Error> {
    let mut tx = db.begin().await?;
    let mut inserted = 0;

    for (code, name) in courses {
        if create_course_if_absent(&mut *tx, code, name).await? {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn delete_lectures_for_course<'e, E>(db: E, course_code: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM lectures WHERE course_code = ?")
        .bind(course_code)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

pub async fn insert_lecture<'e, E>(
    db: E,
    course_code: &str,
    record: &LectureRecord,
) -> Result<Lecture, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let lecture = Lecture {
        id: record.uid(),
        course_code: course_code.to_string(),
        description: record.description.clone(),
        time_from: record.time_from,
        time_to: record.time_to,
        location: record.location.clone(),
        lecturer: record.lecturer.clone(),
    };

    sqlx::query(
        "INSERT INTO lectures (id, course_code, description, time_from, time_to, location, lecturer) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&lecture.id)
    .bind(&lecture.course_code)
    .bind(&lecture.description)
    .bind(lecture.time_from)
    .bind(lecture.time_to)
    .bind(&lecture.location)
    .bind(&lecture.lecturer)
    .execute(db)
    .await?;

    Ok(lecture)
}

pub async fn touch_course<'e, E>(
    db: E,
    course_code: &str,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE courses SET last_update = ? WHERE code = ?")
        .bind(at)
        .bind(course_code)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Replaces a course's lecture set and stamps its last update, all in one
/// transaction. Any failure leaves the previous set in place.
pub async fn refresh_lectures(
    db: &SqlitePool,
    course_code: &str,
    records: &[LectureRecord],
) -> Result<Vec<Lecture>, sqlx::Error> {
    let mut tx = db.begin().await?;

    let removed = delete_lectures_for_course(&mut *tx, course_code).await?;

    let mut lectures = Vec::with_capacity(records.len());
    for record in records {
        lectures.push(insert_lecture(&mut *tx, course_code, record).await?);
    }

    touch_course(&mut *tx, course_code, Utc::now()).await?;
    tx.commit().await?;

    debug!(
        course = course_code,
        removed,
        inserted = lectures.len(),
        "Replaced lecture set"
    );
    Ok(lectures)
}

pub async fn fetch_lectures_for_courses(
    db: &SqlitePool,
    codes: &[String],
) -> Result<Vec<Lecture>, sqlx::Error> {
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, course_code, description, time_from, time_to, location, lecturer \
         FROM lectures WHERE course_code IN ({}) ORDER BY time_from ASC, description ASC",
        placeholders(codes.len())
    );
    let mut query = sqlx::query_as::<_, Lecture>(&sql);
    for code in codes {
        query = query.bind(code);
    }
    query.fetch_all(db).await
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
