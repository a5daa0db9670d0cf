use std::sync::LazyLock;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::AppError;
use crate::models::LectureRecord;

/// Course code to course name, in the order the portal lists them.
pub type CourseList = IndexMap<String, String>;

static COURSE_OPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#dlObject option").unwrap());
static LECTURE_ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr.tr2").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

// Codes look like "DAT100", "TFL115-G" or "ME-102-1"; headings and
// separators in the same select box don't.
static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{1,3}-?[0-9]{3}-?[1G]?").unwrap());

const LECTURE_TIME_FORMAT: &str = "%d %b %Y %H.%M";
const LECTURE_CELLS: usize = 6;

/// Extracts the course select box from the course list view.
pub fn parse_courses(html: &str) -> CourseList {
    let document = Html::parse_document(html);
    let mut courses = CourseList::new();

    for option in document.select(&COURSE_OPTION_SEL) {
        let value = option.value().attr("value").unwrap_or("");
        let Some(code) = COURSE_CODE_RE.find(value) else {
            continue;
        };

        // Display text is "<code> <name>".
        let text = option.text().collect::<String>();
        let name = text.trim().split(' ').skip(1).collect::<Vec<_>>().join(" ");

        courses.insert(code.as_str().to_string(), name);
    }

    courses
}

/// Parses the `tr.tr2` rows of a course's week view.
///
/// Cells are: (unused), `"18 Nov"`, `"14.15-16.00"`, description, location,
/// lecturer. A row missing any of them is treated as a markup change and
/// fails the whole page.
pub fn parse_lectures(html: &str, year: i32) -> Result<Vec<LectureRecord>, AppError> {
    let document = Html::parse_document(html);
    let mut lectures = Vec::new();

    for (index, row) in document.select(&LECTURE_ROW_SEL).enumerate() {
        let cells: Vec<String> = row
            .select(&CELL_SEL)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if cells.len() < LECTURE_CELLS {
            return Err(AppError::Parse(format!(
                "lecture row {} has {} cells, expected {}",
                index,
                cells.len(),
                LECTURE_CELLS
            )));
        }

        let date = normalize_month(&cells[1]);
        let (start, end) = cells[2].split_once('-').ok_or_else(|| {
            AppError::Parse(format!("lecture row {} has no time range: {:?}", index, cells[2]))
        })?;

        lectures.push(LectureRecord {
            description: cells[3].clone(),
            time_from: parse_lecture_time(&date, year, start)?,
            time_to: parse_lecture_time(&date, year, end)?,
            location: non_empty(&cells[4]),
            lecturer: non_empty(&cells[5]),
        });
    }

    Ok(lectures)
}

fn parse_lecture_time(date: &str, year: i32, time: &str) -> Result<NaiveDateTime, AppError> {
    let raw = format!("{} {} {}", date, year, time.trim());
    NaiveDateTime::parse_from_str(&raw, LECTURE_TIME_FORMAT)
        .map_err(|e| AppError::Parse(format!("invalid lecture time {:?}: {}", raw, e)))
}

/// Maps the Norwegian month abbreviations that differ from English.
fn normalize_month(date: &str) -> String {
    date.split_whitespace()
        .map(|part| {
            let part = part.trim_end_matches('.');
            match part.to_lowercase().as_str() {
                "mai" => "May".to_string(),
                "okt" => "Oct".to_string(),
                "des" => "Dec".to_string(),
                _ => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}
