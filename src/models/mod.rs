pub mod course;
pub mod lecture;

pub use course::Course;
pub use lecture::{Lecture, LectureRecord};
