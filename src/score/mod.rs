use rocket::serde::{Deserialize, Serialize};

mod key;
pub(crate) mod lenient;
mod merge;

pub use key::{canonical_key, display_name};

/// Best times are stored as plain numbers; lower is faster.
pub type CourseTime = f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Desktop,
}

impl Device {
    /// Anything other than `mobile` counts as a desktop.
    pub fn from_input(input: Option<&str>) -> Self {
        match input {
            Some("mobile") => Self::Mobile,
            _ => Self::Desktop,
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Desktop
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Course {
    C1,
    C2,
    C3,
    C4,
    C5,
}

impl Course {
    pub const ALL: [Course; 5] = [Self::C1, Self::C2, Self::C3, Self::C4, Self::C5];

    pub fn field(self) -> &'static str {
        match self {
            Self::C1 => "c1",
            Self::C2 => "c2",
            Self::C3 => "c3",
            Self::C4 => "c4",
            Self::C5 => "c5",
        }
    }

    /// Parses the `course` query parameter, falling back to `c1`.
    pub fn from_query(input: Option<&str>) -> Self {
        input
            .and_then(|input| Self::ALL.iter().copied().find(|course| course.field() == input))
            .unwrap_or(Self::C1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Only `desc` sorts descending.
    pub fn from_query(input: Option<&str>) -> Self {
        match input {
            Some("desc") => Self::Descending,
            _ => Self::Ascending,
        }
    }
}

/// Best time per course. A course is `None` until a time was submitted for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CourseTimes {
    #[serde(default, deserialize_with = "lenient::time", skip_serializing_if = "Option::is_none")]
    pub c1: Option<CourseTime>,
    #[serde(default, deserialize_with = "lenient::time", skip_serializing_if = "Option::is_none")]
    pub c2: Option<CourseTime>,
    #[serde(default, deserialize_with = "lenient::time", skip_serializing_if = "Option::is_none")]
    pub c3: Option<CourseTime>,
    #[serde(default, deserialize_with = "lenient::time", skip_serializing_if = "Option::is_none")]
    pub c4: Option<CourseTime>,
    #[serde(default, deserialize_with = "lenient::time", skip_serializing_if = "Option::is_none")]
    pub c5: Option<CourseTime>,
}

impl CourseTimes {
    pub fn get(&self, course: Course) -> Option<CourseTime> {
        match course {
            Course::C1 => self.c1,
            Course::C2 => self.c2,
            Course::C3 => self.c3,
            Course::C4 => self.c4,
            Course::C5 => self.c5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScoreRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::device")]
    pub device: Device,
    #[serde(rename = "updatedAt", default, deserialize_with = "lenient::millis")]
    pub updated_at: i64,
    #[serde(flatten)]
    pub times: CourseTimes,
}

/// A validated submission, ready to be merged into the stored record.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub key: String,
    pub name: String,
    pub device: Device,
    pub times: CourseTimes,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    #[error("name is required")]
    MissingName,
    #[error("name must contain at least one letter or digit")]
    UnkeyableName,
}

impl Submission {
    pub fn new(name: &str, device: Device, times: CourseTimes) -> Result<Self, SubmissionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SubmissionError::MissingName);
        }

        // The key comes from the whole name; only the display name is capped
        let key = canonical_key(name);
        if key.is_empty() {
            return Err(SubmissionError::UnkeyableName);
        }

        Ok(Self {
            key,
            name: display_name(name),
            device,
            times,
        })
    }
}
