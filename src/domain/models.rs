use std::{convert::TryFrom, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// JLPT level a word is filed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::N5 => "N5",
            Category::N4 => "N4",
            Category::N3 => "N3",
            Category::N2 => "N2",
            Category::N1 => "N1",
        }
    }

    fn parse_normalized(value: &str) -> Result<Self, CategoryParseError> {
        match value {
            "N5" => Ok(Category::N5),
            "N4" => Ok(Category::N4),
            "N3" => Ok(Category::N3),
            "N2" => Ok(Category::N2),
            "N1" => Ok(Category::N1),
            _ => Err(CategoryParseError::new(value)),
        }
    }
}

impl TryFrom<&str> for Category {
    type Error = CategoryParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        Category::parse_normalized(&normalized)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryParseError {
    value: String,
}

impl CategoryParseError {
    fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl fmt::Display for CategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.value)
    }
}

impl std::error::Error for CategoryParseError {}

/// A vocabulary entry. `pitch` is the index of the accented mora, 0 for flat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    pub id: i32,
    pub tango: String,
    pub yomi: String,
    pub pitch: i32,
    pub definition: String,
    pub pos: String,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyItem {
    pub id: i32,
    pub username: String,
    pub item: Word,
    pub priority: i32,
    pub due: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewStudyItem {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    pub word_id: i32,
    pub due: NaiveDate,
    #[serde(default)]
    pub priority: i32,
}

/// Starts `username` on every word of `category` they are not yet studying.
#[derive(Debug, Clone, Validate)]
pub struct Enrollment {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    pub category: Category,
    pub start: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyItemChanges {
    pub priority: Option<i32>,
    pub due: Option<NaiveDate>,
}

impl StudyItemChanges {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.due.is_none()
    }
}
