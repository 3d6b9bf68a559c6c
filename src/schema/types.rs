use async_graphql::{InputValueError, InputValueResult, Object, Scalar, ScalarType, SimpleObject, Value};
use chrono::NaiveDate;

use crate::domain::models::{StudyItem, Word};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar date serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date(pub NaiveDate);

#[Scalar(name = "Date")]
impl ScalarType for Date {
    fn parse(value: Value) -> InputValueResult<Self> {
        match &value {
            Value::String(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Date)
                .map_err(|_| InputValueError::custom(format!("invalid date: {raw}"))),
            _ => Err(InputValueError::expected_type(value)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.format(DATE_FORMAT).to_string())
    }
}

impl From<NaiveDate> for Date {
    fn from(value: NaiveDate) -> Self {
        Date(value)
    }
}

/// The user the current request was authenticated as, if any.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<String>);

#[Object]
impl Word {
    async fn id(&self) -> i32 {
        self.id
    }

    async fn tango(&self) -> &str {
        &self.tango
    }

    async fn yomi(&self) -> &str {
        &self.yomi
    }

    /// Index of the accented mora; 0 means flat (heiban).
    async fn pitch(&self) -> i32 {
        self.pitch
    }

    async fn definition(&self) -> &str {
        &self.definition
    }

    async fn pos(&self) -> &str {
        &self.pos
    }

    async fn category(&self) -> &str {
        self.category.as_str()
    }
}

#[Object]
impl StudyItem {
    async fn id(&self) -> i32 {
        self.id
    }

    async fn username(&self) -> &str {
        &self.username
    }

    async fn item(&self) -> &Word {
        &self.item
    }

    async fn priority(&self) -> i32 {
        self.priority
    }

    async fn due(&self) -> Date {
        Date(self.due)
    }
}

#[derive(SimpleObject)]
pub struct CreateStudyItem {
    pub ok: bool,
    pub study_item: Option<StudyItem>,
}

#[derive(SimpleObject)]
pub struct UpdateStudyItem {
    pub ok: bool,
    pub study_item: Option<StudyItem>,
}

#[derive(SimpleObject)]
pub struct EnrollCategory {
    pub ok: bool,
    pub study_items: Vec<StudyItem>,
}
