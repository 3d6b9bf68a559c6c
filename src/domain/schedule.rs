use chrono::{Days, NaiveDate};

use crate::domain::models::StudyItem;

/// Number of newly enrolled words introduced per day.
pub const DAILY_BATCH: usize = 20;

/// Due date for the `index`-th word of a fresh enrollment starting on `start`.
/// Every block of [`DAILY_BATCH`] words is pushed back one more day.
pub fn enrollment_due(start: NaiveDate, index: usize) -> NaiveDate {
    let offset = (index / DAILY_BATCH) as u64;
    start.checked_add_days(Days::new(offset)).unwrap_or(NaiveDate::MAX)
}

pub fn is_due(item: &StudyItem, on: NaiveDate) -> bool {
    item.due <= on
}

/// Keeps items due on or before `on`, earliest first, then highest priority.
pub fn due_items(mut items: Vec<StudyItem>, on: NaiveDate) -> Vec<StudyItem> {
    items.retain(|item| is_due(item, on));
    items.sort_by(|a, b| {
        a.due
            .cmp(&b.due)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.id.cmp(&b.id))
    });
    items
}
