use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
    sync::Arc,
};
use tracing::info;

use crate::{
    domain::{
        models::{Category, Enrollment, NewStudyItem, StudyItem, StudyItemChanges, Word},
        schedule,
    },
    infrastructure::config::VocabularyConfig,
    services::errors::ServiceError,
};

#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    async fn words(&self, category: Option<Category>) -> Result<Vec<Word>, ServiceError>;
    async fn word(&self, id: i32) -> Result<Option<Word>, ServiceError>;
    async fn study_items(
        &self,
        username: &str,
        category: Option<Category>,
    ) -> Result<Vec<StudyItem>, ServiceError>;
    async fn insert_study_item(&self, item: NewStudyItem) -> Result<StudyItem, ServiceError>;
    /// Inserts a study item for each word of the category the user lacks, as one
    /// atomic step. Due dates follow [`schedule::enrollment_due`] over the new items.
    async fn enroll(&self, enrollment: &Enrollment) -> Result<Vec<StudyItem>, ServiceError>;
    async fn update_study_item(
        &self,
        id: i32,
        changes: StudyItemChanges,
    ) -> Result<StudyItem, ServiceError>;
}

pub fn build_repository(config: &VocabularyConfig) -> anyhow::Result<Arc<dyn VocabularyRepository>> {
    let words = match config.seed_path.as_deref() {
        Some(path) => load_seed(path)?,
        None => Vec::new(),
    };
    info!(words = words.len(), "vocabulary repository ready");
    Ok(Arc::new(InMemoryRepository::with_words(words)?))
}

/// Reads a JSON array of words.
pub fn load_seed(path: impl AsRef<Path>) -> anyhow::Result<Vec<Word>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read vocabulary seed {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse vocabulary seed {}", path.display()))
}

#[derive(Default)]
struct Tables {
    words: BTreeMap<i32, Word>,
    study_items: BTreeMap<i32, StudyRecord>,
    next_study_item_id: i32,
}

struct StudyRecord {
    username: String,
    word_id: i32,
    priority: i32,
    due: chrono::NaiveDate,
}

impl Tables {
    fn hydrate(&self, id: i32, record: &StudyRecord) -> Result<StudyItem, ServiceError> {
        let word = self.words.get(&record.word_id).ok_or_else(|| {
            ServiceError::Internal(format!("study item {id} references missing word"))
        })?;
        Ok(StudyItem {
            id,
            username: record.username.clone(),
            item: word.clone(),
            priority: record.priority,
            due: record.due,
        })
    }
}

#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn with_words(words: Vec<Word>) -> anyhow::Result<Self> {
        let mut tables = Tables::default();
        for word in words {
            let id = word.id;
            if tables.words.insert(id, word).is_some() {
                anyhow::bail!("duplicate word id in vocabulary seed: {id}");
            }
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryRepository {
    async fn words(&self, category: Option<Category>) -> Result<Vec<Word>, ServiceError> {
        let tables = self.tables.read();
        Ok(tables
            .words
            .values()
            .filter(|word| category.map_or(true, |c| word.category == c))
            .cloned()
            .collect())
    }

    async fn word(&self, id: i32) -> Result<Option<Word>, ServiceError> {
        Ok(self.tables.read().words.get(&id).cloned())
    }

    async fn study_items(
        &self,
        username: &str,
        category: Option<Category>,
    ) -> Result<Vec<StudyItem>, ServiceError> {
        let tables = self.tables.read();
        let mut items = Vec::new();
        for (id, record) in tables
            .study_items
            .iter()
            .filter(|(_, record)| record.username == username)
        {
            let item = tables.hydrate(*id, record)?;
            if category.map_or(true, |c| item.item.category == c) {
                items.push(item);
            }
        }
        Ok(items)
    }

    async fn insert_study_item(&self, item: NewStudyItem) -> Result<StudyItem, ServiceError> {
        let mut tables = self.tables.write();
        if !tables.words.contains_key(&item.word_id) {
            return Err(ServiceError::NotFound(format!("word {}", item.word_id)));
        }
        let exists = tables
            .study_items
            .values()
            .any(|record| record.username == item.username && record.word_id == item.word_id);
        if exists {
            return Err(ServiceError::Conflict(format!(
                "{} is already studying word {}",
                item.username, item.word_id
            )));
        }

        tables.next_study_item_id += 1;
        let id = tables.next_study_item_id;
        let record = StudyRecord {
            username: item.username,
            word_id: item.word_id,
            priority: item.priority,
            due: item.due,
        };
        let hydrated = tables.hydrate(id, &record)?;
        tables.study_items.insert(id, record);
        Ok(hydrated)
    }

    async fn enroll(&self, enrollment: &Enrollment) -> Result<Vec<StudyItem>, ServiceError> {
        let mut tables = self.tables.write();
        let studying: HashSet<i32> = tables
            .study_items
            .values()
            .filter(|record| record.username == enrollment.username)
            .map(|record| record.word_id)
            .collect();
        let pending: Vec<i32> = tables
            .words
            .values()
            .filter(|word| word.category == enrollment.category && !studying.contains(&word.id))
            .map(|word| word.id)
            .collect();

        let mut created = Vec::with_capacity(pending.len());
        for (index, word_id) in pending.into_iter().enumerate() {
            tables.next_study_item_id += 1;
            let id = tables.next_study_item_id;
            let record = StudyRecord {
                username: enrollment.username.clone(),
                word_id,
                priority: 0,
                due: schedule::enrollment_due(enrollment.start, index),
            };
            created.push(tables.hydrate(id, &record)?);
            tables.study_items.insert(id, record);
        }
        Ok(created)
    }

    async fn update_study_item(
        &self,
        id: i32,
        changes: StudyItemChanges,
    ) -> Result<StudyItem, ServiceError> {
        let mut tables = self.tables.write();
        let Some(record) = tables.study_items.get_mut(&id) else {
            return Err(ServiceError::NotFound(format!("study item {id}")));
        };
        if let Some(priority) = changes.priority {
            record.priority = priority;
        }
        if let Some(due) = changes.due {
            record.due = due;
        }
        let tables = &*tables;
        let record = tables
            .study_items
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("study item {id}")))?;
        tables.hydrate(id, record)
    }
}
