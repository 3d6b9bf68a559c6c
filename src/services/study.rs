use std::{convert::TryFrom, sync::Arc};

use chrono::NaiveDate;
use tracing::info;
use validator::Validate;

use crate::{
    domain::{
        models::{Category, Enrollment, NewStudyItem, StudyItem, StudyItemChanges, Word},
        schedule,
    },
    infrastructure::repository::VocabularyRepository,
};

use super::errors::ServiceError;

/// Vocabulary and study-list operations exposed through the GraphQL schema.
#[derive(Clone)]
pub struct StudyService {
    repository: Arc<dyn VocabularyRepository>,
}

impl StudyService {
    pub fn new(repository: Arc<dyn VocabularyRepository>) -> Self {
        Self { repository }
    }

    pub async fn words(&self, category: Option<&str>) -> Result<Vec<Word>, ServiceError> {
        let category = parse_category(category)?;
        self.repository.words(category).await
    }

    pub async fn word(&self, id: i32) -> Result<Option<Word>, ServiceError> {
        self.repository.word(id).await
    }

    pub async fn study_items(
        &self,
        username: &str,
        category: Option<&str>,
    ) -> Result<Vec<StudyItem>, ServiceError> {
        let category = parse_category(category)?;
        self.repository.study_items(username, category).await
    }

    pub async fn due_study_items(
        &self,
        username: &str,
        category: Option<&str>,
        on: NaiveDate,
    ) -> Result<Vec<StudyItem>, ServiceError> {
        let items = self.study_items(username, category).await?;
        Ok(schedule::due_items(items, on))
    }

    pub async fn create_study_item(&self, item: NewStudyItem) -> Result<StudyItem, ServiceError> {
        item.validate()?;
        let created = self.repository.insert_study_item(item).await?;
        info!(
            study_item = created.id,
            username = %created.username,
            word = created.item.id,
            "study item created"
        );
        Ok(created)
    }

    pub async fn update_study_item(
        &self,
        id: i32,
        changes: StudyItemChanges,
    ) -> Result<StudyItem, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::Validation(
                "at least one of priority or due must be provided".into(),
            ));
        }
        self.repository.update_study_item(id, changes).await
    }

    /// Starts `username` on every word of `category` they are not yet studying.
    pub async fn enroll_category(
        &self,
        username: &str,
        category: &str,
        start: NaiveDate,
    ) -> Result<Vec<StudyItem>, ServiceError> {
        let category = Category::try_from(category)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        let enrollment = Enrollment {
            username: username.to_string(),
            category,
            start,
        };
        enrollment.validate()?;
        let created = self.repository.enroll(&enrollment).await?;
        info!(%username, %category, enrolled = created.len(), "category enrollment");
        Ok(created)
    }
}

fn parse_category(category: Option<&str>) -> Result<Option<Category>, ServiceError> {
    category
        .map(Category::try_from)
        .transpose()
        .map_err(|err| ServiceError::Validation(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repository::InMemoryRepository;

    fn words(count: i32, category: Category) -> Vec<Word> {
        (1..=count)
            .map(|id| Word {
                id,
                tango: format!("語{id}"),
                yomi: "ご".into(),
                pitch: 0,
                definition: "word".into(),
                pos: "noun".into(),
                category,
            })
            .collect()
    }

    fn service(words: Vec<Word>) -> StudyService {
        StudyService::new(Arc::new(InMemoryRepository::with_words(words).unwrap()))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn unknown_category_is_a_validation_error() {
        let service = service(words(1, Category::N5));

        let err = service.words(Some("N9")).await.unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn create_validates_username() {
        let service = service(words(1, Category::N5));

        let err = service
            .create_study_item(NewStudyItem {
                username: String::new(),
                word_id: 1,
                due: date(1),
                priority: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn enrollment_spreads_words_over_days_and_skips_existing() {
        let service = service(words(45, Category::N5));
        service
            .create_study_item(NewStudyItem {
                username: "hana".into(),
                word_id: 1,
                due: date(1),
                priority: 0,
            })
            .await
            .unwrap();

        let created = service.enroll_category("hana", "n5", date(10)).await.unwrap();

        assert_eq!(created.len(), 44);
        assert!(created.iter().all(|item| item.item.id != 1));
        assert_eq!(created[0].due, date(10));
        assert_eq!(created[19].due, date(10));
        assert_eq!(created[20].due, date(11));
        assert_eq!(created[43].due, date(12));

        let again = service.enroll_category("hana", "N5", date(10)).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn enrollment_validates_before_touching_the_repository() {
        let service = service(words(3, Category::N5));

        let blank = service.enroll_category("", "N5", date(1)).await.unwrap_err();
        let unknown = service.enroll_category("hana", "N0", date(1)).await.unwrap_err();

        assert!(matches!(blank, ServiceError::Validation(_)));
        assert!(matches!(unknown, ServiceError::Validation(_)));
        assert!(service.study_items("", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn due_items_respect_the_cutoff() {
        let service = service(words(30, Category::N4));
        service.enroll_category("hana", "N4", date(1)).await.unwrap();

        let today = service.due_study_items("hana", Some("N4"), date(1)).await.unwrap();
        let tomorrow = service.due_study_items("hana", None, date(2)).await.unwrap();

        assert_eq!(today.len(), 20);
        assert_eq!(tomorrow.len(), 30);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let service = service(words(1, Category::N5));

        let err = service
            .update_study_item(1, StudyItemChanges::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
