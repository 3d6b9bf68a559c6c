//! Vocabulary study graph served at `/graphql`.

use std::sync::Arc;

use async_graphql::{EmptySubscription, Schema};

use crate::{infrastructure::repository::VocabularyRepository, services::study::StudyService};

pub mod mutation;
pub mod query;
pub mod types;

pub use self::{mutation::MutationRoot, query::QueryRoot, types::Viewer};

pub type KakiSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(repository: Arc<dyn VocabularyRepository>) -> KakiSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(StudyService::new(repository))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::models::{Category, Word},
        infrastructure::repository::InMemoryRepository,
    };
    use async_graphql::{value, Request};

    fn schema() -> KakiSchema {
        let words = vec![Word {
            id: 1,
            tango: "箸".into(),
            yomi: "はし".into(),
            pitch: 1,
            definition: "chopsticks".into(),
            pos: "noun".into(),
            category: Category::N5,
        }];
        build_schema(Arc::new(InMemoryRepository::with_words(words).unwrap()))
    }

    #[tokio::test]
    async fn typename_resolves_to_query() {
        let response = schema().execute("{ __typename }").await;

        assert!(response.errors.is_empty());
        assert_eq!(response.data, value!({ "__typename": "Query" }));
    }

    #[tokio::test]
    async fn create_then_list_study_items() {
        let schema = schema();
        let created = schema
            .execute(
                r#"mutation { createStudyItem(username: "hana", tangoId: 1, due: "2024-01-02") {
                    ok studyItem { priority due item { tango pitch } } } }"#,
            )
            .await;
        assert!(created.errors.is_empty(), "{:?}", created.errors);
        assert_eq!(
            created.data,
            value!({ "createStudyItem": { "ok": true, "studyItem": {
                "priority": 0, "due": "2024-01-02", "item": { "tango": "箸", "pitch": 1 } } } })
        );

        let listed = schema
            .execute(r#"{ studyItems(username: "hana", category: "N5") { item { yomi } } }"#)
            .await;
        assert_eq!(listed.data, value!({ "studyItems": [{ "item": { "yomi": "はし" } }] }));
    }

    #[tokio::test]
    async fn study_items_fall_back_to_viewer() {
        let schema = schema();
        schema
            .execute(r#"mutation { createStudyItem(username: "hana", tangoId: 1, due: "2024-01-02") { ok } }"#)
            .await;

        let anonymous = schema.execute("{ studyItems { id } }").await;
        assert_eq!(anonymous.data, value!({ "studyItems": [] }));

        let signed_in = schema
            .execute(Request::new("{ studyItems { id } }").data(Viewer(Some("hana".into()))))
            .await;
        assert_eq!(signed_in.data, value!({ "studyItems": [{ "id": 1 }] }));
    }

    #[tokio::test]
    async fn service_errors_expose_codes() {
        let response = schema()
            .execute(r#"mutation { createStudyItem(username: "hana", tangoId: 99, due: "2024-01-02") { ok } }"#)
            .await;

        assert_eq!(response.errors.len(), 1);
        let code = response.errors[0]
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"));
        assert_eq!(code, Some(&async_graphql::Value::from("NOT_FOUND")));
    }

    #[test]
    fn sdl_exposes_date_scalar() {
        let sdl = schema().sdl();

        assert!(sdl.contains("scalar Date"));
        assert!(sdl.contains("type Mutation"));
        assert!(sdl.contains("createStudyItem("));
    }
}
