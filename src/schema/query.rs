use async_graphql::{Context, ErrorExtensions, Object, Result};

use crate::{
    domain::models::{StudyItem, Word},
    schema::types::{Date, Viewer},
    services::study::StudyService,
};

pub struct QueryRoot;

#[Object(name = "Query")]
impl QueryRoot {
    async fn words(&self, ctx: &Context<'_>, category: Option<String>) -> Result<Vec<Word>> {
        let service = ctx.data::<StudyService>()?;
        service
            .words(category.as_deref())
            .await
            .map_err(|err| err.extend())
    }

    async fn word(&self, ctx: &Context<'_>, id: i32) -> Result<Option<Word>> {
        let service = ctx.data::<StudyService>()?;
        service.word(id).await.map_err(|err| err.extend())
    }

    /// Study items for `username`, or for the signed-in viewer when omitted.
    async fn study_items(
        &self,
        ctx: &Context<'_>,
        username: Option<String>,
        category: Option<String>,
    ) -> Result<Vec<StudyItem>> {
        let Some(username) = resolve_username(ctx, username) else {
            return Ok(Vec::new());
        };
        let service = ctx.data::<StudyService>()?;
        service
            .study_items(&username, category.as_deref())
            .await
            .map_err(|err| err.extend())
    }

    async fn due_study_items(
        &self,
        ctx: &Context<'_>,
        username: Option<String>,
        category: Option<String>,
        on: Date,
    ) -> Result<Vec<StudyItem>> {
        let Some(username) = resolve_username(ctx, username) else {
            return Ok(Vec::new());
        };
        let service = ctx.data::<StudyService>()?;
        service
            .due_study_items(&username, category.as_deref(), on.0)
            .await
            .map_err(|err| err.extend())
    }
}

fn resolve_username(ctx: &Context<'_>, username: Option<String>) -> Option<String> {
    username.or_else(|| {
        ctx.data_opt::<Viewer>()
            .and_then(|viewer| viewer.0.clone())
    })
}
