use async_graphql::{Context, ErrorExtensions, Object, Result};

use crate::{
    domain::models::{NewStudyItem, StudyItemChanges},
    schema::types::{CreateStudyItem, Date, EnrollCategory, UpdateStudyItem},
    services::study::StudyService,
};

pub struct MutationRoot;

#[Object(name = "Mutation")]
impl MutationRoot {
    async fn create_study_item(
        &self,
        ctx: &Context<'_>,
        username: String,
        tango_id: i32,
        due: Date,
    ) -> Result<CreateStudyItem> {
        let service = ctx.data::<StudyService>()?;
        let study_item = service
            .create_study_item(NewStudyItem {
                username,
                word_id: tango_id,
                due: due.0,
                priority: 0,
            })
            .await
            .map_err(|err| err.extend())?;
        Ok(CreateStudyItem {
            ok: true,
            study_item: Some(study_item),
        })
    }

    async fn update_study_item(
        &self,
        ctx: &Context<'_>,
        id: i32,
        priority: Option<i32>,
        due: Option<Date>,
    ) -> Result<UpdateStudyItem> {
        let service = ctx.data::<StudyService>()?;
        let changes = StudyItemChanges {
            priority,
            due: due.map(|d| d.0),
        };
        let study_item = service
            .update_study_item(id, changes)
            .await
            .map_err(|err| err.extend())?;
        Ok(UpdateStudyItem {
            ok: true,
            study_item: Some(study_item),
        })
    }

    /// Adds every not-yet-studied word of `category`, twenty new words per day from `start`.
    async fn enroll_category(
        &self,
        ctx: &Context<'_>,
        username: String,
        category: String,
        start: Date,
    ) -> Result<EnrollCategory> {
        let service = ctx.data::<StudyService>()?;
        let study_items = service
            .enroll_category(&username, &category, start.0)
            .await
            .map_err(|err| err.extend())?;
        Ok(EnrollCategory {
            ok: true,
            study_items,
        })
    }
}
