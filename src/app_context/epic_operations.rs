use super::{AppContext, EpicSummary};
use crate::errors::CoreResult;
use crate::services::epic_service::{CreateEpic, EpicPatch};

impl AppContext {
    // ----- Epic helpers ----------------------------------------------------
    pub async fn create_epic(&self, input: CreateEpic) -> CoreResult<EpicSummary> {
        self.epic_service
            .create_epic(input)
            .await
            .map(EpicSummary::from)
    }

    pub async fn get_epic(&self, id: i32) -> CoreResult<EpicSummary> {
        self.epic_service.get_epic(id).await.map(EpicSummary::from)
    }

    pub async fn get_backlog_epics(&self, backlog_id: i32) -> CoreResult<Vec<EpicSummary>> {
        let epics = self.epic_service.get_backlog_epics(backlog_id).await?;
        Ok(epics.into_iter().map(EpicSummary::from).collect())
    }

    pub async fn update_epic(&self, id: i32, patch: EpicPatch) -> CoreResult<EpicSummary> {
        self.epic_service
            .update_epic(id, patch)
            .await
            .map(EpicSummary::from)
    }

    pub async fn delete_epic(&self, id: i32) -> CoreResult<()> {
        self.epic_service.delete_epic(id).await
    }
}
