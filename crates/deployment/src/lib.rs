use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use services::services::{
    ai_gateway::AiGatewayError,
    breakdown::BreakdownService,
    budget::BudgetService,
    config::{Config, ConfigError},
    content_generator::ContentGenerator,
    script_import::ScriptImporter,
    stages::StageService,
    storyboard::StoryboardService,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    AiGateway(#[from] AiGatewayError),
}

/// Everything a request handler needs, shared across the router.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<Config>;

    fn db(&self) -> &DBService;

    fn generator(&self) -> &ContentGenerator;

    fn stages(&self) -> StageService {
        StageService::new(self.db().pool.clone(), self.generator().clone())
    }

    fn breakdown(&self) -> BreakdownService {
        BreakdownService::new(self.db().pool.clone(), self.generator().clone())
    }

    fn storyboards(&self) -> StoryboardService {
        StoryboardService::new(self.db().pool.clone(), self.generator().clone())
    }

    fn budget(&self) -> BudgetService {
        BudgetService::new(self.db().pool.clone(), self.generator().clone())
    }

    fn script_importer(&self) -> ScriptImporter {
        ScriptImporter::new(self.db().pool.clone(), self.generator().clone())
    }
}
