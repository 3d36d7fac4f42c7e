use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    ai_gateway::{AiGatewayClient, CompletionProvider},
    config::Config,
    content_generator::ContentGenerator,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
    generator: ContentGenerator,
}

impl LocalDeployment {
    /// Wires a deployment from already-built parts; tests pass an in-memory
    /// database and a scripted provider.
    pub fn from_parts(
        config: Config,
        db: DBService,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let generator = ContentGenerator::new(
            provider,
            config.models.clone(),
            config.budget_currency.clone(),
        )
        .with_language(config.output_language.clone());
        Self {
            config: Arc::new(config),
            db,
            generator,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env()?;
        let db = DBService::new(&config.database_url).await?;

        if config.gateway_api_key.is_none() {
            warn!("AI_GATEWAY_API_KEY is not set, generation requests will fail");
        }
        let client = AiGatewayClient::from_config(&config)?;
        info!(
            gateway_url = %config.gateway_url,
            fast_model = %config.models.fast,
            pro_model = %config.models.pro,
            "AI gateway configured"
        );

        Ok(Self::from_parts(config, db, Arc::new(client)))
    }

    fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn generator(&self) -> &ContentGenerator {
        &self.generator
    }
}
