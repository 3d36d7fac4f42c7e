//! Background processing of an uploaded screenplay into the early pipeline stages.

use std::time::Instant;

use db::models::{
    project_content::{ContentType, ProjectContent},
    script::{CreateScript, Script, ScriptKind},
    script_import::{ImportStatus, ScriptImport},
};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::{
    content_generator::{
        ContentGenerator, GeneratedText, GenerationError, LogScope, log_generation,
        parse_beat_sheet, parse_storyline,
    },
    prompts::{self, Prompt},
    scene_sync::{SceneSyncError, sync_scenes_from_beat_sheet},
};

#[derive(Debug, Error)]
pub enum ScriptImportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    SceneSync(#[from] SceneSyncError),
    #[error("the uploaded script is empty")]
    EmptyScript,
}

/// Runs premise → argument → storyline → beat sheet → scenes from one script.
///
/// Every stage is stored as soon as it succeeds; a failure leaves the earlier
/// stages in place and marks the job failed.
#[derive(Clone)]
pub struct ScriptImporter {
    pool: SqlitePool,
    generator: ContentGenerator,
}

impl ScriptImporter {
    pub fn new(pool: SqlitePool, generator: ContentGenerator) -> Self {
        Self { pool, generator }
    }

    /// Stores the script, creates the job row and starts the chain in the background.
    pub async fn start(
        &self,
        project_id: Uuid,
        data: &CreateScript,
        user_id: Option<Uuid>,
    ) -> Result<ScriptImport, ScriptImportError> {
        if data.content.trim().is_empty() {
            return Err(ScriptImportError::EmptyScript);
        }

        let script = Script::create(&self.pool, project_id, ScriptKind::Uploaded, data).await?;
        let job = ScriptImport::create(&self.pool, Uuid::new_v4(), project_id, script.id).await?;

        info!(
            job_id = %job.id,
            project_id = %project_id,
            script_version = script.version,
            word_count = script.word_count,
            "Created script import, starting processing"
        );

        let importer = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(e) = importer
                .run(job_id, project_id, &script.content, user_id)
                .await
            {
                error!(job_id = %job_id, error = %e, "Script import failed");
            }
        });

        Ok(job)
    }

    /// Runs the chain and records the final job status.
    pub async fn run(
        &self,
        job_id: Uuid,
        project_id: Uuid,
        script: &str,
        user_id: Option<Uuid>,
    ) -> Result<(), ScriptImportError> {
        let scope = LogScope {
            project_id: Some(project_id),
            user_id,
        };
        match self.run_chain(job_id, project_id, script, scope).await {
            Ok(()) => {
                ScriptImport::update_status(&self.pool, job_id, ImportStatus::Completed, None)
                    .await?;
                info!(job_id = %job_id, project_id = %project_id, "Script import completed");
                Ok(())
            }
            Err(e) => {
                ScriptImport::update_status(
                    &self.pool,
                    job_id,
                    ImportStatus::Failed,
                    Some(&e.to_string()),
                )
                .await?;
                Err(e)
            }
        }
    }

    async fn run_chain(
        &self,
        job_id: Uuid,
        project_id: Uuid,
        script: &str,
        scope: LogScope,
    ) -> Result<(), ScriptImportError> {
        ScriptImport::update_progress(&self.pool, job_id, "premise").await?;
        let premise = self
            .ask(scope, "import_premise", &prompts::import_premise(script))
            .await?;
        let premise = premise.content.trim();
        self.store(project_id, ContentType::Premise, json!({ "text": premise }))
            .await?;

        ScriptImport::update_progress(&self.pool, job_id, "argument").await?;
        let argument = self
            .ask(scope, "import_argument", &prompts::import_argument(script, premise))
            .await?;
        self.store(
            project_id,
            ContentType::Argument,
            json!({ "text": argument.content.trim() }),
        )
        .await?;

        ScriptImport::update_progress(&self.pool, job_id, "storyline").await?;
        let storyline = self
            .ask(scope, "import_storyline", &prompts::import_storyline(script))
            .await?;
        let acts = parse_storyline(&storyline.content)?;
        self.store(project_id, ContentType::Storyline, json!({ "acts": acts }))
            .await?;

        ScriptImport::update_progress(&self.pool, job_id, "beat_sheet").await?;
        let beat_sheet = self
            .ask(scope, "import_beat_sheet", &prompts::import_beat_sheet(script))
            .await?;
        let scenes = parse_beat_sheet(&beat_sheet.content)?;
        let scene_count = scenes.len();
        self.store(project_id, ContentType::BeatSheet, json!({ "scenes": scenes }))
            .await?;

        ScriptImport::update_progress(&self.pool, job_id, "scenes").await?;
        let report = sync_scenes_from_beat_sheet(&self.pool, project_id).await?;

        info!(
            job_id = %job_id,
            scene_count,
            scenes_created = report.created,
            "Script import stages stored"
        );
        Ok(())
    }

    async fn ask(
        &self,
        scope: LogScope,
        label: &str,
        prompt: &Prompt,
    ) -> Result<GeneratedText, GenerationError> {
        let model = self.generator.models().fast.clone();
        let started = Instant::now();
        let result = self.generator.ask(prompt, &model).await;
        log_generation(&self.pool, scope, label, &model, started, result.as_ref()).await;
        result
    }

    async fn store(
        &self,
        project_id: Uuid,
        stage: ContentType,
        content: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        ProjectContent::upsert(&self.pool, project_id, stage, &content).await?;
        info!(project_id = %project_id, stage = %stage, "Stored imported stage");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use db::{DBService, models::scene::Scene};

    use super::*;
    use crate::services::{
        config::ModelSet,
        test_support::{self, ScriptedProvider},
    };

    const SCRIPT: &str = "EXT. PIER - DAWN\nJOÃO prepares the boat.\n\nINT. HOUSE - DAY\nANA reads the letter.";

    fn importer(db: &DBService, provider: Arc<ScriptedProvider>) -> ScriptImporter {
        ScriptImporter::new(
            db.pool.clone(),
            ContentGenerator::new(provider, ModelSet::default(), "BRL".to_string()),
        )
    }

    fn full_chain() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new([
            "A fisherman leaves before his daughter wakes.",
            "Argument.",
            r#"{"act1": "Departure", "act2": "Storm", "act3": "Return"}"#,
            r#"[{"number": 1, "intExt": "EXT", "location": "PIER", "dayNight": "DAWN", "description": "João prepares the boat."},
                {"number": 2, "intExt": "INT", "location": "HOUSE", "dayNight": "DAY", "description": "Ana reads the letter."}]"#,
        ]))
    }

    #[tokio::test]
    async fn empty_script_is_rejected_before_storing() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;

        let err = importer(&db, full_chain())
            .start(
                project.id,
                &CreateScript {
                    content: " \n ".to_string(),
                    file_name: None,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptImportError::EmptyScript));
        assert!(Script::latest_for_project(&db.pool, project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chain_fills_stages_and_scenes() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let provider = full_chain();

        let job = importer(&db, provider.clone())
            .start(
                project.id,
                &CreateScript {
                    content: SCRIPT.to_string(),
                    file_name: Some("o-pescador.txt".to_string()),
                },
                Some(project.user_id),
            )
            .await
            .unwrap();
        assert_eq!(job.status, ImportStatus::Pending);

        let mut finished = None;
        for _ in 0..100 {
            let current = ScriptImport::find_by_id(&db.pool, job.id).await.unwrap().unwrap();
            if matches!(current.status, ImportStatus::Completed | ImportStatus::Failed) {
                finished = Some(current);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let finished = finished.expect("import did not finish");
        assert_eq!(finished.status, ImportStatus::Completed);
        assert_eq!(finished.current_stage.as_deref(), Some("scenes"));

        let rows = ProjectContent::find_by_project(&db.pool, project.id).await.unwrap();
        assert_eq!(
            ProjectContent::completed_stages(&rows),
            vec![
                ContentType::Premise,
                ContentType::Argument,
                ContentType::Storyline,
                ContentType::BeatSheet
            ]
        );
        assert_eq!(Scene::count_by_project(&db.pool, project.id).await.unwrap(), 2);
        assert!(provider.user_prompt(1).contains("Premise: A fisherman leaves"));
        assert!(provider.requests().iter().all(|r| r.model == "google/gemini-2.5-flash"));
    }

    #[tokio::test]
    async fn failure_keeps_completed_stages() {
        let db = DBService::new_in_memory().await.unwrap();
        let project = test_support::project(&db).await;
        let script = Script::create(
            &db.pool,
            project.id,
            ScriptKind::Uploaded,
            &CreateScript {
                content: SCRIPT.to_string(),
                file_name: None,
            },
        )
        .await
        .unwrap();
        let job = ScriptImport::create(&db.pool, Uuid::new_v4(), project.id, script.id)
            .await
            .unwrap();
        let provider = Arc::new(ScriptedProvider::new([
            "Premise.",
            "Argument.",
            "The storyline has three acts.",
        ]));

        let err = importer(&db, provider)
            .run(job.id, project.id, SCRIPT, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScriptImportError::Generation(GenerationError::Unparsable(_))
        ));

        let job = ScriptImport::find_by_id(&db.pool, job.id).await.unwrap().unwrap();
        assert_eq!(job.status, ImportStatus::Failed);
        assert_eq!(job.current_stage.as_deref(), Some("storyline"));
        assert!(job.error_message.unwrap().starts_with("could not parse AI response"));

        let rows = ProjectContent::find_by_project(&db.pool, project.id).await.unwrap();
        assert_eq!(
            ProjectContent::completed_stages(&rows),
            vec![ContentType::Premise, ContentType::Argument]
        );
    }
}
