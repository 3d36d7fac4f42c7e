use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use db::{
    DBService,
    models::{
        project::{CreateProject, Project},
        scene::{CreateScene, Scene},
    },
};
use uuid::Uuid;

use super::ai_gateway::{AiGatewayError, ChatRequest, Completion, CompletionProvider};

/// Replays canned answers in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, AiGatewayError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_replies(answers.into_iter().map(|a| Ok(a.into())))
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Result<String, AiGatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// User message of the `n`th request.
    pub fn user_prompt(&self, n: usize) -> String {
        self.requests.lock().unwrap()[n]
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    fn next(&self) -> Result<String, AiGatewayError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AiGatewayError::EmptyResponse))
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn chat(&self, request: ChatRequest) -> Result<Completion, AiGatewayError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        self.next().map(|content| Completion {
            content,
            model,
            tokens_used: Some(10),
        })
    }

    async fn generate_image(&self, model: &str, prompt: &str) -> Result<String, AiGatewayError> {
        let mut request = ChatRequest::new(model, vec![]);
        request.messages.push(super::ai_gateway::ChatMessage::user(prompt));
        self.requests.lock().unwrap().push(request);
        self.next()
    }
}

pub async fn project(db: &DBService) -> Project {
    Project::create(
        &db.pool,
        Uuid::new_v4(),
        Uuid::new_v4(),
        &CreateProject {
            title: "O Pescador".to_string(),
            genre: Some("drama".to_string()),
            format: Some("short".to_string()),
        },
    )
    .await
    .unwrap()
}

pub async fn scene(db: &DBService, project_id: Uuid, number: i64, description: &str) -> Scene {
    Scene::create(
        &db.pool,
        project_id,
        &CreateScene {
            scene_number: number,
            int_ext: Some("EXT".to_string()),
            location: Some("PRAIA".to_string()),
            time_of_day: Some("NOITE".to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}
