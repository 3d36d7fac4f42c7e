//! Prompt selection, model choice and answer parsing for every generation type.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use db::models::{
    ai_generation::{AiGeneration, GenerationOutcome, RecordGeneration},
    scene::Scene,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use sqlx::SqlitePool;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    ai_gateway::{
        AiGatewayError, ChatRequest, CompletionProvider, extract_json, extract_json_array,
        extract_json_object,
    },
    config::ModelSet,
    lenient,
    prompts::{self, Prompt},
};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 8000;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid content type: {0}")]
    InvalidKind(String),
    #[error("missing context: {0}")]
    MissingContext(&'static str),
    #[error("ai gateway error: {0}")]
    Gateway(#[from] AiGatewayError),
    #[error("could not parse AI response: {0}")]
    Unparsable(String),
}

/// Generation types accepted by the stateless `{type, context}` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationKind {
    Premise,
    Argument,
    Storyline,
    BeatSheet,
    Script,
    TechnicalBreakdown,
    Budget,
}

impl GenerationKind {
    pub fn parse(value: &str) -> Result<Self, GenerationError> {
        value
            .parse()
            .map_err(|_| GenerationError::InvalidKind(value.to_string()))
    }
}

/// The three acts stored as `{acts: {...}}` under the storyline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct StorylineActs {
    #[serde(default)]
    pub act1: String,
    #[serde(default)]
    pub act2: String,
    #[serde(default)]
    pub act3: String,
}

impl StorylineActs {
    pub fn is_empty(&self) -> bool {
        [&self.act1, &self.act2, &self.act3]
            .iter()
            .all(|act| act.trim().is_empty())
    }
}

/// One entry of the beat sheet, in the camelCase shape models are asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BeatSheetScene {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_whole_number")]
    pub number: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub int_ext: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub day_night: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub characters: Vec<String>,
    /// Whole minutes.
    #[serde(default, deserialize_with = "lenient::opt_whole_number")]
    pub duration: Option<i64>,
}

impl BeatSheetScene {
    pub fn number_or(&self, position: usize) -> i64 {
        self.number.unwrap_or(position as i64 + 1)
    }
}

/// Fills missing numbers from list position and missing ids as `scene-{number}`.
pub fn normalize_beat_sheet(scenes: Vec<BeatSheetScene>) -> Vec<BeatSheetScene> {
    scenes
        .into_iter()
        .enumerate()
        .map(|(position, mut scene)| {
            let number = scene.number_or(position);
            scene.number = Some(number);
            if scene.id.is_none() {
                scene.id = Some(format!("scene-{number}"));
            }
            scene
        })
        .collect()
}

/// Scene fields the per-scene prompts need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct SceneBrief {
    pub scene_number: i64,
    pub int_ext: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<String>,
    pub description: Option<String>,
}

impl From<&Scene> for SceneBrief {
    fn from(scene: &Scene) -> Self {
        Self {
            scene_number: scene.scene_number,
            int_ext: scene.int_ext.clone(),
            location: scene.location.clone(),
            time_of_day: scene.time_of_day.clone(),
            description: scene.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetBrief {
    pub scenes_count: Option<i64>,
    pub has_script: bool,
    /// At most the first five scenes, serialized as stored.
    pub scenes: Vec<Value>,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct StorylineContext {
    #[serde(default)]
    pub acts: StorylineActs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct BeatSheetContext {
    #[serde(default)]
    pub scenes: Vec<BeatSheetScene>,
}

/// Loosely typed inputs of a stateless generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct GenerationContext {
    pub script: Option<String>,
    pub premise: Option<String>,
    pub argument: Option<String>,
    pub storyline: Option<StorylineContext>,
    #[serde(alias = "beatSheet")]
    pub beat_sheet: Option<BeatSheetContext>,
    #[serde(default, deserialize_with = "lenient::opt_whole_number")]
    pub scene_number: Option<i64>,
    pub int_ext: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<String>,
    pub description: Option<String>,
    #[serde(
        default,
        alias = "scenesCount",
        deserialize_with = "lenient::opt_whole_number"
    )]
    pub scenes_count: Option<i64>,
    #[ts(type = "Array<unknown> | null")]
    pub scenes: Option<Vec<Value>>,
    pub currency: Option<String>,
}

impl GenerationContext {
    fn script(&self) -> Option<&str> {
        self.script.as_deref().filter(|s| !s.trim().is_empty())
    }

    fn scene_brief(&self) -> Result<SceneBrief, GenerationError> {
        Ok(SceneBrief {
            scene_number: self
                .scene_number
                .ok_or(GenerationError::MissingContext("scene_number"))?,
            int_ext: self.int_ext.clone(),
            location: self.location.clone(),
            time_of_day: self.time_of_day.clone(),
            description: self.description.clone(),
        })
    }
}

/// A completed text generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedText {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<i64>,
    pub elapsed: Duration,
}

/// A JSON answer parsed into `T`, with the raw completion kept for logging.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub raw: GeneratedText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

/// Routes prompts to the gateway with the model each generation type calls for.
#[derive(Clone)]
pub struct ContentGenerator {
    provider: Arc<dyn CompletionProvider>,
    models: ModelSet,
    currency: String,
    language: Option<String>,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, models: ModelSet, currency: String) -> Self {
        Self {
            provider,
            models,
            currency,
            language: None,
        }
    }

    /// Every answer is requested in `language`; JSON keys and slugline
    /// keywords stay as the prompts spell them.
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// The pro model handles script analysis into scenes and technical breakdowns.
    pub fn model_for(&self, kind: GenerationKind, from_script: bool) -> &str {
        match kind {
            GenerationKind::TechnicalBreakdown => &self.models.pro,
            GenerationKind::BeatSheet if from_script => &self.models.pro,
            _ => &self.models.fast,
        }
    }

    /// Builds the prompt for `kind` from a loosely typed context.
    pub fn prompt_for(
        &self,
        kind: GenerationKind,
        context: &GenerationContext,
    ) -> Result<Prompt, GenerationError> {
        let script = context.script();
        let prompt = match kind {
            GenerationKind::Premise => prompts::premise(script),
            GenerationKind::Argument => {
                if script.is_none() && context.premise.is_none() {
                    return Err(GenerationError::MissingContext("premise"));
                }
                prompts::argument(script, context.premise.as_deref().unwrap_or_default())
            }
            GenerationKind::Storyline => {
                if script.is_none() && context.premise.is_none() {
                    return Err(GenerationError::MissingContext("premise"));
                }
                prompts::storyline(
                    script,
                    context.premise.as_deref().unwrap_or_default(),
                    context.argument.as_deref().unwrap_or_default(),
                )
            }
            GenerationKind::BeatSheet => {
                let acts = context.storyline.as_ref().map(|s| &s.acts);
                match (script, acts) {
                    (Some(script), _) => prompts::beat_sheet_from_script(script),
                    (None, Some(acts)) if !acts.is_empty() => prompts::beat_sheet(acts),
                    _ => return Err(GenerationError::MissingContext("storyline")),
                }
            }
            GenerationKind::Script => {
                let scenes = context
                    .beat_sheet
                    .as_ref()
                    .map(|b| b.scenes.as_slice())
                    .filter(|scenes| !scenes.is_empty())
                    .ok_or(GenerationError::MissingContext("beat_sheet.scenes"))?;
                prompts::script(scenes)
            }
            GenerationKind::TechnicalBreakdown => {
                prompts::technical_breakdown(&context.scene_brief()?)
            }
            GenerationKind::Budget => prompts::budget(&BudgetBrief {
                scenes_count: context.scenes_count,
                has_script: script.is_some(),
                scenes: context
                    .scenes
                    .iter()
                    .flatten()
                    .take(5)
                    .cloned()
                    .collect(),
                currency: context
                    .currency
                    .clone()
                    .unwrap_or_else(|| self.currency.clone()),
            }),
        };
        Ok(prompt)
    }

    /// Generates the raw text for `kind`; JSON answers are returned unparsed.
    pub async fn generate(
        &self,
        kind: GenerationKind,
        context: &GenerationContext,
    ) -> Result<GeneratedText, GenerationError> {
        let prompt = self.prompt_for(kind, context)?;
        let model = self.model_for(kind, context.script().is_some()).to_string();
        info!(generation_type = %kind, model = %model, "Generating content");
        self.ask(&prompt, &model).await
    }

    pub async fn ask(&self, prompt: &Prompt, model: &str) -> Result<GeneratedText, GenerationError> {
        let started = Instant::now();
        let messages = match &self.language {
            Some(language) => prompt.in_language(language).messages(),
            None => prompt.messages(),
        };
        let request = ChatRequest::new(model, messages).with_sampling(TEMPERATURE, MAX_TOKENS);
        let completion = self.provider.chat(request).await?;

        info!(
            model = %completion.model,
            content_length = completion.content.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated content"
        );
        Ok(GeneratedText {
            content: completion.content,
            model: completion.model,
            tokens_used: completion.tokens_used,
            elapsed: started.elapsed(),
        })
    }

    /// Sends a prompt expecting JSON in the answer and parses it as `T`.
    pub async fn ask_json<T: DeserializeOwned>(
        &self,
        prompt: &Prompt,
        model: &str,
        shape: JsonShape,
    ) -> Result<Parsed<T>, GenerationError> {
        let raw = self.ask(prompt, model).await?;
        let value = parse_json(&raw.content, shape)?;
        Ok(Parsed { value, raw })
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let started = Instant::now();
        let url = self
            .provider
            .generate_image(&self.models.image, prompt)
            .await?;
        info!(
            model = %self.models.image,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated image"
        );
        Ok(url)
    }
}

/// Parses a model answer that should contain JSON of the given shape.
pub fn parse_json<T: DeserializeOwned>(text: &str, shape: JsonShape) -> Result<T, GenerationError> {
    let json_str = match shape {
        JsonShape::Array => extract_json_array(text),
        JsonShape::Object => extract_json_object(text),
    };
    if json_str.trim().is_empty() {
        return Err(GenerationError::Unparsable("empty response".to_string()));
    }

    serde_json::from_str(json_str).map_err(|e| {
        tracing::error!(
            json_error = %e,
            response_length = text.len(),
            extracted_json_preview = %json_str.chars().take(500).collect::<String>(),
            "Failed to parse JSON answer"
        );
        GenerationError::Unparsable(e.to_string())
    })
}

/// Picks the shape from the answer's first character (object only for a leading
/// `{`) and retries with the other shape when that fails.
pub fn parse_json_any<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let (first, second) = if extract_json(text).starts_with('{') {
        (JsonShape::Object, JsonShape::Array)
    } else {
        (JsonShape::Array, JsonShape::Object)
    };
    parse_json(text, first).or_else(|err| parse_json(text, second).map_err(|_| err))
}

/// Beat sheet scenes from an answer shaped either `[...]` or `{"scenes": [...]}`.
pub fn parse_beat_sheet(text: &str) -> Result<Vec<BeatSheetScene>, GenerationError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Answer {
        List(Vec<BeatSheetScene>),
        Wrapped { scenes: Vec<BeatSheetScene> },
    }

    let scenes = match parse_json_any::<Answer>(text)? {
        Answer::List(scenes) | Answer::Wrapped { scenes } => scenes,
    };
    if scenes.is_empty() {
        return Err(GenerationError::Unparsable("no scenes in answer".to_string()));
    }
    Ok(normalize_beat_sheet(scenes))
}

/// Storyline acts from `{"act1",...}` or `{"acts": {...}}`.
pub fn parse_storyline(text: &str) -> Result<StorylineActs, GenerationError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Answer {
        Wrapped { acts: StorylineActs },
        Bare(StorylineActs),
    }

    let acts = match parse_json::<Answer>(text, JsonShape::Object)? {
        Answer::Wrapped { acts } | Answer::Bare(acts) => acts,
    };
    if acts.is_empty() {
        return Err(GenerationError::Unparsable("no acts in answer".to_string()));
    }
    Ok(acts)
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SceneFailure {
    pub scene_id: Uuid,
    pub scene_number: i64,
    pub error: String,
}

/// Result of a one-request-per-scene run over a whole project.
#[derive(Debug, Clone, Default, Serialize, TS)]
pub struct BulkReport {
    pub total_scenes: usize,
    pub succeeded: usize,
    pub items_created: usize,
    pub failures: Vec<SceneFailure>,
}

impl BulkReport {
    pub fn new(total_scenes: usize) -> Self {
        Self {
            total_scenes,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, items: usize) {
        self.succeeded += 1;
        self.items_created += items;
    }

    pub fn record_failure(&mut self, scene: &Scene, error: impl ToString) {
        self.failures.push(SceneFailure {
            scene_id: scene.id,
            scene_number: scene.scene_number,
            error: error.to_string(),
        });
    }
}

/// Who a generation was made for.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogScope {
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// Appends one row to the generation log. Logging failures never fail the request.
pub async fn log_generation(
    pool: &SqlitePool,
    scope: LogScope,
    generation_type: &str,
    model: &str,
    started: Instant,
    outcome: Result<&GeneratedText, &GenerationError>,
) {
    let error_message = outcome.err().map(|e| e.to_string());
    let record = RecordGeneration {
        project_id: scope.project_id,
        user_id: scope.user_id,
        generation_type,
        model_used: outcome.map(|raw| raw.model.as_str()).unwrap_or(model),
        status: if outcome.is_ok() {
            GenerationOutcome::Completed
        } else {
            GenerationOutcome::Failed
        },
        error_message: error_message.as_deref(),
        processing_time_ms: started.elapsed().as_millis() as i64,
        tokens_used: outcome.ok().and_then(|raw| raw.tokens_used),
    };

    if let Err(e) = AiGeneration::record(pool, &record).await {
        warn!(error = %e, generation_type, "Failed to record AI generation");
    }
}
