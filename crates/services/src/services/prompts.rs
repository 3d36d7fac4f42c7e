//! Prompt templates for each generation type.

use db::models::budget_item::BudgetCategory;
use serde_json::Value;
use strum::IntoEnumIterator;
use utils::text::truncate_chars;

use super::{
    ai_gateway::ChatMessage,
    content_generator::{BeatSheetScene, BudgetBrief, SceneBrief, StorylineActs},
};

/// Script windows sent by the upload chain, in characters.
pub const IMPORT_PREMISE_WINDOW: usize = 3000;
pub const IMPORT_ARGUMENT_WINDOW: usize = 4000;
pub const IMPORT_STORYLINE_WINDOW: usize = 5000;
pub const IMPORT_BEAT_SHEET_WINDOW: usize = 6000;

const JSON_ONLY: &str = "Answer ONLY with valid JSON.";

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    pub fn in_language(&self, language: &str) -> Self {
        Self {
            system: format!(
                "{}\n\nWrite all prose in {language}. Keep JSON keys, INT/EXT and DAY/NIGHT \
                 markers and category names exactly as specified.",
                self.system
            ),
            user: self.user.clone(),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }
}

const BEAT_SHEET_FORMAT: &str = r#"[{"id": "scene-1", "number": 1, "intExt": "INT", "location": "location name", "dayNight": "DAY", "description": "what happens", "characters": ["character"], "duration": 2}]"#;

const WHOLE_MINUTES: &str =
    "The \"duration\" field MUST always be a whole number of minutes (1, 2, 3...), never a decimal like 0.5 or 1.5.";

pub fn premise(script: Option<&str>) -> Prompt {
    let system = "You are a professional screenwriter who writes striking cinematic premises.";
    let user = match script {
        Some(script) => format!(
            "Analyze the complete screenplay below and extract its premise in 2-3 lines. \
             The premise must introduce the protagonist, the central conflict and what makes the story unique.\n\n\
             Screenplay:\n{script}"
        ),
        None => "Create an original, engaging premise for an audiovisual project in 2-3 lines. \
                 The premise must introduce the protagonist, the central conflict and what makes the story unique. \
                 Be creative and specific."
            .to_string(),
    };
    Prompt::new(system, user)
}

pub fn argument(script: Option<&str>, premise: &str) -> Prompt {
    let system = "You are a professional screenwriter who develops complete narrative arguments.";
    let brief = "Develop the main characters, the basic narrative structure \
                 (setup, development, climax, resolution) and the central themes of the story.";
    let user = match script {
        Some(script) => format!(
            "Analyze the complete screenplay below and synthesize its argument in roughly 300-400 words. \
             {brief}\n\nScreenplay:\n{script}"
        ),
        None => format!(
            "Expand the following premise into a complete argument of roughly 300-400 words. \
             {brief}\n\nPremise: {premise}"
        ),
    };
    Prompt::new(system, user)
}

pub fn storyline(script: Option<&str>, premise: &str, argument: &str) -> Prompt {
    let system = "You are a professional screenwriter specialized in three-act structure.";
    let format = r#"{"act1": "act 1 text", "act2": "act 2 text", "act3": "act 3 text"}"#;
    let user = match script {
        Some(script) => format!(
            "Analyze the complete screenplay below and structure a storyline in three acts. \
             Return ONLY a valid JSON object in the format: {format}. \
             Each act must have at least 100 words describing what happens in the screenplay.\n\n\
             Screenplay:\n{script}"
        ),
        None => format!(
            "Based on the context below, create a storyline structured in three acts. \
             Return ONLY a valid JSON object in the format: {format}. \
             Each act must have at least 100 words.\n\n\
             Context:\nPremise: {premise}\nArgument: {argument}"
        ),
    };
    Prompt::new(system, user)
}

pub fn beat_sheet_from_script(script: &str) -> Prompt {
    Prompt::new(
        "You are a professional screenwriter who builds detailed beat sheets from screenplays.",
        format!(
            "Analyze the complete screenplay below and extract ALL of its scenes as a beat sheet. \
             For each scene identify its number, INT/EXT, location, time of day (DAY/NIGHT/etc), \
             a summary of the action, the characters involved and the estimated duration in minutes. \
             Return ONLY a valid JSON array of objects in the format: {BEAT_SHEET_FORMAT}\n\n\
             IMPORTANT:\n\
             - Extract EVERY scene of the screenplay, do not limit yourself to 8-12. \
             If the screenplay has 19 scenes, return 19.\n\
             - {WHOLE_MINUTES}\n\n\
             Screenplay:\n{script}"
        ),
    )
}

pub fn beat_sheet(acts: &StorylineActs) -> Prompt {
    Prompt::new(
        "You are a professional screenwriter who builds detailed beat sheets.",
        format!(
            "Based on the storyline below, create a beat sheet with 8-12 scenes. \
             Return ONLY a valid JSON array of objects in the format: {BEAT_SHEET_FORMAT}\n\n\
             IMPORTANT: {WHOLE_MINUTES}\n\n\
             Storyline:\nAct 1: {}\nAct 2: {}\nAct 3: {}",
            acts.act1, acts.act2, acts.act3
        ),
    )
}

/// `SCENE {n} - {intExt}. {location} - {dayNight}\n{description}`, one block per scene.
pub fn render_scene_outline(scenes: &[BeatSheetScene]) -> String {
    scenes
        .iter()
        .enumerate()
        .map(|(position, scene)| {
            format!(
                "SCENE {} - {}. {} - {}\n{}",
                scene.number_or(position),
                scene.int_ext.as_deref().unwrap_or_default(),
                scene.location.as_deref().unwrap_or_default(),
                scene.day_night.as_deref().unwrap_or_default(),
                scene.description.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn script(scenes: &[BeatSheetScene]) -> Prompt {
    Prompt::new(
        "You are a professional screenwriter specialized in screenplay formatting.",
        format!(
            "Based on the beat sheet below, write a complete, professionally formatted screenplay. \
             Include scene headings (INT/EXT, location, time of day), action lines and realistic dialogue. \
             Keep traditional screenplay formatting.\n\nBeat sheet:\n{}",
            render_scene_outline(scenes)
        ),
    )
}

fn scene_heading(scene: &SceneBrief) -> String {
    format!(
        "SCENE {} - {}. {} - {}",
        scene.scene_number,
        scene.int_ext.as_deref().unwrap_or_default(),
        scene.location.as_deref().unwrap_or_default(),
        scene.time_of_day.as_deref().unwrap_or_default()
    )
}

pub fn technical_breakdown(scene: &SceneBrief) -> Prompt {
    let n = scene.scene_number;
    Prompt::new(
        "You are an experienced director of photography. Analyze the scene description and produce ONLY \
         the shots that are NECESSARY and SPECIFIC to what is described. Do NOT produce generic or \
         superfluous shots.\n\nPRINCIPLE: less is more. Every shot needs a clear purpose grounded in the described action.",
        format!(
            "Analyze this scene and create a technical breakdown with ONLY the shots needed to tell what is described.\n\n\
             {heading}\n\n\
             DESCRIPTION:\n{description}\n\n\
             RULES:\n\
             1. Identify ONLY the actions and elements that must be shown\n\
             2. Produce the EXACT number of shots needed (3, 5, 8 or more, depending on the scene)\n\
             3. Short, simple scenes: 3-5 shots are enough\n\
             4. Complex scenes with several actions need more shots\n\
             5. Every shot must show something SPECIFIC from the description\n\
             6. Do NOT add reaction shots or inserts unless the description mentions or implies them\n\n\
             FORMAT - Return ONLY a JSON array:\n\
             [\n  {{\n    \"shot_number\": \"{n}.1\",\n    \"shot_type\": \"WS\",\n    \"framing\": \"Frontal\",\n    \
             \"movement\": \"Static\",\n    \"lens\": \"35mm\",\n    \"equipment\": [\"Tripod\"],\n    \
             \"lighting_setup\": \"Lighting description\",\n    \"sound_notes\": \"Sound notes\",\n    \
             \"vfx_notes\": \"None\",\n    \"notes\": \"Purpose of the shot\",\n    \"estimated_setup_time\": 10\n  }}\n]\n\n\
             Number shots {n}.1, {n}.2 and so on. estimated_setup_time is in whole minutes.",
            heading = scene_heading(scene),
            description = scene.description.as_deref().unwrap_or_default(),
        ),
    )
}

pub fn storyboard_frames(scene: &SceneBrief) -> Prompt {
    Prompt::new(
        format!("You are a film director specialized in storyboarding. {JSON_ONLY}"),
        format!(
            "Analyze the following scene and create 3-5 storyboard frames to visualize it:\n\n\
             {heading}\nDescription: {description}\n\n\
             Return ONLY a JSON array of frames in the format:\n\
             [\n  {{\n    \"frame_number\": 1,\n    \"description\": \"what the frame shows\",\n    \
             \"camera_angle\": \"camera angle (e.g. Close-up, Medium shot, Wide shot)\",\n    \
             \"camera_movement\": \"camera movement (e.g. Static, Pan, Tilt, Tracking)\",\n    \
             \"image_prompt\": \"detailed prompt to generate the image of this frame\"\n  }}\n]",
            heading = scene_heading(scene),
            description = scene.description.as_deref().unwrap_or_default(),
        ),
    )
}

/// Image prompt used when the caller does not write one.
pub fn storyboard_image(
    scene: &SceneBrief,
    camera_angle: Option<&str>,
    camera_movement: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Scene {}: {}. {} - {}. {}.",
        scene.scene_number,
        scene.int_ext.as_deref().unwrap_or("INT"),
        scene.location.as_deref().unwrap_or_default(),
        scene.time_of_day.as_deref().unwrap_or_default(),
        scene.description.as_deref().unwrap_or_default().trim_end_matches('.')
    );
    if let Some(angle) = camera_angle.filter(|a| !a.trim().is_empty()) {
        prompt.push_str(&format!(" Angle: {angle}."));
    }
    if let Some(movement) = camera_movement.filter(|m| !m.trim().is_empty()) {
        prompt.push_str(&format!(" Movement: {movement}."));
    }
    prompt.push_str(" Professional cinematic style, striking visual composition.");
    prompt
}

pub fn budget(brief: &BudgetBrief) -> Prompt {
    let categories = BudgetCategory::iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let scenes = Value::Array(brief.scenes.iter().take(5).cloned().collect());
    let currency = &brief.currency;

    Prompt::new(
        "You are an experienced executive film producer specialized in audiovisual production budgets. \
         Create detailed, realistic budgets based on the project's content.",
        format!(
            "Based on the following audiovisual project, create a complete and realistic list of budget items.\n\n\
             PROJECT INFORMATION:\n\
             - Number of scenes: {scenes_count}\n\
             - Screenplay: {script}\n\
             - Scenes: {scenes}\n\n\
             INSTRUCTIONS:\n\
             1. Create between 15 and 30 budget items covering every main category\n\
             2. Include pre-production, production, post-production, cast, crew, location, equipment, \
             art, wardrobe, catering and transport\n\
             3. Use realistic prices in {currency} for the local market\n\
             4. Scale the budget to the number of scenes\n\n\
             FORMAT - Return ONLY a JSON object:\n\
             {{\n  \"items\": [\n    {{\n      \"item_name\": \"Director of Photography\",\n      \
             \"description\": \"Shooting days plus prep\",\n      \"category\": \"crew\",\n      \
             \"quantity\": 5,\n      \"unit\": \"day\",\n      \"unit_price\": 1500,\n      \
             \"notes\": \"Includes own camera package\"\n    }}\n  ]\n}}\n\n\
             Valid categories: {categories}",
            scenes_count = brief
                .scenes_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "not specified".to_string()),
            script = if brief.has_script { "Yes" } else { "Not available" },
        ),
    )
}

pub fn import_premise(script: &str) -> Prompt {
    Prompt::new(
        "You are a professional screenwriter specialized in screenplay analysis.",
        format!(
            "Analyze the screenplay below and extract a concise premise in 2-3 lines that captures the essence \
             of the story, the protagonist, the central conflict and what makes it unique.\n\nScreenplay:\n{}",
            truncate_chars(script, IMPORT_PREMISE_WINDOW)
        ),
    )
}

pub fn import_argument(script: &str, premise: &str) -> Prompt {
    Prompt::new(
        "You are a professional screenwriter specialized in developing arguments.",
        format!(
            "Based on the screenplay, write a complete argument of 300-400 words with setup, development, \
             climax and resolution.\n\nPremise: {premise}\n\nScreenplay:\n{}",
            truncate_chars(script, IMPORT_ARGUMENT_WINDOW)
        ),
    )
}

pub fn import_storyline(script: &str) -> Prompt {
    Prompt::new(
        format!("You are a professional screenwriter. {JSON_ONLY}"),
        format!(
            "Analyze the screenplay and create a storyline structured in 3 acts. Return ONLY JSON: \
             {{\"act1\": \"text\", \"act2\": \"text\", \"act3\": \"text\"}}. Each act with at least 100 words.\
             \n\nScreenplay:\n{}",
            truncate_chars(script, IMPORT_STORYLINE_WINDOW)
        ),
    )
}

pub fn import_beat_sheet(script: &str) -> Prompt {
    Prompt::new(
        format!("You are a professional screenwriter. {JSON_ONLY}"),
        format!(
            "Analyze the screenplay and create a beat sheet with 8-12 scenes. Return ONLY a JSON array: \
             {BEAT_SHEET_FORMAT}\n\n{WHOLE_MINUTES}\n\nScreenplay:\n{}",
            truncate_chars(script, IMPORT_BEAT_SHEET_WINDOW)
        ),
    )
}
