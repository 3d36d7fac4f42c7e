//! Prints the TypeScript declarations of the API types.
//!
//! `cargo run --bin generate_types -- shared/types.ts` writes them to a file
//! instead of stdout.

use std::{env, fs};

use ts_rs::TS;

const HEADER: &str = "// This file was generated by `generate_types`. Do not edit it by hand.\n\n\
export type ApiResponse<T> = { success: boolean, data: T | null, message: string | null };";

fn generate_types_content() -> String {
    let decls = [
        db::models::project::ProjectStatus::decl(),
        db::models::project::Project::decl(),
        db::models::project::CreateProject::decl(),
        db::models::project::UpdateProject::decl(),
        db::models::project_content::ContentType::decl(),
        db::models::project_content::ProjectContent::decl(),
        db::models::scene::Scene::decl(),
        db::models::scene::CreateScene::decl(),
        db::models::scene::UpdateScene::decl(),
        db::models::storyboard::Storyboard::decl(),
        db::models::storyboard::CreateStoryboard::decl(),
        db::models::storyboard::UpdateStoryboard::decl(),
        db::models::shot::Shot::decl(),
        db::models::shot::CreateShot::decl(),
        db::models::budget_item::BudgetCategory::decl(),
        db::models::budget_item::BudgetStatus::decl(),
        db::models::budget_item::BudgetItem::decl(),
        db::models::budget_item::CreateBudgetItem::decl(),
        db::models::budget_item::UpdateBudgetItem::decl(),
        db::models::script::ScriptKind::decl(),
        db::models::script::Script::decl(),
        db::models::script::CreateScript::decl(),
        db::models::script::ScriptSummary::decl(),
        db::models::script_import::ImportStatus::decl(),
        db::models::script_import::ScriptImport::decl(),
        db::models::ai_generation::GenerationOutcome::decl(),
        db::models::ai_generation::AiGeneration::decl(),
        services::services::content_generator::GenerationKind::decl(),
        services::services::content_generator::GenerationContext::decl(),
        services::services::content_generator::StorylineActs::decl(),
        services::services::content_generator::StorylineContext::decl(),
        services::services::content_generator::BeatSheetScene::decl(),
        services::services::content_generator::BeatSheetContext::decl(),
        services::services::content_generator::SceneBrief::decl(),
        services::services::content_generator::BulkReport::decl(),
        services::services::content_generator::SceneFailure::decl(),
        services::services::stages::GeneratedStage::decl(),
        services::services::scene_sync::SyncReport::decl(),
        services::services::storyboard::ImageFrameRequest::decl(),
        services::services::budget::CategoryTotal::decl(),
        services::services::budget::BudgetSummary::decl(),
        server::routes::projects::ProjectOverview::decl(),
        server::routes::budget::ProjectBudget::decl(),
        server::routes::generation::GenerateRequest::decl(),
        server::routes::generation::GenerateResponse::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| {
            let trimmed = decl.trim_start();
            if trimmed.starts_with("export") {
                trimmed.to_string()
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{HEADER}\n\n{body}\n")
}

fn main() {
    let content = generate_types_content();
    match env::args().nth(1) {
        Some(path) => {
            if let Err(e) = fs::write(&path, content) {
                eprintln!("failed to write {path}: {e}");
                std::process::exit(1);
            }
            println!("wrote {path}");
        }
        None => print!("{content}"),
    }
}
