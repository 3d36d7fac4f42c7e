pub mod ai_generation;
pub mod budget_item;
pub mod project;
pub mod project_content;
pub mod scene;
pub mod script;
pub mod script_import;
pub mod shot;
pub mod storyboard;
