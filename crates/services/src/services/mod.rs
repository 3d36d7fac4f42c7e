pub mod ai_gateway;
pub mod breakdown;
pub mod budget;
pub mod config;
pub mod content_generator;
pub mod lenient;
pub mod prompts;
pub mod scene_sync;
pub mod script_import;
pub mod stages;
pub mod storyboard;

#[cfg(test)]
pub(crate) mod test_support;
