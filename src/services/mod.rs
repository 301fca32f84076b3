pub mod ai_service;
pub mod blob_store;
pub mod export_service;
pub mod form_controller;
pub mod leaderboard_service;
pub mod prompt_templates;
pub mod roster_service;
pub mod settings_service;
