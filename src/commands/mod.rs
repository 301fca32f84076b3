pub mod ai_commands;
pub mod export;
pub mod form;
pub mod leaderboard;
pub mod roster;
pub mod settings;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{error, info};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::ai_service::DataGenerator;
use crate::services::blob_store::{BlobStore, SqliteBlobStore};
use crate::services::export_service::{ExportService, ImageExporter};
use crate::services::form_controller::FormController;
use crate::services::leaderboard_service::LeaderboardEngine;
use crate::services::roster_service::RosterStore;
use crate::services::settings_service::SettingsService;

/// Shared state behind every command.
///
/// Each mutable record sits behind its own mutex, held for one command
/// only. When two are needed the roster is locked before the form.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    roster: Arc<Mutex<RosterStore>>,
    form: Arc<Mutex<FormController>>,
    leaderboard: Arc<Mutex<LeaderboardEngine>>,
    generator: Arc<dyn DataGenerator>,
    export_service: Option<Arc<ExportService>>,
}

impl AppState {
    pub fn new(
        db_pool: DbPool,
        generator: Arc<dyn DataGenerator>,
        exporter: Option<Arc<dyn ImageExporter>>,
    ) -> AppResult<Self> {
        let blob_store: Arc<dyn BlobStore> = Arc::new(SqliteBlobStore::new(db_pool.clone()));
        Self::with_blob_store(db_pool, blob_store, generator, exporter)
    }

    /// Same as [`AppState::new`] but with the roster kept in the given store.
    pub fn with_blob_store(
        db_pool: DbPool,
        blob_store: Arc<dyn BlobStore>,
        generator: Arc<dyn DataGenerator>,
        exporter: Option<Arc<dyn ImageExporter>>,
    ) -> AppResult<Self> {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone())?);
        let settings = settings_service.get()?;

        let roster = RosterStore::load(blob_store);
        let form = FormController::new(settings_service.default_period()?, (&settings).into());
        let leaderboard = LeaderboardEngine::new(settings.leaderboard_period);

        info!(
            target: "app::command",
            templates = roster.len(),
            export_enabled = exporter.is_some(),
            "application state ready"
        );

        Ok(Self {
            db_pool,
            settings_service,
            roster: Arc::new(Mutex::new(roster)),
            form: Arc::new(Mutex::new(form)),
            leaderboard: Arc::new(Mutex::new(leaderboard)),
            generator,
            export_service: exporter.map(|exporter| Arc::new(ExportService::new(exporter))),
        })
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn generator(&self) -> Arc<dyn DataGenerator> {
        Arc::clone(&self.generator)
    }

    pub fn exports(&self) -> Option<Arc<ExportService>> {
        self.export_service.clone()
    }

    pub fn roster(&self) -> AppResult<MutexGuard<'_, RosterStore>> {
        lock(&self.roster, "roster")
    }

    pub fn form(&self) -> AppResult<MutexGuard<'_, FormController>> {
        lock(&self.form, "form")
    }

    pub fn leaderboard(&self) -> AppResult<MutexGuard<'_, LeaderboardEngine>> {
        lock(&self.leaderboard, "leaderboard")
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> AppResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::other(format!("{name} state lock poisoned")))
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "The requested record does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Ai {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => merged.extend(map),
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
            }
            AppError::Persistence { message } => {
                error!(target: "app::command", %message, "storage error in command");
                CommandError::new("PERSISTENCE_ERROR", message, None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "Failed to serialise data", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", format!("File system error: {error}"), None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(error: std::io::Error) -> Self {
        AppError::from(error).into()
    }
}

/// Runs blocking database work off the async executor.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("background task failed: {err}"), None))?
        .map_err(CommandError::from)
}
