pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::io::{self, BufRead};
use std::sync::Arc;

use tracing::info;

use crate::cli::LaunchOptions;
use crate::commands::AppState;
use crate::db::{DbPool, DATABASE_FILE_NAME};
use crate::services::ai_service::{DataGenerator, GeminiDataGenerator};

pub fn run() {
    let matches = cli::launch_command().get_matches();
    let options = cli::launch_options(&matches);

    if let Err(error) = try_run(options) {
        eprintln!("failed to launch application: {error}");
        std::process::exit(1);
    }
}

fn try_run(options: LaunchOptions) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&options.data_dir)?;

    let log_dir = options.data_dir.join("logs");
    crate::utils::logger::init_logging(options.log_to_file.then_some(log_dir.as_path()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let pool = DbPool::new(options.data_dir.join(DATABASE_FILE_NAME))?;
    let generator: Arc<dyn DataGenerator> = Arc::new(GeminiDataGenerator::from_env()?);
    let state = AppState::new(pool, generator, None)?;

    info!(
        target: "app::command",
        data_dir = %options.data_dir.display(),
        "session started"
    );

    let stdin = io::stdin();
    let input: Box<dyn BufRead> = Box::new(stdin.lock());
    let mut stdout = io::stdout();
    runtime.block_on(cli::run_session(&state, input, &mut stdout))?;

    Ok(())
}
