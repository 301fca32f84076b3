use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::card::{CardSnapshot, LeaderboardSnapshot};
use crate::models::period::{LeaderboardPeriod, Period};
use crate::utils::data_uri::bytes_to_data_uri;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s/\\]+").expect("valid regex"));

/// What is being exported.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "snapshot")]
pub enum ExportTarget {
    Card(CardSnapshot),
    Leaderboard(LeaderboardSnapshot),
}

impl ExportTarget {
    pub fn file_name(&self) -> String {
        match self {
            ExportTarget::Card(card) => card_file_name(&card.stats.name),
            ExportTarget::Leaderboard(board) => {
                leaderboard_file_name(board.view.period_label, &board.period)
            }
        }
    }
}

/// Rasterises a card or leaderboard. Layout and rendering live outside this crate.
pub trait ImageExporter: Send + Sync {
    fn render_png(&self, target: &ExportTarget) -> AppResult<Vec<u8>>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedImage {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes_written: usize,
}

pub struct ExportService {
    exporter: Arc<dyn ImageExporter>,
}

impl ExportService {
    pub fn new(exporter: Arc<dyn ImageExporter>) -> Self {
        Self { exporter }
    }

    /// Renders the target and writes it into `dir` under its download name.
    pub fn export_to_dir(&self, target: &ExportTarget, dir: &Path) -> AppResult<ExportedImage> {
        let bytes = self.render(target)?;
        fs::create_dir_all(dir)?;

        let file_name = target.file_name();
        let path = dir.join(&file_name);
        fs::write(&path, &bytes)
            .map_err(|err| AppError::persistence(format!("failed to write export file: {err}")))?;

        info!(
            target: "app::export",
            path = %path.display(),
            bytes = bytes.len(),
            "image exported"
        );
        Ok(ExportedImage {
            file_name,
            path,
            bytes_written: bytes.len(),
        })
    }

    pub fn export_data_uri(&self, target: &ExportTarget) -> AppResult<String> {
        let bytes = self.render(target)?;
        Ok(bytes_to_data_uri("image/png", &bytes))
    }

    fn render(&self, target: &ExportTarget) -> AppResult<Vec<u8>> {
        let bytes = self.exporter.render_png(target)?;
        if !bytes.starts_with(PNG_SIGNATURE) {
            return Err(AppError::other("renderer returned data that is not a PNG image"));
        }
        Ok(bytes)
    }
}

/// `pro-card-{name}.png` with runs of whitespace and path separators
/// replaced by a single dash.
pub fn card_file_name(name: &str) -> String {
    format!("pro-card-{}.png", SEPARATOR_RUN.replace_all(name, "-"))
}

/// `{Period}-leaderboard-{quarter}-{year}.png`.
pub fn leaderboard_file_name(label: LeaderboardPeriod, period: &Period) -> String {
    format!("{}-leaderboard-{}-{}.png", label, period.quarter, period.year)
}
