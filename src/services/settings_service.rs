use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::repositories::key_value_repository::{KeyValueRepository, KeyValueRow, KvTable};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::period::{
    current_year, normalize_year, LeaderboardPeriod, Period, Quarter, LAST_SELECTABLE_YEAR,
};
use crate::models::settings::{
    Branding, CardSettings, DEFAULT_COMPANY_LOGO, DEFAULT_COMPANY_NAME, KEY_COMPANY_LOGO,
    KEY_COMPANY_NAME, KEY_DEFAULT_QUARTER, KEY_DEFAULT_YEAR, KEY_LEADERBOARD_PERIOD,
};

const MAX_COMPANY_NAME_CHARS: usize = 80;

/// Partial settings update. `company_logo: Some(None)` removes the logo.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateInput {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_logo: Option<Option<String>>,
    #[serde(default)]
    pub default_quarter: Option<Quarter>,
    #[serde(default)]
    pub default_year: Option<String>,
    #[serde(default)]
    pub leaderboard_period: Option<LeaderboardPeriod>,
}

pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<CardSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> AppResult<Self> {
        Ok(Self {
            db,
            cache: RwLock::new(None),
        })
    }

    pub fn get(&self) -> AppResult<CardSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load_settings_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn branding(&self) -> AppResult<Branding> {
        self.get().map(|settings| Branding::from(&settings))
    }

    pub fn default_period(&self) -> AppResult<Period> {
        let settings = self.get()?;
        Period::new(settings.default_quarter, &settings.default_year)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<CardSettings> {
        let mut current = self.get()?;
        let mut writes: Vec<(&'static str, String)> = Vec::new();

        if let Some(name) = input.company_name.as_ref() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("Company name cannot be empty"));
            }
            if trimmed.chars().count() > MAX_COMPANY_NAME_CHARS {
                return Err(AppError::validation(format!(
                    "Company name must be at most {MAX_COMPANY_NAME_CHARS} characters"
                )));
            }
            current.company_name = trimmed.to_string();
            writes.push((KEY_COMPANY_NAME, current.company_name.clone()));
        }

        match input.company_logo.as_ref() {
            None => {}
            Some(None) => {
                current.company_logo = None;
                writes.push((KEY_COMPANY_LOGO, String::new()));
            }
            Some(Some(logo)) => {
                let logo = logo.trim();
                ensure_valid_logo(logo)?;
                current.company_logo = Some(logo.to_string());
                writes.push((KEY_COMPANY_LOGO, logo.to_string()));
            }
        }

        if let Some(quarter) = input.default_quarter {
            current.default_quarter = quarter;
            writes.push((KEY_DEFAULT_QUARTER, quarter.label().to_string()));
        }

        if let Some(year) = input.default_year.as_ref() {
            let year = normalize_year(year)?;
            ensure_selectable_year(&year)?;
            current.default_year = year.clone();
            writes.push((KEY_DEFAULT_YEAR, year));
        }

        if let Some(period) = input.leaderboard_period {
            current.leaderboard_period = period;
            writes.push((KEY_LEADERBOARD_PERIOD, period.label().to_string()));
        }

        if writes.is_empty() {
            return Ok(current);
        }

        self.db.with_connection(|conn| {
            for (key, value) in &writes {
                KeyValueRepository::upsert(conn, KvTable::Settings, key, value)?;
            }
            Ok(())
        })?;
        current.updated_at = Utc::now().to_rfc3339();
        let keys: Vec<&str> = writes.iter().map(|(key, _)| *key).collect();
        info!(target: "app::settings", keys = ?keys, "settings updated");

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }

        Ok(current)
    }

    fn load_settings_from_db(&self) -> AppResult<CardSettings> {
        let rows = self
            .db
            .with_connection(|conn| KeyValueRepository::list(conn, KvTable::Settings))?;

        let mut latest_updated_at: Option<String> = None;
        let mut map: HashMap<String, KeyValueRow> = HashMap::new();
        for row in rows {
            latest_updated_at = match latest_updated_at {
                Some(ref current) if current >= &row.updated_at => Some(current.clone()),
                _ => Some(row.updated_at.clone()),
            };
            map.insert(row.key.clone(), row);
        }

        let company_name = map
            .get(KEY_COMPANY_NAME)
            .map(|row| row.value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string());

        let company_logo = match map.get(KEY_COMPANY_LOGO) {
            None => Some(DEFAULT_COMPANY_LOGO.to_string()),
            Some(row) if row.value.is_empty() => None,
            Some(row) => match ensure_valid_logo(&row.value) {
                Ok(()) => Some(row.value.clone()),
                Err(_) => {
                    warn!(target: "app::settings", "stored company logo invalid, using default");
                    Some(DEFAULT_COMPANY_LOGO.to_string())
                }
            },
        };

        let default_quarter = parse_or_default(&map, KEY_DEFAULT_QUARTER, Quarter::default);
        let leaderboard_period =
            parse_or_default(&map, KEY_LEADERBOARD_PERIOD, LeaderboardPeriod::default);

        let default_year = match map.get(KEY_DEFAULT_YEAR) {
            None => current_year().to_string(),
            Some(row) => normalize_year(&row.value).unwrap_or_else(|_| {
                warn!(
                    target: "app::settings",
                    value = %row.value,
                    "stored default year invalid, using the current year"
                );
                current_year().to_string()
            }),
        };

        Ok(CardSettings {
            company_name,
            company_logo,
            default_quarter,
            default_year,
            leaderboard_period,
            updated_at: latest_updated_at.unwrap_or_else(|| Utc::now().to_rfc3339()),
        })
    }
}

fn parse_or_default<T, F>(map: &HashMap<String, KeyValueRow>, key: &str, fallback: F) -> T
where
    T: std::str::FromStr,
    F: Fn() -> T,
{
    match map.get(key) {
        None => fallback(),
        Some(row) => row.value.parse::<T>().unwrap_or_else(|_| {
            warn!(
                target: "app::settings",
                key,
                value = %row.value,
                "stored setting invalid, falling back to default"
            );
            fallback()
        }),
    }
}

fn ensure_valid_logo(logo: &str) -> AppResult<()> {
    let accepted = logo.starts_with("data:image/")
        || logo.starts_with("https://")
        || logo.starts_with("http://");
    if accepted {
        Ok(())
    } else {
        Err(AppError::validation(
            "Company logo must be an image data URI or an http(s) URL",
        ))
    }
}

fn ensure_selectable_year(year: &str) -> AppResult<()> {
    match year.parse::<i32>() {
        Ok(value) if value <= LAST_SELECTABLE_YEAR => Ok(()),
        _ => Err(AppError::validation(format!(
            "Year must not be later than {LAST_SELECTABLE_YEAR}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, SettingsService) {
        let dir = TempDir::new().unwrap();
        let pool = DbPool::new(dir.path().join("settings.sqlite")).unwrap();
        (dir, SettingsService::new(pool).unwrap())
    }

    #[test]
    fn defaults_come_from_seeded_rows() {
        let (_dir, service) = service();
        let settings = service.get().unwrap();
        assert_eq!(settings.company_name, DEFAULT_COMPANY_NAME);
        assert_eq!(settings.company_logo.as_deref(), Some(DEFAULT_COMPANY_LOGO));
        assert_eq!(settings.default_quarter, Quarter::Q1);
        assert_eq!(settings.default_year, current_year().to_string());
        assert_eq!(settings.leaderboard_period, LeaderboardPeriod::Quarterly);
    }

    #[test]
    fn updates_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.sqlite");
        let service = SettingsService::new(DbPool::new(&path).unwrap()).unwrap();

        service
            .update(SettingsUpdateInput {
                company_name: Some("  Acme Appliance  ".into()),
                company_logo: Some(None),
                default_quarter: Some(Quarter::Q3),
                default_year: Some("2031".into()),
                leaderboard_period: Some(LeaderboardPeriod::Weekly),
            })
            .unwrap();

        let reopened = SettingsService::new(DbPool::new(&path).unwrap()).unwrap();
        let settings = reopened.get().unwrap();
        assert_eq!(settings.company_name, "Acme Appliance");
        assert_eq!(settings.company_logo, None);
        assert_eq!(settings.default_quarter, Quarter::Q3);
        assert_eq!(settings.default_year, "2031");
        assert_eq!(settings.leaderboard_period, LeaderboardPeriod::Weekly);
        assert_eq!(reopened.default_period().unwrap().to_string(), "Q3 2031");
    }

    #[test]
    fn rejects_invalid_values() {
        let (_dir, service) = service();
        let cases = [
            SettingsUpdateInput {
                company_name: Some("   ".into()),
                ..Default::default()
            },
            SettingsUpdateInput {
                company_logo: Some(Some("ftp://logo".into())),
                ..Default::default()
            },
            SettingsUpdateInput {
                default_year: Some("2051".into()),
                ..Default::default()
            },
            SettingsUpdateInput {
                default_year: Some("next".into()),
                ..Default::default()
            },
        ];

        for input in cases {
            assert!(service.update(input).unwrap_err().is_validation());
        }
        assert_eq!(service.get().unwrap().company_name, DEFAULT_COMPANY_NAME);
    }

    #[test]
    fn corrupt_stored_values_fall_back() {
        let (_dir, service) = service();
        service
            .db
            .with_connection(|conn| {
                KeyValueRepository::upsert(conn, KvTable::Settings, KEY_DEFAULT_QUARTER, "Q9")?;
                KeyValueRepository::upsert(conn, KvTable::Settings, KEY_LEADERBOARD_PERIOD, "Daily")?;
                KeyValueRepository::upsert(conn, KvTable::Settings, KEY_DEFAULT_YEAR, "soon")
            })
            .unwrap();

        let settings = service.get().unwrap();
        assert_eq!(settings.default_quarter, Quarter::Q1);
        assert_eq!(settings.leaderboard_period, LeaderboardPeriod::Quarterly);
        assert_eq!(settings.default_year, current_year().to_string());
    }
}
