use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::ai::{AiProviderMetadata, AiStatusDto, GeneratedStats};
use crate::models::technician::TechnicianStats;
use crate::services::prompt_templates::{
    build_generate_content_payload, technician_validation_schema,
};
use crate::utils::redact::redact_sensitive_data;

pub const ENV_API_KEY: &str = "PROCARD_GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";
pub const ENV_BASE_URL: &str = "PROCARD_GEMINI_BASE_URL";
pub const ENV_MODEL: &str = "PROCARD_GEMINI_MODEL";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const PROVIDER_ID: &str = "gemini";
const MISSING_KEY_MESSAGE: &str = "Gemini API key is not configured";

/// Source of random technician stats for the card form.
#[async_trait]
pub trait DataGenerator: Send + Sync {
    /// Produces one stats record. Badges are always empty.
    async fn generate(&self) -> AppResult<TechnicianStats>;

    async fn status(&self) -> AppResult<AiStatusDto> {
        Ok(AiStatusDto {
            has_api_key: true,
            last_checked_at: Utc::now().to_rfc3339(),
            ..AiStatusDto::default()
        })
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub http_timeout: Duration,
    pub retry_delays: Vec<Duration>,
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http_timeout: Duration::from_secs(30),
            retry_delays: vec![
                Duration::from_secs(0),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            temperature: 1.0,
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: read_env(ENV_API_KEY).or_else(|| read_env(ENV_API_KEY_FALLBACK)),
            api_base_url: read_env(ENV_BASE_URL).unwrap_or(defaults.api_base_url),
            model: read_env(ENV_MODEL).unwrap_or(defaults.model),
            ..defaults
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Shows only the edges of a key, e.g. `AIza…9xQk`.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

/// Generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiDataGenerator {
    config: GeminiConfig,
    provider: Option<GeminiProvider>,
}

impl GeminiDataGenerator {
    pub fn new(config: GeminiConfig) -> AppResult<Self> {
        let provider = match config.api_key.clone() {
            Some(api_key) => Some(GeminiProvider::try_new(&config, api_key)?),
            None => {
                warn!(target: "app::ai", "{MISSING_KEY_MESSAGE}; data generation is disabled");
                None
            }
        };
        Ok(Self { config, provider })
    }

    pub fn from_env() -> AppResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn has_api_key(&self) -> bool {
        self.provider.is_some()
    }

    fn current_provider(&self) -> AppResult<&GeminiProvider> {
        self.provider
            .as_ref()
            .ok_or_else(|| AppError::ai(AiErrorCode::MissingApiKey, MISSING_KEY_MESSAGE))
    }
}

#[async_trait]
impl DataGenerator for GeminiDataGenerator {
    async fn generate(&self) -> AppResult<TechnicianStats> {
        let provider = self.current_provider()?;
        let result = provider.invoke_generate().await?;
        info!(
            target: "app::ai",
            correlation_id = %result.correlation_id,
            latency_ms = result.latency_ms,
            "technician data generated"
        );
        Ok(result.stats.into_stats())
    }

    async fn status(&self) -> AppResult<AiStatusDto> {
        let last_checked_at = Utc::now().to_rfc3339();
        let Some(provider) = self.provider.as_ref() else {
            return Ok(AiStatusDto {
                has_api_key: false,
                masked_api_key: None,
                provider: None,
                message: Some(MISSING_KEY_MESSAGE.to_string()),
                last_checked_at,
            });
        };

        let masked_api_key = self.config.api_key.as_deref().map(mask_api_key);
        match provider.ping().await {
            Ok(metadata) => Ok(AiStatusDto {
                has_api_key: true,
                masked_api_key,
                provider: Some(metadata),
                message: None,
                last_checked_at,
            }),
            Err(error) => {
                warn!(target: "app::ai", error = %error, "Gemini provider ping failed");
                Err(error)
            }
        }
    }
}

struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model_url: String,
    endpoint: String,
    model: String,
    retry_delays: Vec<Duration>,
    temperature: f32,
}

struct GenerationResult {
    stats: GeneratedStats,
    latency_ms: u128,
    correlation_id: String,
}

impl GeminiProvider {
    fn try_new(config: &GeminiConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build Gemini HTTP client: {err}")))?;

        let base_url = config.api_base_url.trim_end_matches('/');
        let model_url = format!("{}/v1beta/models/{}", base_url, config.model);
        let endpoint = format!("{model_url}:generateContent");

        let retry_delays = if config.retry_delays.is_empty() {
            vec![Duration::ZERO]
        } else {
            config.retry_delays.clone()
        };

        Ok(Self {
            client,
            api_key,
            model_url,
            endpoint,
            model: config.model.clone(),
            retry_delays,
            temperature: config.temperature,
        })
    }

    async fn invoke_generate(&self) -> AppResult<GenerationResult> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = build_generate_content_payload(self.temperature);
        let attempts = self.retry_delays.len();
        let mut last_error: Option<AppError> = None;

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            if !delay.is_zero() {
                sleep(*delay).await;
            }

            debug!(
                target: "app::ai::gemini",
                attempt = attempt + 1,
                correlation_id = %correlation_id,
                model = %self.model,
                "invoking Gemini"
            );

            let start = Instant::now();
            let response = self
                .client
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&request_body)
                .send()
                .await;

            let (error, retryable) = match response {
                Ok(resp) if resp.status().is_success() => {
                    let latency_ms = start.elapsed().as_millis();
                    let body: JsonValue = resp.json().await.map_err(|err| {
                        AppError::ai_with_details(
                            AiErrorCode::InvalidResponse,
                            "failed to decode Gemini response",
                            Some(correlation_id.as_str()),
                            Some(json!({ "reason": err.to_string() })),
                        )
                    })?;

                    let tokens = Self::extract_tokens(&body);
                    debug!(
                        target: "app::ai::gemini",
                        correlation_id = %correlation_id,
                        latency_ms,
                        tokens = ?tokens,
                        "Gemini responded"
                    );

                    let text = body
                        .pointer("/candidates/0/content/parts/0/text")
                        .and_then(|value| value.as_str())
                        .ok_or_else(|| {
                            AppError::ai_with_details(
                                AiErrorCode::InvalidResponse,
                                "Gemini response has no candidate text",
                                Some(correlation_id.as_str()),
                                Some(json!({
                                    "reason": "missing_candidate_text",
                                    "finishReason": body.pointer("/candidates/0/finishReason"),
                                })),
                            )
                        })?;

                    let document = Self::parse_content(text, &correlation_id)?;
                    let stats = Self::validate_document(document, &correlation_id)?;
                    return Ok(GenerationResult {
                        stats,
                        latency_ms,
                        correlation_id,
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let (error, retryable) = Self::map_http_error(status, &correlation_id);
                    warn!(
                        target: "app::ai::gemini",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        retryable,
                        "Gemini returned a non-success status"
                    );
                    (error, retryable)
                }
                Err(err) => {
                    let (error, retryable) = Self::error_from_reqwest(err, &correlation_id);
                    warn!(
                        target: "app::ai::gemini",
                        correlation_id = %correlation_id,
                        retryable,
                        "Gemini request failed"
                    );
                    (error, retryable)
                }
            };

            if !retryable || attempt + 1 == attempts {
                return Err(error);
            }
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::ai_with_details(
                AiErrorCode::GeminiUnavailable,
                "Gemini request failed",
                Some(correlation_id.as_str()),
                None,
            )
        }))
    }

    /// Accepts bare JSON or JSON wrapped in a Markdown code fence.
    fn parse_content(content: &str, correlation_id: &str) -> AppResult<JsonValue> {
        let trimmed = content.trim();
        let cleaned = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```JSON")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        serde_json::from_str(cleaned).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("Gemini returned non-JSON content: {err}"),
                Some(correlation_id),
                Some(json!({ "reason": "invalid_json" })),
            )
        })
    }

    fn validate_document(document: JsonValue, correlation_id: &str) -> AppResult<GeneratedStats> {
        let schema_value = technician_validation_schema();
        let schema = jsonschema::JSONSchema::compile(&schema_value)
            .map_err(|err| AppError::other(format!("invalid technician schema: {err}")))?;

        if let Err(validation_errors) = schema.validate(&document) {
            let problems: Vec<String> = validation_errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    let path_display = if path.is_empty() { "root".to_string() } else { path };
                    format!("{path_display}: {e}")
                })
                .collect();

            return Err(AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "Gemini response does not match the technician schema",
                Some(correlation_id),
                Some(json!({
                    "problems": problems,
                    "document": redact_sensitive_data(&document),
                })),
            ));
        }

        serde_json::from_value(document).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("failed to read technician data: {err}"),
                Some(correlation_id),
                None,
            )
        })
    }

    fn extract_tokens(body: &JsonValue) -> HashMap<String, u64> {
        let mut tokens = HashMap::new();

        if let Some(usage) = body.get("usageMetadata") {
            for (field, key) in [
                ("promptTokenCount", "prompt"),
                ("candidatesTokenCount", "completion"),
                ("totalTokenCount", "total"),
            ] {
                if let Some(value) = usage.get(field).and_then(|v| v.as_u64()) {
                    tokens.insert(key.to_string(), value);
                }
            }
        }

        tokens
    }

    fn build_provider_metadata(&self, latency_ms: u128, correlation_id: &str) -> AiProviderMetadata {
        AiProviderMetadata {
            provider_id: Some(PROVIDER_ID.to_string()),
            model: Some(self.model.clone()),
            latency_ms: Some(latency_ms),
            tokens_used: None,
            extra: Some(json!({ "correlationId": correlation_id })),
        }
    }

    async fn ping(&self) -> AppResult<AiProviderMetadata> {
        let correlation_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let response = self
            .client
            .get(&self.model_url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(self
                .build_provider_metadata(start.elapsed().as_millis(), &correlation_id)),
            Ok(resp) => {
                let status = resp.status();
                warn!(
                    target: "app::ai::gemini",
                    correlation_id = %correlation_id,
                    status = status.as_u16(),
                    "Gemini ping returned a non-success status"
                );
                Err(Self::map_http_error(status, &correlation_id).0)
            }
            Err(err) => {
                warn!(
                    target: "app::ai::gemini",
                    correlation_id = %correlation_id,
                    "Gemini ping request failed"
                );
                Err(Self::error_from_reqwest(err, &correlation_id).0)
            }
        }
    }

    /// Maps a failed status to an error and whether the call may be retried.
    fn map_http_error(status: StatusCode, correlation_id: &str) -> (AppError, bool) {
        let (code, message, retryable) = match status {
            StatusCode::UNAUTHORIZED => (
                AiErrorCode::MissingApiKey,
                "Gemini API key is invalid or unauthorised".to_string(),
                false,
            ),
            StatusCode::FORBIDDEN => (
                AiErrorCode::Forbidden,
                "Gemini API key lacks permission for this model".to_string(),
                false,
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                AiErrorCode::RateLimited,
                "Gemini rate limit reached, try again shortly".to_string(),
                true,
            ),
            status if status.is_server_error() => (
                AiErrorCode::GeminiUnavailable,
                format!("Gemini is temporarily unavailable (status {})", status.as_u16()),
                true,
            ),
            StatusCode::BAD_REQUEST => (
                AiErrorCode::InvalidRequest,
                "Gemini rejected the request".to_string(),
                false,
            ),
            StatusCode::NOT_FOUND => (
                AiErrorCode::InvalidRequest,
                "Gemini model or endpoint not found".to_string(),
                false,
            ),
            status => (
                AiErrorCode::Unknown,
                format!("Gemini returned status {}", status.as_u16()),
                false,
            ),
        };

        (
            AppError::ai_with_details(code, message, Some(correlation_id), None),
            retryable,
        )
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> (AppError, bool) {
        if err.is_timeout() {
            (
                AppError::ai_with_details(
                    AiErrorCode::HttpTimeout,
                    "Gemini request timed out",
                    Some(correlation_id),
                    None,
                ),
                true,
            )
        } else if err.is_connect() {
            (
                AppError::ai_with_details(
                    AiErrorCode::GeminiUnavailable,
                    "could not connect to Gemini",
                    Some(correlation_id),
                    None,
                ),
                true,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            (
                AppError::ai_with_details(
                    AiErrorCode::Unknown,
                    format!("Gemini request failed: {err}"),
                    Some(correlation_id),
                    None,
                ),
                false,
            )
        }
    }
}

pub mod testing {
    use super::*;

    /// Exposes status mapping for integration tests.
    pub fn map_http_error(status: StatusCode) -> (AppError, bool) {
        GeminiProvider::map_http_error(status, "test-correlation-id")
    }

    /// Parses candidate text the way a live response is parsed.
    pub fn parse_candidate_text(text: &str) -> AppResult<TechnicianStats> {
        let document = GeminiProvider::parse_content(text, "test-correlation-id")?;
        GeminiProvider::validate_document(document, "test-correlation-id")
            .map(GeneratedStats::into_stats)
    }

    /// Generator pointed at a mock server with short retry delays.
    pub fn generator_for(base_url: &str, timeout: Duration) -> AppResult<GeminiDataGenerator> {
        GeminiDataGenerator::new(GeminiConfig {
            api_key: Some("test-key-0123456789".to_string()),
            api_base_url: base_url.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http_timeout: timeout,
            retry_delays: vec![Duration::ZERO, Duration::from_millis(10), Duration::from_millis(10)],
            temperature: 1.0,
        })
    }
}
