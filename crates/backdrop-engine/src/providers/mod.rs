mod dryrun;
mod replicate;

use backdrop_contracts::generation::{GenerationRequest, GenerationResult};
use backdrop_contracts::BackdropError;
use reqwest::blocking::Response as HttpResponse;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::StudioConfig;

pub use dryrun::DryrunProvider;
pub use replicate::ReplicateProvider;

pub const PROVIDER_NAMES: &[&str] = &["dryrun", "replicate"];

/// The single outbound boundary: one request in, one result out.
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, BackdropError>;
}

pub fn build_provider(config: &StudioConfig) -> Result<Box<dyn GenerationProvider>, BackdropError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "replicate" => Ok(Box::new(ReplicateProvider::new(config)?)),
        "dryrun" => Ok(Box::new(DryrunProvider)),
        other => Err(BackdropError::Config(format!(
            "unknown provider '{other}'; expected one of {}",
            PROVIDER_NAMES.join(", ")
        ))),
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value, BackdropError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| {
        BackdropError::RemoteService(format!("{provider} response body read failed: {err}"))
    })?;
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(BackdropError::Authentication(format!(
            "{provider} rejected the API token ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    if !status.is_success() {
        return Err(BackdropError::RemoteService(format!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    serde_json::from_str(&body).map_err(|_| {
        BackdropError::RemoteService(format!(
            "{provider} returned invalid JSON payload: {}",
            truncate_text(&body, 512)
        ))
    })
}

fn transport_error(provider: &str, url: &str, err: reqwest::Error) -> BackdropError {
    if err.is_timeout() {
        return BackdropError::RemoteService(format!("{provider} request timed out ({url})"));
    }
    BackdropError::RemoteService(format!("{provider} request failed ({url}): {err}"))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
