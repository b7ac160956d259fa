use std::thread;
use std::time::{Duration, Instant};

use backdrop_contracts::generation::{
    AspectRatio, GenerationRequest, GenerationResult, OutputFormat,
};
use backdrop_contracts::BackdropError;
use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

use super::{response_json_or_error, transport_error, GenerationProvider};
use crate::config::{ApiToken, StudioConfig};
use crate::encoder::decode_data_url;

// Replicate holds the connection for at most this long before answering with
// a pending prediction; it must stay under the client's default timeout.
const PREFER_WAIT_SECONDS: u64 = 25;

#[derive(Debug, Serialize)]
struct FluxInput<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_prompt: Option<&'a str>,
    aspect_ratio: AspectRatio,
    output_format: OutputFormat,
    output_quality: u8,
    prompt_upsampling: bool,
    safety_tolerance: u8,
    seed: i64,
}

#[derive(Debug, Serialize)]
struct PredictionPayload<'a> {
    input: FluxInput<'a>,
}

impl<'a> PredictionPayload<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let settings = request.settings();
        Self {
            input: FluxInput {
                prompt: request.prompt(),
                image_prompt: request.image().map(|image| image.as_str()),
                aspect_ratio: settings.aspect_ratio(),
                output_format: settings.output_format(),
                output_quality: settings.output_quality(),
                prompt_upsampling: settings.prompt_upsampling(),
                safety_tolerance: settings.safety_tolerance(),
                seed: settings.seed(),
            },
        }
    }
}

/// FLUX on Replicate, addressed by model name (`owner/name`).
pub struct ReplicateProvider {
    api_base: String,
    model: String,
    token: ApiToken,
    poll_interval: Duration,
    poll_timeout: Duration,
    http: HttpClient,
}

impl ReplicateProvider {
    pub fn new(config: &StudioConfig) -> Result<Self, BackdropError> {
        let token = config.credential()?.clone();
        Ok(Self {
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            model: config.model.trim().trim_matches('/').to_string(),
            token,
            poll_interval: config.poll_interval,
            poll_timeout: config.poll_timeout,
            http: HttpClient::new(),
        })
    }

    fn predictions_endpoint(&self) -> String {
        format!("{}/models/{}/predictions", self.api_base, self.model)
    }

    fn poll_prediction(&self, poll_url: &str) -> Result<Value, BackdropError> {
        let started = Instant::now();
        loop {
            thread::sleep(self.poll_interval);
            let response = self
                .http
                .get(poll_url)
                .bearer_auth(self.token.expose())
                .send()
                .map_err(|err| transport_error("Replicate poll", poll_url, err))?;
            let prediction = response_json_or_error("Replicate poll", response)?;
            match prediction_status(&prediction).as_str() {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => return Err(prediction_failure(&prediction)),
                status => {
                    tracing::debug!(
                        status,
                        elapsed_s = started.elapsed().as_secs_f64(),
                        "prediction pending"
                    );
                }
            }
            if started.elapsed() >= self.poll_timeout {
                return Err(BackdropError::RemoteService(format!(
                    "Replicate prediction timed out after {:.1}s",
                    self.poll_timeout.as_secs_f64()
                )));
            }
        }
    }
}

impl GenerationProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, BackdropError> {
        let endpoint = self.predictions_endpoint();
        let payload = PredictionPayload::from_request(request);
        tracing::info!(
            model = %self.model,
            image = request.image().map(|image| image.source_label()).unwrap_or("none"),
            seed = request.settings().seed(),
            "creating prediction"
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(self.token.expose())
            .header("Prefer", format!("wait={PREFER_WAIT_SECONDS}"))
            .json(&payload)
            .send()
            .map_err(|err| transport_error("Replicate", &endpoint, err))?;
        let mut prediction = response_json_or_error("Replicate", response)?;

        match prediction_status(&prediction).as_str() {
            "succeeded" => {}
            "starting" | "processing" => {
                let poll_url = prediction
                    .get("urls")
                    .and_then(|urls| urls.get("get"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        BackdropError::RemoteService(
                            "Replicate prediction missing poll URL".to_string(),
                        )
                    })?;
                prediction = self.poll_prediction(&poll_url)?;
            }
            _ => return Err(prediction_failure(&prediction)),
        }

        let result = prediction
            .get("output")
            .and_then(extract_output)
            .ok_or_else(|| {
                BackdropError::RemoteService(
                    "Replicate response returned no usable image output".to_string(),
                )
            })?;
        tracing::info!(result = %result.describe(), "prediction succeeded");
        Ok(result)
    }
}

fn prediction_status(prediction: &Value) -> String {
    prediction
        .get("status")
        .and_then(Value::as_str)
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn prediction_failure(prediction: &Value) -> BackdropError {
    let status = prediction_status(prediction);
    let detail = prediction
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("no error detail");
    BackdropError::RemoteService(format!(
        "Replicate prediction {}: {detail}",
        if status.is_empty() { "failed" } else { status.as_str() }
    ))
}

/// The first image found in a prediction's `output`: http(s) URLs are kept as
/// links, `data:image/...` strings become inline bytes.
fn extract_output(output: &Value) -> Option<GenerationResult> {
    match output {
        Value::String(raw) => {
            let trimmed = raw.trim();
            let lowered = trimmed.to_ascii_lowercase();
            if lowered.starts_with("data:image/") {
                let (mime_type, bytes) = decode_data_url(trimmed).ok()?;
                return Some(GenerationResult::Inline { bytes, mime_type });
            }
            if lowered.starts_with("http://") || lowered.starts_with("https://") {
                return Some(GenerationResult::Url(trimmed.to_string()));
            }
            None
        }
        Value::Array(rows) => rows.iter().find_map(extract_output),
        Value::Object(obj) => obj
            .get("url")
            .or_else(|| obj.get("output"))
            .and_then(extract_output),
        _ => None,
    }
}
