pub mod config;
pub mod encoder;
pub mod presenter;
pub mod providers;
pub mod submission;

use anyhow::Result;
use backdrop_contracts::events::{EventPayload, EventWriter};
use backdrop_contracts::gallery::Gallery;
use backdrop_contracts::generation::{GenerationRequest, GenerationResult, ImageReference};
use backdrop_contracts::prompts::resolve_prompt;
use backdrop_contracts::BackdropError;
use serde_json::{json, Map, Value};
use uuid::Uuid;

pub use config::{ApiToken, ImagelessPolicy, StudioConfig};
pub use encoder::{decode_data_url, encode_data_url, UploadFormat, UploadedImage};
pub use providers::{build_provider, DryrunProvider, GenerationProvider, ReplicateProvider};
pub use submission::{Submission, SubmissionForm, SubmissionOutcome, SubmissionState};

use submission::StateTrace;

/// Owns the configured provider and runs one form submission at a time.
pub struct Studio {
    config: StudioConfig,
    provider: Box<dyn GenerationProvider>,
    events: Option<EventWriter>,
    gallery: Gallery,
}

impl Studio {
    pub fn new(config: StudioConfig, events: Option<EventWriter>) -> Result<Self> {
        let provider = build_provider(&config)?;
        let gallery = Gallery::load(config.gallery_path.as_deref())?;
        tracing::info!(
            provider = provider.name(),
            model = %config.model,
            examples = gallery.len(),
            "studio ready"
        );
        Ok(Self::with_provider(config, provider, gallery, events))
    }

    pub fn with_provider(
        config: StudioConfig,
        provider: Box<dyn GenerationProvider>,
        gallery: Gallery,
        events: Option<EventWriter>,
    ) -> Self {
        Self {
            config,
            provider,
            events,
            gallery,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Runs the form from `Idle` to a terminal state and back.
    ///
    /// Never panics and never returns an error: every failure is folded into
    /// the outcome so the caller can show it inline.
    pub fn submit(&self, form: &SubmissionForm) -> Submission {
        let id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("submit", submission_id = %id);
        let _entered = span.enter();

        let mut trace = StateTrace::default();
        self.enter(&id, &mut trace, SubmissionState::Idle);
        let outcome = self.run(&id, &mut trace, form);
        self.enter(&id, &mut trace, outcome.state());
        self.enter(&id, &mut trace, SubmissionState::Idle);
        self.emit_finished(&id, &outcome);

        match &outcome {
            SubmissionOutcome::ResultReady { result, .. } => {
                tracing::info!(result = %result.describe(), "submission finished")
            }
            SubmissionOutcome::RequestFailed { error, .. } => {
                tracing::warn!(kind = error.kind(), %error, "submission failed")
            }
            other => tracing::info!(state = %other.state(), "submission finished"),
        }

        Submission {
            id,
            trace: trace.into_states(),
            outcome,
        }
    }

    fn run(&self, id: &str, trace: &mut StateTrace, form: &SubmissionForm) -> SubmissionOutcome {
        self.enter(id, trace, SubmissionState::PromptPending);
        let prompt = match resolve_prompt(form.choice, &form.custom_prompt) {
            Ok(prompt) => prompt,
            Err(_) => return SubmissionOutcome::PromptMissing,
        };
        self.enter(id, trace, SubmissionState::PromptResolved);

        self.enter(id, trace, SubmissionState::ImageCheck);
        let image = match image_reference(form) {
            Ok(image) => image,
            Err(error) => return SubmissionOutcome::RequestFailed { prompt, error },
        };
        if image.is_none() && self.config.imageless == ImagelessPolicy::Skip {
            return SubmissionOutcome::NoImageInfo { prompt };
        }

        let mut settings = self.config.settings.clone();
        if let Some(seed) = form.seed {
            settings = settings.with_seed(seed);
        }
        let request = GenerationRequest::new(prompt.clone(), image.clone(), settings);
        self.enter(id, trace, SubmissionState::RequestSent);
        match self.provider.generate(&request) {
            Ok(result) => SubmissionOutcome::ResultReady {
                prompt,
                input: image,
                result,
            },
            Err(error) => SubmissionOutcome::RequestFailed { prompt, error },
        }
    }

    fn enter(&self, id: &str, trace: &mut StateTrace, state: SubmissionState) {
        trace.enter(state);
        tracing::debug!(state = %state, "state entered");
        self.emit(
            "submission_state",
            map_object(json!({
                "submission_id": id,
                "state": state.label(),
            })),
        );
    }

    fn emit_finished(&self, id: &str, outcome: &SubmissionOutcome) {
        let (result, error_kind, error) = match outcome {
            SubmissionOutcome::ResultReady { result, .. } => {
                (Some(result_summary(result)), None, None)
            }
            SubmissionOutcome::RequestFailed { error, .. } => {
                (None, Some(error.kind()), Some(error.to_string()))
            }
            SubmissionOutcome::PromptMissing => (
                None,
                Some(BackdropError::MissingPrompt.kind()),
                Some(BackdropError::MissingPrompt.to_string()),
            ),
            SubmissionOutcome::NoImageInfo { .. } => (None, None, None),
        };
        let image = match outcome {
            SubmissionOutcome::ResultReady { input, .. } => {
                input.as_ref().map(ImageReference::source_label)
            }
            _ => None,
        };
        self.emit(
            "submission_finished",
            map_object(json!({
                "submission_id": id,
                "outcome": outcome.state().label(),
                "provider": self.provider.name(),
                "prompt": outcome.prompt(),
                "image": image,
                "result": result,
                "error_kind": error_kind,
                "error": error,
            })),
        );
    }

    fn emit(&self, event_type: &str, payload: EventPayload) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit(event_type, payload) {
            tracing::warn!(event_type, error = %err, "event write failed");
        }
    }
}

fn image_reference(form: &SubmissionForm) -> Result<Option<ImageReference>, BackdropError> {
    if let Some(upload) = &form.upload {
        return upload.to_reference().map(Some);
    }
    match form.image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => ImageReference::remote(url).map(Some),
        _ => Ok(None),
    }
}

fn result_summary(result: &GenerationResult) -> Value {
    match result {
        GenerationResult::Url(url) => json!({"url": url}),
        GenerationResult::Inline { bytes, mime_type } => json!({
            "mime_type": mime_type,
            "bytes": bytes.len(),
        }),
    }
}

fn map_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
