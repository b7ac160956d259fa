use std::fmt;

use backdrop_contracts::generation::{GenerationResult, ImageReference};
use backdrop_contracts::prompts::PromptChoice;
use backdrop_contracts::BackdropError;

use crate::encoder::UploadedImage;

/// Form states visited by one submission. Terminal states hand control back
/// to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    PromptPending,
    PromptResolved,
    PromptMissing,
    ImageCheck,
    RequestSent,
    NoImageInfo,
    ResultReady,
    RequestFailed,
}

impl SubmissionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PromptPending => "prompt_pending",
            Self::PromptResolved => "prompt_resolved",
            Self::PromptMissing => "prompt_missing",
            Self::ImageCheck => "image_check",
            Self::RequestSent => "request_sent",
            Self::NoImageInfo => "no_image_info",
            Self::ResultReady => "result_ready",
            Self::RequestFailed => "request_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PromptMissing | Self::NoImageInfo | Self::ResultReady | Self::RequestFailed
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the user has put into the form at the moment they press
/// generate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub choice: PromptChoice,
    pub custom_prompt: String,
    pub upload: Option<UploadedImage>,
    pub image_url: Option<String>,
    pub seed: Option<i64>,
}

impl SubmissionForm {
    pub fn has_image(&self) -> bool {
        self.upload.is_some()
            || self
                .image_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty())
    }

    /// Drops any attached image, upload or URL.
    pub fn clear_image(&mut self) {
        self.upload = None;
        self.image_url = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    PromptMissing,
    NoImageInfo {
        prompt: String,
    },
    ResultReady {
        prompt: String,
        input: Option<ImageReference>,
        result: GenerationResult,
    },
    RequestFailed {
        prompt: String,
        error: BackdropError,
    },
}

impl SubmissionOutcome {
    pub fn state(&self) -> SubmissionState {
        match self {
            Self::PromptMissing => SubmissionState::PromptMissing,
            Self::NoImageInfo { .. } => SubmissionState::NoImageInfo,
            Self::ResultReady { .. } => SubmissionState::ResultReady,
            Self::RequestFailed { .. } => SubmissionState::RequestFailed,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::PromptMissing => None,
            Self::NoImageInfo { prompt }
            | Self::ResultReady { prompt, .. }
            | Self::RequestFailed { prompt, .. } => Some(prompt),
        }
    }

    pub fn error(&self) -> Option<&BackdropError> {
        match self {
            Self::RequestFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// The record of one press of the generate button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub trace: Vec<SubmissionState>,
    pub outcome: SubmissionOutcome,
}

impl Submission {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SubmissionOutcome::ResultReady { .. })
    }

    pub fn terminal_state(&self) -> SubmissionState {
        self.outcome.state()
    }
}

/// Accumulates the visited states while a submission runs.
#[derive(Debug, Default)]
pub(crate) struct StateTrace {
    states: Vec<SubmissionState>,
}

impl StateTrace {
    pub(crate) fn enter(&mut self, state: SubmissionState) {
        self.states.push(state);
    }

    pub(crate) fn into_states(self) -> Vec<SubmissionState> {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::{SubmissionForm, SubmissionOutcome, SubmissionState};
    use crate::encoder::UploadedImage;
    use backdrop_contracts::BackdropError;

    #[test]
    fn only_outcome_states_are_terminal() {
        let terminal: Vec<&str> = [
            SubmissionState::Idle,
            SubmissionState::PromptPending,
            SubmissionState::PromptResolved,
            SubmissionState::PromptMissing,
            SubmissionState::ImageCheck,
            SubmissionState::RequestSent,
            SubmissionState::NoImageInfo,
            SubmissionState::ResultReady,
            SubmissionState::RequestFailed,
        ]
        .into_iter()
        .filter(SubmissionState::is_terminal)
        .map(|state| state.label())
        .collect();
        assert_eq!(
            terminal,
            vec!["prompt_missing", "no_image_info", "result_ready", "request_failed"]
        );
    }

    #[test]
    fn blank_image_url_is_not_an_attachment() {
        let mut form = SubmissionForm {
            image_url: Some("  ".to_string()),
            ..SubmissionForm::default()
        };
        assert!(!form.has_image());

        form.upload = Some(UploadedImage::from_bytes("a.png", vec![1]).unwrap());
        assert!(form.has_image());
        form.clear_image();
        assert!(!form.has_image());
    }

    #[test]
    fn outcome_exposes_prompt_and_error() {
        let failed = SubmissionOutcome::RequestFailed {
            prompt: "studio".to_string(),
            error: BackdropError::RemoteService("boom".to_string()),
        };
        assert_eq!(failed.prompt(), Some("studio"));
        assert_eq!(failed.error().map(BackdropError::kind), Some("remote_service"));
        assert_eq!(SubmissionOutcome::PromptMissing.prompt(), None);
    }
}
