use thiserror::Error;

pub const MISSING_PROMPT_MESSAGE: &str = "Please select or type a prompt before generating.";

/// Failures that end the current user action.
///
/// None of these are fatal to the process: the caller reports them inline
/// and waits for the next explicit submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackdropError {
    #[error("{}", MISSING_PROMPT_MESSAGE)]
    MissingPrompt,
    #[error("image could not be encoded: {0}")]
    Encoding(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("remote service error: {0}")]
    RemoteService(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl BackdropError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingPrompt => "missing_prompt",
            Self::Encoding(_) => "encoding",
            Self::Authentication(_) => "authentication",
            Self::RemoteService(_) => "remote_service",
            Self::Config(_) => "config",
        }
    }
}
