use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use backdrop_contracts::generation::GenerationSettings;
use backdrop_contracts::BackdropError;

pub const DEFAULT_PROVIDER: &str = "replicate";
pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-1.1-pro";

/// API token read once at startup. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// What to do when the form is submitted without an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagelessPolicy {
    /// Show an informational notice and never call the remote model.
    #[default]
    Skip,
    /// Send a text-only request.
    TextOnly,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub provider: String,
    pub api_base: String,
    pub model: String,
    pub credential: Option<ApiToken>,
    pub settings: GenerationSettings,
    pub imageless: ImagelessPolicy,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub gallery_path: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            credential: None,
            settings: GenerationSettings::default(),
            imageless: ImagelessPolicy::default(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(120),
            gallery_path: None,
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, BackdropError> {
        let mut config = Self::default();
        if let Some(provider) = non_empty_env("BACKDROP_PROVIDER") {
            config.provider = provider.to_ascii_lowercase();
        }
        if let Some(api_base) = non_empty_env("REPLICATE_API_BASE") {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty_env("BACKDROP_MODEL") {
            config.model = model;
        }
        config.credential = non_empty_env("REPLICATE_API_TOKEN")
            .or_else(|| non_empty_env("REPLICATE_API_KEY"))
            .and_then(ApiToken::new);
        if let Some(raw) = non_empty_env("BACKDROP_SEED") {
            let seed = raw.parse::<i64>().map_err(|_| {
                BackdropError::Config(format!("BACKDROP_SEED must be an integer, got '{raw}'"))
            })?;
            config.settings = config.settings.with_seed(seed);
        }
        if let Some(raw) = non_empty_env("BACKDROP_ALLOW_TEXT_ONLY") {
            if env_flag(&raw) {
                config.imageless = ImagelessPolicy::TextOnly;
            }
        }
        config.gallery_path = non_empty_env("BACKDROP_GALLERY").map(PathBuf::from);
        Ok(config)
    }

    pub fn default_seed(&self) -> i64 {
        self.settings.seed()
    }

    pub fn credential(&self) -> Result<&ApiToken, BackdropError> {
        self.credential.as_ref().ok_or_else(|| {
            BackdropError::Authentication(
                "REPLICATE_API_TOKEN is not set; add it to the environment before generating"
                    .to_string(),
            )
        })
    }
}

fn env_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
