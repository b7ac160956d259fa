use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BackdropError;

pub const DEFAULT_SEED: i64 = 42;
pub const DEFAULT_OUTPUT_QUALITY: u8 = 100;
pub const DEFAULT_SAFETY_TOLERANCE: u8 = 2;
pub const MAX_SAFETY_TOLERANCE: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "3:2")]
    Landscape,
    #[serde(rename = "2:3")]
    Portrait,
    #[serde(rename = "4:5")]
    Social,
    #[serde(rename = "5:4")]
    Print,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "3:4")]
    Classic,
    #[serde(rename = "4:3")]
    Screen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 9] = [
        Self::Square,
        Self::Wide,
        Self::Landscape,
        Self::Portrait,
        Self::Social,
        Self::Print,
        Self::Tall,
        Self::Classic,
        Self::Screen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Wide => "16:9",
            Self::Landscape => "3:2",
            Self::Portrait => "2:3",
            Self::Social => "4:5",
            Self::Print => "5:4",
            Self::Tall => "9:16",
            Self::Classic => "3:4",
            Self::Screen => "4:3",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = BackdropError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| BackdropError::Config(format!("unsupported aspect ratio '{trimmed}'")))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = BackdropError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut lowered = raw.trim().to_ascii_lowercase();
        if let Some(value) = lowered.strip_prefix("image/") {
            lowered = value.to_string();
        }
        match lowered.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            _ => Err(BackdropError::Config(format!(
                "unsupported output format '{}'",
                raw.trim()
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed request parameters shared by every submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationSettings {
    aspect_ratio: AspectRatio,
    output_format: OutputFormat,
    output_quality: u8,
    prompt_upsampling: bool,
    safety_tolerance: u8,
    seed: i64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            output_format: OutputFormat::default(),
            output_quality: DEFAULT_OUTPUT_QUALITY,
            prompt_upsampling: false,
            safety_tolerance: DEFAULT_SAFETY_TOLERANCE,
            seed: DEFAULT_SEED,
        }
    }
}

impl GenerationSettings {
    pub fn new(
        aspect_ratio: AspectRatio,
        output_format: OutputFormat,
        output_quality: u8,
        prompt_upsampling: bool,
        safety_tolerance: u8,
        seed: i64,
    ) -> Result<Self, BackdropError> {
        if output_quality > 100 {
            return Err(BackdropError::Config(format!(
                "output quality {output_quality} outside 0-100"
            )));
        }
        if !(1..=MAX_SAFETY_TOLERANCE).contains(&safety_tolerance) {
            return Err(BackdropError::Config(format!(
                "safety tolerance {safety_tolerance} outside 1-{MAX_SAFETY_TOLERANCE}"
            )));
        }
        Ok(Self {
            aspect_ratio,
            output_format,
            output_quality,
            prompt_upsampling,
            safety_tolerance,
            seed,
        })
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn output_quality(&self) -> u8 {
        self.output_quality
    }

    pub fn prompt_upsampling(&self) -> bool {
        self.prompt_upsampling
    }

    pub fn safety_tolerance(&self) -> u8 {
        self.safety_tolerance
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }
}

/// Where the attached image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageReference {
    DataUrl(String),
    RemoteUrl(String),
}

impl ImageReference {
    pub fn remote(url: &str) -> Result<Self, BackdropError> {
        let trimmed = url.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
            return Err(BackdropError::Encoding(format!(
                "image URL must be http(s): '{trimmed}'"
            )));
        }
        Ok(Self::RemoteUrl(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DataUrl(value) | Self::RemoteUrl(value) => value,
        }
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            Self::DataUrl(_) => "data_url",
            Self::RemoteUrl(_) => "url",
        }
    }
}

/// One remote invocation. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    image: Option<ImageReference>,
    settings: GenerationSettings,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        image: Option<ImageReference>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            image,
            settings,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&ImageReference> {
        self.image.as_ref()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Url(String),
    Inline { bytes: Vec<u8>, mime_type: String },
}

impl GenerationResult {
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { bytes, mime_type } => format!("{mime_type}, {} bytes", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_settings_match_fixed_configuration() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.aspect_ratio().as_str(), "1:1");
        assert_eq!(settings.output_quality(), 100);
        assert!(!settings.prompt_upsampling());
        assert_eq!(settings.safety_tolerance(), 2);
        assert_eq!(settings.seed(), DEFAULT_SEED);
    }

    #[test]
    fn settings_reject_out_of_range_values() {
        let quality = GenerationSettings::new(
            AspectRatio::Square,
            OutputFormat::Png,
            101,
            false,
            2,
            1,
        );
        assert!(matches!(quality, Err(BackdropError::Config(_))));

        let tolerance = GenerationSettings::new(
            AspectRatio::Square,
            OutputFormat::Png,
            90,
            false,
            0,
            1,
        );
        assert!(matches!(tolerance, Err(BackdropError::Config(_))));
    }

    #[test]
    fn aspect_ratio_and_format_parse_wire_values() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Wide);
        assert!("7:3".parse::<AspectRatio>().is_err());
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpg);
        assert_eq!("image/png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert!("webp".parse::<OutputFormat>().is_err());
        assert_eq!(
            serde_json::to_value(AspectRatio::Tall).unwrap(),
            json!("9:16")
        );
    }

    #[test]
    fn remote_reference_requires_http_scheme() {
        let reference = ImageReference::remote(" https://example.test/a.png ").unwrap();
        assert_eq!(reference.as_str(), "https://example.test/a.png");
        assert_eq!(reference.source_label(), "url");
        assert!(matches!(
            ImageReference::remote("/tmp/a.png"),
            Err(BackdropError::Encoding(_))
        ));
    }

    #[test]
    fn request_keeps_settings_and_seed_override() {
        let settings = GenerationSettings::default().with_seed(7);
        let request = GenerationRequest::new("neon skyline at dusk", None, settings);
        assert_eq!(request.prompt(), "neon skyline at dusk");
        assert!(request.image().is_none());
        assert_eq!(request.settings().seed(), 7);
    }
}
