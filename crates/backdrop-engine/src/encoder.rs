use std::fs;
use std::path::Path;

use backdrop_contracts::generation::ImageReference;
use backdrop_contracts::BackdropError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Every upload is labeled PNG on the wire, whatever its real format.
pub const DATA_URL_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Jpeg,
    Png,
}

impl UploadFormat {
    pub const ACCEPTED_EXTENSIONS: [&'static str; 3] = ["jpg", "jpeg", "png"];

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|value| value.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// An image the user attached to one submission.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    file_name: String,
    format: UploadFormat,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedImage")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedImage {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, BackdropError> {
        let file_name = file_name.into();
        let Some(format) = UploadFormat::from_file_name(&file_name) else {
            return Err(BackdropError::Encoding(format!(
                "'{file_name}' is not one of {}",
                UploadFormat::ACCEPTED_EXTENSIONS.join(", ")
            )));
        };
        if bytes.is_empty() {
            return Err(BackdropError::Encoding(format!("'{file_name}' is empty")));
        }
        Ok(Self {
            file_name,
            format,
            bytes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, BackdropError> {
        let bytes = fs::read(path).map_err(|err| {
            BackdropError::Encoding(format!("failed reading {}: {err}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        Self::from_bytes(file_name, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> UploadFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_reference(&self) -> Result<ImageReference, BackdropError> {
        encode_data_url(&self.bytes).map(ImageReference::DataUrl)
    }
}

pub fn encode_data_url(bytes: &[u8]) -> Result<String, BackdropError> {
    if bytes.is_empty() {
        return Err(BackdropError::Encoding("image payload is empty".to_string()));
    }
    Ok(data_url_with_mime(DATA_URL_MIME, bytes))
}

pub(crate) fn data_url_with_mime(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Splits a base64 data URL into its declared MIME type and raw bytes.
pub fn decode_data_url(value: &str) -> Result<(String, Vec<u8>), BackdropError> {
    let (meta, payload) = value
        .trim()
        .split_once(',')
        .ok_or_else(|| BackdropError::Encoding("invalid data URL".to_string()))?;
    let Some(meta) = meta.strip_prefix("data:") else {
        return Err(BackdropError::Encoding("invalid data URL".to_string()));
    };
    if !meta.ends_with(";base64") {
        return Err(BackdropError::Encoding(
            "data URL is not base64 encoded".to_string(),
        ));
    }
    let mime = meta
        .split(';')
        .next()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .unwrap_or(DATA_URL_MIME)
        .to_string();
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|err| BackdropError::Encoding(format!("data URL base64 decode failed: {err}")))?;
    Ok((mime, bytes))
}
