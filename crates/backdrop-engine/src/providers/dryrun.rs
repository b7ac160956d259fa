use std::io::Cursor;

use backdrop_contracts::generation::{
    AspectRatio, GenerationRequest, GenerationResult, OutputFormat,
};
use backdrop_contracts::BackdropError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use super::GenerationProvider;

const DRYRUN_UNIT_PX: u32 = 64;

/// Offline stand-in for the remote model: a solid colour derived from the
/// prompt and seed, so identical requests give identical bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunProvider;

impl GenerationProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, BackdropError> {
        let settings = request.settings();
        let (width, height) = dryrun_dims(settings.aspect_ratio());
        let (r, g, b) = color_from_prompt(request.prompt(), settings.seed());
        let image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));

        let format = match settings.output_format() {
            OutputFormat::Jpg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        };
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut cursor, format)
            .map_err(|err| BackdropError::RemoteService(format!("dryrun render failed: {err}")))?;

        tracing::debug!(width, height, seed = settings.seed(), "dryrun image rendered");
        Ok(GenerationResult::Inline {
            bytes: cursor.into_inner(),
            mime_type: settings.output_format().mime_type().to_string(),
        })
    }
}

fn dryrun_dims(ratio: AspectRatio) -> (u32, u32) {
    let (w, h) = ratio
        .as_str()
        .split_once(':')
        .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
        .unwrap_or((1, 1));
    (w * DRYRUN_UNIT_PX, h * DRYRUN_UNIT_PX)
}

fn color_from_prompt(prompt: &str, seed: i64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}
