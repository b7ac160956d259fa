use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const BUNDLED_GALLERY_JSON: &str = include_str!("../resources/gallery.json");

const BUNDLED_INPUTS: &[(&str, &[u8])] = &[
    (
        "examples/perfume-bottle.png",
        include_bytes!("../resources/examples/perfume-bottle.png"),
    ),
    (
        "examples/sneaker.png",
        include_bytes!("../resources/examples/sneaker.png"),
    ),
];

/// A bundled input image paired with a previously generated result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleEntry {
    pub title: String,
    #[serde(default)]
    pub prompt: Option<String>,
    pub input_image: String,
    pub result_url: String,
}

/// Ordered, read-only example collection.
///
/// Input images of the bundled gallery are compiled in; an override file's
/// input images are resolved relative to that file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gallery {
    entries: Vec<ExampleEntry>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Gallery {
    pub fn bundled() -> Result<Self> {
        let gallery = Self::from_json(BUNDLED_GALLERY_JSON).context("bundled gallery is invalid")?;
        gallery.check_inputs()?;
        Ok(gallery)
    }

    /// Reads `path` when given, otherwise falls back to the bundled list.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let Some(path) = override_path else {
            return Self::bundled();
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading gallery {}", path.display()))?;
        let mut gallery =
            Self::from_json(&raw).with_context(|| format!("invalid gallery {}", path.display()))?;
        gallery.base_dir = Some(
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        );
        gallery.check_inputs()?;
        Ok(gallery)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let gallery: Gallery = serde_json::from_str(raw)?;
        for (idx, entry) in gallery.entries.iter().enumerate() {
            if entry.title.trim().is_empty() {
                bail!("gallery entry {idx} has an empty title");
            }
            if entry.input_image.trim().is_empty() {
                bail!("gallery entry '{}' has no input image", entry.title);
            }
            let lowered = entry.result_url.trim().to_ascii_lowercase();
            if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
                bail!(
                    "gallery entry '{}' result_url must be http(s): {}",
                    entry.title,
                    entry.result_url
                );
            }
        }
        Ok(gallery)
    }

    /// Raw bytes of an entry's input image.
    pub fn input_image_bytes(&self, entry: &ExampleEntry) -> Result<Vec<u8>> {
        match &self.base_dir {
            None => BUNDLED_INPUTS
                .iter()
                .find(|(name, _)| *name == entry.input_image)
                .map(|(_, bytes)| bytes.to_vec())
                .with_context(|| format!("no bundled example image {}", entry.input_image)),
            Some(dir) => {
                let path = dir.join(&entry.input_image);
                std::fs::read(&path)
                    .with_context(|| format!("failed reading example image {}", path.display()))
            }
        }
    }

    fn check_inputs(&self) -> Result<()> {
        for entry in &self.entries {
            self.input_image_bytes(entry)
                .with_context(|| format!("gallery entry '{}' input image missing", entry.title))?;
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ExampleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
