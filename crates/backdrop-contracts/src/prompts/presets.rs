pub const OWN_PROMPT_LABEL: &str = "Use my own prompt";

pub const PRESET_PROMPTS: &[&str] = &[
    "Dimly lit, moody environment with deep shadows and a hint of fog. Rich colors create an atmosphere of mystery and intrigue, perfect for dramatic product photography.",
    "Elegant studio backdrop for product photography. Soft gradient lighting, minimalist design, neutral tones with subtle texture.",
];

/// Preset text for a zero-based index into [`PRESET_PROMPTS`].
pub fn preset_text(index: usize) -> Option<&'static str> {
    PRESET_PROMPTS.get(index).copied()
}
