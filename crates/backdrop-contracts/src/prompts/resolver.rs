use std::fmt;

use crate::error::BackdropError;

use super::presets::{preset_text, OWN_PROMPT_LABEL, PRESET_PROMPTS};

/// The single-choice selector: the "own prompt" sentinel or one preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptChoice {
    #[default]
    Own,
    Preset(usize),
}

impl PromptChoice {
    /// Parses the selector as shown to users: `0`/`own` is the sentinel,
    /// `1..=N` pick a preset.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("own") {
            return Some(Self::Own);
        }
        match trimmed.parse::<usize>().ok()? {
            0 => Some(Self::Own),
            number if number <= PRESET_PROMPTS.len() => Some(Self::Preset(number - 1)),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Own => OWN_PROMPT_LABEL,
            Self::Preset(index) => preset_text(*index).unwrap_or(OWN_PROMPT_LABEL),
        }
    }
}

impl fmt::Display for PromptChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Own => write!(f, "0"),
            Self::Preset(index) => write!(f, "{}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSelection {
    Preset(String),
    Custom(String),
    None,
}

impl PromptSelection {
    pub fn from_inputs(choice: PromptChoice, free_text: &str) -> Self {
        match choice {
            PromptChoice::Preset(index) => match preset_text(index) {
                Some(text) => Self::Preset(text.to_string()),
                None => Self::None,
            },
            PromptChoice::Own if !free_text.is_empty() => Self::Custom(free_text.to_string()),
            PromptChoice::Own => Self::None,
        }
    }

    pub fn into_prompt(self) -> Result<String, BackdropError> {
        match self {
            Self::Preset(text) | Self::Custom(text) => Ok(text),
            Self::None => Err(BackdropError::MissingPrompt),
        }
    }
}

/// A preset always wins over free text; free text is returned verbatim.
pub fn resolve_prompt(choice: PromptChoice, free_text: &str) -> Result<String, BackdropError> {
    PromptSelection::from_inputs(choice, free_text).into_prompt()
}
