mod presets;
mod resolver;

pub use presets::{preset_text, PRESET_PROMPTS, OWN_PROMPT_LABEL};
pub use resolver::{resolve_prompt, PromptChoice, PromptSelection};
