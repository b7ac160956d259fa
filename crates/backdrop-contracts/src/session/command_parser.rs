use crate::prompts::PromptChoice;

use super::command_registry::{
    CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

/// One line of input to the interactive form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Noop,
    Help,
    Quit,
    Status,
    ListPresets,
    ChoosePreset(PromptChoice),
    SetPrompt(String),
    AttachImage(String),
    AttachImageUrl(String),
    ClearImage,
    SetSeed(i64),
    Generate,
    Gallery(Option<String>),
    Invalid { command: String, message: String },
    Unknown { command: String, arg: String },
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_path_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => arg.trim().to_string(),
    }
}

fn invalid(command: &str, message: impl Into<String>) -> SessionCommand {
    SessionCommand::Invalid {
        command: command.to_string(),
        message: message.into(),
    }
}

fn raw_arg_command(action: &str, command: &str, arg: &str) -> SessionCommand {
    match action {
        "choose_preset" => match PromptChoice::parse(arg) {
            Some(choice) => SessionCommand::ChoosePreset(choice),
            None => invalid(command, format!("unknown preset '{arg}'; see /presets")),
        },
        "attach_image_url" if arg.is_empty() => invalid(command, "/image_url requires a URL"),
        "attach_image_url" => SessionCommand::AttachImageUrl(arg.to_string()),
        "set_seed" => match arg.parse::<i64>() {
            Ok(seed) => SessionCommand::SetSeed(seed),
            Err(_) => invalid(command, format!("seed must be an integer, got '{arg}'")),
        },
        _ => SessionCommand::Unknown {
            command: command.to_string(),
            arg: arg.to_string(),
        },
    }
}

/// Parses one input line. Free text (bare or after `/prompt `) is kept exactly
/// as typed apart from the line terminator.
pub fn parse_command(text: &str) -> SessionCommand {
    let line = text.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return SessionCommand::Noop;
    }

    if let Some(slash_tail) = line.trim_start().strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let rest = &slash_tail[command_len..];
            let arg = rest.trim();

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                if action == "set_prompt" {
                    let text = rest.strip_prefix(' ').unwrap_or(rest);
                    return SessionCommand::SetPrompt(text.to_string());
                }
                return raw_arg_command(action, &command, arg);
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                let path = parse_single_path_arg(arg);
                return match action {
                    "attach_image" if path.is_empty() => invalid(&command, "/image requires a path"),
                    "attach_image" => SessionCommand::AttachImage(path),
                    _ => SessionCommand::Gallery((!path.is_empty()).then_some(path)),
                };
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return match action {
                    "list_presets" => SessionCommand::ListPresets,
                    "clear_image" => SessionCommand::ClearImage,
                    "generate" => SessionCommand::Generate,
                    "status" => SessionCommand::Status,
                    "help" => SessionCommand::Help,
                    _ => SessionCommand::Quit,
                };
            }

            return SessionCommand::Unknown {
                command,
                arg: arg.to_string(),
            };
        }
    }

    SessionCommand::SetPrompt(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::{parse_command, SessionCommand};
    use crate::prompts::PromptChoice;

    #[test]
    fn blank_lines_are_noops() {
        assert_eq!(parse_command("   \n"), SessionCommand::Noop);
    }

    #[test]
    fn bare_text_sets_the_custom_prompt() {
        assert_eq!(
            parse_command("neon skyline at dusk\n"),
            SessionCommand::SetPrompt("neon skyline at dusk".to_string())
        );
        assert_eq!(
            parse_command("/prompt warm wooden table"),
            SessionCommand::SetPrompt("warm wooden table".to_string())
        );
    }

    #[test]
    fn free_text_keeps_surrounding_whitespace() {
        assert_eq!(
            parse_command("  padded  "),
            SessionCommand::SetPrompt("  padded  ".to_string())
        );
        assert_eq!(
            parse_command("  padded  \r\n"),
            SessionCommand::SetPrompt("  padded  ".to_string())
        );
        assert_eq!(
            parse_command("/prompt   indented tail  "),
            SessionCommand::SetPrompt("  indented tail  ".to_string())
        );
    }

    #[test]
    fn preset_selection_uses_display_numbers() {
        assert_eq!(
            parse_command("/preset 2"),
            SessionCommand::ChoosePreset(PromptChoice::Preset(1))
        );
        assert_eq!(
            parse_command("/preset own"),
            SessionCommand::ChoosePreset(PromptChoice::Own)
        );
        assert!(matches!(
            parse_command("/preset 42"),
            SessionCommand::Invalid { .. }
        ));
    }

    #[test]
    fn image_paths_accept_quotes() {
        assert_eq!(
            parse_command("/image \"/tmp/my product.png\""),
            SessionCommand::AttachImage("/tmp/my product.png".to_string())
        );
        assert!(matches!(parse_command("/image"), SessionCommand::Invalid { .. }));
    }

    #[test]
    fn gallery_path_is_optional() {
        assert_eq!(parse_command("/gallery"), SessionCommand::Gallery(None));
        assert_eq!(
            parse_command("/gallery out/gallery.html"),
            SessionCommand::Gallery(Some("out/gallery.html".to_string()))
        );
    }

    #[test]
    fn seed_must_be_an_integer() {
        assert_eq!(parse_command("/seed -7"), SessionCommand::SetSeed(-7));
        assert!(matches!(parse_command("/seed abc"), SessionCommand::Invalid { .. }));
    }

    #[test]
    fn no_arg_commands_and_aliases() {
        assert_eq!(parse_command("/generate"), SessionCommand::Generate);
        assert_eq!(parse_command("/GENERATE"), SessionCommand::Generate);
        assert_eq!(parse_command("/presets"), SessionCommand::ListPresets);
        assert_eq!(parse_command("/clear_image"), SessionCommand::ClearImage);
        assert_eq!(parse_command("/exit"), SessionCommand::Quit);
    }

    #[test]
    fn unknown_commands_keep_their_argument() {
        assert_eq!(
            parse_command("/magic foo bar"),
            SessionCommand::Unknown {
                command: "magic".to_string(),
                arg: "foo bar".to_string(),
            }
        );
    }
}
