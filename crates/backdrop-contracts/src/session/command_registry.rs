#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "preset",
        action: "choose_preset",
    },
    CommandSpec {
        command: "prompt",
        action: "set_prompt",
    },
    CommandSpec {
        command: "image_url",
        action: "attach_image_url",
    },
    CommandSpec {
        command: "seed",
        action: "set_seed",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        action: "attach_image",
    },
    CommandSpec {
        command: "gallery",
        action: "gallery",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "presets",
        action: "list_presets",
    },
    CommandSpec {
        command: "clear_image",
        action: "clear_image",
    },
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/presets",
    "/preset",
    "/prompt",
    "/image",
    "/image_url",
    "/clear_image",
    "/seed",
    "/status",
    "/generate",
    "/gallery",
    "/help",
    "/quit",
];
