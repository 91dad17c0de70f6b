#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Slash commands that submit a product reference; `action` carries the
/// input kind label.
pub(crate) const TRACK_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "url",
        action: "URL",
    },
    CommandSpec {
        command: "text",
        action: "TEXT",
    },
    CommandSpec {
        command: "image",
        action: "IMAGE",
    },
];

pub(crate) const PRODUCT_ID_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "show",
        action: "show",
    },
    CommandSpec {
        command: "toggle",
        action: "toggle_notifications",
    },
    CommandSpec {
        command: "remove",
        action: "remove",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "list",
        action: "list",
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

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/url <link>",
    "/text <description>",
    "/image <path>",
    "/list",
    "/show <id>",
    "/toggle <id>",
    "/remove <id>",
    "/help",
    "/quit",
];
