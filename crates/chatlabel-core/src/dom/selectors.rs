//! Selectors describing the host page structure
//!
//! Data attributes (`data-icon`, `data-testid`) are preferred over generated
//! class names because the host rewrites its classes on every release.

pub const APP_ROOT: &str = "#app";
pub const BODY: &str = "body";
pub const MAIN_PANEL: &str = "#main";
pub const SIDE_PANEL: &str = "#pane-side";
pub const FOOTER: &str = "footer";
pub const COMPOSE_INPUT: &str = "[contenteditable=\"true\"]";

/// Conversation title, tried in order
pub const HEADER_TITLE: &[&str] = &["#main header span[title]", "#main header [dir=\"auto\"]"];

/// Any message bubble, either direction
pub const MESSAGE: &str = "[class*=\"message-in\"], [class*=\"message-out\"]";
pub const MESSAGE_IN_CLASS: &str = "message-in";
pub const MESSAGE_OUT_CLASS: &str = "message-out";

pub const SEND_ICON: &str = "[data-icon=\"send\"]";
pub const RECORD_ICON: &str = "[data-icon=\"ptt\"]";
pub const AUDIO_PLAY_ICON: &str = "span[data-icon=\"audio-play\"]";
pub const BUTTON: &str = "button";

pub const CONTACT_CARD_ACTION: &str = "[title]";
pub const SELECTABLE_TEXT: &str = "span.selectable-text";
pub const SYSTEM_TEXT: &str = "[data-testid=\"system-message\"]";
pub const IMAGE: &str = "img";
pub const FOCUSABLE: &str = "[tabindex]";

/// "Start chat with <name>" affordance titles, in the host's own languages
pub const CONTACT_CARD_PREFIXES: &[&str] = &[
    "Conversar com ",
    "Conversar con ",
    "Chatear con ",
    "Chat with ",
];
