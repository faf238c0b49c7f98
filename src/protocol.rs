//! Text protocol carried over the WebSocket channel.
//!
//! Every frame is a single opaque text payload. The only structured frame is
//! the naming frame (`__name__:<display name>`); everything else is chat text.

/// Prefix of the naming frame a client sends to announce its display name
pub const NAME_PREFIX: &str = "__name__:";

/// Display name used until a client announces one
pub const DEFAULT_NAME: &str = "anonymous";

/// WebSocket close code sent to every client when the server stops ("going away")
pub const SHUTDOWN_CLOSE_CODE: u16 = 1001;
pub const SHUTDOWN_CLOSE_REASON: &str = "Server shutting down";

/// An inbound frame, interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Naming frame, value already normalized
    Name(String),
    /// Anything else, verbatim
    Chat(&'a str),
}

impl<'a> Frame<'a> {
    pub fn parse(text: &'a str) -> Self {
        match text.strip_prefix(NAME_PREFIX) {
            Some(value) => Frame::Name(normalize_name(value)),
            None => Frame::Chat(text),
        }
    }
}

/// Trim a requested display name; blank input falls back to [`DEFAULT_NAME`]
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn chat_line(name: &str, body: &str) -> String {
    format!("{}: {}", name, body)
}

pub fn joined_notice(name: &str) -> String {
    format!("{} joined the chat", name)
}

pub fn left_notice(name: &str) -> String {
    format!("{} left the chat", name)
}

/// The naming frame a client sends right after connecting
pub fn name_frame(name: &str) -> String {
    format!("{}{}", NAME_PREFIX, name)
}

/// Code and reason attached to a close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn server_shutdown() -> Self {
        Self::new(SHUTDOWN_CLOSE_CODE, SHUTDOWN_CLOSE_REASON)
    }
}
