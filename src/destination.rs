use teloxide::types::{ChatId, Recipient};

pub const HERE_COMMAND: &str = "/here";

/// Where a pending batch of quizzes should be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The chat the instruction was sent from.
    Here,
    Chat(ChatId),
    /// A public chat or channel handle such as `@my_channel`, passed on as typed.
    Username(String),
}

impl Destination {
    /// Returns `None` for a blank reply.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if text.eq_ignore_ascii_case(HERE_COMMAND) {
            return Some(Destination::Here);
        }

        let digits = text.strip_prefix('-').unwrap_or(text);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            // Ids too large for i64 can't be real chats; treat them like any other handle.
            if let Ok(id) = text.parse::<i64>() {
                return Some(Destination::Chat(ChatId(id)));
            }
        }

        Some(Destination::Username(text.to_string()))
    }

    pub fn recipient(&self, current_chat: ChatId) -> Recipient {
        match self {
            Destination::Here => Recipient::Id(current_chat),
            Destination::Chat(id) => Recipient::Id(*id),
            Destination::Username(name) => Recipient::ChannelUsername(name.clone()),
        }
    }

    /// How the destination is named back to the user, e.g. "to @my_channel".
    pub fn describe(&self) -> String {
        match self {
            Destination::Here => "here".to_string(),
            Destination::Chat(id) => format!("to {}", id.0),
            Destination::Username(name) => format!("to {}", name),
        }
    }
}
