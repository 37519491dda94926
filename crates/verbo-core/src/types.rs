//! Core data types shared across the conversation state API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub use verbo_config::Language;

/// Unique identifier for a message.
pub type MessageId = Uuid;
/// Unique identifier for a conversation.
pub type ConversationId = Uuid;
/// Unique identifier for a folder.
pub type FolderId = Uuid;

/// Authoring side of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Sender {
    /// Return the sender as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    /// Parse a sender from a lowercase string.
    pub fn parse(value: &str) -> Self {
        if value == "assistant" {
            Sender::Assistant
        } else {
            Sender::User
        }
    }
}

impl FromStr for Sender {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Sender::parse(value))
    }
}

/// A single authored turn in a conversation transcript.
///
/// `id`, `text`, `sender`, and `timestamp` are fixed at creation; only
/// `favorite` changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Message body, plain text.
    pub text: String,
    /// Side that authored the message.
    pub sender: Sender,
    /// Creation instant; non-decreasing within a conversation.
    pub timestamp: DateTime<Utc>,
    /// Favorite flag, mutable after creation.
    #[serde(default)]
    pub favorite: bool,
}

impl Message {
    /// Create a message with a fresh id at the given instant.
    pub fn new(text: impl Into<String>, sender: Sender, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp,
            favorite: false,
        }
    }
}

/// An ordered thread of messages with its own identity and title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Display label.
    pub title: String,
    /// Messages in append order; append order is authoritative.
    pub messages: Vec<Message>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Advances on every message append.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation seeded with the localized assistant welcome.
    pub fn seeded(language: Language) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: new_conversation_title(language).to_string(),
            messages: vec![Message::new(welcome_text(language), Sender::Assistant, now)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a message by id.
    pub fn message(&self, message_id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == message_id)
    }
}

/// A user-defined named collection of message references.
///
/// Membership is by id only; a folder never owns a message, and ids may go
/// stale when the referenced message disappears.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Folder {
    /// Folder identifier.
    pub id: FolderId,
    /// User-assigned display label, mutable.
    pub name: String,
    /// Referenced message ids, duplicate-free, in insertion order.
    pub message_ids: Vec<MessageId>,
    /// Creation timestamp, immutable.
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Create an empty folder with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            message_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Storage scoping key for persisted state.
///
/// Guest and authenticated identities are distinct partitions; nothing is
/// migrated between them on login or logout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No authenticated user.
    #[default]
    Guest,
    /// Opaque identity string supplied by the identity provider.
    User(String),
}

impl Identity {
    /// Return the storage partition key for this identity.
    pub fn partition_key(&self) -> String {
        match self {
            Identity::Guest => "guest".to_string(),
            Identity::User(id) => format!("user-{id}"),
        }
    }

    /// Whether this identity belongs to an authenticated user.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }
}

/// Summary view of a conversation for listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Display label.
    pub title: String,
    /// Count of messages stored.
    pub message_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent append.
    pub updated_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title.clone(),
            message_count: conversation.messages.len(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// Assistant welcome text used to seed every new conversation.
pub fn welcome_text(language: Language) -> &'static str {
    match language {
        Language::Pt => {
            "Olá! Como posso ajudar você hoje? Sou seu assistente espiritual baseado nos ensinamentos bíblicos."
        }
        Language::En => {
            "Hello! How can I help you today? I'm your spiritual assistant based on Biblical teachings."
        }
        Language::Es => {
            "¡Hola! ¿Cómo puedo ayudarte hoy? Soy tu asistente espiritual basado en las enseñanzas bíblicas."
        }
    }
}

/// Default title for a freshly created conversation.
pub fn new_conversation_title(language: Language) -> &'static str {
    match language {
        Language::Pt => "Nova Conversa",
        Language::En => "New Conversation",
        Language::Es => "Nueva Conversación",
    }
}

#[cfg(test)]
mod tests {
    use super::{Conversation, Language, Sender};
    use pretty_assertions::assert_eq;

    #[test]
    fn sender_parses_and_formats() {
        assert_eq!(Sender::parse("assistant"), Sender::Assistant);
        assert_eq!(Sender::parse("user"), Sender::User);
        assert_eq!(Sender::Assistant.as_str(), "assistant");
    }

    #[test]
    fn seeded_conversation_has_one_assistant_welcome() {
        let conversation = Conversation::seeded(Language::En);
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].sender, Sender::Assistant);
        assert_eq!(conversation.messages[0].favorite, false);
        assert_eq!(conversation.updated_at >= conversation.created_at, true);
    }

    #[test]
    fn partition_keys_are_distinct_per_identity() {
        use super::Identity;
        assert_eq!(Identity::Guest.partition_key(), "guest");
        assert_eq!(
            Identity::User("abc".to_string()).partition_key(),
            "user-abc"
        );
    }
}
