//! Durable persistence for conversations and folders.
//!
//! Persisted state is two schema-versioned JSON documents per identity
//! partition. The store trait is implemented by a local JSON file store and
//! a remote HTTP store; the adapter decides which one handles a call.

use crate::types::{Conversation, Folder, Message, Sender};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Current persisted document schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted message record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    /// Message identifier.
    pub id: Uuid,
    /// Message body.
    pub text: String,
    /// Sender name ("user" or "assistant").
    pub sender: String,
    /// Timestamp for the message.
    pub timestamp: DateTime<Utc>,
    /// Favorite flag.
    #[serde(default)]
    pub favorite: bool,
}

/// Persisted conversation record with nested messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationRecord {
    /// Conversation identifier.
    pub id: Uuid,
    /// Display label.
    pub title: String,
    /// All messages in append order.
    pub messages: Vec<MessageRecord>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent append.
    pub updated_at: DateTime<Utc>,
}

/// Persisted folder record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderRecord {
    /// Folder identifier.
    pub id: Uuid,
    /// Display label.
    pub name: String,
    /// Referenced message ids.
    pub message_ids: Vec<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Versioned on-disk/wire document for a conversation collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationDocument {
    /// Document schema version for future migration.
    pub schema_version: u32,
    /// All conversations in the partition.
    pub conversations: Vec<ConversationRecord>,
}

/// Versioned on-disk/wire document for a folder collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderDocument {
    /// Document schema version for future migration.
    pub schema_version: u32,
    /// All folders in the partition.
    pub folders: Vec<FolderRecord>,
}

/// Errors returned by state stores.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    #[error("http error: {0}")]
    Http(String),
    #[error("remote returned status {0}")]
    RemoteStatus(u16),
}

/// Durable store abstraction, keyed by identity partition.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load all conversations for a partition. Missing data is an empty
    /// collection, not an error.
    async fn load_conversations(
        &self,
        partition: &str,
    ) -> Result<Vec<ConversationRecord>, StateError>;
    /// Replace the persisted conversation collection for a partition.
    async fn save_conversations(
        &self,
        partition: &str,
        conversations: &[ConversationRecord],
    ) -> Result<(), StateError>;
    /// Load all folders for a partition.
    async fn load_folders(&self, partition: &str) -> Result<Vec<FolderRecord>, StateError>;
    /// Replace the persisted folder collection for a partition.
    async fn save_folders(
        &self,
        partition: &str,
        folders: &[FolderRecord],
    ) -> Result<(), StateError>;
}

impl From<&Message> for MessageRecord {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            text: message.text.clone(),
            sender: message.sender.as_str().to_string(),
            timestamp: message.timestamp,
            favorite: message.favorite,
        }
    }
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            sender: Sender::parse(&record.sender),
            timestamp: record.timestamp,
            favorite: record.favorite,
        }
    }
}

impl From<&Conversation> for ConversationRecord {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title.clone(),
            messages: conversation.messages.iter().map(MessageRecord::from).collect(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            messages: record.messages.into_iter().map(Message::from).collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<&Folder> for FolderRecord {
    fn from(folder: &Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
            message_ids: folder.message_ids.clone(),
            created_at: folder.created_at,
        }
    }
}

impl From<FolderRecord> for Folder {
    fn from(record: FolderRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            message_ids: record.message_ids,
            created_at: record.created_at,
        }
    }
}

/// JSON-file-backed state store, one directory per partition.
pub struct JsonStateStore {
    /// Root directory for partition subdirectories.
    root: PathBuf,
    /// Serialize write access to the document files.
    write_lock: Mutex<()>,
}

impl JsonStateStore {
    /// Create a new JSON store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StateError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized JSON state store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn document_path(&self, partition: &str, name: &str) -> PathBuf {
        self.root.join(partition).join(format!("{name}.json"))
    }

    fn write_document<T: Serialize>(
        &self,
        partition: &str,
        name: &str,
        document: &T,
    ) -> Result<(), StateError> {
        let _guard = self.write_lock.lock();
        let path = self.document_path(partition, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(document)?;
        fs::write(&path, contents)?;
        debug!("wrote {name} document (partition={partition})");
        Ok(())
    }

    fn read_contents(&self, partition: &str, name: &str) -> Result<Option<String>, StateError> {
        let path = self.document_path(partition, name);
        if !path.exists() {
            debug!("no {name} document (partition={partition})");
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load_conversations(
        &self,
        partition: &str,
    ) -> Result<Vec<ConversationRecord>, StateError> {
        let Some(contents) = self.read_contents(partition, "conversations")? else {
            return Ok(Vec::new());
        };
        let document: ConversationDocument = serde_json::from_str(&contents)?;
        if document.schema_version > SCHEMA_VERSION {
            return Err(StateError::UnsupportedSchema(document.schema_version));
        }
        Ok(document.conversations)
    }

    async fn save_conversations(
        &self,
        partition: &str,
        conversations: &[ConversationRecord],
    ) -> Result<(), StateError> {
        let document = ConversationDocument {
            schema_version: SCHEMA_VERSION,
            conversations: conversations.to_vec(),
        };
        self.write_document(partition, "conversations", &document)
    }

    async fn load_folders(&self, partition: &str) -> Result<Vec<FolderRecord>, StateError> {
        let Some(contents) = self.read_contents(partition, "folders")? else {
            return Ok(Vec::new());
        };
        let document: FolderDocument = serde_json::from_str(&contents)?;
        if document.schema_version > SCHEMA_VERSION {
            return Err(StateError::UnsupportedSchema(document.schema_version));
        }
        Ok(document.folders)
    }

    async fn save_folders(
        &self,
        partition: &str,
        folders: &[FolderRecord],
    ) -> Result<(), StateError> {
        let document = FolderDocument {
            schema_version: SCHEMA_VERSION,
            folders: folders.to_vec(),
        };
        self.write_document(partition, "folders", &document)
    }
}
