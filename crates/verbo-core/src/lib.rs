//! Core conversation state management for Verbo.
//!
//! This crate owns the in-memory conversation store, the persistence
//! adapter over local and remote state stores, the sync coordinator, and
//! the reply/verse collaborators used by embedding applications.

pub mod adapter;
pub mod error;
pub mod llm;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod types;
pub mod verse;

pub use adapter::PersistenceAdapter;
pub use error::VerboCoreError;
/// Collaborator boundaries and their soft-failure helpers.
pub use llm::{OpenAiReplyProvider, ReplyError, ReplyProvider, apology_text, reply_or_apology};
pub use remote::HttpStateStore;
pub use state::{JsonStateStore, StateError, StateStore};
pub use store::{ConversationStore, FolderAddOutcome, SessionPhase, ToggleOutcome};
pub use sync::SyncCoordinator;
pub use types::{
    Conversation, ConversationId, ConversationSummary, Folder, FolderId, Identity, Language,
    Message, MessageId, Sender,
};
pub use verse::{DailyVerseService, HttpVerseProvider, Verse, VerseError, VerseProvider, verse_of_day};
