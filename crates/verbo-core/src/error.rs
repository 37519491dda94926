//! Error types for the conversation core crate.

use crate::store::SessionPhase;
use crate::types::{ConversationId, FolderId, MessageId};
use thiserror::Error;

/// Errors returned by conversation core operations.
///
/// Not-found variants are tagged outcomes for stale references, not faults;
/// callers are expected to keep the UI responsive when they appear.
#[derive(Debug, Error)]
pub enum VerboCoreError {
    /// The store has not finished loading persisted state.
    #[error("store not ready (phase: {0:?})")]
    NotReady(SessionPhase),
    /// Conversation id is unknown to the store.
    #[error("unknown conversation: {0}")]
    UnknownConversation(ConversationId),
    /// Folder id is unknown to the store.
    #[error("unknown folder: {0}")]
    UnknownFolder(FolderId),
    /// Message id is not present in the current conversation.
    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),
    /// Input rejected before any state was mutated.
    #[error("validation error: {0}")]
    Validation(String),
    /// Persistence adapter error surfaced outside the soft-fallback paths.
    #[error("state error: {0}")]
    State(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
