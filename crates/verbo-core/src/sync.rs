//! Sync coordinator: identity transitions and background persistence.
//!
//! The coordinator owns the in-memory store and the persistence adapter.
//! Mutations apply to memory synchronously, then a snapshot is persisted on
//! a spawned task; persistence failures never affect in-memory state.

use crate::adapter::PersistenceAdapter;
use crate::error::VerboCoreError;
use crate::llm::{ReplyProvider, reply_or_apology};
use crate::state::{ConversationRecord, FolderRecord};
use crate::store::{ConversationStore, FolderAddOutcome, SessionPhase, ToggleOutcome};
use crate::types::{
    Conversation, ConversationId, ConversationSummary, Folder, FolderId, Identity, Language,
    Message, MessageId, Sender,
};
use log::{debug, info};
use parking_lot::RwLock;
use std::sync::Arc;

/// Session facade over the store, the adapter, and the active identity.
///
/// Guest and authenticated identities are separate storage partitions;
/// switching identity replaces the whole in-memory session with the new
/// partition's state.
pub struct SyncCoordinator {
    store: Arc<RwLock<ConversationStore>>,
    adapter: Arc<PersistenceAdapter>,
    identity: RwLock<Identity>,
    reply_provider: Option<Arc<dyn ReplyProvider>>,
}

impl SyncCoordinator {
    /// Create a coordinator for a guest session. The store starts
    /// uninitialized; call [`initialize`](Self::initialize) before use.
    pub fn new(language: Language, adapter: Arc<PersistenceAdapter>) -> Self {
        Self {
            store: Arc::new(RwLock::new(ConversationStore::new(language))),
            adapter,
            identity: RwLock::new(Identity::Guest),
            reply_provider: None,
        }
    }

    /// Attach a reply provider for [`send_message`](Self::send_message).
    pub fn with_reply_provider(mut self, provider: Arc<dyn ReplyProvider>) -> Self {
        self.reply_provider = Some(provider);
        self
    }

    /// Active identity.
    pub fn identity(&self) -> Identity {
        self.identity.read().clone()
    }

    /// Current store lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.store.read().phase()
    }

    /// Load the current identity's partition and enter `Ready`.
    pub async fn initialize(&self) {
        let identity = self.identity();
        self.load_partition(&identity).await;
    }

    /// Switch the active identity and reload from its partition.
    ///
    /// Nothing is migrated between partitions: the previous identity's state
    /// stays in its own partition and the new identity's state replaces the
    /// in-memory session.
    pub async fn set_identity(&self, identity: Identity) {
        let previous = {
            let mut guard = self.identity.write();
            std::mem::replace(&mut *guard, identity.clone())
        };
        if previous != identity {
            info!(
                "identity changed (from={}, to={})",
                previous.partition_key(),
                identity.partition_key()
            );
        }
        self.load_partition(&identity).await;
    }

    /// Begin-load-finish sequence for one partition. Operations arriving
    /// while the load is in flight are rejected by the store, not queued.
    async fn load_partition(&self, identity: &Identity) {
        self.store.write().begin_initializing();
        let conversation_records = self.adapter.load_conversations(identity).await;
        let folder_records = self.adapter.load_folders(identity).await;
        let conversations: Vec<Conversation> = conversation_records
            .into_iter()
            .map(Conversation::from)
            .collect();
        let folders: Vec<Folder> = folder_records.into_iter().map(Folder::from).collect();
        self.store.write().finish_initializing(conversations, folders);
        // A fresh partition gets its seeded conversation persisted right away.
        self.spawn_conversation_save();
    }

    /// Start a new conversation and make it current.
    pub fn start_new_conversation(&self) -> Result<Conversation, VerboCoreError> {
        let conversation = self.store.write().start_new_conversation()?;
        self.spawn_conversation_save();
        Ok(conversation)
    }

    /// Append a message to the current conversation.
    pub fn add_message(
        &self,
        text: impl Into<String>,
        sender: Sender,
    ) -> Result<Conversation, VerboCoreError> {
        let conversation = self.store.write().add_message(text, sender)?;
        self.spawn_conversation_save();
        Ok(conversation)
    }

    /// Append the user's message, obtain an assistant reply, and append it.
    ///
    /// Provider failures degrade to a localized apology message; the user's
    /// message always lands first and both appends are persisted.
    pub async fn send_message(
        &self,
        text: impl Into<String>,
    ) -> Result<Conversation, VerboCoreError> {
        let Some(provider) = self.reply_provider.clone() else {
            return Err(VerboCoreError::State(
                "no reply provider configured".to_string(),
            ));
        };
        let text = text.into();
        let (after_user, language) = {
            let mut store = self.store.write();
            let conversation = store.add_message(text.clone(), Sender::User)?;
            (conversation, store.language())
        };
        self.spawn_conversation_save();

        let history = &after_user.messages[..after_user.messages.len().saturating_sub(1)];
        let reply = reply_or_apology(provider.as_ref(), &text, history, language).await;

        let conversation = self.store.write().add_message(reply, Sender::Assistant)?;
        self.spawn_conversation_save();
        Ok(conversation)
    }

    /// Flip a message's favorite flag in the current conversation.
    pub fn toggle_favorite(&self, message_id: MessageId) -> Result<ToggleOutcome, VerboCoreError> {
        let outcome = self.store.write().toggle_favorite(message_id)?;
        self.spawn_conversation_save();
        Ok(outcome)
    }

    /// All favorite messages across conversations.
    pub fn favorited_messages(&self) -> Result<Vec<Message>, VerboCoreError> {
        let store = self.store.read();
        Ok(store.favorited_messages()?.cloned().collect())
    }

    /// Create a folder.
    pub fn create_folder(&self, name: impl Into<String>) -> Result<Folder, VerboCoreError> {
        let folder = self.store.write().create_folder(name)?;
        self.spawn_folder_save();
        Ok(folder)
    }

    /// Rename a folder; false means the id was unknown and nothing changed.
    pub fn rename_folder(
        &self,
        folder_id: FolderId,
        name: impl Into<String>,
    ) -> Result<bool, VerboCoreError> {
        let renamed = self.store.write().rename_folder(folder_id, name)?;
        if renamed {
            self.spawn_folder_save();
        }
        Ok(renamed)
    }

    /// Delete a folder; false means the id was unknown and nothing changed.
    pub fn delete_folder(&self, folder_id: FolderId) -> Result<bool, VerboCoreError> {
        let removed = self.store.write().delete_folder(folder_id)?;
        if removed {
            self.spawn_folder_save();
        }
        Ok(removed)
    }

    /// Add a message reference to a folder.
    pub fn add_message_to_folder(
        &self,
        message_id: MessageId,
        folder_id: FolderId,
    ) -> Result<FolderAddOutcome, VerboCoreError> {
        let outcome = self
            .store
            .write()
            .add_message_to_folder(message_id, folder_id)?;
        if outcome == FolderAddOutcome::Added {
            self.spawn_folder_save();
        }
        Ok(outcome)
    }

    /// Remove a message reference from a folder.
    pub fn remove_message_from_folder(
        &self,
        message_id: MessageId,
        folder_id: FolderId,
    ) -> Result<bool, VerboCoreError> {
        let removed = self
            .store
            .write()
            .remove_message_from_folder(message_id, folder_id)?;
        if removed {
            self.spawn_folder_save();
        }
        Ok(removed)
    }

    /// Resolve a folder's message references; dangling ids are skipped.
    pub fn messages_in_folder(&self, folder_id: FolderId) -> Result<Vec<Message>, VerboCoreError> {
        self.store.read().messages_in_folder(folder_id)
    }

    /// Make an existing conversation current.
    pub fn load_conversation(&self, id: ConversationId) -> Result<(), VerboCoreError> {
        self.store.write().load_conversation(id)
    }

    /// The current conversation, if any.
    pub fn current_conversation(&self) -> Option<Conversation> {
        self.store.read().current_conversation().cloned()
    }

    /// All conversations, most-recent-first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store.read().conversations().to_vec()
    }

    /// All folders in creation order.
    pub fn folders(&self) -> Vec<Folder> {
        self.store.read().folders().to_vec()
    }

    /// Listing summaries, most-recently-updated first.
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.store.read().summaries()
    }

    /// Persist the full session snapshot and wait for completion. Used at
    /// shutdown; routine mutation saves run on spawned tasks instead.
    pub async fn persist_now(&self) {
        let identity = self.identity();
        let (conversations, folders) = {
            let store = self.store.read();
            (
                snapshot_conversations(&store),
                snapshot_folders(&store),
            )
        };
        self.adapter.save_conversations(&identity, &conversations).await;
        self.adapter.save_folders(&identity, &folders).await;
    }

    /// Persist the conversation collection on a background task. Failures
    /// are logged by the adapter and never surface here.
    fn spawn_conversation_save(&self) {
        let adapter = Arc::clone(&self.adapter);
        let identity = self.identity();
        let records = snapshot_conversations(&self.store.read());
        debug!(
            "scheduling conversation save (partition={}, count={})",
            identity.partition_key(),
            records.len()
        );
        tokio::spawn(async move {
            adapter.save_conversations(&identity, &records).await;
        });
    }

    /// Persist the folder collection on a background task.
    fn spawn_folder_save(&self) {
        let adapter = Arc::clone(&self.adapter);
        let identity = self.identity();
        let records = snapshot_folders(&self.store.read());
        debug!(
            "scheduling folder save (partition={}, count={})",
            identity.partition_key(),
            records.len()
        );
        tokio::spawn(async move {
            adapter.save_folders(&identity, &records).await;
        });
    }
}

fn snapshot_conversations(store: &ConversationStore) -> Vec<ConversationRecord> {
    store
        .conversations()
        .iter()
        .map(ConversationRecord::from)
        .collect()
}

fn snapshot_folders(store: &ConversationStore) -> Vec<FolderRecord> {
    store.folders().iter().map(FolderRecord::from).collect()
}
