//! In-memory conversation store with synchronous state transitions.
//!
//! The store owns the canonical conversations, folders, and the current
//! conversation id for the active session. It has no durability of its own;
//! the sync coordinator persists snapshots after each mutation.

use crate::error::VerboCoreError;
use crate::types::{
    Conversation, ConversationId, ConversationSummary, Folder, FolderId, Language, Message,
    MessageId, Sender,
};
use chrono::Utc;
use log::{debug, info};

/// Session lifecycle phase for the store.
///
/// Operations are rejected (never silently dropped) outside `Ready`, so a
/// mutation can never race the initial load from persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No load has been requested yet.
    Uninitialized,
    /// Persisted state is being loaded.
    Initializing,
    /// Operations may be invoked.
    Ready,
}

/// Direction a favorite toggle took, for caller confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The message is now a favorite.
    Favorited,
    /// The message is no longer a favorite.
    Unfavorited,
}

/// Outcome of adding a message reference to a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderAddOutcome {
    /// The reference was inserted.
    Added,
    /// The reference was already present; nothing was mutated.
    AlreadyPresent,
}

/// Canonical in-memory state for one session.
pub struct ConversationStore {
    language: Language,
    phase: SessionPhase,
    /// Most-recent-first.
    conversations: Vec<Conversation>,
    folders: Vec<Folder>,
    /// Weak reference into `conversations` by id.
    current: Option<ConversationId>,
}

impl ConversationStore {
    /// Create an empty store in the `Uninitialized` phase.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            phase: SessionPhase::Uninitialized,
            conversations: Vec::new(),
            folders: Vec::new(),
            current: None,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Language used for seeded assistant text.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Enter the `Initializing` phase, clearing any previous session state.
    pub fn begin_initializing(&mut self) {
        debug!("store entering Initializing phase");
        self.phase = SessionPhase::Initializing;
        self.conversations.clear();
        self.folders.clear();
        self.current = None;
    }

    /// Seed the store from persisted state and enter `Ready`.
    ///
    /// The most-recently-updated conversation becomes current; with no
    /// persisted conversations a fresh seeded one is synthesized.
    pub fn finish_initializing(
        &mut self,
        mut conversations: Vec<Conversation>,
        folders: Vec<Folder>,
    ) {
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.conversations = conversations;
        self.folders = folders;
        self.phase = SessionPhase::Ready;
        match self.conversations.first() {
            Some(conversation) => {
                self.current = Some(conversation.id);
            }
            None => {
                self.seed_conversation();
            }
        }
        info!(
            "store ready (conversations={}, folders={})",
            self.conversations.len(),
            self.folders.len()
        );
    }

    /// Drop all session state and return to `Uninitialized`.
    pub fn reset(&mut self) {
        debug!("store reset");
        self.phase = SessionPhase::Uninitialized;
        self.conversations.clear();
        self.folders.clear();
        self.current = None;
    }

    fn ensure_ready(&self) -> Result<(), VerboCoreError> {
        match self.phase {
            SessionPhase::Ready => Ok(()),
            phase => Err(VerboCoreError::NotReady(phase)),
        }
    }

    /// Create a seeded conversation, prepend it, and make it current.
    fn seed_conversation(&mut self) -> ConversationId {
        let conversation = Conversation::seeded(self.language);
        let id = conversation.id;
        info!("starting new conversation (conversation_id={id})");
        self.conversations.insert(0, conversation);
        self.current = Some(id);
        id
    }

    /// Start a new conversation seeded with the assistant welcome message
    /// and make it current. Always succeeds once the store is ready.
    pub fn start_new_conversation(&mut self) -> Result<Conversation, VerboCoreError> {
        self.ensure_ready()?;
        self.seed_conversation();
        Ok(self.conversations[0].clone())
    }

    /// Append a message to the current conversation, creating one first if
    /// none is current. Returns the updated conversation.
    ///
    /// Failures here are validation only; persistence failures belong to the
    /// adapter and never roll back this append.
    pub fn add_message(
        &mut self,
        text: impl Into<String>,
        sender: Sender,
    ) -> Result<Conversation, VerboCoreError> {
        self.ensure_ready()?;
        let text = text.into();
        if text.trim().is_empty() {
            return Err(VerboCoreError::Validation(
                "message text must not be empty".to_string(),
            ));
        }

        let current_id = match self.current {
            Some(id) if self.conversation(id).is_some() => id,
            _ => self.seed_conversation(),
        };
        let Some(conversation) = self.conversation_mut(current_id) else {
            return Err(VerboCoreError::UnknownConversation(current_id));
        };

        // Append order is authoritative; clamp so timestamps never regress.
        let mut timestamp = Utc::now();
        if let Some(last) = conversation.messages.last()
            && last.timestamp > timestamp
        {
            timestamp = last.timestamp;
        }
        let message = Message::new(text, sender, timestamp);
        debug!(
            "appending message (conversation_id={}, sender={}, text_len={})",
            current_id,
            message.sender.as_str(),
            message.text.len()
        );
        conversation.messages.push(message);
        conversation.updated_at = timestamp;
        Ok(conversation.clone())
    }

    /// Flip the favorite flag on a message in the current conversation and
    /// report which direction the toggle went.
    pub fn toggle_favorite(
        &mut self,
        message_id: MessageId,
    ) -> Result<ToggleOutcome, VerboCoreError> {
        self.ensure_ready()?;
        let current_id = self
            .current
            .ok_or(VerboCoreError::UnknownMessage(message_id))?;
        let conversation = self
            .conversation_mut(current_id)
            .ok_or(VerboCoreError::UnknownConversation(current_id))?;
        let message = conversation
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
            .ok_or(VerboCoreError::UnknownMessage(message_id))?;
        message.favorite = !message.favorite;
        let outcome = if message.favorite {
            ToggleOutcome::Favorited
        } else {
            ToggleOutcome::Unfavorited
        };
        debug!("toggled favorite (message_id={message_id}, outcome={outcome:?})");
        Ok(outcome)
    }

    /// Lazy, restartable view of all favorite messages across conversations.
    /// Order is stable for a given state snapshot.
    pub fn favorited_messages(
        &self,
    ) -> Result<impl Iterator<Item = &Message> + '_, VerboCoreError> {
        self.ensure_ready()?;
        Ok(self
            .conversations
            .iter()
            .flat_map(|conversation| conversation.messages.iter())
            .filter(|message| message.favorite))
    }

    /// Create a folder with the given name.
    pub fn create_folder(&mut self, name: impl Into<String>) -> Result<Folder, VerboCoreError> {
        self.ensure_ready()?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(VerboCoreError::Validation(
                "folder name must not be empty".to_string(),
            ));
        }
        let folder = Folder::new(name);
        info!("created folder (folder_id={}, name={})", folder.id, folder.name);
        self.folders.push(folder.clone());
        Ok(folder)
    }

    /// Rename a folder. Returns false (no-op) when the id is unknown.
    pub fn rename_folder(
        &mut self,
        folder_id: FolderId,
        name: impl Into<String>,
    ) -> Result<bool, VerboCoreError> {
        self.ensure_ready()?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(VerboCoreError::Validation(
                "folder name must not be empty".to_string(),
            ));
        }
        match self.folder_mut(folder_id) {
            Some(folder) => {
                folder.name = name;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a folder, leaving referenced messages untouched. Returns false
    /// (no-op) when the id is unknown.
    pub fn delete_folder(&mut self, folder_id: FolderId) -> Result<bool, VerboCoreError> {
        self.ensure_ready()?;
        let before = self.folders.len();
        self.folders.retain(|folder| folder.id != folder_id);
        let removed = self.folders.len() != before;
        if removed {
            info!("deleted folder (folder_id={folder_id})");
        }
        Ok(removed)
    }

    /// Add a message reference to a folder. Idempotent: an already-present
    /// id is reported and nothing is mutated.
    pub fn add_message_to_folder(
        &mut self,
        message_id: MessageId,
        folder_id: FolderId,
    ) -> Result<FolderAddOutcome, VerboCoreError> {
        self.ensure_ready()?;
        let folder = self
            .folder_mut(folder_id)
            .ok_or(VerboCoreError::UnknownFolder(folder_id))?;
        if folder.message_ids.contains(&message_id) {
            return Ok(FolderAddOutcome::AlreadyPresent);
        }
        folder.message_ids.push(message_id);
        debug!("added message to folder (message_id={message_id}, folder_id={folder_id})");
        Ok(FolderAddOutcome::Added)
    }

    /// Remove a message reference from a folder. Returns false (no-op) when
    /// the folder or the reference is absent.
    pub fn remove_message_from_folder(
        &mut self,
        message_id: MessageId,
        folder_id: FolderId,
    ) -> Result<bool, VerboCoreError> {
        self.ensure_ready()?;
        let Some(folder) = self.folder_mut(folder_id) else {
            return Ok(false);
        };
        let before = folder.message_ids.len();
        folder.message_ids.retain(|id| *id != message_id);
        Ok(folder.message_ids.len() != before)
    }

    /// Resolve a folder's references against all conversations. Dangling ids
    /// are skipped; the folder may hold references to messages that no
    /// longer resolve.
    pub fn messages_in_folder(
        &self,
        folder_id: FolderId,
    ) -> Result<Vec<Message>, VerboCoreError> {
        self.ensure_ready()?;
        let folder = self
            .folder(folder_id)
            .ok_or(VerboCoreError::UnknownFolder(folder_id))?;
        Ok(self
            .conversations
            .iter()
            .flat_map(|conversation| conversation.messages.iter())
            .filter(|message| folder.message_ids.contains(&message.id))
            .cloned()
            .collect())
    }

    /// Make the conversation with the given id current. On an unknown id the
    /// current conversation is left unchanged and not-found is reported.
    pub fn load_conversation(&mut self, id: ConversationId) -> Result<(), VerboCoreError> {
        self.ensure_ready()?;
        if self.conversation(id).is_none() {
            return Err(VerboCoreError::UnknownConversation(id));
        }
        debug!("loading conversation (conversation_id={id})");
        self.current = Some(id);
        Ok(())
    }

    /// The current conversation, if any.
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current.and_then(|id| self.conversation(id))
    }

    /// All conversations, most-recent-first.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// All folders in creation order.
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    /// Listing summaries, most-recently-updated first.
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .map(ConversationSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == id)
    }

    fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| conversation.id == id)
    }

    fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folders.iter().find(|folder| folder.id == id)
    }

    fn folder_mut(&mut self, id: FolderId) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|folder| folder.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationStore, FolderAddOutcome, SessionPhase, ToggleOutcome};
    use crate::error::VerboCoreError;
    use crate::types::{Language, Sender};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn ready_store() -> ConversationStore {
        let mut store = ConversationStore::new(Language::En);
        store.begin_initializing();
        store.finish_initializing(Vec::new(), Vec::new());
        store
    }

    #[test]
    fn operations_rejected_before_ready() {
        let mut store = ConversationStore::new(Language::En);
        let err = store.add_message("hello", Sender::User).expect_err("uninitialized");
        match err {
            VerboCoreError::NotReady(SessionPhase::Uninitialized) => {}
            other => panic!("unexpected error: {other:?}"),
        }

        store.begin_initializing();
        let err = store.start_new_conversation().expect_err("initializing");
        match err {
            VerboCoreError::NotReady(SessionPhase::Initializing) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fresh_session_seeds_one_conversation_with_one_assistant_message() {
        let store = ready_store();
        assert_eq!(store.conversations().len(), 1);
        let current = store.current_conversation().expect("current");
        assert_eq!(current.messages.len(), 1);
        assert_eq!(current.messages[0].sender, Sender::Assistant);
    }

    #[test]
    fn add_message_preserves_order_and_unique_ids() {
        let mut store = ready_store();
        for i in 0..5 {
            store
                .add_message(format!("message {i}"), Sender::User)
                .expect("add");
        }
        let current = store.current_conversation().expect("current");
        // welcome + 5 appends, in call order
        assert_eq!(current.messages.len(), 6);
        for (i, message) in current.messages.iter().skip(1).enumerate() {
            assert_eq!(message.text, format!("message {i}"));
        }
        let mut ids: Vec<_> = current.messages.iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
        for pair in current.messages.windows(2) {
            assert_eq!(pair[1].timestamp >= pair[0].timestamp, true);
        }
    }

    #[test]
    fn add_message_rejects_empty_text_without_mutation() {
        let mut store = ready_store();
        let before = store.current_conversation().expect("current").clone();
        let err = store.add_message("   ", Sender::User).expect_err("empty");
        match err {
            VerboCoreError::Validation(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.current_conversation().expect("current"), &before);
    }

    #[test]
    fn add_message_creates_conversation_when_none_current() {
        let mut store = ConversationStore::new(Language::En);
        store.begin_initializing();
        store.finish_initializing(Vec::new(), Vec::new());
        // Drop the current reference to exercise the implicit path.
        store.current = None;
        store.conversations.clear();
        let conversation = store.add_message("Hello", Sender::User).expect("add");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].sender, Sender::Assistant);
        assert_eq!(conversation.messages[1].text, "Hello");
    }

    #[test]
    fn toggle_favorite_is_an_involution() {
        let mut store = ready_store();
        let conversation = store.add_message("mark me", Sender::User).expect("add");
        let message_id = conversation.messages.last().expect("message").id;

        assert_eq!(
            store.toggle_favorite(message_id).expect("first toggle"),
            ToggleOutcome::Favorited
        );
        assert_eq!(
            store.toggle_favorite(message_id).expect("second toggle"),
            ToggleOutcome::Unfavorited
        );
        let current = store.current_conversation().expect("current");
        assert_eq!(current.message(message_id).expect("message").favorite, false);
    }

    #[test]
    fn toggle_favorite_reports_unknown_message() {
        let mut store = ready_store();
        let err = store.toggle_favorite(Uuid::new_v4()).expect_err("unknown");
        match err {
            VerboCoreError::UnknownMessage(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn favorited_messages_returns_exactly_the_marked_set() {
        let mut store = ready_store();
        let c1 = store.add_message("first", Sender::User).expect("add");
        let m1 = c1.messages.last().expect("m1").id;
        store.start_new_conversation().expect("new conversation");
        let c2 = store.add_message("second", Sender::User).expect("add");
        let m2 = c2.messages.last().expect("m2").id;

        store.toggle_favorite(m2).expect("favorite m2");
        store.load_conversation(c1.id).expect("switch back");
        store.toggle_favorite(m1).expect("favorite m1");

        let mut favorites: Vec<_> = store
            .favorited_messages()
            .expect("iterator")
            .map(|message| message.id)
            .collect();
        favorites.sort();
        let mut expected = vec![m1, m2];
        expected.sort();
        assert_eq!(favorites, expected);

        // Restartable: a second traversal sees the same snapshot.
        assert_eq!(store.favorited_messages().expect("iterator").count(), 2);
    }

    #[test]
    fn folder_add_is_idempotent() {
        let mut store = ready_store();
        let conversation = store.current_conversation().expect("current").clone();
        let welcome = conversation.messages[0].id;
        let folder = store.create_folder("Inspiration").expect("folder");
        assert_eq!(folder.message_ids.is_empty(), true);

        assert_eq!(
            store
                .add_message_to_folder(welcome, folder.id)
                .expect("first add"),
            FolderAddOutcome::Added
        );
        assert_eq!(
            store
                .add_message_to_folder(welcome, folder.id)
                .expect("second add"),
            FolderAddOutcome::AlreadyPresent
        );
        assert_eq!(store.folders()[0].message_ids, vec![welcome]);
    }

    #[test]
    fn folder_add_reports_unknown_folder() {
        let mut store = ready_store();
        let welcome = store.current_conversation().expect("current").messages[0].id;
        let err = store
            .add_message_to_folder(welcome, Uuid::new_v4())
            .expect_err("unknown folder");
        match err {
            VerboCoreError::UnknownFolder(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn folder_crud_no_ops_on_unknown_ids() {
        let mut store = ready_store();
        assert_eq!(store.rename_folder(Uuid::new_v4(), "name").expect("rename"), false);
        assert_eq!(store.delete_folder(Uuid::new_v4()).expect("delete"), false);
        assert_eq!(
            store
                .remove_message_from_folder(Uuid::new_v4(), Uuid::new_v4())
                .expect("remove"),
            false
        );
    }

    #[test]
    fn create_folder_rejects_empty_name() {
        let mut store = ready_store();
        let err = store.create_folder("  ").expect_err("empty name");
        match err {
            VerboCoreError::Validation(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.folders().is_empty(), true);
    }

    #[test]
    fn messages_in_folder_skips_dangling_references() {
        let mut store = ready_store();
        let conversation = store.add_message("keep me", Sender::User).expect("add");
        let live = conversation.messages.last().expect("live").id;
        let folder = store.create_folder("Mixed").expect("folder");
        store.add_message_to_folder(live, folder.id).expect("live add");
        // A reference that never resolves to a message.
        store
            .add_message_to_folder(Uuid::new_v4(), folder.id)
            .expect("dangling add");

        let resolved = store.messages_in_folder(folder.id).expect("resolve");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, live);
    }

    #[test]
    fn load_conversation_not_found_leaves_current_unchanged() {
        let mut store = ready_store();
        let current_before = store.current_conversation().expect("current").id;
        let err = store.load_conversation(Uuid::new_v4()).expect_err("missing");
        match err {
            VerboCoreError::UnknownConversation(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.current_conversation().expect("current").id, current_before);
    }

    #[test]
    fn spec_scenario_end_to_end() {
        let mut store = ready_store();
        let c1 = store.current_conversation().expect("current").clone();
        let welcome = c1.messages[0].clone();

        let updated = store.add_message("Hello", Sender::User).expect("add");
        assert_eq!(updated.messages.len(), 2);
        assert_eq!(updated.messages[1].sender, Sender::User);
        assert_eq!(updated.messages[1].timestamp >= welcome.timestamp, true);

        assert_eq!(
            store.toggle_favorite(welcome.id).expect("favorite welcome"),
            ToggleOutcome::Favorited
        );
        assert_eq!(
            store
                .current_conversation()
                .expect("current")
                .message(welcome.id)
                .expect("welcome")
                .favorite,
            true
        );

        let folder = store.create_folder("Inspiration").expect("folder");
        assert_eq!(folder.message_ids.is_empty(), true);
        assert_eq!(
            store
                .add_message_to_folder(welcome.id, folder.id)
                .expect("add"),
            FolderAddOutcome::Added
        );
        assert_eq!(
            store
                .add_message_to_folder(welcome.id, folder.id)
                .expect("repeat add"),
            FolderAddOutcome::AlreadyPresent
        );
        assert_eq!(store.folders()[0].message_ids, vec![welcome.id]);
    }

    #[test]
    fn reset_returns_to_uninitialized_and_clears_state() {
        let mut store = ready_store();
        store.add_message("gone after reset", Sender::User).expect("add");
        store.create_folder("Gone").expect("folder");

        store.reset();
        assert_eq!(store.phase(), SessionPhase::Uninitialized);
        assert_eq!(store.conversations().is_empty(), true);
        assert_eq!(store.folders().is_empty(), true);
        assert_eq!(store.current_conversation().is_none(), true);
    }

    #[test]
    fn finish_initializing_picks_most_recently_updated() {
        let mut store = ConversationStore::new(Language::En);
        store.begin_initializing();
        let older = crate::types::Conversation::seeded(Language::En);
        let mut newer = crate::types::Conversation::seeded(Language::En);
        newer.updated_at = older.updated_at + chrono::Duration::seconds(10);
        let newer_id = newer.id;
        store.finish_initializing(vec![older, newer], Vec::new());

        assert_eq!(store.current_conversation().expect("current").id, newer_id);
        assert_eq!(store.conversations()[0].id, newer_id);
    }
}
