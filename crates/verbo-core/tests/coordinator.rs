//! Sync coordinator integration tests.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;
use verbo_core::state::{ConversationRecord, FolderRecord, StateError, StateStore};
use verbo_core::{
    Identity, JsonStateStore, Language, Message, PersistenceAdapter, ReplyError, ReplyProvider,
    Sender, SessionPhase, SyncCoordinator, VerboCoreError, apology_text,
};

/// Remote stub that fails every call, counting the attempts.
struct FailingRemote {
    calls: AtomicUsize,
}

impl FailingRemote {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StateStore for FailingRemote {
    async fn load_conversations(
        &self,
        _partition: &str,
    ) -> Result<Vec<ConversationRecord>, StateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StateError::Http("connection refused".to_string()))
    }

    async fn save_conversations(
        &self,
        _partition: &str,
        _conversations: &[ConversationRecord],
    ) -> Result<(), StateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StateError::RemoteStatus(503))
    }

    async fn load_folders(&self, _partition: &str) -> Result<Vec<FolderRecord>, StateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StateError::Http("connection refused".to_string()))
    }

    async fn save_folders(
        &self,
        _partition: &str,
        _folders: &[FolderRecord],
    ) -> Result<(), StateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StateError::RemoteStatus(503))
    }
}

/// Reply stub that always times out.
struct UnreachableProvider;

#[async_trait]
impl ReplyProvider for UnreachableProvider {
    async fn generate_reply(
        &self,
        _user_text: &str,
        _recent_history: &[Message],
        _language: Language,
    ) -> Result<String, ReplyError> {
        Err(ReplyError::Http("timed out".to_string()))
    }
}

/// Reply stub that echoes the user's text.
struct EchoProvider;

#[async_trait]
impl ReplyProvider for EchoProvider {
    async fn generate_reply(
        &self,
        user_text: &str,
        _recent_history: &[Message],
        _language: Language,
    ) -> Result<String, ReplyError> {
        Ok(format!("echo: {user_text}"))
    }
}

fn local_adapter(root: &std::path::Path) -> Arc<PersistenceAdapter> {
    let local = Arc::new(JsonStateStore::new(root).expect("local store"));
    Arc::new(PersistenceAdapter::new(local, None))
}

#[tokio::test]
async fn fresh_guest_session_seeds_and_resumes() {
    let temp = tempdir().expect("tempdir");

    let coordinator = SyncCoordinator::new(Language::En, local_adapter(temp.path()));
    assert_eq!(coordinator.phase(), SessionPhase::Uninitialized);
    coordinator.initialize().await;
    assert_eq!(coordinator.phase(), SessionPhase::Ready);

    let current = coordinator.current_conversation().expect("current");
    assert_eq!(current.messages.len(), 1);
    assert_eq!(current.messages[0].sender, Sender::Assistant);

    coordinator.add_message("remember me", Sender::User).expect("add");
    coordinator.persist_now().await;

    // A second session over the same storage resumes the same conversation.
    let resumed = SyncCoordinator::new(Language::En, local_adapter(temp.path()));
    resumed.initialize().await;
    let conversation = resumed.current_conversation().expect("current");
    assert_eq!(conversation.id, current.id);
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[1].text, "remember me");
}

#[tokio::test]
async fn operations_rejected_before_initialize() {
    let temp = tempdir().expect("tempdir");
    let coordinator = SyncCoordinator::new(Language::En, local_adapter(temp.path()));
    let err = coordinator
        .add_message("too early", Sender::User)
        .expect_err("uninitialized");
    match err {
        VerboCoreError::NotReady(SessionPhase::Uninitialized) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn remote_save_failure_leaves_memory_intact() {
    let temp = tempdir().expect("tempdir");
    let local = Arc::new(JsonStateStore::new(temp.path()).expect("local store"));
    let remote = Arc::new(FailingRemote::new());
    let adapter = Arc::new(PersistenceAdapter::new(local.clone(), Some(remote.clone() as _)));

    let coordinator = SyncCoordinator::new(Language::En, adapter);
    coordinator
        .set_identity(Identity::User("abc".to_string()))
        .await;
    assert_eq!(coordinator.phase(), SessionPhase::Ready);

    let conversation = coordinator
        .add_message("still here", Sender::User)
        .expect("add");
    coordinator.persist_now().await;

    // The remote was attempted and failed; the append survives in memory
    // and in the local partition.
    assert_eq!(remote.calls.load(Ordering::SeqCst) > 0, true);
    let current = coordinator.current_conversation().expect("current");
    assert_eq!(current.messages.len(), conversation.messages.len());
    let persisted = local
        .load_conversations("user-abc")
        .await
        .expect("local load");
    assert_eq!(persisted[0].messages.len(), conversation.messages.len());
}

#[tokio::test]
async fn identity_switch_isolates_partitions() {
    let temp = tempdir().expect("tempdir");
    let coordinator = SyncCoordinator::new(Language::Pt, local_adapter(temp.path()));
    coordinator.initialize().await;

    coordinator
        .add_message("guest note", Sender::User)
        .expect("add");
    coordinator.persist_now().await;
    let guest_conversation = coordinator.current_conversation().expect("current").id;

    // Login: the user's partition is empty, so a fresh conversation is
    // seeded. Nothing migrates from the guest partition.
    coordinator
        .set_identity(Identity::User("abc".to_string()))
        .await;
    let user_conversation = coordinator.current_conversation().expect("current");
    assert_eq!(user_conversation.id == guest_conversation, false);
    assert_eq!(user_conversation.messages.len(), 1);
    coordinator.persist_now().await;

    // Logout: the guest partition comes back exactly as it was.
    coordinator.set_identity(Identity::Guest).await;
    let restored = coordinator.current_conversation().expect("current");
    assert_eq!(restored.id, guest_conversation);
    assert_eq!(restored.messages.len(), 2);
}

#[tokio::test]
async fn send_message_appends_user_and_assistant_turns() {
    let temp = tempdir().expect("tempdir");
    let coordinator = SyncCoordinator::new(Language::En, local_adapter(temp.path()))
        .with_reply_provider(Arc::new(EchoProvider));
    coordinator.initialize().await;

    let conversation = coordinator.send_message("how are you?").await.expect("send");
    // welcome + user + assistant
    assert_eq!(conversation.messages.len(), 3);
    assert_eq!(conversation.messages[1].sender, Sender::User);
    assert_eq!(conversation.messages[1].text, "how are you?");
    assert_eq!(conversation.messages[2].sender, Sender::Assistant);
    assert_eq!(conversation.messages[2].text, "echo: how are you?");
}

#[tokio::test]
async fn send_message_degrades_to_localized_apology() {
    let temp = tempdir().expect("tempdir");
    let coordinator = SyncCoordinator::new(Language::Pt, local_adapter(temp.path()))
        .with_reply_provider(Arc::new(UnreachableProvider));
    coordinator.initialize().await;

    let conversation = coordinator.send_message("olá").await.expect("send");
    assert_eq!(conversation.messages.len(), 3);
    assert_eq!(conversation.messages[1].text, "olá");
    assert_eq!(conversation.messages[2].sender, Sender::Assistant);
    assert_eq!(conversation.messages[2].text, apology_text(Language::Pt));
}

#[tokio::test]
async fn send_message_without_provider_is_an_error() {
    let temp = tempdir().expect("tempdir");
    let coordinator = SyncCoordinator::new(Language::En, local_adapter(temp.path()));
    coordinator.initialize().await;

    let err = coordinator.send_message("anyone there?").await.expect_err("no provider");
    match err {
        VerboCoreError::State(_) => {}
        other => panic!("unexpected error: {other:?}"),
    }
    // The user's message is not appended when no provider is configured.
    let current = coordinator.current_conversation().expect("current");
    assert_eq!(current.messages.len(), 1);
}

#[tokio::test]
async fn folder_changes_survive_a_session_restart() {
    let temp = tempdir().expect("tempdir");
    let coordinator = SyncCoordinator::new(Language::En, local_adapter(temp.path()));
    coordinator.initialize().await;

    let welcome = coordinator.current_conversation().expect("current").messages[0].id;
    let folder = coordinator.create_folder("Inspiration").expect("folder");
    coordinator
        .add_message_to_folder(welcome, folder.id)
        .expect("add to folder");
    coordinator.persist_now().await;

    let resumed = SyncCoordinator::new(Language::En, local_adapter(temp.path()));
    resumed.initialize().await;
    let folders = resumed.folders();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].name, "Inspiration");
    assert_eq!(folders[0].message_ids, vec![welcome]);

    let resolved = resumed.messages_in_folder(folders[0].id).expect("resolve");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, welcome);
}
