//! Remote HTTP state store.
//!
//! Talks to a document endpoint that stores one conversation document and
//! one folder document per identity partition. The adapter treats any error
//! from here as a soft failure and falls back to local storage.

use crate::state::{
    ConversationDocument, ConversationRecord, FolderDocument, FolderRecord, SCHEMA_VERSION,
    StateError, StateStore,
};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use verbo_config::RemoteStorageConfig;

/// HTTP-backed state store for authenticated partitions.
pub struct HttpStateStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpStateStore {
    /// Create a store against an explicit endpoint.
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Build a store from config; the bearer token is read from the env var
    /// the config names, when present.
    pub fn from_config(config: &RemoteStorageConfig) -> Self {
        let auth_token = config
            .auth_token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        Self::new(config.base_url.clone(), auth_token)
    }

    fn url(&self, partition: &str, collection: &str) -> String {
        format!("{}/v1/state/{partition}/{collection}", self.base_url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_document<T: serde::de::DeserializeOwned>(
        &self,
        partition: &str,
        collection: &str,
    ) -> Result<Option<T>, StateError> {
        let url = self.url(partition, collection);
        debug!("fetching remote {collection} document (partition={partition})");
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|err| StateError::Http(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StateError::RemoteStatus(response.status().as_u16()));
        }
        let document = response
            .json::<T>()
            .await
            .map_err(|err| StateError::Http(err.to_string()))?;
        Ok(Some(document))
    }

    async fn put_document<T: serde::Serialize>(
        &self,
        partition: &str,
        collection: &str,
        document: &T,
    ) -> Result<(), StateError> {
        let url = self.url(partition, collection);
        debug!("pushing remote {collection} document (partition={partition})");
        let response = self
            .request(self.client.put(&url))
            .json(document)
            .send()
            .await
            .map_err(|err| StateError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StateError::RemoteStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for HttpStateStore {
    async fn load_conversations(
        &self,
        partition: &str,
    ) -> Result<Vec<ConversationRecord>, StateError> {
        let Some(document) = self
            .get_document::<ConversationDocument>(partition, "conversations")
            .await?
        else {
            return Ok(Vec::new());
        };
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
        self.put_document(partition, "conversations", &document).await
    }

    async fn load_folders(&self, partition: &str) -> Result<Vec<FolderRecord>, StateError> {
        let Some(document) = self
            .get_document::<FolderDocument>(partition, "folders")
            .await?
        else {
            return Ok(Vec::new());
        };
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
        self.put_document(partition, "folders", &document).await
    }
}
