use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

use super::AssistantPrompt;
use super::Document;
use super::DocumentId;
use super::DocumentPatch;
use super::SyncResult;

/// Body of a generation response: a lazy, finite, non-restartable sequence of
/// raw byte chunks. Dropping it closes the underlying connection.
pub type TextSource = Pin<Box<dyn Stream<Item = SyncResult<Vec<u8>>> + Send>>;

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RemoteName {
    Http,
    Memory,
}

impl RemoteName {
    pub fn parse(text: &str) -> Option<RemoteName> {
        return RemoteName::iter().find(|e| return e.to_string() == text);
    }
}

/// The remote document store and assistant endpoint. No method retries;
/// retry policy belongs to the caller.
#[async_trait]
pub trait RemoteStore {
    fn name(&self) -> RemoteName;

    /// Used at startup to show whether the store is reachable.
    async fn health_check(&self) -> SyncResult<()>;

    /// Creates a draft document. The returned record, id included, is the
    /// canonical one.
    async fn create(&self, title: &str, content: Value) -> SyncResult<Document>;

    /// Lists all documents. Unexpected response shapes yield an empty list.
    async fn fetch_all(&self) -> SyncResult<Vec<Document>>;

    async fn fetch(&self, id: &DocumentId) -> SyncResult<Document>;

    /// Partial update, fields absent from `patch` are left untouched.
    async fn update(&self, id: &DocumentId, patch: &DocumentPatch) -> SyncResult<()>;

    async fn delete(&self, id: &DocumentId) -> SyncResult<()>;

    /// Opens a generation request. Fails only if the handshake fails, read
    /// errors after that are yielded by the returned source.
    async fn generate(&self, prompt: AssistantPrompt) -> SyncResult<TextSource>;
}

pub type RemoteBox = Arc<dyn RemoteStore + Send + Sync>;
