//! Open documents
//!
//! Mirror of every open document's text, keyed by URI. The editor owns the
//! truth; this copy serves producer requests between change notifications.
//! Synchronization is full-text, so an update replaces the content whole.

use dashmap::DashMap;
use lsp_types::Url;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub uri: Url,
    pub language_id: String,
    pub version: i32,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Arc<DashMap<Url, DocumentInfo>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: Url, language_id: String, version: i32, content: String) {
        debug!("opened document: {} (version {})", uri, version);
        self.documents.insert(
            uri.clone(),
            DocumentInfo {
                uri,
                language_id,
                version,
                content,
            },
        );
    }

    pub fn update(&self, uri: &Url, version: i32, content: String) {
        match self.documents.get_mut(uri) {
            Some(mut doc) => {
                doc.version = version;
                doc.content = content;
            }
            None => debug!("change for unopened document: {}", uri),
        }
    }

    pub fn close(&self, uri: &Url) {
        debug!("closed document: {}", uri);
        self.documents.remove(uri);
    }

    pub fn get(&self, uri: &Url) -> Option<DocumentInfo> {
        self.documents.get(uri).map(|doc| doc.value().clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
