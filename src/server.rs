//! LSP server wiring
//!
//! Owns the protocol surface: request dispatch, notification handling, and
//! the push side (diagnostics publishing and the explorer command). The
//! annotation producers do the actual work; this layer only moves document
//! text in and protocol types out.
//!
//! Handlers run to completion one at a time. Each takes a [`Session`]
//! snapshot at entry, and a configuration change installs a fresh session
//! in the shared slot instead of mutating the one a handler already holds.

use crate::annotations;
use crate::config::EtherlensConfig;
use crate::documents::DocumentStore;
use crate::proto::OPEN_EXPLORER_COMMAND;
use crate::session::Session;
use anyhow::{anyhow, Result};
use lsp_server::{Connection, Notification, Request, Response};
use lsp_types::notification::{
    DidChangeConfiguration, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument,
    Notification as _,
};
use lsp_types::request::{
    CodeActionRequest, CodeLensRequest, CodeLensResolve, Completion, ExecuteCommand, HoverRequest,
    Request as _,
};
use lsp_types::{
    CodeActionParams, CodeLens, CodeLensParams, CompletionParams, CompletionResponse,
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, ExecuteCommandParams, HoverParams, PublishDiagnosticsParams,
    ShowDocumentParams, Url,
};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

pub struct EtherlensServer {
    session: RwLock<Arc<Session>>,
    documents: DocumentStore,
    show_document_id: AtomicI32,
}

impl EtherlensServer {
    pub fn new(config: EtherlensConfig) -> Self {
        Self {
            session: RwLock::new(Arc::new(Session::new(config))),
            documents: DocumentStore::new(),
            show_document_id: AtomicI32::new(0),
        }
    }

    /// Snapshot of the current session. Lookups made through the snapshot
    /// keep hitting the caches it was created with even if a configuration
    /// change swaps the shared slot mid-handler.
    fn session(&self) -> Arc<Session> {
        self.session.read().unwrap().clone()
    }

    pub async fn process_request(&self, connection: &Connection, req: Request) {
        let req_id = req.id.clone();

        let result = match req.method.as_str() {
            Completion::METHOD => self.handle_completion(connection, req).await,
            HoverRequest::METHOD => self.handle_hover(connection, req).await,
            CodeLensRequest::METHOD => self.handle_code_lens(connection, req),
            CodeLensResolve::METHOD => self.handle_code_lens_resolve(connection, req).await,
            CodeActionRequest::METHOD => self.handle_code_action(connection, req).await,
            ExecuteCommand::METHOD => self.handle_execute_command(connection, req),
            _ => {
                debug!("Received unhandled request: {}", req.method);
                Ok(())
            }
        };

        if let Err(e) = result {
            let response = Response::new_err(req_id, -32603, e.to_string());
            let _ = connection.sender.send(response.into());
        }
    }

    pub async fn process_notification(&self, connection: &Connection, not: Notification) {
        let method = not.method.clone();

        let result = match not.method.as_str() {
            DidOpenTextDocument::METHOD => self.handle_did_open(connection, not).await,
            DidChangeTextDocument::METHOD => self.handle_did_change(connection, not).await,
            DidCloseTextDocument::METHOD => self.handle_did_close(connection, not),
            DidChangeConfiguration::METHOD => self.handle_did_change_configuration(not),
            _ => {
                debug!("Received unhandled notification: {}", method);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Error processing {}: {}", method, e);
        }
    }

    async fn handle_did_open(&self, connection: &Connection, not: Notification) -> Result<()> {
        let params: DidOpenTextDocumentParams = serde_json::from_value(not.params)?;
        let doc = params.text_document;

        self.documents
            .open(doc.uri.clone(), doc.language_id, doc.version, doc.text);
        self.validate_document(connection, &doc.uri).await
    }

    async fn handle_did_change(&self, connection: &Connection, not: Notification) -> Result<()> {
        let params: DidChangeTextDocumentParams = serde_json::from_value(not.params)?;
        let uri = params.text_document.uri;

        // Full sync: the last change event carries the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .update(&uri, params.text_document.version, change.text);
        }
        self.validate_document(connection, &uri).await
    }

    fn handle_did_close(&self, connection: &Connection, not: Notification) -> Result<()> {
        let params: DidCloseTextDocumentParams = serde_json::from_value(not.params)?;
        let uri = params.text_document.uri;

        self.documents.close(&uri);
        self.publish_diagnostics(connection, uri, Vec::new(), None)
    }

    fn handle_did_change_configuration(&self, not: Notification) -> Result<()> {
        let params: DidChangeConfigurationParams = serde_json::from_value(not.params)?;

        let mut config = self.session().settings.clone();
        if let Err(e) = config.update_from_lsp_value(params.settings) {
            warn!("Ignoring unreadable configuration update: {}", e);
            return Ok(());
        }
        if let Err(reason) = config.validate() {
            warn!("Ignoring invalid configuration update: {}", reason);
            return Ok(());
        }

        info!("Configuration changed, starting a fresh session");
        *self.session.write().unwrap() = Arc::new(Session::new(config));
        Ok(())
    }

    async fn validate_document(&self, connection: &Connection, uri: &Url) -> Result<()> {
        let document = match self.documents.get(uri) {
            Some(document) => document,
            None => return Ok(()),
        };

        let session = self.session();
        let diagnostics = annotations::document_diagnostics(&session, &document.content).await;
        debug!(
            "Publishing {} diagnostics for {} (version {})",
            diagnostics.len(),
            uri,
            document.version
        );
        self.publish_diagnostics(connection, uri.clone(), diagnostics, Some(document.version))
    }

    fn publish_diagnostics(
        &self,
        connection: &Connection,
        uri: Url,
        diagnostics: Vec<lsp_types::Diagnostic>,
        version: Option<i32>,
    ) -> Result<()> {
        let params = PublishDiagnosticsParams {
            uri,
            diagnostics,
            version,
        };
        let notification = Notification::new(
            "textDocument/publishDiagnostics".to_string(),
            serde_json::to_value(params)?,
        );
        connection.sender.send(notification.into())?;
        Ok(())
    }

    async fn handle_completion(&self, connection: &Connection, req: Request) -> Result<()> {
        let params: CompletionParams = serde_json::from_value(req.params)?;
        let uri = params.text_document_position.text_document.uri;
        let text = self
            .documents
            .get(&uri)
            .map(|document| document.content)
            .unwrap_or_default();

        let session = self.session();
        let items = annotations::completion_items(&session, &text).await;

        let response = Response::new_ok(
            req.id,
            serde_json::to_value(CompletionResponse::Array(items))?,
        );
        connection.sender.send(response.into())?;
        Ok(())
    }

    async fn handle_hover(&self, connection: &Connection, req: Request) -> Result<()> {
        let params: HoverParams = serde_json::from_value(req.params)?;
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let hover = match self.documents.get(&uri) {
            Some(document) => {
                let session = self.session();
                annotations::hover_for_position(&session, &document.content, position).await
            }
            None => None,
        };

        let response = Response::new_ok(req.id, serde_json::to_value(hover)?);
        connection.sender.send(response.into())?;
        Ok(())
    }

    fn handle_code_lens(&self, connection: &Connection, req: Request) -> Result<()> {
        let params: CodeLensParams = serde_json::from_value(req.params)?;

        let lenses = self
            .documents
            .get(&params.text_document.uri)
            .map(|document| annotations::code_lenses(&document.content))
            .unwrap_or_default();

        let response = Response::new_ok(req.id, serde_json::to_value(lenses)?);
        connection.sender.send(response.into())?;
        Ok(())
    }

    async fn handle_code_lens_resolve(&self, connection: &Connection, req: Request) -> Result<()> {
        let lens: CodeLens = serde_json::from_value(req.params)?;

        let session = self.session();
        let resolved = annotations::resolve_lens(&session, lens).await;

        let response = Response::new_ok(req.id, serde_json::to_value(resolved)?);
        connection.sender.send(response.into())?;
        Ok(())
    }

    async fn handle_code_action(&self, connection: &Connection, req: Request) -> Result<()> {
        let params: CodeActionParams = serde_json::from_value(req.params)?;

        let session = self.session();
        let actions = annotations::quick_fixes(
            &session,
            &params.text_document.uri,
            &params.context.diagnostics,
        )
        .await;

        let response = Response::new_ok(req.id, serde_json::to_value(actions)?);
        connection.sender.send(response.into())?;
        Ok(())
    }

    fn handle_execute_command(&self, connection: &Connection, req: Request) -> Result<()> {
        let params: ExecuteCommandParams = serde_json::from_value(req.params)?;

        match params.command.as_str() {
            OPEN_EXPLORER_COMMAND => {
                let url = params
                    .arguments
                    .first()
                    .and_then(|argument| argument.as_str())
                    .ok_or_else(|| anyhow!("Missing explorer URL argument"))?;
                self.request_show_document(connection, url)?;

                let response = Response::new_ok(req.id, serde_json::Value::Null);
                connection.sender.send(response.into())?;
            }
            other => {
                let response =
                    Response::new_err(req.id, -32601, format!("Unknown command: {}", other));
                connection.sender.send(response.into())?;
            }
        }
        Ok(())
    }

    /// Asks the client to open a URL in the system browser. The client's
    /// answer comes back as a response message; the main loop logs it.
    fn request_show_document(&self, connection: &Connection, url: &str) -> Result<()> {
        let params = ShowDocumentParams {
            uri: Url::parse(url)?,
            external: Some(true),
            take_focus: None,
            selection: None,
        };
        let id = self.show_document_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(
            id.into(),
            "window/showDocument".to_string(),
            serde_json::to_value(params)?,
        );
        connection.sender.send(request.into())?;
        Ok(())
    }
}
