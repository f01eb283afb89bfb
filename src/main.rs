//! Etherlens LSP server entry point
//!
//! Handlers are awaited to completion in arrival order. Annotation passes
//! are short (cache hits or a handful of HTTP round-trips), and serializing
//! them keeps published diagnostics consistent with the latest text without
//! any cross-request locking.

use anyhow::Result;
use lsp_server::{Connection, Message};
use lsp_types::{
    CodeActionKind, CodeActionOptions, CodeActionProviderCapability, CodeLensOptions,
    CompletionOptions, ExecuteCommandOptions, HoverProviderCapability, InitializeParams,
    ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind, WorkDoneProgressOptions,
};
use std::env;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use etherlens_lsp::config::EtherlensConfig;
use etherlens_lsp::proto::OPEN_EXPLORER_COMMAND;
use etherlens_lsp::server::EtherlensServer;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && (args[1] == "--version" || args[1] == "-V") {
        println!("etherlens-lsp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Etherlens LSP server");

    let (connection, io_threads) = Connection::stdio();

    let server_capabilities = serde_json::to_value(ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec!["0".to_string(), "x".to_string()]),
            ..Default::default()
        }),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        code_lens_provider: Some(CodeLensOptions {
            resolve_provider: Some(true),
        }),
        code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
            code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
            work_done_progress_options: WorkDoneProgressOptions::default(),
            resolve_provider: Some(false),
        })),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: vec![OPEN_EXPLORER_COMMAND.to_string()],
            work_done_progress_options: WorkDoneProgressOptions::default(),
        }),
        ..Default::default()
    })?;

    let init_params = connection.initialize(server_capabilities)?;
    let init_params: InitializeParams = serde_json::from_value(init_params)?;

    let mut config = match init_params.initialization_options {
        Some(options) => EtherlensConfig::from_lsp_value(options).unwrap_or_default(),
        None => EtherlensConfig::default(),
    };
    if let Err(reason) = config.validate() {
        warn!("Invalid initialization options ({}), using defaults", reason);
        config = EtherlensConfig::default();
    }

    main_loop(connection, config).await?;

    io_threads.join()?;
    info!("Shutting down Etherlens LSP server");
    Ok(())
}

async fn main_loop(connection: Connection, config: EtherlensConfig) -> Result<()> {
    info!("Starting main loop");

    let server = EtherlensServer::new(config);

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    break;
                }
                server.process_request(&connection, req).await;
            }
            Message::Notification(not) => {
                server.process_notification(&connection, not).await;
            }
            Message::Response(resp) => {
                // Answer to a server-initiated request, e.g. showDocument.
                debug!("Client response for request {:?}", resp.id);
            }
        }
    }

    Ok(())
}
