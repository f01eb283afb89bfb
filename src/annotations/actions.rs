//! Quick fixes
//!
//! Maps each diagnostic code to exactly one corrective edit. The diagnostics
//! producer stowed the replacement payload in the diagnostic's data field, so
//! most fixes are pure edits over that payload; only ABI insertion goes back
//! through the resolver, where the verification result is usually still
//! cached from the detection pass.

use crate::proto::codes;
use crate::session::Session;
use lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, Diagnostic, NumberOrString, Position, Range,
    TextEdit, Url, WorkspaceEdit,
};
use std::collections::HashMap;
use tracing::warn;

/// Builds the quick fixes for the diagnostics the editor sent back with a
/// code-action request. Diagnostics without a payload produce no fix.
pub async fn quick_fixes(
    session: &Session,
    uri: &Url,
    diagnostics: &[Diagnostic],
) -> Vec<CodeActionOrCommand> {
    let mut actions = Vec::new();

    let wants_abi = diagnostics.iter().any(|diagnostic| {
        matches!(
            diagnostic.code.as_ref(),
            Some(NumberOrString::String(code)) if code == codes::CONTRACT_DETECTED
        )
    });
    if wants_abi && !session.resolver.has_verification_key() {
        warn!("no verification credential configured, ABI fixes are off for this pass");
    }

    for diagnostic in diagnostics {
        let code = match diagnostic.code.as_ref() {
            Some(NumberOrString::String(code)) => code.as_str(),
            _ => continue,
        };

        let action = match code {
            codes::NOT_CHECKSUMMED => data_string(diagnostic, "checksummed").map(|checksummed| {
                replace_action(
                    uri,
                    diagnostic,
                    "Convert to checksummed address".to_string(),
                    checksummed,
                )
            }),
            codes::ENS_AVAILABLE => data_string(diagnostic, "name").map(|name| {
                replace_action(
                    uri,
                    diagnostic,
                    format!("Replace with ENS name '{name}'"),
                    name,
                )
            }),
            codes::ADDRESS_AVAILABLE => data_string(diagnostic, "address").map(|address| {
                replace_action(
                    uri,
                    diagnostic,
                    format!("Replace with {address}"),
                    address,
                )
            }),
            codes::CONTRACT_DETECTED => abi_action(session, uri, diagnostic).await,
            _ => None,
        };

        if let Some(action) = action {
            actions.push(CodeActionOrCommand::CodeAction(action));
        }
    }

    actions
}

/// Inserts a `const ABI_<prefix> = <abi>;` declaration on the line below the
/// detected contract address. No fix is offered when the ABI is unavailable.
async fn abi_action(session: &Session, uri: &Url, diagnostic: &Diagnostic) -> Option<CodeAction> {
    let address = data_string(diagnostic, "address")?;
    let abi = session.resolver.contract_abi(&address).await?;

    let insert_at = Position {
        line: diagnostic.range.start.line + 1,
        character: 0,
    };
    let edit = TextEdit {
        range: Range {
            start: insert_at,
            end: insert_at,
        },
        new_text: format!("const {} = {};\n", abi_identifier(&address), abi),
    };

    Some(edit_action(
        uri,
        diagnostic,
        "Insert contract ABI declaration".to_string(),
        edit,
    ))
}

fn replace_action(
    uri: &Url,
    diagnostic: &Diagnostic,
    title: String,
    new_text: String,
) -> CodeAction {
    let edit = TextEdit {
        range: diagnostic.range,
        new_text,
    };
    edit_action(uri, diagnostic, title, edit)
}

fn edit_action(uri: &Url, diagnostic: &Diagnostic, title: String, edit: TextEdit) -> CodeAction {
    let mut changes = HashMap::new();
    changes.insert(uri.clone(), vec![edit]);

    CodeAction {
        title,
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![diagnostic.clone()]),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn abi_identifier(address: &str) -> String {
    let hex_part = address.strip_prefix("0x").unwrap_or(address);
    let prefix: String = hex_part.chars().take(8).collect();
    format!("ABI_{}", prefix.to_uppercase())
}

fn data_string(diagnostic: &Diagnostic, field: &str) -> Option<String> {
    diagnostic
        .data
        .as_ref()
        .and_then(|data| data.get(field))
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EtherlensConfig;
    use crate::proto::DIAGNOSTIC_SOURCE;
    use lsp_types::DiagnosticSeverity;
    use serde_json::json;

    const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    fn test_uri() -> Url {
        Url::parse("file:///tmp/wallet.js").unwrap()
    }

    fn test_session() -> Session {
        let mut config = EtherlensConfig::default();
        config.services.token_list_url = "http://127.0.0.1:1/tokens".to_string();
        Session::new(config)
    }

    fn diagnostic_with(code: &str, data: Option<serde_json::Value>) -> Diagnostic {
        Diagnostic {
            range: Range {
                start: Position {
                    line: 4,
                    character: 10,
                },
                end: Position {
                    line: 4,
                    character: 52,
                },
            },
            severity: Some(DiagnosticSeverity::WARNING),
            code: Some(NumberOrString::String(code.to_string())),
            code_description: None,
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: "test".to_string(),
            related_information: None,
            tags: None,
            data,
        }
    }

    fn only_action(actions: Vec<CodeActionOrCommand>) -> CodeAction {
        assert_eq!(actions.len(), 1);
        match actions.into_iter().next().unwrap() {
            CodeActionOrCommand::CodeAction(action) => action,
            CodeActionOrCommand::Command(_) => panic!("expected a code action"),
        }
    }

    fn only_edit(action: &CodeAction, uri: &Url) -> TextEdit {
        let changes = action.edit.as_ref().unwrap().changes.as_ref().unwrap();
        let edits = &changes[uri];
        assert_eq!(edits.len(), 1);
        edits[0].clone()
    }

    #[tokio::test]
    async fn test_checksum_fix_replaces_in_place() {
        let session = test_session();
        let uri = test_uri();
        let diagnostic = diagnostic_with(
            codes::NOT_CHECKSUMMED,
            Some(json!({ "checksummed": USDT })),
        );

        let action = only_action(quick_fixes(&session, &uri, &[diagnostic.clone()]).await);
        assert_eq!(action.title, "Convert to checksummed address");
        assert_eq!(action.kind, Some(CodeActionKind::QUICKFIX));
        assert_eq!(action.diagnostics, Some(vec![diagnostic.clone()]));

        let edit = only_edit(&action, &uri);
        assert_eq!(edit.range, diagnostic.range);
        assert_eq!(edit.new_text, USDT);
    }

    #[tokio::test]
    async fn test_ens_name_fix() {
        let session = test_session();
        let uri = test_uri();
        let diagnostic =
            diagnostic_with(codes::ENS_AVAILABLE, Some(json!({ "name": "vitalik.eth" })));

        let action = only_action(quick_fixes(&session, &uri, &[diagnostic]).await);
        assert_eq!(action.title, "Replace with ENS name 'vitalik.eth'");
        assert_eq!(only_edit(&action, &uri).new_text, "vitalik.eth");
    }

    #[tokio::test]
    async fn test_resolved_address_fix() {
        let session = test_session();
        let uri = test_uri();
        let diagnostic =
            diagnostic_with(codes::ADDRESS_AVAILABLE, Some(json!({ "address": USDT })));

        let action = only_action(quick_fixes(&session, &uri, &[diagnostic]).await);
        assert_eq!(action.title, format!("Replace with {USDT}"));
        assert_eq!(only_edit(&action, &uri).new_text, USDT);
    }

    #[tokio::test]
    async fn test_abi_fix_inserts_below_the_line() {
        let mut config = EtherlensConfig::default();
        config.services.verification_api_key = "test-key".to_string();
        config.services.token_list_url = "http://127.0.0.1:1/tokens".to_string();
        let session = Session::new(config);
        session
            .caches
            .contract_abi
            .put(USDT.to_string(), "[{\"type\":\"fallback\"}]".to_string());

        let uri = test_uri();
        let diagnostic =
            diagnostic_with(codes::CONTRACT_DETECTED, Some(json!({ "address": USDT })));

        let action = only_action(quick_fixes(&session, &uri, &[diagnostic]).await);
        assert_eq!(action.title, "Insert contract ABI declaration");

        let edit = only_edit(&action, &uri);
        assert_eq!(
            edit.range.start,
            Position {
                line: 5,
                character: 0
            }
        );
        assert_eq!(edit.range.start, edit.range.end);
        assert_eq!(
            edit.new_text,
            "const ABI_DAC17F95 = [{\"type\":\"fallback\"}];\n"
        );
    }

    #[tokio::test]
    async fn test_no_fix_without_payload_or_credential() {
        let session = test_session();
        assert!(!session.resolver.has_verification_key());
        let uri = test_uri();

        // error diagnostics carry no payload and get no fix
        let invalid = diagnostic_with(codes::INVALID_ADDRESS, None);
        // contract hint without a verification credential: ABI unavailable
        let contract = diagnostic_with(codes::CONTRACT_DETECTED, Some(json!({ "address": USDT })));
        // payload missing entirely
        let bare = diagnostic_with(codes::NOT_CHECKSUMMED, None);

        let actions = quick_fixes(&session, &uri, &[invalid, contract, bare]).await;
        assert!(actions.is_empty());
    }
}
