//! Diagnostics producer
//!
//! Walks the address and name candidates of a document and emits at most one
//! diagnostic per candidate. Address candidates follow a strict priority: a
//! broken checksum outranks the unchecksummed warning, which outranks the
//! informational hints. Each payload carries the replacement data its quick
//! fix needs, so the fix handler works without a second lookup.

use crate::classify::{is_valid_address, to_checksum_address};
use crate::proto::{codes, StringLocation, DIAGNOSTIC_SOURCE};
use crate::scanner;
use crate::session::Session;
use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};
use serde_json::json;
use tracing::warn;

/// Full-document validation pass. Scanning starts from scratch on every call;
/// output is capped by the max-problems setting across both candidate kinds.
pub async fn document_diagnostics(session: &Session, text: &str) -> Vec<Diagnostic> {
    let max_problems = session.settings.diagnostics.max_problems;
    let mut diagnostics = Vec::new();

    let addresses = scanner::find_address_candidates(text);
    if !addresses.is_empty() && !session.resolver.has_provider() {
        warn!("no chain provider configured, contract detection is off for this pass");
    }

    for candidate in &addresses {
        if diagnostics.len() >= max_problems {
            return diagnostics;
        }
        if let Some(diagnostic) = address_diagnostic(session, candidate).await {
            diagnostics.push(diagnostic);
        }
    }

    for candidate in &scanner::find_ens_candidates(text) {
        if diagnostics.len() >= max_problems {
            return diagnostics;
        }
        if let Some(address) = session.resolver.resolve_name(&candidate.content).await {
            diagnostics.push(make_diagnostic(
                candidate,
                DiagnosticSeverity::HINT,
                codes::ADDRESS_AVAILABLE,
                format!("'{}' resolves to {}", candidate.content, address),
                Some(json!({ "address": address })),
            ));
        }
    }

    diagnostics
}

async fn address_diagnostic(session: &Session, candidate: &StringLocation) -> Option<Diagnostic> {
    let content = candidate.content.as_str();

    if !is_valid_address(content) {
        return Some(make_diagnostic(
            candidate,
            DiagnosticSeverity::ERROR,
            codes::INVALID_ADDRESS,
            format!("{content} is not a valid address: mixed-case checksum mismatch"),
            None,
        ));
    }

    let checksummed = to_checksum_address(content)?;
    if content != checksummed {
        return Some(make_diagnostic(
            candidate,
            DiagnosticSeverity::WARNING,
            codes::NOT_CHECKSUMMED,
            format!("Address is not checksummed, expected {checksummed}"),
            Some(json!({ "checksummed": checksummed })),
        ));
    }

    if let Some(name) = session.resolver.resolve_reverse(&checksummed).await {
        return Some(make_diagnostic(
            candidate,
            DiagnosticSeverity::HINT,
            codes::ENS_AVAILABLE,
            format!("Address has the ENS name '{name}'"),
            Some(json!({ "name": name })),
        ));
    }

    if session.resolver.is_contract(&checksummed).await {
        return Some(make_diagnostic(
            candidate,
            DiagnosticSeverity::HINT,
            codes::CONTRACT_DETECTED,
            format!("Contract deployed at {checksummed}"),
            Some(json!({ "address": checksummed })),
        ));
    }

    None
}

fn make_diagnostic(
    candidate: &StringLocation,
    severity: DiagnosticSeverity,
    code: &str,
    message: String,
    data: Option<serde_json::Value>,
) -> Diagnostic {
    Diagnostic {
        range: candidate.range(),
        severity: Some(severity),
        code: Some(NumberOrString::String(code.to_string())),
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        related_information: None,
        tags: None,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EtherlensConfig;
    use crate::resolve::testing::{address_word, string_word, ScriptedRpc};
    use crate::resolve::{SELECTOR_ADDR, SELECTOR_NAME, SELECTOR_RESOLVER};
    use std::sync::Arc;

    const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
    const SOME_RESOLVER: &str = "0x4976fb03C32e5B8cfe2b6cCB31c09Ba78EBaBa41";
    const ZERO: &str = "0x0000000000000000000000000000000000000000";

    fn test_session() -> Session {
        let mut config = EtherlensConfig::default();
        // unroutable port so an accidental fetch fails instead of hanging
        config.services.token_list_url = "http://127.0.0.1:1/tokens".to_string();
        Session::new(config)
    }

    fn scripted_session(rpc: Arc<ScriptedRpc>) -> Session {
        let mut session = test_session();
        session.resolver.set_rpc(rpc);
        session
    }

    fn code_of(diagnostic: &Diagnostic) -> &str {
        match diagnostic.code.as_ref() {
            Some(NumberOrString::String(code)) => code.as_str(),
            _ => panic!("expected a string code"),
        }
    }

    #[tokio::test]
    async fn test_checksummed_address_gets_ens_hint() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on(SELECTOR_RESOLVER, address_word(SOME_RESOLVER))
                .on(SELECTOR_NAME, string_word("vitalik.eth"))
                .on(SELECTOR_ADDR, address_word(VITALIK)),
        );
        let session = scripted_session(rpc.clone());
        let text = format!("let donation = {VITALIK};\n");

        let diagnostics = document_diagnostics(&session, &text).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), codes::ENS_AVAILABLE);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::HINT));
        assert_eq!(
            diagnostics[0].data.as_ref().unwrap()["name"],
            json!("vitalik.eth")
        );
        assert_eq!(rpc.call_count(), 4);

        // unchanged text and external state: same output, served from cache
        let again = document_diagnostics(&session, &text).await;
        assert_eq!(again, diagnostics);
        assert_eq!(rpc.call_count(), 4);
    }

    #[tokio::test]
    async fn test_lowercase_address_warns_not_checksummed() {
        let session = test_session();
        let text = format!("let a = \"{}\";", VITALIK.to_lowercase());

        let diagnostics = document_diagnostics(&session, &text).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), codes::NOT_CHECKSUMMED);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(
            diagnostics[0].data.as_ref().unwrap()["checksummed"],
            json!(VITALIK)
        );
        assert_eq!(diagnostics[0].range.start.character, 9);
        assert_eq!(diagnostics[0].range.end.character, 51);
        assert_eq!(diagnostics[0].source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    }

    #[tokio::test]
    async fn test_broken_checksum_is_an_error() {
        // first letter case-flipped relative to the canonical form
        let session = test_session();
        let text = "send(0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045)";

        let diagnostics = document_diagnostics(&session, text).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), codes::INVALID_ADDRESS);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostics[0].data, None);
    }

    #[tokio::test]
    async fn test_contract_hint_when_code_is_deployed() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                // no reverse record, but bytecode at the address
                .on(SELECTOR_RESOLVER, address_word(ZERO))
                .on("eth_getCode", json!("0x6001600101")),
        );
        let session = scripted_session(rpc);
        let text = format!("const POOL = {VITALIK};");

        let diagnostics = document_diagnostics(&session, &text).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), codes::CONTRACT_DETECTED);
        assert_eq!(
            diagnostics[0].data.as_ref().unwrap()["address"],
            json!(VITALIK)
        );
    }

    #[tokio::test]
    async fn test_output_capped_by_max_problems() {
        let mut config = EtherlensConfig::default();
        config.diagnostics.max_problems = 3;
        config.services.token_list_url = "http://127.0.0.1:1/tokens".to_string();
        let session = Session::new(config);

        let bad = "0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
        let text = vec![format!("x({bad})"); 5].join("\n");

        let diagnostics = document_diagnostics(&session, &text).await;
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics
            .iter()
            .all(|d| code_of(d) == codes::INVALID_ADDRESS));
    }

    #[tokio::test]
    async fn test_private_key_candidates_emit_nothing() {
        let session = test_session();
        // 64 hex chars that do not decode to a key, and one that does
        let undecodable = "0x".to_string() + &"0".repeat(64);
        let valid = format!("0x{}1", "0".repeat(63));

        for text in [undecodable, valid] {
            let diagnostics = document_diagnostics(&session, &text).await;
            assert!(diagnostics.is_empty());
        }
    }

    #[tokio::test]
    async fn test_ens_candidate_gets_address_hint() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on(SELECTOR_RESOLVER, address_word(SOME_RESOLVER))
                .on(SELECTOR_ADDR, address_word(VITALIK)),
        );
        let session = scripted_session(rpc);
        let text = "const dest = \"vitalik.eth\";";

        let diagnostics = document_diagnostics(&session, text).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(code_of(&diagnostics[0]), codes::ADDRESS_AVAILABLE);
        assert_eq!(
            diagnostics[0].data.as_ref().unwrap()["address"],
            json!(VITALIK)
        );
        // range covers the name, not the quotes
        assert_eq!(diagnostics[0].range.start.character, 14);
        assert_eq!(diagnostics[0].range.end.character, 25);
    }
}
