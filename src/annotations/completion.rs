//! Completions
//!
//! Two item families: one entry per known top token, inserting its
//! checksummed address, and a fixed set of read-only boilerplate snippets.
//! Sort keys rank token items ahead of snippets and keep the snippet order
//! stable regardless of how the editor filters labels.

use crate::session::Session;
use lsp_types::{CompletionItem, CompletionItemKind, Position, Range, TextEdit};

const IMPORT_LINE: &str = "const { ethers } = require(\"ethers\");";

struct Snippet {
    label: &'static str,
    detail: &'static str,
    body: &'static str,
    sort_key: &'static str,
    needs_import: bool,
}

const SNIPPETS: [Snippet; 4] = [
    Snippet {
        label: "provider",
        detail: "Connect a JSON-RPC provider",
        body: "const provider = new ethers.JsonRpcProvider(process.env.RPC_URL);",
        sort_key: "90-1",
        needs_import: true,
    },
    Snippet {
        label: "contract",
        detail: "Instantiate a contract",
        body: "const contract = new ethers.Contract(address, abi, provider);",
        sort_key: "90-2",
        needs_import: true,
    },
    Snippet {
        label: "balance",
        detail: "Query an account balance",
        body: "const balance = await provider.getBalance(address);",
        sort_key: "90-3",
        needs_import: false,
    },
    Snippet {
        label: "ensName",
        detail: "Resolve an ENS name",
        body: "const address = await provider.resolveName(\"vitalik.eth\");",
        sort_key: "90-4",
        needs_import: false,
    },
];

pub async fn completion_items(session: &Session, text: &str) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    for token in session.resolver.top_tokens().await {
        items.push(CompletionItem {
            label: token.symbol.clone(),
            kind: Some(CompletionItemKind::CONSTANT),
            detail: Some(token.name.clone()),
            insert_text: Some(token.address.clone()),
            sort_text: Some(format!("50-{}", token.symbol)),
            ..Default::default()
        });
    }

    let has_import = text.contains(IMPORT_LINE);
    for snippet in &SNIPPETS {
        let mut item = CompletionItem {
            label: snippet.label.to_string(),
            kind: Some(CompletionItemKind::SNIPPET),
            detail: Some(snippet.detail.to_string()),
            insert_text: Some(snippet.body.to_string()),
            sort_text: Some(snippet.sort_key.to_string()),
            ..Default::default()
        };
        if snippet.needs_import && !has_import {
            let top = Position {
                line: 0,
                character: 0,
            };
            item.additional_text_edits = Some(vec![TextEdit {
                range: Range { start: top, end: top },
                new_text: format!("{IMPORT_LINE}\n"),
            }]);
        }
        items.push(item);
    }

    items
}
