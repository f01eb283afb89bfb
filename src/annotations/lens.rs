//! Code lenses
//!
//! Emission is pure text work: every valid address, and every address derived
//! from a decodable private key, gets one unresolved lens per supported
//! network. Labels and commands are filled in lazily when the editor resolves
//! a visible lens, which is when the mainnet lens pays for its reverse-name
//! and token lookups. Other networks link straight through.

use crate::classify::{is_valid_address, to_checksum_address, to_public_address};
use crate::proto::{network_by_name, StringLocation, NETWORKS, OPEN_EXPLORER_COMMAND};
use crate::scanner;
use crate::session::Session;
use lsp_types::{CodeLens, Command};
use serde_json::json;
use tracing::debug;

/// One unresolved lens per supported network per entity. The explorer target
/// rides in the lens data until resolution.
pub fn code_lenses(text: &str) -> Vec<CodeLens> {
    let mut lenses = Vec::new();

    for candidate in scanner::find_address_candidates(text) {
        if !is_valid_address(&candidate.content) {
            continue;
        }
        if let Some(address) = to_checksum_address(&candidate.content) {
            push_lenses(&mut lenses, &candidate, &address);
        }
    }

    for candidate in scanner::find_private_key_candidates(text) {
        if let Some(address) = to_public_address(&candidate.content) {
            push_lenses(&mut lenses, &candidate, &address);
        }
    }

    lenses
}

/// Attaches the explorer command to a lens handed back by the editor. A lens
/// whose data does not name a known network is returned untouched.
pub async fn resolve_lens(session: &Session, lens: CodeLens) -> CodeLens {
    let target = lens.data.as_ref().and_then(|data| {
        let address = data.get("address")?.as_str()?.to_string();
        let network = network_by_name(data.get("network")?.as_str()?)?;
        Some((address, network))
    });

    let (address, network) = match target {
        Some(target) => target,
        None => {
            debug!("code lens carries no resolvable target");
            return lens;
        }
    };

    let title = if network.name == "mainnet" {
        mainnet_title(session, &address).await
    } else {
        format!("View on {}", network.name)
    };

    CodeLens {
        range: lens.range,
        command: Some(Command {
            title,
            command: OPEN_EXPLORER_COMMAND.to_string(),
            arguments: Some(vec![json!(network.address_url(&address))]),
        }),
        data: None,
    }
}

fn push_lenses(lenses: &mut Vec<CodeLens>, candidate: &StringLocation, address: &str) {
    for network in &NETWORKS {
        lenses.push(CodeLens {
            range: candidate.range(),
            command: None,
            data: Some(json!({ "address": address, "network": network.name })),
        });
    }
}

async fn mainnet_title(session: &Session, address: &str) -> String {
    let mut parts = Vec::new();
    if let Some(name) = session.resolver.resolve_reverse(address).await {
        parts.push(name);
    }
    if let Some(token) = session.resolver.token_for(address).await {
        parts.push(format!("{} ({})", token.name, token.symbol));
    }
    parts.push("View on mainnet".to_string());
    parts.join(" | ")
}
