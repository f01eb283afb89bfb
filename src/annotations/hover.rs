//! Hover markdown
//!
//! Boundary-scans the word under the cursor (alphanumerics plus dots),
//! classifies it, and renders a markdown card. Address cards are the
//! expensive ones (market figures or balance, name, holdings), so the
//! finished markdown is cached per address alongside the raw lookups.

use crate::classify::{classify_word, to_checksum_address, to_public_address};
use crate::proto::{Token, WordKind};
use crate::session::Session;
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};
use tracing::warn;

pub async fn hover_for_position(
    session: &Session,
    text: &str,
    position: Position,
) -> Option<Hover> {
    let word = word_at_position(text, position)?;
    let markdown = match classify_word(&word) {
        WordKind::Address => address_markdown(session, &word).await,
        WordKind::PrivateKey => private_key_markdown(session, &word).await,
        WordKind::EnsName => name_markdown(session, &word).await,
        WordKind::Unknown => None,
    }?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: markdown,
        }),
        range: None,
    })
}

/// The run of word characters under the cursor, trimmed of surrounding dots.
/// Columns are interpreted as UTF-16 units, as the editor reports them.
pub(crate) fn word_at_position(text: &str, position: Position) -> Option<String> {
    let line = text.lines().nth(position.line as usize)?;
    let col = byte_column(line, position.character as usize);

    let bytes = line.as_bytes();
    if col >= bytes.len() || !is_word_byte(bytes[col]) {
        return None;
    }

    let mut start = col;
    while start > 0 && is_word_byte(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = col;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }

    let word = line[start..end].trim_matches('.');
    (!word.is_empty()).then(|| word.to_string())
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'.'
}

// Word bytes are all ASCII, so byte-indexed boundary scanning stays on char
// boundaries; multi-byte characters simply terminate the word.
fn byte_column(line: &str, utf16_col: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in line.char_indices() {
        if units >= utf16_col {
            return idx;
        }
        units += ch.len_utf16();
    }
    line.len()
}

async fn address_markdown(session: &Session, word: &str) -> Option<String> {
    let address = to_checksum_address(word)?;
    let ttl = session.settings.cache_ttl();
    if let Some(markdown) = session.caches.hover_markdown.get_fresh(&address, ttl) {
        return Some(markdown);
    }

    let markdown = match session.resolver.token_with_market_data(&address).await {
        Some(token) => token_markdown(&token),
        None => account_markdown(session, &address).await,
    };
    session
        .caches
        .hover_markdown
        .put(address, markdown.clone());
    Some(markdown)
}

async fn private_key_markdown(session: &Session, word: &str) -> Option<String> {
    let address = to_public_address(word)?;
    let mut markdown = format!(
        "### Private key\n\n**Never commit a private key to source control.**\n\nControls account `{address}`"
    );
    if let Some(card) = address_markdown(session, &address).await {
        markdown.push_str("\n\n---\n\n");
        markdown.push_str(&card);
    }
    Some(markdown)
}

async fn name_markdown(session: &Session, word: &str) -> Option<String> {
    let address = session.resolver.resolve_name(word).await?;
    Some(format!("### {word}\n\nResolves to `{address}`"))
}

fn token_markdown(token: &Token) -> String {
    let mut figures = Vec::new();
    if let Some(market) = token.market_data.as_ref() {
        push_figure(&mut figures, "Price", market.price, "$");
        push_figure(&mut figures, "Market cap", market.market_cap, "$");
        push_figure(&mut figures, "Volume (24h)", market.trade_volume, "$");
        push_figure(&mut figures, "Circulating supply", market.circulating_supply, "");
        push_figure(&mut figures, "Total supply", market.total_supply, "");
    }

    let mut lines = vec![
        format!("### {} ({})", token.name, token.symbol),
        String::new(),
        format!("`{}`", token.address),
    ];
    if !figures.is_empty() {
        lines.push(String::new());
        lines.extend(figures);
    }
    lines.join("\n")
}

async fn account_markdown(session: &Session, address: &str) -> String {
    if !session.resolver.has_portfolio_key() {
        warn!("no portfolio credential configured, balance display is off for this pass");
    }

    let mut details = Vec::new();

    if let Some(name) = session.resolver.resolve_reverse(address).await {
        details.push(format!("- ENS: {name}"));
    }
    if let Some(balance) = session.resolver.balance_and_price(address).await {
        if let Some(value) = balance.value {
            details.push(format!("- Balance: {value} ETH"));
        }
        if let Some(price) = balance.price {
            details.push(format!("- Ether price: ${price}"));
        }
    }
    if let Some(holdings) = session.resolver.token_holdings(address).await {
        if !holdings.is_empty() {
            details.push("- Top holdings:".to_string());
            for holding in &holdings {
                let label = holding
                    .symbol
                    .as_deref()
                    .or(holding.name.as_deref())
                    .unwrap_or("unknown");
                details.push(format!("  - {}: {}", label, holding.scaled_amount()));
            }
        }
    }

    let mut lines = vec![
        "### Account".to_string(),
        String::new(),
        format!("`{address}`"),
    ];
    if !details.is_empty() {
        lines.push(String::new());
        lines.extend(details);
    }
    lines.join("\n")
}

fn push_figure(figures: &mut Vec<String>, label: &str, value: Option<f64>, unit: &str) {
    if let Some(value) = value {
        figures.push(format!("- {label}: {unit}{value}"));
    }
}
