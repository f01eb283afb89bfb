//! Core annotation types
//!
//! Shared vocabulary between the scanner, the resolver, and the annotation
//! producers. Candidate locations carry their own positions so producers
//! never re-scan document text, and token records tolerate missing market
//! fields because upstream sources omit them freely.
//!
//! Diagnostic codes live here so quick fixes and diagnostics agree on the
//! mapping without string literals scattered across modules.

use lsp_types::{Position, Range};
use serde::{Deserialize, Serialize};

/// Source attached to every diagnostic this server publishes.
pub const DIAGNOSTIC_SOURCE: &str = "etherlens";

/// Command the editor invokes to open an explorer link from a code lens.
pub const OPEN_EXPLORER_COMMAND: &str = "etherlens.openExplorer";

/// Diagnostic codes. Each code maps to exactly one corrective edit, so the
/// quick-fix provider dispatches on these.
pub mod codes {
    pub const INVALID_ADDRESS: &str = "ELNS:invalid-address";
    pub const NOT_CHECKSUMMED: &str = "ELNS:not-checksummed";
    pub const ENS_AVAILABLE: &str = "ELNS:ens-available";
    pub const CONTRACT_DETECTED: &str = "ELNS:contract-detected";
    pub const ADDRESS_AVAILABLE: &str = "ELNS:address-available";
}

/// A network a code lens links out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub name: &'static str,
    pub explorer: &'static str,
}

impl Network {
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer, address)
    }
}

/// Networks offered as code lenses, mainnet first. Only the mainnet lens
/// enriches its title with ENS and token lookups when resolved.
pub const NETWORKS: [Network; 5] = [
    Network {
        name: "mainnet",
        explorer: "https://etherscan.io",
    },
    Network {
        name: "sepolia",
        explorer: "https://sepolia.etherscan.io",
    },
    Network {
        name: "holesky",
        explorer: "https://holesky.etherscan.io",
    },
    Network {
        name: "base",
        explorer: "https://basescan.org",
    },
    Network {
        name: "arbitrum",
        explorer: "https://arbiscan.io",
    },
];

pub fn network_by_name(name: &str) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.name == name)
}

/// A candidate substring found by the scanner, positioned in the document.
/// Lines and columns are 0-indexed; columns count UTF-16 code units, the
/// encoding the protocol speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLocation {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub content: String,
}

impl StringLocation {
    pub fn range(&self) -> Range {
        Range {
            start: Position {
                line: self.start_line,
                character: self.start_col,
            },
            end: Position {
                line: self.end_line,
                character: self.end_col,
            },
        }
    }
}

/// What a word under the cursor turned out to be. Classification tries the
/// cheaper shapes first; `Unknown` means no annotation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Address,
    PrivateKey,
    EnsName,
    Unknown,
}

/// Market figures for a token. Every field is independently optional since
/// the upstream source may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circulating_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_volume: Option<f64>,
}

/// A token from the configured token list. The checksummed address is the
/// cache key; `last_updated` records the latest market-data refresh in
/// epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_data: Option<MarketData>,
    pub last_updated: u64,
}

/// Balance and unit price of an account, as reported by the portfolio
/// service. `value` stays a string because the service reports wei amounts
/// beyond f64 precision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// One token position held by an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

impl Holding {
    /// Raw amount scaled by the token's decimals, for ranking and display.
    pub fn scaled_amount(&self) -> f64 {
        let raw: f64 = self
            .amount
            .as_deref()
            .and_then(|a| a.parse().ok())
            .unwrap_or(0.0);
        raw / 10f64.powi(self.decimals.unwrap_or(0) as i32)
    }
}
