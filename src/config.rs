//! Configuration management
//!
//! Editors deliver settings in several wrappings: initialization options may
//! carry the configuration directly or under an "etherlens" key, and change
//! notifications often send partial sections. Parsing tries the strict full
//! shapes first and falls back to per-section merging, so a malformed
//! section costs only that section instead of the whole configuration.
//!
//! Credentials are optional throughout; each feature that needs one
//! degrades silently while it is absent.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TOKEN_LIST_URL: &str = "https://tokens.uniswap.org";
const DEFAULT_MAX_PROBLEMS: usize = 100;
const DEFAULT_CACHE_DURATION_MS: u64 = 300_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EtherlensConfig {
    pub diagnostics: DiagnosticsConfig,

    pub cache: CacheConfig,

    pub services: ServicesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagnosticsConfig {
    /// Upper bound on diagnostics published per document.
    pub max_problems: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// How long a cached lookup stays fresh, in milliseconds.
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServicesConfig {
    /// Chain JSON-RPC endpoint. Empty means no provider: contract
    /// detection and name resolution switch off.
    pub rpc_url: String,

    /// Credential for the balance/portfolio service.
    pub portfolio_api_key: String,

    /// Credential for the contract-verification service.
    pub verification_api_key: String,

    /// Token list document to build the top-token table from.
    pub token_list_url: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_problems: DEFAULT_MAX_PROBLEMS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_CACHE_DURATION_MS,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            portfolio_api_key: String::new(),
            verification_api_key: String::new(),
            token_list_url: DEFAULT_TOKEN_LIST_URL.to_string(),
        }
    }
}

impl EtherlensConfig {
    pub fn from_lsp_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if let Ok(config) = serde_json::from_value::<EtherlensConfig>(value.clone()) {
            debug!("deserialized full configuration directly");
            return Ok(config);
        }

        if let Some(scoped) = value.get("etherlens") {
            if let Ok(config) = serde_json::from_value::<EtherlensConfig>(scoped.clone()) {
                debug!("deserialized configuration from 'etherlens' key");
                return Ok(config);
            }
        }

        let mut config = EtherlensConfig::default();
        config.update_from_lsp_value(value)?;
        Ok(config)
    }

    pub fn update_from_lsp_value(
        &mut self,
        value: serde_json::Value,
    ) -> Result<(), serde_json::Error> {
        let scoped = value.get("etherlens").unwrap_or(&value);
        self.merge_sections(scoped);
        Ok(())
    }

    fn merge_sections(&mut self, value: &serde_json::Value) {
        if let Some(section) = value.get("diagnostics") {
            if let Ok(parsed) = serde_json::from_value::<DiagnosticsConfig>(section.clone()) {
                self.diagnostics = parsed;
                debug!("updated diagnostics configuration");
            }
        }

        if let Some(section) = value.get("cache") {
            if let Ok(parsed) = serde_json::from_value::<CacheConfig>(section.clone()) {
                self.cache = parsed;
                debug!("updated cache configuration");
            }
        }

        if let Some(section) = value.get("services") {
            if let Ok(parsed) = serde_json::from_value::<ServicesConfig>(section.clone()) {
                self.services = parsed;
                debug!("updated services configuration");
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.duration_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.diagnostics.max_problems == 0 {
            return Err("maxProblems must be greater than 0".to_string());
        }

        if self.cache.duration_ms == 0 {
            return Err("cache durationMs must be greater than 0".to_string());
        }

        if self.services.token_list_url.is_empty() {
            return Err("tokenListUrl must not be empty".to_string());
        }

        Ok(())
    }
}
