//! External resolution
//!
//! Name resolution, token metadata, balances, and contract verification,
//! written through the shared caches. Every operation is best-effort: a
//! network or parse failure is logged and surfaces as "no data", so the
//! producers degrade one annotation instead of failing a request.
//!
//! Name lookups speak the registry contract directly over raw `eth_call`
//! with hand-encoded selectors; the three calls involved are narrow enough
//! that a full contract-binding layer would outweigh them.

mod errors;
mod rpc;

pub use errors::{ok_or_absent, ResolveError, ResolveResult};
pub use rpc::{HttpRpc, JsonRpc};

#[cfg(test)]
pub(crate) use rpc::testing;

use crate::cache::{now_ms, ResolutionCaches};
use crate::classify::{keccak256, to_checksum_address};
use crate::config::EtherlensConfig;
use crate::proto::{AccountBalance, Holding, MarketData, Token};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{cmp::Ordering, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Name registry, deployed at the same address on mainnet and the public
/// testnets.
const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

// 4-byte selectors for resolver(bytes32), addr(bytes32), name(bytes32)
pub(crate) const SELECTOR_RESOLVER: &str = "0x0178b8bf";
pub(crate) const SELECTOR_ADDR: &str = "0x3b3b57de";
pub(crate) const SELECTOR_NAME: &str = "0x691f3431";

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const MAINNET_CHAIN_ID: u64 = 1;

const MARKET_DATA_ENDPOINT: &str = "https://api.coingecko.com/api/v3/coins/ethereum/contract";
const PORTFOLIO_ENDPOINT: &str = "https://svc.blockdaemon.com/universal/v1/ethereum/mainnet/account";
const VERIFICATION_ENDPOINT: &str = "https://api.etherscan.io/v2/api";

/// Holdings shown per account; the portfolio service can return hundreds.
const TOP_HOLDINGS: usize = 10;

#[derive(Debug, Deserialize)]
struct TokenListResponse {
    tokens: Vec<TokenListEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenListEntry {
    name: String,
    symbol: String,
    address: String,
    #[serde(rename = "chainId")]
    chain_id: u64,
}

/// All network access lives behind this type. One instance per session,
/// bound to that session's caches and credentials.
pub struct Resolver {
    http: reqwest::Client,
    rpc: Option<Arc<dyn JsonRpc>>,
    caches: ResolutionCaches,
    ttl: Duration,
    token_list_url: String,
    portfolio_api_key: String,
    verification_api_key: String,
}

impl Resolver {
    pub fn new(config: &EtherlensConfig, caches: ResolutionCaches) -> Self {
        let http = reqwest::Client::new();
        let rpc: Option<Arc<dyn JsonRpc>> = if config.services.rpc_url.is_empty() {
            None
        } else {
            Some(Arc::new(HttpRpc::new(
                http.clone(),
                config.services.rpc_url.clone(),
            )))
        };

        Self {
            http,
            rpc,
            caches,
            ttl: config.cache_ttl(),
            token_list_url: config.services.token_list_url.clone(),
            portfolio_api_key: config.services.portfolio_api_key.clone(),
            verification_api_key: config.services.verification_api_key.clone(),
        }
    }

    /// Swaps the chain transport; tests script responses through this.
    pub fn set_rpc(&mut self, rpc: Arc<dyn JsonRpc>) {
        self.rpc = Some(rpc);
    }

    pub fn has_provider(&self) -> bool {
        self.rpc.is_some()
    }

    pub fn has_portfolio_key(&self) -> bool {
        !self.portfolio_api_key.is_empty()
    }

    pub fn has_verification_key(&self) -> bool {
        !self.verification_api_key.is_empty()
    }

    /// Forward name lookup. Only positive, non-zero results are cached;
    /// "not found" is retried on the next request.
    pub async fn resolve_name(&self, name: &str) -> Option<String> {
        if let Some(address) = self.caches.ens_forward.get_fresh(name, self.ttl) {
            return Some(address);
        }

        let address = ok_or_absent("forward resolution", self.lookup_name(name).await)??;
        self.caches.ens_forward.put(name, address.clone());
        Some(address)
    }

    /// Reverse lookup with round-trip confirmation: the reported name must
    /// forward-resolve back to the same address before it is trusted or
    /// cached. Guards against spoofed or stale reverse records.
    pub async fn resolve_reverse(&self, address: &str) -> Option<String> {
        let key = to_checksum_address(address)?;
        if let Some(name) = self.caches.ens_reverse.get_fresh(&key, self.ttl) {
            return Some(name);
        }

        let name = ok_or_absent("reverse resolution", self.lookup_reverse(&key).await)??;
        let confirmed = self.resolve_name(&name).await?;
        if !confirmed.eq_ignore_ascii_case(&key) {
            debug!("discarding reverse record {name}: forward-resolves elsewhere");
            return None;
        }

        self.caches.ens_reverse.put(key, name.clone());
        Some(name)
    }

    /// The current top-token table, refreshed as a whole when empty or when
    /// the oldest entry has outlived the TTL.
    pub async fn top_tokens(&self) -> Vec<Token> {
        self.refresh_tokens_if_stale().await;
        self.caches.tokens.values()
    }

    /// The known token at `address`, if the top-token table lists it.
    pub async fn token_for(&self, address: &str) -> Option<Token> {
        let key = to_checksum_address(address)?;
        self.refresh_tokens_if_stale().await;
        self.caches.tokens.get(&key).map(|entry| entry.value)
    }

    /// Token with market figures attached, refreshing figures older than
    /// the TTL. Fields the market service omits stay absent.
    pub async fn token_with_market_data(&self, address: &str) -> Option<Token> {
        let mut token = self.token_for(address).await?;

        let fresh = token.market_data.is_some()
            && now_ms().saturating_sub(token.last_updated) < self.ttl.as_millis() as u64;
        if !fresh {
            match self.fetch_market_data(&token.address).await {
                Ok(data) => {
                    token.market_data = Some(data);
                    token.last_updated = now_ms();
                    self.caches.tokens.put(token.address.clone(), token.clone());
                }
                Err(e) => debug!("market data unavailable for {}: {e}", token.address),
            }
        }

        Some(token)
    }

    /// Ether balance and unit price, from the portfolio service.
    pub async fn balance_and_price(&self, address: &str) -> Option<AccountBalance> {
        if self.portfolio_api_key.is_empty() {
            debug!("no portfolio credential, skipping balance lookup");
            return None;
        }
        let key = to_checksum_address(address)?;
        ok_or_absent("balance lookup", self.fetch_balance(&key).await)
    }

    /// Largest token positions of an account, ranked by scaled amount.
    pub async fn token_holdings(&self, address: &str) -> Option<Vec<Holding>> {
        if self.portfolio_api_key.is_empty() {
            debug!("no portfolio credential, skipping holdings lookup");
            return None;
        }
        let key = to_checksum_address(address)?;
        let records = ok_or_absent("holdings lookup", self.fetch_holdings(&key).await)?;
        Some(rank_holdings(records))
    }

    /// Verified ABI for a contract. Cached only when the verification
    /// service reports success; unverified and error outcomes are retried
    /// on the next request.
    pub async fn contract_abi(&self, address: &str) -> Option<String> {
        if self.verification_api_key.is_empty() {
            debug!("no verification credential, skipping ABI lookup");
            return None;
        }
        let key = to_checksum_address(address)?;
        if let Some(abi) = self.caches.contract_abi.get_fresh(&key, self.ttl) {
            return Some(abi);
        }

        let abi = ok_or_absent("ABI lookup", self.fetch_abi(&key).await)??;
        self.caches.contract_abi.put(key, abi.clone());
        Some(abi)
    }

    /// True only when deployed bytecode exists at the address. Deliberately
    /// false, not "unknown", without a configured provider.
    pub async fn is_contract(&self, address: &str) -> bool {
        let Some(rpc) = self.rpc.as_ref() else {
            return false;
        };

        match rpc.call("eth_getCode", json!([address, "latest"])).await {
            Ok(code) => code.as_str().is_some_and(|c| c.len() > 2),
            Err(e) => {
                debug!("eth_getCode failed for {address}: {e}");
                false
            }
        }
    }

    async fn refresh_tokens_if_stale(&self) {
        let stale = match self.caches.tokens.oldest_timestamp_ms() {
            Some(oldest) => now_ms().saturating_sub(oldest) >= self.ttl.as_millis() as u64,
            None => true,
        };
        if !stale {
            return;
        }

        match self.fetch_token_list().await {
            Ok(tokens) => {
                // the fetched list replaces the snapshot, delisted entries
                // must not linger and pin the staleness check
                self.caches.tokens.clear();
                for token in tokens {
                    self.caches.tokens.put(token.address.clone(), token);
                }
            }
            Err(e) => warn!("token list refresh failed, keeping previous snapshot: {e}"),
        }
    }

    async fn lookup_name(&self, name: &str) -> ResolveResult<Option<String>> {
        let node = namehash(name);
        let Some(resolver) = self.resolver_address(&node).await? else {
            return Ok(None);
        };

        let result = self
            .eth_call(&resolver, encode_call(SELECTOR_ADDR, &node))
            .await?;
        Ok(decode_address_word(&result).filter(|a| a != ZERO_ADDRESS))
    }

    async fn lookup_reverse(&self, address: &str) -> ResolveResult<Option<String>> {
        let node = namehash(&format!("{}.addr.reverse", address[2..].to_lowercase()));
        let Some(resolver) = self.resolver_address(&node).await? else {
            return Ok(None);
        };

        let result = self
            .eth_call(&resolver, encode_call(SELECTOR_NAME, &node))
            .await?;
        Ok(decode_string_word(&result).filter(|n| !n.is_empty()))
    }

    async fn resolver_address(&self, node: &[u8; 32]) -> ResolveResult<Option<String>> {
        let result = self
            .eth_call(ENS_REGISTRY, encode_call(SELECTOR_RESOLVER, node))
            .await?;
        Ok(decode_address_word(&result).filter(|a| a != ZERO_ADDRESS))
    }

    async fn eth_call(&self, to: &str, data: String) -> ResolveResult<String> {
        let rpc = self.rpc.as_ref().ok_or(ResolveError::NoProvider)?;
        let result = rpc
            .call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ResolveError::Malformed {
                service: "rpc",
                reason: "eth_call result is not a string".to_string(),
            })
    }

    async fn fetch_token_list(&self) -> ResolveResult<Vec<Token>> {
        let list: TokenListResponse = self
            .http
            .get(&self.token_list_url)
            .send()
            .await
            .map_err(|e| ResolveError::Http {
                service: "token list",
                source: e,
            })?
            .json()
            .await
            .map_err(|e| ResolveError::Http {
                service: "token list",
                source: e,
            })?;

        let now = now_ms();
        Ok(list
            .tokens
            .into_iter()
            .filter(|entry| entry.chain_id == MAINNET_CHAIN_ID)
            .filter_map(|entry| {
                Some(Token {
                    address: to_checksum_address(&entry.address)?,
                    name: entry.name,
                    symbol: entry.symbol,
                    market_data: None,
                    last_updated: now,
                })
            })
            .collect())
    }

    async fn fetch_market_data(&self, address: &str) -> ResolveResult<MarketData> {
        let url = format!("{}/{}", MARKET_DATA_ENDPOINT, address);
        let body: Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Http {
                service: "market data",
                source: e,
            })?
            .json()
            .await
            .map_err(|e| ResolveError::Http {
                service: "market data",
                source: e,
            })?;

        parse_market_data(&body)
    }

    async fn fetch_balance(&self, address: &str) -> ResolveResult<AccountBalance> {
        let url = format!("{}/{}", PORTFOLIO_ENDPOINT, address);
        let body: Value = self
            .http
            .get(&url)
            .header("x-api-key", &self.portfolio_api_key)
            .send()
            .await
            .map_err(|e| ResolveError::Http {
                service: "portfolio",
                source: e,
            })?
            .json()
            .await
            .map_err(|e| ResolveError::Http {
                service: "portfolio",
                source: e,
            })?;

        let payload = body.get("payload").ok_or_else(|| ResolveError::Malformed {
            service: "portfolio",
            reason: "missing payload".to_string(),
        })?;

        Ok(AccountBalance {
            value: payload.get("value").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            price: payload.get("price").and_then(Value::as_f64),
        })
    }

    async fn fetch_holdings(&self, address: &str) -> ResolveResult<Vec<Holding>> {
        let url = format!("{}/{}/tokens", PORTFOLIO_ENDPOINT, address);
        let body: Value = self
            .http
            .get(&url)
            .header("x-api-key", &self.portfolio_api_key)
            .send()
            .await
            .map_err(|e| ResolveError::Http {
                service: "portfolio",
                source: e,
            })?
            .json()
            .await
            .map_err(|e| ResolveError::Http {
                service: "portfolio",
                source: e,
            })?;

        let records = body
            .pointer("/payload/records")
            .and_then(Value::as_array)
            .ok_or_else(|| ResolveError::Malformed {
                service: "portfolio",
                reason: "missing payload.records".to_string(),
            })?;

        Ok(records
            .iter()
            .filter_map(|record| serde_json::from_value(record.clone()).ok())
            .collect())
    }

    async fn fetch_abi(&self, address: &str) -> ResolveResult<Option<String>> {
        let url = format!(
            "{}?chainid=1&module=contract&action=getabi&address={}&apikey={}",
            VERIFICATION_ENDPOINT, address, self.verification_api_key
        );
        let body: Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Http {
                service: "verification",
                source: e,
            })?
            .json()
            .await
            .map_err(|e| ResolveError::Http {
                service: "verification",
                source: e,
            })?;

        let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
        if status != "1" {
            debug!("verification service status {status:?} for {address}");
            return Ok(None);
        }

        body.get("result")
            .and_then(Value::as_str)
            .map(|abi| Some(abi.to_string()))
            .ok_or_else(|| ResolveError::Malformed {
                service: "verification",
                reason: "success status without result".to_string(),
            })
    }
}

/// Recursive label hash of a dotted name, folded right to left; the empty
/// name hashes to all zeroes.
pub(crate) fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return node;
    }

    for label in name.to_lowercase().rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&label_hash);
        node = keccak256(&buf);
    }
    node
}

fn encode_call(selector: &str, word: &[u8; 32]) -> String {
    format!("{}{}", selector, hex::encode(word))
}

/// Last 20 bytes of the leading 32-byte word, checksummed.
fn decode_address_word(result: &str) -> Option<String> {
    let hex_part = result.strip_prefix("0x").unwrap_or(result);
    if hex_part.len() < 64 {
        return None;
    }
    to_checksum_address(&format!("0x{}", &hex_part[24..64]))
}

/// Dynamic string return: offset word, length word, padded UTF-8 data.
fn decode_string_word(result: &str) -> Option<String> {
    let bytes = hex::decode(result.strip_prefix("0x").unwrap_or(result)).ok()?;
    if bytes.len() < 32 {
        return None;
    }

    let offset = usize_from_word(&bytes[..32])?;
    if bytes.len() < offset + 32 {
        return None;
    }
    let len = usize_from_word(&bytes[offset..offset + 32])?;

    let data_start = offset + 32;
    if bytes.len() < data_start + len {
        return None;
    }
    String::from_utf8(bytes[data_start..data_start + len].to_vec()).ok()
}

fn usize_from_word(word: &[u8]) -> Option<usize> {
    if word.len() != 32 || word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut n: usize = 0;
    for b in &word[24..] {
        n = (n << 8) | *b as usize;
    }
    Some(n)
}

fn parse_market_data(body: &Value) -> ResolveResult<MarketData> {
    let market = body
        .get("market_data")
        .ok_or_else(|| ResolveError::Malformed {
            service: "market data",
            reason: "missing market_data".to_string(),
        })?;

    Ok(MarketData {
        price: usd_or_number(market, "current_price"),
        market_cap: usd_or_number(market, "market_cap"),
        circulating_supply: usd_or_number(market, "circulating_supply"),
        total_supply: usd_or_number(market, "total_supply"),
        trade_volume: usd_or_number(market, "total_volume"),
    })
}

// Quoted figures arrive as {"usd": n} maps, supplies as bare numbers.
fn usd_or_number(market: &Value, field: &str) -> Option<f64> {
    let value = market.get(field)?;
    match value {
        Value::Object(_) => value.get("usd").and_then(Value::as_f64),
        _ => value.as_f64(),
    }
}

fn rank_holdings(mut records: Vec<Holding>) -> Vec<Holding> {
    records.sort_by(|a, b| {
        b.scaled_amount()
            .partial_cmp(&a.scaled_amount())
            .unwrap_or(Ordering::Equal)
    });
    records.truncate(TOP_HOLDINGS);
    records
}
