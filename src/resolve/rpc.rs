//! Chain JSON-RPC transport
//!
//! Thin POST wrapper over a JSON-RPC endpoint, behind a trait so tests can
//! script chain responses without a network.

use crate::resolve::errors::{ResolveError, ResolveResult};
use async_trait::async_trait;
use serde_json::{json, Value};

#[async_trait]
pub trait JsonRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> ResolveResult<Value>;
}

pub struct HttpRpc {
    client: reqwest::Client,
    url: String,
}

impl HttpRpc {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl JsonRpc for HttpRpc {
    async fn call(&self, method: &str, params: Value) -> ResolveResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResolveError::Http {
                service: "rpc",
                source: e,
            })?
            .json()
            .await
            .map_err(|e| ResolveError::Http {
                service: "rpc",
                source: e,
            })?;

        if let Some(err) = response.get("error") {
            return Err(ResolveError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| ResolveError::Malformed {
                service: "rpc",
                reason: "response carries neither result nor error".to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Chain stub keyed by method, or by calldata selector for eth_call.
    pub(crate) struct ScriptedRpc {
        responses: HashMap<String, Value>,
        calls: AtomicUsize,
    }

    impl ScriptedRpc {
        pub(crate) fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn on(mut self, key: &str, result: Value) -> Self {
            self.responses.insert(key.to_string(), result);
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JsonRpc for ScriptedRpc {
        async fn call(&self, method: &str, params: Value) -> ResolveResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = if method == "eth_call" {
                let data = params
                    .pointer("/0/data")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                data[..data.len().min(10)].to_string()
            } else {
                method.to_string()
            };

            self.responses
                .get(&key)
                .cloned()
                .ok_or_else(|| ResolveError::Rpc {
                    code: -32000,
                    message: format!("unscripted call: {key}"),
                })
        }
    }

    /// Single 32-byte return word holding an address.
    pub(crate) fn address_word(address: &str) -> Value {
        Value::String(format!("0x{}{}", "0".repeat(24), address[2..].to_lowercase()))
    }

    /// Dynamic string return value: offset word, length word, padded bytes.
    pub(crate) fn string_word(s: &str) -> Value {
        let mut data = hex::encode(s.as_bytes());
        while data.len() % 64 != 0 {
            data.push('0');
        }
        Value::String(format!("0x{:064x}{:064x}{}", 32, s.len(), data))
    }
}
