//! Etherlens LSP Server
//!
//! Annotates Ethereum artifacts in source text through LSP. Addresses, ENS
//! names, and private keys get diagnostics, quick fixes, code lenses, hovers,
//! and completions as the developer types, backed by chain and web lookups
//! that are cached per session.
//!
//! Detection is pure text scanning and runs offline; everything network-bound
//! sits behind [`resolve::Resolver`] and degrades to plainer annotations when
//! an endpoint or credential is missing. The server never signs or sends
//! anything to the chain, it only reads.

pub mod annotations;
pub mod cache;
pub mod classify;
pub mod config;
pub mod documents;
pub mod proto;
pub mod resolve;
pub mod scanner;
pub mod server;
pub mod session;

pub use config::EtherlensConfig;
pub use documents::DocumentStore;
pub use resolve::Resolver;
pub use server::EtherlensServer;
pub use session::Session;
