//! Session state
//!
//! One session per configuration: the settings snapshot, the five caches,
//! and the resolver bound to both. A configuration change builds a fresh
//! session rather than mutating the current one, so a lookup still running
//! under old settings writes into the superseded caches and its results
//! are discarded together with them.

use crate::cache::ResolutionCaches;
use crate::config::EtherlensConfig;
use crate::resolve::Resolver;

pub struct Session {
    pub settings: EtherlensConfig,
    pub caches: ResolutionCaches,
    pub resolver: Resolver,
}

impl Session {
    pub fn new(settings: EtherlensConfig) -> Self {
        let caches = ResolutionCaches::new();
        let resolver = Resolver::new(&settings, caches.clone());
        Self {
            settings,
            caches,
            resolver,
        }
    }
}
