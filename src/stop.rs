//! Cooperative stop flags.
//!
//! A stop request is a side-channel write keyed by site id: the stopper never
//! blocks on the running loop, and the flag expires after its TTL so a stale
//! request cannot silently block future runs. The orchestrator checks the
//! flag at batch and per-article boundaries.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Clone, Default)]
pub struct StopFlags {
    flags: Arc<DashMap<i64, DateTime<Utc>>>,
}

impl StopFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run for `site_id` stop, with the default 5 minute TTL.
    pub fn request_stop(&self, site_id: i64) {
        self.request_stop_for(site_id, Duration::seconds(DEFAULT_TTL_SECS));
    }

    pub fn request_stop_for(&self, site_id: i64, ttl: Duration) {
        self.flags.insert(site_id, Utc::now() + ttl);
    }

    /// Drop any pending stop request; drivers call this before starting a run.
    pub fn clear(&self, site_id: i64) {
        self.flags.remove(&site_id);
    }

    /// True while an unexpired stop request exists; expired entries are
    /// removed on sight.
    pub fn is_stopped(&self, site_id: i64) -> bool {
        let expiry = self.flags.get(&site_id).map(|entry| *entry);
        match expiry {
            Some(expiry) if expiry > Utc::now() => true,
            Some(_) => {
                self.flags.remove(&site_id);
                false
            }
            None => false,
        }
    }
}
