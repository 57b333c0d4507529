use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as GovRateLimiter};

type PeerKey = String;

/// Per-peer quota on outbound image fetches.
pub struct RateLimiter {
    fetch_limiter: DefaultKeyedRateLimiter<PeerKey>,
}

impl RateLimiter {
    pub fn new(fetches_per_minute: NonZeroU32) -> Self {
        Self::with_quota(Quota::per_minute(fetches_per_minute))
    }

    fn with_quota(fetch_quota: Quota) -> Self {
        Self {
            fetch_limiter: GovRateLimiter::keyed(fetch_quota),
        }
    }

    pub fn check_fetch_limit(&self, peer: &PeerKey) -> bool {
        self.fetch_limiter.check_key(peer).is_ok()
    }

    /// Drops peers whose quota has fully refilled.
    pub fn forget_idle(&self) {
        self.fetch_limiter.retain_recent();
        self.fetch_limiter.shrink_to_fit();
    }

    pub fn tracked_peers(&self) -> usize {
        self.fetch_limiter.len()
    }
}
