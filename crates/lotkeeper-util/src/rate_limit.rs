//! Per-client request rate limiting

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Token-bucket rate limiter keyed by IPC client.
///
/// Each client starts with a full bucket of `burst` tokens; tokens trickle
/// back continuously so that `burst` requests are restored every `per`.
#[derive(Debug)]
pub struct RateLimiter {
    burst: f64,
    refill_per_sec: f64,
    buckets: HashMap<ClientId, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    updated: Instant,
}

impl RateLimiter {
    pub fn new(burst: u32, per: Duration) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            burst,
            refill_per_sec: burst / per.as_secs_f64().max(f64::EPSILON),
            buckets: HashMap::new(),
        }
    }

    /// Consume one token for `client_id`. Returns `false` if the client is over its limit.
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        self.check_at(client_id, Instant::now())
    }

    fn check_at(&mut self, client_id: &ClientId, now: Instant) -> bool {
        let burst = self.burst;
        let bucket = self.buckets.entry(client_id.clone()).or_insert(Bucket {
            tokens: burst,
            updated: now,
        });

        let elapsed = now.saturating_duration_since(bucket.updated).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(burst);
        bucket.updated = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Forget a disconnected client
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.buckets.remove(client_id);
    }
}
