//! Calendar-bucket admission counters shared across every session in the
//! process.
//!
//! Each tenant accrues at most one increment per admitted request into the
//! counter for the current calendar bucket (hour or day). The counter is
//! read and incremented under a single `DashMap` entry guard, so two
//! concurrent checks at `count == limit - 1` can never both be admitted.
//! Denied checks never mutate the counter.
//!
//! Counters reset implicitly when the wall clock crosses a bucket boundary
//! (a new bucket key is simply a fresh entry); stale buckets are reclaimed
//! by [`QuotaTracker::evict_expired`], which the service drives from a
//! periodic background task.

use chrono::{DateTime, Timelike, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;

/// Clock seam so bucket rollover is testable without waiting for the
/// wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Calendar-aligned counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
}

impl Period {
    /// Truncate a timestamp to this period's bucket key. The key changes
    /// exactly at the calendar boundary, which is what resets the count.
    pub fn bucket_key(&self, now: DateTime<Utc>) -> String {
        match self {
            Period::Hour => now.format("%Y-%m-%d_%H").to_string(),
            Period::Day => now.format("%Y-%m-%d").to_string(),
        }
    }

    /// Seconds until the current bucket rolls over, used as a Retry-After
    /// hint on denials.
    pub fn seconds_until_rollover(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = match self {
            Period::Hour => u64::from(now.minute()) * 60 + u64::from(now.second()),
            Period::Day => {
                u64::from(now.hour()) * 3600
                    + u64::from(now.minute()) * 60
                    + u64::from(now.second())
            }
        };
        let span = match self {
            Period::Hour => 3600,
            Period::Day => 86_400,
        };
        span - elapsed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour => "hour",
            Period::Day => "day",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tenant admission policy: `limit` requests per calendar `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub limit: u32,
    pub period: Period,
}

/// Outcome of one admission check. `count` is the counter value after the
/// check: unchanged on denial, incremented on admission.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaDecision {
    pub admitted: bool,
    pub count: u32,
    pub limit: u32,
    pub period: Period,
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    tenant: String,
    period: Period,
    bucket: String,
}

/// Process-wide admission counters. Construct once at startup and share
/// behind an `Arc`; there is no cross-process coordination, so a restart
/// resets all counters.
pub struct QuotaTracker {
    counters: DashMap<BucketKey, u32>,
    clock: Box<dyn Clock>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Atomically check the tenant's counter for the current bucket and
    /// increment it if the policy still has room.
    pub fn check_and_admit(&self, tenant_id: &str, policy: QuotaPolicy) -> QuotaDecision {
        let now = self.clock.now();
        let key = BucketKey {
            tenant: tenant_id.to_string(),
            period: policy.period,
            bucket: policy.period.bucket_key(now),
        };
        let retry_after_secs = policy.period.seconds_until_rollover(now);

        // The entry guard holds the shard lock across the read-modify-write.
        let mut count = self.counters.entry(key).or_insert(0);
        if *count >= policy.limit {
            return QuotaDecision {
                admitted: false,
                count: *count,
                limit: policy.limit,
                period: policy.period,
                retry_after_secs,
            };
        }
        *count += 1;
        QuotaDecision {
            admitted: true,
            count: *count,
            limit: policy.limit,
            period: policy.period,
            retry_after_secs,
        }
    }

    /// Drop counters for buckets other than the current one. Returns the
    /// number of entries removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters
            .retain(|key, _| key.bucket == key.period.bucket_key(now));
        before - self.counters.len()
    }

    /// Number of live counter entries (one per tenant per active bucket).
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}
