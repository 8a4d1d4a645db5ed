//! Free-tier usage counter.
//!
//! Counts grade checks per client and decides whether another free check is
//! allowed. Storage is injected so the same rules run against Postgres in
//! production and an in-memory map in tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde::Serialize;

pub const USAGE_KEY: &str = "cbc_grade_checker_usage";
pub const MAX_FREE_USES: i64 = 2;

pub trait UsageStore: Send + Sync {
    fn load(&self, key: &str) -> impl Future<Output = anyhow::Result<i64>> + Send;

    /// Adds one use and returns the new count.
    fn increment(&self, key: &str) -> impl Future<Output = anyhow::Result<i64>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryUsageStore {
    counts: Arc<Mutex<HashMap<String, i64>>>,
}

impl UsageStore for MemoryUsageStore {
    async fn load(&self, key: &str) -> anyhow::Result<i64> {
        let counts = self
            .counts
            .lock()
            .map_err(|_| anyhow!("usage counter lock poisoned"))?;
        Ok(counts.get(key).copied().unwrap_or(0))
    }

    async fn increment(&self, key: &str) -> anyhow::Result<i64> {
        let mut counts = self
            .counts
            .lock()
            .map_err(|_| anyhow!("usage counter lock poisoned"))?;
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageNotice {
    OneUseLeft,
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDecision {
    Allowed {
        count: i64,
        remaining: i64,
        notice: Option<UsageNotice>,
    },
    Blocked {
        count: i64,
    },
}

pub struct UsageTracker<S> {
    store: S,
    limit: i64,
}

impl<S: UsageStore> UsageTracker<S> {
    pub fn new(store: S, limit: i64) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn storage_key(client: &str) -> String {
        format!("{USAGE_KEY}:{client}")
    }

    pub async fn usage_count(&self, client: &str) -> anyhow::Result<i64> {
        self.store.load(&Self::storage_key(client)).await
    }

    pub async fn remaining_uses(&self, client: &str) -> anyhow::Result<i64> {
        let count = self.usage_count(client).await?;
        Ok((self.limit - count).max(0))
    }

    pub async fn has_reached_limit(&self, client: &str) -> anyhow::Result<bool> {
        Ok(self.usage_count(client).await? >= self.limit)
    }

    /// Counts one attempt, then decides whether it may proceed.
    pub async fn record_attempt(&self, client: &str) -> anyhow::Result<UsageDecision> {
        let count = self.store.increment(&Self::storage_key(client)).await?;

        if count > self.limit {
            return Ok(UsageDecision::Blocked { count });
        }

        let notice = if count == self.limit {
            Some(UsageNotice::LimitReached)
        } else if count == self.limit - 1 {
            Some(UsageNotice::OneUseLeft)
        } else {
            None
        };

        Ok(UsageDecision::Allowed {
            count,
            remaining: (self.limit - count).max(0),
            notice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn free_uses_run_out_after_limit() {
        let tracker = UsageTracker::new(MemoryUsageStore::default(), MAX_FREE_USES);

        assert_eq!(
            tracker.record_attempt("parent-1").await.unwrap(),
            UsageDecision::Allowed {
                count: 1,
                remaining: 1,
                notice: Some(UsageNotice::OneUseLeft)
            }
        );
        assert_eq!(
            tracker.record_attempt("parent-1").await.unwrap(),
            UsageDecision::Allowed {
                count: 2,
                remaining: 0,
                notice: Some(UsageNotice::LimitReached)
            }
        );
        assert_eq!(
            tracker.record_attempt("parent-1").await.unwrap(),
            UsageDecision::Blocked { count: 3 }
        );
        assert!(tracker.has_reached_limit("parent-1").await.unwrap());
        assert_eq!(tracker.remaining_uses("parent-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clients_are_counted_separately() {
        let tracker = UsageTracker::new(MemoryUsageStore::default(), MAX_FREE_USES);
        tracker.record_attempt("parent-1").await.unwrap();

        assert_eq!(tracker.usage_count("parent-2").await.unwrap(), 0);
        assert_eq!(tracker.remaining_uses("parent-2").await.unwrap(), 2);
        assert!(!tracker.has_reached_limit("parent-2").await.unwrap());
    }

    #[tokio::test]
    async fn larger_limits_only_warn_near_the_end() {
        let tracker = UsageTracker::new(MemoryUsageStore::default(), 4);

        let first = tracker.record_attempt("school").await.unwrap();
        assert_eq!(
            first,
            UsageDecision::Allowed {
                count: 1,
                remaining: 3,
                notice: None
            }
        );
        tracker.record_attempt("school").await.unwrap();
        let third = tracker.record_attempt("school").await.unwrap();
        assert!(matches!(
            third,
            UsageDecision::Allowed {
                notice: Some(UsageNotice::OneUseLeft),
                ..
            }
        ));
    }

    #[test]
    fn storage_key_is_namespaced() {
        assert_eq!(
            UsageTracker::<MemoryUsageStore>::storage_key("abc"),
            "cbc_grade_checker_usage:abc"
        );
    }
}
