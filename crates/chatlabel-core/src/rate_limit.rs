//! Announcement rate limiting
//!
//! A busy group chat can deliver messages faster than a screen reader can
//! speak them. Each conversation gets a fixed window allowance; exceeding it
//! mutes that conversation for a while.
//!
//! Timestamps are milliseconds supplied by the caller because
//! `std::time::Instant` is unavailable on `wasm32-unknown-unknown`.

use crate::config::EngineConfig;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum announcements allowed in the window
    pub limit: u32,
    pub window_ms: u64,
    /// Mute duration after exceeding the limit
    pub block_ms: u64,
}

impl RateLimitConfig {
    pub fn new(limit: u32, window_ms: u64, block_ms: u64) -> Self {
        Self {
            limit,
            window_ms,
            block_ms,
        }
    }
}

impl From<&EngineConfig> for RateLimitConfig {
    fn from(config: &EngineConfig) -> Self {
        Self::new(
            config.announce_limit,
            config.announce_window_ms,
            config.announce_block_ms,
        )
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: u64,
    blocked_until: Option<u64>,
}

impl RateLimitEntry {
    fn new(now: u64) -> Self {
        Self {
            count: 1,
            window_start: now,
            blocked_until: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    /// Over the limit; muted for `blocked_for_ms`
    Blocked { blocked_for_ms: u64 },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Fixed-window limiter keyed by conversation
#[derive(Debug)]
pub struct AnnouncementLimiter {
    config: RateLimitConfig,
    entries: HashMap<String, RateLimitEntry>,
}

impl AnnouncementLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// Count one announcement for `key` at `now` and decide whether it may play
    pub fn check(&mut self, key: &str, now: u64) -> RateLimitResult {
        let Some(entry) = self.entries.get_mut(key) else {
            self.entries.insert(key.to_string(), RateLimitEntry::new(now));
            return RateLimitResult::Allowed;
        };

        if let Some(blocked_until) = entry.blocked_until {
            if now < blocked_until {
                return RateLimitResult::Blocked {
                    blocked_for_ms: blocked_until - now,
                };
            }
            entry.blocked_until = None;
            entry.count = 0;
            entry.window_start = now;
        }

        if now.saturating_sub(entry.window_start) > self.config.window_ms {
            entry.count = 1;
            entry.window_start = now;
            return RateLimitResult::Allowed;
        }

        if entry.count >= self.config.limit {
            entry.blocked_until = Some(now.saturating_add(self.config.block_ms));
            return RateLimitResult::Blocked {
                blocked_for_ms: self.config.block_ms,
            };
        }

        entry.count += 1;
        RateLimitResult::Allowed
    }

    #[cfg(test)]
    fn count(&self, key: &str) -> u32 {
        self.entries.get(key).map_or(0, |e| e.count)
    }

    /// Drop entries whose window and block have both expired
    pub fn cleanup(&mut self, now: u64) {
        let window = self.config.window_ms;
        self.entries.retain(|_, entry| {
            if entry.blocked_until.is_some_and(|until| now < until) {
                return true;
            }
            now.saturating_sub(entry.window_start) <= window
        });
    }

    #[cfg(test)]
    fn tracked_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_under_limit() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(5, 60_000, 60_000));
        for i in 0..5 {
            assert!(limiter.check("Ana", i * 10).is_allowed());
        }
    }

    #[test]
    fn test_blocks_over_limit() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(3, 60_000, 5_000));

        assert!(limiter.check("group", 0).is_allowed());
        assert!(limiter.check("group", 1).is_allowed());
        assert!(limiter.check("group", 2).is_allowed());
        assert_eq!(
            limiter.check("group", 3),
            RateLimitResult::Blocked {
                blocked_for_ms: 5_000
            }
        );
        assert_eq!(
            limiter.check("group", 1_003),
            RateLimitResult::Blocked {
                blocked_for_ms: 4_000
            }
        );
    }

    #[test]
    fn test_block_expires() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(1, 60_000, 1_000));
        assert!(limiter.check("a", 0).is_allowed());
        assert!(!limiter.check("a", 10).is_allowed());
        assert!(limiter.check("a", 1_010).is_allowed());
    }

    #[test]
    fn test_window_resets() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(2, 1_000, 1_000));
        assert!(limiter.check("a", 0).is_allowed());
        assert!(limiter.check("a", 500).is_allowed());
        assert!(limiter.check("a", 1_501).is_allowed());
        assert_eq!(limiter.count("a"), 1);
    }

    #[test]
    fn test_separate_keys() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(1, 60_000, 60_000));
        assert!(limiter.check("Ana", 0).is_allowed());
        assert!(!limiter.check("Ana", 1).is_allowed());
        assert!(limiter.check("Bruno", 2).is_allowed());
    }

    #[test]
    fn test_huge_block_does_not_overflow() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(1, 1_000, u64::MAX));
        assert!(limiter.check("a", 10).is_allowed());
        assert_eq!(
            limiter.check("a", 20),
            RateLimitResult::Blocked {
                blocked_for_ms: u64::MAX
            }
        );
        assert!(!limiter.check("a", u64::MAX - 1).is_allowed());
    }

    #[test]
    fn test_cleanup() {
        let mut limiter = AnnouncementLimiter::new(RateLimitConfig::new(2, 1_000, 1_000));
        limiter.check("a", 0);
        limiter.check("b", 900);
        limiter.cleanup(1_500);
        assert_eq!(limiter.count("a"), 0);
        assert_eq!(limiter.tracked_count(), 1);

        limiter.cleanup(5_000);
        assert_eq!(limiter.tracked_count(), 0);
    }
}
