//! Hint request sequencing
//!
//! Hint fetches can complete out of order. Every fetch captures a token
//! before it is issued, and its response is applied only if that token is
//! still the latest one when the response arrives.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issuance number of one hint request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HintToken(u64);

impl HintToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic sequence invalidating stale hint responses
#[derive(Debug, Default)]
pub struct HintRequestGuard {
    sequence: AtomicU64,
}

impl HintRequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token; every token issued earlier becomes stale
    pub fn next_request(&self) -> HintToken {
        HintToken(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True iff no request was issued after `token`
    pub fn is_current(&self, token: HintToken) -> bool {
        self.sequence.load(Ordering::SeqCst) == token.0
    }

    /// Latest issued token
    pub fn current(&self) -> HintToken {
        HintToken(self.sequence.load(Ordering::SeqCst))
    }

    /// Invalidate all outstanding tokens without issuing a request
    pub fn invalidate(&self) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_token_is_current() {
        let guard = HintRequestGuard::new();
        let first = guard.next_request();
        assert!(guard.is_current(first));

        let second = guard.next_request();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
        assert!(second > first);
        assert_eq!(guard.current(), second);
    }

    #[test]
    fn test_invalidate_discards_outstanding() {
        let guard = HintRequestGuard::new();
        let token = guard.next_request();
        guard.invalidate();
        assert!(!guard.is_current(token));
        assert!(guard.is_current(guard.next_request()));
    }

    #[test]
    fn test_tokens_are_strictly_increasing() {
        let guard = HintRequestGuard::new();
        let values: Vec<u64> = (0..5).map(|_| guard.next_request().value()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }
}
