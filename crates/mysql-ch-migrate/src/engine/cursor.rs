//! Shared batch cursor for parallel workers.

use std::sync::atomic::{AtomicI64, Ordering};

/// Atomic dispenser of batch indices. Every worker claims through the same
/// cursor, so indices are issued exactly once and without gaps.
#[derive(Debug)]
pub struct BatchCursor {
    next: AtomicI64,
}

impl BatchCursor {
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(-1),
        }
    }

    /// Claim the next batch index. The first claim returns 0.
    pub fn claim(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Total number of indices claimed so far.
    pub fn claims(&self) -> i64 {
        self.next.load(Ordering::SeqCst) + 1
    }
}

impl Default for BatchCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_first_claim_is_zero() {
        let cursor = BatchCursor::new();
        assert_eq!(cursor.claim(), 0);
        assert_eq!(cursor.claim(), 1);
        assert_eq!(cursor.claims(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_claims_are_unique_and_gapless() {
        let cursor = Arc::new(BatchCursor::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let cursor = Arc::clone(&cursor);
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                for _ in 0..50 {
                    claimed.push(cursor.claim());
                }
                claimed
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let unique: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(unique.len(), 400);
        assert_eq!(*unique.iter().min().unwrap(), 0);
        assert_eq!(*unique.iter().max().unwrap(), 399);
        assert_eq!(cursor.claims(), 400);
    }
}
