//! Counting limiter bounding concurrent transforms

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// Fixed pool of tokens; one token per running transform
///
/// Also records how many tokens are held right now and the highest count
/// ever observed, so the bound can be asserted.
#[derive(Debug)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Limiter {
    /// Create a limiter with `capacity` tokens (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a token
    ///
    /// The token goes back to the pool when the returned permit is dropped,
    /// whichever way the holder exits.
    pub async fn acquire(&self) -> LimiterPermit {
        // The semaphore is owned here and never closed
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("limiter semaphore closed"),
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        trace!("Limiter token taken ({}/{})", now, self.capacity);

        LimiterPermit {
            _permit: permit,
            active: Arc::clone(&self.active),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently held
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of tokens held at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A held limiter token, released on drop
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_capacity_is_at_least_one() {
        assert_eq!(Limiter::new(0).capacity(), 1);
        assert_eq!(Limiter::new(4).capacity(), 4);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = Limiter::new(1);
        {
            let _permit = limiter.acquire().await;
            assert_eq!(limiter.active(), 1);
        }
        assert_eq!(limiter.active(), 0);

        // A second acquire does not block once the first is gone
        let _again = tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
            .await
            .expect("token was not returned");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bound_never_exceeded() {
        let limiter = Arc::new(Limiter::new(3));
        let mut tasks = Vec::new();

        for _ in 0..24 {
            let limiter = Arc::clone(&limiter);
            tasks.push(tokio::spawn(async move {
                let _permit = limiter.acquire().await;
                assert!(limiter.active() <= 3);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }));
        }
        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }

        assert!(limiter.peak() <= 3);
        assert!(limiter.peak() >= 1);
        assert_eq!(limiter.active(), 0);
    }

    #[tokio::test]
    async fn test_released_when_holder_panics() {
        let limiter = Arc::new(Limiter::new(1));
        let held = Arc::clone(&limiter);
        let result = tokio::spawn(async move {
            let _permit = held.acquire().await;
            panic!("transform blew up");
        })
        .await;

        assert!(result.is_err());
        assert_eq!(limiter.active(), 0);
        let _permit = tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
            .await
            .expect("token leaked by panicking holder");
    }
}
