//! Abort flag shared between the controller, the tick loop, and the sandbox

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Cloneable handle to the run's abort flag.
///
/// The flag is a single atomic boolean so the tick loop can read it on the hot
/// path without taking a lock. Long operations poll it through [`CancelToken::sleep`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stops as soon as possible
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking every `poll` to check the flag.
    ///
    /// Returns `true` if the full duration elapsed and `false` if the token was
    /// cancelled first.
    pub fn sleep(&self, duration: Duration, poll: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let poll = poll.max(Duration::from_millis(1));

        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(poll));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());

        token.cancel();
        assert!(other.is_cancelled());

        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        let started = Instant::now();
        assert!(token.sleep(Duration::from_millis(30), Duration::from_millis(10)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn sleep_returns_early_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let started = Instant::now();
        let completed = token.sleep(Duration::from_secs(10), Duration::from_millis(20));
        canceller.join().unwrap();

        assert!(!completed);
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
