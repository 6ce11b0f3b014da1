//! Fixed-rate tick scheduling

use crate::runtime::cancel::CancelToken;
use std::time::{Duration, Instant};

/// Paces the tick loop at a fixed period.
///
/// The first tick is due immediately. Each later tick is due one period after
/// the previous deadline, so a loop that falls behind runs its ticks
/// back-to-back until it has caught up; ticks are never dropped.
#[derive(Debug)]
pub struct TickTimer {
    period: Duration,
    next: Instant,
}

impl TickTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now(),
        }
    }

    /// Block until the next tick is due. Returns `false` if `token` was
    /// cancelled while waiting.
    pub fn wait(&mut self, token: &CancelToken, poll: Duration) -> bool {
        let now = Instant::now();
        if now < self.next && !token.sleep(self.next - now, poll) {
            return false;
        }
        self.next += self.period;
        !token.is_cancelled()
    }

    /// How far the schedule is behind the wall clock
    pub fn lag(&self) -> Duration {
        Instant::now().saturating_duration_since(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_immediate() {
        let mut timer = TickTimer::new(Duration::from_secs(10));
        let token = CancelToken::new();
        let started = Instant::now();
        assert!(timer.wait(&token, Duration::from_millis(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn ticks_follow_the_period() {
        let mut timer = TickTimer::new(Duration::from_millis(20));
        let token = CancelToken::new();
        let started = Instant::now();
        for _ in 0..4 {
            assert!(timer.wait(&token, Duration::from_millis(5)));
        }
        // Ticks at 0, 20, 40, 60 ms
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn late_ticks_run_back_to_back() {
        let mut timer = TickTimer::new(Duration::from_millis(10));
        let token = CancelToken::new();
        assert!(timer.wait(&token, Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(50));
        assert!(timer.lag() >= Duration::from_millis(30));

        let started = Instant::now();
        for _ in 0..3 {
            assert!(timer.wait(&token, Duration::from_millis(5)));
        }
        assert!(started.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn cancelled_wait_returns_early() {
        let mut timer = TickTimer::new(Duration::from_secs(10));
        let token = CancelToken::new();
        assert!(timer.wait(&token, Duration::from_millis(5)));

        let canceller = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });
        let started = Instant::now();
        assert!(!timer.wait(&token, Duration::from_millis(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
