use std::thread;
use std::time::{Duration, Instant};

/// Minimum spacing between network requests, scheduled against a monotonic
/// deadline that only advances when a request is actually issued.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    next_permitted: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_permitted: None,
        }
    }

    /// Blocks until the next request may start, then books the following
    /// slot one interval after this start. Returns the time spent waiting.
    pub fn wait_turn(&mut self) -> Duration {
        let now = Instant::now();
        let waited = match self.next_permitted {
            Some(deadline) if deadline > now => {
                let wait = deadline - now;
                thread::sleep(wait);
                wait
            }
            _ => Duration::ZERO,
        };
        self.next_permitted = Some(Instant::now() + self.interval);
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_turn_does_not_wait() {
        let mut throttle = Throttle::new(Duration::from_millis(200));
        assert_eq!(throttle.wait_turn(), Duration::ZERO);
    }

    #[test]
    fn consecutive_turns_respect_interval() {
        let interval = Duration::from_millis(25);
        let mut throttle = Throttle::new(interval);
        let start = Instant::now();
        for _ in 0..4 {
            throttle.wait_turn();
        }
        assert!(start.elapsed() >= interval * 3);
    }

    #[test]
    fn idle_time_counts_toward_interval() {
        let interval = Duration::from_millis(20);
        let mut throttle = Throttle::new(interval);
        throttle.wait_turn();
        thread::sleep(interval * 2);
        assert_eq!(throttle.wait_turn(), Duration::ZERO);
    }
}
