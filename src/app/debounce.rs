use std::time::{Duration, Instant};

/// Holds back a value until no newer one arrived for `delay`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    pub fn push_at(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// The pending value, once it has been quiet long enough.
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, since)) if now.duration_since(*since) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// The pending value right away, e.g. on submit or exit.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_last_value_after_quiet_period() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.push_at("a", start);
        d.push_at("ab", start + Duration::from_millis(100));
        assert_eq!(d.poll_at(start + Duration::from_millis(350)), None);
        assert_eq!(d.poll_at(start + Duration::from_millis(400)), Some("ab"));
        assert_eq!(d.poll_at(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn flush_and_cancel() {
        let mut d = Debouncer::new(Duration::from_secs(60));
        d.push(1);
        assert!(d.is_pending());
        assert_eq!(d.flush(), Some(1));
        d.push(2);
        d.cancel();
        assert_eq!(d.flush(), None);
    }
}
