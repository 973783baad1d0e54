//! Trailing-edge debounce.
//!
//! Time is passed in explicitly (a monotonic offset such as
//! `performance.now()`), so the primitive does not depend on any timer
//! implementation. The host calls [`Debouncer::poll`] from its own timer and
//! [`Debouncer::flush`] on blur or drop; the last value handed to
//! [`Debouncer::call`] is always delivered exactly once.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Duration,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the quiet period
    pub fn call(&mut self, value: T, now: Duration) {
        self.pending = Some(Pending {
            value,
            deadline: now.saturating_add(self.delay),
        });
    }

    /// Take the pending value if its quiet period has elapsed
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        let due = matches!(&self.pending, Some(p) if now >= p.deadline);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// Take the pending value immediately
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Drop the pending value without delivering it
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_deadline_saturates() {
        let mut debouncer = Debouncer::new(ms(300));
        debouncer.call("late", Duration::MAX);
        assert_eq!(debouncer.deadline(), Some(Duration::MAX));
        assert_eq!(debouncer.poll(Duration::MAX), Some("late"));
    }

    #[test]
    fn test_fires_once_with_latest_value() {
        let mut debouncer = Debouncer::new(ms(300));
        debouncer.call("a", ms(0));
        debouncer.call("ab", ms(100));

        assert_eq!(debouncer.poll(ms(300)), None);
        assert_eq!(debouncer.deadline(), Some(ms(400)));
        assert_eq!(debouncer.poll(ms(400)), Some("ab"));
        assert_eq!(debouncer.poll(ms(1000)), None);
    }

    #[test]
    fn test_flush_delivers_immediately() {
        let mut debouncer = Debouncer::new(ms(300));
        debouncer.call(1, ms(0));
        assert_eq!(debouncer.flush(), Some(1));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.flush(), None);
    }

    #[test]
    fn test_cancel_drops_value() {
        let mut debouncer = Debouncer::new(ms(10));
        debouncer.call(1, ms(0));
        assert_eq!(debouncer.peek(), Some(&1));
        debouncer.cancel();
        assert_eq!(debouncer.poll(ms(100)), None);
    }
}
