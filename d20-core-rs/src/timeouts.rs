//! Multi-type timeout tracker
//!
//! Keeps at most one deadline per [`TimeoutType`]. The driver polls
//! [`Timeouts::check`] once per loop iteration; elapsed types are reported
//! in declaration order until they are reset or stopped.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::trace;

/// Timeout kinds. Declaration order is the order `check` reports them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeoutType {
    /// Ongoing EVSE processing phase (cable check, pre-charge)
    Performance,
    /// Contactors must close after pre-charge
    Contactor,
    /// Next request must arrive after a response
    Sequence,
}

#[derive(Debug, Default)]
pub struct Timeouts {
    deadlines: BTreeMap<TimeoutType, Instant>,
}

impl Timeouts {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start a timeout; replaces any running deadline of the same type
    pub fn start_timeout(&mut self, timeout: TimeoutType, duration: Duration) {
        self.start_timeout_at(timeout, duration, Instant::now());
    }

    pub fn start_timeout_at(&mut self, timeout: TimeoutType, duration: Duration, now: Instant) {
        trace!("Starting {:?} timeout ({:?})", timeout, duration);
        self.deadlines.insert(timeout, now + duration);
    }

    /// Cancel a running timeout
    pub fn stop_timeout(&mut self, timeout: TimeoutType) {
        if self.deadlines.remove(&timeout).is_some() {
            trace!("Stopped {:?} timeout", timeout);
        }
    }

    /// Clear a reached timeout after acting on it
    pub fn reset_timeout(&mut self, timeout: TimeoutType) {
        if self.deadlines.remove(&timeout).is_some() {
            trace!("Reset {:?} timeout", timeout);
        }
    }

    pub fn is_running(&self, timeout: TimeoutType) -> bool {
        self.deadlines.contains_key(&timeout)
    }

    /// Elapsed timeout types, `None` if nothing has elapsed
    pub fn check(&self) -> Option<Vec<TimeoutType>> {
        self.check_at(Instant::now())
    }

    pub fn check_at(&self, now: Instant) -> Option<Vec<TimeoutType>> {
        let elapsed: Vec<TimeoutType> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(timeout, _)| *timeout)
            .collect();

        if elapsed.is_empty() {
            None
        } else {
            Some(elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_started() {
        let timeouts = Timeouts::new();
        assert_eq!(timeouts.check(), None);
    }

    #[test]
    fn test_timeouts_reported_in_declaration_order() {
        let mut timeouts = Timeouts::new();
        let start = Instant::now();

        timeouts.start_timeout_at(TimeoutType::Sequence, Duration::from_millis(30), start);
        timeouts.start_timeout_at(TimeoutType::Performance, Duration::from_millis(10), start);
        timeouts.start_timeout_at(TimeoutType::Contactor, Duration::from_millis(20), start);

        assert_eq!(timeouts.check_at(start + Duration::from_millis(5)), None);
        assert_eq!(
            timeouts.check_at(start + Duration::from_millis(15)),
            Some(vec![TimeoutType::Performance])
        );
        assert_eq!(
            timeouts.check_at(start + Duration::from_millis(30)),
            Some(vec![
                TimeoutType::Performance,
                TimeoutType::Contactor,
                TimeoutType::Sequence
            ])
        );
    }

    #[test]
    fn test_timeouts_with_real_clock() {
        let mut timeouts = Timeouts::new();

        timeouts.start_timeout(TimeoutType::Sequence, Duration::from_millis(30));
        timeouts.start_timeout(TimeoutType::Performance, Duration::from_millis(10));
        timeouts.start_timeout(TimeoutType::Contactor, Duration::from_millis(20));

        std::thread::sleep(Duration::from_millis(35));

        assert_eq!(
            timeouts.check(),
            Some(vec![
                TimeoutType::Performance,
                TimeoutType::Contactor,
                TimeoutType::Sequence
            ])
        );
    }

    #[test]
    fn test_elapsed_reported_until_reset() {
        let mut timeouts = Timeouts::new();
        let start = Instant::now();
        timeouts.start_timeout_at(TimeoutType::Sequence, Duration::from_millis(10), start);

        let later = start + Duration::from_millis(20);
        assert_eq!(timeouts.check_at(later), Some(vec![TimeoutType::Sequence]));
        assert_eq!(timeouts.check_at(later), Some(vec![TimeoutType::Sequence]));

        timeouts.reset_timeout(TimeoutType::Sequence);
        assert_eq!(timeouts.check_at(later), None);
    }

    #[test]
    fn test_restart_replaces_deadline() {
        let mut timeouts = Timeouts::new();
        let start = Instant::now();
        timeouts.start_timeout_at(TimeoutType::Contactor, Duration::from_millis(10), start);
        timeouts.start_timeout_at(
            TimeoutType::Contactor,
            Duration::from_millis(100),
            start + Duration::from_millis(5),
        );

        assert_eq!(timeouts.check_at(start + Duration::from_millis(50)), None);
        assert!(timeouts.is_running(TimeoutType::Contactor));
    }

    #[test]
    fn test_stop_timeout() {
        let mut timeouts = Timeouts::new();
        let start = Instant::now();
        timeouts.start_timeout_at(TimeoutType::Performance, Duration::from_millis(10), start);
        timeouts.start_timeout_at(TimeoutType::Sequence, Duration::from_millis(10), start);
        timeouts.stop_timeout(TimeoutType::Performance);

        assert_eq!(
            timeouts.check_at(start + Duration::from_millis(20)),
            Some(vec![TimeoutType::Sequence])
        );
        assert!(!timeouts.is_running(TimeoutType::Performance));

        // unknown types are a no-op
        timeouts.stop_timeout(TimeoutType::Contactor);
        timeouts.reset_timeout(TimeoutType::Contactor);
    }
}
