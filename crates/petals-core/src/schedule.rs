//! Polled, cancellable scheduling primitives. The host loop supplies the
//! current time; nothing here owns a thread or a timer wheel.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeoutState {
    Armed,
    Fired,
    Cancelled,
}

/// Fires once when its deadline has been reached.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    due: f64,
    state: TimeoutState,
}

impl Timeout {
    pub fn new(now: f64, delay_ms: f64) -> Self {
        Self {
            due: now + delay_ms.max(0.0),
            state: TimeoutState::Armed,
        }
    }

    pub fn due(&self) -> f64 {
        self.due
    }

    pub fn is_pending(&self) -> bool {
        self.state == TimeoutState::Armed
    }

    /// Returns `true` exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: f64) -> bool {
        if self.state == TimeoutState::Armed && now >= self.due {
            self.state = TimeoutState::Fired;
            return true;
        }
        false
    }

    pub fn cancel(&mut self) {
        if self.state == TimeoutState::Armed {
            self.state = TimeoutState::Cancelled;
        }
    }
}

/// Fires every `period` ms. Ticks missed between polls collapse into one.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period: f64,
    next_due: f64,
    cancelled: bool,
}

impl Interval {
    pub fn new(now: f64, period_ms: f64) -> Self {
        debug_assert!(period_ms > 0.0);
        Self {
            period: period_ms,
            next_due: now + period_ms,
            cancelled: false,
        }
    }

    pub fn next_due(&self) -> Option<f64> {
        (!self.cancelled).then_some(self.next_due)
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled
    }

    pub fn poll(&mut self, now: f64) -> bool {
        if self.cancelled || now < self.next_due {
            return false;
        }
        let missed = ((now - self.next_due) / self.period).floor();
        self.next_due += (missed + 1.0) * self.period;
        true
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// A single outstanding "call me on the next frame" request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRequest {
    pending: bool,
}

impl FrameRequest {
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consumes the request. A frame delivered without one is stale.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn cancel(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_fires_once() {
        let mut timeout = Timeout::new(100.0, 25.0);
        assert!(!timeout.poll(124.9));
        assert!(timeout.poll(125.0));
        assert!(!timeout.poll(200.0));
        assert!(!timeout.is_pending());
    }

    #[test]
    fn cancelled_timeout_never_fires() {
        let mut timeout = Timeout::new(0.0, 10.0);
        timeout.cancel();
        assert!(!timeout.poll(1_000.0));
    }

    #[test]
    fn interval_coalesces_missed_ticks() {
        let mut interval = Interval::new(0.0, 500.0);
        assert!(!interval.poll(499.0));
        assert!(interval.poll(500.0));
        assert_eq!(interval.next_due(), Some(1000.0));
        assert!(interval.poll(2_250.0));
        assert_eq!(interval.next_due(), Some(2_500.0));
        assert!(!interval.poll(2_400.0));
    }

    #[test]
    fn cancelled_interval_is_silent() {
        let mut interval = Interval::new(0.0, 10.0);
        interval.cancel();
        assert!(!interval.poll(100.0));
        assert_eq!(interval.next_due(), None);
    }

    #[test]
    fn frame_request_is_consumed() {
        let mut frame = FrameRequest::default();
        assert!(!frame.take());
        frame.request();
        assert!(frame.take());
        assert!(!frame.is_pending());
        frame.request();
        frame.cancel();
        assert!(!frame.take());
    }
}
