use std::time::Duration;
use tokio::time::Instant;

/// Collapses deliveries that arrive within `window` of the last admitted one.
///
/// This is a proximity heuristic: payloads carry no delivery id, so two distinct
/// notifications sent close together are merged too, and separate worker instances
/// do not see each other's timestamps.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    window: Duration,
    last: Option<Instant>,
}

impl DedupWindow {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns `false` for a duplicate. Admitted deliveries become the new reference point;
    /// suppressed ones leave the state untouched.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last
            && now.saturating_duration_since(last) < self.window
        {
            return false;
        }
        self.last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_boundaries() {
        let start = Instant::now();
        let mut dedup = DedupWindow::new(Duration::from_millis(1000));

        assert!(dedup.admit(start));
        assert!(!dedup.admit(start + Duration::from_millis(999)));
        assert!(dedup.admit(start + Duration::from_millis(1000)));
    }

    #[test]
    fn test_suppressed_delivery_does_not_extend_window() {
        let start = Instant::now();
        let mut dedup = DedupWindow::new(Duration::from_millis(1000));

        assert!(dedup.admit(start));
        assert!(!dedup.admit(start + Duration::from_millis(600)));
        // Measured from the admitted delivery, not the suppressed one.
        assert!(dedup.admit(start + Duration::from_millis(1100)));
    }
}
