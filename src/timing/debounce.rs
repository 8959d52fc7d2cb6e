pub const DEFAULT_SETTLE_MS: u64 = 30;

/// Turns raw per-poll levels into clean logical transitions.
///
/// A reading only becomes the logical state after it has held, unchanged,
/// for the settle interval.
#[derive(Debug, Clone)]
pub struct Debouncer {
    settle_ms: u64,
    stable: bool,
    last_reading: bool,
    last_change_ms: u64,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_MS)
    }
}

impl Debouncer {
    pub fn new(settle_ms: u64) -> Self {
        Self {
            settle_ms,
            stable: false,
            last_reading: false,
            last_change_ms: 0,
        }
    }

    /// Feed one reading (`true` = pressed) taken at `now_ms`.
    ///
    /// Returns the new logical level when it changes.
    pub fn sample(&mut self, pressed: bool, now_ms: u64) -> Option<bool> {
        if pressed != self.last_reading {
            self.last_reading = pressed;
            self.last_change_ms = now_ms;
        }

        if now_ms.saturating_sub(self.last_change_ms) >= self.settle_ms && pressed != self.stable {
            self.stable = pressed;
            return Some(pressed);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_accepted_after_settle() {
        let mut d = Debouncer::new(30);
        assert_eq!(d.sample(true, 100), None);
        assert_eq!(d.sample(true, 120), None);
        assert_eq!(d.sample(true, 130), Some(true));
        assert_eq!(d.sample(true, 140), None);
    }

    #[test]
    fn bounce_restarts_settle_window() {
        let mut d = Debouncer::new(30);
        d.sample(true, 0);
        d.sample(false, 10);
        d.sample(true, 20);
        assert_eq!(d.sample(true, 45), None);
        assert_eq!(d.sample(true, 50), Some(true));
    }

    #[test]
    fn short_glitch_is_ignored() {
        let mut d = Debouncer::new(30);
        for t in 0..10 {
            assert_eq!(d.sample(true, t), None);
        }
        for t in 10..100 {
            assert_eq!(d.sample(false, t), None);
        }
    }

    #[test]
    fn release_is_reported_too() {
        let mut d = Debouncer::new(30);
        d.sample(true, 0);
        assert_eq!(d.sample(true, 30), Some(true));
        d.sample(false, 40);
        assert_eq!(d.sample(false, 69), None);
        assert_eq!(d.sample(false, 70), Some(false));
    }
}
