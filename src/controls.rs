use crate::events::Control;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// GPIO side of the device: the raw level of each control at one poll.
pub trait ControlInput {
    fn level(&self, control: Control, now_ms: u64) -> bool;
}

pub const KEY_HOLD_MS: u64 = 60;

/// Controls driven from another thread (the keyboard in the host binary).
///
/// A press holds the level high until a deadline on the engine's clock. The
/// hold has to outlast the debounce settle time plus the polls around it,
/// see [`crate::Config::key_hold_ms`].
#[derive(Debug, Clone)]
pub struct VirtualControls {
    hold_ms: u64,
    primary_until: Arc<AtomicU64>,
    trigger_until: Arc<AtomicU64>,
}

impl Default for VirtualControls {
    fn default() -> Self {
        Self::with_hold(KEY_HOLD_MS)
    }
}

impl VirtualControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hold(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            primary_until: Arc::default(),
            trigger_until: Arc::default(),
        }
    }

    pub fn press(&self, control: Control, now_ms: u64) {
        self.slot(control)
            .store(now_ms.saturating_add(self.hold_ms), Ordering::Relaxed);
    }

    fn slot(&self, control: Control) -> &AtomicU64 {
        match control {
            Control::Primary => &self.primary_until,
            Control::Trigger => &self.trigger_until,
        }
    }
}

impl ControlInput for VirtualControls {
    fn level(&self, control: Control, now_ms: u64) -> bool {
        now_ms < self.slot(control).load(Ordering::Relaxed)
    }
}
