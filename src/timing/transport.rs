use super::playback::{PlaybackEngine, PulseOutcome};
use super::sequence::SequenceStore;
use crate::events::Control;
use crate::midi::NoteSink;
use tracing::{debug, info, warn};

/// Merges external transport and the local controls into one play/stop
/// decision.
///
/// `pending` is the caller's intent to play; `running` mirrors the external
/// clock's transport. Playback only ever begins when both hold and a
/// sequence is loaded.
#[derive(Debug, Clone, Default)]
pub struct TransportArbiter {
    pending: bool,
    running: bool,
    trigger_enabled: bool,
}

impl TransportArbiter {
    pub fn new(trigger_enabled: bool) -> Self {
        Self {
            trigger_enabled,
            ..Default::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn on_control_edge(
        &mut self,
        control: Control,
        pressed: bool,
        player: &mut PlaybackEngine,
        store: &SequenceStore,
        out: &mut impl NoteSink,
    ) {
        if !pressed {
            return;
        }
        match control {
            Control::Primary => self.toggle_arm(player, store, out),
            Control::Trigger if self.trigger_enabled => self.retrigger(player, store, out),
            Control::Trigger => debug!("trigger control disabled, ignoring press"),
        }
    }

    fn toggle_arm(&mut self, player: &mut PlaybackEngine, store: &SequenceStore, out: &mut impl NoteSink) {
        if player.is_playing() || self.pending {
            self.stop_playback(player, out, false);
            info!("disarmed");
        } else if store.is_loaded() {
            self.pending = true;
            info!(clock_running = self.running, "armed");
            if self.running {
                self.try_begin(player, store, out);
            }
        } else {
            warn!("control pressed but no sequence is loaded");
        }
    }

    fn retrigger(&mut self, player: &mut PlaybackEngine, store: &SequenceStore, out: &mut impl NoteSink) {
        if !store.is_loaded() {
            warn!("trigger pressed but no sequence is loaded");
            return;
        }
        player.stop(out);
        self.pending = true;
        info!(clock_running = self.running, "retriggered");
        if self.running {
            self.try_begin(player, store, out);
        }
    }

    pub fn on_start(&mut self, player: &mut PlaybackEngine, store: &SequenceStore, out: &mut impl NoteSink) {
        if player.is_playing() {
            self.stop_playback(player, out, true);
        }
        self.running = true;
        info!(pending = self.pending, "transport start");
        if self.pending {
            self.try_begin(player, store, out);
        }
    }

    pub fn on_stop(&mut self, player: &mut PlaybackEngine, out: &mut impl NoteSink) {
        if self.running {
            info!(pending = self.pending, "transport stop");
        }
        self.running = false;
        if player.is_playing() {
            self.stop_playback(player, out, true);
        }
    }

    /// Same as start: playback restarts from the first event rather than
    /// resuming where the last stop left it.
    pub fn on_continue(&mut self, player: &mut PlaybackEngine, store: &SequenceStore, out: &mut impl NoteSink) {
        self.running = true;
        info!(pending = self.pending, "transport continue");
        if self.pending {
            self.try_begin(player, store, out);
        }
    }

    pub fn on_clock_pulse(&mut self, player: &mut PlaybackEngine, store: &SequenceStore, out: &mut impl NoteSink) {
        if player.on_clock_pulse(store.sequence(), out) == PulseOutcome::Finished {
            // One-shot: the phrase is done, a new press arms it again.
            self.pending = false;
            info!("sequence complete");
        }
    }

    /// Stop playback and silence any held note. `keep_armed` preserves the
    /// intent to play so the next start resumes without a new press.
    pub fn stop_playback(&mut self, player: &mut PlaybackEngine, out: &mut impl NoteSink, keep_armed: bool) {
        player.stop(out);
        if !keep_armed {
            self.pending = false;
        }
    }

    fn try_begin(&mut self, player: &mut PlaybackEngine, store: &SequenceStore, out: &mut impl NoteSink) {
        if !store.is_loaded() || !player.begin(store.sequence(), out) {
            self.pending = false;
            warn!("nothing to play, clearing pending");
        }
    }
}
