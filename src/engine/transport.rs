//! Transport buttons, scrubbing and the transport snapshot

use std::time::Instant;
use tracing::trace;

use super::{Engine, TimedAction};
use crate::host::{HostCommand, TransportAction, TransportChange};
use crate::mode::ButtonLayer;
use crate::protocol::outbound;
use crate::scheduler::EventHandle;
use crate::surface::{LIGHT_ON, TRANSPORT_BUTTON_BASE};

/// Transport buttons in surface order
const BUTTON_ACTIONS: [TransportAction; 8] = [
    TransportAction::Play,
    TransportAction::Stop,
    TransportAction::ToggleRecord,
    TransportAction::ToggleOverdub,
    TransportAction::ToggleLoop,
    TransportAction::TogglePunchIn,
    TransportAction::TogglePunchOut,
    TransportAction::ResetAutomationOverrides,
];

#[derive(Debug, Default)]
pub(super) struct TransportState {
    playing: bool,
    recording: bool,
    overdub: bool,
    looping: bool,
    punch_in: bool,
    punch_out: bool,
    automation_override: bool,
    /// Held rewind or fast-forward
    scrub: Option<EventHandle>,
}

impl TransportState {
    /// Returns true when the flag changed
    fn apply(&mut self, change: TransportChange) -> bool {
        let (flag, value) = match change {
            TransportChange::Playing(v) => (&mut self.playing, v),
            TransportChange::Recording(v) => (&mut self.recording, v),
            TransportChange::Overdub(v) => (&mut self.overdub, v),
            TransportChange::Loop(v) => (&mut self.looping, v),
            TransportChange::PunchIn(v) => (&mut self.punch_in, v),
            TransportChange::PunchOut(v) => (&mut self.punch_out, v),
            TransportChange::AutomationOverride(v) => (&mut self.automation_override, v),
        };
        std::mem::replace(flag, value) != value
    }

    /// Snapshot flags in wire order
    fn flags(&self) -> [bool; 8] {
        [
            self.playing,
            !self.playing,
            self.recording,
            self.overdub,
            self.looping,
            self.punch_in,
            self.punch_out,
            self.automation_override,
        ]
    }

    /// Light of transport button `index`; play and stop both show the play state
    fn light(&self, index: usize) -> bool {
        match index {
            0 | 1 => self.playing,
            2 => self.recording,
            3 => self.overdub,
            4 => self.looping,
            5 => self.punch_in,
            6 => self.punch_out,
            7 => self.automation_override,
            _ => false,
        }
    }

    fn stop_scrub(&mut self) {
        if let Some(handle) = self.scrub.take() {
            handle.cancel();
        }
    }
}

impl Engine {
    fn transport_layer_active(&self) -> bool {
        self.layers.button() == Some(ButtonLayer::Transport)
    }

    pub(super) fn on_transport_button(&mut self, index: usize, pressed: bool) {
        if !pressed || !self.transport_layer_active() {
            return;
        }
        if let Some(&action) = BUTTON_ACTIONS.get(index) {
            self.host(HostCommand::Transport(action));
        }
    }

    /// Rewind or fast-forward: once on press, then repeating until release
    pub(super) fn on_scrub(&mut self, action: TransportAction, pressed: bool, now: Instant) {
        self.transport.stop_scrub();
        if !pressed || !self.transport_layer_active() {
            return;
        }
        trace!("Scrubbing {:?}", action);
        self.host(HostCommand::Transport(action));
        let handle = self.timed.schedule_repeat(
            TimedAction::Transport(action),
            self.tuning.repeat_delay(),
            self.tuning.repeat_interval(),
            now,
        );
        self.transport.scrub = Some(handle);
    }

    pub(super) fn on_transport_change(&mut self, change: TransportChange) {
        if self.transport.apply(change) && self.out.is_initialized() {
            self.send_transport_state();
            if self.transport_layer_active() {
                self.sync_transport_lights(false);
            }
        }
    }

    pub(super) fn send_transport_state(&mut self) {
        let flags = self.transport.flags();
        self.out.sysex(outbound::transport_state(&flags));
    }

    pub(super) fn sync_transport_lights(&mut self, force: bool) {
        let active = self.transport_layer_active();
        for index in 0..self.transport_lights.len() {
            let lit = active && self.transport.light(index);
            let light = if lit { LIGHT_ON } else { 0 };
            if let Some(light) = self.transport_lights[index].light_update(light, force) {
                self.out.cc(TRANSPORT_BUTTON_BASE + index as u8, light);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_flags_follow_host() {
        let mut state = TransportState::default();
        assert!(state.flags()[1]);
        assert!(state.apply(TransportChange::Playing(true)));
        assert!(!state.apply(TransportChange::Playing(true)));
        assert!(state.apply(TransportChange::Loop(true)));

        let flags = state.flags();
        assert!(flags[0]);
        assert!(!flags[1]);
        assert!(flags[4]);
        assert!(state.light(1));
        assert!(!state.light(2));
    }

    #[test]
    fn test_stop_scrub_cancels_handle() {
        let mut state = TransportState::default();
        let handle = EventHandle::default();
        state.scrub = Some(handle.clone());
        state.stop_scrub();
        assert!(handle.is_cancelled());
        assert!(state.scrub.is_none());
    }
}
