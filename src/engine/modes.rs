//! Mode transitions
//!
//! Every enter-mode command rewrites the [`ModeState`](crate::mode::ModeState)
//! in place and swaps both control layers in one step. Nothing is sent from
//! here; the swap marks a full control resync for the next tick.

use std::time::{Duration, Instant};
use tracing::debug;

use super::{Engine, TimedAction};
use crate::host::HostCommand;
use crate::mode::{ButtonMode, FocusSource, KnobMode, MixerSide};
use crate::scheduler::UpdateType;

impl Engine {
    /// Re-derive the active layers from the current mode
    pub(super) fn apply_layers(&mut self) {
        let transition = self.layers.apply(&self.mode);
        debug!(
            deactivated = ?transition.deactivated,
            activated = ?transition.activated,
            "Layers switched"
        );
        self.out.suspend_cc();
        self.pending.mark(UpdateType::UpdateControls);
    }

    pub(super) fn enter_mixer_mode(
        &mut self,
        side: u8,
        knob_mode: u8,
        button_mode: u8,
        send_bank: u8,
        now: Instant,
    ) {
        let side = MixerSide::from_wire(side);
        self.mode.in_plugin_mode = false;
        self.mode.mixer_side = side;
        self.mode.focus_source = FocusSource::for_side(side);
        self.mode.button_mode = ButtonMode::from_wire(button_mode);
        match KnobMode::from_wire(knob_mode) {
            Some(knob) => self.mode.knob_mode = knob,
            None => debug!("Unknown knob mode {}, keeping {:?}", knob_mode, self.mode.knob_mode),
        }
        self.mixer.track_mode = self.mode.knob_mode.is_focus();
        if self.mode.knob_mode == KnobMode::Send {
            self.mixer.selected_send = send_bank;
        }
        debug!(?side, mode = ?self.mode, "Entering mixer mode");

        self.mixer.view_mut(side).content_dirty = true;
        self.mark_update_required(FocusSource::for_side(side));
        self.timed
            .schedule_once(TimedAction::SendNames, Duration::ZERO, now);
        self.mixer.force_selection = true;
        self.pending.mark(UpdateType::Selection);
        self.apply_layers();
    }

    pub(super) fn set_master_focus(&mut self, side: u8) {
        let side = MixerSide::from_wire(side);
        self.mode.mixer_side = side;
        if !self.mode.in_plugin_mode {
            self.mode.focus_source = FocusSource::for_side(side);
        }
        self.mixer.view_mut(side).content_dirty = true;
        self.mark_update_required(FocusSource::for_side(side));
        self.apply_layers();
    }

    pub(super) fn enter_transport_mode(&mut self) {
        debug!("Entering transport mode");
        self.mode.button_mode = ButtonMode::Transport;
        self.apply_layers();
        self.send_transport_state();
    }

    pub(super) fn enter_plugin_mode(&mut self) {
        debug!(macro_mode = self.plugin.macro_mode, "Entering plugin mode");
        self.mode.in_plugin_mode = true;
        self.mode.focus_source = FocusSource::Plugin;
        self.mode.knob_mode = if self.plugin.macro_mode {
            KnobMode::Macro
        } else {
            KnobMode::Plugin
        };
        self.mode.button_mode = ButtonMode::None;
        self.mixer.track_mode = false;
        self.plugin.content_dirty = true;
        self.pending
            .mark_all(&[UpdateType::Plugin, UpdateType::Selection]);
        self.apply_layers();
    }

    pub(super) fn set_track_focus_page(&mut self, page: u8) {
        if self.mode.knob_mode.is_focus() && self.mixer.focus_page == page {
            return;
        }
        debug!("Track focus page {}", page);
        self.mode.in_plugin_mode = false;
        self.mode.focus_source = FocusSource::for_side(self.mode.mixer_side);
        self.update_track_focus_page(page);
        self.mixer.track_mode = true;
        self.mode.button_mode = ButtonMode::None;
        self.mixer.force_selection = true;
        self.pending
            .mark_all(&[UpdateType::SendsCount, UpdateType::Selection]);
        self.apply_layers();
    }

    /// Point the focus knobs at `page` of the cursor track's sends
    pub(super) fn update_track_focus_page(&mut self, page: u8) {
        let knob = if page == 0 {
            KnobMode::FocusTrack
        } else {
            KnobMode::FocusTrackPage1
        };
        if self.mode.knob_mode == knob && self.mixer.focus_page == page {
            return;
        }
        self.mode.knob_mode = knob;
        self.mixer.focus_page = page;

        let (section, position) = match page {
            0 => (0, 0),
            page => (1, (page as i32 - 1) * 8),
        };
        self.mixer.sends.section = section;
        if self.mixer.sends.scroll.request(position) {
            self.host(HostCommand::ScrollCursorSends { position });
        }
    }

    /// Macro capability of the cursor device changed
    pub(super) fn handle_macro_availability(&mut self, available: bool) {
        if self.plugin.macro_mode == available {
            return;
        }
        debug!("Macro mode {}", if available { "available" } else { "gone" });
        self.plugin.macro_mode = available;
        self.plugin.content_dirty = true;
        self.mark_update_required(FocusSource::Plugin);

        if self.mode.in_plugin_mode {
            self.mode.knob_mode = if available {
                KnobMode::Macro
            } else {
                KnobMode::Plugin
            };
            self.apply_layers();
        }
    }
}
