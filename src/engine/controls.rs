//! Knob and button routing through the active layers

use std::time::Instant;
use tracing::trace;

use super::Engine;
use crate::host::{HostCommand, MixerParam, MixerTarget, TrackRef, TrackToggle, TransportAction};
use crate::midi::convert::normalized_from_7bit;
use crate::mode::{ButtonLayer, KnobLayer, MixerSide};
use crate::surface::{
    SurfaceInput, BUTTON_BASE, BUTTON_COUNT, KNOB_COUNT, KNOB_HIGH_BASE, LIGHT_ON,
};

impl Engine {
    pub(super) fn on_control_change(&mut self, cc: u8, value: u8, now: Instant) {
        let Some(input) = SurfaceInput::from_cc(cc, value) else {
            trace!("CC {:#04x} is not a surface control", cc);
            return;
        };
        match input {
            SurfaceInput::KnobHigh { index, value } => self.knobs[index].receive_high(value),
            SurfaceInput::KnobLow { index, value } => {
                let position = self.knobs[index].receive_low(value);
                self.on_knob_moved(index, position, now);
            }
            SurfaceInput::Touch { index, touched } => self.on_knob_touched(index, touched, now),
            SurfaceInput::Button { index, value } => self.on_button(index, value, now),
            SurfaceInput::TransportButton { index, pressed } => {
                self.on_transport_button(index, pressed)
            }
            SurfaceInput::Rewind { pressed } => {
                self.on_scrub(TransportAction::Rewind, pressed, now)
            }
            SurfaceInput::FastForward { pressed } => {
                self.on_scrub(TransportAction::FastForward, pressed, now)
            }
        }
    }

    fn on_knob_moved(&mut self, index: usize, value: f64, now: Instant) {
        match self.layers.knob() {
            Some(KnobLayer::Plugin) => {
                let Some(path) = self.bound_path(self.plugin.knob_bindings[index].as_deref())
                else {
                    return;
                };
                self.plugin.knob_change_time[index] = Some(now);
                self.host(HostCommand::SetParameter { path, value });
            }
            Some(KnobLayer::Macro) => {
                self.plugin.knob_change_time[index] = Some(now);
                self.host(HostCommand::SetRemoteParameter {
                    index: index as u8,
                    value,
                });
            }
            Some(_) => {
                if let Some(target) = self.knob_target(index) {
                    self.host(HostCommand::SetMixerValue { target, value });
                }
            }
            None => {}
        }
    }

    fn on_knob_touched(&mut self, index: usize, touched: bool, now: Instant) {
        match self.layers.knob() {
            Some(KnobLayer::Macro) => {
                self.host(HostCommand::TouchRemoteParameter {
                    index: index as u8,
                    touched,
                });
                if !touched {
                    self.plugin.knob_change_time[index] = Some(now);
                }
            }
            Some(KnobLayer::Plugin) | None => {}
            Some(_) => {
                if let Some(target) = self.knob_target(index) {
                    self.host(HostCommand::TouchMixerValue { target, touched });
                }
            }
        }
    }

    fn on_button(&mut self, index: usize, value: u8, now: Instant) {
        let toggle = match self.layers.button() {
            Some(ButtonLayer::Mute(side)) => Some((side, TrackToggle::Mute)),
            Some(ButtonLayer::Solo(side)) => Some((side, TrackToggle::Solo)),
            Some(ButtonLayer::Arm(side)) => Some((side, TrackToggle::Arm)),
            Some(ButtonLayer::PluginButtons) => {
                let binding = self.plugin.button_bindings[index].as_deref();
                if let Some(path) = self.bound_path(binding) {
                    self.plugin.button_change_time[index] = Some(now);
                    self.host(HostCommand::SetParameter {
                        path,
                        value: normalized_from_7bit(value),
                    });
                }
                None
            }
            _ => None,
        };

        let Some((side, toggle)) = toggle else {
            return;
        };
        if value == 0 {
            return;
        }
        if let Some(track) = self.mixer.view(side).track_ref(index) {
            self.host(HostCommand::ToggleTrack { track, toggle });
        }
    }

    /// Host path of a bound parameter of the active device
    fn bound_path(&self, pid: Option<&str>) -> Option<String> {
        let param = self.registry.active()?.parameter(pid?)?;
        Some(param.path_id.clone())
    }

    /// Mixer target knob `index` drives in the active layer
    fn knob_target(&self, index: usize) -> Option<MixerTarget> {
        let (track, param) = match self.layers.knob()? {
            KnobLayer::Volume(side) => (self.side_track(side, index)?, MixerParam::Volume),
            KnobLayer::Pan(side) => (self.side_track(side, index)?, MixerParam::Pan),
            KnobLayer::Send(side) => (
                self.side_track(side, index)?,
                MixerParam::Send(self.mixer.selected_send),
            ),
            KnobLayer::FocusTrack => {
                let param = match index {
                    0 => MixerParam::Volume,
                    1 => MixerParam::Pan,
                    knob => MixerParam::Send(self.mixer.focus_send(knob, true)?),
                };
                (TrackRef::Cursor, param)
            }
            KnobLayer::FocusTrackPage1 => (
                TrackRef::Cursor,
                MixerParam::Send(self.mixer.focus_send(index, false)?),
            ),
            KnobLayer::Plugin | KnobLayer::Macro => return None,
        };
        Some(MixerTarget { track, param })
    }

    fn side_track(&self, side: MixerSide, index: usize) -> Option<TrackRef> {
        self.mixer.view(side).track_ref(index)
    }

    /// Value knob `index` should show
    fn knob_value(&self, index: usize) -> Option<f64> {
        match self.layers.knob()? {
            KnobLayer::Plugin => {
                let pid = self.plugin.knob_bindings[index].as_deref()?;
                let param = self.registry.active()?.parameter(pid)?;
                Some(param.normalized_value)
            }
            KnobLayer::Macro => self
                .plugin
                .macros
                .get(index)
                .filter(|m| m.exists)
                .map(|m| m.value),
            _ => self.mixer.value(self.knob_target(index)?),
        }
    }

    fn button_light(&self, index: usize) -> bool {
        let track_flag = |side: MixerSide, flag: fn(&super::mixer::TrackMirror) -> bool| {
            self.mixer.view(side).slot(index).is_some_and(flag)
        };
        match self.layers.button() {
            Some(ButtonLayer::Mute(side)) => track_flag(side, |t| t.mute),
            Some(ButtonLayer::Solo(side)) => track_flag(side, |t| t.solo),
            Some(ButtonLayer::Arm(side)) => track_flag(side, |t| t.arm),
            Some(ButtonLayer::PluginButtons) => self.plugin.button_bindings[index]
                .as_deref()
                .and_then(|pid| self.registry.active()?.parameter(pid))
                .is_some_and(|p| p.normalized_value >= 0.5),
            _ => false,
        }
    }

    /// Push knob positions and button lights that differ from what the surface shows
    pub(super) fn sync_controls(&mut self, force: bool) {
        for index in 0..KNOB_COUNT {
            let value = self.knob_value(index).unwrap_or(0.0);
            if let Some((high, low)) = self.knobs[index].position_update(value, force) {
                self.out.hires(KNOB_HIGH_BASE + index as u8, high, low);
            }
        }
        for index in 0..BUTTON_COUNT {
            let light = if self.button_light(index) { LIGHT_ON } else { 0 };
            if let Some(light) = self.buttons[index].light_update(light, force) {
                self.out.cc(BUTTON_BASE + index as u8, light);
            }
        }
        self.sync_transport_lights(force);
    }
}
