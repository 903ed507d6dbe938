//! Inbound MIDI routing

use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::Engine;
use crate::midi::{format_hex, MidiMessage};
use crate::protocol::inbound::{find_route, Command, InboundFrame};
use crate::protocol::{is_ping, outbound, SYSEX_START};
use crate::surface::CHANNEL;

impl Engine {
    /// Handle one MIDI message from the surface
    pub fn on_midi(&mut self, data: &[u8], now: Instant) {
        let _entered = self.span.clone().entered();

        if is_ping(data) {
            trace!("Ping");
            self.out.sysex_direct(outbound::ping_reply());
            return;
        }

        if data.first() == Some(&SYSEX_START) {
            self.on_sysex(data, now);
            return;
        }

        match MidiMessage::parse(data) {
            Some(MidiMessage::ControlChange { channel, cc, value }) if channel == CHANNEL => {
                self.on_control_change(cc, value, now);
            }
            Some(other) => trace!("Ignoring {:?}", other),
            None => debug!("Unparseable MIDI: {}", format_hex(data)),
        }
    }

    fn on_sysex(&mut self, data: &[u8], now: Instant) {
        let frame = match InboundFrame::parse(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame ({}): {}", e, format_hex(data));
                return;
            }
        };

        match Command::decode(&frame) {
            Ok(Some(command)) => {
                if let Some(route) = find_route(frame.command, frame.subcommand) {
                    debug!("← {} {:?}", route.name, command);
                }
                self.handle_command(command, now);
            }
            Ok(None) => debug!(
                "No route for {:02X} {:02X}",
                frame.command, frame.subcommand
            ),
            Err(e) => warn!("Dropping frame: {}", e),
        }
    }

    /// First enter-mode command opens the link
    fn ensure_initialized(&mut self) {
        if self.out.initialize() {
            info!("Surface link initialised");
        }
    }

    fn handle_command(&mut self, command: Command, now: Instant) {
        match command {
            Command::AliveRequest => self.out.sysex_direct(outbound::alive_reply()),
            Command::FirmwareVersion(version) => {
                info!("Surface firmware {}", version);
                self.firmware = Some(version);
            }
            Command::EnterTransportMode => {
                self.ensure_initialized();
                self.enter_transport_mode();
            }
            Command::EnterPluginMode { macro_flag } => {
                self.ensure_initialized();
                trace!("Plugin mode requested with macro flag {}", macro_flag);
                self.enter_plugin_mode();
            }
            Command::EnterMixerMode {
                side,
                knob_mode,
                button_mode,
                send_bank,
            } => {
                self.ensure_initialized();
                self.enter_mixer_mode(side, knob_mode, button_mode, send_bank, now);
            }
            Command::SetTrackFocusPage(page) => self.set_track_focus_page(page),
            Command::SetMasterFocus(side) => self.set_master_focus(side),
            Command::SetTrackOffset(position) => self.set_track_offset(position as i32),
            Command::SelectTrack(index) => self.select_track(index as i32),
            Command::ToggleGroupExpand(index) => self.toggle_group(index as i32),
            Command::RequestSendNames(page) => self.request_send_names(page as i32, now),
            Command::NavigateDeviceBank(first) => self.navigate_device_bank(first as i32),
            Command::SelectDevice(slot) => self.select_device(slot),
            Command::SetDeviceEnabled { slot, enabled } => self.set_device_enabled(slot, enabled),
            Command::LockDevice(locked) => self.lock_device(locked),
            Command::SelectRemotePage(page) => self.select_remote_page(page),
            Command::ToggleRemotePage => self.host(crate::host::HostCommand::ToggleRemoteSection),
            Command::SetLearnMode(on) => self.set_learn_mode(on),
            Command::ConfirmLearned {
                control_type,
                index,
            } => self.confirm_learned(control_type, index),
            Command::AssignParameter(request) => self.assign_parameter(request, now),
        }
    }
}
