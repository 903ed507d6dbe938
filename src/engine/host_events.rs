//! Host notification routing

use std::time::Instant;
use tracing::trace;

use super::Engine;
use crate::host::HostEvent;

impl Engine {
    /// Fold one host notification into the mirrored state
    pub fn on_host_event(&mut self, event: HostEvent, now: Instant) {
        let _entered = self.span.clone().entered();
        trace!("Host event {:?}", event);

        match event {
            HostEvent::TrackBankScrolled { bank, position } => {
                self.on_track_bank_scrolled(bank, position)
            }
            HostEvent::TrackCount { bank, count } => self.on_track_count(bank, count),
            HostEvent::Track { bank, slot, change } => self.on_track_event(bank, slot, change),
            HostEvent::MasterTrack(change) => self.on_master_track(change),
            HostEvent::CursorTrack(change) => self.on_cursor_track(change),
            HostEvent::CursorTrackPosition(position) => self.on_cursor_track_position(position),
            HostEvent::CursorSend { index, change } => self.on_cursor_send(index, change),
            HostEvent::CursorSendsScrolled(position) => self.on_cursor_sends_scrolled(position),
            HostEvent::SendCount(count) => self.on_send_count(count),
            HostEvent::SendNameBankScrolled(position) => {
                self.on_send_name_bank_scrolled(position)
            }
            HostEvent::SendNameSlot { slot, name } => self.on_send_name_slot(slot, name),
            HostEvent::MasterSelected(selected) => self.on_master_selected(selected),
            HostEvent::Transport(change) => self.on_transport_change(change),
            HostEvent::DeviceCount(count) => self.on_device_count(count),
            HostEvent::DeviceSlot { slot, change } => self.on_device_slot(slot, change),
            HostEvent::CursorDevice(change) => self.on_cursor_device(change, now),
            HostEvent::RemotePageCount(count) => self.on_remote_page_count(count),
            HostEvent::RemotePageSelected(page) => self.on_remote_page_selected(page, now),
            HostEvent::RemoteParameter { index, change } => {
                self.on_remote_parameter(index, change, now)
            }
            HostEvent::ParameterIds(ids) => self.on_parameter_ids(ids, now),
            HostEvent::ParameterName { id, name } => self.on_parameter_name(id, name),
            HostEvent::ParameterValue { id, value } => self.on_parameter_value(id, value),
            HostEvent::ParameterDisplay { id, text } => self.on_parameter_display(id, text, now),
        }
    }
}
