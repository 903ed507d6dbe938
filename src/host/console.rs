//! Console host - a simulated host that logs every command
//!
//! Useful for:
//! - Driving the surface without a running host application
//! - Debugging the command flow from the engine
//! - Engine tests that need realistic host echoes

use tracing::{debug, info};

use super::{
    CursorDeviceChange, DeviceChange, HostCommand, HostEvent, HostModel, MixerParam, RemoteChange,
    SendChange, TrackBank, TrackChange, TrackRef, TrackToggle, TransportAction, TransportChange,
};
use crate::config::HostConfig;
use crate::palette::Rgb;
use crate::registry::last_segment;

const BANK_SIZE: usize = 8;
const REMOTE_PAGE_SIZE: usize = 8;

const TRACK_COLORS: [Rgb; 6] = [
    Rgb(217, 46, 36),
    Rgb(255, 163, 0),
    Rgb(115, 152, 20),
    Rgb(0, 153, 217),
    Rgb(149, 73, 203),
    Rgb(163, 163, 163),
];

#[derive(Debug, Clone)]
struct SimTrack {
    name: String,
    color: Rgb,
    is_group: bool,
    expanded: bool,
    volume: f64,
    pan: f64,
    sends: Vec<f64>,
    mute: bool,
    solo: bool,
    arm: bool,
}

impl SimTrack {
    fn new(name: String, color: Rgb, send_count: usize) -> Self {
        Self {
            name,
            color,
            is_group: false,
            expanded: true,
            volume: 0.75,
            pan: 0.5,
            sends: vec![0.0; send_count],
            mute: false,
            solo: false,
            arm: false,
        }
    }

    fn changes(&self) -> Vec<TrackChange> {
        let mut changes = vec![
            TrackChange::Exists(true),
            TrackChange::Name(self.name.clone()),
            TrackChange::Color(Some(self.color)),
            TrackChange::Group(self.is_group),
            TrackChange::Volume(self.volume),
            TrackChange::Pan(self.pan),
        ];
        changes.extend(self.sends.iter().enumerate().map(|(index, &value)| TrackChange::Send {
            index: index as u8,
            value,
        }));
        changes.extend([
            TrackChange::Mute(self.mute),
            TrackChange::Solo(self.solo),
            TrackChange::Arm(self.arm),
        ]);
        changes
    }

    fn missing() -> Vec<TrackChange> {
        vec![TrackChange::Exists(false), TrackChange::Name(String::new())]
    }
}

#[derive(Debug, Clone)]
struct SimParameter {
    path: String,
    name: String,
    value: f64,
    /// 0 = continuous
    steps: u8,
}

impl SimParameter {
    fn set(&mut self, value: f64) {
        let value = value.clamp(0.0, 1.0);
        self.value = if self.steps > 1 {
            let last = (self.steps - 1) as f64;
            (value * last).round() / last
        } else {
            value
        };
    }

    fn display(&self) -> String {
        if self.steps > 1 {
            let step = (self.value * (self.steps - 1) as f64).round() as u32;
            format!("Mode {}", step + 1)
        } else {
            format!("{:.1} %", self.value * 100.0)
        }
    }
}

#[derive(Debug, Clone)]
struct SimDevice {
    name: String,
    is_plugin: bool,
    enabled: bool,
    params: Vec<SimParameter>,
}

impl SimDevice {
    fn page_count(&self) -> usize {
        self.params.len().div_ceil(REMOTE_PAGE_SIZE)
    }
}

/// Absolute track location inside the simulated project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Main(usize),
    Effect(usize),
    Master,
}

#[derive(Debug, Default, Clone, Copy)]
struct TransportFlags {
    playing: bool,
    recording: bool,
    overdub: bool,
    looping: bool,
    punch_in: bool,
    punch_out: bool,
    automation_override: bool,
}

/// Simulated host with a track list, effect tracks and one device chain
pub struct ConsoleHost {
    name: String,
    tracks: Vec<SimTrack>,
    effects: Vec<SimTrack>,
    master: SimTrack,
    main_position: usize,
    effect_position: usize,
    cursor_track: Option<Location>,
    cursor_send_position: usize,
    send_name_position: usize,
    transport: TransportFlags,
    devices: Vec<SimDevice>,
    device_position: usize,
    cursor_device: Option<usize>,
    device_pinned: bool,
    track_pinned: bool,
    remotes_visible: bool,
    remote_page: usize,
    observed: Vec<String>,
    execution_count: u64,
}

impl ConsoleHost {
    pub fn new(config: &HostConfig) -> Self {
        let color = |i: usize| TRACK_COLORS[i % TRACK_COLORS.len()];
        let effects: Vec<SimTrack> = (0..config.effect_tracks)
            .map(|i| SimTrack::new(format!("FX {}", (b'A' + (i % 26) as u8) as char), color(i + 3), 0))
            .collect();
        let tracks = (0..config.tracks)
            .map(|i| SimTrack::new(format!("Track {}", i + 1), color(i), effects.len()))
            .collect();
        let devices: Vec<SimDevice> = config
            .devices
            .iter()
            .map(|d| SimDevice {
                name: d.name.clone(),
                is_plugin: d.plugin,
                enabled: true,
                params: (0..d.parameters)
                    .map(|i| SimParameter {
                        path: format!("CONTENTS/{}_P{}", d.name.replace(' ', "_"), i + 1),
                        name: format!("Param {}", i + 1),
                        value: 0.0,
                        steps: if i % 4 == 3 { 4 } else { 0 },
                    })
                    .collect(),
            })
            .collect();

        info!(
            "🔌 ConsoleHost '{}' created ({} tracks, {} effect tracks, {} devices)",
            config.name,
            config.tracks,
            config.effect_tracks,
            devices.len()
        );

        Self {
            name: config.name.clone(),
            cursor_track: (config.tracks > 0).then_some(Location::Main(0)),
            cursor_device: (!devices.is_empty()).then_some(0),
            tracks,
            effects,
            master: SimTrack::new("Master".to_string(), Rgb(128, 128, 128), 0),
            main_position: 0,
            effect_position: 0,
            cursor_send_position: 0,
            send_name_position: 0,
            transport: TransportFlags::default(),
            devices,
            device_position: 0,
            device_pinned: false,
            track_pinned: false,
            remotes_visible: false,
            remote_page: 0,
            observed: Vec::new(),
            execution_count: 0,
        }
    }

    /// Number of commands executed so far
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    fn resolve(&self, track: TrackRef) -> Option<Location> {
        let location = match track {
            TrackRef::Main(slot) => Location::Main(self.main_position + slot as usize),
            TrackRef::Effect(slot) => Location::Effect(self.effect_position + slot as usize),
            TrackRef::Master => Location::Master,
            TrackRef::Cursor => self.cursor_track?,
        };
        self.track(location).map(|_| location)
    }

    fn track(&self, location: Location) -> Option<&SimTrack> {
        match location {
            Location::Main(i) => self.tracks.get(i),
            Location::Effect(i) => self.effects.get(i),
            Location::Master => Some(&self.master),
        }
    }

    fn track_mut(&mut self, location: Location) -> Option<&mut SimTrack> {
        match location {
            Location::Main(i) => self.tracks.get_mut(i),
            Location::Effect(i) => self.effects.get_mut(i),
            Location::Master => Some(&mut self.master),
        }
    }

    /// Notifications for a change of the track at `location`
    fn location_events(&self, location: Location, change: TrackChange) -> Vec<HostEvent> {
        let mut events = Vec::new();
        let in_window = |index: usize, position: usize| {
            (position..position + BANK_SIZE)
                .contains(&index)
                .then(|| (index - position) as u8)
        };
        match location {
            Location::Main(i) => {
                if let Some(slot) = in_window(i, self.main_position) {
                    events.push(HostEvent::Track {
                        bank: TrackBank::Main,
                        slot,
                        change: change.clone(),
                    });
                }
            }
            Location::Effect(i) => {
                if let Some(slot) = in_window(i, self.effect_position) {
                    events.push(HostEvent::Track {
                        bank: TrackBank::Effect,
                        slot,
                        change: change.clone(),
                    });
                }
            }
            Location::Master => events.push(HostEvent::MasterTrack(change.clone())),
        }
        if self.cursor_track == Some(location) {
            match change {
                TrackChange::Send { index, value } => events.push(HostEvent::CursorSend {
                    index,
                    change: SendChange::Value(value),
                }),
                other => events.push(HostEvent::CursorTrack(other)),
            }
        }
        events
    }

    fn bank_events(&self, bank: TrackBank) -> Vec<HostEvent> {
        let (tracks, position) = match bank {
            TrackBank::Main => (&self.tracks, self.main_position),
            TrackBank::Effect => (&self.effects, self.effect_position),
        };
        let mut events = vec![HostEvent::TrackBankScrolled {
            bank,
            position: position as i32,
        }];
        for slot in 0..BANK_SIZE {
            let changes = match tracks.get(position + slot) {
                Some(track) => track.changes(),
                None => SimTrack::missing(),
            };
            events.extend(changes.into_iter().map(|change| HostEvent::Track {
                bank,
                slot: slot as u8,
                change,
            }));
        }
        events
    }

    fn cursor_position(&self) -> i32 {
        match self.cursor_track {
            Some(Location::Main(i)) => i as i32,
            Some(Location::Effect(i)) => (self.tracks.len() + i) as i32,
            Some(Location::Master) => (self.tracks.len() + self.effects.len()) as i32,
            None => -1,
        }
    }

    fn cursor_track_events(&self) -> Vec<HostEvent> {
        let mut events = vec![HostEvent::CursorTrackPosition(self.cursor_position())];
        let Some(track) = self.cursor_track.and_then(|l| self.track(l)) else {
            events.push(HostEvent::CursorTrack(TrackChange::Exists(false)));
            return events;
        };
        events.extend(
            track
                .changes()
                .into_iter()
                .filter(|c| !matches!(c, TrackChange::Send { .. }))
                .map(HostEvent::CursorTrack),
        );
        for (index, effect) in self.effects.iter().enumerate() {
            let index = index as u8;
            let exists = (index as usize) < track.sends.len();
            events.push(HostEvent::CursorSend {
                index,
                change: SendChange::Exists(exists),
            });
            events.push(HostEvent::CursorSend {
                index,
                change: SendChange::Name(effect.name.clone()),
            });
            if let Some(&value) = track.sends.get(index as usize) {
                events.push(HostEvent::CursorSend {
                    index,
                    change: SendChange::Value(value),
                });
            }
        }
        events.push(HostEvent::MasterSelected(
            self.cursor_track == Some(Location::Master),
        ));
        events
    }

    fn send_name_events(&self) -> Vec<HostEvent> {
        let mut events = vec![HostEvent::SendNameBankScrolled(self.send_name_position as i32)];
        events.extend((0..BANK_SIZE).map(|slot| HostEvent::SendNameSlot {
            slot: slot as u8,
            name: self
                .effects
                .get(self.send_name_position + slot)
                .map(|t| t.name.clone()),
        }));
        events
    }

    fn transport_events(&self) -> Vec<HostEvent> {
        let t = self.transport;
        [
            TransportChange::Playing(t.playing),
            TransportChange::Recording(t.recording),
            TransportChange::Overdub(t.overdub),
            TransportChange::Loop(t.looping),
            TransportChange::PunchIn(t.punch_in),
            TransportChange::PunchOut(t.punch_out),
            TransportChange::AutomationOverride(t.automation_override),
        ]
        .into_iter()
        .map(HostEvent::Transport)
        .collect()
    }

    fn device_slot_events(&self) -> Vec<HostEvent> {
        let mut events = vec![HostEvent::DeviceCount(self.devices.len() as i32)];
        for slot in 0..BANK_SIZE {
            let index = self.device_position + slot;
            let slot = slot as u8;
            let changes = match self.devices.get(index) {
                Some(device) => vec![
                    DeviceChange::Exists(true),
                    DeviceChange::Enabled(device.enabled),
                    DeviceChange::IsPlugin(device.is_plugin),
                    DeviceChange::Name(device.name.clone()),
                    DeviceChange::RemotesVisible(
                        self.remotes_visible && self.cursor_device == Some(index),
                    ),
                    DeviceChange::Pages(device.page_count().min(0x7F) as u8),
                ],
                None => vec![DeviceChange::Exists(false), DeviceChange::Name(String::new())],
            };
            events.extend(
                changes
                    .into_iter()
                    .map(|change| HostEvent::DeviceSlot { slot, change }),
            );
        }
        events
    }

    fn cursor_device_events(&self) -> Vec<HostEvent> {
        let Some(device) = self.cursor_device.and_then(|i| self.devices.get(i)) else {
            return vec![
                HostEvent::CursorDevice(CursorDeviceChange::Exists(false)),
                HostEvent::CursorDevice(CursorDeviceChange::Name(String::new())),
                HostEvent::CursorDevice(CursorDeviceChange::Position(-1)),
            ];
        };
        let mut events: Vec<HostEvent> = [
            CursorDeviceChange::Exists(true),
            CursorDeviceChange::IsPlugin(device.is_plugin),
            CursorDeviceChange::Enabled(device.enabled),
            CursorDeviceChange::HasLayers(false),
            CursorDeviceChange::Name(device.name.clone()),
            CursorDeviceChange::Position(self.cursor_device.map_or(-1, |i| i as i32)),
            CursorDeviceChange::RemotesVisible(self.remotes_visible),
            CursorDeviceChange::Pinned(self.device_pinned),
        ]
        .into_iter()
        .map(HostEvent::CursorDevice)
        .collect();

        events.push(HostEvent::ParameterIds(
            device.params.iter().map(|p| p.path.clone()).collect(),
        ));
        for param in &device.params {
            events.push(HostEvent::ParameterName {
                id: param.path.clone(),
                name: param.name.clone(),
            });
            events.push(HostEvent::ParameterValue {
                id: param.path.clone(),
                value: param.value,
            });
        }
        events.push(HostEvent::RemotePageCount(device.page_count() as i32));
        events.extend(self.remote_page_events());
        events
    }

    fn remote_page_events(&self) -> Vec<HostEvent> {
        let mut events = vec![HostEvent::RemotePageSelected(self.remote_page as i32)];
        let params = self
            .cursor_device
            .and_then(|i| self.devices.get(i))
            .map(|d| d.params.as_slice())
            .unwrap_or_default();
        for index in 0..REMOTE_PAGE_SIZE {
            let changes = match params.get(self.remote_page * REMOTE_PAGE_SIZE + index) {
                Some(param) => vec![
                    RemoteChange::Exists(true),
                    RemoteChange::Name(param.name.clone()),
                    RemoteChange::Steps(if param.steps > 1 { param.steps as i32 } else { -1 }),
                    RemoteChange::Origin(0.0),
                    RemoteChange::Value(param.value),
                    RemoteChange::Display(param.display()),
                ],
                None => vec![RemoteChange::Exists(false)],
            };
            let index = index as u8;
            events.extend(
                changes
                    .into_iter()
                    .map(|change| HostEvent::RemoteParameter { index, change }),
            );
        }
        events
    }

    fn is_observed(&self, path: &str) -> bool {
        let pid = last_segment(path);
        self.observed.iter().any(|o| last_segment(o) == pid)
    }

    /// Set a parameter of the cursor device by list index
    fn set_parameter(&mut self, index: usize, value: f64) -> Vec<HostEvent> {
        let remote_page = self.remote_page;
        let Some(param) = self
            .cursor_device
            .and_then(|i| self.devices.get_mut(i))
            .and_then(|d| d.params.get_mut(index))
        else {
            return Vec::new();
        };
        param.set(value);
        let param = param.clone();

        let mut events = vec![HostEvent::ParameterValue {
            id: param.path.clone(),
            value: param.value,
        }];
        if self.is_observed(&param.path) {
            events.push(HostEvent::ParameterDisplay {
                id: param.path.clone(),
                text: param.display(),
            });
        }
        if index / REMOTE_PAGE_SIZE == remote_page {
            let remote = (index % REMOTE_PAGE_SIZE) as u8;
            events.push(HostEvent::RemoteParameter {
                index: remote,
                change: RemoteChange::Value(param.value),
            });
            events.push(HostEvent::RemoteParameter {
                index: remote,
                change: RemoteChange::Display(param.display()),
            });
        }
        events
    }

    fn parameter_index(&self, path: &str) -> Option<usize> {
        let pid = last_segment(path);
        self.cursor_device
            .and_then(|i| self.devices.get(i))?
            .params
            .iter()
            .position(|p| last_segment(&p.path) == pid)
    }

    fn transport(&mut self, action: TransportAction) -> Vec<HostEvent> {
        let t = &mut self.transport;
        let change = match action {
            TransportAction::Play => {
                t.playing = true;
                TransportChange::Playing(true)
            }
            TransportAction::Stop => {
                t.playing = false;
                TransportChange::Playing(false)
            }
            TransportAction::ToggleRecord => {
                t.recording = !t.recording;
                TransportChange::Recording(t.recording)
            }
            TransportAction::ToggleOverdub => {
                t.overdub = !t.overdub;
                TransportChange::Overdub(t.overdub)
            }
            TransportAction::ToggleLoop => {
                t.looping = !t.looping;
                TransportChange::Loop(t.looping)
            }
            TransportAction::TogglePunchIn => {
                t.punch_in = !t.punch_in;
                TransportChange::PunchIn(t.punch_in)
            }
            TransportAction::TogglePunchOut => {
                t.punch_out = !t.punch_out;
                TransportChange::PunchOut(t.punch_out)
            }
            TransportAction::ResetAutomationOverrides => {
                t.automation_override = false;
                TransportChange::AutomationOverride(false)
            }
            TransportAction::Rewind | TransportAction::FastForward => return Vec::new(),
        };
        vec![HostEvent::Transport(change)]
    }

    fn execute(&mut self, command: &HostCommand) -> Vec<HostEvent> {
        match command {
            HostCommand::SetParameter { path, value } => match self.parameter_index(path) {
                Some(index) => self.set_parameter(index, *value),
                None => Vec::new(),
            },
            HostCommand::SetRemoteParameter { index, value } => {
                self.set_parameter(self.remote_page * REMOTE_PAGE_SIZE + *index as usize, *value)
            }
            HostCommand::SetMixerValue { target, value } => {
                let Some(location) = self.resolve(target.track) else {
                    return Vec::new();
                };
                let value = value.clamp(0.0, 1.0);
                let Some(track) = self.track_mut(location) else {
                    return Vec::new();
                };
                let change = match target.param {
                    MixerParam::Volume => {
                        track.volume = value;
                        TrackChange::Volume(value)
                    }
                    MixerParam::Pan => {
                        track.pan = value;
                        TrackChange::Pan(value)
                    }
                    MixerParam::Send(index) => match track.sends.get_mut(index as usize) {
                        Some(send) => {
                            *send = value;
                            TrackChange::Send { index, value }
                        }
                        None => return Vec::new(),
                    },
                };
                self.location_events(location, change)
            }
            HostCommand::ToggleTrack { track, toggle } => {
                let Some(location) = self.resolve(*track) else {
                    return Vec::new();
                };
                let Some(track) = self.track_mut(location) else {
                    return Vec::new();
                };
                let change = match toggle {
                    TrackToggle::Mute => {
                        track.mute = !track.mute;
                        TrackChange::Mute(track.mute)
                    }
                    TrackToggle::Solo => {
                        track.solo = !track.solo;
                        TrackChange::Solo(track.solo)
                    }
                    TrackToggle::Arm => {
                        track.arm = !track.arm;
                        TrackChange::Arm(track.arm)
                    }
                };
                self.location_events(location, change)
            }
            HostCommand::SelectTrack(track) => match self.resolve(*track) {
                Some(location) => {
                    self.cursor_track = Some(location);
                    self.cursor_track_events()
                }
                None => Vec::new(),
            },
            HostCommand::ScrollTrackBank { bank, position } => {
                let len = match bank {
                    TrackBank::Main => self.tracks.len(),
                    TrackBank::Effect => self.effects.len(),
                };
                let position = (*position).clamp(0, len.saturating_sub(1) as i32) as usize;
                match bank {
                    TrackBank::Main => self.main_position = position,
                    TrackBank::Effect => self.effect_position = position,
                }
                self.bank_events(*bank)
            }
            HostCommand::ScrollCursorSends { position } => {
                self.cursor_send_position = (*position).max(0) as usize;
                vec![HostEvent::CursorSendsScrolled(self.cursor_send_position as i32)]
            }
            HostCommand::ScrollSendNameBank { position } => {
                self.send_name_position =
                    (*position).clamp(0, self.effects.len().saturating_sub(1) as i32) as usize;
                self.send_name_events()
            }
            HostCommand::ToggleGroupExpanded(track) => {
                if let Some(track) = self.resolve(*track).and_then(|l| self.track_mut(l)) {
                    if track.is_group {
                        track.expanded = !track.expanded;
                    }
                }
                Vec::new()
            }
            HostCommand::Transport(action) => self.transport(*action),
            HostCommand::SelectDevice { slot } => {
                let index = self.device_position + *slot as usize;
                if index >= self.devices.len() {
                    return Vec::new();
                }
                self.cursor_device = Some(index);
                self.remote_page = 0;
                let mut events = self.cursor_device_events();
                events.extend(self.device_slot_events());
                events
            }
            HostCommand::SetDeviceEnabled { slot, enabled } => {
                let index = self.device_position + *slot as usize;
                let Some(device) = self.devices.get_mut(index) else {
                    return Vec::new();
                };
                device.enabled = *enabled;
                let mut events = vec![HostEvent::DeviceSlot {
                    slot: *slot,
                    change: DeviceChange::Enabled(*enabled),
                }];
                if self.cursor_device == Some(index) {
                    events.push(HostEvent::CursorDevice(CursorDeviceChange::Enabled(*enabled)));
                }
                events
            }
            HostCommand::ScrollDeviceBank { position } => {
                self.device_position = (*position).max(0) as usize;
                self.device_slot_events()
            }
            HostCommand::SetDevicePinned(pinned) => {
                self.device_pinned = *pinned;
                vec![HostEvent::CursorDevice(CursorDeviceChange::Pinned(*pinned))]
            }
            HostCommand::SetTrackPinned(pinned) => {
                self.track_pinned = *pinned;
                Vec::new()
            }
            HostCommand::SelectRemotePage(page) => {
                let pages = self
                    .cursor_device
                    .and_then(|i| self.devices.get(i))
                    .map_or(0, SimDevice::page_count);
                if (*page as usize) < pages {
                    self.remote_page = *page as usize;
                    self.remote_page_events()
                } else {
                    Vec::new()
                }
            }
            HostCommand::ToggleRemoteSection => {
                self.remotes_visible = !self.remotes_visible;
                let mut events = vec![HostEvent::CursorDevice(CursorDeviceChange::RemotesVisible(
                    self.remotes_visible,
                ))];
                events.extend(self.device_slot_events());
                events
            }
            HostCommand::ObserveParameterDisplays(ids) => {
                self.observed = ids.clone();
                let Some(device) = self.cursor_device.and_then(|i| self.devices.get(i)) else {
                    return Vec::new();
                };
                device
                    .params
                    .iter()
                    .filter(|p| self.is_observed(&p.path))
                    .map(|p| HostEvent::ParameterDisplay {
                        id: p.path.clone(),
                        text: p.display(),
                    })
                    .collect()
            }
            HostCommand::TouchMixerValue { .. } | HostCommand::TouchRemoteParameter { .. } => {
                Vec::new()
            }
        }
    }
}

impl HostModel for ConsoleHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, command: &HostCommand) -> Vec<HostEvent> {
        self.execution_count += 1;
        let exec_num = self.execution_count;

        info!(
            "🎛️  [{}] Host '{}' → {:?} [exec #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            command,
            exec_num
        );

        let events = self.execute(command);

        debug!(
            host = self.name,
            command = ?command,
            events = events.len(),
            exec_count = exec_num,
            "ConsoleHost execution"
        );

        events
    }

    fn snapshot(&self) -> Vec<HostEvent> {
        info!("🔄 ConsoleHost '{}' sending full state", self.name);

        let mut events = vec![
            HostEvent::TrackCount {
                bank: TrackBank::Main,
                count: self.tracks.len() as i32,
            },
            HostEvent::TrackCount {
                bank: TrackBank::Effect,
                count: self.effects.len() as i32,
            },
            HostEvent::SendCount(self.effects.len() as i32),
        ];
        events.extend(self.bank_events(TrackBank::Main));
        events.extend(self.bank_events(TrackBank::Effect));
        events.extend(self.master.changes().into_iter().map(HostEvent::MasterTrack));
        events.push(HostEvent::CursorSendsScrolled(self.cursor_send_position as i32));
        events.extend(self.cursor_track_events());
        events.extend(self.send_name_events());
        events.extend(self.transport_events());
        events.extend(self.device_slot_events());
        events.extend(self.cursor_device_events());
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatedDevice;
    use crate::host::MixerTarget;

    fn host() -> ConsoleHost {
        ConsoleHost::new(&HostConfig {
            name: "test".to_string(),
            tracks: 10,
            effect_tracks: 2,
            devices: vec![
                SimulatedDevice {
                    name: "Diva".to_string(),
                    plugin: true,
                    parameters: 12,
                },
                SimulatedDevice {
                    name: "EQ+".to_string(),
                    plugin: false,
                    parameters: 8,
                },
            ],
        })
    }

    #[test]
    fn test_snapshot_describes_banks_and_devices() {
        let events = host().snapshot();
        assert!(events.contains(&HostEvent::TrackCount {
            bank: TrackBank::Main,
            count: 10
        }));
        assert!(events.contains(&HostEvent::SendCount(2)));
        assert!(events.contains(&HostEvent::CursorDevice(CursorDeviceChange::Name(
            "Diva".to_string()
        ))));
        assert!(events.contains(&HostEvent::RemotePageCount(2)));
        let ids = events.iter().find_map(|e| match e {
            HostEvent::ParameterIds(ids) => Some(ids.clone()),
            _ => None,
        });
        assert_eq!(ids.map(|ids| ids.len()), Some(12));
    }

    #[test]
    fn test_mixer_value_echoes_to_bank_and_cursor() {
        let mut host = host();
        let events = host.apply(&HostCommand::SetMixerValue {
            target: MixerTarget {
                track: TrackRef::Main(0),
                param: MixerParam::Volume,
            },
            value: 0.25,
        });
        assert_eq!(
            events,
            vec![
                HostEvent::Track {
                    bank: TrackBank::Main,
                    slot: 0,
                    change: TrackChange::Volume(0.25)
                },
                HostEvent::CursorTrack(TrackChange::Volume(0.25)),
            ]
        );
        assert_eq!(host.execution_count(), 1);
    }

    #[test]
    fn test_scroll_clamps_to_track_list() {
        let mut host = host();
        let events = host.apply(&HostCommand::ScrollTrackBank {
            bank: TrackBank::Main,
            position: 40,
        });
        assert_eq!(
            events[0],
            HostEvent::TrackBankScrolled {
                bank: TrackBank::Main,
                position: 9
            }
        );
        assert!(events.contains(&HostEvent::Track {
            bank: TrackBank::Main,
            slot: 1,
            change: TrackChange::Exists(false)
        }));
    }

    #[test]
    fn test_stepped_parameter_is_quantized() {
        let mut host = host();
        let events = host.apply(&HostCommand::SetParameter {
            path: "CONTENTS/ROOT_GENERIC_MODULE/Diva_P4".to_string(),
            value: 0.4,
        });
        let value = events.iter().find_map(|e| match e {
            HostEvent::ParameterValue { value, .. } => Some(*value),
            _ => None,
        });
        assert_eq!(value, Some(1.0 / 3.0));
    }

    #[test]
    fn test_display_only_for_observed_parameters() {
        let mut host = host();
        let set = HostCommand::SetParameter {
            path: "CONTENTS/Diva_P1".to_string(),
            value: 0.5,
        };
        let has_display = |events: &[HostEvent]| {
            events
                .iter()
                .any(|e| matches!(e, HostEvent::ParameterDisplay { .. }))
        };
        assert!(!has_display(&host.apply(&set)));

        let observed = host.apply(&HostCommand::ObserveParameterDisplays(vec![
            "CONTENTS/ROOT_GENERIC_MODULE/Diva_P1".to_string(),
        ]));
        assert_eq!(observed.len(), 1);
        assert!(has_display(&host.apply(&set)));
    }

    #[test]
    fn test_select_device_switches_parameters() {
        let mut host = host();
        let events = host.apply(&HostCommand::SelectDevice { slot: 1 });
        assert!(events.contains(&HostEvent::CursorDevice(CursorDeviceChange::Position(1))));
        assert!(events.contains(&HostEvent::RemotePageCount(1)));
        assert!(host.apply(&HostCommand::SelectDevice { slot: 5 }).is_empty());
    }

    #[test]
    fn test_remote_page_bounds() {
        let mut host = host();
        let events = host.apply(&HostCommand::SelectRemotePage(1));
        assert_eq!(events[0], HostEvent::RemotePageSelected(1));
        assert!(events.contains(&HostEvent::RemoteParameter {
            index: 4,
            change: RemoteChange::Exists(false)
        }));
        assert!(host.apply(&HostCommand::SelectRemotePage(2)).is_empty());
    }

    #[test]
    fn test_transport_toggles() {
        let mut host = host();
        assert_eq!(
            host.apply(&HostCommand::Transport(TransportAction::ToggleLoop)),
            vec![HostEvent::Transport(TransportChange::Loop(true))]
        );
        assert!(host
            .apply(&HostCommand::Transport(TransportAction::Rewind))
            .is_empty());
    }
}
