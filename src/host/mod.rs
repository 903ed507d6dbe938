//! Host application boundary
//!
//! The engine never talks to the host directly. It queues [`HostCommand`]s
//! and reacts to [`HostEvent`]s; a [`HostModel`] turns one into the other.
//! Bank slots are always addressed relative to the bank's current window.

pub mod console;

pub use console::ConsoleHost;

use crate::palette::Rgb;

/// Scrollable track banks mirrored by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackBank {
    /// Regular tracks
    Main,
    /// Effect (return) tracks
    Effect,
}

/// A track as the engine addresses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackRef {
    /// Slot in the main bank window
    Main(u8),
    /// Slot in the effect bank window
    Effect(u8),
    Master,
    Cursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixerParam {
    Volume,
    Pan,
    /// Absolute send index
    Send(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MixerTarget {
    pub track: TrackRef,
    pub param: MixerParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackToggle {
    Mute,
    Solo,
    Arm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportAction {
    Play,
    Stop,
    ToggleRecord,
    ToggleOverdub,
    ToggleLoop,
    TogglePunchIn,
    TogglePunchOut,
    ResetAutomationOverrides,
    Rewind,
    FastForward,
}

/// Requests from the engine to the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Set a device parameter by its full path
    SetParameter { path: String, value: f64 },
    SetMixerValue { target: MixerTarget, value: f64 },
    TouchMixerValue { target: MixerTarget, touched: bool },
    ToggleTrack { track: TrackRef, toggle: TrackToggle },
    SelectTrack(TrackRef),
    ScrollTrackBank { bank: TrackBank, position: i32 },
    /// Scroll the cursor track's send window
    ScrollCursorSends { position: i32 },
    /// Scroll the eight-wide effect name bank
    ScrollSendNameBank { position: i32 },
    ToggleGroupExpanded(TrackRef),
    Transport(TransportAction),
    SelectDevice { slot: u8 },
    SetDeviceEnabled { slot: u8, enabled: bool },
    ScrollDeviceBank { position: i32 },
    SetDevicePinned(bool),
    SetTrackPinned(bool),
    SelectRemotePage(u8),
    ToggleRemoteSection,
    SetRemoteParameter { index: u8, value: f64 },
    TouchRemoteParameter { index: u8, touched: bool },
    /// Replace the set of parameter ids whose display text is reported
    ObserveParameterDisplays(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackChange {
    Exists(bool),
    Name(String),
    Color(Option<Rgb>),
    Group(bool),
    Volume(f64),
    Pan(f64),
    Send { index: u8, value: f64 },
    Mute(bool),
    Solo(bool),
    Arm(bool),
}

/// Change of one send of the cursor track
#[derive(Debug, Clone, PartialEq)]
pub enum SendChange {
    Exists(bool),
    Name(String),
    Value(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportChange {
    Playing(bool),
    Recording(bool),
    Overdub(bool),
    Loop(bool),
    PunchIn(bool),
    PunchOut(bool),
    AutomationOverride(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceChange {
    Exists(bool),
    Enabled(bool),
    Name(String),
    IsPlugin(bool),
    RemotesVisible(bool),
    Pages(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorDeviceChange {
    Exists(bool),
    Enabled(bool),
    Name(String),
    IsPlugin(bool),
    HasLayers(bool),
    RemotesVisible(bool),
    /// Absolute position in the device chain, -1 when none
    Position(i32),
    Pinned(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    Exists(bool),
    Name(String),
    Value(f64),
    Display(String),
    /// Discrete value count, -1 for continuous
    Steps(i32),
    Origin(f64),
}

/// Notifications from the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    TrackBankScrolled { bank: TrackBank, position: i32 },
    TrackCount { bank: TrackBank, count: i32 },
    Track { bank: TrackBank, slot: u8, change: TrackChange },
    MasterTrack(TrackChange),
    CursorTrack(TrackChange),
    CursorTrackPosition(i32),
    /// Send of the cursor track, by absolute send index
    CursorSend { index: u8, change: SendChange },
    CursorSendsScrolled(i32),
    SendCount(i32),
    SendNameBankScrolled(i32),
    SendNameSlot { slot: u8, name: Option<String> },
    MasterSelected(bool),
    Transport(TransportChange),
    DeviceCount(i32),
    DeviceSlot { slot: u8, change: DeviceChange },
    CursorDevice(CursorDeviceChange),
    RemotePageCount(i32),
    RemotePageSelected(i32),
    RemoteParameter { index: u8, change: RemoteChange },
    /// Full parameter path list of the cursor device
    ParameterIds(Vec<String>),
    ParameterName { id: String, name: String },
    ParameterValue { id: String, value: f64 },
    ParameterDisplay { id: String, text: String },
}

/// A host the engine can be attached to
pub trait HostModel: Send {
    fn name(&self) -> &str;

    /// Execute a command and return the notifications it causes
    fn apply(&mut self, command: &HostCommand) -> Vec<HostEvent>;

    /// Notifications describing the complete current state
    fn snapshot(&self) -> Vec<HostEvent>;
}
