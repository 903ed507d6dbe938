//! Roto-Control SysEx dialect
//!
//! Every message is `HEADER COMMAND SUBCOMMAND <payload> F7`. The command byte
//! selects one of three families (general, plugin, mixer); the subcommand the
//! operation inside it.

pub mod codec;
pub mod inbound;
pub mod outbound;

pub use codec::{DisplayName, HashDigest};
pub use inbound::{Command, DecodeError, InboundFrame};

/// SysEx start byte
pub const SYSEX_START: u8 = 0xF0;

/// SysEx end byte
pub const SYSEX_END: u8 = 0xF7;

/// Fixed prefix of every message (start byte plus manufacturer/device id)
pub const HEADER: [u8; 5] = [SYSEX_START, 0x00, 0x22, 0x03, 0x02];

/// Command families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    General = 0x0A,
    Plugin = 0x0B,
    Mixer = 0x0C,
}

impl CommandId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x0A => Some(CommandId::General),
            0x0B => Some(CommandId::Plugin),
            0x0C => Some(CommandId::Mixer),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// General subcommands
pub mod general {
    pub const DAW_STARTED: u8 = 0x01;
    pub const PING: u8 = 0x02;
    pub const PING_REPLY: u8 = 0x03;
    pub const TRACK_COUNT: u8 = 0x04;
    pub const FIRST_TRACK: u8 = 0x05;
    pub const SET_TRACK_OFFSET: u8 = 0x06;
    pub const TRACK_DETAIL: u8 = 0x07;
    pub const END_TRACK_DETAIL: u8 = 0x08;
    pub const SELECT_TRACK: u8 = 0x09;
    pub const TRANSPORT_MODE: u8 = 0x0A;
    pub const TRANSPORT_STATE: u8 = 0x0B;
    pub const ALIVE_REQUEST: u8 = 0x0C;
    pub const ALIVE_REPLY: u8 = 0x0D;
    pub const FIRMWARE_VERSION: u8 = 0x0E;
    pub const VALUE_DISPLAY: u8 = 0x0F;
}

/// Plugin subcommands
pub mod plugin {
    pub const PLUGIN_MODE: u8 = 0x01;
    pub const PLUGIN_COUNT: u8 = 0x02;
    pub const FIRST_PLUGIN: u8 = 0x03;
    pub const NAVIGATE_BANK: u8 = 0x04;
    pub const DEVICE_DETAIL: u8 = 0x05;
    pub const END_DEVICE_DETAIL: u8 = 0x06;
    pub const SELECT_DEVICE: u8 = 0x07;
    pub const PLUGIN_SELECTED: u8 = 0x08;
    pub const LEARN_MODE: u8 = 0x09;
    pub const PARAMETER_LEARNED: u8 = 0x0A;
    pub const ASSIGN_PARAMETER: u8 = 0x0B;
    pub const ENABLE_DEVICE: u8 = 0x0C;
    pub const LOCK_DEVICE: u8 = 0x0D;
    pub const UNMAP_PARAMETER: u8 = 0x0E;
    pub const RENAME_PARAMETER: u8 = 0x0F;
    pub const SELECT_REMOTE_PAGE: u8 = 0x10;
    pub const CONFIRM_LEARNED: u8 = 0x11;
    pub const TOGGLE_REMOTE_PAGE: u8 = 0x12;
}

/// Mixer subcommands
pub mod mixer {
    pub const MIXER_MODE: u8 = 0x01;
    pub const TRACK_FOCUS_PAGE: u8 = 0x02;
    pub const SEND_COUNT: u8 = 0x03;
    pub const SELECTION: u8 = 0x04;
    pub const MASTER_FOCUS: u8 = 0x05;
    pub const TOGGLE_GROUP: u8 = 0x06;
    pub const REQUEST_SEND_NAMES: u8 = 0x07;
    pub const SEND_NAMES: u8 = 0x08;
}

/// Raw ping as sent by the surface
pub const PING_FRAME: [u8; 8] = [
    SYSEX_START,
    0x00,
    0x22,
    0x03,
    0x02,
    0x0A,
    general::PING,
    SYSEX_END,
];

/// Returns true if `data` is exactly the surface keepalive ping
pub fn is_ping(data: &[u8]) -> bool {
    data == PING_FRAME
}
