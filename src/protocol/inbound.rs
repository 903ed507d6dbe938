//! Inbound frame decoding and the command route table
//!
//! A frame is validated (header, terminator), stripped of its header and then
//! looked up by `(command, subcommand)` in [`ROUTES`]. Pairs missing from the
//! table decode to `None` and are ignored by the caller.

use std::fmt;
use thiserror::Error;

use super::codec::{decode_index, parse_hex_text, HashDigest, PARAMETER_HASH_LEN};
use super::outbound::ControlType;
use super::{general, mixer, plugin, CommandId, HEADER, SYSEX_END};

/// Errors raised while decoding an inbound frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame does not end with F7")]
    Unterminated,

    #[error("frame does not carry the surface header")]
    ForeignHeader,

    #[error("{route} needs {needed} payload bytes, got {got}")]
    Truncated {
        route: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("invalid hex text: {0}")]
    InvalidHex(String),
}

/// A validated frame with the header and terminator removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub command: u8,
    pub subcommand: u8,
    pub payload: Vec<u8>,
}

impl InboundFrame {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.last() != Some(&SYSEX_END) {
            return Err(DecodeError::Unterminated);
        }
        if data.len() < HEADER.len() + 3 || data[..HEADER.len()] != HEADER {
            return Err(DecodeError::ForeignHeader);
        }
        let body = &data[HEADER.len()..data.len() - 1];
        Ok(Self {
            command: body[0],
            subcommand: body[1],
            payload: body[2..].to_vec(),
        })
    }

    /// Parse the hex-text form some hosts deliver SysEx in
    pub fn parse_hex(text: &str) -> Result<Self, DecodeError> {
        Self::parse(&parse_hex_text(text)?)
    }

    fn need(&self, route: &'static str, needed: usize) -> Result<&[u8], DecodeError> {
        if self.payload.len() < needed {
            return Err(DecodeError::Truncated {
                route,
                needed,
                got: self.payload.len(),
            });
        }
        Ok(&self.payload)
    }
}

/// Surface request to bind a control to the parameter with `hash`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRequest {
    pub index: u16,
    pub hash: HashDigest,
    pub control_type: ControlType,
    pub slot: u8,
    pub is_macro: bool,
}

/// Firmware version as reported by the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: String,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{} ({})", self.major, self.minor, self.patch, self.build)
    }
}

/// Decoded inbound commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetTrackOffset(u16),
    SelectTrack(u16),
    EnterTransportMode,
    AliveRequest,
    FirmwareVersion(FirmwareVersion),
    EnterPluginMode {
        macro_flag: u8,
    },
    NavigateDeviceBank(u8),
    SelectDevice(u8),
    SetLearnMode(bool),
    AssignParameter(ParameterRequest),
    SetDeviceEnabled {
        slot: u8,
        enabled: bool,
    },
    LockDevice(bool),
    SelectRemotePage(u8),
    ConfirmLearned {
        control_type: ControlType,
        index: u8,
    },
    ToggleRemotePage,
    EnterMixerMode {
        side: u8,
        knob_mode: u8,
        button_mode: u8,
        send_bank: u8,
    },
    SetTrackFocusPage(u8),
    SetMasterFocus(u8),
    ToggleGroupExpand(u16),
    RequestSendNames(u8),
}

/// One entry of the route table
pub struct Route {
    pub command: CommandId,
    pub subcommand: u8,
    pub name: &'static str,
    decode: fn(&InboundFrame) -> Result<Command, DecodeError>,
}

macro_rules! route {
    ($cmd:expr, $sub:expr, $name:literal, $decode:expr) => {
        Route {
            command: $cmd,
            subcommand: $sub,
            name: $name,
            decode: $decode,
        }
    };
}

/// Fixed `(command, subcommand)` route table
pub static ROUTES: &[Route] = &[
    route!(CommandId::General, general::SET_TRACK_OFFSET, "set-track-offset", |f| {
        let p = f.need("set-track-offset", 2)?;
        Ok(Command::SetTrackOffset(decode_index(p[0], p[1])))
    }),
    route!(CommandId::General, general::SELECT_TRACK, "select-track", |f| {
        let p = f.need("select-track", 2)?;
        Ok(Command::SelectTrack(decode_index(p[0], p[1])))
    }),
    route!(CommandId::General, general::TRANSPORT_MODE, "transport-mode", |_| {
        Ok(Command::EnterTransportMode)
    }),
    route!(CommandId::General, general::ALIVE_REQUEST, "alive-request", |_| {
        Ok(Command::AliveRequest)
    }),
    route!(CommandId::General, general::FIRMWARE_VERSION, "firmware-version", |f| {
        let p = f.need("firmware-version", 3)?;
        let build = p[3..]
            .iter()
            .take(7)
            .take_while(|&&b| b != 0)
            .map(|&b| (b & 0x7F) as char)
            .collect();
        Ok(Command::FirmwareVersion(FirmwareVersion {
            major: p[0],
            minor: p[1],
            patch: p[2],
            build,
        }))
    }),
    route!(CommandId::Plugin, plugin::PLUGIN_MODE, "plugin-mode", |f| {
        let p = f.need("plugin-mode", 1)?;
        Ok(Command::EnterPluginMode { macro_flag: p[0] })
    }),
    route!(CommandId::Plugin, plugin::NAVIGATE_BANK, "navigate-device-bank", |f| {
        let p = f.need("navigate-device-bank", 1)?;
        Ok(Command::NavigateDeviceBank(p[0]))
    }),
    route!(CommandId::Plugin, plugin::SELECT_DEVICE, "select-device", |f| {
        let p = f.need("select-device", 1)?;
        Ok(Command::SelectDevice(p[0]))
    }),
    route!(CommandId::Plugin, plugin::LEARN_MODE, "learn-mode", |f| {
        let p = f.need("learn-mode", 1)?;
        Ok(Command::SetLearnMode(p[0] > 0))
    }),
    route!(CommandId::Plugin, plugin::ASSIGN_PARAMETER, "assign-parameter", |f| {
        let p = f.need("assign-parameter", 2 + PARAMETER_HASH_LEN + 3)?;
        let tail = 2 + PARAMETER_HASH_LEN;
        Ok(Command::AssignParameter(ParameterRequest {
            index: decode_index(p[0], p[1]),
            hash: HashDigest::from_bytes(&p[2..tail]),
            control_type: ControlType::from_byte(p[tail]),
            slot: p[tail + 1],
            is_macro: p[tail + 2] == 1,
        }))
    }),
    route!(CommandId::Plugin, plugin::ENABLE_DEVICE, "enable-device", |f| {
        let p = f.need("enable-device", 2)?;
        Ok(Command::SetDeviceEnabled {
            slot: p[0],
            enabled: p[1] == 1,
        })
    }),
    route!(CommandId::Plugin, plugin::LOCK_DEVICE, "lock-device", |f| {
        let p = f.need("lock-device", 1)?;
        Ok(Command::LockDevice(p[0] == 1))
    }),
    route!(CommandId::Plugin, plugin::SELECT_REMOTE_PAGE, "select-remote-page", |f| {
        let p = f.need("select-remote-page", 1)?;
        Ok(Command::SelectRemotePage(p[0]))
    }),
    route!(CommandId::Plugin, plugin::CONFIRM_LEARNED, "confirm-learned", |f| {
        let p = f.need("confirm-learned", 2)?;
        Ok(Command::ConfirmLearned {
            control_type: ControlType::from_byte(p[0]),
            index: p[1],
        })
    }),
    route!(CommandId::Plugin, plugin::TOGGLE_REMOTE_PAGE, "toggle-remote-page", |_| {
        Ok(Command::ToggleRemotePage)
    }),
    route!(CommandId::Mixer, mixer::MIXER_MODE, "mixer-mode", |f| {
        let p = f.need("mixer-mode", 4)?;
        Ok(Command::EnterMixerMode {
            side: p[0],
            knob_mode: p[1],
            button_mode: p[2],
            send_bank: p[3],
        })
    }),
    route!(CommandId::Mixer, mixer::TRACK_FOCUS_PAGE, "track-focus-page", |f| {
        let p = f.need("track-focus-page", 1)?;
        Ok(Command::SetTrackFocusPage(p[0]))
    }),
    route!(CommandId::Mixer, mixer::MASTER_FOCUS, "master-focus", |f| {
        let p = f.need("master-focus", 1)?;
        Ok(Command::SetMasterFocus(p[0]))
    }),
    route!(CommandId::Mixer, mixer::TOGGLE_GROUP, "toggle-group", |f| {
        let p = f.need("toggle-group", 2)?;
        Ok(Command::ToggleGroupExpand(decode_index(p[0], p[1])))
    }),
    route!(CommandId::Mixer, mixer::REQUEST_SEND_NAMES, "request-send-names", |f| {
        let p = f.need("request-send-names", 1)?;
        Ok(Command::RequestSendNames(p[0]))
    }),
];

/// Find the route for a `(command, subcommand)` pair
pub fn find_route(command: u8, subcommand: u8) -> Option<&'static Route> {
    let command = CommandId::from_byte(command)?;
    ROUTES
        .iter()
        .find(|r| r.command == command && r.subcommand == subcommand)
}

impl Command {
    /// Decode a frame; `Ok(None)` for pairs with no route
    pub fn decode(frame: &InboundFrame) -> Result<Option<Command>, DecodeError> {
        match find_route(frame.command, frame.subcommand) {
            Some(route) => (route.decode)(frame).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_hex(text: &str) -> Result<Option<Command>, DecodeError> {
        Command::decode(&InboundFrame::parse_hex(text)?)
    }

    #[test]
    fn test_unterminated_frame_rejected() {
        assert_eq!(
            InboundFrame::parse_hex("f0002203020a0900"),
            Err(DecodeError::Unterminated)
        );
    }

    #[test]
    fn test_foreign_header_rejected() {
        assert_eq!(
            InboundFrame::parse_hex("f0000066140a0100f7"),
            Err(DecodeError::ForeignHeader)
        );
    }

    #[test]
    fn test_header_stripped() {
        let frame = InboundFrame::parse_hex("F0 00 22 03 02 0C 02 01 F7").unwrap();
        assert_eq!(frame.command, 0x0C);
        assert_eq!(frame.subcommand, 0x02);
        assert_eq!(frame.payload, vec![0x01]);
    }

    #[test]
    fn test_select_track_index() {
        assert_eq!(
            decode_hex("f0002203020a090102f7").unwrap(),
            Some(Command::SelectTrack(130))
        );
    }

    #[test]
    fn test_mixer_mode_fields() {
        assert_eq!(
            decode_hex("f0002203020c0101000200f7").unwrap(),
            Some(Command::EnterMixerMode {
                side: 1,
                knob_mode: 0,
                button_mode: 2,
                send_bank: 0,
            })
        );
    }

    #[test]
    fn test_assign_parameter_layout() {
        let hash = HashDigest::parameter("CONTENTS/cutoff");
        let mut bytes = vec![0xF0, 0x00, 0x22, 0x03, 0x02, 0x0B, 0x0B, 0x00, 0x05];
        bytes.extend_from_slice(hash.as_bytes());
        bytes.extend_from_slice(&[0x01, 0x03, 0x00, 0xF7]);
        let frame = InboundFrame::parse(&bytes).unwrap();
        assert_eq!(
            Command::decode(&frame).unwrap(),
            Some(Command::AssignParameter(ParameterRequest {
                index: 5,
                hash,
                control_type: ControlType::Button,
                slot: 3,
                is_macro: false,
            }))
        );
    }

    #[test]
    fn test_truncated_payload_is_error() {
        assert!(matches!(
            decode_hex("f0002203020c0100f7"),
            Err(DecodeError::Truncated { route: "mixer-mode", needed: 4, got: 1 })
        ));
    }

    #[test]
    fn test_unknown_pairs_ignored() {
        assert_eq!(decode_hex("f0002203020b7f00f7").unwrap(), None);
        assert_eq!(decode_hex("f0002203025501f7").unwrap(), None);
    }

    #[test]
    fn test_firmware_version() {
        let cmd = decode_hex("f0002203020a0e0102036231323334353600f7")
            .unwrap()
            .unwrap();
        match cmd {
            Command::FirmwareVersion(v) => {
                assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
                assert_eq!(v.build, "b123456");
                assert_eq!(v.to_string(), "1.2.3 (b123456)");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_route_names_unique() {
        let mut names: Vec<_> = ROUTES.iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ROUTES.len());
    }
}
