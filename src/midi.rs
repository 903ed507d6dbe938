//! MIDI utilities and message types
//!
//! Provides the small subset of MIDI the surface speaks (channel CC and SysEx),
//! 14-bit value conversions and hex formatting for logs.

use std::fmt;

/// MIDI message types understood on the surface link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// System Exclusive: bytes between 0xF0 and 0xF7 (exclusive)
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    ///
    /// SysEx without the terminating 0xF7 is rejected.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        match status {
            0xB0..=0xBF => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::ControlChange {
                    channel: status & 0x0F,
                    cc: data[1] & 0x7F,
                    value: data[2] & 0x7F,
                })
            }
            0xF0 => {
                let end = data.iter().position(|&b| b == 0xF7)?;
                Some(MidiMessage::SysEx {
                    data: data[1..end].to_vec(),
                })
            }
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::SysEx { ref data } => {
                let mut result = Vec::with_capacity(data.len() + 2);
                result.push(0xF0);
                result.extend_from_slice(data);
                result.push(0xF7);
                result
            }
        }
    }

    /// Get the channel for channel messages (0-15), None for SysEx
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::ControlChange { channel, .. } => Some(channel),
            MidiMessage::SysEx { .. } => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::SysEx { ref data } => {
                write!(f, "SysEx {} bytes", data.len())
            }
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Largest 14-bit value
    pub const MAX_14BIT: u16 = 0x3FFF;

    /// Split a 14-bit value into (high, low) 7-bit bytes
    pub fn split14(value: u16) -> (u8, u8) {
        let value = value.min(MAX_14BIT);
        (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
    }

    /// Recombine (high, low) 7-bit bytes into a 14-bit value
    pub fn join14(high: u8, low: u8) -> u16 {
        ((low & 0x7F) as u16) | (((high & 0x7F) as u16) << 7)
    }

    /// Convert a normalized value (0.0-1.0) to 14 bits, rounding to nearest
    pub fn normalized_to_14bit(value: f64) -> u16 {
        (value.clamp(0.0, 1.0) * MAX_14BIT as f64).round() as u16
    }

    /// Convert a 14-bit value to a normalized value (0.0-1.0)
    pub fn normalized_from_14bit(value: u16) -> f64 {
        (value.min(MAX_14BIT) as f64 / MAX_14BIT as f64).min(1.0)
    }

    /// Convert a 7-bit value to a normalized value (0.0-1.0)
    pub fn normalized_from_7bit(value: u8) -> f64 {
        (value & 0x7F) as f64 / 127.0
    }

    /// Convert a normalized value (0.0-1.0) to 7 bits, rounding to nearest
    pub fn normalized_to_7bit(value: f64) -> u8 {
        (value.clamp(0.0, 1.0) * 127.0).round() as u8
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_control_change() {
        let data = vec![0xBF, 0x0C, 100];
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(
            msg,
            MidiMessage::ControlChange {
                channel: 15,
                cc: 0x0C,
                value: 100,
            }
        );
        assert_eq!(msg.encode(), data);
    }

    #[test]
    fn test_sysex_requires_terminator() {
        assert!(MidiMessage::parse(&[0xF0, 0x00, 0x22, 0x03]).is_none());

        let msg = MidiMessage::parse(&[0xF0, 0x00, 0x22, 0xF7]).unwrap();
        assert_eq!(msg, MidiMessage::SysEx { data: vec![0x00, 0x22] });
        assert_eq!(msg.channel(), None);
    }

    #[test]
    fn test_other_status_ignored() {
        assert!(MidiMessage::parse(&[0x90, 60, 100]).is_none());
        assert!(MidiMessage::parse(&[]).is_none());
    }

    #[test]
    fn test_split14() {
        assert_eq!(convert::split14(0), (0, 0));
        assert_eq!(convert::split14(8192), (64, 0));
        assert_eq!(convert::split14(16383), (127, 127));
        assert_eq!(convert::split14(40000), (127, 127));
    }

    #[test]
    fn test_normalized_conversions() {
        assert_eq!(convert::normalized_to_14bit(0.0), 0);
        assert_eq!(convert::normalized_to_14bit(1.0), 16383);
        assert_eq!(convert::normalized_to_14bit(0.5), 8192);
        assert_eq!(convert::normalized_from_14bit(16383), 1.0);
        assert_eq!(convert::normalized_to_7bit(1.0), 127);
        assert_eq!(convert::normalized_from_7bit(0), 0.0);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xF0, 0x0A, 0xF7]), "F0 0A F7");
    }

    proptest! {
        #[test]
        fn join14_inverts_split14(value in 0u16..=16383) {
            let (high, low) = convert::split14(value);
            prop_assert!(high <= 0x7F && low <= 0x7F);
            prop_assert_eq!(convert::join14(high, low), value);
        }
    }
}
