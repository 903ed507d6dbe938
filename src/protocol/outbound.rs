//! Outbound message builders
//!
//! Payload bytes are masked to 7 bits so a builder can never emit a byte that
//! would terminate the frame early.

use super::codec::{encode_index, DisplayName, HashDigest};
use super::{general, mixer, plugin, CommandId, HEADER, SYSEX_END};

/// Incremental builder for one SysEx frame
#[derive(Debug, Clone)]
pub struct SysExBuilder {
    bytes: Vec<u8>,
}

impl SysExBuilder {
    pub fn new(command: CommandId, subcommand: u8) -> Self {
        let mut bytes = Vec::with_capacity(32);
        bytes.extend_from_slice(&HEADER);
        bytes.push(command.as_byte());
        bytes.push(subcommand & 0x7F);
        Self { bytes }
    }

    pub fn byte(mut self, value: u8) -> Self {
        self.bytes.push(value & 0x7F);
        self
    }

    pub fn bytes(mut self, values: &[u8]) -> Self {
        self.bytes.extend(values.iter().map(|b| b & 0x7F));
        self
    }

    pub fn flag(self, value: bool) -> Self {
        self.byte(u8::from(value))
    }

    /// Two-byte (high, low) index
    pub fn index(self, value: i32) -> Self {
        self.bytes(&encode_index(value))
    }

    pub fn name(self, name: &DisplayName) -> Self {
        self.bytes(name.as_bytes())
    }

    pub fn digest(self, digest: &HashDigest) -> Self {
        self.bytes(digest.as_bytes())
    }

    pub fn build(mut self) -> Vec<u8> {
        self.bytes.push(SYSEX_END);
        self.bytes
    }
}

fn general_cmd(sub: u8) -> SysExBuilder {
    SysExBuilder::new(CommandId::General, sub)
}

fn plugin_cmd(sub: u8) -> SysExBuilder {
    SysExBuilder::new(CommandId::Plugin, sub)
}

fn mixer_cmd(sub: u8) -> SysExBuilder {
    SysExBuilder::new(CommandId::Mixer, sub)
}

/// Handshake announcing the host side is up
pub fn daw_started() -> Vec<u8> {
    general_cmd(general::DAW_STARTED).build()
}

pub fn ping_reply() -> Vec<u8> {
    general_cmd(general::PING_REPLY).byte(general::PING).build()
}

pub fn alive_reply() -> Vec<u8> {
    general_cmd(general::ALIVE_REPLY).build()
}

/// General command with one value, clamped to 0..=127
pub fn general_value(sub: u8, value: i32) -> Vec<u8> {
    general_cmd(sub).byte(value.clamp(0, 0x7F) as u8).build()
}

/// General command with a two-byte index
pub fn general_index(sub: u8, value: i32) -> Vec<u8> {
    general_cmd(sub).index(value).build()
}

pub fn track_count(count: i32) -> Vec<u8> {
    general_index(general::TRACK_COUNT, count)
}

pub fn first_track(index: i32) -> Vec<u8> {
    general_index(general::FIRST_TRACK, index)
}

/// Name, palette color and group flag for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub index: i32,
    pub name: DisplayName,
    pub color: u8,
    pub is_group: bool,
}

pub fn track_detail(track: &TrackDescriptor) -> Vec<u8> {
    general_cmd(general::TRACK_DETAIL)
        .index(track.index)
        .name(&track.name)
        .byte(track.color)
        .flag(track.is_group)
        .build()
}

pub fn end_track_detail() -> Vec<u8> {
    general_cmd(general::END_TRACK_DETAIL).build()
}

/// Transport snapshot flags in wire order
pub fn transport_state(flags: &[bool; 8]) -> Vec<u8> {
    flags
        .iter()
        .fold(general_cmd(general::TRANSPORT_STATE), |b, &f| b.flag(f))
        .build()
}

/// Which kind of control a value readout belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlType {
    Knob = 0,
    Button = 1,
}

impl ControlType {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            ControlType::Knob
        } else {
            ControlType::Button
        }
    }
}

/// Transient value readout shown in place of a control label
pub fn value_display(control: ControlType, index: u8, text: &str) -> Vec<u8> {
    general_cmd(general::VALUE_DISPLAY)
        .byte(control as u8)
        .byte(index)
        .name(&DisplayName::full(text))
        .build()
}

/// Plugin command, sent only when the value fits in 7 bits
pub fn plugin_value(sub: u8, value: i32) -> Option<Vec<u8>> {
    (0..=0x7F)
        .contains(&value)
        .then(|| plugin_cmd(sub).byte(value as u8).build())
}

pub fn plugin_count(count: i32) -> Option<Vec<u8>> {
    plugin_value(plugin::PLUGIN_COUNT, count.min(0x7F))
}

pub fn first_plugin(index: i32) -> Option<Vec<u8>> {
    plugin_value(plugin::FIRST_PLUGIN, index)
}

/// One device slot as shown in the plugin list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub slot: u8,
    pub hash: HashDigest,
    pub enabled: bool,
    pub name: DisplayName,
    pub macro_mode: bool,
    pub pages: u8,
}

pub fn device_detail(device: &DeviceDescriptor) -> Vec<u8> {
    plugin_cmd(plugin::DEVICE_DETAIL)
        .byte(device.slot)
        .digest(&device.hash)
        .flag(device.enabled)
        .name(&device.name)
        .flag(device.macro_mode)
        .byte(device.pages)
        .build()
}

pub fn end_device_detail() -> Vec<u8> {
    plugin_cmd(plugin::END_DEVICE_DETAIL).build()
}

pub fn plugin_selected(slot: u8, page: u8, locked: bool) -> Vec<u8> {
    plugin_cmd(plugin::PLUGIN_SELECTED)
        .byte(slot)
        .byte(page)
        .flag(locked)
        .build()
}

/// Everything the surface needs to render a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedParameter {
    pub index: i32,
    pub hash: HashDigest,
    pub is_macro: bool,
    pub center_detent: bool,
    pub step_count: u8,
    pub value: f64,
    pub name: DisplayName,
    /// Inlined step labels, empty for continuous parameters
    pub labels: Vec<DisplayName>,
}

pub fn parameter_learned(param: &LearnedParameter) -> Vec<u8> {
    let position = crate::midi::convert::normalized_to_14bit(param.value) as i32;
    param
        .labels
        .iter()
        .fold(
            plugin_cmd(plugin::PARAMETER_LEARNED)
                .index(param.index)
                .digest(&param.hash)
                .flag(param.is_macro)
                .flag(param.center_detent)
                .byte(param.step_count)
                .index(position)
                .name(&param.name),
            |b, label| b.name(label),
        )
        .build()
}

pub fn unmap_parameter(index: u8) -> Vec<u8> {
    plugin_cmd(plugin::UNMAP_PARAMETER).byte(0x01).byte(index).build()
}

/// Rename of the parameter bound at `index` (zero based)
pub fn rename_parameter(index: u8, hash: &HashDigest, name: &DisplayName) -> Vec<u8> {
    plugin_cmd(plugin::RENAME_PARAMETER)
        .byte(0x00)
        .byte(index.saturating_add(1))
        .digest(hash)
        .name(name)
        .build()
}

/// Mixer command, value clamped to 0..=127
pub fn mixer_value(sub: u8, value: i32) -> Vec<u8> {
    mixer_cmd(sub).byte(value.clamp(0, 0x7F) as u8).build()
}

pub fn send_count(count: i32) -> Vec<u8> {
    mixer_value(mixer::SEND_COUNT, count)
}

pub fn selection(track: &TrackDescriptor) -> Vec<u8> {
    mixer_cmd(mixer::SELECTION)
        .index(track.index)
        .name(&track.name)
        .byte(track.color)
        .flag(track.is_group)
        .build()
}

/// Block of eight send names starting at `offset`
pub fn send_names(offset: u8, names: &[DisplayName; 8]) -> Vec<u8> {
    names
        .iter()
        .fold(mixer_cmd(mixer::SEND_NAMES).byte(offset), |b, n| b.name(n))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{to_hex_pairs, NAME_FIELD_LEN};

    #[test]
    fn test_handshake_frames() {
        assert_eq!(to_hex_pairs(&daw_started()), "F0 00 22 03 02 0A 01 F7");
        assert_eq!(to_hex_pairs(&ping_reply()), "F0 00 22 03 02 0A 03 02 F7");
        assert_eq!(to_hex_pairs(&alive_reply()), "F0 00 22 03 02 0A 0D F7");
    }

    #[test]
    fn test_general_value_clamps() {
        assert_eq!(general_value(0x04, 300)[7], 0x7F);
        assert_eq!(general_value(0x04, -3)[7], 0x00);
    }

    #[test]
    fn test_plugin_value_range() {
        assert!(plugin_value(plugin::FIRST_PLUGIN, 128).is_none());
        assert!(plugin_value(plugin::FIRST_PLUGIN, -1).is_none());
        assert_eq!(
            to_hex_pairs(&plugin_value(plugin::FIRST_PLUGIN, 8).unwrap()),
            "F0 00 22 03 02 0B 03 08 F7"
        );
        assert_eq!(plugin_count(400).unwrap()[7], 0x7F);
    }

    #[test]
    fn test_track_detail_layout() {
        let frame = track_detail(&TrackDescriptor {
            index: 130,
            name: DisplayName::label("Drums"),
            color: 12,
            is_group: true,
        });
        assert_eq!(&frame[5..9], &[0x0A, 0x07, 0x01, 0x02]);
        assert_eq!(&frame[9..14], b"Drums");
        assert_eq!(frame[9 + NAME_FIELD_LEN], 12);
        assert_eq!(frame[10 + NAME_FIELD_LEN], 1);
        assert_eq!(*frame.last().unwrap(), SYSEX_END);
        assert_eq!(frame.len(), 5 + 2 + 2 + NAME_FIELD_LEN + 2 + 1);
    }

    #[test]
    fn test_transport_state_order() {
        let frame = transport_state(&[true, false, true, false, false, false, false, true]);
        assert_eq!(&frame[5..], &[0x0A, 0x0B, 1, 0, 1, 0, 0, 0, 0, 1, 0xF7]);
    }

    #[test]
    fn test_parameter_learned_with_labels() {
        let hash = HashDigest::parameter("CONTENTS/mode");
        let frame = parameter_learned(&LearnedParameter {
            index: 3,
            hash: hash.clone(),
            is_macro: false,
            center_detent: false,
            step_count: 2,
            value: 1.0,
            name: DisplayName::label("Mode"),
            labels: vec![DisplayName::label("Off"), DisplayName::label("On")],
        });
        assert_eq!(&frame[5..9], &[0x0B, 0x0A, 0x00, 0x03]);
        assert_eq!(&frame[9..15], hash.as_bytes());
        assert_eq!(&frame[15..18], &[0, 0, 2]);
        assert_eq!(&frame[18..20], &[0x7F, 0x7F]);
        assert_eq!(frame.len(), 20 + NAME_FIELD_LEN * 3 + 1);
    }

    #[test]
    fn test_unmap_and_rename() {
        assert_eq!(&unmap_parameter(4)[5..], &[0x0B, 0x0E, 0x01, 0x04, 0xF7]);
        let hash = HashDigest::parameter("Macro 1");
        let frame = rename_parameter(0, &hash, &DisplayName::label("Cutoff"));
        assert_eq!(&frame[5..9], &[0x0B, 0x0F, 0x00, 0x01]);
    }

    #[test]
    fn test_send_names_block() {
        let names = [DisplayName::label("FX A"); 8];
        let frame = send_names(6, &names);
        assert_eq!(&frame[5..8], &[0x0C, 0x08, 0x06]);
        assert_eq!(frame.len(), 8 + 8 * NAME_FIELD_LEN + 1);
    }

    #[test]
    fn test_value_display_uses_full_width() {
        let frame = value_display(ControlType::Button, 2, "-12.5 dB");
        assert_eq!(&frame[5..9], &[0x0A, 0x0F, 0x01, 0x02]);
        assert_eq!(&frame[9..17], b"-12.5 dB");
    }
}
