//! Engine scenarios driven through the console host

use std::time::{Duration, Instant};
use tracing::Span;

use super::Engine;
use crate::config::{EngineConfig, HostConfig};
use crate::host::{ConsoleHost, HostCommand, HostEvent, HostModel, TransportAction};
use crate::mode::{ButtonLayer, KnobLayer, KnobMode, LayerId};
use crate::protocol::codec::parse_hex_text;
use crate::protocol::{general, mixer, plugin, CommandId, HashDigest, PING_FRAME};
use crate::scheduler::UpdateType;

const CC_STATUS: u8 = 0xBF;

struct Rig {
    engine: Engine,
    host: ConsoleHost,
    now: Instant,
    /// Every host command applied so far
    commands: Vec<HostCommand>,
}

impl Rig {
    fn new() -> Self {
        let mut engine = Engine::new(EngineConfig::default(), Span::none());
        let host = ConsoleHost::new(&HostConfig::default());
        let now = Instant::now();
        engine.start();
        engine.on_host_events(host.snapshot(), now);
        engine.take_outgoing();
        Self {
            engine,
            host,
            now,
            commands: Vec::new(),
        }
    }

    /// Feed a hex frame from the surface and let the host answer
    fn surface(&mut self, hex: &str) {
        let bytes = parse_hex_text(hex).unwrap();
        self.engine.on_midi(&bytes, self.now);
        self.pump();
    }

    fn cc(&mut self, cc: u8, value: u8) {
        self.engine.on_midi(&[CC_STATUS, cc, value], self.now);
        self.pump();
    }

    fn pump(&mut self) {
        loop {
            let commands = self.engine.take_host_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                let events = self.host.apply(&command);
                self.commands.push(command);
                self.engine.on_host_events(events, self.now);
            }
        }
    }

    fn tick(&mut self) {
        self.engine.tick(self.now);
        self.pump();
    }

    fn advance(&mut self, by: Duration) {
        self.now += by;
        self.tick();
    }

    fn sent(&mut self) -> Vec<Vec<u8>> {
        self.engine.take_outgoing()
    }

    /// Change a parameter on the host side, as if the user turned it there
    fn set_parameter(&mut self, path: &str, value: f64) {
        let events = self.host.apply(&HostCommand::SetParameter {
            path: path.to_string(),
            value,
        });
        self.engine.on_host_events(events, self.now);
        self.pump();
    }

    fn parameter_value(&self, pid: &str) -> f64 {
        self.engine
            .registry()
            .active()
            .and_then(|s| s.parameter(pid))
            .map(|p| p.normalized_value)
            .unwrap()
    }

    fn is_learned(&self, pid: &str) -> bool {
        self.engine
            .registry()
            .active()
            .and_then(|s| s.parameter(pid))
            .map(|p| p.learned)
            .unwrap()
    }

    fn last_set_parameter(&self) -> Option<(String, f64)> {
        self.commands.iter().rev().find_map(|c| match c {
            HostCommand::SetParameter { path, value } => Some((path.clone(), *value)),
            _ => None,
        })
    }

    fn assign(&mut self, path: &str, index: u16, control: u8, slot: u8) {
        let hash = HashDigest::parameter(path);
        let mut bytes = vec![0xF0, 0x00, 0x22, 0x03, 0x02, 0x0B, plugin::ASSIGN_PARAMETER];
        bytes.extend_from_slice(&[(index >> 7) as u8, (index & 0x7F) as u8]);
        bytes.extend_from_slice(hash.as_bytes());
        bytes.extend_from_slice(&[control, slot, 0x00, 0xF7]);
        self.engine.on_midi(&bytes, self.now);
        self.pump();
    }
}

fn count_frames(frames: &[Vec<u8>], command: CommandId, sub: u8) -> usize {
    frames
        .iter()
        .filter(|f| f.len() > 7 && f[5] == command.as_byte() && f[6] == sub)
        .count()
}

fn layer_counts(layers: &[LayerId]) -> (usize, usize) {
    let knobs = layers
        .iter()
        .filter(|l| matches!(l, LayerId::Knob(_)))
        .count();
    (knobs, layers.len() - knobs)
}

#[test]
fn test_ping_answered_before_link_opens() {
    let mut rig = Rig::new();
    rig.engine.on_midi(&PING_FRAME, rig.now);
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::General, general::PING_REPLY), 1);
    assert!(!rig.engine.is_initialized());
}

#[test]
fn test_alive_and_firmware() {
    let mut rig = Rig::new();
    rig.surface("f0002203020a0cf7");
    let sent = rig.sent();
    assert_eq!(sent, vec![crate::protocol::outbound::alive_reply()]);

    rig.surface("f0002203020a0e0102036231323334353600f7");
    let firmware = rig.engine.firmware().unwrap();
    assert_eq!((firmware.major, firmware.minor, firmware.patch), (1, 2, 3));
}

#[test]
fn test_malformed_frames_change_nothing() {
    let mut rig = Rig::new();
    rig.surface("f0002203020c0100");
    rig.surface("f0002203020c0100f7");
    rig.tick();
    assert!(!rig.engine.is_initialized());
    assert!(rig.sent().is_empty());
    assert!(rig.commands.is_empty());
}

#[test]
fn test_nothing_flushed_before_first_mode() {
    let mut rig = Rig::new();
    rig.tick();
    assert!(rig.sent().is_empty());
    assert_eq!(rig.engine.flush_count(UpdateType::MixerMain), 0);

    rig.surface("f0002203020c0100000000f7");
    rig.tick();
    let sent = rig.sent();
    assert!(rig.engine.is_initialized());
    assert_eq!(count_frames(&sent, CommandId::General, general::END_TRACK_DETAIL), 1);
}

#[test]
fn test_volume_burst_flushes_main_view_once() {
    let mut rig = Rig::new();
    rig.surface("f0002203020c0100000000f7");
    rig.tick();
    assert_eq!(rig.engine.flush_count(UpdateType::MixerMain), 1);
    rig.sent();

    for low in [0x10, 0x20, 0x30] {
        rig.cc(0x0C, 0x40);
        rig.cc(0x2C, low);
    }
    rig.tick();

    assert_eq!(rig.engine.flush_count(UpdateType::MixerMain), 2);
    assert_eq!(rig.engine.flush_count(UpdateType::MixerMaster), 0);
    let volume_sets = rig
        .commands
        .iter()
        .filter(|c| matches!(c, HostCommand::SetMixerValue { .. }))
        .count();
    assert_eq!(volume_sets, 3);
    // Track content did not change, so no track block goes out again
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::General, general::TRACK_DETAIL), 0);
}

#[test]
fn test_two_mode_changes_in_one_tick() {
    let mut rig = Rig::new();
    rig.surface("f0002203020c0100000000f7");
    rig.surface("f0002203020b0100f7");
    rig.tick();

    let mode = rig.engine.mode();
    assert!(mode.in_plugin_mode);
    assert_eq!(mode.knob_mode, KnobMode::Plugin);
    assert_eq!(rig.engine.flush_count(UpdateType::UpdateControls), 1);
    assert_eq!(
        rig.engine.active_layers(),
        vec![
            LayerId::Knob(KnobLayer::Plugin),
            LayerId::Button(ButtonLayer::PluginButtons)
        ]
    );
}

#[test]
fn test_one_knob_and_one_button_layer_in_every_mode() {
    let mut rig = Rig::new();
    let modes = [
        "f0002203020c0100000000f7",
        "f0002203020c0101010100f7",
        "f0002203020c0102020203f7",
        "f0002203020a0af7",
        "f0002203020c0202f7",
        "f0002203020b0100f7",
        "f0002203020c0501f7",
        "f0002203020c0200f7",
    ];
    for hex in modes {
        rig.surface(hex);
        rig.tick();
        assert_eq!(layer_counts(&rig.engine.active_layers()), (1, 1), "{}", hex);
    }
}

#[test]
fn test_bank_flush_waits_for_scroll() {
    let mut rig = Rig::new();
    rig.surface("f0002203020c0100000000f7");
    rig.tick();
    let flushed = rig.engine.flush_count(UpdateType::MixerMain);
    rig.sent();

    // Host has not answered the scroll yet
    let offset = parse_hex_text("f0002203020a060008f7").unwrap();
    rig.engine.on_midi(&offset, rig.now);
    rig.engine.tick(rig.now);
    rig.engine.tick(rig.now);
    assert_eq!(rig.engine.flush_count(UpdateType::MixerMain), flushed);

    rig.pump();
    rig.tick();
    assert_eq!(rig.engine.flush_count(UpdateType::MixerMain), flushed + 1);
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::General, general::FIRST_TRACK), 1);
}

#[test]
fn test_focus_page_switches_send_window() {
    let mut rig = Rig::new();
    rig.surface("f0002203020c0100040000f7");
    rig.tick();
    assert_eq!(rig.engine.mode().knob_mode, KnobMode::FocusTrack);
    rig.sent();

    rig.surface("f0002203020c0201f7");
    rig.tick();
    assert_eq!(rig.engine.mode().knob_mode, KnobMode::FocusTrackPage1);
    assert_eq!(
        rig.engine.active_layers()[0],
        LayerId::Knob(KnobLayer::FocusTrackPage1)
    );
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::Mixer, mixer::SEND_COUNT), 1);
    assert_eq!(count_frames(&sent, CommandId::Mixer, mixer::SEND_NAMES), 1);
}

#[test]
fn test_assignment_sends_learned_descriptor() {
    let mut rig = Rig::new();
    rig.surface("f0002203020b0100f7");
    rig.tick();
    rig.sent();

    rig.assign("CONTENTS/Diva_P1", 0, 0, 0);
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::Plugin, plugin::PARAMETER_LEARNED), 1);

    // Unknown hash once the list is known leaves the control unbound
    rig.assign("CONTENTS/Nope", 1, 0, 1);
    assert!(rig.sent().is_empty());
}

#[test]
fn test_assignment_before_parameter_list_is_replayed() {
    let mut engine = Engine::new(EngineConfig::default(), Span::none());
    let now = Instant::now();
    engine.on_midi(&parse_hex_text("f0002203020b0100f7").unwrap(), now);
    engine.on_host_events(
        [
            HostEvent::CursorDevice(crate::host::CursorDeviceChange::IsPlugin(true)),
            HostEvent::CursorDevice(crate::host::CursorDeviceChange::Name("Diva".into())),
        ],
        now,
    );
    engine.take_outgoing();

    let hash = HashDigest::parameter("CONTENTS/Diva_P2");
    let mut bytes = vec![0xF0, 0x00, 0x22, 0x03, 0x02, 0x0B, plugin::ASSIGN_PARAMETER, 0, 1];
    bytes.extend_from_slice(hash.as_bytes());
    bytes.extend_from_slice(&[0x00, 0x02, 0x00, 0xF7]);
    engine.on_midi(&bytes, now);
    let set = engine.registry().active().unwrap();
    assert_eq!(set.stashed_requests().len(), 1);
    assert!(engine.take_outgoing().is_empty());

    let ids = (1..=4).map(|i| format!("CONTENTS/Diva_P{}", i)).collect();
    engine.on_host_event(HostEvent::ParameterIds(ids), now);
    let sent = engine.take_outgoing();
    assert_eq!(count_frames(&sent, CommandId::Plugin, plugin::PARAMETER_LEARNED), 1);
    assert!(engine.registry().active().unwrap().stashed_requests().is_empty());

    // Observation is re-subscribed once the batch settles
    engine.tick(now + Duration::from_millis(250));
    let observe = engine.take_host_commands().into_iter().find_map(|c| match c {
        HostCommand::ObserveParameterDisplays(ids) => Some(ids),
        _ => None,
    });
    assert_eq!(
        observe,
        Some(vec![
            "CONTENTS/ROOT_GENERIC_MODULE/Diva_P2".to_string(),
            "CONTENTS/Diva_P2".to_string()
        ])
    );
}

#[test]
fn test_learn_sweep_classifies_stepped_parameter() {
    let mut rig = Rig::new();
    rig.set_parameter("CONTENTS/Diva_P4", 0.5);
    let start = rig.parameter_value("Diva_P4");
    assert!(start > 0.0);

    rig.surface("f0002203020b0100f7");
    rig.surface("f0002203020b0901f7");
    rig.tick();
    rig.sent();

    rig.assign("CONTENTS/Diva_P4", 3, 0, 0);
    for _ in 0..60 {
        rig.advance(Duration::from_millis(30));
    }

    let param = rig
        .engine
        .registry()
        .active()
        .and_then(|s| s.parameter("Diva_P4"))
        .unwrap();
    assert!(param.learned);
    assert_eq!(param.step_count, 4);
    assert_eq!(param.labels, vec!["Mode 1", "Mode 2", "Mode 3", "Mode 4"]);
    assert_eq!(param.normalized_value, start);

    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::Plugin, plugin::PARAMETER_LEARNED), 1);
    assert_eq!(
        rig.last_set_parameter(),
        Some(("CONTENTS/Diva_P4".to_string(), start))
    );
}

#[test]
fn test_leaving_learn_mode_restores_swept_parameter() {
    let mut rig = Rig::new();
    rig.set_parameter("CONTENTS/Diva_P4", 0.5);
    let start = rig.parameter_value("Diva_P4");

    rig.surface("f0002203020b0100f7");
    rig.surface("f0002203020b0901f7");
    rig.tick();
    rig.assign("CONTENTS/Diva_P4", 3, 0, 0);
    for _ in 0..10 {
        rig.advance(Duration::from_millis(30));
    }
    assert_ne!(rig.last_set_parameter().map(|(_, v)| v), Some(start));

    rig.surface("f0002203020b0900f7");
    for _ in 0..5 {
        rig.advance(Duration::from_millis(30));
    }
    assert_eq!(
        rig.last_set_parameter(),
        Some(("CONTENTS/Diva_P4".to_string(), start))
    );
    assert_eq!(rig.parameter_value("Diva_P4"), start);
    assert!(!rig.is_learned("Diva_P4"));
}

#[test]
fn test_confirm_learned_clears_flags_silently() {
    let mut rig = Rig::new();
    rig.surface("f0002203020b0100f7");
    rig.surface("f0002203020b0901f7");
    rig.tick();
    rig.assign("CONTENTS/Diva_P4", 3, 0, 0);
    for _ in 0..60 {
        rig.advance(Duration::from_millis(30));
    }
    assert!(rig.is_learned("Diva_P4"));
    rig.sent();

    rig.surface("f0002203020b110000f7");
    assert!(rig.sent().is_empty());
    assert!(!rig.is_learned("Diva_P4"));
}

#[test]
fn test_macro_mode_keeps_device_chain() {
    let mut rig = Rig::new();
    rig.surface("f0002203020b0100f7");
    rig.tick();
    rig.sent();

    rig.surface("f0002203020b12f7");
    assert_eq!(rig.engine.mode().knob_mode, KnobMode::Macro);
    rig.tick();
    let sent = rig.sent();
    let plugin_frames = |sub: u8| -> Vec<&Vec<u8>> {
        sent.iter()
            .filter(|f| f.len() > 7 && f[5] == CommandId::Plugin.as_byte() && f[6] == sub)
            .collect()
    };

    let count = plugin_frames(plugin::PLUGIN_COUNT);
    assert_eq!(count.len(), 1);
    assert_eq!(count[0][7], 2);

    let details = plugin_frames(plugin::DEVICE_DETAIL);
    assert_eq!(details.len(), 2);
    assert_eq!(details[0][7], 0);
    assert_eq!(
        &details[0][8..16],
        HashDigest::device("MIMacroDefaultDevice").as_bytes()
    );
    assert_eq!(details[1][7], 1);
    assert_eq!(&details[1][8..16], HashDigest::device("EQ+").as_bytes());

    let selected = plugin_frames(plugin::PLUGIN_SELECTED);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0][7], 0);
}

#[test]
fn test_value_readout_then_label_reset() {
    let mut rig = Rig::new();
    rig.surface("f0002203020b0100f7");
    rig.tick();
    rig.assign("CONTENTS/Diva_P1", 0, 0, 0);
    rig.advance(Duration::from_millis(250));
    rig.sent();

    rig.cc(0x0C, 0x40);
    rig.cc(0x2C, 0x00);
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::General, general::VALUE_DISPLAY), 1);

    rig.advance(Duration::from_millis(500));
    assert_eq!(count_frames(&rig.sent(), CommandId::Plugin, plugin::RENAME_PARAMETER), 0);
    rig.advance(Duration::from_millis(600));
    assert_eq!(count_frames(&rig.sent(), CommandId::Plugin, plugin::RENAME_PARAMETER), 1);
}

#[test]
fn test_button_readout_keeps_showing() {
    let mut rig = Rig::new();
    rig.surface("f0002203020b0100f7");
    rig.tick();
    rig.assign("CONTENTS/Diva_P1", 0, 1, 0);
    rig.advance(Duration::from_millis(250));
    rig.sent();

    rig.cc(0x14, 0x7F);
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::General, general::VALUE_DISPLAY), 1);

    rig.advance(Duration::from_millis(1100));
    assert_eq!(count_frames(&rig.sent(), CommandId::Plugin, plugin::RENAME_PARAMETER), 0);
}

#[test]
fn test_rewind_repeats_until_release() {
    let mut rig = Rig::new();
    rig.surface("f0002203020a0af7");
    let rewinds = |rig: &Rig| {
        rig.commands
            .iter()
            .filter(|c| **c == HostCommand::Transport(TransportAction::Rewind))
            .count()
    };

    rig.cc(0x24, 0x7F);
    assert_eq!(rewinds(&rig), 1);
    rig.advance(Duration::from_millis(200));
    assert_eq!(rewinds(&rig), 1);
    rig.advance(Duration::from_millis(200));
    assert_eq!(rewinds(&rig), 2);
    rig.advance(Duration::from_millis(50));
    assert_eq!(rewinds(&rig), 3);

    rig.cc(0x24, 0x00);
    rig.advance(Duration::from_millis(200));
    assert_eq!(rewinds(&rig), 3);
}

#[test]
fn test_transport_snapshot_follows_play() {
    let mut rig = Rig::new();
    rig.surface("f0002203020a0af7");
    rig.tick();
    rig.sent();

    rig.cc(0x1C, 0x7F);
    assert!(rig
        .commands
        .contains(&HostCommand::Transport(TransportAction::Play)));
    let sent = rig.sent();
    assert_eq!(count_frames(&sent, CommandId::General, general::TRANSPORT_STATE), 1);
}
