//! Mode state and control layers
//!
//! The surface owns 8 knobs and 8 buttons; which logical targets they drive
//! is decided by the active knob layer and button layer. Layers are derived
//! from [`ModeState`] through a fixed table, so a mode change always swaps
//! both layers in one step.

use std::fmt;

/// Which side of the mixer a layer addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MixerSide {
    /// Regular track bank
    Main,
    /// Effect tracks followed by the master track
    Master,
}

impl MixerSide {
    pub fn from_wire(side: u8) -> Self {
        if side == 0 {
            MixerSide::Main
        } else {
            MixerSide::Master
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonMode {
    Mute,
    Solo,
    Arm,
    Transport,
    None,
}

impl ButtonMode {
    /// Mixer mode button ids; anything unknown leaves the buttons unassigned
    pub fn from_wire(mode: u8) -> Self {
        match mode {
            0 => ButtonMode::Mute,
            1 => ButtonMode::Solo,
            2 => ButtonMode::Arm,
            _ => ButtonMode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnobMode {
    Level,
    Pan,
    Send,
    FocusTrack,
    FocusTrackPage1,
    Plugin,
    Macro,
}

impl KnobMode {
    /// Mixer mode knob ids; unknown ids are rejected
    pub fn from_wire(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(KnobMode::Level),
            1 => Some(KnobMode::Pan),
            2 => Some(KnobMode::Send),
            4 => Some(KnobMode::FocusTrack),
            5 => Some(KnobMode::Plugin),
            _ => None,
        }
    }

    pub fn is_focus(self) -> bool {
        matches!(self, KnobMode::FocusTrack | KnobMode::FocusTrackPage1)
    }

    pub fn is_device(self) -> bool {
        matches!(self, KnobMode::Plugin | KnobMode::Macro)
    }
}

/// View that selection and scroll updates refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusSource {
    MixerMain,
    MixerMaster,
    Plugin,
}

impl FocusSource {
    pub fn for_side(side: MixerSide) -> Self {
        match side {
            MixerSide::Main => FocusSource::MixerMain,
            MixerSide::Master => FocusSource::MixerMaster,
        }
    }

    /// Mixer side for mixer sources
    pub fn side(self) -> Option<MixerSide> {
        match self {
            FocusSource::MixerMain => Some(MixerSide::Main),
            FocusSource::MixerMaster => Some(MixerSide::Master),
            FocusSource::Plugin => None,
        }
    }
}

/// The single live mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub button_mode: ButtonMode,
    pub knob_mode: KnobMode,
    pub focus_source: FocusSource,
    pub in_plugin_mode: bool,
    /// Mixer side the mixer layers address; kept when the focus moves to a plugin
    pub mixer_side: MixerSide,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            button_mode: ButtonMode::Mute,
            knob_mode: KnobMode::Level,
            focus_source: FocusSource::MixerMain,
            in_plugin_mode: false,
            mixer_side: MixerSide::Main,
        }
    }
}

impl ModeState {
    /// Knob layer this mode maps to
    pub fn knob_layer(&self) -> KnobLayer {
        let side = self.mixer_side;
        match self.knob_mode {
            KnobMode::Level => KnobLayer::Volume(side),
            KnobMode::Pan => KnobLayer::Pan(side),
            KnobMode::Send => KnobLayer::Send(side),
            KnobMode::FocusTrack => KnobLayer::FocusTrack,
            KnobMode::FocusTrackPage1 => KnobLayer::FocusTrackPage1,
            KnobMode::Plugin => KnobLayer::Plugin,
            KnobMode::Macro => KnobLayer::Macro,
        }
    }

    /// Button layer this mode maps to
    ///
    /// Unassigned buttons follow plugin parameters when the plugin knob layer
    /// is up, and are idle otherwise.
    pub fn button_layer(&self) -> ButtonLayer {
        let side = self.mixer_side;
        match self.button_mode {
            ButtonMode::Mute => ButtonLayer::Mute(side),
            ButtonMode::Solo => ButtonLayer::Solo(side),
            ButtonMode::Arm => ButtonLayer::Arm(side),
            ButtonMode::Transport => ButtonLayer::Transport,
            ButtonMode::None if self.knob_mode == KnobMode::Plugin => ButtonLayer::PluginButtons,
            ButtonMode::None => ButtonLayer::Idle,
        }
    }
}

/// Knob routing contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnobLayer {
    Volume(MixerSide),
    Pan(MixerSide),
    Send(MixerSide),
    /// Cursor track volume, pan and first six sends
    FocusTrack,
    /// Cursor track sends from the second page on
    FocusTrackPage1,
    Plugin,
    Macro,
}

/// Button routing contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonLayer {
    Mute(MixerSide),
    Solo(MixerSide),
    Arm(MixerSide),
    Transport,
    PluginButtons,
    /// Buttons neither receive nor show anything
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    Knob(KnobLayer),
    Button(ButtonLayer),
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Knob(layer) => write!(f, "knob:{:?}", layer),
            LayerId::Button(layer) => write!(f, "button:{:?}", layer),
        }
    }
}

/// Result of swapping layers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayerTransition {
    pub deactivated: Vec<LayerId>,
    pub activated: Vec<LayerId>,
}

/// Tracks the one active knob layer and one active button layer
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    knob: Option<KnobLayer>,
    button: Option<ButtonLayer>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deactivate both current layers, then activate the ones `mode` maps to
    pub fn apply(&mut self, mode: &ModeState) -> LayerTransition {
        let mut transition = LayerTransition::default();
        if let Some(old) = self.knob.take() {
            transition.deactivated.push(LayerId::Knob(old));
        }
        if let Some(old) = self.button.take() {
            transition.deactivated.push(LayerId::Button(old));
        }

        let knob = mode.knob_layer();
        let button = mode.button_layer();
        self.knob = Some(knob);
        self.button = Some(button);
        transition.activated.push(LayerId::Knob(knob));
        transition.activated.push(LayerId::Button(button));
        transition
    }

    pub fn knob(&self) -> Option<KnobLayer> {
        self.knob
    }

    pub fn button(&self) -> Option<ButtonLayer> {
        self.button
    }

    pub fn is_active(&self, layer: LayerId) -> bool {
        match layer {
            LayerId::Knob(k) => self.knob == Some(k),
            LayerId::Button(b) => self.button == Some(b),
        }
    }

    pub fn active_layers(&self) -> Vec<LayerId> {
        self.knob
            .map(LayerId::Knob)
            .into_iter()
            .chain(self.button.map(LayerId::Button))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_ids() {
        assert_eq!(KnobMode::from_wire(0), Some(KnobMode::Level));
        assert_eq!(KnobMode::from_wire(3), None);
        assert_eq!(KnobMode::from_wire(5), Some(KnobMode::Plugin));
        assert_eq!(ButtonMode::from_wire(2), ButtonMode::Arm);
        assert_eq!(ButtonMode::from_wire(9), ButtonMode::None);
        assert_eq!(MixerSide::from_wire(0), MixerSide::Main);
        assert_eq!(MixerSide::from_wire(1), MixerSide::Master);
    }

    #[test]
    fn test_layer_table() {
        let mode = ModeState {
            button_mode: ButtonMode::Solo,
            knob_mode: KnobMode::Send,
            focus_source: FocusSource::MixerMaster,
            in_plugin_mode: false,
            mixer_side: MixerSide::Master,
        };
        assert_eq!(mode.knob_layer(), KnobLayer::Send(MixerSide::Master));
        assert_eq!(mode.button_layer(), ButtonLayer::Solo(MixerSide::Master));

        let plugin = ModeState {
            button_mode: ButtonMode::None,
            knob_mode: KnobMode::Plugin,
            focus_source: FocusSource::Plugin,
            in_plugin_mode: true,
            ..mode
        };
        assert_eq!(plugin.button_layer(), ButtonLayer::PluginButtons);
        let macro_mode = ModeState {
            knob_mode: KnobMode::Macro,
            ..plugin
        };
        assert_eq!(macro_mode.button_layer(), ButtonLayer::Idle);
    }

    #[test]
    fn test_apply_swaps_both_layers() {
        let mut layers = LayerSet::new();
        let first = layers.apply(&ModeState::default());
        assert!(first.deactivated.is_empty());
        assert_eq!(first.activated.len(), 2);

        let transport = ModeState {
            button_mode: ButtonMode::Transport,
            ..ModeState::default()
        };
        let second = layers.apply(&transport);
        assert_eq!(
            second.deactivated,
            vec![
                LayerId::Knob(KnobLayer::Volume(MixerSide::Main)),
                LayerId::Button(ButtonLayer::Mute(MixerSide::Main)),
            ]
        );
        assert!(layers.is_active(LayerId::Button(ButtonLayer::Transport)));
        assert!(!layers.is_active(LayerId::Button(ButtonLayer::Mute(MixerSide::Main))));
        assert_eq!(layers.active_layers().len(), 2);
    }
}
