//! Synchronization engine
//!
//! [`Engine`] owns all surface and host state and is the only writer to it.
//! Inbound MIDI, host notifications and ticks are handled synchronously; the
//! caller passes the current `Instant` in and drains the surface outbox and
//! the host command queue afterwards.
//!
//! State changes never talk to the surface directly. They mark an update
//! category and the next [`Engine::tick`] flushes the dirty categories in
//! priority order, so a burst of host notifications costs one flush.

mod controls;
mod dispatch;
mod flush;
mod host_events;
mod mixer;
mod modes;
mod plugin;
mod transport;

#[cfg(test)]
mod tests;

use std::time::Instant;
use tracing::{info, trace, Span};

use crate::config::EngineConfig;
use crate::host::{HostCommand, HostEvent, TransportAction};
use crate::learn::LearnEngine;
use crate::mode::{FocusSource, LayerId, LayerSet, MixerSide, ModeState};
use crate::palette::Palette;
use crate::protocol::inbound::FirmwareVersion;
use crate::protocol::outbound;
use crate::registry::ParameterRegistry;
use crate::scheduler::{DisplayResetDebouncer, PendingUpdates, TimedEventQueue, UpdateType};
use crate::surface::{ButtonState, KnobState, SurfaceOut, BUTTON_COUNT, KNOB_COUNT};

use mixer::MixerState;
use plugin::PluginState;
use transport::TransportState;

/// Work scheduled on the timed event queue
#[derive(Debug, Clone, PartialEq)]
enum TimedAction {
    /// Held rewind or fast-forward
    Transport(TransportAction),
    /// Re-subscribe display observers for the assigned parameters
    ObserveParameters,
    /// Send all macro descriptors after a page or device change
    MacroUpdate,
    /// Send the effect name block after a name bank scroll
    SendNames,
}

/// Label restore armed by a transient value readout
#[derive(Debug, Clone, PartialEq)]
enum DisplayReset {
    Parameter { pid: String },
    Macro { index: u8 },
}

pub struct Engine {
    span: Span,
    tuning: EngineConfig,
    out: SurfaceOut,
    host_commands: Vec<HostCommand>,
    mode: ModeState,
    layers: LayerSet,
    pending: PendingUpdates,
    timed: TimedEventQueue<TimedAction>,
    debouncer: DisplayResetDebouncer<DisplayReset>,
    registry: ParameterRegistry,
    learn: LearnEngine,
    palette: Palette,
    knobs: [KnobState; KNOB_COUNT],
    buttons: [ButtonState; BUTTON_COUNT],
    transport_lights: [ButtonState; 8],
    firmware: Option<FirmwareVersion>,
    mixer: MixerState,
    plugin: PluginState,
    transport: TransportState,
}

impl Engine {
    pub fn new(tuning: EngineConfig, span: Span) -> Self {
        let mode = ModeState::default();
        let mut layers = LayerSet::new();
        layers.apply(&mode);

        Self {
            span,
            out: SurfaceOut::new(),
            host_commands: Vec::new(),
            mode,
            layers,
            pending: PendingUpdates::new(),
            timed: TimedEventQueue::new(),
            debouncer: DisplayResetDebouncer::new(KNOB_COUNT, tuning.display_reset()),
            registry: ParameterRegistry::new(tuning.registry_capacity),
            learn: LearnEngine::new(tuning.learn_steps, tuning.max_stepped_labels),
            palette: Palette::new(),
            knobs: Default::default(),
            buttons: Default::default(),
            transport_lights: Default::default(),
            firmware: None,
            mixer: MixerState::new(),
            plugin: PluginState::new(),
            transport: TransportState::default(),
            tuning,
        }
    }

    /// Announce the host to the surface
    pub fn start(&mut self) {
        let _entered = self.span.clone().entered();
        info!("Announcing host to surface");
        self.out.sysex_direct(outbound::daw_started());
    }

    pub fn on_host_events(&mut self, events: impl IntoIterator<Item = HostEvent>, now: Instant) {
        for event in events {
            self.on_host_event(event, now);
        }
    }

    /// Surface bytes queued since the last call, in emission order
    pub fn take_outgoing(&mut self) -> Vec<Vec<u8>> {
        self.out.take()
    }

    /// Host requests queued since the last call
    pub fn take_host_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.host_commands)
    }

    /// Swap in new timing and limits
    pub fn apply_tuning(&mut self, tuning: EngineConfig) {
        let _entered = self.span.clone().entered();
        info!("Applying engine tuning");
        self.debouncer.set_timeout(tuning.display_reset());
        self.learn
            .set_limits(tuning.learn_steps, tuning.max_stepped_labels);
        self.registry.resize(tuning.registry_capacity);
        self.tuning = tuning;
    }

    pub fn mode(&self) -> ModeState {
        self.mode
    }

    pub fn active_layers(&self) -> Vec<LayerId> {
        self.layers.active_layers()
    }

    pub fn flush_count(&self, update: UpdateType) -> u64 {
        self.pending.flush_count(update)
    }

    pub fn is_initialized(&self) -> bool {
        self.out.is_initialized()
    }

    pub fn firmware(&self) -> Option<&FirmwareVersion> {
        self.firmware.as_ref()
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn tuning(&self) -> &EngineConfig {
        &self.tuning
    }

    fn host(&mut self, command: HostCommand) {
        trace!("Host command {:?}", command);
        self.host_commands.push(command);
    }

    /// Category the current focus source flushes through
    fn active_update_type(&self) -> UpdateType {
        if self.mode.in_plugin_mode {
            UpdateType::Plugin
        } else {
            UpdateType::for_source(FocusSource::for_side(self.mode.mixer_side))
        }
    }

    /// Content of `source` changed
    ///
    /// In plugin mode only the source's own category is marked; otherwise
    /// the active view is refreshed together with the controls.
    fn mark_update_required(&mut self, source: FocusSource) {
        if self.mode.in_plugin_mode {
            self.pending.mark(UpdateType::for_source(source));
        } else {
            let active = self.active_update_type();
            self.pending.mark_all(&[active, UpdateType::UpdateControls]);
        }
    }

    /// True when an active layer shows values of `side`
    fn shows_side(&self, side: MixerSide) -> bool {
        use crate::mode::{ButtonLayer, KnobLayer};

        let knob = matches!(
            self.layers.knob(),
            Some(KnobLayer::Volume(s) | KnobLayer::Pan(s) | KnobLayer::Send(s)) if s == side
        );
        let button = matches!(
            self.layers.button(),
            Some(ButtonLayer::Mute(s) | ButtonLayer::Solo(s) | ButtonLayer::Arm(s)) if s == side
        );
        knob || button
    }
}
