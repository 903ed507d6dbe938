//! Device chain, direct parameter binding and macro pages
//!
//! In plugin knob mode every knob and button is bound by wire hash to a
//! parameter of the cursor device. In macro mode the knobs drive the eight
//! remote controls of the selected page instead, presented to the surface
//! as one fixed macro device.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::flush::{Flush, MAX_INLINE_LABELS};
use super::{DisplayReset, Engine, TimedAction};
use crate::host::{CursorDeviceChange, DeviceChange, HostCommand, RemoteChange};
use crate::mode::{FocusSource, KnobMode};
use crate::protocol::codec::{DisplayName, HashDigest};
use crate::protocol::inbound::ParameterRequest;
use crate::protocol::outbound::{self, ControlType, DeviceDescriptor, LearnedParameter};
use crate::registry::last_segment;
use crate::scheduler::{ScrollPosition, UpdateType};
use crate::surface::{BUTTON_COUNT, KNOB_COUNT};

/// Devices whose controls are only reachable through remote pages
const REMOTES_ONLY_DEVICES: [&str; 4] = ["Polymer", "Filter+", "Grid FX", "Poly Grid"];

/// Device name the macro page is presented under
const MACRO_DEVICE_NAME: &str = "MIMacroDefaultDevice";

/// Most discrete steps a macro descriptor can carry
const MAX_MACRO_STEPS: i32 = 0x2A;

const DEVICE_BANK_SIZE: i32 = 8;

const ROOT_MODULE_PREFIX: &str = "CONTENTS/ROOT_GENERIC_MODULE/";
const CONTENTS_PREFIX: &str = "CONTENTS/";

#[derive(Debug, Clone, Default)]
pub(super) struct DeviceSlot {
    pub exists: bool,
    pub enabled: bool,
    pub name: String,
    pub is_plugin: bool,
    pub remotes_visible: bool,
    pub pages: u8,
}

impl DeviceSlot {
    fn apply(&mut self, change: DeviceChange) {
        match change {
            DeviceChange::Exists(v) => self.exists = v,
            DeviceChange::Enabled(v) => self.enabled = v,
            DeviceChange::Name(v) => self.name = v,
            DeviceChange::IsPlugin(v) => self.is_plugin = v,
            DeviceChange::RemotesVisible(v) => self.remotes_visible = v,
            DeviceChange::Pages(v) => self.pages = v,
        }
    }

    fn macro_capable(&self) -> bool {
        REMOTES_ONLY_DEVICES.contains(&self.name.as_str()) || (self.remotes_visible && self.pages > 0)
    }
}

#[derive(Debug, Clone)]
pub(super) struct CursorDevice {
    pub exists: bool,
    pub enabled: bool,
    pub name: String,
    pub is_plugin: bool,
    pub has_layers: bool,
    pub remotes_visible: bool,
    /// Absolute chain position, -1 when nothing is selected
    pub position: i32,
}

impl Default for CursorDevice {
    fn default() -> Self {
        Self {
            exists: false,
            enabled: false,
            name: String::new(),
            is_plugin: false,
            has_layers: false,
            remotes_visible: false,
            position: -1,
        }
    }
}

/// One remote control of the selected page
#[derive(Debug, Clone)]
pub(super) struct MacroParameter {
    index: u8,
    pub hash: HashDigest,
    pub current_name: String,
    pub exists: bool,
    /// Discrete value count, -1 for continuous
    pub steps: i32,
    pub center_detent: bool,
    pub value: f64,
}

impl MacroParameter {
    fn new(index: u8) -> Self {
        Self {
            index,
            hash: HashDigest::parameter(&format!("Macro {}", index + 1)),
            current_name: String::new(),
            exists: false,
            steps: -1,
            center_detent: false,
            value: 0.0,
        }
    }

    fn step_count(&self) -> u8 {
        if self.steps > 1 && self.steps <= MAX_MACRO_STEPS {
            self.steps as u8
        } else {
            0
        }
    }

    fn to_learned(&self) -> LearnedParameter {
        LearnedParameter {
            index: self.index as i32 + 1,
            hash: self.hash.clone(),
            is_macro: true,
            center_detent: self.center_detent,
            step_count: self.step_count(),
            value: self.value,
            name: DisplayName::label(&self.current_name),
            labels: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(super) struct PluginState {
    pub slots: [DeviceSlot; 8],
    pub device_count: i32,
    /// Chain position of the first slot
    pub first_slot: i32,
    pub cursor: CursorDevice,
    pub locked: bool,
    pub macro_mode: bool,
    pub remote_pages: i32,
    pub remote_page: ScrollPosition,
    pub macros: [MacroParameter; KNOB_COUNT],
    pub macro_update_pending: bool,
    /// Device switched and the surface has not seen the new list yet
    pub device_change_pending: bool,
    pub learn_mode: bool,
    pub knob_bindings: [Option<String>; KNOB_COUNT],
    pub button_bindings: [Option<String>; BUTTON_COUNT],
    /// An assignment batch is collecting; observation is re-subscribed when it ends
    pub batch_pending: bool,
    pub knob_change_time: [Option<Instant>; KNOB_COUNT],
    pub button_change_time: [Option<Instant>; BUTTON_COUNT],
    pub content_dirty: bool,
}

impl PluginState {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
            device_count: 0,
            first_slot: 0,
            cursor: CursorDevice::default(),
            locked: false,
            macro_mode: false,
            remote_pages: 0,
            remote_page: ScrollPosition::default(),
            macros: std::array::from_fn(|i| MacroParameter::new(i as u8)),
            macro_update_pending: false,
            device_change_pending: false,
            learn_mode: false,
            knob_bindings: Default::default(),
            button_bindings: Default::default(),
            batch_pending: false,
            knob_change_time: [None; KNOB_COUNT],
            button_change_time: [None; BUTTON_COUNT],
            content_dirty: true,
        }
    }

    /// Macro capability of the cursor device
    fn evaluate_macro_mode(&self) -> bool {
        let cursor = &self.cursor;
        (cursor.has_layers && !cursor.is_plugin)
            || REMOTES_ONLY_DEVICES.contains(&cursor.name.as_str())
            || (cursor.remotes_visible && self.remote_pages > 0)
    }

    fn clear_bindings(&mut self) {
        self.knob_bindings = Default::default();
        self.button_bindings = Default::default();
    }

    fn is_bound(&self, pid: &str) -> bool {
        self.knob_bindings
            .iter()
            .chain(self.button_bindings.iter())
            .any(|b| b.as_deref() == Some(pid))
    }
}

fn within(changed: Option<Instant>, now: Instant, window: Duration) -> bool {
    changed.is_some_and(|at| now.saturating_duration_since(at) <= window)
}

impl Engine {
    fn refresh_macro_mode(&mut self) {
        let available = self.plugin.evaluate_macro_mode();
        self.handle_macro_availability(available);
    }

    fn plugin_content_changed(&mut self) {
        self.plugin.content_dirty = true;
        self.mark_update_required(FocusSource::Plugin);
    }

    fn schedule_macro_update(&mut self, now: Instant) {
        if self.plugin.macro_update_pending {
            return;
        }
        self.plugin.macro_update_pending = true;
        self.timed.schedule_once(
            TimedAction::MacroUpdate,
            self.tuning.macro_update_delay(),
            now,
        );
    }

    /// Single macro changes go out directly only while nothing bigger is pending
    fn single_macro_update_ready(&self) -> bool {
        !self.plugin.macro_update_pending
            && !self.plugin.device_change_pending
            && self.mode.knob_mode == KnobMode::Macro
    }

    // ===== Host notifications =====

    pub(super) fn on_device_count(&mut self, count: i32) {
        self.plugin.device_count = count;
        self.plugin_content_changed();
    }

    pub(super) fn on_device_slot(&mut self, slot: u8, change: DeviceChange) {
        if let Some(device) = self.plugin.slots.get_mut(slot as usize) {
            device.apply(change);
            self.plugin_content_changed();
        }
    }

    pub(super) fn on_cursor_device(&mut self, change: CursorDeviceChange, now: Instant) {
        match change {
            CursorDeviceChange::Exists(exists) => {
                self.plugin.cursor.exists = exists;
                if !exists {
                    self.cancel_sweep();
                    self.registry.deactivate();
                    self.plugin.clear_bindings();
                }
            }
            CursorDeviceChange::Enabled(enabled) => self.plugin.cursor.enabled = enabled,
            CursorDeviceChange::Name(name) => {
                if self.plugin.cursor.name == name {
                    return;
                }
                debug!("Cursor device '{}'", name);
                self.cancel_sweep();
                self.plugin.clear_bindings();
                if name.is_empty() {
                    self.registry.deactivate();
                } else {
                    self.registry.activate(&name, self.plugin.cursor.is_plugin);
                }
                self.plugin.cursor.name = name;
                self.plugin.device_change_pending = true;
                self.schedule_macro_update(now);
                self.refresh_macro_mode();
            }
            CursorDeviceChange::IsPlugin(is_plugin) => {
                self.plugin.cursor.is_plugin = is_plugin;
                if let Some(set) = self.registry.active_mut() {
                    set.set_plugin(is_plugin);
                }
                self.refresh_macro_mode();
            }
            CursorDeviceChange::HasLayers(has_layers) => {
                self.plugin.cursor.has_layers = has_layers;
                self.refresh_macro_mode();
            }
            CursorDeviceChange::RemotesVisible(visible) => {
                self.plugin.cursor.remotes_visible = visible;
                self.refresh_macro_mode();
            }
            CursorDeviceChange::Position(position) => {
                self.plugin.cursor.position = position;
                let first = self.plugin.first_slot;
                if position >= 0 && !(first..first + DEVICE_BANK_SIZE).contains(&position) {
                    let first = position - position % DEVICE_BANK_SIZE;
                    trace!("Following cursor device to bank {}", first);
                    self.plugin.first_slot = first;
                    self.host(HostCommand::ScrollDeviceBank { position: first });
                }
            }
            CursorDeviceChange::Pinned(pinned) => self.plugin.locked = pinned,
        }
        self.plugin_content_changed();
    }

    pub(super) fn on_remote_page_count(&mut self, count: i32) {
        self.plugin.remote_pages = count;
        self.refresh_macro_mode();
        self.plugin_content_changed();
    }

    pub(super) fn on_remote_page_selected(&mut self, page: i32, now: Instant) {
        self.plugin.remote_page.report(page);
        self.schedule_macro_update(now);
        self.plugin_content_changed();
    }

    pub(super) fn on_remote_parameter(&mut self, index: u8, change: RemoteChange, now: Instant) {
        let single = self.single_macro_update_ready();
        let window = self.tuning.macro_display_window();
        let Some(m) = self.plugin.macros.get_mut(index as usize) else {
            return;
        };

        let mut frame = None;
        match change {
            RemoteChange::Exists(exists) => {
                m.exists = exists;
                if single {
                    frame = Some(if exists {
                        outbound::parameter_learned(&m.to_learned())
                    } else {
                        outbound::unmap_parameter(index)
                    });
                }
            }
            RemoteChange::Name(name) => {
                m.current_name = name;
                if single && m.exists {
                    frame = Some(outbound::rename_parameter(
                        index,
                        &m.hash,
                        &DisplayName::label(&m.current_name),
                    ));
                }
            }
            RemoteChange::Value(value) => {
                m.value = value;
                if self.mode.knob_mode == KnobMode::Macro {
                    self.pending.mark(UpdateType::Plugin);
                }
            }
            RemoteChange::Display(text) => {
                let changed = self.plugin.knob_change_time[index as usize];
                if self.mode.knob_mode == KnobMode::Macro && within(changed, now, window) {
                    self.out
                        .sysex(outbound::value_display(ControlType::Knob, index, &text));
                    self.debouncer
                        .notify(index as usize, DisplayReset::Macro { index }, now);
                }
            }
            RemoteChange::Steps(steps) => {
                m.steps = steps;
                if single && m.exists {
                    frame = Some(outbound::parameter_learned(&m.to_learned()));
                }
            }
            RemoteChange::Origin(origin) => {
                m.center_detent = (origin - 0.5).abs() < f64::EPSILON;
                if single && m.exists {
                    frame = Some(outbound::parameter_learned(&m.to_learned()));
                }
            }
        }
        if let Some(frame) = frame {
            self.out.sysex(frame);
        }
    }

    pub(super) fn on_parameter_ids(&mut self, ids: Vec<String>, now: Instant) {
        let Some(set) = self.registry.active_mut() else {
            trace!("Parameter ids without an active device");
            return;
        };
        let replay = set.register_parameter_ids(&ids);
        if !replay.is_empty() {
            debug!("Replaying {} stashed assignments", replay.len());
        }
        for request in replay {
            self.apply_parameter_to_device(request, now);
        }
        if self.plugin.learn_mode {
            self.observe_assigned_parameters();
        }
    }

    pub(super) fn on_parameter_name(&mut self, id: String, name: String) {
        let Some(set) = self.registry.active_mut() else {
            return;
        };
        if !set.register_name(&id, &name) {
            return;
        }
        let pid = last_segment(&id);
        if !self.mode.in_plugin_mode || !self.plugin.is_bound(pid) {
            return;
        }
        let Some(param) = self.registry.active().and_then(|s| s.parameter(pid)) else {
            return;
        };
        if let Ok(index) = u8::try_from(param.index) {
            let frame = outbound::rename_parameter(index, &param.hash, &DisplayName::label(&name));
            self.out.sysex(frame);
        }
    }

    pub(super) fn on_parameter_value(&mut self, id: String, value: f64) {
        let pid = last_segment(&id);
        if self.learn.sweeping_pid() == Some(pid) {
            self.learn.capture_value(pid, value);
            return;
        }
        let Some(param) = self
            .registry
            .active_mut()
            .and_then(|s| s.parameter_mut(pid))
        else {
            return;
        };
        param.normalized_value = value;
        let learned = param.learned;
        let path = param.path_id.clone();

        if !self.plugin.is_bound(pid) {
            return;
        }
        if self.plugin.learn_mode && !learned && self.mode.in_plugin_mode {
            self.learn.begin(pid, &path, value);
        } else {
            self.pending.mark(UpdateType::Plugin);
        }
    }

    pub(super) fn on_parameter_display(&mut self, id: String, text: String, now: Instant) {
        let pid = last_segment(&id);
        if self.learn.sweeping_pid() == Some(pid) {
            self.learn.capture_display(pid, &text);
            return;
        }
        if !self.mode.in_plugin_mode || self.mode.knob_mode != KnobMode::Plugin {
            return;
        }

        let window = self.tuning.knob_display_window();
        let mut shown = Vec::new();
        for (slot, binding) in self.plugin.knob_bindings.iter().enumerate() {
            if binding.as_deref() == Some(pid)
                && within(self.plugin.knob_change_time[slot], now, window)
            {
                shown.push((ControlType::Knob, slot));
            }
        }
        for (slot, binding) in self.plugin.button_bindings.iter().enumerate() {
            if binding.as_deref() == Some(pid)
                && within(self.plugin.button_change_time[slot], now, window)
            {
                shown.push((ControlType::Button, slot));
            }
        }

        for (control, slot) in shown {
            self.out
                .sysex(outbound::value_display(control, slot as u8, &text));
            // Only knob readouts fall back to the label
            if control == ControlType::Knob {
                let reset = DisplayReset::Parameter {
                    pid: pid.to_string(),
                };
                self.debouncer.notify(slot, reset, now);
            }
        }
    }

    // ===== Surface commands =====

    pub(super) fn navigate_device_bank(&mut self, first: i32) {
        self.plugin.first_slot = first;
        self.host(HostCommand::ScrollDeviceBank { position: first });
        self.plugin_content_changed();
    }

    pub(super) fn select_device(&mut self, slot: u8) {
        if self.plugin.locked {
            self.host(HostCommand::SetDevicePinned(false));
            self.host(HostCommand::SelectDevice { slot });
            self.host(HostCommand::SetDevicePinned(true));
        } else {
            self.host(HostCommand::SelectDevice { slot });
        }
    }

    pub(super) fn set_device_enabled(&mut self, slot: u8, enabled: bool) {
        self.host(HostCommand::SetDeviceEnabled { slot, enabled });
    }

    pub(super) fn lock_device(&mut self, locked: bool) {
        debug!("Device {}", if locked { "locked" } else { "unlocked" });
        self.plugin.locked = locked;
        self.host(HostCommand::SetDevicePinned(locked));
        self.host(HostCommand::SetTrackPinned(locked));
        self.plugin_content_changed();
    }

    pub(super) fn select_remote_page(&mut self, page: u8) {
        if self.plugin.remote_page.request(page as i32) {
            self.host(HostCommand::SelectRemotePage(page));
        }
    }

    pub(super) fn set_learn_mode(&mut self, on: bool) {
        debug!("Learn mode {}", if on { "on" } else { "off" });
        self.plugin.learn_mode = on;
        if !on {
            self.cancel_sweep();
            if let Some(set) = self.registry.active_mut() {
                set.clear_learned();
            }
        }
        self.observe_assigned_parameters();
    }

    /// Drop a running sweep and put its parameter back where it started
    fn cancel_sweep(&mut self) {
        if let Some((path, value)) = self.learn.cancel() {
            self.host(HostCommand::SetParameter { path, value });
        }
    }

    /// The surface took the learned descriptor; parameters become learnable again
    pub(super) fn confirm_learned(&mut self, control_type: ControlType, index: u8) {
        if !self.plugin.learn_mode {
            return;
        }
        debug!("Confirmed learned {:?} {}", control_type, index);
        if let Some(set) = self.registry.active_mut() {
            set.clear_learned();
        }
    }

    pub(super) fn assign_parameter(&mut self, request: ParameterRequest, now: Instant) {
        let known = self
            .registry
            .active()
            .is_some_and(|s| s.parameter_by_hash(&request.hash).is_some());
        if known {
            self.apply_parameter_to_device(request, now);
            return;
        }

        if self.plugin.macro_mode && (1..=8).contains(&request.index) {
            trace!("Macro assignment {}", request.index);
            self.schedule_macro_update(now);
            return;
        }

        match self.registry.active_mut() {
            Some(set) if !set.has_parameters() => {
                trace!("Stashing assignment for {}", request.hash);
                set.stash_request(request);
            }
            Some(_) => debug!("No parameter with hash {}, control stays unbound", request.hash),
            None => debug!("Assignment without an active device"),
        }
    }

    /// Bind a control to the parameter the request's hash resolves to
    fn apply_parameter_to_device(&mut self, request: ParameterRequest, now: Instant) {
        let Some(pid) = self
            .registry
            .active()
            .and_then(|s| s.parameter_by_hash(&request.hash))
            .map(|p| p.display_id.clone())
        else {
            return;
        };
        if request.slot as usize >= KNOB_COUNT {
            debug!("Assignment slot {} out of range", request.slot);
            return;
        }

        if !self.plugin.batch_pending {
            self.plugin.batch_pending = true;
            self.plugin.clear_bindings();
            self.timed.schedule_once(
                TimedAction::ObserveParameters,
                self.tuning.parameter_observe_delay(),
                now,
            );
        }

        let slot = request.slot as usize;
        match request.control_type {
            ControlType::Knob => self.plugin.knob_bindings[slot] = Some(pid.clone()),
            ControlType::Button => self.plugin.button_bindings[slot] = Some(pid.clone()),
        }
        self.after_assignment(&pid, now);
    }

    fn after_assignment(&mut self, pid: &str, now: Instant) {
        if !self.mode.in_plugin_mode {
            return;
        }
        if self.mode.knob_mode == KnobMode::Macro {
            self.schedule_macro_update(now);
            return;
        }

        let Some(param) = self.registry.active().and_then(|s| s.parameter(pid)) else {
            return;
        };
        if self.plugin.learn_mode && !param.learned {
            let (path, value) = (param.path_id.clone(), param.normalized_value);
            self.learn.begin(pid, &path, value);
        } else {
            self.send_learned(pid);
        }
    }

    fn send_learned(&mut self, pid: &str) {
        let Some(param) = self.registry.active().and_then(|s| s.parameter(pid)) else {
            return;
        };
        let learned = param.to_learned(MAX_INLINE_LABELS);
        self.out.sysex(outbound::parameter_learned(&learned));
    }

    /// Subscribe display text of every bound parameter, or of all in learn mode
    pub(super) fn observe_assigned_parameters(&mut self) {
        self.plugin.batch_pending = false;
        let mut ids: Vec<String> = Vec::new();
        if self.plugin.learn_mode {
            if let Some(set) = self.registry.active() {
                ids.extend(set.observed_ids().iter().cloned());
            }
        } else {
            let bound = self
                .plugin
                .knob_bindings
                .iter()
                .chain(self.plugin.button_bindings.iter())
                .flatten();
            for pid in bound {
                ids.push(format!("{}{}", ROOT_MODULE_PREFIX, pid));
                ids.push(format!("{}{}", CONTENTS_PREFIX, pid));
            }
        }
        trace!("Observing {} parameter displays", ids.len());
        self.host(HostCommand::ObserveParameterDisplays(ids));
    }

    // ===== Surface state =====

    pub(super) fn send_macro_descriptors(&mut self) {
        if !self.mode.in_plugin_mode || self.mode.knob_mode != KnobMode::Macro {
            return;
        }
        for index in 0..KNOB_COUNT {
            let m = &self.plugin.macros[index];
            let frame = if m.exists {
                outbound::parameter_learned(&m.to_learned())
            } else {
                outbound::unmap_parameter(index as u8)
            };
            self.out.sysex(frame);
        }
    }

    /// Device list of the current bank; in macro mode the cursor slot shows the macro device
    fn send_plugin_states(&mut self) {
        let page = self.plugin.remote_page.live().clamp(0, 0x7F) as u8;
        let locked = self.plugin.locked;
        let first = self.plugin.first_slot;
        let first_index = first.clamp(0, 0x7F);
        let plugin = &self.plugin;
        let cursor = &plugin.cursor;

        let descriptors: Vec<DeviceDescriptor> = plugin
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, d)| {
                let slot = (first_index + i as i32).clamp(0, 0x7F) as u8;
                if plugin.macro_mode && first + i as i32 == cursor.position {
                    return cursor.exists.then(|| DeviceDescriptor {
                        slot,
                        hash: HashDigest::device(MACRO_DEVICE_NAME),
                        enabled: cursor.enabled,
                        name: DisplayName::full(&cursor.name),
                        macro_mode: true,
                        pages: plugin.remote_pages.clamp(0, 0x7F) as u8,
                    });
                }
                d.exists.then(|| DeviceDescriptor {
                    slot,
                    hash: HashDigest::device(&d.name),
                    enabled: d.enabled,
                    name: DisplayName::full(&d.name),
                    macro_mode: d.macro_capable(),
                    pages: d.pages,
                })
            })
            .collect();
        let selected = (first..first + DEVICE_BANK_SIZE)
            .contains(&cursor.position)
            .then(|| cursor.position.clamp(0, 0x7F) as u8);

        self.out
            .sysex_opt(outbound::plugin_count(self.plugin.device_count));
        self.out.sysex_opt(outbound::first_plugin(first_index));
        for descriptor in &descriptors {
            self.out.sysex(outbound::device_detail(descriptor));
        }
        self.out.sysex(outbound::end_device_detail());
        if let Some(slot) = selected {
            self.out.sysex(outbound::plugin_selected(slot, page, locked));
        }
    }

    pub(super) fn flush_plugin(&mut self, full_resync: bool) -> Flush {
        if self.plugin.macro_mode && !self.plugin.remote_page.in_place() {
            return Flush::Deferred;
        }
        if std::mem::take(&mut self.plugin.content_dirty) {
            self.plugin.device_change_pending = false;
            self.send_plugin_states();
        }
        if !full_resync && self.mode.in_plugin_mode {
            self.sync_controls(false);
        }
        Flush::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_capability() {
        let mut state = PluginState::new();
        assert!(!state.evaluate_macro_mode());

        state.cursor.name = "Polymer".to_string();
        assert!(state.evaluate_macro_mode());

        state.cursor.name = "Instrument Layer".to_string();
        state.cursor.has_layers = true;
        assert!(state.evaluate_macro_mode());
        state.cursor.is_plugin = true;
        assert!(!state.evaluate_macro_mode());

        state.cursor.remotes_visible = true;
        assert!(!state.evaluate_macro_mode());
        state.remote_pages = 2;
        assert!(state.evaluate_macro_mode());
    }

    #[test]
    fn test_macro_descriptor() {
        let mut m = MacroParameter::new(2);
        m.current_name = "Cutoff".to_string();
        m.steps = 4;
        let learned = m.to_learned();
        assert_eq!(learned.index, 3);
        assert!(learned.is_macro);
        assert_eq!(learned.step_count, 4);
        assert_eq!(learned.hash, HashDigest::parameter("Macro 3"));

        m.steps = MAX_MACRO_STEPS + 1;
        assert_eq!(m.step_count(), 0);
        m.steps = -1;
        assert_eq!(m.step_count(), 0);
    }

    #[test]
    fn test_display_window() {
        let now = Instant::now();
        let window = Duration::from_millis(100);
        assert!(within(Some(now), now + Duration::from_millis(50), window));
        assert!(!within(Some(now), now + Duration::from_millis(150), window));
        assert!(!within(None, now, window));
    }
}
