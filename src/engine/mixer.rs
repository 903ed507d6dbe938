//! Mixer sides, cursor track sends and the selection readout
//!
//! Both mixer sides share one [`MixView`]; the master side views the effect
//! bank with the master track appended after the last effect track.

use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, trace};

use super::flush::Flush;
use super::{Engine, TimedAction};
use crate::host::{HostCommand, MixerParam, MixerTarget, SendChange, TrackBank, TrackChange, TrackRef};
use crate::mode::{FocusSource, MixerSide};
use crate::palette::Rgb;
use crate::protocol::codec::DisplayName;
use crate::protocol::outbound::{self, TrackDescriptor};
use crate::scheduler::{ScrollPosition, UpdateType};

pub(super) const BANK_SIZE: usize = 8;

/// Sends shown per focus page; page 0 spends two knobs on volume and pan
const FOCUS_SENDS_FIRST_PAGE: i32 = 6;

/// Mirror of one host track
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct TrackMirror {
    pub exists: bool,
    pub name: String,
    pub color: Option<Rgb>,
    pub is_group: bool,
    pub volume: f64,
    pub pan: f64,
    pub sends: BTreeMap<u8, f64>,
    pub mute: bool,
    pub solo: bool,
    pub arm: bool,
}

impl TrackMirror {
    /// Returns true when the track's descriptor changed
    pub fn apply(&mut self, change: &TrackChange) -> bool {
        match change {
            TrackChange::Exists(exists) => return replace(&mut self.exists, *exists),
            TrackChange::Name(name) => {
                if self.name == *name {
                    return false;
                }
                self.name = name.clone();
                return true;
            }
            TrackChange::Color(color) => {
                if self.color == *color {
                    return false;
                }
                self.color = *color;
                return true;
            }
            TrackChange::Group(group) => return replace(&mut self.is_group, *group),
            TrackChange::Volume(v) => self.volume = *v,
            TrackChange::Pan(v) => self.pan = *v,
            TrackChange::Send { index, value } => {
                self.sends.insert(*index, *value);
            }
            TrackChange::Mute(on) => self.mute = *on,
            TrackChange::Solo(on) => self.solo = *on,
            TrackChange::Arm(on) => self.arm = *on,
        }
        false
    }

    pub fn value(&self, param: MixerParam) -> Option<f64> {
        match param {
            MixerParam::Volume => Some(self.volume),
            MixerParam::Pan => Some(self.pan),
            MixerParam::Send(index) => self.sends.get(&index).copied(),
        }
    }
}

fn replace(slot: &mut bool, value: bool) -> bool {
    std::mem::replace(slot, value) != value
}

/// One mixer side: an eight-wide window over a track bank
#[derive(Debug, Clone)]
pub(super) struct MixView {
    side: MixerSide,
    pub slots: [TrackMirror; BANK_SIZE],
    /// Only shown on the master side
    pub master: TrackMirror,
    /// Tracks on this side, the master included
    pub count: i32,
    pub scroll: ScrollPosition,
    pub content_dirty: bool,
}

impl MixView {
    fn new(side: MixerSide) -> Self {
        Self {
            side,
            slots: Default::default(),
            master: TrackMirror::default(),
            count: 0,
            scroll: ScrollPosition::default(),
            content_dirty: true,
        }
    }

    pub fn bank(&self) -> TrackBank {
        match self.side {
            MixerSide::Main => TrackBank::Main,
            MixerSide::Master => TrackBank::Effect,
        }
    }

    pub fn first_index(&self) -> i32 {
        self.scroll.requested()
    }

    /// Window slot the master track occupies
    fn master_slot(&self) -> Option<usize> {
        if self.side != MixerSide::Master {
            return None;
        }
        let slot = self.count - 1 - self.first_index();
        (0..BANK_SIZE as i32).contains(&slot).then_some(slot as usize)
    }

    /// Existing track at window slot `index`
    pub fn slot(&self, index: usize) -> Option<&TrackMirror> {
        if self.master_slot() == Some(index) {
            return Some(&self.master);
        }
        self.slots.get(index).filter(|t| t.exists)
    }

    pub fn track_ref(&self, index: usize) -> Option<TrackRef> {
        self.slot(index)?;
        Some(match self.side {
            MixerSide::Main => TrackRef::Main(index as u8),
            MixerSide::Master if self.master_slot() == Some(index) => TrackRef::Master,
            MixerSide::Master => TrackRef::Effect(index as u8),
        })
    }

    /// Track at absolute index `index` of this side, if it is in the window
    pub fn track_at(&self, index: i32) -> Option<TrackRef> {
        if self.side == MixerSide::Master && index == self.count - 1 {
            return Some(TrackRef::Master);
        }
        let slot = index - self.first_index();
        if !(0..BANK_SIZE as i32).contains(&slot) {
            return None;
        }
        self.track_ref(slot as usize)
    }

    /// Adopt a new host track count
    ///
    /// Returns the scroll position to request when the window ended up a
    /// full bank past the last track.
    pub fn set_track_count(&mut self, raw: i32) -> Option<i32> {
        self.count = match self.side {
            MixerSide::Main => raw,
            MixerSide::Master => raw + 1,
        };
        let first = self.first_index();
        if self.count <= first && first >= BANK_SIZE as i32 {
            let back = first - BANK_SIZE as i32;
            if self.scroll.request(back) {
                return Some(back);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct SendMirror {
    pub exists: bool,
    pub name: String,
    pub value: f64,
}

/// Sends of the cursor track, by absolute send index
#[derive(Debug, Clone, Default)]
pub(super) struct CursorSends {
    pub sends: BTreeMap<u8, SendMirror>,
    pub scroll: ScrollPosition,
    /// 0 on the first focus page, 1 beyond it
    pub section: u8,
}

impl CursorSends {
    /// Absolute send index shown at window position `k`
    fn absolute(&self, k: i32) -> i32 {
        self.scroll.live() + self.section as i32 * FOCUS_SENDS_FIRST_PAGE + k
    }

    fn existing(&self, index: i32) -> Option<&SendMirror> {
        u8::try_from(index)
            .ok()
            .and_then(|i| self.sends.get(&i))
            .filter(|s| s.exists)
    }
}

/// Eight-wide window over the effect track names
#[derive(Debug, Clone, Default)]
pub(super) struct SendNameBank {
    pub scroll: ScrollPosition,
    pub names: [Option<String>; BANK_SIZE],
}

#[derive(Debug)]
pub(super) struct MixerState {
    pub main: MixView,
    pub master: MixView,
    pub cursor: TrackMirror,
    pub sends: CursorSends,
    pub send_names: SendNameBank,
    pub send_count: i32,
    /// Send driven by the send knob layer
    pub selected_send: u8,
    /// True while the knobs follow the cursor track
    pub track_mode: bool,
    pub master_selected: bool,
    pub focus_page: u8,
    pub selected_track: i32,
    pub last_selection: Option<TrackDescriptor>,
    pub force_selection: bool,
}

impl MixerState {
    pub fn new() -> Self {
        Self {
            main: MixView::new(MixerSide::Main),
            master: MixView::new(MixerSide::Master),
            cursor: TrackMirror::default(),
            sends: CursorSends::default(),
            send_names: SendNameBank::default(),
            send_count: 0,
            selected_send: 0,
            track_mode: false,
            master_selected: false,
            focus_page: 0,
            selected_track: -1,
            last_selection: None,
            force_selection: false,
        }
    }

    pub fn view(&self, side: MixerSide) -> &MixView {
        match side {
            MixerSide::Main => &self.main,
            MixerSide::Master => &self.master,
        }
    }

    pub fn view_mut(&mut self, side: MixerSide) -> &mut MixView {
        match side {
            MixerSide::Main => &mut self.main,
            MixerSide::Master => &mut self.master,
        }
    }

    fn view_for_bank(&mut self, bank: TrackBank) -> &mut MixView {
        match bank {
            TrackBank::Main => &mut self.main,
            TrackBank::Effect => &mut self.master,
        }
    }

    /// Absolute cursor send behind focus knob `knob`
    pub fn focus_send(&self, knob: usize, first_page: bool) -> Option<u8> {
        let k = if first_page {
            knob.checked_sub(2)? as i32
        } else {
            knob as i32
        };
        let index = self.sends.absolute(k);
        self.sends.existing(index)?;
        u8::try_from(index).ok()
    }

    /// Current value of a mixer target
    pub fn value(&self, target: MixerTarget) -> Option<f64> {
        let track = match target.track {
            TrackRef::Main(slot) => self.main.slots.get(slot as usize)?,
            TrackRef::Effect(slot) => self.master.slots.get(slot as usize)?,
            TrackRef::Master => &self.master.master,
            TrackRef::Cursor => {
                return match target.param {
                    MixerParam::Send(index) => self.sends.existing(index as i32).map(|s| s.value),
                    param => self.cursor.value(param),
                };
            }
        };
        track.value(target.param)
    }
}

fn side_of(bank: TrackBank) -> MixerSide {
    match bank {
        TrackBank::Main => MixerSide::Main,
        TrackBank::Effect => MixerSide::Master,
    }
}

impl Engine {
    // ===== Host notifications =====

    pub(super) fn on_track_event(&mut self, bank: TrackBank, slot: u8, change: TrackChange) {
        let view = self.mixer.view_for_bank(bank);
        let Some(track) = view.slots.get_mut(slot as usize) else {
            return;
        };
        let content = track.apply(&change);
        view.content_dirty |= content;
        self.on_mixer_track_changed(side_of(bank), content);
    }

    pub(super) fn on_master_track(&mut self, change: TrackChange) {
        let content = self.mixer.master.master.apply(&change);
        self.mixer.master.content_dirty |= content;
        self.on_mixer_track_changed(MixerSide::Master, content);
    }

    fn on_mixer_track_changed(&mut self, side: MixerSide, content: bool) {
        if content {
            self.mark_update_required(FocusSource::for_side(side));
        } else if self.shows_side(side) {
            self.pending
                .mark(UpdateType::for_source(FocusSource::for_side(side)));
        }
    }

    pub(super) fn on_track_count(&mut self, bank: TrackBank, count: i32) {
        let view = self.mixer.view_for_bank(bank);
        if let Some(position) = view.set_track_count(count) {
            debug!("{:?} bank past the last track, scrolling back to {}", bank, position);
            self.host(HostCommand::ScrollTrackBank { bank, position });
        }
        self.mixer.view_for_bank(bank).content_dirty = true;
        self.mark_update_required(FocusSource::for_side(side_of(bank)));
    }

    pub(super) fn on_track_bank_scrolled(&mut self, bank: TrackBank, position: i32) {
        let view = self.mixer.view_for_bank(bank);
        view.scroll.report(position);
        view.content_dirty = true;
        self.mark_update_required(FocusSource::for_side(side_of(bank)));
    }

    pub(super) fn on_cursor_track(&mut self, change: TrackChange) {
        if let TrackChange::Send { index, value } = change {
            self.on_cursor_send(index, SendChange::Value(value));
            return;
        }
        let content = self.mixer.cursor.apply(&change);
        let focus = self.mode.knob_mode.is_focus();
        match change {
            TrackChange::Volume(_) | TrackChange::Pan(_) if focus => {
                self.pending.mark(UpdateType::Selection)
            }
            _ if content && self.mixer.selected_track >= 0 => {
                self.pending.mark(UpdateType::Selection)
            }
            _ => {}
        }
    }

    pub(super) fn on_cursor_track_position(&mut self, position: i32) {
        self.mixer.selected_track = position;
        if position < 0 {
            return;
        }
        self.pending.mark(UpdateType::Selection);
        let source = if self.mode.in_plugin_mode {
            FocusSource::Plugin
        } else {
            FocusSource::for_side(self.mode.mixer_side)
        };
        self.mark_update_required(source);
    }

    pub(super) fn on_cursor_send(&mut self, index: u8, change: SendChange) {
        let send = self.mixer.sends.sends.entry(index).or_default();
        let update = match change {
            SendChange::Exists(exists) => {
                send.exists = exists;
                UpdateType::SendsCount
            }
            SendChange::Name(name) => {
                send.name = name;
                UpdateType::SendsCount
            }
            SendChange::Value(value) => {
                send.value = value;
                UpdateType::Selection
            }
        };
        if self.mode.knob_mode.is_focus() {
            self.pending.mark(update);
        }
    }

    pub(super) fn on_cursor_sends_scrolled(&mut self, position: i32) {
        self.mixer.sends.scroll.report(position);
        if self.mode.knob_mode.is_focus() {
            self.pending.mark(UpdateType::SendsCount);
        }
    }

    pub(super) fn on_send_count(&mut self, count: i32) {
        self.mixer.send_count = count;
        let max_page = ((count + 1) / BANK_SIZE as i32).clamp(0, u8::MAX as i32) as u8;
        let focus = self.mode.knob_mode.is_focus();
        if focus && self.mixer.focus_page > max_page {
            debug!("Send count {} drops focus page to {}", count, max_page);
            self.update_track_focus_page(max_page);
        }
        if focus {
            self.pending
                .mark_all(&[UpdateType::SendsCount, UpdateType::Selection]);
        } else {
            let active = self.active_update_type();
            self.pending
                .mark_all(&[active, UpdateType::SendsCount, UpdateType::Selection]);
        }
    }

    pub(super) fn on_master_selected(&mut self, selected: bool) {
        self.mixer.master_selected = selected;
        if self.mixer.track_mode {
            self.pending.mark(UpdateType::SendsCount);
        }
    }

    pub(super) fn on_send_name_bank_scrolled(&mut self, position: i32) {
        self.mixer.send_names.scroll.report(position);
    }

    pub(super) fn on_send_name_slot(&mut self, slot: u8, name: Option<String>) {
        if let Some(entry) = self.mixer.send_names.names.get_mut(slot as usize) {
            *entry = name;
        }
    }

    // ===== Surface commands =====

    pub(super) fn set_track_offset(&mut self, position: i32) {
        let side = self.mode.mixer_side;
        let view = self.mixer.view_mut(side);
        if view.scroll.request(position) {
            let bank = view.bank();
            self.host(HostCommand::ScrollTrackBank { bank, position });
        }
        if self.mode.in_plugin_mode {
            self.pending
                .mark(UpdateType::for_source(FocusSource::for_side(side)));
        } else {
            self.out.suspend_cc();
            let active = self.active_update_type();
            self.pending.mark_all(&[
                active,
                UpdateType::Selection,
                UpdateType::UpdateControls,
            ]);
        }
    }

    pub(super) fn select_track(&mut self, index: i32) {
        match self.mixer.view(self.mode.mixer_side).track_at(index) {
            Some(track) => {
                self.host(HostCommand::SelectTrack(track));
                self.pending.mark(UpdateType::Selection);
            }
            None => trace!("Track {} not in the visible window", index),
        }
    }

    pub(super) fn toggle_group(&mut self, index: i32) {
        if let Some(track) = self.mixer.view(self.mode.mixer_side).track_at(index) {
            self.host(HostCommand::ToggleGroupExpanded(track));
        }
    }

    pub(super) fn request_send_names(&mut self, page: i32, now: Instant) {
        if self.mixer.send_names.scroll.request(page) {
            self.host(HostCommand::ScrollSendNameBank { position: page });
        }
        self.timed.schedule_once(
            TimedAction::SendNames,
            self.tuning.send_names_delay(),
            now,
        );
    }

    // ===== Surface state =====

    pub(super) fn send_send_names(&mut self) {
        let bank = &self.mixer.send_names;
        let names: [DisplayName; BANK_SIZE] = std::array::from_fn(|i| {
            bank.names[i]
                .as_deref()
                .map_or_else(DisplayName::empty, DisplayName::label)
        });
        let offset = bank.scroll.live().clamp(0, 0x7F) as u8;
        self.out.sysex(outbound::send_names(offset, &names));
    }

    /// Send count and the cursor send name block
    fn send_send_states(&mut self) {
        let count = if self.mixer.track_mode && self.mixer.master_selected {
            0
        } else {
            self.mixer.send_count
        };
        self.out.sysex(outbound::send_count(count));

        let sends = &self.mixer.sends;
        let names: [DisplayName; BANK_SIZE] = std::array::from_fn(|k| {
            sends
                .existing(sends.absolute(k as i32))
                .map_or_else(DisplayName::empty, |s| DisplayName::label(&s.name))
        });
        let offset = (sends.section as i32 * FOCUS_SENDS_FIRST_PAGE) as u8;
        self.out.sysex(outbound::send_names(offset, &names));
    }

    fn send_track_block(&mut self, side: MixerSide) {
        let first = self.mixer.view(side).first_index();
        let count = self.mixer.view(side).count;
        let existing: Vec<TrackMirror> = (0..BANK_SIZE)
            .filter_map(|i| self.mixer.view(side).slot(i).cloned())
            .collect();

        self.out.sysex(outbound::track_count(count));
        self.out.sysex(outbound::first_track(first));
        for (i, track) in existing.iter().enumerate() {
            let descriptor = TrackDescriptor {
                index: first + i as i32,
                name: DisplayName::label(&track.name),
                color: self.palette.index_of(track.color),
                is_group: track.is_group,
            };
            self.out.sysex(outbound::track_detail(&descriptor));
        }
        self.out.sysex(outbound::end_track_detail());
    }

    fn selection_descriptor(&mut self) -> TrackDescriptor {
        let cursor = &self.mixer.cursor;
        TrackDescriptor {
            index: self.mixer.selected_track,
            name: DisplayName::label(&cursor.name),
            color: self.palette.index_of(cursor.color),
            is_group: cursor.is_group,
        }
    }

    // ===== Flushes =====

    pub(super) fn flush_mixer(&mut self, side: MixerSide, full_resync: bool) -> Flush {
        if !self.mixer.view(side).scroll.in_place() {
            return Flush::Deferred;
        }
        if std::mem::take(&mut self.mixer.view_mut(side).content_dirty) {
            self.send_send_states();
            self.send_track_block(side);
        }
        if !full_resync && self.shows_side(side) {
            self.sync_controls(false);
        }
        Flush::Done
    }

    pub(super) fn flush_sends_count(&mut self) -> Flush {
        let focus = self.mode.knob_mode.is_focus();
        if focus && !self.mixer.sends.scroll.in_place() {
            // The selection readout shows send values of the same window
            self.pending.defer(UpdateType::Selection);
            return Flush::Deferred;
        }
        self.send_send_states();
        if focus {
            self.sync_controls(false);
        }
        Flush::Done
    }

    pub(super) fn flush_selection(&mut self) -> Flush {
        if self.pending.is_deferred(UpdateType::Selection) {
            return Flush::Deferred;
        }
        if self.mixer.selected_track >= 0 {
            let descriptor = self.selection_descriptor();
            let force = std::mem::take(&mut self.mixer.force_selection);
            if force || self.mixer.last_selection.as_ref() != Some(&descriptor) {
                self.out.sysex(outbound::selection(&descriptor));
                self.mixer.last_selection = Some(descriptor);
            }
        }
        if self.mode.knob_mode.is_focus() {
            self.sync_controls(false);
        }
        Flush::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str) -> TrackMirror {
        TrackMirror {
            exists: true,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_track_mirror_reports_descriptor_changes() {
        let mut mirror = TrackMirror::default();
        assert!(mirror.apply(&TrackChange::Exists(true)));
        assert!(!mirror.apply(&TrackChange::Exists(true)));
        assert!(mirror.apply(&TrackChange::Name("Bass".to_string())));
        assert!(!mirror.apply(&TrackChange::Volume(0.3)));
        assert!(!mirror.apply(&TrackChange::Send { index: 2, value: 0.7 }));
        assert_eq!(mirror.value(MixerParam::Volume), Some(0.3));
        assert_eq!(mirror.value(MixerParam::Send(2)), Some(0.7));
        assert_eq!(mirror.value(MixerParam::Send(3)), None);
    }

    #[test]
    fn test_master_side_appends_master_track() {
        let mut view = MixView::new(MixerSide::Master);
        view.slots[0] = track("FX A");
        view.slots[1] = track("FX B");
        view.master = track("Master");
        assert_eq!(view.set_track_count(2), None);

        assert_eq!(view.count, 3);
        assert_eq!(view.track_ref(1), Some(TrackRef::Effect(1)));
        assert_eq!(view.track_ref(2), Some(TrackRef::Master));
        assert_eq!(view.track_ref(3), None);
        assert_eq!(view.track_at(2), Some(TrackRef::Master));
    }

    #[test]
    fn test_shrinking_count_scrolls_back_one_bank() {
        let mut view = MixView::new(MixerSide::Main);
        view.scroll.request(16);
        view.scroll.report(16);
        assert_eq!(view.set_track_count(12), Some(8));
        assert!(!view.scroll.in_place());
        assert_eq!(view.set_track_count(40), None);
    }

    #[test]
    fn test_focus_send_mapping() {
        let mut mixer = MixerState::new();
        for i in 0..10u8 {
            mixer.sends.sends.insert(
                i,
                SendMirror {
                    exists: true,
                    name: format!("S{}", i),
                    value: i as f64 / 10.0,
                },
            );
        }
        assert_eq!(mixer.focus_send(0, true), None);
        assert_eq!(mixer.focus_send(2, true), Some(0));
        assert_eq!(mixer.focus_send(7, true), Some(5));

        mixer.sends.section = 1;
        assert_eq!(mixer.focus_send(0, false), Some(6));
        assert_eq!(mixer.focus_send(4, false), None);
    }
}
