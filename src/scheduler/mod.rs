//! Update scheduling
//!
//! State changes only mark a category dirty; the engine flushes dirty
//! categories once per tick in a fixed priority order. A category whose view
//! has not settled yet is deferred to the next tick instead of being sent.

pub mod timed;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::trace;

use crate::mode::FocusSource;

pub use timed::{DisplayResetDebouncer, EventHandle, TimedEventQueue};

/// Update categories, declared in flush priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateType {
    MixerMaster,
    MixerMain,
    SendsCount,
    Plugin,
    Selection,
    UpdateControls,
}

impl UpdateType {
    pub const FLUSH_ORDER: [UpdateType; 6] = [
        UpdateType::MixerMaster,
        UpdateType::MixerMain,
        UpdateType::SendsCount,
        UpdateType::Plugin,
        UpdateType::Selection,
        UpdateType::UpdateControls,
    ];

    /// Category describing the content of a focus source
    pub fn for_source(source: FocusSource) -> Self {
        match source {
            FocusSource::MixerMain => UpdateType::MixerMain,
            FocusSource::MixerMaster => UpdateType::MixerMaster,
            FocusSource::Plugin => UpdateType::Plugin,
        }
    }
}

/// Dirty set with deferred carry-over
#[derive(Debug, Default)]
pub struct PendingUpdates {
    dirty: BTreeSet<UpdateType>,
    deferred: Vec<UpdateType>,
    flushed: HashMap<UpdateType, u64>,
}

impl PendingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a category dirty; repeated marks collapse
    pub fn mark(&mut self, update: UpdateType) {
        self.dirty.insert(update);
    }

    pub fn mark_all(&mut self, updates: &[UpdateType]) {
        self.dirty.extend(updates.iter().copied());
    }

    pub fn is_dirty(&self, update: UpdateType) -> bool {
        self.dirty.contains(&update)
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Take the dirty set in priority order
    ///
    /// Marks made while the pass runs land in the next tick.
    pub fn begin_pass(&mut self) -> Vec<UpdateType> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    /// Carry a category over to the next tick
    pub fn defer(&mut self, update: UpdateType) {
        trace!("Deferring {:?}", update);
        self.deferred.push(update);
    }

    /// True when `update` was deferred during the running pass
    pub fn is_deferred(&self, update: UpdateType) -> bool {
        self.deferred.contains(&update)
    }

    pub fn record_flush(&mut self, update: UpdateType) {
        trace!("Flushed {:?}", update);
        *self.flushed.entry(update).or_insert(0) += 1;
    }

    /// Merge deferred categories back into the dirty set
    pub fn end_pass(&mut self) {
        self.dirty.extend(self.deferred.drain(..));
    }

    /// Number of times `update` has been flushed
    pub fn flush_count(&self, update: UpdateType) -> u64 {
        self.flushed.get(&update).copied().unwrap_or(0)
    }
}

/// Requested and host-confirmed scroll offset of one bank
///
/// Content bound to the bank may only be flushed once the host reports the
/// requested offset. Offsets the host reports on its own, while nothing is
/// outstanding, are adopted as the new request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollPosition {
    requested: i32,
    live: i32,
    awaiting: bool,
}

impl ScrollPosition {
    /// Ask for `position`; true when the host has to be told
    pub fn request(&mut self, position: i32) -> bool {
        self.requested = position;
        self.awaiting = position != self.live;
        self.awaiting
    }

    /// Offset reported by the host
    pub fn report(&mut self, position: i32) {
        self.live = position;
        if !self.awaiting {
            self.requested = position;
        }
        if self.live == self.requested {
            self.awaiting = false;
        }
    }

    pub fn requested(&self) -> i32 {
        self.requested
    }

    pub fn live(&self) -> i32 {
        self.live
    }

    pub fn in_place(&self) -> bool {
        self.requested == self.live
    }
}

/// Holds back hi-res knob output while a resync is being assembled
///
/// Values are keyed by the high-byte CC; the low byte goes out on
/// base + 0x20.
#[derive(Debug, Default)]
pub struct CcGate {
    suspended: bool,
    pending: BTreeMap<u8, (u8, u8)>,
}

impl CcGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Returns the bytes back if they may be sent now, buffers them otherwise
    pub fn push(&mut self, cc: u8, high: u8, low: u8) -> Option<(u8, u8)> {
        if self.suspended {
            self.pending.insert(cc, (high, low));
            None
        } else {
            self.pending.remove(&cc);
            Some((high, low))
        }
    }

    /// Lift the suspension and hand back the latest value per CC
    pub fn resume(&mut self) -> Vec<(u8, u8, u8)> {
        self.suspended = false;
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(cc, (high, low))| (cc, high, low))
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order_not_insertion_order() {
        let mut pending = PendingUpdates::new();
        pending.mark(UpdateType::UpdateControls);
        pending.mark(UpdateType::Selection);
        pending.mark(UpdateType::MixerMaster);
        pending.mark(UpdateType::Plugin);
        assert_eq!(
            pending.begin_pass(),
            vec![
                UpdateType::MixerMaster,
                UpdateType::Plugin,
                UpdateType::Selection,
                UpdateType::UpdateControls,
            ]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_repeated_marks_collapse() {
        let mut pending = PendingUpdates::new();
        for _ in 0..5 {
            pending.mark(UpdateType::MixerMain);
        }
        assert_eq!(pending.begin_pass(), vec![UpdateType::MixerMain]);
    }

    #[test]
    fn test_deferred_carry_over() {
        let mut pending = PendingUpdates::new();
        pending.mark(UpdateType::MixerMain);
        let plan = pending.begin_pass();
        pending.defer(plan[0]);
        pending.mark(UpdateType::MixerMain);
        pending.end_pass();
        assert_eq!(pending.begin_pass(), vec![UpdateType::MixerMain]);
        pending.end_pass();
        assert!(pending.is_empty());
    }

    #[test]
    fn test_flush_counts() {
        let mut pending = PendingUpdates::new();
        pending.record_flush(UpdateType::Plugin);
        pending.record_flush(UpdateType::Plugin);
        assert_eq!(pending.flush_count(UpdateType::Plugin), 2);
        assert_eq!(pending.flush_count(UpdateType::Selection), 0);
    }

    #[test]
    fn test_update_type_for_source() {
        assert_eq!(UpdateType::for_source(FocusSource::MixerMaster), UpdateType::MixerMaster);
        assert_eq!(UpdateType::for_source(FocusSource::Plugin), UpdateType::Plugin);
    }

    #[test]
    fn test_is_deferred_only_within_pass() {
        let mut pending = PendingUpdates::new();
        pending.mark(UpdateType::SendsCount);
        pending.begin_pass();
        pending.defer(UpdateType::Selection);
        assert!(pending.is_deferred(UpdateType::Selection));
        pending.end_pass();
        assert!(!pending.is_deferred(UpdateType::Selection));
        assert!(pending.is_dirty(UpdateType::Selection));
    }

    #[test]
    fn test_scroll_position_waits_for_host() {
        let mut scroll = ScrollPosition::default();
        assert!(scroll.in_place());
        assert!(scroll.request(8));
        assert!(!scroll.in_place());

        // an intermediate report does not settle the request
        scroll.report(4);
        assert!(!scroll.in_place());
        scroll.report(8);
        assert!(scroll.in_place());

        assert!(!scroll.request(8));
    }

    #[test]
    fn test_scroll_position_adopts_host_scroll() {
        let mut scroll = ScrollPosition::default();
        scroll.report(16);
        assert!(scroll.in_place());
        assert_eq!(scroll.requested(), 16);
        assert_eq!(scroll.live(), 16);
    }

    #[test]
    fn test_cc_gate_latest_wins() {
        let mut gate = CcGate::new();
        assert_eq!(gate.push(0x0C, 1, 2), Some((1, 2)));

        gate.suspend();
        assert_eq!(gate.push(0x0C, 1, 2), None);
        assert_eq!(gate.push(0x0C, 3, 4), None);
        assert_eq!(gate.push(0x0F, 127, 127), None);
        assert_eq!(gate.pending_len(), 2);

        assert_eq!(gate.resume(), vec![(0x0C, 3, 4), (0x0F, 127, 127)]);
        assert!(!gate.is_suspended());
        assert_eq!(gate.pending_len(), 0);
        assert_eq!(gate.push(0x0C, 5, 6), Some((5, 6)));
    }
}
