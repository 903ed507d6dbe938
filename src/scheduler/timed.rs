//! Timed events and the display reset debouncer
//!
//! Both are polled once per tick with the tick's `Instant`; nothing here
//! spawns tasks or sleeps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation handle shared between the queue and the event's creator
#[derive(Debug, Clone, Default)]
pub struct EventHandle(Arc<AtomicBool>);

impl EventHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Once { due: Instant },
    Repeat { next_due: Instant, interval: Duration },
}

#[derive(Debug)]
struct TimedEvent<A> {
    action: A,
    schedule: Schedule,
    handle: EventHandle,
}

/// Delayed one-shot and repeating actions
#[derive(Debug)]
pub struct TimedEventQueue<A> {
    events: Vec<TimedEvent<A>>,
}

impl<A> Default for TimedEventQueue<A> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<A: Clone> TimedEventQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `action` once, `delay` after `now`
    pub fn schedule_once(&mut self, action: A, delay: Duration, now: Instant) -> EventHandle {
        self.push(action, Schedule::Once { due: now + delay })
    }

    /// Fire `action` after `initial_delay`, then every `interval` until cancelled
    ///
    /// The immediate first invocation is the caller's to run.
    pub fn schedule_repeat(
        &mut self,
        action: A,
        initial_delay: Duration,
        interval: Duration,
        now: Instant,
    ) -> EventHandle {
        self.push(
            action,
            Schedule::Repeat {
                next_due: now + initial_delay,
                interval,
            },
        )
    }

    fn push(&mut self, action: A, schedule: Schedule) -> EventHandle {
        let handle = EventHandle::default();
        self.events.push(TimedEvent {
            action,
            schedule,
            handle: handle.clone(),
        });
        handle
    }

    /// Collect due actions in scheduling order
    pub fn poll(&mut self, now: Instant) -> Vec<A> {
        let mut fired = Vec::new();
        self.events.retain_mut(|event| {
            if event.handle.is_cancelled() {
                return false;
            }
            match &mut event.schedule {
                Schedule::Once { due } => {
                    if *due <= now {
                        fired.push(event.action.clone());
                        false
                    } else {
                        true
                    }
                }
                Schedule::Repeat { next_due, interval } => {
                    if *next_due <= now {
                        fired.push(event.action.clone());
                        *next_due += *interval;
                        if *next_due <= now {
                            *next_due = now + *interval;
                        }
                    }
                    true
                }
            }
        });
        fired
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Restores a slot's label once its transient readout goes stale
#[derive(Debug)]
pub struct DisplayResetDebouncer<R> {
    slots: Vec<Option<(R, Instant)>>,
    timeout: Duration,
}

impl<R> DisplayResetDebouncer<R> {
    pub fn new(slot_count: usize, timeout: Duration) -> Self {
        let mut slots = Vec::with_capacity(slot_count);
        slots.resize_with(slot_count, || None);
        Self { slots, timeout }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// A readout was just shown on `slot`; `reset` runs if nothing follows
    pub fn notify(&mut self, slot: usize, reset: R, now: Instant) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some((reset, now));
        }
    }

    pub fn clear(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
    }

    pub fn is_pending(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    /// Resets for slots idle for longer than the timeout
    pub fn poll(&mut self, now: Instant) -> Vec<R> {
        let timeout = self.timeout;
        self.slots
            .iter_mut()
            .filter(|entry| matches!(entry, Some((_, at)) if now.duration_since(*at) > timeout))
            .filter_map(|entry| entry.take().map(|(reset, _)| reset))
            .collect()
    }
}
