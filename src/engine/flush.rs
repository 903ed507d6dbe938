//! The scheduler tick

use std::time::Instant;
use tracing::{debug, trace};

use super::{DisplayReset, Engine, TimedAction};
use crate::host::HostCommand;
use crate::learn::{SweepResult, SweepStep};
use crate::mode::MixerSide;
use crate::protocol::codec::DisplayName;
use crate::protocol::outbound;
use crate::scheduler::UpdateType;

/// Outcome of flushing one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flush {
    Done,
    /// The category's view has not settled; retry next tick
    Deferred,
}

/// Labels a learned descriptor may carry inline
pub(super) const MAX_INLINE_LABELS: usize = 16;

impl Engine {
    /// Flush dirty categories, then run due timers and one sweep step
    pub fn tick(&mut self, now: Instant) {
        let _entered = self.span.clone().entered();
        if !self.out.is_initialized() {
            return;
        }

        let plan = self.pending.begin_pass();
        let full_resync = plan.contains(&UpdateType::UpdateControls);
        if full_resync {
            self.out.suspend_cc();
        }
        if !plan.is_empty() {
            trace!("Flushing {:?}", plan);
        }

        for update in plan {
            let result = match update {
                UpdateType::MixerMaster => self.flush_mixer(MixerSide::Master, full_resync),
                UpdateType::MixerMain => self.flush_mixer(MixerSide::Main, full_resync),
                UpdateType::SendsCount => self.flush_sends_count(),
                UpdateType::Plugin => self.flush_plugin(full_resync),
                UpdateType::Selection => self.flush_selection(),
                UpdateType::UpdateControls => {
                    self.sync_controls(true);
                    Flush::Done
                }
            };
            match result {
                Flush::Done => self.pending.record_flush(update),
                Flush::Deferred if !self.pending.is_deferred(update) => self.pending.defer(update),
                Flush::Deferred => {}
            }
        }
        self.pending.end_pass();

        if full_resync {
            self.out.resume_cc();
        }

        for action in self.timed.poll(now) {
            self.run_timed(action);
        }
        for reset in self.debouncer.poll(now) {
            self.reset_display(reset);
        }
        self.advance_learning();
    }

    fn run_timed(&mut self, action: TimedAction) {
        trace!("Timed {:?}", action);
        match action {
            TimedAction::Transport(action) => self.host(HostCommand::Transport(action)),
            TimedAction::ObserveParameters => self.observe_assigned_parameters(),
            TimedAction::MacroUpdate => {
                self.plugin.macro_update_pending = false;
                self.send_macro_descriptors();
            }
            TimedAction::SendNames => self.send_send_names(),
        }
    }

    /// Put a control's label back after a value readout
    fn reset_display(&mut self, reset: DisplayReset) {
        match reset {
            DisplayReset::Parameter { pid } => {
                let Some(param) = self.registry.active().and_then(|s| s.parameter(&pid)) else {
                    return;
                };
                match u8::try_from(param.index) {
                    Ok(index) if index < 0x7F => {
                        let frame = outbound::rename_parameter(
                            index,
                            &param.hash,
                            &DisplayName::label(&param.name),
                        );
                        self.out.sysex(frame);
                    }
                    _ => trace!("No rename for '{}' at index {}", pid, param.index),
                }
            }
            DisplayReset::Macro { index } => {
                let Some(m) = self.plugin.macros.get(index as usize) else {
                    return;
                };
                let frame = outbound::rename_parameter(
                    index,
                    &m.hash,
                    &DisplayName::label(&m.current_name),
                );
                self.out.sysex(frame);
            }
        }
    }

    fn advance_learning(&mut self) {
        match self.learn.advance() {
            Some(SweepStep::Push { path, value }) => {
                self.host(HostCommand::SetParameter { path, value })
            }
            Some(SweepStep::Finished(result)) => self.finish_sweep(result),
            None => {}
        }
    }

    fn finish_sweep(&mut self, result: SweepResult) {
        self.host(HostCommand::SetParameter {
            path: result.path.clone(),
            value: result.original_value,
        });

        let Some(param) = self
            .registry
            .active_mut()
            .and_then(|s| s.parameter_mut(&result.pid))
        else {
            debug!("Swept '{}' is gone, dropping result", result.pid);
            return;
        };
        let classification = result.classification;
        param.normalized_value = result.original_value;
        param.step_count = classification.step_count;
        param.center_detent = classification.center_detent;
        param.labels = classification.labels;
        param.learned = true;

        let learned = param.to_learned(MAX_INLINE_LABELS);
        self.out.sysex(outbound::parameter_learned(&learned));
    }
}
