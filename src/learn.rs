//! Parameter learning
//!
//! A sweep pushes a parameter through `steps + 1` evenly spaced values, one per
//! scheduler tick, and records the display text the host reports for each
//! position. Value and display notifications arrive independently; each
//! display is filed under the raster index of the most recent value seen for
//! the swept parameter, or of the last pushed step if no value came back.

use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Default number of sweep intervals
pub const DEFAULT_SWEEP_STEPS: u32 = 48;

/// Most labels a stepped parameter can carry
pub const MAX_STEPPED_LABELS: usize = 24;

/// Display text captured at one raster position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSample {
    pub raster_index: u32,
    pub display_text: String,
}

/// Outcome of a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// 0 = continuous
    pub step_count: u8,
    pub center_detent: bool,
    /// Ordered step labels, only for stepped parameters
    pub labels: Vec<String>,
}

impl Classification {
    pub fn is_stepped(&self) -> bool {
        self.step_count > 0
    }
}

/// Classify a parameter from its captured samples
pub fn classify(samples: &[StepSample], max_stepped: usize) -> Classification {
    let mut ordered: Vec<&StepSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.raster_index);

    let mut distinct: Vec<String> = Vec::new();
    for sample in ordered {
        if distinct.last() != Some(&sample.display_text) {
            distinct.push(sample.display_text.clone());
        }
    }

    let count = distinct.len();
    if count > 1 && count <= max_stepped.min(MAX_STEPPED_LABELS) {
        Classification {
            step_count: count as u8,
            center_detent: false,
            labels: distinct,
        }
    } else {
        Classification {
            step_count: 0,
            center_detent: is_center_detent(&distinct),
            labels: Vec::new(),
        }
    }
}

/// `-x` first and `+x` or `x` last, with a numeric magnitude
pub fn is_center_detent(labels: &[String]) -> bool {
    let (Some(first), Some(last)) = (labels.first(), labels.last()) else {
        return false;
    };
    if labels.len() < 2 {
        return false;
    }
    let Some(magnitude) = first.strip_prefix('-') else {
        return false;
    };
    let last_magnitude = last.strip_prefix('+').unwrap_or(last);
    magnitude.starts_with(|c: char| c.is_ascii_digit() || c == '.') && magnitude == last_magnitude
}

/// What the caller must do after advancing a sweep
#[derive(Debug, Clone, PartialEq)]
pub enum SweepStep {
    /// Push `value` to the host parameter at `path`
    Push { path: String, value: f64 },
    /// All positions visited; restore and report
    Finished(SweepResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub pid: String,
    pub path: String,
    pub original_value: f64,
    pub classification: Classification,
}

#[derive(Debug)]
struct Sweep {
    pid: String,
    path: String,
    original_value: f64,
    next_step: u32,
    current_raster: Option<u32>,
    samples: BTreeMap<u32, String>,
}

/// Drives one sweep at a time
#[derive(Debug)]
pub struct LearnEngine {
    steps: u32,
    max_stepped: usize,
    sweep: Option<Sweep>,
}

impl Default for LearnEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_STEPS, MAX_STEPPED_LABELS)
    }
}

impl LearnEngine {
    pub fn new(steps: u32, max_stepped: usize) -> Self {
        Self {
            steps: steps.max(1),
            max_stepped,
            sweep: None,
        }
    }

    /// Apply new limits; an in-flight sweep keeps running with them
    pub fn set_limits(&mut self, steps: u32, max_stepped: usize) {
        self.steps = steps.max(1);
        self.max_stepped = max_stepped;
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep.is_some()
    }

    pub fn sweeping_pid(&self) -> Option<&str> {
        self.sweep.as_ref().map(|s| s.pid.as_str())
    }

    /// Start sweeping `pid`; refused while another sweep runs
    pub fn begin(&mut self, pid: &str, path: &str, original_value: f64) -> bool {
        if let Some(active) = &self.sweep {
            trace!("Sweep of '{}' running, ignoring '{}'", active.pid, pid);
            return false;
        }
        debug!("Learning '{}' from {:.3}", pid, original_value);
        self.sweep = Some(Sweep {
            pid: pid.to_string(),
            path: path.to_string(),
            original_value,
            next_step: 0,
            current_raster: None,
            samples: BTreeMap::new(),
        });
        true
    }

    /// Value notification for `pid`
    pub fn capture_value(&mut self, pid: &str, value: f64) {
        let steps = self.steps;
        if let Some(sweep) = self.sweep.as_mut().filter(|s| s.pid == pid) {
            sweep.current_raster = Some((value.clamp(0.0, 1.0) * steps as f64).round() as u32);
        }
    }

    /// Display notification for `pid`; blank text is ignored
    pub fn capture_display(&mut self, pid: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(sweep) = self.sweep.as_mut().filter(|s| s.pid == pid) {
            if let Some(raster) = sweep.current_raster {
                sweep
                    .samples
                    .entry(raster)
                    .or_insert_with(|| text.to_string());
            }
        }
    }

    /// Move the sweep forward by one tick
    pub fn advance(&mut self) -> Option<SweepStep> {
        let steps = self.steps;
        let sweep = self.sweep.as_mut()?;

        if sweep.next_step <= steps {
            let step = sweep.next_step;
            sweep.next_step += 1;
            sweep.current_raster = Some(step);
            return Some(SweepStep::Push {
                path: sweep.path.clone(),
                value: step as f64 / steps as f64,
            });
        }

        let sweep = self.sweep.take()?;
        let samples: Vec<StepSample> = sweep
            .samples
            .into_iter()
            .map(|(raster_index, display_text)| StepSample {
                raster_index,
                display_text,
            })
            .collect();
        let classification = classify(&samples, self.max_stepped);
        debug!(
            "Learned '{}': {} samples, steps={}, center_detent={}",
            sweep.pid,
            samples.len(),
            classification.step_count,
            classification.center_detent
        );
        Some(SweepStep::Finished(SweepResult {
            pid: sweep.pid,
            path: sweep.path,
            original_value: sweep.original_value,
            classification,
        }))
    }

    /// Abort the running sweep; returns the path and the value it started from
    pub fn cancel(&mut self) -> Option<(String, f64)> {
        let sweep = self.sweep.take()?;
        debug!(
            "Sweep of '{}' cancelled, restoring {:.3}",
            sweep.pid, sweep.original_value
        );
        Some((sweep.path, sweep.original_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(labels: &[(u32, &str)]) -> Vec<StepSample> {
        labels
            .iter()
            .map(|(r, t)| StepSample {
                raster_index: *r,
                display_text: t.to_string(),
            })
            .collect()
    }

    /// Run a sweep against a synthetic parameter, echoing value and display
    fn run_sweep(
        engine: &mut LearnEngine,
        display: impl Fn(f64) -> String,
    ) -> (Vec<f64>, SweepResult) {
        let mut pushed = Vec::new();
        loop {
            match engine.advance().expect("sweep running") {
                SweepStep::Push { value, .. } => {
                    pushed.push(value);
                    engine.capture_value("p", value);
                    engine.capture_display("p", &display(value));
                }
                SweepStep::Finished(result) => return (pushed, result),
            }
        }
    }

    #[test]
    fn test_four_step_parameter() {
        let mut engine = LearnEngine::default();
        assert!(engine.begin("p", "CONTENTS/p", 0.3));
        let (pushed, result) = run_sweep(&mut engine, |v| ((v * 4.0).floor() as u32).min(3).to_string());

        assert_eq!(pushed.len(), 49);
        assert_eq!(pushed[0], 0.0);
        assert_eq!(*pushed.last().unwrap(), 1.0);
        assert_eq!(result.classification.step_count, 4);
        assert!(!result.classification.center_detent);
        assert_eq!(result.classification.labels, vec!["0", "1", "2", "3"]);
        assert_eq!(result.original_value, 0.3);
        assert!(!engine.is_sweeping());
    }

    #[test]
    fn test_continuous_center_detent() {
        let mut engine = LearnEngine::default();
        engine.begin("p", "CONTENTS/p", 0.5);
        let (_, result) = run_sweep(&mut engine, |v| format!("{:+.1}", (v - 0.5) * 100.0));
        assert_eq!(result.classification.step_count, 0);
        assert!(result.classification.center_detent);
        assert!(result.classification.labels.is_empty());
    }

    #[test]
    fn test_continuous_unipolar() {
        let mut engine = LearnEngine::default();
        engine.begin("p", "CONTENTS/p", 0.0);
        let (_, result) = run_sweep(&mut engine, |v| format!("{:.1} %", v * 100.0));
        assert_eq!(result.classification.step_count, 0);
        assert!(!result.classification.center_detent);
    }

    #[test]
    fn test_display_without_value_uses_pushed_step() {
        let mut engine = LearnEngine::new(2, MAX_STEPPED_LABELS);
        engine.begin("p", "CONTENTS/p", 0.0);
        for label in ["Off", "Half", "On"] {
            assert!(matches!(engine.advance(), Some(SweepStep::Push { .. })));
            engine.capture_display("p", label);
        }
        match engine.advance() {
            Some(SweepStep::Finished(result)) => {
                assert_eq!(result.classification.labels, vec!["Off", "Half", "On"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_late_display_keyed_by_value_raster() {
        let mut engine = LearnEngine::new(4, MAX_STEPPED_LABELS);
        engine.begin("p", "CONTENTS/p", 0.0);
        engine.advance();
        engine.advance();
        // the value for step 0 is reported after step 1 was pushed
        engine.capture_value("p", 0.0);
        engine.capture_display("p", "A");
        engine.capture_value("p", 0.25);
        engine.capture_display("p", "B");
        engine.capture_display("p", "ignored duplicate for raster 1");
        let sweep = engine.sweep.as_ref().unwrap();
        assert_eq!(sweep.samples.get(&0).map(String::as_str), Some("A"));
        assert_eq!(sweep.samples.get(&1).map(String::as_str), Some("B"));
    }

    #[test]
    fn test_other_parameters_and_blank_ignored() {
        let mut engine = LearnEngine::new(1, MAX_STEPPED_LABELS);
        engine.begin("p", "CONTENTS/p", 0.0);
        engine.advance();
        engine.capture_value("q", 1.0);
        engine.capture_display("q", "other");
        engine.capture_display("p", "   ");
        assert!(engine.sweep.as_ref().unwrap().samples.is_empty());
    }

    #[test]
    fn test_single_sweep_at_a_time() {
        let mut engine = LearnEngine::default();
        assert!(engine.begin("p", "CONTENTS/p", 0.0));
        assert!(!engine.begin("q", "CONTENTS/q", 0.0));
        assert_eq!(engine.sweeping_pid(), Some("p"));
        engine.cancel();
        assert!(engine.advance().is_none());
        assert!(engine.begin("q", "CONTENTS/q", 0.0));
    }

    #[test]
    fn test_cancel_returns_starting_value() {
        let mut engine = LearnEngine::default();
        assert_eq!(engine.cancel(), None);

        engine.begin("p", "CONTENTS/p", 0.75);
        for _ in 0..5 {
            engine.advance();
        }
        assert_eq!(engine.cancel(), Some(("CONTENTS/p".to_string(), 0.75)));
        assert!(!engine.is_sweeping());
        assert_eq!(engine.cancel(), None);
    }

    #[test]
    fn test_classify_dedupes_consecutive_only() {
        let result = classify(&samples(&[(0, "A"), (1, "A"), (2, "B"), (3, "A")]), 24);
        assert_eq!(result.labels, vec!["A", "B", "A"]);
        assert_eq!(result.step_count, 3);
    }

    #[test]
    fn test_classify_single_label_is_continuous() {
        let result = classify(&samples(&[(0, "Fixed"), (48, "Fixed")]), 24);
        assert_eq!(result.step_count, 0);
        assert!(!result.center_detent);
    }

    #[test]
    fn test_classify_too_many_labels() {
        let many: Vec<StepSample> = (0..30)
            .map(|i| StepSample {
                raster_index: i,
                display_text: format!("{}", i),
            })
            .collect();
        assert_eq!(classify(&many, 24).step_count, 0);
    }

    #[test]
    fn test_center_detent_rules() {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert!(is_center_detent(&s(&["-50", "0", "+50"])));
        assert!(is_center_detent(&s(&["-12 dB", "12 dB"])));
        assert!(!is_center_detent(&s(&["-50", "+49"])));
        assert!(!is_center_detent(&s(&["L50", "R50"])));
        assert!(!is_center_detent(&s(&["-inf", "+inf"])));
        assert!(!is_center_detent(&s(&["-50"])));
    }
}
