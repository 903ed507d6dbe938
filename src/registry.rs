//! Parameter registry
//!
//! One [`DeviceParameterSet`] per device display name, created on first
//! encounter and kept in a bounded LRU. A set maps a parameter's last path
//! segment and its wire hash to the same [`ParameterDescriptor`], and holds
//! control assignments the surface asked for before the host delivered the
//! parameter list.

use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tracing::{debug, warn};

use crate::protocol::codec::{DisplayName, HashDigest};
use crate::protocol::inbound::ParameterRequest;
use crate::protocol::outbound::LearnedParameter;

/// Path prefix the host reports plugin parameters under
const CONTENTS_PREFIX: &str = "CONTENTS/";

/// Path prefix plugin parameters must be observed under
const PLUGIN_CONTENTS_PREFIX: &str = "CONTENTS/ROOT_GENERIC_MODULE/";

/// Last `/`-separated segment of a parameter path
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything known about one host parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Full path as reported by the host
    pub path_id: String,
    /// Last path segment, used to match value and display notifications
    pub display_id: String,
    pub hash: HashDigest,
    /// Position in the device's parameter list, sent as the wire index
    pub index: usize,
    pub name: String,
    /// 0 = continuous
    pub step_count: u8,
    pub center_detent: bool,
    pub normalized_value: f64,
    pub learned: bool,
    /// Step labels captured while learning
    pub labels: Vec<String>,
}

impl ParameterDescriptor {
    pub fn new(index: usize, path_id: &str) -> Self {
        Self {
            path_id: path_id.to_string(),
            display_id: last_segment(path_id).to_string(),
            hash: HashDigest::parameter(path_id),
            index,
            name: String::new(),
            step_count: 0,
            center_detent: false,
            normalized_value: 0.0,
            learned: false,
            labels: Vec::new(),
        }
    }

    /// Learned descriptor message contents
    ///
    /// Labels are inlined only for stepped parameters with at most
    /// `max_labels` steps.
    pub fn to_learned(&self, max_labels: usize) -> LearnedParameter {
        let labels: &[String] = if self.step_count > 0 && self.labels.len() <= max_labels {
            &self.labels
        } else {
            &[]
        };
        LearnedParameter {
            index: self.index as i32,
            hash: self.hash.clone(),
            is_macro: false,
            center_detent: self.center_detent,
            step_count: self.step_count,
            value: self.normalized_value,
            name: DisplayName::label(&self.name),
            labels: labels.iter().map(|l| DisplayName::label(l)).collect(),
        }
    }
}

/// Parameters of one device, keyed by display name
#[derive(Debug)]
pub struct DeviceParameterSet {
    name: String,
    is_plugin: bool,
    params: Vec<ParameterDescriptor>,
    by_pid: HashMap<String, usize>,
    by_hash: HashMap<String, usize>,
    observed_ids: Vec<String>,
    registered: bool,
    stashed_requests: Vec<ParameterRequest>,
    stashed_names: Vec<(String, String)>,
}

impl DeviceParameterSet {
    pub fn new(name: &str, is_plugin: bool) -> Self {
        Self {
            name: name.to_string(),
            is_plugin,
            params: Vec::new(),
            by_pid: HashMap::new(),
            by_hash: HashMap::new(),
            observed_ids: Vec::new(),
            registered: false,
            stashed_requests: Vec::new(),
            stashed_names: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_plugin(&self) -> bool {
        self.is_plugin
    }

    pub fn set_plugin(&mut self, is_plugin: bool) {
        self.is_plugin = is_plugin;
    }

    /// True once a non-empty parameter list has been registered
    pub fn has_parameters(&self) -> bool {
        self.registered
    }

    /// Register the device's full parameter list
    ///
    /// Only the first non-empty list is accepted. Returns the assignment
    /// requests stashed before the list arrived; the caller replays them.
    pub fn register_parameter_ids(&mut self, ids: &[String]) -> Vec<ParameterRequest> {
        if self.registered || ids.is_empty() {
            return Vec::new();
        }
        debug!("Registering {} parameters for '{}'", ids.len(), self.name);

        self.observed_ids = if self.is_plugin {
            ids.iter()
                .map(|id| id.replacen(CONTENTS_PREFIX, PLUGIN_CONTENTS_PREFIX, 1))
                .collect()
        } else {
            ids.to_vec()
        };

        for (index, id) in ids.iter().enumerate() {
            let descriptor = ParameterDescriptor::new(index, id);
            let key = descriptor.hash.key();
            if let Some(&existing) = self.by_hash.get(&key) {
                warn!(
                    "Hash collision in '{}': '{}' and '{}' share {}",
                    self.name, self.params[existing].path_id, id, key
                );
            } else {
                self.by_hash.insert(key, index);
            }
            self.by_pid.insert(descriptor.display_id.clone(), index);
            self.params.push(descriptor);
        }
        self.registered = true;

        for (id, name) in std::mem::take(&mut self.stashed_names) {
            self.register_name(&id, &name);
        }
        std::mem::take(&mut self.stashed_requests)
    }

    /// Attach a display name; stashes it when the id is not known yet
    pub fn register_name(&mut self, id: &str, name: &str) -> bool {
        match self.parameter_mut(last_segment(id)) {
            Some(param) => {
                param.name = name.to_string();
                true
            }
            None => {
                if !self.registered {
                    self.stashed_names.push((id.to_string(), name.to_string()));
                }
                false
            }
        }
    }

    /// Keep an assignment request until the parameter list arrives
    pub fn stash_request(&mut self, request: ParameterRequest) {
        self.stashed_requests.push(request);
    }

    pub fn stashed_requests(&self) -> &[ParameterRequest] {
        &self.stashed_requests
    }

    pub fn parameter(&self, pid: &str) -> Option<&ParameterDescriptor> {
        self.by_pid.get(pid).map(|&i| &self.params[i])
    }

    pub fn parameter_mut(&mut self, pid: &str) -> Option<&mut ParameterDescriptor> {
        let index = *self.by_pid.get(pid)?;
        self.params.get_mut(index)
    }

    pub fn parameter_by_hash(&self, hash: &HashDigest) -> Option<&ParameterDescriptor> {
        self.by_hash.get(&hash.key()).map(|&i| &self.params[i])
    }

    /// Ids to subscribe display observers to, with plugin prefixes applied
    pub fn observed_ids(&self) -> &[String] {
        &self.observed_ids
    }

    pub fn clear_learned(&mut self) {
        for param in &mut self.params {
            param.learned = false;
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Bounded cache of parameter sets with one active device
pub struct ParameterRegistry {
    sets: LruCache<String, DeviceParameterSet>,
    active: Option<String>,
}

impl ParameterRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sets: LruCache::new(Self::capacity(capacity)),
            active: None,
        }
    }

    fn capacity(capacity: usize) -> NonZeroUsize {
        NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN)
    }

    /// Change the cache bound; least recently used sets beyond it are dropped
    pub fn resize(&mut self, capacity: usize) {
        self.sets.resize(Self::capacity(capacity));
    }

    /// Make `name` the active device, creating its set on first encounter
    pub fn activate(&mut self, name: &str, is_plugin: bool) -> &mut DeviceParameterSet {
        if !self.sets.contains(name) {
            debug!("New parameter set for '{}' (plugin: {})", name, is_plugin);
            if self.sets.len() == self.sets.cap().get() {
                if let Some((evicted, _)) = self.sets.peek_lru() {
                    debug!("Evicting parameter set for '{}'", evicted);
                }
            }
        }
        self.active = Some(name.to_string());
        let set = self.sets.get_or_insert_mut(name.to_string(), || {
            DeviceParameterSet::new(name, is_plugin)
        });
        set.set_plugin(is_plugin);
        set
    }

    pub fn deactivate(&mut self) {
        self.active = None;
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&DeviceParameterSet> {
        self.sets.peek(self.active.as_deref()?)
    }

    pub fn active_mut(&mut self) -> Option<&mut DeviceParameterSet> {
        let name = self.active.as_deref()?;
        self.sets.get_mut(name)
    }

    pub fn get(&self, name: &str) -> Option<&DeviceParameterSet> {
        self.sets.peek(name)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::outbound::ControlType;

    fn ids(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn request_for(path: &str, slot: u8) -> ParameterRequest {
        ParameterRequest {
            index: 0,
            hash: HashDigest::parameter(path),
            control_type: ControlType::Knob,
            slot,
            is_macro: false,
        }
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("CONTENTS/ROOT_GENERIC_MODULE/cutoff"), "cutoff");
        assert_eq!(last_segment("cutoff"), "cutoff");
    }

    #[test]
    fn test_register_once() {
        let mut set = DeviceParameterSet::new("EQ+", false);
        assert!(set.register_parameter_ids(&[]).is_empty());
        assert!(!set.has_parameters());

        set.register_parameter_ids(&ids(&["CONTENTS/gain", "CONTENTS/freq"]));
        assert_eq!(set.len(), 2);
        set.register_parameter_ids(&ids(&["CONTENTS/other"]));
        assert_eq!(set.len(), 2);
        assert!(set.parameter("other").is_none());
    }

    #[test]
    fn test_lookup_by_pid_and_hash() {
        let mut set = DeviceParameterSet::new("EQ+", false);
        set.register_parameter_ids(&ids(&["CONTENTS/gain", "CONTENTS/freq"]));

        let freq = set.parameter("freq").unwrap();
        assert_eq!(freq.index, 1);
        let by_hash = set
            .parameter_by_hash(&HashDigest::parameter("CONTENTS/freq"))
            .unwrap();
        assert_eq!(by_hash.display_id, "freq");
        assert!(set
            .parameter_by_hash(&HashDigest::parameter("CONTENTS/missing"))
            .is_none());
    }

    #[test]
    fn test_plugin_ids_rewritten_for_observation() {
        let mut set = DeviceParameterSet::new("Diva", true);
        set.register_parameter_ids(&ids(&["CONTENTS/cutoff"]));
        assert_eq!(set.observed_ids(), ["CONTENTS/ROOT_GENERIC_MODULE/cutoff"]);
        // the hash stays on the reported path
        assert!(set
            .parameter_by_hash(&HashDigest::parameter("CONTENTS/cutoff"))
            .is_some());
    }

    #[test]
    fn test_stashed_requests_replayed_once() {
        let mut set = DeviceParameterSet::new("Diva", true);
        set.stash_request(request_for("CONTENTS/cutoff", 0));
        set.stash_request(request_for("CONTENTS/res", 1));

        let replay = set.register_parameter_ids(&ids(&["CONTENTS/cutoff", "CONTENTS/res"]));
        assert_eq!(replay.len(), 2);
        assert!(set.stashed_requests().is_empty());
        assert!(set.parameter_by_hash(&replay[1].hash).is_some());
    }

    #[test]
    fn test_names_before_ids_are_replayed() {
        let mut set = DeviceParameterSet::new("Diva", true);
        assert!(!set.register_name("CONTENTS/cutoff", "Cutoff"));
        set.register_parameter_ids(&ids(&["CONTENTS/cutoff"]));
        assert_eq!(set.parameter("cutoff").unwrap().name, "Cutoff");
        assert!(set.register_name("CONTENTS/cutoff", "Filter Cutoff"));
        assert_eq!(set.parameter("cutoff").unwrap().name, "Filter Cutoff");
    }

    #[test]
    fn test_clear_learned() {
        let mut set = DeviceParameterSet::new("Diva", false);
        set.register_parameter_ids(&ids(&["a", "b"]));
        set.parameter_mut("a").unwrap().learned = true;
        set.clear_learned();
        assert!(!set.parameter("a").unwrap().learned);
    }

    #[test]
    fn test_registry_is_bounded() {
        let mut registry = ParameterRegistry::new(2);
        registry.activate("A", false);
        registry.activate("B", false);
        registry.activate("C", true);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("A").is_none());
        assert_eq!(registry.active_name(), Some("C"));
        assert!(registry.active().unwrap().is_plugin());
    }

    #[test]
    fn test_registry_keeps_sets_per_name() {
        let mut registry = ParameterRegistry::new(8);
        registry
            .activate("EQ+", false)
            .register_parameter_ids(&ids(&["CONTENTS/gain"]));
        registry.activate("Comp", false);
        assert!(!registry.active().unwrap().has_parameters());
        assert!(registry.activate("EQ+", false).has_parameters());
    }
}
