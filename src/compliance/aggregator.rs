//! Per-track compliance records keyed by track id.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::compliance::state::ComplianceState;

/// Untrusted observer output: item name to state string.
pub type RawObservations = HashMap<String, String>;

/// Compliance verdicts of one track, one entry per monitored item.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceRecord {
    track_id: u64,
    items: Arc<[String]>,
    states: Vec<ComplianceState>,
}

impl ComplianceRecord {
    fn new(track_id: u64, items: Arc<[String]>) -> Self {
        let states = vec![ComplianceState::Unknown; items.len()];
        Self {
            track_id,
            items,
            states,
        }
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    /// Current verdict for `item`, or `None` if the item is not monitored.
    pub fn get(&self, item: &str) -> Option<ComplianceState> {
        self.position(item).map(|i| self.states[i])
    }

    /// Items and verdicts in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ComplianceState)> + '_ {
        self.items
            .iter()
            .map(String::as_str)
            .zip(self.states.iter().copied())
    }

    fn position(&self, item: &str) -> Option<usize> {
        self.items.iter().position(|name| name == item)
    }

    fn observe(&mut self, item: &str, observed: ComplianceState) {
        match self.position(item) {
            Some(i) => {
                let current = self.states[i];
                let next = current.merge(observed);
                if next != current {
                    debug!("track {}: {item} {current} -> {next}", self.track_id);
                }
                self.states[i] = next;
            }
            None => debug!("track {}: ignoring unmonitored item {item:?}", self.track_id),
        }
    }
}

struct PpeStatus<'a>(&'a ComplianceRecord);

impl Serialize for PpeStatus<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.states.len()))?;
        for (item, state) in self.0.iter() {
            map.serialize_entry(item, &state)?;
        }
        map.end()
    }
}

impl Serialize for ComplianceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("ComplianceRecord", 2)?;
        record.serialize_field("track_id", &self.track_id)?;
        record.serialize_field("ppe_status", &PpeStatus(self))?;
        record.end()
    }
}

/// Owns one [`ComplianceRecord`] per live track id.
#[derive(Debug, Clone)]
pub struct ComplianceAggregator {
    items: Arc<[String]>,
    records: BTreeMap<u64, ComplianceRecord>,
}

impl ComplianceAggregator {
    /// Create an aggregator monitoring `items`, in order. Repeated names are kept once.
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for item in items {
            let item = item.into();
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Self {
            items: unique.into(),
            records: BTreeMap::new(),
        }
    }

    /// Monitored item names in configured order.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Merge typed observations into the record of `track_id`, creating it if needed.
    pub fn update<I, K>(&mut self, track_id: u64, observations: I)
    where
        I: IntoIterator<Item = (K, ComplianceState)>,
        K: AsRef<str>,
    {
        let items = &self.items;
        let record = self
            .records
            .entry(track_id)
            .or_insert_with(|| ComplianceRecord::new(track_id, Arc::clone(items)));
        for (item, observed) in observations {
            record.observe(item.as_ref(), observed);
        }
    }

    /// Parse untrusted observer output and merge it.
    ///
    /// Values that are not a recognised state are dropped.
    pub fn update_raw(&mut self, track_id: u64, observations: &RawObservations) {
        let parsed: Vec<(&str, ComplianceState)> = observations
            .iter()
            .filter_map(|(item, value)| match value.parse::<ComplianceState>() {
                Ok(state) => Some((item.as_str(), state)),
                Err(err) => {
                    debug!("track {track_id}: {item}: {err}");
                    None
                }
            })
            .collect();
        self.update(track_id, parsed);
    }

    /// Drop every record whose id is not in `active_ids`. Returns how many were dropped.
    pub fn prune(&mut self, active_ids: &[u64]) -> usize {
        let active: HashSet<u64> = active_ids.iter().copied().collect();
        let before = self.records.len();
        self.records.retain(|track_id, _| {
            let keep = active.contains(track_id);
            if !keep {
                debug!("dropping compliance record of track {track_id}");
            }
            keep
        });
        before - self.records.len()
    }

    pub fn get(&self, track_id: u64) -> Option<&ComplianceRecord> {
        self.records.get(&track_id)
    }

    /// All records, ascending by track id.
    pub fn snapshot(&self) -> Vec<ComplianceRecord> {
        self.records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
