//! Delta computation for incremental artifact updates

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CategoryIds;
use crate::category::Category;
use crate::model::{Artifact, ArtifactId};

/// How an artifact changed between two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Additions,
    Updates,
    Deletions,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Additions => "additions",
            EventType::Updates => "updates",
            EventType::Deletions => "deletions",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an artifact that is still present gets reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePolicy {
    /// Every artifact seen again is reported as an update.
    #[default]
    Always,
    /// Only artifacts whose payload changed are reported as updates.
    Changed,
}

impl FromStr for UpdatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(UpdatePolicy::Always),
            "changed" => Ok(UpdatePolicy::Changed),
            other => Err(format!("unknown update policy `{}`", other)),
        }
    }
}

type Bucket = BTreeMap<ArtifactId, Artifact>;

/// `category -> event -> id -> artifact`, the unit every recompute returns.
///
/// An id lives in at most one event bucket per category. Empty buckets are
/// never kept, so an empty delta means nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactDelta {
    entries: BTreeMap<Category, BTreeMap<EventType, Bucket>>,
}

impl ArtifactDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `artifact` under `category`/`event`, evicting the same id from
    /// the category's other buckets.
    pub fn insert(&mut self, category: Category, event: EventType, artifact: Artifact) {
        let events = self.entries.entry(category).or_default();
        for (other, bucket) in events.iter_mut() {
            if *other != event {
                bucket.remove(&artifact.id);
            }
        }
        events.retain(|_, bucket| !bucket.is_empty());
        events
            .entry(event)
            .or_default()
            .insert(artifact.id.clone(), artifact);
    }

    pub fn bucket(&self, category: Category, event: EventType) -> Option<&BTreeMap<ArtifactId, Artifact>> {
        self.entries.get(&category).and_then(|events| events.get(&event))
    }

    /// Ids reported under `category`/`event`, in id order.
    pub fn ids(&self, category: Category, event: EventType) -> Vec<&ArtifactId> {
        self.bucket(category, event)
            .map(|bucket| bucket.keys().collect())
            .unwrap_or_default()
    }

    /// The event an id was reported under, if any.
    pub fn event_of(&self, category: Category, id: &ArtifactId) -> Option<EventType> {
        self.entries
            .get(&category)?
            .iter()
            .find(|(_, bucket)| bucket.contains_key(id))
            .map(|(event, _)| *event)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.keys().copied()
    }

    /// Number of artifacts reported under `event` across all categories.
    pub fn count(&self, event: EventType) -> usize {
        self.entries
            .values()
            .filter_map(|events| events.get(&event))
            .map(BTreeMap::len)
            .sum()
    }

    /// Iterate every `(category, event, artifact)` triple.
    pub fn iter(&self) -> impl Iterator<Item = (Category, EventType, &Artifact)> {
        self.entries.iter().flat_map(|(category, events)| {
            events.iter().flat_map(move |(event, bucket)| {
                bucket.values().map(move |artifact| (*category, *event, artifact))
            })
        })
    }

    /// Union another delta into this one.
    pub fn merge(&mut self, other: ArtifactDelta) {
        for (category, events) in other.entries {
            for (event, bucket) in events {
                for artifact in bucket.into_values() {
                    self.insert(category, event, artifact);
                }
            }
        }
    }
}

/// `category -> id -> artifact`, the current state of a whole project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactIndex {
    entries: BTreeMap<Category, Bucket>,
}

impl ArtifactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, artifact: Artifact) {
        self.entries
            .entry(category)
            .or_default()
            .insert(artifact.id.clone(), artifact);
    }

    pub fn get(&self, category: Category, id: &ArtifactId) -> Option<&Artifact> {
        self.entries.get(&category)?.get(id)
    }

    pub fn category(&self, category: Category) -> Option<&BTreeMap<ArtifactId, Artifact>> {
        self.entries.get(&category)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn artifacts(&self) -> impl Iterator<Item = (Category, &Artifact)> {
        self.entries
            .iter()
            .flat_map(|(category, bucket)| bucket.values().map(move |a| (*category, a)))
    }
}

/// Decide addition vs. update for `id`, consuming one matching entry from
/// `remaining`. Whatever is left in `remaining` afterwards was deleted.
pub fn classify_event(remaining: &mut Vec<ArtifactId>, id: &ArtifactId) -> EventType {
    match remaining.iter().position(|candidate| candidate == id) {
        Some(pos) => {
            remaining.remove(pos);
            EventType::Updates
        }
        None => EventType::Additions,
    }
}

/// Scratch copy of a document's previous ids, consumed during one recompute.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    remaining: BTreeMap<Category, Vec<ArtifactId>>,
}

impl WorkingSet {
    pub fn from_previous(previous: &CategoryIds) -> Self {
        WorkingSet {
            remaining: previous.clone(),
        }
    }

    pub fn classify(&mut self, category: Category, id: &ArtifactId) -> EventType {
        match self.remaining.get_mut(&category) {
            Some(remaining) => classify_event(remaining, id),
            None => EventType::Additions,
        }
    }

    /// Ids never matched during the pass, as deletion tombstones.
    pub fn into_deletions(self) -> impl Iterator<Item = (Category, Artifact)> {
        self.remaining.into_iter().flat_map(|(category, ids)| {
            ids.into_iter()
                .map(move |id| (category, Artifact::tombstone(id)))
        })
    }
}
