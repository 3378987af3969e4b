//! Label set computation.
//!
//! Labels are keyed by name. The snapshot's labels are the starting point and
//! label events newer than the snapshot are replayed on top, oldest first.
//! Only GitHub emits label events; the other hosts' label sets come from the
//! snapshot alone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::event::{EventPayload, History};
use crate::host::Snapshot;
use crate::model::Label;

/// Labels keyed by name, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeMap<String, Label>,
}

impl LabelSet {
    /// Insert `label`, replacing the color and description of an existing
    /// label with the same name.
    pub fn add(&mut self, label: Label) {
        self.labels.insert(label.name.clone(), label);
    }

    /// Remove the label called `name`. Removing an absent label is a no-op.
    pub fn remove(&mut self, name: &str) {
        self.labels.remove(name);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Apply every label event in `history` newer than `since`.
    pub fn replay(&mut self, history: &History<'_>, since: Option<DateTime<Utc>>) {
        let events = history
            .iter()
            .filter(|event| since.is_none_or(|boundary| event.timestamp() > boundary));
        for event in events {
            match &event.payload {
                EventPayload::GitHubLabeled(added) => self.add(added.label.clone()),
                EventPayload::GitHubUnlabeled(removed) => self.remove(&removed.label.name),
                _ => {}
            }
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Label> {
        self.labels.into_values().collect()
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        let mut set = Self::default();
        for label in iter {
            set.add(label);
        }
        set
    }
}

/// Current labels of a changeset, sorted by name.
///
/// Without a snapshot every label event in `history` is replayed from an
/// empty set.
#[must_use]
pub fn compute_labels(snapshot: Option<&Snapshot>, history: &History<'_>) -> Vec<Label> {
    let (mut set, since) = snapshot.map_or_else(
        || (LabelSet::default(), None),
        |snapshot| {
            (
                snapshot.adapter().labels().into_iter().collect::<LabelSet>(),
                Some(snapshot.updated_at),
            )
        },
    );
    set.replay(history, since);
    set.into_vec()
}
