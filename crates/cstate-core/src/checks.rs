//! Reduction of concurrent CI signals to one [`CheckState`].
//!
//! Hosts report CI in different shapes (flat commit statuses, nested check
//! suites, single pipelines). Adapters turn each into per-key signals; this
//! module owns the two rules every host shares:
//!
//! - a later signal for the same key replaces the earlier one, and
//! - the combined state is the most urgent signal, with urgency ordered
//!   `Unknown < Passed < Failed < Pending`.

use std::collections::BTreeMap;

use crate::model::CheckState;

/// Combine signals by urgency. No signals at all is `Unknown`.
pub fn combine<I>(signals: I) -> CheckState
where
    I: IntoIterator<Item = CheckState>,
{
    signals.into_iter().max().unwrap_or_default()
}

/// Latest-wins signal map keyed by status context, suite ID or build key.
///
/// Callers feed signals oldest first; each key only remembers the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestByKey {
    signals: BTreeMap<String, CheckState>,
}

impl LatestByKey {
    pub fn record(&mut self, key: &str, state: CheckState) {
        if let Some(current) = self.signals.get_mut(key) {
            *current = state;
        } else {
            self.signals.insert(key.to_string(), state);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<CheckState> {
        self.signals.get(key).copied()
    }

    pub fn states(&self) -> impl Iterator<Item = CheckState> + '_ {
        self.signals.values().copied()
    }

    #[must_use]
    pub fn combined(&self) -> CheckState {
        combine(self.states())
    }
}
