use serde::{Deserialize, Serialize};

/// A label attached to a changeset.
///
/// Labels are identified by name alone; color and description ride along
/// from whichever snapshot or event last supplied them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}
