//! Reasoning effort levels.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::warn;

/// How much reasoning the model should spend before answering.
///
/// `Disabled` sends no reasoning hint to the model server at all.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
    Disabled,
}

impl ReasoningEffort {
    /// Parse a user or file supplied value, falling back to the default.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().parse() {
            Ok(effort) => effort,
            Err(_) => {
                let fallback = Self::default();
                warn!(value, %fallback, "invalid reasoning effort, using default");
                fallback
            }
        }
    }

    /// Value sent as `reasoning_effort`, or `None` when disabled.
    pub fn as_request_value(self) -> Option<&'static str> {
        match self {
            Self::Low => Some("low"),
            Self::Medium => Some("medium"),
            Self::High => Some("high"),
            Self::Disabled => None,
        }
    }

    /// All accepted spellings, for help text.
    pub fn variants() -> Vec<String> {
        Self::iter().map(|e| e.to_string()).collect()
    }
}

impl Serialize for ReasoningEffort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for ReasoningEffort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_levels() {
        assert_eq!(ReasoningEffort::normalize("low"), ReasoningEffort::Low);
        assert_eq!(ReasoningEffort::normalize("HIGH"), ReasoningEffort::High);
        assert_eq!(ReasoningEffort::normalize(" disabled "), ReasoningEffort::Disabled);
    }

    #[test]
    fn invalid_values_fall_back_to_medium() {
        assert_eq!(ReasoningEffort::normalize("extreme"), ReasoningEffort::Medium);
        assert_eq!(ReasoningEffort::normalize(""), ReasoningEffort::Medium);
    }

    #[test]
    fn disabled_sends_no_request_value() {
        assert_eq!(ReasoningEffort::Disabled.as_request_value(), None);
        assert_eq!(ReasoningEffort::High.as_request_value(), Some("high"));
    }

    #[test]
    fn deserializing_normalizes() {
        let effort: ReasoningEffort = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(effort, ReasoningEffort::Medium);
        assert_eq!(serde_json::to_string(&ReasoningEffort::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn lists_four_variants() {
        assert_eq!(
            ReasoningEffort::variants(),
            vec!["low", "medium", "high", "disabled"]
        );
    }
}
