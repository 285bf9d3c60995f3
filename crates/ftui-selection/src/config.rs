#![forbid(unsafe_code)]

//! Selector configuration.

use crate::policy::SelectionMode;

/// Configuration for a [`Selector`](crate::Selector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "state-persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
#[cfg_attr(feature = "state-persistence", serde(default))]
pub struct SelectorConfig {
    /// Single vs multi selection.
    pub mode: SelectionMode,
    /// Keep the primary selection aligned with the host's current item.
    pub sync_with_current: bool,
    /// Maintain hash indexes over the live and pending sets.
    pub identity_hashing: bool,
}

impl SelectorConfig {
    /// Single-select configuration.
    #[must_use]
    pub fn single() -> Self {
        Self::default()
    }

    /// Multi-select configuration.
    #[must_use]
    pub fn multiple() -> Self {
        Self::default().with_mode(SelectionMode::Multiple)
    }

    /// Set the selection mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable current-item synchronization.
    #[must_use]
    pub fn with_sync_with_current(mut self, enabled: bool) -> Self {
        self.sync_with_current = enabled;
        self
    }

    /// Enable or disable identity hashing.
    #[must_use]
    pub fn with_identity_hashing(mut self, enabled: bool) -> Self {
        self.identity_hashing = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let config = SelectorConfig::multiple()
            .with_sync_with_current(true)
            .with_identity_hashing(true);
        assert_eq!(config.mode, SelectionMode::Multiple);
        assert!(config.sync_with_current);
        assert!(config.identity_hashing);
        assert_eq!(SelectorConfig::single().mode, SelectionMode::Single);
    }

    #[cfg(feature = "state-persistence")]
    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: SelectorConfig =
            serde_json::from_str(r#"{"mode":"Extended"}"#).expect("valid config json");
        assert_eq!(config.mode, SelectionMode::Extended);
        assert!(!config.sync_with_current);
    }
}
