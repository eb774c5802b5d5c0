use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Family used when neither the config nor the provider name one.
pub const DEFAULT_FONT: &str = "sans";

/// Host-supplied service configuration.
///
/// `font` is the family layered under every caller's chart options. Left
/// unset, the provider's preset font applies, then [`DEFAULT_FONT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

impl ChartServiceConfig {
    #[must_use]
    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.font.as_deref().is_some_and(|font| font.trim().is_empty()) {
            return Err(ChartError::InvalidConfig(
                "font must not be blank".to_owned(),
            ));
        }
        Ok(())
    }

    /// Picks the effective family: configured, then `preset`, then [`DEFAULT_FONT`].
    ///
    /// A blank preset counts as absent.
    #[must_use]
    pub fn resolve_font(&self, preset: Option<&str>) -> String {
        self.font
            .as_deref()
            .or_else(|| preset.filter(|font| !font.trim().is_empty()))
            .unwrap_or(DEFAULT_FONT)
            .to_owned()
    }

    /// Serializes config to pretty JSON for debug/config files.
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidConfig(format!("failed to serialize config: {e}")))
    }

    /// Deserializes and validates config from JSON.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_stays_unset_and_resolves_to_sans() {
        let config = ChartServiceConfig::from_json_str("{}").expect("empty config");
        assert_eq!(config.font, None);
        assert_eq!(config.resolve_font(None), "sans");
    }

    #[test]
    fn preset_applies_only_when_font_is_unset() {
        let unset = ChartServiceConfig::default();
        assert_eq!(unset.resolve_font(Some("Noto Sans")), "Noto Sans");
        assert_eq!(unset.resolve_font(Some("   ")), "sans");

        let configured = ChartServiceConfig::default().with_font("serif");
        assert_eq!(configured.resolve_font(Some("Noto Sans")), "serif");
    }

    #[test]
    fn blank_font_is_rejected() {
        let err = ChartServiceConfig::from_json_str(r#"{ "font": "  " }"#).expect_err("blank");
        assert!(matches!(err, ChartError::InvalidConfig(_)));
    }

    #[test]
    fn json_round_trip_keeps_font() {
        let config = ChartServiceConfig::default().with_font("Noto Sans CJK SC");
        let json = config.to_json_pretty().expect("serialize");
        assert_eq!(ChartServiceConfig::from_json_str(&json).expect("parse"), config);
        assert_eq!(ChartServiceConfig::default().to_json_pretty().expect("serialize"), "{}");
    }
}
