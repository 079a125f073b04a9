// ⚙️ Check Configuration - Thresholds and markers as data
//
// Every field has a default, so an empty JSON object (or no file at all)
// gives the behaviour the history/statistics views need out of the box.

use crate::checker::{InvariantChecker, NewestBar};
use crate::geometry::{GeometryExtractor, TickLabelKind, DEFAULT_DATA_THRESHOLD};
use crate::highlight::HighlightTable;
use crate::oracle::{TzPolicy, WeekdayLocale};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Bars with height <= this are placeholders
    #[serde(default = "default_data_threshold")]
    pub data_threshold: f64,

    #[serde(default)]
    pub weekday_locale: WeekdayLocale,

    #[serde(default)]
    pub tick_labels: TickLabelKind,

    #[serde(default)]
    pub highlight: HighlightTable,

    /// Class tokens that mark a rect as a bar; empty accepts every rect
    #[serde(default)]
    pub bar_classes: Vec<String>,

    #[serde(default)]
    pub newest_bar: NewestBar,

    #[serde(default)]
    pub tz: TzPolicy,

    /// How long the harness waits for the view to settle
    #[serde(default = "default_settle_budget_ms")]
    pub settle_budget_ms: u64,
}

fn default_data_threshold() -> f64 {
    DEFAULT_DATA_THRESHOLD
}

fn default_settle_budget_ms() -> u64 {
    2500
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            data_threshold: default_data_threshold(),
            weekday_locale: WeekdayLocale::default(),
            tick_labels: TickLabelKind::default(),
            highlight: HighlightTable::default(),
            bar_classes: Vec::new(),
            newest_bar: NewestBar::default(),
            tz: TzPolicy::default(),
            settle_budget_ms: default_settle_budget_ms(),
        }
    }
}

impl CheckConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: CheckConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        if !config.data_threshold.is_finite() || config.data_threshold < 0.0 {
            anyhow::bail!(
                "data_threshold must be a non-negative number, got {}",
                config.data_threshold
            );
        }

        Ok(config)
    }

    pub fn extractor(&self) -> GeometryExtractor {
        GeometryExtractor::new(
            self.data_threshold,
            self.tick_labels,
            self.weekday_locale.table(),
            self.highlight.clone(),
        )
        .with_bar_classes(self.bar_classes.clone())
    }

    pub fn checker(&self) -> InvariantChecker {
        InvariantChecker::new(self.newest_bar, self.tick_labels)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_object_gives_defaults() {
        let file = write_config("{}");

        let config = CheckConfig::from_file(file.path()).unwrap();

        assert_eq!(config, CheckConfig::default());
        assert_eq!(config.data_threshold, 5.0);
        assert_eq!(config.settle_budget_ms, 2500);
    }

    #[test]
    fn test_full_config() {
        let file = write_config(
            r#"{
                "data_threshold": 2.5,
                "weekday_locale": "english",
                "tick_labels": "day_of_month",
                "highlight": [
                    {"name": "selected", "any_of": [{"kind": "class_token", "value": "selected"}]}
                ],
                "bar_classes": ["recharts-bar-rectangle"],
                "newest_bar": {"designated": 6},
                "tz": "+09:00",
                "settle_budget_ms": 500
            }"#,
        );

        let config = CheckConfig::from_file(file.path()).unwrap();

        assert_eq!(config.data_threshold, 2.5);
        assert_eq!(config.weekday_locale, WeekdayLocale::English);
        assert_eq!(config.tick_labels, TickLabelKind::DayOfMonth);
        assert_eq!(config.highlight.marker_count(), 1);
        assert_eq!(config.newest_bar, NewestBar::Designated(6));
        assert_eq!(config.tz.to_string(), "+09:00");
        assert_eq!(config.settle_budget_ms, 500);

        let extractor = config.extractor();
        assert_eq!(extractor.data_threshold, 2.5);
        assert_eq!(extractor.weekday_names.short[0], "Su");
        assert_eq!(extractor.bar_classes, vec!["recharts-bar-rectangle".to_string()]);
    }

    #[test]
    fn test_bad_tz_rejected() {
        let file = write_config(r#"{"tz": "Mars/Olympus"}"#);

        assert!(CheckConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let file = write_config(r#"{"data_threshold": -1}"#);

        assert!(CheckConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = CheckConfig::from_file("/nonexistent/calendar-alignment.json").unwrap_err();

        assert!(err.to_string().contains("Failed to read config file"));
    }
}
