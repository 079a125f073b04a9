// 📐 Geometry Extractor - Raw page primitives → typed bars, ticks, cells
//
// Input is whatever the page accessor captured (rects, text nodes, calendar
// cells with their attributes as strings). Output is typed geometry the
// matcher can work on. Empty output is valid; only malformed input fails.

use crate::error::ExtractionError;
use crate::highlight::HighlightTable;
use crate::oracle::WeekdayTable;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Bars at or below this height are rendered placeholders, not data
pub const DEFAULT_DATA_THRESHOLD: f64 = 5.0;

// ============================================================================
// RAW SNAPSHOT (as captured)
// ============================================================================

/// A DOM attribute value: JSON number, or the string `getAttribute` returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRect {
    #[serde(default)]
    pub x: Option<RawNumber>,
    #[serde(default)]
    pub y: Option<RawNumber>,
    #[serde(default)]
    pub width: Option<RawNumber>,
    #[serde(default)]
    pub height: Option<RawNumber>,
    #[serde(default)]
    pub fill: Option<String>,
    /// Checked against `GeometryExtractor::bar_classes` when that list is set
    #[serde(default)]
    pub class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub x: Option<RawNumber>,
    #[serde(default)]
    pub y: Option<RawNumber>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub rects: Vec<RawRect>,
    #[serde(default)]
    pub texts: Vec<RawText>,
    #[serde(default)]
    pub cells: Vec<RawCell>,
}

impl RawSnapshot {
    /// Interpret an opaque captured value. The root must be an object.
    pub fn from_value(value: &Value) -> Result<Self, ExtractionError> {
        if !value.is_object() {
            return Err(ExtractionError::MalformedSnapshot(
                "snapshot root must be a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value.clone())
            .map_err(|e| ExtractionError::MalformedSnapshot(e.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ExtractionError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ExtractionError::MalformedSnapshot(e.to_string()))?;
        Self::from_value(&value)
    }
}

// ============================================================================
// TYPED GEOMETRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedBar {
    /// Position in the captured rect list (stable across calls)
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Option<String>,
}

impl RenderedBar {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCell {
    pub day: u32,
    pub highlighted: bool,

    /// Diagnostics only; highlighting is decided by the marker table
    pub raw_class_tags: BTreeSet<String>,

    /// Names of the highlight markers this cell satisfied
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub bars: Vec<RenderedBar>,
    /// Ascending by `x`
    pub ticks: Vec<AxisTick>,
    pub cells: Vec<CalendarCell>,
}

/// Which text nodes count as x-axis tick labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickLabelKind {
    /// Short weekday names of the configured locale
    #[default]
    Weekday,
    /// Day numbers 1-31
    DayOfMonth,
    /// Any non-empty, non-numeric text (numbers belong to the y-axis)
    Any,
}

// ============================================================================
// GEOMETRY EXTRACTOR
// ============================================================================

pub struct GeometryExtractor {
    pub data_threshold: f64,
    pub tick_labels: TickLabelKind,
    pub weekday_names: &'static WeekdayTable,
    pub highlight: HighlightTable,

    /// When non-empty, only rects carrying one of these class tokens can be bars.
    /// Broad `svg rect` captures also pick up backgrounds and legend swatches.
    pub bar_classes: Vec<String>,
}

impl GeometryExtractor {
    pub fn new(
        data_threshold: f64,
        tick_labels: TickLabelKind,
        weekday_names: &'static WeekdayTable,
        highlight: HighlightTable,
    ) -> Self {
        GeometryExtractor {
            data_threshold,
            tick_labels,
            weekday_names,
            highlight,
            bar_classes: Vec::new(),
        }
    }

    pub fn with_bar_classes(mut self, bar_classes: Vec<String>) -> Self {
        self.bar_classes = bar_classes;
        self
    }

    pub fn extract(&self, raw: &RawSnapshot) -> Result<Geometry, ExtractionError> {
        let bars = self.extract_bars(&raw.rects)?;
        let ticks = self.extract_ticks(&raw.texts)?;
        let cells = self.extract_cells(&raw.cells);

        debug!(
            "extracted {} data bars (of {} rects), {} ticks, {} day cells",
            bars.len(),
            raw.rects.len(),
            ticks.len(),
            cells.len()
        );

        Ok(Geometry { bars, ticks, cells })
    }

    fn extract_bars(&self, rects: &[RawRect]) -> Result<Vec<RenderedBar>, ExtractionError> {
        let mut bars = Vec::new();

        for (index, rect) in rects.iter().enumerate() {
            let x = number(&rect.x, "rects", index, "x")?;
            let y = number(&rect.y, "rects", index, "y")?;
            let width = size(&rect.width, "rects", index, "width")?;
            let height = size(&rect.height, "rects", index, "height")?;

            if height <= self.data_threshold || !self.accepts_bar_class(rect.class.as_deref()) {
                continue;
            }

            bars.push(RenderedBar {
                index,
                x,
                y,
                width,
                height,
                fill: rect.fill.clone(),
            });
        }

        Ok(bars)
    }

    fn extract_ticks(&self, texts: &[RawText]) -> Result<Vec<AxisTick>, ExtractionError> {
        let mut candidates = Vec::new();

        for (index, text) in texts.iter().enumerate() {
            let label = text.text.trim();
            if !self.accepts_tick_label(label) {
                continue;
            }

            candidates.push(AxisTick {
                label: label.to_string(),
                x: number(&text.x, "texts", index, "x")?,
                y: number(&text.y, "texts", index, "y")?,
            });
        }

        // Stable: equal x keep capture order
        candidates.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut ticks: Vec<AxisTick> = Vec::with_capacity(candidates.len());
        for tick in candidates {
            if let Some(last) = ticks.last() {
                if last.x == tick.x {
                    if last.label == tick.label {
                        continue;
                    }
                    return Err(ExtractionError::ConflictingTicks {
                        x: tick.x,
                        first: last.label.clone(),
                        second: tick.label,
                    });
                }
            }
            ticks.push(tick);
        }

        Ok(ticks)
    }

    fn extract_cells(&self, cells: &[RawCell]) -> Vec<CalendarCell> {
        cells
            .iter()
            .filter_map(|cell| {
                let day = parse_day(&cell.text)?;
                let raw_class_tags: BTreeSet<String> = cell
                    .class
                    .as_deref()
                    .unwrap_or("")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                let markers = self
                    .highlight
                    .matching_markers(&raw_class_tags, &cell.attributes);

                Some(CalendarCell {
                    day,
                    highlighted: !markers.is_empty(),
                    raw_class_tags,
                    markers,
                })
            })
            .collect()
    }

    fn accepts_bar_class(&self, class: Option<&str>) -> bool {
        if self.bar_classes.is_empty() {
            return true;
        }

        class
            .unwrap_or("")
            .split_whitespace()
            .any(|token| self.bar_classes.iter().any(|c| c == token))
    }

    fn accepts_tick_label(&self, label: &str) -> bool {
        if label.is_empty() {
            return false;
        }

        match self.tick_labels {
            TickLabelKind::Weekday => self.weekday_names.short.iter().any(|s| *s == label),
            TickLabelKind::DayOfMonth => parse_day(label).is_some(),
            TickLabelKind::Any => label.parse::<f64>().is_err(),
        }
    }
}

impl Default for GeometryExtractor {
    fn default() -> Self {
        GeometryExtractor::new(
            DEFAULT_DATA_THRESHOLD,
            TickLabelKind::default(),
            crate::oracle::WeekdayLocale::default().table(),
            HighlightTable::default(),
        )
    }
}

/// A calendar day number: an integer in 1..=31, nothing else.
pub fn parse_day(text: &str) -> Option<u32> {
    text.trim()
        .parse::<u32>()
        .ok()
        .filter(|day| (1..=31).contains(day))
}

/// Missing or blank attributes read as 0, like `getAttribute(..) || 0` in the page.
fn number(
    value: &Option<RawNumber>,
    element: &'static str,
    index: usize,
    attribute: &'static str,
) -> Result<f64, ExtractionError> {
    let non_numeric = |value: String| ExtractionError::NonNumeric {
        element,
        index,
        attribute,
        value,
    };

    let parsed = match value {
        None => return Ok(0.0),
        Some(RawNumber::Number(n)) => *n,
        Some(RawNumber::Text(s)) if s.trim().is_empty() => return Ok(0.0),
        Some(RawNumber::Text(s)) => s.trim().parse::<f64>().map_err(|_| non_numeric(s.clone()))?,
    };

    if !parsed.is_finite() {
        return Err(non_numeric(parsed.to_string()));
    }

    Ok(parsed)
}

fn size(
    value: &Option<RawNumber>,
    element: &'static str,
    index: usize,
    attribute: &'static str,
) -> Result<f64, ExtractionError> {
    let parsed = number(value, element, index, attribute)?;
    if parsed < 0.0 {
        return Err(ExtractionError::NegativeSize {
            element,
            index,
            attribute,
            value: parsed,
        });
    }
    Ok(parsed)
}

// ============================================================================
// TESTS
// ============================================================================
