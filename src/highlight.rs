// 🎯 Highlight Markers - Predicates as Data
// The one place that defines what "highlighted" means for a calendar cell.
//
// A marker is a named semantic meaning ("today", "aria-current") satisfied by
// any of its predicates. Predicates only look at whole class tokens, class
// prefixes, or named attributes; never at arbitrary substrings of the markup.

use crate::geometry::CalendarCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// PREDICATES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerPredicate {
    /// One whitespace-separated class equals `value`
    ClassToken { value: String },

    /// One whitespace-separated class starts with `value`
    ClassPrefix { value: String },

    /// Attribute `name` is present (and equals `equals`, when given)
    Attribute {
        name: String,
        #[serde(default)]
        equals: Option<String>,
    },
}

impl MarkerPredicate {
    pub fn matches(&self, classes: &BTreeSet<String>, attributes: &BTreeMap<String, String>) -> bool {
        match self {
            MarkerPredicate::ClassToken { value } => classes.contains(value),
            MarkerPredicate::ClassPrefix { value } => {
                classes.iter().any(|class| class.starts_with(value.as_str()))
            }
            MarkerPredicate::Attribute { name, equals } => match (attributes.get(name), equals) {
                (Some(actual), Some(expected)) => actual.trim() == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMarker {
    pub name: String,
    pub any_of: Vec<MarkerPredicate>,
}

impl HighlightMarker {
    pub fn matches(&self, classes: &BTreeSet<String>, attributes: &BTreeMap<String, String>) -> bool {
        self.any_of.iter().any(|p| p.matches(classes, attributes))
    }
}

// ============================================================================
// HIGHLIGHT TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighlightTable {
    markers: Vec<HighlightMarker>,
}

impl HighlightTable {
    pub fn from_markers(markers: Vec<HighlightMarker>) -> Self {
        HighlightTable { markers }
    }

    /// Names of every marker the element satisfies, in table order
    pub fn matching_markers(
        &self,
        classes: &BTreeSet<String>,
        attributes: &BTreeMap<String, String>,
    ) -> Vec<String> {
        self.markers
            .iter()
            .filter(|m| m.matches(classes, attributes))
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

impl Default for HighlightTable {
    /// The "today" ring the history calendar draws, plus the ARIA current-date marker.
    fn default() -> Self {
        HighlightTable {
            markers: vec![
                HighlightMarker {
                    name: "today".to_string(),
                    any_of: vec![
                        MarkerPredicate::ClassToken {
                            value: "ring-2".to_string(),
                        },
                        MarkerPredicate::ClassPrefix {
                            value: "ring-blue".to_string(),
                        },
                    ],
                },
                HighlightMarker {
                    name: "aria-current".to_string(),
                    any_of: vec![MarkerPredicate::Attribute {
                        name: "aria-current".to_string(),
                        equals: Some("date".to_string()),
                    }],
                },
            ],
        }
    }
}

/// Day numbers of every highlighted cell. More than one is a reportable outcome, not an error.
pub fn highlighted_days(cells: &[CalendarCell]) -> BTreeSet<u32> {
    cells
        .iter()
        .filter(|c| c.highlighted)
        .map(|c| c.day)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(raw: &str) -> BTreeSet<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    fn cell(day: u32, highlighted: bool) -> CalendarCell {
        CalendarCell {
            day,
            highlighted,
            raw_class_tags: BTreeSet::new(),
            markers: Vec::new(),
        }
    }

    #[test]
    fn test_default_table_matches_today_ring() {
        let table = HighlightTable::default();
        let markers = table.matching_markers(
            &classes("aspect-square rounded-xl ring-2 ring-blue-400 bg-blue-50"),
            &BTreeMap::new(),
        );

        assert_eq!(markers, vec!["today".to_string()]);
    }

    #[test]
    fn test_default_table_ignores_decorative_classes() {
        // Classes the old ad hoc scripts treated as highlights
        let table = HighlightTable::default();
        let markers = table.matching_markers(
            &classes("rounded-full bg-cyan-50 active:scale-95 focus:ring-0"),
            &BTreeMap::new(),
        );

        assert!(markers.is_empty());
    }

    #[test]
    fn test_attribute_predicate() {
        let table = HighlightTable::default();
        let mut attrs = BTreeMap::new();
        attrs.insert("aria-current".to_string(), "date".to_string());

        assert_eq!(
            table.matching_markers(&BTreeSet::new(), &attrs),
            vec!["aria-current".to_string()]
        );

        attrs.insert("aria-current".to_string(), "page".to_string());
        assert!(table.matching_markers(&BTreeSet::new(), &attrs).is_empty());

        let presence = MarkerPredicate::Attribute {
            name: "data-today".to_string(),
            equals: None,
        };
        let mut attrs = BTreeMap::new();
        attrs.insert("data-today".to_string(), "".to_string());
        assert!(presence.matches(&BTreeSet::new(), &attrs));
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"[
            {"name": "selected", "any_of": [
                {"kind": "class_token", "value": "selected"},
                {"kind": "attribute", "name": "aria-selected", "equals": "true"}
            ]}
        ]"#;

        let table: HighlightTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.marker_count(), 1);
        assert_eq!(
            table.matching_markers(&classes("day selected"), &BTreeMap::new()),
            vec!["selected".to_string()]
        );
        assert!(table
            .matching_markers(&classes("day ring-2"), &BTreeMap::new())
            .is_empty());
    }

    #[test]
    fn test_highlighted_days_reports_every_marked_cell() {
        let cells = vec![cell(23, false), cell(24, true), cell(25, true), cell(26, false)];

        let days = highlighted_days(&cells);

        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![24, 25]);
    }

    #[test]
    fn test_highlighted_days_empty() {
        assert!(highlighted_days(&[cell(1, false)]).is_empty());
        assert!(highlighted_days(&[]).is_empty());
    }
}
