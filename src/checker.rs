// ⚖️ Invariant Checker - Does the chart agree with the viewer's calendar?
//
// Rules, in order:
//   1. No data bars                       → INDETERMINATE
//   2. Newest bar's tick ≠ today's label  → FAIL
//   3. No highlighted calendar day        → INDETERMINATE
//      Highlight set ≠ {today}            → FAIL
//   4. Otherwise                          → PASS
//
// Missing evidence is INDETERMINATE, never FAIL.

use crate::geometry::TickLabelKind;
use crate::matcher::CorrespondenceResult;
use crate::oracle::TimePoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Newest bar sits under today's axis slot
    NewestBarSlot,
    /// Calendar highlights exactly today's day
    CalendarHighlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Fail {
        check: CheckKind,
        expected: String,
        actual: String,
    },
    Indeterminate {
        reason: String,
    },
}

impl Verdict {
    pub fn fail(check: CheckKind, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Verdict::Fail {
            check,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn indeterminate(reason: impl Into<String>) -> Self {
        Verdict::Indeterminate {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail { .. })
    }

    /// Process exit code for this verdict: 0 pass, 1 fail, 2 indeterminate
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail { .. } => 1,
            Verdict::Indeterminate { .. } => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail {
                expected, actual, ..
            } => write!(f, "FAIL(expected={}, actual={})", expected, actual),
            Verdict::Indeterminate { reason } => write!(f, "INDETERMINATE({})", reason),
        }
    }
}

/// Combine per-snapshot verdicts: any FAIL wins, then any INDETERMINATE, else PASS.
pub fn aggregate(verdicts: &[Verdict]) -> Verdict {
    if verdicts.is_empty() {
        return Verdict::indeterminate("no checks ran");
    }

    if let Some(fail) = verdicts.iter().find(|v| v.is_fail()) {
        return fail.clone();
    }

    verdicts
        .iter()
        .find(|v| !v.is_pass())
        .cloned()
        .unwrap_or(Verdict::Pass)
}

// ============================================================================
// INVARIANT CHECKER
// ============================================================================

/// Which bar represents the most recently added data point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewestBar {
    #[default]
    LargestIndex,
    Designated(usize),
}

#[derive(Debug, Clone, Default)]
pub struct InvariantChecker {
    pub newest: NewestBar,
    pub tick_labels: TickLabelKind,
}

impl InvariantChecker {
    pub fn new(newest: NewestBar, tick_labels: TickLabelKind) -> Self {
        InvariantChecker {
            newest,
            tick_labels,
        }
    }

    pub fn check(
        &self,
        expected: &TimePoint,
        bar_results: &[CorrespondenceResult],
        highlighted_days: &BTreeSet<u32>,
    ) -> Verdict {
        // Rule 1
        if bar_results.is_empty() {
            return Verdict::indeterminate("no data bars");
        }

        // Rule 2
        let newest = match self.newest {
            NewestBar::LargestIndex => bar_results.iter().max_by_key(|r| r.bar_index),
            NewestBar::Designated(index) => match bar_results.iter().find(|r| r.bar_index == index) {
                Some(r) => Some(r),
                None => {
                    return Verdict::indeterminate(format!("designated bar {} has no data", index))
                }
            },
        };
        let Some(newest) = newest else {
            return Verdict::indeterminate("no data bars");
        };

        let actual = match newest.matched_label() {
            Some(label) => label,
            None => return Verdict::indeterminate("no axis ticks to match bars against"),
        };

        let expected_label = expected.expected_tick_label(self.tick_labels);
        if actual != expected_label {
            return Verdict::fail(CheckKind::NewestBarSlot, expected_label, actual);
        }

        // Rule 3
        if highlighted_days.is_empty() {
            return Verdict::indeterminate("no calendar highlight found");
        }

        let today = expected.day();
        if highlighted_days.len() != 1 || !highlighted_days.contains(&today) {
            return Verdict::fail(
                CheckKind::CalendarHighlight,
                today.to_string(),
                format_days(highlighted_days),
            );
        }

        // Rule 4
        Verdict::Pass
    }
}

/// `{23, 24}`
pub fn format_days(days: &BTreeSet<u32>) -> String {
    let listed: Vec<String> = days.iter().map(|d| d.to_string()).collect();
    format!("{{{}}}", listed.join(", "))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::TickMatch;
    use crate::oracle::{compute_expected, TzPolicy, WeekdayLocale};
    use chrono::{TimeZone, Utc};

    /// Tuesday 2026-02-24, "Di"
    fn tuesday() -> TimePoint {
        let millis = Utc
            .with_ymd_and_hms(2026, 2, 24, 10, 0, 0)
            .unwrap()
            .timestamp_millis();
        compute_expected(millis, TzPolicy::Utc, WeekdayLocale::German).unwrap()
    }

    fn matched(bar_index: usize, label: &str) -> CorrespondenceResult {
        CorrespondenceResult {
            bar_index,
            center_x: 100.0,
            matched: Some(TickMatch {
                label: label.to_string(),
                tick_x: 100.0,
                distance: 0.0,
            }),
        }
    }

    fn unmatched(bar_index: usize) -> CorrespondenceResult {
        CorrespondenceResult {
            bar_index,
            center_x: 100.0,
            matched: None,
        }
    }

    fn days(values: &[u32]) -> BTreeSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_pass_when_bar_and_highlight_agree() {
        let verdict = InvariantChecker::default().check(&tuesday(), &[matched(2, "Di")], &days(&[24]));

        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn test_no_bars_is_indeterminate() {
        let verdict = InvariantChecker::default().check(&tuesday(), &[], &days(&[24]));

        assert_eq!(verdict, Verdict::indeterminate("no data bars"));
    }

    #[test]
    fn test_unmatched_bar_is_indeterminate_not_fail() {
        let verdict = InvariantChecker::default().check(&tuesday(), &[unmatched(0)], &days(&[24]));

        assert!(matches!(verdict, Verdict::Indeterminate { .. }));
        assert!(!verdict.is_fail());
    }

    #[test]
    fn test_newest_bar_in_wrong_slot_fails() {
        let verdict = InvariantChecker::default().check(
            &tuesday(),
            &[matched(0, "Di"), matched(3, "Mi")],
            &days(&[24]),
        );

        assert_eq!(verdict, Verdict::fail(CheckKind::NewestBarSlot, "Di", "Mi"));
        assert_eq!(verdict.to_string(), "FAIL(expected=Di, actual=Mi)");
    }

    #[test]
    fn test_designated_bar_overrides_largest_index() {
        let checker = InvariantChecker::new(NewestBar::Designated(0), TickLabelKind::Weekday);

        let verdict = checker.check(&tuesday(), &[matched(0, "Di"), matched(3, "Mi")], &days(&[24]));
        assert_eq!(verdict, Verdict::Pass);

        let checker = InvariantChecker::new(NewestBar::Designated(7), TickLabelKind::Weekday);
        let verdict = checker.check(&tuesday(), &[matched(0, "Di")], &days(&[24]));
        assert_eq!(verdict, Verdict::indeterminate("designated bar 7 has no data"));
    }

    #[test]
    fn test_missing_highlight_is_indeterminate() {
        let verdict = InvariantChecker::default().check(&tuesday(), &[matched(1, "Di")], &days(&[]));

        assert_eq!(verdict, Verdict::indeterminate("no calendar highlight found"));
    }

    #[test]
    fn test_missing_highlight_with_shifted_bar_fails() {
        // The bar rule runs first; a shifted bar is a defect even without a highlight
        let verdict = InvariantChecker::default().check(&tuesday(), &[matched(1, "Mi")], &days(&[]));

        assert_eq!(verdict, Verdict::fail(CheckKind::NewestBarSlot, "Di", "Mi"));
    }

    #[test]
    fn test_missing_highlight_with_no_bars() {
        let verdict = InvariantChecker::default().check(&tuesday(), &[], &days(&[]));
        assert_eq!(verdict, Verdict::indeterminate("no data bars"));

        let verdict = InvariantChecker::default().check(&tuesday(), &[unmatched(0)], &days(&[]));
        assert_eq!(verdict, Verdict::indeterminate("no axis ticks to match bars against"));
    }

    #[test]
    fn test_wrong_highlight_fails() {
        let verdict = InvariantChecker::default().check(&tuesday(), &[matched(1, "Di")], &days(&[23]));

        assert_eq!(verdict, Verdict::fail(CheckKind::CalendarHighlight, "24", "{23}"));
    }

    #[test]
    fn test_two_highlights_fail_even_if_today_included() {
        let verdict =
            InvariantChecker::default().check(&tuesday(), &[matched(1, "Di")], &days(&[24, 25]));

        assert_eq!(verdict, Verdict::fail(CheckKind::CalendarHighlight, "24", "{24, 25}"));
    }

    #[test]
    fn test_day_of_month_axis() {
        let checker = InvariantChecker::new(NewestBar::LargestIndex, TickLabelKind::DayOfMonth);

        assert_eq!(checker.check(&tuesday(), &[matched(0, "24")], &days(&[24])), Verdict::Pass);
        assert_eq!(
            checker.check(&tuesday(), &[matched(0, "23")], &days(&[24])),
            Verdict::fail(CheckKind::NewestBarSlot, "24", "23")
        );
    }

    #[test]
    fn test_aggregate() {
        let pass = Verdict::Pass;
        let fail = Verdict::fail(CheckKind::NewestBarSlot, "Di", "Mo");
        let unknown = Verdict::indeterminate("no data bars");

        assert_eq!(aggregate(&[pass.clone(), pass.clone()]), Verdict::Pass);
        assert_eq!(aggregate(&[pass.clone(), unknown.clone()]), unknown);
        assert_eq!(aggregate(&[unknown.clone(), fail.clone(), pass]), fail);
        assert!(matches!(aggregate(&[]), Verdict::Indeterminate { .. }));
    }

    #[test]
    fn test_verdict_json_shape() {
        let json = serde_json::to_value(Verdict::fail(CheckKind::NewestBarSlot, "Di", "Mi")).unwrap();

        assert_eq!(json["verdict"], "FAIL");
        assert_eq!(json["check"], "newest_bar_slot");
        assert_eq!(json["expected"], "Di");
        assert_eq!(json["actual"], "Mi");
    }
}
