// 🧾 Report Emitter - Verdicts and the evidence behind them
// Human-readable text, JSON, and a per-bar CSV table.

use crate::checker::{aggregate, format_days, Verdict};
use crate::harness::PageRun;
use crate::oracle::TimePoint;
use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub expected: TimePoint,
    pub runs: Vec<PageRun>,
    pub aggregate: Verdict,
}

impl RunReport {
    pub fn new(expected: TimePoint, runs: Vec<PageRun>) -> Self {
        let verdicts: Vec<Verdict> = runs.iter().map(|r| r.verification.verdict.clone()).collect();

        RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            expected,
            aggregate: aggregate(&verdicts),
            runs,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.aggregate.exit_code()
    }

    pub fn summary(&self) -> String {
        let passed = self.runs.iter().filter(|r| r.verification.verdict.is_pass()).count();
        let failed = self.runs.iter().filter(|r| r.verification.verdict.is_fail()).count();
        format!(
            "{} snapshot(s): {} pass, {} fail, {} indeterminate → {}",
            self.runs.len(),
            passed,
            failed,
            self.runs.len() - passed - failed,
            self.aggregate
        )
    }
}

fn verdict_icon(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Pass => "✅",
        Verdict::Fail { .. } => "❌",
        Verdict::Indeterminate { .. } => "❔",
    }
}

// ============================================================================
// RENDERERS
// ============================================================================

pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let expected = &report.expected;

    // Writing into a String cannot fail
    let _ = writeln!(out, "🗓️  Calendar Alignment Check");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "Today (local):  {} = {} ({})",
        expected.local_date, expected.long_weekday, expected.short_weekday
    );
    let _ = writeln!(out, "Today (UTC):    {}", expected.utc_date);
    let _ = writeln!(out, "Timezone:       {}", expected.tz);
    if expected.crosses_date_boundary {
        let _ = writeln!(out, "⚠️  Local and UTC dates differ: inside the date-shift window");
    }

    for run in &report.runs {
        let evidence = &run.verification.evidence;
        let _ = writeln!(out, "\n📄 {}", run.target);
        if !run.settled {
            let _ = writeln!(out, "   ⏳ view never settled; checked as captured");
        }

        let ticks: Vec<String> = evidence
            .geometry
            .ticks
            .iter()
            .map(|t| format!("{}@{:.1}", t.label, t.x))
            .collect();
        let _ = writeln!(out, "   Ticks: [{}]", ticks.join(", "));
        let _ = writeln!(out, "   Bars with data: {}", evidence.geometry.bars.len());

        for (bar, result) in evidence.geometry.bars.iter().zip(&evidence.correspondences) {
            match &result.matched {
                Some(m) => {
                    let _ = writeln!(
                        out,
                        "     Bar[{}] h={:.0}, center={:.1} → '{}' (distance {:.1})",
                        bar.index, bar.height, result.center_x, m.label, m.distance
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "     Bar[{}] h={:.0}, center={:.1} → unmatched",
                        bar.index, bar.height, result.center_x
                    );
                }
            }
        }

        for collision in &evidence.collisions {
            let _ = writeln!(
                out,
                "   Bars {:?} share tick '{}' at x={:.1}",
                collision.bar_indices, collision.label, collision.tick_x
            );
        }

        let _ = writeln!(out, "   Highlighted days: {}", format_days(&evidence.highlighted_days));
        if let Some(artifact) = &run.artifact {
            let _ = writeln!(out, "   Artifact: {}", artifact.display());
        }
        let _ = writeln!(
            out,
            "   {} {}",
            verdict_icon(&run.verification.verdict),
            run.verification.verdict
        );
    }

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "{} {}", verdict_icon(&report.aggregate), report.summary());
    out
}

pub fn render_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

#[derive(Debug, Serialize)]
struct CorrespondenceRow<'a> {
    target: &'a str,
    bar_index: usize,
    height: f64,
    center_x: f64,
    matched_label: Option<&'a str>,
    tick_x: Option<f64>,
    distance: Option<f64>,
}

/// One row per data bar across all runs.
pub fn write_correspondence_csv<W: io::Write>(writer: W, runs: &[PageRun]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for run in runs {
        let evidence = &run.verification.evidence;
        for (bar, result) in evidence.geometry.bars.iter().zip(&evidence.correspondences) {
            wtr.serialize(CorrespondenceRow {
                target: &run.target,
                bar_index: result.bar_index,
                height: bar.height,
                center_x: result.center_x,
                matched_label: result.matched_label(),
                tick_x: result.matched.as_ref().map(|m| m.tick_x),
                distance: result.matched.as_ref().map(|m| m.distance),
            })
            .context("Failed to write correspondence row")?;
        }
    }

    wtr.flush().context("Failed to flush correspondence CSV")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::geometry::RawSnapshot;
    use crate::harness::verify_snapshot;
    use crate::oracle::{compute_expected, TzPolicy, WeekdayLocale};
    use chrono::TimeZone;

    fn expected() -> TimePoint {
        let millis = Utc
            .with_ymd_and_hms(2026, 2, 24, 10, 0, 0)
            .unwrap()
            .timestamp_millis();
        compute_expected(millis, TzPolicy::Utc, WeekdayLocale::German).unwrap()
    }

    fn page_run(target: &str, json: &str) -> PageRun {
        let raw = RawSnapshot::from_json_str(json).unwrap();
        PageRun {
            target: target.to_string(),
            settled: true,
            verification: verify_snapshot(&raw, &expected(), &CheckConfig::default()).unwrap(),
            artifact: None,
        }
    }

    fn passing() -> PageRun {
        page_run(
            "statistik.json",
            r#"{
                "rects": [{"x": 140, "width": 20, "height": 48}],
                "texts": [{"text": "Mo", "x": 100}, {"text": "Di", "x": 150}],
                "cells": [{"text": "24", "class": "ring-2"}]
            }"#,
        )
    }

    fn unmatched() -> PageRun {
        page_run(
            "verlauf.json",
            r#"{"rects": [{"x": 140, "width": 20, "height": 48}]}"#,
        )
    }

    #[test]
    fn test_report_aggregate_and_exit_code() {
        let report = RunReport::new(expected(), vec![passing()]);
        assert_eq!(report.aggregate, Verdict::Pass);
        assert_eq!(report.exit_code(), 0);

        let report = RunReport::new(expected(), vec![passing(), unmatched()]);
        assert!(matches!(report.aggregate, Verdict::Indeterminate { .. }));
        assert_eq!(report.exit_code(), 2);
        assert!(report.summary().starts_with("2 snapshot(s): 1 pass, 0 fail, 1 indeterminate"));
    }

    #[test]
    fn test_render_text() {
        let report = RunReport::new(expected(), vec![passing(), unmatched()]);

        let text = render_text(&report);

        println!("{}", text);
        assert!(text.contains("Today (local):  2026-02-24 = Dienstag (Di)"));
        assert!(text.contains("Ticks: [Mo@100.0, Di@150.0]"));
        assert!(text.contains("Bar[0] h=48, center=150.0 → 'Di' (distance 0.0)"));
        assert!(text.contains("→ unmatched"));
        assert!(text.contains("Highlighted days: {24}"));
        assert!(text.contains("✅ PASS"));
        assert!(!text.contains("date-shift window"));
    }

    #[test]
    fn test_render_json() {
        let report = RunReport::new(expected(), vec![passing()]);

        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

        assert_eq!(json["aggregate"]["verdict"], "PASS");
        assert_eq!(json["expected"]["short_weekday"], "Di");
        assert_eq!(json["runs"][0]["target"], "statistik.json");
        assert_eq!(json["runs"][0]["verification"]["evidence"]["highlighted_days"][0], 24);
    }

    #[test]
    fn test_correspondence_csv() {
        let mut buf = Vec::new();

        write_correspondence_csv(&mut buf, &[passing(), unmatched()]).unwrap();

        let csv_text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(
            lines[0],
            "target,bar_index,height,center_x,matched_label,tick_x,distance"
        );
        assert_eq!(lines[1], "statistik.json,0,48.0,150.0,Di,150.0,0.0");
        assert_eq!(lines[2], "verlauf.json,0,48.0,150.0,,,");
    }
}
