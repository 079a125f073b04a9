// Calendar Alignment - Core Library
// Checks that a rendered chart/calendar puts today's data under today's slot.
//
// Data flow:
//   raw snapshot → geometry → bar/tick correspondence → invariant check → verdict → report

pub mod error;
pub mod oracle;         // Expected calendar identity (local vs UTC)
pub mod highlight;      // Highlight marker predicates
pub mod geometry;       // Raw primitives → bars, ticks, cells
pub mod matcher;        // Bar → nearest tick
pub mod checker;        // Verdicts
pub mod config;
pub mod harness;        // Page accessor + explicit run context
pub mod report;

// Re-export commonly used types
pub use error::{ExtractionError, HarnessError};
pub use oracle::{
    compute_expected, InvalidInstant, TimePoint, TzPolicy, WeekdayLocale, WeekdayTable,
};
pub use highlight::{highlighted_days, HighlightMarker, HighlightTable, MarkerPredicate};
pub use geometry::{
    parse_day, AxisTick, CalendarCell, Geometry, GeometryExtractor, RawCell, RawNumber, RawRect,
    RawSnapshot, RawText, RenderedBar, TickLabelKind, DEFAULT_DATA_THRESHOLD,
};
pub use matcher::{match_bars_to_ticks, tick_collisions, CorrespondenceResult, TickCollision, TickMatch};
pub use checker::{aggregate, CheckKind, InvariantChecker, NewestBar, Verdict};
pub use config::CheckConfig;
pub use harness::{
    snapshot_digest, verify_snapshot, Evidence, HarnessContext, PageAccessor, PageRun, Settled,
    SnapshotFileAccessor, Verification,
};
pub use report::{render_json, render_text, write_correspondence_csv, RunReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
