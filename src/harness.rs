// 🧭 Verification Harness - Page accessor + one pass through the engine
//
// The harness owns everything stateful: the page accessor, the run config
// and the expected time point, carried in an explicit HarnessContext.
// The engine underneath (extract → match → check) is pure.
//
// Flow per target:
//   navigate → wait settled (retry once) → capture → extract → match → check → artifact

use crate::checker::Verdict;
use crate::config::CheckConfig;
use crate::error::{ExtractionError, HarnessError};
use crate::geometry::{Geometry, RawSnapshot};
use crate::highlight::highlighted_days;
use crate::matcher::{match_bars_to_ticks, tick_collisions, CorrespondenceResult, TickCollision};
use crate::oracle::TimePoint;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// PAGE ACCESSOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settled {
    Stable,
    /// Budget ran out before the view looked stable
    BudgetElapsed,
}

/// Whatever drives the page. The engine only ever sees the captured value.
pub trait PageAccessor {
    fn navigate(&mut self, target: &str) -> Result<(), HarnessError>;

    /// Block until the view is stable or `budget` elapses.
    fn wait_settled(&mut self, budget: Duration) -> Result<Settled, HarnessError>;

    fn capture_raw_primitives(&mut self) -> Result<Value, HarnessError>;

    /// Side-channel evidence; never affects the verdict.
    fn screenshot(&mut self, path: &Path) -> Result<(), HarnessError>;

    fn artifact_extension(&self) -> &'static str {
        "png"
    }
}

// ============================================================================
// SNAPSHOT FILE ACCESSOR
// ============================================================================

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
enum SnapshotSource {
    Stdin,
    File(PathBuf),
}

/// Page accessor over snapshot JSON captured earlier (a file, or `-` for stdin).
///
/// A file that is empty or not yet complete JSON counts as a view that has not
/// settled yet and is polled until the budget runs out.
#[derive(Debug, Default)]
pub struct SnapshotFileAccessor {
    source: Option<SnapshotSource>,
    content: Option<String>,
}

impl SnapshotFileAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn reload(&mut self) -> Result<(), HarnessError> {
        if let Some(SnapshotSource::File(path)) = &self.source {
            let content = fs::read_to_string(path)
                .map_err(|e| HarnessError::Capture(format!("{}: {}", path.display(), e)))?;
            self.content = Some(content);
        }
        Ok(())
    }

    /// Settled once the writer has finished: non-empty and parseable.
    fn is_settled(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty() && serde_json::from_str::<Value>(c).is_ok())
    }
}

/// Read a whole snapshot from a pipe. A terminal would block until EOF, so refuse it.
fn read_piped<R: Read>(target: &str, mut input: R, is_terminal: bool) -> Result<String, HarnessError> {
    let navigation_err = |reason: String| HarnessError::NavigationFailure {
        target: target.to_string(),
        reason,
    };

    if is_terminal {
        return Err(navigation_err(
            "stdin is a terminal; pipe a snapshot in or pass a snapshot file".to_string(),
        ));
    }

    let mut buf = String::new();
    input
        .read_to_string(&mut buf)
        .map_err(|e| navigation_err(e.to_string()))?;
    Ok(buf)
}

impl PageAccessor for SnapshotFileAccessor {
    fn navigate(&mut self, target: &str) -> Result<(), HarnessError> {
        let (source, content) = if target == "-" {
            let stdin = std::io::stdin();
            let is_terminal = stdin.is_terminal();
            (SnapshotSource::Stdin, read_piped(target, stdin.lock(), is_terminal)?)
        } else {
            let path = PathBuf::from(target);
            let content = fs::read_to_string(&path).map_err(|e| HarnessError::NavigationFailure {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
            (SnapshotSource::File(path), content)
        };

        self.source = Some(source);
        self.content = Some(content);
        Ok(())
    }

    fn wait_settled(&mut self, budget: Duration) -> Result<Settled, HarnessError> {
        let deadline = Instant::now() + budget;

        loop {
            if self.is_settled() {
                return Ok(Settled::Stable);
            }

            let now = Instant::now();
            if now >= deadline || self.source == Some(SnapshotSource::Stdin) {
                return Ok(Settled::BudgetElapsed);
            }

            thread::sleep(POLL_INTERVAL.min(deadline - now));
            self.reload()?;
        }
    }

    fn capture_raw_primitives(&mut self) -> Result<Value, HarnessError> {
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| HarnessError::Capture("no snapshot loaded".to_string()))?;

        // Nothing rendered yet: an empty view, not a malformed one
        if content.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }

        serde_json::from_str(content)
            .map_err(|e| HarnessError::Extraction(ExtractionError::MalformedSnapshot(e.to_string())))
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), HarnessError> {
        let screenshot_err = |reason: String| HarnessError::Screenshot {
            path: path.to_path_buf(),
            reason,
        };

        let content = self
            .content
            .as_deref()
            .ok_or_else(|| screenshot_err("no snapshot loaded".to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| screenshot_err(e.to_string()))?;
        }
        fs::write(path, content).map_err(|e| screenshot_err(e.to_string()))
    }

    fn artifact_extension(&self) -> &'static str {
        "json"
    }
}

// ============================================================================
// CORE PIPELINE
// ============================================================================

/// Everything that produced a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// SHA-256 of the snapshot as extracted
    pub snapshot_digest: String,
    pub expected_label: String,
    pub geometry: Geometry,
    pub correspondences: Vec<CorrespondenceResult>,
    pub highlighted_days: BTreeSet<u32>,
    pub collisions: Vec<TickCollision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub verdict: Verdict,
    pub evidence: Evidence,
}

/// Extract, match and check one snapshot against the expected time point.
pub fn verify_snapshot(
    raw: &RawSnapshot,
    expected: &TimePoint,
    config: &CheckConfig,
) -> Result<Verification, ExtractionError> {
    let geometry = config.extractor().extract(raw)?;
    let correspondences = match_bars_to_ticks(&geometry.bars, &geometry.ticks);
    let highlighted = highlighted_days(&geometry.cells);
    let collisions = tick_collisions(&correspondences);

    let verdict = config
        .checker()
        .check(expected, &correspondences, &highlighted);

    Ok(Verification {
        verdict,
        evidence: Evidence {
            snapshot_digest: snapshot_digest(raw)?,
            expected_label: expected.expected_tick_label(config.tick_labels),
            geometry,
            correspondences,
            highlighted_days: highlighted,
            collisions,
        },
    })
}

pub fn snapshot_digest(raw: &RawSnapshot) -> Result<String, ExtractionError> {
    let bytes =
        serde_json::to_vec(raw).map_err(|e| ExtractionError::MalformedSnapshot(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// HARNESS CONTEXT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRun {
    pub target: String,
    pub settled: bool,
    pub verification: Verification,
    pub artifact: Option<PathBuf>,
}

/// Explicit per-run state threaded through every step.
pub struct HarnessContext<A: PageAccessor> {
    pub accessor: A,
    pub config: CheckConfig,
    pub expected: TimePoint,
    pub results_dir: Option<PathBuf>,

    /// Runs started so far; numbers the artifacts so equal stems never overwrite
    runs_started: usize,
}

impl<A: PageAccessor> HarnessContext<A> {
    pub fn new(accessor: A, config: CheckConfig, expected: TimePoint) -> Self {
        HarnessContext {
            accessor,
            config,
            expected,
            results_dir: None,
            runs_started: 0,
        }
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }

    /// One full pass over `target`. Navigation and malformed snapshots abort; nothing else does.
    pub fn run(&mut self, target: &str) -> Result<PageRun, HarnessError> {
        self.runs_started += 1;
        info!("navigating to {}", target);
        self.accessor.navigate(target)?;

        let budget = Duration::from_millis(self.config.settle_budget_ms);
        let mut settled = self.accessor.wait_settled(budget)? == Settled::Stable;
        if !settled {
            warn!("{} not settled after {:?}, retrying once", target, budget);
            settled = self.accessor.wait_settled(budget)? == Settled::Stable;
            if !settled {
                warn!("{} still not settled, checking whatever rendered", target);
            }
        }

        let value = self.accessor.capture_raw_primitives()?;
        let raw = RawSnapshot::from_value(&value)?;
        let verification = verify_snapshot(&raw, &self.expected, &self.config)?;
        info!("{}: {}", target, verification.verdict);

        let artifact = self.capture_artifact(target);

        Ok(PageRun {
            target: target.to_string(),
            settled,
            verification,
            artifact,
        })
    }

    fn capture_artifact(&mut self, target: &str) -> Option<PathBuf> {
        let dir = self.results_dir.as_ref()?;
        let path = dir.join(format!(
            "{:02}-{}.{}",
            self.runs_started,
            artifact_stem(target),
            self.accessor.artifact_extension()
        ));

        match self.accessor.screenshot(&path) {
            Ok(()) => {
                debug!("artifact written to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("artifact capture failed: {}", e);
                None
            }
        }
    }
}

/// File-system friendly name for a target.
fn artifact_stem(target: &str) -> String {
    let stem = Path::new(target)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "-")
        .unwrap_or("stdin");

    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
