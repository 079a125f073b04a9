// 🔗 Correspondence Matcher - Which axis slot does each bar sit over?
//
// 1-D nearest neighbour on x: bar center vs tick position.
// Pure function of (bars, ticks); no state survives between calls.

use crate::geometry::{AxisTick, RenderedBar};
use log::debug;
use serde::{Deserialize, Serialize};

// ============================================================================
// CORRESPONDENCE RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMatch {
    pub label: String,
    pub tick_x: f64,

    /// |tick_x - bar center|, always >= 0
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceResult {
    pub bar_index: usize,
    pub center_x: f64,

    /// None = no ticks to match against
    pub matched: Option<TickMatch>,
}

impl CorrespondenceResult {
    pub fn is_unmatched(&self) -> bool {
        self.matched.is_none()
    }

    pub fn matched_label(&self) -> Option<&str> {
        self.matched.as_ref().map(|m| m.label.as_str())
    }
}

/// Several bars landing on one tick. Reported, not rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickCollision {
    pub label: String,
    pub tick_x: f64,
    pub bar_indices: Vec<usize>,
}

// ============================================================================
// MATCHING
// ============================================================================

/// Match every bar to the tick nearest its center.
///
/// Equal distances resolve to the tick with the smaller `x`. With no ticks
/// every bar comes back unmatched.
pub fn match_bars_to_ticks(bars: &[RenderedBar], ticks: &[AxisTick]) -> Vec<CorrespondenceResult> {
    let results: Vec<CorrespondenceResult> = bars
        .iter()
        .map(|bar| {
            let center_x = bar.center_x();
            CorrespondenceResult {
                bar_index: bar.index,
                center_x,
                matched: nearest_tick(center_x, ticks),
            }
        })
        .collect();

    for r in &results {
        match &r.matched {
            Some(m) => debug!(
                "bar[{}] center={:.1} -> {:?} (distance {:.1})",
                r.bar_index, r.center_x, m.label, m.distance
            ),
            None => debug!("bar[{}] center={:.1} -> unmatched", r.bar_index, r.center_x),
        }
    }

    results
}

fn nearest_tick(center_x: f64, ticks: &[AxisTick]) -> Option<TickMatch> {
    let mut best: Option<TickMatch> = None;

    for tick in ticks {
        let distance = (tick.x - center_x).abs();
        let better = match &best {
            None => true,
            Some(current) => {
                distance < current.distance
                    || (distance == current.distance && tick.x < current.tick_x)
            }
        };

        if better {
            best = Some(TickMatch {
                label: tick.label.clone(),
                tick_x: tick.x,
                distance,
            });
        }
    }

    best
}

/// Ticks claimed by more than one bar, ascending by tick position.
pub fn tick_collisions(results: &[CorrespondenceResult]) -> Vec<TickCollision> {
    let mut claimed: Vec<(&TickMatch, usize)> = results
        .iter()
        .filter_map(|r| r.matched.as_ref().map(|m| (m, r.bar_index)))
        .collect();
    claimed.sort_by(|a, b| a.0.tick_x.total_cmp(&b.0.tick_x).then(a.1.cmp(&b.1)));

    let mut collisions: Vec<TickCollision> = Vec::new();
    let mut i = 0;
    while i < claimed.len() {
        let (tick, _) = claimed[i];
        let mut j = i;
        while j < claimed.len() && claimed[j].0.tick_x == tick.tick_x {
            j += 1;
        }

        if j - i > 1 {
            collisions.push(TickCollision {
                label: tick.label.clone(),
                tick_x: tick.tick_x,
                bar_indices: claimed[i..j].iter().map(|(_, idx)| *idx).collect(),
            });
        }
        i = j;
    }

    collisions
}

// ============================================================================
// TESTS
// ============================================================================
