//! Potential Score computation
//!
//! Implements the 5-factor composite model:
//!
//! ```text
//! Score(hb) = (w₁·H + w₂·I + w₃·N + w₄·M + w₅·S) · 100
//! ```
//!
//! with each factor min-max normalized over the whole dataset and the
//! final value ceiled to the next multiple of 5, so a raw 96.0 publishes
//! as 100 and an exact 95.0 stays 95. A factor column with no variance
//! (max == min) normalizes to 0.0 for every block; the composite stays
//! finite on any input.

use crate::{Block, ScoredBlock, BLOCK_AREA_KM2, SCORE_STEP};
use serde::Serialize;
use tracing::debug;

/// Factor weights, sum = 1.0
pub const W_HOUSEHOLD_DENSITY: f64 = 0.40;
pub const W_INSTALLATION_DENSITY: f64 = 0.25;
pub const W_NET_ADD: f64 = 0.20;
pub const W_MARKET_SHARE: f64 = 0.05;
pub const W_TRUE_SPEED: f64 = 0.10;

/// Scoring weights
#[derive(Debug, Clone, Serialize)]
pub struct ScoreWeights {
    /// Weight for household density (H)
    pub w_household_density: f64,
    /// Weight for installation density (I)
    pub w_installation_density: f64,
    /// Weight for net subscriber additions (N)
    pub w_net_add: f64,
    /// Weight for true market share (M)
    pub w_market_share: f64,
    /// Weight for true download speed (S)
    pub w_true_speed: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            w_household_density: W_HOUSEHOLD_DENSITY,
            w_installation_density: W_INSTALLATION_DENSITY,
            w_net_add: W_NET_ADD,
            w_market_share: W_MARKET_SHARE,
            w_true_speed: W_TRUE_SPEED,
        }
    }
}

/// Score all blocks with the default weights.
pub fn score_blocks(blocks: Vec<Block>) -> Vec<ScoredBlock> {
    score_blocks_with(blocks, &ScoreWeights::default())
}

/// Score all blocks.
///
/// Two dataset-wide passes feed the per-block math: the install total
/// (for installation density) and the min/max of each factor column.
pub fn score_blocks_with(blocks: Vec<Block>, weights: &ScoreWeights) -> Vec<ScoredBlock> {
    let install_total: f64 = blocks.iter().map(|b| b.install).sum();

    let household_density: Vec<f64> = blocks
        .iter()
        .map(|b| b.household / BLOCK_AREA_KM2)
        .collect();
    let installation_density: Vec<f64> = blocks
        .iter()
        .map(|b| {
            if install_total > 0.0 {
                b.install / install_total
            } else {
                0.0
            }
        })
        .collect();

    let household_range = min_max(&household_density);
    let install_range = min_max(&installation_density);
    let net_add_range = min_max_by(&blocks, |b| b.net_add);
    let share_range = min_max_by(&blocks, |b| b.market_share_true);
    let speed_range = min_max_by(&blocks, |b| b.true_speed);

    debug!(
        "Factor ranges: household {:?}, install {:?}, net add {:?}, share {:?}, speed {:?}",
        household_range, install_range, net_add_range, share_range, speed_range
    );

    blocks
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            let norm_household_density = normalize(household_density[i], household_range);
            let norm_installation_density = normalize(installation_density[i], install_range);
            let norm_net_add = normalize(block.net_add, net_add_range);
            let norm_market_share = normalize(block.market_share_true, share_range);
            let norm_true_speed = normalize(block.true_speed, speed_range);

            let raw = (weights.w_household_density * norm_household_density
                + weights.w_installation_density * norm_installation_density
                + weights.w_net_add * norm_net_add
                + weights.w_market_share * norm_market_share
                + weights.w_true_speed * norm_true_speed)
                * 100.0;

            ScoredBlock {
                household_density: household_density[i],
                installation_density: installation_density[i],
                norm_household_density,
                norm_installation_density,
                norm_net_add,
                norm_market_share,
                norm_true_speed,
                potential_score: bucket_score(raw),
                block,
            }
        })
        .collect()
}

/// Ceil a raw composite to the next multiple of [`SCORE_STEP`]. A small
/// tolerance keeps accumulated float error at exact bucket boundaries
/// (a nominal 100.0 arriving as 100.00000000000003) from bumping the
/// score a full step.
pub fn bucket_score(raw: f64) -> f64 {
    const EPS: f64 = 1e-9;
    (((raw - EPS) / SCORE_STEP).ceil() * SCORE_STEP).max(0.0)
}

/// Min-max scale a value into [0, 1]; a zero-variance column maps to 0.0
/// so the weighted sum stays well-defined.
fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
        (min.min(v), max.max(v))
    })
}

fn min_max_by(blocks: &[Block], field: impl Fn(&Block) -> f64) -> (f64, f64) {
    blocks
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), b| {
            let v = field(b);
            (min.min(v), max.max(v))
        })
}
