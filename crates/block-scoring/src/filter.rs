//! Predicate filtering and result statistics
//!
//! A [`FilterRequest`] is a conjunction: four optional equality predicates
//! on the location columns plus five required inclusive ranges. Queries
//! are pure set intersection with no validation failure mode — an
//! inverted range or an unknown location value simply matches nothing.
//!
//! Each query builds its own result rows; the dataset is never touched.

use crate::{BlockDataset, DatasetBounds, ScoredBlock, HIGH_POTENTIAL_MIN};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An inclusive `[min, max]` range predicate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeBound {
    pub min: f64,
    pub max: f64,
}

impl RangeBound {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl From<crate::ColumnBounds> for RangeBound {
    fn from(bounds: crate::ColumnBounds) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

/// One filter query over the scored dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    pub province: Option<String>,
    pub district: Option<String>,
    pub sub_district: Option<String>,
    pub happy_block: Option<String>,
    pub net_add: RangeBound,
    pub potential_score: RangeBound,
    pub port_utilize_percent: RangeBound,
    pub market_share_true: RangeBound,
    pub l2_aging_months: RangeBound,
}

impl FilterRequest {
    /// Match-all request over the dataset's own bounds ("show all")
    pub fn unbounded(bounds: &DatasetBounds) -> Self {
        Self {
            province: None,
            district: None,
            sub_district: None,
            happy_block: None,
            net_add: bounds.net_add.into(),
            potential_score: bounds.potential_score.into(),
            port_utilize_percent: bounds.port_utilize_percent.into(),
            market_share_true: bounds.market_share_true.into(),
            l2_aging_months: bounds.l2_aging_months.into(),
        }
    }

    /// Quick filter: potential score pinned to [70, max]
    pub fn high_potential(bounds: &DatasetBounds) -> Self {
        let mut request = Self::unbounded(bounds);
        request.potential_score = RangeBound::new(
            HIGH_POTENTIAL_MIN,
            bounds.potential_score.max.max(HIGH_POTENTIAL_MIN),
        );
        request
    }

    fn matches(&self, record: &ScoredBlock) -> bool {
        let block = &record.block;

        if let Some(province) = &self.province {
            if &block.province != province {
                return false;
            }
        }
        if let Some(district) = &self.district {
            if &block.district != district {
                return false;
            }
        }
        if let Some(sub_district) = &self.sub_district {
            if &block.sub_district != sub_district {
                return false;
            }
        }
        if let Some(happy_block) = &self.happy_block {
            if &block.happy_block != happy_block {
                return false;
            }
        }

        // a block with no known in-service date has no aging value and
        // can never satisfy the aging range
        let aging_ok = match block.l2_aging_months {
            Some(months) => self.l2_aging_months.contains(f64::from(months)),
            None => false,
        };

        aging_ok
            && self.net_add.contains(block.net_add)
            && self.potential_score.contains(record.potential_score)
            && self.port_utilize_percent.contains(block.port_utilize_percent)
            && self.market_share_true.contains(block.market_share_true)
    }
}

/// Mean position of the matched blocks
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Centroid {
    pub latitude: f64,
    pub longitude: f64,
}

/// Aggregates over a query's matched rows. `mean_score` and `centroid`
/// are `None` on an empty match — callers fall back to their own map
/// center in that case.
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    pub count: usize,
    pub mean_score: Option<f64>,
    pub centroid: Option<Centroid>,
}

/// Matched rows plus their aggregates
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub rows: Vec<ScoredBlock>,
    pub stats: QueryStats,
}

/// Apply a filter request to the dataset.
///
/// Rows come back in dataset order; use [`sort_by_score_desc`] for the
/// ranked-list presentation. An empty match is a normal result, never an
/// error.
pub fn query(dataset: &BlockDataset, request: &FilterRequest) -> QueryResult {
    let rows: Vec<ScoredBlock> = dataset
        .records()
        .iter()
        .filter(|record| request.matches(record))
        .cloned()
        .collect();

    let stats = compute_stats(&rows);
    debug!("Query matched {} of {} blocks", stats.count, dataset.len());

    QueryResult { rows, stats }
}

fn compute_stats(rows: &[ScoredBlock]) -> QueryStats {
    if rows.is_empty() {
        return QueryStats {
            count: 0,
            mean_score: None,
            centroid: None,
        };
    }

    let n = rows.len() as f64;
    let score_sum: f64 = rows.iter().map(|r| r.potential_score).sum();
    let lat_sum: f64 = rows.iter().map(|r| r.block.latitude).sum();
    let lon_sum: f64 = rows.iter().map(|r| r.block.longitude).sum();

    QueryStats {
        count: rows.len(),
        mean_score: Some(score_sum / n),
        centroid: Some(Centroid {
            latitude: lat_sum / n,
            longitude: lon_sum / n,
        }),
    }
}

/// Stable sort by potential score, highest first; ties keep their
/// original dataset order.
pub fn sort_by_score_desc(rows: &mut [ScoredBlock]) {
    rows.sort_by(|a, b| {
        b.potential_score
            .partial_cmp(&a.potential_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Render rows as a GeoJSON FeatureCollection of block points for map
/// display.
pub fn to_geojson(rows: &[ScoredBlock]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| {
            serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [r.block.longitude, r.block.latitude]
                },
                "properties": {
                    "province": r.block.province,
                    "district": r.block.district,
                    "sub_district": r.block.sub_district,
                    "happy_block": r.block.happy_block,
                    "l2": r.block.l2,
                    "household": r.block.household,
                    "port_capacity": r.block.port_capacity,
                    "port_available": r.block.port_available,
                    "port_use": r.block.port_use,
                    "port_utilize_percent": r.block.port_utilize_percent,
                    "net_add": r.block.net_add,
                    "market_share_true": r.block.market_share_true,
                    "market_share_ais": r.block.market_share_ais,
                    "market_share_3bb": r.block.market_share_3bb,
                    "market_share_nt": r.block.market_share_nt,
                    "true_speed": r.block.true_speed,
                    "competitor_speed": r.block.competitor_speed,
                    "l2_aging_months": r.block.l2_aging_months,
                    "potential_score": r.potential_score
                }
            })
        })
        .collect();

    serde_json::json!({
        "type": "FeatureCollection",
        "features": features
    })
}
