//! Happy Block Scoring & Filtering Engine
//!
//! Cleans a raw Happy Block survey table, derives a normalized composite
//! Potential Score per block, and answers interactive filter queries over
//! the scored dataset for field-sales targeting on a map.
//!
//! # Scoring Model (5-Factor)
//!
//! ```text
//! Score(hb) = (w₁·H + w₂·I + w₃·N + w₄·M + w₅·S) · 100, ceiled to steps of 5
//! ```
//!
//! | Factor | Weight | Description |
//! |--------|--------|-------------|
//! | H      | 0.40   | Household density (households per km²) |
//! | I      | 0.25   | Installation density (share of all installs) |
//! | N      | 0.20   | Net subscriber additions |
//! | M      | 0.05   | True market share |
//! | S      | 0.10   | True download speed |
//!
//! Each factor is min-max normalized over the whole dataset before
//! weighting, so scores are relative to the loaded table.
//!
//! # Pipeline
//!
//! Raw CSV rows → field normalization → derived metrics → factor
//! normalization → composite score. The result is an immutable
//! [`BlockDataset`]; option resolution ([`options`]) and filter queries
//! ([`filter`]) are pure reads over it and can run concurrently without
//! locking.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod filter;
pub mod loader;
pub mod normalizer;
pub mod options;
pub mod scorer;

pub use filter::{Centroid, FilterRequest, QueryResult, QueryStats, RangeBound};
pub use options::LocationSelection;
pub use scorer::ScoreWeights;

/// Happy Block footprint: a 500m × 500m cell, 0.25 km²
pub const BLOCK_AREA_KM2: f64 = 0.25;

/// Potential scores land on multiples of this step
pub const SCORE_STEP: f64 = 5.0;

/// Potential Score threshold for the "high potential" quick filter
pub const HIGH_POTENTIAL_MIN: f64 = 70.0;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Dataset contains no rows")]
    EmptyDataset,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// A Happy Block after field normalization: every column carries its
/// declared type, cell-level parse failures have already degraded to the
/// documented defaults (0.0, or `None` for the in-service date).
///
/// Serialized field names match the source table's column headers so rows
/// round-trip as ordered column-name → value mappings.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    #[serde(rename = "Province")]
    pub province: String,
    #[serde(rename = "District")]
    pub district: String,
    #[serde(rename = "Sub-district")]
    pub sub_district: String,
    #[serde(rename = "Happy Block")]
    pub happy_block: String,
    /// L2 termination point identifier (passthrough)
    #[serde(rename = "L2")]
    pub l2: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Household")]
    pub household: f64,
    #[serde(rename = "Install")]
    pub install: f64,
    #[serde(rename = "Port Capacity")]
    pub port_capacity: f64,
    #[serde(rename = "Port Available")]
    pub port_available: f64,
    /// Ports in use, clamped to ≥ 0
    #[serde(rename = "Port Use")]
    pub port_use: f64,
    /// Port utilization in [0, 100]; 0 when the source cell was missing
    #[serde(rename = "%Port_Utilize")]
    pub port_utilize_percent: f64,
    #[serde(rename = "Market Share True (%)")]
    pub market_share_true: f64,
    #[serde(rename = "Market Share AIS (%)")]
    pub market_share_ais: f64,
    #[serde(rename = "Market Share 3BB (%)")]
    pub market_share_3bb: f64,
    #[serde(rename = "Market Share NT (%)")]
    pub market_share_nt: f64,
    #[serde(rename = "True Speed")]
    pub true_speed: f64,
    #[serde(rename = "Competitor Speed")]
    pub competitor_speed: f64,
    #[serde(rename = "Net Add")]
    pub net_add: f64,
    #[serde(rename = "L2 Inservice date")]
    pub l2_inservice_date: Option<NaiveDate>,
    /// Whole months since the L2 went in service, `None` when the
    /// in-service date is missing or unparseable
    #[serde(rename = "L2_Aging_Months")]
    pub l2_aging_months: Option<u32>,
    /// Score column as delivered in the source table, clamped to ≥ 0.
    /// Superseded by the recomputed composite in [`ScoredBlock`].
    #[serde(rename = "Potential Score Raw")]
    pub potential_score_raw: f64,
}

/// A [`Block`] plus its derived metrics, normalized factors and composite
/// Potential Score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredBlock {
    #[serde(flatten)]
    pub block: Block,
    /// Households per km² (block footprint is 0.25 km²)
    #[serde(rename = "Household Density")]
    pub household_density: f64,
    /// This block's share of all installs in the dataset; sums to 1
    #[serde(rename = "Installation Density")]
    pub installation_density: f64,
    #[serde(rename = "Normalized Household Density")]
    pub norm_household_density: f64,
    #[serde(rename = "Normalized Installation Density")]
    pub norm_installation_density: f64,
    #[serde(rename = "Normalized Net Add")]
    pub norm_net_add: f64,
    #[serde(rename = "Normalized Market Share")]
    pub norm_market_share: f64,
    #[serde(rename = "Normalized True Speed")]
    pub norm_true_speed: f64,
    /// Composite score in {0, 5, 10, …, 100}
    #[serde(rename = "Potential Score")]
    pub potential_score: f64,
}

/// Inclusive min/max of one numeric column over the whole dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnBounds {
    pub min: f64,
    pub max: f64,
}

impl ColumnBounds {
    fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(ColumnBounds { min: v, max: v }),
            Some(b) => Some(ColumnBounds {
                min: b.min.min(v),
                max: b.max.max(v),
            }),
        })
    }
}

/// Authoritative min/max per filterable column, computed once at load
/// time. Range-selection UIs take their slider bounds from here so they
/// can never drift from the values the engine filters on.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetBounds {
    pub net_add: ColumnBounds,
    pub potential_score: ColumnBounds,
    pub port_utilize_percent: ColumnBounds,
    pub market_share_true: ColumnBounds,
    /// Over blocks with a known in-service date; [0, 0] when none have one
    pub l2_aging_months: ColumnBounds,
}

impl DatasetBounds {
    fn from_records(records: &[ScoredBlock]) -> Self {
        let zero = ColumnBounds { min: 0.0, max: 0.0 };
        DatasetBounds {
            net_add: ColumnBounds::from_values(records.iter().map(|r| r.block.net_add))
                .unwrap_or(zero),
            potential_score: ColumnBounds::from_values(records.iter().map(|r| r.potential_score))
                .unwrap_or(zero),
            port_utilize_percent: ColumnBounds::from_values(
                records.iter().map(|r| r.block.port_utilize_percent),
            )
            .unwrap_or(zero),
            market_share_true: ColumnBounds::from_values(
                records.iter().map(|r| r.block.market_share_true),
            )
            .unwrap_or(zero),
            l2_aging_months: ColumnBounds::from_values(
                records
                    .iter()
                    .filter_map(|r| r.block.l2_aging_months.map(f64::from)),
            )
            .unwrap_or(zero),
        }
    }
}

/// The scored dataset: built once, read-only afterwards.
///
/// All query entry points borrow the dataset immutably, so a single
/// instance can serve concurrent readers without locking.
#[derive(Debug, Clone)]
pub struct BlockDataset {
    records: Vec<ScoredBlock>,
    bounds: DatasetBounds,
    reference_date: NaiveDate,
}

impl BlockDataset {
    /// Load, normalize and score a Happy Block table. Aging is measured
    /// against today's date.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv_at(path, chrono::Local::now().date_naive())
    }

    /// Like [`BlockDataset::from_csv`], with an explicit reference date
    /// for the aging computation (reproducible runs).
    pub fn from_csv_at(path: impl AsRef<Path>, reference_date: NaiveDate) -> Result<Self> {
        let rows = loader::load_rows(path)?;
        Self::from_raw_rows(rows, reference_date)
    }

    pub(crate) fn from_raw_rows(
        rows: Vec<loader::RawBlockRow>,
        reference_date: NaiveDate,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        let blocks: Vec<Block> = rows
            .iter()
            .map(|row| normalizer::normalize_row(row, reference_date))
            .collect();
        let records = scorer::score_blocks(blocks);
        let bounds = DatasetBounds::from_records(&records);

        info!(
            "Scored {} blocks (potential score {:.0}..{:.0})",
            records.len(),
            bounds.potential_score.min,
            bounds.potential_score.max
        );

        Ok(BlockDataset {
            records,
            bounds,
            reference_date,
        })
    }

    /// All scored blocks, in source-table order
    pub fn records(&self) -> &[ScoredBlock] {
        &self.records
    }

    /// Column bounds for range-selection UIs
    pub fn bounds(&self) -> &DatasetBounds {
        &self.bounds
    }

    /// The date aging was measured against
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RawBlockRow;

    fn ref_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn make_row(province: &str, net_add: &str, install: &str) -> RawBlockRow {
        RawBlockRow {
            province: province.to_string(),
            district: "Mueang".to_string(),
            sub_district: "Talat".to_string(),
            happy_block: "HB-001".to_string(),
            latitude: "8.43".to_string(),
            longitude: "99.96".to_string(),
            household: "120".to_string(),
            install: install.to_string(),
            net_add: net_add.to_string(),
            true_speed: "300".to_string(),
            market_share_true: "42.5".to_string(),
            ..RawBlockRow::default()
        }
    }

    #[test]
    fn test_row_count_preserved() {
        let rows = vec![
            make_row("Surat Thani", "4", "10"),
            make_row("Surat Thani", "-3", "0"),
            make_row("Phuket", "not a number", "5"),
        ];
        let dataset = BlockDataset::from_raw_rows(rows, ref_date()).unwrap();
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let err = BlockDataset::from_raw_rows(Vec::new(), ref_date()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyDataset));
    }

    #[test]
    fn test_bounds_cover_records() {
        let rows = vec![
            make_row("Surat Thani", "1", "10"),
            make_row("Surat Thani", "5", "20"),
            make_row("Phuket", "10", "30"),
        ];
        let dataset = BlockDataset::from_raw_rows(rows, ref_date()).unwrap();
        let bounds = dataset.bounds();

        assert_eq!(bounds.net_add.min, 1.0);
        assert_eq!(bounds.net_add.max, 10.0);
        for record in dataset.records() {
            assert!(record.potential_score >= bounds.potential_score.min);
            assert!(record.potential_score <= bounds.potential_score.max);
        }
    }

    #[test]
    fn test_aging_bounds_zero_when_no_dates() {
        let rows = vec![make_row("Phuket", "2", "5")];
        let dataset = BlockDataset::from_raw_rows(rows, ref_date()).unwrap();
        assert_eq!(dataset.bounds().l2_aging_months.min, 0.0);
        assert_eq!(dataset.bounds().l2_aging_months.max, 0.0);
    }

    #[test]
    fn test_missing_utilization_cells_default_to_zero() {
        // make_row leaves %Port_Utilize empty, as when the column is
        // absent from the source table
        let rows = vec![
            make_row("Phuket", "2", "5"),
            make_row("Phuket", "3", "7"),
        ];
        let dataset = BlockDataset::from_raw_rows(rows, ref_date()).unwrap();
        for record in dataset.records() {
            assert_eq!(record.block.port_utilize_percent, 0.0);
        }
    }

    #[test]
    fn test_rows_serialize_with_source_column_names() {
        let rows = vec![make_row("Phuket", "2", "5")];
        let dataset = BlockDataset::from_raw_rows(rows, ref_date()).unwrap();
        let json = serde_json::to_value(&dataset.records()[0]).unwrap();

        assert_eq!(json["Province"], "Phuket");
        assert_eq!(json["Net Add"], 2.0);
        assert!(json.get("Potential Score").is_some());
        assert!(json.get("Normalized Household Density").is_some());
        assert!(json["L2_Aging_Months"].is_null());
    }
}
