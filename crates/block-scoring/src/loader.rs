//! CSV ingestion and schema validation
//!
//! Column headers are a hard compatibility surface: they must match the
//! upstream export byte-for-byte, symbols included (`%Port_Utilize`,
//! `Market Share True (%)`). Every cell is read as text here; type
//! enforcement happens in one place, the [`crate::normalizer`].

use crate::{EngineError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Columns that must be present in the source table. Only the port
/// utilization column may be absent (synthesized as all-zero) and the L2
/// identifier is an optional passthrough.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Province",
    "District",
    "Sub-district",
    "Happy Block",
    "Latitude",
    "Longitude",
    "Household",
    "Install",
    "Port Capacity",
    "Port Available",
    "Port Use",
    "Market Share True (%)",
    "Market Share AIS (%)",
    "Market Share 3BB (%)",
    "Market Share NT (%)",
    "True Speed",
    "Competitor Speed",
    "Net Add",
    "L2 Inservice date",
    "Potential Score",
];

/// The one column with a documented absent-column fallback
pub const UTILIZATION_COLUMN: &str = "%Port_Utilize";

/// One row of the source table, untyped. Cells keep their raw text so a
/// bad cell can degrade to its documented default instead of dropping the
/// row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlockRow {
    #[serde(rename = "Province", default)]
    pub province: String,
    #[serde(rename = "District", default)]
    pub district: String,
    #[serde(rename = "Sub-district", default)]
    pub sub_district: String,
    #[serde(rename = "Happy Block", default)]
    pub happy_block: String,
    #[serde(rename = "L2", default)]
    pub l2: String,
    #[serde(rename = "Latitude", default)]
    pub latitude: String,
    #[serde(rename = "Longitude", default)]
    pub longitude: String,
    #[serde(rename = "Household", default)]
    pub household: String,
    #[serde(rename = "Install", default)]
    pub install: String,
    #[serde(rename = "Port Capacity", default)]
    pub port_capacity: String,
    #[serde(rename = "Port Available", default)]
    pub port_available: String,
    #[serde(rename = "Port Use", default)]
    pub port_use: String,
    #[serde(rename = "%Port_Utilize", default)]
    pub port_utilize: String,
    #[serde(rename = "Market Share True (%)", default)]
    pub market_share_true: String,
    #[serde(rename = "Market Share AIS (%)", default)]
    pub market_share_ais: String,
    #[serde(rename = "Market Share 3BB (%)", default)]
    pub market_share_3bb: String,
    #[serde(rename = "Market Share NT (%)", default)]
    pub market_share_nt: String,
    #[serde(rename = "True Speed", default)]
    pub true_speed: String,
    #[serde(rename = "Competitor Speed", default)]
    pub competitor_speed: String,
    #[serde(rename = "Net Add", default)]
    pub net_add: String,
    #[serde(rename = "L2 Inservice date", default)]
    pub l2_inservice_date: String,
    #[serde(rename = "Potential Score", default)]
    pub potential_score: String,
}

/// Read all rows from a Happy Block CSV export.
///
/// Fails only on IO/CSV-structure problems or a missing required column;
/// cell contents are never inspected here.
pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<RawBlockRow>> {
    let path = path.as_ref();
    info!("Loading blocks from {:?}", path);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(EngineError::MissingColumn((*column).to_string()));
        }
    }
    if !headers.iter().any(|h| h == UTILIZATION_COLUMN) {
        info!("Column {UTILIZATION_COLUMN} absent, will default to 0");
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawBlockRow>() {
        rows.push(result?);
    }

    info!("Loaded {} rows", rows.len());

    Ok(rows)
}
