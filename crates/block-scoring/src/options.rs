//! Cascading location option resolution
//!
//! Feeds the province → district → sub-district → happy block dropdown
//! cascade. Each level narrows by whatever upper levels are already
//! selected; district is strictly top-down and returns nothing until a
//! province is chosen.
//!
//! All option lists come back in first-occurrence (dataset encounter)
//! order with duplicates removed. Consumers may rely on that order being
//! stable across identical datasets.

use crate::{BlockDataset, ScoredBlock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A partial location selection, outer levels first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationSelection {
    pub province: Option<String>,
    pub district: Option<String>,
    pub sub_district: Option<String>,
}

impl LocationSelection {
    fn matches(&self, record: &ScoredBlock) -> bool {
        let block = &record.block;
        self.province.as_ref().map_or(true, |p| &block.province == p)
            && self.district.as_ref().map_or(true, |d| &block.district == d)
            && self
                .sub_district
                .as_ref()
                .map_or(true, |s| &block.sub_district == s)
    }
}

/// All provinces present in the dataset
pub fn province_options(dataset: &BlockDataset) -> Vec<String> {
    distinct(dataset.records().iter().map(|r| r.block.province.as_str()))
}

/// Districts within the selected province; empty when no province is
/// selected (district choice is top-down only).
pub fn district_options(dataset: &BlockDataset, selection: &LocationSelection) -> Vec<String> {
    if selection.province.is_none() {
        return Vec::new();
    }
    let scope = LocationSelection {
        province: selection.province.clone(),
        ..LocationSelection::default()
    };
    distinct(
        dataset
            .records()
            .iter()
            .filter(|r| scope.matches(r))
            .map(|r| r.block.district.as_str()),
    )
}

/// Sub-districts matching the selected province and/or district. Blank
/// sub-district cells are excluded.
pub fn sub_district_options(dataset: &BlockDataset, selection: &LocationSelection) -> Vec<String> {
    let scope = LocationSelection {
        province: selection.province.clone(),
        district: selection.district.clone(),
        sub_district: None,
    };
    distinct(
        dataset
            .records()
            .iter()
            .filter(|r| scope.matches(r))
            .map(|r| r.block.sub_district.as_str())
            .filter(|s| !s.trim().is_empty()),
    )
}

/// Happy Blocks matching the selected province and/or district and/or
/// sub-district.
pub fn happy_block_options(dataset: &BlockDataset, selection: &LocationSelection) -> Vec<String> {
    distinct(
        dataset
            .records()
            .iter()
            .filter(|r| selection.matches(r))
            .map(|r| r.block.happy_block.as_str()),
    )
}

/// First-occurrence deduplication
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RawBlockRow;
    use chrono::NaiveDate;

    fn make_row(province: &str, district: &str, sub_district: &str, happy_block: &str) -> RawBlockRow {
        RawBlockRow {
            province: province.to_string(),
            district: district.to_string(),
            sub_district: sub_district.to_string(),
            happy_block: happy_block.to_string(),
            latitude: "9.1".to_string(),
            longitude: "99.3".to_string(),
            ..RawBlockRow::default()
        }
    }

    fn make_dataset(rows: Vec<RawBlockRow>) -> BlockDataset {
        let reference = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        BlockDataset::from_raw_rows(rows, reference).unwrap()
    }

    fn select(province: Option<&str>, district: Option<&str>, sub_district: Option<&str>) -> LocationSelection {
        LocationSelection {
            province: province.map(String::from),
            district: district.map(String::from),
            sub_district: sub_district.map(String::from),
        }
    }

    #[test]
    fn test_province_options_first_occurrence_order() {
        let dataset = make_dataset(vec![
            make_row("Surat Thani", "Mueang", "Talat", "HB-1"),
            make_row("Phuket", "Thalang", "Thep Krasattri", "HB-2"),
            make_row("Surat Thani", "Phunphin", "Tha Kham", "HB-3"),
        ]);
        assert_eq!(province_options(&dataset), vec!["Surat Thani", "Phuket"]);
    }

    #[test]
    fn test_district_options_require_province() {
        let dataset = make_dataset(vec![
            make_row("Surat Thani", "Mueang", "Talat", "HB-1"),
            make_row("Phuket", "Thalang", "Thep Krasattri", "HB-2"),
        ]);

        assert!(district_options(&dataset, &select(None, None, None)).is_empty());
        assert_eq!(
            district_options(&dataset, &select(Some("Surat Thani"), None, None)),
            vec!["Mueang"]
        );
    }

    #[test]
    fn test_sub_district_options_narrow_by_each_level() {
        let dataset = make_dataset(vec![
            make_row("Surat Thani", "Mueang", "Talat", "HB-1"),
            make_row("Surat Thani", "Mueang", "Makham Tia", "HB-2"),
            make_row("Surat Thani", "Phunphin", "Tha Kham", "HB-3"),
            make_row("Phuket", "Thalang", "Thep Krasattri", "HB-4"),
        ]);

        // district alone is honored even without a province
        assert_eq!(
            sub_district_options(&dataset, &select(None, Some("Phunphin"), None)),
            vec!["Tha Kham"]
        );
        assert_eq!(
            sub_district_options(&dataset, &select(Some("Surat Thani"), Some("Mueang"), None)),
            vec!["Talat", "Makham Tia"]
        );
    }

    #[test]
    fn test_sub_district_options_exclude_blank() {
        let dataset = make_dataset(vec![
            make_row("Surat Thani", "Mueang", "Talat", "HB-1"),
            make_row("Surat Thani", "Mueang", "   ", "HB-2"),
            make_row("Surat Thani", "Mueang", "", "HB-3"),
        ]);
        assert_eq!(
            sub_district_options(&dataset, &select(Some("Surat Thani"), None, None)),
            vec!["Talat"]
        );
    }

    #[test]
    fn test_happy_block_options_deduplicate() {
        let dataset = make_dataset(vec![
            make_row("Surat Thani", "Mueang", "Talat", "HB-1"),
            make_row("Surat Thani", "Mueang", "Bang Kung", "HB-1"),
            make_row("Surat Thani", "Mueang", "Talat", "HB-2"),
        ]);
        assert_eq!(
            happy_block_options(&dataset, &select(Some("Surat Thani"), None, None)),
            vec!["HB-1", "HB-2"]
        );
    }

    #[test]
    fn test_unknown_selection_yields_empty() {
        let dataset = make_dataset(vec![make_row("Surat Thani", "Mueang", "Talat", "HB-1")]);
        assert!(district_options(&dataset, &select(Some("Chiang Mai"), None, None)).is_empty());
        assert!(happy_block_options(&dataset, &select(Some("Chiang Mai"), None, None)).is_empty());
    }
}
