//! Field normalization
//!
//! Turns untyped [`RawBlockRow`](crate::loader::RawBlockRow) cells into the
//! typed columns of a [`Block`]. The policy is lossy-but-total: a cell that
//! fails to parse degrades to its documented default (0.0, or `None` for
//! the in-service date) and the row survives. Output row count always
//! equals input row count.
//!
//! Each cell is classified exactly once into a [`RawValue`]; downstream
//! code never re-inspects raw text.

use crate::loader::RawBlockRow;
use crate::Block;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// One raw cell, resolved from text exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Classify a raw cell. `-` and whitespace-only cells are the
    /// upstream export's missing-value sentinels.
    pub fn classify(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed == "-" {
            return RawValue::Missing;
        }
        // f64::parse accepts "NaN"/"inf"; those are missing data here,
        // a finite default keeps the factor math NaN-free
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => RawValue::Number(n),
            Ok(_) => RawValue::Missing,
            Err(_) => RawValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric coercion: unparseable or missing cells become 0.0
    pub fn coerce_or_zero(&self) -> f64 {
        match self {
            RawValue::Number(n) => *n,
            RawValue::Text(_) | RawValue::Missing => 0.0,
        }
    }

    /// Percentage coercion: strips one trailing `%` from text cells
    /// before parsing, so `"45%"` reads as 45.0. Defaults to 0.0.
    pub fn coerce_percent(&self) -> f64 {
        match self {
            RawValue::Number(n) => *n,
            RawValue::Text(text) => text
                .strip_suffix('%')
                .map(str::trim)
                .and_then(|t| t.parse::<f64>().ok())
                .filter(|n| n.is_finite())
                .unwrap_or(0.0),
            RawValue::Missing => 0.0,
        }
    }
}

/// Date shapes observed in upstream exports
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S"];

/// Parse the L2 in-service date. Unparseable cells yield `None`, which
/// propagates into a null aging value rather than a zero.
pub fn parse_service_date(cell: &str) -> Option<NaiveDate> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    None
}

/// Whole months between the in-service date and the reference date,
/// counted in calendar months and floored at zero.
pub fn aging_months(inservice: NaiveDate, reference: NaiveDate) -> u32 {
    let months = (reference.year() - inservice.year()) * 12
        + (reference.month() as i32 - inservice.month() as i32);
    months.max(0) as u32
}

/// Enforce the declared column types for one row.
pub fn normalize_row(row: &RawBlockRow, reference_date: NaiveDate) -> Block {
    let inservice = parse_service_date(&row.l2_inservice_date);

    Block {
        province: row.province.clone(),
        district: row.district.clone(),
        sub_district: row.sub_district.clone(),
        happy_block: row.happy_block.clone(),
        l2: row.l2.clone(),
        latitude: RawValue::classify(&row.latitude).coerce_or_zero(),
        longitude: RawValue::classify(&row.longitude).coerce_or_zero(),
        household: RawValue::classify(&row.household).coerce_or_zero(),
        install: RawValue::classify(&row.install).coerce_or_zero(),
        port_capacity: RawValue::classify(&row.port_capacity).coerce_or_zero(),
        port_available: RawValue::classify(&row.port_available).coerce_or_zero(),
        port_use: RawValue::classify(&row.port_use).coerce_or_zero().max(0.0),
        port_utilize_percent: RawValue::classify(&row.port_utilize).coerce_percent(),
        market_share_true: RawValue::classify(&row.market_share_true).coerce_or_zero(),
        market_share_ais: RawValue::classify(&row.market_share_ais).coerce_or_zero(),
        market_share_3bb: RawValue::classify(&row.market_share_3bb).coerce_or_zero(),
        market_share_nt: RawValue::classify(&row.market_share_nt).coerce_or_zero(),
        true_speed: RawValue::classify(&row.true_speed).coerce_or_zero(),
        competitor_speed: RawValue::classify(&row.competitor_speed).coerce_or_zero(),
        net_add: RawValue::classify(&row.net_add).coerce_or_zero(),
        l2_inservice_date: inservice,
        l2_aging_months: inservice.map(|date| aging_months(date, reference_date)),
        potential_score_raw: RawValue::classify(&row.potential_score)
            .coerce_or_zero()
            .max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(RawValue::classify("42.5"), RawValue::Number(42.5));
        assert_eq!(RawValue::classify(" -7 "), RawValue::Number(-7.0));
        assert_eq!(RawValue::classify("-"), RawValue::Missing);
        assert_eq!(RawValue::classify(" -   "), RawValue::Missing);
        assert_eq!(RawValue::classify(""), RawValue::Missing);
        assert_eq!(RawValue::classify("   "), RawValue::Missing);
        assert_eq!(RawValue::classify("NaN"), RawValue::Missing);
        assert_eq!(RawValue::classify("inf"), RawValue::Missing);
        assert_eq!(
            RawValue::classify("45%"),
            RawValue::Text("45%".to_string())
        );
    }

    #[test]
    fn test_percent_round_trip() {
        assert_eq!(RawValue::classify("45%").coerce_percent(), 45.0);
        assert_eq!(RawValue::classify("37.5").coerce_percent(), 37.5);
        assert_eq!(RawValue::classify("-").coerce_percent(), 0.0);
        assert_eq!(RawValue::classify(" -   ").coerce_percent(), 0.0);
        assert_eq!(RawValue::classify("").coerce_percent(), 0.0);
        assert_eq!(RawValue::classify("12 %").coerce_percent(), 12.0);
        assert_eq!(RawValue::classify("n/a").coerce_percent(), 0.0);
    }

    #[test]
    fn test_coerce_or_zero() {
        assert_eq!(RawValue::classify("5").coerce_or_zero(), 5.0);
        assert_eq!(RawValue::classify("-3").coerce_or_zero(), -3.0);
        assert_eq!(RawValue::classify("45%").coerce_or_zero(), 0.0);
        assert_eq!(RawValue::classify("").coerce_or_zero(), 0.0);
    }

    #[test]
    fn test_parse_service_date() {
        let expected = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        assert_eq!(parse_service_date("2020-05-01"), Some(expected));
        assert_eq!(parse_service_date("1/5/2020"), Some(expected));
        assert_eq!(parse_service_date("2020/5/1"), Some(expected));
        assert_eq!(parse_service_date("2020-05-01 13:45:00"), Some(expected));
        assert_eq!(parse_service_date(""), None);
        assert_eq!(parse_service_date("-"), None);
        assert_eq!(parse_service_date("soon"), None);
    }

    #[test]
    fn test_aging_months() {
        let inservice = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        assert_eq!(aging_months(inservice, ref_date()), 61);

        // same month
        assert_eq!(aging_months(ref_date(), ref_date()), 0);

        // day of month is ignored
        let late_in_month = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        assert_eq!(aging_months(late_in_month, ref_date()), 1);
    }

    #[test]
    fn test_aging_future_date_floors_at_zero() {
        let future = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(aging_months(future, ref_date()), 0);
    }

    #[test]
    fn test_normalize_row_defaults() {
        let row = RawBlockRow {
            province: "Phuket".to_string(),
            port_use: "-4".to_string(),
            potential_score: "-10".to_string(),
            port_utilize: "85%".to_string(),
            market_share_true: "junk".to_string(),
            l2_inservice_date: "never".to_string(),
            ..RawBlockRow::default()
        };
        let block = normalize_row(&row, ref_date());

        assert_eq!(block.port_use, 0.0);
        assert_eq!(block.potential_score_raw, 0.0);
        assert_eq!(block.port_utilize_percent, 85.0);
        assert_eq!(block.market_share_true, 0.0);
        assert_eq!(block.l2_inservice_date, None);
        assert_eq!(block.l2_aging_months, None);
        assert_eq!(block.latitude, 0.0);
    }
}
