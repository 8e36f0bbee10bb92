//! Data ingestion — long-form minute bars from Parquet/CSV into a panel.
//!
//! This is the external collaborator side of the pipeline: loading,
//! price-floor filtering, dollar-volume universe selection, and the pivot
//! into `PricePanel`. Alignment and corporate actions are assumed handled
//! upstream. The core never reads files during simulation.

use chrono::DateTime;
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

use crate::domain::{BarRecord, PanelError, PricePanel};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("unreadable timestamp at row {row}")]
    BadTimestamp { row: usize },

    #[error("no rows after filtering")]
    EmptyAfterFilter,

    #[error(transparent)]
    Panel(#[from] PanelError),
}

/// Load long-form bars from a Parquet (by extension) or CSV file.
///
/// Required columns: `symbol`, `datetime`, `open`, `close`, `volume`.
pub fn load_bars(path: &Path) -> Result<Vec<BarRecord>, DataError> {
    let is_parquet = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("parquet"))
        .unwrap_or(false);
    let df = if is_parquet {
        LazyFrame::scan_parquet(path, Default::default())
            .map_err(|e| DataError::ReadFailed(e.to_string()))?
            .collect()
            .map_err(|e| DataError::ReadFailed(e.to_string()))?
    } else {
        LazyCsvReader::new(path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()
            .map_err(|e| DataError::ReadFailed(e.to_string()))?
            .collect()
            .map_err(|e| DataError::ReadFailed(e.to_string()))?
    };
    records_from_frame(&df)
}

/// Extract long-form records from a loaded DataFrame.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<BarRecord>, DataError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|_| DataError::MissingColumn(name.to_string()))
    };
    let symbols = col("symbol")?
        .str()
        .map_err(|e| DataError::ReadFailed(e.to_string()))?
        .clone();
    let datetimes = col("datetime")?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| DataError::ReadFailed(e.to_string()))?;
    let datetimes = datetimes
        .datetime()
        .map_err(|e| DataError::ReadFailed(e.to_string()))?
        .clone();
    let float_col = |name: &str| -> Result<Float64Chunked, DataError> {
        Ok(col(name)?
            .cast(&DataType::Float64)
            .map_err(|e| DataError::ReadFailed(e.to_string()))?
            .f64()
            .map_err(|e| DataError::ReadFailed(e.to_string()))?
            .clone())
    };
    let opens = float_col("open")?;
    let closes = float_col("close")?;
    let volumes = float_col("volume")?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let millis = datetimes
            .get(row)
            .ok_or(DataError::BadTimestamp { row })?;
        let datetime = DateTime::from_timestamp_millis(millis)
            .ok_or(DataError::BadTimestamp { row })?;
        records.push(BarRecord {
            symbol: symbols.get(row).unwrap_or("").to_string(),
            datetime,
            open: opens.get(row).unwrap_or(f64::NAN),
            close: closes.get(row).unwrap_or(f64::NAN),
            volume: volumes.get(row).unwrap_or(f64::NAN),
        });
    }
    Ok(records)
}

/// Price floor and deterministic (symbol, datetime) sort.
pub fn preprocess(mut records: Vec<BarRecord>, min_price: f64) -> Vec<BarRecord> {
    records.retain(|r| r.close >= min_price);
    records.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.datetime.cmp(&b.datetime)));
    records
}

/// Median daily dollar volume per symbol, sorted descending (symbol name
/// breaks ties so the ordering is deterministic).
pub fn median_dollar_volume(records: &[BarRecord]) -> Vec<(String, f64)> {
    use std::collections::BTreeMap;
    // (symbol, date) -> daily dollar volume
    let mut daily: BTreeMap<(String, chrono::NaiveDate), f64> = BTreeMap::new();
    for r in records {
        if r.close.is_finite() && r.volume.is_finite() {
            *daily
                .entry((r.symbol.clone(), r.datetime.date_naive()))
                .or_insert(0.0) += r.close * r.volume;
        }
    }
    let mut per_symbol: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for ((sym, _), dv) in daily {
        per_symbol.entry(sym).or_default().push(dv);
    }
    let mut out: Vec<(String, f64)> = per_symbol
        .into_iter()
        .map(|(sym, mut dvs)| {
            dvs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = dvs[dvs.len() / 2];
            (sym, median)
        })
        .collect();
    out.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    out
}

/// Keep only the top `n` symbols by median daily dollar volume.
pub fn select_universe(records: Vec<BarRecord>, top_n: usize) -> Vec<BarRecord> {
    let ranked = median_dollar_volume(&records);
    let keep: Vec<&String> = ranked.iter().take(top_n).map(|(s, _)| s).collect();
    records
        .into_iter()
        .filter(|r| keep.iter().any(|k| **k == r.symbol))
        .collect()
}

/// Full ingestion path: load, floor, select universe, pivot to a panel.
pub fn load_panel(path: &Path, min_price: f64, top_n: usize) -> Result<PricePanel, DataError> {
    let records = preprocess(load_bars(path)?, min_price);
    let records = if top_n > 0 {
        select_universe(records, top_n)
    } else {
        records
    };
    if records.is_empty() {
        return Err(DataError::EmptyAfterFilter);
    }
    Ok(PricePanel::from_records(&records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(symbol: &str, day: u32, bar: u32, close: f64, volume: f64) -> BarRecord {
        BarRecord {
            symbol: symbol.into(),
            datetime: Utc
                .with_ymd_and_hms(2024, 1, day, 14, 30 + 5 * bar, 0)
                .unwrap(),
            open: close,
            close,
            volume,
        }
    }

    #[test]
    fn preprocess_floors_and_sorts() {
        let records = vec![
            record("BBB", 2, 1, 50.0, 100.0),
            record("AAA", 2, 0, 2.0, 100.0), // below floor
            record("AAA", 2, 1, 20.0, 100.0),
            record("BBB", 2, 0, 50.0, 100.0),
        ];
        let out = preprocess(records, 5.0);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].symbol, "AAA");
        assert!(out[1].datetime < out[2].datetime);
    }

    #[test]
    fn dollar_volume_ranking_descending() {
        let records = vec![
            record("AAA", 2, 0, 10.0, 100.0), // $1000/day
            record("BBB", 2, 0, 10.0, 500.0), // $5000/day
            record("AAA", 3, 0, 10.0, 100.0),
            record("BBB", 3, 0, 10.0, 500.0),
        ];
        let ranked = median_dollar_volume(&records);
        assert_eq!(ranked[0].0, "BBB");
        assert!((ranked[0].1 - 5000.0).abs() < 1e-9);
        assert!((ranked[1].1 - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn universe_selection_keeps_top() {
        let records = vec![
            record("AAA", 2, 0, 10.0, 100.0),
            record("BBB", 2, 0, 10.0, 500.0),
            record("CCC", 2, 0, 10.0, 300.0),
        ];
        let out = select_universe(records, 2);
        assert!(out.iter().all(|r| r.symbol != "AAA"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn missing_column_reported() {
        let df = df! {
            "symbol" => ["AAA"],
            "close" => [10.0],
        }
        .unwrap();
        let err = records_from_frame(&df).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(c) if c == "datetime"));
    }
}
