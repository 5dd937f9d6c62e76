//! Candle loading for the runner.
//!
//! Reads OHLCV candles from CSV with the header
//! `timestamp,open,high,low,close,volume`. Timestamps may be RFC 3339
//! strings, `YYYY-MM-DD HH:MM:SS` (UTC), plain dates, or Unix epochs in
//! seconds or milliseconds. Every candle is validated and the series must
//! be strictly increasing in time.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use risklab_core::domain::{validate_series, Candle, CandleError};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: unrecognised timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: {source}")]
    InvalidCandle {
        row: usize,
        #[source]
        source: CandleError,
    },

    #[error("no candles in input")]
    Empty,
}

/// Loaded candle series with provenance.
#[derive(Debug, Clone)]
pub struct LoadedCandles {
    pub candles: Vec<Candle>,
    /// BLAKE3 over all candle fields, for fingerprinting.
    pub dataset_hash: String,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Load and validate candles from a CSV file.
pub fn load_candles(path: &Path) -> Result<LoadedCandles, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_candles(file)
}

/// Load and validate candles from any CSV reader.
pub fn read_candles<R: Read>(reader: R) -> Result<LoadedCandles, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut candles = Vec::new();
    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        // Row numbers are 1-based data rows, header excluded.
        let row = i + 1;
        let r = record?;
        let timestamp = parse_timestamp(&r.timestamp).ok_or_else(|| LoadError::Timestamp {
            row,
            value: r.timestamp.clone(),
        })?;
        let candle = Candle::new(timestamp, r.open, r.high, r.low, r.close, r.volume);
        candle
            .validate()
            .map_err(|source| LoadError::InvalidCandle { row, source })?;
        candles.push(candle);
    }

    if candles.is_empty() {
        return Err(LoadError::Empty);
    }
    validate_series(&candles)
        .map_err(|(idx, source)| LoadError::InvalidCandle { row: idx + 1, source })?;

    let dataset_hash = hash_candles(&candles);
    Ok(LoadedCandles {
        candles,
        dataset_hash,
    })
}

/// Parse one of the supported timestamp formats.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    if let Ok(epoch) = value.parse::<i64>() {
        // Anything beyond year ~5000 in seconds is taken as milliseconds.
        return if epoch.abs() >= 100_000_000_000 {
            Utc.timestamp_millis_opt(epoch).single()
        } else {
            Utc.timestamp_opt(epoch, 0).single()
        };
    }
    None
}

/// Compute a BLAKE3 hash over all candle data, in order.
pub fn hash_candles(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.timestamp.timestamp_millis().to_le_bytes());
        for v in [c.open, c.high, c.low, c.close, c.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
