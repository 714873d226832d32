//! Bar-file loading for the two legs of a pair.
//!
//! Each file is a CSV with a header row. The timestamp is taken from a
//! column named `datetime`, `timestamp` or `date` (case-insensitive), falling
//! back to the first column; the close from the column named `close`. Other
//! columns (open, high, low, volume, ...) are ignored.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, info};

use pairs_backtest_core::{PriceBar, PricePair};

const TIMESTAMP_HEADERS: [&str; 3] = ["datetime", "timestamp", "date"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Read one leg's closes keyed by timestamp.
pub fn read_closes(path: &str) -> Result<BTreeMap<NaiveDateTime, Decimal>, Box<dyn std::error::Error>> {
    let canonical = super::file::resolve_path(path)?;
    let file = std::fs::File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_closes(file)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

/// Parse closes from CSV text.
pub fn parse_closes<R: Read>(reader: R) -> Result<BTreeMap<NaiveDateTime, Decimal>, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let ts_idx = headers
        .iter()
        .position(|h| TIMESTAMP_HEADERS.contains(&h.as_str()))
        .unwrap_or(0);
    let close_idx = headers
        .iter()
        .position(|h| h == "close")
        .ok_or("missing required header column 'close'")?;

    let mut closes = BTreeMap::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let raw_ts = record.get(ts_idx).unwrap_or_default().trim();
        let raw_close = record.get(close_idx).unwrap_or_default().trim();
        // Missing closes are dropped like any other gap
        if raw_close.is_empty() {
            continue;
        }
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| format!("row {}: cannot parse timestamp '{}'", line, raw_ts))?;
        let close = Decimal::from_str(raw_close)
            .or_else(|_| Decimal::from_scientific(raw_close))
            .map_err(|_| format!("row {}: cannot parse close '{}'", line, raw_close))?;
        if closes.insert(timestamp, close).is_some() {
            return Err(format!("row {}: duplicate timestamp {}", line, timestamp).into());
        }
    }
    debug!(rows = closes.len(), "parsed bar closes");
    Ok(closes)
}

/// Accepts the common bar-file timestamp layouts; a bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Inner-join two legs on timestamp, dropping bars missing from either side.
pub fn join_legs(
    symbol_a: &str,
    symbol_b: &str,
    leg_a: &BTreeMap<NaiveDateTime, Decimal>,
    leg_b: &BTreeMap<NaiveDateTime, Decimal>,
) -> Result<PricePair, Box<dyn std::error::Error>> {
    let bars: Vec<PriceBar> = leg_a
        .iter()
        .filter_map(|(ts, a)| {
            leg_b.get(ts).map(|b| PriceBar {
                timestamp: *ts,
                close_a: *a,
                close_b: *b,
            })
        })
        .collect();

    let dropped = leg_a.len() + leg_b.len() - 2 * bars.len();
    info!(
        symbol_a,
        symbol_b,
        aligned = bars.len(),
        dropped,
        "aligned bar files"
    );
    Ok(PricePair::new(symbol_a, symbol_b, bars)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SPY: &str = "datetime,open,high,low,close,volume,na\n\
        2024-01-02 09:30:00,470.1,470.5,469.9,470.2,1000,\n\
        2024-01-02 09:31:00,470.2,470.8,470.0,470.6,1200,\n\
        2024-01-02 09:32:00,470.6,470.9,470.1,470.3,900,\n";

    const IWM: &str = "Datetime,Open,High,Low,Close,Volume,NA\n\
        2024-01-02 09:30:00,198.0,198.2,197.9,198.1,500,\n\
        2024-01-02 09:32:00,198.3,198.4,198.0,198.2,450,\n";

    #[test]
    fn test_parse_closes_by_header() {
        let closes = parse_closes(SPY.as_bytes()).unwrap();
        assert_eq!(closes.len(), 3);
        let first = parse_timestamp("2024-01-02 09:30:00").unwrap();
        assert_eq!(closes[&first], dec!(470.2));
    }

    #[test]
    fn test_join_drops_unmatched_bars() {
        let a = parse_closes(SPY.as_bytes()).unwrap();
        let b = parse_closes(IWM.as_bytes()).unwrap();
        let pair = join_legs("SPY", "IWM", &a, &b).unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.bars[1].close_a, dec!(470.3));
        assert_eq!(pair.bars[1].close_b, dec!(198.2));
    }

    #[test]
    fn test_missing_close_column() {
        let result = parse_closes("datetime,open\n2024-01-02,1\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let csv = "date,close\n2024-01-02,10\n2024-01-02,11\n";
        assert!(parse_closes(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2024-01-02 09:30:00").is_some());
        assert!(parse_timestamp("2024-01-02T09:30:00").is_some());
        assert!(parse_timestamp("2024-01-02").is_some());
        assert!(parse_timestamp("02/01/2024").is_none());
    }
}
