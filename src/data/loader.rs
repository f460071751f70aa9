use crate::data::bar::{validate_series, Bar};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

//parses rfc3339 or integer epoch milliseconds
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(millis) = raw.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .with_context(|| format!("Epoch milliseconds out of range: {}", millis));
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Failed to parse timestamp '{}'", raw))?;
    Ok(parsed.with_timezone(&Utc))
}

//loads bars from a csv file
//rows are sorted chronologically, then the whole series is validated
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;

        let timestamp = parse_timestamp(&record.timestamp)
            .context(format!("Bad timestamp at line {}", index + 2))?;

        let bar = Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        )
        .context(format!("Invalid bar at line {}", index + 2))?;

        bars.push(bar);
    }

    //sort by timestamp to ensure chronological order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    validate_series(&bars).context(format!("Invalid price series in {:?}", path))?;

    tracing::debug!(path = %path.display(), bars = bars.len(), "loaded price series");

    Ok(bars)
}
