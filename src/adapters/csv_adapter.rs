//! CSV file data adapter.
//!
//! Expects one file per instrument, `<SYMBOL>.csv`, with a header row of
//! `date,open,high,low,close,volume`. Header names are checked before any
//! row is parsed so a malformed file is rejected as a whole.

use crate::domain::error::WalkforwardError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_all(&self, symbol: &str) -> Result<Vec<PriceBar>, WalkforwardError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| WalkforwardError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| WalkforwardError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let mut column_index = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            match headers.iter().position(|h| h.trim() == *name) {
                Some(i) => column_index[slot] = i,
                None => {
                    return Err(WalkforwardError::Schema {
                        symbol: symbol.to_string(),
                        field: name.to_string(),
                    })
                }
            }
        }

        let field = |record: &csv::StringRecord, slot: usize| -> Result<String, WalkforwardError> {
            record
                .get(column_index[slot])
                .map(str::to_string)
                .ok_or_else(|| WalkforwardError::Schema {
                    symbol: symbol.to_string(),
                    field: REQUIRED_COLUMNS[slot].to_string(),
                })
        };

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| WalkforwardError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date = NaiveDate::parse_from_str(&field(&record, 0)?, "%Y-%m-%d").map_err(
                |e| WalkforwardError::Data {
                    reason: format!("{}: invalid date: {}", symbol, e),
                },
            )?;

            let mut values = [0.0f64; 4];
            for (i, value) in values.iter_mut().enumerate() {
                *value = field(&record, i + 1)?.trim().parse().map_err(|e| {
                    WalkforwardError::Data {
                        reason: format!(
                            "{}: invalid {} value on {}: {}",
                            symbol,
                            REQUIRED_COLUMNS[i + 1],
                            date,
                            e
                        ),
                    }
                })?;
            }

            let volume: i64 = field(&record, 5)?.trim().parse().map_err(|e| {
                WalkforwardError::Data {
                    reason: format!("{}: invalid volume value on {}: {}", symbol, date, e),
                }
            })?;

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                date,
                open: values[0],
                high: values[1],
                low: values[2],
                close: values[3],
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, WalkforwardError> {
        let mut bars = self.read_all(symbol)?;
        bars.retain(|bar| bar.date >= start_date && bar.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, WalkforwardError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| WalkforwardError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WalkforwardError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, WalkforwardError> {
        let bars = self.read_all(symbol)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("AAPL.csv"), csv_content).unwrap();
        fs::write(
            path.join("MSFT.csv"),
            "date,open,high,low,close,volume\n",
        )
        .unwrap();
        fs::write(
            path.join("BROKEN.csv"),
            "date,open,high,low,volume\n2024-01-15,1,1,1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_parses_and_sorts() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let bars = adapter.fetch_bars("AAPL", start, end).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, start);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[2].date, end);
        assert_eq!(bars[2].close, 115.0);
        assert_eq!(bars[2].volume, 55000);
    }

    #[test]
    fn fetch_bars_filters_date_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let bars = adapter.fetch_bars("AAPL", start, end).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 110.0);
    }

    #[test]
    fn missing_header_column_is_schema_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let err = adapter.fetch_bars("BROKEN", start, end).unwrap_err();
        assert!(
            matches!(err, WalkforwardError::Schema { symbol, field } if symbol == "BROKEN" && field == "close")
        );
    }

    #[test]
    fn missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let err = adapter.fetch_bars("MISSING", start, end).unwrap_err();
        assert!(matches!(err, WalkforwardError::Data { .. }));
    }

    #[test]
    fn list_symbols_finds_csv_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(
            adapter.list_symbols().unwrap(),
            vec!["AAPL", "BROKEN", "MSFT"]
        );
    }

    #[test]
    fn data_range_reports_span_and_count() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let range = adapter.data_range("AAPL").unwrap().unwrap();
        assert_eq!(range.0, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(range.1, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(range.2, 3);

        assert!(adapter.data_range("MSFT").unwrap().is_none());
    }
}
