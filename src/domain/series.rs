//! Per-instrument price series with aligned indicator columns.

use crate::domain::indicator::{self, IndicatorKind};
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;
use std::collections::HashMap;

/// An instrument's daily bars plus any computed indicator columns.
///
/// Every indicator column has exactly one entry per bar, `None` during
/// warmup. Slicing carries the columns along so downstream code never sees
/// a bar without its indicator row.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub indicators: HashMap<IndicatorKind, Vec<Option<f64>>>,
}

impl InstrumentSeries {
    /// Builds a series from bars, sorting them by date ascending.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        InstrumentSeries {
            symbol: symbol.into(),
            bars,
            indicators: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|bar| bar.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|bar| bar.date)
    }

    pub fn indicator(&self, kind: IndicatorKind) -> Option<&[Option<f64>]> {
        self.indicators.get(&kind).map(Vec::as_slice)
    }

    /// Returns a copy with the given indicator columns computed over the
    /// full bar range. Existing columns are kept; requested ones are
    /// recomputed so a sliced series never inherits stale values.
    pub fn with_indicators(&self, kinds: &[IndicatorKind]) -> Self {
        let mut series = self.clone();
        for &kind in kinds {
            let column = indicator::compute(kind, &series.bars);
            series.indicators.insert(kind, column);
        }
        series
    }

    /// Copies the bars (and aligned indicator rows) whose dates fall in the
    /// half-open range `[start, end)`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let from = self.bars.partition_point(|bar| bar.date < start);
        let to = self.bars.partition_point(|bar| bar.date < end);

        let indicators = self
            .indicators
            .iter()
            .map(|(&kind, column)| (kind, column[from..to].to_vec()))
            .collect();

        InstrumentSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[from..to].to_vec(),
            indicators,
        }
    }

    /// Drops leading rows where any indicator column is still `None`, so
    /// simulation only ever sees fully warmed-up data.
    pub fn drop_warmup(&self) -> Self {
        let first_ready = (0..self.bars.len())
            .find(|&i| self.indicators.values().all(|column| column[i].is_some()))
            .unwrap_or(self.bars.len());

        let indicators = self
            .indicators
            .iter()
            .map(|(&kind, column)| (kind, column[first_ready..].to_vec()))
            .collect();

        InstrumentSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[first_ready..].to_vec(),
            indicators,
        }
    }
}
