//! Data access port trait.

use crate::domain::error::WalkforwardError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, WalkforwardError>;

    fn list_symbols(&self) -> Result<Vec<String>, WalkforwardError>;

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, WalkforwardError>;
}
