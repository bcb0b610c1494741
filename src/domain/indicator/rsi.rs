//! Relative strength index with Wilder smoothing.
//!
//! The first `period` bars are warmup: index 0 has no prior close, and the
//! seed average needs `period` price changes. When the smoothed average loss
//! reaches zero the RSI saturates at 100.

use crate::domain::ohlcv::PriceBar;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    if period == 0 || bars.len() < 2 {
        return vec![None; bars.len()];
    }

    let mut values = vec![None; bars.len()];
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let change_idx = i - 1;

        if change_idx < period {
            // Seed phase: plain average of the first `period` changes.
            avg_gain += gain / period as f64;
            avg_loss += loss / period as f64;
        } else {
            avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
            avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        }

        if change_idx + 1 >= period {
            let rsi = if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            };
            values[i] = Some(rsi);
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn rsi_zero_period() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        assert_eq!(calculate_rsi(&bars, 0), vec![None, None, None]);
    }

    #[test]
    fn rsi_too_few_bars() {
        let bars = bars_from_closes(&[10.0]);
        assert_eq!(calculate_rsi(&bars, 14), vec![None]);
    }

    #[test]
    fn rsi_warmup_length() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 11.0, 13.0, 14.0]);
        let values = calculate_rsi(&bars, 3);

        // Index 0 has no change, indexes 1..=2 are seed changes.
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_eq!(values[2], None);
        assert!(values[3].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn rsi_all_gains_saturates_at_100() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let values = calculate_rsi(&bars, 3);
        for v in values.iter().flatten() {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn rsi_all_losses_near_zero() {
        let bars = bars_from_closes(&[15.0, 14.0, 13.0, 12.0, 11.0, 10.0]);
        let values = calculate_rsi(&bars, 3);
        for v in values.iter().flatten() {
            assert!(*v < 1e-9);
        }
    }

    #[test]
    fn rsi_bounded_between_0_and_100() {
        let bars = bars_from_closes(&[
            44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9, 46.0, 45.6, 46.2,
            46.3, 46.0,
        ]);
        let values = calculate_rsi(&bars, 14);
        for v in values.iter().flatten() {
            assert!(*v >= 0.0 && *v <= 100.0);
        }
        assert!(values[14].is_some());
        assert!(values[15].is_some());
    }

    #[test]
    fn rsi_mixed_moves_in_middle_band() {
        let bars = bars_from_closes(&[10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0]);
        let values = calculate_rsi(&bars, 3);
        let last = values.last().unwrap().unwrap();
        assert!(last > 0.0 && last < 100.0);
    }
}
