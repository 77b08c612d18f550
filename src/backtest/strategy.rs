//! Trading strategies
//!
//! A strategy is a pure function of the bar history up to an index:
//! +1 to be long, -1 to be flat, 0 to hold whatever the book already
//! holds. Indicators are recomputed from the slice each call; at daily
//! bar counts this stays trivially cheap and keeps strategies stateless.

use clap::ValueEnum;

use crate::backtest::data::Bar;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Directional vote at bar `idx`: 1 enter, -1 exit, 0 hold.
    fn signal(&self, bars: &[Bar], idx: usize) -> i8;
}

/// Strategy selector for the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    MaCross,
    Rsi,
    Bollinger,
    Macd,
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategyKind::MaCross => Box::new(MovingAverageCrossover::new(10, 30)),
            StrategyKind::Rsi => Box::new(RsiThreshold::new(14, 30.0, 70.0)),
            StrategyKind::Bollinger => Box::new(BollingerBreakout::new(20, 2.0)),
            StrategyKind::Macd => Box::new(MacdCrossover::new(12, 26, 9)),
        }
    }
}

fn sma(bars: &[Bar], end: usize, period: usize) -> Option<f64> {
    if end + 1 < period {
        return None;
    }
    let window = &bars[end + 1 - period..=end];
    Some(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
}

fn ema_series(closes: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(closes.len());
    let mut prev = closes.first().copied().unwrap_or(0.0);
    for &close in closes {
        prev = close * k + prev * (1.0 - k);
        out.push(prev);
    }
    out
}

/// Fast/slow simple moving average crossover
pub struct MovingAverageCrossover {
    fast: usize,
    slow: usize,
}

impl MovingAverageCrossover {
    pub fn new(fast: usize, slow: usize) -> Self {
        Self { fast, slow }
    }
}

impl Strategy for MovingAverageCrossover {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn signal(&self, bars: &[Bar], idx: usize) -> i8 {
        if idx == 0 {
            return 0;
        }
        let (Some(fast_now), Some(slow_now), Some(fast_prev), Some(slow_prev)) = (
            sma(bars, idx, self.fast),
            sma(bars, idx, self.slow),
            sma(bars, idx - 1, self.fast),
            sma(bars, idx - 1, self.slow),
        ) else {
            return 0;
        };

        if fast_prev <= slow_prev && fast_now > slow_now {
            1
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            -1
        } else {
            0
        }
    }
}

/// Wilder RSI with oversold entry and overbought exit
pub struct RsiThreshold {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiThreshold {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Self {
        Self {
            period,
            oversold,
            overbought,
        }
    }

    fn rsi(&self, bars: &[Bar], end: usize) -> Option<f64> {
        if end < self.period {
            return None;
        }
        let mut gains = 0.0;
        let mut losses = 0.0;
        for i in end + 1 - self.period..=end {
            let delta = bars[i].close - bars[i - 1].close;
            if delta >= 0.0 {
                gains += delta;
            } else {
                losses -= delta;
            }
        }
        if losses == 0.0 {
            return Some(100.0);
        }
        let rs = gains / losses;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        "rsi"
    }

    fn signal(&self, bars: &[Bar], idx: usize) -> i8 {
        match self.rsi(bars, idx) {
            Some(rsi) if rsi < self.oversold => 1,
            Some(rsi) if rsi > self.overbought => -1,
            _ => 0,
        }
    }
}

/// Close breaking out of a Bollinger band: below the lower band is an
/// entry, above the upper band an exit
pub struct BollingerBreakout {
    period: usize,
    width: f64,
}

impl BollingerBreakout {
    pub fn new(period: usize, width: f64) -> Self {
        Self { period, width }
    }
}

impl Strategy for BollingerBreakout {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn signal(&self, bars: &[Bar], idx: usize) -> i8 {
        let Some(mean) = sma(bars, idx, self.period) else {
            return 0;
        };
        let window = &bars[idx + 1 - self.period..=idx];
        let variance = window
            .iter()
            .map(|b| (b.close - mean).powi(2))
            .sum::<f64>()
            / self.period as f64;
        let band = self.width * variance.sqrt();
        let close = bars[idx].close;

        if close < mean - band {
            1
        } else if close > mean + band {
            -1
        } else {
            0
        }
    }
}

/// MACD line crossing its signal line
pub struct MacdCrossover {
    fast: usize,
    slow: usize,
    signal_period: usize,
}

impl MacdCrossover {
    pub fn new(fast: usize, slow: usize, signal_period: usize) -> Self {
        Self {
            fast,
            slow,
            signal_period,
        }
    }
}

impl Strategy for MacdCrossover {
    fn name(&self) -> &str {
        "macd"
    }

    fn signal(&self, bars: &[Bar], idx: usize) -> i8 {
        if idx + 1 < self.slow + self.signal_period || idx == 0 {
            return 0;
        }
        let closes: Vec<f64> = bars[..=idx].iter().map(|b| b.close).collect();
        let fast = ema_series(&closes, self.fast);
        let slow = ema_series(&closes, self.slow);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_series(&macd, self.signal_period);

        let now = macd[idx] - signal[idx];
        let prev = macd[idx - 1] - signal[idx - 1];

        if prev <= 0.0 && now > 0.0 {
            1
        } else if prev >= 0.0 && now < 0.0 {
            -1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    #[test]
    fn test_ma_cross_fires_on_crossover() {
        // Flat then a sharp ramp: the 2-bar mean overtakes the 4-bar mean
        let bars = bars_from_closes(&[100.0, 100.0, 100.0, 100.0, 100.0, 120.0, 140.0]);
        let strategy = MovingAverageCrossover::new(2, 4);

        assert_eq!(strategy.signal(&bars, 4), 0);
        assert_eq!(strategy.signal(&bars, 5), 1);
    }

    #[test]
    fn test_ma_cross_warmup_holds() {
        let bars = bars_from_closes(&[100.0, 101.0]);
        let strategy = MovingAverageCrossover::new(2, 4);
        assert_eq!(strategy.signal(&bars, 1), 0);
    }

    #[test]
    fn test_rsi_extremes() {
        // Monotonic decline: RSI 0, deep oversold
        let down = bars_from_closes(&[100.0, 98.0, 96.0, 94.0, 92.0, 90.0]);
        let strategy = RsiThreshold::new(4, 30.0, 70.0);
        assert_eq!(strategy.signal(&down, 5), 1);

        // Monotonic climb: RSI 100, overbought
        let up = bars_from_closes(&[100.0, 102.0, 104.0, 106.0, 108.0, 110.0]);
        assert_eq!(strategy.signal(&up, 5), -1);
    }

    #[test]
    fn test_bollinger_breakout_directions() {
        let strategy = BollingerBreakout::new(4, 1.0);

        let mut closes = vec![100.0, 100.5, 99.5, 100.0];
        closes.push(90.0); // collapse through the lower band
        let bars = bars_from_closes(&closes);
        assert_eq!(strategy.signal(&bars, 4), 1);

        let mut closes = vec![100.0, 100.5, 99.5, 100.0];
        closes.push(110.0); // spike through the upper band
        let bars = bars_from_closes(&closes);
        assert_eq!(strategy.signal(&bars, 4), -1);
    }

    #[test]
    fn test_macd_holds_during_warmup() {
        let bars = bars_from_closes(&[100.0; 20]);
        let strategy = MacdCrossover::new(12, 26, 9);
        for idx in 0..bars.len() {
            assert_eq!(strategy.signal(&bars, idx), 0);
        }
    }

    #[test]
    fn test_strategy_kind_builds_named_strategy() {
        assert_eq!(StrategyKind::MaCross.build().name(), "ma_cross");
        assert_eq!(StrategyKind::Rsi.build().name(), "rsi");
        assert_eq!(StrategyKind::Bollinger.build().name(), "bollinger");
        assert_eq!(StrategyKind::Macd.build().name(), "macd");
    }
}
