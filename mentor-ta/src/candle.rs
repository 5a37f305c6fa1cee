use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Normalised OHLCV candle supplied by the external feed.
///
/// Candles are immutable once created and arrive in strictly non-decreasing
/// `time` order; the analysis functions only ever read trailing windows.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Constructor, Deserialize, Serialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute open-to-close distance.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-to-low distance.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Distance from the body top to the high.
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Distance from the body bottom to the low.
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// (high + low + close) / 3, used for VWAP.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{base_time, candle};

    #[test]
    fn test_candle_body_and_shadows() {
        // Bullish candle: open 10, close 12, high 13, low 9.
        let c = candle(base_time(), 10.0, 13.0, 9.0, 12.0, 100.0);

        assert!(c.is_bullish());
        assert!(!c.is_bearish());
        assert_eq!(c.body(), 2.0);
        assert_eq!(c.range(), 4.0);
        assert_eq!(c.upper_shadow(), 1.0);
        assert_eq!(c.lower_shadow(), 1.0);
    }

    #[test]
    fn test_candle_typical_price() {
        let c = candle(base_time(), 10.0, 12.0, 8.0, 10.0, 100.0);
        assert_eq!(c.typical_price(), 10.0);
    }
}
