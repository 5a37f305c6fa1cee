use crate::{candle::Candle, error::AnalysisError};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Minimum window length for a meaningful [`IndicatorBundle`].
pub const INDICATOR_MIN_CANDLES: usize = 200;

pub const EMA_FAST: usize = 9;
pub const EMA_MEDIUM: usize = 20;
pub const EMA_SLOW: usize = 50;
pub const EMA_VERY_SLOW: usize = 200;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;

pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;

pub const VOLUME_SMA_PERIOD: usize = 20;
pub const VOLUME_SPIKE_Z: f64 = 2.0;

/// MACD line, signal line and histogram.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Deserialize, Serialize)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Bollinger bands: SMA(20) +/- 2 standard deviations.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Deserialize, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Volume statistics over the supplied window.
///
/// The z-score compares the latest volume against the mean and standard
/// deviation of the entire window, not the trailing 20.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Deserialize, Serialize)]
pub struct VolumeProfile {
    pub sma: f64,
    pub z_score: f64,
    pub spike: bool,
}

/// Technical indicators computed from a trailing candle window.
///
/// Stateless: recomputed from scratch on every evaluation. All fields are
/// plain scalars so the bundle serializes to a flat persistence row.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Deserialize, Serialize)]
pub struct IndicatorBundle {
    pub ema_9: f64,
    pub ema_20: f64,
    pub ema_50: f64,
    pub ema_200: f64,
    pub macd: Macd,
    pub rsi: f64,
    pub atr: f64,
    /// Cumulative VWAP over the entire supplied window (no session reset).
    pub vwap: f64,
    pub adx: f64,
    pub bollinger: BollingerBands,
    pub volume: VolumeProfile,
}

impl IndicatorBundle {
    /// Compute all indicators over the supplied chronological window.
    ///
    /// Requires at least [`INDICATOR_MIN_CANDLES`] candles; shorter windows
    /// return [`AnalysisError::InsufficientData`] rather than a bundle of
    /// misleading defaults.
    pub fn compute(candles: &[Candle]) -> Result<Self, AnalysisError> {
        if candles.len() < INDICATOR_MIN_CANDLES {
            return Err(AnalysisError::InsufficientData {
                required: INDICATOR_MIN_CANDLES,
                actual: candles.len(),
            });
        }

        let closes = candles.iter().map(|c| c.close).collect::<Vec<_>>();
        let volumes = candles.iter().map(|c| c.volume).collect::<Vec<_>>();
        let atr = average_true_range(candles, ATR_PERIOD);

        Ok(Self {
            ema_9: ema(&closes, EMA_FAST),
            ema_20: ema(&closes, EMA_MEDIUM),
            ema_50: ema(&closes, EMA_SLOW),
            ema_200: ema(&closes, EMA_VERY_SLOW),
            macd: macd(&closes),
            rsi: rsi(&closes, RSI_PERIOD),
            atr,
            vwap: vwap(candles),
            adx: adx(candles, atr),
            bollinger: bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV),
            volume: volume_profile(&volumes),
        })
    }
}

/// Exponential moving average of the full series.
///
/// Seeded with the simple average of the first `period` values, then the
/// standard recurrence `ema = (value - ema) * k + ema` with
/// `k = 2 / (period + 1)`. Fewer than `period` values degrades to the last
/// value (documented fallback, not an error).
pub fn ema(values: &[f64], period: usize) -> f64 {
    match values {
        [] => 0.0,
        [.., last] if values.len() < period || period == 0 => *last,
        _ => {
            let k = 2.0 / (period as f64 + 1.0);
            let seed = values[..period].iter().sum::<f64>() / period as f64;
            values[period..]
                .iter()
                .fold(seed, |ema, value| (value - ema) * k + ema)
        }
    }
}

/// MACD over the close series: line = EMA(12) - EMA(26), signal = EMA(9) of
/// the MACD line evaluated at every trailing point back to the earliest full
/// 26-period window.
///
/// Built in a single pass: a running EMA seeded with the SMA of its first
/// `period` values takes exactly the same value at index `i` as a from-scratch
/// recomputation over `values[..=i]`, so the incremental series is numerically
/// identical to the reference per-prefix recomputation.
pub fn macd(closes: &[f64]) -> Macd {
    if closes.len() < MACD_SLOW + MACD_SIGNAL {
        return Macd::default();
    }

    let k_fast = 2.0 / (MACD_FAST as f64 + 1.0);
    let k_slow = 2.0 / (MACD_SLOW as f64 + 1.0);

    let mut fast = closes[..MACD_FAST].iter().sum::<f64>() / MACD_FAST as f64;
    for close in &closes[MACD_FAST..MACD_SLOW] {
        fast = (close - fast) * k_fast + fast;
    }
    let mut slow = closes[..MACD_SLOW].iter().sum::<f64>() / MACD_SLOW as f64;

    let mut line_series = Vec::with_capacity(closes.len() - MACD_SLOW + 1);
    line_series.push(fast - slow);
    for close in &closes[MACD_SLOW..] {
        fast = (close - fast) * k_fast + fast;
        slow = (close - slow) * k_slow + slow;
        line_series.push(fast - slow);
    }

    let line = *line_series.last().expect("series is non-empty");
    let signal = ema(&line_series, MACD_SIGNAL);

    Macd {
        line,
        signal,
        histogram: line - signal,
    }
}

/// RSI with a simple (non-Wilder) average of gains and losses over exactly
/// the trailing `period` diffs.
///
/// The downstream 30/70 thresholds are tuned against this simple-average
/// form; do not substitute Wilder smoothing. Zero average loss yields 100.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 || period == 0 {
        return 50.0;
    }

    let diffs = closes[closes.len() - period - 1..]
        .iter()
        .tuple_windows()
        .map(|(prev, next)| next - prev)
        .collect::<Vec<_>>();

    let avg_gain = diffs.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss = -diffs.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Mean true range over the trailing `period` bars, where
/// `tr = max(high - low, |high - prev_close|, |low - prev_close|)`.
pub fn average_true_range(candles: &[Candle], period: usize) -> f64 {
    match candles {
        [] => 0.0,
        [only] => only.range(),
        _ => {
            let tail_start = candles.len().saturating_sub(period + 1);
            let ranges = candles[tail_start..]
                .iter()
                .tuple_windows()
                .map(|(prev, cur)| {
                    (cur.high - cur.low)
                        .max((cur.high - prev.close).abs())
                        .max((cur.low - prev.close).abs())
                })
                .collect::<Vec<_>>();
            ranges.iter().sum::<f64>() / ranges.len() as f64
        }
    }
}

/// Cumulative volume-weighted average price over the entire window.
///
/// Zero total volume degrades to the last close.
pub fn vwap(candles: &[Candle]) -> f64 {
    let total_volume = candles.iter().map(|c| c.volume).sum::<f64>();
    match candles.last() {
        None => 0.0,
        Some(last) if total_volume == 0.0 => last.close,
        Some(_) => {
            candles
                .iter()
                .map(|c| c.typical_price() * c.volume)
                .sum::<f64>()
                / total_volume
        }
    }
}

/// Simplified ADX: sums of positive and negative directional moves over the
/// whole window, normalised by candle count and ATR, scaled to `[0, 100]`.
///
/// This is deliberately not the textbook smoothed DI/DX/ADX recursion; the
/// scorer's `> 25` trend threshold is calibrated against this form.
pub fn adx(candles: &[Candle], atr: f64) -> f64 {
    if candles.len() < 2 || atr == 0.0 {
        return 0.0;
    }

    let (plus, minus) = candles.iter().tuple_windows().fold(
        (0.0_f64, 0.0_f64),
        |(plus, minus), (prev, cur)| {
            let up = cur.high - prev.high;
            let down = prev.low - cur.low;
            match (up > down && up > 0.0, down > up && down > 0.0) {
                (true, _) => (plus + up, minus),
                (_, true) => (plus, minus + down),
                _ => (plus, minus),
            }
        },
    );

    (((plus - minus).abs() / candles.len() as f64 / atr) * 100.0).min(100.0)
}

/// SMA of the trailing `period` closes +/- `std_devs` population standard
/// deviations. Shorter windows use every available close.
pub fn bollinger_bands(closes: &[f64], period: usize, std_devs: f64) -> BollingerBands {
    if closes.is_empty() {
        return BollingerBands::default();
    }

    let tail = &closes[closes.len().saturating_sub(period)..];
    let middle = tail.iter().sum::<f64>() / tail.len() as f64;
    let variance = tail.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / tail.len() as f64;
    let offset = std_devs * variance.sqrt();

    BollingerBands {
        upper: middle + offset,
        middle,
        lower: middle - offset,
    }
}

/// Volume SMA(20) plus a z-score of the latest volume against the mean and
/// standard deviation of the entire volume series. Zero deviation yields a
/// zero z-score; spike flags `z > 2`.
pub fn volume_profile(volumes: &[f64]) -> VolumeProfile {
    let Some(latest) = volumes.last() else {
        return VolumeProfile::default();
    };

    let tail = &volumes[volumes.len().saturating_sub(VOLUME_SMA_PERIOD)..];
    let sma = tail.iter().sum::<f64>() / tail.len() as f64;

    let mean = volumes.iter().sum::<f64>() / volumes.len() as f64;
    let variance = volumes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / volumes.len() as f64;
    let std_dev = variance.sqrt();

    let z_score = if std_dev == 0.0 {
        0.0
    } else {
        (latest - mean) / std_dev
    };

    VolumeProfile {
        sma,
        z_score,
        spike: z_score > VOLUME_SPIKE_Z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{flat_candles, geometric_candles, linear_candles};
    use approx::assert_relative_eq;

    #[test]
    fn test_bundle_rejects_short_window() {
        let candles = flat_candles(199, 100.0);
        assert_eq!(
            IndicatorBundle::compute(&candles),
            Err(AnalysisError::InsufficientData {
                required: 200,
                actual: 199
            })
        );
    }

    #[test]
    fn test_ema_converges_on_constant_series() {
        let values = vec![42.0; 250];
        assert_relative_eq!(ema(&values, 9), 42.0);
        assert_relative_eq!(ema(&values, 200), 42.0);
    }

    #[test]
    fn test_ema_short_series_degrades_to_last_value() {
        let values = vec![1.0, 2.0, 3.0];
        assert_relative_eq!(ema(&values, 9), 3.0);
    }

    #[test]
    fn test_rsi_extremes() {
        let increasing = (0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>();
        assert_relative_eq!(rsi(&increasing, RSI_PERIOD), 100.0);

        let decreasing = (0..30).map(|i| 100.0 - i as f64).collect::<Vec<_>>();
        assert_relative_eq!(rsi(&decreasing, RSI_PERIOD), 0.0);
    }

    #[test]
    fn test_rsi_balanced_series_is_midrange() {
        // Alternating +1/-1 diffs: equal average gain and loss.
        let closes = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect::<Vec<_>>();
        assert_relative_eq!(rsi(&closes, RSI_PERIOD), 50.0);
    }

    #[test]
    fn test_vwap_flat_series_equals_price() {
        let candles = flat_candles(220, 100.0);
        assert_relative_eq!(vwap(&candles), 100.0, epsilon = 0.1);
    }

    #[test]
    fn test_vwap_zero_volume_degrades_to_close() {
        let mut candles = flat_candles(10, 100.0);
        for c in &mut candles {
            c.volume = 0.0;
        }
        assert_relative_eq!(vwap(&candles), 100.0);
    }

    #[test]
    fn test_bollinger_flat_series_collapses_bands() {
        let closes = vec![50.0; 40];
        let bands = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);
        assert_relative_eq!(bands.upper, 50.0);
        assert_relative_eq!(bands.middle, 50.0);
        assert_relative_eq!(bands.lower, 50.0);
    }

    #[test]
    fn test_volume_spike_flag() {
        let mut volumes = vec![100.0; 220];
        *volumes.last_mut().unwrap() = 1_000.0;
        let profile = volume_profile(&volumes);
        assert!(profile.spike);
        assert!(profile.z_score > VOLUME_SPIKE_Z);

        let constant = volume_profile(&vec![100.0; 220]);
        assert!(!constant.spike);
        assert_relative_eq!(constant.z_score, 0.0);
    }

    #[test]
    fn test_macd_histogram_positive_in_accelerating_uptrend() {
        let candles = geometric_candles(220, 100.0, 1.01);
        let closes = candles.iter().map(|c| c.close).collect::<Vec<_>>();
        let macd = macd(&closes);
        assert!(macd.line > 0.0);
        assert!(macd.histogram > 0.0);
        assert_relative_eq!(macd.histogram, macd.line - macd.signal);
    }

    #[test]
    fn test_bundle_ema_stack_orders_with_trend() {
        let candles = linear_candles(220, 100.0, 0.5);
        let bundle = IndicatorBundle::compute(&candles).unwrap();
        assert!(bundle.ema_9 > bundle.ema_20);
        assert!(bundle.ema_20 > bundle.ema_50);
        assert!(bundle.ema_50 > bundle.ema_200);
        assert_relative_eq!(bundle.rsi, 100.0);
    }

    #[test]
    fn test_atr_flat_series_matches_range() {
        let candles = flat_candles(220, 100.0);
        // Every true range is the constant high-low distance.
        assert_relative_eq!(
            average_true_range(&candles, ATR_PERIOD),
            100.0 * 1.001 - 100.0 * 0.999,
            epsilon = 1e-9
        );
    }
}
