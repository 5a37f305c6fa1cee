//! Market-structure detectors: order blocks, fair value gaps, Wyckoff
//! springs/upthrusts, structure breaks, character changes and liquidity
//! sweeps.
//!
//! Every detector is independent and examines only a trailing sub-window of
//! the supplied candles. Callers guarantee the bundle-level minimum window;
//! each function still guards its own sub-window so it degrades to `None`
//! rather than panicking on short input.

use super::Direction;
use crate::candle::Candle;
use serde::{Deserialize, Serialize};

pub const ORDER_BLOCK_RANGE_RATIO: f64 = 1.5;
pub const ORDER_BLOCK_VOLUME_RATIO: f64 = 1.2;
pub const STRUCTURE_LOOKBACK: usize = 10;
pub const STRUCTURE_BREAK_PCT: f64 = 0.01;
pub const WYCKOFF_LOOKBACK: usize = 20;
pub const SWEEP_LOOKBACK: usize = 10;
pub const MOMENTUM_WINDOW: usize = 20;

/// Institutional order block: the last candle reverses through the body of a
/// larger, higher-volume prior candle.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct OrderBlock {
    pub direction: Direction,
    /// Low of the prior candle for bullish blocks, high for bearish.
    pub price: f64,
}

/// Three-candle imbalance: the newest candle's wick never overlaps the
/// oldest candle's wick, leaving an unfilled gap.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct FairValueGap {
    pub direction: Direction,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum WyckoffKind {
    Spring,
    Upthrust,
}

/// Wyckoff spring (sweep below support, close back above, elevated volume)
/// or its mirror upthrust above resistance.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct WyckoffEvent {
    pub kind: WyckoffKind,
    /// The swept support (spring) or resistance (upthrust) level.
    pub level: f64,
}

/// Close breaking the high/low of [`STRUCTURE_LOOKBACK`] candles ago by more
/// than [`STRUCTURE_BREAK_PCT`].
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct StructureBreak {
    pub direction: Direction,
    pub broken_level: f64,
}

/// Momentum sign flip between the halves of the trailing
/// [`MOMENTUM_WINDOW`] candles.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct CharacterChange {
    pub direction: Direction,
}

/// Wick beyond the recent extreme with the close back inside the range.
/// Sweeping the lows is read as bullish (stop hunt before markup), and
/// sweeping the highs as bearish.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct LiquiditySweep {
    pub direction: Direction,
    pub swept_level: f64,
}

/// Trailing support/resistance extremes, excluding the current candle.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Deserialize, Serialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Min low / max high of the `lookback` candles preceding the current one.
pub fn support_resistance(candles: &[Candle], lookback: usize) -> SupportResistance {
    let Some((_, history)) = candles.split_last() else {
        return SupportResistance::default();
    };
    let window = &history[history.len().saturating_sub(lookback)..];
    if window.is_empty() {
        return SupportResistance::default();
    }

    SupportResistance {
        support: window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
        resistance: window
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Detect an order block from the last two candles.
///
/// A bullish block requires the prior candle to be bullish, at least 1.5x the
/// current candle's range, at least 1.2x its volume, and the current close to
/// fall below the prior low. Bearish is the exact mirror.
pub fn detect_order_block(candles: &[Candle]) -> Option<OrderBlock> {
    let [.., prior, current] = candles else {
        return None;
    };

    let size_qualifies = prior.range() >= ORDER_BLOCK_RANGE_RATIO * current.range()
        && prior.volume >= ORDER_BLOCK_VOLUME_RATIO * current.volume;
    if !size_qualifies {
        return None;
    }

    if prior.is_bullish() && current.close < prior.low {
        Some(OrderBlock {
            direction: Direction::Bullish,
            price: prior.low,
        })
    } else if prior.is_bearish() && current.close > prior.high {
        Some(OrderBlock {
            direction: Direction::Bearish,
            price: prior.high,
        })
    } else {
        None
    }
}

/// Detect a fair value gap from the last three candles: bullish when the
/// newest low clears the oldest high, bearish when the newest high stays
/// below the oldest low.
pub fn detect_fair_value_gap(candles: &[Candle]) -> Option<FairValueGap> {
    let [.., first, _, third] = candles else {
        return None;
    };

    if third.low > first.high {
        Some(FairValueGap {
            direction: Direction::Bullish,
            upper: third.low,
            lower: first.high,
        })
    } else if third.high < first.low {
        Some(FairValueGap {
            direction: Direction::Bearish,
            upper: first.low,
            lower: third.high,
        })
    } else {
        None
    }
}

/// Detect a Wyckoff spring or upthrust on the current candle against the
/// trailing [`WYCKOFF_LOOKBACK`] support/resistance, confirmed by
/// above-average volume.
pub fn detect_wyckoff(candles: &[Candle]) -> Option<WyckoffEvent> {
    let (current, history) = candles.split_last()?;
    let window = &history[history.len().saturating_sub(WYCKOFF_LOOKBACK)..];
    if window.is_empty() {
        return None;
    }

    let levels = support_resistance(candles, WYCKOFF_LOOKBACK);
    let volume_sma = window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64;
    if current.volume <= volume_sma {
        return None;
    }

    if current.low < levels.support && current.close > levels.support {
        Some(WyckoffEvent {
            kind: WyckoffKind::Spring,
            level: levels.support,
        })
    } else if current.high > levels.resistance && current.close < levels.resistance {
        Some(WyckoffEvent {
            kind: WyckoffKind::Upthrust,
            level: levels.resistance,
        })
    } else {
        None
    }
}

/// Detect a break of structure: the latest close beats the high/low of
/// [`STRUCTURE_LOOKBACK`] candles ago by at least [`STRUCTURE_BREAK_PCT`].
pub fn detect_structure_break(candles: &[Candle]) -> Option<StructureBreak> {
    let current = candles.last()?;
    let reference = candles.get(candles.len().checked_sub(STRUCTURE_LOOKBACK + 1)?)?;

    if current.close > reference.high * (1.0 + STRUCTURE_BREAK_PCT) {
        Some(StructureBreak {
            direction: Direction::Bullish,
            broken_level: reference.high,
        })
    } else if current.close < reference.low * (1.0 - STRUCTURE_BREAK_PCT) {
        Some(StructureBreak {
            direction: Direction::Bearish,
            broken_level: reference.low,
        })
    } else {
        None
    }
}

/// Detect a change of character: net close-to-close momentum flips sign
/// between the first and second half of the trailing [`MOMENTUM_WINDOW`].
pub fn detect_character_change(candles: &[Candle]) -> Option<CharacterChange> {
    if candles.len() < MOMENTUM_WINDOW {
        return None;
    }

    let window = &candles[candles.len() - MOMENTUM_WINDOW..];
    let half = MOMENTUM_WINDOW / 2;
    let momentum = |slice: &[Candle]| slice[slice.len() - 1].close - slice[0].close;

    let first = momentum(&window[..half]);
    let second = momentum(&window[half..]);

    if first * second < 0.0 {
        Some(CharacterChange {
            direction: if second > 0.0 {
                Direction::Bullish
            } else {
                Direction::Bearish
            },
        })
    } else {
        None
    }
}

/// Detect a liquidity sweep: a wick beyond the trailing [`SWEEP_LOOKBACK`]
/// extreme with the close back inside.
pub fn detect_liquidity_sweep(candles: &[Candle]) -> Option<LiquiditySweep> {
    let (current, history) = candles.split_last()?;
    let window = &history[history.len().saturating_sub(SWEEP_LOOKBACK)..];
    if window.is_empty() {
        return None;
    }

    let extreme_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let extreme_high = window
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);

    if current.low < extreme_low && current.close > extreme_low {
        Some(LiquiditySweep {
            direction: Direction::Bullish,
            swept_level: extreme_low,
        })
    } else if current.high > extreme_high && current.close < extreme_high {
        Some(LiquiditySweep {
            direction: Direction::Bearish,
            swept_level: extreme_high,
        })
    } else {
        None
    }
}
