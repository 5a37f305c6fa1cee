//! Chart-pattern detection over a trailing candle window.
//!
//! Each sub-detector is independent and order-insensitive; the bundle keeps
//! every detection because the signal scorer consumes all of them. Only the
//! primary pattern (the one surfaced to the user) is chosen by a fixed
//! priority order, first match wins.

pub mod candlestick;
pub mod geometry;
pub mod structure;

use crate::{candle::Candle, error::AnalysisError};
use candlestick::{CandlePattern, CandlePatternKind, Strength};
use derive_more::Display;
use geometry::{ElliottKind, ElliottWave, Flag, Triangle, TriangleKind, Wedge};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use structure::{
    CharacterChange, FairValueGap, LiquiditySweep, OrderBlock, StructureBreak, SupportResistance,
    WyckoffEvent, WyckoffKind,
};

/// Minimum window length for a meaningful [`PatternBundle`].
pub const PATTERN_MIN_CANDLES: usize = 50;

/// Direction a detection points in.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum Direction {
    #[display("bullish")]
    Bullish,
    #[display("bearish")]
    Bearish,
}

/// The single pattern surfaced to the user, chosen by priority.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct PrimaryPattern {
    pub name: SmolStr,
    pub message: String,
}

impl PrimaryPattern {
    fn new(name: &str, message: String) -> Self {
        Self {
            name: SmolStr::new(name),
            message,
        }
    }
}

/// Every pattern detection over the supplied window, plus the selected
/// primary pattern.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct PatternBundle {
    pub support_resistance: SupportResistance,
    pub order_block: Option<OrderBlock>,
    pub fair_value_gap: Option<FairValueGap>,
    pub wyckoff: Option<WyckoffEvent>,
    pub structure_break: Option<StructureBreak>,
    pub character_change: Option<CharacterChange>,
    pub liquidity_sweep: Option<LiquiditySweep>,
    pub triangle: Option<Triangle>,
    pub flag: Option<Flag>,
    pub wedge: Option<Wedge>,
    pub elliott: Option<ElliottWave>,
    pub candle: Option<CandlePattern>,
    pub primary: Option<PrimaryPattern>,
}

impl PatternBundle {
    /// Run every detector over the supplied chronological window.
    ///
    /// Requires at least [`PATTERN_MIN_CANDLES`] candles; shorter windows
    /// return [`AnalysisError::InsufficientData`] rather than a bundle of
    /// false negatives.
    pub fn detect(candles: &[Candle]) -> Result<Self, AnalysisError> {
        if candles.len() < PATTERN_MIN_CANDLES {
            return Err(AnalysisError::InsufficientData {
                required: PATTERN_MIN_CANDLES,
                actual: candles.len(),
            });
        }

        let mut bundle = Self {
            support_resistance: structure::support_resistance(candles, structure::WYCKOFF_LOOKBACK),
            order_block: structure::detect_order_block(candles),
            fair_value_gap: structure::detect_fair_value_gap(candles),
            wyckoff: structure::detect_wyckoff(candles),
            structure_break: structure::detect_structure_break(candles),
            character_change: structure::detect_character_change(candles),
            liquidity_sweep: structure::detect_liquidity_sweep(candles),
            triangle: geometry::detect_triangle(candles),
            flag: geometry::detect_flag(candles),
            wedge: geometry::detect_wedge(candles),
            elliott: geometry::detect_elliott(candles),
            candle: candlestick::detect_candle_pattern(candles),
            primary: None,
        };
        bundle.primary = bundle.select_primary();
        Ok(bundle)
    }

    /// Indecision context used by the scorer's consolidation test.
    pub fn indecision_candle(&self) -> bool {
        matches!(
            self.candle.map(|c| c.kind),
            Some(CandlePatternKind::Doji | CandlePatternKind::InsideBar)
        )
    }

    /// Fixed priority order, first match wins. Geometric patterns outrank
    /// Wyckoff and smart-money detections, which outrank raw structure
    /// shifts.
    fn select_primary(&self) -> Option<PrimaryPattern> {
        if let Some(triangle) = &self.triangle {
            return Some(primary_triangle(triangle));
        }
        if let Some(flag) = &self.flag {
            return Some(primary_flag(flag));
        }
        if let Some(wedge) = &self.wedge {
            return Some(primary_wedge(wedge));
        }
        if let Some(elliott) = &self.elliott {
            return Some(primary_elliott(elliott));
        }
        if let Some(candle) = self.candle.filter(|c| c.strength == Strength::Strong) {
            return Some(primary_candle(&candle));
        }
        if let Some(wyckoff) = &self.wyckoff {
            return Some(primary_wyckoff(wyckoff));
        }
        match (&self.order_block, &self.fair_value_gap) {
            (Some(block), Some(gap)) => {
                return Some(PrimaryPattern::new(
                    "Order Block + FVG",
                    format!(
                        "{} order block at {:.2} confluent with a {} fair value gap ({:.2}-{:.2})",
                        block.direction, block.price, gap.direction, gap.lower, gap.upper
                    ),
                ));
            }
            (Some(block), None) => {
                return Some(PrimaryPattern::new(
                    "Order Block",
                    format!("{} order block at {:.2}", block.direction, block.price),
                ));
            }
            (None, Some(gap)) => {
                return Some(PrimaryPattern::new(
                    "Fair Value Gap",
                    format!(
                        "{} fair value gap between {:.2} and {:.2}",
                        gap.direction, gap.lower, gap.upper
                    ),
                ));
            }
            (None, None) => {}
        }
        if let Some(bos) = &self.structure_break {
            return Some(PrimaryPattern::new(
                "Break of Structure",
                format!("{} break of structure through {:.2}", bos.direction, bos.broken_level),
            ));
        }
        if let Some(choch) = &self.character_change {
            return Some(PrimaryPattern::new(
                "Change of Character",
                format!("momentum flipped {}", choch.direction),
            ));
        }
        if let Some(sweep) = &self.liquidity_sweep {
            return Some(PrimaryPattern::new(
                "Liquidity Sweep",
                format!("{} liquidity sweep of {:.2}", sweep.direction, sweep.swept_level),
            ));
        }
        None
    }
}

fn primary_triangle(triangle: &Triangle) -> PrimaryPattern {
    let name = match triangle.kind {
        TriangleKind::Ascending => "Ascending Triangle",
        TriangleKind::Descending => "Descending Triangle",
        TriangleKind::Symmetric => "Symmetric Triangle",
    };
    PrimaryPattern::new(
        name,
        format!(
            "converging in ~{:.0} candles toward {:.2}",
            triangle.convergence_in, triangle.apex_price
        ),
    )
}

fn primary_flag(flag: &Flag) -> PrimaryPattern {
    let name = match flag.direction {
        Direction::Bullish => "Bull Flag",
        Direction::Bearish => "Bear Flag",
    };
    PrimaryPattern::new(
        name,
        format!(
            "pole of {:.2} projects a measured move to {:.2}",
            flag.pole_height, flag.target
        ),
    )
}

fn primary_wedge(wedge: &Wedge) -> PrimaryPattern {
    // A wedge breaks against its own slope, so a bearish breakout means a
    // rising wedge.
    let name = match wedge.direction {
        Direction::Bearish => "Rising Wedge",
        Direction::Bullish => "Falling Wedge",
    };
    PrimaryPattern::new(
        name,
        format!(
            "{} breakout expected, apex in ~{:.0} candles",
            wedge.direction, wedge.convergence_in
        ),
    )
}

fn primary_elliott(elliott: &ElliottWave) -> PrimaryPattern {
    match elliott.kind {
        ElliottKind::Impulsive => PrimaryPattern::new(
            "Elliott Impulse",
            format!(
                "{} five-wave impulse{}, wave-5 projection {:.2}",
                elliott.direction,
                if elliott.wave_three_extended {
                    " with extended third wave"
                } else {
                    ""
                },
                elliott.projection
            ),
        ),
        ElliottKind::Corrective => PrimaryPattern::new(
            "Elliott Correction",
            format!(
                "{} A-B-C correction, wave-C projection {:.2}",
                elliott.direction, elliott.projection
            ),
        ),
    }
}

fn primary_candle(candle: &CandlePattern) -> PrimaryPattern {
    let direction = candle
        .direction
        .map(|d| format!("{d} "))
        .unwrap_or_default();
    PrimaryPattern::new(
        candle.kind.name(),
        format!("strong {direction}candlestick reversal on the latest candles"),
    )
}

fn primary_wyckoff(wyckoff: &WyckoffEvent) -> PrimaryPattern {
    match wyckoff.kind {
        WyckoffKind::Spring => PrimaryPattern::new(
            "Wyckoff Spring",
            format!(
                "support {:.2} swept and reclaimed on elevated volume",
                wyckoff.level
            ),
        ),
        WyckoffKind::Upthrust => PrimaryPattern::new(
            "Wyckoff Upthrust",
            format!(
                "resistance {:.2} swept and rejected on elevated volume",
                wyckoff.level
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{base_time, candle, flat_candles, time_plus_minutes};

    fn at(minutes: i64) -> chrono::DateTime<chrono::Utc> {
        time_plus_minutes(base_time(), minutes)
    }

    #[test]
    fn test_detect_rejects_short_window() {
        let candles = flat_candles(49, 100.0);
        assert_eq!(
            PatternBundle::detect(&candles),
            Err(AnalysisError::InsufficientData {
                required: 50,
                actual: 49
            })
        );
    }

    #[test]
    fn test_engineered_hammer_becomes_primary() {
        let mut candles = flat_candles(60, 100.0);
        let n = candles.len();
        // Hammer closing below the prior candle's 99.9 low.
        candles[n - 1] = candle(at(59), 99.7, 99.8, 96.8, 99.8, 100.0);

        let bundle = PatternBundle::detect(&candles).unwrap();
        let pattern = bundle.candle.unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::Hammer);
        assert_eq!(pattern.direction, Some(Direction::Bullish));
        assert_eq!(pattern.strength, Strength::Strong);

        let primary = bundle.primary.unwrap();
        assert_eq!(primary.name, "Hammer");
    }

    #[test]
    fn test_spring_outranks_liquidity_sweep() {
        let mut candles = flat_candles(60, 100.0);
        let n = candles.len();
        // Sweeps support and reclaims it on double volume: both the spring
        // and the liquidity sweep detectors fire, the spring wins priority.
        candles[n - 1] = candle(at(59), 100.0, 100.2, 99.0, 100.1, 200.0);

        let bundle = PatternBundle::detect(&candles).unwrap();
        assert!(bundle.wyckoff.is_some());
        assert!(bundle.liquidity_sweep.is_some());
        assert_eq!(bundle.primary.unwrap().name, "Wyckoff Spring");
    }

    #[test]
    fn test_quiet_window_has_no_primary() {
        let candles = flat_candles(60, 100.0);
        let bundle = PatternBundle::detect(&candles).unwrap();

        // A flat candle classifies as a doji, which is too weak to claim
        // the primary slot.
        assert_eq!(bundle.candle.unwrap().kind, CandlePatternKind::Doji);
        assert_eq!(bundle.primary, None);
        assert!(bundle.indecision_candle());
    }

    #[test]
    fn test_support_resistance_levels() {
        let candles = flat_candles(60, 100.0);
        let bundle = PatternBundle::detect(&candles).unwrap();
        assert_eq!(bundle.support_resistance.support, 100.0 * 0.999);
        assert_eq!(bundle.support_resistance.resistance, 100.0 * 1.001);
    }
}
