//! Composite signal scoring: one confidence score in `[0, 100]` plus a
//! discrete BUY/SELL/NEUTRAL direction, derived from the indicator and
//! pattern bundles.
//!
//! The two outputs are computed from separate tallies on purpose: the
//! confidence score measures how much evidence there is, the direction
//! tally measures which side it points. The decision rule is biased against
//! NEUTRAL so any genuine directional detection keeps the downstream
//! advisory loop active.

use crate::{
    indicator::IndicatorBundle,
    pattern::{
        Direction, PatternBundle,
        candlestick::Strength,
        geometry::ElliottKind,
        structure::WyckoffKind,
    },
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BASE_CONFIDENCE: f64 = 50.0;

pub const WYCKOFF_BONUS: f64 = 20.0;
pub const ZONE_COMBO_BONUS: f64 = 15.0;
pub const ZONE_SINGLE_BONUS: f64 = 8.0;
pub const STRUCTURE_BREAK_BONUS: f64 = 10.0;
pub const CHARACTER_CHANGE_BONUS: f64 = 8.0;
pub const LIQUIDITY_SWEEP_BONUS: f64 = 12.0;
pub const TRIANGLE_BONUS: f64 = 18.0;
pub const TRIANGLE_NEAR_APEX_BONUS: f64 = 7.0;
pub const TRIANGLE_NEAR_APEX_CANDLES: f64 = 10.0;
pub const FLAG_BONUS: f64 = 22.0;
pub const WEDGE_BONUS: f64 = 16.0;
pub const WEDGE_NEAR_APEX_BONUS: f64 = 6.0;
pub const WEDGE_NEAR_APEX_CANDLES: f64 = 8.0;
pub const ELLIOTT_IMPULSE_BONUS: f64 = 15.0;
pub const ELLIOTT_EXTENDED_THIRD_BONUS: f64 = 10.0;
pub const ELLIOTT_CORRECTIVE_BONUS: f64 = 8.0;
pub const CANDLE_STRONG_BONUS: f64 = 14.0;
pub const CANDLE_MODERATE_BONUS: f64 = 8.0;
pub const CANDLE_WEAK_BONUS: f64 = 4.0;
pub const EMA_STACK_BONUS: f64 = 10.0;
pub const MACD_MOMENTUM_BONUS: f64 = 5.0;
pub const MACD_MOMENTUM_THRESHOLD: f64 = 0.5;
pub const ADX_TREND_BONUS: f64 = 8.0;
pub const ADX_TREND_THRESHOLD: f64 = 25.0;
pub const VOLUME_SPIKE_BONUS: f64 = 7.0;
pub const RSI_EXTREME_BONUS: f64 = 5.0;

/// Pattern families a caller can re-weight via [`PatternWeights`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum PatternKind {
    Spring,
    Upthrust,
    OrderBlock,
    FairValueGap,
    BreakOfStructure,
    ChangeOfCharacter,
    LiquiditySweep,
    Triangle,
    Flag,
    Wedge,
    Elliott,
    Candlestick,
}

/// Caller-owned pattern weight table.
///
/// Each pattern's confidence bonus is multiplied by its entry, defaulting to
/// 1.0, so an empty table reproduces the stock scoring exactly. Callers that
/// track per-pattern feedback own and mutate this table themselves; the
/// scorer never holds state between evaluations.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct PatternWeights(HashMap<PatternKind, f64>);

impl PatternWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: PatternKind, weight: f64) {
        self.0.insert(kind, weight);
    }

    pub fn weight(&self, kind: PatternKind) -> f64 {
        self.0.get(&kind).copied().unwrap_or(1.0)
    }
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum SignalType {
    #[display("BUY")]
    Buy,
    #[display("SELL")]
    Sell,
    #[display("NEUTRAL")]
    Neutral,
}

/// The scored output of one evaluation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct Signal {
    pub kind: SignalType,
    /// Composite confidence, clamped to `[0, 100]`.
    pub confidence: u8,
}

impl Signal {
    /// Score one evaluation from the indicator and pattern bundles.
    pub fn score(
        indicators: &IndicatorBundle,
        patterns: &PatternBundle,
        weights: &PatternWeights,
    ) -> Self {
        Self {
            kind: direction(indicators, patterns),
            confidence: confidence(indicators, patterns, weights),
        }
    }
}

/// EMA ribbon alignment: fully stacked fast-to-slow in either direction.
fn ema_stack(indicators: &IndicatorBundle) -> Option<Direction> {
    let IndicatorBundle {
        ema_9,
        ema_20,
        ema_50,
        ema_200,
        ..
    } = *indicators;

    if ema_9 > ema_20 && ema_20 > ema_50 && ema_50 > ema_200 {
        Some(Direction::Bullish)
    } else if ema_9 < ema_20 && ema_20 < ema_50 && ema_50 < ema_200 {
        Some(Direction::Bearish)
    } else {
        None
    }
}

fn confidence(
    indicators: &IndicatorBundle,
    patterns: &PatternBundle,
    weights: &PatternWeights,
) -> u8 {
    let mut score = BASE_CONFIDENCE;

    if let Some(wyckoff) = &patterns.wyckoff {
        let kind = match wyckoff.kind {
            WyckoffKind::Spring => PatternKind::Spring,
            WyckoffKind::Upthrust => PatternKind::Upthrust,
        };
        score += WYCKOFF_BONUS * weights.weight(kind);
    }

    match (&patterns.order_block, &patterns.fair_value_gap) {
        // Confluence bonus split across both weights.
        (Some(_), Some(_)) => {
            score += ZONE_COMBO_BONUS / 2.0 * weights.weight(PatternKind::OrderBlock);
            score += ZONE_COMBO_BONUS / 2.0 * weights.weight(PatternKind::FairValueGap);
        }
        (Some(_), None) => score += ZONE_SINGLE_BONUS * weights.weight(PatternKind::OrderBlock),
        (None, Some(_)) => score += ZONE_SINGLE_BONUS * weights.weight(PatternKind::FairValueGap),
        (None, None) => {}
    }

    if patterns.structure_break.is_some() {
        score += STRUCTURE_BREAK_BONUS * weights.weight(PatternKind::BreakOfStructure);
    }
    if patterns.character_change.is_some() {
        score += CHARACTER_CHANGE_BONUS * weights.weight(PatternKind::ChangeOfCharacter);
    }
    if patterns.liquidity_sweep.is_some() {
        score += LIQUIDITY_SWEEP_BONUS * weights.weight(PatternKind::LiquiditySweep);
    }

    if let Some(triangle) = &patterns.triangle {
        let mut bonus = TRIANGLE_BONUS;
        if triangle.convergence_in < TRIANGLE_NEAR_APEX_CANDLES {
            bonus += TRIANGLE_NEAR_APEX_BONUS;
        }
        score += bonus * weights.weight(PatternKind::Triangle);
    }
    if patterns.flag.is_some() {
        score += FLAG_BONUS * weights.weight(PatternKind::Flag);
    }
    if let Some(wedge) = &patterns.wedge {
        let mut bonus = WEDGE_BONUS;
        if wedge.convergence_in < WEDGE_NEAR_APEX_CANDLES {
            bonus += WEDGE_NEAR_APEX_BONUS;
        }
        score += bonus * weights.weight(PatternKind::Wedge);
    }
    if let Some(elliott) = &patterns.elliott {
        let bonus = match elliott.kind {
            ElliottKind::Impulsive if elliott.wave_three_extended => {
                ELLIOTT_IMPULSE_BONUS + ELLIOTT_EXTENDED_THIRD_BONUS
            }
            ElliottKind::Impulsive => ELLIOTT_IMPULSE_BONUS,
            ElliottKind::Corrective => ELLIOTT_CORRECTIVE_BONUS,
        };
        score += bonus * weights.weight(PatternKind::Elliott);
    }
    if let Some(candle) = &patterns.candle {
        let bonus = match candle.strength {
            Strength::Strong => CANDLE_STRONG_BONUS,
            Strength::Moderate => CANDLE_MODERATE_BONUS,
            Strength::Weak => CANDLE_WEAK_BONUS,
        };
        score += bonus * weights.weight(PatternKind::Candlestick);
    }

    if ema_stack(indicators).is_some() {
        score += EMA_STACK_BONUS;
    }
    if indicators.macd.histogram.abs() > MACD_MOMENTUM_THRESHOLD {
        score += MACD_MOMENTUM_BONUS;
    }
    if indicators.adx > ADX_TREND_THRESHOLD {
        score += ADX_TREND_BONUS;
    }
    if indicators.volume.spike {
        score += VOLUME_SPIKE_BONUS;
    }
    if !(30.0..=70.0).contains(&indicators.rsi) {
        score += RSI_EXTREME_BONUS;
    }

    score.clamp(0.0, 100.0).round() as u8
}

/// Separate bullish/bearish point tallies with pattern-specific weights.
fn tallies(indicators: &IndicatorBundle, patterns: &PatternBundle) -> (i32, i32) {
    let mut bullish = 0;
    let mut bearish = 0;
    let mut add = |direction: Direction, points: i32| match direction {
        Direction::Bullish => bullish += points,
        Direction::Bearish => bearish += points,
    };

    if let Some(wyckoff) = &patterns.wyckoff {
        match wyckoff.kind {
            WyckoffKind::Spring => add(Direction::Bullish, 3),
            WyckoffKind::Upthrust => add(Direction::Bearish, 3),
        }
    }
    if let Some(flag) = &patterns.flag {
        add(flag.direction, 3);
    }
    if let Some(block) = &patterns.order_block {
        add(block.direction, 2);
    }
    if let Some(gap) = &patterns.fair_value_gap {
        add(gap.direction, 2);
    }
    if let Some(direction) = patterns.triangle.as_ref().and_then(|t| t.direction) {
        add(direction, 2);
    }
    if let Some(wedge) = &patterns.wedge {
        add(wedge.direction, 2);
    }
    if let Some(elliott) = &patterns.elliott {
        add(elliott.direction, 2);
    }
    if let Some(candle) = &patterns.candle
        && let Some(direction) = candle.direction
    {
        let points = if candle.strength == Strength::Strong { 2 } else { 1 };
        add(direction, points);
    }
    if let Some(bos) = &patterns.structure_break {
        add(bos.direction, 2);
    }

    if let Some(direction) = ema_stack(indicators) {
        add(direction, 2);
    }
    if indicators.macd.histogram > 0.0 {
        add(Direction::Bullish, 1);
    } else if indicators.macd.histogram < 0.0 {
        add(Direction::Bearish, 1);
    }
    if indicators.rsi < 30.0 {
        add(Direction::Bullish, 2);
    } else if indicators.rsi > 70.0 {
        add(Direction::Bearish, 2);
    }

    (bullish, bearish)
}

fn direction(indicators: &IndicatorBundle, patterns: &PatternBundle) -> SignalType {
    let (bullish, bearish) = tallies(indicators, patterns);
    let difference = bullish - bearish;
    let total = bullish + bearish;

    let consolidation = patterns.indecision_candle()
        || (indicators.macd.histogram.abs() < 0.1 && (45.0..=55.0).contains(&indicators.rsi));

    if difference.abs() <= 1 && total < 5 && consolidation {
        return SignalType::Neutral;
    }

    match difference {
        d if d > 0 => SignalType::Buy,
        d if d < 0 => SignalType::Sell,
        // Exact tie with directional evidence: lean on RSI rather than
        // declaring NEUTRAL.
        _ if total > 0 => {
            if indicators.rsi > 50.0 {
                SignalType::Buy
            } else {
                SignalType::Sell
            }
        }
        _ => SignalType::Neutral,
    }
}
