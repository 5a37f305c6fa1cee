//! Candlestick pattern classification over the trailing three candles.
//!
//! Checks run from the most specific multi-candle reversals down to the
//! weak single-candle shapes; the first match wins. Strength feeds both the
//! confidence score and the primary-pattern priority (only strong patterns
//! can claim the primary slot).

use super::Direction;
use crate::candle::Candle;
use serde::{Deserialize, Serialize};

/// Body no larger than 10% of the range reads as a doji.
const DOJI_BODY_RATIO: f64 = 0.1;
/// A hammer/shooting-star shadow must be at least twice the body.
const SHADOW_BODY_RATIO: f64 = 2.0;
/// A pin bar's dominant shadow must cover two thirds of the range.
const PIN_BAR_SHADOW_RATIO: f64 = 2.0 / 3.0;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum CandlePatternKind {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    PinBar,
    InsideBar,
}

impl CandlePatternKind {
    /// Human-readable pattern name, used for primary-pattern selection and
    /// chat context.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Doji => "Doji",
            Self::Hammer => "Hammer",
            Self::ShootingStar => "Shooting Star",
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::PinBar => "Pin Bar",
            Self::InsideBar => "Inside Bar",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

/// A classified candlestick pattern on the latest candles.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct CandlePattern {
    pub kind: CandlePatternKind,
    /// `None` for indecision shapes (doji, inside bar).
    pub direction: Option<Direction>,
    pub strength: Strength,
}

impl CandlePattern {
    fn new(kind: CandlePatternKind, direction: Option<Direction>, strength: Strength) -> Self {
        Self {
            kind,
            direction,
            strength,
        }
    }
}

/// Classify the trailing three candles, strongest patterns first.
pub fn detect_candle_pattern(candles: &[Candle]) -> Option<CandlePattern> {
    let [.., first, prior, current] = candles else {
        return None;
    };

    morning_star(first, prior, current)
        .or_else(|| evening_star(first, prior, current))
        .or_else(|| engulfing(prior, current))
        .or_else(|| hammer(prior, current))
        .or_else(|| shooting_star(prior, current))
        .or_else(|| pin_bar(current))
        .or_else(|| doji(current))
        .or_else(|| inside_bar(prior, current))
}

fn morning_star(first: &Candle, prior: &Candle, current: &Candle) -> Option<CandlePattern> {
    let shape = first.is_bearish()
        && first.body() > first.range() * 0.5
        && prior.body() < first.body() * 0.5
        && current.is_bullish()
        && current.close > (first.open + first.close) / 2.0;

    shape.then(|| {
        CandlePattern::new(
            CandlePatternKind::MorningStar,
            Some(Direction::Bullish),
            Strength::Strong,
        )
    })
}

fn evening_star(first: &Candle, prior: &Candle, current: &Candle) -> Option<CandlePattern> {
    let shape = first.is_bullish()
        && first.body() > first.range() * 0.5
        && prior.body() < first.body() * 0.5
        && current.is_bearish()
        && current.close < (first.open + first.close) / 2.0;

    shape.then(|| {
        CandlePattern::new(
            CandlePatternKind::EveningStar,
            Some(Direction::Bearish),
            Strength::Strong,
        )
    })
}

fn engulfing(prior: &Candle, current: &Candle) -> Option<CandlePattern> {
    if prior.is_bearish()
        && current.is_bullish()
        && current.open <= prior.close
        && current.close >= prior.open
        && current.body() > prior.body()
    {
        Some(CandlePattern::new(
            CandlePatternKind::BullishEngulfing,
            Some(Direction::Bullish),
            Strength::Strong,
        ))
    } else if prior.is_bullish()
        && current.is_bearish()
        && current.open >= prior.close
        && current.close <= prior.open
        && current.body() > prior.body()
    {
        Some(CandlePattern::new(
            CandlePatternKind::BearishEngulfing,
            Some(Direction::Bearish),
            Strength::Strong,
        ))
    } else {
        None
    }
}

fn hammer(prior: &Candle, current: &Candle) -> Option<CandlePattern> {
    let shape = current.body() > 0.0
        && current.lower_shadow() > SHADOW_BODY_RATIO * current.body()
        && current.upper_shadow() < current.body();

    shape.then(|| {
        // Sweeping the prior low upgrades the reversal to strong.
        let strength = if current.low < prior.low {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        CandlePattern::new(CandlePatternKind::Hammer, Some(Direction::Bullish), strength)
    })
}

fn shooting_star(prior: &Candle, current: &Candle) -> Option<CandlePattern> {
    let shape = current.body() > 0.0
        && current.upper_shadow() > SHADOW_BODY_RATIO * current.body()
        && current.lower_shadow() < current.body();

    shape.then(|| {
        let strength = if current.high > prior.high {
            Strength::Strong
        } else {
            Strength::Moderate
        };
        CandlePattern::new(
            CandlePatternKind::ShootingStar,
            Some(Direction::Bearish),
            strength,
        )
    })
}

fn pin_bar(current: &Candle) -> Option<CandlePattern> {
    if current.range() <= 0.0 {
        return None;
    }
    let dominant = current.lower_shadow().max(current.upper_shadow());
    let shape = dominant > 0.0
        && dominant >= SHADOW_BODY_RATIO * current.body()
        && dominant >= PIN_BAR_SHADOW_RATIO * current.range();

    shape.then(|| {
        let direction = if current.lower_shadow() > current.upper_shadow() {
            Direction::Bullish
        } else {
            Direction::Bearish
        };
        CandlePattern::new(CandlePatternKind::PinBar, Some(direction), Strength::Moderate)
    })
}

fn doji(current: &Candle) -> Option<CandlePattern> {
    (current.body() <= DOJI_BODY_RATIO * current.range())
        .then(|| CandlePattern::new(CandlePatternKind::Doji, None, Strength::Weak))
}

fn inside_bar(prior: &Candle, current: &Candle) -> Option<CandlePattern> {
    (current.high < prior.high && current.low > prior.low)
        .then(|| CandlePattern::new(CandlePatternKind::InsideBar, None, Strength::Weak))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{base_time, candle, time_plus_minutes};

    fn at(minutes: i64) -> chrono::DateTime<chrono::Utc> {
        time_plus_minutes(base_time(), minutes)
    }

    fn neutral(minutes: i64) -> crate::candle::Candle {
        candle(at(minutes), 100.0, 100.5, 99.5, 100.2, 100.0)
    }

    #[test]
    fn test_strong_hammer_sweeping_prior_low() {
        // Long lower shadow against a small body, no upper shadow, low
        // below the prior candle's low.
        let candles = vec![
            neutral(0),
            neutral(1),
            candle(at(2), 99.0, 99.1, 96.0, 99.1, 100.0),
        ];
        // Body 0.1, lower shadow 3.0, no upper shadow.
        let pattern = detect_candle_pattern(&candles).unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::Hammer);
        assert_eq!(pattern.direction, Some(Direction::Bullish));
        assert_eq!(pattern.strength, Strength::Strong);
    }

    #[test]
    fn test_hammer_without_sweep_is_moderate() {
        let candles = vec![
            neutral(0),
            neutral(1),
            candle(at(2), 100.0, 100.1, 99.6, 100.1, 100.0),
        ];
        let pattern = detect_candle_pattern(&candles).unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::Hammer);
        assert_eq!(pattern.strength, Strength::Moderate);
    }

    #[test]
    fn test_bullish_engulfing() {
        let candles = vec![
            neutral(0),
            candle(at(1), 100.0, 100.2, 99.0, 99.2, 100.0),
            candle(at(2), 99.1, 101.0, 99.0, 100.8, 100.0),
        ];
        let pattern = detect_candle_pattern(&candles).unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::BullishEngulfing);
        assert_eq!(pattern.direction, Some(Direction::Bullish));
        assert_eq!(pattern.strength, Strength::Strong);
    }

    #[test]
    fn test_morning_star() {
        let candles = vec![
            candle(at(0), 102.0, 102.2, 99.8, 100.0, 100.0),
            candle(at(1), 99.9, 100.2, 99.6, 100.1, 100.0),
            candle(at(2), 100.1, 101.8, 100.0, 101.6, 100.0),
        ];
        let pattern = detect_candle_pattern(&candles).unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::MorningStar);
        assert_eq!(pattern.direction, Some(Direction::Bullish));
        assert_eq!(pattern.strength, Strength::Strong);
    }

    #[test]
    fn test_doji_is_weak_and_directionless() {
        let candles = vec![
            neutral(0),
            neutral(1),
            candle(at(2), 100.0, 101.0, 99.0, 100.05, 100.0),
        ];
        let pattern = detect_candle_pattern(&candles).unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::Doji);
        assert_eq!(pattern.direction, None);
        assert_eq!(pattern.strength, Strength::Weak);
    }

    #[test]
    fn test_inside_bar() {
        let candles = vec![
            neutral(0),
            candle(at(1), 99.0, 102.0, 98.0, 101.0, 100.0),
            candle(at(2), 100.4, 100.8, 100.1, 100.5, 100.0),
        ];
        let pattern = detect_candle_pattern(&candles).unwrap();
        assert_eq!(pattern.kind, CandlePatternKind::InsideBar);
        assert_eq!(pattern.direction, None);
        assert_eq!(pattern.strength, Strength::Weak);
    }

    #[test]
    fn test_plain_candles_match_nothing() {
        let candles = vec![
            neutral(0),
            candle(at(1), 100.0, 101.0, 99.8, 100.8, 100.0),
            candle(at(2), 100.8, 101.8, 100.6, 101.6, 100.0),
        ];
        assert_eq!(detect_candle_pattern(&candles), None);
    }
}
