//! Geometric detectors built on least-squares regression of the high/low
//! series: triangles, flags, wedges and an Elliott wave pivot scan.
//!
//! All slope comparisons are scaled by the window's price range so the
//! thresholds behave the same for a 0.5 USD altcoin and a 100k USD index.
//! A zero price range is guarded to 1.0 rather than dividing by zero.

use super::Direction;
use crate::candle::Candle;
use serde::{Deserialize, Serialize};

pub const TRIANGLE_WINDOW: usize = 20;
pub const WEDGE_WINDOW: usize = 15;
pub const FLAG_POLE_LOOKBACK: usize = 15;
pub const FLAG_CHANNEL: usize = 5;
pub const FLAG_MIN_MOVE: f64 = 0.02;
pub const ELLIOTT_WINDOW: usize = 50;
pub const PIVOT_SPAN: usize = 2;
pub const FIB_EXTENSION: f64 = 1.618;

/// Least-squares line fit over `values` with x = 0..n.
/// Returns `(slope, intercept)`; fewer than two points yields a flat line.
pub fn linear_regression(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (0.0, values.first().copied().unwrap_or(0.0));
    }

    let sum_x = (0..values.len()).map(|x| x as f64).sum::<f64>();
    let sum_y = values.iter().sum::<f64>();
    let sum_xy = values
        .iter()
        .enumerate()
        .map(|(x, y)| x as f64 * y)
        .sum::<f64>();
    let sum_x2 = (0..values.len()).map(|x| (x as f64).powi(2)).sum::<f64>();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return (0.0, sum_y / n);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum TriangleKind {
    Ascending,
    Descending,
    Symmetric,
}

/// Converging triangle over the trailing [`TRIANGLE_WINDOW`] candles.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Triangle {
    pub kind: TriangleKind,
    /// Expected breakout side; symmetric triangles carry no bias.
    pub direction: Option<Direction>,
    /// Candles until the regression lines intersect, measured from the
    /// latest candle.
    pub convergence_in: f64,
    /// Price at the intersection of the two regression lines.
    pub apex_price: f64,
}

/// Flag: a sharp pole followed by a short counter-sloped parallel channel.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Flag {
    pub direction: Direction,
    pub pole_height: f64,
    /// Measured-move target: current close +/- pole height.
    pub target: f64,
}

/// Wedge: both regression lines sloped the same way yet converging; the
/// expected breakout is against the wedge's own slope.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct Wedge {
    pub direction: Direction,
    pub convergence_in: f64,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum ElliottKind {
    Impulsive,
    Corrective,
}

/// Elliott wave read from 5-bar pivot extrema over the trailing
/// [`ELLIOTT_WINDOW`] candles.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub struct ElliottWave {
    pub kind: ElliottKind,
    /// Impulse with an extended third wave (>= 1.618x waves one and five).
    pub wave_three_extended: bool,
    pub direction: Direction,
    /// Fibonacci 1.618 projection for the wave-5 (impulse) or wave-C
    /// (correction) completion.
    pub projection: f64,
}

struct FittedLines {
    high_slope: f64,
    high_intercept: f64,
    low_slope: f64,
    low_intercept: f64,
    /// Slope below which a line counts as flat, derived from the window's
    /// price range.
    flat_tolerance: f64,
    last_x: f64,
}

impl FittedLines {
    fn fit(window: &[Candle]) -> Self {
        let highs = window.iter().map(|c| c.high).collect::<Vec<_>>();
        let lows = window.iter().map(|c| c.low).collect::<Vec<_>>();
        let (high_slope, high_intercept) = linear_regression(&highs);
        let (low_slope, low_intercept) = linear_regression(&lows);

        let max_high = highs.iter().fold(f64::NEG_INFINITY, |a, b| a.max(*b));
        let min_low = lows.iter().fold(f64::INFINITY, |a, b| a.min(*b));
        let price_range = match max_high - min_low {
            range if range > 0.0 => range,
            _ => 1.0,
        };

        Self {
            high_slope,
            high_intercept,
            low_slope,
            low_intercept,
            // A line must travel at least 10% of the range across the
            // window to count as directional.
            flat_tolerance: price_range / (window.len() as f64 * 10.0),
            last_x: window.len() as f64 - 1.0,
        }
    }

    fn flat(&self, slope: f64) -> bool {
        slope.abs() <= self.flat_tolerance
    }

    fn rising(&self, slope: f64) -> bool {
        slope > self.flat_tolerance
    }

    fn falling(&self, slope: f64) -> bool {
        slope < -self.flat_tolerance
    }

    /// Candles ahead of the latest candle where the two lines intersect.
    /// `None` when the lines diverge or crossed in the past.
    fn convergence_in(&self) -> Option<f64> {
        if self.high_slope >= self.low_slope {
            return None;
        }
        let x = (self.high_intercept - self.low_intercept) / (self.low_slope - self.high_slope);
        let ahead = x - self.last_x;
        (ahead > 0.0).then_some(ahead)
    }

    fn price_at(&self, x_ahead: f64) -> f64 {
        self.high_slope * (self.last_x + x_ahead) + self.high_intercept
    }
}

/// Detect a converging triangle over the trailing [`TRIANGLE_WINDOW`]
/// candles. Non-converging line pairs are rejected outright.
pub fn detect_triangle(candles: &[Candle]) -> Option<Triangle> {
    if candles.len() < TRIANGLE_WINDOW {
        return None;
    }

    let lines = FittedLines::fit(&candles[candles.len() - TRIANGLE_WINDOW..]);
    let kind = if lines.flat(lines.high_slope) && lines.rising(lines.low_slope) {
        TriangleKind::Ascending
    } else if lines.falling(lines.high_slope) && lines.flat(lines.low_slope) {
        TriangleKind::Descending
    } else if lines.falling(lines.high_slope) && lines.rising(lines.low_slope) {
        TriangleKind::Symmetric
    } else {
        return None;
    };

    let convergence_in = lines.convergence_in()?;

    Some(Triangle {
        kind,
        direction: match kind {
            TriangleKind::Ascending => Some(Direction::Bullish),
            TriangleKind::Descending => Some(Direction::Bearish),
            TriangleKind::Symmetric => None,
        },
        convergence_in,
        apex_price: lines.price_at(convergence_in),
    })
}

/// Detect a flag: a >= 2% pole between 15 and 5 candles back, followed by a
/// 5-candle near-parallel channel sloping against the pole.
pub fn detect_flag(candles: &[Candle]) -> Option<Flag> {
    if candles.len() < FLAG_POLE_LOOKBACK {
        return None;
    }

    let pole_start = candles[candles.len() - FLAG_POLE_LOOKBACK].close;
    let pole_end = candles[candles.len() - FLAG_CHANNEL].close;
    if pole_start == 0.0 {
        return None;
    }
    let pole_move = (pole_end - pole_start) / pole_start;
    if pole_move.abs() < FLAG_MIN_MOVE {
        return None;
    }

    let channel = &candles[candles.len() - FLAG_CHANNEL..];
    let lines = FittedLines::fit(channel);

    // Near-parallel channel lines.
    let max_high = channel.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = channel.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let channel_range = match max_high - min_low {
        range if range > 0.0 => range,
        _ => 1.0,
    };
    if (lines.high_slope - lines.low_slope).abs() > channel_range * 0.05 {
        return None;
    }

    // The channel must drift against the pole.
    let channel_slope = (lines.high_slope + lines.low_slope) / 2.0;
    let current_close = candles.last()?.close;
    let pole_height = (pole_end - pole_start).abs();

    if pole_move > 0.0 && channel_slope < 0.0 {
        Some(Flag {
            direction: Direction::Bullish,
            pole_height,
            target: current_close + pole_height,
        })
    } else if pole_move < 0.0 && channel_slope > 0.0 {
        Some(Flag {
            direction: Direction::Bearish,
            pole_height,
            target: current_close - pole_height,
        })
    } else {
        None
    }
}

/// Detect a wedge over the trailing [`WEDGE_WINDOW`] candles: both lines
/// sloped the same direction but still converging.
pub fn detect_wedge(candles: &[Candle]) -> Option<Wedge> {
    if candles.len() < WEDGE_WINDOW {
        return None;
    }

    let lines = FittedLines::fit(&candles[candles.len() - WEDGE_WINDOW..]);
    let rising_wedge = lines.rising(lines.high_slope) && lines.rising(lines.low_slope);
    let falling_wedge = lines.falling(lines.high_slope) && lines.falling(lines.low_slope);
    if !rising_wedge && !falling_wedge {
        return None;
    }

    let convergence_in = lines.convergence_in()?;

    Some(Wedge {
        // Breakout against the wedge's own slope.
        direction: if rising_wedge {
            Direction::Bearish
        } else {
            Direction::Bullish
        },
        convergence_in,
    })
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum PivotKind {
    High,
    Low,
}

#[derive(Copy, Clone, PartialEq, Debug)]
struct Pivot {
    index: usize,
    price: f64,
    kind: PivotKind,
}

/// 5-bar local extrema: a pivot high is strictly greater than every high
/// within [`PIVOT_SPAN`] candles either side (mirrored for lows).
fn pivots(candles: &[Candle]) -> Vec<Pivot> {
    let mut found = Vec::new();
    for i in PIVOT_SPAN..candles.len().saturating_sub(PIVOT_SPAN) {
        let neighbours = &candles[i - PIVOT_SPAN..=i + PIVOT_SPAN];
        let candidate = candles[i];

        let is_high = neighbours
            .iter()
            .enumerate()
            .all(|(j, c)| j == PIVOT_SPAN || candidate.high > c.high);
        let is_low = neighbours
            .iter()
            .enumerate()
            .all(|(j, c)| j == PIVOT_SPAN || candidate.low < c.low);

        if is_high {
            found.push(Pivot {
                index: i,
                price: candidate.high,
                kind: PivotKind::High,
            });
        } else if is_low {
            found.push(Pivot {
                index: i,
                price: candidate.low,
                kind: PivotKind::Low,
            });
        }
    }

    // Collapse runs of same-kind pivots, keeping the most extreme.
    let mut alternating: Vec<Pivot> = Vec::with_capacity(found.len());
    for pivot in found {
        match alternating.last_mut() {
            Some(last) if last.kind == pivot.kind => {
                let keep_new = match pivot.kind {
                    PivotKind::High => pivot.price > last.price,
                    PivotKind::Low => pivot.price < last.price,
                };
                if keep_new {
                    *last = pivot;
                }
            }
            _ => alternating.push(pivot),
        }
    }
    alternating
}

/// Detect an Elliott wave structure over the trailing [`ELLIOTT_WINDOW`]
/// candles.
///
/// Impulsive: five waves between six alternating pivots with wave three the
/// largest. Corrective: three waves where wave B retraces 40-70% of wave A.
pub fn detect_elliott(candles: &[Candle]) -> Option<ElliottWave> {
    let window = &candles[candles.len().saturating_sub(ELLIOTT_WINDOW)..];
    let pivots = pivots(window);
    let waves = pivots
        .windows(2)
        .map(|pair| pair[1].price - pair[0].price)
        .collect::<Vec<_>>();

    if let [.., w1, w2, w3, w4, w5] = waves[..] {
        let siblings = [w1, w2, w4, w5];
        if siblings.iter().all(|w| w3.abs() >= w.abs()) {
            let last_pivot = pivots.last()?.price;
            return Some(ElliottWave {
                kind: ElliottKind::Impulsive,
                wave_three_extended: w3.abs() >= FIB_EXTENSION * w1.abs().max(w5.abs()),
                direction: if w3 > 0.0 {
                    Direction::Bullish
                } else {
                    Direction::Bearish
                },
                projection: last_pivot + FIB_EXTENSION * w1,
            });
        }
    }

    if let [.., wave_a, wave_b, _wave_c] = waves[..] {
        if wave_a != 0.0 {
            let retrace = (wave_b / wave_a).abs();
            if (0.4..=0.7).contains(&retrace) {
                let wave_b_end = pivots[pivots.len() - 2].price;
                return Some(ElliottWave {
                    kind: ElliottKind::Corrective,
                    wave_three_extended: false,
                    direction: if wave_a > 0.0 {
                        Direction::Bullish
                    } else {
                        Direction::Bearish
                    },
                    projection: wave_b_end + FIB_EXTENSION * wave_a,
                });
            }
        }
    }

    None
}
