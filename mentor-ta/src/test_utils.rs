//! Synthetic candle fixtures shared by unit and integration tests.

use crate::candle::Candle;
use chrono::{DateTime, TimeDelta, Utc};

/// Fixed fixture start time.
pub fn base_time() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

pub fn time_plus_minutes(base: DateTime<Utc>, plus: i64) -> DateTime<Utc> {
    base + TimeDelta::minutes(plus)
}

pub fn candle(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        time,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// `n` identical candles at a constant price with constant volume.
pub fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            candle(
                time_plus_minutes(base_time(), i as i64),
                price,
                price * 1.001,
                price * 0.999,
                price,
                100.0,
            )
        })
        .collect()
}

/// `n` candles whose closes follow `start * ratio^i` (ratio > 1 trends up,
/// ratio < 1 trends down). Each candle opens at the previous close with small
/// symmetric wicks and constant volume.
pub fn geometric_candles(n: usize, start: f64, ratio: f64) -> Vec<Candle> {
    let mut prev_close = start;
    (0..n)
        .map(|i| {
            let close = start * ratio.powi(i as i32 + 1);
            let open = prev_close;
            let high = open.max(close) * 1.001;
            let low = open.min(close) * 0.999;
            prev_close = close;
            candle(
                time_plus_minutes(base_time(), i as i64),
                open,
                high,
                low,
                close,
                100.0,
            )
        })
        .collect()
}

/// `n` candles with closes stepping linearly by `step` from `start`.
pub fn linear_candles(n: usize, start: f64, step: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let open = start + step * i as f64;
            let close = open + step;
            let high = open.max(close) + step.abs() * 0.1;
            let low = open.min(close) - step.abs() * 0.1;
            candle(
                time_plus_minutes(base_time(), i as i64),
                open,
                high,
                low,
                close,
                100.0,
            )
        })
        .collect()
}
