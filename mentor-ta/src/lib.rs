#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! Technical analysis core for the Mentor trading assistant.
//!
//! This crate turns a rolling window of OHLCV [`Candle`]s into three value
//! objects, recomputed from scratch on every evaluation:
//! * [`IndicatorBundle`] - moving averages, oscillators, volatility bands and
//!   volume statistics (requires >= 200 candles).
//! * [`PatternBundle`] - independent chart-pattern detections (order blocks,
//!   fair value gaps, Wyckoff springs, structure breaks, geometric patterns,
//!   candlestick patterns) plus a single primary pattern selected by fixed
//!   priority (requires >= 50 candles).
//! * [`Signal`] - a composite confidence score in `[0, 100]` and a discrete
//!   BUY/SELL/NEUTRAL direction derived from both bundles.
//!
//! Everything here is synchronous, deterministic and side-effect-free: each
//! function is a pure mapping from an immutable candle slice to a value
//! object, so callers may evaluate any number of (symbol, timeframe) windows
//! concurrently without coordination. The only caller obligation is that the
//! supplied window is chronologically sorted and not mutated during the call.
//!
//! Candle feeds, persistence, chat-context building and order bookkeeping are
//! external collaborators; they consume the serialized bundles produced by
//! [`analyze`] and are deliberately out of scope.

pub mod candle;
pub mod error;
pub mod indicator;
pub mod pattern;
pub mod signal;
pub mod summary;
pub mod test_utils;

pub use candle::Candle;
pub use error::AnalysisError;
pub use indicator::IndicatorBundle;
pub use pattern::PatternBundle;
pub use signal::{PatternWeights, Signal, SignalType};
pub use summary::{MarketAnalysis, analyze};
