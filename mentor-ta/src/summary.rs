//! Combined analysis bundle and the top-level evaluation entry point.
//!
//! External collaborators consume [`MarketAnalysis`] as-is: the persistence
//! adapter serializes one row per evaluation, the display layer renders the
//! bundles, and the chat-context builder embeds the [`Display`] summary line.

use crate::{
    candle::Candle,
    error::AnalysisError,
    indicator::{INDICATOR_MIN_CANDLES, IndicatorBundle},
    pattern::PatternBundle,
    signal::{PatternWeights, Signal},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// One full evaluation of a candle window.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct MarketAnalysis {
    /// Time of the latest candle in the window.
    pub time: DateTime<Utc>,
    /// Close of the latest candle.
    pub close: f64,
    /// Number of candles evaluated.
    pub candles: usize,
    pub indicators: IndicatorBundle,
    pub patterns: PatternBundle,
    pub signal: Signal,
}

/// Evaluate indicators, patterns and the composite signal over one
/// chronological candle window.
///
/// Requires at least [`INDICATOR_MIN_CANDLES`] candles (the strictest
/// component minimum). Pure and stateless: callers re-invoke this on every
/// closed candle, from as many (symbol, timeframe) contexts as they like.
pub fn analyze(
    candles: &[Candle],
    weights: &PatternWeights,
) -> Result<MarketAnalysis, AnalysisError> {
    let indicators = IndicatorBundle::compute(candles).inspect_err(|error| {
        debug!(%error, "candle window not ready for analysis");
    })?;
    let patterns = PatternBundle::detect(candles)?;
    let signal = Signal::score(&indicators, &patterns, weights);

    let Some(last) = candles.last() else {
        return Err(AnalysisError::InsufficientData {
            required: INDICATOR_MIN_CANDLES,
            actual: 0,
        });
    };

    trace!(?indicators, ?patterns, "evaluation detail");
    debug!(
        kind = %signal.kind,
        confidence = signal.confidence,
        primary = patterns.primary.as_ref().map(|p| p.name.as_str()),
        "analysis complete"
    );

    Ok(MarketAnalysis {
        time: last.time,
        close: last.close,
        candles: candles.len(),
        indicators,
        patterns,
        signal,
    })
}

impl fmt::Display for MarketAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}%) at {:.2}",
            self.signal.kind, self.signal.confidence, self.close
        )?;
        if let Some(primary) = &self.patterns.primary {
            write!(f, " - {}: {}", primary.name, primary.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::flat_candles;

    #[test]
    fn test_analyze_rejects_short_window() {
        let candles = flat_candles(100, 100.0);
        assert_eq!(
            analyze(&candles, &PatternWeights::new()),
            Err(AnalysisError::InsufficientData {
                required: 200,
                actual: 100
            })
        );
    }

    #[test]
    fn test_analyze_flat_window() {
        let candles = flat_candles(220, 100.0);
        let analysis = analyze(&candles, &PatternWeights::new()).unwrap();

        assert_eq!(analysis.candles, 220);
        assert_eq!(analysis.close, 100.0);
        // Constant closes: zero average loss pins RSI at its documented
        // fallback of 100.
        assert_eq!(analysis.indicators.rsi, 100.0);
        assert_eq!(analysis.patterns.primary, None);
    }

    #[test]
    fn test_display_contains_signal_and_confidence() {
        let candles = flat_candles(220, 100.0);
        let analysis = analyze(&candles, &PatternWeights::new()).unwrap();
        let rendered = analysis.to_string();

        assert!(rendered.contains(&format!("{}", analysis.signal.kind)));
        assert!(rendered.contains(&format!("({}%)", analysis.signal.confidence)));
        assert!(rendered.contains("100.00"));
    }
}
