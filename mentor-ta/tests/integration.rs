use mentor_ta::{
    AnalysisError, PatternWeights, SignalType, analyze,
    pattern::Direction,
    test_utils::{base_time, candle, flat_candles, geometric_candles, time_plus_minutes},
};

#[test]
fn trending_window_scores_buy_with_aligned_stack() {
    // 220 accelerating up-candles: EMA ribbon fully stacked, positive MACD
    // histogram, RSI pinned at 100.
    let candles = geometric_candles(220, 100.0, 1.01);
    let analysis = analyze(&candles, &PatternWeights::new()).unwrap();

    let indicators = &analysis.indicators;
    assert!(indicators.ema_9 > indicators.ema_20);
    assert!(indicators.ema_20 > indicators.ema_50);
    assert!(indicators.ema_50 > indicators.ema_200);
    assert!(indicators.macd.histogram > 0.5);
    assert_eq!(indicators.rsi, 100.0);

    // The continuous gap-ups register as a bullish fair value gap and a
    // bullish break of structure.
    let gap = analysis.patterns.fair_value_gap.unwrap();
    assert_eq!(gap.direction, Direction::Bullish);
    let bos = analysis.patterns.structure_break.unwrap();
    assert_eq!(bos.direction, Direction::Bullish);

    assert_eq!(analysis.signal.kind, SignalType::Buy);
    // EMA-stack (+10) and MACD (+5) bonuses are included on top of the
    // pattern and trend bonuses.
    assert!(analysis.signal.confidence >= 80);
}

#[test]
fn order_block_window_end_to_end() {
    let mut candles = flat_candles(220, 100.0);
    let n = candles.len();
    // Large bullish prior candle, then a smaller reversal candle closing
    // below its low: a bullish order block at the prior low.
    candles[n - 2] = candle(
        time_plus_minutes(base_time(), (n - 2) as i64),
        100.0,
        104.5,
        99.5,
        104.0,
        240.0,
    );
    candles[n - 1] = candle(
        time_plus_minutes(base_time(), (n - 1) as i64),
        99.4,
        99.5,
        98.5,
        99.0,
        100.0,
    );

    let analysis = analyze(&candles, &PatternWeights::new()).unwrap();

    let block = analysis.patterns.order_block.unwrap();
    assert_eq!(block.direction, Direction::Bullish);
    assert_eq!(block.price, 99.5);

    // The reversal candle also leaves a bearish gap against the flat
    // window, so both zone detectors fire and the combo becomes primary.
    assert!(analysis.patterns.fair_value_gap.is_some());
    assert_eq!(analysis.patterns.primary.unwrap().name, "Order Block + FVG");

    // A lone directional detection must never be reported as NEUTRAL.
    assert_ne!(analysis.signal.kind, SignalType::Neutral);
}

#[test]
fn short_windows_are_rejected_not_defaulted() {
    let candles = flat_candles(150, 100.0);
    assert_eq!(
        analyze(&candles, &PatternWeights::new()),
        Err(AnalysisError::InsufficientData {
            required: 200,
            actual: 150
        })
    );
}

#[test]
fn analysis_serializes_to_one_persistence_row() {
    let candles = geometric_candles(220, 100.0, 1.01);
    let analysis = analyze(&candles, &PatternWeights::new()).unwrap();

    let row = serde_json::to_value(&analysis).unwrap();
    assert_eq!(row["signal"]["kind"], "Buy");
    assert_eq!(row["candles"], 220);
    assert_eq!(row["indicators"]["rsi"], 100.0);
    assert_eq!(row["patterns"]["primary"]["name"], "Fair Value Gap");

    let back: mentor_ta::MarketAnalysis = serde_json::from_value(row).unwrap();
    assert_eq!(back.signal, analysis.signal);
}

#[test]
fn pattern_weights_can_silence_a_pattern_family() {
    let candles = geometric_candles(220, 100.0, 1.01);

    let unweighted = analyze(&candles, &PatternWeights::new()).unwrap();

    let mut weights = PatternWeights::new();
    weights.set(mentor_ta::signal::PatternKind::FairValueGap, 0.0);
    weights.set(mentor_ta::signal::PatternKind::BreakOfStructure, 0.0);
    let weighted = analyze(&candles, &weights).unwrap();

    // Zeroed pattern families contribute nothing to confidence.
    assert!(weighted.signal.confidence < unweighted.signal.confidence);
}
