//! Walk-forward outcome scoring for scanned harmonic patterns.
//!
//! Each pattern is replayed against the candles that follow its D point
//! until its take-profit or stop-loss is touched. The stop-loss check runs
//! before the take-profit check within a bar, so a candle whose wicks span
//! both levels resolves conservatively to a loss.

use tracing::debug;

use crate::{
    harmonic::{Archetype, HarmonicPattern, PatternStatus, TradeSide},
    OHLCV,
};

/// Outcome of a replayed pattern trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// Scored outcome of one pattern
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BacktestResult {
    pub archetype: Archetype,
    pub status: PatternStatus,
    pub side: TradeSide,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub outcome: TradeOutcome,
    /// Bars from the D point to the triggering candle (or to the end of
    /// the series when nothing triggered)
    pub candles_to_hit: usize,
    pub confidence: f64,
}

/// Replay each pattern forward from its D point and classify the outcome.
///
/// Entry is the PRZ midpoint. A completed pattern with targets trades its
/// own first target and stop; anything else gets a synthetic
/// symmetric-risk pair one PRZ-width either side of entry. Patterns with a
/// degenerate zero-width PRZ are skipped. A pattern that reaches the end
/// of the series without touching either level is recorded as a loss.
pub fn backtest_patterns<T: OHLCV>(
    patterns: &[HarmonicPattern],
    candles: &[T],
) -> Vec<BacktestResult> {
    let mut results = Vec::with_capacity(patterns.len());

    for pattern in patterns {
        let width = pattern.prz.width();
        if width <= 0.0 {
            debug!(
                archetype = pattern.archetype.name(),
                "skipping pattern with degenerate PRZ"
            );
            continue;
        }

        let entry = pattern.prz.midpoint();
        let completed = matches!(
            pattern.status,
            PatternStatus::Completed | PatternStatus::Confirmed
        );
        let (take_profit, stop_loss) = if completed && !pattern.targets.is_empty() {
            (pattern.targets[0], pattern.stop_loss)
        } else {
            match pattern.side {
                TradeSide::Buy => (entry + width, entry - width),
                TradeSide::Sell => (entry - width, entry + width),
            }
        };

        let d_index = pattern.points.d.index;
        let mut outcome = TradeOutcome::Loss;
        let mut candles_to_hit = candles.len().saturating_sub(d_index + 1);

        for (i, candle) in candles.iter().enumerate().skip(d_index + 1) {
            let hit = match pattern.side {
                TradeSide::Buy => {
                    if candle.low() <= stop_loss {
                        Some(TradeOutcome::Loss)
                    } else if candle.high() >= take_profit {
                        Some(TradeOutcome::Win)
                    } else {
                        None
                    }
                }
                TradeSide::Sell => {
                    if candle.high() >= stop_loss {
                        Some(TradeOutcome::Loss)
                    } else if candle.low() <= take_profit {
                        Some(TradeOutcome::Win)
                    } else {
                        None
                    }
                }
            };

            if let Some(hit) = hit {
                outcome = hit;
                candles_to_hit = i - d_index;
                break;
            }
        }

        results.push(BacktestResult {
            archetype: pattern.archetype,
            status: pattern.status,
            side: pattern.side,
            entry,
            take_profit,
            stop_loss,
            outcome,
            candles_to_hit,
            confidence: pattern.confidence,
        });
    }

    results
}

// ============================================================
// TESTS
// ============================================================
