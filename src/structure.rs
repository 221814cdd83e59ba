//! Market-structure event detection over an ordered swing sequence.
//!
//! Terminology follows smart-money-concept usage: a Break of Structure
//! (BOS) is price exceeding the prior same-kind swing extreme, signaling
//! trend continuation; a Change of Character (CHoCH) is the first break of
//! the prevailing internal structure against the current trend; a liquidity
//! sweep is a false breakout past a swing level that closes back inside.
//!
//! All detectors are total over well-formed input: insufficient swings or
//! candles yield empty results. Callers must supply chronologically ordered
//! swings and candles; non-monotonic indices are undefined behavior.

use tracing::trace;

use crate::{Direction, OHLCV, Period, Swing};

// ============================================================
// EVENT TYPES
// ============================================================

/// Kind of structural break
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StructureKind {
    Bos,
    Choch,
}

/// A structural break derived from the swing sequence
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructureEvent {
    pub kind: StructureKind,
    pub direction: Direction,
    pub break_price: f64,
    /// Candle position of the breaking swing
    pub swing_index: usize,
}

/// A false breakout past a swing level
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiquiditySweep {
    pub direction: Direction,
    /// Extreme of the violating wick
    pub sweep_price: f64,
    pub swing_index: usize,
    pub candle_index: usize,
}

/// A composable trade setup: sweep, then CHoCH, then BOS
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntryModel {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Candle position of the confirming BOS
    pub index: usize,
}

// ============================================================
// BOS
// ============================================================

/// Detect Break-of-Structure events.
///
/// Single forward pass tracking the most recent high-kind and low-kind
/// swing independently: a high swing exceeding the previously tracked high
/// emits a bullish BOS, a low swing undercutting the previously tracked low
/// emits a bearish BOS. Fewer than three swings yield no events.
pub fn detect_bos(swings: &[Swing]) -> Vec<StructureEvent> {
    let mut events = Vec::new();
    if swings.len() < 3 {
        return events;
    }

    let mut last_high: Option<&Swing> = None;
    let mut last_low: Option<&Swing> = None;

    for swing in swings {
        if swing.is_high() {
            if let Some(prev) = last_high {
                if swing.price > prev.price {
                    events.push(StructureEvent {
                        kind: StructureKind::Bos,
                        direction: Direction::Bullish,
                        break_price: swing.price,
                        swing_index: swing.index,
                    });
                }
            }
            last_high = Some(swing);
        } else {
            if let Some(prev) = last_low {
                if swing.price < prev.price {
                    events.push(StructureEvent {
                        kind: StructureKind::Bos,
                        direction: Direction::Bearish,
                        break_price: swing.price,
                        swing_index: swing.index,
                    });
                }
            }
            last_low = Some(swing);
        }
    }

    events
}

// ============================================================
// CHoCH
// ============================================================

/// Detect the first Change-of-Character event.
///
/// The prevailing trend is the direction of the last BOS. In an uptrend the
/// walk tracks the last higher-low; the first low swing breaking below it
/// emits a bearish CHoCH and the scan stops. Mirrored for a downtrend via
/// lower-highs. At most one event per call.
pub fn detect_choch(swings: &[Swing], bos_events: &[StructureEvent]) -> Option<StructureEvent> {
    let trend = bos_events.last()?.direction;

    match trend {
        Direction::Bullish => {
            // Track the last higher-low; a break below it flips character.
            let mut prev_low: Option<f64> = None;
            let mut higher_low: Option<f64> = None;

            for swing in swings.iter().filter(|s| s.is_low()) {
                if let Some(level) = higher_low {
                    if swing.price < level {
                        return Some(StructureEvent {
                            kind: StructureKind::Choch,
                            direction: Direction::Bearish,
                            break_price: swing.price,
                            swing_index: swing.index,
                        });
                    }
                }
                if let Some(prev) = prev_low {
                    if swing.price > prev {
                        higher_low = Some(swing.price);
                    }
                }
                prev_low = Some(swing.price);
            }
        }
        Direction::Bearish => {
            let mut prev_high: Option<f64> = None;
            let mut lower_high: Option<f64> = None;

            for swing in swings.iter().filter(|s| s.is_high()) {
                if let Some(level) = lower_high {
                    if swing.price > level {
                        return Some(StructureEvent {
                            kind: StructureKind::Choch,
                            direction: Direction::Bullish,
                            break_price: swing.price,
                            swing_index: swing.index,
                        });
                    }
                }
                if let Some(prev) = prev_high {
                    if swing.price < prev {
                        lower_high = Some(swing.price);
                    }
                }
                prev_high = Some(swing.price);
            }
        }
    }

    None
}

// ============================================================
// LIQUIDITY SWEEPS
// ============================================================

/// Detect liquidity sweeps: stop-hunt wicks through a swing level.
///
/// For each swing the next `lookahead` candles are examined; the first
/// candle whose wick violates the level while its close reverts back inside
/// is recorded, and no later candle is considered for that swing. A sweep
/// of a swing high is bearish (failed breakout above resistance), a sweep
/// of a swing low is bullish.
pub fn detect_liquidity_sweeps<T: OHLCV>(
    candles: &[T],
    swings: &[Swing],
    lookahead: Period,
) -> Vec<LiquiditySweep> {
    let mut sweeps = Vec::new();
    let lookahead = lookahead.get();

    for swing in swings {
        let start = swing.index + 1;
        let end = (swing.index + lookahead).min(candles.len().saturating_sub(1));

        for (i, candle) in candles.iter().enumerate().take(end + 1).skip(start) {
            let sweep = if swing.is_high() {
                (candle.high() > swing.price && candle.close() < swing.price).then(|| {
                    LiquiditySweep {
                        direction: Direction::Bearish,
                        sweep_price: candle.high(),
                        swing_index: swing.index,
                        candle_index: i,
                    }
                })
            } else {
                (candle.low() < swing.price && candle.close() > swing.price).then(|| {
                    LiquiditySweep {
                        direction: Direction::Bullish,
                        sweep_price: candle.low(),
                        swing_index: swing.index,
                        candle_index: i,
                    }
                })
            };

            if let Some(sweep) = sweep {
                trace!(
                    swing_index = sweep.swing_index,
                    candle_index = sweep.candle_index,
                    "liquidity sweep"
                );
                sweeps.push(sweep);
                break;
            }
        }
    }

    sweeps
}

// ============================================================
// ENTRY MODELS
// ============================================================

/// Detect entry models from the sweep → CHoCH → BOS chain.
///
/// For each sweep: the first CHoCH of matching direction after the sweep
/// candle, then the first BOS of matching direction after that CHoCH. Entry
/// is the close of the BOS candle, stop-loss the most extreme adverse wick
/// between the sweep and the entry inclusive, take-profit a `risk_reward`
/// multiple of the entry-to-stop distance. Sweeps without a qualifying
/// chain produce nothing.
pub fn detect_entry_models<T: OHLCV>(
    candles: &[T],
    _swings: &[Swing],
    choch_events: &[StructureEvent],
    sweeps: &[LiquiditySweep],
    bos_events: &[StructureEvent],
    risk_reward: f64,
) -> Vec<EntryModel> {
    let mut entries = Vec::new();

    for sweep in sweeps {
        let Some(choch) = choch_events
            .iter()
            .find(|e| e.direction == sweep.direction && e.swing_index > sweep.candle_index)
        else {
            continue;
        };

        let Some(bos) = bos_events
            .iter()
            .find(|e| e.direction == sweep.direction && e.swing_index > choch.swing_index)
        else {
            continue;
        };

        if bos.swing_index >= candles.len() {
            continue;
        }

        let entry_price = candles[bos.swing_index].close();
        let span = &candles[sweep.candle_index..=bos.swing_index];

        let (stop_loss, take_profit) = match sweep.direction {
            Direction::Bullish => {
                let stop = span.iter().map(OHLCV::low).fold(f64::INFINITY, f64::min);
                (stop, entry_price + risk_reward * (entry_price - stop))
            }
            Direction::Bearish => {
                let stop = span
                    .iter()
                    .map(OHLCV::high)
                    .fold(f64::NEG_INFINITY, f64::max);
                (stop, entry_price - risk_reward * (stop - entry_price))
            }
        };

        entries.push(EntryModel {
            direction: sweep.direction,
            entry_price,
            stop_loss,
            take_profit,
            index: bos.swing_index,
        });
    }

    entries
}

// ============================================================
// TESTS
// ============================================================
