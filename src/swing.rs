//! Swing point extraction.
//!
//! A swing is a local extremum whose high (or low) strictly exceeds every
//! candle within a symmetric lookback window on both sides. Raw extrema are
//! then run through a noise filter (minimum relative move versus the last
//! retained swing) and, optionally, an alternation constraint enforcing a
//! strict high/low/high/low sequence.

use tracing::trace;

use crate::{Fraction, OHLCV, Period, Swing, SwingKind};

/// Retention policy applied after the extremum scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwingPolicy {
    /// Keep every extremum passing the minimum-move filter; consecutive
    /// swings of the same kind are allowed.
    Unconstrained,
    /// Additionally forbid two consecutive swings of the same kind.
    #[default]
    Alternating,
}

/// Swing point detector.
///
/// Fully materialized output, restartable on each call, no shared state.
#[derive(Debug, Clone)]
pub struct SwingDetector {
    /// Symmetric window: a candle is an extremum only if it strictly beats
    /// every candle within `lookback` positions on both sides
    pub lookback: Period,
    /// Minimum relative move versus the last retained swing price
    pub min_move: Fraction,
    pub policy: SwingPolicy,
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(3),
            min_move: Fraction::new_const(0.005),
            policy: SwingPolicy::Alternating,
        }
    }
}

impl SwingDetector {
    pub fn new(lookback: Period, min_move: Fraction, policy: SwingPolicy) -> Self {
        Self {
            lookback,
            min_move,
            policy,
        }
    }

    /// Scan a candle series for swing points.
    ///
    /// Series shorter than `2 * lookback + 1` produce no swings.
    pub fn detect<T: OHLCV>(&self, candles: &[T]) -> Vec<Swing> {
        let lb = self.lookback.get();
        let mut swings = Vec::new();

        if candles.len() < 2 * lb + 1 {
            return swings;
        }

        for i in lb..candles.len() - lb {
            let window = (i - lb..i).chain(i + 1..=i + lb);

            let high = candles[i].high();
            let is_high = window
                .clone()
                .all(|j| high > candles[j].high());
            if is_high {
                self.retain(
                    &mut swings,
                    Swing {
                        index: i,
                        price: high,
                        kind: SwingKind::High,
                    },
                );
            }

            let low = candles[i].low();
            let is_low = window.clone().all(|j| low < candles[j].low());
            if is_low {
                self.retain(
                    &mut swings,
                    Swing {
                        index: i,
                        price: low,
                        kind: SwingKind::Low,
                    },
                );
            }
        }

        swings
    }

    /// Apply the noise filter and alternation constraint to a raw extremum.
    ///
    /// The first swing is always accepted unconditionally.
    fn retain(&self, swings: &mut Vec<Swing>, candidate: Swing) {
        let Some(last) = swings.last() else {
            swings.push(candidate);
            return;
        };

        if self.policy == SwingPolicy::Alternating && last.kind == candidate.kind {
            trace!(
                index = candidate.index,
                kind = ?candidate.kind,
                "rejected consecutive same-kind swing"
            );
            return;
        }

        // Non-positive reference price cannot anchor a relative move;
        // accept rather than divide by zero.
        if last.price > 0.0 {
            let moved = (candidate.price - last.price).abs() / last.price;
            if moved < self.min_move.get() {
                trace!(
                    index = candidate.index,
                    moved,
                    "rejected swing below minimum move"
                );
                return;
            }
        }

        swings.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    /// Bars with controllable highs over a flat floor of lows
    fn bars_from_highs(highs: &[f64]) -> Vec<Candle> {
        highs
            .iter()
            .map(|&h| Candle::new(0.5, h, 0.0, 0.5))
            .collect()
    }

    fn detector(lookback: usize, min_move: f64, policy: SwingPolicy) -> SwingDetector {
        SwingDetector::new(
            Period::new(lookback).unwrap(),
            Fraction::new(min_move).unwrap(),
            policy,
        )
    }

    #[test]
    fn consecutive_highs_allowed_unconstrained() {
        // Highs [1,5,2,6,3] over flat lows: swing highs at index 1 and 3,
        // no swing lows (flat lows never strictly undercut neighbors).
        let bars = bars_from_highs(&[1.0, 5.0, 2.0, 6.0, 3.0]);
        let swings = detector(1, 0.0, SwingPolicy::Unconstrained).detect(&bars);

        assert_eq!(swings.len(), 2);
        assert_eq!(swings[0].index, 1);
        assert_eq!(swings[0].price, 5.0);
        assert_eq!(swings[0].kind, SwingKind::High);
        assert_eq!(swings[1].index, 3);
        assert_eq!(swings[1].price, 6.0);
        assert_eq!(swings[1].kind, SwingKind::High);
    }

    #[test]
    fn consecutive_highs_rejected_alternating() {
        let bars = bars_from_highs(&[1.0, 5.0, 2.0, 6.0, 3.0]);
        let swings = detector(1, 0.0, SwingPolicy::Alternating).detect(&bars);

        assert_eq!(swings.len(), 1);
        assert_eq!(swings[0].index, 1);
        assert_eq!(swings[0].price, 5.0);
    }

    #[test]
    fn min_move_filters_noise() {
        // Second high moves only 1% from the first; 5% filter drops it.
        let bars = bars_from_highs(&[1.0, 100.0, 2.0, 101.0, 3.0]);
        let swings = detector(1, 0.05, SwingPolicy::Unconstrained).detect(&bars);
        assert_eq!(swings.len(), 1);

        // A 10% move passes.
        let bars = bars_from_highs(&[1.0, 100.0, 2.0, 110.0, 3.0]);
        let swings = detector(1, 0.05, SwingPolicy::Unconstrained).detect(&bars);
        assert_eq!(swings.len(), 2);
    }

    #[test]
    fn first_swing_always_accepted() {
        let bars = bars_from_highs(&[1.0, 5.0, 2.0]);
        // Even with an impossible min_move the first extremum is retained.
        let swings = detector(1, 1.0, SwingPolicy::Alternating).detect(&bars);
        assert_eq!(swings.len(), 1);
    }

    #[test]
    fn short_series_yields_nothing() {
        let bars = bars_from_highs(&[1.0, 5.0]);
        let swings = SwingDetector::default().detect(&bars);
        assert!(swings.is_empty());
    }

    #[test]
    fn alternating_zigzag() {
        // Zigzag both in highs and lows: alternation must hold.
        let candles: Vec<Candle> = [
            (10.0, 11.0, 9.0),
            (12.0, 15.0, 11.0), // swing high
            (11.0, 12.0, 10.0),
            (9.0, 10.0, 5.0), // swing low
            (10.0, 12.0, 9.0),
            (13.0, 18.0, 12.0), // swing high
            (12.0, 13.0, 11.0),
        ]
        .iter()
        .map(|&(o, h, l)| Candle::new(o, h, l, o))
        .collect();

        let swings = detector(1, 0.0, SwingPolicy::Alternating).detect(&candles);
        assert!(swings.len() >= 2);
        for pair in swings.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
        }
    }
}
