//! Harmonic price pattern detection.
//!
//! A harmonic candidate is built from exactly five consecutive alternating
//! swings labeled X, A, B, C, D. Validity requires the Fibonacci
//! retracement/extension ratios between legs to fall inside the tolerance
//! band of a known archetype (Gartley, Bat, Butterfly, Crab). Confidence
//! reflects how centrally each ratio sits within its band: 100 at the band
//! midpoint, falling linearly to 60 at the edge, averaged across the
//! checked ratios.

use std::cmp::Ordering;

use tracing::trace;

use crate::{Swing, SwingKind};

// ============================================================
// ARCHETYPE RATIO BANDS
// ============================================================
// Canonical ratios from standard harmonic-trading references: Gartley's
// original 0.618/0.786 retracements and the Bat/Crab refinements with the
// 0.886 and 1.618 terminal ratios. Each band carries the classic "ideal"
// ratio used for PRZ projection.

/// Tolerance band for a single leg ratio
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RatioBand {
    pub min: f64,
    pub max: f64,
    /// Classic textbook ratio, used for PRZ projection
    pub ideal: f64,
}

impl RatioBand {
    pub const fn new(min: f64, max: f64, ideal: f64) -> Self {
        Self { min, max, ideal }
    }

    #[inline]
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }

    /// Confidence contribution of a ratio inside this band: 100 at the band
    /// midpoint, 60 at either edge.
    pub fn score(&self, ratio: f64) -> f64 {
        let half = (self.max - self.min) / 2.0;
        if half <= 0.0 {
            return 100.0;
        }
        let mid = (self.min + self.max) / 2.0;
        let distance = ((ratio - mid).abs() / half).min(1.0);
        100.0 - 40.0 * distance
    }
}

/// Named harmonic pattern shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Archetype {
    Gartley,
    Bat,
    Butterfly,
    Crab,
}

impl Archetype {
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Gartley => "Gartley",
            Archetype::Bat => "Bat",
            Archetype::Butterfly => "Butterfly",
            Archetype::Crab => "Crab",
        }
    }
}

/// Ratio constraints defining one archetype
#[derive(Debug, Clone, Copy)]
pub struct ArchetypeSpec {
    pub archetype: Archetype,
    /// B retracement of the XA leg
    pub b_xa: RatioBand,
    /// C retracement of the AB leg
    pub c_ab: RatioBand,
    /// D retracement/extension of the XA leg
    pub d_xa: RatioBand,
    /// CD extension of the BC leg
    pub cd_bc: RatioBand,
}

/// C retraces 0.382–0.886 of AB in every archetype
const C_AB: RatioBand = RatioBand::new(0.382, 0.886, 0.618);

pub const ARCHETYPE_SPECS: [ArchetypeSpec; 4] = [
    ArchetypeSpec {
        archetype: Archetype::Gartley,
        b_xa: RatioBand::new(0.568, 0.668, 0.618),
        c_ab: C_AB,
        d_xa: RatioBand::new(0.736, 0.836, 0.786),
        cd_bc: RatioBand::new(1.13, 1.618, 1.272),
    },
    ArchetypeSpec {
        archetype: Archetype::Bat,
        b_xa: RatioBand::new(0.382, 0.50, 0.441),
        c_ab: C_AB,
        d_xa: RatioBand::new(0.836, 0.936, 0.886),
        cd_bc: RatioBand::new(1.618, 2.618, 2.0),
    },
    ArchetypeSpec {
        archetype: Archetype::Butterfly,
        b_xa: RatioBand::new(0.736, 0.836, 0.786),
        c_ab: C_AB,
        d_xa: RatioBand::new(1.17, 1.37, 1.272),
        cd_bc: RatioBand::new(1.618, 2.24, 2.0),
    },
    ArchetypeSpec {
        archetype: Archetype::Crab,
        b_xa: RatioBand::new(0.382, 0.618, 0.50),
        c_ab: C_AB,
        d_xa: RatioBand::new(1.518, 1.718, 1.618),
        cd_bc: RatioBand::new(2.24, 3.618, 2.618),
    },
];

/// Target levels as retracements of the CD leg projected from D
const TARGET_RATIOS: [f64; 3] = [0.382, 0.618, 1.0];

/// Stop distance beyond the far PRZ boundary, as a fraction of PRZ width
const STOP_BUFFER: f64 = 0.236;

// ============================================================
// PATTERN TYPES
// ============================================================

/// Trade direction implied by the pattern's terminal point
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Lifecycle of a scanned pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PatternStatus {
    Forming,
    Completed,
    Confirmed,
}

/// Potential Reversal Zone: the band where the D point is expected to
/// complete, spanned by the governing ratio projections
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Prz {
    pub low: f64,
    pub high: f64,
}

impl Prz {
    #[inline]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// The five labeled swing coordinates of a candidate
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternPoints {
    pub x: Swing,
    pub a: Swing,
    pub b: Swing,
    pub c: Swing,
    pub d: Swing,
}

/// A validated harmonic pattern candidate
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HarmonicPattern {
    pub archetype: Archetype,
    pub side: TradeSide,
    /// 0–100; at least 60 for any candidate surviving ratio checks
    pub confidence: f64,
    pub status: PatternStatus,
    pub prz: Prz,
    /// Ordered target levels, nearest first
    pub targets: Vec<f64>,
    pub stop_loss: f64,
    pub points: PatternPoints,
}

impl HarmonicPattern {
    /// Reclassify as confirmed once a close crosses point C in the trade
    /// direction. Idempotent: an already-confirmed pattern is unchanged.
    pub fn confirm(&mut self, close: f64) {
        if self.status == PatternStatus::Confirmed {
            return;
        }
        let through_c = match self.side {
            TradeSide::Buy => close > self.points.c.price,
            TradeSide::Sell => close < self.points.c.price,
        };
        if through_c {
            self.status = PatternStatus::Confirmed;
        }
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Evaluates a single five-swing window against every archetype.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicEngine;

impl HarmonicEngine {
    /// Validate a five-swing window as a harmonic candidate.
    ///
    /// Returns the best-scoring archetype match, or `None` when the window
    /// is not five alternating swings or no archetype's ratio bands all
    /// contain the measured ratios.
    pub fn evaluate(&self, window: &[Swing]) -> Option<HarmonicPattern> {
        if window.len() != 5 {
            return None;
        }
        if window.windows(2).any(|pair| pair[0].kind == pair[1].kind) {
            return None;
        }

        let [x, a, b, c, d] = [window[0], window[1], window[2], window[3], window[4]];

        let xa = (a.price - x.price).abs();
        let ab = (b.price - a.price).abs();
        let bc = (c.price - b.price).abs();
        let cd = (d.price - c.price).abs();
        if xa <= 0.0 || ab <= 0.0 || bc <= 0.0 {
            return None;
        }

        let b_xa = ab / xa;
        let c_ab = bc / ab;
        let d_xa = (d.price - a.price).abs() / xa;
        let cd_bc = cd / bc;

        let best = ARCHETYPE_SPECS
            .iter()
            .filter(|spec| {
                spec.b_xa.contains(b_xa)
                    && spec.c_ab.contains(c_ab)
                    && spec.d_xa.contains(d_xa)
                    && spec.cd_bc.contains(cd_bc)
            })
            .map(|spec| {
                let confidence = (spec.b_xa.score(b_xa)
                    + spec.c_ab.score(c_ab)
                    + spec.d_xa.score(d_xa)
                    + spec.cd_bc.score(cd_bc))
                    / 4.0;
                (spec, confidence)
            })
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))?;

        let (spec, confidence) = best;

        let side = if d.kind == SwingKind::Low {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };

        // PRZ: the interval between the two governing D projections — the
        // ideal XA retracement/extension from A and the ideal BC extension
        // from C.
        let toward_d_from_a = (d.price - a.price).signum();
        let toward_d_from_c = (d.price - c.price).signum();
        let from_xa = a.price + toward_d_from_a * spec.d_xa.ideal * xa;
        let from_bc = c.price + toward_d_from_c * spec.cd_bc.ideal * bc;
        let prz = Prz {
            low: from_xa.min(from_bc),
            high: from_xa.max(from_bc),
        };

        let targets: Vec<f64> = TARGET_RATIOS
            .iter()
            .map(|r| match side {
                TradeSide::Buy => d.price + r * cd,
                TradeSide::Sell => d.price - r * cd,
            })
            .collect();

        let stop_loss = match side {
            TradeSide::Buy => prz.low - STOP_BUFFER * prz.width(),
            TradeSide::Sell => prz.high + STOP_BUFFER * prz.width(),
        };

        trace!(
            archetype = spec.archetype.name(),
            confidence,
            "harmonic candidate"
        );

        Some(HarmonicPattern {
            archetype: spec.archetype,
            side,
            confidence,
            status: PatternStatus::Forming,
            prz,
            targets,
            stop_loss,
            points: PatternPoints { x, a, b, c, d },
        })
    }
}

// ============================================================
// SCANNER
// ============================================================

/// Slides a five-swing window across the swing sequence and labels
/// surviving candidates by confidence.
#[derive(Debug, Clone)]
pub struct HarmonicScanner {
    pub engine: HarmonicEngine,
    /// Candidates below this confidence are discarded
    pub forming_threshold: f64,
    /// Candidates at or above this confidence are labeled completed
    pub completed_threshold: f64,
}

impl Default for HarmonicScanner {
    fn default() -> Self {
        Self {
            engine: HarmonicEngine,
            forming_threshold: 60.0,
            completed_threshold: 90.0,
        }
    }
}

impl HarmonicScanner {
    /// Scan the swing sequence, returning candidates sorted by confidence
    /// descending.
    pub fn scan(&self, swings: &[Swing]) -> Vec<HarmonicPattern> {
        let mut patterns: Vec<HarmonicPattern> = swings
            .windows(5)
            .filter_map(|window| self.engine.evaluate(window))
            .filter(|p| p.confidence >= self.forming_threshold)
            .map(|mut p| {
                p.status = if p.confidence >= self.completed_threshold {
                    PatternStatus::Completed
                } else {
                    PatternStatus::Forming
                };
                p
            })
            .collect();

        patterns.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        patterns
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn swing(index: usize, price: f64, kind: SwingKind) -> Swing {
        Swing { index, price, kind }
    }

    /// Textbook bullish Gartley: X low, A high, B, C, D at classic ratios.
    fn bullish_gartley() -> Vec<Swing> {
        let x = 100.0;
        let a = 200.0; // XA = 100
        let b = a - 0.618 * 100.0; // 138.2
        let c = b + 0.618 * (a - b); // 176.39
        let d = a - 0.786 * 100.0; // 121.4
        vec![
            swing(0, x, SwingKind::Low),
            swing(5, a, SwingKind::High),
            swing(9, b, SwingKind::Low),
            swing(14, c, SwingKind::High),
            swing(20, d, SwingKind::Low),
        ]
    }

    #[test]
    fn gartley_detected() {
        let pattern = HarmonicEngine.evaluate(&bullish_gartley()).unwrap();
        assert_eq!(pattern.archetype, Archetype::Gartley);
        assert_eq!(pattern.side, TradeSide::Buy);
        assert!(pattern.confidence >= 90.0, "got {}", pattern.confidence);
        assert!(pattern.prz.low <= pattern.points.d.price + 1.0);
        assert_eq!(pattern.targets.len(), 3);
        assert!(pattern.stop_loss < pattern.prz.low);
        // Targets ascend away from D for a buy.
        assert!(pattern.targets[0] < pattern.targets[1]);
        assert!(pattern.targets[1] < pattern.targets[2]);
    }

    #[test]
    fn bearish_pattern_sells() {
        // Mirror the Gartley around 300 so D lands on a swing high.
        let mirrored: Vec<Swing> = bullish_gartley()
            .into_iter()
            .map(|s| Swing {
                index: s.index,
                price: 300.0 - s.price,
                kind: match s.kind {
                    SwingKind::High => SwingKind::Low,
                    SwingKind::Low => SwingKind::High,
                },
            })
            .collect();

        let pattern = HarmonicEngine.evaluate(&mirrored).unwrap();
        assert_eq!(pattern.archetype, Archetype::Gartley);
        assert_eq!(pattern.side, TradeSide::Sell);
        assert!(pattern.stop_loss > pattern.prz.high);
        assert!(pattern.targets[0] > pattern.targets[1]);
    }

    #[test]
    fn non_alternating_window_rejected() {
        let mut swings = bullish_gartley();
        swings[1].kind = SwingKind::Low;
        assert!(HarmonicEngine.evaluate(&swings).is_none());
    }

    #[test]
    fn ratio_mismatch_rejected() {
        // Collapse B onto A: AB leg ratio near zero matches nothing.
        let mut swings = bullish_gartley();
        swings[2].price = swings[1].price - 1.0;
        assert!(HarmonicEngine.evaluate(&swings).is_none());
    }

    #[test]
    fn confidence_within_bounds() {
        let pattern = HarmonicEngine.evaluate(&bullish_gartley()).unwrap();
        assert!(pattern.confidence >= 0.0 && pattern.confidence <= 100.0);
        // Surviving ratio checks implies at least the band-edge score.
        assert!(pattern.confidence >= 60.0);
    }

    #[test]
    fn scanner_labels_and_sorts() {
        // Embed the Gartley in a longer alternating sequence.
        let mut swings = vec![
            swing(0, 90.0, SwingKind::High),
            swing(1, 50.0, SwingKind::Low),
            swing(2, 95.0, SwingKind::High),
        ];
        let offset = swings.len();
        swings.extend(bullish_gartley().into_iter().enumerate().map(|(i, mut s)| {
            s.index = offset + i * 3;
            s
        }));
        // The seed prefix ends High and the Gartley starts Low: alternation
        // holds across the seam.
        for pair in swings.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
        }

        let patterns = HarmonicScanner::default().scan(&swings);
        assert!(!patterns.is_empty());
        for pattern in &patterns {
            assert!(pattern.confidence >= 60.0);
            match pattern.status {
                PatternStatus::Completed => assert!(pattern.confidence >= 90.0),
                PatternStatus::Forming => assert!(pattern.confidence < 90.0),
                PatternStatus::Confirmed => panic!("scanner never confirms"),
            }
        }
        for pair in patterns.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn confirm_is_idempotent() {
        let mut pattern = HarmonicEngine.evaluate(&bullish_gartley()).unwrap();
        let c = pattern.points.c.price;

        pattern.confirm(c - 1.0); // not through C for a buy
        assert_ne!(pattern.status, PatternStatus::Confirmed);

        pattern.confirm(c + 1.0);
        assert_eq!(pattern.status, PatternStatus::Confirmed);

        pattern.confirm(c - 1.0); // stays confirmed
        assert_eq!(pattern.status, PatternStatus::Confirmed);
    }

    #[test]
    fn serde_roundtrip() {
        let pattern = HarmonicEngine.evaluate(&bullish_gartley()).unwrap();
        let json = serde_json::to_string(&pattern).unwrap();
        let back: HarmonicPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(pattern, back);
    }
}
