//! # marketstruct
//!
//! Market structure, harmonic pattern, and volatility alert detection for
//! OHLC candle data.
//!
//! The crate turns an ordered candle series into swing points, structural
//! break events (BOS/CHoCH), liquidity sweeps, entry models, harmonic
//! pattern candidates with confidence scoring, and a composite market
//! "pulse"/alert classification with an adaptive polling cadence.
//!
//! ## Quick Start
//!
//! ```rust
//! use marketstruct::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! let analyzer = StructureAnalyzer::default();
//! let bars: Vec<Bar> = vec![];
//! let report = analyzer.analyze(&bars).unwrap();
//! assert!(report.swings.is_empty());
//! ```

pub mod alert;
pub mod backtest;
pub mod harmonic;
pub mod params;
pub mod pulse;
pub mod structure;
pub mod swing;

pub mod prelude {
    pub use crate::{
        alert::{
            classify_alert, recommended_interval, AlertClassification, AlertConfig, AlertLevel,
            InstitutionalEvents, MarketSnapshot, RiskAssessment, RiskLevel, TrendBias,
        },
        analyze_parallel,
        backtest::{backtest_patterns, BacktestResult, TradeOutcome},
        harmonic::{
            Archetype, HarmonicEngine, HarmonicPattern, HarmonicScanner, PatternStatus, TradeSide,
        },
        params::{get_fraction, get_period, ParamKind, ParamMeta},
        pulse::{MarketMetrics, MarketPulse, PulseConfig, PulseEntry, PulseStats, Regime},
        structure::{
            detect_bos, detect_choch, detect_entry_models, detect_liquidity_sweeps, EntryModel,
            LiquiditySweep, StructureEvent, StructureKind,
        },
        swing::{SwingDetector, SwingPolicy},
        AnalyzeError, Candle, Direction, Fraction, OHLCVExt, Period, Result, SignalError,
        StructureAnalyzer, StructureReport, Swing, SwingKind, SymbolReport, OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors that can occur while configuring or running the detectors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} candles, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized fraction in range 0.0..=1.0 (e.g. a minimum relative move)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Fraction(f64);

impl Fraction {
    /// Create a new Fraction, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(SignalError::InvalidValue(
                "Fraction cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SignalError::OutOfRange {
                field: "Fraction",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Fraction from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Fraction {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Fraction {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Fraction::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in candles (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SignalError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_wick(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_wick(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(SignalError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Owned candle record for callers holding plain data.
///
/// Immutable once constructed; chronological position is the index in the
/// containing slice.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume: 0.0,
            timestamp: None,
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

// ============================================================
// SHARED ENTITIES
// ============================================================

/// Direction of a structural event or trade signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// The opposite direction
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

/// Kind of swing extremum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A local price extremum surviving noise filtering.
///
/// `index` is the position in the source candle sequence.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Swing {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

impl Swing {
    #[inline]
    pub fn is_high(&self) -> bool {
        matches!(self.kind, SwingKind::High)
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        matches!(self.kind, SwingKind::Low)
    }
}

// ============================================================
// STRUCTURE ANALYZER
// ============================================================

use crate::{
    harmonic::{HarmonicPattern, HarmonicScanner},
    structure::{EntryModel, LiquiditySweep, StructureEvent},
    swing::SwingDetector,
};

/// Full per-symbol analysis of a candle series
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StructureReport {
    pub swings: Vec<Swing>,
    pub bos: Vec<StructureEvent>,
    pub choch: Option<StructureEvent>,
    pub sweeps: Vec<LiquiditySweep>,
    pub entries: Vec<EntryModel>,
    pub patterns: Vec<HarmonicPattern>,
}

/// One-call façade over the detection pipeline.
///
/// Each stage is also available as a standalone function; the analyzer just
/// wires them together with a shared configuration. All stages are pure and
/// restartable — the analyzer holds no state between calls.
#[derive(Debug, Clone)]
pub struct StructureAnalyzer {
    pub swing: SwingDetector,
    pub scanner: HarmonicScanner,
    /// Candles examined after each swing for a false breakout
    pub sweep_lookahead: Period,
    /// Reward multiple applied to entry-to-stop distance
    pub risk_reward: f64,
    /// Reject malformed bars (NaN, high < low) before analysis
    pub validate_data: bool,
}

impl Default for StructureAnalyzer {
    fn default() -> Self {
        Self {
            swing: SwingDetector::default(),
            scanner: HarmonicScanner::default(),
            sweep_lookahead: Period::new_const(3),
            risk_reward: 2.0,
            validate_data: false,
        }
    }
}

impl StructureAnalyzer {
    /// Run the full pipeline over one candle series.
    ///
    /// Insufficient data yields empty result collections, never an error;
    /// `Err` is only possible with `validate_data` enabled.
    pub fn analyze<T: OHLCV>(&self, candles: &[T]) -> Result<StructureReport> {
        if self.validate_data {
            for (i, bar) in candles.iter().enumerate() {
                bar.validate().map_err(|e| match e {
                    SignalError::InvalidOHLCV { reason, .. } => {
                        SignalError::InvalidOHLCV { index: i, reason }
                    }
                    other => other,
                })?;
            }
        }

        let swings = self.swing.detect(candles);
        let bos = structure::detect_bos(&swings);
        let choch = structure::detect_choch(&swings, &bos);
        let sweeps = structure::detect_liquidity_sweeps(candles, &swings, self.sweep_lookahead);
        let entries = structure::detect_entry_models(
            candles,
            &swings,
            choch.as_slice(),
            &sweeps,
            &bos,
            self.risk_reward,
        );
        let patterns = self.scanner.scan(&swings);

        tracing::debug!(
            swings = swings.len(),
            bos = bos.len(),
            sweeps = sweeps.len(),
            entries = entries.len(),
            patterns = patterns.len(),
            "structure analysis complete"
        );

        Ok(StructureReport {
            swings,
            bos,
            choch,
            sweeps,
            entries,
            patterns,
        })
    }
}

// ============================================================
// PARALLEL BATCH ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single symbol
#[derive(Debug)]
pub struct SymbolReport {
    pub symbol: String,
    pub report: StructureReport,
}

/// Error from analyzing a single symbol
#[derive(Debug)]
pub struct AnalyzeError {
    pub symbol: String,
    pub error: SignalError,
}

/// Analyze multiple symbols in parallel.
///
/// Each symbol's candle series is processed independently; failures do not
/// abort the batch.
pub fn analyze_parallel<'a, T, I>(
    analyzer: &StructureAnalyzer,
    symbols: I,
) -> (Vec<SymbolReport>, Vec<AnalyzeError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = symbols
        .into_par_iter()
        .map(|(symbol, candles)| {
            analyzer
                .analyze(candles)
                .map(|report| SymbolReport {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| AnalyzeError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
