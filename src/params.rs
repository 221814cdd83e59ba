//! Parameter metadata for the detection pipeline
//!
//! This module provides metadata about tunable thresholds, enabling:
//! - Grid search over detector settings
//! - Parameter documentation
//! - Building detectors from externally supplied parameter sets
//!
//! # Example
//!
//! ```rust
//! use marketstruct::params::{swing_params, ParamMeta};
//!
//! for param in swing_params() {
//!     println!("{}: {:?} (default: {})", param.name, param.kind, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{
    swing::{SwingDetector, SwingPolicy},
    Fraction, Period, Result, SignalError,
};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Fraction value in 0.0..=1.0
    Fraction,
    /// Period value (positive integer)
    Period,
    /// Unconstrained positive scalar (e.g. a reward multiple)
    Scalar,
}

/// Metadata for a single tunable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Parameter name (e.g. "min_move")
    pub name: &'static str,
    pub kind: ParamKind,
    /// Default value
    pub default: f64,
    /// Range for optimization: (min, max, step)
    pub range: (f64, f64, f64),
    /// Human-readable description
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn fraction(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Fraction,
            default,
            range,
            description,
        }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Period,
            default,
            range,
            description,
        }
    }

    pub const fn scalar(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Scalar,
            default,
            range,
            description,
        }
    }

    /// Generate all values for grid search
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        let mut values = Vec::new();
        let mut v = min;
        while v <= max + f64::EPSILON {
            values.push(v);
            v += step;
        }
        values
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max, _) = self.range;
        if value < min || value > max {
            return Err(SignalError::OutOfRange {
                field: self.name,
                value,
                min,
                max,
            });
        }
        match self.kind {
            ParamKind::Fraction | ParamKind::Scalar => Ok(()),
            ParamKind::Period => {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(SignalError::InvalidValue(
                        "Period must be a positive integer",
                    ));
                }
                Ok(())
            }
        }
    }
}

// ============================================================
// TUNABLE TABLES
// ============================================================

const SWING_PARAMS: [ParamMeta; 2] = [
    ParamMeta::period(
        "lookback",
        3.0,
        (1.0, 10.0, 1.0),
        "Symmetric extremum window on each side of a candidate swing",
    ),
    ParamMeta::fraction(
        "min_move",
        0.005,
        (0.0, 0.05, 0.005),
        "Minimum relative move versus the last retained swing",
    ),
];

const STRUCTURE_PARAMS: [ParamMeta; 2] = [
    ParamMeta::period(
        "sweep_lookahead",
        3.0,
        (1.0, 10.0, 1.0),
        "Candles examined after a swing for a false breakout",
    ),
    ParamMeta::scalar(
        "risk_reward",
        2.0,
        (1.0, 5.0, 0.5),
        "Reward multiple of the entry-to-stop distance",
    ),
];

const SCANNER_PARAMS: [ParamMeta; 2] = [
    ParamMeta::scalar(
        "forming_threshold",
        60.0,
        (50.0, 80.0, 5.0),
        "Confidence below which harmonic candidates are discarded",
    ),
    ParamMeta::scalar(
        "completed_threshold",
        90.0,
        (80.0, 100.0, 2.5),
        "Confidence at which harmonic candidates are labeled completed",
    ),
];

const PULSE_PARAMS: [ParamMeta; 2] = [
    ParamMeta::period(
        "capacity",
        120.0,
        (30.0, 500.0, 10.0),
        "Rolling pulse history capacity",
    ),
    ParamMeta::period(
        "direction_window",
        6.0,
        (2.0, 20.0, 1.0),
        "Entries sampled for direction confidence",
    ),
];

/// Swing detector tunables
pub fn swing_params() -> &'static [ParamMeta] {
    &SWING_PARAMS
}

/// Structure engine tunables
pub fn structure_params() -> &'static [ParamMeta] {
    &STRUCTURE_PARAMS
}

/// Harmonic scanner tunables
pub fn scanner_params() -> &'static [ParamMeta] {
    &SCANNER_PARAMS
}

/// Pulse tunables
pub fn pulse_params() -> &'static [ParamMeta] {
    &PULSE_PARAMS
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Fraction from params with default fallback
pub fn get_fraction(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Fraction> {
    let value = params.get(key).copied().unwrap_or(default);
    Fraction::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    let value = params.get(key).copied().unwrap_or(default as f64);
    Period::new(value as usize)
}

/// Build a swing detector from a parameter map.
///
/// Missing parameters use their defaults.
pub fn swing_detector_from_params(
    params: &HashMap<&str, f64>,
    policy: SwingPolicy,
) -> Result<SwingDetector> {
    Ok(SwingDetector {
        lookback: get_period(params, "lookback", 3)?,
        min_move: get_fraction(params, "min_move", 0.005)?,
        policy,
    })
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_meta_fraction() {
        let meta = ParamMeta::fraction("test_fraction", 0.5, (0.3, 0.7, 0.1), "Test");

        assert_eq!(meta.name, "test_fraction");
        assert_eq!(meta.kind, ParamKind::Fraction);
        assert_eq!(meta.default, 0.5);
    }

    #[test]
    fn test_generate_grid() {
        let meta = ParamMeta::fraction("test", 0.5, (0.3, 0.7, 0.2), "Test");

        let grid = meta.generate_grid();
        assert_eq!(grid.len(), 3);
        assert!((grid[0] - 0.3).abs() < f64::EPSILON);
        assert!((grid[1] - 0.5).abs() < f64::EPSILON);
        assert!((grid[2] - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_fraction() {
        let meta = ParamMeta::fraction("test", 0.5, (0.3, 0.7, 0.1), "Test");

        assert!(meta.validate(0.5).is_ok());
        assert!(meta.validate(0.3).is_ok());
        assert!(meta.validate(0.7).is_ok());
        assert!(meta.validate(0.2).is_err());
        assert!(meta.validate(0.8).is_err());
    }

    #[test]
    fn test_validate_period() {
        let meta = ParamMeta::period("test", 14.0, (10.0, 20.0, 2.0), "Test");

        assert!(meta.validate(14.0).is_ok());
        assert!(meta.validate(10.0).is_ok());
        assert!(meta.validate(20.0).is_ok());
        assert!(meta.validate(8.0).is_err());
        assert!(meta.validate(22.0).is_err());
        assert!(meta.validate(14.5).is_err());
    }

    #[test]
    fn test_get_fraction_helper() {
        let mut params = HashMap::new();
        params.insert("key1", 0.8);

        assert!((get_fraction(&params, "key1", 0.5).unwrap().get() - 0.8).abs() < f64::EPSILON);
        assert!((get_fraction(&params, "key2", 0.5).unwrap().get() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_period_helper() {
        let mut params = HashMap::new();
        params.insert("key1", 20.0);

        assert_eq!(get_period(&params, "key1", 14).unwrap().get(), 20);
        assert_eq!(get_period(&params, "key2", 14).unwrap().get(), 14);
    }

    #[test]
    fn test_swing_detector_from_params() {
        let mut params = HashMap::new();
        params.insert("lookback", 5.0);

        let detector = swing_detector_from_params(&params, SwingPolicy::Alternating).unwrap();
        assert_eq!(detector.lookback.get(), 5);
        assert!((detector.min_move.get() - 0.005).abs() < f64::EPSILON);

        params.insert("min_move", 2.0); // out of fraction range
        assert!(swing_detector_from_params(&params, SwingPolicy::Alternating).is_err());
    }

    #[test]
    fn test_tunable_tables_have_valid_defaults() {
        for table in [
            swing_params(),
            structure_params(),
            scanner_params(),
            pulse_params(),
        ] {
            for meta in table {
                assert!(meta.validate(meta.default).is_ok(), "param {}", meta.name);
            }
        }
    }
}
