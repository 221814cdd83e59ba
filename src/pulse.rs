//! Live market metrics and the bounded rolling pulse history.
//!
//! `MarketMetrics` is a pure function of a price snapshot. `MarketPulse`
//! owns the only persistent state in the crate: a fixed-capacity rolling
//! history of pulse entries (oldest evicted on overflow) from which speed,
//! acceleration, direction-confidence, and percentile statistics are
//! derived. The pulse is a single-owner value; callers updating it from a
//! periodic background task must wrap it in a mutex.

use std::collections::VecDeque;

use tracing::debug;

// ============================================================
// CONFIGURATION
// ============================================================

/// Thresholds and scales for pulse derivation.
///
/// All values are fixed heuristics; substituting them never changes
/// control flow.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PulseConfig {
    /// Rolling history capacity; oldest entries evicted beyond this
    pub capacity: usize,
    /// Minimum history length before statistics are reported
    pub stats_min_len: usize,
    /// Entries (newest first) sampled for direction confidence
    pub direction_window: usize,
    /// Multiplier applied to the mean absolute inter-entry move
    pub speed_scale: f64,
    /// Multiplier applied to the late-minus-early speed difference
    pub accel_scale: f64,
    /// Below both calm bounds the regime is calm
    pub calm_volatility: f64,
    pub calm_range: f64,
    /// At or above either expansion bound the regime is expansion
    pub expansion_volatility: f64,
    pub expansion_range: f64,
    /// At or above either explosion bound the regime is explosion
    pub explosion_volatility: f64,
    pub explosion_range: f64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            capacity: 120,
            stats_min_len: 10,
            direction_window: 6,
            speed_scale: 25.0,
            accel_scale: 25.0,
            calm_volatility: 25.0,
            calm_range: 2.0,
            expansion_volatility: 50.0,
            expansion_range: 5.0,
            explosion_volatility: 75.0,
            explosion_range: 8.0,
        }
    }
}

/// Weight of |24h change %| in the volatility score
const VOLATILITY_CHANGE_WEIGHT: f64 = 10.0;
/// Weight of daily range % in the volatility score
const VOLATILITY_RANGE_WEIGHT: f64 = 5.0;

// ============================================================
// METRICS
// ============================================================

/// Snapshot-derived market metrics.
///
/// Recomputed per fetch; never stored beyond the pulse entry derived from
/// it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MarketMetrics {
    pub price: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    /// (high - low) / price * 100, forced to 0 for non-positive price or
    /// inverted high/low
    pub range_pct: f64,
    /// Heuristic 0–100 blend of |change %| and range %
    pub volatility_score: f64,
    pub trend_label: &'static str,
    pub volatility_label: &'static str,
}

impl MarketMetrics {
    /// Build metrics from a live price snapshot.
    ///
    /// Malformed fields degrade gracefully: a non-positive price or an
    /// inverted high/low forces range % to zero rather than propagating a
    /// numeric error.
    pub fn build(price: f64, change_pct: f64, high: f64, low: f64) -> Self {
        let range_pct = if price > 0.0 && high >= low {
            (high - low) / price * 100.0
        } else {
            0.0
        };

        let volatility_score = (VOLATILITY_CHANGE_WEIGHT * change_pct.abs()
            + VOLATILITY_RANGE_WEIGHT * range_pct)
            .clamp(0.0, 100.0);

        let trend_label = match change_pct {
            c if c >= 5.0 => "surging",
            c if c >= 1.5 => "rising",
            c if c <= -5.0 => "dumping",
            c if c <= -1.5 => "falling",
            _ => "steady",
        };

        let volatility_label = match volatility_score {
            v if v >= 75.0 => "extreme",
            v if v >= 50.0 => "elevated",
            v if v >= 25.0 => "moderate",
            _ => "quiet",
        };

        Self {
            price,
            change_pct,
            high,
            low,
            range_pct,
            volatility_score,
            trend_label,
            volatility_label,
        }
    }
}

// ============================================================
// PULSE
// ============================================================

/// Coarse volatility regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Regime {
    Calm,
    Normal,
    Expansion,
    Explosion,
}

/// One retained history point
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PulseEntry {
    pub time: i64,
    pub price: f64,
    pub change_pct: f64,
    pub volatility_score: f64,
    pub range_pct: f64,
    pub regime: Regime,
}

/// Rolling statistics over the retained history
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PulseStats {
    pub change_mean: f64,
    pub change_std: f64,
    /// Percentile rank of the latest change % within the history
    pub change_percentile: f64,
    pub volatility_mean: f64,
    pub volatility_std: f64,
    pub volatility_percentile: f64,
    pub range_mean: f64,
    pub range_std: f64,
    pub range_percentile: f64,
}

/// Bounded rolling market pulse.
#[derive(Debug, Clone)]
pub struct MarketPulse {
    config: PulseConfig,
    history: VecDeque<PulseEntry>,
}

impl Default for MarketPulse {
    fn default() -> Self {
        Self::new(PulseConfig::default())
    }
}

impl MarketPulse {
    pub fn new(config: PulseConfig) -> Self {
        let capacity = config.capacity;
        Self {
            config,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn latest(&self) -> Option<&PulseEntry> {
        self.history.back()
    }

    /// The entry immediately preceding the latest one
    pub fn previous(&self) -> Option<&PulseEntry> {
        self.history.iter().rev().nth(1)
    }

    pub fn history(&self) -> impl Iterator<Item = &PulseEntry> {
        self.history.iter()
    }

    /// Append the latest metrics snapshot, evicting the oldest entry once
    /// capacity is reached. Returns the appended entry.
    pub fn update(&mut self, metrics: &MarketMetrics, time: i64) -> PulseEntry {
        let entry = PulseEntry {
            time,
            price: metrics.price,
            change_pct: metrics.change_pct,
            volatility_score: metrics.volatility_score,
            range_pct: metrics.range_pct,
            regime: self.classify_regime(metrics),
        };

        if self.history.len() >= self.config.capacity {
            self.history.pop_front();
        }
        self.history.push_back(entry);

        debug!(
            len = self.history.len(),
            regime = ?entry.regime,
            "pulse updated"
        );

        entry
    }

    /// Classify the volatility regime of a metrics snapshot.
    pub fn classify_regime(&self, metrics: &MarketMetrics) -> Regime {
        let c = &self.config;
        let vol = metrics.volatility_score;
        let range = metrics.range_pct;

        if vol >= c.explosion_volatility || range >= c.explosion_range {
            Regime::Explosion
        } else if vol >= c.expansion_volatility || range >= c.expansion_range {
            Regime::Expansion
        } else if vol < c.calm_volatility && range < c.calm_range {
            Regime::Calm
        } else {
            Regime::Normal
        }
    }

    /// Percent price moves between consecutive history entries
    fn steps(&self) -> Vec<f64> {
        self.history
            .iter()
            .zip(self.history.iter().skip(1))
            .filter(|(prev, _)| prev.price > 0.0)
            .map(|(prev, next)| (next.price - prev.price) / prev.price * 100.0)
            .collect()
    }

    /// Mean absolute inter-entry move, scaled and clamped to [0, 100]
    pub fn speed_index(&self) -> f64 {
        let steps = self.steps();
        if steps.is_empty() {
            return 0.0;
        }
        let mean_abs = steps.iter().map(|s| s.abs()).sum::<f64>() / steps.len() as f64;
        (mean_abs * self.config.speed_scale).clamp(0.0, 100.0)
    }

    /// Late-half minus early-half average speed, scaled and clamped to
    /// [-100, 100]
    pub fn acceleration_index(&self) -> f64 {
        let steps = self.steps();
        if steps.len() < 2 {
            return 0.0;
        }
        let mid = steps.len() / 2;
        let early = steps[..mid].iter().map(|s| s.abs()).sum::<f64>() / mid as f64;
        let late =
            steps[mid..].iter().map(|s| s.abs()).sum::<f64>() / (steps.len() - mid) as f64;
        ((late - early) * self.config.accel_scale).clamp(-100.0, 100.0)
    }

    /// Fraction (0–100) of the most recent entries sharing the latest
    /// entry's sign of change
    pub fn direction_confidence(&self) -> f64 {
        let Some(latest) = self.latest() else {
            return 0.0;
        };
        let sign = latest.change_pct.signum();
        let window: Vec<&PulseEntry> = self
            .history
            .iter()
            .rev()
            .take(self.config.direction_window)
            .collect();
        let agreeing = window
            .iter()
            .filter(|e| e.change_pct.signum() == sign)
            .count();
        agreeing as f64 / window.len() as f64 * 100.0
    }

    /// Rolling statistics, available once the history holds at least
    /// `stats_min_len` entries.
    pub fn stats(&self) -> Option<PulseStats> {
        if self.history.len() < self.config.stats_min_len {
            return None;
        }
        let latest = self.latest()?;

        let (change_mean, change_std) = mean_std(self.history.iter().map(|e| e.change_pct));
        let (volatility_mean, volatility_std) =
            mean_std(self.history.iter().map(|e| e.volatility_score));
        let (range_mean, range_std) = mean_std(self.history.iter().map(|e| e.range_pct));

        Some(PulseStats {
            change_mean,
            change_std,
            change_percentile: percentile_rank(
                self.history.iter().map(|e| e.change_pct),
                latest.change_pct,
            ),
            volatility_mean,
            volatility_std,
            volatility_percentile: percentile_rank(
                self.history.iter().map(|e| e.volatility_score),
                latest.volatility_score,
            ),
            range_mean,
            range_std,
            range_percentile: percentile_rank(
                self.history.iter().map(|e| e.range_pct),
                latest.range_pct,
            ),
        })
    }
}

fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}

/// Midrank percentile of `current` within `values`, as a percentage.
///
/// Ties count half, so a constant series ranks at 50 rather than 100.
fn percentile_rank(values: impl Iterator<Item = f64>, current: f64) -> f64 {
    let mut total = 0usize;
    let mut below = 0usize;
    let mut equal = 0usize;
    for v in values {
        total += 1;
        if v < current {
            below += 1;
        } else if v == current {
            equal += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    (below as f64 + equal as f64 / 2.0) / total as f64 * 100.0
}

// ============================================================
// TESTS
// ============================================================
