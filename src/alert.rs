//! Composite alert classification.
//!
//! Pure boolean-rule event detection, a banded risk score, and a weighted
//! "shock" score combining every pulse signal into a single alert level
//! with an adaptive refresh interval. No state beyond the pulse history the
//! caller already owns.

use tracing::debug;

use crate::pulse::{MarketMetrics, MarketPulse, PulseEntry, PulseStats, Regime};

// ============================================================
// RISK
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Banded heuristic risk read of the current metrics
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RiskAssessment {
    /// |change %| + 0.4 × volatility score
    pub score: f64,
    pub level: RiskLevel,
    pub recommendation: &'static str,
}

/// Volatility contribution to the risk score
const RISK_VOLATILITY_WEIGHT: f64 = 0.4;

impl RiskAssessment {
    pub fn evaluate(metrics: &MarketMetrics) -> Self {
        let score = metrics.change_pct.abs() + RISK_VOLATILITY_WEIGHT * metrics.volatility_score;
        let (level, recommendation) = match score {
            s if s >= 50.0 => (RiskLevel::High, "defensive: wait for volatility to settle"),
            s if s >= 25.0 => (RiskLevel::Medium, "tighten stops and reduce position size"),
            _ => (RiskLevel::Low, "normal monitoring"),
        };
        Self {
            score,
            level,
            recommendation,
        }
    }
}

// ============================================================
// INSTITUTIONAL EVENTS
// ============================================================

/// Boolean flags for institutional-style market events, with
/// human-readable reason labels
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct InstitutionalEvents {
    pub volatility_explosion: bool,
    pub momentum_spike_up: bool,
    pub momentum_spike_down: bool,
    pub liquidity_shock: bool,
    pub regime_switch: bool,
    pub reasons: Vec<String>,
}

impl InstitutionalEvents {
    /// Evaluate the fixed threshold combinations against the current
    /// metrics, pulse, and risk read.
    pub fn detect(pulse: &MarketPulse, metrics: &MarketMetrics, risk: &RiskAssessment) -> Self {
        let mut events = Self::default();
        let speed = pulse.speed_index();

        if metrics.volatility_score >= 80.0
            && metrics.range_pct >= 6.0
            && risk.level != RiskLevel::Low
        {
            events.volatility_explosion = true;
            events.reasons.push(format!(
                "volatility explosion (score {:.0}, range {:.1}%)",
                metrics.volatility_score, metrics.range_pct
            ));
        }

        if metrics.change_pct >= 4.0 && speed >= 50.0 {
            events.momentum_spike_up = true;
            events.reasons.push(format!(
                "upward momentum spike (+{:.1}% at speed {:.0})",
                metrics.change_pct, speed
            ));
        }

        if metrics.change_pct <= -4.0 && speed >= 50.0 {
            events.momentum_spike_down = true;
            events.reasons.push(format!(
                "downward momentum spike ({:.1}% at speed {:.0})",
                metrics.change_pct, speed
            ));
        }

        // Wide travel with no net displacement: stop-hunting churn.
        if metrics.range_pct >= 8.0 && metrics.change_pct.abs() <= 1.5 {
            events.liquidity_shock = true;
            events
                .reasons
                .push(format!("liquidity shock ({:.1}% range)", metrics.range_pct));
        }

        if let (Some(latest), Some(previous)) = (pulse.latest(), pulse.previous()) {
            if latest.regime != previous.regime {
                events.regime_switch = true;
                events.reasons.push(format!(
                    "regime switch {:?} -> {:?}",
                    previous.regime, latest.regime
                ));
            }
        }

        events
    }

    /// Number of active event flags
    pub fn active_count(&self) -> usize {
        [
            self.volatility_explosion,
            self.momentum_spike_up,
            self.momentum_spike_down,
            self.liquidity_shock,
            self.regime_switch,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count()
    }
}

// ============================================================
// ALERT CLASSIFIER
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrendBias {
    Bull,
    Bear,
    Neutral,
}

/// Weights and thresholds of the shock-score classifier.
///
/// The eight sub-score weights sum to 1.0; substituting any value never
/// changes control flow.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AlertConfig {
    pub change_weight: f64,
    pub volatility_weight: f64,
    pub range_weight: f64,
    pub speed_weight: f64,
    pub acceleration_weight: f64,
    pub risk_weight: f64,
    pub event_weight: f64,
    /// Weight of the percentile-extremity refinement (change and
    /// volatility ranks folded together)
    pub percentile_weight: f64,
    pub explosion_boost: f64,
    pub expansion_boost: f64,
    /// Applied when two or more institutional events are active
    pub multi_event_boost: f64,
    pub high_risk_boost: f64,
    pub medium_risk_boost: f64,
    /// Band edges: below medium_edge is low, and so on upward
    pub medium_edge: f64,
    pub high_edge: f64,
    pub critical_edge: f64,
    /// Minimum |change %| for a non-neutral trend bias
    pub bias_min_change: f64,
    /// Minimum direction confidence for a non-neutral trend bias
    pub bias_min_confidence: f64,
    pub max_reasons: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            change_weight: 0.18,
            volatility_weight: 0.15,
            range_weight: 0.12,
            speed_weight: 0.13,
            acceleration_weight: 0.10,
            risk_weight: 0.12,
            event_weight: 0.10,
            percentile_weight: 0.10,
            explosion_boost: 8.0,
            expansion_boost: 3.0,
            multi_event_boost: 6.0,
            high_risk_boost: 6.0,
            medium_risk_boost: 2.5,
            medium_edge: 35.0,
            high_edge: 55.0,
            critical_edge: 75.0,
            bias_min_change: 0.2,
            bias_min_confidence: 45.0,
            max_reasons: 6,
        }
    }
}

/// Composite alert classification: a pure function of the current signals
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AlertClassification {
    pub level: AlertLevel,
    /// 0–100 weighted composite
    pub shock_score: f64,
    pub trend_bias: TrendBias,
    pub reasons: Vec<String>,
}

/// Classify with the default configuration.
pub fn classify_alert(
    pulse: &MarketPulse,
    metrics: &MarketMetrics,
    risk: &RiskAssessment,
    events: &InstitutionalEvents,
) -> AlertClassification {
    classify_alert_with(&AlertConfig::default(), pulse, metrics, risk, events)
}

/// Classify the alert level from the weighted shock score.
pub fn classify_alert_with(
    config: &AlertConfig,
    pulse: &MarketPulse,
    metrics: &MarketMetrics,
    risk: &RiskAssessment,
    events: &InstitutionalEvents,
) -> AlertClassification {
    let change_score = (metrics.change_pct.abs() * 10.0).min(100.0);
    let range_score = (metrics.range_pct * 10.0).min(100.0);
    let speed_score = pulse.speed_index();
    let accel_score = pulse.acceleration_index().abs();
    let risk_score = risk.score.min(100.0);
    let event_score = (events.active_count() as f64 * 25.0).min(100.0);
    let percentile_score = pulse.stats().map_or(0.0, percentile_extremity);

    let weighted = config.change_weight * change_score
        + config.volatility_weight * metrics.volatility_score
        + config.range_weight * range_score
        + config.speed_weight * speed_score
        + config.acceleration_weight * accel_score
        + config.risk_weight * risk_score
        + config.event_weight * event_score
        + config.percentile_weight * percentile_score;

    let regime = pulse.latest().map(|e| e.regime);
    let mut boosted = weighted;
    match regime {
        Some(Regime::Explosion) => boosted += config.explosion_boost,
        Some(Regime::Expansion) => boosted += config.expansion_boost,
        _ => {}
    }
    if events.active_count() >= 2 {
        boosted += config.multi_event_boost;
    }
    match risk.level {
        RiskLevel::High => boosted += config.high_risk_boost,
        RiskLevel::Medium => boosted += config.medium_risk_boost,
        RiskLevel::Low => {}
    }

    let shock_score = boosted.clamp(0.0, 100.0);
    let level = match shock_score {
        s if s >= config.critical_edge => AlertLevel::Critical,
        s if s >= config.high_edge => AlertLevel::High,
        s if s >= config.medium_edge => AlertLevel::Medium,
        _ => AlertLevel::Low,
    };

    let trend_bias = if metrics.change_pct.abs() > config.bias_min_change
        && pulse.direction_confidence() >= config.bias_min_confidence
    {
        if metrics.change_pct > 0.0 {
            TrendBias::Bull
        } else {
            TrendBias::Bear
        }
    } else {
        TrendBias::Neutral
    };

    let mut reasons = Vec::new();
    match regime {
        Some(Regime::Explosion) => reasons.push("explosive volatility regime".to_string()),
        Some(Regime::Expansion) => reasons.push("expanding volatility regime".to_string()),
        _ => {}
    }
    if risk.level != RiskLevel::Low {
        reasons.push(format!("risk {:?} (score {:.0})", risk.level, risk.score));
    }
    reasons.extend(events.reasons.iter().cloned());
    if change_score >= 50.0 {
        reasons.push(format!("24h change {:+.1}%", metrics.change_pct));
    }
    reasons.truncate(config.max_reasons);

    debug!(shock_score, level = ?level, "alert classified");

    AlertClassification {
        level,
        shock_score,
        trend_bias,
        reasons,
    }
}

/// How far the change and volatility percentile ranks sit from the median,
/// averaged, on a 0–100 scale
fn percentile_extremity(stats: PulseStats) -> f64 {
    let change = (stats.change_percentile - 50.0).abs() * 2.0;
    let volatility = (stats.volatility_percentile - 50.0).abs() * 2.0;
    (change + volatility) / 2.0
}

// ============================================================
// ADAPTIVE INTERVAL
// ============================================================

/// Base polling interval in seconds per alert level
const INTERVAL_CRITICAL: u64 = 60;
const INTERVAL_HIGH: u64 = 120;
const INTERVAL_MEDIUM: u64 = 180;
const INTERVAL_LOW: u64 = 240;

/// Recommended polling interval in seconds for an alert level, tightened
/// further by the volatility regime.
pub fn recommended_interval(level: AlertLevel, regime: Regime) -> u64 {
    let base = match level {
        AlertLevel::Critical => INTERVAL_CRITICAL,
        AlertLevel::High => INTERVAL_HIGH,
        AlertLevel::Medium => INTERVAL_MEDIUM,
        AlertLevel::Low => INTERVAL_LOW,
    };
    match regime {
        Regime::Explosion => base.saturating_sub(30).max(45),
        Regime::Expansion => base.saturating_sub(15).max(60),
        _ => base,
    }
}

// ============================================================
// SNAPSHOT ASSEMBLY
// ============================================================

/// Everything the presentation layer needs for one update cycle
#[derive(Debug, Clone, serde::Serialize)]
pub struct MarketSnapshot {
    pub metrics: MarketMetrics,
    pub entry: PulseEntry,
    pub stats: Option<PulseStats>,
    pub risk: RiskAssessment,
    pub events: InstitutionalEvents,
    pub alert: AlertClassification,
    /// Seconds until the next poll
    pub refresh_secs: u64,
}

impl MarketSnapshot {
    /// Run one full update cycle: build metrics, extend the pulse, and
    /// classify.
    pub fn assemble(
        pulse: &mut MarketPulse,
        price: f64,
        change_pct: f64,
        high: f64,
        low: f64,
        time: i64,
    ) -> Self {
        let metrics = MarketMetrics::build(price, change_pct, high, low);
        let entry = pulse.update(&metrics, time);
        let risk = RiskAssessment::evaluate(&metrics);
        let events = InstitutionalEvents::detect(pulse, &metrics, &risk);
        let alert = classify_alert(pulse, &metrics, &risk, &events);
        let refresh_secs = recommended_interval(alert.level, entry.regime);

        Self {
            metrics,
            entry,
            stats: pulse.stats(),
            risk,
            events,
            alert,
            refresh_secs,
        }
    }
}

// ============================================================
// TESTS
// ============================================================
