//! Integration tests for the metrics → pulse → risk → events → alert
//! pipeline.

use marketstruct::prelude::*;

/// Drive one full cycle with a quiet snapshot
fn quiet_cycle(pulse: &mut MarketPulse, time: i64) -> MarketSnapshot {
    MarketSnapshot::assemble(pulse, 100.0, 0.0, 100.0, 100.0, time)
}

#[test]
fn risk_scenario_all_zero() {
    // change 0, volatility 0 → risk score 0 → level low.
    let metrics = MarketMetrics::build(100.0, 0.0, 100.0, 100.0);
    assert_eq!(metrics.volatility_score, 0.0);

    let risk = RiskAssessment::evaluate(&metrics);
    assert_eq!(risk.score, 0.0);
    assert_eq!(risk.level, RiskLevel::Low);
}

#[test]
fn alert_scenario_all_floor() {
    // Every sub-score at its floor with a neutral regime: shock ~ 0,
    // level low, bias neutral.
    let mut pulse = MarketPulse::default();
    for i in 0..12 {
        quiet_cycle(&mut pulse, i);
    }
    let metrics = MarketMetrics::build(100.0, 0.0, 100.0, 100.0);
    let risk = RiskAssessment::evaluate(&metrics);
    let events = InstitutionalEvents::detect(&pulse, &metrics, &risk);

    assert_eq!(events.active_count(), 0);
    assert_eq!(pulse.speed_index(), 0.0);
    assert_eq!(pulse.acceleration_index(), 0.0);

    let alert = classify_alert(&pulse, &metrics, &risk, &events);
    assert!(alert.shock_score < 1.0, "shock = {}", alert.shock_score);
    assert_eq!(alert.level, AlertLevel::Low);
    assert_eq!(alert.trend_bias, TrendBias::Neutral);
}

#[test]
fn escalation_under_stress() {
    let mut pulse = MarketPulse::default();
    // Calm warm-up.
    for i in 0..20 {
        quiet_cycle(&mut pulse, i);
    }
    let calm = quiet_cycle(&mut pulse, 20);
    assert_eq!(calm.alert.level, AlertLevel::Low);
    assert_eq!(calm.refresh_secs, 240);

    // Violent repricing across several cycles.
    let mut price = 100.0;
    let mut last = calm;
    for i in 21..30 {
        price *= 1.05;
        last = MarketSnapshot::assemble(
            &mut pulse,
            price,
            12.0,
            price * 1.06,
            price * 0.94,
            i,
        );
    }

    assert!(matches!(
        last.alert.level,
        AlertLevel::High | AlertLevel::Critical
    ));
    assert_eq!(last.entry.regime, Regime::Explosion);
    assert!(last.refresh_secs <= 90);
    assert!(!last.alert.reasons.is_empty());
    assert_eq!(last.alert.trend_bias, TrendBias::Bull);
    assert!(last.events.volatility_explosion);
}

#[test]
fn adaptive_interval_tightens_with_severity() {
    let levels = [
        AlertLevel::Low,
        AlertLevel::Medium,
        AlertLevel::High,
        AlertLevel::Critical,
    ];
    let mut intervals: Vec<u64> = levels
        .iter()
        .map(|&level| recommended_interval(level, Regime::Normal))
        .collect();
    let sorted = {
        let mut v = intervals.clone();
        v.sort_unstable_by(|a, b| b.cmp(a));
        v
    };
    assert_eq!(intervals, sorted);

    // Explosion tightens every level but never below the floor.
    intervals = levels
        .iter()
        .map(|&level| recommended_interval(level, Regime::Explosion))
        .collect();
    assert!(intervals.iter().all(|&secs| secs >= 45));
    assert_eq!(intervals[3], 45);
}

#[test]
fn pulse_history_bounded_across_cycles() {
    let mut pulse = MarketPulse::new(PulseConfig {
        capacity: 50,
        ..PulseConfig::default()
    });
    for i in 0..200 {
        quiet_cycle(&mut pulse, i);
    }
    assert_eq!(pulse.len(), 50);
    assert_eq!(pulse.history().next().unwrap().time, 150);
}

#[test]
fn snapshot_serializes_for_presentation() {
    let mut pulse = MarketPulse::default();
    for i in 0..15 {
        quiet_cycle(&mut pulse, i);
    }
    let snapshot = MarketSnapshot::assemble(&mut pulse, 101.5, 1.8, 103.0, 99.0, 15);
    let json = serde_json::to_value(&snapshot).unwrap();

    assert!(json["metrics"]["price"].is_number());
    assert!(json["alert"]["level"].is_string());
    assert!(json["refresh_secs"].is_number());
    assert!(json["stats"].is_object());
}
