//! Scheduling metric tests
//!
//! Covers the id mapping, every formula and the round-robin rotation as
//! seen by a grid across passes.

use ran_emulator_core::policy::{
    evaluate, MetricEvaluator, MetricInfo, MetricPolicy, MetricWeights, MIN_DELAY_SLACK,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn info(avg: f64, current: f64, delay: f64) -> MetricInfo {
    MetricInfo {
        request_time: 0.002,
        avg_throughput: avg,
        current_throughput: current,
        delay,
        weights: MetricWeights {
            priority: 2.0,
            beta: 0.5,
            delta: 0.5,
            delay_target: 0.01,
        },
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * b.abs().max(1.0)
}

// ============================================================================
// Id mapping
// ============================================================================

#[test]
fn test_id_mapping_round_trips() {
    for id in 0..=6u8 {
        let policy = MetricPolicy::from_id(id).unwrap();
        assert_eq!(policy.id(), id);
    }
    assert_eq!(MetricPolicy::from_id(7), None);
}

#[test]
fn test_unknown_id_falls_back_to_proportional_fair() {
    assert_eq!(MetricPolicy::from_id_or_default(42), MetricPolicy::ProportionalFair);
    assert_eq!(MetricPolicy::from_id_or_default(0), MetricPolicy::Fifo);
}

// ============================================================================
// Formulas
// ============================================================================

#[test]
fn test_fifo() {
    let m = evaluate(MetricPolicy::Fifo, 0.012, &info(0.0, 0.0, 0.0));
    assert!(close(m, 2.0 * 0.010));
}

#[test]
fn test_blind_equal_throughput_favours_starved_users() {
    let starved = evaluate(MetricPolicy::BlindEqualThroughput, 0.0, &info(10.0, 100.0, 0.0));
    let served = evaluate(MetricPolicy::BlindEqualThroughput, 0.0, &info(1000.0, 100.0, 0.0));
    assert!(close(starved, 2.0 / (0.5 * 10.0 + 0.5 * 100.0)));
    assert!(starved > served);
}

#[test]
fn test_distance_to_delay() {
    let m = evaluate(MetricPolicy::DistanceToDelay, 0.0, &info(0.0, 0.0, 0.004));
    assert!(close(m, 2.0 / 0.006));
}

#[test]
fn test_distance_to_delay_past_target_is_clamped() {
    let m = evaluate(MetricPolicy::DistanceToDelay, 0.0, &info(0.0, 0.0, 0.5));
    assert!(m.is_finite());
    assert!(close(m, 2.0 / MIN_DELAY_SLACK));
}

#[test]
fn test_weighted_delay() {
    let m = evaluate(MetricPolicy::WeightedDelay, 0.0, &info(0.0, 0.0, 0.003));
    let expected = -(0.5f64.ln()) / 0.01 * 2.0 * 0.003;
    assert!(close(m, expected));
    assert!(m > 0.0);
}

#[test]
fn test_max_throughput() {
    let m = evaluate(MetricPolicy::MaxThroughput, 0.0, &info(0.0, 300.0, 0.0));
    assert!(close(m, 600.0));
}

#[test]
fn test_proportional_fair() {
    let m = evaluate(MetricPolicy::ProportionalFair, 0.0, &info(400.0, 100.0, 0.0));
    assert!(close(m, 2.0 * 100.0 / 20.0));

    // No history: plain current throughput
    let fresh = evaluate(MetricPolicy::ProportionalFair, 0.0, &info(0.0, 100.0, 0.0));
    assert!(close(fresh, 200.0));
}

#[test]
fn test_round_robin_has_no_stateless_score() {
    assert_eq!(evaluate(MetricPolicy::RoundRobin, 1.0, &info(1.0, 1.0, 1.0)), 0.0);
}

// ============================================================================
// Round robin through the evaluator
// ============================================================================

/// Winner of every frequency index in one pass
fn pass(evaluator: &mut MetricEvaluator, freqs: usize, users: usize) -> Vec<usize> {
    evaluator.begin_pass();
    (0..freqs)
        .map(|f| {
            let scores: Vec<f64> = (0..users)
                .map(|u| evaluator.score(f, u, users, 0.0, &MetricInfo::default()))
                .collect();
            assert_eq!(scores.iter().filter(|s| **s == 1.0).count(), 1);
            scores.iter().position(|s| *s == 1.0).unwrap()
        })
        .collect()
}

#[test]
fn test_round_robin_rotates_across_passes_on_one_frequency() {
    let mut evaluator = MetricEvaluator::new(MetricPolicy::RoundRobin);
    let winners: Vec<usize> = (0..3).flat_map(|_| pass(&mut evaluator, 1, 3)).collect();
    assert_eq!(winners, vec![0, 1, 2]);
}

#[test]
fn test_round_robin_continues_across_frequencies() {
    let mut evaluator = MetricEvaluator::new(MetricPolicy::RoundRobin);
    let winners: Vec<usize> = (0..3).flat_map(|_| pass(&mut evaluator, 2, 3)).collect();
    assert_eq!(winners, vec![0, 1, 2, 0, 1, 2]);
}

#[test]
fn test_non_round_robin_evaluator_matches_evaluate() {
    let mut evaluator = MetricEvaluator::new(MetricPolicy::MaxThroughput);
    let i = info(0.0, 50.0, 0.0);
    assert_eq!(evaluator.score(3, 1, 4, 0.0, &i), evaluate(MetricPolicy::MaxThroughput, 0.0, &i));
}
