//! Metric dispatch

use super::{MetricInfo, MetricPolicy, RoundRobinCursor, MIN_DELAY_SLACK};

/// Score `info` under `policy` at time `now`
///
/// Round robin has no stateless score and returns 0 here; use
/// [`MetricEvaluator::score`] to include the rotation.
pub fn evaluate(policy: MetricPolicy, now: f64, info: &MetricInfo) -> f64 {
    let w = &info.weights;
    match policy {
        MetricPolicy::Fifo => w.priority * (now - info.request_time),
        MetricPolicy::BlindEqualThroughput => {
            w.priority / (w.beta * info.avg_throughput + (1.0 - w.beta) * info.current_throughput)
        }
        MetricPolicy::DistanceToDelay => {
            w.priority / (w.delay_target - info.delay).max(MIN_DELAY_SLACK)
        }
        MetricPolicy::WeightedDelay => {
            -(w.delta.ln() / w.delay_target) * w.priority * info.delay
        }
        MetricPolicy::MaxThroughput => w.priority * info.current_throughput,
        MetricPolicy::RoundRobin => 0.0,
        MetricPolicy::ProportionalFair => {
            if info.avg_throughput != 0.0 {
                w.priority * info.current_throughput / info.avg_throughput.powf(w.beta)
            } else {
                w.priority * info.current_throughput
            }
        }
    }
}

/// Scores candidates for one grid, holding the round-robin state
#[derive(Debug, Clone)]
pub struct MetricEvaluator {
    policy: MetricPolicy,
    round_robin: RoundRobinCursor,
}

impl MetricEvaluator {
    pub fn new(policy: MetricPolicy) -> Self {
        Self {
            policy,
            round_robin: RoundRobinCursor::new(),
        }
    }

    pub fn policy(&self) -> MetricPolicy {
        self.policy
    }

    /// Mark the start of a scheduling pass (one TTI of one grid)
    pub fn begin_pass(&mut self) {
        self.round_robin.begin_pass();
    }

    /// Score `user` for frequency index `freq`
    pub fn score(
        &mut self,
        freq: usize,
        user: usize,
        n_users: usize,
        now: f64,
        info: &MetricInfo,
    ) -> f64 {
        match self.policy {
            MetricPolicy::RoundRobin => self.round_robin.score(freq, user, n_users),
            policy => evaluate(policy, now, info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MetricWeights;

    fn info() -> MetricInfo {
        MetricInfo {
            request_time: 0.010,
            avg_throughput: 400.0,
            current_throughput: 100.0,
            delay: 0.0005,
            weights: MetricWeights::default(),
        }
    }

    #[test]
    fn test_fifo_grows_with_age() {
        let i = info();
        assert!((evaluate(MetricPolicy::Fifo, 0.015, &i) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_pf_without_history_is_current() {
        let mut i = info();
        i.avg_throughput = 0.0;
        assert_eq!(evaluate(MetricPolicy::ProportionalFair, 0.0, &i), 100.0);
    }

    #[test]
    fn test_distance_to_delay_past_target_is_finite() {
        let mut i = info();
        i.delay = 0.002;
        let score = evaluate(MetricPolicy::DistanceToDelay, 0.0, &i);
        assert!(score.is_finite());
        assert_eq!(score, 1.0 / MIN_DELAY_SLACK);
    }

    #[test]
    fn test_generic_round_robin_is_zero() {
        assert_eq!(evaluate(MetricPolicy::RoundRobin, 1.0, &info()), 0.0);
    }
}
