//! A single schedulable cell of the resource grid

use crate::models::Direction;
use crate::policy::MetricEvaluator;
use crate::scheduler::{Grant, LinkDirectory, SchedulingView};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    user: usize,
    throughput: f64,
    metric: f64,
}

/// One resource-block group in one time row
///
/// The candidate picked by [`estimate`](ResourceUnit::estimate) lives until
/// the following [`handle`](ResourceUnit::handle), which always clears it.
#[derive(Debug, Clone)]
pub struct ResourceUnit {
    time: usize,
    freq: usize,
    direction: Direction,
    best: Option<Candidate>,
}

/// Result of delivering a unit's grant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOutcome {
    pub grant: Grant,
    /// Bits the link actually accepted
    pub delivered: f64,
}

impl ResourceUnit {
    pub fn new(time: usize, freq: usize, direction: Direction) -> Self {
        Self {
            time,
            freq,
            direction,
            best: None,
        }
    }

    pub fn time_index(&self) -> usize {
        self.time
    }

    pub fn freq_index(&self) -> usize {
        self.freq
    }

    /// User currently selected for this unit, if any
    pub fn selected_user(&self) -> Option<usize> {
        self.best.map(|c| c.user)
    }

    /// Pick the best user for this unit
    ///
    /// Users are scored in index order. A user competes only if it has data
    /// and a positive throughput; the others are still scored so that the
    /// round-robin rotation sees every user. On equal scores the earliest
    /// user keeps the unit.
    pub fn estimate<V: SchedulingView + ?Sized>(
        &mut self,
        symbols: u32,
        now: f64,
        view: &V,
        evaluator: &mut MetricEvaluator,
    ) {
        if symbols == 0 {
            return;
        }
        let n_users = view.user_count();
        for user in 0..n_users {
            let candidate = view.candidate(user, self.freq, now);
            let metric = evaluator.score(self.freq, user, n_users, now, &candidate.metric);
            if !candidate.has_data || candidate.throughput <= 0.0 || metric.is_nan() {
                continue;
            }
            let better = match self.best {
                None => true,
                Some(best) => metric > best.metric,
            };
            if better {
                self.best = Some(Candidate {
                    user,
                    throughput: candidate.throughput,
                    metric,
                });
            }
        }
    }

    /// Deliver the selected grant, if any, and reset the unit
    pub fn handle<D: LinkDirectory + ?Sized>(
        &mut self,
        symbols: u32,
        directory: &mut D,
    ) -> Option<UnitOutcome> {
        let best = self.best.take()?;
        if best.throughput <= 0.0 || symbols == 0 {
            return None;
        }
        let grant = Grant {
            user: best.user,
            direction: self.direction,
            freq: self.freq,
            bits: best.throughput * f64::from(symbols),
        };
        let delivered = directory.deliver(grant);
        Some(UnitOutcome { grant, delivered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{MetricInfo, MetricPolicy};
    use crate::scheduler::CandidateInfo;

    struct Fixed {
        users: Vec<CandidateInfo>,
        delivered: Vec<Grant>,
    }

    impl SchedulingView for Fixed {
        fn user_count(&self) -> usize {
            self.users.len()
        }

        fn candidate(&self, user: usize, _freq: usize, _now: f64) -> CandidateInfo {
            self.users[user]
        }
    }

    impl LinkDirectory for Fixed {
        fn deliver(&mut self, grant: Grant) -> f64 {
            self.delivered.push(grant);
            grant.bits
        }
    }

    fn user(has_data: bool, throughput: f64) -> CandidateInfo {
        CandidateInfo {
            has_data,
            throughput,
            metric: MetricInfo {
                current_throughput: throughput,
                ..MetricInfo::default()
            },
        }
    }

    #[test]
    fn test_equal_metrics_keep_first_user() {
        let mut view = Fixed {
            users: vec![user(false, 50.0), user(true, 20.0), user(true, 20.0)],
            delivered: Vec::new(),
        };
        let mut evaluator = MetricEvaluator::new(MetricPolicy::MaxThroughput);
        let mut unit = ResourceUnit::new(0, 0, Direction::Downlink);

        unit.estimate(14, 0.0, &view, &mut evaluator);
        assert_eq!(unit.selected_user(), Some(1));

        let outcome = unit.handle(14, &mut view).unwrap();
        assert_eq!(outcome.grant.bits, 280.0);
        assert_eq!(unit.selected_user(), None);
    }

    #[test]
    fn test_zero_symbols_selects_nobody() {
        let mut view = Fixed {
            users: vec![user(true, 10.0)],
            delivered: Vec::new(),
        };
        let mut evaluator = MetricEvaluator::new(MetricPolicy::MaxThroughput);
        let mut unit = ResourceUnit::new(0, 3, Direction::Uplink);

        unit.estimate(0, 0.0, &view, &mut evaluator);
        assert!(unit.handle(0, &mut view).is_none());
        assert!(view.delivered.is_empty());
    }
}
