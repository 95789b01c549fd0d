//! Round-robin rotation state

/// Designates one user per frequency index in rotation
///
/// The designated user advances at the start of every sweep over the
/// users: when the queried frequency index differs from the previous query,
/// when the user index does not increase (the same frequency is being
/// scored again), and at the start of every pass. The first designated
/// user is user 0.
///
/// # Example
/// ```
/// use ran_emulator_core::policy::RoundRobinCursor;
///
/// let mut rr = RoundRobinCursor::new();
/// rr.begin_pass();
/// assert_eq!(rr.score(0, 0, 3), 1.0);
/// assert_eq!(rr.score(0, 1, 3), 0.0);
/// assert_eq!(rr.score(1, 1, 3), 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoundRobinCursor {
    winner: Option<usize>,
    prev_freq: Option<usize>,
    prev_user: Option<usize>,
}

impl RoundRobinCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last frequency so the next query rotates
    pub fn begin_pass(&mut self) {
        self.prev_freq = None;
        self.prev_user = None;
    }

    /// Score `user` on `freq`: 1.0 if designated, else 0.0
    pub fn score(&mut self, freq: usize, user: usize, n_users: usize) -> f64 {
        if n_users == 0 {
            return 0.0;
        }
        let new_sweep =
            self.prev_freq != Some(freq) || self.prev_user.map_or(true, |prev| user <= prev);
        if new_sweep {
            self.winner = Some(match self.winner {
                None => 0,
                Some(w) => (w + 1) % n_users,
            });
        }
        self.prev_freq = Some(freq);
        self.prev_user = Some(user);
        match self.winner {
            Some(w) if w % n_users == user => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        let mut rr = RoundRobinCursor::new();
        let winners: Vec<usize> = (0..5)
            .map(|f| {
                (0..2)
                    .find(|&u| rr.score(f, u, 2) == 1.0)
                    .unwrap()
            })
            .collect();
        assert_eq!(winners, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_fixed_frequency_rotates_per_sweep() {
        let mut rr = RoundRobinCursor::new();
        let mut winners = Vec::new();
        for _ in 0..3 {
            let scores: Vec<f64> = (0..3).map(|u| rr.score(4, u, 3)).collect();
            assert_eq!(scores.iter().filter(|&&s| s == 1.0).count(), 1);
            winners.push(scores.iter().position(|&s| s == 1.0).unwrap());
        }
        assert_eq!(winners, vec![0, 1, 2]);
    }

    #[test]
    fn test_no_users_scores_zero() {
        let mut rr = RoundRobinCursor::new();
        assert_eq!(rr.score(0, 0, 0), 0.0);
    }
}
