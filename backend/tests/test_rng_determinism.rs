//! Tests for deterministic random number generation

use ran_emulator_core::rng::derive_seed;
use ran_emulator_core::RngManager;

#[test]
fn test_same_seed_same_sequence() {
    let mut a = RngManager::new(12345);
    let mut b = RngManager::new(12345);
    for _ in 0..1000 {
        assert_eq!(a.next(), b.next());
    }
}

#[test]
fn test_different_seeds_diverge() {
    let mut a = RngManager::new(1);
    let mut b = RngManager::new(2);
    let same = (0..100).filter(|_| a.next() == b.next()).count();
    assert_eq!(same, 0);
}

#[test]
fn test_zero_seed_is_usable() {
    let mut rng = RngManager::new(0);
    assert_ne!(rng.next(), 0);
    assert_ne!(rng.get_state(), 0);
}

#[test]
fn test_streams_are_independent() {
    let seeds: Vec<u64> = (0..32).map(|s| derive_seed(42, s)).collect();
    let mut unique = seeds.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), seeds.len());

    let mut a = RngManager::new(derive_seed(42, 5));
    let mut b = RngManager::new(derive_seed(42, 6));
    let same = (0..100).filter(|_| a.next() == b.next()).count();
    assert_eq!(same, 0);
}

#[test]
fn test_unit_draws_in_range() {
    let mut rng = RngManager::new(7);
    for _ in 0..10_000 {
        let u = rng.next_f64();
        assert!((0.0..1.0).contains(&u));
        let s = rng.symmetric();
        assert!((-1.0..1.0).contains(&s));
    }
}

#[test]
fn test_poisson_mean() {
    let mut rng = RngManager::new(99);
    let n = 20_000;
    let sum: u64 = (0..n).map(|_| rng.poisson(3.0)).sum();
    let mean = sum as f64 / n as f64;
    assert!((mean - 3.0).abs() < 0.1, "mean was {mean}");
    assert_eq!(rng.poisson(0.0), 0);
    assert_eq!(rng.poisson(-1.0), 0);
}
