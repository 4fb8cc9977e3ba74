//! Seeded simulation of the shared mining network.
//!
//! One step advances the block height, retargets difficulty at window
//! boundaries, grows global capacity, samples a noisy observed capacity, churns
//! the pending work pool and random-walks the market price. Steps are Markov:
//! the next state depends only on the previous state, the instant of the step
//! and the RNG stream.

use chrono::{DateTime, Duration, Utc};
use idle_core::{NetworkConfig, NetworkState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

/// New difficulty after a window that took `actual_secs`.
///
/// `difficulty × expected / actual`, never below `initial_difficulty`. When
/// `max_adjustment_factor` is set the ratio is clamped to
/// `[1 / factor, factor]`. A window of zero or negative length leaves the
/// difficulty unchanged.
///
/// Example:
/// a window that took half the expected time doubles the difficulty.
pub fn retarget(cfg: &NetworkConfig, difficulty: f64, actual_secs: f64) -> f64 {
    let expected = cfg.difficulty_adjustment_interval as f64 * cfg.target_step_secs;
    if actual_secs <= 0.0 || !actual_secs.is_finite() {
        warn!(actual_secs, "degenerate difficulty window, keeping difficulty");
        return difficulty.max(cfg.initial_difficulty);
    }
    let mut ratio = expected / actual_secs;
    if let Some(bound) = cfg.max_adjustment_factor {
        let bound = bound.max(1.0);
        ratio = ratio.clamp(1.0 / bound, bound);
    }
    (difficulty * ratio).max(cfg.initial_difficulty)
}

/// Network simulator owning its RNG stream.
#[derive(Clone, Debug)]
pub struct NetworkSimulator {
    cfg: NetworkConfig,
    rng: ChaCha8Rng,
}

impl NetworkSimulator {
    /// Simulator seeded from `cfg.seed`.
    pub fn new(cfg: NetworkConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        Self::with_rng(cfg, rng)
    }

    /// Simulator driven by an injected RNG stream.
    pub fn with_rng(cfg: NetworkConfig, rng: ChaCha8Rng) -> Self {
        Self { cfg, rng }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.cfg
    }

    /// Advance `state` by one block at instant `now`.
    pub fn step(&mut self, state: &NetworkState, now: DateTime<Utc>) -> NetworkState {
        let cfg = &self.cfg;
        let mut next = state.clone();

        next.work_height = state.work_height.saturating_add(1);

        let interval = cfg.difficulty_adjustment_interval.max(1);
        if next.work_height % interval == 0 {
            let actual = (now - state.window_started_at).num_milliseconds() as f64 / 1000.0;
            next.difficulty = retarget(cfg, state.difficulty, actual);
            next.window_started_at = now;
            info!(
                height = next.work_height,
                actual_secs = actual,
                from = state.difficulty,
                to = next.difficulty,
                "difficulty retarget"
            );
        }

        next.global_capacity = state.global_capacity * cfg.capacity_growth;

        let noise = cfg.observed_noise;
        let factor = if noise > 0.0 {
            self.rng.gen_range((1.0 - noise)..=(1.0 + noise))
        } else {
            1.0
        };
        next.observed_capacity = next.global_capacity * factor;

        let drain = cfg.drain_amount;
        let added = self.rng.gen_range(0..=drain.saturating_mul(2));
        // clamp after the inflow
        next.pending_work_pool = state
            .pending_work_pool
            .saturating_add(added)
            .saturating_sub(drain);

        let bound = cfg.price_change_bound;
        let change = if bound > 0.0 {
            self.rng.gen_range(-bound..=bound)
        } else {
            0.0
        };
        next.market_price = (state.market_price * (1.0 + change)).max(cfg.price_floor);

        next.last_step_at = now;
        debug!(
            height = next.work_height,
            observed = next.observed_capacity,
            pool = next.pending_work_pool,
            price = next.market_price,
            "network step"
        );
        next
    }

    /// Apply `steps` consecutive steps spaced `spacing` apart after `start`.
    pub fn run(
        &mut self,
        state: &NetworkState,
        steps: u64,
        start: DateTime<Utc>,
        spacing: Duration,
    ) -> NetworkState {
        let mut current = state.clone();
        let mut at = start;
        for _ in 0..steps {
            at += spacing;
            current = self.step(&current, at);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use idle_core::validate_network_state;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn small_window() -> NetworkConfig {
        NetworkConfig {
            difficulty_adjustment_interval: 10,
            target_step_secs: 60.0,
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn half_expected_window_doubles_difficulty() {
        let cfg = NetworkConfig::default();
        let expected = 2016.0 * 600.0;
        assert_eq!(retarget(&cfg, 1.0, expected * 0.5), 2.0);
        assert_eq!(retarget(&cfg, 3.0, expected), 3.0);
    }

    #[test]
    fn retarget_follows_full_ratio_and_floor() {
        let cfg = NetworkConfig::default();
        let expected = 2016.0 * 600.0;
        assert!((retarget(&cfg, 1.0, expected / 10.0) - 10.0).abs() < 1e-9);
        assert!((retarget(&cfg, 100.0, expected * 10.0) - 10.0).abs() < 1e-9);
        assert_eq!(retarget(&cfg, 1.0, expected * 100.0), 1.0);
        assert_eq!(retarget(&cfg, 5.0, 0.0), 5.0);
        assert_eq!(retarget(&cfg, 5.0, -30.0), 5.0);
    }

    #[test]
    fn optional_bound_clamps_ratio() {
        let cfg = NetworkConfig {
            max_adjustment_factor: Some(4.0),
            ..NetworkConfig::default()
        };
        let expected = 2016.0 * 600.0;
        assert_eq!(retarget(&cfg, 10.0, expected / 100.0), 40.0);
        assert_eq!(retarget(&cfg, 10.0, expected * 100.0), 2.5);
        assert_eq!(retarget(&cfg, 1.0, expected / 2.0), 2.0);
    }

    #[test]
    fn step_advances_height_and_timestamp() {
        let cfg = NetworkConfig::default();
        let mut sim = NetworkSimulator::new(cfg.clone());
        let s0 = NetworkState::genesis(&cfg, t0());
        let now = t0() + Duration::minutes(10);
        let s1 = sim.step(&s0, now);
        assert_eq!(s1.work_height, 1);
        assert_eq!(s1.last_step_at, now);
        assert_eq!(s1.difficulty, s0.difficulty);
        assert_eq!(s1.window_started_at, s0.window_started_at);
        assert!((s1.global_capacity - 1000.0 * 1.0001).abs() < 1e-9);
        let ratio = s1.observed_capacity / s1.global_capacity;
        assert!((0.9..=1.1).contains(&ratio));
        assert!(s1.pending_work_pool <= 1000);
        assert!((s1.market_price - 1.0).abs() <= 0.01 + 1e-12);
    }

    #[test]
    fn fast_window_raises_difficulty_at_boundary() {
        let cfg = small_window();
        let mut sim = NetworkSimulator::new(cfg.clone());
        let s0 = NetworkState::genesis(&cfg, t0());
        // ten steps 30s apart against a 60s target
        let s10 = sim.run(&s0, 10, t0(), Duration::seconds(30));
        assert_eq!(s10.work_height, 10);
        assert_eq!(s10.difficulty, 2.0);
        assert_eq!(s10.window_started_at, t0() + Duration::seconds(300));
        let s11 = sim.step(&s10, t0() + Duration::seconds(330));
        assert_eq!(s11.difficulty, 2.0);
    }

    #[test]
    fn stalled_window_keeps_difficulty() {
        let cfg = small_window();
        let mut sim = NetworkSimulator::new(cfg.clone());
        let mut s = NetworkState::genesis(&cfg, t0());
        s.work_height = 9;
        s.difficulty = 3.0;
        let next = sim.step(&s, t0());
        assert_eq!(next.difficulty, 3.0);
        assert_eq!(next.work_height, 10);
    }

    #[test]
    fn small_pool_stays_within_inflow_bounds() {
        let cfg = NetworkConfig::default();
        let mut sim = NetworkSimulator::new(cfg.clone());
        let mut s = NetworkState::genesis(&cfg, t0());
        let mut max_seen = 0;
        let mut zeros = 0;
        for i in 1..2000 {
            s.pending_work_pool = 500;
            s = sim.step(&s, t0() + Duration::seconds(i));
            // 500 - 1000 + U{0..=2000}, floored at zero
            assert!(s.pending_work_pool <= 1500);
            max_seen = max_seen.max(s.pending_work_pool);
            if s.pending_work_pool == 0 {
                zeros += 1;
            }
        }
        assert!(max_seen > 1000);
        assert!(zeros > 0);
    }

    #[test]
    fn genesis_pool_first_step_is_at_most_drain() {
        let cfg = NetworkConfig::default();
        for seed in 0..50 {
            let mut sim = NetworkSimulator::with_rng(cfg.clone(), ChaCha8Rng::seed_from_u64(seed));
            let s0 = NetworkState::genesis(&cfg, t0());
            let s1 = sim.step(&s0, t0() + Duration::minutes(10));
            assert!(s1.pending_work_pool <= cfg.drain_amount);
        }
    }

    #[test]
    fn uneven_spacing_retargets_only_at_boundary() {
        let cfg = small_window();
        let mut sim = NetworkSimulator::new(cfg.clone());
        let mut s = NetworkState::genesis(&cfg, t0());
        // steps 1..=9 arrive in bursts and stalls; none may retarget
        let offsets = [1i64, 2, 3, 100, 101, 102, 250, 251, 252];
        for off in offsets {
            s = sim.step(&s, t0() + Duration::seconds(off));
            assert_eq!(s.difficulty, 1.0);
            assert_eq!(s.window_started_at, t0());
        }
        // window of 10 steps took 300s against 600s expected
        let at = t0() + Duration::seconds(300);
        s = sim.step(&s, at);
        assert_eq!(s.work_height, 10);
        assert_eq!(s.difficulty, 2.0);
        assert_eq!(s.window_started_at, at);
        s = sim.step(&s, at + Duration::seconds(5));
        assert_eq!(s.difficulty, 2.0);
        assert_eq!(s.window_started_at, at);
    }

    #[test]
    fn price_respects_floor() {
        let cfg = NetworkConfig {
            price_change_bound: 0.5,
            ..NetworkConfig::default()
        };
        let mut sim = NetworkSimulator::new(cfg.clone());
        let mut s = NetworkState::genesis(&cfg, t0());
        s.market_price = cfg.price_floor;
        for i in 1..500 {
            s = sim.step(&s, t0() + Duration::seconds(i));
            assert!(s.market_price >= cfg.price_floor);
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let cfg = NetworkConfig::default();
        let s0 = NetworkState::genesis(&cfg, t0());
        let a = NetworkSimulator::new(cfg.clone()).run(&s0, 50, t0(), Duration::minutes(10));
        let b = NetworkSimulator::new(cfg.clone()).run(&s0, 50, t0(), Duration::minutes(10));
        assert_eq!(a, b);
        let other = NetworkSimulator::with_rng(cfg, ChaCha8Rng::seed_from_u64(7)).run(
            &s0,
            50,
            t0(),
            Duration::minutes(10),
        );
        assert_ne!(a.market_price, other.market_price);
    }

    proptest! {
        #[test]
        fn invariants_hold_over_random_walks(
            seed in any::<u64>(),
            steps in 1u64..300,
            spacing in 1i64..2_000,
        ) {
            let cfg = NetworkConfig {
                difficulty_adjustment_interval: 16,
                seed,
                ..NetworkConfig::default()
            };
            let mut sim = NetworkSimulator::new(cfg.clone());
            let mut s = NetworkState::genesis(&cfg, t0());
            let mut at = t0();
            for _ in 0..steps {
                at += Duration::seconds(spacing);
                let next = sim.step(&s, at);
                prop_assert_eq!(next.work_height, s.work_height + 1);
                prop_assert!(next.difficulty >= cfg.initial_difficulty);
                prop_assert!(validate_network_state(&next, &cfg).is_ok());
                s = next;
            }
        }
    }
}
