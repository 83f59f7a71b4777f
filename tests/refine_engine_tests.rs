use proptest::prelude::*;
use rand::rngs::mock::StepRng;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use refine_sim_lib::{
    build_histogram, choose_bucket_count, find_percentile_point, full_bonus_contribution,
    max_probability, retry_bonus, run_batch_seeded, simulate_run_with_rng, sorted_attempts,
    RateFactors, SimError, SimulationConfig, SlotType, Tier, ENERGY_CAP, ENERGY_DIVISOR,
};

fn config(base: f64) -> SimulationConfig {
    SimulationConfig::new(Tier::T3, SlotType::Weapon, 13, base)
}

#[test]
fn rigged_failure_terminates_on_energy_cap() {
    let outcome = simulate_run_with_rng(&config(10.0), &mut StepRng::new(0, 0)).unwrap();

    assert!(outcome.is_full_count);
    assert_eq!(outcome.records[0].attempt_index, 1);
    assert_eq!(outcome.records[0].success_probability, 10.0);
    assert_eq!(outcome.records.last().unwrap().energy, ENERGY_CAP);
}

#[test]
fn retry_ramp_saturates_at_eleventh_attempt() {
    assert_eq!(retry_bonus(11, 10.0), 10.0);
}

#[test]
fn full_bonus_past_level_23_is_guaranteed_contribution() {
    assert_eq!(full_bonus_contribution(true, 24, 5.0), 1.0);
}

#[test]
fn identical_attempt_counts_fill_one_bucket() {
    let histogram = build_histogram(&[5, 5, 5, 5, 5]).unwrap();
    assert_eq!(histogram.len(), 5);
    assert_eq!(histogram.iter().filter(|b| b.count > 0).count(), 1);
}

#[test]
fn two_hundred_attempts_use_forty_buckets() {
    assert_eq!(choose_bucket_count(200), 40);
    let values: Vec<u32> = (1..=200).collect();
    assert_eq!(build_histogram(&values).unwrap().len(), 40);
}

#[test]
fn additional_rate_needs_starting_energy() {
    let mut cfg = config(10.0);
    cfg.additional_success_rate = 2.0;
    let err = simulate_run_with_rng(&cfg, &mut StepRng::new(0, 0)).unwrap_err();
    assert!(matches!(err, SimError::Configuration { .. }));
}

#[test]
fn seeded_batch_feeds_histogram_and_percentile() {
    let mut cfg = config(4.5);
    cfg.tier = Tier::T4;
    cfg.target_refine_level = 18;
    cfg.use_bonus_item = true;
    cfg.bonus_item_probability = 1.5;

    let outcomes = run_batch_seeded(&cfg, 2_000, 99).unwrap();
    assert_eq!(outcomes.len(), 2_000);

    let attempts = sorted_attempts(&outcomes);
    let histogram = build_histogram(&attempts).unwrap();
    assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 2_000);

    for percent in [1.0, 25.0, 50.0, 90.0, 100.0] {
        assert!(find_percentile_point(&attempts, &histogram, percent).is_some());
    }
    assert!(find_percentile_point(&attempts, &histogram, 0.0).is_none());
}

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (
        0.5f64..60.0,
        prop_oneof![Just(Tier::T3), Just(Tier::T4)],
        12u32..=25,
        any::<bool>(),
        any::<bool>(),
        0.0f64..10.0,
        any::<bool>(),
        0.0f64..99.0,
    )
        .prop_map(|(base, tier, level, doubled, use_item, item, full, energy)| {
            let mut cfg = SimulationConfig::new(tier, SlotType::Armor, level, base);
            cfg.double_energy = doubled;
            cfg.use_bonus_item = use_item;
            cfg.bonus_item_probability = item;
            cfg.full_bonus_mode = full;
            cfg.starting_bonus_energy = energy;
            cfg
        })
}

proptest! {
    #[test]
    fn runs_terminate_within_energy_bound(cfg in arb_config(), seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let outcome = simulate_run_with_rng(&cfg, &mut rng).unwrap();
        // Every attempt gains at least base / 2.15 energy
        let bound = (ENERGY_CAP * ENERGY_DIVISOR / cfg.base_success_rate).ceil() as u32 + 1;
        prop_assert!(outcome.attempts <= bound);
        prop_assert_eq!(outcome.records.len() as u32, outcome.attempts);
    }

    #[test]
    fn energy_and_indices_never_go_backwards(cfg in arb_config(), seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let outcome = simulate_run_with_rng(&cfg, &mut rng).unwrap();
        for pair in outcome.records.windows(2) {
            prop_assert!(pair[1].energy >= pair[0].energy);
            prop_assert_eq!(pair[1].attempt_index, pair[0].attempt_index + 1);
        }
    }

    #[test]
    fn probability_never_exceeds_ceiling(cfg in arb_config(), seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let outcome = simulate_run_with_rng(&cfg, &mut rng).unwrap();
        let factors = RateFactors {
            base_rate: cfg.base_success_rate,
            bonus_item_rate: cfg.bonus_item_rate(),
        };
        let ceiling = max_probability(factors, cfg.target_refine_level, cfg.full_bonus_mode);
        for record in &outcome.records {
            prop_assert!(record.success_probability <= ceiling + 1e-9);
        }
    }
}
