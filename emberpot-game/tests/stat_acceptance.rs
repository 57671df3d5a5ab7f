use emberpot_game::{
    CatalogContext, Player, SequentialIds, Synthesizer, SynthesisEngine, TraitEffect,
    explore_with_rng, start_turn,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::convert::TryFrom;

const SAMPLE_SIZE: usize = 5000;
const TOLERANCE: f64 = 0.025;

fn rate(hits: usize) -> f64 {
    f64::from(u32::try_from(hits).expect("count fits"))
        / f64::from(u32::try_from(SAMPLE_SIZE).expect("sample size fits"))
}

fn kitchen(catalog: &CatalogContext, ids: &mut SequentialIds, keys: &[&str]) -> Player {
    let mut player = Player::new();
    for key in keys {
        player.add_card(catalog.create_card(key, ids).expect("catalog key"));
    }
    player
}

#[test]
fn chaos_rate_tracks_nominal_probability() {
    let catalog = CatalogContext::default_config();
    let mut ids = SequentialIds::default();
    let mut rng = SmallRng::seed_from_u64(0xC4A0);
    let mut fired = 0usize;
    for _ in 0..SAMPLE_SIZE {
        let mut player = kitchen(&catalog, &mut ids, &["pot", "fire", "tomato", "egg", "potato"]);
        let selection: Vec<_> = player.cards.iter().map(|card| card.id).collect();
        let mut synth = Synthesizer::default();
        let outcome =
            SynthesisEngine::new(&mut player, &mut synth, &catalog, &mut ids, &mut rng)
                .full_throw(&selection);
        if let Some(lost) = outcome.chaos {
            assert!((1..=2).contains(&lost), "chaos removed {lost}");
            fired += 1;
        }
    }
    let observed = rate(fired);
    assert!(
        (observed - 0.3).abs() <= TOLERANCE,
        "chaos rate drifted: observed {observed:.4}"
    );
}

#[test]
fn probabilistic_traits_fire_at_their_rate() {
    let catalog = CatalogContext::default_config();
    let mut ids = SequentialIds::default();
    let egg = catalog.create_card("egg", &mut ids).unwrap();
    let mut rng = SmallRng::seed_from_u64(0xE66);
    let upgrades = (0..SAMPLE_SIZE)
        .filter(|_| egg.trigger_trait(&mut rng) == Some(TraitEffect::QualityUpgrade))
        .count();
    let observed = rate(upgrades);
    assert!(
        (observed - 0.2).abs() <= TOLERANCE,
        "double yolk rate drifted: observed {observed:.4}"
    );
}

#[test]
fn threats_spawn_at_nominal_rate() {
    let catalog = CatalogContext::default_config();
    let mut ids = SequentialIds::default();
    let mut rng = SmallRng::seed_from_u64(0x7EE7);
    let mut spawned = 0usize;
    for _ in 0..SAMPLE_SIZE {
        let mut player = Player::new();
        let mut synth = Synthesizer::default();
        let start = start_turn(&mut player, &mut synth, &catalog, &mut ids, &mut rng);
        assert_eq!(start.granted.len(), 1);
        assert!(player.task.is_some());
        if start.new_threat.is_some() {
            assert!(player.threat.is_some());
            spawned += 1;
        }
    }
    let observed = rate(spawned);
    assert!(
        (observed - 0.3).abs() <= TOLERANCE,
        "threat rate drifted: observed {observed:.4}"
    );
}

#[test]
fn explore_drop_counts_are_balanced() {
    let catalog = CatalogContext::default_config();
    let mut ids = SequentialIds::default();
    let mut rng = SmallRng::seed_from_u64(0xF0F0);
    let mut doubles = 0usize;
    for _ in 0..SAMPLE_SIZE {
        let mut player = Player::new();
        let mut synth = Synthesizer::default();
        let outcome =
            explore_with_rng(&mut player, &mut synth, &catalog, &mut ids, &mut rng, "plain");
        match outcome.cards().len() {
            1 => {}
            2 => doubles += 1,
            other => panic!("unexpected drop count {other}"),
        }
    }
    let observed = rate(doubles);
    assert!(
        (observed - 0.5).abs() <= TOLERANCE,
        "explore drop split drifted: observed {observed:.4}"
    );
}
