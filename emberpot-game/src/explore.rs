//! Scavenging runs that turn energy into random catalog cards.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::card::{Card, IdSource};
use crate::catalog::CatalogContext;
use crate::constants::{
    ACTION_ENERGY_COST, EXPLORE_MAX_DROPS, EXPLORE_MIN_DROPS, LOG_TARGET_CATALOG,
};
use crate::inventory::{Player, Synthesizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploreBlockReason {
    /// Rejected before any charge.
    InsufficientEnergy,
    /// Charged; the location has no drop table.
    UnknownLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploreOutcome {
    Found { location: String, cards: Vec<Card> },
    Blocked(ExploreBlockReason),
}

impl ExploreOutcome {
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        match self {
            Self::Found { cards, .. } => cards,
            Self::Blocked(_) => &[],
        }
    }
}

/// Spend one energy at `location` and add 1–2 random drops to the inventory.
pub fn explore_with_rng<R, I>(
    player: &mut Player,
    synthesizer: &mut Synthesizer,
    catalog: &CatalogContext,
    ids: &mut I,
    rng: &mut R,
    location: &str,
) -> ExploreOutcome
where
    R: Rng + ?Sized,
    I: IdSource + ?Sized,
{
    if !synthesizer.spend(ACTION_ENERGY_COST) {
        return ExploreOutcome::Blocked(ExploreBlockReason::InsufficientEnergy);
    }
    let Some(drops) = catalog.explore_drops(location) else {
        return ExploreOutcome::Blocked(ExploreBlockReason::UnknownLocation);
    };

    let mut cards = Vec::new();
    if !drops.is_empty() {
        let count = rng.gen_range(EXPLORE_MIN_DROPS..=EXPLORE_MAX_DROPS);
        for _ in 0..count {
            let Some(key) = drops.choose(rng) else {
                break;
            };
            match catalog.create_card(key, ids) {
                Some(card) => cards.push(card),
                None => {
                    log::error!(target: LOG_TARGET_CATALOG, "explore drop `{key}` at {location} is not in the catalog");
                }
            }
        }
    }
    player.add_cards(cards.iter().cloned());
    ExploreOutcome::Found {
        location: location.to_string(),
        cards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::SequentialIds;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn explore_yields_one_or_two_drops_from_the_location() {
        let catalog = CatalogContext::default_config();
        let mut ids = SequentialIds::default();
        let mut rng = SmallRng::seed_from_u64(21);
        let mut counts = [0_usize; 3];
        for _ in 0..200 {
            let mut player = Player::new();
            let mut synth = Synthesizer::default();
            let outcome =
                explore_with_rng(&mut player, &mut synth, &catalog, &mut ids, &mut rng, "mine");
            let cards = outcome.cards();
            counts[cards.len()] += 1;
            assert!(cards.iter().all(|c| c.key == "fuel" || c.key == "repair"));
            assert_eq!(player.cards.len(), cards.len());
            assert_eq!(synth.energy(), 2);
        }
        assert_eq!(counts[0], 0);
        assert!(counts[1] > 0 && counts[2] > 0);
    }

    #[test]
    fn unknown_location_still_costs_energy() {
        let catalog = CatalogContext::default_config();
        let mut ids = SequentialIds::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut player = Player::new();
        let mut synth = Synthesizer::default();
        let outcome =
            explore_with_rng(&mut player, &mut synth, &catalog, &mut ids, &mut rng, "moon");
        assert_eq!(
            outcome,
            ExploreOutcome::Blocked(ExploreBlockReason::UnknownLocation)
        );
        assert_eq!(synth.energy(), 2);
        assert!(player.cards.is_empty());
    }

    #[test]
    fn zero_energy_is_rejected_without_charge() {
        let catalog = CatalogContext::default_config();
        let mut ids = SequentialIds::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut player = Player::new();
        let mut synth = Synthesizer::default();
        synth.spend(3);
        let outcome =
            explore_with_rng(&mut player, &mut synth, &catalog, &mut ids, &mut rng, "plain");
        assert_eq!(
            outcome,
            ExploreOutcome::Blocked(ExploreBlockReason::InsufficientEnergy)
        );
        assert_eq!(synth.energy(), 0);
    }
}
