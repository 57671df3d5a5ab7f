//! Probabilistic card abilities.
//!
//! A trait only declares *what* happens through a closed [`TraitEffect`]
//! tag; the crafting engine decides how each tag changes an outcome.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::card::CardId;

/// Engine-interpreted effect emitted when a trait fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitEffect {
    /// Processing tools yield every replacement twice.
    DoubleYield,
    /// Counts as a quality upgrade when tiers are resolved.
    QualityUpgrade,
    /// Quality upgrade that also spares the card from consumption.
    FreeEliteQuality,
    /// Adds points to the quality score.
    BonusScore(u32),
    /// Descriptive only.
    Passive,
}

impl TraitEffect {
    /// Whether this effect lifts the resolved quality tier.
    #[must_use]
    pub const fn upgrades_quality(self) -> bool {
        matches!(self, Self::QualityUpgrade | Self::FreeEliteQuality)
    }

    #[must_use]
    pub const fn bonus_score(self) -> u32 {
        match self {
            Self::BonusScore(points) => points,
            _ => 0,
        }
    }
}

/// Optional ability attached to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTrait {
    pub name: String,
    /// Chance in `[0, 1]`; `None` always fires.
    #[serde(default)]
    pub probability: Option<f64>,
    pub effect: TraitEffect,
    /// Minimum turns the card must have been held before the trait can fire.
    #[serde(default)]
    pub min_age_turns: u32,
    #[serde(default)]
    pub description: String,
}

impl CardTrait {
    #[must_use]
    pub fn new(name: &str, effect: TraitEffect) -> Self {
        Self {
            name: name.to_string(),
            probability: None,
            effect,
            min_age_turns: 0,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    #[must_use]
    pub const fn with_min_age(mut self, turns: u32) -> Self {
        self.min_age_turns = turns;
        self
    }
}

/// Per-invocation data the resolver needs from the owning card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraitContext {
    pub age_turns: u32,
}

/// Record of a trait that fired during an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitTrigger {
    pub card_id: CardId,
    pub card_name: String,
    pub trait_name: String,
    pub effect: TraitEffect,
}

/// Draw once and report whether `card_trait` fires.
///
/// Exactly one uniform value is drawn per call, even when the age gate
/// rejects the trigger, so stream positions do not depend on card age.
pub fn resolve_trait<R>(card_trait: &CardTrait, ctx: TraitContext, rng: &mut R) -> Option<TraitEffect>
where
    R: Rng + ?Sized,
{
    let roll = rng.r#gen::<f64>();
    if ctx.age_turns < card_trait.min_age_turns {
        return None;
    }
    match card_trait.probability {
        Some(probability) if !probability.is_finite() || roll >= probability.clamp(0.0, 1.0) => {
            None
        }
        _ => Some(card_trait.effect),
    }
}
