//! Recipe matching and quality scoring.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

use crate::card::Card;
use crate::card_trait::TraitTrigger;
use crate::constants::{
    AUXILIARY_SCORE, EXCELLENT_BUFF_TEXT, EXCELLENT_HEAL_FLOOR, EXCELLENT_HEALTH_BONUS,
    EXCELLENT_SATIETY_TURNS, FINE_BUFF_TEXT, FINE_HEAL_FLOOR, FINE_SATIETY_TURNS,
    FRESH_FOOD_SCORE, FULL_VESSEL_SCORE,
};

/// Ingredient names required by a recipe, stored inline for the common case.
pub type IngredientList = SmallVec<[String; 4]>;

/// Crafted product tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    Normal,
    Fine,
    Excellent,
}

impl Quality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Fine => "fine",
            Self::Excellent => "excellent",
        }
    }

    /// One step down, never below `Normal`.
    #[must_use]
    pub const fn downgrade(self) -> Self {
        match self {
            Self::Excellent => Self::Fine,
            Self::Fine | Self::Normal => Self::Normal,
        }
    }

    #[must_use]
    pub const fn trade_multiplier(self) -> u32 {
        match self {
            Self::Normal => 1,
            Self::Fine => 2,
            Self::Excellent => 3,
        }
    }

    #[must_use]
    pub const fn name_prefix(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Fine => Some("Fine"),
            Self::Excellent => Some("Excellent"),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requirements for reaching an upgraded tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRule {
    #[serde(default)]
    pub min_score: Option<u32>,
    /// Trait names; any one of them firing satisfies the rule.
    #[serde(default)]
    pub required_traits: Vec<String>,
}

impl TierRule {
    fn meets_score(&self, score: u32) -> bool {
        self.min_score.is_none_or(|min| score >= min)
    }

    fn meets_traits(&self, triggers: &[TraitTrigger]) -> bool {
        self.required_traits.is_empty()
            || self
                .required_traits
                .iter()
                .any(|name| triggers.iter().any(|t| &t.trait_name == name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRules {
    #[serde(default)]
    pub fine: Option<TierRule>,
    #[serde(default)]
    pub excellent: Option<TierRule>,
}

/// Bonus granted by an auxiliary card when used with a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryEffect {
    #[serde(default)]
    pub heal_bonus: u32,
    #[serde(default)]
    pub buff_text: Option<String>,
    #[serde(default)]
    pub quality_bonus: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    /// Empty means the recipe accepts any ingredient set.
    #[serde(default)]
    pub required_ingredients: IngredientList,
    #[serde(default)]
    pub base_quality: Quality,
    pub base_heal_value: u32,
    #[serde(default)]
    pub base_buff_text: String,
    pub base_trade_value: u32,
    #[serde(default)]
    pub quality_rules: QualityRules,
    #[serde(default)]
    pub auxiliary_effects: HashMap<String, AuxiliaryEffect>,
}

impl Recipe {
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.required_ingredients.is_empty()
    }

    /// Whether the multiset of `food_names` contains every required ingredient.
    #[must_use]
    pub fn accepts(&self, food_names: &[&str]) -> bool {
        let mut available: HashMap<&str, usize> = HashMap::new();
        for name in food_names {
            *available.entry(name).or_default() += 1;
        }
        self.required_ingredients.iter().all(|required| {
            available
                .get_mut(required.as_str())
                .is_some_and(|count| match *count {
                    0 => false,
                    _ => {
                        *count -= 1;
                        true
                    }
                })
        })
    }

    /// Display name of a product of this recipe at `quality`.
    #[must_use]
    pub fn product_name(&self, quality: Quality) -> String {
        quality.name_prefix().map_or_else(
            || self.name.clone(),
            |prefix| format!("{prefix} {}", self.name),
        )
    }

    fn auxiliary_effect(&self, card: &Card) -> Option<&AuxiliaryEffect> {
        self.auxiliary_effects.get(&card.name)
    }
}

/// Pick the most specific recipe for `food_names`.
///
/// Non-wildcard recipes win by required-ingredient count, ties keep catalog
/// order; the first wildcard recipe is the fallback.
#[must_use]
pub fn find_matching_recipe<'a>(recipes: &'a [Recipe], food_names: &[&str]) -> Option<&'a Recipe> {
    let mut best: Option<&Recipe> = None;
    for recipe in recipes.iter().filter(|r| !r.is_wildcard()) {
        if !recipe.accepts(food_names) {
            continue;
        }
        if best.is_none_or(|b| recipe.required_ingredients.len() > b.required_ingredients.len()) {
            best = Some(recipe);
        }
    }
    best.or_else(|| recipes.iter().find(|r| r.is_wildcard()))
}

/// Inputs to the quality score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub foods: &'a [&'a Card],
    /// Vessel as it was before this operation wore it down.
    pub vessel_at_full_durability: bool,
    pub auxiliaries: &'a [&'a Card],
    pub triggers: &'a [TraitTrigger],
}

#[must_use]
pub fn quality_score(recipe: &Recipe, inputs: &ScoreInputs<'_>) -> u32 {
    let fresh = count_u32(inputs.foods.iter().filter(|c| !c.is_spoiled()).count());
    let freshness = fresh * FRESH_FOOD_SCORE;
    let vessel = if inputs.vessel_at_full_durability {
        FULL_VESSEL_SCORE
    } else {
        0
    };
    let auxiliary = count_u32(inputs.auxiliaries.len()) * AUXILIARY_SCORE;
    let auxiliary_bonus: u32 = inputs
        .auxiliaries
        .iter()
        .filter_map(|card| recipe.auxiliary_effect(card))
        .map(|effect| effect.quality_bonus)
        .sum();
    let trait_bonus: u32 = inputs.triggers.iter().map(|t| t.effect.bonus_score()).sum();
    freshness + vessel + auxiliary + auxiliary_bonus + trait_bonus
}

/// Resolve the tier a score earns for `recipe`.
#[must_use]
pub fn resolve_quality(recipe: &Recipe, score: u32, triggers: &[TraitTrigger]) -> Quality {
    let upgraded = triggers.iter().any(|t| t.effect.upgrades_quality());

    if let Some(rule) = &recipe.quality_rules.excellent
        && rule.meets_score(score)
        && (rule.meets_traits(triggers) || upgraded)
    {
        return Quality::Excellent;
    }

    if let Some(rule) = &recipe.quality_rules.fine
        && (rule.meets_score(score) || upgraded)
    {
        return Quality::Fine;
    }

    recipe.base_quality
}

/// Derived stats of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStats {
    pub heal_value: u32,
    pub buff_text: String,
    pub satiety_turns: u32,
    pub health_bonus: u32,
    pub trade_value: u32,
}

/// Stats for `recipe` at `quality`, with auxiliary table adjustments applied.
#[must_use]
pub fn product_stats(recipe: &Recipe, quality: Quality, auxiliaries: &[&Card]) -> ProductStats {
    let mut stats = ProductStats {
        heal_value: recipe.base_heal_value,
        buff_text: recipe.base_buff_text.clone(),
        satiety_turns: 0,
        health_bonus: 0,
        trade_value: recipe
            .base_trade_value
            .saturating_mul(quality.trade_multiplier()),
    };

    match quality {
        Quality::Normal => {}
        Quality::Fine => {
            stats.heal_value = stats.heal_value.max(FINE_HEAL_FLOOR);
            stats.buff_text = FINE_BUFF_TEXT.to_string();
            stats.satiety_turns = FINE_SATIETY_TURNS;
        }
        Quality::Excellent => {
            stats.heal_value = stats.heal_value.max(EXCELLENT_HEAL_FLOOR);
            stats.buff_text = EXCELLENT_BUFF_TEXT.to_string();
            stats.satiety_turns = EXCELLENT_SATIETY_TURNS;
            stats.health_bonus = EXCELLENT_HEALTH_BONUS;
        }
    }

    apply_auxiliary_effects(recipe, auxiliaries, &mut stats);
    stats
}

/// Add each auxiliary's heal bonus and append its buff text.
pub fn apply_auxiliary_effects(recipe: &Recipe, auxiliaries: &[&Card], stats: &mut ProductStats) {
    for effect in auxiliaries
        .iter()
        .filter_map(|card| recipe.auxiliary_effect(card))
    {
        stats.heal_value = stats.heal_value.saturating_add(effect.heal_bonus);
        if let Some(extra) = effect.buff_text.as_deref() {
            append_buff_text(&mut stats.buff_text, extra);
        }
    }
}

fn append_buff_text(buff_text: &mut String, extra: &str) {
    if buff_text.is_empty() {
        buff_text.push_str(extra);
    } else {
        buff_text.push(' ');
        buff_text.push_str(extra);
    }
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
