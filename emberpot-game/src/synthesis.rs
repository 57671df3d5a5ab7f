//! Crafting engine: the Preprocess → Cook → Season pipeline and the
//! single-shot Full-Throw gamble.
//!
//! Every operation plans first (validation, random draws, card creation)
//! and only then touches the player's inventory, so a failed request never
//! leaves partial mutations behind. The one exception is energy: any request
//! that gets past the energy check is charged, whatever happens next.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::card::{Card, CardId, CardKind, CardType, IdSource, SpecialRole, ToolRole};
use crate::card_trait::{TraitEffect, TraitTrigger};
use crate::catalog::CatalogContext;
use crate::constants::{
    ACTION_ENERGY_COST, CHAOS_CHANCE, CHAOS_MAX_REMOVED, CHAOS_MIN_REMOVED, FULL_THROW_TOOL_WEAR,
    LOG_TARGET_CRAFT, PREPROCESS_PRICE_BUMP, STEP_TOOL_WEAR,
};
use crate::inventory::{Player, Synthesizer};
use crate::recipe::{
    ProductStats, Quality, Recipe, ScoreInputs, apply_auxiliary_effects, find_matching_recipe,
    product_stats, quality_score, resolve_quality,
};
use crate::store::sell_price;

/// Stage of stepwise synthesis, chosen explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStage {
    Preprocess,
    Cook,
    Season,
}

impl SynthesisStage {
    pub const ALL: [Self; 3] = [Self::Preprocess, Self::Cook, Self::Season];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::Cook => "cook",
            Self::Season => "season",
        }
    }
}

impl fmt::Display for SynthesisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynthesisStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown synthesis stage `{s}`"))
    }
}

/// Structured result of any crafting request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub success: bool,
    pub message: String,
    /// `None` for Full-Throw.
    pub stage: Option<SynthesisStage>,
    /// Cards removed from the inventory, as they were when removed.
    pub consumed: Vec<Card>,
    /// Cards that took part and stay owned with reduced durability or uses.
    pub worn: Vec<Card>,
    /// Ingredients that are now preprocessed, new or updated in place.
    pub prepared: Vec<Card>,
    pub product: Option<Card>,
    pub quality: Option<Quality>,
    pub trait_triggers: Vec<TraitTrigger>,
    /// Ingredients lost to the chaos event, when it fired.
    pub chaos: Option<usize>,
    pub energy_spent: u32,
    /// A fire source took part in producing the dish.
    pub fire_used: bool,
}

impl SynthesisOutcome {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Succeeded and produced a dish.
    #[must_use]
    pub const fn produced_dish(&self) -> bool {
        self.success && self.product.is_some()
    }

    fn with_stage(mut self, stage: Option<SynthesisStage>) -> Self {
        self.stage = stage;
        self
    }
}

/// Roll `card`'s trait and describe the trigger if it fires.
pub fn roll_trait<R>(card: &Card, rng: &mut R) -> Option<TraitTrigger>
where
    R: Rng + ?Sized,
{
    let effect = card.trigger_trait(rng)?;
    let trait_name = card.card_trait.as_ref()?.name.clone();
    log::debug!(target: LOG_TARGET_CRAFT, "{} triggered {trait_name} ({effect:?})", card.name);
    Some(TraitTrigger {
        card_id: card.id,
        card_name: card.name.clone(),
        trait_name,
        effect,
    })
}

/// Build a dish card for `recipe` at `quality`.
pub fn build_product<I>(recipe: &Recipe, quality: Quality, stats: ProductStats, ids: &mut I) -> Card
where
    I: IdSource + ?Sized,
{
    Card {
        id: ids.next_id(),
        key: String::new(),
        name: recipe.product_name(quality),
        card_trait: None,
        kind: CardKind::Product {
            recipe_id: Some(recipe.id.clone()),
            quality,
            heal_value: stats.heal_value,
            buff_text: stats.buff_text,
            satiety_turns: stats.satiety_turns,
            health_bonus: stats.health_bonus,
            trade_value: stats.trade_value,
        },
    }
}

/// A fire source with fuel left.
fn is_burning_fire(card: &Card) -> bool {
    card.special_role() == Some(SpecialRole::FireSource) && card.is_usable()
}

/// Everything a crafting request reads or mutates.
pub struct SynthesisEngine<'a, R: ?Sized, I: ?Sized> {
    player: &'a mut Player,
    synthesizer: &'a mut Synthesizer,
    catalog: &'a CatalogContext,
    ids: &'a mut I,
    rng: &'a mut R,
}

impl<'a, R, I> SynthesisEngine<'a, R, I>
where
    R: Rng + ?Sized,
    I: IdSource + ?Sized,
{
    pub fn new(
        player: &'a mut Player,
        synthesizer: &'a mut Synthesizer,
        catalog: &'a CatalogContext,
        ids: &'a mut I,
        rng: &'a mut R,
    ) -> Self {
        Self {
            player,
            synthesizer,
            catalog,
            ids,
            rng,
        }
    }

    /// Run one explicitly chosen stage of stepwise synthesis.
    pub fn step(&mut self, selection: &[CardId], stage: SynthesisStage) -> SynthesisOutcome {
        if !self.synthesizer.spend(ACTION_ENERGY_COST) {
            return SynthesisOutcome::failure("Not enough synthesizer energy")
                .with_stage(Some(stage));
        }
        let cards = self.select(selection);
        let mut outcome = match stage {
            SynthesisStage::Preprocess => self.preprocess(&cards),
            SynthesisStage::Cook => self.cook(&cards),
            SynthesisStage::Season => self.season(&cards),
        };
        outcome.stage = Some(stage);
        outcome.energy_spent = ACTION_ENERGY_COST;
        outcome
    }

    /// Throw everything into the pot at once.
    pub fn full_throw(&mut self, selection: &[CardId]) -> SynthesisOutcome {
        if !self.synthesizer.spend(ACTION_ENERGY_COST) {
            return SynthesisOutcome::failure("Not enough synthesizer energy");
        }
        let cards: Vec<Card> = self
            .select(selection)
            .into_iter()
            .filter(|card| !card.is_type(CardType::Product))
            .collect();
        let mut outcome = self.throw(&cards);
        outcome.energy_spent = ACTION_ENERGY_COST;
        outcome
    }

    /// Owned cards for `selection`, deduplicated, unknown ids skipped.
    fn select(&self, selection: &[CardId]) -> Vec<Card> {
        let mut seen = BTreeSet::new();
        selection
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.player.card(*id))
            .cloned()
            .collect()
    }

    fn preprocess(&mut self, cards: &[Card]) -> SynthesisOutcome {
        let catalog = self.catalog;
        let tools: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Tool) && card.is_usable())
            .collect();
        if tools.is_empty() {
            return SynthesisOutcome::failure("Preprocessing needs a usable tool");
        }
        let foods: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Food))
            .collect();
        if foods.is_empty() {
            return SynthesisOutcome::failure("Preprocessing needs at least one ingredient");
        }

        let mut triggers = Vec::new();
        let mut doubled = BTreeSet::new();
        for tool in &tools {
            if let Some(trigger) = roll_trait(tool, self.rng) {
                if trigger.effect == TraitEffect::DoubleYield {
                    doubled.insert(tool.id);
                }
                triggers.push(trigger);
            }
        }

        let mut durability: Vec<u32> = tools
            .iter()
            .map(|tool| tool.durability().map_or(0, |(current, _)| current))
            .collect();
        let mut wear = vec![0_u32; tools.len()];
        let mut replaced = Vec::new();
        let mut new_cards = Vec::new();
        let mut marked = Vec::new();

        for food in &foods {
            let rule = tools.iter().enumerate().find_map(|(idx, tool)| {
                (durability[idx] > 0)
                    .then(|| catalog.processing_rule(&tool.name, &food.name))
                    .flatten()
                    .map(|names| (idx, names))
            });

            let Some((idx, names)) = rule else {
                if let Some(trigger) = roll_trait(food, self.rng) {
                    triggers.push(trigger);
                }
                if !food.is_preprocessed() {
                    marked.push(food.id);
                }
                continue;
            };

            let tool = tools[idx];
            durability[idx] = durability[idx].saturating_sub(STEP_TOOL_WEAR);
            wear[idx] += STEP_TOOL_WEAR;
            let copies = if doubled.contains(&tool.id) { 2 } else { 1 };
            let remaining_spoil = match food.kind {
                CardKind::Food {
                    remaining_spoil, ..
                } => remaining_spoil,
                _ => 0,
            };
            let original_price = sell_price(food);

            for name in names {
                let base_price = catalog.food_base_price(name);
                for _ in 0..copies {
                    let Some((mut card, base_price)) = catalog
                        .create_card_by_name(name, self.ids)
                        .zip(base_price)
                    else {
                        log::error!(
                            target: LOG_TARGET_CRAFT,
                            "processing rule {}/{} names unknown ingredient `{name}`",
                            tool.name,
                            food.name
                        );
                        return SynthesisOutcome::failure(format!(
                            "Data error: {} turns {} into unknown ingredient `{name}`",
                            tool.name, food.name
                        ));
                    };
                    card.cap_spoil(remaining_spoil);
                    card.mark_preprocessed();
                    card.set_trade_value(original_price.max(base_price) + PREPROCESS_PRICE_BUMP);
                    new_cards.push(card);
                }
            }
            replaced.push(food.id);
        }

        for units in &mut wear {
            if *units == 0 {
                *units = STEP_TOOL_WEAR;
            }
        }

        let mut outcome = SynthesisOutcome {
            success: true,
            trait_triggers: triggers,
            ..SynthesisOutcome::default()
        };
        for (tool, units) in tools.iter().zip(wear) {
            self.wear_tool(tool.id, units, &mut outcome);
        }
        for id in replaced {
            self.remove(id, &mut outcome);
        }
        for id in marked {
            if let Some(card) = self.player.card_mut(id) {
                let price = sell_price(card) + PREPROCESS_PRICE_BUMP;
                card.mark_preprocessed();
                card.set_trade_value(price);
                outcome.prepared.push(card.clone());
            }
        }
        outcome.prepared.extend(new_cards.iter().cloned());
        self.player.add_cards(new_cards);
        outcome.message = format!("Prepared {} ingredient(s)", outcome.prepared.len());
        outcome
    }

    fn cook(&mut self, cards: &[Card]) -> SynthesisOutcome {
        let catalog = self.catalog;
        let Some(vessel) = cards
            .iter()
            .find(|card| card.tool_role() == Some(ToolRole::Vessel) && card.is_usable())
        else {
            return SynthesisOutcome::failure("Cooking needs a usable pot");
        };
        if !cards.iter().any(is_burning_fire) {
            return SynthesisOutcome::failure("Cooking needs a burning fire");
        }
        let foods: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Food) && card.is_preprocessed())
            .collect();
        if foods.is_empty() {
            return SynthesisOutcome::failure("Cooking needs preprocessed ingredients");
        }
        let fuel = cards
            .iter()
            .find(|card| card.special_role() == Some(SpecialRole::Fuel));
        let auxiliaries: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Auxiliary) && card.is_usable())
            .collect();

        let names: Vec<&str> = foods.iter().map(|card| card.name.as_str()).collect();
        let Some(recipe) = find_matching_recipe(catalog.recipes(), &names) else {
            return SynthesisOutcome::failure("No recipe matches these ingredients");
        };

        let triggers: Vec<TraitTrigger> = foods
            .iter()
            .filter_map(|food| roll_trait(food, self.rng))
            .collect();
        let product = self.plan_product(
            recipe,
            &foods,
            vessel.has_full_durability(),
            &auxiliaries,
            &triggers,
            false,
        );

        let mut outcome = SynthesisOutcome {
            success: true,
            quality: product.quality(),
            trait_triggers: triggers,
            fire_used: true,
            ..SynthesisOutcome::default()
        };
        self.wear_tool(vessel.id, STEP_TOOL_WEAR, &mut outcome);
        if let Some(fuel) = fuel {
            self.spend_use(fuel.id, &mut outcome);
        }
        for auxiliary in &auxiliaries {
            self.spend_use(auxiliary.id, &mut outcome);
        }
        for food in &foods {
            self.remove(food.id, &mut outcome);
        }
        outcome.message = format!("Cooked {}", product.name);
        self.player.add_card(product.clone());
        outcome.product = Some(product);
        outcome
    }

    fn season(&mut self, cards: &[Card]) -> SynthesisOutcome {
        let catalog = self.catalog;
        let products: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Product))
            .collect();
        let [dish] = products.as_slice() else {
            return SynthesisOutcome::failure("Seasoning needs exactly one dish");
        };
        let auxiliaries: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Auxiliary) && card.is_usable())
            .collect();
        if auxiliaries.is_empty() {
            return SynthesisOutcome::failure("Seasoning needs at least one seasoning");
        }

        let recipe = match &dish.kind {
            CardKind::Product {
                recipe_id: Some(id),
                ..
            } => match catalog.recipe(id) {
                Some(recipe) => Some(recipe),
                None => {
                    log::error!(target: LOG_TARGET_CRAFT, "{} references unknown recipe `{id}`", dish.name);
                    return SynthesisOutcome::failure(format!(
                        "Data error: {} comes from unknown recipe `{id}`",
                        dish.name
                    ));
                }
            },
            _ => None,
        };

        let mut enhanced = (*dish).clone();
        enhanced.id = self.ids.next_id();
        let bump = u32::try_from(auxiliaries.len()).unwrap_or(u32::MAX);
        if let CardKind::Product {
            heal_value,
            buff_text,
            trade_value,
            ..
        } = &mut enhanced.kind
        {
            if let Some(recipe) = recipe {
                let mut stats = ProductStats {
                    heal_value: *heal_value,
                    buff_text: std::mem::take(buff_text),
                    ..ProductStats::default()
                };
                apply_auxiliary_effects(recipe, &auxiliaries, &mut stats);
                *heal_value = stats.heal_value;
                *buff_text = stats.buff_text;
            }
            *trade_value = trade_value.saturating_add(bump);
        }

        let mut outcome = SynthesisOutcome {
            success: true,
            quality: enhanced.quality(),
            ..SynthesisOutcome::default()
        };
        for auxiliary in &auxiliaries {
            self.spend_use(auxiliary.id, &mut outcome);
        }
        self.remove(dish.id, &mut outcome);
        outcome.message = format!("Seasoned {}", enhanced.name);
        self.player.add_card(enhanced.clone());
        outcome.product = Some(enhanced);
        outcome
    }

    fn throw(&mut self, cards: &[Card]) -> SynthesisOutcome {
        let catalog = self.catalog;
        let vessel = cards
            .iter()
            .find(|card| card.tool_role() == Some(ToolRole::Vessel) && card.is_usable());
        let has_fire = cards.iter().any(is_burning_fire);
        let foods: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Food))
            .collect();
        let Some(vessel) = vessel.filter(|_| has_fire && !foods.is_empty()) else {
            return SynthesisOutcome::failure(
                "Full-throw needs a usable pot, a burning fire and at least one ingredient",
            );
        };
        let tools: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Tool))
            .collect();
        let auxiliaries: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Auxiliary))
            .collect();
        let specials: Vec<&Card> = cards
            .iter()
            .filter(|card| card.is_type(CardType::Special))
            .collect();

        let mut lost = BTreeSet::new();
        if self.rng.gen_bool(CHAOS_CHANCE) {
            let count = self
                .rng
                .gen_range(CHAOS_MIN_REMOVED..=CHAOS_MAX_REMOVED)
                .min(foods.len());
            lost.extend(foods.choose_multiple(self.rng, count).map(|card| card.id));
            log::debug!(target: LOG_TARGET_CRAFT, "chaotic cook: {count} ingredient(s) lost");
        }
        let chaos = (!lost.is_empty()).then_some(lost.len());
        let kept: Vec<&Card> = foods
            .iter()
            .copied()
            .filter(|card| !lost.contains(&card.id))
            .collect();

        // An empty pot still falls through to the wildcard recipe.
        let names: Vec<&str> = kept.iter().map(|card| card.name.as_str()).collect();
        let Some(recipe) = find_matching_recipe(catalog.recipes(), &names) else {
            log::error!(
                target: LOG_TARGET_CRAFT,
                "no recipe, wildcard included, matches {names:?}"
            );
            return SynthesisOutcome::failure(
                "Data error: the catalog has no fallback recipe for a full throw",
            );
        };

        let triggers: Vec<TraitTrigger> = specials
            .iter()
            .chain(&kept)
            .filter_map(|card| roll_trait(card, self.rng))
            .collect();
        let spared: BTreeSet<CardId> = triggers
            .iter()
            .filter(|trigger| trigger.effect == TraitEffect::FreeEliteQuality)
            .map(|trigger| trigger.card_id)
            .collect();

        let product = self.plan_product(
            recipe,
            &kept,
            vessel.has_full_durability(),
            &auxiliaries,
            &triggers,
            chaos.is_some(),
        );

        let mut outcome = SynthesisOutcome {
            success: true,
            quality: product.quality(),
            trait_triggers: triggers,
            chaos,
            fire_used: true,
            ..SynthesisOutcome::default()
        };
        for tool in &tools {
            self.wear_tool(tool.id, FULL_THROW_TOOL_WEAR, &mut outcome);
        }
        for card in foods.iter().chain(&auxiliaries).chain(&specials) {
            if !spared.contains(&card.id) {
                self.remove(card.id, &mut outcome);
            }
        }
        outcome.message = match chaos {
            Some(count) if kept.is_empty() => format!(
                "Chaotic cook! All {count} ingredient(s) burned, salvaged {}",
                product.name
            ),
            Some(count) => format!("Chaotic cook! Lost {count} ingredient(s), made {}", product.name),
            None => format!("Threw it all in and made {}", product.name),
        };
        self.player.add_card(product.clone());
        outcome.product = Some(product);
        outcome
    }

    fn plan_product(
        &mut self,
        recipe: &Recipe,
        foods: &[&Card],
        vessel_at_full_durability: bool,
        auxiliaries: &[&Card],
        triggers: &[TraitTrigger],
        chaotic: bool,
    ) -> Card {
        let score = quality_score(
            recipe,
            &ScoreInputs {
                foods,
                vessel_at_full_durability,
                auxiliaries,
                triggers,
            },
        );
        let mut quality = resolve_quality(recipe, score, triggers);
        if chaotic {
            quality = quality.downgrade();
        }
        log::debug!(
            target: LOG_TARGET_CRAFT,
            "recipe {} scored {score}, quality {quality}",
            recipe.id
        );
        let stats = product_stats(recipe, quality, auxiliaries);
        build_product(recipe, quality, stats, self.ids)
    }

    fn remove(&mut self, id: CardId, outcome: &mut SynthesisOutcome) {
        if let Some(card) = self.player.remove_card(id) {
            outcome.consumed.push(card);
        }
    }

    fn wear_tool(&mut self, id: CardId, amount: u32, outcome: &mut SynthesisOutcome) {
        let Some(card) = self.player.card_mut(id) else {
            return;
        };
        card.consume_durability(amount);
        if card.is_usable() {
            outcome.worn.push(card.clone());
        } else {
            self.remove(id, outcome);
        }
    }

    fn spend_use(&mut self, id: CardId, outcome: &mut SynthesisOutcome) {
        let Some(card) = self.player.card_mut(id) else {
            return;
        };
        if card.destroyed_on_use() {
            card.exhaust();
            self.remove(id, outcome);
        } else if card.consume_use() {
            outcome.worn.push(card.clone());
        } else {
            self.remove(id, outcome);
        }
    }
}
