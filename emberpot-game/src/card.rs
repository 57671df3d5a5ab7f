//! Card model shared by every system that owns, consumes or produces cards.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::card_trait::{CardTrait, TraitContext, TraitEffect, resolve_trait};
use crate::recipe::Quality;

/// Stable identity of a card instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-{}", self.0)
    }
}

/// Source of fresh card identities.
pub trait IdSource {
    fn next_id(&mut self) -> CardId;
}

/// Monotonic counter; the default identity source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    #[must_use]
    pub const fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> CardId {
        self.next = self.next.saturating_add(1);
        CardId(self.next)
    }
}

/// Coarse card category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Tool,
    Food,
    Auxiliary,
    Special,
    Product,
}

impl CardType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Food => "food",
            Self::Auxiliary => "auxiliary",
            Self::Special => "special",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a tool plays in the crafting pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRole {
    /// The cooking vessel required by Cook and Full-Throw.
    Vessel,
}

/// Role a special card plays in crafting or survival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialRole {
    FireSource,
    Fuel,
    Bait,
    Repair,
}

/// Variant-specific card data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    Tool {
        durability: u32,
        max_durability: u32,
        #[serde(default)]
        role: Option<ToolRole>,
    },
    Food {
        spoil_turns: u32,
        remaining_spoil: u32,
        #[serde(default)]
        preprocessed: bool,
        #[serde(default)]
        trade_value: Option<u32>,
    },
    Auxiliary {
        uses: u32,
        #[serde(default)]
        effect: String,
        /// Destroyed outright whenever it is used.
        #[serde(default)]
        destroy_on_use: bool,
    },
    Special {
        #[serde(default)]
        uses: Option<u32>,
        #[serde(default)]
        effect: String,
        #[serde(default)]
        role: Option<SpecialRole>,
        #[serde(default)]
        sell_value: Option<u32>,
    },
    Product {
        #[serde(default)]
        recipe_id: Option<String>,
        quality: Quality,
        heal_value: u32,
        #[serde(default)]
        buff_text: String,
        #[serde(default)]
        satiety_turns: u32,
        #[serde(default)]
        health_bonus: u32,
        trade_value: u32,
    },
}

/// A single owned, consumable or produced game object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    /// Catalog key this card was created from; empty for crafted products.
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default, rename = "trait")]
    pub card_trait: Option<CardTrait>,
    pub kind: CardKind,
}

impl Card {
    #[must_use]
    pub const fn card_type(&self) -> CardType {
        match self.kind {
            CardKind::Tool { .. } => CardType::Tool,
            CardKind::Food { .. } => CardType::Food,
            CardKind::Auxiliary { .. } => CardType::Auxiliary,
            CardKind::Special { .. } => CardType::Special,
            CardKind::Product { .. } => CardType::Product,
        }
    }

    #[must_use]
    pub const fn is_type(&self, card_type: CardType) -> bool {
        matches!(
            (&self.kind, card_type),
            (CardKind::Tool { .. }, CardType::Tool)
                | (CardKind::Food { .. }, CardType::Food)
                | (CardKind::Auxiliary { .. }, CardType::Auxiliary)
                | (CardKind::Special { .. }, CardType::Special)
                | (CardKind::Product { .. }, CardType::Product)
        )
    }

    /// Food only: the spoil countdown has run out.
    #[must_use]
    pub const fn is_spoiled(&self) -> bool {
        matches!(
            self.kind,
            CardKind::Food {
                remaining_spoil: 0,
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self.kind, CardKind::Food { .. }) && !self.is_spoiled()
    }

    #[must_use]
    pub const fn is_preprocessed(&self) -> bool {
        matches!(
            self.kind,
            CardKind::Food {
                preprocessed: true,
                ..
            }
        )
    }

    /// Turns this food has been held, derived from its spoil countdown.
    #[must_use]
    pub const fn age_turns(&self) -> u32 {
        match self.kind {
            CardKind::Food {
                spoil_turns,
                remaining_spoil,
                ..
            } => spoil_turns.saturating_sub(remaining_spoil),
            _ => 0,
        }
    }

    #[must_use]
    pub const fn tool_role(&self) -> Option<ToolRole> {
        match self.kind {
            CardKind::Tool { role, .. } => role,
            _ => None,
        }
    }

    #[must_use]
    pub const fn special_role(&self) -> Option<SpecialRole> {
        match self.kind {
            CardKind::Special { role, .. } => role,
            _ => None,
        }
    }

    #[must_use]
    pub const fn durability(&self) -> Option<(u32, u32)> {
        match self.kind {
            CardKind::Tool {
                durability,
                max_durability,
                ..
            } => Some((durability, max_durability)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn has_full_durability(&self) -> bool {
        matches!(self.durability(), Some((current, max)) if current == max)
    }

    /// Remaining uses of auxiliary and special cards.
    #[must_use]
    pub const fn uses(&self) -> Option<u32> {
        match self.kind {
            CardKind::Auxiliary { uses, .. } => Some(uses),
            CardKind::Special { uses, .. } => uses,
            _ => None,
        }
    }

    #[must_use]
    pub const fn quality(&self) -> Option<Quality> {
        match self.kind {
            CardKind::Product { quality, .. } => Some(quality),
            _ => None,
        }
    }

    #[must_use]
    pub const fn destroyed_on_use(&self) -> bool {
        matches!(
            self.kind,
            CardKind::Auxiliary {
                destroy_on_use: true,
                ..
            }
        )
    }

    /// Trade value set explicitly on the card, if any.
    #[must_use]
    pub const fn explicit_trade_value(&self) -> Option<u32> {
        match self.kind {
            CardKind::Food { trade_value, .. } => trade_value,
            CardKind::Product { trade_value, .. } => Some(trade_value),
            _ => None,
        }
    }

    /// Tool only: lose `amount` durability, clamping at zero.
    pub fn consume_durability(&mut self, amount: u32) {
        if let CardKind::Tool { durability, .. } = &mut self.kind {
            *durability = durability.saturating_sub(amount);
        }
    }

    /// Auxiliary/special only: spend one use. Returns whether uses remain.
    pub fn consume_use(&mut self) -> bool {
        match &mut self.kind {
            CardKind::Auxiliary { uses, .. }
            | CardKind::Special {
                uses: Some(uses), ..
            } => {
                *uses = uses.saturating_sub(1);
                *uses > 0
            }
            _ => false,
        }
    }

    /// Auxiliary/special only: drop every remaining use.
    pub fn exhaust(&mut self) {
        match &mut self.kind {
            CardKind::Auxiliary { uses, .. }
            | CardKind::Special {
                uses: Some(uses), ..
            } => *uses = 0,
            _ => {}
        }
    }

    #[must_use]
    pub const fn is_usable(&self) -> bool {
        match self.kind {
            CardKind::Tool { durability, .. } => durability > 0,
            CardKind::Auxiliary { uses, .. }
            | CardKind::Special {
                uses: Some(uses), ..
            } => uses > 0,
            _ => true,
        }
    }

    /// Food only; idempotent.
    pub fn mark_preprocessed(&mut self) {
        if let CardKind::Food { preprocessed, .. } = &mut self.kind {
            *preprocessed = true;
        }
    }

    /// Set the trade value of food or product cards.
    pub fn set_trade_value(&mut self, value: u32) {
        match &mut self.kind {
            CardKind::Food { trade_value, .. } => *trade_value = Some(value),
            CardKind::Product { trade_value, .. } => *trade_value = value,
            _ => {}
        }
    }

    /// Food only: one turn passes, clamping at zero.
    pub fn tick_spoil(&mut self) -> bool {
        if let CardKind::Food {
            remaining_spoil, ..
        } = &mut self.kind
            && *remaining_spoil > 0
        {
            *remaining_spoil -= 1;
            return *remaining_spoil == 0;
        }
        false
    }

    /// Food only: lower the spoil countdown to at most `remaining`.
    pub fn cap_spoil(&mut self, remaining: u32) {
        if let CardKind::Food {
            remaining_spoil, ..
        } = &mut self.kind
        {
            *remaining_spoil = (*remaining_spoil).min(remaining);
        }
    }

    /// Tool only: restore full durability.
    pub fn repair(&mut self) {
        if let CardKind::Tool {
            durability,
            max_durability,
            ..
        } = &mut self.kind
        {
            *durability = *max_durability;
        }
    }

    /// Auxiliary/special only: add uses back.
    pub fn restock(&mut self, amount: u32) {
        match &mut self.kind {
            CardKind::Auxiliary { uses, .. }
            | CardKind::Special {
                uses: Some(uses), ..
            } => *uses = uses.saturating_add(amount),
            CardKind::Special { uses, .. } => *uses = Some(amount),
            _ => {}
        }
    }

    /// Roll this card's trait, if it has one.
    pub fn trigger_trait<R>(&self, rng: &mut R) -> Option<TraitEffect>
    where
        R: Rng + ?Sized,
    {
        let card_trait = self.card_trait.as_ref()?;
        let ctx = TraitContext {
            age_turns: self.age_turns(),
        };
        resolve_trait(card_trait, ctx, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_trait::TraitEffect;
    use rand::rngs::mock::StepRng;

    fn tool(durability: u32) -> Card {
        Card {
            id: CardId(1),
            key: "knife".to_string(),
            name: "Knife".to_string(),
            card_trait: None,
            kind: CardKind::Tool {
                durability,
                max_durability: 3,
                role: None,
            },
        }
    }

    fn food(remaining: u32) -> Card {
        Card {
            id: CardId(2),
            key: "tomato".to_string(),
            name: "Tomato".to_string(),
            card_trait: None,
            kind: CardKind::Food {
                spoil_turns: 3,
                remaining_spoil: remaining,
                preprocessed: false,
                trade_value: None,
            },
        }
    }

    fn salt(uses: u32) -> Card {
        Card {
            id: CardId(3),
            key: "salt".to_string(),
            name: "Salt".to_string(),
            card_trait: None,
            kind: CardKind::Auxiliary {
                uses,
                effect: String::new(),
                destroy_on_use: false,
            },
        }
    }

    #[test]
    fn sequential_ids_are_monotonic() {
        let mut ids = SequentialIds::default();
        assert_eq!(ids.next_id(), CardId(1));
        assert_eq!(ids.next_id(), CardId(2));
        assert_eq!(CardId(7).to_string(), "card-7");
    }

    #[test]
    fn durability_clamps_at_zero() {
        let mut knife = tool(1);
        assert!(knife.is_usable());
        knife.consume_durability(5);
        assert_eq!(knife.durability(), Some((0, 3)));
        assert!(!knife.is_usable());
        knife.repair();
        assert!(knife.has_full_durability());
    }

    #[test]
    fn consume_use_reports_remaining() {
        let mut aux = salt(2);
        assert!(aux.consume_use());
        assert!(!aux.consume_use());
        assert!(!aux.consume_use());
        assert_eq!(aux.uses(), Some(0));
        assert!(!aux.is_usable());
        aux.restock(2);
        assert_eq!(aux.uses(), Some(2));
    }

    #[test]
    fn spoil_countdown_only_decreases() {
        let mut tomato = food(1);
        assert!(!tomato.is_spoiled());
        assert!(tomato.tick_spoil());
        assert!(tomato.is_spoiled());
        assert!(!tomato.tick_spoil());
        assert!(tomato.is_spoiled());
        assert_eq!(tomato.age_turns(), 3);
    }

    #[test]
    fn mark_preprocessed_is_idempotent_and_food_only() {
        let mut tomato = food(3);
        tomato.mark_preprocessed();
        tomato.mark_preprocessed();
        assert!(tomato.is_preprocessed());

        let mut knife = tool(3);
        knife.mark_preprocessed();
        assert!(!knife.is_preprocessed());
    }

    #[test]
    fn non_consumable_kinds_are_always_usable() {
        let tomato = food(0);
        assert!(tomato.is_usable());
        assert!(tomato.is_spoiled());
        assert!(!tomato.is_fresh());
    }

    #[test]
    fn trait_trigger_uses_food_age() {
        let mut tomato = food(3);
        tomato.card_trait = Some(
            crate::card_trait::CardTrait::new("Ripe", TraitEffect::BonusScore(2)).with_min_age(2),
        );
        let mut rng = StepRng::new(0, 0);
        assert_eq!(tomato.trigger_trait(&mut rng), None);
        tomato.tick_spoil();
        tomato.tick_spoil();
        assert_eq!(tomato.trigger_trait(&mut rng), Some(TraitEffect::BonusScore(2)));
        assert_eq!(tool(3).trigger_trait(&mut rng), None);
    }
}
