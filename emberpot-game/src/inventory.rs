//! Player state: vitals, coins, owned cards, buffs and the energy pool.
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardId, CardType, SpecialRole, ToolRole};
use crate::constants::{MAX_ENERGY, STARTING_COINS, STARTING_HEALTH, STARTING_HUNGER};
use crate::survival::{Task, Threat};

/// Timed status effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buff {
    pub name: String,
    pub remaining_turns: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub health: u32,
    pub max_health: u32,
    pub hunger: u32,
    pub max_hunger: u32,
    pub coins: u32,
    pub cards: Vec<Card>,
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub threat: Option<Threat>,
    #[serde(default)]
    pub buffs: Vec<Buff>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            health: STARTING_HEALTH,
            max_health: STARTING_HEALTH,
            hunger: STARTING_HUNGER,
            max_hunger: STARTING_HUNGER,
            coins: STARTING_COINS,
            cards: Vec::new(),
            task: None,
            threat: None,
            buffs: Vec::new(),
        }
    }
}

impl Player {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub const fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub fn restore_hunger(&mut self, amount: u32) {
        self.hunger = self.hunger.saturating_add(amount).min(self.max_hunger);
    }

    /// Returns the hunger actually lost.
    pub const fn consume_hunger(&mut self, amount: u32) -> u32 {
        let lost = if amount < self.hunger {
            amount
        } else {
            self.hunger
        };
        self.hunger -= lost;
        lost
    }

    pub const fn earn(&mut self, coins: u32) {
        self.coins = self.coins.saturating_add(coins);
    }

    /// Debit `price` coins; `false` leaves the balance untouched.
    pub const fn spend_coins(&mut self, price: u32) -> bool {
        if self.coins < price {
            return false;
        }
        self.coins -= price;
        true
    }

    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn add_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    pub fn remove_card(&mut self, id: CardId) -> Option<Card> {
        let idx = self.cards.iter().position(|card| card.id == id)?;
        Some(self.cards.remove(idx))
    }

    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| card.id == id)
    }

    #[must_use]
    pub fn card_by_name(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.name == name)
    }

    #[must_use]
    pub fn card_by_special_role(&self, role: SpecialRole) -> Option<&Card> {
        self.cards
            .iter()
            .find(|card| card.special_role() == Some(role))
    }

    pub fn card_by_special_role_mut(&mut self, role: SpecialRole) -> Option<&mut Card> {
        self.cards
            .iter_mut()
            .find(|card| card.special_role() == Some(role))
    }

    #[must_use]
    pub fn card_by_tool_role(&self, role: ToolRole) -> Option<&Card> {
        self.cards.iter().find(|card| card.tool_role() == Some(role))
    }

    pub fn cards_of_type(&self, card_type: CardType) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |card| card.is_type(card_type))
    }

    #[must_use]
    pub fn has_buff(&self, name: &str) -> bool {
        self.buffs.iter().any(|buff| buff.name == name)
    }

    /// Add a buff, or extend an active one to the longer duration.
    pub fn add_buff(&mut self, name: &str, turns: u32) {
        if turns == 0 {
            return;
        }
        if let Some(buff) = self.buffs.iter_mut().find(|buff| buff.name == name) {
            buff.remaining_turns = buff.remaining_turns.max(turns);
        } else {
            self.buffs.push(Buff {
                name: name.to_string(),
                remaining_turns: turns,
            });
        }
    }

    /// Count every buff down one turn; returns the names that expired.
    pub fn tick_buffs(&mut self) -> Vec<String> {
        for buff in &mut self.buffs {
            buff.remaining_turns = buff.remaining_turns.saturating_sub(1);
        }
        let (expired, active): (Vec<Buff>, Vec<Buff>) = self
            .buffs
            .drain(..)
            .partition(|buff| buff.remaining_turns == 0);
        self.buffs = active;
        expired.into_iter().map(|buff| buff.name).collect()
    }
}

/// Crafting energy pool; always within `[0, max_energy]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesizer {
    energy: u32,
    max_energy: u32,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(MAX_ENERGY)
    }
}

impl Synthesizer {
    #[must_use]
    pub const fn new(max_energy: u32) -> Self {
        Self {
            energy: max_energy,
            max_energy,
        }
    }

    #[must_use]
    pub const fn energy(&self) -> u32 {
        self.energy
    }

    #[must_use]
    pub const fn max_energy(&self) -> u32 {
        self.max_energy
    }

    #[must_use]
    pub const fn has_energy(&self, amount: u32) -> bool {
        self.energy >= amount
    }

    /// Spend `amount`; `false` leaves the pool untouched.
    pub const fn spend(&mut self, amount: u32) -> bool {
        if !self.has_energy(amount) {
            return false;
        }
        self.energy -= amount;
        true
    }

    pub const fn refill(&mut self) {
        self.energy = self.max_energy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;

    fn card(id: u64, name: &str, kind: CardKind) -> Card {
        Card {
            id: CardId(id),
            key: name.to_lowercase(),
            name: name.to_string(),
            card_trait: None,
            kind,
        }
    }

    #[test]
    fn vitals_clamp_to_bounds() {
        let mut player = Player::new();
        player.heal(50);
        assert_eq!(player.health, player.max_health);
        player.take_damage(50);
        assert!(player.is_dead());
        assert_eq!(player.consume_hunger(4), 4);
        assert_eq!(player.consume_hunger(20), 6);
        assert_eq!(player.hunger, 0);
        player.restore_hunger(99);
        assert_eq!(player.hunger, player.max_hunger);
    }

    #[test]
    fn coins_never_go_negative() {
        let mut player = Player::new();
        assert!(!player.spend_coins(11));
        assert_eq!(player.coins, 10);
        assert!(player.spend_coins(10));
        assert_eq!(player.coins, 0);
        player.earn(3);
        assert_eq!(player.coins, 3);
    }

    #[test]
    fn card_lookup_and_removal() {
        let mut player = Player::new();
        player.add_card(card(
            1,
            "Fire",
            CardKind::Special {
                uses: Some(2),
                effect: String::new(),
                role: Some(SpecialRole::FireSource),
                sell_value: None,
            },
        ));
        player.add_card(card(
            2,
            "Pot",
            CardKind::Tool {
                durability: 5,
                max_durability: 5,
                role: Some(ToolRole::Vessel),
            },
        ));
        assert_eq!(
            player.card_by_special_role(SpecialRole::FireSource).map(|c| c.id),
            Some(CardId(1))
        );
        assert_eq!(
            player.card_by_tool_role(ToolRole::Vessel).map(|c| c.id),
            Some(CardId(2))
        );
        assert_eq!(player.cards_of_type(CardType::Tool).count(), 1);
        assert!(player.remove_card(CardId(1)).is_some());
        assert!(player.remove_card(CardId(1)).is_none());
        assert!(player.card_by_name("Fire").is_none());
    }

    #[test]
    fn buffs_extend_and_expire() {
        let mut player = Player::new();
        player.add_buff("satiated", 2);
        player.add_buff("satiated", 1);
        player.add_buff("ignored", 0);
        assert_eq!(player.buffs.len(), 1);
        assert!(player.tick_buffs().is_empty());
        assert!(player.has_buff("satiated"));
        assert_eq!(player.tick_buffs(), vec!["satiated".to_string()]);
        assert!(!player.has_buff("satiated"));
    }

    #[test]
    fn energy_stays_in_range() {
        let mut synth = Synthesizer::default();
        assert_eq!(synth.energy(), 3);
        assert!(synth.spend(2));
        assert!(!synth.spend(2));
        assert_eq!(synth.energy(), 1);
        assert!(synth.spend(1));
        assert!(!synth.has_energy(1));
        synth.refill();
        assert_eq!(synth.energy(), synth.max_energy());
    }
}
