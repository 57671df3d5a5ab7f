//! Game session: the public operations a front end drives, one at a time.
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{Card, CardId, CardKind, CardType, SequentialIds, SpecialRole};
use crate::catalog::{CatalogContext, CatalogData, CatalogError};
use crate::constants::{
    BAIT_CARD_KEY, LOG_TARGET_SURVIVAL, SATIETY_BUFF, STARTING_CARD_KEYS, TRANSFORM_TOOL_WEAR,
};
use crate::explore::{ExploreOutcome, explore_with_rng};
use crate::inventory::{Player, Synthesizer};
use crate::rng::{CountingRng, RngBundle};
use crate::store::sell_price;
use crate::survival::{TurnReport, TurnStart, end_turn, start_turn};
use crate::synthesis::{SynthesisEngine, SynthesisOutcome, SynthesisStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("the game is over; start a new game first")]
    GameOver,
}

/// Result of a non-crafting inventory action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub removed: Vec<Card>,
    pub added: Vec<Card>,
    pub coins_earned: u32,
    pub coins_spent: u32,
}

impl ActionOutcome {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Serializable view of the mutable session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub seed: u64,
    pub turn: u32,
    pub player: Player,
    pub synthesizer: Synthesizer,
    pub game_over: bool,
}

/// One player's run against a catalog.
#[derive(Debug, Clone)]
pub struct GameSession {
    catalog: CatalogContext,
    player: Player,
    synthesizer: Synthesizer,
    ids: SequentialIds,
    rng: RngBundle,
    turn: u32,
    last_dish: Option<SynthesisOutcome>,
    game_over: bool,
}

impl GameSession {
    /// Start a fresh game seeded with `seed`.
    #[must_use]
    pub fn new(catalog: CatalogContext, seed: u64) -> Self {
        let mut session = Self {
            catalog,
            player: Player::new(),
            synthesizer: Synthesizer::default(),
            ids: SequentialIds::default(),
            rng: RngBundle::from_user_seed(seed),
            turn: 0,
            last_dish: None,
            game_over: false,
        };
        session.new_game();
        session
    }

    /// Reset the player to the starting kit and open turn one.
    ///
    /// Random streams carry on, so consecutive games differ; use
    /// [`GameSession::reseed`] to replay from a known seed.
    pub fn new_game(&mut self) -> TurnStart {
        self.player = Player::new();
        self.synthesizer = Synthesizer::default();
        self.last_dish = None;
        self.game_over = false;
        self.turn = 1;
        for key in STARTING_CARD_KEYS {
            match self.catalog.create_card(key, &mut self.ids) {
                Some(card) => self.player.add_card(card),
                None => log::warn!(target: LOG_TARGET_SURVIVAL, "starting card `{key}` missing from catalog"),
            }
        }
        start_turn(
            &mut self.player,
            &mut self.synthesizer,
            &self.catalog,
            &mut self.ids,
            self.rng.survival(),
        )
    }

    /// Replace the random streams and start over.
    pub fn reseed(&mut self, seed: u64) -> TurnStart {
        self.rng = RngBundle::from_user_seed(seed);
        self.ids = SequentialIds::default();
        self.new_game()
    }

    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    #[must_use]
    pub const fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogContext {
        &self.catalog
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Last successful dish of the current turn.
    #[must_use]
    pub const fn last_dish(&self) -> Option<&SynthesisOutcome> {
        self.last_dish.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            seed: self.rng.seed(),
            turn: self.turn,
            player: self.player.clone(),
            synthesizer: self.synthesizer,
            game_over: self.game_over,
        }
    }

    /// Swap catalog content; the current content stays on error.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when `data` fails validation.
    pub fn reload_catalog(&mut self, data: CatalogData) -> Result<(), CatalogError> {
        self.catalog.reload(data)
    }

    const fn ensure_running(&self) -> Result<(), SessionError> {
        if self.game_over {
            Err(SessionError::GameOver)
        } else {
            Ok(())
        }
    }

    fn engine(&mut self) -> SynthesisEngine<'_, CountingRng<SmallRng>, SequentialIds> {
        SynthesisEngine::new(
            &mut self.player,
            &mut self.synthesizer,
            &self.catalog,
            &mut self.ids,
            self.rng.crafting(),
        )
    }

    fn remember(&mut self, outcome: &SynthesisOutcome) {
        if outcome.produced_dish() {
            self.last_dish = Some(outcome.clone());
        }
    }

    /// Run one stage of stepwise synthesis on the selected cards.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn step_synthesize(
        &mut self,
        selection: &[CardId],
        stage: SynthesisStage,
    ) -> Result<SynthesisOutcome, SessionError> {
        self.ensure_running()?;
        let outcome = self.engine().step(selection, stage);
        self.remember(&outcome);
        Ok(outcome)
    }

    /// Throw the selected cards into the pot in one go.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn full_throw_synthesize(
        &mut self,
        selection: &[CardId],
    ) -> Result<SynthesisOutcome, SessionError> {
        self.ensure_running()?;
        let outcome = self.engine().full_throw(selection);
        self.remember(&outcome);
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn explore(&mut self, location: &str) -> Result<ExploreOutcome, SessionError> {
        self.ensure_running()?;
        Ok(explore_with_rng(
            &mut self.player,
            &mut self.synthesizer,
            &self.catalog,
            &mut self.ids,
            self.rng.explore(),
            location,
        ))
    }

    /// Eat a dish, apply a repair kit or feed the fire.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn use_card(&mut self, id: CardId) -> Result<ActionOutcome, SessionError> {
        self.ensure_running()?;
        let Some(card) = self.player.card(id).cloned() else {
            return Ok(ActionOutcome::failure("No such card"));
        };

        let message = match (&card.kind, card.special_role()) {
            (
                CardKind::Product {
                    heal_value,
                    satiety_turns,
                    health_bonus,
                    ..
                },
                _,
            ) => {
                self.player.restore_hunger(*heal_value);
                self.player.add_buff(SATIETY_BUFF, *satiety_turns);
                self.player.heal(*health_bonus);
                format!("Ate {}", card.name)
            }
            (_, Some(SpecialRole::Repair)) => {
                let target = self
                    .player
                    .cards
                    .iter()
                    .filter(|c| c.is_type(CardType::Tool))
                    .find(|c| !c.has_full_durability())
                    .or_else(|| self.player.cards_of_type(CardType::Tool).next())
                    .map(|c| c.id);
                let Some(tool) = target.and_then(|tool| self.player.card_mut(tool)) else {
                    return Ok(ActionOutcome::failure("There is no tool to repair"));
                };
                tool.repair();
                format!("Repaired {}", tool.name)
            }
            (_, Some(SpecialRole::Fuel)) => {
                let fuel = card.uses().unwrap_or(1).max(1);
                let Some(fire) = self
                    .player
                    .card_by_special_role_mut(SpecialRole::FireSource)
                else {
                    return Ok(ActionOutcome::failure("There is no fire to feed"));
                };
                fire.restock(fuel);
                format!("Added {fuel} fuel to {}", fire.name)
            }
            _ => return Ok(ActionOutcome::failure(format!("{} cannot be used", card.name))),
        };

        let mut outcome = ActionOutcome::success(message);
        outcome.removed.extend(self.player.remove_card(id));
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn discard_card(&mut self, id: CardId) -> Result<bool, SessionError> {
        self.ensure_running()?;
        Ok(self.player.remove_card(id).is_some())
    }

    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn sell_card(&mut self, id: CardId) -> Result<ActionOutcome, SessionError> {
        self.ensure_running()?;
        let Some(card) = self.player.remove_card(id) else {
            return Ok(ActionOutcome::failure("No such card"));
        };
        let price = sell_price(&card);
        self.player.earn(price);
        let mut outcome = ActionOutcome::success(format!("Sold {} for {price} coins", card.name));
        outcome.coins_earned = price;
        outcome.removed.push(card);
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn buy_card(&mut self, key: &str) -> Result<ActionOutcome, SessionError> {
        self.ensure_running()?;
        let Some(item) = self.catalog.shop().item(key).cloned() else {
            return Ok(ActionOutcome::failure(format!("`{key}` is not for sale")));
        };
        if !self.player.spend_coins(item.price) {
            return Ok(ActionOutcome::failure(format!(
                "{} costs {} coins, you have {}",
                item.name, item.price, self.player.coins
            )));
        }
        let Some(card) = self.catalog.create_card(&item.card_key, &mut self.ids) else {
            self.player.earn(item.price);
            log::error!(target: LOG_TARGET_SURVIVAL, "shop item `{}` is not in the catalog", item.card_key);
            return Ok(ActionOutcome::failure(format!(
                "Data error: {} could not be created, coins refunded",
                item.name
            )));
        };
        let mut outcome = ActionOutcome::success(format!("Bought {}", card.name));
        outcome.coins_spent = item.price;
        outcome.added.push(card.clone());
        self.player.add_card(card);
        Ok(outcome)
    }

    /// Turn a spoiled ingredient into bait with the help of a tool.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn transform_cards(&mut self, selection: &[CardId]) -> Result<ActionOutcome, SessionError> {
        self.ensure_running()?;
        let selected: Vec<&Card> = selection
            .iter()
            .filter_map(|id| self.player.card(*id))
            .collect();
        let spoiled = selected
            .iter()
            .find(|card| card.is_type(CardType::Food) && card.is_spoiled())
            .map(|card| card.id);
        let tool = selected
            .iter()
            .find(|card| card.is_type(CardType::Tool) && card.is_usable())
            .map(|card| card.id);
        let (Some(spoiled), Some(tool)) = (spoiled, tool) else {
            return Ok(ActionOutcome::failure(
                "Transforming needs a spoiled ingredient and a usable tool",
            ));
        };
        let Some(bait) = self.catalog.create_card(BAIT_CARD_KEY, &mut self.ids) else {
            log::error!(target: LOG_TARGET_SURVIVAL, "bait card `{BAIT_CARD_KEY}` is not in the catalog");
            return Ok(ActionOutcome::failure("Data error: bait could not be created"));
        };

        let mut outcome = ActionOutcome::success(format!("Made {}", bait.name));
        outcome.removed.extend(self.player.remove_card(spoiled));
        if let Some(card) = self.player.card_mut(tool) {
            card.consume_durability(TRANSFORM_TOOL_WEAR);
            if !card.is_usable() {
                outcome.removed.extend(self.player.remove_card(tool));
            }
        }
        outcome.added.push(bait.clone());
        self.player.add_card(bait);
        Ok(outcome)
    }

    /// Close the current turn and, unless the game ended, open the next.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::GameOver`] once the game has ended.
    pub fn advance_turn(&mut self) -> Result<TurnReport, SessionError> {
        self.ensure_running()?;
        let last_dish = self.last_dish.take();
        let mut report = end_turn(
            &mut self.player,
            &self.catalog,
            &mut self.ids,
            last_dish.as_ref(),
        );
        if report.game_over {
            self.game_over = true;
            return Ok(report);
        }
        self.turn += 1;
        log::debug!(target: LOG_TARGET_SURVIVAL, "turn {} begins", self.turn);
        report.next_turn = Some(start_turn(
            &mut self.player,
            &mut self.synthesizer,
            &self.catalog,
            &mut self.ids,
            self.rng.survival(),
        ));
        Ok(report)
    }

    /// Give the player a catalog card directly. Ignored once the game is over.
    pub fn grant_card(&mut self, key: &str) -> Option<CardId> {
        if self.game_over {
            return None;
        }
        let card = self.catalog.create_card(key, &mut self.ids)?;
        let id = card.id;
        self.player.add_card(card);
        Some(id)
    }
}
