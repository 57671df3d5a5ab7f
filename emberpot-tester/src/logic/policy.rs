use std::fmt;

use emberpot_game::{
    ActionOutcome, Card, CardId, CardKind, CardType, ExploreOutcome, GameSession, Player, Quality,
    SessionError, SpecialRole, SynthesisOutcome, SynthesisStage, ThreatNeed, ToolRole,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::logic::simulation::check_invariants;

/// Eat once hunger has dropped this far below the maximum.
const HUNGER_MARGIN: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Preprocess,
    Cook,
    Season,
    FullThrow,
    Explore,
    Use,
    Sell,
    Buy,
    Transform,
}

impl From<SynthesisStage> for ActionKind {
    fn from(stage: SynthesisStage) -> Self {
        match stage {
            SynthesisStage::Preprocess => Self::Preprocess,
            SynthesisStage::Cook => Self::Cook,
            SynthesisStage::Season => Self::Season,
        }
    }
}

/// One action a policy took, as reported back by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: ActionKind,
    pub success: bool,
    pub message: String,
}

/// Running counters over every action of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTally {
    pub dishes_cooked: usize,
    pub dishes_seasoned: usize,
    pub chaos_events: usize,
    pub cards_used: usize,
    pub cards_found: usize,
    pub coins_earned: u32,
    pub coins_spent: u32,
    pub best_quality: Option<Quality>,
    pub energy_refusals: usize,
}

/// Session wrapper handed to policies; records and checks every action.
pub struct TurnDriver<'a> {
    session: &'a mut GameSession,
    pub log: Vec<ActionRecord>,
    pub tally: &'a mut ActionTally,
    pub violations: Vec<String>,
}

impl<'a> TurnDriver<'a> {
    pub fn new(session: &'a mut GameSession, tally: &'a mut ActionTally) -> Self {
        Self {
            session,
            log: Vec::new(),
            tally,
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &GameSession {
        self.session
    }

    #[must_use]
    pub fn player(&self) -> &Player {
        self.session.player()
    }

    #[must_use]
    pub fn energy(&self) -> u32 {
        self.session.synthesizer().energy()
    }

    pub fn step(
        &mut self,
        selection: &[CardId],
        stage: SynthesisStage,
    ) -> Result<SynthesisOutcome, SessionError> {
        let outcome = self.session.step_synthesize(selection, stage)?;
        self.tally_synthesis(&outcome);
        if outcome.produced_dish() && stage == SynthesisStage::Season {
            self.tally.dishes_seasoned += 1;
        }
        self.record(stage.into(), outcome.success, &outcome.message);
        Ok(outcome)
    }

    pub fn full_throw(&mut self, selection: &[CardId]) -> Result<SynthesisOutcome, SessionError> {
        let outcome = self.session.full_throw_synthesize(selection)?;
        self.tally_synthesis(&outcome);
        if outcome.chaos.is_some() {
            self.tally.chaos_events += 1;
        }
        self.record(ActionKind::FullThrow, outcome.success, &outcome.message);
        Ok(outcome)
    }

    pub fn explore(&mut self, location: &str) -> Result<ExploreOutcome, SessionError> {
        let outcome = self.session.explore(location)?;
        let message = match &outcome {
            ExploreOutcome::Found { cards, .. } => {
                self.tally.cards_found += cards.len();
                format!("found {} card(s) at {location}", cards.len())
            }
            ExploreOutcome::Blocked(reason) => format!("blocked at {location}: {reason:?}"),
        };
        let success = matches!(outcome, ExploreOutcome::Found { .. });
        self.record(ActionKind::Explore, success, &message);
        Ok(outcome)
    }

    pub fn use_card(&mut self, id: CardId) -> Result<ActionOutcome, SessionError> {
        let outcome = self.session.use_card(id)?;
        if outcome.success {
            self.tally.cards_used += 1;
        }
        self.record_action(ActionKind::Use, &outcome);
        Ok(outcome)
    }

    pub fn sell(&mut self, id: CardId) -> Result<ActionOutcome, SessionError> {
        let outcome = self.session.sell_card(id)?;
        self.record_action(ActionKind::Sell, &outcome);
        Ok(outcome)
    }

    pub fn buy(&mut self, key: &str) -> Result<ActionOutcome, SessionError> {
        let outcome = self.session.buy_card(key)?;
        self.record_action(ActionKind::Buy, &outcome);
        Ok(outcome)
    }

    pub fn transform(&mut self, selection: &[CardId]) -> Result<ActionOutcome, SessionError> {
        let outcome = self.session.transform_cards(selection)?;
        self.record_action(ActionKind::Transform, &outcome);
        Ok(outcome)
    }

    fn tally_synthesis(&mut self, outcome: &SynthesisOutcome) {
        if outcome.energy_spent == 0 && !outcome.success {
            self.tally.energy_refusals += 1;
        }
        if outcome.produced_dish() {
            self.tally.dishes_cooked += 1;
            self.tally.best_quality = self.tally.best_quality.max(outcome.quality);
        }
    }

    fn record_action(&mut self, action: ActionKind, outcome: &ActionOutcome) {
        self.tally.coins_earned += outcome.coins_earned;
        self.tally.coins_spent += outcome.coins_spent;
        self.record(action, outcome.success, &outcome.message);
    }

    fn record(&mut self, action: ActionKind, success: bool, message: &str) {
        log::debug!("{action:?}: {message}");
        self.log.push(ActionRecord {
            action,
            success,
            message: message.to_string(),
        });
        for violation in check_invariants(self.session) {
            self.violations.push(format!("after {action:?}: {violation}"));
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Spend the current turn; the caller advances the turn afterwards.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError`] when the game ended mid-turn.
    fn play_turn(&mut self, driver: &mut TurnDriver<'_>) -> Result<(), SessionError>;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameplayStrategy {
    Idle,
    Stepwise,
    Gambler,
    Trader,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::Idle, Self::Stepwise, Self::Gambler, Self::Trader];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Stepwise => "Stepwise",
            Self::Gambler => "Gambler",
            Self::Trader => "Trader",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Idle => Box::new(IdlePolicy),
            Self::Stepwise => Box::new(StepwisePolicy::new(seed)),
            Self::Gambler => Box::new(GamblerPolicy::new(seed)),
            Self::Trader => Box::new(TraderPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct IdlePolicy;

struct StepwisePolicy {
    rng: ChaCha20Rng,
}

impl StepwisePolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

struct GamblerPolicy {
    rng: ChaCha20Rng,
}

impl GamblerPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

struct TraderPolicy {
    rng: ChaCha20Rng,
}

impl TraderPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn play_turn(&mut self, _driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
        Ok(())
    }
}

impl PlayerPolicy for StepwisePolicy {
    fn name(&self) -> &'static str {
        "Stepwise"
    }

    fn play_turn(&mut self, driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
        tend_camp(driver)?;
        restock_kit(driver)?;

        if pick_ingredients(driver.session(), false).is_empty()
            && pick_ingredients(driver.session(), true).is_empty()
        {
            driver.explore("plain")?;
        }

        let raw = pick_ingredients(driver.session(), false);
        if let Some(knife) = prep_tool(driver.player())
            && !raw.is_empty()
            && driver.energy() > 0
        {
            let mut selection = vec![knife];
            selection.extend(raw);
            driver.step(&selection, SynthesisStage::Preprocess)?;
        }

        let prepared = pick_ingredients(driver.session(), true);
        let mut dish = None;
        if let (Some(pot), Some(fire)) = (vessel(driver.player()), fire_source(driver.player()))
            && !prepared.is_empty()
            && driver.energy() > 0
        {
            let mut selection = vec![pot, fire];
            selection.extend(prepared);
            dish = driver
                .step(&selection, SynthesisStage::Cook)?
                .product
                .map(|card| card.id);
        }

        if let (Some(dish), Some(aux)) = (dish, seasoning(driver.player()))
            && driver.energy() > 0
        {
            driver.step(&[dish, aux], SynthesisStage::Season)?;
        }

        while driver.energy() > 0 {
            let location = random_location(driver.session(), &mut self.rng);
            driver.explore(&location)?;
        }
        eat_if_hungry(driver)
    }
}

impl PlayerPolicy for GamblerPolicy {
    fn name(&self) -> &'static str {
        "Gambler"
    }

    fn play_turn(&mut self, driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
        tend_camp(driver)?;
        if fire_source(driver.player()).is_none() {
            driver.buy("fire")?;
        }
        if vessel(driver.player()).is_none() {
            driver.buy("pot")?;
        }

        let foods: Vec<CardId> = driver
            .player()
            .cards_of_type(CardType::Food)
            .filter(|card| card.is_fresh())
            .map(|card| card.id)
            .collect();
        if let (Some(pot), Some(fire)) = (vessel(driver.player()), fire_source(driver.player()))
            && !foods.is_empty()
        {
            let mut selection = vec![pot, fire];
            selection.extend(foods);
            if self.rng.gen_bool(0.5) {
                selection.extend(
                    driver
                        .player()
                        .cards_of_type(CardType::Auxiliary)
                        .map(|card| card.id),
                );
            }
            driver.full_throw(&selection)?;
        }

        while driver.energy() > 0 {
            let location = random_location(driver.session(), &mut self.rng);
            driver.explore(&location)?;
        }
        eat_if_hungry(driver)
    }
}

impl PlayerPolicy for TraderPolicy {
    fn name(&self) -> &'static str {
        "Trader"
    }

    fn play_turn(&mut self, driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
        tend_camp(driver)?;
        while driver.energy() > 0 {
            let location = random_location(driver.session(), &mut self.rng);
            driver.explore(&location)?;
        }
        eat_if_hungry(driver)?;

        let wares: Vec<CardId> = driver
            .player()
            .cards
            .iter()
            .filter(|card| {
                card.is_spoiled()
                    || card.is_type(CardType::Product)
                    || (card.is_type(CardType::Special) && card.special_role().is_none())
            })
            .map(|card| card.id)
            .collect();
        for id in wares {
            driver.sell(id)?;
        }

        let damaged = driver
            .player()
            .cards_of_type(CardType::Tool)
            .any(|card| !card.has_full_durability());
        if damaged && with_role(driver.player(), SpecialRole::Repair).is_none() {
            driver.buy("repair")?;
        }
        Ok(())
    }
}

/// Feed the fire, mend tools and make bait when a beast is near.
fn tend_camp(driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
    let player = driver.player();
    let fire_low = player
        .card_by_special_role(SpecialRole::FireSource)
        .is_some_and(|fire| fire.uses().unwrap_or(0) <= 1);
    if fire_low && let Some(fuel) = with_role(player, SpecialRole::Fuel) {
        driver.use_card(fuel)?;
    }

    let player = driver.player();
    let needs_kit = player
        .threat
        .as_ref()
        .is_some_and(|threat| threat.need == ThreatNeed::Repair);
    let damaged = player
        .cards_of_type(CardType::Tool)
        .any(|card| !card.has_full_durability());
    if damaged
        && !needs_kit
        && let Some(kit) = with_role(player, SpecialRole::Repair)
    {
        driver.use_card(kit)?;
    }

    let player = driver.player();
    let wants_bait = player
        .threat
        .as_ref()
        .is_some_and(|threat| threat.need == ThreatNeed::Bait)
        && with_role(player, SpecialRole::Bait).is_none();
    let spoiled = player
        .cards_of_type(CardType::Food)
        .find(|card| card.is_spoiled())
        .map(|card| card.id);
    let tool = player
        .cards_of_type(CardType::Tool)
        .filter(|card| card.tool_role().is_none())
        .find(|card| card.is_usable())
        .map(|card| card.id);
    if wants_bait && let (Some(spoiled), Some(tool)) = (spoiled, tool) {
        driver.transform(&[spoiled, tool])?;
    }
    Ok(())
}

/// Replace missing crafting tools when the purse allows.
fn restock_kit(driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
    let wanted = [
        ("knife", prep_tool(driver.player()).is_none()),
        ("pot", vessel(driver.player()).is_none()),
        ("fire", fire_source(driver.player()).is_none()),
    ];
    for (key, missing) in wanted {
        let affordable = driver
            .session()
            .catalog()
            .shop()
            .item(key)
            .is_some_and(|item| item.price <= driver.player().coins);
        if missing && affordable {
            driver.buy(key)?;
        }
    }
    Ok(())
}

fn eat_if_hungry(driver: &mut TurnDriver<'_>) -> Result<(), SessionError> {
    loop {
        let player = driver.player();
        if player.hunger + HUNGER_MARGIN > player.max_hunger {
            return Ok(());
        }
        let keep_fine = player
            .threat
            .as_ref()
            .is_some_and(|threat| threat.need == ThreatNeed::FineDish);
        let mut dishes: Vec<&Card> = player.cards_of_type(CardType::Product).collect();
        if keep_fine
            && let Some(pos) = dishes
                .iter()
                .position(|card| card.quality() >= Some(Quality::Fine))
        {
            dishes.remove(pos);
        }
        let Some(dish) = dishes
            .iter()
            .max_by_key(|card| heal_value(card))
            .map(|card| card.id)
        else {
            return Ok(());
        };
        driver.use_card(dish)?;
    }
}

fn heal_value(card: &Card) -> u32 {
    match card.kind {
        CardKind::Product { heal_value, .. } => heal_value,
        _ => 0,
    }
}

/// Foods for the next stage: a full recipe when one is on hand, else up to two.
fn pick_ingredients(session: &GameSession, preprocessed: bool) -> Vec<CardId> {
    let eligible: Vec<&Card> = session
        .player()
        .cards_of_type(CardType::Food)
        .filter(|card| card.is_fresh() && card.is_preprocessed() == preprocessed)
        .collect();
    for recipe in session.catalog().recipes() {
        if recipe.is_wildcard() {
            continue;
        }
        let mut pool = eligible.clone();
        let mut picked = Vec::new();
        for name in &recipe.required_ingredients {
            match pool.iter().position(|card| &card.name == name) {
                Some(pos) => picked.push(pool.remove(pos).id),
                None => break,
            }
        }
        if picked.len() == recipe.required_ingredients.len() {
            return picked;
        }
    }
    eligible.iter().take(2).map(|card| card.id).collect()
}

fn prep_tool(player: &Player) -> Option<CardId> {
    player
        .cards_of_type(CardType::Tool)
        .find(|card| card.tool_role().is_none() && card.is_usable())
        .map(|card| card.id)
}

fn vessel(player: &Player) -> Option<CardId> {
    player
        .card_by_tool_role(ToolRole::Vessel)
        .filter(|card| card.is_usable())
        .map(|card| card.id)
}

fn fire_source(player: &Player) -> Option<CardId> {
    with_role(player, SpecialRole::FireSource)
}

fn with_role(player: &Player, role: SpecialRole) -> Option<CardId> {
    player.card_by_special_role(role).map(|card| card.id)
}

fn seasoning(player: &Player) -> Option<CardId> {
    player
        .cards_of_type(CardType::Auxiliary)
        .find(|card| card.is_usable())
        .map(|card| card.id)
}

fn random_location(session: &GameSession, rng: &mut ChaCha20Rng) -> String {
    let locations: Vec<&str> = session.catalog().locations().collect();
    locations
        .choose(rng)
        .map_or_else(|| "plain".to_string(), |location| (*location).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberpot_game::CatalogContext;

    fn session() -> GameSession {
        GameSession::new(CatalogContext::default_config(), 0x5EED)
    }

    #[test]
    fn strategy_labels_are_unique() {
        let labels: std::collections::BTreeSet<&str> =
            GameplayStrategy::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), GameplayStrategy::ALL.len());
        assert_eq!(GameplayStrategy::Gambler.to_string(), "Gambler");
    }

    #[test]
    fn ingredient_picker_prefers_full_recipes() {
        let session = session();
        let picked = pick_ingredients(&session, false);
        let names: Vec<&str> = picked
            .iter()
            .filter_map(|id| session.player().card(*id))
            .map(|card| card.name.as_str())
            .collect();
        assert_eq!(names, vec!["Tomato", "Egg"]);
        assert!(pick_ingredients(&session, true).is_empty());
    }

    #[test]
    fn stepwise_policy_cooks_on_the_first_turn() {
        let mut session = session();
        let mut tally = ActionTally::default();
        let mut driver = TurnDriver::new(&mut session, &mut tally);
        let mut policy = GameplayStrategy::Stepwise.create_policy(1);
        policy.play_turn(&mut driver).unwrap();
        assert!(driver.violations.is_empty(), "{:?}", driver.violations);
        assert!(driver.log.iter().any(|record| record.action == ActionKind::Cook && record.success));
        assert_eq!(driver.energy(), 0);
        assert!(tally.dishes_cooked >= 1);
    }

    #[test]
    fn idle_policy_takes_no_actions() {
        let mut session = session();
        let mut tally = ActionTally::default();
        let mut driver = TurnDriver::new(&mut session, &mut tally);
        GameplayStrategy::Idle
            .create_policy(1)
            .play_turn(&mut driver)
            .unwrap();
        assert!(driver.log.is_empty());
        assert_eq!(tally, ActionTally::default());
    }
}
