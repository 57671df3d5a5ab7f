//! Turn boundary rules: hunger, spoilage, fuel, buffs, tasks and threats.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::card::{Card, CardId, CardType, IdSource, SpecialRole};
use crate::catalog::CatalogContext;
use crate::constants::{
    FIRE_FUEL_PER_TURN, HUNGER_PER_TURN, LOG_TARGET_SURVIVAL, OIL_CARD_KEY, SATIETY_BUFF,
    STARVATION_HEALTH_PENALTY, THREAT_SPAWN_CHANCE, TURN_START_GRANT_COUNT,
};
use crate::inventory::{Player, Synthesizer};
use crate::recipe::Quality;
use crate::synthesis::SynthesisOutcome;

/// What a task asks of the turn's crafting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskGoal {
    /// A dish cooked over a fire source.
    CookWithFire,
    /// A dish made without oil.
    NoOil,
    /// A dish of Fine quality or better.
    FineOrBetter,
    /// A dish whose ingredients were all fresh.
    FreshIngredients,
}

impl TaskGoal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CookWithFire => "cook_with_fire",
            Self::NoOil => "no_oil",
            Self::FineOrBetter => "fine_or_better",
            Self::FreshIngredients => "fresh_ingredients",
        }
    }

    /// Whether `outcome`, a successful dish, satisfies this goal.
    #[must_use]
    pub fn is_met_by(self, outcome: &SynthesisOutcome) -> bool {
        if !outcome.produced_dish() {
            return false;
        }
        match self {
            Self::CookWithFire => outcome.fire_used,
            Self::NoOil => outcome
                .consumed
                .iter()
                .chain(&outcome.worn)
                .all(|card| card.key != OIL_CARD_KEY),
            Self::FineOrBetter => outcome.quality.is_some_and(|q| q >= Quality::Fine),
            Self::FreshIngredients => outcome
                .consumed
                .iter()
                .filter(|card| card.is_type(CardType::Food))
                .all(|card| !card.is_spoiled()),
        }
    }
}

impl fmt::Display for TaskGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a threat demands from the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatNeed {
    Bait,
    FineDish,
    Repair,
}

impl ThreatNeed {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bait => "bait",
            Self::FineDish => "fine_dish",
            Self::Repair => "repair",
        }
    }

    /// The owned card that would satisfy this need.
    #[must_use]
    pub fn satisfying_card(self, player: &Player) -> Option<CardId> {
        let found = match self {
            Self::Bait => player.card_by_special_role(SpecialRole::Bait),
            Self::Repair => player.card_by_special_role(SpecialRole::Repair),
            Self::FineDish => player
                .cards
                .iter()
                .find(|card| card.quality().is_some_and(|q| q >= Quality::Fine)),
        };
        found.map(|card| card.id)
    }
}

impl fmt::Display for ThreatNeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub description: String,
    pub goal: TaskGoal,
    /// Catalog keys granted on completion.
    #[serde(default)]
    pub reward: Vec<String>,
    pub penalty: u32,
    pub turns: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatTemplate {
    pub name: String,
    pub description: String,
    pub need: ThreatNeed,
    #[serde(default)]
    pub reward: Vec<String>,
    pub penalty: u32,
    pub turns: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub goal: TaskGoal,
    pub reward: Vec<String>,
    pub penalty: u32,
    pub remaining_turns: u32,
    pub completed: bool,
}

impl From<&TaskTemplate> for Task {
    fn from(template: &TaskTemplate) -> Self {
        Self {
            description: template.description.clone(),
            goal: template.goal,
            reward: template.reward.clone(),
            penalty: template.penalty,
            remaining_turns: template.turns,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    pub name: String,
    pub description: String,
    pub need: ThreatNeed,
    pub reward: Vec<String>,
    pub penalty: u32,
    pub remaining_turns: u32,
}

impl From<&ThreatTemplate> for Threat {
    fn from(template: &ThreatTemplate) -> Self {
        Self {
            name: template.name.clone(),
            description: template.description.clone(),
            need: template.need,
            reward: template.reward.clone(),
            penalty: template.penalty,
            remaining_turns: template.turns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResolution {
    Completed { description: String, reward: Vec<CardId> },
    Failed { description: String, penalty: u32 },
    Pending { remaining_turns: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThreatResolution {
    Resolved {
        name: String,
        spent: CardId,
        reward: Vec<CardId>,
    },
    Struck { name: String, penalty: u32 },
    Pending { remaining_turns: u32 },
}

/// Effects applied when a new turn opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnStart {
    pub new_task: Option<String>,
    pub new_threat: Option<String>,
    pub granted: Vec<Card>,
}

/// Every effect applied at one turn boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub hunger_lost: u32,
    pub starvation_damage: u32,
    pub spoiled: Vec<CardId>,
    pub fuel_burned: bool,
    pub expired_buffs: Vec<String>,
    pub task: Option<TaskResolution>,
    pub threat: Option<ThreatResolution>,
    pub game_over: bool,
    /// Present unless the game ended.
    pub next_turn: Option<TurnStart>,
}

/// Open a turn: refill energy, roll a task and maybe a threat, grant cards.
pub fn start_turn<R, I>(
    player: &mut Player,
    synthesizer: &mut Synthesizer,
    catalog: &CatalogContext,
    ids: &mut I,
    rng: &mut R,
) -> TurnStart
where
    R: Rng + ?Sized,
    I: IdSource + ?Sized,
{
    synthesizer.refill();
    let mut start = TurnStart::default();

    if player.task.is_none()
        && let Some(template) = catalog.task_templates().choose(rng)
    {
        log::info!(target: LOG_TARGET_SURVIVAL, "new task: {}", template.description);
        start.new_task = Some(template.description.clone());
        player.task = Some(Task::from(template));
    }

    if player.threat.is_none()
        && !catalog.threat_templates().is_empty()
        && rng.gen_bool(THREAT_SPAWN_CHANCE)
        && let Some(template) = catalog.threat_templates().choose(rng)
    {
        log::info!(target: LOG_TARGET_SURVIVAL, "threat appears: {}", template.name);
        start.new_threat = Some(template.name.clone());
        player.threat = Some(Threat::from(template));
    }

    let pool = catalog.explore_pool();
    for _ in 0..TURN_START_GRANT_COUNT {
        let Some(key) = pool.choose(rng) else {
            break;
        };
        if let Some(card) = catalog.create_card(key, ids) {
            start.granted.push(card.clone());
            player.add_card(card);
        }
    }
    start
}

/// Close a turn. `last_dish` is the turn's last successful dish, if any.
pub fn end_turn<I>(
    player: &mut Player,
    catalog: &CatalogContext,
    ids: &mut I,
    last_dish: Option<&SynthesisOutcome>,
) -> TurnReport
where
    I: IdSource + ?Sized,
{
    let mut report = TurnReport::default();

    if !player.has_buff(SATIETY_BUFF) {
        report.hunger_lost = player.consume_hunger(HUNGER_PER_TURN);
    }
    if player.hunger == 0 {
        player.take_damage(STARVATION_HEALTH_PENALTY);
        report.starvation_damage = STARVATION_HEALTH_PENALTY;
    }

    for card in &mut player.cards {
        if card.tick_spoil() {
            report.spoiled.push(card.id);
        }
    }

    if let Some(fire) = player.card_by_special_role_mut(SpecialRole::FireSource)
        && fire.is_usable()
    {
        for _ in 0..FIRE_FUEL_PER_TURN {
            if !fire.consume_use() {
                break;
            }
        }
        report.fuel_burned = true;
    }

    report.expired_buffs = player.tick_buffs();
    report.task = resolve_task(player, catalog, ids, last_dish);
    report.threat = resolve_threat(player, catalog, ids);

    report.game_over = player.is_dead();
    if report.game_over {
        log::info!(target: LOG_TARGET_SURVIVAL, "health reached zero");
    }
    report
}

fn resolve_task<I>(
    player: &mut Player,
    catalog: &CatalogContext,
    ids: &mut I,
    last_dish: Option<&SynthesisOutcome>,
) -> Option<TaskResolution>
where
    I: IdSource + ?Sized,
{
    let task = player.task.as_mut()?;
    if !task.completed && !last_dish.is_some_and(|outcome| task.goal.is_met_by(outcome)) {
        task.remaining_turns = task.remaining_turns.saturating_sub(1);
        if task.remaining_turns > 0 {
            return Some(TaskResolution::Pending {
                remaining_turns: task.remaining_turns,
            });
        }
        let penalty = task.penalty;
        let description = task.description.clone();
        player.take_damage(penalty);
        player.task = None;
        log::info!(target: LOG_TARGET_SURVIVAL, "task failed: {description} (-{penalty} health)");
        return Some(TaskResolution::Failed {
            description,
            penalty,
        });
    }

    task.completed = true;
    let task = player.task.take()?;
    let reward = grant_rewards(player, catalog, ids, &task.reward);
    log::info!(target: LOG_TARGET_SURVIVAL, "task completed: {}", task.description);
    Some(TaskResolution::Completed {
        description: task.description,
        reward,
    })
}

fn resolve_threat<I>(
    player: &mut Player,
    catalog: &CatalogContext,
    ids: &mut I,
) -> Option<ThreatResolution>
where
    I: IdSource + ?Sized,
{
    let need = player.threat.as_ref()?.need;
    if let Some(spent) = need.satisfying_card(player) {
        let threat = player.threat.take()?;
        player.remove_card(spent);
        let reward = grant_rewards(player, catalog, ids, &threat.reward);
        log::info!(target: LOG_TARGET_SURVIVAL, "threat resolved: {}", threat.name);
        return Some(ThreatResolution::Resolved {
            name: threat.name,
            spent,
            reward,
        });
    }

    let threat = player.threat.as_mut()?;
    threat.remaining_turns = threat.remaining_turns.saturating_sub(1);
    if threat.remaining_turns > 0 {
        return Some(ThreatResolution::Pending {
            remaining_turns: threat.remaining_turns,
        });
    }
    let threat = player.threat.take()?;
    player.take_damage(threat.penalty);
    log::info!(
        target: LOG_TARGET_SURVIVAL,
        "threat struck: {} (-{} health)",
        threat.name,
        threat.penalty
    );
    Some(ThreatResolution::Struck {
        name: threat.name,
        penalty: threat.penalty,
    })
}

fn grant_rewards<I>(
    player: &mut Player,
    catalog: &CatalogContext,
    ids: &mut I,
    keys: &[String],
) -> Vec<CardId>
where
    I: IdSource + ?Sized,
{
    let mut granted = Vec::with_capacity(keys.len());
    for key in keys {
        match catalog.create_card(key, ids) {
            Some(card) => {
                granted.push(card.id);
                player.add_card(card);
            }
            None => {
                log::error!(target: LOG_TARGET_SURVIVAL, "reward references unknown card key `{key}`");
            }
        }
    }
    granted
}
