//! Static card, recipe and template content plus the lookups built over it.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use crate::card::{Card, CardKind, IdSource, SpecialRole, ToolRole};
use crate::card_trait::{CardTrait, TraitEffect};
use crate::constants::{FRESH_FOOD_SELL_VALUE, LOG_TARGET_CATALOG};
use crate::recipe::{Quality, QualityRules, Recipe, TierRule};
use crate::store::{Shop, ShopItem};
use crate::survival::{TaskGoal, TaskTemplate, ThreatNeed, ThreatTemplate};

const CATALOG_JSON: &str = include_str!("../assets/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate catalog key `{0}`")]
    DuplicateKey(String),
    #[error("duplicate card name `{0}`")]
    DuplicateName(String),
    #[error("trait {trait_name} on {card} has probability {probability} outside 0..=1")]
    InvalidProbability {
        card: String,
        trait_name: String,
        probability: f64,
    },
    #[error("{context} references unknown {kind} `{name}`")]
    DanglingReference {
        context: String,
        kind: &'static str,
        name: String,
    },
}

/// Abstracts where catalog content comes from.
pub trait CatalogSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the raw catalog content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read or parsed.
    fn load_catalog(&self) -> Result<CatalogData, Self::Error>;
}

/// The catalog compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl CatalogSource for BundledCatalog {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<CatalogData, Self::Error> {
        CatalogData::from_json(CATALOG_JSON)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    pub key: String,
    pub name: String,
    pub max_durability: u32,
    #[serde(default)]
    pub role: Option<ToolRole>,
    #[serde(default, rename = "trait")]
    pub card_trait: Option<CardTrait>,
    /// Food name → replacement food names produced when this tool processes it.
    #[serde(default)]
    pub processing: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub key: String,
    pub name: String,
    pub spoil_turns: u32,
    #[serde(default, rename = "trait")]
    pub card_trait: Option<CardTrait>,
    #[serde(default)]
    pub trade_value: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryEntry {
    pub key: String,
    pub name: String,
    pub uses: u32,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub destroy_on_use: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialEntry {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub uses: Option<u32>,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub role: Option<SpecialRole>,
    #[serde(default, rename = "trait")]
    pub card_trait: Option<CardTrait>,
    #[serde(default)]
    pub sell_value: Option<u32>,
}

/// Raw catalog content as loaded from JSON or built in code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
    #[serde(default)]
    pub foods: Vec<FoodEntry>,
    #[serde(default)]
    pub auxiliaries: Vec<AuxiliaryEntry>,
    #[serde(default)]
    pub specials: Vec<SpecialEntry>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub explore_drops: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub shop: Vec<ShopItem>,
    #[serde(default)]
    pub tasks: Vec<TaskTemplate>,
    #[serde(default)]
    pub threats: Vec<ThreatTemplate>,
}

impl CatalogData {
    /// Parse catalog content from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] when the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Built-in fallback content: the starting kit, bait and two recipes.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            tools: vec![
                ToolEntry {
                    key: "knife".to_string(),
                    name: "Knife".to_string(),
                    max_durability: 3,
                    role: None,
                    card_trait: None,
                    processing: BTreeMap::new(),
                },
                ToolEntry {
                    key: "pot".to_string(),
                    name: "Pot".to_string(),
                    max_durability: 5,
                    role: Some(ToolRole::Vessel),
                    card_trait: None,
                    processing: BTreeMap::new(),
                },
            ],
            foods: vec![
                FoodEntry {
                    key: "tomato".to_string(),
                    name: "Tomato".to_string(),
                    spoil_turns: 3,
                    card_trait: None,
                    trade_value: None,
                },
                FoodEntry {
                    key: "egg".to_string(),
                    name: "Egg".to_string(),
                    spoil_turns: 2,
                    card_trait: Some(
                        CardTrait::new("Double Yolk", TraitEffect::QualityUpgrade)
                            .with_probability(0.2),
                    ),
                    trade_value: None,
                },
            ],
            auxiliaries: vec![AuxiliaryEntry {
                key: "salt".to_string(),
                name: "Salt".to_string(),
                uses: 3,
                effect: "Flavor +1".to_string(),
                destroy_on_use: false,
            }],
            specials: vec![
                SpecialEntry {
                    key: "fire".to_string(),
                    name: "Fire".to_string(),
                    uses: Some(3),
                    effect: "Burns one fuel per turn".to_string(),
                    role: Some(SpecialRole::FireSource),
                    card_trait: None,
                    sell_value: None,
                },
                SpecialEntry {
                    key: "bait".to_string(),
                    name: "Bait".to_string(),
                    uses: Some(1),
                    effect: "Lures beasts away".to_string(),
                    role: Some(SpecialRole::Bait),
                    card_trait: None,
                    sell_value: None,
                },
            ],
            recipes: vec![
                Recipe {
                    id: "tomato-egg".to_string(),
                    name: "Tomato Egg Stir-fry".to_string(),
                    required_ingredients: ["Tomato", "Egg"]
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    base_quality: Quality::Normal,
                    base_heal_value: 4,
                    base_buff_text: String::new(),
                    base_trade_value: 2,
                    quality_rules: QualityRules {
                        fine: Some(TierRule {
                            min_score: Some(3),
                            required_traits: Vec::new(),
                        }),
                        excellent: Some(TierRule {
                            min_score: Some(6),
                            required_traits: vec!["Double Yolk".to_string()],
                        }),
                    },
                    auxiliary_effects: HashMap::new(),
                },
                Recipe {
                    id: "mixed".to_string(),
                    name: "Hodgepodge".to_string(),
                    required_ingredients: Default::default(),
                    base_quality: Quality::Normal,
                    base_heal_value: 2,
                    base_buff_text: String::new(),
                    base_trade_value: 1,
                    quality_rules: QualityRules::default(),
                    auxiliary_effects: HashMap::new(),
                },
            ],
            explore_drops: BTreeMap::from([(
                "plain".to_string(),
                vec!["tomato".to_string(), "egg".to_string(), "salt".to_string()],
            )]),
            shop: Vec::new(),
            tasks: vec![TaskTemplate {
                description: "Cook with fresh ingredients".to_string(),
                goal: TaskGoal::FreshIngredients,
                reward: vec!["tomato".to_string(), "egg".to_string()],
                penalty: 1,
                turns: 2,
            }],
            threats: vec![ThreatTemplate {
                name: "Beast attack".to_string(),
                description: "A beast is closing in. Bait will lure it away.".to_string(),
                need: ThreatNeed::Bait,
                reward: vec!["salt".to_string()],
                penalty: 3,
                turns: 2,
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryRef {
    Tool(usize),
    Food(usize),
    Auxiliary(usize),
    Special(usize),
}

/// Validated catalog with key and name indexes.
///
/// Built once and passed by reference to every system that creates cards or
/// reads recipes; swapping content is an explicit [`CatalogContext::reload`].
#[derive(Debug, Clone)]
pub struct CatalogContext {
    data: CatalogData,
    by_key: HashMap<String, EntryRef>,
    key_by_name: HashMap<String, String>,
}

impl CatalogContext {
    /// Validate and index `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on duplicate keys or names and on references
    /// to entries that do not exist.
    pub fn new(data: CatalogData) -> Result<Self, CatalogError> {
        validate(&data)?;
        Ok(Self::new_unchecked(data))
    }

    /// Index `data` without validation. Later duplicates are shadowed and
    /// dangling references only surface when play reaches them.
    #[must_use]
    pub fn new_unchecked(data: CatalogData) -> Self {
        let mut by_key = HashMap::new();
        let mut key_by_name = HashMap::new();
        for (key, name, entry) in entries(&data) {
            by_key.entry(key.to_string()).or_insert(entry);
            key_by_name
                .entry(name.to_string())
                .or_insert_with(|| key.to_string());
        }
        Self {
            data,
            by_key,
            key_by_name,
        }
    }

    /// Parse and validate JSON content.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::new(CatalogData::from_json(json)?)
    }

    /// Load content through `source`, falling back to the built-in minimal set.
    #[must_use]
    pub fn from_source<S: CatalogSource>(source: &S) -> Self {
        match source.load_catalog() {
            Ok(data) => Self::new(data).unwrap_or_else(|err| {
                log::warn!(target: LOG_TARGET_CATALOG, "catalog rejected, using minimal set: {err}");
                Self::minimal()
            }),
            Err(err) => {
                log::warn!(target: LOG_TARGET_CATALOG, "catalog load failed, using minimal set: {err}");
                Self::minimal()
            }
        }
    }

    /// The bundled catalog, or the minimal set if it cannot be parsed.
    #[must_use]
    pub fn default_config() -> Self {
        Self::from_json(CATALOG_JSON).unwrap_or_else(|err| {
            log::warn!(target: LOG_TARGET_CATALOG, "bundled catalog unusable, using minimal set: {err}");
            Self::minimal()
        })
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self::new_unchecked(CatalogData::minimal())
    }

    /// Replace the content. On error the current content is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when `data` fails validation.
    pub fn reload(&mut self, data: CatalogData) -> Result<(), CatalogError> {
        *self = Self::new(data)?;
        log::debug!(target: LOG_TARGET_CATALOG, "catalog reloaded with {} entries", self.by_key.len());
        Ok(())
    }

    #[must_use]
    pub const fn data(&self) -> &CatalogData {
        &self.data
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    #[must_use]
    pub fn key_for_name(&self, name: &str) -> Option<&str> {
        self.key_by_name.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn name_for_key(&self, key: &str) -> Option<&str> {
        match *self.by_key.get(key)? {
            EntryRef::Tool(idx) => Some(&self.data.tools[idx].name),
            EntryRef::Food(idx) => Some(&self.data.foods[idx].name),
            EntryRef::Auxiliary(idx) => Some(&self.data.auxiliaries[idx].name),
            EntryRef::Special(idx) => Some(&self.data.specials[idx].name),
        }
    }

    /// Every catalog key, in entry order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        entries(&self.data).map(|(key, _, _)| key)
    }

    /// Instantiate a fresh card for `key`.
    pub fn create_card<I>(&self, key: &str, ids: &mut I) -> Option<Card>
    where
        I: IdSource + ?Sized,
    {
        let kind_and_trait = match *self.by_key.get(key)? {
            EntryRef::Tool(idx) => {
                let entry = &self.data.tools[idx];
                (
                    &entry.name,
                    entry.card_trait.clone(),
                    CardKind::Tool {
                        durability: entry.max_durability,
                        max_durability: entry.max_durability,
                        role: entry.role,
                    },
                )
            }
            EntryRef::Food(idx) => {
                let entry = &self.data.foods[idx];
                (
                    &entry.name,
                    entry.card_trait.clone(),
                    CardKind::Food {
                        spoil_turns: entry.spoil_turns,
                        remaining_spoil: entry.spoil_turns,
                        preprocessed: false,
                        trade_value: entry.trade_value,
                    },
                )
            }
            EntryRef::Auxiliary(idx) => {
                let entry = &self.data.auxiliaries[idx];
                (
                    &entry.name,
                    None,
                    CardKind::Auxiliary {
                        uses: entry.uses,
                        effect: entry.effect.clone(),
                        destroy_on_use: entry.destroy_on_use,
                    },
                )
            }
            EntryRef::Special(idx) => {
                let entry = &self.data.specials[idx];
                (
                    &entry.name,
                    entry.card_trait.clone(),
                    CardKind::Special {
                        uses: entry.uses,
                        effect: entry.effect.clone(),
                        role: entry.role,
                        sell_value: entry.sell_value,
                    },
                )
            }
        };
        let (name, card_trait, kind) = kind_and_trait;
        Some(Card {
            id: ids.next_id(),
            key: key.to_string(),
            name: name.clone(),
            card_trait,
            kind,
        })
    }

    /// Instantiate a fresh card by display name.
    pub fn create_card_by_name<I>(&self, name: &str, ids: &mut I) -> Option<Card>
    where
        I: IdSource + ?Sized,
    {
        let key = self.key_by_name.get(name)?;
        self.create_card(key, ids)
    }

    /// Base price of a catalog food, used when pricing processed replacements.
    #[must_use]
    pub fn food_base_price(&self, name: &str) -> Option<u32> {
        let key = self.key_by_name.get(name)?;
        match *self.by_key.get(key)? {
            EntryRef::Food(idx) => Some(
                self.data.foods[idx]
                    .trade_value
                    .unwrap_or(FRESH_FOOD_SELL_VALUE),
            ),
            _ => None,
        }
    }

    /// Replacement names `tool_name` turns `food_name` into, if a rule exists.
    #[must_use]
    pub fn processing_rule(&self, tool_name: &str, food_name: &str) -> Option<&[String]> {
        self.data
            .tools
            .iter()
            .find(|tool| tool.name == tool_name)?
            .processing
            .get(food_name)
            .map(Vec::as_slice)
            .filter(|names| !names.is_empty())
    }

    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.data.recipes
    }

    #[must_use]
    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.data.recipes.iter().find(|recipe| recipe.id == id)
    }

    #[must_use]
    pub fn explore_drops(&self, location: &str) -> Option<&[String]> {
        self.data.explore_drops.get(location).map(Vec::as_slice)
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.data.explore_drops.keys().map(String::as_str)
    }

    /// Deduplicated union of every explore drop list, in sorted key order.
    #[must_use]
    pub fn explore_pool(&self) -> Vec<&str> {
        self.data
            .explore_drops
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn shop(&self) -> Shop<'_> {
        Shop::new(&self.data.shop)
    }

    #[must_use]
    pub fn task_templates(&self) -> &[TaskTemplate] {
        &self.data.tasks
    }

    #[must_use]
    pub fn threat_templates(&self) -> &[ThreatTemplate] {
        &self.data.threats
    }
}

impl Default for CatalogContext {
    fn default() -> Self {
        Self::default_config()
    }
}

fn entries(data: &CatalogData) -> impl Iterator<Item = (&str, &str, EntryRef)> {
    let tools = data
        .tools
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.key.as_str(), e.name.as_str(), EntryRef::Tool(idx)));
    let foods = data
        .foods
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.key.as_str(), e.name.as_str(), EntryRef::Food(idx)));
    let auxiliaries = data
        .auxiliaries
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.key.as_str(), e.name.as_str(), EntryRef::Auxiliary(idx)));
    let specials = data
        .specials
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.key.as_str(), e.name.as_str(), EntryRef::Special(idx)));
    tools.chain(foods).chain(auxiliaries).chain(specials)
}

fn dangling(context: impl Into<String>, kind: &'static str, name: &str) -> CatalogError {
    CatalogError::DanglingReference {
        context: context.into(),
        kind,
        name: name.to_string(),
    }
}

fn validate(data: &CatalogData) -> Result<(), CatalogError> {
    let mut keys = BTreeSet::new();
    let mut names = BTreeSet::new();
    for (key, name, _) in entries(data) {
        if !keys.insert(key) {
            return Err(CatalogError::DuplicateKey(key.to_string()));
        }
        if !names.insert(name) {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
    }

    let traits = data
        .tools
        .iter()
        .map(|t| (&t.name, &t.card_trait))
        .chain(data.foods.iter().map(|f| (&f.name, &f.card_trait)))
        .chain(data.specials.iter().map(|s| (&s.name, &s.card_trait)));
    for (card, card_trait) in traits {
        if let Some(card_trait) = card_trait
            && let Some(probability) = card_trait.probability
            && !(0.0..=1.0).contains(&probability)
        {
            return Err(CatalogError::InvalidProbability {
                card: card.clone(),
                trait_name: card_trait.name.clone(),
                probability,
            });
        }
    }

    let food_names: BTreeSet<&str> = data.foods.iter().map(|f| f.name.as_str()).collect();
    let auxiliary_names: BTreeSet<&str> =
        data.auxiliaries.iter().map(|a| a.name.as_str()).collect();

    for tool in &data.tools {
        for (food, replacements) in &tool.processing {
            let context = format!("processing rule {}/{food}", tool.name);
            if !food_names.contains(food.as_str()) {
                return Err(dangling(context, "food", food));
            }
            if let Some(missing) = replacements
                .iter()
                .find(|name| !food_names.contains(name.as_str()))
            {
                return Err(dangling(context, "food", missing));
            }
        }
    }

    for recipe in &data.recipes {
        let context = format!("recipe {}", recipe.id);
        if let Some(missing) = recipe
            .required_ingredients
            .iter()
            .find(|name| !food_names.contains(name.as_str()))
        {
            return Err(dangling(context, "food", missing));
        }
        if let Some(missing) = recipe
            .auxiliary_effects
            .keys()
            .find(|name| !auxiliary_names.contains(name.as_str()))
        {
            return Err(dangling(context, "auxiliary", missing));
        }
    }

    let check_key = |context: String, key: &str| {
        if keys.contains(key) {
            Ok(())
        } else {
            Err(dangling(context, "card key", key))
        }
    };
    for (location, drops) in &data.explore_drops {
        for key in drops {
            check_key(format!("explore location {location}"), key)?;
        }
    }
    for item in &data.shop {
        check_key(format!("shop item {}", item.name), &item.card_key)?;
    }
    for task in &data.tasks {
        for key in &task.reward {
            check_key(format!("task {}", task.description), key)?;
        }
    }
    for threat in &data.threats {
        for key in &threat.reward {
            check_key(format!("threat {}", threat.name), key)?;
        }
    }
    Ok(())
}
