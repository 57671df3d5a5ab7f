//! Centralized balance and tuning constants for Emberpot game logic.
//!
//! Card, recipe and template content is catalog data; the numbers that
//! shape the rules themselves live here so they only change through
//! reviewed code.

// Player -------------------------------------------------------------------
pub const STARTING_HEALTH: u32 = 10;
pub const STARTING_HUNGER: u32 = 10;
pub const STARTING_COINS: u32 = 10;
pub const STARTING_CARD_KEYS: [&str; 6] = ["knife", "pot", "fire", "tomato", "egg", "salt"];

// Synthesizer ----------------------------------------------------------------
pub const MAX_ENERGY: u32 = 3;
pub const ACTION_ENERGY_COST: u32 = 1;

// Survival loop --------------------------------------------------------------
pub const HUNGER_PER_TURN: u32 = 2;
pub const STARVATION_HEALTH_PENALTY: u32 = 1;
pub const FIRE_FUEL_PER_TURN: u32 = 1;
pub const THREAT_SPAWN_CHANCE: f64 = 0.3;
pub const TURN_START_GRANT_COUNT: usize = 1;
pub const SATIETY_BUFF: &str = "satiated";

// Crafting -------------------------------------------------------------------
pub const CHAOS_CHANCE: f64 = 0.3;
pub const CHAOS_MIN_REMOVED: usize = 1;
pub const CHAOS_MAX_REMOVED: usize = 2;
pub const FULL_THROW_TOOL_WEAR: u32 = 2;
pub const STEP_TOOL_WEAR: u32 = 1;
pub const PREPROCESS_PRICE_BUMP: u32 = 1;
pub const OIL_CARD_KEY: &str = "oil";
pub const BAIT_CARD_KEY: &str = "bait";
pub const TRANSFORM_TOOL_WEAR: u32 = 1;

// Quality scoring ------------------------------------------------------------
pub const FRESH_FOOD_SCORE: u32 = 2;
pub const FULL_VESSEL_SCORE: u32 = 1;
pub const AUXILIARY_SCORE: u32 = 2;

pub const FINE_HEAL_FLOOR: u32 = 6;
pub const EXCELLENT_HEAL_FLOOR: u32 = 8;
pub const FINE_SATIETY_TURNS: u32 = 2;
pub const EXCELLENT_SATIETY_TURNS: u32 = 3;
pub const EXCELLENT_HEALTH_BONUS: u32 = 2;
pub const FINE_BUFF_TEXT: &str = "Satiated: no hunger loss for 2 turns";
pub const EXCELLENT_BUFF_TEXT: &str = "Satiated: no hunger loss for 3 turns, health +2";

// Explore --------------------------------------------------------------------
pub const EXPLORE_MIN_DROPS: usize = 1;
pub const EXPLORE_MAX_DROPS: usize = 2;

// Economy --------------------------------------------------------------------
pub const TOOL_SELL_PER_DURABILITY: u32 = 2;
pub const FRESH_FOOD_SELL_VALUE: u32 = 1;
pub const DEFAULT_SPECIAL_SELL_VALUE: u32 = 1;
pub const DEFAULT_PRODUCT_SELL_VALUE: u32 = 1;

// Logging targets ------------------------------------------------------------
pub(crate) const LOG_TARGET_CRAFT: &str = "emberpot::craft";
pub(crate) const LOG_TARGET_SURVIVAL: &str = "emberpot::survival";
pub(crate) const LOG_TARGET_CATALOG: &str = "emberpot::catalog";
