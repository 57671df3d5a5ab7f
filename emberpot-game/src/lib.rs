//! Emberpot Game Engine
//!
//! Platform-agnostic core logic for Emberpot, a turn-based survival cooking
//! game. Cards are gathered, prepared and cooked into dishes that keep the
//! player fed while tasks and threats press from the outside.
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod card;
pub mod card_trait;
pub mod catalog;
pub mod constants;
pub mod explore;
pub mod inventory;
pub mod recipe;
pub mod rng;
pub mod session;
pub mod store;
pub mod survival;
pub mod synthesis;

// Re-export commonly used types
pub use card::{Card, CardId, CardKind, CardType, IdSource, SequentialIds, SpecialRole, ToolRole};
pub use card_trait::{CardTrait, TraitContext, TraitEffect, TraitTrigger, resolve_trait};
pub use catalog::{
    AuxiliaryEntry, BundledCatalog, CatalogContext, CatalogData, CatalogError, CatalogSource,
    FoodEntry, SpecialEntry, ToolEntry,
};
pub use explore::{ExploreBlockReason, ExploreOutcome, explore_with_rng};
pub use inventory::{Buff, Player, Synthesizer};
pub use recipe::{
    AuxiliaryEffect, Quality, QualityRules, Recipe, TierRule, find_matching_recipe,
    resolve_quality,
};
pub use rng::{CountingRng, RngBundle};
pub use session::{ActionOutcome, GameSession, SessionError, SessionSnapshot};
pub use store::{Shop, ShopItem, sell_price};
pub use survival::{
    Task, TaskGoal, TaskResolution, TaskTemplate, Threat, ThreatNeed, ThreatResolution,
    ThreatTemplate, TurnReport, TurnStart, end_turn, start_turn,
};
pub use synthesis::{SynthesisEngine, SynthesisOutcome, SynthesisStage};

/// Main game engine for creating sessions over one catalog source
pub struct GameEngine<S>
where
    S: CatalogSource,
{
    source: S,
}

impl<S> GameEngine<S>
where
    S: CatalogSource,
{
    /// Create a new game engine with the provided catalog source
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Load the catalog strictly, without the minimal fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or the content is rejected.
    pub fn load_catalog(&self) -> Result<CatalogContext, anyhow::Error> {
        let data = self.source.load_catalog()?;
        Ok(CatalogContext::new(data)?)
    }

    /// Construct a new game session. A failing source degrades to the minimal catalog.
    pub fn create_session(&self, seed: u64) -> GameSession {
        GameSession::new(CatalogContext::from_source(&self.source), seed)
    }
}

impl Default for GameEngine<BundledCatalog> {
    fn default() -> Self {
        Self::new(BundledCatalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::fmt;

    #[derive(Clone, Copy, Default)]
    struct FixtureSource;

    impl CatalogSource for FixtureSource {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<CatalogData, Self::Error> {
            Ok(CatalogData::minimal())
        }
    }

    #[derive(Debug)]
    struct Unreachable;

    impl fmt::Display for Unreachable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("catalog host unreachable")
        }
    }

    impl std::error::Error for Unreachable {}

    struct BrokenSource;

    impl CatalogSource for BrokenSource {
        type Error = Unreachable;

        fn load_catalog(&self) -> Result<CatalogData, Self::Error> {
            Err(Unreachable)
        }
    }

    #[test]
    fn engine_creates_sessions_from_its_source() {
        let engine = GameEngine::new(FixtureSource);
        let session = engine.create_session(0xABCD);
        assert_eq!(session.turn(), 1);
        assert!(!session.catalog().contains_key("fox"));
        assert!(engine.load_catalog().is_ok());
    }

    #[test]
    fn broken_source_falls_back_to_minimal_catalog() {
        let engine = GameEngine::new(BrokenSource);
        assert!(engine.load_catalog().is_err());
        let session = engine.create_session(7);
        assert!(session.catalog().contains_key("tomato"));
        assert!(!session.player().cards.is_empty());
    }

    #[test]
    fn default_engine_uses_bundled_catalog() {
        let session = GameEngine::default().create_session(7);
        assert!(session.catalog().contains_key("fox"));
        assert_eq!(session.catalog().key_for_name("Potato Slices"), Some("potato_slices"));
    }
}
