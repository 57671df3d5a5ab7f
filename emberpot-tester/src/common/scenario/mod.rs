use anyhow::{Result, ensure};
use emberpot_game::constants::STARTING_CARD_KEYS;

use crate::logic::{GameplayStrategy, SimulationPlan, SimulationSummary};

/// Named simulation plan run by the logic tester.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

struct ScenarioEntry {
    key: &'static str,
    title: &'static str,
    build: fn() -> SimulationPlan,
}

const SCENARIOS: [ScenarioEntry; 6] = [
    ScenarioEntry {
        key: "smoke",
        title: "Smoke Test",
        build: smoke_plan,
    },
    ScenarioEntry {
        key: "stepwise-cook",
        title: "Stepwise Cooking Chain",
        build: stepwise_cook_plan,
    },
    ScenarioEntry {
        key: "full-throw",
        title: "Full Throw Gamble",
        build: full_throw_plan,
    },
    ScenarioEntry {
        key: "energy-bounds",
        title: "Energy and Stat Bounds",
        build: energy_bounds_plan,
    },
    ScenarioEntry {
        key: "determinism",
        title: "Deterministic Replay",
        build: determinism_plan,
    },
    ScenarioEntry {
        key: "survival",
        title: "Survival Run",
        build: survival_plan,
    },
];

fn smoke_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Idle)
        .with_max_turns(1)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(!summary.game_over, "game should survive one idle turn");
            ensure!(
                summary.final_state.player.cards.len() >= STARTING_CARD_KEYS.len(),
                "starting kit went missing"
            );
            Ok(())
        })
}

fn stepwise_cook_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Stepwise)
        .with_max_turns(1)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            let actions = &summary.metrics.actions;
            ensure!(actions.dishes_cooked >= 1, "no dish cooked on turn one");
            ensure!(actions.dishes_seasoned >= 1, "dish was never seasoned");
            Ok(())
        })
}

fn full_throw_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Gambler)
        .with_max_turns(1)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            let actions = &summary.metrics.actions;
            ensure!(
                actions.dishes_cooked + actions.chaos_events >= 1,
                "full throw produced neither a dish nor chaos"
            );
            Ok(())
        })
}

fn energy_bounds_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Trader).with_max_turns(30)
}

fn determinism_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Stepwise)
        .with_max_turns(20)
        .with_replay_check()
}

fn survival_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Stepwise)
        .with_max_turns(50)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.metrics.turns_survived > 0,
                "game should survive at least one turn"
            );
            ensure!(
                summary.metrics.actions.dishes_cooked >= 1,
                "a cooking run never cooked"
            );
            Ok(())
        })
}

/// Look a scenario up by key or title, case-insensitively.
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    SCENARIOS
        .iter()
        .find(|entry| entry.key.eq_ignore_ascii_case(name) || entry.title.eq_ignore_ascii_case(name))
        .map(|entry| TestScenario::simulation(entry.title, (entry.build)()))
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|entry| (entry.key, entry.title))
        .collect()
}

/// Every scenario key, in registry order.
pub fn all_scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|entry| entry.key.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, title) in list_scenarios() {
            let scenario = get_scenario(key).unwrap();
            assert_eq!(scenario.name, title);
            assert!(get_scenario(&title.to_uppercase()).is_some());
        }
        assert!(get_scenario("weather").is_none());
    }

    #[test]
    fn determinism_scenario_checks_replays() {
        let scenario = get_scenario("determinism").unwrap();
        assert!(scenario.plan.verify_replay);
        assert_eq!(scenario.plan.strategy, GameplayStrategy::Stepwise);
    }
}
