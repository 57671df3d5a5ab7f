use std::collections::BTreeSet;
use std::hash::Hasher;
use std::sync::Arc;

use anyhow::Result;
use emberpot_game::{
    CardType, CatalogContext, GameSession, SessionSnapshot, TaskResolution, ThreatResolution,
    TurnReport,
};
use serde::Serialize;
use twox_hash::XxHash64;

use crate::logic::policy::{ActionRecord, ActionTally, GameplayStrategy, TurnDriver};

/// Turn cap used when a plan does not set one.
pub const DEFAULT_MAX_TURNS: u32 = 60;

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
    /// Play the run twice and require identical final digests.
    pub verify_replay: bool,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: DEFAULT_MAX_TURNS,
            verify_replay: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.verify_replay = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// # Errors
    ///
    /// Returns the expectation's failure.
    pub fn check(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// What happened in one simulated turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub turn: u32,
    pub actions: Vec<ActionRecord>,
    pub report: TurnReport,
    pub health: u32,
    pub hunger: u32,
}

/// Outcome counters derived from the turn reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    pub turns_survived: u32,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub threats_resolved: usize,
    pub threats_struck: usize,
    pub starvation_turns: usize,
    pub actions: ActionTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub turns: Vec<TurnOutcome>,
    pub metrics: RunMetrics,
    pub final_state: SessionSnapshot,
    pub digest: u64,
    pub violations: Vec<String>,
    pub game_over: bool,
    pub ending_message: String,
}

/// Headless deterministic runner for the core game logic.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    catalog: Arc<CatalogContext>,
}

impl GameTester {
    pub const fn new(catalog: Arc<CatalogContext>, verbose: bool) -> Self {
        Self { verbose, catalog }
    }

    #[cfg(test)]
    pub fn try_new(verbose: bool) -> Self {
        Self::new(Arc::new(CatalogContext::default_config()), verbose)
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let mut summary = self.play(plan, seed);
        if plan.verify_replay {
            let replay = self.play(plan, seed);
            if replay.digest != summary.digest {
                summary.violations.push(format!(
                    "replay diverged: digest {:016x} vs {:016x}",
                    summary.digest, replay.digest
                ));
            }
        }
        summary
    }

    fn play(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let mut session = GameSession::new(CatalogContext::clone(&self.catalog), seed);
        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = RunMetrics::default();
        let mut turns = Vec::new();
        let mut violations = check_invariants(&session);

        if self.verbose {
            log::info!(
                "seed {seed}: {} starts with {} cards",
                policy.name(),
                session.player().cards.len()
            );
        }

        let ending_message = loop {
            if turns.len() >= usize::try_from(plan.max_turns).unwrap_or(usize::MAX) {
                break "Turn cap reached".to_string();
            }
            let turn = session.turn();
            let mut driver = TurnDriver::new(&mut session, &mut metrics.actions);
            let played = policy.play_turn(&mut driver);
            let actions = std::mem::take(&mut driver.log);
            violations.append(&mut driver.violations);
            if let Err(err) = played {
                break format!("Policy stopped: {err}");
            }

            let report = match session.advance_turn() {
                Ok(report) => report,
                Err(err) => break format!("Turn rejected: {err}"),
            };
            tally_report(&mut metrics, &report);
            violations.extend(check_invariants(&session));
            let game_over = report.game_over;
            turns.push(TurnOutcome {
                turn,
                actions,
                report,
                health: session.player().health,
                hunger: session.player().hunger,
            });
            if game_over {
                break format!("Game over on turn {turn}");
            }
        };

        metrics.turns_survived = u32::try_from(turns.len()).unwrap_or(u32::MAX);
        let final_state = session.snapshot();
        SimulationSummary {
            seed,
            strategy: plan.strategy,
            turns,
            metrics,
            digest: digest(&final_state),
            final_state,
            violations,
            game_over: session.is_game_over(),
            ending_message,
        }
    }
}

fn tally_report(metrics: &mut RunMetrics, report: &TurnReport) {
    match report.task {
        Some(TaskResolution::Completed { .. }) => metrics.tasks_completed += 1,
        Some(TaskResolution::Failed { .. }) => metrics.tasks_failed += 1,
        _ => {}
    }
    match report.threat {
        Some(ThreatResolution::Resolved { .. }) => metrics.threats_resolved += 1,
        Some(ThreatResolution::Struck { .. }) => metrics.threats_struck += 1,
        _ => {}
    }
    if report.starvation_damage > 0 {
        metrics.starvation_turns += 1;
    }
}

/// Stable hash of a session snapshot.
#[must_use]
pub fn digest(snapshot: &SessionSnapshot) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    let payload = serde_json::to_vec(snapshot).unwrap_or_default();
    hasher.write(&payload);
    hasher.finish()
}

/// Invariants every reachable session state must hold.
#[must_use]
pub fn check_invariants(session: &GameSession) -> Vec<String> {
    let mut violations = Vec::new();
    let player = session.player();
    let synth = session.synthesizer();
    if synth.energy() > synth.max_energy() {
        violations.push(format!(
            "energy {} above max {}",
            synth.energy(),
            synth.max_energy()
        ));
    }
    if player.health > player.max_health {
        violations.push(format!("health {} above max", player.health));
    }
    if player.hunger > player.max_hunger {
        violations.push(format!("hunger {} above max", player.hunger));
    }
    if session.is_game_over() != (player.health == 0) {
        violations.push("game-over flag disagrees with health".to_string());
    }
    let mut ids = BTreeSet::new();
    for card in &player.cards {
        if !ids.insert(card.id) {
            violations.push(format!("duplicate card id {}", card.id));
        }
        if let Some((current, max)) = card.durability()
            && (current == 0 || current > max)
        {
            violations.push(format!("{} held at durability {current}/{max}", card.name));
        }
        if card.is_type(CardType::Auxiliary) && !card.is_usable() {
            violations.push(format!("exhausted {} still held", card.name));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_run_ends_in_game_over() {
        let tester = GameTester::try_new(false);
        let summary = tester.run_plan(&SimulationPlan::new(GameplayStrategy::Idle), 9);
        assert!(summary.game_over);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert!(summary.metrics.starvation_turns > 0);
        assert_eq!(summary.final_state.player.health, 0);
    }

    #[test]
    fn turn_cap_stops_the_run() {
        let tester = GameTester::try_new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Stepwise).with_max_turns(2);
        let summary = tester.run_plan(&plan, 4);
        assert!(summary.turns.len() <= 2);
        assert!(summary.metrics.actions.dishes_cooked >= 1);
    }

    #[test]
    fn replay_check_passes_for_identical_seeds() {
        let tester = GameTester::try_new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Gambler)
            .with_max_turns(10)
            .with_replay_check();
        let summary = tester.run_plan(&plan, 77);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.digest, digest(&summary.final_state));
    }

    #[test]
    fn expectations_are_checked_by_callers() {
        let expectation = SimulationExpectation::new(|summary: &SimulationSummary| {
            anyhow::ensure!(summary.turns.is_empty(), "expected no turns");
            Ok(())
        });
        let tester = GameTester::try_new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Idle).with_max_turns(0);
        let summary = tester.run_plan(&plan, 1);
        assert!(expectation.check(&summary).is_ok());
        assert_eq!(summary.ending_message, "Turn cap reached");
    }
}
