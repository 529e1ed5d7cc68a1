use serde_json::Value;
use tracing::{debug, info};

use crate::{
    Action,
    config::AgentConfig,
    error::AgentError,
    inventory::Inventory,
    navigator::{Arrival, Navigator},
    observation::{LossRecord, Observation, Status, Threats, WinRecord},
    tactics::{self, Tactic, TacticContext},
};

/// Threat levels remembered across turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vitals {
    pub ill: Option<i64>,
    pub tired: Option<i64>,
    pub injured: Option<i64>,
}

impl Vitals {
    /// Overwrites the levels reported in `threats` and keeps the others.
    /// A level of zero is no signal and does not replace a remembered one.
    pub fn absorb(&mut self, threats: &Threats) {
        let felt = |level: Option<i64>| level.filter(|&level| level > 0);
        self.ill = felt(threats.ill).or(self.ill);
        self.tired = felt(threats.tired).or(self.tired);
        self.injured = felt(threats.injured).or(self.injured);
    }
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Won(WinRecord),
    Lost(LossRecord),
    /// The agent stopped and no verdict followed.
    Stopped,
}

/// The agent's answer to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Act(Action),
    Finished(Outcome),
}

/// Explores a castle one record at a time.
///
/// Each status record goes through the navigator's arrival handling, then
/// through the configured tactics, then back to the navigator to explore.
#[derive(Debug)]
pub struct Agent {
    navigator: Navigator,
    tactics: Vec<Box<dyn Tactic>>,
    inventory: Inventory,
    vitals: Vitals,
    turns: u64,
}

impl Default for Agent {
    fn default() -> Self {
        Agent::new(&AgentConfig::default())
    }
}

impl Agent {
    pub fn new(config: &AgentConfig) -> Self {
        let tactics = tactics::build(config);
        info!(
            tactics = ?tactics.iter().map(|tactic| tactic.name()).collect::<Vec<_>>(),
            unarmed = ?config.unarmed,
            "creating agent"
        );
        Agent {
            navigator: Navigator::new(config.max_reentries),
            tactics,
            inventory: Inventory::default(),
            vitals: Vitals::default(),
            turns: 0,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Number of status records answered so far.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn tactic_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tactics.iter().map(|tactic| tactic.name())
    }

    /// Answers one decoded record.
    pub fn step(&mut self, record: &Value) -> Result<Turn, AgentError> {
        let status = match Observation::from_record(record)? {
            Observation::Won(win) => {
                info!(score = %win.score, "won");
                return Ok(Turn::Finished(Outcome::Won(win)));
            }
            Observation::Lost(loss) => {
                info!(?loss, "lost");
                return Ok(Turn::Finished(Outcome::Lost(loss)));
            }
            Observation::Status(status) => status,
        };

        self.turns += 1;
        let decision = self.decide(&status);
        self.vitals.absorb(&status.threats);
        decision.map(Turn::Act)
    }

    fn decide(&mut self, status: &Status) -> Result<Action, AgentError> {
        let room = match self.navigator.arrive(&status.location) {
            Arrival::Decided(action) => return Ok(action),
            Arrival::Explore(room) => room,
        };

        let mut ctx = TacticContext {
            room,
            items: &status.items,
            threats: &status.threats,
            vitals: &self.vitals,
            inventory: &mut self.inventory,
            navigator: &mut self.navigator,
        };
        for tactic in &mut self.tactics {
            if let Some(action) = tactic.consider(&mut ctx)? {
                debug!(tactic = tactic.name(), %action, "tactic claimed the turn");
                return Ok(action);
            }
        }

        self.navigator.explore(room)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Direction, Item, PlayerKind, Treasure, navigator::Mode};

    fn room(purpose: &str, exits: &[&str]) -> Value {
        json!({
            "location": { "room": { "purpose": purpose, "attributes": [], "exits": exits } }
        })
    }

    fn with(mut record: Value, key: &str, value: Value) -> Value {
        record[key] = value;
        record
    }

    fn act(agent: &mut Agent, record: &Value) -> Action {
        match agent.step(record) {
            Ok(Turn::Act(action)) => action,
            other => panic!("expected an action, got {other:?}"),
        }
    }

    fn outside() -> Value {
        json!({ "location": "outside the castle" })
    }

    #[test]
    fn verdicts_finish_the_game() {
        let mut agent = Agent::default();
        let won = agent.step(&json!({ "congratulations": { "score": 4 } }));
        assert!(matches!(won, Ok(Turn::Finished(Outcome::Won(_)))));
        let lost = agent.step(&json!({ "condolences": { "error": "drowned" } }));
        assert!(matches!(lost, Ok(Turn::Finished(Outcome::Lost(LossRecord::Error(_))))));
        assert_eq!(agent.turns(), 0);
    }

    #[test]
    fn malformed_records_are_reported() {
        let mut agent = Agent::default();
        assert!(matches!(
            agent.step(&json!({ "stuff": [] })),
            Err(AgentError::MalformedObservation(_))
        ));
        assert!(matches!(
            agent.step(&room("hall", &["sideways"])),
            Err(AgentError::UnknownDirection(_))
        ));
    }

    #[test]
    fn breadcrumb_plays_a_full_game() {
        let mut agent = Agent::new(&PlayerKind::Breadcrumb.config());
        assert_eq!(act(&mut agent, &room("a", &["east"])), Action::Go(Direction::East));
        assert_eq!(act(&mut agent, &room("b", &["south", "west"])), Action::Go(Direction::South));
        assert_eq!(act(&mut agent, &outside()), Action::Enter);

        let frog = with(room("b", &["south", "west"]), "stuff", json!([{ "frog": null }]));
        assert_eq!(act(&mut agent, &frog), Action::Carry(Item::Frog));
        assert_eq!(act(&mut agent, &room("b", &["south", "west"])), Action::Go(Direction::South));
        assert_eq!(act(&mut agent, &outside()), Action::Stop);
        assert_eq!(agent.navigator().mode(), Mode::Stopped);
    }

    #[test]
    fn override_path_preempts_tactics() {
        let mut agent = Agent::new(&PlayerKind::Greedy.config());
        assert_eq!(act(&mut agent, &room("a", &["south"])), Action::Go(Direction::South));
        assert_eq!(act(&mut agent, &outside()), Action::Enter);

        let frog = with(room("a", &["south"]), "stuff", json!([{ "frog": null }]));
        assert_eq!(act(&mut agent, &frog), Action::Carry(Item::Frog));

        let gold = with(
            room("a", &["south"]),
            "stuff",
            json!([{ "treasure": "gold", "value": 10 }]),
        );
        assert_eq!(act(&mut agent, &gold), Action::Go(Direction::South));
        assert!(agent.inventory().treasures().is_empty());
    }

    #[test]
    fn tactics_run_before_exploring() {
        let mut agent = Agent::new(&PlayerKind::Greedy.config());
        let gold = with(
            room("a", &["north"]),
            "stuff",
            json!([{ "treasure": "gold", "value": 10 }]),
        );
        assert_eq!(
            act(&mut agent, &gold),
            Action::Carry(Item::Treasure(Treasure {
                name: "gold".to_string(),
                value: 10,
            }))
        );
        // The game would not list the gold any more.
        assert_eq!(act(&mut agent, &room("a", &["north"])), Action::Go(Direction::North));
    }

    #[test]
    fn vitals_keep_the_last_reported_level() {
        let mut agent = Agent::new(&PlayerKind::Breadcrumb.config());
        let tired = with(room("a", &["north"]), "threats", json!([{ "tired": 3 }, { "ill": 1 }]));
        act(&mut agent, &tired);
        assert_eq!(agent.vitals().tired, Some(3));

        let injured = with(room("b", &["south"]), "threats", json!([{ "injured": 2 }]));
        act(&mut agent, &injured);
        assert_eq!(
            *agent.vitals(),
            Vitals {
                ill: Some(1),
                tired: Some(3),
                injured: Some(2),
            }
        );

        let rested = with(room("c", &["east"]), "threats", json!([{ "tired": 0 }]));
        act(&mut agent, &rested);
        assert_eq!(agent.vitals().tired, Some(3));
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut agent = Agent::default();
        assert_eq!(
            agent.step(&room("cell", &[])),
            Err(AgentError::ExhaustedWithNoExit { rooms: 1 })
        );
        assert_eq!(agent.step(&room("cell", &[])), Ok(Turn::Act(Action::Stop)));
    }

    #[test]
    fn presets_build_their_tactics() {
        let agent = Agent::new(&PlayerKind::SelfPreservation.config());
        assert_eq!(
            agent.tactic_names().collect::<Vec<_>>(),
            vec!["goal", "combat", "economic"]
        );
    }
}
