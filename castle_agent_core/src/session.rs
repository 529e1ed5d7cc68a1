//! Drives an [`Agent`] against a game over some [`Transport`].

use std::{io, time::Duration};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    Action,
    agent::{Agent, Outcome, Turn},
    error::AgentError,
    observation::Observation,
};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o error talking to the game: {0}")]
    Io(#[from] io::Error),

    #[error("no response from the game within {0:?}")]
    Timeout(Duration),

    #[error("the game closed the connection")]
    Closed,

    #[error("could not decode the game's response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where records come from and actions go to.
pub trait Transport {
    /// Blocks until the next decoded record arrives.
    fn receive(&mut self) -> Result<Value, TransportError>;

    fn send(&mut self, action: &Action) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn receive(&mut self) -> Result<Value, TransportError> {
        (**self).receive()
    }

    fn send(&mut self, action: &Action) -> Result<(), TransportError> {
        (**self).send(action)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// One action sent to the game.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRecord {
    pub turn: u64,
    pub action: Action,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub turns: u64,
    #[serde(serialize_with = "serialize_outcome")]
    pub outcome: Outcome,
}

fn serialize_outcome<S: serde::Serializer>(outcome: &Outcome, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(tag = "result", rename_all = "lowercase")]
    enum Tagged<'a> {
        Won { record: &'a crate::observation::WinRecord },
        Lost { record: &'a crate::observation::LossRecord },
        Stopped,
    }

    let tagged = match outcome {
        Outcome::Won(record) => Tagged::Won { record },
        Outcome::Lost(record) => Tagged::Lost { record },
        Outcome::Stopped => Tagged::Stopped,
    };
    tagged.serialize(serializer)
}

/// Result of one [`Session::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Played(TurnRecord),
    Finished(SessionReport),
}

pub struct Session<T> {
    agent: Agent,
    transport: T,
    turns: u64,
    report: Option<SessionReport>,
}

impl<T: Transport> Session<T> {
    pub fn new(agent: Agent, transport: T) -> Self {
        Session {
            agent,
            transport,
            turns: 0,
            report: None,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of actions sent so far.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    /// Receives one record, answers it and sends the answer.
    ///
    /// Once the game is over every further call returns the same report.
    pub fn step(&mut self) -> Result<Progress, SessionError> {
        if let Some(report) = &self.report {
            return Ok(Progress::Finished(report.clone()));
        }

        let record = self.transport.receive()?;
        debug!(%record, "received");

        let action = match self.agent.step(&record) {
            Ok(Turn::Act(action)) => action,
            Ok(Turn::Finished(outcome)) => return Ok(Progress::Finished(self.finish(outcome))),
            Err(err @ AgentError::ExhaustedWithNoExit { .. }) => {
                warn!(%err, "giving up");
                self.transport.send(&Action::Stop)?;
                self.turns += 1;
                self.finish(Outcome::Stopped);
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        self.transport.send(&action)?;
        self.turns += 1;
        info!(turn = self.turns, %action, "sent");

        if action == Action::Stop {
            let outcome = self.final_verdict();
            return Ok(Progress::Finished(self.finish(outcome)));
        }

        Ok(Progress::Played(TurnRecord {
            turn: self.turns,
            action,
        }))
    }

    /// Plays until the game is over.
    pub fn run(&mut self) -> Result<SessionReport, SessionError> {
        loop {
            if let Progress::Finished(report) = self.step()? {
                return Ok(report);
            }
        }
    }

    /// Reads the verdict that may follow a stop.
    fn final_verdict(&mut self) -> Outcome {
        let record = match self.transport.receive() {
            Ok(record) => record,
            Err(err) => {
                debug!(%err, "no verdict after stopping");
                return Outcome::Stopped;
            }
        };
        match Observation::from_record(&record) {
            Ok(Observation::Won(win)) => Outcome::Won(win),
            Ok(Observation::Lost(loss)) => Outcome::Lost(loss),
            Ok(Observation::Status(_)) => {
                debug!(%record, "game kept going after stop");
                Outcome::Stopped
            }
            Err(err) => {
                warn!(%err, "unreadable verdict after stopping");
                Outcome::Stopped
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> SessionReport {
        let report = SessionReport {
            turns: self.turns,
            outcome,
        };
        info!(turns = report.turns, outcome = ?report.outcome, "session over");
        self.report = Some(report.clone());
        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serde_json::json;

    use super::*;
    use crate::{Direction, PlayerKind};

    /// Replays canned records and remembers what was sent.
    #[derive(Debug, Default)]
    struct Script {
        records: VecDeque<Value>,
        sent: Vec<String>,
    }

    impl Script {
        fn new(records: impl IntoIterator<Item = Value>) -> Self {
            Script {
                records: records.into_iter().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for Script {
        fn receive(&mut self) -> Result<Value, TransportError> {
            self.records.pop_front().ok_or(TransportError::Closed)
        }

        fn send(&mut self, action: &Action) -> Result<(), TransportError> {
            self.sent.push(action.to_string());
            Ok(())
        }
    }

    fn room(purpose: &str, exits: &[&str]) -> Value {
        json!({
            "location": { "room": { "purpose": purpose, "attributes": [], "exits": exits } }
        })
    }

    #[test]
    fn plays_to_a_win() {
        let mut frog = room("hall", &["north"]);
        frog["stuff"] = json!([{ "frog": null }]);
        let script = Script::new([
            frog,
            room("hall", &["north"]),
            json!({ "location": "outside the castle" }),
            json!({ "congratulations": { "score": 0, "hoard": [] } }),
        ]);
        let mut session = Session::new(Agent::new(&PlayerKind::Breadcrumb.config()), script);

        let report = session.run().unwrap();
        assert!(matches!(report.outcome, Outcome::Won(_)));
        assert_eq!(report.turns, 3);
        assert_eq!(
            session.transport().sent,
            vec!["(carry (frog))", "(go north)", "(stop)"]
        );
        assert!(matches!(session.step(), Ok(Progress::Finished(_))));
    }

    #[test]
    fn step_reports_each_turn() {
        let script = Script::new([room("hall", &["east"])]);
        let mut session = Session::new(Agent::default(), script);
        assert_eq!(
            session.step().unwrap(),
            Progress::Played(TurnRecord {
                turn: 1,
                action: Action::Go(Direction::East),
            })
        );
        assert!(matches!(
            session.step(),
            Err(SessionError::Transport(TransportError::Closed))
        ));
    }

    #[test]
    fn exhaustion_still_sends_stop() {
        let script = Script::new([room("cell", &[])]);
        let mut session = Session::new(Agent::default(), script);
        let err = session.run().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Agent(AgentError::ExhaustedWithNoExit { rooms: 1 })
        ));
        assert_eq!(session.transport().sent, vec!["(stop)"]);
        assert_eq!(session.report().map(|r| &r.outcome), Some(&Outcome::Stopped));
    }

    #[test]
    fn missing_verdict_after_stop_is_not_an_error() {
        let mut agent = Agent::new(&PlayerKind::Breadcrumb.config());
        let mut frog = room("hall", &["north"]);
        frog["stuff"] = json!([{ "frog": null }]);
        assert_eq!(agent.step(&frog), Ok(Turn::Act(Action::Carry(crate::Item::Frog))));

        let script = Script::new([room("hall", &["north"]), json!({ "location": "in the moat" })]);
        let mut session = Session::new(agent, script);
        let report = session.run().unwrap();
        assert_eq!(report.outcome, Outcome::Stopped);
        assert_eq!(session.transport().sent, vec!["(go north)", "(stop)"]);
    }

    #[test]
    fn report_serializes_with_a_result_tag() {
        let report = SessionReport {
            turns: 3,
            outcome: Outcome::Stopped,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "turns": 3, "outcome": { "result": "stopped" } })
        );
    }
}
