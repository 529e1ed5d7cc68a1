use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod castle;
pub mod config;
pub mod error;
pub mod inventory;
pub mod navigator;
pub mod observation;
pub mod session;
pub mod tactics;

pub use action::Action;
pub use agent::{Agent, Outcome, Turn};
pub use castle::SimulatedCastle;
pub use config::{AgentConfig, PlayerKind};
pub use error::AgentError;
pub use session::{Session, SessionReport, Transport};

/// One of the six ways out of a room.
///
/// Variants are declared in lexicographic order of their names, so the derived
/// `Ord` is the order in which unexplored exits are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    East,
    North,
    South,
    Up,
    West,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::East,
        Direction::North,
        Direction::South,
        Direction::Up,
        Direction::West,
    ];

    /// The direction that undoes a move in this direction.
    pub const fn reverse(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::East => "east",
            Direction::North => "north",
            Direction::South => "south",
            Direction::Up => "up",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.as_str() == s)
            .ok_or_else(|| AgentError::UnknownDirection(s.to_string()))
    }
}

/// Identifies a room by the set of words describing it.
///
/// The purpose and the attributes are merged into one sorted, de-duplicated
/// set, so the order in which the game lists attributes never matters. Two
/// rooms described with the same words are the same room as far as the agent
/// can tell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomIdentity(BTreeSet<String>);

impl RoomIdentity {
    pub fn new<I, S>(purpose: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut words: BTreeSet<String> = attributes.into_iter().map(Into::into).collect();
        words.insert(purpose.into());
        RoomIdentity(words)
    }

    /// The words making up this identity, in sorted order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for RoomIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<&str> = self.words().collect();
        write!(f, "[{}]", words.join(", "))
    }
}

/// A valuable lying in a room or carried by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Treasure {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub lethality: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub description: Vec<String>,
}

/// Anything the agent can carry or drop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    Frog,
    Treasure(Treasure),
    Weapon(Weapon),
    Artifact(Artifact),
}

impl Item {
    /// The tag used for this kind of item in observations and commands.
    pub const fn kind(&self) -> &'static str {
        match self {
            Item::Frog => "frog",
            Item::Treasure(_) => "treasure",
            Item::Weapon(_) => "weapon",
            Item::Artifact(_) => "artifact",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Frog => "frog",
            Item::Treasure(treasure) => &treasure.name,
            Item::Weapon(weapon) => &weapon.name,
            Item::Artifact(artifact) => &artifact.name,
        }
    }
}
