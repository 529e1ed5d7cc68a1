use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Consecutive random entries into known territory tolerated before stopping.
pub const DEFAULT_MAX_REENTRIES: u32 = 16;

const DENIED_WEAPONS: [&str; 3] = ["hi there", "atomic", "grenade launcher"];
const DENIED_TREASURES: [&str; 1] = ["art"];

/// One capability hook of the tactical layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TacticKind {
    Goal,
    Combat,
    Opportunistic,
    Economic,
    WeaponUpgrade,
}

/// What to do when attacked without a weapon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnarmedResponse {
    Fight,
    Flee,
    #[default]
    Ignore,
}

/// Item names the looting hooks never touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Denylist {
    pub weapons: BTreeSet<String>,
    pub treasures: BTreeSet<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Denylist {
            weapons: DENIED_WEAPONS.iter().map(|name| name.to_string()).collect(),
            treasures: DENIED_TREASURES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

/// How an [`Agent`](crate::Agent) behaves.
///
/// Missing fields fall back to the self-preservation preset, so a TOML file
/// only needs to name what it changes:
///
/// ```toml
/// tactics = ["goal", "combat", "weapon-upgrade"]
/// unarmed = "fight"
///
/// [denylist]
/// weapons = ["atomic"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Hooks consulted in order before exploring.
    pub tactics: Vec<TacticKind>,
    pub unarmed: UnarmedResponse,
    pub denylist: Denylist,
    pub max_reentries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        PlayerKind::default().config()
    }
}

/// Named compositions of tactics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerKind {
    Breadcrumb,
    Greedy,
    Fighter,
    GoldDigger,
    #[default]
    SelfPreservation,
}

impl PlayerKind {
    pub const ALL: [PlayerKind; 5] = [
        PlayerKind::Breadcrumb,
        PlayerKind::Greedy,
        PlayerKind::Fighter,
        PlayerKind::GoldDigger,
        PlayerKind::SelfPreservation,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PlayerKind::Breadcrumb => "breadcrumb",
            PlayerKind::Greedy => "greedy",
            PlayerKind::Fighter => "fighter",
            PlayerKind::GoldDigger => "gold-digger",
            PlayerKind::SelfPreservation => "self-preservation",
        }
    }

    pub fn config(self) -> AgentConfig {
        use TacticKind::*;

        let (tactics, unarmed) = match self {
            PlayerKind::Breadcrumb => (vec![Goal], UnarmedResponse::Ignore),
            PlayerKind::Greedy => (vec![Goal, Opportunistic], UnarmedResponse::Ignore),
            PlayerKind::Fighter => (vec![Goal, Combat, WeaponUpgrade], UnarmedResponse::Fight),
            PlayerKind::GoldDigger => (vec![Goal, Economic], UnarmedResponse::Ignore),
            PlayerKind::SelfPreservation => (vec![Goal, Combat, Economic], UnarmedResponse::Flee),
        };
        AgentConfig {
            tactics,
            unarmed,
            denylist: Denylist::default(),
            max_reentries: DEFAULT_MAX_REENTRIES,
        }
    }
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = PlayerKind::ALL.iter().map(|kind| kind.as_str()).collect();
                format!("unknown player `{s}`, expected one of: {}", known.join(", "))
            })
    }
}
