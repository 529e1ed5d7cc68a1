//! An in-process castle that plays the game side of a session.
//!
//! Castles are described in a small line-oriented text format:
//!
//! ```text
//! # two rooms, the frog waits in the cellar
//! room hall gallery "stone,fireplace south"
//! room cellar storage -
//! link hall down cellar
//! exit hall north
//! frog cellar
//! treasure cellar "gold bar" 12
//! threat cellar attacked rat
//! start hall
//! ```
//!
//! Every directive names rooms by the id given in their `room` line. Lists are
//! comma separated, `-` is the empty list and double quotes group words. When
//! there is no `start` line the agent starts in the first room.

use std::collections::{BTreeMap, HashMap};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    Action, Artifact, Direction, Item, Treasure, Weapon,
    session::{Transport, TransportError},
};

/// Turns after which the castle declares the game lost.
pub const DEFAULT_MAX_TURNS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CastleError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown room `{name}`")]
    UnknownRoom { line: usize, name: String },

    #[error("line {line}: room `{room}` already has a door {direction}")]
    DoorTaken {
        line: usize,
        room: String,
        direction: Direction,
    },

    #[error("the castle has no rooms")]
    Empty,
}

/// Where a door leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Door {
    Room(usize),
    Outside,
    Moat,
}

impl Door {
    const fn leads_out(self) -> bool {
        matches!(self, Door::Outside | Door::Moat)
    }
}

/// Lasting dangers of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hazards {
    pub attackers: Vec<String>,
    pub ill: Option<i64>,
    pub tired: Option<i64>,
    pub injured: Option<i64>,
}

impl Hazards {
    fn is_empty(&self) -> bool {
        self.attackers.is_empty()
            && self.ill.is_none()
            && self.tired.is_none()
            && self.injured.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastleRoom {
    pub name: String,
    pub purpose: String,
    pub attributes: Vec<String>,
    pub doors: BTreeMap<Direction, Door>,
    pub stuff: Vec<Item>,
    pub hazards: Hazards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Whereabouts {
    Inside(usize),
    /// `left` is the room whose door led out, if any.
    Outside { left: Option<usize> },
    InMoat { left: Option<usize> },
}

/// A castle held in memory that answers actions like the real game.
#[derive(Debug)]
pub struct SimulatedCastle {
    rooms: Vec<CastleRoom>,
    whereabouts: Whereabouts,
    carried: Vec<Item>,
    rng: StdRng,
    turns: u64,
    max_turns: u64,
    verdict: Option<Value>,
    closed: bool,
}

impl SimulatedCastle {
    /// Builds a castle from its text description. `seed` drives random
    /// re-entry.
    pub fn parse(text: &str, seed: u64) -> Result<Self, CastleError> {
        let mut rooms: Vec<CastleRoom> = Vec::new();
        let mut ids: HashMap<String, usize> = HashMap::new();
        let mut start: Option<usize> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let syntax = |message: String| CastleError::Syntax { line, message };

            let content = raw.split('#').next().unwrap_or_default();
            let tokens = tokenize(content).map_err(syntax)?;
            let Some((directive, args)) = tokens.split_first() else {
                continue;
            };

            match (directive.as_str(), args) {
                ("room", [name, purpose, attributes]) => {
                    if ids.contains_key(name) {
                        return Err(syntax(format!("room `{name}` is declared twice")));
                    }
                    ids.insert(name.clone(), rooms.len());
                    rooms.push(CastleRoom {
                        name: name.clone(),
                        purpose: purpose.clone(),
                        attributes: list(attributes),
                        doors: BTreeMap::new(),
                        stuff: Vec::new(),
                        hazards: Hazards::default(),
                    });
                }
                ("link", [from, direction, to]) => {
                    let direction = parse_direction(direction).map_err(syntax)?;
                    let (from, to) = (lookup(&ids, line, from)?, lookup(&ids, line, to)?);
                    add_door(&mut rooms, line, from, direction, Door::Room(to))?;
                    add_door(&mut rooms, line, to, direction.reverse(), Door::Room(from))?;
                }
                ("exit", [name, direction]) => {
                    let direction = parse_direction(direction).map_err(syntax)?;
                    add_door(&mut rooms, line, lookup(&ids, line, name)?, direction, Door::Outside)?;
                }
                ("moat", [name, direction]) => {
                    let direction = parse_direction(direction).map_err(syntax)?;
                    add_door(&mut rooms, line, lookup(&ids, line, name)?, direction, Door::Moat)?;
                }
                ("frog", [name]) => {
                    let room = lookup(&ids, line, name)?;
                    rooms[room].stuff.push(Item::Frog);
                }
                ("treasure", [name, treasure, value]) => {
                    let room = lookup(&ids, line, name)?;
                    rooms[room].stuff.push(Item::Treasure(Treasure {
                        name: treasure.clone(),
                        value: parse_number(value).map_err(syntax)?,
                    }));
                }
                ("weapon", [name, weapon, lethality]) => {
                    let room = lookup(&ids, line, name)?;
                    rooms[room].stuff.push(Item::Weapon(Weapon {
                        name: weapon.clone(),
                        lethality: parse_number(lethality).map_err(syntax)?,
                    }));
                }
                ("artifact", [name, artifact, description]) => {
                    let room = lookup(&ids, line, name)?;
                    rooms[room].stuff.push(Item::Artifact(Artifact {
                        name: artifact.clone(),
                        description: list(description),
                    }));
                }
                ("threat", [name, kind, value]) => {
                    let room = lookup(&ids, line, name)?;
                    let hazards = &mut rooms[room].hazards;
                    match kind.as_str() {
                        "attacked" => hazards.attackers.extend(list(value)),
                        "ill" => hazards.ill = Some(parse_number(value).map_err(syntax)?),
                        "tired" => hazards.tired = Some(parse_number(value).map_err(syntax)?),
                        "injured" => hazards.injured = Some(parse_number(value).map_err(syntax)?),
                        other => return Err(syntax(format!("unknown threat `{other}`"))),
                    }
                }
                ("start", [name]) => {
                    start = Some(lookup(&ids, line, name)?);
                }
                (directive, args) => {
                    return Err(syntax(format!(
                        "cannot understand `{directive}` with {} argument(s)",
                        args.len()
                    )));
                }
            }
        }

        if rooms.is_empty() {
            return Err(CastleError::Empty);
        }

        Ok(SimulatedCastle {
            rooms,
            whereabouts: Whereabouts::Inside(start.unwrap_or(0)),
            carried: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            turns: 0,
            max_turns: DEFAULT_MAX_TURNS,
            verdict: None,
            closed: false,
        })
    }

    pub fn with_max_turns(mut self, max_turns: u64) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn rooms(&self) -> &[CastleRoom] {
        &self.rooms
    }

    /// Actions applied so far.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// The room the agent is in, if it is inside.
    pub fn current_room(&self) -> Option<&CastleRoom> {
        match self.whereabouts {
            Whereabouts::Inside(room) => self.rooms.get(room),
            Whereabouts::Outside { .. } | Whereabouts::InMoat { .. } => None,
        }
    }

    /// True once a verdict has been reached.
    pub fn is_over(&self) -> bool {
        self.verdict.is_some() || self.closed
    }

    /// The record describing what the agent currently perceives.
    pub fn observation(&self) -> Value {
        let room = match self.whereabouts {
            Whereabouts::Inside(room) => &self.rooms[room],
            Whereabouts::Outside { .. } => return json!({ "location": "outside the castle" }),
            Whereabouts::InMoat { .. } => return json!({ "location": "in the moat" }),
        };

        let exits: Vec<&str> = room.doors.keys().map(|direction| direction.as_str()).collect();
        let mut record = json!({
            "location": {
                "room": {
                    "purpose": room.purpose,
                    "attributes": room.attributes,
                    "exits": exits,
                }
            }
        });

        if !room.stuff.is_empty() {
            record["stuff"] = room.stuff.iter().map(item_record).collect();
        }

        if !room.hazards.is_empty() {
            let hazards = &room.hazards;
            let mut threats = Vec::new();
            if !hazards.attackers.is_empty() {
                threats.push(json!({ "attacked": hazards.attackers }));
            }
            let levels = [("ill", hazards.ill), ("tired", hazards.tired), ("injured", hazards.injured)];
            for (kind, level) in levels {
                if let Some(level) = level {
                    threats.push(json!({ kind: level }));
                }
            }
            record["threats"] = Value::Array(threats);
        }

        record
    }

    /// Applies one action, possibly reaching a verdict.
    pub fn apply(&mut self, action: &Action) {
        if self.is_over() {
            return;
        }
        self.turns += 1;

        let verdict = match self.act(action) {
            Ok(verdict) => verdict,
            Err(message) => {
                debug!(%action, %message, "impossible action");
                Some(json!({ "condolences": { "error": message } }))
            }
        };

        self.verdict = verdict.or_else(|| {
            (self.turns >= self.max_turns).then(|| {
                json!({ "condolences": { "error": format!("still wandering after {} turns", self.turns) } })
            })
        });
    }

    fn act(&mut self, action: &Action) -> Result<Option<Value>, String> {
        match (action, self.whereabouts) {
            (Action::Go(direction), Whereabouts::Inside(room)) => {
                let door = self.rooms[room]
                    .doors
                    .get(direction)
                    .copied()
                    .ok_or_else(|| format!("there is no door {direction}"))?;
                self.whereabouts = match door {
                    Door::Room(next) => Whereabouts::Inside(next),
                    Door::Outside => Whereabouts::Outside { left: Some(room) },
                    Door::Moat => Whereabouts::InMoat { left: Some(room) },
                };
                Ok(None)
            }
            (Action::Go(_), _) => Err("cannot walk around outside the castle".to_string()),

            (
                Action::Enter,
                Whereabouts::Outside { left: Some(room) } | Whereabouts::InMoat { left: Some(room) },
            ) => {
                self.whereabouts = Whereabouts::Inside(room);
                Ok(None)
            }
            (Action::Enter, _) => Err("there is nowhere to enter".to_string()),

            (Action::EnterRandomly, Whereabouts::Outside { .. } | Whereabouts::InMoat { .. }) => {
                let entrances: Vec<usize> = self
                    .rooms
                    .iter()
                    .enumerate()
                    .filter(|(_, room)| room.doors.values().any(|door| door.leads_out()))
                    .map(|(index, _)| index)
                    .collect();
                if entrances.is_empty() {
                    return Err("the castle has no entrance".to_string());
                }
                let room = entrances[self.rng.random_range(0..entrances.len())];
                debug!(room = %self.rooms[room].name, "entering at random");
                self.whereabouts = Whereabouts::Inside(room);
                Ok(None)
            }
            (Action::EnterRandomly, _) => Err("already inside the castle".to_string()),

            (Action::Carry(item), Whereabouts::Inside(room)) => {
                let stuff = &mut self.rooms[room].stuff;
                let index = stuff
                    .iter()
                    .position(|lying| lying == item)
                    .ok_or_else(|| format!("there is no {} \"{}\" here", item.kind(), item.name()))?;
                self.carried.push(stuff.remove(index));
                Ok(None)
            }
            (Action::Drop(item), Whereabouts::Inside(room)) => {
                let index = self
                    .carried
                    .iter()
                    .position(|held| held == item)
                    .ok_or_else(|| format!("not carrying {} \"{}\"", item.kind(), item.name()))?;
                let item = self.carried.remove(index);
                self.rooms[room].stuff.push(item);
                Ok(None)
            }
            (Action::Carry(_) | Action::Drop(_), _) => {
                Err("items can only be handled inside the castle".to_string())
            }

            (Action::Attack { weapon, .. }, Whereabouts::Inside(room)) => {
                if let Some(weapon) = weapon {
                    let held = Item::Weapon(weapon.clone());
                    if !self.carried.contains(&held) {
                        return Err(format!("not carrying weapon \"{}\"", weapon.name));
                    }
                }
                let attackers = &mut self.rooms[room].hazards.attackers;
                if attackers.is_empty() {
                    return Err("there is nobody to attack".to_string());
                }
                attackers.clear();
                Ok(None)
            }
            (Action::Attack { .. }, _) => Err("there is nobody to attack".to_string()),

            (Action::Stop, Whereabouts::Inside(_)) => Err("stopped inside the castle".to_string()),
            (Action::Stop, _) if !self.carried.contains(&Item::Frog) => {
                Err("left the castle without the frog".to_string())
            }
            (Action::Stop, _) => {
                let treasures: Vec<&Treasure> = self
                    .carried
                    .iter()
                    .filter_map(|item| match item {
                        Item::Treasure(treasure) => Some(treasure),
                        _ => None,
                    })
                    .collect();
                let score: i64 = treasures.iter().map(|treasure| treasure.value).sum();
                let hoard: Vec<&str> = treasures.iter().map(|treasure| treasure.name.as_str()).collect();
                Ok(Some(json!({ "congratulations": { "score": score, "hoard": hoard } })))
            }
        }
    }
}

impl Transport for SimulatedCastle {
    fn receive(&mut self) -> Result<Value, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.verdict.take() {
            Some(verdict) => {
                self.closed = true;
                Ok(verdict)
            }
            None => Ok(self.observation()),
        }
    }

    fn send(&mut self, action: &Action) -> Result<(), TransportError> {
        if self.is_over() {
            return Err(TransportError::Closed);
        }
        self.apply(action);
        Ok(())
    }
}

fn item_record(item: &Item) -> Value {
    match item {
        Item::Frog => json!({ "frog": [] }),
        Item::Treasure(treasure) => json!({ "treasure": treasure.name, "value": treasure.value }),
        Item::Weapon(weapon) => json!({ "weapon": weapon.name, "lethality": weapon.lethality }),
        Item::Artifact(artifact) => {
            json!({ "artifact": artifact.name, "description": artifact.description })
        }
    }
}

fn lookup(ids: &HashMap<String, usize>, line: usize, name: &str) -> Result<usize, CastleError> {
    ids.get(name).copied().ok_or_else(|| CastleError::UnknownRoom {
        line,
        name: name.to_string(),
    })
}

fn add_door(
    rooms: &mut [CastleRoom],
    line: usize,
    room: usize,
    direction: Direction,
    door: Door,
) -> Result<(), CastleError> {
    let target = &mut rooms[room];
    if target.doors.contains_key(&direction) {
        return Err(CastleError::DoorTaken {
            line,
            room: target.name.clone(),
            direction,
        });
    }
    target.doors.insert(direction, door);
    Ok(())
}

fn parse_direction(token: &str) -> Result<Direction, String> {
    token.parse().map_err(|_| format!("`{token}` is not a direction"))
}

fn parse_number(token: &str) -> Result<i64, String> {
    token.parse().map_err(|_| format!("`{token}` is not a number"))
}

/// Splits a comma separated list; `-` is the empty list.
fn list(token: &str) -> Vec<String> {
    if token == "-" {
        return Vec::new();
    }
    token
        .split(',')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a line on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quote".to_string());
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}
