//! Turns decoded game records into the agent's typed view of the world.
//!
//! A record is either a final verdict (`congratulations` / `condolences`) or a
//! status report describing where the agent stands, what lies around and what
//! ails it. Shape errors are reported as [`AgentError::MalformedObservation`];
//! nothing is guessed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Artifact, Direction, Item, RoomIdentity, Treasure, Weapon, error::AgentError};

const OUTSIDE: &str = "outside the castle";
const IN_MOAT: &str = "in the moat";

/// The classified content of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Won(WinRecord),
    Lost(LossRecord),
    Status(Status),
}

/// Payload of a `congratulations` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRecord {
    pub score: Value,
    #[serde(default)]
    pub hoard: Option<Value>,
    #[serde(default)]
    pub chronicle: Option<Value>,
}

/// Payload of a `condolences` record: either an error or a (lesser) win.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LossRecord {
    Error(Value),
    Won(WinRecord),
}

/// Everything reported about the agent's current surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub location: Location,
    pub items: Items,
    pub threats: Threats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Room(Room),
    Outside,
    InMoat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub identity: RoomIdentity,
    pub exits: BTreeSet<Direction>,
}

/// The items lying in the current room, bucketed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Items {
    pub has_frog: bool,
    pub treasures: Vec<Treasure>,
    pub weapons: Vec<Weapon>,
    pub artifacts: Vec<Artifact>,
}

/// Threats reported this turn. `None` means "not reported", not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Threats {
    pub ill: Option<i64>,
    pub tired: Option<i64>,
    pub injured: Option<i64>,
    pub attacked: bool,
    pub attackers: Vec<String>,
}

#[derive(Deserialize)]
struct RawRoom {
    purpose: String,
    attributes: Vec<String>,
    exits: Vec<String>,
}

impl Observation {
    /// Classifies a decoded record.
    ///
    /// Verdict keys win over everything else in the record. Any other record
    /// must carry a `location`.
    pub fn from_record(record: &Value) -> Result<Self, AgentError> {
        let fields = record
            .as_object()
            .ok_or_else(|| AgentError::malformed(format!("expected an object, got {record}")))?;

        if let Some(win) = fields.get("congratulations") {
            return Ok(Observation::Won(parse_win(win)?));
        }
        if let Some(loss) = fields.get("condolences") {
            return Ok(Observation::Lost(parse_loss(loss)?));
        }

        let location = fields
            .get("location")
            .ok_or_else(|| AgentError::malformed("record has no `location`"))?;

        Ok(Observation::Status(Status {
            location: parse_location(location)?,
            items: match fields.get("stuff") {
                Some(stuff) => parse_items(stuff)?,
                None => Items::default(),
            },
            threats: match fields.get("threats") {
                Some(threats) => parse_threats(threats)?,
                None => Threats::default(),
            },
        }))
    }
}

fn parse_win(value: &Value) -> Result<WinRecord, AgentError> {
    serde_json::from_value(value.clone())
        .map_err(|e| AgentError::malformed(format!("bad `congratulations`: {e}")))
}

fn parse_loss(value: &Value) -> Result<LossRecord, AgentError> {
    let fields = value
        .as_object()
        .ok_or_else(|| AgentError::malformed(format!("bad `condolences`: {value}")))?;
    match fields.get("error") {
        Some(error) => Ok(LossRecord::Error(error.clone())),
        None => parse_win(value).map(LossRecord::Won),
    }
}

fn parse_location(value: &Value) -> Result<Location, AgentError> {
    match value {
        Value::String(place) if place == OUTSIDE => Ok(Location::Outside),
        Value::String(place) if place == IN_MOAT => Ok(Location::InMoat),
        Value::Object(fields) => {
            let room = fields
                .get("room")
                .ok_or_else(|| AgentError::malformed(format!("unknown location {value}")))?;
            let raw: RawRoom = serde_json::from_value(room.clone())
                .map_err(|e| AgentError::malformed(format!("bad room: {e}")))?;
            let exits = raw
                .exits
                .iter()
                .map(|exit| exit.parse::<Direction>())
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(Location::Room(Room {
                identity: RoomIdentity::new(raw.purpose, raw.attributes),
                exits,
            }))
        }
        _ => Err(AgentError::malformed(format!("unknown location {value}"))),
    }
}

fn entries<'a>(value: &'a Value, key: &str) -> Result<Vec<&'a Map<String, Value>>, AgentError> {
    let list = value
        .as_array()
        .ok_or_else(|| AgentError::malformed(format!("`{key}` must be a list")))?;
    list.iter()
        .map(|entry| {
            entry
                .as_object()
                .ok_or_else(|| AgentError::malformed(format!("`{key}` entry {entry} is not an object")))
        })
        .collect()
}

fn string(fields: &Map<String, Value>, key: &str) -> Result<String, AgentError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AgentError::malformed(format!("`{key}` must be a string")))
}

fn integer(fields: &Map<String, Value>, key: &str) -> Result<i64, AgentError> {
    fields
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| AgentError::malformed(format!("`{key}` must be an integer")))
}

fn strings(fields: &Map<String, Value>, key: &str) -> Result<Vec<String>, AgentError> {
    let list = fields
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| AgentError::malformed(format!("`{key}` must be a list of strings")))?;
    list.iter()
        .map(|word| {
            word.as_str()
                .map(str::to_string)
                .ok_or_else(|| AgentError::malformed(format!("`{key}` must be a list of strings")))
        })
        .collect()
}

fn parse_item(fields: &Map<String, Value>) -> Result<Item, AgentError> {
    if fields.contains_key("frog") {
        Ok(Item::Frog)
    } else if fields.contains_key("treasure") {
        Ok(Item::Treasure(Treasure {
            name: string(fields, "treasure")?,
            value: integer(fields, "value")?,
        }))
    } else if fields.contains_key("weapon") {
        Ok(Item::Weapon(Weapon {
            name: string(fields, "weapon")?,
            lethality: integer(fields, "lethality")?,
        }))
    } else if fields.contains_key("artifact") {
        Ok(Item::Artifact(Artifact {
            name: string(fields, "artifact")?,
            description: strings(fields, "description")?,
        }))
    } else {
        Err(AgentError::malformed(format!(
            "unrecognized item {}",
            Value::Object(fields.clone())
        )))
    }
}

fn parse_items(value: &Value) -> Result<Items, AgentError> {
    let mut items = Items::default();
    for fields in entries(value, "stuff")? {
        match parse_item(fields)? {
            Item::Frog => items.has_frog = true,
            Item::Treasure(treasure) => items.treasures.push(treasure),
            Item::Weapon(weapon) => items.weapons.push(weapon),
            Item::Artifact(artifact) => items.artifacts.push(artifact),
        }
    }
    Ok(items)
}

fn parse_threats(value: &Value) -> Result<Threats, AgentError> {
    let mut threats = Threats::default();
    for fields in entries(value, "threats")? {
        let mut recognized = false;
        if fields.contains_key("ill") {
            threats.ill = Some(integer(fields, "ill")?);
            recognized = true;
        }
        if fields.contains_key("tired") {
            threats.tired = Some(integer(fields, "tired")?);
            recognized = true;
        }
        if fields.contains_key("injured") {
            threats.injured = Some(integer(fields, "injured")?);
            recognized = true;
        }
        if fields.contains_key("attacked") {
            threats.attacked = true;
            threats.attackers.extend(strings(fields, "attacked")?);
            recognized = true;
        }
        if !recognized {
            return Err(AgentError::malformed(format!(
                "unrecognized threat {}",
                Value::Object(fields.clone())
            )));
        }
    }
    Ok(threats)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn status(record: Value) -> Status {
        match Observation::from_record(&record) {
            Ok(Observation::Status(status)) => status,
            other => panic!("expected a status, got {other:?}"),
        }
    }

    #[test]
    fn verdicts_take_precedence_over_location() {
        let record = json!({
            "congratulations": { "score": 12, "hoard": ["gold"] },
            "location": "outside the castle",
        });
        let Ok(Observation::Won(win)) = Observation::from_record(&record) else {
            panic!("expected a win");
        };
        assert_eq!(win.score, json!(12));
        assert_eq!(win.hoard, Some(json!(["gold"])));
        assert_eq!(win.chronicle, None);
    }

    #[test]
    fn condolences_carry_an_error_or_a_win() {
        let error = json!({ "condolences": { "error": "eaten by a grue" } });
        assert_eq!(
            Observation::from_record(&error),
            Ok(Observation::Lost(LossRecord::Error(json!("eaten by a grue"))))
        );

        let lesser = json!({ "condolences": { "score": 3 } });
        let Ok(Observation::Lost(LossRecord::Won(win))) = Observation::from_record(&lesser) else {
            panic!("expected a nested win");
        };
        assert_eq!(win.score, json!(3));
    }

    #[test]
    fn missing_location_is_malformed() {
        let result = Observation::from_record(&json!({ "stuff": [] }));
        assert!(matches!(result, Err(AgentError::MalformedObservation(_))));
    }

    #[test]
    fn parses_outdoor_locations() {
        assert_eq!(
            status(json!({ "location": "outside the castle" })).location,
            Location::Outside
        );
        assert_eq!(
            status(json!({ "location": "in the moat" })).location,
            Location::InMoat
        );
        let result = Observation::from_record(&json!({ "location": "on the roof" }));
        assert!(matches!(result, Err(AgentError::MalformedObservation(_))));
    }

    #[test]
    fn parses_rooms_into_identity_and_exits() {
        let parsed = status(json!({
            "actors": [["minion", "unworthy"]],
            "location": { "room": {
                "purpose": "gallery",
                "attributes": ["stone", "bare-floor"],
                "exits": ["south", "north"],
            }},
        }));
        let Location::Room(room) = parsed.location else {
            panic!("expected a room");
        };
        assert_eq!(room.identity, RoomIdentity::new("gallery", ["bare-floor", "stone"]));
        assert_eq!(
            room.exits.into_iter().collect::<Vec<_>>(),
            vec![Direction::North, Direction::South]
        );
        assert_eq!(parsed.items, Items::default());
        assert_eq!(parsed.threats, Threats::default());
    }

    #[test]
    fn unknown_exit_is_a_direction_error() {
        let record = json!({
            "location": { "room": { "purpose": "hall", "attributes": [], "exits": ["sideways"] } }
        });
        assert_eq!(
            Observation::from_record(&record),
            Err(AgentError::UnknownDirection("sideways".to_string()))
        );
    }

    #[test]
    fn room_without_exits_list_is_malformed() {
        let record = json!({ "location": { "room": { "purpose": "hall", "attributes": [] } } });
        assert!(matches!(
            Observation::from_record(&record),
            Err(AgentError::MalformedObservation(_))
        ));
    }

    #[test]
    fn buckets_items_by_tag() {
        let parsed = status(json!({
            "location": "outside the castle",
            "stuff": [
                { "frog": [] },
                { "treasure": "gold", "value": 10 },
                { "weapon": "sword", "lethality": 4 },
                { "artifact": "orb", "description": ["round", "glowing"] },
                { "treasure": "silver", "value": 5 },
            ],
        }));
        assert!(parsed.items.has_frog);
        assert_eq!(
            parsed.items.treasures,
            vec![
                Treasure { name: "gold".to_string(), value: 10 },
                Treasure { name: "silver".to_string(), value: 5 },
            ]
        );
        assert_eq!(
            parsed.items.weapons,
            vec![Weapon { name: "sword".to_string(), lethality: 4 }]
        );
        assert_eq!(parsed.items.artifacts[0].description, vec!["round", "glowing"]);
    }

    #[test]
    fn unrecognized_or_incomplete_items_are_malformed() {
        let unknown = json!({ "location": "in the moat", "stuff": [{ "potion": "red" }] });
        assert!(matches!(
            Observation::from_record(&unknown),
            Err(AgentError::MalformedObservation(_))
        ));
        let missing_value = json!({ "location": "in the moat", "stuff": [{ "treasure": "gold" }] });
        assert!(matches!(
            Observation::from_record(&missing_value),
            Err(AgentError::MalformedObservation(_))
        ));
    }

    #[test]
    fn parses_threats_and_leaves_unreported_levels_empty() {
        let parsed = status(json!({
            "location": "outside the castle",
            "threats": [
                { "tired": 4 },
                { "attacked": ["troll", "goblin"] },
            ],
        }));
        assert_eq!(parsed.threats.tired, Some(4));
        assert_eq!(parsed.threats.ill, None);
        assert_eq!(parsed.threats.injured, None);
        assert!(parsed.threats.attacked);
        assert_eq!(parsed.threats.attackers, vec!["troll", "goblin"]);
    }

    #[test]
    fn unrecognized_threat_is_malformed() {
        let record = json!({ "location": "outside the castle", "threats": [{ "cursed": 2 }] });
        assert!(matches!(
            Observation::from_record(&record),
            Err(AgentError::MalformedObservation(_))
        ));
    }
}
