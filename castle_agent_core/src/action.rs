use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Direction, Item, Weapon};

/// A single command sent to the game.
///
/// `Display` renders the exact text the game expects, e.g. `(go north)` or
/// `(carry (weapon "sword" 4))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Go(Direction),
    Enter,
    EnterRandomly,
    Carry(Item),
    Drop(Item),
    Attack {
        attackers: Vec<String>,
        weapon: Option<Weapon>,
    },
    Stop,
}

impl Action {
    /// The direction of a movement command.
    pub const fn direction(&self) -> Option<Direction> {
        match self {
            Action::Go(direction) => Some(*direction),
            _ => None,
        }
    }
}

fn quoted(words: &[String]) -> String {
    words
        .iter()
        .map(|word| format!("\"{word}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_item(f: &mut fmt::Formatter<'_>, verb: &str, item: &Item) -> fmt::Result {
    match item {
        Item::Frog => write!(f, "({verb} (frog))"),
        Item::Treasure(treasure) => write!(
            f,
            "({verb} (treasure \"{}\" {}))",
            treasure.name, treasure.value
        ),
        Item::Weapon(weapon) => write!(
            f,
            "({verb} (weapon \"{}\" {}))",
            weapon.name, weapon.lethality
        ),
        Item::Artifact(artifact) => write!(
            f,
            "({verb} (artifact \"{}\" {}))",
            artifact.name,
            quoted(&artifact.description)
        ),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Go(direction) => write!(f, "(go {direction})"),
            Action::Enter => f.write_str("(enter)"),
            Action::EnterRandomly => f.write_str("(enter-randomly)"),
            Action::Carry(item) => write_item(f, "carry", item),
            Action::Drop(item) => write_item(f, "drop", item),
            Action::Attack {
                attackers,
                weapon: Some(weapon),
            } => write!(
                f,
                "(attack ({}) (weapon \"{}\" {}))",
                quoted(attackers),
                weapon.name,
                weapon.lethality
            ),
            Action::Attack {
                attackers,
                weapon: None,
            } => write!(f, "(attack ({}))", quoted(attackers)),
            Action::Stop => f.write_str("(stop)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Artifact, Treasure};

    #[test]
    fn renders_movement_commands() {
        assert_eq!(Action::Go(Direction::North).to_string(), "(go north)");
        assert_eq!(Action::Enter.to_string(), "(enter)");
        assert_eq!(Action::EnterRandomly.to_string(), "(enter-randomly)");
        assert_eq!(Action::Stop.to_string(), "(stop)");
    }

    #[test]
    fn renders_item_commands() {
        assert_eq!(Action::Carry(Item::Frog).to_string(), "(carry (frog))");
        let gold = Item::Treasure(Treasure {
            name: "gold".to_string(),
            value: 10,
        });
        assert_eq!(
            Action::Carry(gold.clone()).to_string(),
            "(carry (treasure \"gold\" 10))"
        );
        assert_eq!(
            Action::Drop(gold).to_string(),
            "(drop (treasure \"gold\" 10))"
        );
        let sword = Item::Weapon(Weapon {
            name: "sword".to_string(),
            lethality: 4,
        });
        assert_eq!(
            Action::Carry(sword).to_string(),
            "(carry (weapon \"sword\" 4))"
        );
    }

    #[test]
    fn artifacts_list_their_description_words() {
        let orb = Item::Artifact(Artifact {
            name: "orb".to_string(),
            description: vec!["round".to_string(), "glowing".to_string()],
        });
        assert_eq!(
            Action::Carry(orb).to_string(),
            "(carry (artifact \"orb\" \"round\" \"glowing\"))"
        );
    }

    #[test]
    fn renders_attacks_with_and_without_weapon() {
        let attackers = vec!["troll".to_string(), "goblin".to_string()];
        let armed = Action::Attack {
            attackers: attackers.clone(),
            weapon: Some(Weapon {
                name: "axe".to_string(),
                lethality: 7,
            }),
        };
        assert_eq!(
            armed.to_string(),
            "(attack (\"troll\" \"goblin\") (weapon \"axe\" 7))"
        );
        let bare = Action::Attack {
            attackers,
            weapon: None,
        };
        assert_eq!(bare.to_string(), "(attack (\"troll\" \"goblin\"))");
    }
}
