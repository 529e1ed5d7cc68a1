use serde::{Deserialize, Serialize};

use crate::{Action, Artifact, Item, Treasure, Weapon, error::AgentError};

/// What the agent is carrying.
///
/// Every change goes through [`Inventory::carry`] or [`Inventory::drop_item`],
/// which also produce the matching command, so the bookkeeping can never drift
/// from what was sent to the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    weapons: Vec<Weapon>,
    treasures: Vec<Treasure>,
    artifacts: Vec<Artifact>,
    goal_carried: bool,
}

impl Inventory {
    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn treasures(&self) -> &[Treasure] {
        &self.treasures
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub const fn goal_carried(&self) -> bool {
        self.goal_carried
    }

    /// The most lethal weapon carried; the first one wins ties.
    pub fn best_weapon(&self) -> Option<&Weapon> {
        self.weapons
            .iter()
            .min_by_key(|weapon| std::cmp::Reverse(weapon.lethality))
    }

    /// The least valuable treasure carried; the first one wins ties.
    pub fn least_valuable_treasure(&self) -> Option<&Treasure> {
        self.treasures.iter().min_by_key(|treasure| treasure.value)
    }

    pub fn treasure_value(&self) -> i64 {
        self.treasures.iter().map(|treasure| treasure.value).sum()
    }

    /// Records `item` as carried and returns the command picking it up.
    pub fn carry(&mut self, item: Item) -> Action {
        match &item {
            Item::Frog => self.goal_carried = true,
            Item::Treasure(treasure) => self.treasures.push(treasure.clone()),
            Item::Weapon(weapon) => self.weapons.push(weapon.clone()),
            Item::Artifact(artifact) => self.artifacts.push(artifact.clone()),
        }
        Action::Carry(item)
    }

    /// Removes `item` and returns the command dropping it.
    ///
    /// Dropping something that is not carried breaks the hooks' contract and
    /// is reported instead of being ignored.
    pub fn drop_item(&mut self, item: Item) -> Result<Action, AgentError> {
        let removed = match &item {
            Item::Frog => std::mem::replace(&mut self.goal_carried, false),
            Item::Treasure(treasure) => remove_first(&mut self.treasures, treasure),
            Item::Weapon(weapon) => remove_first(&mut self.weapons, weapon),
            Item::Artifact(artifact) => remove_first(&mut self.artifacts, artifact),
        };
        if removed {
            Ok(Action::Drop(item))
        } else {
            Err(AgentError::InventoryInconsistency {
                kind: item.kind(),
                name: item.name().to_string(),
            })
        }
    }
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) -> bool {
    match items.iter().position(|carried| carried == item) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}
