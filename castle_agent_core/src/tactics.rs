//! Capability hooks consulted before the navigator explores.
//!
//! Each hook sees the current room and may claim the turn by returning an
//! action. Hooks run in configured order and the first action wins.

use std::{cmp::Reverse, collections::HashSet, fmt::Debug};

use tracing::{debug, info};

use crate::{
    Action, Item, RoomIdentity, Treasure,
    agent::Vitals,
    config::{AgentConfig, Denylist, TacticKind, UnarmedResponse},
    error::AgentError,
    inventory::Inventory,
    navigator::Navigator,
    observation::{Items, Room, Threats},
};

/// Remembered tiredness when none has been reported yet.
const DEFAULT_TIREDNESS: i64 = 9;

/// Everything a hook may look at or change on a turn.
pub struct TacticContext<'a> {
    pub room: &'a Room,
    pub items: &'a Items,
    pub threats: &'a Threats,
    /// Levels remembered from earlier turns; this turn's threats are not
    /// folded in yet.
    pub vitals: &'a Vitals,
    pub inventory: &'a mut Inventory,
    pub navigator: &'a mut Navigator,
}

pub trait Tactic: Debug {
    fn name(&self) -> &'static str;

    /// Returns the action claiming this turn, if any.
    fn consider(&mut self, ctx: &mut TacticContext<'_>) -> Result<Option<Action>, AgentError>;
}

/// Builds the hooks named by `config`, in order.
pub fn build(config: &AgentConfig) -> Vec<Box<dyn Tactic>> {
    config
        .tactics
        .iter()
        .map(|kind| -> Box<dyn Tactic> {
            match kind {
                TacticKind::Goal => Box::new(GoalPursuit),
                TacticKind::Combat => Box::new(Combat {
                    unarmed: config.unarmed,
                }),
                TacticKind::Opportunistic => Box::new(OpportunisticLooting {
                    denylist: config.denylist.clone(),
                }),
                TacticKind::Economic => Box::new(EconomicLooting::new(config.denylist.clone())),
                TacticKind::WeaponUpgrade => Box::new(WeaponUpgrade {
                    denylist: config.denylist.clone(),
                }),
            }
        })
        .collect()
}

/// Picks up the frog and turns the navigator towards the nearest exit.
#[derive(Debug, Default)]
pub struct GoalPursuit;

impl Tactic for GoalPursuit {
    fn name(&self) -> &'static str {
        "goal"
    }

    fn consider(&mut self, ctx: &mut TacticContext<'_>) -> Result<Option<Action>, AgentError> {
        if !ctx.items.has_frog || ctx.inventory.goal_carried() {
            return Ok(None);
        }
        info!(room = %ctx.room.identity, "found the frog");
        let action = ctx.inventory.carry(Item::Frog);
        ctx.navigator.acquire_goal();
        Ok(Some(action))
    }
}

/// Answers attacks.
#[derive(Debug)]
pub struct Combat {
    pub unarmed: UnarmedResponse,
}

impl Tactic for Combat {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn consider(&mut self, ctx: &mut TacticContext<'_>) -> Result<Option<Action>, AgentError> {
        if !ctx.threats.attacked {
            return Ok(None);
        }
        let attackers = ctx.threats.attackers.clone();

        if let Some(weapon) = ctx.inventory.best_weapon() {
            info!(?attackers, weapon = %weapon.name, "fighting back");
            return Ok(Some(Action::Attack {
                attackers,
                weapon: Some(weapon.clone()),
            }));
        }

        match self.unarmed {
            UnarmedResponse::Fight => {
                info!(?attackers, "fighting back bare-handed");
                Ok(Some(Action::Attack {
                    attackers,
                    weapon: None,
                }))
            }
            UnarmedResponse::Flee => {
                let retreat = ctx.navigator.retreat();
                match &retreat {
                    Some(action) => info!(?attackers, %action, "unarmed, fleeing"),
                    None => debug!(?attackers, "unarmed with nowhere to flee"),
                }
                Ok(retreat)
            }
            UnarmedResponse::Ignore => Ok(None),
        }
    }
}

/// Grabs whatever is lying around: weapons first, then treasure, then
/// artifacts.
#[derive(Debug)]
pub struct OpportunisticLooting {
    pub denylist: Denylist,
}

impl Tactic for OpportunisticLooting {
    fn name(&self) -> &'static str {
        "opportunistic"
    }

    fn consider(&mut self, ctx: &mut TacticContext<'_>) -> Result<Option<Action>, AgentError> {
        let items = ctx.items;
        let item = items
            .weapons
            .iter()
            .find(|weapon| !self.denylist.weapons.contains(&weapon.name))
            .map(|weapon| Item::Weapon(weapon.clone()))
            .or_else(|| {
                items
                    .treasures
                    .iter()
                    .find(|treasure| !self.denylist.treasures.contains(&treasure.name))
                    .map(|treasure| Item::Treasure(treasure.clone()))
            })
            .or_else(|| items.artifacts.first().cloned().map(Item::Artifact));

        Ok(item.map(|item| {
            info!(kind = item.kind(), name = item.name(), "picking up");
            ctx.inventory.carry(item)
        }))
    }
}

/// Hoards the most valuable treasure, and sheds the cheapest one while
/// tiredness is not improving.
#[derive(Debug)]
pub struct EconomicLooting {
    pub denylist: Denylist,
    dropped: HashSet<Treasure>,
    last_room: Option<RoomIdentity>,
}

impl EconomicLooting {
    pub fn new(denylist: Denylist) -> Self {
        EconomicLooting {
            denylist,
            dropped: HashSet::new(),
            last_room: None,
        }
    }
}

impl Tactic for EconomicLooting {
    fn name(&self) -> &'static str {
        "economic"
    }

    fn consider(&mut self, ctx: &mut TacticContext<'_>) -> Result<Option<Action>, AgentError> {
        if self.last_room.as_ref() != Some(&ctx.room.identity) {
            self.dropped.clear();
            self.last_room = Some(ctx.room.identity.clone());
        }

        let remembered = ctx.vitals.tired.unwrap_or(DEFAULT_TIREDNESS);
        let worn_out = ctx
            .threats
            .tired
            .is_some_and(|tired| tired > 0 && remembered >= tired);
        if worn_out {
            if let Some(cheapest) = ctx.inventory.least_valuable_treasure().cloned() {
                info!(treasure = %cheapest.name, value = cheapest.value, remembered, "too heavy, dropping");
                let action = ctx.inventory.drop_item(Item::Treasure(cheapest.clone()))?;
                self.dropped.insert(cheapest);
                return Ok(Some(action));
            }
            debug!(remembered, "tiredness is not recovering, nothing to drop");
        }

        let best = ctx
            .items
            .treasures
            .iter()
            .filter(|treasure| !self.denylist.treasures.contains(&treasure.name))
            .filter(|treasure| !self.dropped.contains(*treasure))
            .min_by_key(|treasure| Reverse(treasure.value));

        Ok(best.cloned().map(|treasure| {
            info!(treasure = %treasure.name, value = treasure.value, "picking up the most valuable treasure");
            ctx.inventory.carry(Item::Treasure(treasure))
        }))
    }
}

/// Keeps only the deadliest weapon around.
#[derive(Debug)]
pub struct WeaponUpgrade {
    pub denylist: Denylist,
}

impl Tactic for WeaponUpgrade {
    fn name(&self) -> &'static str {
        "weapon-upgrade"
    }

    fn consider(&mut self, ctx: &mut TacticContext<'_>) -> Result<Option<Action>, AgentError> {
        let Some(best) = ctx
            .items
            .weapons
            .iter()
            .filter(|weapon| !self.denylist.weapons.contains(&weapon.name))
            .min_by_key(|weapon| Reverse(weapon.lethality))
        else {
            return Ok(None);
        };

        match ctx.inventory.best_weapon().cloned() {
            None => {
                info!(weapon = %best.name, lethality = best.lethality, "arming");
                Ok(Some(ctx.inventory.carry(Item::Weapon(best.clone()))))
            }
            Some(carried) if carried.lethality < best.lethality => {
                info!(carried = %carried.name, better = %best.name, "dropping a weaker weapon");
                ctx.inventory.drop_item(Item::Weapon(carried)).map(Some)
            }
            Some(_) => Ok(None),
        }
    }
}
