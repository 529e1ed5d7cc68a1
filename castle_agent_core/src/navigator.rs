//! Depth-first exploration of the castle.
//!
//! The navigator never sees a map. It remembers which doors it has taken out
//! of every room, keeps a breadcrumb trail of the moves that lead back to the
//! room where the current exploration episode started, and records each door
//! that turned out to lead outside together with the route from the origin to
//! it. With that it can:
//!
//! - explore every reachable door exactly once,
//! - backtrack along the trail once a room has nothing left to offer,
//! - route to the nearest known exit when the goal item is in hand or the
//!   current part of the castle is exhausted,
//! - re-enter at random to look for parts of the castle that are not connected
//!   to the ones already explored.
//!
//! Rooms are only known by what they look like, so two rooms with the same
//! purpose and attributes are the same room as far as the navigator can
//! tell. When such a look-alike leaves it with no route to a known exit, it
//! probes the room's doors one more time each before giving up.
//!
//! A turn is split in two halves so that tactics can run in between:
//! [`Navigator::arrive`] handles everything that must happen before tactics
//! are consulted, and [`Navigator::explore`] picks the move when none of them
//! acted.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    Action, Direction, RoomIdentity,
    error::AgentError,
    observation::{Location, Room},
};

/// What the navigator did on the latest turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Exploring,
    Backtracking,
    LeavingViaKnownExit,
    RestartingViaRandomEntry,
    FollowingOverride,
    /// Retrying a door of a room that may be a look-alike.
    Probing,
    Stopped,
}

/// A door from which the agent once stepped outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredExit {
    /// The room the door belongs to.
    pub room: RoomIdentity,
    /// The direction of the door.
    pub direction: Direction,
    /// The origin of the episode in which the door was found.
    pub origin: RoomIdentity,
    /// Moves leading from `origin` to `room`.
    pub path: Vec<Direction>,
}

/// Result of the first half of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival<'a> {
    /// The navigator has already decided; tactics are not consulted.
    Decided(Action),
    /// The agent stands in `room` and is free to act or explore.
    Explore(&'a Room),
}

#[derive(Debug, Clone)]
pub struct Navigator {
    visited_exits: HashMap<RoomIdentity, BTreeSet<Direction>>,
    reverse_path: Vec<Direction>,
    discovered: Vec<DiscoveredExit>,
    exit_index: HashMap<RoomIdentity, usize>,
    override_path: VecDeque<Direction>,
    probed: HashMap<RoomIdentity, BTreeSet<Direction>>,
    mode: Mode,
    origin: Option<RoomIdentity>,
    last_room: Option<RoomIdentity>,
    goal_acquired: bool,
    restart_on_exit: bool,
    reentries: u32,
    max_reentries: u32,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator::new(crate::config::DEFAULT_MAX_REENTRIES)
    }
}

impl Navigator {
    /// Creates a navigator that gives up after `max_reentries` consecutive
    /// random entries into parts of the castle it already knows.
    pub fn new(max_reentries: u32) -> Self {
        Navigator {
            visited_exits: HashMap::new(),
            reverse_path: Vec::new(),
            discovered: Vec::new(),
            exit_index: HashMap::new(),
            override_path: VecDeque::new(),
            probed: HashMap::new(),
            mode: Mode::Exploring,
            origin: None,
            last_room: None,
            goal_acquired: false,
            restart_on_exit: false,
            reentries: 0,
            max_reentries,
        }
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The breadcrumb trail; the last element is the next backtracking move.
    pub fn reverse_path(&self) -> &[Direction] {
        &self.reverse_path
    }

    /// Exits in the order they were discovered.
    pub fn discovered_exits(&self) -> &[DiscoveredExit] {
        &self.discovered
    }

    pub fn exit_for(&self, room: &RoomIdentity) -> Option<&DiscoveredExit> {
        self.exit_index
            .get(room)
            .and_then(|&index| self.discovered.get(index))
    }

    pub fn visited_exits(&self, room: &RoomIdentity) -> Option<&BTreeSet<Direction>> {
        self.visited_exits.get(room)
    }

    /// Number of distinct rooms seen so far.
    pub fn rooms_known(&self) -> usize {
        self.visited_exits.len()
    }

    pub fn override_path(&self) -> impl Iterator<Item = Direction> + '_ {
        self.override_path.iter().copied()
    }

    pub const fn origin(&self) -> Option<&RoomIdentity> {
        self.origin.as_ref()
    }

    pub const fn goal_acquired(&self) -> bool {
        self.goal_acquired
    }

    pub const fn restart_on_exit(&self) -> bool {
        self.restart_on_exit
    }

    /// First half of a turn: everything that happens before tactics run.
    pub fn arrive<'a>(&mut self, location: &'a Location) -> Arrival<'a> {
        if self.mode == Mode::Stopped {
            return Arrival::Decided(Action::Stop);
        }

        let room = match location {
            Location::Outside | Location::InMoat => {
                return Arrival::Decided(self.handle_outdoors());
            }
            Location::Room(room) => room,
        };

        if let Some(direction) = self.override_path.pop_front() {
            info!(%direction, remaining = self.override_path.len(), "following override path");
            self.last_room = Some(room.identity.clone());
            return Arrival::Decided(self.go(direction, Mode::FollowingOverride));
        }

        if self.mode == Mode::RestartingViaRandomEntry {
            if let Some(action) = self.reconcile_reentry(room) {
                self.last_room = Some(room.identity.clone());
                return Arrival::Decided(action);
            }
        }

        if self.origin.is_none() {
            info!(origin = %room.identity, "setting exploration origin");
            self.origin = Some(room.identity.clone());
        }

        let visited = self.visited_exits.entry(room.identity.clone()).or_default();
        if let Some(&door) = self.reverse_path.last() {
            visited.insert(door);
        }
        self.last_room = Some(room.identity.clone());

        if self.goal_acquired {
            if let Some(direction) = self.exit_for(&room.identity).map(|exit| exit.direction) {
                info!(room = %room.identity, %direction, "carrying the goal item, leaving through a known exit");
                return Arrival::Decided(self.go(direction, Mode::LeavingViaKnownExit));
            }
        }

        Arrival::Explore(room)
    }

    /// Second half of a turn: take an unexplored door, backtrack, or head for
    /// the nearest known exit once everything reachable has been explored.
    ///
    /// Fails with [`AgentError::ExhaustedWithNoExit`] only when no exit was
    /// ever seen. With exits known but none reachable from here, the doors of
    /// the room are probed once each, then the navigator stops.
    pub fn explore(&mut self, room: &Room) -> Result<Action, AgentError> {
        let visited = self.visited_exits.entry(room.identity.clone()).or_default();
        if let Some(&direction) = room.exits.iter().find(|&exit| !visited.contains(exit)) {
            visited.insert(direction);
            self.reverse_path.push(direction.reverse());
            info!(room = %room.identity, %direction, "exploring");
            debug!(
                rooms = self.visited_exits.len(),
                exits = self.discovered.len(),
                depth = self.reverse_path.len(),
                "exploration progress"
            );
            return Ok(self.go(direction, Mode::Exploring));
        }

        if let Some(direction) = self.reverse_path.pop() {
            info!(%direction, depth = self.reverse_path.len(), "backtracking");
            return Ok(self.go(direction, Mode::Backtracking));
        }

        info!("nothing left to explore, heading for the nearest known exit");
        self.restart_on_exit = true;
        let mut route = self.route_to_nearest_exit().unwrap_or_default();
        if let Some(direction) = route.pop_front() {
            self.override_path = route;
            return Ok(self.go(direction, Mode::FollowingOverride));
        }

        if self.discovered.is_empty() {
            error!(rooms = self.visited_exits.len(), "never encountered an exit");
            self.mode = Mode::Stopped;
            return Err(AgentError::ExhaustedWithNoExit {
                rooms: self.visited_exits.len(),
            });
        }

        // Any exit found while probing belongs to this episode.
        self.restart_on_exit = false;
        Ok(self.probe(room))
    }

    /// Takes a door of `room` that has not been probed yet, or stops.
    fn probe(&mut self, room: &Room) -> Action {
        let probed = self.probed.entry(room.identity.clone()).or_default();
        match room.exits.iter().find(|&exit| !probed.contains(exit)) {
            Some(&direction) => {
                probed.insert(direction);
                self.reverse_path.push(direction.reverse());
                warn!(room = %room.identity, %direction, "no known exit reachable, probing a door again");
                self.go(direction, Mode::Probing)
            }
            None => {
                warn!(
                    room = %room.identity,
                    exits = self.discovered.len(),
                    "every door probed without reaching a known exit, stopping"
                );
                self.mode = Mode::Stopped;
                Action::Stop
            }
        }
    }

    /// Switches to exit-seeking: from now on any known exit is taken, and the
    /// route to the nearest one is queued if there is one.
    pub fn acquire_goal(&mut self) {
        self.goal_acquired = true;

        let here = self
            .last_room
            .as_ref()
            .and_then(|room| self.exit_for(room))
            .map(|exit| exit.direction);
        let route = match here {
            Some(direction) => Some(VecDeque::from([direction])),
            None => self.route_to_nearest_exit(),
        };

        match route {
            Some(route) => {
                info!(steps = route.len(), "goal acquired, routing to the nearest known exit");
                self.override_path = route;
            }
            None => info!("goal acquired, no exit known yet"),
        }
    }

    /// Steps back along the breadcrumb trail, if there is one.
    pub fn retreat(&mut self) -> Option<Action> {
        let direction = self.reverse_path.pop()?;
        info!(%direction, depth = self.reverse_path.len(), "retreating");
        Some(self.go(direction, Mode::Backtracking))
    }

    fn go(&mut self, direction: Direction, mode: Mode) -> Action {
        self.mode = mode;
        Action::Go(direction)
    }

    fn handle_outdoors(&mut self) -> Action {
        if self.goal_acquired {
            info!("outside with the goal item, stopping");
            self.mode = Mode::Stopped;
            return Action::Stop;
        }

        if self.restart_on_exit {
            info!("outside again, entering at random to look for unexplored parts");
            self.reverse_path.clear();
            self.override_path.clear();
            self.last_room = None;
            self.mode = Mode::RestartingViaRandomEntry;
            return Action::EnterRandomly;
        }

        // Only a forward move can lead outside: the outward step is popped here,
        // so the trail never leads back out.
        match self.last_room.take() {
            Some(room) => match self.reverse_path.pop() {
                Some(back) => self.record_exit(room, back.reverse()),
                None => warn!(%room, "outside without a breadcrumb trail, cannot record the exit"),
            },
            None => warn!("outside without a known last room, cannot record the exit"),
        }
        self.mode = Mode::Exploring;
        Action::Enter
    }

    fn record_exit(&mut self, room: RoomIdentity, direction: Direction) {
        if self.exit_index.contains_key(&room) {
            debug!(%room, %direction, "exit already recorded for this room");
            return;
        }
        let Some(origin) = self.origin.clone() else {
            warn!(%room, "no exploration origin, cannot record the exit");
            return;
        };

        let path: Vec<Direction> = self.reverse_path.iter().map(|d| d.reverse()).collect();
        info!(%room, %direction, steps = path.len(), "found an exit");
        self.exit_index.insert(room.clone(), self.discovered.len());
        self.discovered.push(DiscoveredExit {
            room,
            direction,
            origin,
            path,
        });
    }

    /// The shortest route through a known exit of the current episode: back
    /// along the trail to the origin, then the recorded path, then the door.
    fn route_to_nearest_exit(&self) -> Option<VecDeque<Direction>> {
        let origin = self.origin.as_ref()?;
        let nearest = self
            .discovered
            .iter()
            .filter(|exit| &exit.origin == origin)
            .min_by_key(|exit| exit.path.len())?;

        let route: VecDeque<Direction> = self
            .reverse_path
            .iter()
            .rev()
            .chain(&nearest.path)
            .copied()
            .chain(std::iter::once(nearest.direction))
            .collect();
        debug!(?route, exit = %nearest.room, "computed route to the nearest exit");
        Some(route)
    }

    fn reconcile_reentry(&mut self, room: &Room) -> Option<Action> {
        if let Some(direction) = self.exit_for(&room.identity).map(|exit| exit.direction) {
            self.reentries += 1;
            if self.reentries > self.max_reentries {
                warn!(reentries = self.reentries, "keep landing in known rooms, giving up");
                self.mode = Mode::Stopped;
                return Some(Action::Stop);
            }
            info!(room = %room.identity, %direction, "re-entered a known room, leaving again");
            return Some(self.go(direction, Mode::LeavingViaKnownExit));
        }

        if self.visited_exits.contains_key(&room.identity) {
            // Either a room seen before without an exit of its own, or a
            // look-alike in another part of the castle. Explore from here;
            // doors already taken are skipped and probed only as a last resort.
            info!(room = %room.identity, reentries = self.reentries, "re-entered a room that looks familiar");
        } else {
            info!(room = %room.identity, "re-entered into a new part of the castle");
            self.reentries = 0;
        }
        self.restart_on_exit = false;
        self.origin = None;
        self.mode = Mode::Exploring;
        None
    }
}
