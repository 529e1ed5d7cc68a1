use castle_agent_core::Direction;

/// A castle shaped like a tree, rendered in the simulated castle's text format.
#[derive(Debug, Clone)]
pub struct TreeCastle {
    pub rooms: usize,
    pub frog: usize,
    pub exit: usize,
    pub text: String,
}

/// Builds a tree of `links.len() + 1` rooms. Room `i + 1` hangs off room
/// `links[i].0 % (i + 1)` through the first free door at or after
/// `links[i].1`.
pub fn tree_castle(links: &[(usize, usize)], frog: usize, exit: usize, treasures: &[i64]) -> TreeCastle {
    let rooms = links.len() + 1;
    let mut used: Vec<Vec<Direction>> = vec![Vec::new(); rooms];
    let mut lines: Vec<String> = (0..rooms).map(|room| format!("room r{room} room{room} -")).collect();

    for (index, &(parent_seed, door_seed)) in links.iter().enumerate() {
        let child = index + 1;
        let mut parent = parent_seed % child;
        if used[parent].len() == Direction::ALL.len() {
            parent = child - 1;
        }
        let direction = free_door(&used[parent], door_seed);
        used[parent].push(direction);
        used[child].push(direction.reverse());
        lines.push(format!("link r{parent} {direction} r{child}"));
    }

    // The newest room is a leaf, so some room always has a free door.
    let exit = (0..rooms)
        .map(|offset| (exit + offset) % rooms)
        .find(|&room| used[room].len() < Direction::ALL.len())
        .unwrap_or(rooms - 1);
    let door = free_door(&used[exit], exit);
    lines.push(format!("exit r{exit} {door}"));

    let frog = frog % rooms;
    lines.push(format!("frog r{frog}"));
    for (index, value) in treasures.iter().enumerate() {
        lines.push(format!("treasure r{} \"coin {index}\" {value}", index % rooms));
    }
    lines.push("start r0".to_string());

    TreeCastle {
        rooms,
        frog,
        exit,
        text: lines.join("\n"),
    }
}

/// The first direction not in `used`, searching from `seed`.
fn free_door(used: &[Direction], seed: usize) -> Direction {
    (0..Direction::ALL.len())
        .map(|offset| Direction::ALL[(seed + offset) % Direction::ALL.len()])
        .find(|direction| !used.contains(direction))
        .unwrap_or(Direction::North)
}
