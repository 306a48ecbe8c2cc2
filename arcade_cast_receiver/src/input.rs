// Input translation: controller directions to native key signals.
//
// Each slot has its own fixed control scheme so both players can steer the
// same game engine at once: slot A drives the arrow keys, slot B drives
// W/A/S/D. The mapping is pure and stateless.

use std::fmt;

/// One of the two fixed seats in a session. Independent of the role the
/// occupant is given at game start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Fill order for joins.
    pub const ALL: [Slot; 2] = [Slot::A, Slot::B];

    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Directional command sent by a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Up,
    Down,
    Right,
}

impl Direction {
    /// Parse a wire direction. Anything else yields `None` and is ignored.
    pub fn parse(direct: &str) -> Option<Self> {
        match direct {
            "left" => Some(Direction::Left),
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Native key code understood by the game engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u16);

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map a direction to the key signal for the given slot's control scheme.
pub fn translate(slot: Slot, direction: Direction) -> KeyCode {
    let code = match (slot, direction) {
        (Slot::A, Direction::Left) => 37,
        (Slot::A, Direction::Up) => 38,
        (Slot::A, Direction::Right) => 39,
        (Slot::A, Direction::Down) => 40,
        (Slot::B, Direction::Left) => 65,
        (Slot::B, Direction::Up) => 87,
        (Slot::B, Direction::Down) => 83,
        (Slot::B, Direction::Right) => 68,
    };
    KeyCode(code)
}

/// Parse and translate in one step, for raw `direct` strings.
pub fn translate_str(slot: Slot, direct: &str) -> Option<KeyCode> {
    Direction::parse(direct).map(|direction| translate(slot, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_a_uses_arrow_keys() {
        let codes: Vec<u16> = ["left", "up", "down", "right"]
            .iter()
            .map(|d| translate_str(Slot::A, d).unwrap().0)
            .collect();
        assert_eq!(codes, vec![37, 38, 40, 39]);
    }

    #[test]
    fn slot_b_uses_wasd() {
        let codes: Vec<u16> = ["left", "up", "down", "right"]
            .iter()
            .map(|d| translate_str(Slot::B, d).unwrap().0)
            .collect();
        assert_eq!(codes, vec![65, 87, 83, 68]);
    }

    #[test]
    fn unknown_directions_ignored() {
        for direct in ["", "LEFT", "jump", " left"] {
            assert_eq!(translate_str(Slot::A, direct), None, "{direct:?}");
        }
    }

    #[test]
    fn slot_order_is_a_then_b() {
        assert_eq!(Slot::ALL, [Slot::A, Slot::B]);
        assert_eq!(Slot::B.index(), 1);
    }
}
