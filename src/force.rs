use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::EnumIter;


#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Enum, EnumIter, Serialize, Deserialize,
)]
pub enum Force {
    White,
    Black,
}

impl Force {
    pub fn opponent(self) -> Force {
        match self {
            Force::White => Force::Black,
            Force::Black => Force::White,
        }
    }

    // Side-to-move letter as used in FEN.
    pub fn to_fen_char(self) -> char {
        match self {
            Force::White => 'w',
            Force::Black => 'b',
        }
    }

    // The relay reports side-to-move as "W" or "B". Anything else is treated as white, which is
    // what a fresh game starts with.
    pub fn from_relay_turn(turn: &str) -> Force {
        if turn.trim().eq_ignore_ascii_case("b") { Force::Black } else { Force::White }
    }
}

impl From<chess::Color> for Force {
    fn from(color: chess::Color) -> Self {
        match color {
            chess::Color::White => Force::White,
            chess::Color::Black => Force::Black,
        }
    }
}

impl From<Force> for chess::Color {
    fn from(force: Force) -> Self {
        match force {
            Force::White => chess::Color::White,
            Force::Black => chess::Color::Black,
        }
    }
}
