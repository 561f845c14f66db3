pub use regex_lite::{Captures, Regex};


// Slightly adjusted macro from https://docs.rs/once_cell/latest/once_cell/#lazily-compiled-regex:
#[macro_export]
macro_rules! once_cell_regex {
    ($re:expr $(,)?) => {{
        static RE: std::sync::OnceLock<$crate::util::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| $crate::util::Regex::new($re).unwrap())
    }};
}

// Expands a FEN rank ("3p4") into exactly eight cells, `None` for empty squares.
pub fn expand_fen_rank(rank: &str) -> Option<Vec<Option<char>>> {
    let mut cells = Vec::with_capacity(8);
    for ch in rank.chars() {
        match ch.to_digit(10) {
            Some(n) => cells.extend(std::iter::repeat_n(None, n as usize)),
            None => cells.push(Some(ch)),
        }
    }
    (cells.len() == 8).then_some(cells)
}

// Board part of a FEN string, i.e. everything before the first space.
pub fn board_part(fen: &str) -> &str { fen.split(' ').next().unwrap_or(fen) }
