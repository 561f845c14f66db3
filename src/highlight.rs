// Visual annotations of board squares: last move, queued premove, king in check and candidate
// targets while dragging.

use chess::Square;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SquareHighlight {
    None,
    LastMove,
    Premove,
    Check,
}

#[derive(Clone, Debug, Default)]
pub struct Highlights {
    last_move: Option<(Square, Square)>,
    premove: Option<(Square, Square)>,
    check: Option<Square>,
    // Dragged piece and its legal targets; shown like the last move.
    candidates: Vec<Square>,
}

impl Highlights {
    pub fn new() -> Self { Self::default() }

    pub fn clear(&mut self) { *self = Self::default(); }

    // A new move replaces every other highlight.
    pub fn highlight_move(&mut self, from: Square, to: Square) {
        self.clear();
        self.last_move = Some((from, to));
    }
    pub fn highlight_premove(&mut self, from: Square, to: Square) {
        self.premove = Some((from, to));
    }
    pub fn highlight_check(&mut self, king_square: Square) { self.check = Some(king_square); }
    pub fn highlight_candidates(&mut self, from: Square, targets: &[Square]) {
        self.candidates = std::iter::once(from).chain(targets.iter().copied()).collect();
    }
    pub fn clear_premove(&mut self) { self.premove = None; }
    pub fn clear_candidates(&mut self) { self.candidates.clear(); }

    pub fn square(&self, square: Square) -> SquareHighlight {
        if self.check == Some(square) {
            SquareHighlight::Check
        } else if self.premove.is_some_and(|(from, to)| square == from || square == to) {
            SquareHighlight::Premove
        } else if self.last_move.is_some_and(|(from, to)| square == from || square == to)
            || self.candidates.contains(&square)
        {
            SquareHighlight::LastMove
        } else {
            SquareHighlight::None
        }
    }
}

pub fn gives_check(san: &str) -> bool { san.ends_with('+') || san.ends_with('#') }
