// Positions of the current game with a browsing cursor. The first entry is always the initial
// position; every later entry is the position after one half-move.

use itertools::Itertools;


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub fen: String,
    // Move that led to this position. `None` for the initial position and for resyncs.
    pub san: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRow {
    pub number: usize,
    pub white: Option<String>,
    pub black: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HistoryNavigator {
    positions: Vec<HistoryEntry>,
    cursor: usize,
    // Whether the initial position has black to move, which shifts the move numbering.
    black_starts: bool,
}

impl HistoryNavigator {
    pub fn new(initial_fen: impl Into<String>) -> Self {
        let fen = initial_fen.into();
        let black_starts = fen.split(' ').nth(1) == Some("b");
        HistoryNavigator {
            positions: vec![HistoryEntry { fen, san: None }],
            cursor: 0,
            black_starts,
        }
    }

    pub fn len(&self) -> usize { self.positions.len() }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }
    pub fn cursor(&self) -> usize { self.cursor }
    pub fn current(&self) -> &HistoryEntry { &self.positions[self.cursor] }
    pub fn is_at_end(&self) -> bool { self.cursor + 1 == self.positions.len() }

    pub fn add(&mut self, san: Option<String>, fen: impl Into<String>) {
        self.positions.push(HistoryEntry { fen: fen.into(), san });
        self.cursor = self.positions.len() - 1;
    }

    // Moves the cursor to `index` (or keeps it where it is) and returns the displayed entry.
    pub fn display(&mut self, index: Option<usize>) -> &HistoryEntry {
        if let Some(index) = index {
            self.cursor = index.min(self.positions.len() - 1);
        }
        self.current()
    }

    pub fn beginning(&mut self) -> &HistoryEntry { self.display(Some(0)) }
    pub fn backward(&mut self) -> &HistoryEntry { self.display(Some(self.cursor.saturating_sub(1))) }
    pub fn forward(&mut self) -> &HistoryEntry { self.display(Some(self.cursor + 1)) }
    pub fn end(&mut self) -> &HistoryEntry { self.display(Some(usize::MAX)) }

    // Drops the last position unless only the initial one is left. Returns whether anything
    // was removed.
    pub fn undo(&mut self) -> bool {
        if self.positions.len() <= 1 {
            return false;
        }
        self.positions.pop();
        self.cursor = self.positions.len() - 1;
        true
    }

    // Moves grouped into numbered rows for a move list ("1. e4 e5").
    pub fn move_rows(&self) -> Vec<MoveRow> {
        let moves = self.positions.iter().skip(1).map(|entry| entry.san.clone());
        let padded = self.black_starts.then_some(None).into_iter().chain(moves);
        padded
            .chunks(2)
            .into_iter()
            .enumerate()
            .map(|(i, mut pair)| MoveRow {
                number: i + 1,
                white: pair.next().flatten(),
                black: pair.next().flatten(),
            })
            .collect()
    }
}
